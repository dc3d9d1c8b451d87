//! Private account endpoints: balances, orders, trades, positions, ledgers
//!
//! These endpoints require authentication.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::request::RequestBuilder;
use crate::types::{de, CloseTime, Dictionary, LedgerType, OrderSide, TradeType};

endpoint! {
    /// Cash balances, net of pending withdrawals
    Balance: Post "/0/private/Balance", weight 1, Private => Dictionary<Decimal>
}

endpoint! {
    /// Margin and equity summary
    TradeBalance: Post "/0/private/TradeBalance", weight 1, Private => TradeBalanceInfo
}

endpoint! {
    OpenOrders: Post "/0/private/OpenOrders", weight 1, Private => OpenOrdersResult
}

endpoint! {
    /// Closed orders, 50 per page
    ClosedOrders: Post "/0/private/ClosedOrders", weight 1, Private => ClosedOrdersResult
}

endpoint! {
    QueryOrders: Post "/0/private/QueryOrders", weight 1, Private => Dictionary<OrderInfo>
}

endpoint! {
    /// Trade history, 50 per page
    TradesHistory: Post "/0/private/TradesHistory", weight 2, Private => TradesHistoryResult
}

endpoint! {
    QueryTrades: Post "/0/private/QueryTrades", weight 1, Private => Dictionary<TradeInfo>
}

endpoint! {
    OpenPositions: Post "/0/private/OpenPositions", weight 1, Private => Dictionary<PositionInfo>
}

endpoint! {
    /// Ledger entries, 50 per page
    Ledgers: Post "/0/private/Ledgers", weight 2, Private => LedgersResult
}

endpoint! {
    QueryLedgers: Post "/0/private/QueryLedgers", weight 2, Private => Dictionary<LedgerEntry>
}

endpoint! {
    /// 30-day volume and fee tiers
    TradeVolume: Post "/0/private/TradeVolume", weight 1, Private => TradeVolumeInfo
}

endpoint! {
    /// Token for authenticating to the private WebSocket feeds
    GetWebSocketsToken: Post "/0/private/GetWebSocketsToken", weight 1, Private => WebSocketsToken
}

impl RequestBuilder<TradeBalance> {
    /// Base asset for the summary (default `ZUSD`)
    pub fn asset(self, asset: &str) -> Self {
        self.param("asset", asset)
    }
}

impl RequestBuilder<OpenOrders> {
    /// Include trades related to each order
    pub fn trades(self, trades: bool) -> Self {
        self.param_flag("trades", trades)
    }

    pub fn userref(self, userref: i64) -> Self {
        self.param("userref", userref)
    }
}

impl RequestBuilder<ClosedOrders> {
    pub fn trades(self, trades: bool) -> Self {
        self.param_flag("trades", trades)
    }

    pub fn userref(self, userref: i64) -> Self {
        self.param("userref", userref)
    }

    /// Starting Unix timestamp or order id (exclusive)
    pub fn start(self, start: impl ToString) -> Self {
        self.param("start", start)
    }

    /// Ending Unix timestamp or order id (inclusive)
    pub fn end(self, end: impl ToString) -> Self {
        self.param("end", end)
    }

    /// Result offset for pagination
    pub fn offset(self, offset: u32) -> Self {
        self.param("ofs", offset)
    }

    pub fn close_time(self, close_time: CloseTime) -> Self {
        self.param("closetime", close_time.as_str())
    }
}

impl RequestBuilder<QueryOrders> {
    pub fn trades(self, trades: bool) -> Self {
        self.param_flag("trades", trades)
    }

    pub fn userref(self, userref: i64) -> Self {
        self.param("userref", userref)
    }

    /// Order ids to query (up to 50)
    pub fn txids<I, S>(self, txids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.param_list("txid", txids)
    }
}

impl RequestBuilder<TradesHistory> {
    pub fn trade_type(self, trade_type: TradeType) -> Self {
        self.param("type", trade_type.as_str())
    }

    /// Include trades related to position
    pub fn trades(self, trades: bool) -> Self {
        self.param_flag("trades", trades)
    }

    pub fn start(self, start: impl ToString) -> Self {
        self.param("start", start)
    }

    pub fn end(self, end: impl ToString) -> Self {
        self.param("end", end)
    }

    pub fn offset(self, offset: u32) -> Self {
        self.param("ofs", offset)
    }
}

impl RequestBuilder<QueryTrades> {
    /// Trade ids to query (up to 20)
    pub fn txids<I, S>(self, txids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.param_list("txid", txids)
    }

    pub fn trades(self, trades: bool) -> Self {
        self.param_flag("trades", trades)
    }
}

impl RequestBuilder<OpenPositions> {
    pub fn txids<I, S>(self, txids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.param_list("txid", txids)
    }

    /// Include profit/loss calculations
    pub fn do_calcs(self, do_calcs: bool) -> Self {
        self.param_flag("docalcs", do_calcs)
    }
}

impl RequestBuilder<Ledgers> {
    pub fn asset_class(self, aclass: &str) -> Self {
        self.param("aclass", aclass)
    }

    pub fn assets<I, S>(self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.param_list("asset", assets)
    }

    pub fn ledger_type(self, ledger_type: LedgerType) -> Self {
        self.param("type", ledger_type.as_str())
    }

    pub fn start(self, start: impl ToString) -> Self {
        self.param("start", start)
    }

    pub fn end(self, end: impl ToString) -> Self {
        self.param("end", end)
    }

    pub fn offset(self, offset: u32) -> Self {
        self.param("ofs", offset)
    }
}

impl RequestBuilder<QueryLedgers> {
    /// Ledger ids to query (up to 20)
    pub fn ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.param_list("id", ids)
    }

    pub fn trades(self, trades: bool) -> Self {
        self.param_flag("trades", trades)
    }
}

impl RequestBuilder<TradeVolume> {
    pub fn pairs<I, S>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.param_list("pair", pairs)
    }

    /// Include fee info for the pairs
    pub fn fee_info(self, fee_info: bool) -> Self {
        self.param_flag("fee-info", fee_info)
    }
}

/// Margin and equity summary
#[derive(Debug, Clone, Deserialize)]
pub struct TradeBalanceInfo {
    /// Equivalent balance (combined balance of all currencies)
    pub eb: Decimal,
    /// Trade balance (combined balance of all equity currencies)
    pub tb: Decimal,
    /// Margin amount of open positions
    pub m: Decimal,
    /// Unrealized net profit/loss of open positions
    pub n: Decimal,
    /// Cost basis of open positions
    pub c: Decimal,
    /// Current floating valuation of open positions
    pub v: Decimal,
    /// Equity: trade balance + unrealized net profit/loss
    pub e: Decimal,
    /// Free margin
    pub mf: Decimal,
    /// Margin level, absent without open positions
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub ml: Option<Decimal>,
    /// Unexecuted value
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub uv: Option<Decimal>,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Open,
    Closed,
    Canceled,
    Expired,
    #[serde(other)]
    Unknown,
}

/// Order description
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDescription {
    pub pair: String,
    #[serde(rename = "type")]
    pub side: OrderSide,
    pub ordertype: String,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub price2: Option<Decimal>,
    #[serde(default)]
    pub leverage: String,
    /// Human-readable order description
    pub order: String,
    /// Conditional close order description
    #[serde(default)]
    pub close: String,
}

/// Open, closed or queried order
#[derive(Debug, Clone, Deserialize)]
pub struct OrderInfo {
    pub refid: Option<String>,
    pub userref: Option<i64>,
    pub status: OrderStatus,
    pub opentm: f64,
    #[serde(default)]
    pub starttm: f64,
    #[serde(default)]
    pub expiretm: f64,
    pub closetm: Option<f64>,
    pub descr: OrderDescription,
    pub vol: Decimal,
    pub vol_exec: Decimal,
    pub cost: Decimal,
    pub fee: Decimal,
    /// Average price
    pub price: Decimal,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub stopprice: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub limitprice: Option<Decimal>,
    #[serde(default)]
    pub misc: String,
    #[serde(default)]
    pub oflags: String,
    /// Why the order was closed or canceled
    pub reason: Option<String>,
    /// Related trade ids, when requested with `trades`
    pub trades: Option<Vec<String>>,
}

/// Result of `OpenOrders`
#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrdersResult {
    pub open: Dictionary<OrderInfo>,
}

/// Result of `ClosedOrders`
#[derive(Debug, Clone, Deserialize)]
pub struct ClosedOrdersResult {
    pub closed: Dictionary<OrderInfo>,
    /// Total matching orders, across all pages
    pub count: u64,
}

/// Own trade
#[derive(Debug, Clone, Deserialize)]
pub struct TradeInfo {
    pub ordertxid: String,
    pub postxid: Option<String>,
    pub pair: String,
    pub time: f64,
    #[serde(rename = "type")]
    pub side: OrderSide,
    pub ordertype: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub fee: Decimal,
    pub vol: Decimal,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub margin: Option<Decimal>,
    #[serde(default)]
    pub misc: String,
    pub posstatus: Option<String>,
    pub ledgers: Option<Vec<String>>,
    pub trade_id: Option<u64>,
}

/// Result of `TradesHistory`
#[derive(Debug, Clone, Deserialize)]
pub struct TradesHistoryResult {
    pub trades: Dictionary<TradeInfo>,
    pub count: u64,
}

/// Open margin position
#[derive(Debug, Clone, Deserialize)]
pub struct PositionInfo {
    pub ordertxid: String,
    pub posstatus: String,
    pub pair: String,
    pub time: f64,
    #[serde(rename = "type")]
    pub side: OrderSide,
    pub ordertype: String,
    pub cost: Decimal,
    pub fee: Decimal,
    pub vol: Decimal,
    pub vol_closed: Decimal,
    pub margin: Decimal,
    /// Present with `docalcs`
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub value: Option<Decimal>,
    /// Present with `docalcs`
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub net: Option<Decimal>,
    pub terms: Option<String>,
    pub rollovertm: Option<String>,
    #[serde(default)]
    pub misc: String,
    #[serde(default)]
    pub oflags: String,
}

/// Ledger entry
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerEntry {
    pub refid: String,
    pub time: f64,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub subtype: Option<String>,
    pub aclass: String,
    pub asset: String,
    pub amount: Decimal,
    pub fee: Decimal,
    /// Resulting balance
    pub balance: Decimal,
}

/// Result of `Ledgers`
#[derive(Debug, Clone, Deserialize)]
pub struct LedgersResult {
    pub ledger: Dictionary<LedgerEntry>,
    pub count: u64,
}

/// Fee tier for one pair
#[derive(Debug, Clone, Deserialize)]
pub struct FeeInfo {
    pub fee: Decimal,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub minfee: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub maxfee: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub nextfee: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub nextvolume: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub tiervolume: Option<Decimal>,
}

/// Result of `TradeVolume`
#[derive(Debug, Clone, Deserialize)]
pub struct TradeVolumeInfo {
    /// Volume currency
    pub currency: String,
    /// Current discount volume
    pub volume: Decimal,
    /// Taker fees, with `fee-info`
    pub fees: Option<Dictionary<FeeInfo>>,
    /// Maker fees, with `fee-info`
    pub fees_maker: Option<Dictionary<FeeInfo>>,
}

/// WebSocket authentication token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebSocketsToken {
    pub token: String,
    /// Seconds until the token expires unless used
    pub expires: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{Endpoint, Visibility};
    use crate::transport::HttpMethod;
    use rust_decimal_macros::dec;

    #[test]
    fn test_endpoint_config() {
        assert_eq!(Balance::PATH, "/0/private/Balance");
        assert_eq!(Balance::METHOD, HttpMethod::Post);
        assert_eq!(Balance::VISIBILITY, Visibility::Private);
        assert_eq!(TradesHistory::WEIGHT, 2);
        assert_eq!(Ledgers::WEIGHT, 2);
        assert_eq!(QueryLedgers::WEIGHT, 2);
        assert_eq!(OpenOrders::WEIGHT, 1);
        assert_eq!(GetWebSocketsToken::PATH, "/0/private/GetWebSocketsToken");
    }

    #[test]
    fn test_balance_dictionary() {
        let balances: Dictionary<Decimal> =
            serde_json::from_str(r#"{"ZUSD":"171288.6158","ZEUR":"504861.8946","XXBT":"1011.1908877900"}"#)
                .unwrap();
        assert_eq!(balances.len(), 3);
        assert_eq!(balances["XXBT"], dec!(1011.19088779));
    }

    #[test]
    fn test_open_orders() {
        let result: OpenOrdersResult = serde_json::from_str(
            r#"{"open":{"OQCLML-BW3P3-BUCMWZ":{
                "refid":null,"userref":0,"status":"open","opentm":1688666559.8974,
                "starttm":0,"expiretm":0,
                "descr":{"pair":"XBTUSD","type":"buy","ordertype":"limit","price":"30010.0",
                    "price2":"0","leverage":"none","order":"buy 1.25000000 XBTUSD @ limit 30010.0","close":""},
                "vol":"1.25000000","vol_exec":"0.37500000","cost":"11253.7","fee":"0.00000",
                "price":"30010.0","stopprice":"0.00000","limitprice":"0.00000",
                "misc":"","oflags":"fciq","trades":["TCCCTY-WE2O6-P3NB37"]}}}"#,
        )
        .unwrap();

        let order = &result.open["OQCLML-BW3P3-BUCMWZ"];
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.descr.side, OrderSide::Buy);
        assert_eq!(order.descr.price, Some(dec!(30010.0)));
        assert_eq!(order.vol_exec, dec!(0.375));
        assert_eq!(order.trades.as_deref(), Some(&["TCCCTY-WE2O6-P3NB37".to_string()][..]));
    }

    #[test]
    fn test_unknown_order_status() {
        let status: OrderStatus = serde_json::from_str(r#""settling""#).unwrap();
        assert_eq!(status, OrderStatus::Unknown);
    }

    #[test]
    fn test_trade_balance_without_positions() {
        let balance: TradeBalanceInfo = serde_json::from_str(
            r#"{"eb":"1101.3425","tb":"392.2264","m":"7.0354","n":"-10.0232","c":"21.1063","v":"31.1297","e":"382.2032","mf":"375.1678"}"#,
        )
        .unwrap();
        assert_eq!(balance.n, dec!(-10.0232));
        assert_eq!(balance.ml, None);
    }
}
