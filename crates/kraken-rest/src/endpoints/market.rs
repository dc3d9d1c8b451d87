//! Public market data endpoints
//!
//! These endpoints don't require authentication.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::request::RequestBuilder;
use crate::types::{de, Dictionary, OrderSide, Row};

endpoint! {
    /// Server time
    Time: Get "/0/public/Time", weight 1, Public => ServerTime
}

endpoint! {
    /// Asset names, classes and precision
    Assets: Get "/0/public/Assets", weight 1, Public => Dictionary<AssetInfo>
}

endpoint! {
    /// Tradable asset pairs
    AssetPairs: Get "/0/public/AssetPairs", weight 1, Public => Dictionary<AssetPairInfo>
}

endpoint! {
    /// Ticker information
    Ticker: Get "/0/public/Ticker", weight 1, Public => Dictionary<TickerInfo>
}

endpoint! {
    /// OHLC candles
    Ohlc: Get "/0/public/OHLC", weight 1, Public => OhlcData
}

endpoint! {
    /// Order book depth
    Depth: Get "/0/public/Depth", weight 1, Public => Dictionary<OrderbookData>
}

endpoint! {
    /// Recent public trades
    Trades: Get "/0/public/Trades", weight 1, Public => RecentTrades
}

endpoint! {
    /// Recent best bid/ask spreads
    Spread: Get "/0/public/Spread", weight 1, Public => RecentSpreads
}

impl RequestBuilder<Assets> {
    /// Info to retrieve (Kraken accepts `info` only)
    pub fn info(self, info: &str) -> Self {
        self.param("info", info)
    }

    /// Asset class, e.g. `currency`
    pub fn asset_class(self, aclass: &str) -> Self {
        self.param("aclass", aclass)
    }

    /// Restrict to these assets
    pub fn assets<I, S>(self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.param_list("asset", assets)
    }
}

impl RequestBuilder<AssetPairs> {
    /// Restrict to these pairs
    pub fn pairs<I, S>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.param_list("pair", pairs)
    }

    /// Info to retrieve: `info`, `leverage`, `fees` or `margin`
    pub fn info(self, info: &str) -> Self {
        self.param("info", info)
    }
}

impl RequestBuilder<Ticker> {
    pub fn pairs<I, S>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.param_list("pair", pairs)
    }
}

impl RequestBuilder<Ohlc> {
    pub fn pair(self, pair: &str) -> Self {
        self.param("pair", pair)
    }

    /// Candle width in minutes (1, 5, 15, 30, 60, 240, 1440, 10080, 21600)
    pub fn interval(self, minutes: u32) -> Self {
        self.param("interval", minutes)
    }

    /// Return candles after this Unix timestamp
    pub fn since(self, since: i64) -> Self {
        self.param("since", since)
    }
}

impl RequestBuilder<Depth> {
    pub fn pair(self, pair: &str) -> Self {
        self.param("pair", pair)
    }

    /// Maximum number of asks and bids (1-500)
    pub fn count(self, count: u32) -> Self {
        self.param("count", count)
    }
}

impl RequestBuilder<Trades> {
    pub fn pair(self, pair: &str) -> Self {
        self.param("pair", pair)
    }

    /// Resume after this cursor (the `last` of a previous response)
    pub fn since(self, since: &str) -> Self {
        self.param("since", since)
    }

    pub fn count(self, count: u32) -> Self {
        self.param("count", count)
    }
}

impl RequestBuilder<Spread> {
    pub fn pair(self, pair: &str) -> Self {
        self.param("pair", pair)
    }

    pub fn since(self, since: i64) -> Self {
        self.param("since", since)
    }
}

/// Exchange server time
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerTime {
    /// Unix timestamp
    pub unixtime: i64,
    /// RFC 1123 formatted time
    pub rfc1123: String,
}

impl ServerTime {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.unixtime, 0)
    }
}

/// Asset information
#[derive(Debug, Clone, Deserialize)]
pub struct AssetInfo {
    /// Asset class
    pub aclass: String,
    /// Alternate name
    pub altname: String,
    /// Scaling decimal places for record keeping
    pub decimals: u32,
    /// Scaling decimal places for display
    pub display_decimals: u32,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub collateral_value: Option<Decimal>,
    pub status: Option<String>,
}

/// One step of a fee schedule: `[volume, percent fee]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FeeTier(pub Decimal, pub Decimal);

impl FeeTier {
    pub fn volume(&self) -> Decimal {
        self.0
    }

    pub fn percent(&self) -> Decimal {
        self.1
    }
}

/// Asset pair information
#[derive(Debug, Clone, Deserialize)]
pub struct AssetPairInfo {
    pub altname: String,
    pub wsname: Option<String>,
    pub aclass_base: String,
    pub base: String,
    pub aclass_quote: String,
    pub quote: String,
    pub pair_decimals: u32,
    #[serde(default)]
    pub cost_decimals: Option<u32>,
    pub lot_decimals: u32,
    pub lot_multiplier: u32,
    /// Taker fee schedule
    #[serde(default)]
    pub fees: Vec<FeeTier>,
    /// Maker fee schedule
    #[serde(default)]
    pub fees_maker: Vec<FeeTier>,
    #[serde(default)]
    pub leverage_buy: Vec<u32>,
    #[serde(default)]
    pub leverage_sell: Vec<u32>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub ordermin: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub costmin: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub tick_size: Option<Decimal>,
    pub status: Option<String>,
}

/// Ticker information for a trading pair
#[derive(Debug, Clone, Deserialize)]
pub struct TickerInfo {
    /// Ask `[price, whole lot volume, lot volume]`
    pub a: Vec<Decimal>,
    /// Bid `[price, whole lot volume, lot volume]`
    pub b: Vec<Decimal>,
    /// Last trade closed `[price, lot volume]`
    pub c: Vec<Decimal>,
    /// Volume `[today, last 24 hours]`
    pub v: Vec<Decimal>,
    /// Volume weighted average price `[today, last 24 hours]`
    pub p: Vec<Decimal>,
    /// Number of trades `[today, last 24 hours]`
    pub t: Vec<u64>,
    /// Low `[today, last 24 hours]`
    pub l: Vec<Decimal>,
    /// High `[today, last 24 hours]`
    pub h: Vec<Decimal>,
    /// Today's opening price
    pub o: Decimal,
}

impl TickerInfo {
    pub fn ask_price(&self) -> Option<Decimal> {
        self.a.first().copied()
    }

    pub fn bid_price(&self) -> Option<Decimal> {
        self.b.first().copied()
    }

    pub fn last_price(&self) -> Option<Decimal> {
        self.c.first().copied()
    }

    /// Average of bid and ask
    pub fn mid_price(&self) -> Option<Decimal> {
        Some((self.ask_price()? + self.bid_price()?) / Decimal::TWO)
    }

    /// Spread in basis points of the mid price
    pub fn spread_bps(&self) -> Option<Decimal> {
        let mid = self.mid_price()?;
        if mid.is_zero() {
            return None;
        }
        Some((self.ask_price()? - self.bid_price()?) / mid * Decimal::from(10_000))
    }
}

/// OHLC candles for one pair
#[derive(Debug, Clone, Deserialize)]
pub struct OhlcData {
    /// Cursor for the next poll
    pub last: i64,
    /// Candles keyed by pair name
    #[serde(flatten)]
    pub candles: Dictionary<Vec<Candle>>,
}

/// `[time, open, high, low, close, vwap, volume, count]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Row")]
pub struct Candle {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub vwap: Decimal,
    pub volume: Decimal,
    pub count: u64,
}

impl TryFrom<Row> for Candle {
    type Error = String;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        Ok(Self {
            time: row.parse(0)?,
            open: row.parse(1)?,
            high: row.parse(2)?,
            low: row.parse(3)?,
            close: row.parse(4)?,
            vwap: row.parse(5)?,
            volume: row.parse(6)?,
            count: row.parse(7)?,
        })
    }
}

/// Order book snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct OrderbookData {
    pub asks: Vec<BookLevel>,
    pub bids: Vec<BookLevel>,
}

impl OrderbookData {
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|level| level.price)
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|level| level.price)
    }

    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()? - self.best_bid()?)
    }
}

/// `[price, volume, timestamp]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Row")]
pub struct BookLevel {
    pub price: Decimal,
    pub volume: Decimal,
    pub timestamp: i64,
}

impl TryFrom<Row> for BookLevel {
    type Error = String;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        Ok(Self {
            price: row.parse(0)?,
            volume: row.parse(1)?,
            timestamp: row.parse(2)?,
        })
    }
}

/// Recent trades for one pair
#[derive(Debug, Clone, Deserialize)]
pub struct RecentTrades {
    /// Cursor for the next poll
    pub last: String,
    #[serde(flatten)]
    pub trades: Dictionary<Vec<PublicTrade>>,
}

/// `[price, volume, time, side, order type, misc, trade id]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Row")]
pub struct PublicTrade {
    pub price: Decimal,
    pub volume: Decimal,
    pub time: f64,
    pub side: OrderSide,
    /// `m` for market, `l` for limit
    pub order_type: String,
    pub misc: String,
    pub trade_id: Option<u64>,
}

impl TryFrom<Row> for PublicTrade {
    type Error = String;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        let side = row.text(3)?;
        Ok(Self {
            price: row.parse(0)?,
            volume: row.parse(1)?,
            time: row.parse(2)?,
            side: OrderSide::from_code(side).ok_or_else(|| format!("unknown side {:?}", side))?,
            order_type: row.text(4)?.to_string(),
            misc: row.text(5)?.to_string(),
            trade_id: if row.len() > 6 { Some(row.parse(6)?) } else { None },
        })
    }
}

/// Recent spreads for one pair
#[derive(Debug, Clone, Deserialize)]
pub struct RecentSpreads {
    /// Cursor for the next poll
    pub last: i64,
    #[serde(flatten)]
    pub spreads: Dictionary<Vec<SpreadEntry>>,
}

/// `[time, bid, ask]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Row")]
pub struct SpreadEntry {
    pub time: i64,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl TryFrom<Row> for SpreadEntry {
    type Error = String;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        Ok(Self {
            time: row.parse(0)?,
            bid: row.parse(1)?,
            ask: row.parse(2)?,
        })
    }
}
