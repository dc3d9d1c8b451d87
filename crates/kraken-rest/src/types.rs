//! Types shared across REST endpoints

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Kraken response envelope
///
/// The `result` is kept as raw JSON until the error array has been checked;
/// only then is it decoded into the endpoint's output type.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    /// Error messages (empty if successful)
    #[serde(default)]
    pub error: Vec<String>,
    /// Result data (present if successful)
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl ApiResponse {
    /// Check if the response indicates success
    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

/// Result keyed by asset, pair, order id or ledger id
pub type Dictionary<T> = HashMap<String, T>;

/// Lenient decoders for fields Kraken encodes inconsistently
pub mod de {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    /// Accept `true`, `"true"`, `1` and their negatives as a bool
    pub fn bool_from_any<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match BoolLike::deserialize(deserializer)? {
            BoolLike::Bool(value) => Ok(value),
            BoolLike::Int(value) => Ok(value != 0),
            BoolLike::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" | "" => Ok(false),
                other => Err(serde::de::Error::custom(format!(
                    "expected a boolean, got {:?}",
                    other
                ))),
            },
        }
    }

    /// Optional decimal where Kraken sends `""` for "not set"
    pub fn opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum DecimalLike {
            Value(Decimal),
            Text(String),
        }

        match Option::<DecimalLike>::deserialize(deserializer)? {
            None => Ok(None),
            Some(DecimalLike::Value(value)) => Ok(Some(value)),
            Some(DecimalLike::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(DecimalLike::Text(text)) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// Decode the one-letter side used in trade arrays (`b`/`s`)
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "b" | "buy" => Some(Self::Buy),
            "s" | "sell" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    TakeProfit,
    StopLossLimit,
    TakeProfitLimit,
    TrailingStop,
    TrailingStopLimit,
    SettlePosition,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
            Self::StopLoss => "stop-loss",
            Self::TakeProfit => "take-profit",
            Self::StopLossLimit => "stop-loss-limit",
            Self::TakeProfitLimit => "take-profit-limit",
            Self::TrailingStop => "trailing-stop",
            Self::TrailingStopLimit => "trailing-stop-limit",
            Self::SettlePosition => "settle-position",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Market,
            Self::Limit,
            Self::StopLoss,
            Self::TakeProfit,
            Self::StopLossLimit,
            Self::TakeProfitLimit,
            Self::TrailingStop,
            Self::TrailingStopLimit,
            Self::SettlePosition,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
        .ok_or_else(|| format!("unknown order type: {}", s))
    }
}

/// Time in force for orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till cancelled
    #[serde(rename = "GTC")]
    GoodTillCancelled,
    /// Immediate or cancel
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    /// Good till date; needs `expiretm`
    #[serde(rename = "GTD")]
    GoodTillDate,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoodTillCancelled => "GTC",
            Self::ImmediateOrCancel => "IOC",
            Self::GoodTillDate => "GTD",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order flags, sent comma-separated in `oflags`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderFlag {
    /// Post-only order (maker only)
    PostOnly,
    /// Fee in base currency
    FeeInBase,
    /// Fee in quote currency
    FeeInQuote,
    /// Disable market price protection
    NoMarketPriceProtection,
    /// Order volume in quote currency
    VolumeInQuote,
}

impl OrderFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostOnly => "post",
            Self::FeeInBase => "fcib",
            Self::FeeInQuote => "fciq",
            Self::NoMarketPriceProtection => "nompp",
            Self::VolumeInQuote => "viqc",
        }
    }
}

impl fmt::Display for OrderFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which timestamp `ClosedOrders` filters on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseTime {
    Open,
    Close,
    #[default]
    Both,
}

impl CloseTime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Both => "both",
        }
    }
}

/// Ledger entry category filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerType {
    #[default]
    All,
    Deposit,
    Withdrawal,
    Trade,
    Margin,
}

impl LedgerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Trade => "trade",
            Self::Margin => "margin",
        }
    }
}

/// Trade category filter for `TradesHistory`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradeType {
    #[default]
    All,
    AnyPosition,
    ClosedPosition,
    ClosingPosition,
    NoPosition,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::AnyPosition => "any position",
            Self::ClosedPosition => "closed position",
            Self::ClosingPosition => "closing position",
            Self::NoPosition => "no position",
        }
    }
}

/// One positional row as Kraken sends it, e.g. a trade or a candle
///
/// Rows mix numbers and strings freely; every cell is kept as text and parsed
/// on demand. Row types decode through `#[serde(try_from = "Row")]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row(Vec<String>);

impl Row {
    /// Number of cells
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw text of a cell
    pub fn text(&self, idx: usize) -> Result<&str, String> {
        self.0
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| format!("row has no column {}", idx))
    }

    /// Parse a cell
    pub fn parse<T>(&self, idx: usize) -> Result<T, String>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let text = self.text(idx)?;
        text.parse()
            .map_err(|e| format!("column {} ({:?}): {}", idx, text, e))
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cells = Vec::<serde_json::Value>::deserialize(deserializer)?;
        Ok(Self(
            cells
                .into_iter()
                .map(|cell| match cell {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[derive(Debug, Deserialize)]
    struct Flags {
        #[serde(deserialize_with = "de::bool_from_any")]
        flag: bool,
        #[serde(default, deserialize_with = "de::opt_decimal")]
        amount: Option<Decimal>,
    }

    fn flags(json: &str) -> Flags {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_bool_from_any() {
        assert!(flags(r#"{"flag":true}"#).flag);
        assert!(flags(r#"{"flag":"true"}"#).flag);
        assert!(flags(r#"{"flag":1}"#).flag);
        assert!(!flags(r#"{"flag":"false"}"#).flag);
        assert!(!flags(r#"{"flag":0}"#).flag);
        assert!(serde_json::from_str::<Flags>(r#"{"flag":"maybe"}"#).is_err());
    }

    #[test]
    fn test_opt_decimal() {
        assert_eq!(flags(r#"{"flag":true,"amount":"1.25"}"#).amount, Some(dec!(1.25)));
        assert_eq!(flags(r#"{"flag":true,"amount":0.5}"#).amount, Some(dec!(0.5)));
        assert_eq!(flags(r#"{"flag":true,"amount":""}"#).amount, None);
        assert_eq!(flags(r#"{"flag":true,"amount":null}"#).amount, None);
        assert_eq!(flags(r#"{"flag":true}"#).amount, None);
    }

    #[test]
    fn test_envelope_defaults() {
        let envelope: ApiResponse = serde_json::from_str(r#"{"result":1}"#).unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.result, Some(serde_json::json!(1)));
    }

    #[test]
    fn test_row_cells() {
        let row: Row = serde_json::from_str(r#"["30243.40000",1688669448.4523,"b",7]"#).unwrap();
        assert_eq!(row.len(), 4);
        assert_eq!(row.parse::<Decimal>(0), Ok(dec!(30243.40000)));
        assert_eq!(row.parse::<u64>(3), Ok(7));
        assert_eq!(row.text(2), Ok("b"));
        assert!(row.text(4).is_err());
        assert!(row.parse::<u64>(2).is_err());
    }

    #[test]
    fn test_order_type_names() {
        assert_eq!(OrderType::StopLossLimit.to_string(), "stop-loss-limit");
        assert_eq!("take-profit".parse::<OrderType>(), Ok(OrderType::TakeProfit));
        assert!("moon".parse::<OrderType>().is_err());
        assert_eq!(OrderSide::from_code("s"), Some(OrderSide::Sell));
        assert_eq!(TradeType::NoPosition.as_str(), "no position");
    }
}
