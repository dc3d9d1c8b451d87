//! Funding endpoints for deposits and withdrawals
//!
//! These endpoints require authentication.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::fmt;

use crate::request::RequestBuilder;
use crate::types::de;

endpoint! {
    /// Deposit methods available for an asset
    DepositMethods: Post "/0/private/DepositMethods", weight 1, Private => Vec<DepositMethod>
}

endpoint! {
    DepositAddresses: Post "/0/private/DepositAddresses", weight 1, Private => Vec<DepositAddress>
}

endpoint! {
    /// Status of recent deposits
    DepositStatus: Post "/0/private/DepositStatus", weight 1, Private => Vec<DepositRecord>
}

endpoint! {
    /// Fee and limit for a prospective withdrawal
    WithdrawInfo: Post "/0/private/WithdrawInfo", weight 1, Private => WithdrawalInfo
}

endpoint! {
    /// Withdraw to a pre-configured withdrawal key
    Withdraw: Post "/0/private/Withdraw", weight 1, Private => WithdrawResult
}

endpoint! {
    /// Status of recent withdrawals
    WithdrawStatus: Post "/0/private/WithdrawStatus", weight 1, Private => Vec<WithdrawalRecord>
}

endpoint! {
    /// Cancel a withdrawal that has not been processed yet
    WithdrawCancel: Post "/0/private/WithdrawCancel", weight 1, Private => bool
}

impl RequestBuilder<DepositMethods> {
    pub fn asset(self, asset: &str) -> Self {
        self.param("asset", asset)
    }
}

impl RequestBuilder<DepositAddresses> {
    pub fn asset(self, asset: &str) -> Self {
        self.param("asset", asset)
    }

    /// Name of the deposit method, from `DepositMethods`
    pub fn method(self, method: &str) -> Self {
        self.param("method", method)
    }

    /// Generate a new address
    pub fn new_address(self, new: bool) -> Self {
        self.param_flag("new", new)
    }
}

impl RequestBuilder<DepositStatus> {
    pub fn asset(self, asset: &str) -> Self {
        self.param("asset", asset)
    }

    pub fn method(self, method: &str) -> Self {
        self.param("method", method)
    }
}

impl RequestBuilder<WithdrawInfo> {
    pub fn asset(self, asset: &str) -> Self {
        self.param("asset", asset)
    }

    /// Withdrawal key name, as set up on the account
    pub fn key(self, key: &str) -> Self {
        self.param("key", key)
    }

    pub fn amount(self, amount: Decimal) -> Self {
        self.param("amount", amount.normalize())
    }
}

impl RequestBuilder<Withdraw> {
    pub fn asset(self, asset: &str) -> Self {
        self.param("asset", asset)
    }

    pub fn key(self, key: &str) -> Self {
        self.param("key", key)
    }

    pub fn amount(self, amount: Decimal) -> Self {
        self.param("amount", amount.normalize())
    }
}

impl RequestBuilder<WithdrawStatus> {
    pub fn asset(self, asset: &str) -> Self {
        self.param("asset", asset)
    }

    pub fn method(self, method: &str) -> Self {
        self.param("method", method)
    }
}

impl RequestBuilder<WithdrawCancel> {
    pub fn asset(self, asset: &str) -> Self {
        self.param("asset", asset)
    }

    /// Reference id of the withdrawal, from `Withdraw`
    pub fn refid(self, refid: &str) -> Self {
        self.param("refid", refid)
    }
}

/// Maximum net amount that can be deposited right now
///
/// Kraken sends `false` when there is no limit, sometimes as a JSON boolean
/// and sometimes as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepositLimit {
    #[default]
    Unlimited,
    Amount(Decimal),
}

impl DepositLimit {
    pub fn is_limited(&self) -> bool {
        matches!(self, Self::Amount(_))
    }

    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Self::Unlimited => None,
            Self::Amount(amount) => Some(*amount),
        }
    }
}

impl fmt::Display for DepositLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("false"),
            Self::Amount(amount) => write!(f, "{}", amount),
        }
    }
}

impl<'de> Deserialize<'de> for DepositLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum LimitLike {
            Flag(bool),
            Amount(Decimal),
            Text(String),
        }

        match LimitLike::deserialize(deserializer)? {
            LimitLike::Flag(false) => Ok(Self::Unlimited),
            LimitLike::Flag(true) => Err(serde::de::Error::custom(
                "deposit limit `true` carries no amount",
            )),
            LimitLike::Amount(amount) => Ok(Self::Amount(amount)),
            LimitLike::Text(text) if text.trim().eq_ignore_ascii_case("false") => {
                Ok(Self::Unlimited)
            }
            LimitLike::Text(text) => Err(serde::de::Error::custom(format!(
                "invalid deposit limit {:?}",
                text
            ))),
        }
    }
}

/// Deposit method for an asset
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DepositMethod {
    /// Method name
    pub method: String,
    #[serde(default)]
    pub limit: DepositLimit,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub fee: Option<Decimal>,
    #[serde(rename = "address-setup-fee", default, deserialize_with = "de::opt_decimal")]
    pub address_setup_fee: Option<Decimal>,
    /// Whether new addresses can be generated for this method
    #[serde(rename = "gen-address", default, deserialize_with = "de::bool_from_any")]
    pub gen_address: bool,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub minimum: Option<Decimal>,
}

/// Deposit address
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DepositAddress {
    pub address: String,
    /// Expiration time, `0` if it does not expire
    #[serde(default)]
    pub expiretm: String,
    #[serde(default)]
    pub new: bool,
    pub tag: Option<String>,
    pub memo: Option<String>,
}

/// Deposit or withdrawal status entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferRecord {
    pub method: String,
    pub aclass: String,
    pub asset: String,
    pub refid: String,
    pub txid: String,
    /// Address or account info
    pub info: String,
    pub amount: Decimal,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub fee: Option<Decimal>,
    /// Unix timestamp
    pub time: i64,
    /// `Initial`, `Pending`, `Settled`, `Success` or `Failure`
    pub status: String,
    /// Extra status, e.g. `return` or `onhold`
    #[serde(rename = "status-prop")]
    pub status_prop: Option<String>,
}

/// Recent deposit
pub type DepositRecord = TransferRecord;

/// Recent withdrawal
pub type WithdrawalRecord = TransferRecord;

/// Fee and limit for a prospective withdrawal
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WithdrawalInfo {
    pub method: String,
    /// Maximum net amount that can be withdrawn right now
    pub limit: Decimal,
    /// Net amount that will be sent, after fees
    pub amount: Decimal,
    pub fee: Decimal,
}

/// Result of `Withdraw`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WithdrawResult {
    /// Reference id, used by `WithdrawStatus` and `WithdrawCancel`
    pub refid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn method(json: &str) -> DepositMethod {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_limit_false_variants() {
        let boolean = method(r#"{"method":"Ether (Hex)","limit":false,"fee":"0.0000000000","gen-address":true}"#);
        let text = method(r#"{"method":"Ether (Hex)","limit":"false","fee":"0.0000000000","gen-address":"true"}"#);

        for parsed in [&boolean, &text] {
            assert_eq!(parsed.limit, DepositLimit::Unlimited);
            assert_eq!(parsed.limit.to_string(), "false");
            assert!(!parsed.limit.is_limited());
            assert!(parsed.gen_address);
            assert_eq!(parsed.fee, Some(Decimal::ZERO));
        }
    }

    #[test]
    fn test_limit_amount() {
        let from_text = method(r#"{"method":"Bitcoin","limit":"25.5","gen-address":false}"#);
        let from_number = method(r#"{"method":"Bitcoin","limit":25.5,"gen-address":"false"}"#);

        assert_eq!(from_text.limit, DepositLimit::Amount(dec!(25.5)));
        assert_eq!(from_number.limit.amount(), Some(dec!(25.5)));
        assert!(!from_text.gen_address);
        assert!(!from_number.gen_address);
    }

    #[test]
    fn test_limit_rejects_garbage() {
        let result = serde_json::from_str::<DepositMethod>(r#"{"method":"x","limit":"lots"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_address_setup_fee_and_minimum() {
        let parsed = method(
            r#"{"method":"Bitcoin Lightning","limit":false,"fee":"0.0000000000","address-setup-fee":"0.0001","minimum":"0.00001","gen-address":true}"#,
        );
        assert_eq!(parsed.address_setup_fee, Some(dec!(0.0001)));
        assert_eq!(parsed.minimum, Some(dec!(0.00001)));
    }

    #[test]
    fn test_transfer_record() {
        let records: Vec<DepositRecord> = serde_json::from_str(
            r#"[{"method":"Bitcoin","aclass":"currency","asset":"XXBT","refid":"FTQcuak-V6Za8qrWnhzTx67yYHz8Tg",
                 "txid":"6544b41b607d8b2512baf801755a3a87b6890eacdb451be8a94059fb11f0a8d9",
                 "info":"2Myd4eaAW96ojk38A2uDK4FbioCayvkEgVq","amount":"0.78125000","fee":"0.0000000000",
                 "time":1688992722,"status":"Success","status-prop":"return"}]"#,
        )
        .unwrap();
        assert_eq!(records[0].amount, dec!(0.78125));
        assert_eq!(records[0].status_prop.as_deref(), Some("return"));
    }
}
