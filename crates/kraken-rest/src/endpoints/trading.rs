//! Order placement and cancellation
//!
//! These endpoints require authentication. They are not metered by the call
//! counter; Kraken applies a separate per-pair order rate limit to them.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::request::RequestBuilder;
use crate::types::{OrderFlag, OrderSide, OrderType, TimeInForce};

endpoint! {
    /// Place a new order
    AddOrder: Post "/0/private/AddOrder", weight 0, Private => AddOrderResult
}

endpoint! {
    /// Cancel an open order by transaction id or user reference
    CancelOrder: Post "/0/private/CancelOrder", weight 0, Private => CancelOrderResult
}

impl RequestBuilder<AddOrder> {
    /// Shorthand for a market order
    pub fn market(self, pair: &str, side: OrderSide, volume: Decimal) -> Self {
        self.order_type(OrderType::Market)
            .pair(pair)
            .side(side)
            .volume(volume)
    }

    /// Shorthand for a limit order
    pub fn limit(self, pair: &str, side: OrderSide, volume: Decimal, price: Decimal) -> Self {
        self.order_type(OrderType::Limit)
            .pair(pair)
            .price(price)
            .side(side)
            .volume(volume)
    }

    pub fn pair(self, pair: &str) -> Self {
        self.param("pair", pair)
    }

    pub fn side(self, side: OrderSide) -> Self {
        self.param("type", side.as_str())
    }

    pub fn order_type(self, order_type: OrderType) -> Self {
        self.param("ordertype", order_type.as_str())
    }

    /// Order volume in base currency
    pub fn volume(self, volume: Decimal) -> Self {
        self.param("volume", volume.normalize())
    }

    /// Limit price, or trigger price for stop/take-profit orders
    pub fn price(self, price: Decimal) -> Self {
        self.param("price", price.normalize())
    }

    /// Limit price for stop-loss-limit and take-profit-limit orders
    pub fn price2(self, price2: Decimal) -> Self {
        self.param("price2", price2.normalize())
    }

    /// Amount of leverage, e.g. `"2:1"`
    pub fn leverage(self, leverage: &str) -> Self {
        self.param("leverage", leverage)
    }

    pub fn flags<I>(self, flags: I) -> Self
    where
        I: IntoIterator<Item = OrderFlag>,
    {
        self.param_list("oflags", flags.into_iter().map(|flag| flag.as_str()))
    }

    pub fn time_in_force(self, time_in_force: TimeInForce) -> Self {
        self.param("timeinforce", time_in_force.as_str())
    }

    /// Scheduled start: `0` (now), `+<n>` seconds from now, or a Unix timestamp
    pub fn start_time(self, starttm: &str) -> Self {
        self.param("starttm", starttm)
    }

    /// Expiration: `0` (none), `+<n>` seconds from now, or a Unix timestamp
    pub fn expire_time(self, expiretm: &str) -> Self {
        self.param("expiretm", expiretm)
    }

    pub fn userref(self, userref: i64) -> Self {
        self.param("userref", userref)
    }

    /// Validate inputs only; do not submit the order
    pub fn validate(self, validate: bool) -> Self {
        self.param_flag("validate", validate)
    }

    /// Conditional close order, placed when this order fills
    pub fn close(self, order_type: OrderType, price: Decimal, price2: Option<Decimal>) -> Self {
        let builder = self
            .param("close[ordertype]", order_type.as_str())
            .param("close[price]", price.normalize());
        match price2 {
            Some(price2) => builder.param("close[price2]", price2.normalize()),
            None => builder,
        }
    }
}

impl RequestBuilder<CancelOrder> {
    /// Transaction id or user reference of the order(s) to cancel
    pub fn txid(self, txid: impl ToString) -> Self {
        self.param("txid", txid)
    }
}

/// Result of `AddOrder`
#[derive(Debug, Clone, Deserialize)]
pub struct AddOrderResult {
    pub descr: AddOrderDescription,
    /// Transaction ids; empty when only validating
    #[serde(default)]
    pub txid: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddOrderDescription {
    pub order: String,
    /// Conditional close order description, if any
    pub close: Option<String>,
}

/// Result of `CancelOrder`
#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderResult {
    /// Number of orders cancelled
    pub count: u32,
    /// Whether cancellation is pending
    pub pending: Option<bool>,
}
