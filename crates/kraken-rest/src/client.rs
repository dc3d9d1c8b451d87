//! Main REST client implementation

use kraken_auth::{AuthError, Credentials};
use kraken_types::{CallBudgetConfig, Tier};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::call_counter::CallCounter;
use crate::dispatch::Dispatcher;
use crate::endpoint::Endpoint;
use crate::endpoints::*;
use crate::error::{RestError, RestResult};
use crate::request::{RequestBuilder, RequestContext};
use crate::transport::{ReqwestTransport, Transport};

/// Production REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.kraken.com";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("kraken-rest/", env!("CARGO_PKG_VERSION"));

/// Kraken REST API client
///
/// Hands out one [`RequestBuilder`] per call. Every builder shares the
/// client's transport, credentials and call counter, so a client (and its
/// clones) should be used for exactly one API key.
///
/// # Example
///
/// ```no_run
/// use kraken_rest::{ClientConfig, Credentials, KrakenRestClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Public endpoints only
///     let client = KrakenRestClient::new()?;
///     let ticker = client.get_ticker().pairs(["XBTUSD"]).send().await?;
///
///     // With authentication for private endpoints
///     let creds = Credentials::from_env()?;
///     let auth_client = KrakenRestClient::with_credentials(creds)?;
///     let methods = auth_client.get_deposit_methods().asset("ETH").send().await?;
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct KrakenRestClient {
    context: Arc<RequestContext>,
}

impl KrakenRestClient {
    /// Create a new client without authentication
    ///
    /// Only public endpoints will be available.
    pub fn new() -> RestResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with credentials
    ///
    /// All endpoints (public and private) will be available.
    pub fn with_credentials(credentials: Credentials) -> RestResult<Self> {
        Self::with_config(ClientConfig::new().with_credentials(credentials))
    }

    /// Create a client configured from the environment
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> RestResult<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> RestResult<Self> {
        let transport: Arc<dyn Transport> = match config.transport {
            Some(transport) => transport,
            None => {
                let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
                let transport = ReqwestTransport::new(config.timeout, user_agent)
                    .map_err(|e| RestError::Config(format!("HTTP client: {}", e)))?;
                Arc::new(transport)
            }
        };

        let mut context = RequestContext::new(config.base_url, Dispatcher::new(transport));
        if let Some(credentials) = config.credentials {
            context = context.with_credentials(Arc::new(credentials));
        }
        let counter = match (config.call_counter, config.call_budget) {
            (Some(shared), _) => Some(shared),
            (None, Some(budget)) => Some(Arc::new(CallCounter::new(budget))),
            (None, None) => None,
        };
        if let Some(counter) = counter {
            context = context.with_call_counter(counter);
        }

        info!(
            base_url = context.base_url(),
            authenticated = context.credentials().is_some(),
            throttled = context.call_counter().is_some(),
            "Created Kraken REST client"
        );

        Ok(Self {
            context: Arc::new(context),
        })
    }

    /// Check if the client has credentials for private endpoints
    pub fn has_credentials(&self) -> bool {
        self.context.credentials().is_some()
    }

    /// The call counter shared by this client's requests, if throttling is on
    pub fn call_counter(&self) -> Option<&Arc<CallCounter>> {
        self.context.call_counter()
    }

    pub fn base_url(&self) -> &str {
        self.context.base_url()
    }

    /// Builder for any endpoint, including ones declared outside this crate
    pub fn request<E: Endpoint>(&self) -> RequestBuilder<E> {
        RequestBuilder::new(Arc::clone(&self.context))
    }

    // ========================================================================
    // Public Market Endpoints
    // ========================================================================

    pub fn get_server_time(&self) -> RequestBuilder<Time> {
        self.request()
    }

    pub fn get_assets(&self) -> RequestBuilder<Assets> {
        self.request()
    }

    pub fn get_asset_pairs(&self) -> RequestBuilder<AssetPairs> {
        self.request()
    }

    pub fn get_ticker(&self) -> RequestBuilder<Ticker> {
        self.request()
    }

    pub fn get_ohlc(&self) -> RequestBuilder<Ohlc> {
        self.request()
    }

    pub fn get_orderbook(&self) -> RequestBuilder<Depth> {
        self.request()
    }

    pub fn get_recent_trades(&self) -> RequestBuilder<Trades> {
        self.request()
    }

    pub fn get_recent_spreads(&self) -> RequestBuilder<Spread> {
        self.request()
    }

    // ========================================================================
    // Private Account Endpoints
    // ========================================================================

    pub fn get_balance(&self) -> RequestBuilder<Balance> {
        self.request()
    }

    pub fn get_trade_balance(&self) -> RequestBuilder<TradeBalance> {
        self.request()
    }

    pub fn get_open_orders(&self) -> RequestBuilder<OpenOrders> {
        self.request()
    }

    pub fn get_closed_orders(&self) -> RequestBuilder<ClosedOrders> {
        self.request()
    }

    pub fn query_orders(&self) -> RequestBuilder<QueryOrders> {
        self.request()
    }

    pub fn get_trades_history(&self) -> RequestBuilder<TradesHistory> {
        self.request()
    }

    pub fn query_trades(&self) -> RequestBuilder<QueryTrades> {
        self.request()
    }

    pub fn get_open_positions(&self) -> RequestBuilder<OpenPositions> {
        self.request()
    }

    pub fn get_ledgers(&self) -> RequestBuilder<Ledgers> {
        self.request()
    }

    pub fn query_ledgers(&self) -> RequestBuilder<QueryLedgers> {
        self.request()
    }

    pub fn get_trade_volume(&self) -> RequestBuilder<TradeVolume> {
        self.request()
    }

    pub fn get_websockets_token(&self) -> RequestBuilder<GetWebSocketsToken> {
        self.request()
    }

    // ========================================================================
    // Private Trading Endpoints
    // ========================================================================

    pub fn add_order(&self) -> RequestBuilder<AddOrder> {
        self.request()
    }

    pub fn cancel_order(&self) -> RequestBuilder<CancelOrder> {
        self.request()
    }

    // ========================================================================
    // Private Funding Endpoints
    // ========================================================================

    pub fn get_deposit_methods(&self) -> RequestBuilder<DepositMethods> {
        self.request()
    }

    pub fn get_deposit_addresses(&self) -> RequestBuilder<DepositAddresses> {
        self.request()
    }

    pub fn get_deposit_status(&self) -> RequestBuilder<DepositStatus> {
        self.request()
    }

    pub fn get_withdraw_info(&self) -> RequestBuilder<WithdrawInfo> {
        self.request()
    }

    pub fn withdraw(&self) -> RequestBuilder<Withdraw> {
        self.request()
    }

    pub fn get_withdraw_status(&self) -> RequestBuilder<WithdrawStatus> {
        self.request()
    }

    pub fn cancel_withdrawal(&self) -> RequestBuilder<WithdrawCancel> {
        self.request()
    }
}

impl std::fmt::Debug for KrakenRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KrakenRestClient")
            .field("base_url", &self.base_url())
            .field("has_credentials", &self.has_credentials())
            .finish()
    }
}

/// Client configuration
#[derive(Clone)]
pub struct ClientConfig {
    /// API credentials (optional)
    pub credentials: Option<Credentials>,
    /// Request timeout, applied by the default transport
    pub timeout: Duration,
    /// Custom user agent
    pub user_agent: Option<String>,
    /// API root, without a trailing path
    pub base_url: String,
    /// Call-counter limits; `None` disables throttling
    pub call_budget: Option<CallBudgetConfig>,
    /// Counter shared with other clients of the same API key; wins over
    /// `call_budget`
    pub call_counter: Option<Arc<CallCounter>>,
    /// Custom transport; the timeout and user agent are ignored when set
    pub transport: Option<Arc<dyn Transport>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            call_budget: Some(Tier::default().config()),
            call_counter: None,
            transport: None,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the environment
    ///
    /// * `KRAKEN_API_KEY` / `KRAKEN_PRIVATE_KEY` - credentials; both or neither
    /// * `KRAKEN_API_URL` - base URL override
    /// * `KRAKEN_TIER` - `starter`, `intermediate` or `pro`
    pub fn from_env() -> RestResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RestResult<Self> {
        let mut config = Self::new();

        match (lookup("KRAKEN_API_KEY"), lookup("KRAKEN_PRIVATE_KEY")) {
            (Some(key), Some(secret)) => {
                config = config.with_credentials(Credentials::new(key, secret)?);
            }
            (Some(_), None) => {
                return Err(AuthError::EnvVarNotSet("KRAKEN_PRIVATE_KEY".to_string()).into())
            }
            (None, Some(_)) => {
                return Err(AuthError::EnvVarNotSet("KRAKEN_API_KEY".to_string()).into())
            }
            (None, None) => {}
        }

        if let Some(url) = lookup("KRAKEN_API_URL") {
            config = config.with_base_url(url);
        }

        if let Some(tier) = lookup("KRAKEN_TIER") {
            let tier: Tier = tier
                .parse()
                .map_err(|e| RestError::Config(format!("KRAKEN_TIER: {}", e)))?;
            config = config.with_tier(tier);
        }

        Ok(config)
    }

    /// Set credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Point the client at another API root, e.g. a sandbox
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Throttle with the limits of a verification tier
    pub fn with_tier(self, tier: Tier) -> Self {
        self.with_call_budget(tier.config())
    }

    /// Throttle with custom limits
    pub fn with_call_budget(mut self, budget: CallBudgetConfig) -> Self {
        self.call_budget = Some(budget);
        self
    }

    /// Share an existing call counter
    pub fn with_call_counter(mut self, counter: Arc<CallCounter>) -> Self {
        self.call_counter = Some(counter);
        self
    }

    /// Disable client-side throttling
    pub fn without_throttle(mut self) -> Self {
        self.call_budget = None;
        self.call_counter = None;
        self
    }

    /// Use a custom transport
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("base_url", &self.base_url)
            .field("call_budget", &self.call_budget)
            .field("shared_counter", &self.call_counter.is_some())
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}
