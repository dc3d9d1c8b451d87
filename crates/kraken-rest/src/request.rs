//! Request construction and the dispatch pipeline
//!
//! A call goes through three stages:
//!
//! 1. [`RequestBuilder`] collects parameters into an immutable
//!    [`RequestDescriptor`]. Each `send`/`enqueue` snapshots the builder, so
//!    later setter calls never leak into a call already in flight.
//! 2. [`RequestContext::execute`] checks credentials, waits on the call
//!    counter, then prepares the wire request. For private endpoints the nonce
//!    is drawn only after the wait, so it is as fresh as possible when the
//!    request leaves.
//! 3. The [`Dispatcher`] sends it and decodes the envelope.

use kraken_auth::{Credentials, RequestSigner};
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::call_counter::CallCounter;
use crate::dispatch::Dispatcher;
use crate::endpoint::{Endpoint, Visibility};
use crate::error::{RestError, RestResult};
use crate::handle::RequestHandle;
use crate::transport::{HttpMethod, HttpRequest};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Throttle waits longer than this are logged at warn level
const SLOW_THROTTLE: Duration = Duration::from_secs(1);

/// Everything needed to perform one call, frozen at send time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    name: &'static str,
    method: HttpMethod,
    path: String,
    visibility: Visibility,
    weight: u32,
    params: Vec<(String, String)>,
}

impl RequestDescriptor {
    /// Descriptor for an endpoint type with no parameters yet
    pub fn for_endpoint<E: Endpoint>() -> Self {
        Self {
            name: E::NAME,
            method: E::METHOD,
            path: E::PATH.to_string(),
            visibility: E::VISIBILITY,
            weight: E::WEIGHT,
            params: Vec::new(),
        }
    }

    /// Set a parameter, replacing any earlier value under the same key
    ///
    /// Parameters keep their insertion order on the wire.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_param(key.into(), value.into());
        self
    }

    fn set_param(&mut self, key: String, value: String) {
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }

    /// Call-counter cost; 0 means unmetered
    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Look up a parameter value
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Shared state every request of one client runs against
pub struct RequestContext {
    base_url: String,
    credentials: Option<Arc<Credentials>>,
    call_counter: Option<Arc<CallCounter>>,
    dispatcher: Dispatcher,
}

impl RequestContext {
    /// Create a context with no credentials and no throttling
    pub fn new(base_url: impl Into<String>, dispatcher: Dispatcher) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            credentials: None,
            call_counter: None,
            dispatcher,
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<Credentials>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_call_counter(mut self, call_counter: Arc<CallCounter>) -> Self {
        self.call_counter = Some(call_counter);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> Option<&Arc<Credentials>> {
        self.credentials.as_ref()
    }

    pub fn call_counter(&self) -> Option<&Arc<CallCounter>> {
        self.call_counter.as_ref()
    }

    /// Run one call end to end
    ///
    /// `throttle_timeout` bounds the wait on the call counter only; the HTTP
    /// exchange itself is bounded by the transport.
    #[instrument(
        skip(self, descriptor, throttle_timeout),
        fields(endpoint = descriptor.name(), weight = descriptor.weight())
    )]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
        throttle_timeout: Option<Duration>,
    ) -> RestResult<T> {
        if descriptor.is_private() && self.credentials.is_none() {
            return Err(RestError::AuthRequired);
        }

        if descriptor.weight() > 0 {
            if let Some(counter) = &self.call_counter {
                let waited = counter
                    .acquire_within(descriptor.weight(), throttle_timeout)
                    .await?;
                if waited > SLOW_THROTTLE {
                    warn!(waited_ms = waited.as_millis() as u64, "Call throttled");
                }
            }
        }

        let request = self.prepare(&descriptor)?;
        debug!(method = %request.method, path = descriptor.path(), "Dispatching request");
        self.dispatcher.dispatch(request).await
    }

    /// Turn a descriptor into a wire request
    ///
    /// Private requests draw a nonce, put it first in the form body and sign
    /// that exact body. A caller-supplied `nonce` parameter is ignored.
    pub fn prepare(&self, descriptor: &RequestDescriptor) -> RestResult<HttpRequest> {
        let url = format!("{}{}", self.base_url, descriptor.path());

        match descriptor.visibility() {
            Visibility::Private => {
                let credentials = self.credentials.as_deref().ok_or(RestError::AuthRequired)?;
                let signer = RequestSigner::new(credentials, descriptor.path());
                let nonce = signer.nonce().to_string();

                let mut fields: Vec<(&str, &str)> = Vec::with_capacity(descriptor.params().len() + 1);
                fields.push(("nonce", nonce.as_str()));
                fields.extend(
                    descriptor
                        .params()
                        .iter()
                        .filter(|(key, _)| key != "nonce")
                        .map(|(key, value)| (key.as_str(), value.as_str())),
                );
                let body = encode(&fields)?;
                let signature = signer.sign(&body)?;

                Ok(HttpRequest {
                    method: descriptor.method(),
                    url,
                    headers: vec![
                        ("API-Key".to_string(), signer.api_key().to_string()),
                        ("API-Sign".to_string(), signature),
                        ("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()),
                    ],
                    body: Some(body),
                })
            }
            Visibility::Public => {
                let query = encode(descriptor.params())?;
                match descriptor.method() {
                    HttpMethod::Get => Ok(HttpRequest {
                        method: HttpMethod::Get,
                        url: if query.is_empty() {
                            url
                        } else {
                            format!("{}?{}", url, query)
                        },
                        headers: Vec::new(),
                        body: None,
                    }),
                    HttpMethod::Post => Ok(HttpRequest {
                        method: HttpMethod::Post,
                        url,
                        headers: vec![("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string())],
                        body: Some(query),
                    }),
                }
            }
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("base_url", &self.base_url)
            .field("has_credentials", &self.credentials.is_some())
            .field("throttled", &self.call_counter.is_some())
            .finish()
    }
}

fn encode<T: serde::Serialize + ?Sized>(fields: &T) -> RestResult<String> {
    serde_urlencoded::to_string(fields).map_err(|e| RestError::InvalidParameter(e.to_string()))
}

/// Fluent builder for one endpoint
///
/// Generic setters ([`param`](Self::param) and friends) work for every
/// endpoint; typed setters for known parameters are provided per endpoint in
/// [`crate::endpoints`]. Setters only shape the request: values the exchange
/// rejects come back as [`RestError::Api`].
///
/// The builder can be sent any number of times. Each send works on a
/// snapshot, so changing a parameter and sending again leaves earlier calls
/// untouched.
pub struct RequestBuilder<E: Endpoint> {
    context: Arc<RequestContext>,
    descriptor: RequestDescriptor,
    throttle_timeout: Option<Duration>,
    endpoint: PhantomData<fn() -> E>,
}

impl<E: Endpoint> RequestBuilder<E> {
    pub fn new(context: Arc<RequestContext>) -> Self {
        Self {
            context,
            descriptor: RequestDescriptor::for_endpoint::<E>(),
            throttle_timeout: None,
            endpoint: PhantomData,
        }
    }

    /// Set a raw parameter, replacing any earlier value under the same key
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.descriptor.set_param(key.into(), value.to_string());
        self
    }

    /// Set a list parameter, sent comma-separated
    pub fn param_list<I, S>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|value| value.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.param(key, joined)
    }

    /// Set a boolean parameter, sent as `true`/`false`
    pub fn param_flag(self, key: impl Into<String>, value: bool) -> Self {
        self.param(key, value)
    }

    /// Give up if the call counter has not granted the call within `bound`
    pub fn throttle_timeout(mut self, bound: Duration) -> Self {
        self.throttle_timeout = Some(bound);
        self
    }

    /// Current value of a parameter
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.descriptor.param(key)
    }

    /// Snapshot of the request as it would be sent now
    pub fn descriptor(&self) -> RequestDescriptor {
        self.descriptor.clone()
    }

    /// Perform the call and wait for its result
    pub async fn send(&self) -> RestResult<E::Output> {
        self.context
            .execute(self.descriptor(), self.throttle_timeout)
            .await
    }

    /// Start the call in the background
    ///
    /// The returned handle resolves to the same result [`send`](Self::send)
    /// would; see [`RequestHandle`] for timeouts and cancellation. Requires a
    /// tokio runtime; outside one the handle resolves to
    /// [`RestError::Config`].
    pub fn enqueue(&self) -> RequestHandle<E::Output> {
        let context = Arc::clone(&self.context);
        let descriptor = self.descriptor();
        let throttle_timeout = self.throttle_timeout;

        RequestHandle::spawn(async move { context.execute(descriptor, throttle_timeout).await })
    }
}

impl<E: Endpoint> Clone for RequestBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            descriptor: self.descriptor.clone(),
            throttle_timeout: self.throttle_timeout,
            endpoint: PhantomData,
        }
    }
}

impl<E: Endpoint> fmt::Debug for RequestBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("endpoint", &E::NAME)
            .field("params", &self.descriptor.params())
            .field("throttle_timeout", &self.throttle_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use kraken_auth::IncreasingNonce;
    use kraken_types::CallBudgetConfig;
    use serde_json::Value;

    const SECRET: &str =
        "kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==";

    struct PublicThing;

    impl Endpoint for PublicThing {
        type Output = Value;
        const NAME: &'static str = "PublicThing";
        const METHOD: HttpMethod = HttpMethod::Get;
        const PATH: &'static str = "/0/public/Thing";
        const WEIGHT: u32 = 1;
        const VISIBILITY: Visibility = Visibility::Public;
    }

    struct PrivateThing;

    impl Endpoint for PrivateThing {
        type Output = Value;
        const NAME: &'static str = "PrivateThing";
        const METHOD: HttpMethod = HttpMethod::Post;
        const PATH: &'static str = "/0/private/Thing";
        const WEIGHT: u32 = 2;
        const VISIBILITY: Visibility = Visibility::Private;
    }

    fn context(transport: Arc<MockTransport>) -> RequestContext {
        RequestContext::new("https://mock.test/", Dispatcher::new(transport))
    }

    fn credentials() -> Arc<Credentials> {
        Arc::new(Credentials::new("test-key", SECRET).unwrap())
    }

    fn form(body: &str) -> Vec<(String, String)> {
        serde_urlencoded::from_str(body).unwrap()
    }

    #[test]
    fn test_descriptor_replaces_in_place() {
        let descriptor = RequestDescriptor::for_endpoint::<PublicThing>()
            .with_param("pair", "XBTUSD")
            .with_param("count", "10")
            .with_param("pair", "ETHUSD");

        assert_eq!(
            descriptor.params(),
            [
                ("pair".to_string(), "ETHUSD".to_string()),
                ("count".to_string(), "10".to_string())
            ]
        );
        assert_eq!(descriptor.weight(), 1);
        assert!(!descriptor.is_private());
    }

    #[test]
    fn test_public_get_has_query_and_no_auth() {
        let ctx = context(Arc::new(MockTransport::new())).with_credentials(credentials());
        let descriptor = RequestDescriptor::for_endpoint::<PublicThing>()
            .with_param("pair", "XBT/USD")
            .with_param("info", "fees");

        let request = ctx.prepare(&descriptor).unwrap();

        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.url, "https://mock.test/0/public/Thing?pair=XBT%2FUSD&info=fees");
        assert_eq!(request.body, None);
        assert_eq!(request.header("API-Key"), None);
        assert_eq!(request.header("API-Sign"), None);
        assert!(!request.url.contains("nonce"));
    }

    #[test]
    fn test_public_get_without_params_has_bare_url() {
        let ctx = context(Arc::new(MockTransport::new()));
        let request = ctx
            .prepare(&RequestDescriptor::for_endpoint::<PublicThing>())
            .unwrap();
        assert_eq!(request.url, "https://mock.test/0/public/Thing");
    }

    #[test]
    fn test_private_request_is_signed() {
        let creds = credentials();
        let ctx = context(Arc::new(MockTransport::new())).with_credentials(Arc::clone(&creds));
        let descriptor = RequestDescriptor::for_endpoint::<PrivateThing>()
            .with_param("asset", "XBT")
            .with_param("nonce", "1");

        let request = ctx.prepare(&descriptor).unwrap();
        let body = request.body.clone().unwrap();
        let fields = form(&body);

        assert_eq!(request.url, "https://mock.test/0/private/Thing");
        assert_eq!(fields[0].0, "nonce");
        assert_ne!(fields[0].1, "1");
        assert_eq!(fields.iter().filter(|(k, _)| k == "nonce").count(), 1);
        assert_eq!(fields[1], ("asset".to_string(), "XBT".to_string()));

        let nonce: u64 = fields[0].1.parse().unwrap();
        let expected = creds.sign("/0/private/Thing", nonce, &body).unwrap();
        assert_eq!(request.header("API-Key"), Some("test-key"));
        assert_eq!(request.header("API-Sign"), Some(expected.as_str()));
        assert_eq!(request.header("content-type"), Some(FORM_CONTENT_TYPE));
    }

    #[tokio::test]
    async fn test_private_without_credentials_never_dispatches() {
        let transport = Arc::new(MockTransport::always(r#"{"error":[],"result":{}}"#));
        let ctx = Arc::new(context(Arc::clone(&transport)));

        let result = RequestBuilder::<PrivateThing>::new(ctx).send().await;

        assert!(matches!(result, Err(RestError::AuthRequired)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_builder_snapshot_per_send() {
        let transport = Arc::new(MockTransport::always(r#"{"error":[],"result":{}}"#));
        let ctx = Arc::new(context(Arc::clone(&transport)));

        let builder = RequestBuilder::<PublicThing>::new(ctx).param("pair", "XBTUSD");
        builder.send().await.unwrap();
        let builder = builder.param("pair", "ETHUSD");
        builder.send().await.unwrap();

        let urls: Vec<_> = transport.requests().into_iter().map(|r| r.url).collect();
        assert!(urls[0].ends_with("pair=XBTUSD"));
        assert!(urls[1].ends_with("pair=ETHUSD"));
    }

    #[test]
    fn test_list_and_flag_params() {
        let ctx = Arc::new(context(Arc::new(MockTransport::new())));
        let builder = RequestBuilder::<PublicThing>::new(ctx)
            .param_list("pair", ["XBTUSD", "ETHUSD"])
            .param_flag("trades", true);

        assert_eq!(builder.get_param("pair"), Some("XBTUSD,ETHUSD"));
        assert_eq!(builder.get_param("trades"), Some("true"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_private_nonces_are_unique() {
        let transport = Arc::new(MockTransport::always(r#"{"error":[],"result":{}}"#));
        let creds = Arc::new(
            Credentials::new("test-key", SECRET)
                .unwrap()
                .with_nonce_provider(Arc::new(IncreasingNonce::new())),
        );
        let ctx = Arc::new(context(Arc::clone(&transport)).with_credentials(creds));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let builder = RequestBuilder::<PrivateThing>::new(Arc::clone(&ctx));
                tokio::spawn(async move { builder.send().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut nonces: Vec<u64> = transport
            .requests()
            .iter()
            .map(|r| form(r.body.as_deref().unwrap())[0].1.parse().unwrap())
            .collect();
        let sent = nonces.len();
        nonces.sort_unstable();
        nonces.dedup();
        assert_eq!(sent, 32);
        assert_eq!(nonces.len(), 32, "nonces must be unique");
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_timeout_skips_dispatch() {
        let transport = Arc::new(MockTransport::always(r#"{"error":[],"result":{}}"#));
        let counter = Arc::new(CallCounter::new(CallBudgetConfig::new(2, 0.1)));
        let ctx = Arc::new(context(Arc::clone(&transport)).with_call_counter(Arc::clone(&counter)));

        let builder = RequestBuilder::<PublicThing>::new(ctx).throttle_timeout(Duration::from_secs(1));
        builder.send().await.unwrap();
        builder.send().await.unwrap();
        let third = builder.send().await;

        assert!(matches!(third, Err(RestError::ThrottleTimeout { .. })));
        assert_eq!(transport.requests().len(), 2);
    }
}
