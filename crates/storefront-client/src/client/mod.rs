//! Authenticated request client.
//!
//! Every call reads the access token from the [`TokenStore`] at send time. A
//! 401 answer to an authenticated call triggers one token refresh and one
//! replay of the original request. If the refresh fails the stored tokens are
//! cleared, the [`Navigator`] is told to show the login surface and the call
//! fails with [`AuthError::SessionExpired`].

pub mod endpoints;
mod options;
mod response;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::auth::{AccessToken, Credentials, Registration};
use crate::error::{AuthError, HttpError, InvalidInputError};
use crate::navigation::{Navigator, NoopNavigator};
use crate::store::TokenStore;
use crate::transport::{HeaderMap, HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
use crate::types::ApiUrl;
use crate::Result;

use endpoints::{Endpoints, RefreshRequest, TokenEndpoint};

pub use options::RequestOptions;
pub use response::ApiResponse;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is joined to.
    pub base_url: ApiUrl,
    /// Endpoint table for the authentication conveniences.
    pub endpoints: Endpoints,
    pub user_agent: String,
    /// Transport timeout for a single request. `None` leaves it to `reqwest`.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Configuration with the default endpoint table.
    pub fn new(base_url: ApiUrl) -> Self {
        Self {
            base_url,
            endpoints: Endpoints::default(),
            user_agent: concat!("storefront-client/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    config: ClientConfig,
    tokens: Option<TokenStore>,
    transport: Option<Arc<dyn Transport>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            tokens: None,
            transport: None,
            navigator: None,
        }
    }

    /// Share an existing token store. Defaults to a fresh in-memory store.
    pub fn token_store(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Use a custom transport. Defaults to [`ReqwestTransport`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Collaborator told about unrecoverable session expiry.
    pub fn navigator(mut self, navigator: impl Navigator + 'static) -> Self {
        self.navigator = Some(Arc::new(navigator));
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the default HTTP client cannot be built.
    pub fn build(self) -> Result<Client> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(
                &self.config.user_agent,
                self.config.timeout,
            )?),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                base: self.config.base_url,
                endpoints: self.config.endpoints,
                transport,
                tokens: self.tokens.unwrap_or_default(),
                navigator: self.navigator.unwrap_or_else(|| Arc::new(NoopNavigator)),
            }),
        })
    }
}

/// Authenticated client for the storefront backend.
///
/// Cheap to clone; clones share the transport and token store.
///
/// # Example
///
/// ```no_run
/// use storefront_client::{ApiUrl, Client, ClientConfig, Credentials};
///
/// # async fn example() -> Result<(), storefront_client::Error> {
/// let config = ClientConfig::new(ApiUrl::new("https://shop.example.com")?);
/// let client = Client::builder(config).build()?;
///
/// client.login(&Credentials::new("alice@example.com", "hunter22")).await?;
/// let orders = client.get("/api/orders").await?;
/// println!("{:?}", orders);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base: ApiUrl,
    endpoints: Endpoints,
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
}

/// How a 401 was resolved.
enum Recovery {
    /// A fresh access token is in the store; replay the request.
    Refreshed,
    /// The session is gone and the store has been cleared.
    Expired,
}

impl Client {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Client with the default transport, an in-memory token store and no
    /// navigator.
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new(config).build()
    }

    pub fn base_url(&self) -> &ApiUrl {
        &self.inner.base
    }

    /// The token store this client reads from.
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Returns true if an access token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.inner.tokens.is_authenticated()
    }

    /// Perform a request against `path`, handling bearer tokens and one round
    /// of refresh-on-401.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if the request could not be sent
    /// - [`Error::Auth`] with [`AuthError::SessionExpired`] if the token was
    ///   rejected and could not be refreshed
    /// - [`Error::Http`] for any other non-2xx answer, including a 401 on the
    ///   replayed request
    /// - [`Error::Decode`] if a 2xx body is not JSON
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        options: &RequestOptions,
    ) -> Result<ApiResponse> {
        let url = if options.has_query() {
            self.inner
                .base
                .endpoint_with_query(path, options.query_pairs())?
        } else {
            self.inner.base.endpoint(path)
        };
        let body = body.map(serde_json::to_string).transpose()?;
        self.execute_url(method, url, body, options).await
    }

    #[instrument(skip_all, fields(%method, %url))]
    async fn execute_url(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
        options: &RequestOptions,
    ) -> Result<ApiResponse> {
        // Refresh eligibility is fixed at send time; a concurrent expiry
        // still has to be reported to this caller.
        let (sent_token, can_refresh) = if options.skips_auth() {
            (None, false)
        } else {
            let tokens = &self.inner.tokens;
            (tokens.access_token(), tokens.refresh_token().is_some())
        };

        let request =
            self.build_request(&method, &url, body.clone(), options, sent_token.as_ref())?;
        let response = self.send(request).await?;

        if response.status == 401 && can_refresh {
            debug!("Access token rejected, attempting refresh");

            match self.recover(sent_token.as_ref()).await {
                Recovery::Refreshed => {
                    let token = self.inner.tokens.access_token();
                    let retry = self.build_request(&method, &url, body, options, token.as_ref())?;
                    let response = self.send(retry).await?;
                    return ApiResponse::from_http(response);
                }
                Recovery::Expired => {
                    return Err(AuthError::SessionExpired.into());
                }
            }
        }

        ApiResponse::from_http(response)
    }

    /// Serialize concurrent refreshes through the store's gate.
    ///
    /// Whoever holds the gate first performs the refresh. Later holders find
    /// either a different access token (reuse it) or an emptied store (the
    /// refresh failed and the logout already happened).
    async fn recover(&self, rejected: Option<&AccessToken>) -> Recovery {
        let _gate = self.inner.tokens.refresh_gate().lock().await;

        if self.inner.tokens.refresh_token().is_none() {
            debug!("Session already expired by a concurrent request");
            return Recovery::Expired;
        }

        if let Some(current) = self.inner.tokens.access_token()
            && Some(&current) != rejected
        {
            debug!("Token already refreshed by a concurrent request");
            return Recovery::Refreshed;
        }

        if self.refresh().await {
            return Recovery::Refreshed;
        }

        // Cleared while the gate is held so waiters see the logout.
        self.inner.tokens.clear();
        info!("Session expired, redirecting to login");
        self.inner.navigator.redirect_to_login();
        Recovery::Expired
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// On success the new pair is stored; a refresh token absent from the
    /// response is carried forward. On any failure the store is left as it
    /// was and `false` is returned.
    pub async fn refresh(&self) -> bool {
        match self.try_refresh().await {
            Ok(()) => {
                debug!("Token refreshed successfully");
                true
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                false
            }
        }
    }

    #[instrument(skip(self))]
    async fn try_refresh(&self) -> Result<()> {
        let refresh_token = self
            .inner
            .tokens
            .refresh_token()
            .ok_or(AuthError::NoRefreshToken)?;

        let endpoint = &self.inner.endpoints.refresh;
        let body = serde_json::to_string(&RefreshRequest {
            refresh_token: refresh_token.as_str(),
        })?;

        // Sent without the rejected access token and outside the 401 handling.
        let request = self.build_request(
            &Method::POST,
            &self.inner.base.endpoint(&endpoint.path),
            Some(body),
            &RequestOptions::new(),
            None,
        )?;
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(HttpError::from_body(response.status, response.body).into());
        }

        let value: serde_json::Value = serde_json::from_str(&response.body)?;
        let issued = endpoint
            .shape
            .extract(&value)
            .ok_or_else(|| AuthError::MissingTokens {
                endpoint: endpoint.path.clone(),
            })?;

        let refresh = issued.refresh().unwrap_or(refresh_token);
        self.inner.tokens.set_tokens(&issued.access(), &refresh);
        Ok(())
    }

    fn build_request(
        &self,
        method: &Method,
        url: &str,
        body: Option<String>,
        options: &RequestOptions,
        token: Option<&AccessToken>,
    ) -> Result<HttpRequest> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        options.apply_headers(&mut headers)?;

        if let Some(token) = token {
            let value =
                HeaderValue::from_str(&token.bearer()).map_err(|e| InvalidInputError::Header {
                    name: AUTHORIZATION.to_string(),
                    reason: e.to_string(),
                })?;
            headers.insert(AUTHORIZATION, value);
        } else {
            headers.remove(AUTHORIZATION);
        }

        Ok(HttpRequest {
            method: method.clone(),
            url: url.to_string(),
            headers,
            body,
        })
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.inner.transport.send(request).await?;
        debug!(status = response.status, "Response received");
        Ok(response)
    }

    // ========================================================================
    // Generic JSON surface
    // ========================================================================

    /// `GET path`. Returns `None` for an empty body.
    pub async fn get(&self, path: &str) -> Result<Option<serde_json::Value>> {
        self.execute(Method::GET, path, None, &RequestOptions::new())
            .await
            .map(ApiResponse::into_body)
    }

    /// `GET path?query`, leaving out parameters whose value is `None`.
    pub async fn get_with_query<'a, I>(
        &self,
        path: &str,
        params: I,
    ) -> Result<Option<serde_json::Value>>
    where
        I: IntoIterator<Item = (&'a str, Option<String>)>,
    {
        let url = self.inner.base.endpoint_with_query(path, params)?;
        self.execute_url(Method::GET, url, None, &RequestOptions::new())
            .await
            .map(ApiResponse::into_body)
    }

    /// `POST path` with a JSON body.
    pub async fn post<B>(&self, path: &str, data: &B) -> Result<Option<serde_json::Value>>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(data)?;
        self.execute(Method::POST, path, Some(&body), &RequestOptions::new())
            .await
            .map(ApiResponse::into_body)
    }

    /// `PUT path` with a JSON body.
    pub async fn put<B>(&self, path: &str, data: &B) -> Result<Option<serde_json::Value>>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(data)?;
        self.execute(Method::PUT, path, Some(&body), &RequestOptions::new())
            .await
            .map(ApiResponse::into_body)
    }

    /// `DELETE path`.
    pub async fn delete(&self, path: &str) -> Result<Option<serde_json::Value>> {
        self.execute(Method::DELETE, path, None, &RequestOptions::new())
            .await
            .map(ApiResponse::into_body)
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Log in and store the issued token pair.
    ///
    /// Returns the login response body.
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<serde_json::Value> {
        info!("Logging in");
        let endpoint = self.inner.endpoints.login.clone();
        let body = self.post_unauthenticated(&endpoint.path, credentials).await?;
        self.store_issued_tokens(&endpoint, &body, true)?;
        debug!("Login succeeded");
        Ok(body)
    }

    /// Create an account. The token pair is stored when the response carries
    /// one.
    ///
    /// Returns the registration response body (the new user).
    #[instrument(skip(self, registration), fields(email = %registration.email()))]
    pub async fn register(&self, registration: &Registration) -> Result<serde_json::Value> {
        info!("Registering account");
        let endpoint = self.inner.endpoints.register.clone();
        let body = self
            .post_unauthenticated(&endpoint.path, registration)
            .await?;
        self.store_issued_tokens(&endpoint, &body, false)?;
        Ok(body)
    }

    /// Tell the backend to end the session, then clear the stored tokens
    /// whatever the outcome.
    ///
    /// The request carries the current access token but a 401 is not
    /// refreshed, and the navigator is never called.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        info!("Logging out");
        let url = self.inner.base.endpoint(&self.inner.endpoints.logout);
        let token = self.inner.tokens.access_token();

        let result = async {
            let request = self.build_request(
                &Method::POST,
                &url,
                Some("{}".to_string()),
                &RequestOptions::new(),
                token.as_ref(),
            )?;
            let response = self.send(request).await?;
            ApiResponse::from_http(response).map(|_| ())
        }
        .await;

        self.inner.tokens.clear();
        if let Err(e) = &result {
            debug!(error = %e, "Backend logout failed, tokens cleared anyway");
        }
        result
    }

    /// Fetch the authenticated user.
    pub async fn current_user(&self) -> Result<serde_json::Value> {
        let path = self.inner.endpoints.me.clone();
        self.execute(Method::GET, &path, None, &RequestOptions::new())
            .await?
            .decode()
    }

    /// Check backend health. Never sends credentials.
    pub async fn health(&self) -> Result<Option<serde_json::Value>> {
        let path = self.inner.endpoints.health.clone();
        self.execute(
            Method::GET,
            &path,
            None,
            &RequestOptions::new().without_auth(),
        )
        .await
        .map(ApiResponse::into_body)
    }

    async fn post_unauthenticated<B>(&self, path: &str, data: &B) -> Result<serde_json::Value>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(data)?;
        self.execute(
            Method::POST,
            path,
            Some(&body),
            &RequestOptions::new().without_auth(),
        )
        .await?
        .decode()
    }

    fn store_issued_tokens(
        &self,
        endpoint: &TokenEndpoint,
        body: &serde_json::Value,
        required: bool,
    ) -> Result<()> {
        let issued = endpoint.shape.extract(body);
        match issued.as_ref().and_then(|t| t.refresh().map(|r| (t.access(), r))) {
            Some((access, refresh)) => {
                self.inner.tokens.set_tokens(&access, &refresh);
                Ok(())
            }
            None if required => Err(AuthError::MissingTokens {
                endpoint: endpoint.path.clone(),
            }
            .into()),
            None => {
                debug!(endpoint = %endpoint.path, "Response carried no tokens");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base", &self.inner.base)
            .field("tokens", &self.inner.tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::auth::TokenPair;
    use crate::error::{Error, TransportError};

    type Reply = std::result::Result<HttpResponse, TransportError>;
    type Responder = Box<dyn Fn(&HttpRequest) -> Reply + Send + Sync>;

    /// Transport that answers from a closure and records every request.
    struct ScriptedTransport {
        respond: Responder,
        seen: Arc<Mutex<Vec<HttpRequest>>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Reply {
            self.seen.lock().unwrap().push(request.clone());
            (self.respond)(&request)
        }
    }

    fn reply(status: u16, body: serde_json::Value) -> Reply {
        Ok(HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: body.to_string(),
        })
    }

    fn auth_of(request: &HttpRequest) -> Option<String> {
        request
            .headers
            .get(AUTHORIZATION)
            .map(|v| v.to_str().unwrap().to_string())
    }

    struct Harness {
        client: Client,
        seen: Arc<Mutex<Vec<HttpRequest>>>,
        redirects: Arc<AtomicUsize>,
    }

    impl Harness {
        fn new<F>(respond: F) -> Self
        where
            F: Fn(&HttpRequest) -> Reply + Send + Sync + 'static,
        {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let redirects = Arc::new(AtomicUsize::new(0));
            let counter = redirects.clone();
            let config = ClientConfig::new(ApiUrl::new("https://shop.example.com").unwrap());
            let client = Client::builder(config)
                .transport(ScriptedTransport {
                    respond: Box::new(respond),
                    seen: seen.clone(),
                })
                .navigator(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .build()
                .unwrap();
            Self {
                client,
                seen,
                redirects,
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }

        fn redirects(&self) -> usize {
            self.redirects.load(Ordering::SeqCst)
        }
    }

    fn is_refresh(request: &HttpRequest) -> bool {
        request.url.ends_with("/api/auth/refresh")
    }

    #[tokio::test]
    async fn attaches_token_read_at_call_time() {
        let harness = Harness::new(|_| reply(200, json!({"ok": true})));
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));
        harness.client.get("/api/orders").await.unwrap();

        harness.client.tokens().set_pair(&TokenPair::new("A9", "R9"));
        harness.client.get("/api/orders").await.unwrap();

        let requests = harness.requests();
        assert_eq!(auth_of(&requests[0]).as_deref(), Some("Bearer A1"));
        assert_eq!(auth_of(&requests[1]).as_deref(), Some("Bearer A9"));
        assert_eq!(
            requests[0].headers.get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn anonymous_request_has_no_authorization() {
        let harness = Harness::new(|_| reply(200, json!([])));
        harness.client.get("/api/products").await.unwrap();
        assert!(auth_of(&harness.requests()[0]).is_none());
    }

    #[tokio::test]
    async fn refreshes_and_replays_once() {
        let harness = Harness::new(|request| {
            if is_refresh(request) {
                return reply(200, json!({"access_token": "A2", "refresh_token": "R2"}));
            }
            match auth_of(request).as_deref() {
                Some("Bearer A2") => reply(200, json!({"items": []})),
                _ => reply(401, json!({"detail": "Token expired"})),
            }
        });
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        let body = harness.client.get("/api/cart").await.unwrap();
        assert_eq!(body, Some(json!({"items": []})));

        let requests = harness.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(auth_of(&requests[0]).as_deref(), Some("Bearer A1"));
        assert!(is_refresh(&requests[1]));
        assert!(auth_of(&requests[1]).is_none());
        assert_eq!(
            requests[1].body.as_deref(),
            Some(r#"{"refresh_token":"R1"}"#)
        );
        assert_eq!(auth_of(&requests[2]).as_deref(), Some("Bearer A2"));
        assert_eq!(
            harness.client.tokens().tokens(),
            Some(TokenPair::new("A2", "R2"))
        );
        assert_eq!(harness.redirects(), 0);
    }

    #[tokio::test]
    async fn replay_keeps_method_and_body() {
        let harness = Harness::new(|request| {
            if is_refresh(request) {
                return reply(200, json!({"access_token": "A2"}));
            }
            match auth_of(request).as_deref() {
                Some("Bearer A2") => reply(201, json!({"id": 1})),
                _ => reply(401, json!({})),
            }
        });
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        harness
            .client
            .post("/api/cart/items", &json!({"product_id": 5, "quantity": 2}))
            .await
            .unwrap();

        let requests = harness.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[2].method, Method::POST);
        assert_eq!(requests[0].url, requests[2].url);
        assert_eq!(requests[0].body, requests[2].body);
    }

    #[tokio::test]
    async fn second_unauthorized_is_not_retried() {
        let harness = Harness::new(|request| {
            if is_refresh(request) {
                return reply(200, json!({"access_token": "A2", "refresh_token": "R2"}));
            }
            reply(401, json!({"detail": "Not authenticated"}))
        });
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        let err = harness.client.get("/api/orders").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_session_expired());
        assert_eq!(harness.requests().len(), 3);
        assert_eq!(
            harness.requests().iter().filter(|r| is_refresh(r)).count(),
            1
        );
        assert_eq!(harness.redirects(), 0);
    }

    #[tokio::test]
    async fn refresh_failure_expires_session() {
        let harness = Harness::new(|request| {
            if is_refresh(request) {
                return reply(401, json!({"detail": "Invalid refresh token"}));
            }
            reply(401, json!({}))
        });
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        let err = harness.client.get("/api/orders").await.unwrap_err();
        assert!(err.is_session_expired());
        assert!(!harness.client.is_authenticated());
        assert!(harness.client.tokens().refresh_token().is_none());
        assert_eq!(harness.redirects(), 1);
        assert_eq!(harness.requests().len(), 2);
    }

    #[tokio::test]
    async fn refresh_network_failure_expires_session() {
        let harness = Harness::new(|request| {
            if is_refresh(request) {
                return Err(TransportError::Connection {
                    message: "connection reset".to_string(),
                });
            }
            reply(401, json!({}))
        });
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        let err = harness.client.get("/api/orders").await.unwrap_err();
        assert!(err.is_session_expired());
        assert!(!harness.client.is_authenticated());
        assert_eq!(harness.redirects(), 1);
    }

    #[tokio::test]
    async fn malformed_refresh_body_expires_session() {
        let harness = Harness::new(|request| {
            if is_refresh(request) {
                return reply(200, json!({"token": "wrong-field"}));
            }
            reply(401, json!({}))
        });
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        let err = harness.client.get("/api/orders").await.unwrap_err();
        assert!(err.is_session_expired());
        assert_eq!(harness.redirects(), 1);
    }

    #[tokio::test]
    async fn refresh_failure_leaves_store_untouched() {
        let harness = Harness::new(|_| reply(500, json!({"detail": "boom"})));
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        assert!(!harness.client.refresh().await);
        assert_eq!(
            harness.client.tokens().tokens(),
            Some(TokenPair::new("A1", "R1"))
        );
    }

    #[tokio::test]
    async fn refresh_without_token_fails_without_request() {
        let harness = Harness::new(|_| reply(200, json!({"access_token": "A2"})));
        assert!(!harness.client.refresh().await);
        assert!(harness.requests().is_empty());
    }

    #[tokio::test]
    async fn refresh_carries_refresh_token_forward() {
        let harness = Harness::new(|_| reply(200, json!({"access_token": "A2"})));
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        assert!(harness.client.refresh().await);
        assert_eq!(
            harness.client.tokens().tokens(),
            Some(TokenPair::new("A2", "R1"))
        );
    }

    #[tokio::test]
    async fn unauthorized_without_refresh_token_is_http_error() {
        let harness = Harness::new(|_| reply(401, json!({"detail": "Not authenticated"})));

        let err = harness.client.get("/api/auth/me").await.unwrap_err();
        match err {
            Error::Http(http) => {
                assert_eq!(http.status, 401);
                assert_eq!(http.message, "Not authenticated");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(harness.requests().len(), 1);
        assert_eq!(harness.redirects(), 0);
    }

    #[tokio::test]
    async fn no_auth_option_skips_header_and_refresh() {
        let harness = Harness::new(|_| reply(401, json!({"detail": "nope"})));
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        let err = harness
            .client
            .execute(
                Method::GET,
                "/api/products",
                None,
                &RequestOptions::new().without_auth(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        let requests = harness.requests();
        assert_eq!(requests.len(), 1);
        assert!(auth_of(&requests[0]).is_none());
        assert!(harness.client.is_authenticated());
    }

    #[tokio::test]
    async fn caller_cannot_override_authorization() {
        let harness = Harness::new(|_| reply(200, json!({})));
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        harness
            .client
            .execute(
                Method::GET,
                "/api/orders",
                None,
                &RequestOptions::new()
                    .header("Authorization", "Bearer forged")
                    .header("Accept-Language", "ru"),
            )
            .await
            .unwrap();

        let request = &harness.requests()[0];
        assert_eq!(auth_of(request).as_deref(), Some("Bearer A1"));
        assert_eq!(request.headers.get("accept-language").unwrap(), "ru");
    }

    #[tokio::test]
    async fn transport_error_is_surfaced_without_retry() {
        let harness = Harness::new(|_| Err(TransportError::Timeout));
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        let err = harness.client.get("/api/orders").await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Timeout)));
        assert_eq!(harness.requests().len(), 1);
        assert!(harness.client.is_authenticated());
    }

    #[tokio::test]
    async fn empty_success_body_is_none() {
        let harness = Harness::new(|_| {
            Ok(HttpResponse {
                status: 204,
                headers: HeaderMap::new(),
                body: String::new(),
            })
        });
        assert_eq!(harness.client.delete("/api/cart").await.unwrap(), None);
    }

    #[tokio::test]
    async fn login_stores_flat_tokens() {
        let harness = Harness::new(|request| {
            if request.url.ends_with("/api/auth/login") {
                return reply(
                    200,
                    json!({"access_token": "A1", "refresh_token": "R1", "token_type": "bearer"}),
                );
            }
            reply(200, json!({"id": 1}))
        });

        harness
            .client
            .login(&Credentials::new("alice@example.com", "pw"))
            .await
            .unwrap();
        harness.client.get("/api/orders").await.unwrap();

        assert_eq!(
            harness.client.tokens().tokens(),
            Some(TokenPair::new("A1", "R1"))
        );
        let requests = harness.requests();
        assert!(auth_of(&requests[0]).is_none());
        assert_eq!(
            requests[0].body.as_deref(),
            Some(r#"{"email":"alice@example.com","password":"pw"}"#)
        );
        assert_eq!(auth_of(&requests[1]).as_deref(), Some("Bearer A1"));
    }

    #[tokio::test]
    async fn login_rejection_does_not_refresh() {
        let harness = Harness::new(|_| reply(401, json!({"detail": "Invalid credentials"})));
        harness.client.tokens().set_pair(&TokenPair::new("OLD", "OLDR"));

        let err = harness
            .client
            .login(&Credentials::new("alice@example.com", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 401: Invalid credentials");
        assert_eq!(harness.requests().len(), 1);
        assert_eq!(harness.redirects(), 0);
    }

    #[tokio::test]
    async fn login_without_tokens_is_an_error() {
        let harness = Harness::new(|_| reply(200, json!({"message": "ok"})));
        let err = harness
            .client
            .login(&Credentials::new("alice@example.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::MissingTokens { .. })));
        assert!(!harness.client.is_authenticated());
    }

    #[tokio::test]
    async fn register_stores_nested_tokens() {
        let harness = Harness::new(|_| {
            reply(
                201,
                json!({
                    "id": 3,
                    "email": "bob@example.com",
                    "role": "customer",
                    "tokens": {"access_token": "A1", "refresh_token": "R1"}
                }),
            )
        });

        let user = harness
            .client
            .register(&Registration::new("bob@example.com", "pw"))
            .await
            .unwrap();
        assert_eq!(user["id"], 3);
        assert_eq!(
            harness.client.tokens().tokens(),
            Some(TokenPair::new("A1", "R1"))
        );
    }

    #[tokio::test]
    async fn register_without_tokens_leaves_store_empty() {
        let harness = Harness::new(|_| reply(201, json!({"id": 3})));
        harness
            .client
            .register(&Registration::new("bob@example.com", "pw"))
            .await
            .unwrap();
        assert!(!harness.client.is_authenticated());
    }

    #[tokio::test]
    async fn logout_clears_tokens_even_on_failure() {
        let harness = Harness::new(|_| reply(500, json!({"detail": "down"})));
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        assert!(harness.client.logout().await.is_err());
        assert!(!harness.client.is_authenticated());
        assert_eq!(harness.redirects(), 0);
    }

    #[tokio::test]
    async fn logout_with_expired_session_does_not_refresh_or_redirect() {
        let harness = Harness::new(|request| {
            if is_refresh(request) {
                return reply(401, json!({"detail": "Invalid refresh token"}));
            }
            reply(401, json!({"detail": "Token expired"}))
        });
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        let err = harness.client.logout().await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_session_expired());
        assert!(!harness.client.is_authenticated());
        assert_eq!(harness.redirects(), 0);

        let requests = harness.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.ends_with("/api/auth/logout"));
        assert_eq!(auth_of(&requests[0]).as_deref(), Some("Bearer A1"));
    }

    /// Answers every call with 401 and holds `/api/cart` until released.
    struct HeldTransport {
        release: Arc<tokio::sync::Notify>,
        seen: Arc<Mutex<Vec<HttpRequest>>>,
    }

    #[async_trait]
    impl Transport for HeldTransport {
        async fn send(&self, request: HttpRequest) -> Reply {
            self.seen.lock().unwrap().push(request.clone());
            if request.url.ends_with("/api/cart") {
                self.release.notified().await;
            }
            reply(401, json!({"detail": "Not authenticated"}))
        }
    }

    #[tokio::test]
    async fn late_unauthorized_after_failed_refresh_is_session_expired() {
        let release = Arc::new(tokio::sync::Notify::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let redirects = Arc::new(AtomicUsize::new(0));
        let counter = redirects.clone();

        let config = ClientConfig::new(ApiUrl::new("https://shop.example.com").unwrap());
        let client = Client::builder(config)
            .transport(HeldTransport {
                release: release.clone(),
                seen: seen.clone(),
            })
            .navigator(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();
        client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        // Sent with A1 while the session is still intact; its 401 is held.
        let held = {
            let client = client.clone();
            tokio::spawn(async move { client.get("/api/cart").await })
        };
        while seen.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }

        let err = client.get("/api/orders").await.unwrap_err();
        assert!(err.is_session_expired());
        assert!(!client.is_authenticated());
        assert_eq!(redirects.load(Ordering::SeqCst), 1);

        release.notify_one();
        let err = held.await.unwrap().unwrap_err();
        assert!(err.is_session_expired());
        assert_eq!(redirects.load(Ordering::SeqCst), 1);

        let refreshes = seen.lock().unwrap().iter().filter(|r| is_refresh(r)).count();
        assert_eq!(refreshes, 1);
    }

    #[tokio::test]
    async fn health_never_sends_credentials() {
        let harness = Harness::new(|_| reply(200, json!({"status": "healthy"})));
        harness.client.tokens().set_pair(&TokenPair::new("A1", "R1"));

        let health = harness.client.health().await.unwrap();
        assert_eq!(health, Some(json!({"status": "healthy"})));
        assert!(auth_of(&harness.requests()[0]).is_none());
    }

    #[tokio::test]
    async fn query_option_is_appended() {
        let harness = Harness::new(|_| reply(200, json!({})));
        harness
            .client
            .execute(
                Method::DELETE,
                "/api/cart/items/3",
                None,
                &RequestOptions::new().query("force", "true"),
            )
            .await
            .unwrap();
        assert_eq!(
            harness.requests()[0].url,
            "https://shop.example.com/api/cart/items/3?force=true"
        );
    }

    #[tokio::test]
    async fn get_with_query_builds_url() {
        let harness = Harness::new(|_| reply(200, json!({"items": []})));
        harness
            .client
            .get_with_query(
                "/api/products",
                [("page", Some("1".to_string())), ("search", None)],
            )
            .await
            .unwrap();
        assert_eq!(
            harness.requests()[0].url,
            "https://shop.example.com/api/products?page=1"
        );
    }
}
