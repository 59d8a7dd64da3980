//! API client for the price-tracking backend.
//!
//! Every request goes through [`ApiClient::auth_headers`], so whatever token
//! the session last applied is what the request carries.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::ApiError;
use crate::auth::AuthBackend;
use crate::models::{
    AuthResponse, LoginRequest, MeResponse, Product, SignupRequest, TrackRequest, TrackResponse,
    User,
};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the price-tracking backend.
/// Clone is cheap; clones share the connection pool and the bearer token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
    initial_backoff: Duration,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token: Arc::new(RwLock::new(None)),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// First delay after a 429; each further retry doubles it.
    pub fn with_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Replace (or drop) the bearer token for every clone of this client
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    /// Append path segments to the base URL. Each segment is percent-encoded,
    /// so an id can never reach a different route.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        // Url drops dot segments instead of encoding them
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(ApiError::InvalidUrl(format!("invalid path segment {:?}", bad)));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        let token = self.token.read().unwrap_or_else(|e| e.into_inner());
        if let Some(ref token) = *token {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, ApiError> {
        Ok(self
            .client
            .request(method, url)
            .headers(self.auth_headers()?))
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: Response) -> Result<Option<Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request, backing off and retrying while the backend rate limits.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let url = self.endpoint(segments)?;
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            // Headers are rebuilt per attempt so a retry picks up the current token.
            let mut request = self.request(method.clone(), url.clone())?;
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(
                        path = url.path(),
                        retry = retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2; // Exponential backoff
                }
            }
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let path = response.url().path().to_string();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::GET, segments, None).await?;
        Self::parse(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::POST, segments, Some(body)).await?;
        Self::parse(response).await
    }

    // ===== Product endpoints =====

    /// Fetch the signed-in user's tracked products
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        // Some deployments answer an empty list with `null`
        let products: Option<Vec<Product>> = self.get(&["products"]).await?;
        let products = products.unwrap_or_default();
        debug!(count = products.len(), "Products fetched");
        Ok(products)
    }

    /// Start tracking a product at a target price
    pub async fn track_product(&self, request: &TrackRequest) -> Result<TrackResponse, ApiError> {
        self.post(&["track"], request).await
    }

    pub async fn delete_product(&self, product_id: &str) -> Result<(), ApiError> {
        self.send::<()>(Method::DELETE, &["products", product_id], None)
            .await?;
        debug!(product_id, "Product deleted");
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post(&["auth", "login"], request).await
    }

    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        self.post(&["auth", "signup"], request).await
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        let me: MeResponse = self.get(&["auth", "me"]).await?;
        Ok(me.user)
    }

    fn apply_token(&self, token: Option<&str>) {
        self.set_token(token.map(str::to_string));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bearer(client: &ApiClient) -> Option<String> {
        client
            .auth_headers()
            .expect("headers")
            .get(header::AUTHORIZATION)
            .map(|v| v.to_str().expect("ascii header").to_string())
    }

    /// Client against a mock server, with retries that don't slow the suite down
    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri())
            .expect("client")
            .with_backoff(Duration::from_millis(1))
    }

    #[test]
    fn test_endpoint_joining() {
        let client = ApiClient::new("http://localhost:5000/api/").expect("client");
        assert_eq!(
            client.endpoint(&["auth", "me"]).expect("url").as_str(),
            "http://localhost:5000/api/auth/me"
        );

        let bare = ApiClient::new("http://localhost:5000").expect("client");
        assert_eq!(
            bare.endpoint(&["products", "42"]).expect("url").as_str(),
            "http://localhost:5000/products/42"
        );
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let client = ApiClient::new("http://localhost:5000").expect("client");
        let url = client.endpoint(&["products", "a/b?c#d"]).expect("url");
        assert_eq!(url.path(), "/products/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        for id in ["", ".", ".."] {
            assert!(matches!(
                client.endpoint(&["products", id]),
                Err(ApiError::InvalidUrl(_))
            ));
        }
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("mailto:prices@example.com"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_no_header_without_token() {
        let client = ApiClient::new("http://localhost:5000").expect("client");
        assert_eq!(bearer(&client), None);
    }

    #[test]
    fn test_apply_token_reaches_every_clone() {
        let client = ApiClient::new("http://localhost:5000").expect("client");
        let products_view = client.clone();

        client.apply_token(Some("T1"));
        assert_eq!(bearer(&products_view), Some("Bearer T1".to_string()));

        client.apply_token(Some("T2"));
        assert_eq!(bearer(&products_view), Some("Bearer T2".to_string()));

        products_view.apply_token(None);
        assert_eq!(bearer(&client), None);
    }

    #[test]
    fn test_header_is_marked_sensitive() {
        let client = ApiClient::new("http://localhost:5000").expect("client");
        client.apply_token(Some("T1"));
        let headers = client.auth_headers().expect("headers");
        assert!(headers
            .get(header::AUTHORIZATION)
            .expect("authorization header")
            .is_sensitive());
    }

    #[test]
    fn test_invalid_token_is_an_error() {
        let client = ApiClient::new("http://localhost:5000").expect("client");
        client.apply_token(Some("bad\ntoken"));
        assert!(matches!(
            client.auth_headers(),
            Err(ApiError::InvalidHeader(_))
        ));
    }

    #[tokio::test]
    async fn test_requests_carry_the_applied_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .and(header_is("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        // The token is applied through a clone, as the session does
        client.clone().apply_token(Some("T1"));

        let products = client.list_products().await.expect("products");
        assert!(products.is_empty());
        server.verify().await;
    }

    #[tokio::test]
    async fn test_error_body_message_reaches_caller() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let request = LoginRequest {
            email: "a@b.c".into(),
            password: "secret1".into(),
        };
        let err = client.login(&request).await.expect_err("rejected");
        assert!(matches!(err, ApiError::Rejected { status: 400, .. }));
        assert_eq!(err.backend_message(), Some("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_null_product_list_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let products = client_for(&server).list_products().await.expect("products");
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let products = client_for(&server).list_products().await.expect("products");
        assert!(products.is_empty());
        server.verify().await;
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(429))
            .expect(u64::from(MAX_RATE_LIMIT_RETRIES) + 1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_products()
            .await
            .expect_err("rate limited");
        assert!(matches!(err, ApiError::RateLimited));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_delete_sends_escaped_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/products/a%2Fb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .delete_product("a/b")
            .await
            .expect("deleted");
        server.verify().await;
    }
}
