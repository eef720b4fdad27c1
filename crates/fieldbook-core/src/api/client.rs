//! API client for the field, user and order services.
//!
//! Every request is signed for its target service immediately before it is
//! sent, and carries the bearer token when the endpoint needs one.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ApiConfig, Service};
use crate::models::{
    CreateOrderRequest, CreatedOrder, Field, FieldDetail, LoginRequest, OrderSummary,
    RegisterRequest, ScheduleSlot, UpdateUserRequest, UserProfile,
};
use crate::signing::{Clock, RequestSigner, SystemClock};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Standard response envelope of the three services.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    #[allow(dead_code)]
    status: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    message: Option<String>,
    data: T,
    #[serde(default)]
    token: Option<String>,
}

/// Token and profile returned by a successful login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: String,
    pub user: UserProfile,
}

/// How 429 responses are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RATE_LIMIT_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    None,
    Bearer,
}

#[derive(Debug, Clone)]
struct Signers {
    field: RequestSigner,
    user: RequestSigner,
    order: RequestSigner,
}

impl Signers {
    fn new(config: &ApiConfig, clock: Arc<dyn Clock>) -> Self {
        let make = |service: Service| {
            let target = config.target(service);
            RequestSigner::with_clock(
                target.service_name.clone(),
                target.signature_key.clone(),
                clock.clone(),
            )
        };
        Self {
            field: make(Service::Field),
            user: make(Service::User),
            order: make(Service::Order),
        }
    }

    fn get(&self, service: Service) -> &RequestSigner {
        match service {
            Service::Field => &self.field,
            Service::User => &self.user,
            Service::Order => &self.order,
        }
    }
}

/// API client for the booking services.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: Arc<ApiConfig>,
    signers: Arc<Signers>,
    retry: RetryPolicy,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a client whose signatures use `clock`.
    pub fn with_clock(config: ApiConfig, clock: Arc<dyn Clock>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let signers = Signers::new(&config, clock);
        Ok(Self {
            client,
            config: Arc::new(config),
            signers: Arc::new(signers),
            retry: RetryPolicy::default(),
            token: None,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
            signers: self.signers.clone(),
            retry: self.retry,
            token: Some(token),
        }
    }

    /// Build one attempt of a request. Signing happens here, so every
    /// attempt carries a fresh timestamp.
    fn build_request(
        &self,
        service: Service,
        method: &Method,
        url: &str,
        auth: Auth,
    ) -> Result<RequestBuilder, ApiError> {
        let mut headers = self.signers.get(service).headers()?;
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if auth == Auth::Bearer {
            let token = self.token.as_ref().ok_or(ApiError::NotAuthenticated)?;
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(self.client.request(method.clone(), url).headers(headers))
    }

    async fn execute<T, B>(
        &self,
        service: Service,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        auth: Auth,
    ) -> Result<Envelope<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.config.target(service).url(path);
        let mut retries = 0;
        let mut backoff = self.retry.initial_backoff;

        loop {
            let mut request = self.build_request(service, &method, &url, auth)?;
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(%service, %method, url = %url, retry = retries, "Sending request");
            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                let text = response.text().await?;
                return serde_json::from_str(&text).map_err(|e| {
                    ApiError::InvalidResponse(format!("{} {}: {}", method, path, e))
                });
            }

            if status.as_u16() == 429 {
                retries += 1;
                if retries > self.retry.max_retries {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = %url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                tokio::time::sleep(backoff).await;
                backoff *= 2; // Exponential backoff
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_status(status, &body);
            debug!(%service, status = status.as_u16(), error = %err, "Request failed");
            return Err(err);
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        query: &[(&str, &str)],
        auth: Auth,
    ) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self
            .execute::<T, ()>(service, Method::GET, path, query, None, auth)
            .await?;
        Ok(envelope.data)
    }

    // ===== Field service =====

    /// List all fields.
    pub async fn list_fields(&self) -> Result<Vec<Field>, ApiError> {
        self.get(Service::Field, "/api/v1/field", &[], Auth::None).await
    }

    /// Fetch one field by uuid.
    pub async fn get_field(&self, uuid: &str) -> Result<FieldDetail, ApiError> {
        let path = format!("/api/v1/field/{}", uuid);
        self.get(Service::Field, &path, &[], Auth::None).await
    }

    /// Hourly slots of a field on `date` (YYYY-MM-DD).
    pub async fn list_schedules(&self, uuid: &str, date: &str) -> Result<Vec<ScheduleSlot>, ApiError> {
        let path = format!("/api/v1/field/schedule/lists/{}", uuid);
        self.get(Service::Field, &path, &[("date", date)], Auth::None).await
    }

    // ===== User service =====

    /// Exchange credentials for a token and profile. The session itself is
    /// left to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult, ApiError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let envelope: Envelope<UserProfile> = self
            .execute(Service::User, Method::POST, "/api/v1/auth/login", &[], Some(&body), Auth::None)
            .await?;
        let token = envelope
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("login response has no token".to_string()))?;
        Ok(LoginResult {
            token,
            user: envelope.data,
        })
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        let envelope: Envelope<UserProfile> = self
            .execute(Service::User, Method::POST, "/api/v1/auth/register", &[], Some(request), Auth::None)
            .await?;
        Ok(envelope.data)
    }

    /// Profile of the user owning the current token.
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get(Service::User, "/api/v1/auth/user", &[], Auth::Bearer).await
    }

    pub async fn update_user(&self, uuid: &str, request: &UpdateUserRequest) -> Result<UserProfile, ApiError> {
        let path = format!("/api/v1/auth/{}", uuid);
        let envelope: Envelope<UserProfile> = self
            .execute(Service::User, Method::PUT, &path, &[], Some(request), Auth::Bearer)
            .await?;
        Ok(envelope.data)
    }

    // ===== Order service =====

    /// Book the given schedule slots; the result carries the payment link.
    pub async fn create_order(&self, schedule_ids: &[String]) -> Result<CreatedOrder, ApiError> {
        let body = CreateOrderRequest {
            field_schedule_ids: schedule_ids.to_vec(),
        };
        let envelope: Envelope<CreatedOrder> = self
            .execute(Service::Order, Method::POST, "/api/v1/order", &[], Some(&body), Auth::Bearer)
            .await?;
        Ok(envelope.data)
    }

    /// Booking history of the current user.
    pub async fn list_orders(&self) -> Result<Vec<OrderSummary>, ApiError> {
        let orders: Option<Vec<OrderSummary>> = self
            .get(Service::Order, "/api/v1/order/user", &[], Auth::Bearer)
            .await?;
        Ok(orders.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceTarget;
    use crate::signing::{sign_at, FixedClock};
    use std::sync::atomic::{AtomicI64, Ordering};
    use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NOW: i64 = 1_700_000_000;

    fn config(server: &MockServer) -> ApiConfig {
        let target = |name: &str, key: &str| ServiceTarget::new(server.uri(), name, key).unwrap();
        ApiConfig {
            field: target("field-service", "fkey"),
            user: target("user-service", "ukey"),
            order: target("order-service", "okey"),
        }
    }

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::with_clock(config(server), Arc::new(FixedClock(NOW)))
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_retries: 2,
                initial_backoff: Duration::from_millis(1),
            })
    }

    #[tokio::test]
    async fn test_list_fields_is_signed_for_field_service() {
        let server = MockServer::start().await;
        let expected = sign_at("field-service", "fkey", NOW).api_key;
        Mock::given(method("GET"))
            .and(path("/api/v1/field"))
            .and(header("x-service-name", "field-service"))
            .and(header("x-request-at", NOW.to_string().as_str()))
            .and(header("x-api-key", expected.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "message": "success",
                "data": [{
                    "uuid": "f1",
                    "code": "FLD-01",
                    "name": "Lapangan A",
                    "pricePerHour": 150000,
                    "images": []
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fields = client(&server).list_fields().await.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "Lapangan A");
    }

    #[tokio::test]
    async fn test_public_endpoints_send_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/field/schedule/lists/f1"))
            .and(query_param("date", "2024-05-05"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": [{
                    "uuid": "s1",
                    "date": "05 Mei",
                    "pricePerHour": "Rp.100.000",
                    "status": "available",
                    "time": "08:00:00 - 09:00:00"
                }]
            })))
            .mount(&server)
            .await;

        let api = client(&server).with_token("tok1".into());
        let slots = api.list_schedules("f1", "2024-05-05").await.unwrap();
        assert_eq!(slots[0].uuid, "s1");

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_login_returns_token_and_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .and(header("x-service-name", "user-service"))
            .and(body_json(serde_json::json!({"username": "budis", "password": "password1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "message": "success",
                "data": {"uuid": "u1", "name": "Budi", "username": "budis", "role": "customer"},
                "token": "jwt-token"
            })))
            .mount(&server)
            .await;

        let result = client(&server).login("budis", "password1").await.unwrap();
        assert_eq!(result.token, "jwt-token");
        assert_eq!(result.user.uuid, "u1");
    }

    #[tokio::test]
    async fn test_login_without_token_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": {"uuid": "u1"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).login("budis", "password1").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_bad_credentials_surface_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "status": "error",
                "message": "username or password is incorrect"
            })))
            .mount(&server)
            .await;

        let err = client(&server).login("budis", "wrongpass").await.unwrap_err();
        assert_eq!(err.to_string(), "username or password is incorrect");
    }

    #[tokio::test]
    async fn test_authenticated_endpoint_sends_bearer_and_order_signature() {
        let server = MockServer::start().await;
        let expected = sign_at("order-service", "okey", NOW).api_key;
        Mock::given(method("POST"))
            .and(path("/api/v1/order"))
            .and(header("authorization", "Bearer tok1"))
            .and(header("x-service-name", "order-service"))
            .and(header("x-api-key", expected.as_str()))
            .and(body_json(serde_json::json!({"fieldScheduleIDs": ["s1", "s2"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": {
                    "uuid": "o1",
                    "code": "ORD-00001",
                    "userName": "Budi",
                    "amount": 200000,
                    "status": "pending-payment",
                    "orderDate": "2024-05-05T10:00:00Z",
                    "paymentLink": "https://pay.example.com/o1"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server).with_token("tok1".into());
        let order = api
            .create_order(&["s1".to_string(), "s2".to_string()])
            .await
            .unwrap();
        assert_eq!(order.payment_link, "https://pay.example.com/o1");
        assert_eq!(order.amount.amount(), Some(200000));
    }

    #[tokio::test]
    async fn test_authenticated_endpoint_without_token_is_not_sent() {
        let server = MockServer::start().await;
        let err = client(&server).list_orders().await.unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/auth/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "status": "error",
                "message": "unauthorized"
            })))
            .mount(&server)
            .await;

        let err = client(&server).with_token("old".into()).current_user().await.unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_rate_limit_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/order/user"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/order/user"))
            .and(header_exists("x-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": [{
                    "code": "ORD-00001",
                    "amount": "Rp.100.000",
                    "status": "pending-payment",
                    "orderDate": "2024-05-05",
                    "paymentLink": "https://pay.example.com/o1",
                    "invoiceLink": null
                }]
            })))
            .mount(&server)
            .await;

        let orders = client(&server).with_token("tok1".into()).list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    /// Clock that moves one second forward every time it is read.
    struct TickingClock(AtomicI64);

    impl Clock for TickingClock {
        fn unix_seconds(&self) -> i64 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_retry_is_signed_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/field"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/field"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": []
            })))
            .mount(&server)
            .await;

        let api = ApiClient::with_clock(config(&server), Arc::new(TickingClock(AtomicI64::new(NOW))))
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_retries: 2,
                initial_backoff: Duration::from_millis(1),
            });
        api.list_fields().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let signed: Vec<(String, String)> = requests
            .iter()
            .map(|r| {
                let at = r.headers.get("x-request-at").unwrap().to_str().unwrap().to_string();
                let key = r.headers.get("x-api-key").unwrap().to_str().unwrap().to_string();
                (at, key)
            })
            .collect();

        assert_ne!(signed[0].0, signed[1].0);
        assert_ne!(signed[0].1, signed[1].1);
        for (at, key) in &signed {
            let timestamp: i64 = at.parse().unwrap();
            assert_eq!(key, &sign_at("field-service", "fkey", timestamp).api_key);
        }
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/field"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client(&server).list_fields().await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited));
        // One attempt plus two retries
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_order_history_as_null() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/order/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": null
            })))
            .mount(&server)
            .await;

        let orders = client(&server).with_token("tok1".into()).list_orders().await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/field/f1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": {"code": "FLD-01"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).get_field("f1").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_update_user_uses_put_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/auth/u1"))
            .and(header("authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": {"uuid": "u1", "name": "Budi Baru", "username": "budis"}
            })))
            .mount(&server)
            .await;

        let mut profile = UserProfile::new("u1");
        profile.name = Some("Budi Baru".into());
        profile.username = Some("budis".into());
        let request = UpdateUserRequest::from_profile(&profile);
        let updated = client(&server)
            .with_token("tok1".into())
            .update_user("u1", &request)
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Budi Baru"));
    }
}
