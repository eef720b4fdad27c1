//! Application state for the fieldbook CLI.
//!
//! `App` owns the user preferences, the session manager and the API client.
//! Each command handler first asks the route guard whether it may run, then
//! talks to the services and returns the text to print.

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use fieldbook_core::api::{ApiClient, ApiError};
use fieldbook_core::auth::{
    guard, FileStorage, Guard, KeyringStorage, Route, Storage, SessionManager,
};
use fieldbook_core::booking::{self, ScheduleSelection, DATE_FORMAT};
use fieldbook_core::config::{ApiConfig, Config, StorageBackend};
use fieldbook_core::models::{FieldError, LoginRequest, RegisterRequest, UpdateUserRequest};

use crate::render;

/// Requested edits to the profile; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub username: Option<String>,
    /// New password and its confirmation
    pub password: Option<(String, String)>,
}

pub struct App {
    config: Config,
    session: SessionManager<Box<dyn Storage>>,
    api: ApiClient,
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

impl App {
    /// Create the application, choosing the storage backend from config.
    pub fn new(api_config: ApiConfig, config: Config) -> Result<Self> {
        let storage: Box<dyn Storage> = match config.storage {
            StorageBackend::File => {
                let dir = config.data_dir().context("Could not determine data directory")?;
                debug!(?dir, "Using file session storage");
                Box::new(FileStorage::new(dir))
            }
            StorageBackend::Keyring => {
                debug!("Using keychain session storage");
                Box::new(KeyringStorage::new())
            }
        };
        let api = ApiClient::new(api_config).context("Failed to create HTTP client")?;
        Ok(Self::with_parts(config, storage, api))
    }

    /// Assemble an app from its parts and hydrate the session.
    pub fn with_parts(config: Config, storage: Box<dyn Storage>, mut api: ApiClient) -> Self {
        let mut session = SessionManager::new(storage);
        if let Some(current) = session.hydrate() {
            api.set_token(current.token.clone());
        }
        Self {
            config,
            session,
            api,
        }
    }

    pub fn last_username(&self) -> Option<&str> {
        self.config.last_username.as_deref()
    }

    // =========================================================================
    // Routing
    // =========================================================================

    fn enter(&self, route: &Route) -> Result<()> {
        match guard(route, self.session.current_session()) {
            Guard::Proceed => Ok(()),
            Guard::Redirect(Route::Login) => {
                bail!("You need to log in first. Run `fieldbook login`.")
            }
            Guard::Redirect(target) => bail!("Cannot open {} here, go to {}", route, target),
        }
    }

    /// For the login and register entry points: a message when the user is
    /// already logged in and should be sent home instead.
    pub fn auth_entry_redirect(&self, route: &Route) -> Option<String> {
        match guard(route, self.session.current_session()) {
            Guard::Redirect(Route::Home) => Some(format!("Already logged in. {}", self.whoami())),
            _ => None,
        }
    }

    pub fn require_login_for_checkout(&self, field_uuid: &str) -> Result<()> {
        self.enter(&Route::Checkout(field_uuid.to_string()))
    }

    /// Turn an API failure into a user-facing error. A rejected token ends
    /// the session.
    fn api_failure(&mut self, err: ApiError) -> anyhow::Error {
        warn!(error = %err, "API request failed");
        if err.is_auth_failure() {
            info!("Token rejected, logging out");
            if let Err(e) = self.session.logout() {
                warn!(error = %e, "Failed to clear stored session");
            }
            self.api.clear_token();
        }
        anyhow::anyhow!(err.user_message())
    }

    // =========================================================================
    // Fields and schedules
    // =========================================================================

    pub async fn fields(&mut self) -> Result<String> {
        self.enter(&Route::Home)?;
        match self.api.list_fields().await {
            Ok(fields) => Ok(render::fields(&fields)),
            Err(e) => Err(self.api_failure(e)),
        }
    }

    pub async fn field(&mut self, uuid: &str, date: Option<&str>) -> Result<String> {
        self.enter(&Route::Booking(uuid.to_string()))?;
        let date = booking::resolve_date(date, booking::today())?;
        let date = date.format(DATE_FORMAT).to_string();

        let result = futures::future::try_join(
            self.api.get_field(uuid),
            self.api.list_schedules(uuid, &date),
        )
        .await;

        match result {
            Ok((detail, slots)) => {
                let selection = ScheduleSelection::new(slots);
                Ok(format!(
                    "{}\n\nSchedule for {}\n{}",
                    render::field_detail(&detail),
                    date,
                    render::schedule(&selection)
                ))
            }
            Err(e) => Err(self.api_failure(e)),
        }
    }

    /// Fetch the schedule and select the requested slots. Fails if any slot
    /// is unknown or already booked.
    pub async fn select_slots(
        &mut self,
        uuid: &str,
        date: Option<&str>,
        slots: &[String],
    ) -> Result<ScheduleSelection> {
        self.enter(&Route::Booking(uuid.to_string()))?;
        let date = booking::resolve_date(date, booking::today())?;
        let date = date.format(DATE_FORMAT).to_string();

        let available = match self.api.list_schedules(uuid, &date).await {
            Ok(slots) => slots,
            Err(e) => return Err(self.api_failure(e)),
        };

        let mut selection = ScheduleSelection::new(available);
        let mut rejected = Vec::new();
        for slot in slots {
            if !selection.select(slot) {
                rejected.push(slot.as_str());
            }
        }
        if !rejected.is_empty() {
            bail!("Not available on {}: {}", date, rejected.join(", "));
        }
        if !selection.has_selection() {
            bail!("No slots selected");
        }
        Ok(selection)
    }

    pub async fn checkout(&mut self, uuid: &str, selection: &ScheduleSelection) -> Result<String> {
        self.enter(&Route::Checkout(uuid.to_string()))?;
        if !selection.has_selection() {
            bail!("No slots selected");
        }

        match self.api.create_order(selection.selected_ids()).await {
            Ok(order) => {
                info!(code = %order.code, "Order created");
                Ok(format!(
                    "Order {} created ({}).\nComplete your payment at:\n  {}",
                    order.code, order.amount, order.payment_link
                ))
            }
            Err(e) => Err(self.api_failure(e)),
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn register(&mut self, request: &RegisterRequest) -> Result<String> {
        if let Some(message) = self.auth_entry_redirect(&Route::Register) {
            return Ok(message);
        }
        let errors = request.validate();
        if !errors.is_empty() {
            bail!("Please fix the following:\n{}", format_field_errors(&errors));
        }

        match self.api.register(request).await {
            Ok(user) => {
                info!(user = %user.uuid, "Registered");
                Ok(format!(
                    "Account created for {}. Run `fieldbook login` to sign in.",
                    user.display_name()
                ))
            }
            Err(e) => Err(self.api_failure(e)),
        }
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<String> {
        if let Some(message) = self.auth_entry_redirect(&Route::Login) {
            return Ok(message);
        }
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let errors = request.validate();
        if !errors.is_empty() {
            bail!("Please fix the following:\n{}", format_field_errors(&errors));
        }

        let result = match self.api.login(username, password).await {
            Ok(result) => result,
            Err(e) => return Err(self.api_failure(e)),
        };

        let greeting = result.user.display_name().to_string();
        self.api.set_token(result.token.clone());
        if let Err(e) = self.session.login(result.token, result.user) {
            warn!(error = %e, "Failed to save session");
        }

        self.config.last_username = Some(username.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        Ok(format!("Logged in as {}.", greeting))
    }

    pub fn logout(&mut self) -> Result<String> {
        let was_logged_in = self.session.current_session().is_some();
        self.session.logout().context("Failed to clear stored session")?;
        self.api.clear_token();
        Ok(if was_logged_in {
            "Logged out.".to_string()
        } else {
            "Not logged in.".to_string()
        })
    }

    pub fn whoami(&self) -> String {
        match self.session.current_session() {
            Some(session) => format!("Logged in as {}.", session.user.display_name()),
            None => "Not logged in.".to_string(),
        }
    }

    // =========================================================================
    // Profile and orders
    // =========================================================================

    pub async fn profile(&mut self) -> Result<String> {
        self.enter(&Route::Profile)?;
        match self.api.current_user().await {
            Ok(user) => Ok(render::profile(&user)),
            Err(e) => Err(self.api_failure(e)),
        }
    }

    pub async fn update_profile(&mut self, changes: ProfileChanges) -> Result<String> {
        self.enter(&Route::Profile)?;
        let current = match self.api.current_user().await {
            Ok(user) => user,
            Err(e) => return Err(self.api_failure(e)),
        };

        let mut request = UpdateUserRequest::from_profile(&current);
        if let Some(name) = changes.name {
            request.name = name;
        }
        if let Some(email) = changes.email {
            request.email = email;
        }
        if let Some(phone_number) = changes.phone_number {
            request.phone_number = phone_number;
        }
        if let Some(username) = changes.username {
            request.username = username;
        }
        if let Some((password, confirm_password)) = changes.password {
            request.password = Some(password);
            request.confirm_password = Some(confirm_password);
        }

        let errors = request.validate();
        if !errors.is_empty() {
            bail!("Please fix the following:\n{}", format_field_errors(&errors));
        }

        let updated = match self.api.update_user(&current.uuid, &request).await {
            Ok(user) => user,
            Err(e) => return Err(self.api_failure(e)),
        };

        // Keep the stored profile in step; the token is unchanged
        if let Some(token) = self.session.token().map(str::to_string) {
            if let Err(e) = self.session.login(token, updated.clone()) {
                warn!(error = %e, "Failed to save session");
            }
        }

        Ok(format!("Profile updated.\n\n{}", render::profile(&updated)))
    }

    pub async fn orders(&mut self) -> Result<String> {
        self.enter(&Route::Orders)?;
        match self.api.list_orders().await {
            Ok(orders) => Ok(render::orders(&orders)),
            Err(e) => Err(self.api_failure(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use fieldbook_core::auth::{MemoryStorage, AUTH_TOKEN_KEY};
    use fieldbook_core::config::ServiceTarget;
    use fieldbook_core::signing::FixedClock;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server_uri: &str) -> ApiClient {
        let target = |name: &str| ServiceTarget::new(server_uri, name, "key").unwrap();
        let config = ApiConfig {
            field: target("field-service"),
            user: target("user-service"),
            order: target("order-service"),
        };
        ApiClient::with_clock(config, Arc::new(FixedClock(1_700_000_000))).unwrap()
    }

    fn app_with(storage: MemoryStorage, server_uri: &str) -> App {
        let config = Config {
            data_dir: Some(std::env::temp_dir()),
            ..Config::default()
        };
        App::with_parts(config, Box::new(storage), api(server_uri))
    }

    fn logged_in_storage() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.set(AUTH_TOKEN_KEY, "tok1").unwrap();
        storage
            .set(fieldbook_core::auth::USER_DATA_KEY, r#"{"token":"tok1","uuid":"u1","name":"Budi"}"#)
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn test_guarded_command_without_session_asks_for_login() {
        let server = MockServer::start().await;
        let mut app = app_with(MemoryStorage::new(), &server.uri());

        let err = app.orders().await.unwrap_err();
        assert!(err.to_string().contains("log in first"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hydrated_session_is_used_for_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/order/user"))
            .and(header("authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_with(logged_in_storage(), &server.uri());
        let output = app.orders().await.unwrap();
        assert!(output.contains("No bookings yet"));
    }

    #[tokio::test]
    async fn test_rejected_token_forces_logout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/auth/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "status": "error",
                "message": "unauthorized"
            })))
            .mount(&server)
            .await;

        let storage = logged_in_storage();
        let mut app = app_with(storage.clone(), &server.uri());
        let err = app.profile().await.unwrap_err();
        assert!(err.to_string().contains("log in again"));
        assert_eq!(app.whoami(), "Not logged in.");
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_login_entry_redirects_when_logged_in() {
        let server = MockServer::start().await;
        let mut app = app_with(logged_in_storage(), &server.uri());
        let output = app.login("budis", "password1").await.unwrap();
        assert_eq!(output, "Already logged in. Logged in as Budi.");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_validation_happens_before_request() {
        let server = MockServer::start().await;
        let mut app = app_with(MemoryStorage::new(), &server.uri());
        let err = app.login("bud", "short").await.unwrap_err();
        assert!(err.to_string().contains("username"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_select_slots_rejects_booked_hour() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/field/schedule/lists/f1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": [
                    {"uuid": "s1", "date": "05 Mei", "pricePerHour": "Rp.100.000",
                     "status": "available", "time": "08:00:00 - 09:00:00"},
                    {"uuid": "s2", "date": "05 Mei", "pricePerHour": "Rp.100.000",
                     "status": "booked", "time": "09:00:00 - 10:00:00"}
                ]
            })))
            .mount(&server)
            .await;

        let mut app = app_with(logged_in_storage(), &server.uri());
        let selection = app
            .select_slots("f1", None, &["08:00".to_string()])
            .await
            .unwrap();
        assert_eq!(selection.total_price(), 100000);

        let err = app
            .select_slots("f1", None, &["08:00".to_string(), "09:00".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("09:00"));
    }

    #[test]
    fn test_logout_twice() {
        let storage = logged_in_storage();
        let mut app = app_with(storage.clone(), "http://127.0.0.1:9");
        assert_eq!(app.logout().unwrap(), "Logged out.");
        assert_eq!(app.logout().unwrap(), "Not logged in.");
        assert!(storage.is_empty());
    }
}
