use serde::{Deserialize, Serialize};

/// Minimum lengths enforced by the auth forms.
const MIN_USERNAME_LENGTH: usize = 5;
const MIN_PASSWORD_LENGTH: usize = 8;
const MIN_NAME_LENGTH: usize = 3;
const MIN_EMAIL_LENGTH: usize = 5;
const MIN_PHONE_LENGTH: usize = 9;

/// Profile record returned by the user service.
///
/// Only `uuid` is required; everything else is omitted from the serialized
/// form when absent so that a stored profile round-trips exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserProfile {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: None,
            username: None,
            email: None,
            phone_number: None,
            role: None,
        }
    }

    /// Best name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.uuid)
    }
}

/// One field-level validation failure, as reported by the forms or the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

fn check_min(errors: &mut Vec<FieldError>, field: &str, label: &str, value: &str, min: usize) {
    if value.chars().count() < min {
        errors.push(FieldError::new(
            field,
            format!("{} must be at least {} characters", label, min),
        ));
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_min(&mut errors, "username", "Username", &self.username, MIN_USERNAME_LENGTH);
        check_min(&mut errors, "password", "Password", &self.password, MIN_PASSWORD_LENGTH);
        errors
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_min(&mut errors, "name", "Name", &self.name, MIN_NAME_LENGTH);
        check_min(&mut errors, "username", "Username", &self.username, MIN_USERNAME_LENGTH);
        check_min(&mut errors, "email", "Email", &self.email, MIN_EMAIL_LENGTH);
        check_min(&mut errors, "phoneNumber", "Phone number", &self.phone_number, MIN_PHONE_LENGTH);
        check_min(&mut errors, "password", "Password", &self.password, MIN_PASSWORD_LENGTH);
        if self.confirm_password != self.password {
            errors.push(FieldError::new("confirmPassword", "Passwords do not match"));
        }
        errors
    }
}

/// Profile update. The password pair is only sent when a new password is set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_password: Option<String>,
}

impl UpdateUserRequest {
    /// Start from the current profile, keeping the password unchanged.
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            name: profile.name.clone().unwrap_or_default(),
            email: profile.email.clone().unwrap_or_default(),
            phone_number: profile.phone_number.clone().unwrap_or_default(),
            username: profile.username.clone().unwrap_or_default(),
            password: None,
            confirm_password: None,
        }
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_min(&mut errors, "name", "Name", &self.name, MIN_NAME_LENGTH);
        check_min(&mut errors, "username", "Username", &self.username, MIN_USERNAME_LENGTH);
        check_min(&mut errors, "email", "Email", &self.email, MIN_EMAIL_LENGTH);
        check_min(&mut errors, "phoneNumber", "Phone number", &self.phone_number, MIN_PHONE_LENGTH);
        if let Some(ref password) = self.password {
            check_min(&mut errors, "password", "Password", password, MIN_PASSWORD_LENGTH);
            if self.confirm_password.as_ref() != Some(password) {
                errors.push(FieldError::new("confirmPassword", "Passwords do not match"));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_omits_absent_fields() {
        let profile = UserProfile::new("u1");
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value, serde_json::json!({"uuid": "u1"}));
    }

    #[test]
    fn test_profile_parses_service_shape() {
        let json = r#"{
            "uuid": "0b6c1e8e-3f1a-4f1e-9a7e-2d7f9c1b2a33",
            "name": "Budi Santoso",
            "username": "budis",
            "email": "budi@example.com",
            "phoneNumber": "081234567890",
            "role": "customer"
        }"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.phone_number.as_deref(), Some("081234567890"));
        assert_eq!(profile.display_name(), "Budi Santoso");
    }

    #[test]
    fn test_profile_requires_uuid() {
        assert!(serde_json::from_str::<UserProfile>(r#"{"name":"x"}"#).is_err());
    }

    #[test]
    fn test_login_validation() {
        let ok = LoginRequest { username: "budis".into(), password: "password1".into() };
        assert!(ok.validate().is_empty());

        let bad = LoginRequest { username: "bud".into(), password: "short".into() };
        let fields: Vec<_> = bad.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["username", "password"]);
    }

    #[test]
    fn test_register_validation() {
        let mut req = RegisterRequest {
            name: "Budi".into(),
            email: "b@x.id".into(),
            phone_number: "081234567".into(),
            username: "budis".into(),
            password: "password1".into(),
            confirm_password: "password1".into(),
        };
        assert!(req.validate().is_empty());

        req.confirm_password = "password2".into();
        req.phone_number = "0812".into();
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["phoneNumber", "confirmPassword"]);
    }

    #[test]
    fn test_update_request_skips_password_when_unchanged() {
        let mut profile = UserProfile::new("u1");
        profile.name = Some("Budi".into());
        profile.username = Some("budis".into());
        profile.email = Some("budi@example.com".into());
        profile.phone_number = Some("081234567890".into());

        let req = UpdateUserRequest::from_profile(&profile);
        assert!(req.validate().is_empty());
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("password").is_none());
        assert!(value.get("confirmPassword").is_none());
        assert_eq!(value["phoneNumber"], "081234567890");
    }

    #[test]
    fn test_update_request_checks_new_password() {
        let mut req = UpdateUserRequest::from_profile(&UserProfile::new("u1"));
        req.name = "Budi".into();
        req.username = "budis".into();
        req.email = "budi@example.com".into();
        req.phone_number = "081234567890".into();
        req.password = Some("password1".into());
        req.confirm_password = Some("password1".into());
        assert!(req.validate().is_empty());

        req.confirm_password = None;
        assert_eq!(req.validate()[0].field, "confirmPassword");
    }
}
