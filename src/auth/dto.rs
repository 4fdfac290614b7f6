use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;
use crate::error::{ApiError, ApiResult};
use crate::storage::{PhotoRef, PhotoUpload};

pub const USER_TYPES: &[&str] = &["tenant", "room-owner", "service-provider"];
pub const OCCUPATIONS: &[&str] = &["student", "working-professional", "other"];

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn ensure_one_of(field: &str, value: &str, allowed: &[&str]) -> ApiResult<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Invalid {}: must be one of {}",
            field,
            allowed.join(", ")
        )))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub contact: String,
    pub user_type: String,
    pub occupation: Option<String>,
    pub profile_photo: Option<PhotoUpload>,
}

impl RegisterRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let required = [
            &self.username,
            &self.email,
            &self.password,
            &self.contact,
            &self.user_type,
        ];
        if required.iter().any(|f| f.trim().is_empty()) {
            return Err(ApiError::BadRequest("All fields are required".into()));
        }
        if !is_valid_email(&self.email) {
            return Err(ApiError::BadRequest("Invalid email".into()));
        }
        if self.password.len() < 8 {
            return Err(ApiError::BadRequest("Password too short".into()));
        }
        ensure_one_of("userType", &self.user_type, USER_TYPES)?;
        if let Some(occupation) = &self.occupation {
            ensure_one_of("occupation", occupation, OCCUPATIONS)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResendOtpRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDetailsRequest {
    pub username: Option<String>,
    pub contact: Option<String>,
    pub user_type: Option<String>,
    pub occupation: Option<String>,
    pub profile_photo: Option<PhotoUpload>,
}

impl UpdateDetailsRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(user_type) = &self.user_type {
            ensure_one_of("userType", user_type, USER_TYPES)?;
        }
        if let Some(occupation) = &self.occupation {
            ensure_one_of("occupation", occupation, OCCUPATIONS)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteAccountRequest {
    pub password: String,
}

/// The user as returned to clients: password, refresh token and OTP state
/// stripped.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub contact: String,
    pub user_type: String,
    pub occupation: Option<String>,
    pub profile_photo: Option<PhotoRef>,
    pub is_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            contact: user.contact,
            user_type: user.user_type,
            occupation: user.occupation,
            profile_photo: user.profile_photo.map(|p| p.0),
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            username: "asha".into(),
            email: "asha@example.com".into(),
            password: "long-enough".into(),
            contact: "9876543210".into(),
            user_type: "room-owner".into(),
            occupation: None,
            profile_photo: None,
        }
    }

    #[test]
    fn register_accepts_valid_payload() {
        assert!(register_request().validate().is_ok());
    }

    #[test]
    fn register_rejects_blank_required_fields() {
        let mut req = register_request();
        req.contact = "   ".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn register_missing_fields_deserialize_and_fail_validation() {
        // Absent fields default to empty so the handler can answer with the
        // 400 envelope instead of a body-rejection.
        let req: RegisterRequest =
            serde_json::from_value(serde_json::json!({"email": "a@b.co"})).unwrap();
        assert!(req.username.is_empty());
        assert!(req.validate().is_err());
    }

    #[test]
    fn register_rejects_bad_email_and_short_password() {
        let mut req = register_request();
        req.email = "not-an-email".into();
        assert!(req.validate().is_err());

        let mut req = register_request();
        req.password = "short".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn register_rejects_unknown_role() {
        let mut req = register_request();
        req.user_type = "landlord".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn email_regex_basics() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[test]
    fn public_user_serializes_camel_case() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            username: "asha".into(),
            email: "asha@example.com".into(),
            contact: "9876543210".into(),
            user_type: "tenant".into(),
            occupation: Some("student".into()),
            profile_photo: None,
            is_verified: true,
            created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userType"], "tenant");
        assert_eq!(json["isVerified"], true);
        assert!(json.get("password").is_none());
        assert!(json.get("refreshToken").is_none());
    }
}
