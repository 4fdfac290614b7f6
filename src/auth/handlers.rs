use axum::{
    extract::{FromRef, State},
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, DeleteAccountRequest, LoginRequest, PublicUser,
            RefreshRequest, RegisterRequest, ResendOtpRequest, UpdateDetailsRequest,
            VerifyOtpRequest,
        },
        jwt::{
            auth_cookie_headers, clear_cookie_headers, cookie_value, AuthUser, JwtKeys,
            REFRESH_COOKIE,
        },
        otp::{self, OtpRejection},
        password::{hash_password, verify_password},
        repo::{self, NewUser, User},
    },
    error::{ApiError, ApiResponse, ApiResult},
    state::AppState,
    storage::{self, delete_photos_best_effort},
};

const OTP_SUBJECT: &str = "StayMate email verification";

/// Signs a fresh token pair and persists the refresh token, invalidating
/// whatever token was stored before.
async fn issue_token_pair(state: &AppState, user: &User) -> ApiResult<(String, String)> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    User::set_refresh_token(&state.db, user.id, Some(&refresh_token)).await?;
    Ok((access_token, refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    if User::username_or_email_exists(&state.db, payload.username.trim(), &payload.email).await? {
        warn!(email = %payload.email, "registration conflict");
        return Err(ApiError::Conflict(
            "User already existed - username or email".into(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;

    let profile_photo = match &payload.profile_photo {
        Some(upload) => Some(storage::upload_photo(state.storage.as_ref(), "profiles", upload).await?),
        None => None,
    };

    let code = otp::generate_code();
    let now = OffsetDateTime::now_utc();
    let user = User::create(
        &state.db,
        NewUser {
            username: payload.username.trim().to_string(),
            email: payload.email.clone(),
            contact: payload.contact.trim().to_string(),
            password_hash,
            user_type: payload.user_type.clone(),
            occupation: payload.occupation.clone(),
            profile_photo,
            otp_code: code.clone(),
            otp_expires_at: now + otp::OTP_TTL,
            otp_last_sent_at: now,
        },
    )
    .await?;

    state
        .mailer
        .send(&user.email, OTP_SUBJECT, &otp::email_body(&code))
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(ApiResponse::created(
        PublicUser::from(user),
        "User created successfully",
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = payload.email.trim().to_lowercase();
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let now = OffsetDateTime::now_utc();
    match otp::check_code(
        user.otp_code.as_deref(),
        user.otp_expires_at,
        payload.code.trim(),
        now,
    ) {
        Ok(()) => {
            User::mark_verified(&state.db, user.id).await?;
            info!(user_id = %user.id, "email verified");
            Ok(ApiResponse::ok(json!({}), "Email verified successfully"))
        }
        Err(OtpRejection::Missing) => Err(ApiError::BadRequest(
            "No verification code has been issued".into(),
        )),
        Err(OtpRejection::Mismatch) => {
            warn!(user_id = %user.id, "otp mismatch");
            Err(ApiError::BadRequest("Invalid verification code".into()))
        }
        Err(OtpRejection::Expired) => Err(ApiError::BadRequest(
            "Verification code has expired".into(),
        )),
    }
}

#[instrument(skip(state, payload))]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<ResendOtpRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = payload.email.trim().to_lowercase();
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if user.is_verified {
        return Err(ApiError::BadRequest("Email is already verified".into()));
    }

    let now = OffsetDateTime::now_utc();
    if !otp::resend_allowed(user.otp_last_sent_at, now) {
        return Err(ApiError::TooManyRequests(
            "OTP was sent recently, try again in a minute".into(),
        ));
    }

    let code = otp::generate_code();
    User::set_otp(&state.db, user.id, &code, now + otp::OTP_TTL, now).await?;
    state
        .mailer
        .send(&user.email, OTP_SUBJECT, &otp::email_body(&code))
        .await?;

    info!(user_id = %user.id, "otp resent");
    Ok(ApiResponse::ok(json!({}), "Verification code sent"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let identifier = payload.identifier.trim();
    if identifier.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username/Email and password are required".into(),
        ));
    }

    let user = User::find_by_identifier(&state.db, identifier)
        .await?
        .ok_or_else(|| {
            warn!(identifier = %identifier, "login unknown identifier");
            ApiError::Unauthorized("Invalid username or password".into())
        })?;

    // Verification status outranks the password check: an unverified
    // account gets 403 no matter what was typed.
    if !user.is_verified {
        return Err(ApiError::Forbidden("Email is not verified".into()));
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid username or password".into()));
    }

    let (access_token, refresh_token) = issue_token_pair(&state, &user).await?;
    let keys = JwtKeys::from_ref(&state);

    info!(user_id = %user.id, "user logged in");
    Ok((
        AppendHeaders(auth_cookie_headers(&keys, &access_token, &refresh_token)),
        ApiResponse::ok(
            json!({ "user": PublicUser::from(user) }),
            "User successfully logged in",
        ),
    ))
}

#[instrument(skip(state, headers, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<RefreshRequest>>,
) -> ApiResult<impl IntoResponse> {
    let presented = cookie_value(&headers, REFRESH_COOKIE)
        .or_else(|| payload.and_then(|Json(p)| p.refresh_token))
        .ok_or_else(|| ApiError::Unauthorized("Refresh token not found".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&presented)
        .map_err(|_| ApiError::Forbidden("Invalid refresh token".into()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Forbidden("User not found".into()))?;

    // Single-active-token policy: anything but the currently stored token
    // is dead, even if its signature still verifies.
    if user.refresh_token.as_deref() != Some(presented.as_str()) {
        warn!(user_id = %user.id, "stale refresh token presented");
        return Err(ApiError::Forbidden("Refresh token does not match".into()));
    }

    let (access_token, refresh_token) = issue_token_pair(&state, &user).await?;

    info!(user_id = %user.id, "token pair rotated");
    Ok((
        AppendHeaders(auth_cookie_headers(&keys, &access_token, &refresh_token)),
        ApiResponse::ok(
            json!({}),
            "Successfully updated access and refresh tokens",
        ),
    ))
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    User::set_refresh_token(&state.db, user.id, None).await?;
    info!(user_id = %user.id, "user logged out");
    Ok((
        AppendHeaders(clear_cookie_headers()),
        ApiResponse::ok(json!({}), "Successfully logged out user"),
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.old_password.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::BadRequest(
            "Both old and new password are required".into(),
        ));
    }
    if payload.new_password.len() < 8 {
        return Err(ApiError::BadRequest("Password too short".into()));
    }
    if !verify_password(&payload.old_password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Invalid old password".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    User::set_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

#[instrument(skip(state, user, payload))]
pub async fn update_details(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    Json(payload): Json<UpdateDetailsRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    if let Some(username) = payload.username {
        let username = username.trim().to_string();
        if !username.is_empty() && username != user.username {
            if User::username_taken_by_other(&state.db, &username, user.id).await? {
                return Err(ApiError::Conflict("Username already taken".into()));
            }
            user.username = username;
        }
    }
    if let Some(contact) = payload.contact {
        if !contact.trim().is_empty() {
            user.contact = contact.trim().to_string();
        }
    }
    if let Some(user_type) = payload.user_type {
        user.user_type = user_type;
    }
    if let Some(occupation) = payload.occupation {
        user.occupation = Some(occupation);
    }

    if let Some(upload) = &payload.profile_photo {
        let new_photo = storage::upload_photo(state.storage.as_ref(), "profiles", upload).await?;
        if let Some(old) = user.profile_photo.take() {
            if let Some(public_id) = old.0.public_id() {
                state.storage.delete(&public_id).await?;
            }
        }
        user.profile_photo = Some(sqlx::types::Json(new_photo));
    }

    let updated = User::update_profile(&state.db, &user).await?;
    info!(user_id = %updated.id, "user details updated");
    Ok(ApiResponse::ok(
        PublicUser::from(updated),
        "Details updated successfully",
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<DeleteAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Enter password".into()));
    }
    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Incorrect password".into()));
    }

    let user_id = user.id;
    let photos =
        repo::delete_cascade(&state.db, user_id, user.profile_photo.map(|p| p.0)).await?;

    // Relational state is gone; stored objects are cleaned best-effort and
    // must not resurrect the request on failure.
    delete_photos_best_effort(state.storage.as_ref(), &photos).await;

    info!(user_id = %user_id, "user deleted");
    Ok(ApiResponse::ok(json!({}), "User deleted successfully"))
}

#[instrument(skip_all)]
pub async fn get_details(AuthUser(user): AuthUser) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::ok(PublicUser::from(user), "User details"))
}
