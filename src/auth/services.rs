use axum::extract::FromRef;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_dummy, verify_password},
        repo_types::{NewUser, Role, User},
    },
    db::StoreError,
    error::ApiError,
    state::AppState,
    validation::{is_valid_email, present, require_fields, Violations},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const EMAIL_TAKEN: &str = "User with this email already exists";
const BAD_ROLE: &str = "Role must be either freelancer or client";

fn issue_tokens(state: &AppState, user: User, message: String) -> Result<AuthResponse, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id, user.role)?;
    let refresh_token = keys.sign_refresh(user.id, user.role)?;
    Ok(AuthResponse {
        message,
        user: PublicUser::from(user),
        access_token,
        refresh_token,
    })
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<AuthResponse, ApiError> {
    require_fields(
        "All fields are required",
        &[
            ("name", present(&req.name)),
            ("email", present(&req.email)),
            ("password", present(&req.password)),
            ("role", present(&req.role)),
        ],
    )?;
    let name = req.name.unwrap_or_default().trim().to_string();
    let email = req.email.unwrap_or_default().trim().to_lowercase();
    let password = req.password.unwrap_or_default();
    let role_raw = req.role.unwrap_or_default();

    // A taken email wins over every other complaint about the payload.
    if state.store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict(EMAIL_TAKEN.into()));
    }

    let mut v = Violations::new();
    v.length(
        &name,
        2,
        50,
        "Name must be at least 2 characters long",
        "Name cannot exceed 50 characters",
    );
    v.check(is_valid_email(&email), "Please enter a valid email");
    v.check(
        password.chars().count() >= 6,
        "Password must be at least 6 characters long",
    );
    let role = Role::parse(&role_raw);
    v.check(role.is_some(), BAD_ROLE);
    let role = v.finish(role)?;

    let password_hash = hash_password(&password)?;
    let user = state
        .store
        .create_user(NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => ApiError::Conflict(EMAIL_TAKEN.into()),
            other => other.into(),
        })?;

    info!(user_id = %user.id, role = role.as_str(), "user registered");
    issue_tokens(state, user, "Registration successful! Welcome to FreelanceHive!".into())
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<AuthResponse, ApiError> {
    require_fields(
        "Email and password are required",
        &[
            ("email", present(&req.email)),
            ("password", present(&req.password)),
        ],
    )?;
    let email = req.email.unwrap_or_default().trim().to_lowercase();
    let password = req.password.unwrap_or_default();

    let user = state.store.find_user_by_email(&email).await?;
    let Some(user) = user else {
        verify_dummy(&password);
        warn!(email = %email, "login unknown email");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    info!(user_id = %user.id, "user logged in");
    let message = format!("Welcome back, {}!", user.name);
    issue_tokens(state, user, message)
}

pub async fn refresh(state: &AppState, req: RefreshRequest) -> Result<AuthResponse, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_refresh(&req.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::Unauthorized("Invalid or expired refresh token".into())
    })?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    issue_tokens(state, user, "Token refreshed".into())
}

pub async fn me(state: &AppState, user_id: Uuid) -> Result<PublicUser, ApiError> {
    let user = state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    Ok(PublicUser::from(user))
}
