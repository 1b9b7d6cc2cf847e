use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{calificacion, comentario, favorito, material, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::mailer;
use crate::models::auth::{
    LoginRequest, LoginResponse, MeResponse, MessageResponse, PasswordResetConfirmRequest,
    PasswordResetRequest, ProfileResponse, ProfileStatistics, RegisterRequest, RegisterResponse,
    UpdateProfileRequest, UserSummary, validate_login_request, validate_register_request,
};
use crate::state::AppState;
use crate::utils::{hash, jwt};

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Register a new account",
    description = "Creates an unverified account and emails a verification link. \
        The account cannot log in until the link is followed.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let email = payload.email.trim().to_lowercase();

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {e}")))?;

    let new_user = user::ActiveModel {
        email: Set(email),
        password: Set(hash),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        is_verified: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Registration race condition: unique constraint caught on insert");
            AppError::EmailTaken
        }
        _ => AppError::from(e),
    })?;

    send_verification_email(&state, &user).await;

    Ok((StatusCode::CREATED, Json(RegisterResponse::from(user))))
}

/// Mint a verification token and mail the link. Registration has already
/// committed, so delivery failures are logged rather than surfaced.
async fn send_verification_email(state: &AppState, user: &user::Model) {
    let token = match jwt::sign_action(
        user.id,
        &user.email,
        jwt::ACTION_VERIFY_EMAIL,
        &state.config.auth.jwt_secret,
    ) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(user_id = user.id, "failed to mint verification token: {e}");
            return;
        }
    };

    let name = if user.first_name.is_empty() {
        &user.email
    } else {
        &user.first_name
    };
    let (subject, body) =
        mailer::verification_email(&state.config.email.frontend_domain, name, &token);
    if let Err(e) = state.mailer.send(&user.email, &subject, &body).await {
        tracing::warn!(user_id = user.id, "failed to send verification email: {e}");
    }
}

#[utoipa::path(
    get,
    path = "/verify-email/{token}",
    tag = "Auth",
    operation_id = "verifyEmail",
    summary = "Verify an account via an emailed token",
    description = "Marks the account as verified. Safe to call repeatedly with the same token.",
    params(("token" = String, Path, description = "Verification token from the email")),
    responses(
        (status = 200, description = "Account verified", body = MessageResponse),
        (status = 401, description = "Invalid or expired token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, token))]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let claims = jwt::verify_action(&token, jwt::ACTION_VERIFY_EMAIL, &state.config.auth.jwt_secret)
        .map_err(|_| AppError::TokenInvalid)?;

    let user = user::Entity::find_by_id(claims.uid)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    if !user.is_verified {
        let mut active: user::ActiveModel = user.into();
        active.is_verified = Set(true);
        active.update(&state.db).await?;
    }

    Ok(Json(MessageResponse {
        message: "Cuenta verificada correctamente".into(),
    }))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in with email and password",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Bad credentials (INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 403, description = "Account not verified (ACCOUNT_NOT_VERIFIED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let email = payload.email.trim().to_lowercase();

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {e}")))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_verified {
        return Err(AppError::AccountNotVerified);
    }

    let token = jwt::sign(
        user.id,
        &user.email,
        state.config.auth.token_ttl_days,
        &state.config.auth.jwt_secret,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {e}")))?;

    Ok(Json(LoginResponse {
        token,
        user: UserSummary::from(user),
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "me",
    summary = "Current authenticated identity",
    responses(
        (status = 200, description = "Caller identity", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(auth_user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: auth_user.user_id,
        email: auth_user.email,
    })
}

#[utoipa::path(
    get,
    path = "/profile",
    tag = "Auth",
    operation_id = "getProfile",
    summary = "Caller's profile with usage statistics",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = find_user(&state.db, auth_user.user_id).await?;
    let statistics = collect_statistics(&state.db, user.id).await?;

    Ok(Json(ProfileResponse {
        user: UserSummary::from(user),
        statistics,
    }))
}

#[utoipa::path(
    patch,
    path = "/profile",
    tag = "Auth",
    operation_id = "updateProfile",
    summary = "Update the caller's name",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    for name in [&payload.first_name, &payload.last_name].into_iter().flatten() {
        if name.chars().count() > 30 {
            return Err(AppError::Validation(
                "Names must be at most 30 characters".into(),
            ));
        }
    }

    let user = find_user(&state.db, auth_user.user_id).await?;
    let mut active: user::ActiveModel = user.into();
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(last_name.trim().to_string());
    }
    let user = active.update(&state.db).await?;

    let statistics = collect_statistics(&state.db, user.id).await?;
    Ok(Json(ProfileResponse {
        user: UserSummary::from(user),
        statistics,
    }))
}

#[utoipa::path(
    post,
    path = "/password-reset",
    tag = "Auth",
    operation_id = "requestPasswordReset",
    summary = "Request a password-reset email",
    description = "Always answers with a generic acknowledgement so the endpoint \
        cannot be used to probe which addresses are registered.",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Acknowledged", body = MessageResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn password_reset(
    State(state): State<AppState>,
    AppJson(payload): AppJson<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::Validation("Email must not be empty".into()));
    }

    if let Some(user) = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
    {
        match jwt::sign_action(
            user.id,
            &user.email,
            jwt::ACTION_RESET_PASSWORD,
            &state.config.auth.jwt_secret,
        ) {
            Ok(token) => {
                let name = if user.first_name.is_empty() {
                    &user.email
                } else {
                    &user.first_name
                };
                let (subject, body) = mailer::password_reset_email(
                    &state.config.email.frontend_domain,
                    name,
                    &token,
                );
                if let Err(e) = state.mailer.send(&user.email, &subject, &body).await {
                    tracing::warn!(user_id = user.id, "failed to send reset email: {e}");
                }
            }
            Err(e) => tracing::warn!(user_id = user.id, "failed to mint reset token: {e}"),
        }
    }

    Ok(Json(MessageResponse {
        message: "Si la dirección existe, recibirás un correo con instrucciones".into(),
    }))
}

#[utoipa::path(
    post,
    path = "/password-reset/confirm",
    tag = "Auth",
    operation_id = "confirmPasswordReset",
    summary = "Set a new password using an emailed reset token",
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid or expired token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn password_reset_confirm(
    State(state): State<AppState>,
    AppJson(payload): AppJson<PasswordResetConfirmRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }

    let claims = jwt::verify_action(
        &payload.token,
        jwt::ACTION_RESET_PASSWORD,
        &state.config.auth.jwt_secret,
    )
    .map_err(|_| AppError::TokenInvalid)?;

    let user = user::Entity::find_by_id(claims.uid)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {e}")))?;

    let mut active: user::ActiveModel = user.into();
    active.password = Set(hash);
    active.update(&state.db).await?;

    Ok(Json(MessageResponse {
        message: "Contraseña actualizada correctamente".into(),
    }))
}

async fn find_user(db: &DatabaseConnection, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

async fn collect_statistics(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<ProfileStatistics, AppError> {
    let materials_uploaded = material::Entity::find()
        .filter(material::Column::UsuarioId.eq(user_id))
        .count(db)
        .await?;
    let favorites = favorito::Entity::find()
        .filter(favorito::Column::UsuarioId.eq(user_id))
        .count(db)
        .await?;
    let comments = comentario::Entity::find()
        .filter(comentario::Column::UsuarioId.eq(user_id))
        .count(db)
        .await?;
    let ratings = calificacion::Entity::find()
        .filter(calificacion::Column::UsuarioId.eq(user_id))
        .count(db)
        .await?;

    Ok(ProfileStatistics {
        materials_uploaded,
        favorites,
        comments,
        ratings,
    })
}
