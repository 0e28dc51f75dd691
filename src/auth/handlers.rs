use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::{
    api::user::UserResponse,
    auth::{jwt::generate_token, password::verify_password},
    config::Config,
    error::ApiError,
    model::user::User,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "jane@company.com")]
    pub email: String,
    #[schema(example = "s3cret!")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Login endpoint
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, req), fields(email = %req.email))]
pub async fn login(
    req: web::Json<LoginRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Email and password required"));
    }

    debug!("Fetching user from database");

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password, first_name, last_name, role, is_active,
               employee_id, created_at, updated_at
        FROM users
        WHERE email = ? AND deleted_at IS NULL
        "#,
    )
    .bind(req.email.trim())
    .fetch_optional(pool.get_ref())
    .await?;

    let Some(user) = user else {
        info!("Invalid credentials: user not found");
        return Err(ApiError::InvalidCredentials);
    };

    // Deactivated accounts fail exactly like bad credentials
    if !user.is_active {
        info!("Invalid credentials: account deactivated");
        return Err(ApiError::InvalidCredentials);
    }

    debug!("Verifying password");

    if !verify_password(&req.password, &user.password) {
        info!("Invalid credentials: password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    debug!("Generating access token");

    let token = generate_token(
        user.id,
        user.email.clone(),
        user.role,
        user.employee_id,
        &config.jwt_secret,
        config.token_ttl,
    )?;

    // Non-fatal: login still succeeds if the timestamp update fails
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// Logout endpoint
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out")
    ),
    tag = "Auth"
)]
pub async fn logout() -> Result<HttpResponse, ApiError> {
    // Stateless tokens: the client discards the token, nothing to revoke
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Logged out successfully"
    })))
}
