use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::{
    auth::password::hash_password,
    error::ApiError,
    model::user::User,
    policy::{self, CallerIdentity, Role},
    utils::db_utils::SqlValue,
    utils::{email_cache, email_filter},
};

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "jane@company.com")]
    pub email: String,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "Jane")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    #[schema(example = 42, nullable = true)]
    pub employee_id: Option<u64>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: format!("{} {}", user.first_name, user.last_name),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            is_active: user.is_active,
            employee_id: user.employee_id,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "jane@company.com", format = "email")]
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[schema(example = 42, nullable = true)]
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub employee_id: Option<u64>,
}

const USER_SELECT: &str = r#"
    SELECT id, email, password, first_name, last_name, role, is_active,
           employee_id, created_at, updated_at
    FROM users
"#;

async fn fetch_user(pool: &MySqlPool, id: u64) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>(&format!("{} WHERE id = ? AND deleted_at IS NULL", USER_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::NotFound("User"))
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email.trim().to_lowercase();

    // 1️⃣ Cuckoo filter — fast negative
    if !email_filter::might_exist(&email) {
        return true;
    }

    // 2️⃣ Moka cache — fast positive
    if email_cache::is_taken(&email).await {
        return false;
    }

    // 3️⃣ Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? AND deleted_at IS NULL LIMIT 1)",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

/// Current user profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_current_user(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let user = fetch_user(pool.get_ref(), caller.user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Update own profile (names, password)
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "No fields provided"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn update_current_user(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpdateProfile>,
) -> Result<HttpResponse, ApiError> {
    let mut sets: Vec<&str> = Vec::new();
    let mut args: Vec<SqlValue> = Vec::new();

    if let Some(first_name) = &payload.first_name {
        sets.push("first_name = ?");
        args.push(SqlValue::String(first_name.clone()));
    }
    if let Some(last_name) = &payload.last_name {
        sets.push("last_name = ?");
        args.push(SqlValue::String(last_name.clone()));
    }
    if let Some(password) = &payload.password {
        if password.is_empty() {
            return Err(ApiError::validation("Password must not be empty"));
        }
        sets.push("password = ?");
        args.push(SqlValue::String(hash_password(password)?));
    }

    if sets.is_empty() {
        return Err(ApiError::validation("No fields provided for update"));
    }

    let sql = format!(
        "UPDATE users SET {}, updated_at = NOW() WHERE id = ? AND deleted_at IS NULL",
        sets.join(", ")
    );

    let result = crate::bind_values!(sqlx::query(&sql), args)
        .bind(caller.user_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("User"));
    }

    let user = fetch_user(pool.get_ref(), caller.user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// List users (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn list_users(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    let users = sqlx::query_as::<_, User>(&format!(
        "{} WHERE deleted_at IS NULL ORDER BY id",
        USER_SELECT
    ))
    .fetch_all(pool.get_ref())
    .await?;

    let response: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// Create user (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn create_user(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Email and password must not be empty"));
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hashed = hash_password(&payload.password)?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password, first_name, last_name, role, employee_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&email)
    .bind(&hashed)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(payload.role)
    .bind(payload.employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, %email, "Failed to create user");
        ApiError::on_conflict(e, "Email already registered")
    })?;

    // keep the availability fast paths in sync
    email_filter::insert(&email);
    email_cache::mark_taken(&email).await;

    let user = fetch_user(pool.get_ref(), result.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// Get user by id (self or HR)
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_user(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    policy::require_self_or_hr(caller.role, caller.user_id, user_id)?;

    let user = fetch_user(pool.get_ref(), user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Update user by id (self or HR; role/activation changes HR-only)
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = u64, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn update_user(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateUser>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    policy::require_self_or_hr(caller.role, caller.user_id, user_id)?;

    // role, activation and employee linkage stay an HR concern even on
    // self-updates
    if payload.role.is_some() || payload.is_active.is_some() || payload.employee_id.is_some() {
        caller.require_hr()?;
    }

    let mut sets: Vec<&str> = Vec::new();
    let mut args: Vec<SqlValue> = Vec::new();

    if let Some(email) = &payload.email {
        let email = email.trim().to_lowercase();
        if !is_email_available(&email, pool.get_ref()).await {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        sets.push("email = ?");
        args.push(SqlValue::String(email));
    }
    if let Some(first_name) = &payload.first_name {
        sets.push("first_name = ?");
        args.push(SqlValue::String(first_name.clone()));
    }
    if let Some(last_name) = &payload.last_name {
        sets.push("last_name = ?");
        args.push(SqlValue::String(last_name.clone()));
    }
    if let Some(password) = &payload.password {
        if password.is_empty() {
            return Err(ApiError::validation("Password must not be empty"));
        }
        sets.push("password = ?");
        args.push(SqlValue::String(hash_password(password)?));
    }
    if let Some(role) = payload.role {
        sets.push("role = ?");
        args.push(SqlValue::String(role.to_string()));
    }
    if let Some(is_active) = payload.is_active {
        sets.push("is_active = ?");
        args.push(SqlValue::Bool(is_active));
    }
    if let Some(employee_id) = payload.employee_id {
        sets.push("employee_id = ?");
        args.push(SqlValue::U64(employee_id));
    }

    if sets.is_empty() {
        return Err(ApiError::validation("No fields provided for update"));
    }

    let sql = format!(
        "UPDATE users SET {}, updated_at = NOW() WHERE id = ? AND deleted_at IS NULL",
        sets.join(", ")
    );

    let result = crate::bind_values!(sqlx::query(&sql), args)
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::on_conflict(e, "Email already registered"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("User"));
    }

    if let Some(email) = &payload.email {
        email_filter::insert(&email.trim().to_lowercase());
        email_cache::mark_taken(&email.trim().to_lowercase()).await;
    }

    let user = fetch_user(pool.get_ref(), user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Delete user (HR/Admin), soft delete
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn delete_user(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    let user_id = path.into_inner();
    let user = fetch_user(pool.get_ref(), user_id).await?;

    sqlx::query("UPDATE users SET deleted_at = NOW() WHERE id = ? AND deleted_at IS NULL")
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    // the email becomes reusable once the account is gone
    email_filter::remove(&user.email);
    email_cache::invalidate(&user.email).await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User deleted successfully"
    })))
}
