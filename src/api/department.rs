use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    model::department::Department,
    policy::{self, CallerIdentity},
    utils::db_utils::SqlValue,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateDepartment {
    #[schema(example = "Engineering")]
    pub name: String,
    pub description: Option<String>,
    /// Employee heading this department
    #[schema(example = 3, nullable = true)]
    pub manager_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateDepartment {
    pub name: Option<String>,
    pub description: Option<String>,
    pub manager_id: Option<u64>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct DepartmentResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(nullable = true)]
    pub description: Option<String>,
    #[schema(example = 3, nullable = true)]
    pub manager_id: Option<u64>,
    #[schema(example = "Jane Doe", nullable = true)]
    pub manager_name: Option<String>,
    #[schema(example = 12)]
    pub employee_count: i64,
}

const DEPARTMENT_SELECT: &str = r#"
    SELECT d.id, d.name, d.description, d.manager_id,
           CONCAT(m.first_name, ' ', m.last_name) AS manager_name,
           COUNT(emp.id) AS employee_count
    FROM departments d
    LEFT JOIN employees m ON d.manager_id = m.id AND m.deleted_at IS NULL
    LEFT JOIN employees emp ON emp.department_id = d.id AND emp.deleted_at IS NULL
"#;

const DEPARTMENT_GROUP: &str =
    " GROUP BY d.id, d.name, d.description, d.manager_id, manager_name";

async fn fetch_department_response(
    pool: &MySqlPool,
    id: u64,
) -> Result<DepartmentResponse, ApiError> {
    sqlx::query_as::<_, DepartmentResponse>(&format!(
        "{} WHERE d.id = ? AND d.deleted_at IS NULL{}",
        DEPARTMENT_SELECT, DEPARTMENT_GROUP
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Department"))
}

async fn fetch_department(pool: &MySqlPool, id: u64) -> Result<Department, ApiError> {
    sqlx::query_as::<_, Department>(
        r#"
        SELECT id, name, description, manager_id, created_at, updated_at
        FROM departments
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Department"))
}

/// List departments (all authenticated roles)
#[utoipa::path(
    get,
    path = "/api/v1/departments",
    responses(
        (status = 200, description = "All departments", body = [DepartmentResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn list_departments(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    policy::require_role(caller.role, policy::ALL_ROLES)?;

    let departments = sqlx::query_as::<_, DepartmentResponse>(&format!(
        "{} WHERE d.deleted_at IS NULL{} ORDER BY d.id",
        DEPARTMENT_SELECT, DEPARTMENT_GROUP
    ))
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(departments))
}

/// Get department by ID (all authenticated roles)
#[utoipa::path(
    get,
    path = "/api/v1/departments/{department_id}",
    params(("department_id" = u64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department found", body = DepartmentResponse),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn get_department(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    policy::require_role(caller.role, policy::ALL_ROLES)?;

    let department = fetch_department_response(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(department))
}

/// Create department (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/departments",
    request_body = CreateDepartment,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Department name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn create_department(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDepartment>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Department name must not be empty"));
    }

    let result = sqlx::query(
        "INSERT INTO departments (name, description, manager_id) VALUES (?, ?, ?)",
    )
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.manager_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, name = %payload.name, "Failed to create department");
        ApiError::on_conflict(e, "Department name already exists")
    })?;

    let department = fetch_department(pool.get_ref(), result.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(department))
}

/// Update department (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/departments/{department_id}",
    params(("department_id" = u64, Path, description = "Department ID")),
    request_body = UpdateDepartment,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn update_department(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateDepartment>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    let department_id = path.into_inner();

    let mut sets: Vec<&str> = Vec::new();
    let mut args: Vec<SqlValue> = Vec::new();

    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation("Department name must not be empty"));
        }
        sets.push("name = ?");
        args.push(SqlValue::String(name.trim().to_string()));
    }
    if let Some(description) = &payload.description {
        sets.push("description = ?");
        args.push(SqlValue::String(description.clone()));
    }
    if let Some(manager_id) = payload.manager_id {
        sets.push("manager_id = ?");
        args.push(SqlValue::U64(manager_id));
    }

    if sets.is_empty() {
        return Err(ApiError::validation("No fields provided for update"));
    }

    let sql = format!(
        "UPDATE departments SET {}, updated_at = NOW() WHERE id = ? AND deleted_at IS NULL",
        sets.join(", ")
    );

    let result = crate::bind_values!(sqlx::query(&sql), args)
        .bind(department_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::on_conflict(e, "Department name already exists"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Department"));
    }

    let department = fetch_department(pool.get_ref(), department_id).await?;
    Ok(HttpResponse::Ok().json(department))
}

/// Delete department (HR/Admin), soft delete
#[utoipa::path(
    delete,
    path = "/api/v1/departments/{department_id}",
    params(("department_id" = u64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn delete_department(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    let department_id = path.into_inner();

    let result = sqlx::query(
        "UPDATE departments SET deleted_at = NOW() WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(department_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Department"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Department deleted successfully"
    })))
}
