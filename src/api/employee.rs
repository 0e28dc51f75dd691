use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    model::employee::{Employee, EmployeeStatus},
    policy::{self, CallerIdentity},
    utils::db_utils::{SqlValue, build_update_sql, execute_update},
};

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "john@company.com", format = "email")]
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[schema(example = "1990-05-20", value_type = String, format = "date")]
    pub date_of_birth: Option<NaiveDate>,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub hire_date: NaiveDate,
    #[schema(example = 75000.0)]
    pub salary: f64,
    #[schema(example = "Engineer")]
    pub position: String,
    pub status: Option<EmployeeStatus>,
    #[schema(example = 1)]
    pub department_id: u64,
    #[schema(example = 3, nullable = true)]
    pub manager_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Filter by department
    pub department_id: Option<u64>,
    /// Filter by status
    pub status: Option<String>,
    /// Search by name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

/// Columns the dynamic employee update may touch.
const EMPLOYEE_COLUMNS: &[&str] = &[
    "employee_code",
    "first_name",
    "last_name",
    "email",
    "phone",
    "address",
    "date_of_birth",
    "hire_date",
    "salary",
    "position",
    "status",
    "department_id",
    "manager_id",
];

const EMPLOYEE_SELECT: &str = r#"
    SELECT id, employee_code, first_name, last_name, email, phone, address,
           date_of_birth, hire_date, salary, position, status, department_id,
           manager_id, created_at, updated_at
    FROM employees
"#;

async fn fetch_employee(pool: &MySqlPool, id: u64) -> Result<Employee, ApiError> {
    sqlx::query_as::<_, Employee>(&format!(
        "{} WHERE id = ? AND deleted_at IS NULL",
        EMPLOYEE_SELECT
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Employee"))
}

/// Every employee row must point at a live department.
async fn require_department_exists(pool: &MySqlPool, department_id: u64) -> Result<(), ApiError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM departments WHERE id = ? AND deleted_at IS NULL)",
    )
    .bind(department_id)
    .fetch_one(pool)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "Department {} does not exist",
            department_id
        )))
    }
}

/// List employees (all authenticated roles)
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, ApiError> {
    policy::require_role(caller.role, policy::ALL_ROLES)?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut where_sql = String::from(" WHERE deleted_at IS NULL");
    let mut args: Vec<SqlValue> = Vec::new();

    if let Some(department_id) = query.department_id {
        where_sql.push_str(" AND department_id = ?");
        args.push(SqlValue::U64(department_id));
    }

    if let Some(status) = &query.status {
        let status = EmployeeStatus::from_str(status)
            .map_err(|_| ApiError::Validation(format!("Invalid employee status: {}", status)))?;
        where_sql.push_str(" AND status = ?");
        args.push(SqlValue::String(status.to_string()));
    }

    if let Some(search) = &query.search {
        where_sql.push_str(" AND (first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        let like = format!("%{}%", search);
        args.push(SqlValue::String(like.clone()));
        args.push(SqlValue::String(like.clone()));
        args.push(SqlValue::String(like));
    }

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees{}", where_sql);
    debug!(sql = %count_sql, "Counting employees");

    let total = crate::bind_values!(sqlx::query_scalar::<_, i64>(&count_sql), args.clone())
        .fetch_one(pool.get_ref())
        .await?;

    // ---------- data query ----------
    let data_sql = format!(
        "{}{} ORDER BY id LIMIT ? OFFSET ?",
        EMPLOYEE_SELECT, where_sql
    );
    debug!(sql = %data_sql, page, per_page, "Fetching employees");

    let employees = crate::bind_values!(sqlx::query_as::<_, Employee>(&data_sql), args)
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Create employee (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Duplicate employee code or email")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn create_employee(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    require_department_exists(pool.get_ref(), payload.department_id).await?;

    let status = payload.status.unwrap_or(EmployeeStatus::Active);

    let result = sqlx::query(
        r#"
        INSERT INTO employees
            (employee_code, first_name, last_name, email, phone, address,
             date_of_birth, hire_date, salary, position, status,
             department_id, manager_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.employee_code)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(payload.date_of_birth)
    .bind(payload.hire_date)
    .bind(payload.salary)
    .bind(&payload.position)
    .bind(status)
    .bind(payload.department_id)
    .bind(payload.manager_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_code = %payload.employee_code, "Failed to create employee");
        ApiError::on_conflict(e, "Employee code or email already exists")
    })?;

    let employee = fetch_employee(pool.get_ref(), result.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(employee))
}

/// Get employee by ID (all authenticated roles)
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    policy::require_role(caller.role, policy::ALL_ROLES)?;

    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Update employee (HR/Admin) — partial update via whitelisted JSON fields
#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    let employee_id = path.into_inner();

    if let Some(status) = body.get("status").and_then(Value::as_str) {
        EmployeeStatus::from_str(status)
            .map_err(|_| ApiError::Validation(format!("Invalid employee status: {}", status)))?;
    }

    if let Some(department_id) = body.get("department_id").and_then(Value::as_u64) {
        require_department_exists(pool.get_ref(), department_id).await?;
    }

    let update = build_update_sql("employees", &body, EMPLOYEE_COLUMNS, "id", employee_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| ApiError::on_conflict(e, "Employee code or email already exists"))?;

    if affected == 0 {
        return Err(ApiError::NotFound("Employee"));
    }

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Delete employee (HR/Admin), soft delete
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn delete_employee(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    let employee_id = path.into_inner();

    let result =
        sqlx::query("UPDATE employees SET deleted_at = NOW() WHERE id = ? AND deleted_at IS NULL")
            .bind(employee_id)
            .execute(pool.get_ref())
            .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Employee"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee deleted successfully"
    })))
}
