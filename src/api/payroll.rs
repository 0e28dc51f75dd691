use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    model::payroll::{PayrollRecord, PayrollStatus, gross_pay, net_pay},
    policy::{self, CallerIdentity},
    utils::db_utils::SqlValue,
};

#[derive(Deserialize, ToSchema)]
pub struct CreatePayroll {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub pay_period_start: NaiveDate,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub pay_period_end: NaiveDate,
    #[schema(example = 50000.0)]
    pub basic_salary: f64,
    #[serde(default)]
    #[schema(example = 5000.0)]
    pub allowances: f64,
    #[serde(default)]
    #[schema(example = 2000.0)]
    pub deductions: f64,
    #[serde(default)]
    #[schema(example = 1500.0)]
    pub overtime: f64,
    #[serde(default)]
    #[schema(example = 4000.0)]
    pub tax: f64,
    pub status: Option<PayrollStatus>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePayroll {
    #[schema(value_type = String, format = "date", nullable = true)]
    pub pay_period_start: Option<NaiveDate>,
    #[schema(value_type = String, format = "date", nullable = true)]
    pub pay_period_end: Option<NaiveDate>,
    pub basic_salary: Option<f64>,
    pub allowances: Option<f64>,
    pub deductions: Option<f64>,
    pub overtime: Option<f64>,
    pub tax: Option<f64>,
    pub status: Option<PayrollStatus>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayrollQuery {
    /// Filter by employee (intersected with the caller's visibility scope)
    pub employee_id: Option<u64>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct PayrollRow {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    #[schema(value_type = String, format = "date")]
    pub pay_period_start: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub pay_period_end: NaiveDate,
    pub basic_salary: f64,
    pub allowances: f64,
    pub deductions: f64,
    pub overtime: f64,
    pub tax: f64,
    pub gross_pay: f64,
    pub net_pay: f64,
    pub status: PayrollStatus,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub processed_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub paid_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,

    /// Owner's department, carried for the per-record scope check only
    #[serde(skip_serializing)]
    pub department_id: u64,
}

#[derive(Serialize, ToSchema)]
pub struct PayrollListResponse {
    pub data: Vec<PayrollRow>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Reduced projection for the department report.
#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct PayrollReportRow {
    pub employee_name: String,
    #[schema(value_type = String, format = "date")]
    pub pay_period_start: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub pay_period_end: NaiveDate,
    pub gross_pay: f64,
    pub net_pay: f64,
    pub status: PayrollStatus,
}

const PAYROLL_ROW_SELECT: &str = r#"
    SELECT r.id, r.employee_id,
           CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
           r.pay_period_start, r.pay_period_end, r.basic_salary, r.allowances,
           r.deductions, r.overtime, r.tax, r.gross_pay, r.net_pay, r.status,
           r.processed_at, r.paid_at, r.created_at,
           e.department_id
    FROM payroll_records r
    JOIN employees e ON r.employee_id = e.id
"#;

/// Plain row without the employee join, for the update merge.
async fn fetch_payroll(pool: &MySqlPool, id: u64) -> Result<PayrollRecord, ApiError> {
    sqlx::query_as::<_, PayrollRecord>(
        r#"
        SELECT id, employee_id, pay_period_start, pay_period_end, basic_salary,
               allowances, deductions, overtime, tax, gross_pay, net_pay,
               status, processed_at, paid_at, created_at
        FROM payroll_records
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Payroll record"))
}

async fn fetch_payroll_row(pool: &MySqlPool, id: u64) -> Result<PayrollRow, ApiError> {
    sqlx::query_as::<_, PayrollRow>(&format!(
        "{} WHERE r.id = ? AND r.deleted_at IS NULL",
        PAYROLL_ROW_SELECT
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Payroll record"))
}

/// List payroll records, scoped to the caller's visibility
#[utoipa::path(
    get,
    path = "/api/v1/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, description = "Scoped payroll list", body = PayrollListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller has no employee record")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    query: web::Query<PayrollQuery>,
) -> Result<HttpResponse, ApiError> {
    policy::require_role(caller.role, policy::ALL_ROLES)?;

    let scope = policy::resolve_scope(pool.get_ref(), &caller).await?;

    let per_page = query.per_page.unwrap_or(20).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE r.deleted_at IS NULL AND e.deleted_at IS NULL");
    let mut args: Vec<SqlValue> = Vec::new();

    scope.push_where(&mut where_sql, &mut args);

    if let Some(employee_id) = query.employee_id {
        where_sql.push_str(" AND r.employee_id = ?");
        args.push(SqlValue::U64(employee_id));
    }

    let count_sql = format!(
        "SELECT COUNT(*) FROM payroll_records r JOIN employees e ON r.employee_id = e.id{}",
        where_sql
    );

    let total = crate::bind_values!(sqlx::query_scalar::<_, i64>(&count_sql), args.clone())
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        "{}{} ORDER BY r.id LIMIT ? OFFSET ?",
        PAYROLL_ROW_SELECT, where_sql
    );

    let records = crate::bind_values!(sqlx::query_as::<_, PayrollRow>(&data_sql), args)
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(PayrollListResponse {
        data: records,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/// Get a payroll record; visibility follows the caller's scope
#[utoipa::path(
    get,
    path = "/api/v1/payroll/{payroll_id}",
    params(("payroll_id" = u64, Path, description = "Payroll record ID")),
    responses(
        (status = 200, description = "Payroll record found", body = PayrollRow),
        (status = 403, description = "Outside the caller's scope"),
        (status = 404, description = "Payroll record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    policy::require_role(caller.role, policy::ALL_ROLES)?;

    let record = fetch_payroll_row(pool.get_ref(), path.into_inner()).await?;

    let scope = policy::resolve_scope(pool.get_ref(), &caller).await?;
    if !scope.permits(record.employee_id, record.department_id) {
        return Err(ApiError::forbidden("You can only access your own records"));
    }

    Ok(HttpResponse::Ok().json(record))
}

/// Create payroll record (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/payroll",
    request_body = CreatePayroll,
    responses(
        (status = 201, description = "Payroll record created", body = PayrollRow),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn create_payroll(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePayroll>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    if payload.pay_period_start > payload.pay_period_end {
        return Err(ApiError::validation(
            "pay_period_start cannot be after pay_period_end",
        ));
    }

    let gross = gross_pay(payload.basic_salary, payload.allowances, payload.overtime);
    let net = net_pay(gross, payload.deductions, payload.tax);
    let status = payload.status.unwrap_or(PayrollStatus::Draft);

    let result = sqlx::query(
        r#"
        INSERT INTO payroll_records
            (employee_id, pay_period_start, pay_period_end, basic_salary,
             allowances, deductions, overtime, tax, gross_pay, net_pay, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.pay_period_start)
    .bind(payload.pay_period_end)
    .bind(payload.basic_salary)
    .bind(payload.allowances)
    .bind(payload.deductions)
    .bind(payload.overtime)
    .bind(payload.tax)
    .bind(gross)
    .bind(net)
    .bind(status)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = payload.employee_id, "Failed to create payroll record");
        ApiError::from(e)
    })?;

    let record = fetch_payroll_row(pool.get_ref(), result.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(record))
}

/// Update payroll record (HR/Admin); pay fields are merged and the derived
/// amounts recomputed from the merged values
#[utoipa::path(
    put,
    path = "/api/v1/payroll/{payroll_id}",
    params(("payroll_id" = u64, Path, description = "Payroll record ID")),
    request_body = UpdatePayroll,
    responses(
        (status = 200, description = "Payroll record updated", body = PayrollRow),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Payroll record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_payroll(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdatePayroll>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    let payroll_id = path.into_inner();
    let current = fetch_payroll(pool.get_ref(), payroll_id).await?;

    let pay_period_start = payload.pay_period_start.unwrap_or(current.pay_period_start);
    let pay_period_end = payload.pay_period_end.unwrap_or(current.pay_period_end);
    if pay_period_start > pay_period_end {
        return Err(ApiError::validation(
            "pay_period_start cannot be after pay_period_end",
        ));
    }

    let basic_salary = payload.basic_salary.unwrap_or(current.basic_salary);
    let allowances = payload.allowances.unwrap_or(current.allowances);
    let deductions = payload.deductions.unwrap_or(current.deductions);
    let overtime = payload.overtime.unwrap_or(current.overtime);
    let tax = payload.tax.unwrap_or(current.tax);
    let gross = gross_pay(basic_salary, allowances, overtime);
    let net = net_pay(gross, deductions, tax);
    let status = payload.status.unwrap_or(current.status);

    let mut sql = String::from(
        "UPDATE payroll_records SET pay_period_start = ?, pay_period_end = ?, \
         basic_salary = ?, allowances = ?, deductions = ?, overtime = ?, tax = ?, \
         gross_pay = ?, net_pay = ?, status = ?, updated_at = NOW()",
    );

    // Stamp the transition timestamps once
    if status == PayrollStatus::Processed && current.processed_at.is_none() {
        sql.push_str(", processed_at = NOW()");
    }
    if status == PayrollStatus::Paid && current.paid_at.is_none() {
        sql.push_str(", paid_at = NOW()");
    }

    sql.push_str(" WHERE id = ? AND deleted_at IS NULL");

    sqlx::query(&sql)
        .bind(pay_period_start)
        .bind(pay_period_end)
        .bind(basic_salary)
        .bind(allowances)
        .bind(deductions)
        .bind(overtime)
        .bind(tax)
        .bind(gross)
        .bind(net)
        .bind(status)
        .bind(payroll_id)
        .execute(pool.get_ref())
        .await?;

    let record = fetch_payroll_row(pool.get_ref(), payroll_id).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Delete payroll record (HR/Admin), soft delete
#[utoipa::path(
    delete,
    path = "/api/v1/payroll/{payroll_id}",
    params(("payroll_id" = u64, Path, description = "Payroll record ID")),
    responses(
        (status = 200, description = "Payroll record deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Payroll record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn delete_payroll(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    let payroll_id = path.into_inner();

    let result = sqlx::query(
        "UPDATE payroll_records SET deleted_at = NOW() WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(payroll_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Payroll record"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Payroll record deleted successfully"
    })))
}

/// Department payroll report (manager group), pay period descending
#[utoipa::path(
    get,
    path = "/api/v1/payroll/report",
    responses(
        (status = 200, description = "Department payroll report", body = [PayrollReportRow]),
        (status = 403, description = "Forbidden or no employee record")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn department_report(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    caller.require_manager()?;

    let employee_id = caller.linked_employee()?;

    let department_id: Option<u64> = sqlx::query_scalar(
        "SELECT department_id FROM employees WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await?;

    let department_id = department_id.ok_or_else(|| {
        ApiError::PolicyViolation(format!("{} has no employee record", caller.role))
    })?;

    let report = sqlx::query_as::<_, PayrollReportRow>(
        r#"
        SELECT CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
               r.pay_period_start, r.pay_period_end, r.gross_pay, r.net_pay,
               r.status
        FROM payroll_records r
        JOIN employees e ON r.employee_id = e.id
        WHERE e.department_id = ?
          AND r.deleted_at IS NULL
          AND e.deleted_at IS NULL
        ORDER BY r.pay_period_start DESC
        "#,
    )
    .bind(department_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": report
    })))
}
