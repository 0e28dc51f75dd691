use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    model::attendance::{Attendance, AttendanceStatus, working_hours},
    policy::{self, CallerIdentity},
    utils::db_utils::SqlValue,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateAttendance {
    /// Ignored for employee-role callers: their own employee id is used
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "2026-01-05T09:00:00", value_type = String, format = "date-time", nullable = true)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-01-05T17:30:00", value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    pub status: Option<AttendanceStatus>,
    pub comments: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAttendance {
    #[schema(value_type = String, format = "date", nullable = true)]
    pub date: Option<NaiveDate>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    pub status: Option<AttendanceStatus>,
    pub comments: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AttendanceFilter {
    /// Filter by employee (intersected with the caller's visibility scope)
    pub employee_id: Option<u64>,
    /// Filter by status
    pub status: Option<String>,
    #[param(value_type = String, format = "date")]
    #[schema(value_type = String, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(value_type = String, format = "date")]
    #[schema(value_type = String, format = "date")]
    pub to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRow {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub working_hours: f64,
    pub comments: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRow>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Reduced projection for the department report.
#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceReportRow {
    pub employee_name: String,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    pub working_hours: f64,
    pub status: AttendanceStatus,
}

const ATTENDANCE_ROW_SELECT: &str = r#"
    SELECT r.id, r.employee_id,
           CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
           r.date, r.check_in, r.check_out, r.status, r.working_hours,
           r.comments, r.created_at
    FROM attendance r
    JOIN employees e ON r.employee_id = e.id
"#;

/// Plain row without the employee join, for existence checks.
async fn fetch_attendance(pool: &MySqlPool, id: u64) -> Result<Attendance, ApiError> {
    sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, employee_id, date, check_in, check_out, status,
               working_hours, comments, created_at
        FROM attendance
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Attendance record"))
}

async fn fetch_attendance_row(pool: &MySqlPool, id: u64) -> Result<AttendanceRow, ApiError> {
    sqlx::query_as::<_, AttendanceRow>(&format!(
        "{} WHERE r.id = ? AND r.deleted_at IS NULL",
        ATTENDANCE_ROW_SELECT
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Attendance record"))
}

/// List attendance records, scoped to the caller's visibility
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Scoped attendance list", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller has no employee record")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceFilter>,
) -> Result<HttpResponse, ApiError> {
    policy::require_role(caller.role, policy::ALL_ROLES)?;

    let scope = policy::resolve_scope(pool.get_ref(), &caller).await?;

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(20).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE r.deleted_at IS NULL AND e.deleted_at IS NULL");
    let mut args: Vec<SqlValue> = Vec::new();

    scope.push_where(&mut where_sql, &mut args);

    if let Some(employee_id) = query.employee_id {
        where_sql.push_str(" AND r.employee_id = ?");
        args.push(SqlValue::U64(employee_id));
    }

    if let Some(status) = &query.status {
        let status: AttendanceStatus = status
            .parse()
            .map_err(|_| ApiError::Validation(format!("Invalid attendance status: {}", status)))?;
        where_sql.push_str(" AND r.status = ?");
        args.push(SqlValue::String(status.to_string()));
    }

    if let Some(from) = query.from {
        where_sql.push_str(" AND r.date >= ?");
        args.push(SqlValue::Date(from));
    }

    if let Some(to) = query.to {
        where_sql.push_str(" AND r.date <= ?");
        args.push(SqlValue::Date(to));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!(
        "SELECT COUNT(*) FROM attendance r JOIN employees e ON r.employee_id = e.id{}",
        where_sql
    );

    let total = crate::bind_values!(sqlx::query_scalar::<_, i64>(&count_sql), args.clone())
        .fetch_one(pool.get_ref())
        .await?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        "{}{} ORDER BY r.id LIMIT ? OFFSET ?",
        ATTENDANCE_ROW_SELECT, where_sql
    );

    let records = crate::bind_values!(sqlx::query_as::<_, AttendanceRow>(&data_sql), args)
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data: records,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/// Log attendance. Employee-role callers always log for themselves.
#[utoipa::path(
    post,
    path = "/api/v1/attendance",
    request_body = CreateAttendance,
    responses(
        (status = 201, description = "Attendance logged", body = AttendanceRow),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Caller has no employee record"),
        (status = 409, description = "Already recorded for this date")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn create_attendance(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAttendance>,
) -> Result<HttpResponse, ApiError> {
    policy::require_role(caller.role, policy::ALL_ROLES)?;

    // Impersonation guard: an employee's payload cannot name someone else
    let employee_id = if caller.is_employee() {
        caller.linked_employee()?
    } else {
        payload
            .employee_id
            .ok_or_else(|| ApiError::validation("employee_id is required"))?
    };

    if let (Some(check_in), Some(check_out)) = (payload.check_in, payload.check_out) {
        if check_out < check_in {
            return Err(ApiError::validation("check_out cannot be before check_in"));
        }
    }

    let hours = match (payload.check_in, payload.check_out) {
        (Some(check_in), Some(check_out)) => working_hours(check_in, check_out),
        _ => 0.0,
    };

    let status = payload.status.unwrap_or(AttendanceStatus::Present);

    let result = sqlx::query(
        r#"
        INSERT INTO attendance
            (employee_id, date, check_in, check_out, status, working_hours, comments)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.date)
    .bind(payload.check_in)
    .bind(payload.check_out)
    .bind(status)
    .bind(hours)
    .bind(&payload.comments)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to create attendance record");
        ApiError::on_conflict(e, "Attendance already recorded for this date")
    })?;

    let record = fetch_attendance_row(pool.get_ref(), result.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(record))
}

/// Check-in endpoint (self-service)
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    responses(
        (status = 200, description = "Checked in successfully"),
        (status = 403, description = "Caller has no employee record"),
        (status = 409, description = "Already checked in today")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = caller.linked_employee()?;

    sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, date, check_in, status)
        VALUES (?, CURDATE(), NOW(), 'present')
        "#,
    )
    .bind(employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Check-in failed");
        ApiError::on_conflict(e, "Already checked in today")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Checked in successfully"
    })))
}

/// Check-out endpoint (self-service); stamps the working hours
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    responses(
        (status = 200, description = "Checked out successfully"),
        (status = 400, description = "No active check-in found for today"),
        (status = 403, description = "Caller has no employee record")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = caller.linked_employee()?;

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = NOW(),
            working_hours = TIMESTAMPDIFF(SECOND, check_in, NOW()) / 3600,
            updated_at = NOW()
        WHERE employee_id = ?
          AND date = CURDATE()
          AND check_out IS NULL
          AND deleted_at IS NULL
        "#,
    )
    .bind(employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Check-out failed");
        ApiError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::validation("No active check-in found for today"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Checked out successfully"
    })))
}

/// Department attendance report (manager group), date descending
#[utoipa::path(
    get,
    path = "/api/v1/attendance/report",
    responses(
        (status = 200, description = "Department attendance report", body = [AttendanceReportRow]),
        (status = 403, description = "Forbidden or no employee record")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
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

    let report = sqlx::query_as::<_, AttendanceReportRow>(
        r#"
        SELECT CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
               r.date, r.check_in, r.check_out, r.working_hours, r.status
        FROM attendance r
        JOIN employees e ON r.employee_id = e.id
        WHERE e.department_id = ?
          AND r.deleted_at IS NULL
          AND e.deleted_at IS NULL
        ORDER BY r.date DESC
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

/// Update attendance record (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/attendance/{attendance_id}",
    params(("attendance_id" = u64, Path, description = "Attendance record ID")),
    request_body = UpdateAttendance,
    responses(
        (status = 200, description = "Attendance updated", body = AttendanceRow),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Attendance record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_attendance(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateAttendance>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    let attendance_id = path.into_inner();

    // existence check before building the update
    fetch_attendance(pool.get_ref(), attendance_id).await?;

    let mut sets: Vec<&str> = Vec::new();
    let mut args: Vec<SqlValue> = Vec::new();

    if let Some(date) = payload.date {
        sets.push("date = ?");
        args.push(SqlValue::Date(date));
    }
    if let Some(check_in) = payload.check_in {
        sets.push("check_in = ?");
        args.push(SqlValue::DateTime(check_in));
    }
    if let Some(check_out) = payload.check_out {
        sets.push("check_out = ?");
        args.push(SqlValue::DateTime(check_out));
    }
    if let Some(status) = payload.status {
        sets.push("status = ?");
        args.push(SqlValue::String(status.to_string()));
    }
    if let Some(comments) = &payload.comments {
        sets.push("comments = ?");
        args.push(SqlValue::String(comments.clone()));
    }

    // Hours are recomputed whenever the update supplies both timestamps
    if let (Some(check_in), Some(check_out)) = (payload.check_in, payload.check_out) {
        if check_out < check_in {
            return Err(ApiError::validation("check_out cannot be before check_in"));
        }
        sets.push("working_hours = ?");
        args.push(SqlValue::F64(working_hours(check_in, check_out)));
    }

    if sets.is_empty() {
        return Err(ApiError::validation("No fields provided for update"));
    }

    let sql = format!(
        "UPDATE attendance SET {}, updated_at = NOW() WHERE id = ? AND deleted_at IS NULL",
        sets.join(", ")
    );

    crate::bind_values!(sqlx::query(&sql), args)
        .bind(attendance_id)
        .execute(pool.get_ref())
        .await?;

    let record = fetch_attendance_row(pool.get_ref(), attendance_id).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Delete attendance record (HR/Admin), soft delete
#[utoipa::path(
    delete,
    path = "/api/v1/attendance/{attendance_id}",
    params(("attendance_id" = u64, Path, description = "Attendance record ID")),
    responses(
        (status = 200, description = "Attendance deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Attendance record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn delete_attendance(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    let attendance_id = path.into_inner();

    let result =
        sqlx::query("UPDATE attendance SET deleted_at = NOW() WHERE id = ? AND deleted_at IS NULL")
            .bind(attendance_id)
            .execute(pool.get_ref())
            .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Attendance record"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Attendance record deleted successfully"
    })))
}
