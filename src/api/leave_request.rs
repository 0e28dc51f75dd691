use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    model::leave_request::{LeaveRequest, LeaveStatus, leave_days},
    policy::{self, CallerIdentity},
    utils::db_utils::SqlValue,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Ignored for employee-role callers: their own employee id is used
    #[schema(example = 1000, nullable = true)]
    pub employee_id: Option<u64>,
    #[schema(example = "sick")]
    pub leave_type: String,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    /// Defaults to pending when absent
    pub status: Option<LeaveStatus>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeave {
    pub leave_type: Option<String>,
    #[schema(value_type = String, format = "date", nullable = true)]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = String, format = "date", nullable = true)]
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ApproveLeave {
    /// approved or rejected
    pub status: LeaveStatus,
    #[schema(example = "ok")]
    pub comments: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee (intersected with the caller's visibility scope)
    pub employee_id: Option<u64>,
    /// Filter by leave status
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRow {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    #[schema(example = "sick")]
    pub leave_type: String,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub days: i64,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    #[schema(example = 42, nullable = true)]
    pub approved_by: Option<u64>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub approved_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,

    /// Owner's department, carried for the per-record scope check only
    #[serde(skip_serializing)]
    pub department_id: u64,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRow>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

const LEAVE_ROW_SELECT: &str = r#"
    SELECT r.id, r.employee_id,
           CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
           r.leave_type, r.start_date, r.end_date, r.days, r.reason,
           r.status, r.approved_by, r.approved_at, r.comments, r.created_at,
           e.department_id
    FROM leave_requests r
    JOIN employees e ON r.employee_id = e.id
"#;

/// Plain row without the employee join, for mutation permission checks.
async fn fetch_leave(pool: &MySqlPool, id: u64) -> Result<LeaveRequest, ApiError> {
    sqlx::query_as::<_, LeaveRequest>(
        r#"
        SELECT id, employee_id, leave_type, start_date, end_date, days, reason,
               status, approved_by, approved_at, comments, created_at
        FROM leave_requests
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Leave request"))
}

async fn fetch_leave_row(pool: &MySqlPool, id: u64) -> Result<LeaveRow, ApiError> {
    sqlx::query_as::<_, LeaveRow>(&format!(
        "{} WHERE r.id = ? AND r.deleted_at IS NULL",
        LEAVE_ROW_SELECT
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::NotFound("Leave request"))
}

/// List leave requests, scoped to the caller's visibility
#[utoipa::path(
    get,
    path = "/api/v1/leaves",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Scoped leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller has no employee record")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leaves(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
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
        let status: LeaveStatus = status
            .parse()
            .map_err(|_| ApiError::Validation(format!("Invalid leave status: {}", status)))?;
        where_sql.push_str(" AND r.status = ?");
        args.push(SqlValue::String(status.to_string()));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!(
        "SELECT COUNT(*) FROM leave_requests r JOIN employees e ON r.employee_id = e.id{}",
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
        LEAVE_ROW_SELECT, where_sql
    );

    let leaves = crate::bind_values!(sqlx::query_as::<_, LeaveRow>(&data_sql), args)
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/// Get a leave request; visibility follows the caller's scope
#[utoipa::path(
    get,
    path = "/api/v1/leaves/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRow),
        (status = 403, description = "Outside the caller's scope"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    policy::require_role(caller.role, policy::ALL_ROLES)?;

    let leave = fetch_leave_row(pool.get_ref(), path.into_inner()).await?;

    let scope = policy::resolve_scope(pool.get_ref(), &caller).await?;
    if !scope.permits(leave.employee_id, leave.department_id) {
        return Err(ApiError::forbidden("You can only access your own records"));
    }

    Ok(HttpResponse::Ok().json(leave))
}

/// Create leave request. Employee-role callers always file for themselves.
#[utoipa::path(
    post,
    path = "/api/v1/leaves",
    request_body = CreateLeave,
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRow),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Caller has no employee record")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
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

    if payload.leave_type.trim().is_empty() {
        return Err(ApiError::validation("leave_type must not be empty"));
    }

    if payload.start_date > payload.end_date {
        return Err(ApiError::validation("start_date cannot be after end_date"));
    }

    let days = leave_days(payload.start_date, payload.end_date);
    let status = payload.status.unwrap_or(LeaveStatus::Pending);

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, leave_type, start_date, end_date, days, reason, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type.trim())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(days)
    .bind(&payload.reason)
    .bind(status)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to create leave request");
        ApiError::from(e)
    })?;

    let leave = fetch_leave_row(pool.get_ref(), result.last_insert_id()).await?;
    Ok(HttpResponse::Created().json(leave))
}

/// An employee may touch only their own, still-pending requests.
fn check_employee_mutation(
    caller: &CallerIdentity,
    owner_employee_id: u64,
    status: LeaveStatus,
    action: &str,
) -> Result<(), ApiError> {
    if !caller.is_employee() {
        return Ok(());
    }

    let employee_id = caller.linked_employee()?;
    policy::require_owner_or_hr(caller.role, Some(employee_id), owner_employee_id).map_err(
        |_| {
            ApiError::Forbidden(format!(
                "You can only {} your own leave requests",
                action
            ))
        },
    )?;
    if status != LeaveStatus::Pending {
        return Err(ApiError::Forbidden(format!(
            "You can only {} pending leave requests",
            action
        )));
    }
    Ok(())
}

/// Update leave request (own pending requests for employees, any for HR)
#[utoipa::path(
    put,
    path = "/api/v1/leaves/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave request ID")),
    request_body = UpdateLeave,
    responses(
        (status = 200, description = "Leave request updated", body = LeaveRow),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Not the owner or no longer pending"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateLeave>,
) -> Result<HttpResponse, ApiError> {
    policy::require_role(caller.role, policy::ALL_ROLES)?;

    let leave_id = path.into_inner();
    let current = fetch_leave(pool.get_ref(), leave_id).await?;

    check_employee_mutation(&caller, current.employee_id, current.status, "update")?;

    let mut sets: Vec<&str> = Vec::new();
    let mut args: Vec<SqlValue> = Vec::new();

    if let Some(leave_type) = &payload.leave_type {
        if leave_type.trim().is_empty() {
            return Err(ApiError::validation("leave_type must not be empty"));
        }
        sets.push("leave_type = ?");
        args.push(SqlValue::String(leave_type.trim().to_string()));
    }
    if let Some(start_date) = payload.start_date {
        sets.push("start_date = ?");
        args.push(SqlValue::Date(start_date));
    }
    if let Some(end_date) = payload.end_date {
        sets.push("end_date = ?");
        args.push(SqlValue::Date(end_date));
    }
    if let Some(reason) = &payload.reason {
        sets.push("reason = ?");
        args.push(SqlValue::String(reason.clone()));
    }

    // Day count follows the effective dates whenever either one moves
    if payload.start_date.is_some() || payload.end_date.is_some() {
        let start = payload.start_date.unwrap_or(current.start_date);
        let end = payload.end_date.unwrap_or(current.end_date);
        if start > end {
            return Err(ApiError::validation("start_date cannot be after end_date"));
        }
        sets.push("days = ?");
        args.push(SqlValue::I64(leave_days(start, end)));
    }

    if sets.is_empty() {
        return Err(ApiError::validation("No fields provided for update"));
    }

    let sql = format!(
        "UPDATE leave_requests SET {}, updated_at = NOW() WHERE id = ? AND deleted_at IS NULL",
        sets.join(", ")
    );

    crate::bind_values!(sqlx::query(&sql), args)
        .bind(leave_id)
        .execute(pool.get_ref())
        .await?;

    let leave = fetch_leave_row(pool.get_ref(), leave_id).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/// Approve or reject a leave request (HR/Admin).
/// Deliberately not idempotent: a later decision overwrites an earlier one.
#[utoipa::path(
    post,
    path = "/api/v1/leaves/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "Leave request ID")),
    request_body = ApproveLeave,
    responses(
        (status = 200, description = "Decision recorded", body = LeaveRow),
        (status = 400, description = "Decision must be approved or rejected"),
        (status = 403, description = "Forbidden or approver has no employee record"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ApproveLeave>,
) -> Result<HttpResponse, ApiError> {
    caller.require_hr()?;

    if payload.status == LeaveStatus::Pending {
        return Err(ApiError::validation("Decision must be approved or rejected"));
    }

    // The approver is stamped by employee id, so HR needs a linked record
    let approver_id = caller.linked_employee()?;

    let leave_id = path.into_inner();
    fetch_leave(pool.get_ref(), leave_id).await?;

    sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, comments = ?, approved_by = ?, approved_at = NOW(),
            updated_at = NOW()
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(payload.status)
    .bind(&payload.comments)
    .bind(approver_id)
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Failed to record leave decision");
        ApiError::from(e)
    })?;

    let leave = fetch_leave_row(pool.get_ref(), leave_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": leave,
        "message": format!("Leave request {} successfully", payload.status)
    })))
}

/// Delete leave request (own pending requests for employees, any for HR)
#[utoipa::path(
    delete,
    path = "/api/v1/leaves/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Leave request deleted"),
        (status = 403, description = "Not the owner or no longer pending"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave(
    caller: CallerIdentity,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    policy::require_role(caller.role, policy::ALL_ROLES)?;

    let leave_id = path.into_inner();
    let current = fetch_leave(pool.get_ref(), leave_id).await?;

    check_employee_mutation(&caller, current.employee_id, current.status, "delete")?;

    sqlx::query("UPDATE leave_requests SET deleted_at = NOW() WHERE id = ? AND deleted_at IS NULL")
        .bind(leave_id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Leave request deleted successfully"
    })))
}
