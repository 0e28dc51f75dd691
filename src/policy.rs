use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::utils::db_utils::SqlValue;

/// Role taxonomy is fixed; unknown role strings fail to decode and are
/// rejected at the token / payload boundary.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    sqlx::Type,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Hr,
    Manager,
    Employee,
}

/// Convenience allowed-sets. Checks are always explicit set membership,
/// never transitive inference.
pub const HR_ROLES: &[Role] = &[Role::Hr, Role::Admin];
pub const MANAGER_ROLES: &[Role] = &[Role::Hr, Role::Admin, Role::Manager];
pub const ALL_ROLES: &[Role] = &[Role::Hr, Role::Admin, Role::Manager, Role::Employee];

/// The authenticated caller, built once by the auth middleware from the
/// verified token and passed explicitly into every access decision.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: u64,
    pub email: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl CallerIdentity {
    pub fn require_hr(&self) -> Result<(), ApiError> {
        require_role(self.role, HR_ROLES)
    }

    pub fn require_manager(&self) -> Result<(), ApiError> {
        require_role(self.role, MANAGER_ROLES)
    }

    /// The caller's linked employee id, or a PolicyViolation when the role
    /// requires one and none is linked.
    pub fn linked_employee(&self) -> Result<u64, ApiError> {
        self.employee_id
            .ok_or_else(|| ApiError::PolicyViolation(format!("{} has no employee record", self.role)))
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }
}

pub fn require_role(role: Role, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Insufficient permissions for this operation (role: {})",
            role
        )))
    }
}

/// True iff the caller is HR/admin or owns the employee-keyed record.
pub fn require_owner_or_hr(
    role: Role,
    caller_employee_id: Option<u64>,
    owner_employee_id: u64,
) -> Result<(), ApiError> {
    if HR_ROLES.contains(&role) || caller_employee_id == Some(owner_employee_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("You can only access your own records"))
    }
}

/// True iff the caller is HR/admin or the requested user id is their own.
/// User ids and employee ids are distinct identifier spaces; this check is
/// for the user resource only.
pub fn require_self_or_hr(
    role: Role,
    caller_user_id: u64,
    requested_user_id: u64,
) -> Result<(), ApiError> {
    if HR_ROLES.contains(&role) || caller_user_id == requested_user_id {
        Ok(())
    } else {
        Err(ApiError::forbidden("You can only access your own data"))
    }
}

/// Visibility predicate over employee-owned collections (attendance, leave
/// requests, payroll records).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// HR/admin: no filter.
    All,
    /// Manager: records of employees in this department.
    Department(u64),
    /// Employee: records owned by this employee id.
    Own(u64),
}

impl Scope {
    /// Apply the predicate to a single already-fetched record.
    pub fn permits(&self, owner_employee_id: u64, owner_department_id: u64) -> bool {
        match *self {
            Scope::All => true,
            Scope::Department(dept) => owner_department_id == dept,
            Scope::Own(emp) => owner_employee_id == emp,
        }
    }

    /// Append the predicate to a list query. Convention: the record table is
    /// aliased `r`, its owning employee row is joined as `e`.
    pub fn push_where(&self, where_sql: &mut String, args: &mut Vec<SqlValue>) {
        match *self {
            Scope::All => {}
            Scope::Department(dept) => {
                where_sql.push_str(" AND e.department_id = ?");
                args.push(SqlValue::U64(dept));
            }
            Scope::Own(emp) => {
                where_sql.push_str(" AND r.employee_id = ?");
                args.push(SqlValue::U64(emp));
            }
        }
    }
}

/// Pure scoping decision. Exhaustive over the role enum: hr/admin see all,
/// managers see their department, employees see their own rows. Manager and
/// employee callers must be linked to an employee record.
pub fn scope_collection(
    role: Role,
    employee_id: Option<u64>,
    department_id: Option<u64>,
) -> Result<Scope, ApiError> {
    let missing_link =
        || ApiError::PolicyViolation(format!("{} has no employee record", role));

    match role {
        Role::Hr | Role::Admin => Ok(Scope::All),
        Role::Manager => {
            employee_id.ok_or_else(missing_link)?;
            Ok(Scope::Department(department_id.ok_or_else(missing_link)?))
        }
        Role::Employee => Ok(Scope::Own(employee_id.ok_or_else(missing_link)?)),
    }
}

/// DB-backed wrapper around [`scope_collection`]: resolves the caller's
/// employee row (soft-delete aware) to obtain the department id.
pub async fn resolve_scope(pool: &MySqlPool, caller: &CallerIdentity) -> Result<Scope, ApiError> {
    match caller.role {
        Role::Hr | Role::Admin => Ok(Scope::All),
        Role::Manager | Role::Employee => {
            let employee_id = caller.linked_employee()?;

            let department_id: Option<u64> = sqlx::query_scalar(
                "SELECT department_id FROM employees WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(employee_id)
            .fetch_optional(pool)
            .await?;

            let department_id = department_id.ok_or_else(|| {
                ApiError::PolicyViolation(format!("{} has no employee record", caller.role))
            })?;

            scope_collection(caller.role, Some(employee_id), Some(department_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!(Role::from_str("hr").unwrap(), Role::Hr);
        assert_eq!(Role::from_str("manager").unwrap(), Role::Manager);
        assert_eq!(Role::Admin.to_string(), "admin");
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn require_role_is_exact_set_membership() {
        assert!(require_role(Role::Hr, HR_ROLES).is_ok());
        assert!(require_role(Role::Admin, HR_ROLES).is_ok());
        assert!(require_role(Role::Manager, HR_ROLES).is_err());
        assert!(require_role(Role::Manager, MANAGER_ROLES).is_ok());
        assert!(require_role(Role::Employee, MANAGER_ROLES).is_err());
        assert!(require_role(Role::Employee, ALL_ROLES).is_ok());
    }

    #[test]
    fn hr_and_admin_scope_to_all() {
        assert_eq!(scope_collection(Role::Hr, None, None).unwrap(), Scope::All);
        assert_eq!(scope_collection(Role::Admin, None, None).unwrap(), Scope::All);
    }

    #[test]
    fn manager_scopes_to_department() {
        assert_eq!(
            scope_collection(Role::Manager, Some(7), Some(3)).unwrap(),
            Scope::Department(3)
        );
    }

    #[test]
    fn manager_without_employee_record_is_a_policy_violation() {
        match scope_collection(Role::Manager, None, None) {
            Err(ApiError::PolicyViolation(msg)) => {
                assert_eq!(msg, "manager has no employee record")
            }
            other => panic!("expected PolicyViolation, got {:?}", other),
        }
    }

    #[test]
    fn employee_scopes_to_own_records() {
        assert_eq!(
            scope_collection(Role::Employee, Some(42), None).unwrap(),
            Scope::Own(42)
        );
        assert!(matches!(
            scope_collection(Role::Employee, None, None),
            Err(ApiError::PolicyViolation(_))
        ));
    }

    #[test]
    fn scope_permits_matches_the_list_predicate() {
        assert!(Scope::All.permits(9, 9));
        assert!(Scope::Department(3).permits(42, 3));
        assert!(!Scope::Department(3).permits(42, 4));
        assert!(Scope::Own(42).permits(42, 3));
        assert!(!Scope::Own(42).permits(43, 3));
    }

    #[test]
    fn scope_push_where_appends_the_right_predicate() {
        let mut sql = String::from(" WHERE r.deleted_at IS NULL");
        let mut args = Vec::new();
        Scope::All.push_where(&mut sql, &mut args);
        assert_eq!(sql, " WHERE r.deleted_at IS NULL");
        assert!(args.is_empty());

        Scope::Department(3).push_where(&mut sql, &mut args);
        assert!(sql.ends_with("AND e.department_id = ?"));
        assert_eq!(args.len(), 1);

        Scope::Own(42).push_where(&mut sql, &mut args);
        assert!(sql.ends_with("AND r.employee_id = ?"));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn owner_or_hr_uses_employee_ids() {
        assert!(require_owner_or_hr(Role::Hr, None, 5).is_ok());
        assert!(require_owner_or_hr(Role::Employee, Some(5), 5).is_ok());
        assert!(require_owner_or_hr(Role::Employee, Some(6), 5).is_err());
        assert!(require_owner_or_hr(Role::Manager, None, 5).is_err());
    }

    #[test]
    fn self_or_hr_uses_user_ids() {
        assert!(require_self_or_hr(Role::Admin, 1, 99).is_ok());
        assert!(require_self_or_hr(Role::Employee, 7, 7).is_ok());
        assert!(require_self_or_hr(Role::Employee, 7, 8).is_err());
    }
}
