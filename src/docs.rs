use crate::api::attendance::{
    AttendanceFilter, AttendanceListResponse, AttendanceReportRow, AttendanceRow,
    CreateAttendance, UpdateAttendance,
};
use crate::api::department::{CreateDepartment, DepartmentResponse, UpdateDepartment};
use crate::model::department::Department;
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery};
use crate::api::leave_request::{
    ApproveLeave, CreateLeave, LeaveFilter, LeaveListResponse, LeaveRow, UpdateLeave,
};
use crate::api::payroll::{
    CreatePayroll, PayrollListResponse, PayrollQuery, PayrollReportRow, PayrollRow, UpdatePayroll,
};
use crate::api::user::{CreateUser, UpdateProfile, UpdateUser, UserResponse};
use crate::auth::handlers::{LoginRequest, LoginResponse};
use crate::model::attendance::AttendanceStatus;
use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::leave_request::LeaveStatus;
use crate::model::payroll::PayrollStatus;
use crate::policy::Role;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRMS API",
        version = "1.0.0",
        description = r#"
## Human Resource Management System

REST backend for core HR operations with role-based access control.

### 🔹 Key Features
- **User & Role Management**
  - HR-managed accounts with admin/hr/manager/employee roles
- **Employee & Department Management**
  - Create, update, list, and view employee and department records
- **Leave Management**
  - Apply for leave, approve/reject requests, and view leave history
- **Attendance Management**
  - Daily check-in and check-out tracking, department reports
- **Payroll Management**
  - Payroll records with derived gross/net amounts

### 🔐 Security
Endpoints are protected with **JWT Bearer authentication**.
Visibility is scoped by role: HR sees everything, managers see their
department, employees see their own records.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::logout,

        crate::api::user::get_current_user,
        crate::api::user::update_current_user,
        crate::api::user::list_users,
        crate::api::user::create_user,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::employee::list_employees,
        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::department::list_departments,
        crate::api::department::create_department,
        crate::api::department::get_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::attendance::list_attendance,
        crate::api::attendance::create_attendance,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::department_report,
        crate::api::attendance::update_attendance,
        crate::api::attendance::delete_attendance,

        crate::api::leave_request::list_leaves,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::delete_leave,

        crate::api::payroll::list_payrolls,
        crate::api::payroll::get_payroll,
        crate::api::payroll::create_payroll,
        crate::api::payroll::update_payroll,
        crate::api::payroll::delete_payroll,
        crate::api::payroll::department_report,
    ),
    components(
        schemas(
            Role,
            EmployeeStatus,
            AttendanceStatus,
            LeaveStatus,
            PayrollStatus,
            LoginRequest,
            LoginResponse,
            UserResponse,
            CreateUser,
            UpdateProfile,
            UpdateUser,
            Employee,
            EmployeeQuery,
            CreateEmployee,
            EmployeeListResponse,
            Department,
            DepartmentResponse,
            CreateDepartment,
            UpdateDepartment,
            AttendanceFilter,
            AttendanceRow,
            AttendanceListResponse,
            AttendanceReportRow,
            CreateAttendance,
            UpdateAttendance,
            LeaveFilter,
            LeaveRow,
            LeaveListResponse,
            CreateLeave,
            UpdateLeave,
            ApproveLeave,
            PayrollQuery,
            PayrollRow,
            PayrollListResponse,
            PayrollReportRow,
            CreatePayroll,
            UpdatePayroll,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication APIs"),
        (name = "User", description = "User account APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Department", description = "Department management APIs"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Payroll", description = "Payroll management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
