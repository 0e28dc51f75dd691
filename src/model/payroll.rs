use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

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
pub enum PayrollStatus {
    Draft,
    Processed,
    Paid,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PayrollRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1000)]
    pub employee_id: u64,

    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub pay_period_start: NaiveDate,

    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub pay_period_end: NaiveDate,

    #[schema(example = 50000.0)]
    pub basic_salary: f64,

    #[schema(example = 5000.0)]
    pub allowances: f64,

    #[schema(example = 2000.0)]
    pub deductions: f64,

    #[schema(example = 1500.0)]
    pub overtime: f64,

    #[schema(example = 4000.0)]
    pub tax: f64,

    /// basic + allowances + overtime, always derived
    #[schema(example = 56500.0)]
    pub gross_pay: f64,

    /// gross − deductions − tax, always derived
    #[schema(example = 50500.0)]
    pub net_pay: f64,

    pub status: PayrollStatus,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub processed_at: Option<DateTime<Utc>>,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub paid_at: Option<DateTime<Utc>>,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

pub fn gross_pay(basic_salary: f64, allowances: f64, overtime: f64) -> f64 {
    basic_salary + allowances + overtime
}

pub fn net_pay(gross: f64, deductions: f64, tax: f64) -> f64 {
    gross - deductions - tax
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gross_sums_the_earning_components() {
        assert_eq!(gross_pay(50000.0, 5000.0, 1500.0), 56500.0);
    }

    #[test]
    fn net_subtracts_deductions_and_tax() {
        let gross = gross_pay(50000.0, 5000.0, 1500.0);
        assert_eq!(net_pay(gross, 2000.0, 4000.0), 50500.0);
    }

    #[test]
    fn zero_extras_leave_basic_untouched() {
        let gross = gross_pay(30000.0, 0.0, 0.0);
        assert_eq!(gross, 30000.0);
        assert_eq!(net_pay(gross, 0.0, 0.0), 30000.0);
    }
}
