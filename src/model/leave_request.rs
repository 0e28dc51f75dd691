use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Terminal states are approved/rejected; the only legal transition out of
/// pending goes through the approval action.
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
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1000)]
    pub employee_id: u64,

    #[schema(example = "sick")]
    pub leave_type: String,

    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(example = "2026-01-03", value_type = String, format = "date")]
    pub end_date: NaiveDate,

    /// Inclusive day count, always derived from the dates
    #[schema(example = 3)]
    pub days: i64,

    #[schema(nullable = true)]
    pub reason: Option<String>,

    pub status: LeaveStatus,

    #[schema(example = 42, nullable = true)]
    pub approved_by: Option<u64>,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub approved_at: Option<DateTime<Utc>>,

    #[schema(nullable = true)]
    pub comments: Option<String>,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Inclusive day count: both the start and end dates count as leave days.
pub fn leave_days(start_date: NaiveDate, end_date: NaiveDate) -> i64 {
    (end_date - start_date).num_days() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn single_day_leave_counts_one_day() {
        assert_eq!(leave_days(d("2026-01-05"), d("2026-01-05")), 1);
    }

    #[test]
    fn day_count_is_inclusive_of_both_ends() {
        assert_eq!(leave_days(d("2026-01-01"), d("2026-01-03")), 3);
        assert_eq!(leave_days(d("2026-02-27"), d("2026-03-02")), 4);
    }

    #[test]
    fn leave_status_round_trips() {
        use std::str::FromStr;
        assert_eq!(LeaveStatus::from_str("pending").unwrap(), LeaveStatus::Pending);
        assert_eq!(LeaveStatus::Approved.to_string(), "approved");
        assert!(LeaveStatus::from_str("cancelled").is_err());
    }
}
