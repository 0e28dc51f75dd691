use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
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
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    #[serde(rename = "half-day")]
    #[strum(serialize = "half-day")]
    #[sqlx(rename = "half-day")]
    HalfDay,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1000)]
    pub employee_id: u64,

    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "2026-01-05T09:00:00", value_type = String, format = "date-time", nullable = true)]
    pub check_in: Option<NaiveDateTime>,

    #[schema(example = "2026-01-05T17:30:00", value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<NaiveDateTime>,

    pub status: AttendanceStatus,

    /// Derived from check_in/check_out whenever both are known
    #[schema(example = 8.5)]
    pub working_hours: f64,

    #[schema(nullable = true)]
    pub comments: Option<String>,

    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Hours between check-in and check-out.
pub fn working_hours(check_in: NaiveDateTime, check_out: NaiveDateTime) -> f64 {
    (check_out - check_in).num_seconds() as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn full_day_is_eight_and_a_half_hours() {
        let hours = working_hours(t("2026-01-05T09:00:00"), t("2026-01-05T17:30:00"));
        assert!((hours - 8.5).abs() < 1e-9);
    }

    #[test]
    fn partial_hours_are_fractional() {
        let hours = working_hours(t("2026-01-05T09:00:00"), t("2026-01-05T09:45:00"));
        assert!((hours - 0.75).abs() < 1e-9);
    }

    #[test]
    fn half_day_status_keeps_its_hyphen() {
        let json = serde_json::to_string(&AttendanceStatus::HalfDay).unwrap();
        assert_eq!(json, "\"half-day\"");
        assert_eq!(AttendanceStatus::HalfDay.to_string(), "half-day");
    }
}
