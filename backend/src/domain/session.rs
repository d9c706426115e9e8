use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// Who is acting and when, for one call into the ledger.
///
/// The clock is read once when the session is made. Every date, time slot and
/// timestamp written during the call comes from it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    operator: String,
    today: NaiveDate,
    time_of_day: NaiveTime,
    started_at: DateTime<Utc>,
}

impl SessionContext {
    /// Session for `operator` at the current local time
    pub fn new(operator: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            operator: operator.into(),
            today: now.date_naive(),
            time_of_day: now.time(),
            started_at: now.with_timezone(&Utc),
        }
    }

    /// Session pinned to the start of a specific calendar day
    pub fn on_date(operator: impl Into<String>, today: NaiveDate) -> Self {
        Self::at(operator, today, NaiveTime::MIN)
    }

    /// Session pinned to a day and time of day
    pub fn at(operator: impl Into<String>, today: NaiveDate, time_of_day: NaiveTime) -> Self {
        Self {
            operator: operator.into(),
            today,
            time_of_day,
            started_at: Utc.from_utc_datetime(&today.and_time(time_of_day)),
        }
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Today as stored in date columns (YYYY-MM-DD)
    pub fn today_iso(&self) -> String {
        format_date(self.today)
    }

    /// Time slot for walk-in donation events (HH:MM)
    pub fn time_slot(&self) -> String {
        self.time_of_day.format("%H:%M").to_string()
    }

    /// Timestamp for created_at/updated_at columns
    pub fn timestamp(&self) -> String {
        self.started_at.to_rfc3339()
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinned_session_dates() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let session = SessionContext::on_date("nurse.kim", date);

        assert_eq!(session.operator(), "nurse.kim");
        assert_eq!(session.today(), date);
        assert_eq!(session.today_iso(), "2026-02-03");
    }

    #[test]
    fn test_pinned_session_clock() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let session = SessionContext::at("nurse.kim", date, NaiveTime::from_hms_opt(14, 5, 0).unwrap());

        assert_eq!(session.time_slot(), "14:05");
        assert_eq!(session.timestamp(), "2026-02-03T14:05:00+00:00");
        assert_eq!(SessionContext::on_date("nurse.kim", date).time_slot(), "00:00");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2026-12-31"), NaiveDate::from_ymd_opt(2026, 12, 31));
        assert_eq!(parse_date("2026-02-30"), None);
        assert_eq!(parse_date("31/12/2026"), None);
    }
}
