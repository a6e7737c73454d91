use chrono::{DateTime, SubsecRound, Utc};

pub use media_sync_sources::trakt::api::format_date;

pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an ISO-8601 date, falling back to now.
pub fn parse_date_or_now(value: &str) -> DateTime<Utc> {
    parse_date(value).unwrap_or_else(Utc::now)
}

/// Drop sub-second precision. Local and remote timestamps disagree below one second.
pub fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_seconds() {
        let at = parse_date("2024-01-01T00:00:00.999Z").unwrap();
        assert_eq!(truncate_to_seconds(at), parse_date("2024-01-01T00:00:00Z").unwrap());
    }

    #[test]
    fn test_parse_fallback() {
        let before = Utc::now();
        assert!(parse_date_or_now("not a date") >= before);
        assert_eq!(
            format_date(parse_date_or_now("2024-05-06T07:08:09.123Z")),
            "2024-05-06T07:08:09.123Z"
        );
    }
}
