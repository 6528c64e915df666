use chrono::{DateTime, Utc};

/// Formats a timestamp for notification copy, e.g.
/// `Friday, June 13, 2025 at 07:00 PM UTC`.
pub fn format_datetime(at: &DateTime<Utc>) -> String {
    at.format("%A, %B %-d, %Y at %I:%M %p UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn long_form() {
        let at = Utc.with_ymd_and_hms(2025, 6, 13, 19, 0, 0).unwrap();
        assert_eq!(format_datetime(&at), "Friday, June 13, 2025 at 07:00 PM UTC");
    }

    #[test]
    fn morning_single_digit_day() {
        let at = Utc.with_ymd_and_hms(2025, 3, 2, 9, 5, 0).unwrap();
        assert_eq!(format_datetime(&at), "Sunday, March 2, 2025 at 09:05 AM UTC");
    }
}
