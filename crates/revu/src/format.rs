use chrono::{DateTime, Local, Utc};
use revu_config::DisplayZone;

const CHANNEL_PREFIX: &str = "whatsapp:";
const DATE_FORMAT: &str = "%b %-d, %Y, %I:%M %p";

/// `Jan 5, 2024, 03:42 PM`
pub fn format_date(date: &DateTime<Utc>, zone: DisplayZone) -> String {
    match zone {
        DisplayZone::Utc => date.format(DATE_FORMAT).to_string(),
        DisplayZone::Local => date.with_timezone(&Local).format(DATE_FORMAT).to_string(),
    }
}

pub fn format_relative(date: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    timeago::Formatter::new().convert_chrono(*date, now)
}

pub fn format_phone_number(raw: &str) -> &str {
    raw.trim_start_matches(CHANNEL_PREFIX)
}

pub fn avatar_initial(name: &str) -> String {
    match name.chars().next() {
        Some(c) => c.to_uppercase().collect(),
        None => "?".into(),
    }
}

pub fn review_count_label(count: usize) -> String {
    match count {
        1 => "1 Review".into(),
        n => format!("{n} Reviews"),
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use revu_config::DisplayZone;

    use super::*;

    #[test]
    fn test_strips_channel_prefix() {
        assert_eq!("+15551234567", format_phone_number("whatsapp:+15551234567"));
        assert_eq!("+15551234567", format_phone_number("+15551234567"));
        assert_eq!("", format_phone_number(""));
    }

    #[test]
    fn test_phone_formatting_is_idempotent() {
        for raw in ["whatsapp:+15551234567", "whatsapp:whatsapp:+1", "+1 555", "tel:+1"] {
            let once = format_phone_number(raw);
            assert_eq!(once, format_phone_number(once), "input {raw:?}");
        }
    }

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2024, 1, 5, 15, 42, 0).unwrap();

        let formatted = format_date(&date, DisplayZone::Utc);

        assert_eq!("Jan 5, 2024, 03:42 PM", formatted);
        assert_eq!(formatted, format_date(&date, DisplayZone::Utc));
    }

    #[test]
    fn test_format_date_morning_and_local() {
        let date = Utc.with_ymd_and_hms(2023, 11, 23, 9, 5, 0).unwrap();

        assert_eq!("Nov 23, 2023, 09:05 AM", format_date(&date, DisplayZone::Utc));

        let local = format_date(&date, DisplayZone::Local);
        assert!(local.contains("2023"));
        assert!(local.ends_with("AM") || local.ends_with("PM"));
    }

    #[test]
    fn test_relative_age() {
        let date = Utc.with_ymd_and_hms(2024, 1, 5, 15, 42, 0).unwrap();

        assert_eq!(
            "2 hours ago",
            format_relative(&date, date + chrono::Duration::hours(2))
        );
    }

    #[test]
    fn test_avatar_initial() {
        assert_eq!("A", avatar_initial("ana"));
        assert_eq!("Ø", avatar_initial("øystein"));
        assert_eq!("?", avatar_initial(""));
    }

    #[test]
    fn test_review_count_label() {
        assert_eq!("0 Reviews", review_count_label(0));
        assert_eq!("1 Review", review_count_label(1));
        assert_eq!("12 Reviews", review_count_label(12));
    }
}
