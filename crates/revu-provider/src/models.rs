use chrono::{DateTime, Utc};
use serde::Deserialize;

pub type ReviewId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_name: String,
    pub contact_number: String,
    pub product_name: String,
    pub product_review: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// Wire format for `created_at`.
///
/// The backend emits naive ISO-8601 date-times (no offset), which are read
/// as UTC. Anything carrying an offset goes through RFC 3339.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        let raw = raw.trim();

        let rfc3339_err = match DateTime::parse_from_rfc3339(raw) {
            Ok(date) => return Ok(date.with_timezone(&Utc)),
            Err(e) => e,
        };

        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or(rfc3339_err)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;

        parse(&raw).map_err(|e| {
            serde::de::Error::custom(format!("invalid created_at {raw:?}: {e}"))
        })
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};

    use super::{timestamp, Review};

    #[test]
    fn test_parses_backend_payload() -> anyhow::Result<()> {
        let body = r#"[{
            "id": 1,
            "user_name": "Ana",
            "contact_number": "whatsapp:+1555",
            "product_name": "Widget",
            "product_review": "Great!",
            "created_at": "2024-01-05T15:42:00Z"
        }]"#;

        let reviews: Vec<Review> = serde_json::from_str(body)?;

        assert_eq!(1, reviews.len());
        assert_eq!("Ana", reviews[0].user_name);
        assert_eq!(
            Utc.with_ymd_and_hms(2024, 1, 5, 15, 42, 0).unwrap(),
            reviews[0].created_at
        );

        Ok(())
    }

    #[test]
    fn test_naive_timestamps_are_utc() -> anyhow::Result<()> {
        let expected = Utc.with_ymd_and_hms(2024, 1, 5, 15, 42, 0).unwrap();

        assert_eq!(expected, timestamp::parse("2024-01-05T15:42:00")?);
        assert_eq!(expected, timestamp::parse("2024-01-05 15:42:00")?);
        assert_eq!(
            expected + chrono::Duration::microseconds(123456),
            timestamp::parse("2024-01-05T15:42:00.123456")?
        );

        Ok(())
    }

    #[test]
    fn test_offsets_are_normalised() -> anyhow::Result<()> {
        assert_eq!(
            Utc.with_ymd_and_hms(2024, 1, 5, 13, 42, 0).unwrap(),
            timestamp::parse("2024-01-05T15:42:00+02:00")?
        );

        Ok(())
    }

    #[test]
    fn test_rejects_unparsable_created_at() {
        let body = r#"{
            "id": 7,
            "user_name": "Bo",
            "contact_number": "+1",
            "product_name": "Lamp",
            "product_review": "ok",
            "created_at": "yesterday"
        }"#;

        let err = serde_json::from_str::<Review>(body).unwrap_err();

        assert!(err.to_string().contains("invalid created_at"));
    }
}
