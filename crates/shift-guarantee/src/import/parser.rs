use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug, Deserialize)]
pub(crate) struct ShiftRow {
    pub(crate) worker_id: String,
    pub(crate) location: String,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) predicted_earnings: f64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) actual_earnings: Option<String>,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<ShiftRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader.deserialize::<ShiftRow>().collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, or a bare date at midnight.
pub(crate) fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}
