use serde::{Deserialize, Serialize};
use time::{
    PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::RecordError;

/// One planned disconnection as published upstream, before validation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RawOutageRecord {
    pub feeder: String,
    #[serde(default)]
    pub acc_begin: Option<String>,
    #[serde(default)]
    pub accend_plan: Option<String>,
}

impl RawOutageRecord {
    pub fn new(feeder: impl Into<String>, begin: &str, end: &str) -> Self {
        Self {
            feeder: feeder.into(),
            acc_begin: Some(begin.to_string()),
            accend_plan: Some(end.to_string()),
        }
    }
}

const TIMESTAMP_FORMATS: &[&[BorrowedFormatItem<'_>]] = &[
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    // Alternative layout used by the cabinet pages
    format_description!("[day].[month].[year] [hour]:[minute]"),
];

fn parse_timestamp(field: &'static str, value: &str) -> Result<PrimitiveDateTime, RecordError> {
    let trimmed = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(trimmed, format).ok())
        .ok_or_else(|| RecordError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

/// A validated outage interval in local civil time. `end` is always after `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutageInterval {
    feeder: String,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
}

impl OutageInterval {
    pub fn new(
        feeder: impl Into<String>,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<Self, RecordError> {
        if end <= start {
            return Err(RecordError::NonPositiveDuration { start, end });
        }
        Ok(Self {
            feeder: feeder.into(),
            start,
            end,
        })
    }

    pub fn from_raw(raw: &RawOutageRecord) -> Result<Self, RecordError> {
        let begin = raw
            .acc_begin
            .as_deref()
            .ok_or(RecordError::MissingField("acc_begin"))?;
        let end = raw
            .accend_plan
            .as_deref()
            .ok_or(RecordError::MissingField("accend_plan"))?;
        Self::new(
            raw.feeder.clone(),
            parse_timestamp("acc_begin", begin)?,
            parse_timestamp("accend_plan", end)?,
        )
    }

    pub fn feeder(&self) -> &str {
        &self.feeder
    }

    pub fn start(&self) -> PrimitiveDateTime {
        self.start
    }

    pub fn end(&self) -> PrimitiveDateTime {
        self.end
    }
}

/// A record that was left out, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub feeder: String,
    pub error: RecordError,
}

/// Validates raw records, keeping the good ones and reporting the rest.
pub fn intake(records: &[RawOutageRecord]) -> (Vec<OutageInterval>, Vec<SkippedRecord>) {
    let mut intervals = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    for record in records {
        match OutageInterval::from_raw(record) {
            Ok(interval) => intervals.push(interval),
            Err(error) => {
                tracing::warn!(feeder = %record.feeder, %error, "Skipping outage record");
                skipped.push(SkippedRecord {
                    feeder: record.feeder.clone(),
                    error,
                });
            }
        }
    }
    (intervals, skipped)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_parse_supported_layouts() {
        let expected = datetime!(2025-12-08 08:30:00);
        for value in [
            "2025-12-08 08:30:00",
            "2025-12-08T08:30:00",
            "2025-12-08 08:30",
            "08.12.2025 08:30",
            "  2025-12-08 08:30:00 ",
        ] {
            assert_eq!(parse_timestamp("acc_begin", value), Ok(expected), "{value}");
        }
    }

    #[test]
    fn test_from_raw_valid() {
        let raw = RawOutageRecord::new("GPV1.1", "2025-12-08 08:00:00", "2025-12-08 10:30:00");
        let interval = OutageInterval::from_raw(&raw).unwrap();
        assert_eq!(interval.feeder(), "GPV1.1");
        assert_eq!(interval.start(), datetime!(2025-12-08 08:00:00));
        assert_eq!(interval.end(), datetime!(2025-12-08 10:30:00));
    }

    #[test]
    fn test_from_raw_missing_field() {
        let raw = RawOutageRecord {
            feeder: "GPV1.1".to_string(),
            acc_begin: Some("2025-12-08 08:00:00".to_string()),
            accend_plan: None,
        };
        assert_eq!(
            OutageInterval::from_raw(&raw),
            Err(RecordError::MissingField("accend_plan"))
        );
    }

    #[test]
    fn test_from_raw_malformed_timestamp() {
        let raw = RawOutageRecord::new("GPV1.1", "tomorrow morning", "2025-12-08 10:00:00");
        assert_eq!(
            OutageInterval::from_raw(&raw),
            Err(RecordError::InvalidTimestamp {
                field: "acc_begin",
                value: "tomorrow morning".to_string(),
            })
        );
    }

    #[test]
    fn test_non_positive_duration_is_rejected() {
        let at = datetime!(2025-12-08 08:00:00);
        assert!(matches!(
            OutageInterval::new("GPV1.1", at, at),
            Err(RecordError::NonPositiveDuration { .. })
        ));
        assert!(matches!(
            OutageInterval::new("GPV1.1", at, datetime!(2025-12-08 07:00:00)),
            Err(RecordError::NonPositiveDuration { .. })
        ));
    }

    #[test]
    fn test_intake_skips_bad_records_only() {
        let records = vec![
            RawOutageRecord::new("GPV1.1", "2025-12-08 08:00:00", "2025-12-08 09:00:00"),
            RawOutageRecord::new("GPV1.2", "2025-12-08 09:00:00", "2025-12-08 08:00:00"),
            RawOutageRecord::new("GPV2.1", "garbage", "2025-12-08 08:00:00"),
            RawOutageRecord::new("GPV2.2", "2025-12-08 12:00", "2025-12-08 14:00"),
        ];
        let (intervals, skipped) = intake(&records);
        assert_eq!(intervals.len(), 2);
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].feeder, "GPV1.2");
        assert_eq!(skipped[1].feeder, "GPV2.1");
    }
}
