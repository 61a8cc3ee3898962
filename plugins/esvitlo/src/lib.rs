//! Planned disconnections captured from the e-svitlo household cabinet.
//!
//! The cabinet answers `show_only_disconnections` with one JSON payload per
//! metering point. This source reads such payloads saved as
//! `<dir>/<feeder key>.json` and flattens their `planned_list_cab` entries.
use std::path::PathBuf;

use futures::{TryStreamExt as _, stream::FuturesOrdered};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use svitlo::{
    SourceError,
    core::{OutageSource, RawOutageRecord},
};

#[derive(Debug, Deserialize)]
struct DisconnectionsPayload {
    #[serde(default)]
    planned_list_cab: Vec<PlannedEntry>,
}

#[derive(Debug, Deserialize)]
struct PlannedEntry {
    #[serde(default)]
    acc_begin: Option<Value>,
    #[serde(default)]
    accend_plan: Option<Value>,
}

#[derive(Debug, Error)]
enum PayloadError {
    #[error("cannot read payload of {feeder}: {source}")]
    Read {
        feeder: String,
        source: std::io::Error,
    },
    #[error("payload of {feeder} is not valid JSON: {source}")]
    Parse {
        feeder: String,
        source: serde_json::Error,
    },
}

impl From<PayloadError> for SourceError {
    fn from(error: PayloadError) -> Self {
        match error {
            PayloadError::Read { .. } => SourceError::request::<PayloadDirSource>(error.to_string()),
            PayloadError::Parse { .. } => SourceError::parse::<PayloadDirSource>(error.to_string()),
        }
    }
}

// Non-string timestamps are kept as missing so the core reports them per record.
fn text(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    }
}

/// Parses one cabinet payload into raw records of `feeder`.
pub fn parse_payload(feeder: &str, body: &str) -> Result<Vec<RawOutageRecord>, SourceError> {
    let payload: DisconnectionsPayload =
        serde_json::from_str(body).map_err(|source| PayloadError::Parse {
            feeder: feeder.to_string(),
            source,
        })?;
    Ok(payload
        .planned_list_cab
        .into_iter()
        .map(|entry| RawOutageRecord {
            feeder: feeder.to_string(),
            acc_begin: text(entry.acc_begin),
            accend_plan: text(entry.accend_plan),
        })
        .collect())
}

/// Reads one captured payload per feeder from a directory.
pub struct PayloadDirSource {
    dir: PathBuf,
    feeders: Vec<String>,
}

impl PayloadDirSource {
    pub fn new(dir: impl Into<PathBuf>, feeders: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            dir: dir.into(),
            feeders: feeders.into_iter().map(Into::into).collect(),
        }
    }

    async fn feeder_records(&self, feeder: &str) -> Result<Vec<RawOutageRecord>, SourceError> {
        let path = self.dir.join(format!("{feeder}.json"));
        tracing::debug!(path = %path.display(), "Reading payload");
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| PayloadError::Read {
                feeder: feeder.to_string(),
                source,
            })?;
        let records = parse_payload(feeder, &body)?;
        tracing::info!(feeder, records = records.len(), "Parsed planned disconnections");
        Ok(records)
    }
}

impl OutageSource for PayloadDirSource {
    const IDENTIFIER: &'static str = "vn.e-svitlo.com.ua";

    async fn fetch(&self) -> Result<Vec<RawOutageRecord>, SourceError> {
        let per_feeder = self
            .feeders
            .iter()
            .map(|feeder| self.feeder_records(feeder))
            .collect::<FuturesOrdered<_>>()
            .try_collect::<Vec<_>>()
            .await?;
        Ok(per_feeder.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use svitlo::{
        ScheduleCore, SourceErrorKind,
        core::{RegionPreset, SlotState},
    };
    use time::macros::datetime;

    use super::*;

    const PAYLOAD: &str = r#"{
        "planned_list_cab": [
            {"acc_begin": "2025-12-08 08:00:00", "accend_plan": "2025-12-08 10:30:00", "dis_type": "ГПВ"},
            {"acc_begin": "2025-12-08 18:30:00", "accend_plan": null},
            {"acc_begin": 1765180800, "accend_plan": "2025-12-08 21:00:00"}
        ]
    }"#;

    async fn payload_dir(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("svitlo_esvitlo_{name}"));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        for (feeder, body) in files {
            tokio::fs::write(dir.join(format!("{feeder}.json")), body)
                .await
                .unwrap();
        }
        dir
    }

    #[test]
    fn test_parse_payload() {
        let records = parse_payload("GPV1.1", PAYLOAD).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            RawOutageRecord::new("GPV1.1", "2025-12-08 08:00:00", "2025-12-08 10:30:00")
        );
        assert_eq!(records[1].accend_plan, None);
        assert_eq!(records[2].acc_begin, None);
    }

    #[test]
    fn test_parse_payload_without_list() {
        assert!(parse_payload("GPV1.1", r#"{"status": "ok"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_payload_rejects_html() {
        let err = parse_payload("GPV1.1", "<html><body>login</body></html>").unwrap_err();
        assert_eq!(err.kind(), SourceErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_fetch_reads_every_feeder() {
        let dir = payload_dir(
            "fetch",
            &[("GPV1.1", PAYLOAD), ("GPV1.2", r#"{"planned_list_cab": []}"#)],
        )
        .await;
        let source = PayloadDirSource::new(&dir, ["GPV1.1", "GPV1.2"]);
        let records = source.fetch().await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|record| record.feeder == "GPV1.1"));
    }

    #[tokio::test]
    async fn test_missing_payload_fails_the_fetch() {
        let dir = payload_dir("missing", &[("GPV1.1", PAYLOAD)]).await;
        let source = PayloadDirSource::new(&dir, ["GPV1.1", "GPV6.2"]);
        let err = source.fetch().await.unwrap_err();
        assert_eq!(err.kind(), SourceErrorKind::Request);
    }

    #[tokio::test]
    async fn test_schedule_from_payloads() {
        let preset = RegionPreset::vinnytsia();
        let feeders = preset.feeder_keys().map(str::to_string).collect::<Vec<_>>();
        let files = feeders
            .iter()
            .map(|feeder| {
                let body = if feeder == "GPV1.1" {
                    PAYLOAD
                } else {
                    r#"{"planned_list_cab": []}"#
                };
                (feeder.as_str(), body)
            })
            .collect::<Vec<_>>();
        let dir = payload_dir("schedule", &files).await;

        let core = ScheduleCore::new(preset);
        let source = PayloadDirSource::new(&dir, feeders);
        let document = core
            .run(&source, datetime!(2025-12-08 05:00 UTC))
            .await
            .unwrap();

        let today = &document.fact.data[&document.fact.today];
        assert_eq!(today.len(), 12);
        assert_eq!(today["GPV1.1"].get(9), Some(SlotState::No));
        assert_eq!(today["GPV1.1"].get(10), Some(SlotState::No));
        assert_eq!(today["GPV1.1"].get(11), Some(SlotState::First));
        assert!(today["GPV2.1"].is_all_yes());
        assert_eq!(
            document.last_update_status.message.as_deref(),
            Some("2 outage records skipped")
        );
    }
}
