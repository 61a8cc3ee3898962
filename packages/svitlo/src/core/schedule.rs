use std::collections::BTreeMap;

use serde::Serialize;
use time::{
    OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use super::{
    grid::DaySlotGrid, hash::content_hash, interval::SkippedRecord, region::RegionPreset,
    slot::SlotRow,
};
use crate::Error;

const UPDATE_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[day].[month].[year] [hour]:[minute]");

/// Day timestamp → feeder → slots, as published under `fact.data`.
pub type FactData = BTreeMap<i64, BTreeMap<String, SlotRow>>;

/// The published schedule file.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDocument {
    pub region_id: String,
    pub last_updated: i64,
    pub fact: Fact,
    pub preset: Preset,
    pub last_update_status: UpdateStatus,
    pub region_affiliation: String,
    pub meta: Meta,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Fact {
    pub data: FactData,
    pub update: String,
    pub today: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Preset {
    pub days: BTreeMap<String, String>,
    pub sch_names: BTreeMap<String, String>,
    #[serde(rename = "updateFact")]
    pub update_fact: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UpdateStatus {
    pub status: String,
    pub ok: bool,
    /// Status code of the successful fetch, published as an HTTP-style code.
    pub code: u16,
    pub message: Option<String>,
    pub at: i64,
    pub attempt: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub schema_version: String,
    pub content_hash: String,
}

impl ScheduleDocument {
    pub const SCHEMA_VERSION: &'static str = "1.0.0";
    const FETCHED_CODE: u16 = 200;

    /// Wraps `grid` into the published document. `attempt` is the fetch attempt
    /// that produced the records, `skipped` the records left out of the grid.
    pub fn build(
        preset: &RegionPreset,
        grid: &DaySlotGrid,
        now: OffsetDateTime,
        attempt: u32,
        skipped: &[SkippedRecord],
    ) -> Result<Self, Error> {
        let local = preset.local(now);
        let update = local.format(UPDATE_FORMAT)?;
        let last_updated = now.unix_timestamp();

        let data: FactData = grid
            .days()
            .map(|(day, feeders)| (preset.day_key(*day), feeders.clone()))
            .collect();
        let content_hash = content_hash(&data)?;

        let message = (!skipped.is_empty())
            .then(|| format!("{} outage records skipped", skipped.len()));

        Ok(Self {
            region_id: preset.region_id.clone(),
            last_updated,
            fact: Fact {
                data,
                update: update.clone(),
                today: preset.day_key(local.date()),
            },
            preset: Preset {
                days: preset
                    .weekdays
                    .iter()
                    .enumerate()
                    .map(|(i, name)| ((i + 1).to_string(), name.clone()))
                    .collect(),
                sch_names: preset.schedule_names(),
                update_fact: update,
            },
            last_update_status: UpdateStatus {
                status: "parsed".to_string(),
                ok: true,
                code: Self::FETCHED_CODE,
                message,
                at: last_updated,
                attempt,
            },
            region_affiliation: preset.affiliation.clone(),
            meta: Meta {
                schema_version: Self::SCHEMA_VERSION.to_string(),
                content_hash,
            },
        })
    }

    pub fn content_hash(&self) -> &str {
        &self.meta.content_hash
    }

    /// Whether `fact.data` is the same as in a document with `previous_hash`.
    pub fn is_unchanged_from(&self, previous_hash: Option<&str>) -> bool {
        previous_hash == Some(self.content_hash())
    }
}

/// Reads `meta.contentHash` out of a previously published document.
pub fn published_content_hash(json: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(json)
        .ok()?
        .pointer("/meta/contentHash")?
        .as_str()
        .map(str::to_string)
}
