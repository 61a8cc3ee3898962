use std::time::Duration;

use time::OffsetDateTime;

use crate::{Error, SourceError};

pub mod grid;
pub mod hash;
pub mod interval;
pub mod region;
pub mod schedule;
pub mod slot;

pub use grid::{DaySlotGrid, Transformed, transform};
pub use interval::{OutageInterval, RawOutageRecord, SkippedRecord, intake};
pub use region::RegionPreset;
pub use schedule::{ScheduleDocument, published_content_hash};
pub use slot::{SlotRow, SlotState};

/// Anything that can hand over the raw planned-outage records of a region.
pub trait OutageSource {
    const IDENTIFIER: &'static str;

    fn fetch(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<RawOutageRecord>, SourceError>> + Send;
}

pub struct ScheduleCore {
    preset: RegionPreset,
    retry_delay: Duration,
}

impl ScheduleCore {
    pub const RETRY_COUNT: u32 = 3;
    pub const RETRY_DELAY: Duration = Duration::from_secs(2);

    pub fn new(preset: RegionPreset) -> Self {
        Self {
            preset,
            retry_delay: Self::RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn preset(&self) -> &RegionPreset {
        &self.preset
    }

    /// Builds the schedule document for the local today and tomorrow of `now`.
    /// Bad records are skipped and reported in the document status.
    pub fn build(
        &self,
        records: &[RawOutageRecord],
        now: OffsetDateTime,
        attempt: u32,
    ) -> Result<ScheduleDocument, Error> {
        let (intervals, mut skipped) = intake(records);
        let transformed = transform(
            intervals,
            &self.preset.target_days(now),
            &self.preset.feeder_universe(),
        );
        skipped.extend(transformed.skipped);
        tracing::info!(
            records = records.len(),
            skipped = skipped.len(),
            days = transformed.grid.len(),
            "Built slot grid"
        );
        ScheduleDocument::build(&self.preset, &transformed.grid, now, attempt, &skipped)
    }

    pub async fn run<T: OutageSource>(
        &self,
        source: &T,
        now: OffsetDateTime,
    ) -> Result<ScheduleDocument, Error> {
        self.run_with_retry(source, now, 0).await
    }

    /// Fetches from `source`, retrying the fetch up to `retry_count` times.
    /// Nothing is built unless a fetch succeeds.
    #[tracing::instrument(level = tracing::Level::DEBUG, skip_all, fields(source = T::IDENTIFIER))]
    pub async fn run_with_retry<T: OutageSource>(
        &self,
        source: &T,
        now: OffsetDateTime,
        retry_count: u32,
    ) -> Result<ScheduleDocument, Error> {
        let mut attempt = 1;
        let records = loop {
            match source.fetch().await {
                Ok(records) => break records,
                Err(err) if attempt <= retry_count => {
                    tracing::warn!(attempt, error = %err, "Fetch failed, retrying");
                    tokio::time::sleep(self.retry_delay * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(attempt, error = %err, "Fetch failed");
                    return Err(err.into());
                }
            }
        };
        tracing::info!(attempt, records = records.len(), "Fetched outage records");
        self.build(&records, now, attempt)
    }
}
