use std::collections::{BTreeMap, BTreeSet};

use time::{Date, OffsetDateTime, UtcOffset, macros::offset};

/// Static description of a region: identity, local time and its feeders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionPreset {
    pub region_id: String,
    pub affiliation: String,
    pub file_name: String,
    /// Fixed offset the upstream timestamps are expressed in.
    pub utc_offset: UtcOffset,
    /// Feeder key → display name, in publishing order.
    pub feeders: Vec<(String, String)>,
    /// Weekday names, Monday first.
    pub weekdays: [String; 7],
}

impl RegionPreset {
    pub const DEFAULT_OFFSET: UtcOffset = offset!(+2);

    pub fn vinnytsia() -> Self {
        let feeders = (1..=6)
            .flat_map(|group| (1..=2).map(move |sub| format!("{group}.{sub}")))
            .map(|queue| (format!("GPV{queue}"), format!("Черга {queue}")))
            .collect();
        Self {
            region_id: "vinnytsia".to_string(),
            affiliation: "Вінницька область".to_string(),
            file_name: "Vinnytsiaoblenerho.json".to_string(),
            utc_offset: Self::DEFAULT_OFFSET,
            feeders,
            weekdays: [
                "Понеділок",
                "Вівторок",
                "Середа",
                "Четвер",
                "П'ятниця",
                "Субота",
                "Неділя",
            ]
            .map(String::from),
        }
    }

    pub fn with_offset(mut self, utc_offset: UtcOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    pub fn feeder_universe(&self) -> BTreeSet<String> {
        self.feeders.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn feeder_keys(&self) -> impl Iterator<Item = &str> {
        self.feeders.iter().map(|(key, _)| key.as_str())
    }

    pub fn schedule_names(&self) -> BTreeMap<String, String> {
        self.feeders.iter().cloned().collect()
    }

    /// `now` converted to the region's local offset.
    pub fn local(&self, now: OffsetDateTime) -> OffsetDateTime {
        now.to_offset(self.utc_offset)
    }

    /// Local "today" and "tomorrow" of `now`.
    pub fn target_days(&self, now: OffsetDateTime) -> BTreeSet<Date> {
        let today = self.local(now).date();
        [Some(today), today.next_day()]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Unix timestamp of local midnight of `day`.
    pub fn day_key(&self, day: Date) -> i64 {
        day.midnight().assume_offset(self.utc_offset).unix_timestamp()
    }
}

impl Default for RegionPreset {
    fn default() -> Self {
        Self::vinnytsia()
    }
}
