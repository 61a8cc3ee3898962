//! Interval-to-slot transformation.
//!
//! Each target day gets a row of 24 hourly slots for every feeder of the
//! region. Outage intervals are quantized to half hours (start floored, end
//! ceiled) and written into the slots they cover. Intervals are applied in
//! `(start, end, feeder)` order and a later interval overwrites the slots it
//! touches.
use std::collections::{BTreeMap, BTreeSet};

use time::{Date, Time};

use super::interval::{OutageInterval, SkippedRecord};
use super::slot::{SLOTS_PER_DAY, SlotRow, SlotState};
use crate::RecordError;

const SECONDS_PER_HALF_HOUR: u32 = 30 * 60;
const HALF_HOURS_PER_DAY: u32 = 2 * SLOTS_PER_DAY as u32;

/// Day → feeder → 24 slots. Built once by [`transform`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DaySlotGrid {
    days: BTreeMap<Date, BTreeMap<String, SlotRow>>,
}

impl DaySlotGrid {
    pub fn day(&self, day: Date) -> Option<&BTreeMap<String, SlotRow>> {
        self.days.get(&day)
    }

    pub fn slots(&self, day: Date, feeder: &str) -> Option<&SlotRow> {
        self.days.get(&day).and_then(|feeders| feeders.get(feeder))
    }

    pub fn days(&self) -> impl Iterator<Item = (&Date, &BTreeMap<String, SlotRow>)> {
        self.days.iter()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub grid: DaySlotGrid,
    pub skipped: Vec<SkippedRecord>,
}

/// Builds the slot grid for `target_days`.
///
/// Every feeder of `feeder_universe` is present for every target day, all `yes`
/// unless an interval touches it. Intervals starting on other days are dropped;
/// intervals of feeders outside the universe are reported in
/// [`Transformed::skipped`].
pub fn transform<I>(
    intervals: I,
    target_days: &BTreeSet<Date>,
    feeder_universe: &BTreeSet<String>,
) -> Transformed
where
    I: IntoIterator<Item = OutageInterval>,
{
    let mut days: BTreeMap<Date, BTreeMap<String, SlotRow>> = target_days
        .iter()
        .map(|day| {
            let rows = feeder_universe
                .iter()
                .map(|feeder| (feeder.clone(), SlotRow::default()))
                .collect();
            (*day, rows)
        })
        .collect();

    let mut retained = intervals
        .into_iter()
        .filter(|interval| target_days.contains(&interval.start().date()))
        .collect::<Vec<_>>();
    retained.sort_by(|a, b| {
        (a.start(), a.end(), a.feeder()).cmp(&(b.start(), b.end(), b.feeder()))
    });
    tracing::debug!(retained = retained.len(), "Applying outage intervals");

    let mut skipped = Vec::new();
    for interval in retained {
        let Some(row) = days
            .get_mut(&interval.start().date())
            .and_then(|rows| rows.get_mut(interval.feeder()))
        else {
            let error = RecordError::UnknownFeeder(interval.feeder().to_string());
            tracing::warn!(%error, "Skipping outage interval");
            skipped.push(SkippedRecord {
                feeder: interval.feeder().to_string(),
                error,
            });
            continue;
        };
        apply(row, &interval);
    }

    Transformed {
        grid: DaySlotGrid { days },
        skipped,
    }
}

fn seconds_of_day(time: Time) -> u32 {
    let (hour, minute, second) = time.as_hms();
    u32::from(hour) * 3600 + u32::from(minute) * 60 + u32::from(second)
}

/// Half-hour range `[start, end)` of the interval within its start day, `0..=48`.
fn half_hours(interval: &OutageInterval) -> (u32, u32) {
    let day = interval.start().date();
    let start = seconds_of_day(interval.start().time()) / SECONDS_PER_HALF_HOUR;
    let end = if interval.end().date() == day {
        seconds_of_day(interval.end().time()).div_ceil(SECONDS_PER_HALF_HOUR)
    } else {
        let past_midnight = day
            .next_day()
            .is_none_or(|next| interval.end() > next.midnight());
        if past_midnight {
            tracing::warn!(
                feeder = interval.feeder(),
                start = %interval.start(),
                end = %interval.end(),
                "Interval crosses midnight, clipped to the end of its start day"
            );
        }
        HALF_HOURS_PER_DAY
    };
    (start, end)
}

fn apply(row: &mut SlotRow, interval: &OutageInterval) {
    let (start, end) = half_hours(interval);
    let covered = start..end;
    for index in start / 2..end.div_ceil(2) {
        let first = covered.contains(&(2 * index));
        let second = covered.contains(&(2 * index + 1));
        if let Some(state) = SlotState::from_halves(first, second) {
            row.set_index(index as usize, state);
        }
    }
}
