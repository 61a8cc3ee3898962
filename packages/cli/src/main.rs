use std::{fs::File, path::Path, sync::Arc};

use clap::Parser;
use svitlo::{
    ScheduleCore,
    core::{RegionPreset, ScheduleDocument, published_content_hash},
};
use svitlo_esvitlo::PayloadDirSource;
use time::{OffsetDateTime, UtcOffset};
use tokio::io::AsyncWriteExt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt as _, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "svitlo",
    about = "Builds the hourly planned outage schedule of a region.",
    version
)]
struct SvitloOptions {
    /// The directory with one captured cabinet payload per feeder (`<feeder>.json`).
    #[arg(short = 'i', long = "input", default_value = "./payloads")]
    input_dir: String,

    /// The output directory for the schedule document.
    #[arg(short = 'o', long = "out", default_value = "./data")]
    out_dir: String,

    /// The number of retries for reading the payloads.
    #[arg(short = 'r', long = "retry", default_value_t = ScheduleCore::RETRY_COUNT)]
    retry_count: u32,

    /// UTC offset of the portal timestamps, in whole hours.
    #[arg(long = "utc-offset", default_value_t = 2, allow_hyphen_values = true)]
    utc_offset: i8,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    setup_tracing()?;

    color_eyre::install()?;
    let options = SvitloOptions::parse();

    let preset =
        RegionPreset::vinnytsia().with_offset(UtcOffset::from_hms(options.utc_offset, 0, 0)?);
    let source = PayloadDirSource::new(&options.input_dir, preset.feeder_keys());
    let core = ScheduleCore::new(preset);

    let document = core
        .run_with_retry(&source, OffsetDateTime::now_utc(), options.retry_count)
        .await?;

    save_document(
        Path::new(&options.out_dir),
        &core.preset().file_name,
        &document,
    )
    .await
}

pub(crate) async fn save_document(
    out_dir: &Path,
    file_name: &str,
    document: &ScheduleDocument,
) -> eyre::Result<()> {
    let path = out_dir.join(file_name);
    let previous_hash = match tokio::fs::read_to_string(&path).await {
        Ok(json) => published_content_hash(&json),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    if document.is_unchanged_from(previous_hash.as_deref()) {
        tracing::info!(hash = document.content_hash(), "Schedule content unchanged");
    } else {
        tracing::info!(
            target: SCHEDULE_CHANGE_TARGET,
            region = %document.region_id,
            previous = ?previous_hash,
            hash = document.content_hash(),
            "Schedule content changed"
        );
    }

    let json = serde_json::to_string_pretty(document)?;
    tokio::fs::create_dir_all(out_dir).await?;

    let mut json_file = tokio::fs::File::create(&path).await?;
    json_file.write_all(json.as_bytes()).await?;
    json_file.flush().await?;
    tracing::info!(path = %path.display(), "Saved schedule");
    Ok(())
}

/// Tracing target of the event logged when the published content changes.
const SCHEDULE_CHANGE_TARGET: &str = "schedule_change";
const REPORTS_DIR: &str = "reports";

fn is_schedule_change(target: &str) -> bool {
    target == SCHEDULE_CHANGE_TARGET
}

fn report_writer(name: &str) -> eyre::Result<Arc<File>> {
    let path = Path::new(REPORTS_DIR).join(name);
    let file = File::create(&path)
        .map_err(|e| eyre::eyre!("Failed to create report {}: {e}", path.display()))?;
    Ok(Arc::new(file))
}

/// Logs to stdout (`RUST_LOG`, default `info`) and keeps two JSON reports of
/// the run: `schedule_changes.json` with content changes only and
/// `schedule_errors.json` with every error.
fn setup_tracing() -> eyre::Result<()> {
    std::fs::create_dir_all(REPORTS_DIR)?;

    let stdout_log = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_level(true)
        .with_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        );

    let change_report = tracing_subscriber::fmt::layer()
        .json()
        .with_span_list(false)
        .with_writer(report_writer("schedule_changes.json")?)
        .with_filter(filter::filter_fn(|metadata| {
            is_schedule_change(metadata.target())
        }));

    let error_report = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(report_writer("schedule_errors.json")?)
        .with_filter(LevelFilter::ERROR);

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(change_report)
        .with(error_report)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use svitlo::core::{OutageInterval, transform};
    use time::macros::datetime;

    use super::*;

    fn document(now: OffsetDateTime, outage_end: time::PrimitiveDateTime) -> ScheduleDocument {
        let preset = RegionPreset::vinnytsia();
        let interval =
            OutageInterval::new("GPV4.1", datetime!(2025-12-08 10:00), outage_end).unwrap();
        let grid = transform(
            [interval],
            &preset.target_days(now),
            &preset.feeder_universe(),
        )
        .grid;
        ScheduleDocument::build(&preset, &grid, now, 1, &[]).unwrap()
    }

    #[tokio::test]
    async fn test_save_document_overwrites_previous() {
        let out_dir = std::env::temp_dir().join("svitlo_cli_save");
        let _ = tokio::fs::remove_dir_all(&out_dir).await;
        let now = datetime!(2025-12-08 06:00 UTC);

        let first = document(now, datetime!(2025-12-08 12:00));
        save_document(&out_dir, "region.json", &first).await.unwrap();
        let second = document(now, datetime!(2025-12-08 14:00));
        save_document(&out_dir, "region.json", &second).await.unwrap();

        let json = tokio::fs::read_to_string(out_dir.join("region.json"))
            .await
            .unwrap();
        assert_eq!(
            published_content_hash(&json).as_deref(),
            Some(second.content_hash())
        );
        assert_ne!(first.content_hash(), second.content_hash());
    }

    #[test]
    fn test_change_report_keeps_only_schedule_changes() {
        assert!(is_schedule_change("schedule_change"));
        assert!(!is_schedule_change("svitlo::core"));
        assert!(!is_schedule_change("svitlo::core::grid"));
    }
}
