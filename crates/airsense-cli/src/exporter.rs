use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use airsense_core::{FeedMonitor, Observation, TelemetryFeed};
use anyhow::Result;
use chrono::{DateTime, Days, NaiveDate, Utc};
use tokio::time::sleep;

/// Polls the monitor on its effective interval and appends every
/// observation to a daily JSONL file. This is the persistence sink for
/// samples and alerts; the analytics core never writes anywhere itself.
pub async fn run_exporter<F: TelemetryFeed>(
    monitor: &mut FeedMonitor<F>,
    output_dir: &str,
    retention_days: u64,
) -> Result<()> {
    let out_dir = PathBuf::from(output_dir);
    fs::create_dir_all(&out_dir)?;

    let mut state = ExportState::new(out_dir, retention_days)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = sleep(monitor.effective_interval()) => {
                let observation = monitor.tick().await;
                state.write_observation(&observation)?;
                state.maybe_prune()?;
            }
        }
    }

    Ok(())
}

struct ExportState {
    out_dir: PathBuf,
    retention_days: u64,
    current_day: String,
    writer: BufWriter<File>,
    last_prune: Instant,
}

impl ExportState {
    fn new(out_dir: PathBuf, retention_days: u64) -> Result<Self> {
        let now = Utc::now();
        let day = now.format("%Y-%m-%d").to_string();
        let writer = Self::open_writer(&out_dir, &day)?;

        Ok(Self {
            out_dir,
            retention_days,
            current_day: day,
            writer,
            last_prune: Instant::now() - Duration::from_secs(3600),
        })
    }

    fn open_writer(out_dir: &Path, day: &str) -> Result<BufWriter<File>> {
        let path = out_dir.join(format!("airsense-{day}.jsonl"));
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }

    fn rotate_if_needed(&mut self, ts: DateTime<Utc>) -> Result<()> {
        let day = ts.format("%Y-%m-%d").to_string();
        if day != self.current_day {
            self.writer.flush()?;
            self.writer = Self::open_writer(&self.out_dir, &day)?;
            self.current_day = day;
        }
        Ok(())
    }

    fn write_observation(&mut self, observation: &Observation) -> Result<()> {
        self.rotate_if_needed(observation.ts)?;

        let metrics = observation.sample.as_ref().map(|sample| {
            serde_json::json!({
                "co": sample.co,
                "pm2_5": sample.pm2_5,
                "pm10": sample.pm10,
                "voc": sample.voc,
                "methane": sample.methane,
                "temperature": sample.temperature,
                "humidity": sample.humidity,
            })
        });

        let exported = serde_json::json!({
            "ts": observation.ts,
            "unix_ms": observation.ts.timestamp_millis(),
            "channel_id": observation.sample.as_ref().map(|s| s.channel_id.clone()),
            "location": observation.sample.as_ref().map(|s| s.location.clone()),
            "sample_ts": observation.sample.as_ref().map(|s| s.timestamp),
            "status": observation.status,
            "feed": observation.feed,
            "metrics": metrics,
            "alerts": observation.alerts,
            "quality": observation.quality,
        });

        serde_json::to_writer(&mut self.writer, &exported)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        let latest_path = self.out_dir.join("latest.json");
        fs::write(latest_path, serde_json::to_vec_pretty(&exported)?)?;

        Ok(())
    }

    fn maybe_prune(&mut self) -> Result<()> {
        if self.last_prune.elapsed() < Duration::from_secs(1800) {
            return Ok(());
        }
        self.last_prune = Instant::now();

        prune_old_log_files(&self.out_dir, self.retention_days, SystemTime::now())?;

        Ok(())
    }
}

pub(crate) fn prune_old_log_files(
    out_dir: &Path,
    retention_days: u64,
    now: SystemTime,
) -> Result<()> {
    let today = DateTime::<Utc>::from(now).date_naive();
    let cutoff = today
        .checked_sub_days(Days::new(retention_days))
        .unwrap_or(today);

    for entry in fs::read_dir(out_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path
            .file_name()
            .and_then(|v| v.to_str())
            .map(|n| n.starts_with("airsense-") && n.ends_with(".jsonl"))
            .unwrap_or(false)
        {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|v| v.to_str()) else {
            continue;
        };
        let Some(date_part) = file_name
            .strip_prefix("airsense-")
            .and_then(|v| v.strip_suffix(".jsonl"))
        else {
            continue;
        };

        let Ok(file_date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
            continue;
        };

        if file_date < cutoff {
            let _ = fs::remove_file(path);
        }
    }

    Ok(())
}
