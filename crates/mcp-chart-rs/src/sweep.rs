//! Periodic removal of old rendered charts from the charts directory.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tokio::{sync::oneshot, task::JoinHandle, time::interval};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    pub dir: PathBuf,
    /// How often to sweep (default: 12 hours)
    pub interval: Duration,
    /// How long a chart is kept (default: 7 days)
    pub retention: Duration,
    /// Only files with this extension are considered
    pub extension: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("charts"),
            interval: Duration::from_secs(12 * 60 * 60),
            retention: 7 * DAY,
            extension: "png".to_string(),
        }
    }
}

impl SweepConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention = DAY * days;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Deletes matching files last modified more than `retention` before `now`.
/// Per-file failures are logged and counted, never returned.
pub fn sweep_once(config: &SweepConfig, now: SystemTime) -> SweepStats {
    let mut stats = SweepStats::default();

    let entries = match fs::read_dir(&config.dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %config.dir.display(), error = %e, "Cannot read charts directory");
            return stats;
        }
    };

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable directory entry");
                stats.failed += 1;
                continue;
            }
        };
        if !path.is_file() || !has_extension(&path, &config.extension) {
            continue;
        }
        stats.scanned += 1;

        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping file without mtime");
                stats.failed += 1;
                continue;
            }
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= config.retention {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Removed expired chart");
                stats.removed += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove chart");
                stats.failed += 1;
            }
        }
    }

    tracing::debug!(
        scanned = stats.scanned,
        removed = stats.removed,
        failed = stats.failed,
        "Chart sweep completed"
    );
    stats
}

/// Runs [`sweep_once`] at startup and then on every interval tick until
/// stopped.
#[derive(Debug)]
pub struct ChartSweeper {
    config: SweepConfig,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl ChartSweeper {
    pub fn new(config: SweepConfig) -> Self {
        Self {
            config,
            stop_tx: None,
        }
    }

    pub fn start(&mut self) -> JoinHandle<()> {
        let config = self.config.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);

        tokio::spawn(async move {
            // the first tick completes immediately
            let mut ticker = interval(config.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let config = config.clone();
                        let swept = tokio::task::spawn_blocking(move || {
                            sweep_once(&config, SystemTime::now())
                        })
                        .await;
                        if let Err(e) = swept {
                            tracing::error!(error = %e, "Chart sweep task failed");
                        }
                    }
                    _ = &mut stop_rx => {
                        tracing::info!("Chart sweeper stopped");
                        break;
                    }
                }
            }
        })
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    fn touch(dir: &Path, name: &str, age: Duration) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    #[test]
    fn test_only_expired_png_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let old = touch(dir.path(), "chart-aaaaaaaaaaaa.png", 8 * DAY);
        let recent = touch(dir.path(), "chart-bbbbbbbbbbbb.png", 6 * DAY);
        let other = touch(dir.path(), "notes.txt", 30 * DAY);

        let stats = sweep_once(&SweepConfig::new(dir.path()), SystemTime::now());

        assert!(!old.exists());
        assert!(recent.exists());
        assert!(other.exists());
        assert_eq!(
            stats,
            SweepStats {
                scanned: 2,
                removed: 1,
                failed: 0
            }
        );
    }

    #[test]
    fn test_missing_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = SweepConfig::new(dir.path().join("absent"));
        assert_eq!(sweep_once(&config, SystemTime::now()), SweepStats::default());
    }

    #[test]
    fn test_retention_days() {
        let config = SweepConfig::default().with_retention_days(1);
        assert_eq!(config.retention, DAY);
        assert_eq!(SweepConfig::default().retention, 7 * DAY);
    }

    #[tokio::test]
    async fn test_sweeper_runs_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        let old = touch(dir.path(), "chart-cccccccccccc.png", 8 * DAY);

        let mut sweeper = ChartSweeper::new(
            SweepConfig::new(dir.path()).with_interval(Duration::from_secs(3600)),
        );
        let handle = sweeper.start();
        for _ in 0..100 {
            if !old.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!old.exists());

        sweeper.stop();
        handle.await.unwrap();
    }
}
