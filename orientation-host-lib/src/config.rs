use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};
use directories::ProjectDirs;

use crate::{orientation::Axis, sensor::SamplingRate};

pub const SAMPLING_RATE: SamplingRate = SamplingRate::Game;
pub const SAVE_INTERVAL: Duration = Duration::from_secs(1);
pub const HISTORY_LIMIT: usize = 100;
/// Device upright, screen towards the user
pub const AXIS_REMAP: (Axis, Axis) = (Axis::X, Axis::Z);

pub const DATABASE_FILE_NAME: &str = "orientation.orl";
pub const CSV_FILE_NAME: &str = "orientation_data.csv";

/// What the persister does when a write fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreErrorPolicy {
    #[default]
    LogAndContinue,
    Stop,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sampling_rate: SamplingRate,
    pub save_interval: Duration,
    pub axis_remap: (Axis, Axis),
    pub on_store_error: StoreErrorPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sampling_rate: SAMPLING_RATE,
            save_interval: SAVE_INTERVAL,
            axis_remap: AXIS_REMAP,
            on_store_error: StoreErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub database: PathBuf,
    pub csv_export: PathBuf,
}

impl AppPaths {
    pub fn in_dir(data_dir: PathBuf) -> Self {
        Self {
            database: data_dir.join(DATABASE_FILE_NAME),
            csv_export: data_dir.join(CSV_FILE_NAME),
            data_dir,
        }
    }

    /// Uses `data_dir` if given, the platform's per-user data directory
    /// otherwise.
    pub fn resolve(data_dir: Option<PathBuf>) -> Result<Self> {
        match data_dir {
            Some(data_dir) => Ok(Self::in_dir(data_dir)),
            None => {
                let dirs = ProjectDirs::from("", "", "orientation-logger")
                    .ok_or(anyhow!("no home directory to put app data in"))?;
                Ok(Self::in_dir(dirs.data_dir().to_path_buf()))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn explicit_data_dir_wins() {
        let paths = AppPaths::resolve(Some(PathBuf::from("/tmp/orientation"))).unwrap();
        assert_eq!(paths.database, PathBuf::from("/tmp/orientation/orientation.orl"));
        assert_eq!(paths.csv_export, PathBuf::from("/tmp/orientation/orientation_data.csv"));
    }

    #[test]
    fn defaults_match_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.save_interval, Duration::from_secs(1));
        assert_eq!(config.sampling_rate, SamplingRate::Game);
        assert_eq!(config.axis_remap, (Axis::X, Axis::Z));
        assert_eq!(config.on_store_error, StoreErrorPolicy::LogAndContinue);
    }
}
