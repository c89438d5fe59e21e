use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::{Error, Result};

/// Hours before the forecast date searched for a previous run's final flows, nearest first.
pub const LOOKBACK_HOURS: [i64; 3] = [24, 48, 72];

const QINIT_DATE_FORMAT: &str = "%Y%m%d%H";
const SEASONAL_PATTERN: &str = "seasonal_qinit*.nc";

/// Where a RAPID run takes its initial flows from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum QinitSource {
    /// Initialization was switched off for this job.
    Disabled,
    /// Final flows of a run from the last three days.
    Previous(PathBuf),
    /// Climatological fallback when no recent run exists.
    SeasonalAverage(PathBuf),
    /// Nothing usable was found. The run starts cold.
    NotFound,
}

impl QinitSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            QinitSource::Previous(path) | QinitSource::SeasonalAverage(path) => Some(path),
            QinitSource::Disabled | QinitSource::NotFound => None,
        }
    }

    pub fn is_warm_start(&self) -> bool {
        self.path().is_some()
    }
}

/// Time stepping of one ensemble member's simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForecastChronometry {
    pub interval_hours: u32,
    pub duration_hours: u32,
}

impl ForecastChronometry {
    /// The high-resolution member runs hourly over ten days, the perturbed members every
    /// three hours over fifteen days.
    pub fn for_member(member: u32, high_res_member: u32) -> Self {
        if member == high_res_member {
            ForecastChronometry { interval_hours: 1, duration_hours: 240 }
        } else {
            ForecastChronometry { interval_hours: 3, duration_hours: 360 }
        }
    }

    pub fn time_steps(&self) -> u32 {
        self.duration_hours / self.interval_hours
    }
}

/// Parses a forecast date of the form `YYYYMMDDHH`, ignoring anything after the hour.
pub fn parse_forecast_date(date: &str) -> Result<NaiveDateTime> {
    let invalid = || Error::config("date", format!("'{}' is not a forecast date of the form YYYYMMDDHH", date));

    let day = date.get(..8).ok_or_else(invalid)?;
    let hour = date.get(8..10).ok_or_else(invalid)?;

    let day = NaiveDate::parse_from_str(day, "%Y%m%d").map_err(|_| invalid())?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    day.and_hms_opt(hour, 0, 0).ok_or_else(invalid)
}

/// Picks the initial flow file for a run in `input_dir` starting at `date`.
///
/// Tries `Qinit_{date - 24h|48h|72h}.nc` in that order, then the first `seasonal_qinit*.nc`
/// by name. The date is only parsed when initialization is enabled.
pub fn resolve_qinit(input_dir: &Path, date: &str, initialize: bool) -> Result<QinitSource> {
    if !initialize {
        return Ok(QinitSource::Disabled);
    }

    let start = parse_forecast_date(date)?;
    for hours in LOOKBACK_HOURS {
        let previous = start - Duration::hours(hours);
        let candidate = input_dir.join(format!("Qinit_{}.nc", previous.format(QINIT_DATE_FORMAT)));
        if candidate.is_file() {
            log::debug!("Using previous flows '{}'.", candidate.display());
            return Ok(QinitSource::Previous(candidate));
        }
    }

    log::info!("No Qinit file from the last {} hours in '{}'. Trying seasonal averages.", LOOKBACK_HOURS[2], input_dir.display());
    let pattern = format!("{}/{}", glob::Pattern::escape(&input_dir.to_string_lossy()), SEASONAL_PATTERN);
    let mut seasonal = Vec::new();
    for entry in glob::glob(&pattern)? {
        seasonal.push(entry?);
    }
    seasonal.sort();

    match seasonal.into_iter().next() {
        Some(path) => Ok(QinitSource::SeasonalAverage(path)),
        None => {
            log::warn!("No initial flows found in '{}'. Not initializing.", input_dir.display());
            Ok(QinitSource::NotFound)
        }
    }
}
