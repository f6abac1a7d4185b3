// file: src/download/mod.rs
// description: shared download options, output naming and concurrent station runs
// reference: https://docs.rs/futures

pub mod cdec;
pub mod fetcher;
pub mod noaa;
pub mod progress;

pub use cdec::cdec_download;
pub use fetcher::{Fetcher, HttpFetcher};
pub use noaa::noaa_download;
pub use progress::{DownloadProgress, DownloadStats};

use crate::error::{DatastoreError, Result};
use crate::models::StationRequest;
use crate::repository::patterns::DIGIT_GROUPS;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub dest: PathBuf,
    pub start: NaiveDateTime,
    /// Open ended when absent: requests run to now and files end in 9999.
    pub end: Option<NaiveDateTime>,
    pub overwrite: bool,
    pub workers: usize,
    pub show_progress: bool,
    pub colored: bool,
}

impl DownloadOptions {
    pub fn new(dest: impl Into<PathBuf>, start: NaiveDateTime) -> Self {
        Self {
            dest: dest.into(),
            start,
            end: None,
            overwrite: false,
            workers: 1,
            show_progress: false,
            colored: false,
        }
    }

    pub fn end_or_now(&self) -> NaiveDateTime {
        self.end.unwrap_or_else(|| Local::now().naive_local())
    }

    /// Path a station's download is written to.
    pub fn output_path(&self, source: &str, request: &StationRequest) -> PathBuf {
        self.dest.join(output_filename(
            source,
            request,
            self.start.year(),
            self.end.map(|e| e.year()),
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadSummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    /// (station_id, param) pairs that produced no file.
    pub failures: Vec<(String, String)>,
}

/// Result of one station request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Written(PathBuf),
    Skipped(PathBuf),
    Failed(String),
}

/// A 4-digit year is the first (or, for `is_end`, last) minute of that
/// year. Anything else is read as digit groups y, m, d[, H, M, S].
pub fn assure_datetime(text: &str, is_end: bool) -> Result<NaiveDateTime> {
    let text = text.trim();
    let invalid = || DatastoreError::Validation(format!("Could not interpret date '{}'", text));

    if text.len() == 4 && text.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = text.parse().map_err(|_| invalid())?;
        let (month, day, hour, minute) = if is_end { (12, 31, 23, 59) } else { (1, 1, 0, 0) };
        return NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .ok_or_else(invalid);
    }

    let groups: Vec<u32> = DIGIT_GROUPS
        .find_iter(text)
        .map(|m| m.as_str().parse::<u32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| invalid())?;
    if groups.len() < 3 || groups.len() > 6 {
        return Err(invalid());
    }
    let part = |i: usize| groups.get(i).copied().unwrap_or(0);

    NaiveDate::from_ymd_opt(groups[0] as i32, groups[1], groups[2])
        .and_then(|d| d.and_hms_opt(part(3), part(4), part(5)))
        .ok_or_else(invalid)
}

/// `<source>_<station>[@subloc]_<agency_id>_<param>_<syear>_<eyear|9999>.csv`
pub fn output_filename(
    source: &str,
    request: &StationRequest,
    start_year: i32,
    end_year: Option<i32>,
) -> String {
    let station = if request.is_default_subloc() {
        request.station_id.clone()
    } else {
        format!("{}@{}", request.station_id, request.subloc)
    };
    let end_label = end_year.map_or_else(|| "9999".to_string(), |y| y.to_string());
    format!(
        "{}_{}_{}_{}_{}_{}.csv",
        source, station, request.agency_id, request.param, start_year, end_label
    )
    .to_lowercase()
}

pub(crate) fn prepare_dest(dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).map_err(|e| DatastoreError::file(dest, e))
}

/// Runs `task` for every request, at most `options.workers` at a time, and
/// tallies the outcomes.
pub(crate) async fn run_requests<F, Fut>(
    requests: Vec<StationRequest>,
    options: &DownloadOptions,
    task: F,
) -> DownloadSummary
where
    F: Fn(StationRequest) -> Fut,
    Fut: Future<Output = Result<Outcome>>,
{
    let progress = DownloadProgress::new(requests.len(), options.show_progress, options.colored);
    let progress = &progress;

    let tasks = requests.into_iter().map(|request| {
        let work = task(request.clone());
        async move {
            progress.set_message(format!("{} {}", request.station_id, request.param));
            let outcome = work.await.unwrap_or_else(|e| Outcome::Failed(e.to_string()));
            match &outcome {
                Outcome::Written(_) => progress.inc_written(),
                Outcome::Skipped(_) => progress.inc_skipped(),
                Outcome::Failed(_) => progress.inc_failed(),
            }
            (request, outcome)
        }
    });

    let results: Vec<(StationRequest, Outcome)> = stream::iter(tasks)
        .buffer_unordered(options.workers.max(1))
        .collect()
        .await;
    progress.finish();

    let mut summary = DownloadSummary::default();
    for (request, outcome) in results {
        match outcome {
            Outcome::Written(path) => summary.written.push(path),
            Outcome::Skipped(path) => {
                info!("Skipping existing file {}", path.display());
                summary.skipped.push(path)
            }
            Outcome::Failed(reason) => {
                warn!("No data for {} {}: {}", request.station_id, request.param, reason);
                summary.failures.push((request.station_id, request.param));
            }
        }
    }
    summary.written.sort();
    summary.skipped.sort();
    summary.failures.sort();

    let stats = progress.get_stats();
    info!(
        "Downloads finished: {} written, {} skipped, {} failed ({:.1}% success, {:.1} stations/s)",
        stats.written,
        stats.skipped,
        stats.failed,
        stats.success_rate(),
        stats.items_per_second()
    );
    summary
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Fetcher;
    use crate::error::{DatastoreError, Result};
    use crate::models::StationRequest;
    use std::sync::Mutex;

    /// Answers each request with the first canned reply whose key occurs in
    /// the URL, and records every URL asked for.
    pub struct CannedFetcher {
        pub replies: Vec<(String, String)>,
        pub requested: Mutex<Vec<String>>,
    }

    impl CannedFetcher {
        pub fn new(replies: &[(&str, &str)]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl Fetcher for CannedFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            self.requested.lock().unwrap().push(url.to_string());
            self.replies
                .iter()
                .find(|(key, _)| url.contains(key.as_str()))
                .map(|(_, reply)| reply.clone())
                .ok_or_else(|| DatastoreError::Download(format!("no reply for {}", url)))
        }
    }

    pub fn request(station: &str, agency_id: &str, param: &str, code: &str) -> StationRequest {
        StationRequest {
            station_id: station.to_string(),
            agency_id: agency_id.to_string(),
            subloc: "default".to_string(),
            param: param.to_string(),
            src_var_id: code.to_string(),
            name: Some(format!("{} station", station)),
            cdec_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::request;
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_assure_datetime() {
        assert_eq!(assure_datetime("2020", false).unwrap(), at(2020, 1, 1, 0, 0));
        assert_eq!(assure_datetime("2020", true).unwrap(), at(2020, 12, 31, 23, 59));
        assert_eq!(assure_datetime("2009-03-31", false).unwrap(), at(2009, 3, 31, 0, 0));
        assert_eq!(
            assure_datetime("2009-03-31 14:30", true).unwrap(),
            at(2009, 3, 31, 14, 30)
        );
        assert!(assure_datetime("March", false).is_err());
        assert!(assure_datetime("2009-13-01", false).is_err());
    }

    #[test]
    fn test_output_filename() {
        let mut req = request("MRZ", "9415144", "elev", "water_level");
        assert_eq!(
            output_filename("noaa", &req, 2020, None),
            "noaa_mrz_9415144_elev_2020_9999.csv"
        );
        req.subloc = "Upper".to_string();
        assert_eq!(
            output_filename("cdec", &req, 2019, Some(2021)),
            "cdec_mrz@upper_9415144_elev_2019_2021.csv"
        );
    }

    #[tokio::test]
    async fn test_run_requests_tallies_outcomes() {
        let options = DownloadOptions::new("/tmp/unused", at(2020, 1, 1, 0, 0));
        let requests = vec![
            request("a", "1", "elev", "x"),
            request("b", "2", "elev", "x"),
            request("c", "3", "ec", "x"),
        ];
        let summary = run_requests(requests, &options, |r| async move {
            match r.station_id.as_str() {
                "a" => Ok(Outcome::Written(PathBuf::from("a.csv"))),
                "b" => Ok(Outcome::Skipped(PathBuf::from("b.csv"))),
                _ => Err(DatastoreError::Download("offline".to_string())),
            }
        })
        .await;

        assert_eq!(summary.written, vec![PathBuf::from("a.csv")]);
        assert_eq!(summary.skipped, vec![PathBuf::from("b.csv")]);
        assert_eq!(summary.failures, vec![("c".to_string(), "ec".to_string())]);
    }
}
