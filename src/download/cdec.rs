// file: src/download/cdec.rs
// description: CDEC CSVDataServletPST downloads with duration code fallback
// reference: https://cdec.water.ca.gov/dynamicapp/

use crate::download::fetcher::Fetcher;
use crate::download::{prepare_dest, run_requests, DownloadOptions, DownloadSummary, Outcome};
use crate::error::{DatastoreError, Result};
use crate::models::StationRequest;
use std::fs;
use tracing::{debug, info};
use url::Url;

const SOURCE: &str = "cdec";
const DURATION_CODES: &[&str] = &["E", "H", "D", "M"];
/// CDEC sensor numbers for electrical conductivity.
const EC_SENSORS: &[&str] = &["92", "102"];
const SURFACE_SUBLOCS: &[&str] = &["default", "nan", "upper", "top"];
const BOTTOM_SUBLOCS: &[&str] = &["lower", "bot", "bottom"];

/// EC sensors are listed per sublocation at CDEC, so EC requests for the
/// surface and non-EC requests for the bottom name the wrong sensor.
pub fn is_culled(request: &StationRequest) -> bool {
    let subloc = request.subloc.to_lowercase();
    let is_ec = EC_SENSORS.contains(&request.src_var_id.trim());
    (is_ec && SURFACE_SUBLOCS.contains(&subloc.as_str()))
        || (!is_ec && BOTTOM_SUBLOCS.contains(&subloc.as_str()))
}

/// A usable reply is a titled table or a STATION_ID csv with at least
/// one data row.
pub fn is_acceptable_reply(reply: &str) -> bool {
    (reply.starts_with("Title") && reply.len() > 16)
        || (reply.starts_with("STATION_ID") && reply.len() > 90)
}

fn query_url(
    base_url: &str,
    request: &StationRequest,
    duration: &str,
    options: &DownloadOptions,
) -> Result<String> {
    let station = request
        .cdec_id
        .as_deref()
        .unwrap_or(request.station_id.as_str());
    let start = options.start.format("%m-%d-%Y").to_string();
    let end = options.end_or_now().format("%m-%d-%Y").to_string();

    Url::parse_with_params(
        base_url,
        &[
            ("Stations", station),
            ("SensorNums", request.src_var_id.as_str()),
            ("dur_code", duration),
            ("Start", start.as_str()),
            ("End", end.as_str()),
        ],
    )
    .map(String::from)
    .map_err(|e| DatastoreError::Download(format!("Invalid CDEC url {}: {}", base_url, e)))
}

async fn download_station<F: Fetcher>(
    fetcher: &F,
    base_url: &str,
    request: &StationRequest,
    options: &DownloadOptions,
    durations: &[&str],
) -> Result<Outcome> {
    let path = options.output_path(SOURCE, request);
    if path.exists() && !options.overwrite {
        return Ok(Outcome::Skipped(path));
    }

    info!(
        "Downloading station {} parameter {} sensor code {}",
        request.station_id, request.param, request.src_var_id
    );
    for duration in durations {
        let url = query_url(base_url, request, duration, options)?;
        let reply = match fetcher.fetch_text(&url).await {
            Ok(text) => text.replace('\r', ""),
            Err(e) => {
                debug!("CDEC request failed for {}: {}", request.station_id, e);
                continue;
            }
        };
        if is_acceptable_reply(&reply) {
            fs::write(&path, reply).map_err(|e| DatastoreError::file(&path, e))?;
            debug!("Found {} with duration code {}", request.station_id, duration);
            return Ok(Outcome::Written(path));
        }
    }

    Ok(Outcome::Failed(format!(
        "no data for duration codes {:?}, sensor code {}",
        durations, request.src_var_id
    )))
}

/// Downloads every request that survives sublocation culling. `freq`
/// forces a single duration code instead of trying E, H, D then M.
pub async fn cdec_download<F: Fetcher>(
    fetcher: &F,
    base_url: &str,
    requests: Vec<StationRequest>,
    options: &DownloadOptions,
    freq: Option<&str>,
) -> Result<DownloadSummary> {
    prepare_dest(&options.dest)?;

    let durations: Vec<&str> = match freq {
        Some(code) => vec![code],
        None => DURATION_CODES.to_vec(),
    };
    let durations = durations.as_slice();

    let (culled, requests): (Vec<_>, Vec<_>) = requests.into_iter().partition(is_culled);
    for request in &culled {
        debug!(
            "Culling {} sensor {} at sublocation {}",
            request.station_id, request.src_var_id, request.subloc
        );
    }

    Ok(run_requests(requests, options, |request| async move {
        download_station(fetcher, base_url, &request, options, durations).await
    })
    .await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::testing::{request, CannedFetcher};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const BASE: &str = "http://cdec.example.gov/dynamicapp/req/CSVDataServletPST";

    const HOURLY: &str = "STATION_ID,DURATION,SENSOR_NUMBER,SENSOR_TYPE,DATE TIME,OBS DATE,VALUE,DATA_FLAG,UNITS\r\n\
MRZ,H,1,RIV STG,20200101 0000,20200101 0000,4.51, ,FEET\r\n";

    fn options(dir: &std::path::Path) -> DownloadOptions {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut options = DownloadOptions::new(dir, start);
        options.end = Some(start + chrono::Duration::days(31));
        options
    }

    #[test]
    fn test_culling() {
        let mut ec = request("anh", "anh", "ec", "92");
        assert!(is_culled(&ec));
        ec.subloc = "bottom".to_string();
        assert!(!is_culled(&ec));

        let mut stage = request("anh", "anh", "elev", "1");
        assert!(!is_culled(&stage));
        stage.subloc = "lower".to_string();
        assert!(is_culled(&stage));
    }

    #[test]
    fn test_acceptable_reply() {
        assert!(is_acceptable_reply(HOURLY));
        assert!(is_acceptable_reply("Title: some station data"));
        assert!(!is_acceptable_reply("Title"));
        assert!(!is_acceptable_reply("STATION_ID,DURATION\n"));
        assert!(!is_acceptable_reply("<html>error</html>"));
    }

    #[tokio::test]
    async fn test_falls_through_duration_codes() {
        let temp = TempDir::new().unwrap();
        let fetcher = CannedFetcher::new(&[("dur_code=E", "STATION_ID\n"), ("dur_code=H", HOURLY)]);
        let mut req = request("mrz", "mrz", "elev", "1");
        req.cdec_id = Some("mrz2".to_string());

        let summary = cdec_download(&fetcher, BASE, vec![req], &options(temp.path()), None)
            .await
            .unwrap();

        let path = temp.path().join("cdec_mrz_mrz_elev_2020_2020.csv");
        assert_eq!(summary.written, vec![path.clone()]);
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, HOURLY.replace('\r', ""));

        let urls = fetcher.requested();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("Stations=mrz2&SensorNums=1&dur_code=E&Start=01-01-2020&End=02-01-2020"));
    }

    #[tokio::test]
    async fn test_forced_code_and_failures() {
        let temp = TempDir::new().unwrap();
        let fetcher = CannedFetcher::new(&[("dur_code=H", HOURLY)]);
        let requests = vec![
            request("mrz", "mrz", "elev", "1"),
            request("anh", "anh", "ec", "92"),
        ];

        let summary = cdec_download(&fetcher, BASE, requests, &options(temp.path()), Some("D"))
            .await
            .unwrap();

        assert!(summary.written.is_empty());
        assert_eq!(summary.failures, vec![("mrz".to_string(), "elev".to_string())]);
        assert_eq!(fetcher.requested().len(), 1);
    }
}
