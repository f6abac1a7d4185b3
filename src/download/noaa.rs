// file: src/download/noaa.rs
// description: NOAA CO-OPS datagetter downloads, requested month by month
// reference: https://api.tidesandcurrents.noaa.gov/api/prod/

use crate::download::fetcher::Fetcher;
use crate::download::{prepare_dest, run_requests, DownloadOptions, DownloadSummary, Outcome};
use crate::error::{DatastoreError, Result};
use crate::models::StationRequest;
use crate::store::{yaml_header_block, Metadata};
use chrono::{Datelike, NaiveDate};
use std::fs;
use tracing::{debug, warn};
use url::Url;

const SOURCE: &str = "noaa";
const SOURCE_URL: &str = "http://tidesandcurrents.noaa.gov/";
const FAULTY_MARKER: &str = "Please make sure";
const MIN_REPLY_CHARS: usize = 300;

struct Product {
    unit: &'static str,
    param: &'static str,
    has_datum: bool,
    application: &'static str,
}

fn product(name: &str) -> Result<Product> {
    let (unit, param, has_datum, application) = match name {
        "water_level" => ("meters", "elev", true, "NOS.COOPS.TAC.WL"),
        "predictions" => ("meters", "predictions", true, "NOS.COOPS.TAC.WL"),
        "water_temperature" => ("Celcius", "temp", false, "NOS.COOPS.TAC.PHYSOCEAN"),
        "conductivity" => ("microS/cm", "ec", false, "NOS.COOPS.TAC.PHYSOCEAN"),
        other => {
            return Err(DatastoreError::Download(format!(
                "Product not supported by NOAA downloader: {}",
                other
            )));
        }
    };
    Ok(Product {
        unit,
        param,
        has_datum,
        application,
    })
}

fn header_metadata(request: &StationRequest, product: &Product, datum: &str) -> Metadata {
    let mut meta: Metadata = vec![
        ("agency".to_string(), SOURCE.to_string()),
        ("unit".to_string(), product.unit.to_string()),
    ];
    if product.has_datum {
        meta.push(("datum".to_string(), datum.to_string()));
    }
    meta.extend([
        ("station_id".to_string(), request.agency_id.clone()),
        (
            "station_name".to_string(),
            request.name.clone().unwrap_or_else(|| request.station_id.clone()),
        ),
        ("param".to_string(), product.param.to_string()),
        ("timezone".to_string(), "LST".to_string()),
        ("source".to_string(), SOURCE_URL.to_string()),
    ]);
    meta
}

/// First and last day of each calendar month overlapping `[start, end]`,
/// clipped to the range.
pub fn month_chunks(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut chunks = Vec::new();
    let mut first = start;
    while first <= end {
        let (next_year, next_month) = if first.month() == 12 {
            (first.year() + 1, 1)
        } else {
            (first.year(), first.month() + 1)
        };
        let Some(next) = NaiveDate::from_ymd_opt(next_year, next_month, 1) else {
            break;
        };
        let last = next.pred_opt().unwrap_or(next).min(end);
        chunks.push((first, last));
        first = next;
    }
    chunks
}

fn chunk_url(
    base_url: &str,
    request: &StationRequest,
    product: &Product,
    (begin, end): (NaiveDate, NaiveDate),
    datum: Option<&str>,
) -> Result<String> {
    let begin = begin.format("%Y%m%d").to_string();
    let end = end.format("%Y%m%d").to_string();
    let mut params = vec![
        ("product", request.src_var_id.as_str()),
        ("application", product.application),
        ("begin_date", begin.as_str()),
        ("end_date", end.as_str()),
        ("station", request.agency_id.as_str()),
        ("time_zone", "LST"),
        ("units", "metric"),
    ];
    if let Some(datum) = datum {
        params.push(("datum", datum));
    }
    params.push(("format", "csv"));

    Url::parse_with_params(base_url, &params)
        .map(String::from)
        .map_err(|e| DatastoreError::Download(format!("Invalid NOAA url {}: {}", base_url, e)))
}

fn is_faulty(reply: &str) -> bool {
    reply.contains(FAULTY_MARKER) || reply.len() < MIN_REPLY_CHARS
}

/// Data portion of a reply: anything from an `Error` message on is cut, and
/// the column header line is dropped for every chunk after the first.
fn table_text(reply: &str, keep_header: bool) -> String {
    let reply = reply.split("Error").next().unwrap_or(reply);
    let body = if keep_header {
        reply
    } else {
        reply.split_once('\n').map_or("", |(_, rest)| rest)
    };
    let mut body = body.replace('\r', "");
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    body
}

async fn download_station<F: Fetcher>(
    fetcher: &F,
    base_url: &str,
    request: &StationRequest,
    options: &DownloadOptions,
) -> Result<Outcome> {
    let path = options.output_path(SOURCE, request);
    if path.exists() && !options.overwrite {
        return Ok(Outcome::Skipped(path));
    }

    let product = product(&request.src_var_id)?;
    let end = options.end_or_now().date();
    let mut content = String::new();
    let mut wrote_header = false;

    for chunk in month_chunks(options.start.date(), end) {
        let mut datum = product.has_datum.then_some("NAVD");
        let url = chunk_url(base_url, request, &product, chunk, datum)?;
        let mut reply = match fetcher.fetch_text(&url).await {
            Ok(text) => text,
            Err(e) => {
                warn!("NOAA request failed for {}: {}", request.station_id, e);
                String::new()
            }
        };

        if reply.trim().is_empty() {
            datum = product.has_datum.then_some("STND");
            let url = chunk_url(base_url, request, &product, chunk, datum)?;
            debug!("Retrying {} with datum STND", request.station_id);
            reply = fetcher.fetch_text(&url).await.unwrap_or_default();
        }

        if is_faulty(&reply) {
            debug!(
                "Skipping {} chunk starting {}: no usable data",
                request.station_id, chunk.0
            );
            continue;
        }

        if !wrote_header {
            let meta = header_metadata(request, &product, datum.unwrap_or("NAVD"));
            content.push_str(&yaml_header_block(&meta)?);
        }
        content.push_str(&table_text(&reply, !wrote_header));
        wrote_header = true;
    }

    if !wrote_header {
        return Ok(Outcome::Failed("no data returned".to_string()));
    }
    fs::write(&path, content).map_err(|e| DatastoreError::file(&path, e))?;
    Ok(Outcome::Written(path))
}

/// Downloads every request from the CO-OPS datagetter at `base_url`.
pub async fn noaa_download<F: Fetcher>(
    fetcher: &F,
    base_url: &str,
    requests: Vec<StationRequest>,
    options: &DownloadOptions,
) -> Result<DownloadSummary> {
    prepare_dest(&options.dest)?;
    Ok(run_requests(requests, options, |request| async move {
        download_station(fetcher, base_url, &request, options).await
    })
    .await)
}
