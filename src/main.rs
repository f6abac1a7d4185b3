// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use dstore::download::{assure_datetime, cdec_download, noaa_download};
use dstore::repository::{repo_data_inventory, repo_inventory, write_inventory_csv};
use dstore::stations::{process_station_list, stationfile_or_stations, StationListOptions};
use dstore::utils::logging::{format_error, format_info, format_success, format_warning};
use dstore::{
    cache, read_ts, Config, DataCache, DownloadOptions, DownloadSummary, HttpFetcher,
    JsonExporter, ManageOptions, ReadOptions, SearchIndex, StationDatabase, StationRequest,
    Validator, VariableMappings,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "dstore")]
#[command(version = "0.1.0")]
#[command(about = "Download, read, cache and inventory continuous station time series", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the station database by id, name, agency or agency id
    StationInfo {
        phrase: Option<String>,
    },

    /// Inventory a repository directory
    Inventory {
        dir: PathBuf,

        /// One row per series instead of per file pattern
        #[arg(long)]
        by_data: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the inventory as json into this directory
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,
    },

    /// Read files matching a pattern and print them as one series
    Read {
        pattern: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        /// Restrict readers to those whose name contains this text
        #[arg(long)]
        hint: Option<String>,

        #[arg(long)]
        no_regular: bool,

        #[arg(long)]
        nrows: Option<usize>,
    },

    /// Download raw data from an agency
    #[command(subcommand)]
    Download(DownloadCommands),

    /// Maintain the local data cache
    Cache {
        #[arg(long)]
        clear: bool,

        #[arg(long)]
        delete: bool,

        #[arg(long, value_name = "DIR")]
        to_csv: Option<PathBuf>,

        #[arg(long, value_name = "FILE")]
        from_csv: Option<PathBuf>,

        #[arg(long, value_name = "N")]
        float_precision: Option<usize>,
    },

    /// Inspect a documentation search index
    #[command(subcommand)]
    SearchIndex(SearchIndexCommands),
}

#[derive(Subcommand)]
enum DownloadCommands {
    /// NOAA CO-OPS tides and currents
    Noaa(DownloadArgs),

    /// California Data Exchange Center
    Cdec {
        #[command(flatten)]
        args: DownloadArgs,

        /// Force one duration code (E, H, D or M)
        #[arg(long)]
        freq: Option<String>,
    },
}

#[derive(Args)]
struct DownloadArgs {
    #[arg(long, num_args = 1..)]
    stations: Vec<String>,

    /// Csv station list; mutually exclusive with --stations
    #[arg(long = "stationfile", num_args = 1..)]
    stationfiles: Vec<PathBuf>,

    #[arg(long)]
    param: Option<String>,

    #[arg(long)]
    start: String,

    #[arg(long)]
    end: Option<String>,

    #[arg(long)]
    dest: PathBuf,

    #[arg(long)]
    overwrite: bool,
}

#[derive(Subcommand)]
enum SearchIndexCommands {
    /// Check a searchindex.js for dangling document references
    Validate { file: PathBuf },

    /// Rank documents for the given terms
    Query {
        file: PathBuf,

        terms: Vec<String>,

        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    colored::control::set_override(cli.color);
    dstore::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::default_config()
    };

    match cli.command {
        Commands::StationInfo { phrase } => {
            cmd_station_info(&config, phrase.as_deref())?;
        }
        Commands::Inventory {
            dir,
            by_data,
            output,
            export_dir,
        } => {
            cmd_inventory(&config, &dir, by_data, output, export_dir)?;
        }
        Commands::Read {
            pattern,
            start,
            end,
            hint,
            no_regular,
            nrows,
        } => {
            cmd_read(&config, &pattern, start, end, hint, no_regular, nrows)?;
        }
        Commands::Download(DownloadCommands::Noaa(args)) => {
            cmd_download(&config, "noaa", args, None, cli.color).await?;
        }
        Commands::Download(DownloadCommands::Cdec { args, freq }) => {
            cmd_download(&config, "cdec", args, freq, cli.color).await?;
        }
        Commands::Cache {
            clear,
            delete,
            to_csv,
            from_csv,
            float_precision,
        } => {
            let options = ManageOptions {
                clear,
                delete,
                to_csv,
                from_csv,
                float_precision,
            };
            cmd_cache(&config, &options)?;
        }
        Commands::SearchIndex(SearchIndexCommands::Validate { file }) => {
            cmd_search_index_validate(&file)?;
        }
        Commands::SearchIndex(SearchIndexCommands::Query {
            file,
            terms,
            export_dir,
        }) => {
            cmd_search_index_query(&file, &terms.join(" "), export_dir)?;
        }
    }

    Ok(())
}

fn load_stations(config: &Config) -> Option<StationDatabase> {
    let loaded = config
        .config_file("station_dbase")
        .and_then(|path| StationDatabase::load(&path));
    match loaded {
        Ok(db) => Some(db),
        Err(e) => {
            warn!("Station database unavailable: {}", e);
            None
        }
    }
}

fn cmd_station_info(config: &Config, phrase: Option<&str>) -> Result<()> {
    let path = config.config_file("station_dbase")?;
    let db = StationDatabase::load(&path).context("Failed to load station database")?;

    let matches = db.search(phrase.unwrap_or(""));
    if matches.is_empty() {
        println!("{}", format_warning("No stations matched"));
        return Ok(());
    }

    println!("{}", format_info(&format!("{} of {} stations matched", matches.len(), db.len())));
    println!("{:<10} {:<8} {:<14} {:>10} {:>11}  name", "id", "agency", "agency_id", "lat", "lon");
    for station in matches {
        let coord = |v: Option<f64>| v.map(|x| format!("{:.5}", x)).unwrap_or_default();
        println!(
            "{:<10} {:<8} {:<14} {:>10} {:>11}  {}",
            station.id,
            station.agency,
            station.agency_id,
            coord(station.lat),
            coord(station.lon),
            station.name
        );
    }
    Ok(())
}

fn cmd_inventory(
    config: &Config,
    dir: &Path,
    by_data: bool,
    output: Option<PathBuf>,
    export_dir: Option<PathBuf>,
) -> Result<()> {
    Validator::validate_directory(dir)?;
    let stations = load_stations(config);

    let entries = if by_data {
        repo_data_inventory(dir, stations.as_ref())?
    } else {
        repo_inventory(dir, stations.as_ref())?
    };

    match &output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_inventory_csv(&entries, BufWriter::new(file))?;
            println!("{}", format_success(&format!("Wrote {} entries to {}", entries.len(), path.display())));
        }
        None => write_inventory_csv(&entries, io::stdout().lock())?,
    }

    if let Some(export_dir) = export_dir {
        let name = if by_data { "data_inventory" } else { "file_inventory" };
        JsonExporter::new(export_dir, true)?.export_inventory(&entries, name)?;
    }
    Ok(())
}

fn cmd_read(
    config: &Config,
    pattern: &str,
    start: Option<String>,
    end: Option<String>,
    hint: Option<String>,
    no_regular: bool,
    nrows: Option<usize>,
) -> Result<()> {
    let mut options = ReadOptions::from_config(&config.reader)?;
    options.start = start.map(|s| assure_datetime(&s, false)).transpose()?;
    options.end = end.map(|s| assure_datetime(&s, true)).transpose()?;
    options.hint = hint;
    options.force_regular = !no_regular;
    options.nrows = nrows;

    let series = read_ts(pattern, &options)?;
    info!("Read {} rows from {}", series.len(), pattern);

    let mut out = BufWriter::new(io::stdout().lock());
    dstore::write_ts_csv(&series, &mut out, &[], None)?;
    out.flush()?;
    Ok(())
}

fn station_requests(config: &Config, source: &str, args: &DownloadArgs) -> Result<Vec<StationRequest>> {
    let input = stationfile_or_stations(&args.stationfiles, &args.stations)?;
    let stations = load_stations(config);
    let variables = config
        .config_file("variable_mappings")
        .and_then(|path| VariableMappings::load(&path))
        .map_err(|e| warn!("Variable mappings unavailable: {}", e))
        .ok();

    let mut options = StationListOptions::new(source);
    options.param = args.param.as_deref();
    options.stations = stations.as_ref();
    options.variables = variables.as_ref();

    Ok(process_station_list(&input, &options)?)
}

async fn cmd_download(
    config: &Config,
    source: &str,
    args: DownloadArgs,
    freq: Option<String>,
    color: bool,
) -> Result<()> {
    let requests = station_requests(config, source, &args)?;
    info!("Downloading {} station requests from {}", requests.len(), source);

    let start = assure_datetime(&args.start, false)?;
    let end = args.end.as_deref().map(|e| assure_datetime(e, true)).transpose()?;
    Validator::validate_date_range(start, end)?;

    let mut options = DownloadOptions::new(&args.dest, start);
    options.end = end;
    options.overwrite = args.overwrite;
    options.workers = config.download.parallel_workers;
    options.show_progress = true;
    options.colored = color;

    let fetcher = HttpFetcher::new(&config.download)?;
    let summary = match source {
        "noaa" => {
            Validator::validate_url(&config.download.noaa_base_url)?;
            noaa_download(&fetcher, &config.download.noaa_base_url, requests, &options).await?
        }
        _ => {
            Validator::validate_url(&config.download.cdec_base_url)?;
            cdec_download(
                &fetcher,
                &config.download.cdec_base_url,
                requests,
                &options,
                freq.as_deref(),
            )
            .await?
        }
    };

    report_download(&summary);
    Ok(())
}

fn report_download(summary: &DownloadSummary) {
    println!(
        "{}",
        format_success(&format!(
            "{} written, {} skipped",
            summary.written.len(),
            summary.skipped.len()
        ))
    );
    if !summary.failures.is_empty() {
        println!("{}", format_error(&format!("{} failed:", summary.failures.len())));
        for (station, param) in &summary.failures {
            println!("  {} {}", station, param);
        }
    }
}

fn cmd_cache(config: &Config, options: &ManageOptions) -> Result<()> {
    options.validate()?;
    if let Some(precision) = options.float_precision {
        Validator::validate_float_precision(precision)?;
    }

    let data_cache = DataCache::open(&config.cache.directory, config.cache.size_limit_bytes)
        .context("Failed to open cache")?;
    info!("Cache at {} holds {} entries", data_cache.dir().display(), data_cache.len()?);

    cache::manage(data_cache, options)?;
    println!("{}", format_success("Cache maintenance complete"));
    Ok(())
}

fn cmd_search_index_validate(file: &Path) -> Result<()> {
    Validator::validate_file_path(file)?;
    let index = SearchIndex::load(file)?;
    let report = index.validate();

    println!("{} documents, {} terms", report.documents, report.terms);
    if report.is_well_formed() {
        println!("{}", format_success("Index is well formed"));
        return Ok(());
    }

    for violation in &report.violations {
        println!("{}", format_error(&violation.to_string()));
    }
    Err(anyhow::anyhow!(
        "{} violations in {}",
        report.violations.len(),
        file.display()
    ))
}

fn cmd_search_index_query(file: &Path, query: &str, export_dir: Option<PathBuf>) -> Result<()> {
    let index = SearchIndex::load(file)?;
    let hits = index.search(query);

    if hits.is_empty() {
        println!("\nNo results found for query: \"{}\"\n", query);
        return Ok(());
    }

    println!("\nSearch Results for: \"{}\"\n", query);
    println!("{}", "=".repeat(80));
    for (idx, hit) in hits.iter().enumerate() {
        println!("{}. {} (Score: {})", idx + 1, hit.title, hit.score);
        println!("   {}", hit.filename);
    }
    println!("{}", "=".repeat(80));

    if let Some(export_dir) = export_dir {
        JsonExporter::new(export_dir, true)?.export_search_hits(&hits, "search_hits")?;
    }
    Ok(())
}
