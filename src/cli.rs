//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::{CsvPriceAdapter, CsvTableAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::pacer::{pacer_for, NoDelayPacer};
use crate::adapters::xlsx_adapter::{is_xlsx, SpreadsheetAdapter};
use crate::domain::batch::{spawn_batch, BatchProgress, BatchRequest, BatchResult, SymbolOutcome};
use crate::domain::error::AggregatorError;
use crate::domain::index_catalog::{constituents_file_name, find_index, IndexInfo, INDICES};
use crate::domain::settings::{parse_date, validate_range, Settings, SourceKind};
use crate::domain::symbols::{fetch_constituents, parse_symbols};
use crate::ports::constituent_port::ConstituentPort;
use crate::ports::pacer_port::Pacer;
use crate::ports::price_port::PriceHistoryPort;
use crate::ports::table_port::TablePort;

#[derive(Parser, Debug)]
#[command(
    name = "symbol-aggregator",
    about = "Index constituent lists and per-symbol financial metrics"
)]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List supported indices
    Indices,
    /// Scrape an index's constituent list
    Constituents {
        /// Index name or menu number
        #[arg(short, long)]
        index: String,
        /// Save to "{Index_Name}_constituents.csv" instead of printing
        #[arg(long)]
        save: bool,
        /// Output path (implies --save)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute metrics for a comma-separated list of symbols
    Lookup {
        #[arg(short, long)]
        symbols: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        benchmark: Option<String>,
    },
    /// Enrich a symbol table (CSV or xlsx) with metrics
    Upload {
        #[arg(short, long)]
        input: PathBuf,
        /// Defaults to "{input}_metrics" with the input's extension
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Workbook sheet for xlsx files (first sheet if omitted)
        #[arg(long)]
        sheet: Option<String>,
        /// Column holding the symbols
        #[arg(long)]
        column: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        benchmark: Option<String>,
    },
    /// Interactive menu over stdin
    Menu,
    /// Start the web server
    Serve,
}

/// Ports wired from configuration.
pub struct Services {
    pub prices: Arc<dyn PriceHistoryPort + Send + Sync>,
    pub pacer: Arc<dyn Pacer + Send + Sync>,
    pub constituents: Option<Arc<dyn ConstituentPort + Send + Sync>>,
    pub tables: SpreadsheetAdapter,
}

impl Services {
    pub fn constituent_source(&self) -> Result<&dyn ConstituentPort, AggregatorError> {
        match &self.constituents {
            Some(source) => Ok(source.as_ref()),
            None => Err(AggregatorError::ConfigInvalid {
                section: "source".to_string(),
                key: "provider".to_string(),
                reason: "index scraping requires the http feature".to_string(),
            }),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    if let Command::Indices = cli.command {
        for (i, index) in INDICES.iter().enumerate() {
            println!("{}. {}", i + 1, index.name);
        }
        return ExitCode::SUCCESS;
    }

    let services = match build_services(&settings) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let result = match cli.command {
        Command::Indices => Ok(()),
        Command::Constituents {
            index,
            save,
            output,
        } => run_constituents(&services, &index, save, output),
        Command::Lookup {
            symbols,
            start,
            end,
            benchmark,
        } => run_lookup(&services, &settings, &symbols, start, end, benchmark),
        Command::Upload {
            input,
            output,
            sheet,
            column,
            start,
            end,
            benchmark,
        } => {
            let job = UploadJob {
                input,
                output,
                sheet,
                column: column.unwrap_or_else(|| settings.batch.symbol_column.clone()),
                start: start.unwrap_or(settings.batch.start_date),
                end: end.unwrap_or(settings.batch.end_date),
                benchmark: benchmark.unwrap_or_else(|| settings.batch.benchmark.clone()),
            };
            run_upload(&services, &settings, &job)
                .map(|path| println!("Updated file saved to {}", path.display()))
        }
        Command::Menu => {
            let stdin = io::stdin();
            run_menu(&services, &settings, stdin.lock(), &mut io::stdout())
        }
        Command::Serve => return run_serve(services, settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn fail(e: AggregatorError) -> ExitCode {
    tracing::error!("{e}");
    (&e).into()
}

pub fn load_settings(path: Option<&Path>) -> Result<Settings, AggregatorError> {
    match path {
        Some(path) => {
            tracing::info!("Loading config from {}", path.display());
            let adapter = FileConfigAdapter::from_file(path)?;
            Settings::from_config(&adapter)
        }
        None => Ok(Settings::default()),
    }
}

pub fn build_services(settings: &Settings) -> Result<Services, AggregatorError> {
    let pacer: Arc<dyn Pacer + Send + Sync> = match settings.source.provider {
        SourceKind::Csv => Arc::new(NoDelayPacer),
        SourceKind::Yahoo => Arc::from(pacer_for(&settings.pacing)),
    };

    let prices: Arc<dyn PriceHistoryPort + Send + Sync> = match settings.source.provider {
        SourceKind::Csv => Arc::new(CsvPriceAdapter::new(PathBuf::from(
            &settings.source.data_dir,
        ))),
        #[cfg(feature = "http")]
        SourceKind::Yahoo => Arc::new(crate::adapters::yahoo_adapter::YahooAdapter::new(
            &settings.source,
        )?),
        #[cfg(not(feature = "http"))]
        SourceKind::Yahoo => {
            return Err(AggregatorError::ConfigInvalid {
                section: "source".to_string(),
                key: "provider".to_string(),
                reason: "the yahoo provider requires the http feature".to_string(),
            })
        }
    };

    #[cfg(feature = "http")]
    let constituents: Option<Arc<dyn ConstituentPort + Send + Sync>> = Some(Arc::new(
        crate::adapters::wikipedia_adapter::WikipediaAdapter::new(&settings.source)?,
    ));
    #[cfg(not(feature = "http"))]
    let constituents: Option<Arc<dyn ConstituentPort + Send + Sync>> = None;

    Ok(Services {
        prices,
        pacer,
        constituents,
        tables: SpreadsheetAdapter::default(),
    })
}

fn report_progress(event: &BatchProgress) {
    match event {
        BatchProgress::Started { total } => tracing::info!("processing {total} symbols"),
        BatchProgress::Symbol {
            position,
            total,
            symbol,
            outcome,
        } => match outcome {
            Ok(()) => tracing::info!("[{position}/{total}] {symbol} done"),
            Err(reason) => tracing::warn!("[{position}/{total}] {symbol} skipped: {}", reason.describe()),
        },
        BatchProgress::Finished {
            succeeded,
            failed,
            cancelled,
        } => tracing::info!(succeeded, failed, cancelled, "batch finished"),
    }
}

/// Runs a batch on a worker thread, logging progress as it arrives.
pub fn run_batch(
    services: &Services,
    settings: &Settings,
    request: BatchRequest,
) -> Result<BatchResult, AggregatorError> {
    request.validate()?;
    let handle = spawn_batch(
        Arc::clone(&services.prices),
        Arc::clone(&services.pacer),
        settings.metrics.clone(),
        settings.pacing.clone(),
        request,
    );
    for event in handle.progress.iter() {
        report_progress(&event);
    }
    handle.join()
}

fn run_constituents(
    services: &Services,
    choice: &str,
    save: bool,
    output: Option<PathBuf>,
) -> Result<(), AggregatorError> {
    let index = find_index(choice)?;
    let table = fetch_constituents(services.constituent_source()?, index)?;

    if save || output.is_some() {
        let path = output.unwrap_or_else(|| PathBuf::from(constituents_file_name(index)));
        services.tables.write_table(&path, &table)?;
        println!("Data saved to {}", path.display());
    } else {
        print!("{}", CsvTableAdapter::render(&table)?);
    }
    Ok(())
}

/// `key: value` lines for each computed symbol, in input order.
pub fn format_lookup(result: &BatchResult) -> String {
    let mut out = String::new();
    for (symbol, outcome) in result.entries() {
        if !out.is_empty() {
            out.push('\n');
        }
        match outcome {
            SymbolOutcome::Computed(metrics) => {
                for (key, value) in metrics.fields() {
                    out.push_str(&format!("{}: {}\n", key, value));
                }
            }
            SymbolOutcome::Failed(reason) => {
                out.push_str(&format!("{}: {}\n", symbol, reason.describe()));
            }
        }
    }
    out
}

fn run_lookup(
    services: &Services,
    settings: &Settings,
    symbols: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    benchmark: Option<String>,
) -> Result<(), AggregatorError> {
    let symbols = parse_symbols(symbols).map_err(|e| AggregatorError::invalid_input(e.to_string()))?;
    let request = BatchRequest {
        symbols,
        start: start.unwrap_or(settings.batch.start_date),
        end: end.unwrap_or(settings.batch.end_date),
        benchmark: benchmark.unwrap_or_else(|| settings.batch.benchmark.clone()),
    };
    let result = run_batch(services, settings, request)?;
    print!("{}", format_lookup(&result));
    if result.success_count() == 0 {
        println!("No data to display.");
    }
    Ok(())
}

pub struct UploadJob {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    /// Sheet to read and write when the files are xlsx workbooks.
    pub sheet: Option<String>,
    pub column: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub benchmark: String,
}

/// `data/symbols.xlsx` → `data/symbols_metrics.xlsx`; CSV without an extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "symbols".to_string());
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "csv".to_string());
    input.with_file_name(format!("{}_metrics.{}", stem, ext))
}

/// Reads the symbol table, runs the batch and writes the left-joined result.
/// Returns the output path.
pub fn run_upload(
    services: &Services,
    settings: &Settings,
    job: &UploadJob,
) -> Result<PathBuf, AggregatorError> {
    validate_range(job.start, job.end)?;
    let tables = SpreadsheetAdapter::with_sheet(job.sheet.clone());
    let table = tables.read_table(&job.input)?;
    let symbols = table.unique_values(&job.column)?;
    if symbols.is_empty() {
        return Err(AggregatorError::invalid_input(format!(
            "no symbols in column '{}' of {}",
            job.column,
            job.input.display()
        )));
    }
    tracing::info!(
        input = %job.input.display(),
        symbols = symbols.len(),
        "loaded symbol table"
    );

    let request = BatchRequest {
        symbols,
        start: job.start,
        end: job.end,
        benchmark: job.benchmark.clone(),
    };
    let result = run_batch(services, settings, request)?;
    let merged = table.merge_metrics(&job.column, &result, &settings.metrics.sma_windows)?;

    let output = job
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&job.input));
    tables.write_table(&output, &merged)?;
    Ok(output)
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
) -> Result<Option<String>, AggregatorError> {
    write!(output, "{}", message)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn prompt_date<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: NaiveDate,
) -> Result<Option<NaiveDate>, AggregatorError> {
    let message = format!("Enter {} date (YYYY-MM-DD) [{}]: ", label, default);
    let Some(raw) = prompt(input, output, &message)? else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(Some(default));
    }
    parse_date(&raw)
        .map(Some)
        .ok_or_else(|| AggregatorError::invalid_input(format!("invalid {} date '{}'", label, raw)))
}

/// Interactive loop: scrape, upload, single lookup, quit. Errors inside an
/// operation are reported and the menu continues.
pub fn run_menu<R: BufRead, W: Write>(
    services: &Services,
    settings: &Settings,
    mut input: R,
    output: &mut W,
) -> Result<(), AggregatorError> {
    loop {
        writeln!(output, "\nChoose an operation:")?;
        writeln!(output, "1. Update/scrape index list")?;
        writeln!(output, "2. Upload symbol list")?;
        writeln!(output, "3. Fetch data for a single symbol")?;
        writeln!(output, "4. Quit")?;

        let Some(choice) = prompt(&mut input, output, "Enter your choice: ")? else {
            return Ok(());
        };
        let outcome = match choice.as_str() {
            "1" => menu_scrape(services, &mut input, output),
            "2" => menu_upload(services, settings, &mut input, output),
            "3" => menu_single(services, settings, &mut input, output),
            "4" | "q" => {
                writeln!(output, "Exiting program. Goodbye!")?;
                return Ok(());
            }
            _ => {
                writeln!(output, "Invalid choice. Please try again.")?;
                Ok(())
            }
        };
        if let Err(e) = outcome {
            if let AggregatorError::Io(_) = e {
                return Err(e);
            }
            writeln!(output, "error: {}", e)?;
        }
    }
}

fn menu_scrape<R: BufRead, W: Write>(
    services: &Services,
    input: &mut R,
    output: &mut W,
) -> Result<(), AggregatorError> {
    writeln!(output, "\nAvailable indices:")?;
    for (i, index) in INDICES.iter().enumerate() {
        writeln!(output, "{}. {}", i + 1, index.name)?;
    }
    let Some(choice) = prompt(
        input,
        output,
        "\nEnter the number of the index you'd like to fetch (or 'q' to quit): ",
    )?
    else {
        return Ok(());
    };
    if choice.eq_ignore_ascii_case("q") {
        return Ok(());
    }
    let index: &IndexInfo = find_index(&choice)?;
    let table = fetch_constituents(services.constituent_source()?, index)?;
    write!(output, "{}", CsvTableAdapter::render(&table.head(5))?)?;

    let save = prompt(input, output, "Save constituents to CSV? (y/n): ")?;
    if save.is_some_and(|s| s.eq_ignore_ascii_case("y")) {
        let path = PathBuf::from(constituents_file_name(index));
        services.tables.write_table(&path, &table)?;
        writeln!(output, "Data saved to {}", path.display())?;
    }
    Ok(())
}

fn menu_upload<R: BufRead, W: Write>(
    services: &Services,
    settings: &Settings,
    input: &mut R,
    output: &mut W,
) -> Result<(), AggregatorError> {
    let Some(path) = prompt(input, output, "Enter the symbol file path: ")? else {
        return Ok(());
    };
    let path = PathBuf::from(path);
    let mut sheet = None;
    if is_xlsx(&path) {
        let Some(name) = prompt(input, output, "Enter the sheet name (blank for first): ")? else {
            return Ok(());
        };
        sheet = (!name.is_empty()).then_some(name);
    }
    let defaults = &settings.batch;
    let column_prompt = format!("Enter the symbol column [{}]: ", defaults.symbol_column);
    let Some(column) = prompt(input, output, &column_prompt)? else {
        return Ok(());
    };
    let Some(start) = prompt_date(input, output, "start", defaults.start_date)? else {
        return Ok(());
    };
    let Some(end) = prompt_date(input, output, "end", defaults.end_date)? else {
        return Ok(());
    };
    let Some(out_path) = prompt(input, output, "Enter output file path (blank for default): ")?
    else {
        return Ok(());
    };

    let job = UploadJob {
        input: path,
        output: (!out_path.is_empty()).then(|| PathBuf::from(out_path)),
        sheet,
        column: if column.is_empty() {
            defaults.symbol_column.clone()
        } else {
            column
        },
        start,
        end,
        benchmark: defaults.benchmark.clone(),
    };
    let written = run_upload(services, settings, &job)?;
    writeln!(output, "Updated file saved to {}", written.display())?;
    Ok(())
}

fn menu_single<R: BufRead, W: Write>(
    services: &Services,
    settings: &Settings,
    input: &mut R,
    output: &mut W,
) -> Result<(), AggregatorError> {
    let Some(symbol) = prompt(input, output, "Enter stock symbol: ")? else {
        return Ok(());
    };
    let symbols = parse_symbols(&symbol).map_err(|e| AggregatorError::invalid_input(e.to_string()))?;
    let defaults = &settings.batch;
    let Some(start) = prompt_date(input, output, "start", defaults.start_date)? else {
        return Ok(());
    };
    let Some(end) = prompt_date(input, output, "end", defaults.end_date)? else {
        return Ok(());
    };

    let request = BatchRequest {
        symbols,
        start,
        end,
        benchmark: defaults.benchmark.clone(),
    };
    let result = run_batch(services, settings, request)?;
    if result.success_count() == 0 {
        writeln!(output, "No data to display.")?;
    } else {
        writeln!(output, "\nStock Data:")?;
        write!(output, "{}", format_lookup(&result))?;
    }
    Ok(())
}

fn run_serve(services: Services, settings: Settings) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{build_router, AppState};
        use std::net::SocketAddr;

        let addr: SocketAddr = match settings.listen.parse() {
            Ok(a) => a,
            Err(e) => {
                return fail(AggregatorError::ConfigInvalid {
                    section: "web".to_string(),
                    key: "listen".to_string(),
                    reason: e.to_string(),
                })
            }
        };
        let constituents = match services.constituents.clone() {
            Some(c) => c,
            None => return fail(AggregatorError::invalid_input("serve requires index scraping")),
        };

        // Blocking HTTP clients must outlive the runtime.
        let _keep = (Arc::clone(&services.prices), Arc::clone(&constituents));

        let state = AppState {
            price_source: services.prices,
            constituents,
            pacer: services.pacer,
            settings: Arc::new(settings),
        };
        let router = build_router(state);

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => return fail(e.into()),
        };
        tracing::info!("Starting web server on {}", addr);
        let served = runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router).await
        });
        match served {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(e.into()),
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = (services, settings);
        tracing::error!("web feature is required for serve");
        ExitCode::from(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("data/SP500.csv")),
            PathBuf::from("data/SP500_metrics.csv")
        );
    }

    #[test]
    fn default_output_keeps_workbook_extension() {
        assert_eq!(
            default_output_path(Path::new("data/Symbols_preUpdate.xlsx")),
            PathBuf::from("data/Symbols_preUpdate_metrics.xlsx")
        );
        assert_eq!(
            default_output_path(Path::new("symbols")),
            PathBuf::from("symbols_metrics.csv")
        );
    }

    #[test]
    fn no_config_means_defaults() {
        assert_eq!(load_settings(None).unwrap(), Settings::default());
    }

    #[test]
    fn cli_parses_upload() {
        let cli = Cli::parse_from([
            "symbol-aggregator",
            "--config",
            "agg.ini",
            "upload",
            "--input",
            "in.csv",
            "--start",
            "2020-01-01",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("agg.ini")));
        match cli.command {
            Command::Upload { input, start, .. } => {
                assert_eq!(input, PathBuf::from("in.csv"));
                assert_eq!(start, NaiveDate::from_ymd_opt(2020, 1, 1));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cli_rejects_bad_date() {
        assert!(Cli::try_parse_from([
            "symbol-aggregator",
            "lookup",
            "--symbols",
            "AAPL",
            "--start",
            "01/01/2020",
        ])
        .is_err());
    }
}
