//! `conciliador run`: one store, one partner, one date range.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, ValueEnum};

use conciliador_config::{Catalog, Partner};
use conciliador_io::sqlite::SqliteQuery;
use conciliador_io::{csv, json, read_table, xlsx, SpreadsheetQuery};
use conciliador_recon::normalize::{format_brl, parse_date_str};
use conciliador_recon::report::{ReportCell, ReportOrder};
use conciliador_recon::{
    CanonicalRecord, ColumnMapping, ReconError, ReconInput, ReconResult, ReportOptions, SideLabels,
    SystemQuery,
};

use crate::exit_codes::EXIT_UNMATCHED;
use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// Delivery partner export (xlsx, xls, xlsb, ods, csv)
    pub delivery: PathBuf,

    /// Worksheet of the delivery export (default: first)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Store id (ID_Empresa)
    #[arg(long)]
    pub store: u32,

    /// Delivery partner id (ID_Cliente)
    #[arg(long)]
    pub partner: u32,

    /// First day of the period
    #[arg(long, value_parser = parse_cli_date)]
    pub start: NaiveDate,

    /// Last day of the period (inclusive)
    #[arg(long, value_parser = parse_cli_date)]
    pub end: NaiveDate,

    /// Delivery adapter to use instead of the partner's default
    #[arg(long)]
    pub adapter: Option<String>,

    /// SQLite copy of the point-of-sale database
    #[arg(long, env = "CONCILIADOR_DB")]
    pub system_db: Option<PathBuf>,

    /// System-side spreadsheet export (overrides --system-db)
    #[arg(long)]
    pub system_file: Option<PathBuf>,

    /// Worksheet of the system export (default: first)
    #[arg(long, requires = "system_file")]
    pub system_sheet: Option<String>,

    /// Adapter for the system export (default: the partner's system adapter)
    #[arg(long, requires = "system_file")]
    pub system_adapter: Option<String>,

    /// Output file, or - for stdout (default: Consolidado_<partner>.<ext>)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Output format (inferred from the output extension, else xlsx)
    #[arg(long, short = 'f', value_enum)]
    pub format: Option<OutputFormat>,

    /// Row order of the report
    #[arg(long, value_enum)]
    pub order: Option<Order>,

    /// Use each side's own column labels instead of the standard headers
    #[arg(long)]
    pub original_labels: bool,

    /// Append the adapters' extra columns to the report
    #[arg(long)]
    pub with_extras: bool,

    /// Report options file (TOML: order, status_header, difference_header, total_label)
    #[arg(long, value_name = "PATH")]
    pub report_options: Option<PathBuf>,

    /// Print the first N records of each side and of the report to stderr
    #[arg(long, value_name = "N")]
    pub preview: Option<usize>,

    /// Exit 7 when any row is left unmatched
    #[arg(long)]
    pub fail_on_unmatched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Xlsx,
    Csv,
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Order {
    /// As produced by the matcher
    Engine,
    /// By date, undated rows last
    Date,
}

impl From<Order> for ReportOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Engine => ReportOrder::Engine,
            Order::Date => ReportOrder::Date,
        }
    }
}

fn parse_cli_date(s: &str) -> Result<NaiveDate, String> {
    parse_date_str(s).ok_or_else(|| format!("invalid date '{s}' (expected dd/mm/yyyy or yyyy-mm-dd)"))
}

pub fn cmd_run(args: RunArgs, catalog_path: Option<&Path>) -> Result<(), CliError> {
    if args.start > args.end {
        return Err(CliError::usage(format!(
            "--start {} is after --end {}",
            args.start.format("%d/%m/%Y"),
            args.end.format("%d/%m/%Y")
        )));
    }

    // Everything configurable is resolved before touching any file
    let catalog = Catalog::load(catalog_path).map_err(CliError::config)?;
    let (store, partner) = catalog
        .ensure_allowed(args.store, args.partner)
        .map_err(CliError::config)?;
    let adapter_name = args.adapter.as_deref().unwrap_or(&partner.adapter);
    let adapter = catalog.adapter(adapter_name).map_err(CliError::config)?;
    let system = system_source(&args, &catalog, partner)?;
    let mut options = match &args.report_options {
        Some(path) => load_report_options(path)?,
        None => ReportOptions::default(),
    };
    if let Some(order) = args.order {
        options.order = order.into();
    }
    let format = output_format(&args)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_name(&partner.name, format));

    // Delivery side
    let table = read_table(&args.delivery, args.sheet.as_deref()).map_err(CliError::input)?;
    let delivery = adapter.apply(&table).map_err(|e| match e {
        ReconError::MissingColumn { .. } => {
            let found = table.headers.join(", ");
            CliError::recon(e).with_hint(format!("columns found: {found}"))
        }
        other => CliError::recon(other),
    })?;
    if !delivery.warnings.is_empty() {
        tracing::warn!(
            "{}: {} row(s) with unreadable values",
            args.delivery.display(),
            delivery.warnings.len()
        );
    }

    // System side
    let filter = partner.filter(store, args.start, args.end);
    let system_records = system.fetch(&filter).map_err(CliError::recon)?;
    let system_labels = system.labels();

    let mapping = column_mapping(&args, &delivery.labels, &system_labels);

    if let Some(n) = args.preview {
        preview_records("delivery", &delivery.records, n);
        preview_records("system", &system_records, n);
    }

    let name = format!("{} / {}", store.name, partner.name);
    let input = ReconInput {
        left: delivery.records,
        right: system_records,
    };
    let result = conciliador_recon::run(&name, input, &mapping, &options);

    if let Some(n) = args.preview {
        preview_report(&result, n);
    }

    write_output(&result, &output, format)?;
    print_summary(&result);

    let unmatched = result.summary.unmatched();
    if args.fail_on_unmatched && unmatched > 0 {
        return Err(CliError::new(
            EXIT_UNMATCHED,
            format!("{unmatched} unmatched row(s)"),
        ));
    }
    Ok(())
}

fn system_source(
    args: &RunArgs,
    catalog: &Catalog,
    partner: &Partner,
) -> Result<Box<dyn SystemQuery>, CliError> {
    if let Some(path) = &args.system_file {
        let name = args
            .system_adapter
            .as_deref()
            .or(partner.system_adapter.as_deref())
            .ok_or_else(|| {
                CliError::usage(format!("partner {} has no system adapter", partner.id))
                    .with_hint("pass --system-adapter (see `conciliador adapters`)")
            })?;
        let adapter = catalog.adapter(name).map_err(CliError::config)?.clone();
        let mut query = SpreadsheetQuery::new(path, adapter);
        if let Some(sheet) = &args.system_sheet {
            query = query.with_sheet(sheet);
        }
        return Ok(Box::new(query));
    }

    match &args.system_db {
        Some(path) => {
            let query = SqliteQuery::open(path).map_err(CliError::recon)?;
            Ok(Box::new(query))
        }
        None => Err(CliError::usage("no system source")
            .with_hint("pass --system-db (or set CONCILIADOR_DB), or --system-file")),
    }
}

fn load_report_options(path: &Path) -> Result<ReportOptions, CliError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CliError::input(format!("cannot read {}: {e}", path.display())))?;
    ReportOptions::from_toml(&contents)
        .map_err(|e| CliError::recon(e).with_hint(format!("in {}", path.display())))
}

fn column_mapping(args: &RunArgs, delivery: &SideLabels, system: &SideLabels) -> ColumnMapping {
    let mapping = if args.original_labels {
        ColumnMapping::from_labels(delivery, system)
    } else {
        ColumnMapping::standard()
    };
    if args.with_extras {
        mapping.with_extras(&delivery.extras, &system.extras)
    } else {
        mapping
    }
}

fn output_format(args: &RunArgs) -> Result<OutputFormat, CliError> {
    let inferred = args
        .output
        .as_deref()
        .filter(|p| *p != Path::new("-"))
        .and_then(OutputFormat::from_path);
    let format = args.format.or(inferred).unwrap_or(OutputFormat::Xlsx);

    if format == OutputFormat::Xlsx && is_stdout(args.output.as_deref()) {
        return Err(CliError::usage("xlsx output cannot be written to stdout")
            .with_hint("use -f csv or -f json with -o -"));
    }
    Ok(format)
}

fn is_stdout(output: Option<&Path>) -> bool {
    output == Some(Path::new("-"))
}

/// `Consolidado_<partner>.<ext>`, with path separators removed from the name.
fn default_output_name(partner: &str, format: OutputFormat) -> PathBuf {
    let name: String = partner
        .trim()
        .trim_end_matches('.')
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    PathBuf::from(format!("Consolidado_{name}.{}", format.extension()))
}

fn write_output(result: &ReconResult, output: &Path, format: OutputFormat) -> Result<(), CliError> {
    if is_stdout(Some(output)) {
        let stdout = io::stdout();
        let handle = stdout.lock();
        return match format {
            OutputFormat::Csv => csv::write_report(&result.report, handle),
            OutputFormat::Json => json::write_result(result, handle),
            OutputFormat::Xlsx => Err("xlsx output cannot be written to stdout".to_string()),
        }
        .map_err(CliError::output);
    }

    match format {
        OutputFormat::Xlsx => xlsx::export_report(&result.report, output),
        OutputFormat::Csv => csv::export_report(&result.report, output),
        OutputFormat::Json => json::export_result(result, output),
    }
    .map_err(|e| CliError::output(format!("{}: {e}", output.display())))?;

    eprintln!("wrote {}", output.display());
    Ok(())
}

fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "{}: {} rows, {} matched, {} delivery only, {} system only",
        result.meta.run_name, s.total_pairs, s.matched, s.left_only, s.right_only,
    );
    eprintln!(
        "delivery {}, system {}, difference {}",
        format_brl(s.left_total_cents),
        format_brl(s.right_total_cents),
        format_brl(s.abs_difference_cents),
    );
    if s.coerced_amounts > 0 {
        eprintln!("note: {} amount(s) could not be read and count as zero", s.coerced_amounts);
    }
    if s.keyless > 0 {
        eprintln!("note: {} record(s) without a usable date or amount", s.keyless);
    }
}

fn preview_records(side: &str, records: &[CanonicalRecord], n: usize) {
    eprintln!("-- {side}: {} record(s)", records.len());
    for r in records.iter().take(n) {
        let date = r
            .date
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default();
        let amount = r.amount_cents.map(format_brl).unwrap_or_default();
        eprintln!("   {:<16} {:<10} {:>14}", r.order_id, date, amount);
    }
}

fn preview_report(result: &ReconResult, n: usize) {
    let report = &result.report;
    eprintln!("-- report: {} row(s)", report.rows.len());
    eprintln!("   {}", report.headers().join(" | "));
    for row in report.rows.iter().take(n) {
        let cells: Vec<String> = row.cells.iter().map(preview_cell).collect();
        eprintln!("   {}", cells.join(" | "));
    }
}

fn preview_cell(cell: &ReportCell) -> String {
    match cell {
        ReportCell::Blank => String::new(),
        ReportCell::Text(s) => s.clone(),
        ReportCell::Money(cents) => format_brl(*cents),
    }
}
