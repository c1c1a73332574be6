// Entry point and CLI flow.
//
// Each subcommand loads the workbook once, builds one report, writes the
// JSON/CSV artifacts into the output directory and prints a short markdown
// preview. Failures are printed to stderr as `{error_code, message}` JSON.
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use ticket_report::config::ReportConfig;
use ticket_report::error::{ErrorBody, ReportError};
use ticket_report::loader::{self, LoadReport};
use ticket_report::reports::{self, AuxStores, RequestOptions};
use ticket_report::sections::PartitionRules;
use ticket_report::types::SectionPreviewRow;
use ticket_report::{output, util};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ticket_report")]
#[command(author, version, about = "Weekly and monthly support-ticket reports", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML settings file
    #[arg(long, global = true, env = "TICKET_REPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Extra sheet to ingest besides the configured year sheets
    #[arg(long, global = true)]
    sheet: Option<String>,

    /// Section rules: open-with-closed-in-range or created-in-range
    #[arg(long, global = true)]
    rules: Option<PartitionRules>,

    /// Directory for generated files
    #[arg(short, long, global = true, default_value = ".")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Active and backlog sections for a date range (defaults to last week)
    Weekly {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, requires = "end")]
        begin: Option<String>,
        #[arg(long, requires = "begin")]
        end: Option<String>,
    },

    /// Type/category pivot and year-to-date series for one month
    Monthly {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },

    /// Onboarding sheet with rows in the range flagged
    NewUsers {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, requires = "end")]
        begin: Option<String>,
        #[arg(long, requires = "begin")]
        end: Option<String>,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Explicit `--begin/--end`, or the previous Monday..Sunday.
fn resolve_range(begin: Option<&str>, end: Option<&str>) -> Result<(NaiveDate, NaiveDate)> {
    match (begin, end) {
        (Some(b), Some(e)) => Ok((util::parse_request_date(b)?, util::parse_request_date(e)?)),
        _ => Ok(util::last_week_range(chrono::Local::now().date_naive())),
    }
}

fn print_load_report(report: &LoadReport) {
    println!(
        "Processing workbook... ({} rows loaded from {} of {} sheets, {} duplicates removed)",
        util::format_int(report.total_rows),
        util::format_int(report.sheets_ingested.len()),
        util::format_int(report.sheets_seen),
        util::format_int(report.duplicate_rows)
    );
    for (sheet, missing) in &report.missing_columns {
        println!("Note: sheet '{}' has no {} column(s).", sheet.trim(), missing.join(", "));
    }
    if report.malformed_cells > 0 {
        println!(
            "Note: {} date cells could not be parsed and were left empty.",
            util::format_int(report.malformed_cells)
        );
    }
    println!();
}

/// Handle `weekly`: both sections, the new-users list and the summary.
fn handle_weekly(cli: &Cli, config: &ReportConfig, file: &Path, begin: Option<&str>, end: Option<&str>) -> Result<()> {
    let (begin, end) = resolve_range(begin, end)?;
    let workbook = loader::load_workbook(file)?;
    let opts = RequestOptions {
        sheet: cli.sheet.as_deref(),
        rules: cli.rules,
    };
    let report = reports::generate_weekly(&workbook, begin, end, config, &opts)?;
    print_load_report(&report.load);

    let json = cli.out_dir.join(format!("weekly_report_{}_{}.json", begin, end));
    output::write_json(&json, &report)?;
    let left = cli.out_dir.join("left_section.csv");
    output::write_section_csv(&left, &report.left_section)?;
    let right = cli.out_dir.join("right_section.csv");
    output::write_section_csv(&right, &report.right_section)?;
    let users = cli.out_dir.join("new_users.csv");
    output::write_new_users_csv(&users, &report.new_users_section)?;

    println!("Weekly Report: {} to {}\n", begin, end);
    println!("Open tickets");
    let rows: Vec<SectionPreviewRow> = report.left_section.iter().map(SectionPreviewRow::from).collect();
    output::preview_table_rows(&rows, config.preview_rows);
    println!("(Full table exported to {})\n", left.display());

    println!("Open and recently closed tickets");
    let rows: Vec<SectionPreviewRow> = report.right_section.iter().map(SectionPreviewRow::from).collect();
    output::preview_table_rows(&rows, config.preview_rows);
    println!("(Full table exported to {})\n", right.display());

    println!(
        "New users: {} rows, {} in range (exported to {})",
        util::format_int(report.new_users_section.rows.len()),
        util::format_int(report.new_users_section.rows.iter().filter(|r| r.is_new_user).count()),
        users.display()
    );
    println!(
        "Summary ({}): {{\"open_count\": {}, \"closed_count\": {}}}\n",
        json.display(),
        util::format_int(report.summary.open_count),
        util::format_int(report.summary.closed_count)
    );
    Ok(())
}

/// Handle `monthly`: pivot, annual series and the stored SLA/effort data.
fn handle_monthly(cli: &Cli, config: &ReportConfig, file: &Path, year: i32, month: u32) -> Result<()> {
    let workbook = loader::load_workbook(file)?;
    let opts = RequestOptions {
        sheet: cli.sheet.as_deref(),
        rules: cli.rules,
    };
    let aux = AuxStores::load(&config.data_dir);
    let report = reports::generate_monthly(&workbook, year, month, config, &opts, &aux)?;
    print_load_report(&report.load);

    let json = cli.out_dir.join(format!("monthly_report_{}_{:02}.json", year, month));
    output::write_json(&json, &report)?;
    let pivot = cli.out_dir.join(format!("pivot_{}_{:02}.csv", year, month));
    output::write_pivot_csv(&pivot, &report.pivot_data)?;

    println!("Monthly Report: {}-{:02}\n", year, month);
    println!("Tickets by Type and Category\n");
    output::preview_table_rows(&report.pivot_data.to_rows(), config.preview_rows);
    println!("(Full table exported to {})\n", pivot.display());
    println!(
        "Year to date: {} tickets across {} categories",
        util::format_int(report.annual_summary.total()),
        util::format_int(report.annual_summary.categories.len())
    );
    println!(
        "Summary ({}): {{\"total_tickets\": {}, \"closed_tickets\": {}}}\n",
        json.display(),
        util::format_int(report.summary.total_tickets),
        util::format_int(report.summary.closed_tickets)
    );
    Ok(())
}

/// Handle `new-users`: the onboarding sheet on its own.
fn handle_new_users(cli: &Cli, config: &ReportConfig, file: &Path, begin: Option<&str>, end: Option<&str>) -> Result<()> {
    let (begin, end) = resolve_range(begin, end)?;
    let workbook = loader::load_workbook(file)?;
    let table = reports::generate_new_users(&workbook, begin, end, config)?;
    let path = cli.out_dir.join("new_users.csv");
    output::write_new_users_csv(&path, &table)?;
    println!(
        "New users: {} rows, {} created between {} and {} (exported to {})\n",
        util::format_int(table.rows.len()),
        util::format_int(table.rows.iter().filter(|r| r.is_new_user).count()),
        begin,
        end,
        path.display()
    );
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ReportConfig::load(path).with_context(|| format!("reading {}", path.display()))?,
        None => ReportConfig::default(),
    };
    std::fs::create_dir_all(&cli.out_dir)?;
    match &cli.command {
        Commands::Weekly { file, begin, end } => {
            handle_weekly(cli, &config, file, begin.as_deref(), end.as_deref())
        }
        Commands::Monthly { file, year, month } => handle_monthly(cli, &config, file, *year, *month),
        Commands::NewUsers { file, begin, end } => {
            handle_new_users(cli, &config, file, begin.as_deref(), end.as_deref())
        }
    }
}

fn error_body(err: &anyhow::Error) -> ErrorBody {
    match err.downcast_ref::<ReportError>() {
        Some(e) => e.to_body(),
        None => ErrorBody {
            error_code: "INTERNAL_ERROR".to_string(),
            message: format!("{:#}", err),
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let body = error_body(&err);
            match serde_json::to_string(&body) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}: {}", body.error_code, body.message),
            }
            ExitCode::FAILURE
        }
    }
}
