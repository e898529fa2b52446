use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use reappointment_trends::{
    load_appointment_files, save_report, setup_database, AnalysisConfig, AnalysisReport,
    ReappointmentPipeline, Severity, TrendDirection,
};

#[derive(Parser, Debug)]
#[command(name = "reappointment-trends", version, about = "Reappointment trends across government appointment tables")]
struct Cli {
    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Infer reappointments, rank organizations and fit the annual trend
    Analyze {
        /// Appointment CSV tables, read in the given order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// JSON config file (missing keys fall back to defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// SQLite file the run is saved to
        #[arg(long)]
        db: Option<PathBuf>,

        /// Export the full report as JSON
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Analyze {
            files,
            config,
            db,
            json,
        } => run_analyze(&files, config, db, json),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "reappointment_trends=debug"
    } else {
        "reappointment_trends=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_analyze(
    files: &[PathBuf],
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
    json_path: Option<PathBuf>,
) -> Result<()> {
    let config = match &config_path {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };
    debug!(?config, "configuration loaded");

    let records = load_appointment_files(files)?;
    let pipeline = ReappointmentPipeline::new(config)?;
    let report = pipeline.run(&records).context("Analysis failed")?;

    if let Some(path) = &db_path {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        setup_database(&conn)?;
        save_report(&conn, &report)?;
    }

    if let Some(path) = &json_path {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    print_report(&report, db_path.as_ref());
    if let Some(path) = &json_path {
        println!("📝 Report exported to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &AnalysisReport, db_path: Option<&PathBuf>) {
    println!("📊 Reappointment Trends {}-{}", report.config.year_start, report.config.year_end);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✓ {} appointments, {} reappointments ({} inferred)",
        report.record_count(),
        report.reappointment_count(),
        report.inferred_count()
    );

    println!("\n🏆 Yearly leaders (min {} appointments)", report.config.min_appointments);
    for leader in &report.yearly_leaders {
        let margin = leader
            .margin
            .map(|m| format!(" (+{:.1} pts)", m * 100.0))
            .unwrap_or_default();
        println!(
            "   {}  {:<40} {:>5.1}%  {}/{}{}",
            leader.year,
            leader.winner.organization,
            leader.winner.rate * 100.0,
            leader.winner.reappointment_count,
            leader.winner.total_appointments,
            margin
        );
    }

    println!("\n📈 Annual proportions");
    for p in &report.annual_proportions {
        println!(
            "   {}  {:>5.1}%  {}/{}",
            p.year,
            p.proportion * 100.0,
            p.total_reappointments,
            p.total_appointments
        );
    }

    println!("\n📐 Trend");
    match &report.regression {
        Some(r) => {
            let arrow = match r.direction() {
                TrendDirection::Increasing => "⬆️ ",
                TrendDirection::Decreasing => "⬇️ ",
                TrendDirection::NoSignificantTrend => "➡️ ",
            };
            println!("   {} {}", arrow, r.summary());
            println!(
                "   {:.0}% CI for slope: [{:.5}, {:.5}]",
                r.confidence_level * 100.0,
                r.confidence_interval.0,
                r.confidence_interval.1
            );
            if let Some(dw) = r.durbin_watson {
                println!("   Durbin-Watson: {:.3}", dw);
            }
            if let (Some(w), Some(p)) = (r.shapiro_w, r.shapiro_p) {
                println!("   Shapiro-Wilk: W={:.4}, p={:.4}", w, p);
            }
        }
        None => println!("   (not fitted)"),
    }

    if !report.warnings.is_empty() {
        println!("\n⚠️  Warnings");
        for w in &report.warnings {
            let icon = match w.severity() {
                Severity::Warning => "⚠️ ",
                Severity::Info => "ℹ️ ",
            };
            println!("   {} {}", icon, w);
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    match db_path {
        Some(path) => println!("💾 Run {} saved to {}", report.run_id, path.display()),
        None => println!("🆔 Run {}", report.run_id),
    }
}
