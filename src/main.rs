use anyhow::Result;
use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use indicatif::{ProgressBar, ProgressStyle};
use mediabackup::backup_core::{
    BackupController, ChannelReporter, Cli, Commands, JobEvent, JobReport, JobStatus,
    MetadataDateResolver, PreflightSummary, enumerate_media, load_extensions, validate_source,
};
use simplelog::{CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, WriteLogger};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize loggers
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Warn,
        Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];

    if cli.log {
        loggers.push(WriteLogger::new(
            cli.log_level,
            Config::default(),
            File::create("media_backup.log")?,
        ));
    }

    CombinedLogger::init(loggers)?;

    // Local offset lookup needs a single-threaded process
    let resolver = MetadataDateResolver::new();

    match cli.command {
        Commands::Backup {
            source_dir,
            dest_dir,
            yes,
        } => {
            let extensions = load_extensions(&cli.config);
            let mut controller =
                BackupController::new(extensions).with_resolver(Arc::new(resolver));
            run_backup(&mut controller, &source_dir, &dest_dir, yes)?;
        }

        Commands::Count { source_dir } => {
            validate_source(&source_dir)?;
            let extensions = load_extensions(&cli.config);
            let files = enumerate_media(&source_dir, &extensions);
            println!("{}", PreflightSummary::from_records(&files));
        }

        Commands::Extensions => {
            let extensions = load_extensions(&cli.config);
            println!("Config: {}", cli.config.display());
            for ext in extensions.as_slice() {
                println!("  {}", ext);
            }
        }
    }

    Ok(())
}

fn run_backup(
    controller: &mut BackupController,
    source_dir: &Path,
    dest_dir: &Path,
    yes: bool,
) -> Result<()> {
    let summary = controller.start_job(source_dir, dest_dir)?;
    println!("{}", summary);

    if summary.total == 0 {
        controller.reset();
        println!("\nNo media files found!");
        return Ok(());
    }

    if !yes {
        print!("\nDo you want to proceed with the backup? [y/N]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
            controller.cancel();
            println!("Backup cancelled.");
            return Ok(());
        }
    }

    let (reporter, rx) = ChannelReporter::new();
    controller.subscribe(Arc::new(reporter));
    controller.confirm_and_run()?;

    let bar_style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?;
    let bar = ProgressBar::new(summary.total as u64).with_style(bar_style);
    bar.set_message("Copying files");

    loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(JobEvent::Progress(event)) => {
                bar.set_position(event.processed as u64);
                bar.set_message(event.message);
            }
            Ok(JobEvent::Finished(_)) => break,
            Err(RecvTimeoutError::Timeout) if controller.is_running() => {}
            Err(_) => break,
        }
    }

    let report = controller.wait().unwrap_or_else(|| JobReport {
        status: JobStatus::Failed,
        message: "Backup worker did not report".to_string(),
        ..Default::default()
    });
    bar.finish_with_message(report.status.to_string());

    print_report(&report);
    Ok(())
}

fn print_report(report: &JobReport) {
    println!("\nBackup {}!", report.status);
    println!("  {}", report.message);
    println!("  {} of {} files processed", report.processed, report.total);
    println!("  {} files copied", report.copied);
    if report.unknown_date > 0 {
        println!("  {} files placed in Unknown_Date", report.unknown_date);
    }
    if !report.failures.is_empty() {
        println!("  {} files failed:", report.failures.len());
        print!("{}", report.failures);
    }
}
