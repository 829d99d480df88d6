use anyhow::{bail, Context, Result};
use distance_to_zone::cli::{AnalyzeArgs, Cli, Command, CommandArgs};
use distance_to_zone::export;
use distance_to_zone::pipeline::batch::{run_batch, PlayJob, PreparedPlay};
use distance_to_zone::pipeline::command;
use distance_to_zone::pipeline::types::BatchProgress;
use distance_to_zone::run_context;
use distance_to_zone::source::saved::SavedPlay;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse_args();

    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Command(args) => run_command(args),
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = args.engine_config();

    let files = run_context::list_play_files(&args.plays);
    if files.is_empty() {
        bail!("No play files found under {}", args.plays.display());
    }

    let run = run_context::create_run(&args.output_root, &args.plays, &config)?;
    tracing::info!(
        "Run {}: analyzing {} plays with {} workers",
        run.run_id,
        files.len(),
        args.workers
    );

    let jobs: Vec<PlayJob> = files
        .iter()
        .map(|path| PlayJob {
            play_id: path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string(),
            path: path.clone(),
        })
        .collect();

    let progress = Arc::new(BatchProgress::new(jobs.len()));
    let bar = ProgressBar::new(jobs.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} plays ({msg})",
    )?);

    let monitor = {
        let progress = progress.clone();
        let bar = bar.clone();
        std::thread::spawn(move || {
            while progress.is_active.load(Ordering::Relaxed) {
                bar.set_position(progress.processed() as u64);
                bar.set_message(format!("{:.1} plays/s", progress.rate()));
                std::thread::sleep(Duration::from_millis(200));
            }
            bar.set_position(progress.processed() as u64);
        })
    };

    let results = run_batch(jobs, config, args.workers, progress.clone(), |job| {
        let play = SavedPlay::load(&job.path)?;
        Ok(PreparedPlay {
            play_id: play.play_id().to_string(),
            metadata: play.metadata().clone(),
            source: Box::new(play.frame_source()),
            detectors: play.detector_set(),
        })
    })?;

    let _ = monitor.join();
    bar.finish();

    export::write_results_csv(&run.output_dir.join("results.csv"), &results)?;
    export::write_results_json(&run.output_dir.join("results.json"), &results)?;

    let complete = results.iter().filter(|r| r.is_complete()).count();
    tracing::info!(
        "Run {} finished: {}/{} plays complete, artifacts in {}",
        run.run_id,
        complete,
        results.len(),
        run.output_dir.display()
    );

    Ok(())
}

fn run_command(args: CommandArgs) -> Result<()> {
    let results = export::read_results_json(&args.results)?;
    let report = command::analyze(&results);

    let output_dir = match args.output {
        Some(dir) => dir,
        None => args
            .results
            .parent()
            .map(PathBuf::from)
            .context("Results path has no parent directory")?,
    };
    std::fs::create_dir_all(&output_dir)?;

    export::write_command_csv(&output_dir.join("command.csv"), &report)?;
    export::write_command_json(&output_dir.join("command.json"), &report)?;

    tracing::info!(
        "Command report over {} plays ({} complete, {} skipped), {} groups, written to {}",
        report.total,
        report.complete,
        report.skipped,
        report.groups.len(),
        output_dir.display()
    );

    Ok(())
}
