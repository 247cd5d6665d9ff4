use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use verdict::config::{RawOptions, RunConfig};
use verdict::discover;
use verdict::models::Conclusion;
use verdict::pipeline::Pipeline;
use verdict::publish::LocalPublisher;

#[derive(Debug, Parser)]
#[command(
    name = "verdict",
    version,
    about = "Normalize test runner reports into annotations and a markdown summary"
)]
struct Args {
    /// Report format: java-junit, dotnet-trx, jest-json or mocha-json.
    #[arg(long)]
    reporter: Option<String>,

    /// Glob pattern selecting report files, relative to the work dir.
    /// Repeatable.
    #[arg(long = "path")]
    paths: Vec<String>,

    /// Root of the checked-out source tree.
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Inline annotation quota, 0..=50. 0 disables annotations.
    #[arg(long)]
    max_annotations: Option<usize>,

    /// Which suites to list: all or failed.
    #[arg(long)]
    list_suites: Option<String>,

    /// Test detail granularity: all, failed or none.
    #[arg(long)]
    list_tests: Option<String>,

    /// true/false: emit only the aggregate header.
    #[arg(long)]
    only_summary: Option<String>,

    /// Deep-link prefix attached to report sections.
    #[arg(long)]
    base_url: Option<String>,

    /// true/false: extract structured failure detail (default true).
    #[arg(long)]
    parse_errors: Option<String>,

    /// true/false: treat zero matched report files as fatal (default false).
    #[arg(long)]
    fail_on_empty: Option<String>,

    /// true/false: a decode failure fails the run (default true).
    #[arg(long)]
    fail_on_parse_error: Option<String>,

    /// Write the markdown report here instead of stdout.
    #[arg(long)]
    report_file: Option<PathBuf>,

    /// Write selected annotations here as JSON.
    #[arg(long)]
    annotations_file: Option<PathBuf>,

    /// Write aggregate outputs here as key=value lines.
    #[arg(long)]
    outputs_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    match run(Args::parse()).await {
        Ok(Conclusion::Success) => ExitCode::SUCCESS,
        Ok(Conclusion::Failure) => ExitCode::FAILURE,
        Err(error) => {
            log::error!("{error:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<Conclusion> {
    let config = RunConfig::resolve(RawOptions {
        reporter: args.reporter,
        patterns: args.paths,
        work_dir: args.work_dir,
        max_annotations: args.max_annotations,
        list_suites: args.list_suites,
        list_tests: args.list_tests,
        only_summary: args.only_summary,
        base_url: args.base_url,
        parse_errors: args.parse_errors,
        fail_on_empty: args.fail_on_empty,
        fail_on_parse_error: args.fail_on_parse_error,
    })?;

    let files = discover::collect_reports(&config.work_dir, &config.patterns)?;
    let tracked = discover::tracked_files(&config.work_dir)?;
    log::info!(
        "decoding {} report file(s) as {}",
        files.len(),
        config.reporter.as_str()
    );

    let publisher = LocalPublisher {
        report_path: args.report_file,
        annotations_path: args.annotations_file,
        outputs_path: args.outputs_file,
    };
    let mut pipeline = Pipeline::new(config, tracked);
    let output = pipeline.run(files, &publisher).await?;
    Ok(output.outputs.conclusion)
}
