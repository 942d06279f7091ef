//! The download run: wire the pipeline to the progress display and failure log.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use shardfetch_core::config::expand_path;
use shardfetch_core::pipeline::OutcomeObserver;
use shardfetch_core::{
    Config, FailureRecord, Manifest, Outcome, Pipeline, ReportWriter, WorkItem,
};

use super::progress::{print_summary, Progress};
use super::Cli;

type FailureLog = Arc<Mutex<ReportWriter<BufWriter<File>>>>;

/// Execute a download run for the parsed arguments.
///
/// Item failures are counted and reported, never returned as an error.
pub async fn execute(args: Cli, config: Config) -> anyhow::Result<()> {
    let (input, output) = match (&args.input, &args.output) {
        (Some(input), Some(output)) => (expand_path(input), expand_path(output)),
        _ => anyhow::bail!("INPUT and OUTPUT are required"),
    };

    let pipeline = Pipeline::new(config, output.clone())?;
    let manifest = Manifest::open(&input)?;
    tracing::info!("Reading {:?}, saving to {:?}", input, output);

    let failures = match &args.failures {
        Some(path) => Some(open_failure_log(&expand_path(path))?),
        None => None,
    };

    let progress = Arc::new(Progress::new(!(args.no_progress || args.quiet)));
    let observer = make_observer(progress.clone(), failures.clone());

    let result = pipeline.run_with_observer(manifest, Some(observer)).await;
    progress.finish();

    if let Some(failures) = &failures {
        let mut log = failures
            .lock()
            .map_err(|_| anyhow::anyhow!("failure log lock poisoned"))?;
        log.flush().context("Failed to flush failure log")?;
        tracing::info!("Recorded {} failures", log.records_written());
    }

    let summary = result?;
    if !args.quiet {
        print_summary(&summary);
    }
    Ok(())
}

fn open_failure_log(path: &Path) -> anyhow::Result<FailureLog> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create failure log {:?}", path))?;
    Ok(Arc::new(Mutex::new(ReportWriter::new(BufWriter::new(file)))))
}

fn make_observer(progress: Arc<Progress>, failures: Option<FailureLog>) -> OutcomeObserver {
    Arc::new(move |item: &WorkItem, outcome: &Outcome| {
        progress.record(outcome);

        let (Some(failures), Outcome::Failed(error)) = (&failures, outcome) else {
            return;
        };
        let record = FailureRecord::new(item, error);
        match failures.lock() {
            Ok(mut log) => {
                if let Err(e) = log.write(&record) {
                    tracing::error!("Failed to record failure for {}: {}", item.identifier, e);
                }
            }
            Err(_) => tracing::error!("Failure log lock poisoned"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(argv: &[&str]) -> Cli {
        let mut full = vec!["shardfetch"];
        full.extend_from_slice(argv);
        Cli::try_parse_from(full).unwrap()
    }

    #[tokio::test]
    async fn test_missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.csv");
        let output = dir.path().join("out");
        let args = cli(&["-q", input.to_str().unwrap(), output.to_str().unwrap()]);

        let err = execute(args, Config::default()).await.unwrap_err();
        assert!(err.to_string().contains("missing.csv"));
    }

    #[tokio::test]
    async fn test_item_failures_do_not_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("images.csv");
        // Neither row is valid hex, so both fail before any request is made
        std::fs::write(
            &input,
            "ImageID,OriginalURL\nxyz,http://127.0.0.1:9/a.jpg\nqq,http://127.0.0.1:9/b.jpg\n",
        )
        .unwrap();
        let output = dir.path().join("out");
        let failures = dir.path().join("logs").join("failed.jsonl");
        let args = cli(&[
            "-q",
            "--failures",
            failures.to_str().unwrap(),
            input.to_str().unwrap(),
            output.to_str().unwrap(),
        ]);

        execute(args, Config::default()).await.unwrap();

        let log = std::fs::read_to_string(&failures).unwrap();
        let lines: Vec<serde_json::Value> = log
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["stage"], "identifier");
        let ids: Vec<&str> = lines
            .iter()
            .map(|l| l["identifier"].as_str().unwrap())
            .collect();
        assert!(ids.contains(&"xyz") && ids.contains(&"qq"));
    }

    #[tokio::test]
    async fn test_header_only_manifest_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("images.csv");
        std::fs::write(&input, "ImageID,OriginalURL\n").unwrap();
        let output = dir.path().join("out");
        let args = cli(&["--no-progress", input.to_str().unwrap(), output.to_str().unwrap()]);

        execute(args, Config::default()).await.unwrap();
    }
}
