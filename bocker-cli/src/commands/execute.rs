//! Pipeline execution
//!
//! Runs an assembled pipeline on a blocking worker while the async task
//! listens for Ctrl-C, and writes the debug report when the run fails.

use anyhow::{Context, Result};
use bocker_runner::context::DEBUG_REPORT_FILE;
use bocker_runner::service::{ActionLog, CapabilitiesService, StandardCapabilitiesService};
use bocker_runner::{CancelFlag, Pipeline, RunContext};
use colored::*;
use std::future::Future;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::output::{OutputFormat, renderer};

/// Exit status after a second interrupt, as for a shell killed by SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// How a supervised worker ended
pub enum Supervised<T> {
    /// The worker returned, possibly after a cancellation request
    Finished(T),
    /// A second interrupt arrived before the worker returned
    Abandoned,
}

/// Waits for `worker` while watching for interrupts
///
/// The first interrupt raises `cancel` so the pipeline stops before its next
/// stage; a second one gives up on the worker.
///
/// # Arguments
/// * `worker` - Blocking task running the pipeline
/// * `cancel` - Flag the pipeline checks between stages
/// * `interrupt` - Produces a future that resolves on each interrupt
pub async fn supervise<T, F, Fut>(
    mut worker: JoinHandle<T>,
    cancel: &CancelFlag,
    mut interrupt: F,
) -> Result<Supervised<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tokio::select! {
        joined = &mut worker => {
            return Ok(Supervised::Finished(joined.context("Pipeline worker panicked")?));
        }
        _ = interrupt() => {
            warn!("Interrupt received, stopping after the current stage (press Ctrl-C again to abort)");
            cancel.cancel();
        }
    }

    tokio::select! {
        joined = &mut worker => Ok(Supervised::Finished(joined.context("Pipeline worker panicked")?)),
        _ = interrupt() => {
            warn!("Second interrupt received, abandoning the run");
            Ok(Supervised::Abandoned)
        }
    }
}

/// Checks that every tool the workflow shells out to is installed
pub fn preflight(context: &RunContext, tools: &[String]) -> Result<()> {
    info!("Checking tools: {}", tools.join(", "));
    StandardCapabilitiesService::new(context.runner())
        .require(tools)
        .context("Tool preflight failed")
}

/// Runs `pipeline` to completion inside `context`
///
/// On failure the action log is written to `bocker-debug.log` in the current
/// directory before the error is returned.
pub async fn execute(context: RunContext, mut pipeline: Pipeline, output: OutputFormat) -> Result<()> {
    pipeline.subscribe_boxed(renderer(output));

    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();
    let worker = tokio::task::spawn_blocking(move || {
        let result = pipeline.run(&worker_cancel);
        (pipeline, result)
    });

    let interrupt = || async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let (pipeline, result) = match supervise(worker, &cancel, interrupt).await? {
        Supervised::Finished(outcome) => outcome,
        Supervised::Abandoned => {
            eprintln!("{}", "Aborted; the running tool may still be finishing".red());
            drop(context);
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    };

    match result {
        Ok(()) => {
            info!("Pipeline '{}' finished", pipeline.name());
            Ok(())
        }
        Err(e) => {
            context.log().error(e.to_string());
            let report = Path::new(DEBUG_REPORT_FILE);
            match context.write_report(report, &e) {
                Ok(()) => {
                    if output == OutputFormat::Human {
                        eprintln!(
                            "{}",
                            format!("Wrote debug report to {}", report.display()).dimmed()
                        );
                    }
                }
                Err(write_error) => warn!("Failed to write debug report: {}", write_error),
            }
            Err(e).context(format!("{} failed", pipeline.name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::mpsc;
    use std::time::Duration;

    /// Resolves immediately on the first `count` calls, then never
    fn interrupts(count: usize) -> impl FnMut() -> Pin<Box<dyn Future<Output = ()>>> {
        let mut remaining = count;
        move || -> Pin<Box<dyn Future<Output = ()>>> {
            if remaining > 0 {
                remaining -= 1;
                Box::pin(std::future::ready(()))
            } else {
                Box::pin(std::future::pending::<()>())
            }
        }
    }

    #[tokio::test]
    async fn test_worker_result_without_interrupt() {
        let cancel = CancelFlag::new();
        let worker = tokio::task::spawn_blocking(|| 42);

        let outcome = supervise(worker, &cancel, interrupts(0)).await.unwrap();

        assert!(matches!(outcome, Supervised::Finished(42)));
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels_and_waits() {
        let cancel = CancelFlag::new();
        let observed = cancel.clone();
        let worker = tokio::task::spawn_blocking(move || {
            while !observed.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            "stopped"
        });

        let outcome = supervise(worker, &cancel, interrupts(1)).await.unwrap();

        assert!(matches!(outcome, Supervised::Finished("stopped")));
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_second_interrupt_abandons_worker() {
        let cancel = CancelFlag::new();
        let (release, blocked) = mpsc::channel::<()>();
        let worker = tokio::task::spawn_blocking(move || blocked.recv().is_ok());

        let outcome = supervise(worker, &cancel, interrupts(2)).await.unwrap();

        assert!(matches!(outcome, Supervised::Abandoned));
        assert!(cancel.is_cancelled());
        release.send(()).unwrap();
    }
}
