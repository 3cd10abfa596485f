//! Pipeline renderers
//!
//! Both renderers consume full snapshots and implement `PipelineObserver`:
//! the terminal renderer prints one checkbox line per stage transition, the
//! JSON renderer writes every snapshot as one JSON line.

use bocker_core::domain::pipeline::{PipelineSnapshot, PipelineState, StageState};
use bocker_runner::PipelineObserver;
use clap::ValueEnum;
use colored::*;
use std::io::Write;

/// Output format for progress and listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored checklist
    Human,
    /// One JSON document per line
    Json,
}

/// Creates the renderer for `format`, writing to stdout
pub fn renderer(format: OutputFormat) -> Box<dyn PipelineObserver> {
    match format {
        OutputFormat::Human => Box::new(TerminalRenderer::new(std::io::stdout())),
        OutputFormat::Json => Box::new(JsonRenderer::new(std::io::stdout())),
    }
}

/// Prints a stage line whenever a stage changes state
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    last: Vec<StageState>,
    finished: bool,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last: Vec::new(),
            finished: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, snapshot: &PipelineSnapshot) -> std::io::Result<()> {
        if self.last.len() != snapshot.stages.len() {
            self.last = vec![StageState::Pending; snapshot.stages.len()];
        }

        for (index, stage) in snapshot.stages.iter().enumerate() {
            if self.last[index] == stage.state {
                continue;
            }
            self.last[index] = stage.state;

            match stage.state {
                StageState::Pending => {}
                StageState::Active => {
                    writeln!(self.out, "{} {}...", "[ ]".dimmed(), stage.name)?;
                }
                StageState::Complete => {
                    writeln!(self.out, "{} {}", "[✓]".green(), stage.name)?;
                }
                StageState::Failed => {
                    writeln!(self.out, "{} {}", "[✗]".red(), stage.name.bold())?;
                    if let Some(error) = &stage.error {
                        writeln!(self.out, "    {}", error.red())?;
                    }
                }
            }
        }

        if snapshot.state.is_terminal() && !self.finished {
            self.finished = true;
            let summary = match snapshot.state {
                PipelineState::Done => format!("{} finished", snapshot.name).green().bold(),
                PipelineState::Halted => format!("{} halted", snapshot.name).red().bold(),
                _ => format!("{} cancelled", snapshot.name).yellow().bold(),
            };
            writeln!(self.out, "{}", summary)?;
        }

        self.out.flush()
    }
}

impl<W: Write + Send> PipelineObserver for TerminalRenderer<W> {
    fn on_snapshot(&mut self, snapshot: &PipelineSnapshot) {
        // a closed stdout must not abort the pipeline
        let _ = self.render(snapshot);
    }
}

/// Writes each snapshot as a single JSON line
pub struct JsonRenderer<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> PipelineObserver for JsonRenderer<W> {
    fn on_snapshot(&mut self, snapshot: &PipelineSnapshot) {
        if let Ok(line) = serde_json::to_string(snapshot) {
            let _ = writeln!(self.out, "{}", line);
            let _ = self.out.flush();
        }
    }
}
