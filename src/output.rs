//! Report output to the console and an optional file.
//!
//! Every line goes into an in-memory buffer when a file is configured, and to
//! the console when verbosity allows. The buffer is written out by
//! [`ReportWriter::finish`], which the caller runs whatever the outcome.

use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::PathBuf;

use tracing::{debug, info};

/// Console verbosity. `0` is silent, anything else is verbose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    Silent,
    #[default]
    Verbose,
}

impl From<u8> for Verbosity {
    fn from(level: u8) -> Self {
        if level == 0 {
            Verbosity::Silent
        } else {
            Verbosity::Verbose
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportConfig {
    pub output_file: Option<PathBuf>,
    pub verbosity: Verbosity,
}

pub struct ReportWriter<W = Stdout> {
    config: ReportConfig,
    buffer: Vec<String>,
    console: W,
}

impl ReportWriter<Stdout> {
    pub fn new(config: ReportConfig) -> Self {
        Self::with_console(config, io::stdout())
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn with_console(config: ReportConfig, console: W) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            console,
        }
    }

    /// Writes a report line to the file buffer and, if verbose, the console.
    ///
    /// The line is buffered even when the console write fails.
    pub fn emit(&mut self, line: impl Into<String>) -> io::Result<()> {
        let line = line.into();
        let printed = match self.config.verbosity {
            Verbosity::Verbose => writeln!(self.console, "{line}"),
            Verbosity::Silent => Ok(()),
        };
        self.buffer_line(line);
        printed
    }

    /// Writes a line to the file buffer only.
    pub fn emit_quiet(&mut self, line: impl Into<String>) {
        self.buffer_line(line.into());
    }

    fn buffer_line(&mut self, line: String) {
        if self.config.output_file.is_some() {
            self.buffer.push(line);
        }
    }

    /// Appends an unexpected failure, with its cause chain and any captured
    /// backtrace, to the file buffer. Nothing is printed.
    pub fn record_failure(&mut self, err: &anyhow::Error) {
        if self.config.output_file.is_none() {
            return;
        }

        self.emit_quiet("Exception Occurred!");
        self.emit_quiet("-".repeat(60));
        self.emit_quiet(format!("Error: {err}"));
        for cause in err.chain().skip(1) {
            self.emit_quiet(format!("Caused by: {cause}"));
        }

        let backtrace = err.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            self.emit_quiet("Backtrace:");
            for line in backtrace.to_string().lines() {
                self.emit_quiet(line);
            }
        }
    }

    /// Lines collected for the output file so far.
    pub fn buffered(&self) -> &[String] {
        &self.buffer
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    /// Writes the buffer to the output file, replacing any previous
    /// contents, then flushes the console.
    ///
    /// The file is written before the console is touched, so a closed stdout
    /// cannot lose it.
    pub fn finish(&mut self) -> io::Result<()> {
        self.write_file()?;
        self.console.flush()
    }

    fn write_file(&self) -> io::Result<()> {
        let Some(path) = &self.config.output_file else {
            debug!("No output file configured");
            return Ok(());
        };

        let mut file = BufWriter::new(File::create(path)?);
        for line in &self.buffer {
            writeln!(file, "{line}")?;
        }
        file.flush()?;

        info!(path = %path.display(), lines = self.buffer.len(), "Report written");
        Ok(())
    }
}
