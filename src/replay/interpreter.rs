//! Replay driver - feeds decoded log lines to a [`BufferPool`].

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use cmapool_mm::{RangeAllocator, RangeManager};
use tracing::{error, info, trace, warn};

use crate::buffer::BufferPool;
use crate::common::{Error, PoolConfig, Result};
use crate::replay::command::{parse_line, Command, LogCommand};
use crate::replay::LineReader;

/// A non-fatal problem found while replaying, tied to its log line.
#[derive(Debug)]
pub struct Diagnostic {
    /// Line number (1-based, counted in reader chunks).
    pub line: usize,
    /// What went wrong.
    pub error: Error,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

/// Summary of a replay.
#[derive(Debug, Default)]
pub struct ReplayReport {
    /// Lines read, relevant or not.
    pub lines: usize,
    /// Lines that decoded to a command.
    pub commands: usize,
    /// Everything reported along the way, in log order.
    pub diagnostics: Vec<Diagnostic>,
}

impl ReplayReport {
    /// Check whether nothing was reported.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Diagnostics of lines that could not be decoded.
    pub fn parse_errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.error.is_parse_error())
    }

    /// Line numbers that produced a diagnostic.
    pub fn lines_with_errors(&self) -> Vec<usize> {
        self.diagnostics.iter().map(|d| d.line).collect()
    }
}

/// Replays a buffer-object log against a simulated pool.
///
/// Every line is processed to completion before the next one is read.
/// Parse errors and logical errors are logged, recorded in the
/// [`ReplayReport`] and skipped over; only fatal allocator faults stop the
/// replay.
///
/// # Example
/// ```
/// use cmapool::{BufferId, PoolConfig, Replayer};
///
/// let log = "\
/// [    0.100000] @@@ create 1 1000
/// [    0.200000] @@@ destroy dead
/// [    0.300000] @@@ use 1
/// ";
///
/// let mut replayer = Replayer::new(PoolConfig::new(2000).with_alignment(1)).unwrap();
/// replayer.replay(log.as_bytes()).unwrap();
///
/// assert!(replayer.pool().is_paged_in(BufferId::new(1)));
/// assert_eq!(replayer.report().lines_with_errors(), vec![2]);
/// ```
pub struct Replayer<A: RangeAllocator = RangeManager> {
    pool: BufferPool<A>,
    report: ReplayReport,
}

impl Replayer<RangeManager> {
    /// Create a replayer with a fresh pool.
    ///
    /// # Errors
    /// - `Error::Config` if the config doesn't validate
    pub fn new(config: PoolConfig) -> Result<Self> {
        Ok(Self::with_pool(BufferPool::new(config)?))
    }
}

impl<A: RangeAllocator> Replayer<A> {
    /// Create a replayer driving an existing pool.
    pub fn with_pool(pool: BufferPool<A>) -> Self {
        Self {
            pool,
            report: ReplayReport::default(),
        }
    }

    /// The pool being driven.
    pub fn pool(&self) -> &BufferPool<A> {
        &self.pool
    }

    /// The pool being driven, for direct manipulation.
    pub fn pool_mut(&mut self) -> &mut BufferPool<A> {
        &mut self.pool
    }

    /// What has been reported so far.
    pub fn report(&self) -> &ReplayReport {
        &self.report
    }

    /// Replay every line of `reader`.
    ///
    /// # Errors
    /// - `Error::Io` if reading fails
    /// - The first fatal fault; lines after it are not processed
    pub fn replay<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for item in LineReader::new(reader) {
            let (line_num, line) = item?;
            self.process_line(line_num, &line)?;
        }

        info!(
            lines = self.report.lines,
            commands = self.report.commands,
            diagnostics = self.report.diagnostics.len(),
            "replay finished: {}",
            self.pool.stats().snapshot()
        );

        Ok(())
    }

    /// Decode and execute a single line.
    ///
    /// # Errors
    /// Only fatal faults; everything else is recorded as a [`Diagnostic`].
    pub fn process_line(&mut self, line_num: usize, line: &str) -> Result<()> {
        self.report.lines += 1;

        let command = match parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(()),
            Err(e) => {
                self.diagnose(line_num, e);
                return Ok(());
            }
        };

        self.report.commands += 1;
        trace!(
            line = line_num,
            timestamp = ?command.timestamp,
            buffer = %command.buffer,
            command = %command.command,
            "executing"
        );

        match self.execute(&command) {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => {
                error!(line = line_num, "line {line_num}: {e}");
                Err(e)
            }
            Err(e) => {
                self.diagnose(line_num, e);
                Ok(())
            }
        }
    }

    /// Apply a decoded command to the pool.
    ///
    /// # Errors
    /// Whatever the pool operation reports.
    pub fn execute(&mut self, command: &LogCommand) -> Result<()> {
        let id = command.buffer;

        match command.command {
            Command::Create { size, pinned } => self.pool.create(id, size, pinned),
            Command::Destroy => self.pool.destroy(id),
            Command::AddUsecnt => self.pool.add_usecnt(id),
            Command::RemoveUsecnt => self.pool.remove_usecnt(id),
            Command::Use => self.pool.use_buffer(id),
            Command::Madvise(advice) => self.pool.set_advice(id, advice),
        }
    }

    /// Tear the pool down and hand back the report.
    ///
    /// # Errors
    /// Whatever [`BufferPool::shutdown`] reports.
    pub fn finish(self) -> Result<ReplayReport> {
        self.pool.shutdown()?;
        Ok(self.report)
    }

    fn diagnose(&mut self, line: usize, error: Error) {
        warn!(line, "line {line}: {error}");
        self.report.diagnostics.push(Diagnostic { line, error });
    }
}

// ============================================================================
// Convenience entry points
// ============================================================================

/// Replay a whole log from a reader and tear the pool down.
///
/// # Errors
/// - `Error::Config` if the config doesn't validate
/// - `Error::Io` if reading fails
/// - The first fatal fault
pub fn replay_reader<R: BufRead>(config: PoolConfig, reader: R) -> Result<ReplayReport> {
    let mut replayer = Replayer::new(config)?;
    replayer.replay(reader)?;
    replayer.finish()
}

/// Replay a log file.
///
/// # Errors
/// See [`replay_reader`]; opening the file can also fail with `Error::Io`.
pub fn replay_file(config: PoolConfig, path: impl AsRef<Path>) -> Result<ReplayReport> {
    let file = File::open(path)?;
    replay_reader(config, BufReader::new(file))
}
