//! Token list ingestion.
//!
//! Reads newline-delimited range tokens, applies the family filter and
//! merges everything into an [`IntervalSet`]. Bad lines are logged and
//! counted; they never abort the batch.

use flate2::read::GzDecoder;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::AddAssign;
use std::path::Path;

use crate::error::{ParseError, Result};
use crate::{parse, FamilyFilter, IntervalSet};

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Outcome counts for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Tokens parsed and inserted into the set
    pub accepted: usize,
    /// Blank lines and `#` comments
    pub skipped: usize,
    /// Tokens that are not a valid network or address
    pub malformed: usize,
    /// Valid tokens of a family the filter excludes
    pub filtered: usize,
}

impl IngestReport {
    /// Lines looked at.
    pub fn total(&self) -> usize {
        self.accepted + self.skipped + self.malformed + self.filtered
    }
}

impl AddAssign for IngestReport {
    fn add_assign(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.skipped += other.skipped;
        self.malformed += other.malformed;
        self.filtered += other.filtered;
    }
}

/// Open a token list for line reading, `-` meaning stdin.
///
/// Gzip-compressed files are detected by their magic bytes.
pub fn open_token_source(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }

    let mut reader = BufReader::new(File::open(path)?);
    if reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
        log::debug!("Reading gzip-compressed token list {:?}", path);
        return Ok(Box::new(BufReader::new(GzDecoder::new(reader))));
    }
    Ok(Box::new(reader))
}

/// Feeds token lines into an interval set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ingestor {
    filter: FamilyFilter,
}

impl Ingestor {
    /// Create an ingestor keeping only families in `filter`.
    pub fn new(filter: FamilyFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> FamilyFilter {
        self.filter
    }

    /// Handle one line. `line_no` is 1-based and only used for logging.
    pub fn ingest_line(
        &self,
        set: &mut IntervalSet,
        line_no: usize,
        line: &str,
        report: &mut IngestReport,
    ) {
        let token = line.trim();
        if token.starts_with('#') {
            report.skipped += 1;
            return;
        }

        match parse(token) {
            Ok(interval) if self.filter.accepts(interval.family()) => {
                set.insert(interval);
                report.accepted += 1;
            }
            Ok(interval) => {
                log::debug!(
                    "Line {}: dropping {} range {}",
                    line_no,
                    interval.family(),
                    interval
                );
                report.filtered += 1;
            }
            Err(ParseError::Empty) => report.skipped += 1,
            Err(e) => {
                log::warn!("Line {}: {}", line_no, e);
                report.malformed += 1;
            }
        }
    }

    /// Ingest every line of `reader`.
    ///
    /// Only read errors are returned; token errors are counted in the report.
    pub fn ingest_reader<R: BufRead>(&self, set: &mut IntervalSet, reader: R) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            self.ingest_line(set, idx + 1, &line, &mut report);
        }
        Ok(report)
    }

    /// Ingest a token file, see [`open_token_source`].
    pub fn ingest_path(&self, set: &mut IntervalSet, path: &Path) -> Result<IngestReport> {
        self.ingest_reader(set, open_token_source(path)?)
    }

    /// Parse `lines` on up to `threads` workers and merge into `set`.
    ///
    /// Each worker builds a private set from its chunk, then takes the
    /// shared set's lock once to merge it. The result is the same as
    /// ingesting the lines in order on one thread.
    pub fn ingest_concurrent(
        &self,
        set: &mut IntervalSet,
        lines: &[String],
        threads: usize,
    ) -> IngestReport {
        let threads = threads.max(1);
        if threads == 1 || lines.len() < threads * 2 {
            let mut report = IngestReport::default();
            for (idx, line) in lines.iter().enumerate() {
                self.ingest_line(set, idx + 1, line, &mut report);
            }
            return report;
        }

        let chunk_size = lines.len().div_ceil(threads);
        let shared = Mutex::new((std::mem::take(set), IngestReport::default()));

        std::thread::scope(|scope| {
            for (chunk_idx, chunk) in lines.chunks(chunk_size).enumerate() {
                let shared = &shared;
                scope.spawn(move || {
                    let mut local = IntervalSet::new();
                    let mut report = IngestReport::default();
                    let first_line = chunk_idx * chunk_size + 1;
                    for (offset, line) in chunk.iter().enumerate() {
                        self.ingest_line(&mut local, first_line + offset, line, &mut report);
                    }

                    let mut guard = shared.lock();
                    guard.0.merge(local);
                    guard.1 += report;
                });
            }
        });

        let (merged, report) = shared.into_inner();
        *set = merged;
        report
    }
}
