use crate::record::parse_record;
use crate::report::Report;
use crate::tracker::Tracker;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Interrupted-call restart lines carry no accountable work; they are
/// skipped before the grammar ever sees them.
const RESTART_PREFIX: &str = "restart_syscall(";

#[derive(Debug, Clone, Default)]
pub struct ProcessStats {
    pub total_lines: usize,
    pub skipped_lines: usize,
    pub processed_lines: usize,
}

/// Process a single trace file with a fresh tracker and build its report.
///
/// The first line that fails the grammar aborts the whole file; the error
/// carries the line number, the raw line, and the byte offset inside it.
pub fn process_file(path: &Path) -> Result<(Report, ProcessStats)> {
    let file =
        File::open(path).context(format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let filename = path.file_name().and_then(|n| n.to_str());
    process_lines(reader, filename)
}

/// Same as `process_file` but over any line source.
pub fn process_lines<R: BufRead>(
    reader: R,
    trace_file: Option<&str>,
) -> Result<(Report, ProcessStats)> {
    let mut tracker = Tracker::new();
    let mut stats = ProcessStats::default();

    for (index, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        stats.total_lines += 1;

        if line.trim().is_empty() || line.starts_with(RESTART_PREFIX) {
            stats.skipped_lines += 1;
            continue;
        }

        let record = parse_record(&line)
            .with_context(|| format!("line {}: failed to parse {:?}", index + 1, line))?;
        tracker.process(&record);
        stats.processed_lines += 1;
    }

    Ok((Report::build(&tracker, trace_file), stats))
}
