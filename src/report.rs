use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;

use crate::tracker::{FdInfo, Second, Tracker};

/// Zero-filled per-second array spanning `[t0, t1]` inclusive, built from a
/// sparse count mapping. Keys outside the bounds are returned separately so
/// the caller can surface them as warnings instead of overflowing the array.
pub fn dense_series<T: Copy + Default>(
    sparse: &BTreeMap<Second, T>,
    t0: Second,
    t1: Second,
) -> (Vec<T>, Vec<Second>) {
    let len = if t1 >= t0 { (t1 - t0 + 1) as usize } else { 0 };
    let mut values = vec![T::default(); len];
    let mut dropped = Vec::new();
    for (&key, &value) in sparse {
        if key < t0 || key > t1 {
            dropped.push(key);
        } else {
            values[(key - t0) as usize] = value;
        }
    }
    (values, dropped)
}

#[derive(Debug, Clone, Serialize)]
pub struct FdEvent {
    pub name: String,
    /// Seconds since the start of the trace.
    pub at: Second,
}

/// Fully derived per-descriptor block. Offsets are relative to the trace's
/// first timestamp; the six series span the descriptor's access window.
#[derive(Debug, Clone, Serialize)]
pub struct FdReport {
    pub handle: i64,
    pub filename: Option<String>,
    pub first_access: Second,
    pub last_access: Second,
    pub reads: u64,
    pub zero_reads: u64,
    pub read_bytes: i64,
    pub writes: u64,
    pub written_bytes: i64,
    pub stats: u64,
    pub seeks: u64,
    pub reads_per_sec: Vec<u64>,
    pub writes_per_sec: Vec<u64>,
    pub read_bytes_per_sec: Vec<i64>,
    pub written_bytes_per_sec: Vec<i64>,
    pub stats_per_sec: Vec<u64>,
    pub seeks_per_sec: Vec<u64>,
    pub events: Vec<FdEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallDistribution {
    pub name: String,
    pub total: u64,
    pub per_sec: Vec<u64>,
}

/// The complete report: per-descriptor blocks ascending by handle, then the
/// per-syscall distribution sorted by name. Borrowing the tracker read-only,
/// everything here is derived; there is no hidden state.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub trace_file: Option<String>,
    pub elapsed_seconds: Second,
    pub fds: Vec<FdReport>,
    pub calls: Vec<CallDistribution>,
    pub warnings: Vec<String>,
}

impl Report {
    pub fn build(tracker: &Tracker, trace_file: Option<&str>) -> Report {
        let base = tracker.first_timestamp.unwrap_or(0);
        let last = tracker.last_timestamp.unwrap_or(base);
        let mut warnings = Vec::new();

        let fds = tracker
            .fds
            .values()
            .map(|fd| fd_report(fd, base, &mut warnings))
            .collect();

        let calls = tracker
            .call_stats
            .iter()
            .map(|(name, sparse)| {
                let (per_sec, dropped) = dense_series(sparse, base, last);
                for key in dropped {
                    warnings.push(format!(
                        "call {name}: sample at second {key} outside {base}..={last}"
                    ));
                }
                CallDistribution {
                    name: name.clone(),
                    total: per_sec.iter().sum(),
                    per_sec,
                }
            })
            .collect();

        Report {
            trace_file: trace_file.map(str::to_string),
            elapsed_seconds: last - base,
            fds,
            calls,
            warnings,
        }
    }

    /// Human-readable rendering. The layout is a convenience, the numbers
    /// are the contract.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if let Some(name) = &self.trace_file {
            writeln!(out, "{}", "*".repeat(60))?;
            writeln!(out, "* File: {name}")?;
            writeln!(out, "{}", "*".repeat(60))?;
        }
        writeln!(out, "{} seconds of trace", self.elapsed_seconds)?;
        writeln!(out)?;

        for fd in &self.fds {
            writeln!(out, "{}", ".".repeat(20))?;
            match &fd.filename {
                Some(name) => writeln!(out, "fd: {} {}", fd.handle, name)?,
                None => writeln!(out, "fd: {}", fd.handle)?,
            }
            writeln!(out, " first accessed at: {}", fd.first_access)?;
            writeln!(out, " last accessed at: {}", fd.last_access)?;
            writeln!(
                out,
                " {} reads ({} zero reads) totaling {} bytes",
                fd.reads, fd.zero_reads, fd.read_bytes
            )?;
            writeln!(out, " {} writes totaling {} bytes", fd.writes, fd.written_bytes)?;
            writeln!(out, " {} stats", fd.stats)?;
            writeln!(out, " {} seeks", fd.seeks)?;
            writeln!(out, " reads per sec: {:?}", fd.reads_per_sec)?;
            writeln!(out, " writes per sec: {:?}", fd.writes_per_sec)?;
            writeln!(out, " read bytes per sec: {:?}", fd.read_bytes_per_sec)?;
            writeln!(out, " written bytes per sec: {:?}", fd.written_bytes_per_sec)?;
            writeln!(out, " stats per sec: {:?}", fd.stats_per_sec)?;
            writeln!(out, " seeks per sec: {:?}", fd.seeks_per_sec)?;
            for event in &fd.events {
                writeln!(out, " event: {} at {}", event.name, event.at)?;
            }
        }

        writeln!(out, "{}", "!".repeat(60))?;
        writeln!(out, "General call distribution stats:")?;
        for call in &self.calls {
            writeln!(out, "{}: {} = {:?}", call.name, call.total, call.per_sec)?;
        }
        Ok(())
    }
}

fn fd_report(fd: &FdInfo, base: Second, warnings: &mut Vec<String>) -> FdReport {
    let first = fd.first_access.unwrap_or(base);
    let last = fd.last_access.unwrap_or(first);

    let reads_per_sec = checked_series("reads", fd.handle, &fd.read_count_stats, first, last, warnings);
    let writes_per_sec =
        checked_series("writes", fd.handle, &fd.write_count_stats, first, last, warnings);
    let stats_per_sec =
        checked_series("stats", fd.handle, &fd.stat_count_stats, first, last, warnings);
    let seeks_per_sec =
        checked_series("seeks", fd.handle, &fd.seek_count_stats, first, last, warnings);
    let read_bytes_per_sec =
        checked_series("read bytes", fd.handle, &fd.read_bytes_stats, first, last, warnings);
    let written_bytes_per_sec = checked_series(
        "written bytes",
        fd.handle,
        &fd.written_bytes_stats,
        first,
        last,
        warnings,
    );

    FdReport {
        handle: fd.handle,
        filename: fd.filename.clone(),
        first_access: first - base,
        last_access: last - base,
        reads: fd.count_reads,
        zero_reads: fd.count_zero_reads,
        read_bytes: fd.total_read_bytes,
        writes: fd.count_writes,
        written_bytes: fd.total_written_bytes,
        stats: fd.total_stats,
        seeks: fd.total_seeks,
        reads_per_sec,
        writes_per_sec,
        read_bytes_per_sec,
        written_bytes_per_sec,
        stats_per_sec,
        seeks_per_sec,
        events: fd
            .events_seen
            .iter()
            .map(|(name, when)| FdEvent {
                name: name.clone(),
                at: when - base,
            })
            .collect(),
    }
}

fn checked_series<T: Copy + Default>(
    name: &str,
    handle: i64,
    sparse: &BTreeMap<Second, T>,
    t0: Second,
    t1: Second,
    warnings: &mut Vec<String>,
) -> Vec<T> {
    let (values, dropped) = dense_series(sparse, t0, t1);
    for key in dropped {
        warnings.push(format!(
            "fd {handle}: {name} sample at second {key} outside {t0}..={t1}"
        ));
    }
    values
}
