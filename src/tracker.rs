use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use crate::record::CallRecord;
use crate::value::Value;

/// Logical trace time, whole seconds taken from the most recent clock read.
pub type Second = i64;

/// Accumulated usage of one file descriptor. Created lazily on first
/// reference and never removed: a handle number reused after close is
/// treated as the same entity, which matches the trace-level view where
/// nothing ties a number to a particular open.
#[derive(Debug, Clone, Default)]
pub struct FdInfo {
    pub handle: i64,
    pub filename: Option<String>,

    pub count_reads: u64,
    pub count_zero_reads: u64,
    pub total_read_bytes: i64,

    pub count_writes: u64,
    pub total_written_bytes: i64,

    pub total_stats: u64,
    pub total_seeks: u64,

    pub read_count_stats: BTreeMap<Second, u64>,
    pub read_bytes_stats: BTreeMap<Second, i64>,
    pub write_count_stats: BTreeMap<Second, u64>,
    pub written_bytes_stats: BTreeMap<Second, i64>,
    pub stat_count_stats: BTreeMap<Second, u64>,
    pub seek_count_stats: BTreeMap<Second, u64>,

    pub first_access: Option<Second>,
    pub last_access: Option<Second>,

    /// Event name to the second it was last observed at; a repeat overwrites.
    pub events_seen: BTreeMap<String, Second>,
}

impl FdInfo {
    fn new(handle: i64) -> Self {
        FdInfo {
            handle,
            ..FdInfo::default()
        }
    }

    pub fn observe_event(&mut self, name: &str, when: Second) {
        self.events_seen.insert(name.to_string(), when);
    }
}

/// Sequential reducer over parsed call records. Owns the fd table and the
/// logical clock; handlers mutate it through `&mut self` only for the
/// duration of one record.
#[derive(Debug, Default)]
pub struct Tracker {
    pub fds: BTreeMap<i64, FdInfo>,
    timestamp: Option<Second>,
    pub first_timestamp: Option<Second>,
    pub last_timestamp: Option<Second>,
    /// Per-call-name invocation counts bucketed by second, every record.
    pub call_stats: BTreeMap<String, BTreeMap<Second, u64>>,
}

type Handler = fn(&mut Tracker, &CallRecord);

/// Syscall name to accounting handler. Names missing here are tolerated:
/// they only feed the general call distribution. Accounting one more
/// syscall means one more entry, the reducer loop stays untouched.
static HANDLERS: LazyLock<HashMap<&'static str, Handler>> = LazyLock::new(|| {
    let mut table: HashMap<&'static str, Handler> = HashMap::new();
    table.insert("gettimeofday", Tracker::on_gettimeofday);
    table.insert("open", Tracker::on_open);
    table.insert("openat", Tracker::on_openat);
    table.insert("close", Tracker::on_close);
    for name in ["read", "readv", "recv", "recvfrom"] {
        table.insert(name, Tracker::on_read);
    }
    for name in ["write", "writev", "send", "sendto"] {
        table.insert(name, Tracker::on_write);
    }
    for name in ["fstat", "fstat64"] {
        table.insert(name, Tracker::on_stat);
    }
    for name in ["lseek", "_llseek"] {
        table.insert(name, Tracker::on_seek);
    }
    table.insert("connect", Tracker::on_connect);
    table.insert("getpeername", Tracker::on_getpeername);
    table.insert("select", Tracker::on_multiplex);
    table.insert("poll", Tracker::on_multiplex);
    table
});

impl Tracker {
    pub fn new() -> Self {
        Tracker::default()
    }

    /// Current logical second. Before the first clock read everything is
    /// attributed to second zero; the clock itself stays explicitly absent
    /// so a genuine epoch-zero read is distinguishable.
    pub fn now(&self) -> Second {
        self.timestamp.unwrap_or(0)
    }

    /// Feed one record. Dispatches to the handler if one is registered,
    /// then unconditionally counts the call in the general distribution.
    pub fn process(&mut self, record: &CallRecord) {
        if let Some(handler) = HANDLERS.get(record.func.as_str()) {
            handler(self, record);
        }
        let now = self.now();
        *self
            .call_stats
            .entry(record.func.clone())
            .or_default()
            .entry(now)
            .or_insert(0) += 1;
    }

    /// Resolve or create the entry for a handle. A supplied filename
    /// overwrites any earlier label. Assumes sequential access: every
    /// lookup moves `last_access` forward to the current second.
    fn get_fd(&mut self, handle: i64, filename: Option<String>) -> &mut FdInfo {
        let now = self.now();
        let fd = self.fds.entry(handle).or_insert_with(|| FdInfo::new(handle));
        if filename.is_some() {
            fd.filename = filename;
        }
        if fd.first_access.is_none() {
            fd.first_access = Some(now);
        }
        fd.last_access = Some(now);
        fd
    }

    fn on_gettimeofday(&mut self, record: &CallRecord) {
        let secs = record
            .arg(0)
            .and_then(|tv| tv.item(0))
            .and_then(Value::as_int);
        let Some(secs) = secs else { return };
        self.timestamp = Some(secs);
        if self.first_timestamp.is_none() {
            self.first_timestamp = Some(secs);
        }
        self.last_timestamp = Some(secs);
    }

    fn on_open(&mut self, record: &CallRecord) {
        // A negative handle is a failed open; no entry is created for it.
        if record.return_value < 0 {
            return;
        }
        let filename = record.arg(0).and_then(Value::as_text);
        let now = self.now();
        self.get_fd(record.return_value, filename)
            .observe_event("open", now);
    }

    fn on_openat(&mut self, record: &CallRecord) {
        if record.return_value < 0 {
            return;
        }
        let filename = record.arg(1).and_then(Value::as_text);
        let now = self.now();
        self.get_fd(record.return_value, filename)
            .observe_event("open", now);
    }

    fn on_close(&mut self, record: &CallRecord) {
        let Some(handle) = record.arg(0).and_then(Value::as_int) else {
            return;
        };
        // Recorded as an event only; the entry stays in the table.
        let now = self.now();
        self.get_fd(handle, None).observe_event("close", now);
    }

    fn on_read(&mut self, record: &CallRecord) {
        let Some(handle) = record.arg(0).and_then(Value::as_int) else {
            return;
        };
        let bytes = record.return_value;
        let now = self.now();
        let fd = self.get_fd(handle, None);
        fd.count_reads += 1;
        if bytes > 0 {
            fd.total_read_bytes += bytes;
            *fd.read_bytes_stats.entry(now).or_insert(0) += bytes;
        } else {
            fd.count_zero_reads += 1;
        }
        *fd.read_count_stats.entry(now).or_insert(0) += 1;
    }

    fn on_write(&mut self, record: &CallRecord) {
        let Some(handle) = record.arg(0).and_then(Value::as_int) else {
            return;
        };
        let bytes = record.return_value;
        let now = self.now();
        let fd = self.get_fd(handle, None);
        fd.count_writes += 1;
        fd.total_written_bytes += bytes;
        *fd.write_count_stats.entry(now).or_insert(0) += 1;
        *fd.written_bytes_stats.entry(now).or_insert(0) += bytes;
    }

    fn on_stat(&mut self, record: &CallRecord) {
        let Some(handle) = record.arg(0).and_then(Value::as_int) else {
            return;
        };
        let now = self.now();
        let fd = self.get_fd(handle, None);
        fd.total_stats += 1;
        *fd.stat_count_stats.entry(now).or_insert(0) += 1;
    }

    fn on_seek(&mut self, record: &CallRecord) {
        let Some(handle) = record.arg(0).and_then(Value::as_int) else {
            return;
        };
        let now = self.now();
        let fd = self.get_fd(handle, None);
        fd.total_seeks += 1;
        *fd.seek_count_stats.entry(now).or_insert(0) += 1;
    }

    fn on_connect(&mut self, record: &CallRecord) {
        let Some(handle) = record.arg(0).and_then(Value::as_int) else {
            return;
        };
        let label = connect_label(record);
        let now = self.now();
        self.get_fd(handle, label).observe_event("connect", now);
    }

    fn on_getpeername(&mut self, record: &CallRecord) {
        let Some(handle) = record.arg(0).and_then(Value::as_int) else {
            return;
        };
        // Access-time bookkeeping only.
        self.get_fd(handle, None);
    }

    fn on_multiplex(&mut self, _record: &CallRecord) {
        // select/poll reference many handles with no clean 1:1 attribution;
        // they only show up in the general call distribution.
    }
}

/// Destination label of a connect: the `sin_addr` field of the sockaddr
/// argument, unwrapping one cast level (`inet_addr("10.0.0.1")`).
fn connect_label(record: &CallRecord) -> Option<String> {
    let addr = record.arg(1)?.field("sin_addr")?;
    match addr {
        Value::Cast { args, .. } => args.first().and_then(Value::as_text),
        other => other.as_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_record;

    fn feed(tracker: &mut Tracker, lines: &[&str]) {
        for line in lines {
            let record = parse_record(line).unwrap_or_else(|e| panic!("parse {line:?}: {e}"));
            tracker.process(&record);
        }
    }

    #[test]
    fn test_open_read_close_lifecycle() {
        let mut tracker = Tracker::new();
        feed(
            &mut tracker,
            &[
                "open(\"/tmp/a\", O_RDONLY) = 3",
                "gettimeofday({100, 0}, NULL) = 0",
                "read(3, \"hi\", 4096) = 2",
                "close(3) = 0",
            ],
        );

        let fd = tracker.fds.get(&3).expect("fd 3 tracked");
        assert_eq!(fd.filename.as_deref(), Some("/tmp/a"));
        assert_eq!(fd.count_reads, 1);
        assert_eq!(fd.total_read_bytes, 2);
        assert_eq!(fd.count_zero_reads, 0);
        // The open happened before the first clock read.
        assert_eq!(fd.events_seen.get("open"), Some(&0));
        assert_eq!(fd.events_seen.get("close"), Some(&100));
    }

    #[test]
    fn test_zero_read_counts_separately() {
        let mut tracker = Tracker::new();
        feed(&mut tracker, &["read(5, \"\", 10) = 0"]);

        let fd = tracker.fds.get(&5).expect("fd 5 tracked");
        assert_eq!(fd.count_reads, 1);
        assert_eq!(fd.count_zero_reads, 1);
        assert_eq!(fd.total_read_bytes, 0);
        assert!(fd.read_bytes_stats.is_empty());
        assert_eq!(fd.read_count_stats.get(&0), Some(&1));
    }

    #[test]
    fn test_failed_open_creates_nothing() {
        let mut tracker = Tracker::new();
        feed(&mut tracker, &["open(\"/x\", O_RDONLY) = -1 ENOENT (No such file or directory)"]);

        assert!(tracker.fds.is_empty(), "failed open must not create an entry");
        // It still shows up in the call distribution.
        assert_eq!(tracker.call_stats["open"].get(&0), Some(&1));
    }

    #[test]
    fn test_unknown_syscall_is_tolerated() {
        let mut tracker = Tracker::new();
        feed(
            &mut tracker,
            &[
                "gettimeofday({50, 1}, NULL) = 0",
                "frobnicate(1, 2, 3) = 0",
                "frobnicate(4, 5, 6) = 0",
            ],
        );

        assert!(tracker.fds.is_empty());
        assert_eq!(tracker.call_stats["frobnicate"].get(&50), Some(&2));
    }

    #[test]
    fn test_clock_bounds() {
        let mut tracker = Tracker::new();
        feed(
            &mut tracker,
            &[
                "gettimeofday({100, 500}, NULL) = 0",
                "gettimeofday({103, 0}, NULL) = 0",
                "gettimeofday({101, 0}, NULL) = 0",
            ],
        );

        assert_eq!(tracker.first_timestamp, Some(100), "first write wins");
        assert_eq!(tracker.last_timestamp, Some(101), "every read updates");
        assert_eq!(tracker.now(), 101);
    }

    #[test]
    fn test_no_clock_read_yet() {
        let tracker = Tracker::new();
        assert_eq!(tracker.first_timestamp, None);
        assert_eq!(tracker.now(), 0);
    }

    #[test]
    fn test_writes_accumulate_unconditionally() {
        let mut tracker = Tracker::new();
        feed(
            &mut tracker,
            &[
                "gettimeofday({10, 0}, NULL) = 0",
                "write(4, \"abc\", 3) = 3",
                "writev(4, [{\"xy\", 2}], 1) = 2",
                "send(4, \"q\", 1, 0) = -1 EAGAIN (Resource temporarily unavailable)",
            ],
        );

        let fd = tracker.fds.get(&4).expect("fd 4 tracked");
        assert_eq!(fd.count_writes, 3);
        assert_eq!(fd.total_written_bytes, 4, "error returns are added as-is");
        assert_eq!(fd.write_count_stats.get(&10), Some(&3));
    }

    #[test]
    fn test_stat_and_seek_counters() {
        let mut tracker = Tracker::new();
        feed(
            &mut tracker,
            &[
                "gettimeofday({7, 0}, NULL) = 0",
                "fstat64(3, {st_mode=S_IFREG|0644, st_size=1997, ...}) = 0",
                "_llseek(3, 0, [0], SEEK_SET) = 0",
                "lseek(3, 128, SEEK_SET) = 128",
            ],
        );

        let fd = tracker.fds.get(&3).expect("fd 3 tracked");
        assert_eq!(fd.total_stats, 1);
        assert_eq!(fd.total_seeks, 2);
        assert_eq!(fd.seek_count_stats.get(&7), Some(&2));
    }

    #[test]
    fn test_connect_labels_from_sockaddr() {
        let mut tracker = Tracker::new();
        feed(
            &mut tracker,
            &[
                "gettimeofday({20, 0}, NULL) = 0",
                "connect(9, {sin_family=AF_INET, sin_port=htons(80), sin_addr=inet_addr(\"10.0.0.1\")}, 16) = 0",
            ],
        );

        let fd = tracker.fds.get(&9).expect("fd 9 tracked");
        assert_eq!(fd.filename.as_deref(), Some("10.0.0.1"));
        assert_eq!(fd.events_seen.get("connect"), Some(&20));
    }

    #[test]
    fn test_label_overwrite_on_reopen() {
        let mut tracker = Tracker::new();
        feed(
            &mut tracker,
            &[
                "open(\"/tmp/a\", O_RDONLY) = 3",
                "close(3) = 0",
                "open(\"/tmp/b\", O_RDONLY) = 3",
            ],
        );

        // Handle reuse is the same entity with a refreshed label.
        assert_eq!(tracker.fds.len(), 1);
        let fd = tracker.fds.get(&3).expect("fd 3 tracked");
        assert_eq!(fd.filename.as_deref(), Some("/tmp/b"));
        assert_eq!(fd.events_seen.len(), 2);
    }

    #[test]
    fn test_access_window_is_ordered() {
        let mut tracker = Tracker::new();
        feed(
            &mut tracker,
            &[
                "gettimeofday({100, 0}, NULL) = 0",
                "open(\"/tmp/a\", O_RDONLY) = 3",
                "gettimeofday({105, 0}, NULL) = 0",
                "read(3, \"x\", 1) = 1",
            ],
        );

        let fd = tracker.fds.get(&3).expect("fd 3 tracked");
        assert_eq!(fd.first_access, Some(100));
        assert_eq!(fd.last_access, Some(105));
        assert!(fd.first_access <= fd.last_access);
        assert!(fd.first_access >= tracker.first_timestamp);
        assert!(fd.last_access <= tracker.last_timestamp);
    }

    #[test]
    fn test_select_and_poll_touch_nothing() {
        let mut tracker = Tracker::new();
        feed(
            &mut tracker,
            &[
                "select(4, [3], [], NULL, NULL) = 1 (in [3])",
                "poll([{fd=4, events=POLLIN}], 1, 0) = 1 ([{fd=4, revents=POLLIN}])",
            ],
        );

        assert!(tracker.fds.is_empty());
        assert_eq!(tracker.call_stats.len(), 2);
    }
}
