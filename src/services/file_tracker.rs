//! File Read/Write Time Tracking
//!
//! Records, per absolute path, when a tool last read and last wrote the
//! file. The write tools compare the on-disk modification time against the
//! recorded last-read time to detect edits made outside the assistant (the
//! optimistic concurrency check). Process-local and never persisted.
//!
//! The tracker does not serialize concurrent tool calls touching the same
//! path; it only detects external edits. The stat-then-write window between
//! two in-flight calls on one path is accepted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy)]
struct FileStamp {
    last_read: SystemTime,
    last_write: SystemTime,
}

impl Default for FileStamp {
    fn default() -> Self {
        Self {
            last_read: SystemTime::UNIX_EPOCH,
            last_write: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Tracks last-read and last-write times per path.
///
/// Thread-safe; wrap in `Arc` and share across concurrent tool calls.
/// Timestamps are monotonic per path: recording never moves one backward.
#[derive(Debug, Default)]
pub struct FileTimeTracker {
    stamps: Mutex<HashMap<PathBuf, FileStamp>>,
}

impl FileTimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a tool read the file now.
    pub fn record_read(&self, path: &Path) {
        self.record_read_at(path, SystemTime::now());
    }

    /// Record that a tool wrote the file now.
    pub fn record_write(&self, path: &Path) {
        self.record_write_at(path, SystemTime::now());
    }

    /// When the file was last read by a tool, or `UNIX_EPOCH` if never.
    pub fn last_read(&self, path: &Path) -> SystemTime {
        self.stamps
            .lock()
            .expect("file tracker lock poisoned")
            .get(path)
            .map(|s| s.last_read)
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    /// When the file was last written by a tool, or `UNIX_EPOCH` if never.
    pub fn last_write(&self, path: &Path) -> SystemTime {
        self.stamps
            .lock()
            .expect("file tracker lock poisoned")
            .get(path)
            .map(|s| s.last_write)
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    fn record_read_at(&self, path: &Path, at: SystemTime) {
        let mut stamps = self.stamps.lock().expect("file tracker lock poisoned");
        let stamp = stamps.entry(path.to_path_buf()).or_default();
        stamp.last_read = stamp.last_read.max(at);
    }

    fn record_write_at(&self, path: &Path, at: SystemTime) {
        let mut stamps = self.stamps.lock().expect("file tracker lock poisoned");
        let stamp = stamps.entry(path.to_path_buf()).or_default();
        stamp.last_write = stamp.last_write.max(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_unseen_path_returns_epoch() {
        let tracker = FileTimeTracker::new();
        assert_eq!(tracker.last_read(Path::new("/nope")), SystemTime::UNIX_EPOCH);
        assert_eq!(tracker.last_write(Path::new("/nope")), SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_record_read_advances_timestamp() {
        let tracker = FileTimeTracker::new();
        let path = Path::new("/work/a.txt");
        tracker.record_read(path);
        assert!(tracker.last_read(path) > SystemTime::UNIX_EPOCH);
        assert_eq!(tracker.last_write(path), SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_timestamps_never_move_backward() {
        let tracker = FileTimeTracker::new();
        let path = Path::new("/work/a.txt");
        let later = SystemTime::now() + Duration::from_secs(60);
        tracker.record_read_at(path, later);
        tracker.record_read(path); // "now" is earlier than the recorded time
        assert_eq!(tracker.last_read(path), later);
    }

    #[test]
    fn test_read_and_write_tracked_independently() {
        let tracker = FileTimeTracker::new();
        let path = Path::new("/work/a.txt");
        let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let t2 = SystemTime::UNIX_EPOCH + Duration::from_secs(200);
        tracker.record_read_at(path, t1);
        tracker.record_write_at(path, t2);
        assert_eq!(tracker.last_read(path), t1);
        assert_eq!(tracker.last_write(path), t2);
    }

    #[test]
    fn test_concurrent_recording() {
        let tracker = Arc::new(FileTimeTracker::new());
        let mut handles = vec![];
        for i in 0..8 {
            let tracker = Arc::clone(&tracker);
            handles.push(std::thread::spawn(move || {
                let path = PathBuf::from(format!("/work/{}.txt", i % 2));
                for _ in 0..100 {
                    tracker.record_read(&path);
                    tracker.record_write(&path);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(tracker.last_read(Path::new("/work/0.txt")) > SystemTime::UNIX_EPOCH);
        assert!(tracker.last_write(Path::new("/work/1.txt")) > SystemTime::UNIX_EPOCH);
    }
}
