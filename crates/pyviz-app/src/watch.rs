//! Polling file watcher driving live re-execution.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Reports a file's contents whenever its modification time changes. The
/// first poll always reports.
pub struct FileWatcher {
    path: PathBuf,
    interval: Duration,
    last_modified: Option<SystemTime>,
}

impl FileWatcher {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self { path: path.into(), interval, last_modified: None }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn interval(&self) -> Duration { self.interval }

    /// New contents if the file changed since the last poll.
    pub fn poll(&mut self) -> io::Result<Option<String>> {
        let modified = fs::metadata(&self.path)?.modified()?;
        if self.last_modified == Some(modified) {
            return Ok(None);
        }
        let source = fs::read_to_string(&self.path)?;
        self.last_modified = Some(modified);
        debug!(path = %self.path.display(), "change detected");
        Ok(Some(source))
    }
}

/// Polls forever, calling `on_change` with each new version. A run completes
/// before the next poll; returning `false` stops the loop. Read errors after
/// the first successful read are logged and retried.
pub fn watch<F>(path: &Path, interval: Duration, mut on_change: F) -> io::Result<()>
where
    F: FnMut(&str) -> bool,
{
    let mut watcher = FileWatcher::new(path, interval);
    let first = watcher.poll()?.unwrap_or_default();
    if !on_change(&first) {
        return Ok(());
    }
    loop {
        thread::sleep(watcher.interval());
        match watcher.poll() {
            Ok(Some(source)) => {
                if !on_change(&source) {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "cannot read watched file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn reports_only_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.py");
        fs::write(&path, "x = 1").unwrap();

        let mut watcher = FileWatcher::new(&path, DEFAULT_INTERVAL);
        assert_eq!(watcher.poll().unwrap().as_deref(), Some("x = 1"));
        assert_eq!(watcher.poll().unwrap(), None);

        fs::write(&path, "x = 2").unwrap();
        let later = SystemTime::now() + Duration::from_secs(5);
        File::options().write(true).open(&path).unwrap().set_modified(later).unwrap();
        assert_eq!(watcher.poll().unwrap().as_deref(), Some("x = 2"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = FileWatcher::new(dir.path().join("nope.py"), DEFAULT_INTERVAL);
        assert!(watcher.poll().is_err());
    }

    #[test]
    fn callback_can_stop_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.py");
        fs::write(&path, "print(1)").unwrap();
        let mut seen = Vec::new();
        watch(&path, Duration::from_millis(1), |src| {
            seen.push(src.to_string());
            false
        })
        .unwrap();
        assert_eq!(seen, vec!["print(1)".to_string()]);
    }
}
