//! Debounced filesystem watch driving the store's reload loop.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::sheet::SheetStore;

use super::{LedgerError, LedgerStore};

/// Handle keeping the watch alive. Dropping it stops the watcher and lets
/// the background thread wind down.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

fn is_relevant(event: &Event, file_name: Option<&OsStr>) -> bool {
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return false;
    }
    match file_name {
        Some(name) => event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == name)),
        None => true,
    }
}

/// Drains the channel until no *relevant* event arrives for one full quiet
/// window. Unrelated directory churn is discarded without extending the
/// window. Returns `false` when the sender disconnected.
fn settle(rx: &Receiver<Event>, debounce: Duration, relevant: impl Fn(&Event) -> bool) -> bool {
    let mut deadline = Instant::now() + debounce;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        match rx.recv_timeout(deadline - now) {
            Ok(event) => {
                if relevant(&event) {
                    deadline = Instant::now() + debounce;
                }
            }
            Err(RecvTimeoutError::Timeout) => return true,
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}

/// Watches the store's sheet file and calls [`LedgerStore::on_file_event`]
/// after each burst of change notifications.
///
/// The parent directory is watched rather than the file itself so editors
/// that replace the file (write-temp-then-rename) are still observed. Events
/// are debounced: after the first relevant event the thread keeps draining
/// until the quiet window holds, then fires a single reload check. The
/// reentrancy decision itself lives in the store.
pub fn watch_file<S>(store: Arc<LedgerStore<S>>) -> Result<FileWatcher, LedgerError>
where
    S: SheetStore + Send + 'static,
{
    let path = store.path();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let file_name = path.file_name().map(|n| n.to_os_string());
    let debounce = store.config().debounce();

    let (tx, rx) = mpsc::channel::<Event>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let _ = tx.send(event);
        }
        Err(e) => warn!(error = %e, "file watch error"),
    })
    .map_err(|e| LedgerError::Internal(format!("cannot create file watcher: {e}")))?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| LedgerError::Internal(format!("cannot watch {}: {e}", dir.display())))?;
    debug!(dir = %dir.display(), "file watch started");

    thread::spawn(move || {
        // Ends when the watcher (the only sender) is dropped.
        while let Ok(event) = rx.recv() {
            if !is_relevant(&event, file_name.as_deref()) {
                continue;
            }
            if !settle(&rx, debounce, |e| is_relevant(e, file_name.as_deref())) {
                return;
            }
            store.on_file_event();
        }
    });

    Ok(FileWatcher { _watcher: watcher })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, ModifyKind};
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn modify_event(path: &str) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Any)))
            .add_path(PathBuf::from(path))
    }

    #[test]
    fn relevance_checks_kind_and_file_name() {
        let name = OsString::from("budget.csv");
        assert!(is_relevant(&modify_event("data/budget.csv"), Some(&name)));
        assert!(!is_relevant(&modify_event("data/other.csv"), Some(&name)));

        let access = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("data/budget.csv"));
        assert!(!is_relevant(&access, Some(&name)));

        // No known file name: any modify counts.
        assert!(is_relevant(&modify_event("data/other.csv"), None));
    }

    #[test]
    fn unrelated_churn_does_not_extend_the_quiet_window() {
        let (tx, rx) = mpsc::channel();
        let churn = thread::spawn(move || {
            for _ in 0..20 {
                if tx.send(modify_event("data/other.csv")).is_err() {
                    return;
                }
                thread::sleep(Duration::from_millis(25));
            }
        });

        let name = OsString::from("budget.csv");
        let start = Instant::now();
        assert!(settle(&rx, Duration::from_millis(100), |e| {
            is_relevant(e, Some(&name))
        }));
        // The churn keeps going for ~500ms; settling must not wait it out.
        assert!(start.elapsed() < Duration::from_millis(400));
        churn.join().unwrap();
    }

    #[test]
    fn relevant_events_do_extend_the_quiet_window() {
        let (tx, rx) = mpsc::channel();
        let burst = thread::spawn(move || {
            for _ in 0..4 {
                tx.send(modify_event("data/budget.csv")).unwrap();
                thread::sleep(Duration::from_millis(40));
            }
        });

        let name = OsString::from("budget.csv");
        let start = Instant::now();
        assert!(settle(&rx, Duration::from_millis(100), |e| {
            is_relevant(e, Some(&name))
        }));
        // Three follow-up events 40ms apart each push the deadline out.
        assert!(start.elapsed() >= Duration::from_millis(200));
        burst.join().unwrap();
    }

    #[test]
    fn settle_reports_a_disconnected_sender() {
        let (tx, rx) = mpsc::channel::<Event>();
        drop(tx);
        assert!(!settle(&rx, Duration::from_millis(50), |_| true));
    }
}
