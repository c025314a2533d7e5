//! File watching for the seeded `--data` and `--template` files.
//!
//! Uses notify crate for cross-platform file system events. Events arrive on
//! the notify callback thread and are only forwarded over a channel; the event
//! loop polls [`FileWatcher::take_change_ready`].
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// One watched file.
#[derive(Debug, Clone)]
struct Target {
    path: PathBuf,
    name: Option<OsString>,
}

/// Watches a set of files and emits one debounced notification per burst of
/// changes, whichever file they touch.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    roots: Vec<PathBuf>,
    targets: Vec<Target>,
    debounce: Duration,
    pending_since: Option<Instant>,
}

impl FileWatcher {
    /// Create a watcher for every path in `paths`.
    ///
    /// Each file's parent directory is watched non-recursively, since editors
    /// commonly save by replacing the file.
    ///
    /// # Errors
    /// Returns an error if the watcher cannot be created or a directory cannot be watched.
    pub fn new<P: AsRef<Path>>(paths: &[P], debounce: Duration) -> notify::Result<Self> {
        // Canonicalize so event paths from the OS (which are always absolute
        // and canonical) match our stored paths.
        let targets: Vec<Target> = paths
            .iter()
            .map(|path| {
                let path = path
                    .as_ref()
                    .canonicalize()
                    .unwrap_or_else(|_| path.as_ref().to_path_buf());
                let name = path.file_name().map(std::ffi::OsStr::to_os_string);
                Target { path, name }
            })
            .collect();

        let mut roots: Vec<PathBuf> = Vec::new();
        for target in &targets {
            let root = watch_root_for(&target.path);
            if !roots.contains(&root) {
                roots.push(root);
            }
        }

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        for root in &roots {
            watcher.watch(root, RecursiveMode::NonRecursive)?;
        }
        tracing::debug!(files = targets.len(), dirs = roots.len(), "watching seeded files");

        Ok(Self {
            _watcher: watcher,
            rx,
            roots,
            targets,
            debounce,
            pending_since: None,
        })
    }

    /// Canonical paths of the watched files.
    pub fn target_paths(&self) -> impl Iterator<Item = &Path> {
        self.targets.iter().map(|target| target.path.as_path())
    }

    /// Returns true once a debounced file change is ready.
    pub fn take_change_ready(&mut self) -> bool {
        let mut saw_relevant_event = false;
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(ev) if self.is_relevant(&ev) => saw_relevant_event = true,
                Ok(ev) => {
                    tracing::trace!(kind = ?ev.kind, paths = ?ev.paths, "ignoring watcher event");
                }
                Err(err) => tracing::warn!(%err, "file watcher error"),
            }
        }

        if saw_relevant_event {
            self.pending_since = Some(Instant::now());
        }

        let Some(pending_since) = self.pending_since else {
            return false;
        };
        if pending_since.elapsed() >= self.debounce {
            self.pending_since = None;
            return true;
        }
        false
    }

    fn is_relevant(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            self.roots.contains(path)
                || self.targets.iter().any(|target| {
                    path == &target.path
                        || target
                            .name
                            .as_ref()
                            .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
                })
        })
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use tempfile::tempdir;

    fn event_for(path: PathBuf) -> Event {
        Event {
            kind: EventKind::Any,
            paths: vec![path],
            attrs: notify::event::EventAttributes::new(),
        }
    }

    #[test]
    fn test_directory_level_event_is_relevant() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("data.json");
        std::fs::write(&path, "{}").expect("write");
        let watcher = FileWatcher::new(&[&path], Duration::from_millis(10)).expect("watcher");

        assert!(watcher.is_relevant(&event_for(canonical_dir)));
    }

    #[test]
    fn test_event_for_either_file_is_relevant() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let data = canonical_dir.join("data.json");
        let template = canonical_dir.join("template.vtl");
        std::fs::write(&data, "{}").expect("write");
        std::fs::write(&template, "$x").expect("write");
        let watcher =
            FileWatcher::new(&[&data, &template], Duration::from_millis(10)).expect("watcher");

        assert!(watcher.is_relevant(&event_for(data)));
        assert!(watcher.is_relevant(&event_for(template)));
        assert_eq!(watcher.roots.len(), 1);
        assert_eq!(watcher.target_paths().count(), 2);
    }

    #[test]
    fn test_unrelated_file_in_other_directory_is_ignored() {
        let watched = tempdir().expect("tempdir");
        let other = tempdir().expect("tempdir");
        let path = watched.path().join("data.json");
        std::fs::write(&path, "{}").expect("write");
        let watcher = FileWatcher::new(&[&path], Duration::from_millis(10)).expect("watcher");

        let unrelated = other.path().canonicalize().expect("canonicalize").join("notes.txt");
        assert!(!watcher.is_relevant(&event_for(unrelated)));
    }

    #[test]
    fn test_watch_root_for_relative_file_is_dot() {
        let root = watch_root_for(Path::new("template.vtl"));
        assert_eq!(root, PathBuf::from("."));
    }

    #[test]
    fn test_real_modification_detected() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("template.vtl");
        std::fs::write(&path, "original").expect("write");

        let mut watcher = FileWatcher::new(&[&path], Duration::from_millis(200)).expect("watcher");

        // Give the backend time to register the watch
        std::thread::sleep(Duration::from_millis(500));

        std::fs::write(&path, "modified by another process").expect("write");

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut detected = false;
        while Instant::now() < deadline {
            if watcher.take_change_ready() {
                detected = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(250));
        }

        assert!(detected, "watcher should report the modification within 5 seconds");
    }
}
