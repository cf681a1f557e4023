//! Directory watcher that asks for a rescan when the browsed folder changes.
//!
//! Renames done by the app itself are recorded in [`SelfWrites`] and ignored
//! for a short window, so a tag edit does not trigger a redundant rescan.

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Default debounce duration in milliseconds.
const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Duration to suppress watcher events after an internal rename.
const SELF_WRITE_WINDOW_MS: u64 = 500;

#[derive(Clone, Debug)]
pub struct WatchConfig {
    pub root: PathBuf,
    pub recursive: bool,
    pub debounce_ms: u64,
}

impl WatchConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            recursive: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }
}

/// Sent when files under a watched root changed outside the app.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    pub root: PathBuf,
    pub paths: Vec<PathBuf>,
}

/// Paths recently written by the app (path -> time of the write).
#[derive(Clone, Default)]
pub struct SelfWrites(Arc<Mutex<HashMap<PathBuf, Instant>>>);

impl SelfWrites {
    pub fn record(&self, path: impl Into<PathBuf>) {
        if let Ok(mut registry) = self.0.lock() {
            registry.insert(path.into(), Instant::now());
        }
    }

    /// True if the path was written by the app within the suppression window.
    pub fn should_suppress(&self, path: &PathBuf) -> bool {
        let window = Duration::from_millis(SELF_WRITE_WINDOW_MS);
        let Ok(mut registry) = self.0.lock() else {
            return false;
        };
        match registry.get(path) {
            Some(written) if written.elapsed() < window => true,
            Some(_) => {
                registry.remove(path);
                false
            }
            None => false,
        }
    }

    /// Drops expired entries.
    pub fn cleanup(&self) {
        let window = Duration::from_millis(SELF_WRITE_WINDOW_MS);
        if let Ok(mut registry) = self.0.lock() {
            registry.retain(|_, written| written.elapsed() < window);
        }
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|registry| registry.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct ActiveWatch {
    debouncer: Debouncer<RecommendedWatcher>,
    _stop_tx: Sender<()>,
}

/// Owns one debounced watcher per root.
pub struct DirectoryWatcher {
    watchers: Mutex<HashMap<PathBuf, ActiveWatch>>,
    self_writes: SelfWrites,
    tx: UnboundedSender<WatchEvent>,
}

impl DirectoryWatcher {
    pub fn new(self_writes: SelfWrites) -> (Self, UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = unbounded_channel();
        let watcher = Self {
            watchers: Mutex::new(HashMap::new()),
            self_writes,
            tx,
        };
        (watcher, rx)
    }

    /// Starts watching a root. Watching the same root twice is a no-op.
    pub fn start_watching(&self, config: WatchConfig) -> Result<(), String> {
        let mut watchers = self.watchers.lock().map_err(|e| e.to_string())?;

        if watchers.contains_key(&config.root) {
            tracing::debug!(
                target: "core::watch",
                root = %config.root.display(),
                "Watcher already running"
            );
            return Ok(());
        }

        let (event_tx, event_rx) = channel::<Result<Vec<DebouncedEvent>, notify::Error>>();
        let (stop_tx, stop_rx) = channel::<()>();

        let mut debouncer = new_debouncer(Duration::from_millis(config.debounce_ms), event_tx)
            .map_err(|e| format!("Failed to create watcher: {}", e))?;

        let recursive_mode = if config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        debouncer
            .watcher()
            .watch(&config.root, recursive_mode)
            .map_err(|e| format!("Failed to watch path: {}", e))?;

        let root = config.root.clone();
        let tx = self.tx.clone();
        let self_writes = self.self_writes.clone();
        std::thread::spawn(move || {
            handle_events(event_rx, stop_rx, tx, root, self_writes);
        });

        tracing::info!(
            target: "core::watch",
            root = %config.root.display(),
            recursive = config.recursive,
            "Directory watcher started"
        );

        watchers.insert(
            config.root,
            ActiveWatch {
                debouncer,
                _stop_tx: stop_tx,
            },
        );

        Ok(())
    }

    pub fn stop_watching(&self, root: &PathBuf) -> Result<(), String> {
        let mut watchers = self.watchers.lock().map_err(|e| e.to_string())?;

        if let Some(mut watch) = watchers.remove(root) {
            let _ = watch.debouncer.watcher().unwatch(root);
            tracing::info!(
                target: "core::watch",
                root = %root.display(),
                "Directory watcher stopped"
            );
        }

        Ok(())
    }

    pub fn is_watching(&self, root: &PathBuf) -> bool {
        self.watchers
            .lock()
            .map(|watchers| watchers.contains_key(root))
            .unwrap_or(false)
    }

    pub fn active_roots(&self) -> Vec<PathBuf> {
        self.watchers
            .lock()
            .map(|watchers| watchers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Switches to a single root, dropping every other watch.
    pub fn watch_only(&self, config: WatchConfig) -> Result<(), String> {
        for root in self.active_roots() {
            if root != config.root {
                self.stop_watching(&root)?;
            }
        }
        self.start_watching(config)
    }

    pub fn stop_all(&self) -> Result<(), String> {
        for root in self.active_roots() {
            self.stop_watching(&root)?;
        }
        Ok(())
    }
}

fn handle_events(
    event_rx: Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    stop_rx: Receiver<()>,
    tx: UnboundedSender<WatchEvent>,
    root: PathBuf,
    self_writes: SelfWrites,
) {
    loop {
        // Sender is dropped together with the watch, which disconnects this
        if !matches!(stop_rx.try_recv(), Err(std::sync::mpsc::TryRecvError::Empty)) {
            break;
        }

        match event_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok(events)) => {
                let paths = external_paths(&events, &self_writes);
                self_writes.cleanup();
                if paths.is_empty() {
                    continue;
                }

                tracing::debug!(
                    target: "core::watch",
                    root = %root.display(),
                    changed = paths.len(),
                    "External change detected"
                );

                let event = WatchEvent {
                    root: root.clone(),
                    paths,
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
            Ok(Err(e)) => {
                tracing::error!(
                    target: "core::watch",
                    root = %root.display(),
                    error = %e,
                    "Watcher error"
                );
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                tracing::debug!(
                    target: "core::watch",
                    root = %root.display(),
                    "Watcher channel closed"
                );
                break;
            }
        }
    }
}

fn external_paths(events: &[DebouncedEvent], self_writes: &SelfWrites) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = events
        .iter()
        .map(|event| event.path.clone())
        .filter(|path| !self_writes.should_suppress(path))
        .collect();
    paths.sort();
    paths.dedup();
    paths
}
