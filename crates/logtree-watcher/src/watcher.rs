//! Polling change watcher.
//!
//! Uses notify's PollWatcher to scan the tree at a fixed interval and
//! reports create, write and remove events on a single-slot channel.
//! A slow consumer loses older events; only the newest one is kept.

use crate::error::{Result, WatchError};
use crate::event::{ChangeEvent, ChangeKind};
use notify::{Config, Event, PollWatcher, RecursiveMode, Watcher};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// How often the tree is rescanned unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Events held for a consumer that hasn't caught up.
const EVENT_BUFFER: usize = 1;

/// Options for watching a directory.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory to watch, recursively.
    pub root: PathBuf,

    /// Delay between two scans of the tree.
    pub poll_interval: Duration,
}

impl WatchConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Lifecycle of a [`ChangeWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Configured, not yet observing.
    Idle,
    /// Scanning the tree.
    Watching,
    /// Stopped for good.
    Closed,
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Watching => "watching",
            Self::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// What travels over the event channel.
#[derive(Debug, Clone)]
enum Message {
    Change(ChangeEvent),
    Fatal(String),
}

/// Watches a directory tree for changes.
pub struct ChangeWatcher {
    config: WatchConfig,
    state: Arc<watch::Sender<WatcherState>>,
    poller: Option<PollWatcher>,
}

impl ChangeWatcher {
    /// Creates an idle watcher. Nothing is observed until [`start`](Self::start).
    pub fn new(config: WatchConfig) -> Self {
        let (state, _) = watch::channel(WatcherState::Idle);
        Self {
            config,
            state: Arc::new(state),
            poller: None,
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn state(&self) -> WatcherState {
        *self.state.borrow()
    }

    /// Registers the tree and starts polling it.
    ///
    /// Fails with [`WatchError::Setup`] if the root or one of its
    /// subdirectories can't be read; the watcher then stays idle.
    pub fn start(&mut self) -> Result<ChangeStream> {
        let state = self.state();
        if state != WatcherState::Idle {
            return Err(WatchError::InvalidState(state));
        }

        let root = self.config.root.clone();
        let directories = register_tree(&root)?;

        let (tx, rx) = broadcast::channel(EVENT_BUFFER);
        let forwarder = EventForwarder {
            root: root.clone(),
            events: tx,
            state: Arc::clone(&self.state),
            failed: false,
        };

        let config = Config::default().with_poll_interval(self.config.poll_interval);
        let mut poller =
            PollWatcher::new(forwarder, config).map_err(|e| WatchError::setup(&root, e))?;
        poller
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::setup(&root, e))?;

        self.poller = Some(poller);
        self.state.send_replace(WatcherState::Watching);

        info!(
            "Watching {} for changes ({} directories, every {:?})",
            root.display(),
            directories,
            self.config.poll_interval
        );

        Ok(ChangeStream {
            events: rx,
            state: self.state.subscribe(),
        })
    }

    /// Stops polling. Open streams are exhausted afterwards.
    ///
    /// A fatal error already moves the watcher to `Closed`; calling this
    /// afterwards still releases the poll thread.
    pub fn close(&mut self) {
        // Dropping the poller stops its scan thread.
        if self.poller.take().is_some() {
            info!("Stopped watching {}", self.config.root.display());
        }
        self.state.send_replace(WatcherState::Closed);
    }
}

/// Receiving end of a started watcher.
#[derive(Debug)]
pub struct ChangeStream {
    events: broadcast::Receiver<Message>,
    state: watch::Receiver<WatcherState>,
}

impl ChangeStream {
    /// Waits for the next change.
    ///
    /// Returns `Some(Err(WatchError::Fatal))` once if observation had to
    /// stop, and `None` after the watcher is closed. By the time the fatal
    /// error is returned the watcher is already `Closed`.
    pub async fn recv(&mut self) -> Option<Result<ChangeEvent>> {
        loop {
            if *self.state.borrow_and_update() == WatcherState::Closed {
                return self.take_fatal();
            }

            tokio::select! {
                biased;
                message = self.events.recv() => match message {
                    Ok(Message::Fatal(reason)) => {
                        // The forwarder closes right after sending.
                        let _ = self.state.wait_for(|s| *s == WatcherState::Closed).await;
                        return Some(Err(WatchError::Fatal(reason)));
                    }
                    Ok(message) => return Some(message.into_result()),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Dropped {} unconsumed change events", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                },
                changed = self.state.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }

    /// Returns the buffered change, if any, without waiting.
    pub fn try_next(&mut self) -> Option<Result<ChangeEvent>> {
        if *self.state.borrow() == WatcherState::Closed {
            return self.take_fatal();
        }

        loop {
            match self.events.try_recv() {
                Ok(message) => return Some(message.into_result()),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!("Dropped {} unconsumed change events", skipped);
                }
                Err(_) => return None,
            }
        }
    }

    /// After close, only a pending fatal error is still worth returning.
    fn take_fatal(&mut self) -> Option<Result<ChangeEvent>> {
        loop {
            match self.events.try_recv() {
                Ok(Message::Fatal(reason)) => return Some(Err(WatchError::Fatal(reason))),
                Ok(Message::Change(_)) | Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

impl Message {
    fn into_result(self) -> Result<ChangeEvent> {
        match self {
            Self::Change(event) => Ok(event),
            Self::Fatal(reason) => Err(WatchError::Fatal(reason)),
        }
    }
}

/// Runs on the poll thread and turns notify events into messages.
struct EventForwarder {
    root: PathBuf,
    events: broadcast::Sender<Message>,
    state: Arc<watch::Sender<WatcherState>>,
    failed: bool,
}

impl EventForwarder {
    fn send(&self, message: Message) {
        // Only fails when no stream is listening, which is fine.
        let _ = self.events.send(message);
    }

    fn fail(&mut self, reason: String) {
        error!("Watcher for {} failed: {}", self.root.display(), reason);
        self.failed = true;
        self.send(Message::Fatal(reason));
        self.state.send_replace(WatcherState::Closed);
    }
}

impl notify::EventHandler for EventForwarder {
    fn handle_event(&mut self, event: notify::Result<Event>) {
        if self.failed || *self.state.borrow() == WatcherState::Closed {
            return;
        }

        match event {
            Ok(event) => {
                let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
                    return;
                };

                for path in event.paths {
                    if is_hidden(&self.root, &path) {
                        continue;
                    }
                    debug!("{} {}", kind, path.display());
                    self.send(Message::Change(ChangeEvent { kind, path }));
                }

                if kind == ChangeKind::Removed && !self.root.is_dir() {
                    self.fail(format!("{} was removed", self.root.display()));
                }
            }
            Err(e) if !self.root.is_dir() => self.fail(e.to_string()),
            Err(e) => warn!("Watch error: {}", e),
        }
    }
}

/// Walks the non-hidden part of the tree once so an unreadable root or
/// subdirectory fails setup. Hidden directories are still scanned by
/// the poller; their events are dropped by the forwarder. Returns the
/// number of directories found.
fn register_tree(root: &Path) -> Result<usize> {
    let meta = fs::metadata(root).map_err(|e| WatchError::setup(root, notify::Error::io(e)))?;
    if !meta.is_dir() {
        return Err(WatchError::setup(
            root,
            notify::Error::generic("not a directory").add_path(root.to_path_buf()),
        ));
    }

    let mut directories = 0;
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_name(e.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| WatchError::setup(root, notify::Error::io(e.into())))?;
        if entry.file_type().is_dir() {
            debug!("Registered {}", entry.path().display());
            directories += 1;
        }
    }

    Ok(directories)
}

/// True if `path`, or any directory between it and `root`, is hidden.
fn is_hidden(root: &Path, path: &Path) -> bool {
    match path.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .any(|c| is_hidden_name(c.as_os_str())),
        Err(_) => path.file_name().is_some_and(is_hidden_name),
    }
}

fn is_hidden_name(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::time::{sleep, timeout};

    const WAIT: Duration = Duration::from_secs(10);

    fn config(root: &Path) -> WatchConfig {
        WatchConfig {
            root: root.to_path_buf(),
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Waits until a change of `kind` for `path` arrives, returning
    /// everything received on the way.
    async fn wait_for(
        stream: &mut ChangeStream,
        kind: ChangeKind,
        path: &Path,
    ) -> Vec<ChangeEvent> {
        let mut seen = Vec::new();
        timeout(WAIT, async {
            while let Some(next) = stream.recv().await {
                let event = next.unwrap();
                let done = event.kind == kind && event.path == path;
                seen.push(event);
                if done {
                    return;
                }
            }
            panic!("stream ended before {} {}", kind, path.display());
        })
        .await
        .expect("timed out waiting for change");
        seen
    }

    #[test]
    fn test_hidden_paths() {
        let root = Path::new("/var/.log-root");
        assert!(!is_hidden(root, Path::new("/var/.log-root/syslog")));
        assert!(is_hidden(root, Path::new("/var/.log-root/.swp")));
        assert!(is_hidden(root, Path::new("/var/.log-root/.cache/a.log")));
        assert!(!is_hidden(root, Path::new("/var/.log-root/nginx/access.log")));
    }

    #[test]
    fn test_start_on_missing_root_is_setup_error() {
        let dir = tempdir().unwrap();
        let mut watcher = ChangeWatcher::new(config(&dir.path().join("missing")));

        let err = watcher.start().unwrap_err();
        assert!(err.is_setup());
        assert_eq!(watcher.state(), WatcherState::Idle);
    }

    #[test]
    fn test_start_on_file_is_setup_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.log");
        fs::write(&file, "x").unwrap();

        let mut watcher = ChangeWatcher::new(config(&file));
        assert!(watcher.start().unwrap_err().is_setup());
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let dir = tempdir().unwrap();
        let mut watcher = ChangeWatcher::new(config(dir.path()));

        let _stream = watcher.start().unwrap();
        assert_eq!(watcher.state(), WatcherState::Watching);
        assert!(matches!(
            watcher.start(),
            Err(WatchError::InvalidState(WatcherState::Watching))
        ));
    }

    #[tokio::test]
    async fn test_detects_created_file() {
        let dir = tempdir().unwrap();
        let mut watcher = ChangeWatcher::new(config(dir.path()));
        let mut stream = watcher.start().unwrap();

        let file = dir.path().join("app.log");
        fs::write(&file, "started").unwrap();

        let seen = wait_for(&mut stream, ChangeKind::Created, &file).await;
        let creates = seen
            .iter()
            .filter(|e| e.kind == ChangeKind::Created && e.path == file)
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn test_detects_nested_create_and_remove() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("nginx")).unwrap();
        let file = dir.path().join("nginx").join("error.log");

        let mut watcher = ChangeWatcher::new(config(dir.path()));
        let mut stream = watcher.start().unwrap();

        fs::write(&file, "boom").unwrap();
        wait_for(&mut stream, ChangeKind::Created, &file).await;

        fs::remove_file(&file).unwrap();
        wait_for(&mut stream, ChangeKind::Removed, &file).await;
    }

    #[tokio::test]
    async fn test_hidden_entries_are_not_reported() {
        let dir = tempdir().unwrap();
        let mut watcher = ChangeWatcher::new(config(dir.path()));
        let mut stream = watcher.start().unwrap();

        fs::write(dir.path().join(".lock"), "1").unwrap();
        fs::create_dir(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join(".cache").join("entry"), "1").unwrap();
        sleep(Duration::from_millis(200)).await;

        let visible = dir.path().join("visible.log");
        fs::write(&visible, "1").unwrap();

        let seen = wait_for(&mut stream, ChangeKind::Created, &visible).await;
        assert!(seen.iter().all(|e| !is_hidden(dir.path(), &e.path)));
    }

    #[tokio::test]
    async fn test_slow_consumer_keeps_only_newest_event() {
        let dir = tempdir().unwrap();
        let mut watcher = ChangeWatcher::new(config(dir.path()));
        let mut stream = watcher.start().unwrap();

        // One write per scan, none of them consumed.
        for i in 0..5 {
            fs::write(dir.path().join(format!("burst-{}.log", i)), "x").unwrap();
            sleep(Duration::from_millis(150)).await;
        }
        sleep(Duration::from_millis(300)).await;

        let mut buffered = Vec::new();
        while let Some(next) = stream.try_next() {
            buffered.push(next.unwrap());
        }

        assert_eq!(buffered.len(), EVENT_BUFFER);
        assert_eq!(
            buffered[0],
            ChangeEvent {
                kind: ChangeKind::Created,
                path: dir.path().join("burst-4.log"),
            }
        );
    }

    #[tokio::test]
    async fn test_detects_written_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.log");
        fs::write(&file, "first line\n").unwrap();

        let mut watcher = ChangeWatcher::new(config(dir.path()));
        let mut stream = watcher.start().unwrap();

        sleep(Duration::from_millis(100)).await;
        fs::write(&file, "first line\nsecond line\n").unwrap();

        let seen = wait_for(&mut stream, ChangeKind::Written, &file).await;
        assert!(seen
            .iter()
            .all(|e| !(e.kind == ChangeKind::Created && e.path == file)));
    }

    #[tokio::test]
    async fn test_close_exhausts_stream() {
        let dir = tempdir().unwrap();
        let mut watcher = ChangeWatcher::new(config(dir.path()));
        let mut stream = watcher.start().unwrap();

        watcher.close();
        assert_eq!(watcher.state(), WatcherState::Closed);

        let next = timeout(WAIT, stream.recv()).await.unwrap();
        assert!(next.is_none());
        assert!(stream.try_next().is_none());

        // Closed is terminal.
        assert!(matches!(
            watcher.start(),
            Err(WatchError::InvalidState(WatcherState::Closed))
        ));
    }

    #[tokio::test]
    async fn test_removed_root_is_fatal() {
        let parent = tempdir().unwrap();
        let root = parent.path().join("logs");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("a.log"), "a").unwrap();

        let mut watcher = ChangeWatcher::new(config(&root));
        let mut stream = watcher.start().unwrap();

        fs::remove_dir_all(&root).unwrap();

        let fatal = timeout(WAIT, async {
            loop {
                match stream.recv().await {
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Some(e),
                    None => return None,
                }
            }
        })
        .await
        .expect("timed out waiting for fatal error");

        assert!(matches!(fatal, Some(WatchError::Fatal(_))));
        assert_eq!(watcher.state(), WatcherState::Closed);

        // Nothing follows the fatal error.
        let next = timeout(WAIT, stream.recv()).await.unwrap();
        assert!(next.is_none());

        watcher.close();
        assert_eq!(watcher.state(), WatcherState::Closed);
    }
}
