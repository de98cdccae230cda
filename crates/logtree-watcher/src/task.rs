//! Background watch task.
//!
//! Owns a [`ChangeWatcher`] on a tokio task, logs every change it
//! reports, and stops when asked to or when the watcher fails.

use crate::error::{Result, WatchError};
use crate::watcher::{ChangeWatcher, WatchConfig};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Handle to a running watch task.
///
/// Dropping the handle without calling [`close`](Self::close) also
/// stops the task.
pub struct WatchTask {
    close: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<()>>,
}

impl WatchTask {
    /// Spawns the task on the current tokio runtime.
    ///
    /// Setup failures don't surface here: they are logged by the task
    /// and returned from [`close`](Self::close).
    pub fn spawn(config: WatchConfig) -> Self {
        let (close_tx, close_rx) = oneshot::channel();
        let handle = tokio::spawn(run(config, close_rx));
        Self {
            close: Some(close_tx),
            handle,
        }
    }

    /// True once the task has exited on its own (setup or fatal error).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals the task to stop and waits for it.
    ///
    /// Returns the error that ended the task early, if there was one.
    pub async fn close(mut self) -> Result<()> {
        if let Some(close) = self.close.take() {
            // The task may already be gone; that's what we want anyway.
            let _ = close.send(());
        }

        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) => Err(WatchError::Fatal(format!("watch task panicked: {}", e))),
        }
    }
}

async fn run(config: WatchConfig, mut close: oneshot::Receiver<()>) -> Result<()> {
    let mut watcher = ChangeWatcher::new(config);

    let mut stream = match watcher.start() {
        Ok(stream) => stream,
        Err(e) => {
            error!("Error adding directory to watcher: {}", e);
            return Err(e);
        }
    };

    let outcome = loop {
        tokio::select! {
            _ = &mut close => break Ok(()),
            next = stream.recv() => match next {
                Some(Ok(change)) => info!("{}", change),
                Some(Err(e)) => {
                    error!("Error watching directory: {}", e);
                    break Err(e);
                }
                None => break Ok(()),
            },
        }
    };

    watcher.close();
    outcome
}
