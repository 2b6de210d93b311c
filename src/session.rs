use crate::page::{SimulatedPage, UserAction};
use crate::platform::PlayerSnapshot;
use crate::{Error, PreviewConfig, Result};
use log::debug;
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Apply(UserAction, oneshot::Sender<usize>),
    Snapshot(oneshot::Sender<Vec<PlayerSnapshot>>),
    Close(oneshot::Sender<Vec<PlayerSnapshot>>),
}

/// An async-friendly preview page backed by a dedicated worker thread.
///
/// The worker owns the page and its coordinator and executes commands one at
/// a time, so playback handlers never run concurrently no matter how many
/// tasks hold a clone of the session.
#[derive(Clone)]
pub struct PreviewSession {
    cmd_tx: Sender<Command>,
}

impl PreviewSession {
    /// Discover the players in `html` and start the worker.
    pub async fn new(html: impl Into<String>, config: Option<PreviewConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        let html = html.into();

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            // Build the page on the worker thread
            let mut page = match SimulatedPage::from_html(&html, &config) {
                Ok(p) => p,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            debug!("preview session started with {} players", page.players().len());
            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Apply(action, resp) => {
                        let handled = page.apply(&action);
                        let _ = resp.send(handled);
                    }
                    Command::Snapshot(resp) => {
                        let _ = resp.send(page.snapshot());
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(page.snapshot());
                        break;
                    }
                }
            }
            debug!("preview session worker exiting");
        });

        // Wait for the worker to report discovery success or failure
        let init = init_rx
            .await
            .map_err(|e| Error::SessionClosed(format!("Worker init canceled: {}", e)))?;
        init?;

        Ok(Self { cmd_tx })
    }

    /// Apply a user action; resolves once every resulting event was handled.
    ///
    /// Returns the number of events handled.
    pub async fn apply(&self, action: UserAction) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Apply(action, tx))?;
        rx.await
            .map_err(|e| Error::SessionClosed(format!("Apply canceled: {}", e)))
    }

    /// Click the "play all" control
    pub async fn play_all(&self) -> Result<usize> {
        self.apply(UserAction::PlayAll).await
    }

    /// Current state of every player, in page order
    pub async fn snapshot(&self) -> Result<Vec<PlayerSnapshot>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await
            .map_err(|e| Error::SessionClosed(format!("Snapshot canceled: {}", e)))
    }

    /// Stop the worker, returning the final player states.
    pub async fn close(self) -> Result<Vec<PlayerSnapshot>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(tx))?;
        rx.await
            .map_err(|e| Error::SessionClosed(format!("Close canceled: {}", e)))
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| Error::SessionClosed("worker is gone".to_string()))
    }
}
