use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::db::Database;

use super::location::LocationProvider;
use super::loop_worker::{capture_loop, CaptureNotice, DecodeEvent};

const DECODE_QUEUE_DEPTH: usize = 32;

/// Owns the background capture loop for one scanning session.
pub struct CaptureController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    decode_tx: Option<mpsc::Sender<DecodeEvent>>,
}

impl CaptureController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            decode_tx: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawns the capture loop and returns the stream of notices for the UI.
    pub fn start_capture(
        &mut self,
        db: Database,
        location: Arc<dyn LocationProvider>,
    ) -> Result<mpsc::UnboundedReceiver<CaptureNotice>> {
        if self.handle.is_some() {
            bail!("capture already active");
        }

        let cancel_token = CancellationToken::new();
        let (decode_tx, decode_rx) = mpsc::channel(DECODE_QUEUE_DEPTH);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(capture_loop(
            db,
            location,
            decode_rx,
            notice_tx,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.decode_tx = Some(decode_tx);
        info!("Capture started");
        Ok(notice_rx)
    }

    /// Hands a decoded payload to the loop. Waits if the queue is full.
    pub async fn submit(&self, event: DecodeEvent) -> Result<()> {
        let sender = self
            .decode_tx
            .as_ref()
            .ok_or_else(|| anyhow!("capture is not active"))?;

        sender
            .send(event)
            .await
            .map_err(|_| anyhow!("capture loop has stopped"))
    }

    /// Lets queued decodes finish, then waits for the loop to exit.
    pub async fn stop_capture(&mut self) -> Result<()> {
        self.decode_tx.take();
        self.cancel_token.take();
        self.join().await
    }

    /// Stops the loop without draining queued decodes.
    pub async fn cancel_capture(&mut self) -> Result<()> {
        self.decode_tx.take();
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.join().await
    }

    async fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("capture loop task failed to join")?;
            info!("Capture stopped");
        }
        Ok(())
    }
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}
