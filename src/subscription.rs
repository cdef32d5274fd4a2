use crate::error::{Result, X32Error};
use crate::protocol::Message;
use tokio::sync::broadcast;

/// Stream of messages the mixer pushes without a matching call
///
/// While `/xremote` is being renewed the console reports every parameter
/// change made on its surface or by another client, one message per change.
/// Replies that arrive after their call already timed out land here too.
///
/// Each receiver buffers up to `ClientOptions::update_capacity` messages.
/// A receiver that falls further behind loses the oldest ones and is told
/// how many with a `ChannelError`; it keeps working afterwards. Since every
/// push carries the full current value, re-reading the affected parameters
/// is enough to catch up.
pub struct UpdateReceiver {
    rx: broadcast::Receiver<Message>,
}

impl UpdateReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<Message>) -> Self {
        Self { rx }
    }

    /// Wait for the next pushed message
    ///
    /// Fails with `Closed` once every client handle is gone, or with
    /// `ChannelError` after pushes were dropped for falling behind.
    pub async fn recv(&mut self) -> Result<Message> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => X32Error::Closed,
            broadcast::error::RecvError::Lagged(n) => lagged(n),
        })
    }

    /// Take a buffered message without waiting
    ///
    /// `Ok(None)` means nothing is buffered right now. Errors match
    /// [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Result<Option<Message>> {
        match self.rx.try_recv() {
            Ok(update) => Ok(Some(update)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(X32Error::Closed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => Err(lagged(n)),
        }
    }
}

fn lagged(skipped: u64) -> X32Error {
    tracing::warn!("Update receiver fell behind, {} pushes dropped", skipped);
    X32Error::ChannelError(format!("missed {} pushed updates", skipped))
}
