use crate::error::{Result, X32Error};
use crate::protocol::{Request, XCONTROL, XREMOTE};
use crate::transport::DatagramTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Keeps the mixer pushing updates to this client.
///
/// Sends `/xcontrol` once, then `/xremote` every `period` until stopped.
pub(crate) struct SessionKeeper {
    handle: JoinHandle<()>,
    stopped: Arc<AtomicBool>,
}

impl SessionKeeper {
    pub async fn start(transport: Arc<DatagramTransport>, period: Duration) -> Result<Self> {
        transport.send(&Request::new(XCONTROL)).await?;

        // interval_at panics on a zero period
        let period = period.max(Duration::from_millis(1));

        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                // abort() only lands at the next await
                if flag.load(Ordering::Acquire) {
                    break;
                }
                match transport.send(&Request::new(XREMOTE)).await {
                    Ok(()) => {}
                    Err(X32Error::NotConnected) => {
                        tracing::debug!("Transport closed, stopping subscription renewal");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to renew subscription: {}", e);
                    }
                }
            }
        });

        Ok(Self { handle, stopped })
    }

    /// Cancel the renewal task. No renewal starts after this returns.
    pub fn stop(self) {
        self.stopped.store(true, Ordering::Release);
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode_datagram;
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    async fn next_address(mixer: &UdpSocket, limit: Duration) -> Option<String> {
        let mut buf = [0u8; 512];
        let len = timeout(limit, mixer.recv(&mut buf)).await.ok()?.unwrap();
        let mut messages = decode_datagram(&buf[..len]).unwrap();
        messages.pop().map(|m| m.address)
    }

    #[tokio::test]
    async fn stop_ends_renewals_while_transport_stays_open() {
        let mixer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transport = Arc::new(DatagramTransport::new(
            "127.0.0.1",
            mixer.local_addr().unwrap().port(),
        ));
        transport.open(|_| {}).await.unwrap();

        let keeper = SessionKeeper::start(transport.clone(), Duration::from_millis(5))
            .await
            .unwrap();
        let limit = Duration::from_secs(1);
        assert_eq!(next_address(&mixer, limit).await.as_deref(), Some(XCONTROL));
        for _ in 0..3 {
            assert_eq!(next_address(&mixer, limit).await.as_deref(), Some(XREMOTE));
        }

        keeper.stop();
        // Drain what was already on the wire
        while next_address(&mixer, Duration::from_millis(30)).await.is_some() {}
        assert!(next_address(&mixer, Duration::from_millis(100)).await.is_none());
        assert!(transport.is_open());
    }
}
