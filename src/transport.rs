use crate::error::{Result, X32Error};
use crate::protocol::{decode_datagram, Message, Request};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::net::{lookup_host, UdpSocket};
use tokio::task::JoinHandle;

/// Largest payload a UDP datagram can carry
const MAX_DATAGRAM: usize = 65_507;

/// UDP socket to a single mixer.
///
/// The socket is bound to an ephemeral local port and connected to the
/// mixer, so only datagrams from the mixer reach the receive loop.
pub(crate) struct DatagramTransport {
    host: String,
    port: u16,
    socket: RwLock<Option<Arc<UdpSocket>>>,
    recv_task: Mutex<Option<JoinHandle<()>>>,
}

impl DatagramTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            socket: RwLock::new(None),
            recv_task: Mutex::new(None),
        }
    }

    /// Bind the socket and start delivering inbound messages to `dispatch`.
    ///
    /// Returns the local address the mixer will reply to. Opening an already
    /// open transport is a no-op.
    pub async fn open<D>(&self, dispatch: D) -> Result<SocketAddr>
    where
        D: Fn(Message) + Send + Sync + 'static,
    {
        if let Some(addr) = self.local_addr() {
            return Ok(addr);
        }

        let remote = lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no address for {}:{}", self.host, self.port),
                )
            })?;

        let bind_addr: SocketAddr = if remote.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(remote).await?;
        let local = socket.local_addr()?;
        let socket = Arc::new(socket);

        let mut slot = self.socket.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slot.as_ref() {
            // Lost a race with a concurrent open
            return Ok(existing.local_addr()?);
        }

        tracing::info!("Opened {} -> {}", local, remote);
        let handle = tokio::spawn(receive_loop(socket.clone(), dispatch));
        *slot = Some(socket);
        *self.recv_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        Ok(local)
    }

    /// Send one request datagram. No acknowledgment is awaited.
    pub async fn send(&self, request: &Request) -> Result<()> {
        let socket = self
            .socket
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(X32Error::NotConnected)?;

        let bytes = request.encode()?;
        tracing::debug!("Sending: {} {:?}", request.address, request.args);
        socket.send(&bytes).await?;
        Ok(())
    }

    /// Drop the socket and stop the receive loop.
    ///
    /// Returns false if the transport was not open.
    pub fn close(&self) -> bool {
        let socket = self
            .socket
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = self
            .recv_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        socket.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.socket
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|s| s.local_addr().ok())
    }

    pub fn remote(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

async fn receive_loop<D>(socket: Arc<UdpSocket>, dispatch: D)
where
    D: Fn(Message),
{
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        match socket.recv(&mut buf).await {
            Ok(len) => match decode_datagram(&buf[..len]) {
                Ok(messages) => {
                    for message in messages {
                        tracing::debug!("Received: {} {:?}", message.address, message.args);
                        dispatch(message);
                    }
                }
                Err(e) => {
                    tracing::warn!("Dropping {} byte datagram: {}", len, e);
                }
            },
            Err(e) => {
                // ICMP unreachable and friends; the mixer may come back
                tracing::error!("UDP receive error: {}", e);
            }
        }
    }
}
