use crate::config::{ClientOptions, DEFAULT_PORT};
use crate::correlator::Correlator;
use crate::error::{Result, X32Error};
use crate::keeper::SessionKeeper;
use crate::paths::{self, TalkbackBank, Target};
use crate::protocol::{Message, Request, WireValue};
use crate::strip::{Headamp, Strip};
use crate::subscription::UpdateReceiver;
use crate::transport::DatagramTransport;
use crate::units;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Client for a Behringer X32 mixer
///
/// Each `X32Client` owns its own socket, pending-call table and keep-alive
/// task, so any number of independent clients can live in one process.
/// Cloning the client yields another handle to the same connection.
#[derive(Clone)]
pub struct X32Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    options: ClientOptions,
    transport: Arc<DatagramTransport>,
    correlator: Arc<Correlator>,
    keeper: Mutex<Option<SessionKeeper>>,
    update_tx: broadcast::Sender<Message>,
}

/// Reply to `/info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerInfo {
    pub server_version: String,
    pub server_name: String,
    pub console_model: String,
    pub console_version: String,
}

/// Reply to `/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerStatus {
    pub state: String,
    pub ip: String,
    pub name: String,
}

impl X32Client {
    /// Create a client for the mixer at `host:port` without opening it
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_options(host, port, ClientOptions::default())
    }

    /// Create a client with custom options
    pub fn with_options(host: impl Into<String>, port: u16, options: ClientOptions) -> Self {
        let (update_tx, _) = broadcast::channel(options.update_capacity.max(1));
        Self {
            inner: Arc::new(ClientInner {
                transport: Arc::new(DatagramTransport::new(host, port)),
                correlator: Arc::new(Correlator::new()),
                keeper: Mutex::new(None),
                update_tx,
                options,
            }),
        }
    }

    /// Connect to the mixer at `host` on the default port (10023)
    ///
    /// # Example
    ///
    /// ```no_run
    /// use x32_remote::X32Client;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = X32Client::connect("192.168.1.64").await?;
    ///     client.channel(1).set_fader(0.75).await?;
    ///     println!("ch 1 is at {} dB", client.channel(1).fader_db().await?);
    ///     client.close();
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(host: impl Into<String>) -> Result<Self> {
        Self::connect_with_options(host, DEFAULT_PORT, ClientOptions::default()).await
    }

    /// Create and open a client with custom port and options
    pub async fn connect_with_options(
        host: impl Into<String>,
        port: u16,
        options: ClientOptions,
    ) -> Result<Self> {
        let client = Self::with_options(host, port, options);
        client.open().await?;
        Ok(client)
    }

    /// Bind the local socket, start dispatching replies, and start the
    /// subscription keep-alive. Opening an open client is a no-op.
    pub async fn open(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.transport.is_open() {
            return Ok(());
        }

        let correlator = inner.correlator.clone();
        let update_tx = inner.update_tx.clone();
        inner
            .transport
            .open(move |message| {
                if let Some(unmatched) = correlator.resolve(message) {
                    // No subscribers is fine
                    let _ = update_tx.send(unmatched);
                }
            })
            .await?;

        let keeper =
            match SessionKeeper::start(inner.transport.clone(), inner.options.renew_interval).await {
                Ok(keeper) => keeper,
                Err(e) => {
                    inner.transport.close();
                    return Err(e);
                }
            };

        let mut slot = inner.keeper.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            // Concurrent open already started one
            keeper.stop();
        } else {
            *slot = Some(keeper);
        }

        let (host, port) = inner.transport.remote();
        tracing::info!("Connected to X32 at {}:{}", host, port);
        Ok(())
    }

    /// Close the connection.
    ///
    /// Cancels the keep-alive, drops the socket, and fails every pending
    /// call with [`X32Error::Closed`]. Closing twice is harmless.
    pub fn close(&self) {
        let inner = &self.inner;
        if let Some(keeper) = inner
            .keeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            keeper.stop();
        }

        let was_open = inner.transport.close();
        inner.correlator.fail_all();

        if was_open {
            let (host, port) = inner.transport.remote();
            tracing::info!("Closed connection to X32 at {}:{}", host, port);
        }
    }

    /// Check whether the socket is open
    pub fn is_open(&self) -> bool {
        self.inner.transport.is_open()
    }

    /// Local address the mixer sends replies and updates to
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.transport.local_addr()
    }

    /// Get the options this client was created with
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Number of calls currently waiting for a reply
    pub fn pending_calls(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    // ========== Raw protocol access ==========

    /// Send a request without waiting for anything back
    pub async fn send(&self, request: Request) -> Result<()> {
        self.inner.transport.send(&request).await
    }

    /// Set a parameter (fire and forget)
    pub async fn set(&self, address: impl Into<String>, value: impl Into<WireValue>) -> Result<()> {
        self.send(Request::new(address).with_arg(value)).await
    }

    /// Send `request` and wait for the reply on its address.
    ///
    /// Resolves with the reply's first argument. Fails with
    /// [`X32Error::Timeout`] if nothing arrives within the request window.
    pub async fn issue(&self, request: Request) -> Result<WireValue> {
        let address = request.address.clone();
        self.call(request)
            .await?
            .into_iter()
            .next()
            .ok_or(X32Error::EmptyReply { address })
    }

    /// Read the current value at `address`
    pub async fn get(&self, address: impl Into<String>) -> Result<WireValue> {
        self.issue(Request::new(address)).await
    }

    /// Read `address` and return every argument of the reply
    pub async fn query(&self, address: impl Into<String>) -> Result<Vec<WireValue>> {
        self.call(Request::new(address)).await
    }

    /// Read a float parameter
    pub async fn get_float(&self, address: impl Into<String>) -> Result<f32> {
        let address = address.into();
        let value = self.get(address.clone()).await?;
        value.as_float().ok_or_else(|| unexpected(address, "float", &value))
    }

    /// Read an int parameter
    pub async fn get_int(&self, address: impl Into<String>) -> Result<i32> {
        let address = address.into();
        let value = self.get(address.clone()).await?;
        value.as_int().ok_or_else(|| unexpected(address, "int", &value))
    }

    /// Read a string parameter
    pub async fn get_string(&self, address: impl Into<String>) -> Result<String> {
        let address = address.into();
        match self.get(address.clone()).await? {
            WireValue::String(s) => Ok(s),
            other => Err(unexpected(address, "string", &other)),
        }
    }

    async fn call(&self, request: Request) -> Result<Vec<WireValue>> {
        let inner = &self.inner;
        if !inner.transport.is_open() {
            return Err(X32Error::NotConnected);
        }
        inner
            .correlator
            .call(
                &request.address,
                inner.options.request_timeout,
                inner.transport.send(&request),
            )
            .await
    }

    // ========== Updates ==========

    /// Subscribe to values the mixer pushes without a matching call
    ///
    /// # Example
    ///
    /// ```no_run
    /// use x32_remote::X32Client;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = X32Client::connect("192.168.1.64").await?;
    ///     let mut updates = client.subscribe();
    ///
    ///     while let Ok(update) = updates.recv().await {
    ///         println!("{} = {:?}", update.address, update.args);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> UpdateReceiver {
        UpdateReceiver::new(self.inner.update_tx.subscribe())
    }

    // ========== Console ==========

    /// Query console model and firmware
    pub async fn info(&self) -> Result<MixerInfo> {
        let args = self.query(paths::INFO).await?;
        Ok(MixerInfo {
            server_version: string_at(&args, 0, paths::INFO)?,
            server_name: string_at(&args, 1, paths::INFO)?,
            console_model: string_at(&args, 2, paths::INFO)?,
            console_version: string_at(&args, 3, paths::INFO)?,
        })
    }

    /// Query console state, IP address and name
    pub async fn status(&self) -> Result<MixerStatus> {
        let args = self.query(paths::STATUS).await?;
        Ok(MixerStatus {
            state: string_at(&args, 0, paths::STATUS)?,
            ip: string_at(&args, 1, paths::STATUS)?,
            name: string_at(&args, 2, paths::STATUS)?,
        })
    }

    /// Check whether talkback `bank` is engaged
    pub async fn talkback(&self, bank: TalkbackBank) -> Result<bool> {
        Ok(units::wire_to_on(self.get_int(paths::talkback(bank)).await?))
    }

    /// Engage or release talkback `bank`
    pub async fn set_talkback(&self, bank: TalkbackBank, on: bool) -> Result<()> {
        self.set(paths::talkback(bank), units::on_to_wire(on)).await
    }

    // ========== Strips ==========

    /// Get a handle for any strip
    pub fn strip(&self, target: Target) -> Strip {
        Strip::new(self.clone(), target)
    }

    /// Input channel `n` (1-32)
    pub fn channel(&self, n: u8) -> Strip {
        self.strip(Target::Channel(n))
    }

    /// Mix bus `n` (1-16)
    pub fn bus(&self, n: u8) -> Strip {
        self.strip(Target::Bus(n))
    }

    /// Aux input `n` (1-8)
    pub fn aux(&self, n: u8) -> Strip {
        self.strip(Target::Aux(n))
    }

    /// Matrix `n` (1-6)
    pub fn matrix(&self, n: u8) -> Strip {
        self.strip(Target::Matrix(n))
    }

    /// DCA group `n` (1-8)
    pub fn dca(&self, n: u8) -> Strip {
        self.strip(Target::Dca(n))
    }

    /// FX return `n` (1-8)
    pub fn fx(&self, n: u8) -> Strip {
        self.strip(Target::Fx(n))
    }

    /// Main stereo bus
    pub fn main_stereo(&self) -> Strip {
        self.strip(Target::MainStereo)
    }

    /// Main mono (M/C) bus
    pub fn main_mono(&self) -> Strip {
        self.strip(Target::MainMono)
    }

    /// Preamp `index` (0-based)
    pub fn headamp(&self, index: u8) -> Headamp {
        Headamp::new(self.clone(), index)
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(keeper) = self
            .keeper
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            keeper.stop();
        }
        self.transport.close();
        self.correlator.fail_all();
    }
}

fn unexpected(address: String, expected: &'static str, found: &WireValue) -> X32Error {
    X32Error::UnexpectedType {
        address,
        expected,
        found: found.kind(),
    }
}

fn string_at(args: &[WireValue], index: usize, address: &str) -> Result<String> {
    match args.get(index) {
        Some(WireValue::String(s)) => Ok(s.clone()),
        Some(other) => Err(unexpected(address.to_string(), "string", other)),
        None => Err(X32Error::EmptyReply {
            address: address.to_string(),
        }),
    }
}
