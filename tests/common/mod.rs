//! Loopback stand-in for an X32 console.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use x32_remote::{decode_datagram, ClientOptions, Message, Request, WireValue, X32Client, XCONTROL, XREMOTE};

const RECV_LIMIT: Duration = Duration::from_secs(2);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Options with a short request window and no renewals during a test
pub fn test_options() -> ClientOptions {
    ClientOptions {
        request_timeout: Duration::from_millis(300),
        renew_interval: Duration::from_secs(60),
        ..ClientOptions::default()
    }
}

pub struct FakeMixer {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
}

impl FakeMixer {
    pub async fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        Self { socket, peer: None }
    }

    pub fn port(&self) -> u16 {
        self.socket.local_addr().unwrap().port()
    }

    /// Open a client against this mixer and consume its `/xcontrol`
    pub async fn connect(&mut self, options: ClientOptions) -> X32Client {
        init_tracing();
        let client = X32Client::connect_with_options("127.0.0.1", self.port(), options)
            .await
            .unwrap();
        let first = self.recv().await;
        assert_eq!(first.address, XCONTROL);
        client
    }

    /// Next message from the client, whatever it is
    pub async fn recv(&mut self) -> Message {
        self.recv_within(RECV_LIMIT)
            .await
            .expect("client sent nothing")
    }

    /// Next message that is not session traffic
    pub async fn recv_request(&mut self) -> Message {
        loop {
            let message = self.recv().await;
            if message.address != XREMOTE && message.address != XCONTROL {
                return message;
            }
        }
    }

    pub async fn recv_within(&mut self, limit: Duration) -> Option<Message> {
        let mut buf = vec![0u8; 65_536];
        let (len, peer) = tokio::time::timeout(limit, self.socket.recv_from(&mut buf))
            .await
            .ok()?
            .unwrap();
        self.peer = Some(peer);
        let mut messages = decode_datagram(&buf[..len]).unwrap();
        assert_eq!(messages.len(), 1, "client sends one message per datagram");
        messages.pop()
    }

    /// Everything received during `period`
    pub async fn collect_for(&mut self, period: Duration) -> Vec<Message> {
        let deadline = tokio::time::Instant::now() + period;
        let mut messages = Vec::new();
        loop {
            let left = deadline.saturating_duration_since(tokio::time::Instant::now());
            if left.is_zero() {
                break;
            }
            match self.recv_within(left).await {
                Some(message) => messages.push(message),
                None => break,
            }
        }
        messages
    }

    pub async fn reply(&self, address: &str, args: Vec<WireValue>) {
        let request = Request {
            address: address.to_string(),
            args,
        };
        self.send_raw(&request.encode().unwrap()).await;
    }

    pub async fn send_raw(&self, bytes: &[u8]) {
        let peer = self.peer.expect("no client has spoken yet");
        self.socket.send_to(bytes, peer).await.unwrap();
    }
}
