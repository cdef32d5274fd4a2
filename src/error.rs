use thiserror::Error;

/// Result type for X32 operations
pub type Result<T> = std::result::Result<T, X32Error>;

/// Errors that can occur when talking to an X32 mixer
#[derive(Error, Debug)]
pub enum X32Error {
    /// Operation attempted before `open` or after `close`
    #[error("Not connected")]
    NotConnected,

    /// No reply arrived within the request window
    #[error("Request timeout waiting for {address}")]
    Timeout {
        /// Address the call was waiting on
        address: String,
    },

    /// Pending call was invalidated because the connection closed
    #[error("Connection closed")]
    Closed,

    /// Inbound datagram could not be decoded as OSC
    #[error("Malformed datagram: {0}")]
    MalformedDatagram(String),

    /// Socket-level I/O error
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Outbound message could not be encoded
    #[error("OSC encode error: {0}")]
    Codec(String),

    /// Reply carried no argument to return
    #[error("Empty reply for {address}")]
    EmptyReply {
        /// Address of the reply
        address: String,
    },

    /// Reply argument had a different wire kind than the path defines
    #[error("Unexpected value for {address}: expected {expected}, got {found}")]
    UnexpectedType {
        /// Address of the reply
        address: String,
        /// Wire kind the caller expected
        expected: &'static str,
        /// Wire kind actually received
        found: &'static str,
    },

    /// Update channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl X32Error {
    /// True for the errors that mean "the mixer did not answer in time"
    pub fn is_timeout(&self) -> bool {
        matches!(self, X32Error::Timeout { .. })
    }
}
