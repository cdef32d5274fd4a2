use crate::error::{Result, X32Error};
use rosc::{OscMessage, OscPacket, OscType};
use serde::{Deserialize, Serialize};

/// Enable push updates (sent once after open)
pub const XCONTROL: &str = "/xcontrol";

/// Renew the push-update subscription
pub const XREMOTE: &str = "/xremote";

/// A single typed argument as carried on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum WireValue {
    Float(f32),
    Int(i32),
    String(String),
    /// Opaque bytes (e.g. `/meters`); never decoded here
    Blob(Vec<u8>),
}

impl WireValue {
    /// Name of the wire kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            WireValue::Float(_) => "float",
            WireValue::Int(_) => "int",
            WireValue::String(_) => "string",
            WireValue::Blob(_) => "blob",
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            WireValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            WireValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Convert a decoded OSC argument. Kinds the mixer never sends map to `None`.
    fn from_osc(arg: OscType) -> Option<Self> {
        match arg {
            OscType::Float(v) => Some(WireValue::Float(v)),
            OscType::Int(v) => Some(WireValue::Int(v)),
            OscType::String(v) => Some(WireValue::String(v)),
            OscType::Blob(v) => Some(WireValue::Blob(v)),
            _ => None,
        }
    }

    fn into_osc(self) -> OscType {
        match self {
            WireValue::Float(v) => OscType::Float(v),
            WireValue::Int(v) => OscType::Int(v),
            WireValue::String(v) => OscType::String(v),
            WireValue::Blob(v) => OscType::Blob(v),
        }
    }
}

impl From<f32> for WireValue {
    fn from(v: f32) -> Self {
        WireValue::Float(v)
    }
}

impl From<i32> for WireValue {
    fn from(v: i32) -> Self {
        WireValue::Int(v)
    }
}

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        WireValue::String(v.to_string())
    }
}

impl From<String> for WireValue {
    fn from(v: String) -> Self {
        WireValue::String(v)
    }
}

/// Outbound message: an address plus ordered arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub address: String,
    pub args: Vec<WireValue>,
}

impl Request {
    /// Create a request with no arguments (a "get" when issued)
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument
    pub fn with_arg(mut self, arg: impl Into<WireValue>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Serialize to a single OSC datagram
    pub fn encode(&self) -> Result<Vec<u8>> {
        let packet = OscPacket::Message(OscMessage {
            addr: self.address.clone(),
            args: self.args.iter().cloned().map(WireValue::into_osc).collect(),
        });
        rosc::encoder::encode(&packet).map_err(|e| X32Error::Codec(format!("{:?}", e)))
    }
}

/// Inbound message: a reply or an unsolicited push from the mixer
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub address: String,
    pub args: Vec<WireValue>,
}

impl Message {
    /// First argument, which carries the value for parameter replies
    pub fn first(&self) -> Option<&WireValue> {
        self.args.first()
    }
}

/// Decode one datagram into the messages it carries.
///
/// Bundles are flattened in order. A datagram that is not valid OSC, or that
/// carries an argument kind outside [`WireValue`], is rejected as a whole.
pub fn decode_datagram(buf: &[u8]) -> Result<Vec<Message>> {
    let (_, packet) =
        rosc::decoder::decode_udp(buf).map_err(|e| X32Error::MalformedDatagram(format!("{:?}", e)))?;

    let mut messages = Vec::new();
    flatten(packet, &mut messages)?;
    Ok(messages)
}

fn flatten(packet: OscPacket, out: &mut Vec<Message>) -> Result<()> {
    match packet {
        OscPacket::Message(msg) => {
            let address = msg.addr;
            let mut args = Vec::with_capacity(msg.args.len());
            for arg in msg.args {
                let value = WireValue::from_osc(arg.clone()).ok_or_else(|| {
                    X32Error::MalformedDatagram(format!("unsupported argument {:?} for {}", arg, address))
                })?;
                args.push(value);
            }
            out.push(Message { address, args });
        }
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out)?;
            }
        }
    }
    Ok(())
}
