use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OSC port of the mixer
pub const DEFAULT_PORT: u16 = 10023;

/// How long a call waits for its reply
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(1000);

/// Subscription renewal period; the mixer drops subscribers after ~10s of silence
const DEFAULT_RENEW_INTERVAL: Duration = Duration::from_secs(9);

/// Broadcast capacity for unsolicited updates
const DEFAULT_UPDATE_CAPACITY: usize = 256;

/// Options for an [`X32Client`](crate::X32Client) connection
///
/// Durations are expressed in milliseconds when (de)serialized, so the
/// options can live in an application's config file:
///
/// ```
/// let opts: x32_remote::ClientOptions =
///     serde_json::from_str(r#"{ "request_timeout_ms": 250 }"#).unwrap();
/// assert_eq!(opts.request_timeout.as_millis(), 250);
/// assert_eq!(opts.renew_interval.as_secs(), 9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Wait window for a correlated reply
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Duration,

    /// Period between `/xremote` renewals
    #[serde(rename = "renew_interval_ms", with = "millis")]
    pub renew_interval: Duration,

    /// Capacity of the unsolicited update channel
    pub update_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            renew_interval: DEFAULT_RENEW_INTERVAL,
            update_capacity: DEFAULT_UPDATE_CAPACITY,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
