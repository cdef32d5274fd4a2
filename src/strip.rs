use crate::client::X32Client;
use crate::error::Result;
use crate::paths::{self, Target};
use crate::units;

/// Interface for controlling one strip (channel, bus, DCA, main, ...)
///
/// A `Strip` is a cheap handle: it only holds the client and the target.
/// Setters are fire-and-forget; getters query the mixer and wait for the
/// reply, so they fail with a timeout rather than returning a stale default.
#[derive(Clone)]
pub struct Strip {
    client: X32Client,
    target: Target,
}

impl Strip {
    pub(crate) fn new(client: X32Client, target: Target) -> Self {
        Self { client, target }
    }

    /// Get the strip this handle controls
    pub fn target(&self) -> Target {
        self.target
    }

    // ========== Fader ==========

    /// Set the fader position on the wire scale (0.0-1.0)
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use x32_remote::X32Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = X32Client::connect("192.168.1.64").await?;
    /// client.channel(1).set_fader(0.5).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set_fader(&self, level: f32) -> Result<()> {
        self.client.set(self.target.fader(), level).await
    }

    /// Get the fader position on the wire scale (0.0-1.0)
    pub async fn fader(&self) -> Result<f32> {
        self.client.get_float(self.target.fader()).await
    }

    /// Set the fader in dB (-90 is -inf, +10 is the top)
    pub async fn set_fader_db(&self, db: f32) -> Result<()> {
        self.set_fader(units::fader_db_to_wire(db)).await
    }

    /// Get the fader level in dB
    pub async fn fader_db(&self) -> Result<f32> {
        Ok(units::wire_to_fader_db(self.fader().await?))
    }

    // ========== Mute ==========

    /// Mute or unmute. On the wire this is the `mix/on` node, where 1 = unmuted.
    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        self.client
            .set(self.target.on(), units::mute_to_wire(muted))
            .await
    }

    /// Check whether the strip is muted
    pub async fn muted(&self) -> Result<bool> {
        Ok(units::wire_to_muted(self.client.get_int(self.target.on()).await?))
    }

    // ========== Pan ==========

    /// Set pan, -1.0 (left) to +1.0 (right)
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use x32_remote::X32Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = X32Client::connect("192.168.1.64").await?;
    /// client.channel(2).set_pan(-1.0).await?; // hard left
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set_pan(&self, pan: f32) -> Result<()> {
        self.client
            .set(self.target.pan(), units::pan_to_wire(pan))
            .await
    }

    /// Get pan, -1.0 (left) to +1.0 (right)
    pub async fn pan(&self) -> Result<f32> {
        Ok(units::wire_to_pan(self.client.get_float(self.target.pan()).await?))
    }

    // ========== Name ==========

    /// Set the scribble strip name
    pub async fn set_name(&self, name: impl Into<String>) -> Result<()> {
        let name: String = name.into();
        self.client.set(self.target.name(), name).await
    }

    /// Get the scribble strip name
    pub async fn name(&self) -> Result<String> {
        self.client.get_string(self.target.name()).await
    }

    // ========== Sends ==========

    /// Set the send level to mix bus `bus` (wire scale)
    pub async fn set_send_level(&self, bus: u8, level: f32) -> Result<()> {
        self.client.set(self.target.send_level(bus), level).await
    }

    /// Get the send level to mix bus `bus` (wire scale)
    pub async fn send_level(&self, bus: u8) -> Result<f32> {
        self.client.get_float(self.target.send_level(bus)).await
    }

    // ========== EQ ==========

    /// Enable or bypass the EQ
    pub async fn set_eq_on(&self, on: bool) -> Result<()> {
        self.client
            .set(self.target.eq_on(), units::on_to_wire(on))
            .await
    }

    /// Check whether the EQ is enabled
    pub async fn eq_on(&self) -> Result<bool> {
        Ok(units::wire_to_on(self.client.get_int(self.target.eq_on()).await?))
    }

    /// Set the gain of EQ `band` in dB (-15 to +15)
    pub async fn set_eq_gain(&self, band: u8, db: f32) -> Result<()> {
        self.client
            .set(self.target.eq_gain(band), units::eq_gain_to_wire(db))
            .await
    }

    /// Get the gain of EQ `band` in dB
    pub async fn eq_gain(&self, band: u8) -> Result<f32> {
        let wire = self.client.get_float(self.target.eq_gain(band)).await?;
        Ok(units::wire_to_eq_gain(wire))
    }

    // ========== Gate ==========

    /// Enable or bypass the gate
    pub async fn set_gate_on(&self, on: bool) -> Result<()> {
        self.client
            .set(self.target.gate_on(), units::on_to_wire(on))
            .await
    }

    /// Check whether the gate is enabled
    pub async fn gate_on(&self) -> Result<bool> {
        Ok(units::wire_to_on(self.client.get_int(self.target.gate_on()).await?))
    }

    /// Set the gate threshold in dB (-80 to 0)
    pub async fn set_gate_threshold(&self, db: f32) -> Result<()> {
        self.client
            .set(self.target.gate_threshold(), units::gate_threshold_to_wire(db))
            .await
    }

    /// Get the gate threshold in dB
    pub async fn gate_threshold(&self) -> Result<f32> {
        let wire = self.client.get_float(self.target.gate_threshold()).await?;
        Ok(units::wire_to_gate_threshold(wire))
    }

    // ========== Dynamics ==========

    /// Enable or bypass the compressor
    pub async fn set_dyn_on(&self, on: bool) -> Result<()> {
        self.client
            .set(self.target.dyn_on(), units::on_to_wire(on))
            .await
    }

    /// Check whether the compressor is enabled
    pub async fn dyn_on(&self) -> Result<bool> {
        Ok(units::wire_to_on(self.client.get_int(self.target.dyn_on()).await?))
    }

    /// Set the compressor threshold in dB (-60 to 0)
    pub async fn set_dyn_threshold(&self, db: f32) -> Result<()> {
        self.client
            .set(self.target.dyn_threshold(), units::comp_threshold_to_wire(db))
            .await
    }

    /// Get the compressor threshold in dB
    pub async fn dyn_threshold(&self) -> Result<f32> {
        let wire = self.client.get_float(self.target.dyn_threshold()).await?;
        Ok(units::wire_to_comp_threshold(wire))
    }

    /// Set the compressor ratio (1.0 = 1:1 up to 20.0 = 20:1)
    pub async fn set_dyn_ratio(&self, ratio: f32) -> Result<()> {
        self.client
            .set(self.target.dyn_ratio(), units::comp_ratio_to_wire(ratio))
            .await
    }

    /// Get the compressor ratio
    pub async fn dyn_ratio(&self) -> Result<f32> {
        let wire = self.client.get_float(self.target.dyn_ratio()).await?;
        Ok(units::wire_to_comp_ratio(wire))
    }
}

/// Interface for one preamp
#[derive(Clone)]
pub struct Headamp {
    client: X32Client,
    index: u8,
}

impl Headamp {
    pub(crate) fn new(client: X32Client, index: u8) -> Self {
        Self { client, index }
    }

    /// Get the preamp index
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Set preamp gain in dB (-12 to +60)
    pub async fn set_gain(&self, db: f32) -> Result<()> {
        self.client
            .set(paths::headamp_gain(self.index), units::headamp_gain_to_wire(db))
            .await
    }

    /// Get preamp gain in dB
    pub async fn gain(&self) -> Result<f32> {
        let wire = self.client.get_float(paths::headamp_gain(self.index)).await?;
        Ok(units::wire_to_headamp_gain(wire))
    }

    /// Switch +48V phantom power
    pub async fn set_phantom(&self, on: bool) -> Result<()> {
        self.client
            .set(paths::headamp_phantom(self.index), units::on_to_wire(on))
            .await
    }

    /// Check whether phantom power is on
    pub async fn phantom(&self) -> Result<bool> {
        let wire = self.client.get_int(paths::headamp_phantom(self.index)).await?;
        Ok(units::wire_to_on(wire))
    }
}
