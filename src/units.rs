//! Conversions between human units and the mixer's wire values.
//!
//! Every function is total and performs no clamping: out-of-domain input is
//! passed straight through the linear mapping. Range checks belong to the
//! caller.

/// Switch on/off. Wire 1 = enabled (EQ, gate, dynamics, phantom).
pub fn on_to_wire(on: bool) -> i32 {
    if on {
        1
    } else {
        0
    }
}

pub fn wire_to_on(wire: i32) -> bool {
    wire != 0
}

/// Mute. The `mix/on` nodes use wire 1 = unmuted, so the polarity is inverted.
pub fn mute_to_wire(muted: bool) -> i32 {
    on_to_wire(!muted)
}

pub fn wire_to_muted(wire: i32) -> bool {
    !wire_to_on(wire)
}

/// Pan, -1.0 (left) ..= +1.0 (right)
pub fn pan_to_wire(pan: f32) -> f32 {
    (pan + 1.0) / 2.0
}

pub fn wire_to_pan(wire: f32) -> f32 {
    wire * 2.0 - 1.0
}

/// EQ band gain, -15 ..= +15 dB
pub fn eq_gain_to_wire(db: f32) -> f32 {
    (db + 15.0) / 30.0
}

pub fn wire_to_eq_gain(wire: f32) -> f32 {
    wire * 30.0 - 15.0
}

/// Gate threshold, -80 ..= 0 dB
pub fn gate_threshold_to_wire(db: f32) -> f32 {
    (db + 80.0) / 80.0
}

pub fn wire_to_gate_threshold(wire: f32) -> f32 {
    wire * 80.0 - 80.0
}

/// Compressor threshold, -60 ..= 0 dB
pub fn comp_threshold_to_wire(db: f32) -> f32 {
    (db + 60.0) / 60.0
}

pub fn wire_to_comp_threshold(wire: f32) -> f32 {
    wire * 60.0 - 60.0
}

/// Compressor ratio, 1:1 ..= 20:1
pub fn comp_ratio_to_wire(ratio: f32) -> f32 {
    (ratio - 1.0) / 19.0
}

pub fn wire_to_comp_ratio(wire: f32) -> f32 {
    wire * 19.0 + 1.0
}

/// Headamp gain, -12 ..= +60 dB
pub fn headamp_gain_to_wire(db: f32) -> f32 {
    (db + 12.0) / 72.0
}

pub fn wire_to_headamp_gain(wire: f32) -> f32 {
    wire * 72.0 - 12.0
}

/// Percent, 0 ..= 100
pub fn percent_to_wire(percent: f32) -> f32 {
    percent / 100.0
}

pub fn wire_to_percent(wire: f32) -> f32 {
    wire * 100.0
}

/// Fader level in dB, -90 (-inf) ..= +10, following the four-segment fader law.
pub fn fader_db_to_wire(db: f32) -> f32 {
    if db < -60.0 {
        (db + 90.0) / 480.0
    } else if db < -30.0 {
        (db + 70.0) / 160.0
    } else if db < -10.0 {
        (db + 50.0) / 80.0
    } else {
        (db + 30.0) / 40.0
    }
}

pub fn wire_to_fader_db(wire: f32) -> f32 {
    if wire >= 0.5 {
        wire * 40.0 - 30.0
    } else if wire >= 0.25 {
        wire * 80.0 - 50.0
    } else if wire >= 0.0625 {
        wire * 160.0 - 70.0
    } else {
        wire * 480.0 - 90.0
    }
}
