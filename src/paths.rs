//! Address builders for the mixer's OSC tree.
//!
//! Channel-like indices are 1-based and zero-padded to two digits; headamps
//! are 0-based and padded to three. Indices are not range-checked.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mixer information query (version, name, model, firmware)
pub const INFO: &str = "/info";

/// Mixer status query (state, IP, name)
pub const STATUS: &str = "/status";

/// Extended info query (IP, name, model, firmware)
pub const XINFO: &str = "/xinfo";

/// Metering request; replies carry an undecoded blob
pub const METERS: &str = "/meters";

/// A strip or strip-like target that owns a fader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Channel(u8),
    Bus(u8),
    Aux(u8),
    Matrix(u8),
    Dca(u8),
    Fx(u8),
    MainStereo,
    MainMono,
}

impl Target {
    /// Base address of the target, e.g. `/ch/01`
    pub fn base(&self) -> String {
        match self {
            Target::Channel(n) => format!("/ch/{:02}", n),
            Target::Bus(n) => format!("/bus/{:02}", n),
            Target::Aux(n) => format!("/aux/{:02}", n),
            Target::Matrix(n) => format!("/mtx/{:02}", n),
            Target::Dca(n) => format!("/dca/{}", n),
            Target::Fx(n) => format!("/fx/{:02}", n),
            Target::MainStereo => "/main/st".to_string(),
            Target::MainMono => "/main/m".to_string(),
        }
    }

    /// Node holding fader/on/pan. DCAs keep them directly under the base.
    pub fn mix(&self) -> String {
        match self {
            Target::Dca(_) => self.base(),
            _ => format!("{}/mix", self.base()),
        }
    }

    pub fn fader(&self) -> String {
        format!("{}/fader", self.mix())
    }

    /// The `on` node. Wire 1 = unmuted.
    pub fn on(&self) -> String {
        format!("{}/on", self.mix())
    }

    pub fn pan(&self) -> String {
        format!("{}/pan", self.mix())
    }

    pub fn name(&self) -> String {
        format!("{}/config/name", self.base())
    }

    /// Send level from this target to mix bus `bus`
    pub fn send_level(&self, bus: u8) -> String {
        format!("{}/{:02}/level", self.mix(), bus)
    }

    pub fn eq_on(&self) -> String {
        format!("{}/eq/on", self.base())
    }

    pub fn eq_gain(&self, band: u8) -> String {
        format!("{}/eq/{}/g", self.base(), band)
    }

    pub fn eq_freq(&self, band: u8) -> String {
        format!("{}/eq/{}/f", self.base(), band)
    }

    pub fn eq_q(&self, band: u8) -> String {
        format!("{}/eq/{}/q", self.base(), band)
    }

    pub fn gate_on(&self) -> String {
        format!("{}/gate/on", self.base())
    }

    pub fn gate_threshold(&self) -> String {
        format!("{}/gate/thr", self.base())
    }

    pub fn dyn_on(&self) -> String {
        format!("{}/dyn/on", self.base())
    }

    pub fn dyn_threshold(&self) -> String {
        format!("{}/dyn/thr", self.base())
    }

    pub fn dyn_ratio(&self) -> String {
        format!("{}/dyn/ratio", self.base())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base())
    }
}

/// Base address of headamp `index` (0-based)
pub fn headamp(index: u8) -> String {
    format!("/headamp/{:03}", index)
}

pub fn headamp_gain(index: u8) -> String {
    format!("{}/gain", headamp(index))
}

pub fn headamp_phantom(index: u8) -> String {
    format!("{}/phantom", headamp(index))
}

/// Talkback engage node for bank `A` or `B`
pub fn talkback(bank: TalkbackBank) -> String {
    let bank = match bank {
        TalkbackBank::A => "A",
        TalkbackBank::B => "B",
    };
    format!("/-stat/talk/{}", bank)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TalkbackBank {
    A,
    B,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_paths_are_zero_padded() {
        let ch = Target::Channel(1);
        assert_eq!(ch.fader(), "/ch/01/mix/fader");
        assert_eq!(ch.on(), "/ch/01/mix/on");
        assert_eq!(ch.pan(), "/ch/01/mix/pan");
        assert_eq!(ch.name(), "/ch/01/config/name");
        assert_eq!(ch.eq_gain(1), "/ch/01/eq/1/g");
        assert_eq!(ch.send_level(3), "/ch/01/mix/03/level");
        assert_eq!(Target::Channel(32).dyn_ratio(), "/ch/32/dyn/ratio");
    }

    #[test]
    fn other_targets() {
        assert_eq!(Target::Bus(12).fader(), "/bus/12/mix/fader");
        assert_eq!(Target::Aux(8).base(), "/aux/08");
        assert_eq!(Target::Matrix(6).on(), "/mtx/06/mix/on");
        assert_eq!(Target::Fx(4).base(), "/fx/04");
        assert_eq!(Target::MainStereo.fader(), "/main/st/mix/fader");
        assert_eq!(Target::MainMono.on(), "/main/m/mix/on");
    }

    #[test]
    fn dca_has_no_mix_node() {
        assert_eq!(Target::Dca(3).fader(), "/dca/3/fader");
        assert_eq!(Target::Dca(3).on(), "/dca/3/on");
        assert_eq!(Target::Dca(3).name(), "/dca/3/config/name");
    }

    #[test]
    fn headamp_is_zero_based_three_digits() {
        assert_eq!(headamp_gain(0), "/headamp/000/gain");
        assert_eq!(headamp_phantom(127), "/headamp/127/phantom");
    }

    #[test]
    fn talkback_banks() {
        assert_eq!(talkback(TalkbackBank::A), "/-stat/talk/A");
        assert_eq!(talkback(TalkbackBank::B), "/-stat/talk/B");
    }
}
