//! Wire framing of pulse sequences.
//!
//! Only durations go on the wire. The level alternates starting from low, so
//! callers pass sequences that went through [`crate::pulse::with_low_lead`]
//! and [`crate::pulse::simplify`].

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::pulse::Pulse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    /// One decimal duration per line.
    Text,
    /// Big endian 16 bit durations.
    Binary,
}

impl FrameMode {
    pub fn tag(self) -> &'static str {
        match self {
            FrameMode::Text => "t",
            FrameMode::Binary => "b",
        }
    }
}

impl Default for FrameMode {
    fn default() -> Self {
        FrameMode::Binary
    }
}

impl fmt::Display for FrameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameMode::Text => f.write_str("text"),
            FrameMode::Binary => f.write_str("binary"),
        }
    }
}

impl FromStr for FrameMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "t" | "text" => Ok(FrameMode::Text),
            "b" | "binary" => Ok(FrameMode::Binary),
            other => Err(Error::UnsupportedFrameMode(other.to_string())),
        }
    }
}

/// Serialize `pulses` for `device`, terminated by a zero duration.
pub fn build(pulses: &[Pulse], device: u32, mode: FrameMode) -> Result<Vec<u8>> {
    let mut buf = format!("{}\n{}\n", mode.tag(), device).into_bytes();

    match mode {
        FrameMode::Text => {
            for pulse in pulses {
                buf.extend_from_slice(format!("{}\n", pulse.duration).as_bytes());
            }
            buf.extend_from_slice(b"0\n");
        }
        FrameMode::Binary => {
            buf.reserve(pulses.len() * 2 + 2);
            for (index, pulse) in pulses.iter().enumerate() {
                if pulse.duration > u32::from(u16::MAX) {
                    return Err(Error::DurationOverflow {
                        index,
                        duration: pulse.duration,
                    });
                }
                buf.extend_from_slice(&(pulse.duration as u16).to_be_bytes());
            }
            buf.extend_from_slice(&[0, 0]);
        }
    }

    Ok(buf)
}
