//! Symbol to pulse expansion.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Length of the low pulse put in front of sequences that start high.
pub const LEAD_LOW_US: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn as_u8(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

/// Constant level interval of the transmitted waveform, duration in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(u8, u32)", into = "(u8, u32)")]
pub struct Pulse {
    pub level: Level,
    pub duration: u32,
}

impl Pulse {
    pub fn new(level: Level, duration: u32) -> Self {
        Pulse { level, duration }
    }

    pub fn low(duration: u32) -> Self {
        Pulse::new(Level::Low, duration)
    }

    pub fn high(duration: u32) -> Self {
        Pulse::new(Level::High, duration)
    }
}

impl TryFrom<(u8, u32)> for Pulse {
    type Error = String;

    fn try_from((level, duration): (u8, u32)) -> std::result::Result<Self, Self::Error> {
        match level {
            0 => Ok(Pulse::low(duration)),
            1 => Ok(Pulse::high(duration)),
            other => Err(format!("pulse level must be 0 or 1, got {}", other)),
        }
    }
}

impl From<Pulse> for (u8, u32) {
    fn from(pulse: Pulse) -> Self {
        (pulse.level.as_u8(), pulse.duration)
    }
}

/// Maps each symbol of the RF alphabet to the pulses it is made of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionTable(BTreeMap<char, Vec<Pulse>>);

impl ConversionTable {
    pub fn empty() -> Self {
        ConversionTable(BTreeMap::new())
    }

    pub fn get(&self, symbol: char) -> Option<&[Pulse]> {
        self.0.get(&symbol).map(Vec::as_slice)
    }

    /// Add or replace the pulses for `symbol`.
    pub fn insert(&mut self, symbol: char, pulses: Vec<Pulse>) {
        self.0.insert(symbol, pulses);
    }
}

impl Default for ConversionTable {
    fn default() -> Self {
        let mut table = ConversionTable::empty();
        table.insert('1', vec![Pulse::high(1270), Pulse::low(410)]);
        table.insert('0', vec![Pulse::high(410), Pulse::low(1270)]);
        table.insert('l', vec![Pulse::high(410), Pulse::low(12000)]);
        table
    }
}

/// Expand `pattern` into the concatenation of its symbols' pulses.
pub fn expand(pattern: &str, table: &ConversionTable) -> Result<Vec<Pulse>> {
    let mut pulses = Vec::new();

    for symbol in pattern.chars() {
        let conv = table.get(symbol).ok_or(Error::UnknownSymbol(symbol))?;
        pulses.extend_from_slice(conv);
    }

    Ok(pulses)
}

/// Merge consecutive pulses of the same level, summing their durations.
///
/// Fails if a merged run does not fit in a `u32`.
pub fn simplify(pulses: Vec<Pulse>) -> Result<Vec<Pulse>> {
    if pulses.len() <= 1 {
        return Ok(pulses);
    }

    let mut res: Vec<Pulse> = Vec::with_capacity(pulses.len());

    for (index, pulse) in pulses.into_iter().enumerate() {
        match res.last_mut() {
            Some(last) if last.level == pulse.level => {
                last.duration = last
                    .duration
                    .checked_add(pulse.duration)
                    .ok_or(Error::RunOverflow { index })?;
            }
            _ => res.push(pulse),
        }
    }

    Ok(res)
}

/// The receiver starts sampling on a low level, so a sequence starting high
/// gets a short low pulse in front.
pub fn with_low_lead(mut pulses: Vec<Pulse>) -> Vec<Pulse> {
    if let Some(first) = pulses.first() {
        if first.level != Level::Low {
            pulses.insert(0, Pulse::low(LEAD_LOW_US));
        }
    }
    pulses
}

/// Lead-in and merge, ready for framing.
pub fn prepare(pulses: Vec<Pulse>) -> Result<Vec<Pulse>> {
    simplify(with_low_lead(pulses))
}
