//! Error types for the rfremote link.

use std::io;

use thiserror::Error;

/// Every way an rfremote operation can fail.
///
/// A microcontroller rejecting a single command (`err`) is not an error, it
/// is reported as an `Ok(false)` acknowledgment.
#[derive(Debug, Error)]
pub enum Error {
    /// Pattern contains a character with no conversion table entry.
    #[error("unknown symbol {0:?} in pattern")]
    UnknownSymbol(char),

    #[error("unsupported frame mode: {0:?}")]
    UnsupportedFrameMode(String),

    /// Pulse duration does not fit the 16 bit binary framing.
    #[error("pulse {index} duration {duration} does not fit in 16 bits")]
    DurationOverflow { index: usize, duration: u32 },

    /// Merging same level pulses overflowed the duration.
    #[error("merged pulse run at {index} exceeds {} microseconds", u32::MAX)]
    RunOverflow { index: usize },

    /// Command id missing from the command or device table.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Microcontroller reported `ferr`. The link has been closed.
    #[error("fatal link error reported by device")]
    FatalLink,

    #[error("timed out waiting for device response")]
    Timeout,

    /// Response did not follow the expected grammar.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("link is closed")]
    LinkClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Errors after which the link must not be used again.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::FatalLink | Error::LinkClosed)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
