//! Conversion, command and device tables.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pulse::ConversionTable;

/// What a command id transmits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandDef {
    /// Signal stored on the microcontroller
    Builtin(u32),
    /// Symbols of the conversion table
    Pattern(String),
}

/// Command id for switching `object_id` on or off, `<object>_<0|1>`.
pub fn toggle_id(object_id: &str, on: bool) -> String {
    format!("{}_{}", object_id, on as u8)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub conversions: ConversionTable,
    pub commands: BTreeMap<String, CommandDef>,
    pub devices: BTreeMap<String, u32>,
}

impl Tables {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl Default for Tables {
    fn default() -> Self {
        let mut commands = BTreeMap::new();

        // Signals 0-5 are stored on the device
        for (n, object) in ["1", "2", "3"].iter().enumerate() {
            let n = n as u32 * 2;
            commands.insert(toggle_id(object, false), CommandDef::Builtin(n));
            commands.insert(toggle_id(object, true), CommandDef::Builtin(n + 1));
        }

        let patterns = [
            ("4", "10010000010010000000000000l", "01010000010010000000000000l"),
            ("5", "10010000010001000000000000l", "01010000010001000000000000l"),
            ("6", "10010000010000100000000000l", "01010000010000100000000000l"),
        ];
        for (object, on, off) in patterns.iter() {
            commands.insert(
                toggle_id(object, true),
                CommandDef::Pattern(format!("l{}", on.repeat(5))),
            );
            commands.insert(
                toggle_id(object, false),
                CommandDef::Pattern(format!("l{}", off.repeat(5))),
            );
        }

        let devices = commands.keys().map(|id| (id.clone(), 1)).collect();

        Tables {
            conversions: ConversionTable::default(),
            commands,
            devices,
        }
    }
}
