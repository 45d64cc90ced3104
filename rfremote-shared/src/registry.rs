//! Logical command ids to device link calls.

use crate::config::{toggle_id, CommandDef, Tables};
use crate::error::{Error, Result};
use crate::frame::{self, FrameMode};
use crate::link::{DeviceLink, Transport};
use crate::protocol::Request;
use crate::pulse::{self, Pulse};

/// A resolved command, ready to go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Builtin { device: u32, number: u32 },
    Frame { device: u32, bytes: Vec<u8> },
}

impl Dispatch {
    pub fn device(&self) -> u32 {
        match self {
            Dispatch::Builtin { device, .. } | Dispatch::Frame { device, .. } => *device,
        }
    }

    /// The request bytes as they would be written to the link.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Dispatch::Builtin { device, number } => Request::Builtin {
                device: *device,
                number: *number,
            }
            .encode(),
            Dispatch::Frame { bytes, .. } => bytes.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    tables: Tables,
    mode: FrameMode,
}

impl CommandRegistry {
    pub fn new(tables: Tables) -> Self {
        CommandRegistry {
            tables,
            mode: FrameMode::default(),
        }
    }

    /// Framing used for pattern commands.
    pub fn with_mode(mut self, mode: FrameMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> FrameMode {
        self.mode
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn set_conversion(&mut self, symbol: char, pulses: Vec<Pulse>) {
        self.tables.conversions.insert(symbol, pulses);
    }

    /// Add or replace a command. The device binding is kept unless a new one is given.
    pub fn set_command(&mut self, id: &str, def: CommandDef, device: Option<u32>) {
        self.tables.commands.insert(id.to_string(), def);
        if let Some(device) = device {
            self.bind_device(id, device);
        }
    }

    pub fn bind_device(&mut self, id: &str, device: u32) {
        self.tables.devices.insert(id.to_string(), device);
    }

    pub fn set_object_toggle(&mut self, object_id: &str, on: bool, device: u32, def: CommandDef) {
        self.set_command(&toggle_id(object_id, on), def, Some(device));
    }

    fn lookup(&self, id: &str) -> Result<(&CommandDef, u32)> {
        let def = self.tables.commands.get(id);
        let device = self.tables.devices.get(id);

        match (def, device) {
            (Some(def), Some(device)) => Ok((def, *device)),
            _ => Err(Error::UnknownCommand(id.to_string())),
        }
    }

    /// Pulses a pattern command transmits, lead-in included. `None` for builtins.
    pub fn pulses(&self, id: &str) -> Result<Option<Vec<Pulse>>> {
        match self.lookup(id)? {
            (CommandDef::Builtin(_), _) => Ok(None),
            (CommandDef::Pattern(pattern), _) => {
                let pulses = pulse::expand(pattern, &self.tables.conversions)?;
                Ok(Some(pulse::prepare(pulses)?))
            }
        }
    }

    pub fn resolve(&self, id: &str) -> Result<Dispatch> {
        let (def, device) = self.lookup(id)?;

        match def {
            CommandDef::Builtin(number) => Ok(Dispatch::Builtin {
                device,
                number: *number,
            }),
            CommandDef::Pattern(pattern) => {
                let pulses = pulse::expand(pattern, &self.tables.conversions)?;
                let bytes = frame::build(&pulse::prepare(pulses)?, device, self.mode)?;
                Ok(Dispatch::Frame { device, bytes })
            }
        }
    }

    /// Resolve `id` and send it over `link`.
    pub fn send<T: Transport>(&self, link: &mut DeviceLink<T>, id: &str) -> Result<bool> {
        log::info!("Sending command {}", id);

        match self.resolve(id)? {
            Dispatch::Builtin { device, number } => link.send_builtin(device, number),
            Dispatch::Frame { bytes, .. } => link.send_command(&bytes),
        }
    }

    pub fn toggle<T: Transport>(
        &self,
        link: &mut DeviceLink<T>,
        object_id: &str,
        on: bool,
    ) -> Result<bool> {
        self.send(link, &toggle_id(object_id, on))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_builtin() {
        let registry = CommandRegistry::default();
        assert_eq!(
            registry.resolve("2_1").unwrap(),
            Dispatch::Builtin { device: 1, number: 3 }
        );
        assert_eq!(registry.resolve("2_1").unwrap().encode(), b"x\n1\n3\n".to_vec());
    }

    #[test]
    fn resolve_pattern_binary() {
        let registry = CommandRegistry::default();

        match registry.resolve("4_1").unwrap() {
            Dispatch::Frame { device, bytes } => {
                assert_eq!(device, 1);
                // lead-in low, then the first high of 'l'
                assert_eq!(&bytes[..8], b"b\n1\n\x00\x0a\x01\x9a");
                assert_eq!(&bytes[bytes.len() - 2..], &[0, 0]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn resolve_pattern_text() {
        let mut registry = CommandRegistry::default().with_mode(FrameMode::Text);
        registry.set_object_toggle("9", true, 4, CommandDef::Pattern("10".into()));

        let dispatch = registry.resolve("9_1").unwrap();
        assert_eq!(dispatch.device(), 4);
        assert_eq!(
            dispatch.encode(),
            b"t\n4\n10\n1270\n410\n410\n1270\n0\n".to_vec()
        );
    }

    #[test]
    fn unknown_command() {
        let registry = CommandRegistry::default();
        assert!(matches!(registry.resolve("9_1"), Err(Error::UnknownCommand(id)) if id == "9_1"));
    }

    #[test]
    fn command_without_device_is_unknown() {
        let mut registry = CommandRegistry::default();
        registry.set_command("8_1", CommandDef::Builtin(7), None);
        assert!(matches!(registry.resolve("8_1"), Err(Error::UnknownCommand(_))));

        registry.bind_device("8_1", 2);
        assert_eq!(
            registry.resolve("8_1").unwrap(),
            Dispatch::Builtin { device: 2, number: 7 }
        );
    }

    #[test]
    fn unknown_symbol_in_pattern() {
        let mut registry = CommandRegistry::default();
        registry.set_command("8_0", CommandDef::Pattern("1z".into()), Some(1));
        assert!(matches!(registry.resolve("8_0"), Err(Error::UnknownSymbol('z'))));

        registry.set_conversion('z', vec![Pulse::high(100)]);
        assert!(registry.resolve("8_0").is_ok());
    }

    #[test]
    fn wide_symbols_overflow_in_text_mode() {
        let mut registry = CommandRegistry::default().with_mode(FrameMode::Text);
        registry.set_conversion('a', vec![Pulse::high(4_000_000_000)]);
        registry.set_command("8_1", CommandDef::Pattern("aa".into()), Some(1));

        assert!(matches!(registry.resolve("8_1"), Err(Error::RunOverflow { .. })));
        assert!(matches!(registry.pulses("8_1"), Err(Error::RunOverflow { .. })));

        // One wide pulse still frames in text mode
        registry.set_command("8_1", CommandDef::Pattern("a".into()), None);
        assert!(registry.resolve("8_1").is_ok());
    }

    #[test]
    fn pulses_for_pattern() {
        let registry = CommandRegistry::default();
        assert_eq!(registry.pulses("1_1").unwrap(), None);

        let pulses = registry.pulses("5_0").unwrap().unwrap();
        assert_eq!(pulses[0], Pulse::low(10));
        assert!(pulses.windows(2).all(|w| w[0].level != w[1].level));
    }
}
