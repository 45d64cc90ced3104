use std::convert::TryFrom;
use std::fs::File;
use std::io::{self, ErrorKind::InvalidInput, Write};
use std::path::Path;

use anyhow::{bail, Context};
use vcd::{self, IdCode, SimulationCommand, TimescaleUnit, Value};

use rfremote_shared::{
    pulse, CommandRegistry, DeviceLink, Dispatch, FrameMode, Level, Pulse, Transport,
};

use crate::switch::check_ack;

/// Writes pulse sequences as a single wire `top.rf`, one tick per microsecond.
pub struct VcdWriter<W: Write> {
    vcd: vcd::Writer<W>,
    wire_id: IdCode,
}

impl<W: Write> VcdWriter<W> {
    pub fn new(w: W) -> io::Result<Self> {
        let mut writer = vcd::Writer::new(w);

        writer.timescale(1, TimescaleUnit::US)?;
        writer.add_module("top")?;
        let wire_id = writer.add_wire(1, "rf")?;
        writer.upscope()?;
        writer.enddefinitions()?;

        // Initial value
        writer.begin(SimulationCommand::Dumpvars)?;
        writer.change_scalar(wire_id, Value::V0)?;
        writer.end()?;

        Ok(Self {
            vcd: writer,
            wire_id,
        })
    }

    pub fn write_pulses(&mut self, pulses: &[Pulse]) -> io::Result<()> {
        let mut ts = 0;

        for pulse in pulses {
            self.write_value(ts, pulse.level)?;
            ts += u64::from(pulse.duration);
        }

        // Back to idle after the last pulse
        self.write_value(ts, Level::Low)
    }

    fn write_value(&mut self, ts: u64, level: Level) -> io::Result<()> {
        let value = match level {
            Level::Low => Value::V0,
            Level::High => Value::V1,
        };

        self.vcd.timestamp(ts)?;
        self.vcd.change_scalar(self.wire_id, value)
    }
}

/// Read the waveform on `top.rf` (or `top.data`) back into pulses.
pub fn vcd_to_pulses<R: io::Read>(reader: R) -> io::Result<Vec<Pulse>> {
    let mut parser = vcd::Parser::new(reader);

    let header = parser.parse_header()?;
    let wire = header
        .find_var(&["top", "rf"])
        .or_else(|| header.find_var(&["top", "data"]))
        .ok_or_else(|| io::Error::new(InvalidInput, "no wire top.rf or top.data"))?
        .code;

    let us_per_tick: u64 = match header.timescale {
        None => 1,
        Some((n, TimescaleUnit::S)) => u64::from(n) * 1_000_000,
        Some((n, TimescaleUnit::MS)) => u64::from(n) * 1_000,
        Some((n, TimescaleUnit::US)) => u64::from(n),
        Some((_, unit)) => {
            return Err(io::Error::new(
                InvalidInput,
                format!("unsupported timescale unit {:?}", unit),
            ))
        }
    };

    let mut current_ts = 0;
    let mut edges: Vec<(u64, Level)> = Vec::new();

    for command_result in parser {
        use vcd::Command::*;
        let command = command_result?;
        match command {
            ChangeScalar(i, v) if i == wire => {
                let level = if v == Value::V1 { Level::High } else { Level::Low };
                edges.push((current_ts, level));
            }
            Timestamp(ts) => current_ts = ts,
            _ => (),
        }
    }

    let mut pulses = Vec::new();
    for pair in edges.windows(2) {
        let (start, level) = pair[0];
        let ticks = pair[1].0.checked_sub(start).ok_or_else(|| {
            io::Error::new(
                InvalidInput,
                format!("timestamp {} goes back before {}", pair[1].0, start),
            )
        })?;
        if ticks == 0 {
            continue;
        }

        let duration = ticks
            .checked_mul(us_per_tick)
            .and_then(|us| u32::try_from(us).ok())
            .ok_or_else(|| io::Error::new(InvalidInput, "pulse longer than u32 microseconds"))?;
        pulses.push(Pulse::new(level, duration));
    }

    pulse::simplify(pulses).map_err(|e| io::Error::new(InvalidInput, e.to_string()))
}

pub fn command_encode(
    registry: &CommandRegistry,
    id: &str,
    vcd_path: Option<&Path>,
) -> anyhow::Result<()> {
    let dispatch = registry.resolve(id)?;

    match &dispatch {
        Dispatch::Builtin { device, number } => {
            println!("{}: builtin {} on device {}", id, number, device)
        }
        Dispatch::Frame { device, bytes } => println!(
            "{}: {} byte {} frame for device {}",
            id,
            bytes.len(),
            registry.mode(),
            device
        ),
    }
    println!("{}", dispatch.encode().escape_ascii());

    if let Some(path) = vcd_path {
        let pulses = match registry.pulses(id)? {
            Some(pulses) => pulses,
            None => bail!("{} is a builtin command, its waveform is stored on the device", id),
        };

        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut vcd = VcdWriter::new(file)?;
        vcd.write_pulses(&pulses)?;

        log::info!("Wrote {} pulses to {}", pulses.len(), path.display());
    }

    Ok(())
}

pub fn command_replay<T: Transport>(
    link: &mut DeviceLink<T>,
    path: &Path,
    device: u32,
    mode: FrameMode,
) -> anyhow::Result<()> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let pulses = vcd_to_pulses(file)?;

    if pulses.is_empty() {
        bail!("no pulses found in {}", path.display());
    }

    log::info!("Replaying {} pulses from {}", pulses.len(), path.display());
    check_ack(link.send_pulses(pulses, device, mode)?)
}
