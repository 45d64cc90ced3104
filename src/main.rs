use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use structopt::StructOpt;

use rfremote_shared::{
    CommandRegistry, DeviceLink, Error, FrameMode, LinkSettings, SerialTransport, Tables,
};

mod irsend;
mod sensors;
mod switch;
mod vcdutils;

#[derive(Debug, StructOpt)]
#[structopt(name = "rfremote", about = "Remote switch, sensor and infrared tool")]
struct Opt {
    /// Serial Device. Defaults to /dev/ttyS0
    #[structopt(long = "device", parse(from_os_str))]
    serial: Option<PathBuf>,
    #[structopt(long, default_value = "57600")]
    baud: u32,
    /// Read timeout in seconds
    #[structopt(long, default_value = "10")]
    timeout: u64,
    /// Json file with conversion, command and device tables
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,
    /// Send patterns with text framing instead of binary
    #[structopt(long)]
    text: bool,
    /// Skip flushing the device after the port is opened
    #[structopt(long)]
    no_sync: bool,
    #[structopt(short, long)]
    debug: bool,
    #[structopt(subcommand)]
    cmd: CliCommand,
}

#[derive(StructOpt, Debug)]
enum CliCommand {
    /// Switch an object on or off
    Toggle {
        object: String,
        /// on | off | 1 | 0
        #[structopt(parse(try_from_str = switch::parse_on_off))]
        state: bool,
    },
    /// Send a command from the command table
    Send { id: String },
    /// Transmit a signal stored on the device
    Builtin { addr: u32, number: u32 },
    /// Repeat the last transmission
    Redo { addr: u32 },
    /// Read all sensors
    Sensors {},
    /// Capture one infrared code
    IrRead {},
    /// Transmit an infrared code
    IrWrite { addr: u32, command: u32, bits: u32 },
    /// Print the frame for a command. Optionally dump its waveform to a vcd file
    Encode {
        id: String,
        #[structopt(long, parse(from_os_str))]
        vcd: Option<PathBuf>,
    },
    /// Transmit a waveform recorded in a vcd file
    Replay {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
        #[structopt(long, default_value = "1")]
        addr: u32,
    },
    /// List serial ports
    Ports {},
    /// List the command table
    List {},
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();

    let loglevel = if opt.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new().filter_level(loglevel).init();

    let tables = match &opt.config {
        Some(path) => Tables::from_path(path)
            .with_context(|| format!("loading tables from {}", path.display()))?,
        None => Tables::default(),
    };

    let mode = if opt.text {
        FrameMode::Text
    } else {
        FrameMode::Binary
    };

    let registry = CommandRegistry::new(tables).with_mode(mode);

    let settings = LinkSettings {
        baud_rate: opt.baud,
        timeout: Duration::from_secs(opt.timeout),
        ..LinkSettings::default()
    };

    let devpath = opt
        .serial
        .unwrap_or_else(|| PathBuf::from("/dev/ttyS0"));
    let sync = !opt.no_sync;
    let open = || open_link(&devpath, &settings, sync);

    match opt.cmd {
        CliCommand::Toggle { object, state } => {
            let mut link = open()?;
            switch::toggle(&mut link, &registry, &object, state)
        }
        CliCommand::Send { id } => {
            let mut link = open()?;
            switch::send(&mut link, &registry, &id)
        }
        CliCommand::Builtin { addr, number } => {
            let mut link = open()?;
            switch::check_ack(link.send_builtin(addr, number)?)
        }
        CliCommand::Redo { addr } => {
            let mut link = open()?;
            switch::check_ack(link.send_redo(addr)?)
        }
        CliCommand::Sensors {} => {
            let mut link = open()?;
            sensors::command_sensors(&mut link)
        }
        CliCommand::IrRead {} => {
            let mut link = open()?;
            irsend::receive(&mut link)
        }
        CliCommand::IrWrite { addr, command, bits } => {
            let mut link = open()?;
            irsend::transmit(&mut link, addr, command, bits)
        }
        CliCommand::Encode { id, vcd } => vcdutils::command_encode(&registry, &id, vcd.as_deref()),
        CliCommand::Replay { path, addr } => {
            let mut link = open()?;
            vcdutils::command_replay(&mut link, &path, addr, registry.mode())
        }
        CliCommand::Ports {} => {
            for port in SerialTransport::list_ports()? {
                println!("{}", port.port_name);
            }
            Ok(())
        }
        CliCommand::List {} => {
            switch::list(&registry);
            Ok(())
        }
    }
}

fn open_link(
    path: &Path,
    settings: &LinkSettings,
    sync: bool,
) -> anyhow::Result<DeviceLink<SerialTransport>> {
    log::info!("Opening {} at {} baud", path.display(), settings.baud_rate);

    let port = SerialTransport::open(path, settings)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut link = DeviceLink::with_settings(port, settings);

    if sync {
        match link.sync() {
            Ok(true) => (),
            Ok(false) => log::warn!("Device reported err while syncing"),
            Err(Error::Timeout) => log::warn!("No answer from device while syncing"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(link)
}
