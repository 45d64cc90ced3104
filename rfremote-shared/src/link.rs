use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Duration;

#[cfg(feature = "serial")]
use std::path::Path;

#[cfg(feature = "serial")]
use serialport::{ClearBuffer, SerialPort, SerialPortInfo};

use crate::error::{Error, Result};
use crate::frame::{self, FrameMode};
use crate::protocol::{parse_sensor_line, IrCode, Request, Response, SensorValue};
use crate::pulse::{self, ConversionTable, Pulse};

/// Byte channel to the microcontroller.
pub trait Transport {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Read up to and including the next `\n`.
    /// A read timeout is reported as `io::ErrorKind::TimedOut`.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Drop everything received but not yet read.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) {}
}

#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub baud_rate: u32,
    /// Per line read timeout
    pub timeout: Duration,
    /// Unexpected lines tolerated in one exchange
    pub max_stray_lines: usize,
}

impl Default for LinkSettings {
    fn default() -> Self {
        LinkSettings {
            baud_rate: 57_600,
            timeout: Duration::from_secs(10),
            max_stray_lines: 64,
        }
    }
}

/// Byte stream a [`PortTransport`] runs on.
pub trait Port: Read + Write {
    /// Flush the receive side of the device driver.
    fn clear_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(feature = "serial")]
impl Port for Box<dyn SerialPort> {
    fn clear_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// Line transport over a buffered port. A line cut short by a read timeout
/// is kept and completed by the next read.
pub struct PortTransport<P: Port> {
    port: BufReader<P>,
    partial: Vec<u8>,
}

#[cfg(feature = "serial")]
pub type SerialTransport = PortTransport<Box<dyn SerialPort>>;

impl<P: Port> PortTransport<P> {
    pub fn new(port: P) -> Self {
        PortTransport {
            port: BufReader::new(port),
            partial: Vec::new(),
        }
    }
}

#[cfg(feature = "serial")]
impl PortTransport<Box<dyn SerialPort>> {
    pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
        serialport::available_ports().map_err(|e| io::Error::from(e).into())
    }

    pub fn open<P: AsRef<Path>>(path: P, settings: &LinkSettings) -> Result<Self> {
        let path = path.as_ref().to_string_lossy();
        let port = serialport::new(path, settings.baud_rate)
            .timeout(settings.timeout)
            .open()
            .map_err(io::Error::from)?;

        Ok(PortTransport::new(port))
    }
}

impl<P: Port> Transport for PortTransport<P> {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let port = self.port.get_mut();
        port.write_all(buf)?;
        port.flush()
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        // On error the bytes read so far stay in `partial`
        self.port.read_until(b'\n', &mut self.partial)?;

        if self.partial.last() != Some(&b'\n') {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(std::mem::take(&mut self.partial))
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.partial.clear();
        let buffered = self.port.buffer().len();
        self.port.consume(buffered);
        self.port.get_mut().clear_input()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    AwaitingAck,
    /// Closed after a fatal error or by the owner. Never reopened.
    Closed,
}

/// Half duplex request/acknowledge link. Owning the link through `&mut self`
/// keeps at most one command outstanding.
pub struct DeviceLink<T: Transport> {
    port: Option<T>,
    state: LinkState,
    max_stray_lines: usize,
    /// A timed out exchange may still deliver its reply
    stale_input: bool,
}

impl<T: Transport> DeviceLink<T> {
    pub fn new(port: T) -> Self {
        Self::with_settings(port, &LinkSettings::default())
    }

    pub fn with_settings(port: T, settings: &LinkSettings) -> Self {
        DeviceLink {
            port: Some(port),
            state: LinkState::Idle,
            max_stray_lines: settings.max_stray_lines,
            stale_input: false,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == LinkState::Closed
    }

    pub fn close(&mut self) {
        if let Some(mut port) = self.port.take() {
            log::info!("Closing device link");
            port.close();
        }
        self.state = LinkState::Closed;
    }

    /// Clear out anything the device picked up while the port was opening.
    pub fn sync(&mut self) -> Result<bool> {
        self.request(&Request::Sync)
    }

    pub fn request(&mut self, req: &Request) -> Result<bool> {
        self.send_command(&req.encode())
    }

    /// Write a framed command and wait for `ok`.
    ///
    /// Returns `Ok(false)` if the device reported `err` at some point before
    /// the `ok`. A `ferr` closes the link.
    pub fn send_command(&mut self, bytes: &[u8]) -> Result<bool> {
        let res = self.write(bytes).and_then(|_| self.read_ack());
        self.finish(res)
    }

    pub fn send_builtin(&mut self, device: u32, number: u32) -> Result<bool> {
        log::info!("Builtin {} on device {}", number, device);
        self.request(&Request::Builtin { device, number })
    }

    pub fn send_redo(&mut self, device: u32) -> Result<bool> {
        self.request(&Request::Redo { device })
    }

    /// Frame and transmit a raw pulse sequence.
    pub fn send_pulses(&mut self, pulses: Vec<Pulse>, device: u32, mode: FrameMode) -> Result<bool> {
        let pulses = pulse::prepare(pulses)?;
        let frame = frame::build(&pulses, device, mode)?;

        log::info!(
            "Sending {} pulses to device {} ({} mode)",
            pulses.len(),
            device,
            mode
        );

        self.send_command(&frame)
    }

    pub fn send_pattern(
        &mut self,
        pattern: &str,
        table: &ConversionTable,
        device: u32,
        mode: FrameMode,
    ) -> Result<bool> {
        let pulses = pulse::expand(pattern, table)?;
        self.send_pulses(pulses, device, mode)
    }

    pub fn read_sensors(&mut self) -> Result<BTreeMap<String, SensorValue>> {
        let res = self
            .write(&Request::ReadSensors.encode())
            .and_then(|_| self.read_sensor_lines());
        self.finish(res)
    }

    pub fn read_infrared(&mut self) -> Result<IrCode> {
        let res = self
            .write(&Request::ReadInfrared.encode())
            .and_then(|_| self.read_ir_lines());
        self.finish(res)
    }

    pub fn write_infrared(&mut self, code: IrCode) -> Result<bool> {
        log::info!("Sending infrared code: {:?}", code);
        self.request(&Request::WriteInfrared(code))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::LinkClosed)?;

        if self.stale_input {
            log::warn!("Discarding input left over from a timed out exchange");
            port.discard_input()?;
            self.stale_input = false;
        }

        log::debug!("-> {:?}", String::from_utf8_lossy(bytes));
        port.write_all(bytes)?;
        self.state = LinkState::AwaitingAck;

        Ok(())
    }

    fn read_response(&mut self) -> Result<Response> {
        let port = self.port.as_mut().ok_or(Error::LinkClosed)?;

        match port.read_line() {
            Ok(line) => {
                let reply = Response::parse(&line);
                log::debug!("<- {:?}", reply);
                Ok(reply)
            }
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                self.stale_input = true;
                Err(Error::Timeout)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_ack(&mut self) -> Result<bool> {
        let mut success = true;
        let mut stray = 0;

        loop {
            match self.read_response()? {
                Response::Ok => return Ok(success),
                Response::Err => {
                    log::warn!("Device rejected command");
                    success = false;
                }
                Response::Ferr => return Err(self.fatal()),
                Response::Data(line) => self.stray(&line, &mut stray)?,
            }
        }
    }

    fn read_sensor_lines(&mut self) -> Result<BTreeMap<String, SensorValue>> {
        let mut readings = BTreeMap::new();
        let mut stray = 0;

        loop {
            match self.read_response()? {
                Response::Ok => return Ok(readings),
                Response::Ferr => return Err(self.fatal()),
                Response::Data(line) => match parse_sensor_line(&line) {
                    Some((name, value)) => {
                        readings.insert(name, value);
                    }
                    None => self.stray(&line, &mut stray)?,
                },
                Response::Err => self.stray("err", &mut stray)?,
            }
        }
    }

    fn read_ir_lines(&mut self) -> Result<IrCode> {
        let device = self.read_number("device")?;
        let command = self.read_number("command")?;
        let bits = self.read_number("bit length")?;

        match self.read_response()? {
            Response::Ok => Ok(IrCode { device, command, bits }),
            Response::Ferr => Err(self.fatal()),
            other => Err(Error::Protocol(format!(
                "infrared read not terminated by ok: {:?}",
                other
            ))),
        }
    }

    fn read_number(&mut self, what: &str) -> Result<u32> {
        match self.read_response()? {
            Response::Data(line) => line.trim().parse().map_err(|_| {
                Error::Protocol(format!("expected infrared {}, got {:?}", what, line))
            }),
            Response::Ferr => Err(self.fatal()),
            other => Err(Error::Protocol(format!(
                "expected infrared {}, got {:?}",
                what, other
            ))),
        }
    }

    fn stray(&self, line: &str, count: &mut usize) -> Result<()> {
        *count += 1;
        log::warn!("Ignoring unexpected line from device: {:?}", line);

        if *count > self.max_stray_lines {
            return Err(Error::Protocol(format!(
                "more than {} unexpected lines in one exchange",
                self.max_stray_lines
            )));
        }
        Ok(())
    }

    fn fatal(&mut self) -> Error {
        log::error!("Device reported a fatal error");
        self.close();
        Error::FatalLink
    }

    /// Back to idle once an exchange ends without closing the link.
    fn finish<R>(&mut self, res: Result<R>) -> Result<R> {
        if self.state == LinkState::AwaitingAck {
            self.state = LinkState::Idle;
        }
        res
    }
}

impl<T: Transport> Drop for DeviceLink<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Hands out one scripted chunk per read, then times out.
    struct ChunkPort {
        chunks: VecDeque<Vec<u8>>,
        cleared: bool,
    }

    impl ChunkPort {
        fn new(chunks: &[&[u8]]) -> Self {
            ChunkPort {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
                cleared: false,
            }
        }
    }

    impl Read for ChunkPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) if chunk.is_empty() => Err(io::ErrorKind::TimedOut.into()),
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Err(io::ErrorKind::TimedOut.into()),
            }
        }
    }

    impl Write for ChunkPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Port for ChunkPort {
        fn clear_input(&mut self) -> io::Result<()> {
            self.cleared = true;
            Ok(())
        }
    }

    #[test]
    fn line_split_by_timeout_is_completed() {
        // An empty chunk stands for a read timeout
        let mut transport = PortTransport::new(ChunkPort::new(&[b"o", b"", b"k\r\n", b"err\r\n"]));

        let err = transport.read_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        assert_eq!(transport.read_line().unwrap(), b"ok\r\n".to_vec());
        assert_eq!(transport.read_line().unwrap(), b"err\r\n".to_vec());
    }

    #[test]
    fn discard_drops_partial_line() {
        let mut transport = PortTransport::new(ChunkPort::new(&[b"fe", b"", b"ok\r\n"]));

        assert!(transport.read_line().is_err());
        transport.discard_input().unwrap();
        assert!(transport.port.get_ref().cleared);

        assert_eq!(transport.read_line().unwrap(), b"ok\r\n".to_vec());
    }

    #[test]
    fn several_lines_in_one_chunk() {
        let mut transport = PortTransport::new(ChunkPort::new(&[b"3\r\n7\r\n", b"ok\r\n"]));

        assert_eq!(transport.read_line().unwrap(), b"3\r\n".to_vec());
        assert_eq!(transport.read_line().unwrap(), b"7\r\n".to_vec());
        assert_eq!(transport.read_line().unwrap(), b"ok\r\n".to_vec());
    }
}
