use std::fmt;

/// Line oriented requests. Pulse frames are built by [`crate::frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Flushes whatever the device buffered at serial start-up
    Sync,
    /// Poll all sensors
    ReadSensors,
    /// Transmit a signal stored on the device
    Builtin { device: u32, number: u32 },
    /// Repeat the last transmission
    Redo { device: u32 },
    /// Capture one infrared code
    ReadInfrared,
    WriteInfrared(IrCode),
}

impl Request {
    pub fn encode(&self) -> Vec<u8> {
        let s = match self {
            Request::Sync => "0\n".to_string(),
            Request::ReadSensors => "r\n".to_string(),
            Request::Builtin { device, number } => format!("x\n{}\n{}\n", device, number),
            Request::Redo { device } => format!("w\n{}\n", device),
            Request::ReadInfrared => "i\n".to_string(),
            Request::WriteInfrared(code) => {
                format!("l\n{}\n{}\n{}\n", code.device, code.command, code.bits)
            }
        };
        s.into_bytes()
    }
}

/// One line received from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    Err,
    Ferr,
    Data(String),
}

impl Response {
    pub fn parse(line: &[u8]) -> Self {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(&['\r', '\n'][..]);

        match line {
            "ok" => Response::Ok,
            "err" => Response::Err,
            "ferr" => Response::Ferr,
            data => Response::Data(data.to_string()),
        }
    }
}

/// Infrared code as captured by the device receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrCode {
    /// Remote type number used by the device firmware
    pub device: u32,
    pub command: u32,
    /// Number of significant bits in `command`
    pub bits: u32,
}

/// Sensor reading, typed as tightly as the text allows.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl SensorValue {
    pub fn parse(s: &str) -> Self {
        if let Ok(v) = s.parse::<i64>() {
            SensorValue::Integer(v)
        } else if let Ok(v) = s.parse::<f64>() {
            SensorValue::Float(v)
        } else {
            SensorValue::Text(s.to_string())
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Integer(v) => write!(f, "{}", v),
            SensorValue::Float(v) => write!(f, "{}", v),
            SensorValue::Text(v) => f.write_str(v),
        }
    }
}

/// Splits a `name: value` sensor line.
pub fn parse_sensor_line(line: &str) -> Option<(String, SensorValue)> {
    let (name, value) = line.split_once(':')?;
    Some((name.trim().to_string(), SensorValue::parse(value.trim())))
}
