//! Serial port handling
//!
//! Provides low-level serial port access for the acquisition board.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{AcquisitionError, DEFAULT_BAUD_RATE};

/// Per-read timeout on the port; the frame reader applies its own deadline on top
const PORT_READ_TIMEOUT_MS: u64 = 100;

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        }
    }

    /// Whether this is a USB serial adapter rather than an on-board UART
    pub fn is_usb(&self) -> bool {
        self.vid.is_some()
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb_info) => Self {
                name: info.port_name,
                vid: Some(usb_info.vid),
                pid: Some(usb_info.pid),
                manufacturer: usb_info.manufacturer,
                product: usb_info.product,
            },
            _ => Self::bare(info.port_name),
        }
    }
}

/// Trailing port number of `ttyS5`, `COM5` and the like
fn port_number(basename: &str, prefixes: &[&str]) -> Option<usize> {
    prefixes
        .iter()
        .find_map(|prefix| basename.strip_prefix(prefix))
        .and_then(|rest| rest.parse().ok())
}

/// Listing order: the configured port, numbered UARTs (the board enumerates
/// as `/dev/ttyS<n>` or `COM<n>`), USB adapters, then the rest by name
fn port_rank(name: &str, configured: Option<&str>) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if configured == Some(name) {
        return (0, 0, basename.to_string());
    }
    if let Some(num) = port_number(basename, &["ttyS", "COM"]) {
        return (1, num, basename.to_string());
    }
    if let Some(num) = port_number(basename, &["ttyACM", "ttyUSB"]) {
        return (2, num, basename.to_string());
    }
    (3, usize::MAX, basename.to_string())
}

/// List serial ports the board could be attached to
///
/// `configured` is listed first, and is included even when the OS
/// enumeration misses it (WSL maps COM ports to `/dev/ttyS*` without
/// reporting them) as long as the device node exists.
pub fn list_ports(configured: Option<&str>) -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect();

    if let Some(name) = configured {
        if !ports.iter().any(|p| p.name == name) && Path::new(name).exists() {
            debug!("Adding configured port {} missing from enumeration", name);
            ports.push(PortInfo::bare(name.to_string()));
        }
    }

    ports.sort_by_cached_key(|p| port_rank(&p.name, configured));
    ports.dedup_by(|a, b| a.name == b.name);
    ports
}

/// Open and configure a serial port for acquisition
pub fn open_port(
    name: &str,
    baud_rate: Option<u32>,
) -> Result<Box<dyn SerialPort>, AcquisitionError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

    let mut port = serialport::new(name, baud)
        .timeout(Duration::from_millis(PORT_READ_TIMEOUT_MS))
        .open()
        .map_err(|e| match e.kind() {
            serialport::ErrorKind::NoDevice => AcquisitionError::PortNotFound(name.to_string()),
            _ => AcquisitionError::SerialError(e.to_string()),
        })?;

    configure_port(port.as_mut())?;
    info!("Opened serial port {} at {} baud", name, baud);
    Ok(port)
}

/// Configure a serial port as 8N1 without flow control
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), AcquisitionError> {
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| AcquisitionError::SerialError(e.to_string()))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| AcquisitionError::SerialError(e.to_string()))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| AcquisitionError::SerialError(e.to_string()))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| AcquisitionError::SerialError(e.to_string()))?;

    // Keep DTR asserted so the Arduino does not drop into its bootloader
    if let Err(e) = port.write_data_terminal_ready(true) {
        debug!("Failed to set DTR high: {} (continuing)", e);
    }

    Ok(())
}
