use crate::error::Result;
use crate::model::DeviceInfo;
use serialport::{available_ports, SerialPortType};
use std::io::{self, ErrorKind, Read};
use std::time::Duration;
use std::vec::Vec;

const DEFAULT_DEVICE_NAME: &str = "USB Serial Device";
const VERSION_TOKEN: &str = "version";

pub fn get_serial_ports() -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    match available_ports() {
        Ok(ports) => {
            for p in ports {
                result.push(p.port_name);
            }
        }
        Err(e) => {
            log::error!("Error listing serial ports: {:?}", e);
        }
    }

    return result;
}

/// Opens `port_name`, waits at most `timeout` for a single chunk of output and
/// looks for a version announcement in it. The port is released on return.
pub fn probe_device(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<DeviceInfo> {
    let mut port = serialport::new(port_name, baud_rate)
        .timeout(timeout)
        .stop_bits(serialport::StopBits::One)
        .data_bits(serialport::DataBits::Eight)
        .open()?;

    let version = read_version(&mut port)?;
    let mut info = DeviceInfo {
        name: String::from(DEFAULT_DEVICE_NAME),
        port: String::from(port_name),
        vendor_id: None,
        product_id: None,
        version,
    };

    if let Ok(ports) = available_ports() {
        for p in ports.into_iter().filter(|p| p.port_name == port_name) {
            if let SerialPortType::UsbPort(usb) = p.port_type {
                info.vendor_id = Some(usb.vid);
                info.product_id = Some(usb.pid);
                if let Some(product) = usb.product {
                    info.name = product;
                }
            }
        }
    }

    Ok(info)
}

/// One read, no framing. Whatever arrived before the port timeout is all we look at.
/// Silence is not an error; a failing port is.
pub fn read_version<R: Read>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buffer: [u8; 256] = [0; 256];
    match reader.read(&mut buffer) {
        Ok(0) => Ok(None),
        Ok(len) => Ok(scrape_version(&String::from_utf8_lossy(&buffer[0..len]))),
        Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
            log::debug!("No data from device before timeout");
            Ok(None)
        }
        Err(e) => {
            log::warn!("Serial read error: {:?}", e);
            Err(e)
        }
    }
}

fn is_separator(c: char) -> bool {
    c == ':' || c.is_whitespace()
}

/// Finds `version` (any case) followed by at least one `:` or whitespace and
/// returns the next run of non-whitespace characters. When only separators
/// follow, a trailing `:` that is not the first separator is itself the value,
/// as `version[:\s]+(\S+)` would match it.
pub fn scrape_version(text: &str) -> Option<String> {
    let lower = text.to_ascii_lowercase();
    let mut from = 0;

    while let Some(pos) = lower[from..].find(VERSION_TOKEN) {
        let start = from + pos + VERSION_TOKEN.len();
        let rest = &text[start..];
        let value = rest.trim_start_matches(is_separator);

        if value.len() < rest.len() {
            if !value.is_empty() {
                let token: String = value.chars().take_while(|c| !c.is_whitespace()).collect();
                return Some(token);
            }
            if let Some(i) = rest.rfind(':') {
                if i > 0 {
                    return Some(String::from(":"));
                }
            }
        }
        from = start;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct SilentPort;

    struct UnpluggedPort;

    impl Read for UnpluggedPort {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "Device disconnected"))
        }
    }

    impl Read for SilentPort {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::TimedOut, "Operation timed out"))
        }
    }

    #[test]
    fn scrapes_simple_banner() {
        assert_eq!(scrape_version("Version: 2.4.1\r\n"), Some("2.4.1".into()));
        assert_eq!(scrape_version("boot ok\nVERSION 1.0-rc2 ready"), Some("1.0-rc2".into()));
        assert_eq!(scrape_version("fw version::: v3"), Some("v3".into()));
    }

    #[test]
    fn needs_a_separator_and_a_value() {
        assert_eq!(scrape_version("versioning enabled"), None);
        assert_eq!(scrape_version("version:"), None);
        assert_eq!(scrape_version("version: \r\n"), None);
        assert_eq!(scrape_version("no banner here"), None);
    }

    #[test]
    fn trailing_colon_counts_as_value() {
        assert_eq!(scrape_version("version::"), Some(":".into()));
        assert_eq!(scrape_version("Version : \n"), Some(":".into()));
    }

    #[test]
    fn skips_unusable_occurrences() {
        assert_eq!(
            scrape_version("versionless build, version: 9.9"),
            Some("9.9".into())
        );
    }

    #[test]
    fn tolerates_non_ascii_bytes() {
        assert_eq!(scrape_version("\u{fffd}\u{fffd}version 1.2"), Some("1.2".into()));
    }

    #[test]
    fn reads_version_from_first_chunk() {
        let mut port = Cursor::new(b"hello\nversion: 0.7.0\n".to_vec());
        assert_eq!(read_version(&mut port).unwrap(), Some("0.7.0".into()));
    }

    #[test]
    fn timeout_means_unknown_version() {
        assert_eq!(read_version(&mut SilentPort).unwrap(), None);
        assert_eq!(read_version(&mut Cursor::new(Vec::new())).unwrap(), None);
    }

    #[test]
    fn broken_port_is_an_error() {
        let err = read_version(&mut UnpluggedPort).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }
}
