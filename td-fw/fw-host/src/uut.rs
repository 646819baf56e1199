//! Serial link to the unit under test

use std::io::{Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::SerialPort;
use td_model::TransportError;
use td_shared::transport::UutLink;

use crate::config::UutConfig;

/// UUT link over a serial device, or a detached link when none is configured
pub struct SerialUutLink {
    port: Option<Box<dyn SerialPort>>,
    /// Log every line received from the UUT
    echo: bool,
}

impl SerialUutLink {
    pub fn open(config: &UutConfig) -> Result<Self> {
        let Some(device) = config.device.as_deref() else {
            log::warn!("No UUT device configured, UUT link detached");
            return Ok(Self::detached());
        };
        let port = serialport::new(device, config.baud_rate)
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .open()
            .with_context(|| format!("Failed to open UUT serial port {device}"))?;
        log::info!("UUT link on {device} @ {} baud", config.baud_rate);
        Ok(Self {
            port: Some(port),
            echo: false,
        })
    }

    pub fn detached() -> Self {
        Self {
            port: None,
            echo: false,
        }
    }

    pub fn set_echo(&mut self, on: bool) {
        self.echo = on;
    }

    #[cfg(test)]
    pub(crate) fn echo(&self) -> bool {
        self.echo
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port
            .as_mut()
            .ok_or_else(|| TransportError::Io("no UUT device configured".to_string()))
    }
}

impl UutLink for SerialUutLink {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port()?;
        port.write_all(data)
            .and_then(|()| port.flush())
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    fn drain(&mut self) -> Result<Vec<u8>, TransportError> {
        let Some(port) = self.port.as_mut() else {
            return Ok(Vec::new());
        };
        let mut received = Vec::new();
        loop {
            let pending = port
                .bytes_to_read()
                .map_err(|e| TransportError::Io(e.to_string()))?;
            if pending == 0 {
                break;
            }
            let mut chunk = vec![0u8; pending as usize];
            match port.read(&mut chunk) {
                Ok(n) => received.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(TransportError::Io(e.to_string())),
            }
        }
        if self.echo && !received.is_empty() {
            for line in String::from_utf8_lossy(&received).lines() {
                log::info!("HW: {line}");
            }
        }
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_link() {
        let mut link = SerialUutLink::detached();
        assert_eq!(link.drain().unwrap(), Vec::<u8>::new());
        assert!(matches!(link.write(b"G>MR\r"), Err(TransportError::Io(_))));
    }
}
