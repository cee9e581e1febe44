//! ---
//! fl_section: "02-transaction-engine"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "serialport-backed channel."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::info;

use crate::channel::SerialChannel;
use crate::error::TransportError;

const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Physical UART exposed by the operating system.
pub struct SerialPortChannel {
    name: String,
    port: Box<dyn SerialPort>,
}

impl SerialPortChannel {
    /// Open `port` at `baud` with 8 data bits, no parity, one stop bit.
    pub fn open(port: &str, baud: u32) -> Result<Self, TransportError> {
        let handle = serialport::new(port, baud)
            .timeout(READ_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|source| TransportError::Open {
                port: port.to_owned(),
                source,
            })?;
        handle
            .clear(ClearBuffer::All)
            .map_err(|err| TransportError::Configure {
                port: port.to_owned(),
                reason: err.to_string(),
            })?;
        info!(port, baud, "serial port opened");
        Ok(Self {
            name: port.to_owned(),
            port: handle,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialPortChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortChannel")
            .field("name", &self.name)
            .finish()
    }
}

impl SerialChannel for SerialPortChannel {
    fn bytes_available(&mut self) -> io::Result<usize> {
        let queued = self.port.bytes_to_read().map_err(io::Error::from)?;
        Ok(queued as usize)
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let mut collected = Vec::new();
        loop {
            let queued = self.bytes_available()?;
            if queued == 0 {
                break;
            }
            let mut chunk = vec![0u8; queued];
            match self.port.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => collected.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == io::ErrorKind::TimedOut => break,
                Err(err) => return Err(err),
            }
        }
        Ok(collected)
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}
