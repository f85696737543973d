//! Serial transport: owns the open port, applies the open-retry policy and
//! checks that every frame is written in full.

use std::io;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use thiserror::Error;

/// Errors reported by [`SerialTransport::open`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to set {setting} on serial port {port}: {source}")]
    Configure {
        port: String,
        setting: &'static str,
        #[source]
        source: io::Error,
    },
}

/// What `open` does when the port opens but baud rate or data bits cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFailurePolicy {
    /// Log and report success based on the port being open
    #[default]
    Lenient,
    /// Close the port and report the failure
    Strict,
}

/// An open, writable serial connection
pub trait SerialLink: Send {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
    fn flush(&mut self) -> io::Result<()>;
    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()>;
    fn set_data_bits(&mut self, data_bits: DataBits) -> io::Result<()>;

    /// Human readable port settings for debug logging
    fn describe(&self) -> String {
        String::new()
    }
}

/// Opens serial links by port name
pub trait PortOpener: Send {
    fn open(&mut self, port_name: &str, baud_rate: u32) -> io::Result<Box<dyn SerialLink>>;

    /// Ports known to the system, logged after an open failure
    fn available_ports(&self) -> Vec<String> {
        Vec::new()
    }
}

/// [`PortOpener`] backed by the operating system's serial ports
#[derive(Debug, Clone)]
pub struct SystemPorts {
    timeout: Duration,
}

impl Default for SystemPorts {
    fn default() -> Self {
        SystemPorts {
            timeout: Duration::from_millis(1000),
        }
    }
}

impl PortOpener for SystemPorts {
    fn open(&mut self, port_name: &str, baud_rate: u32) -> io::Result<Box<dyn SerialLink>> {
        let port = serialport::new(port_name, baud_rate)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()?;

        Ok(Box::new(port))
    }

    fn available_ports(&self) -> Vec<String> {
        match serialport::available_ports() {
            Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
            Err(e) => {
                log::debug!("could not list serial ports: {e}");
                Vec::new()
            }
        }
    }
}

impl SerialLink for Box<dyn SerialPort> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(self)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
        SerialPort::set_baud_rate(&mut **self, baud_rate)?;
        Ok(())
    }

    fn set_data_bits(&mut self, data_bits: DataBits) -> io::Result<()> {
        SerialPort::set_data_bits(&mut **self, data_bits)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "baud rate {:?}, data bits {:?}, parity {:?}, stop bits {:?}, flow {:?}",
            self.baud_rate(),
            self.data_bits(),
            self.parity(),
            self.stop_bits(),
            self.flow_control()
        )
    }
}

/// Owns at most one open serial link
pub struct SerialTransport {
    opener: Box<dyn PortOpener>,
    policy: ConfigFailurePolicy,
    port: Option<Box<dyn SerialLink>>,
    port_name: String,
}

impl SerialTransport {
    pub fn new(opener: Box<dyn PortOpener>, policy: ConfigFailurePolicy) -> Self {
        SerialTransport {
            opener,
            policy,
            port: None,
            port_name: String::new(),
        }
    }

    /// Transport over the system's serial ports
    pub fn system(policy: ConfigFailurePolicy) -> Self {
        Self::new(Box::new(SystemPorts::default()), policy)
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Open `port_name`, closing any previously open link first
    ///
    /// A failed open is retried exactly once; some serial drivers fail every
    /// other open of the same device.
    pub fn open(&mut self, port_name: &str, baud_rate: u32) -> Result<(), TransportError> {
        self.close();
        self.port_name = port_name.to_string();

        let mut link = match self.opener.open(port_name, baud_rate) {
            Ok(link) => link,
            Err(first) => {
                log::debug!("open {port_name} failed ({first}), retrying once");
                match self.opener.open(port_name, baud_rate) {
                    Ok(link) => link,
                    Err(source) => {
                        log::warn!("serial device {port_name} open fail: {source}");
                        log::info!("available ports: {:?}", self.opener.available_ports());
                        return Err(TransportError::Open {
                            port: port_name.to_string(),
                            source,
                        });
                    }
                }
            }
        };

        log::debug!("serial device {port_name} open");

        if let Err(e) = self.configure(link.as_mut(), baud_rate) {
            log::warn!("{e}");
            if self.policy == ConfigFailurePolicy::Strict {
                return Err(e);
            }
        } else {
            log::debug!("{port_name}: {}", link.describe());
        }

        self.port = Some(link);
        Ok(())
    }

    fn configure(&self, link: &mut dyn SerialLink, baud_rate: u32) -> Result<(), TransportError> {
        link.set_baud_rate(baud_rate)
            .map_err(|source| TransportError::Configure {
                port: self.port_name.clone(),
                setting: "baud rate",
                source,
            })?;
        link.set_data_bits(DataBits::Eight)
            .map_err(|source| TransportError::Configure {
                port: self.port_name.clone(),
                setting: "data bits",
                source,
            })?;
        Ok(())
    }

    /// Release the link; a no-op when nothing is open
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            log::debug!("serial device {} closed", self.port_name);
        }
    }

    /// Write one frame. Fails without I/O when closed; a short write is a failure.
    pub fn write(&mut self, buf: &[u8]) -> bool {
        let Some(port) = self.port.as_mut() else {
            return false;
        };

        if log::log_enabled!(log::Level::Trace) {
            let hex: String = buf
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(" ");
            log::trace!("{}: {}", self.port_name, hex);
        }

        let written = match port.write(buf) {
            Ok(n) => n,
            Err(e) => {
                log::warn!("serial error on {}: {e}", self.port_name);
                return false;
            }
        };

        if written != buf.len() {
            log::warn!(
                "{}: wrote {} of {} bytes",
                self.port_name,
                written,
                buf.len()
            );
            return false;
        }

        if let Err(e) = port.flush() {
            log::warn!("failed to flush {}: {e}", self.port_name);
            return false;
        }

        true
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// In-memory ports for tests
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Everything the mock ports observed, shared with the test
    #[derive(Debug, Default)]
    pub struct MockLog {
        pub open_attempts: usize,
        pub frames: Vec<Vec<u8>>,
        pub write_calls: usize,
        pub baud_rate: Option<u32>,
        pub data_bits: Option<DataBits>,
    }

    /// Configurable [`PortOpener`] whose links record into a shared [`MockLog`]
    #[derive(Debug, Clone, Default)]
    pub struct MockPorts {
        pub log: Arc<Mutex<MockLog>>,
        /// Number of leading open attempts that fail
        pub fail_opens: usize,
        pub fail_baud_rate: bool,
        pub fail_data_bits: bool,
        /// Accept at most this many bytes per write
        pub max_write: Option<usize>,
    }

    impl MockPorts {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn frames(&self) -> Vec<Vec<u8>> {
            self.log.lock().unwrap().frames.clone()
        }

        pub fn open_attempts(&self) -> usize {
            self.log.lock().unwrap().open_attempts
        }

        pub fn write_calls(&self) -> usize {
            self.log.lock().unwrap().write_calls
        }
    }

    impl PortOpener for MockPorts {
        fn open(&mut self, port_name: &str, _baud_rate: u32) -> io::Result<Box<dyn SerialLink>> {
            let mut log = self.log.lock().unwrap();
            log.open_attempts += 1;
            if log.open_attempts <= self.fail_opens {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("mock: {port_name} unavailable"),
                ));
            }
            Ok(Box::new(MockLink { ports: self.clone() }))
        }

        fn available_ports(&self) -> Vec<String> {
            vec!["mock0".to_string()]
        }
    }

    struct MockLink {
        ports: MockPorts,
    }

    impl SerialLink for MockLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = self.ports.max_write.map_or(buf.len(), |max| buf.len().min(max));
            let mut log = self.ports.log.lock().unwrap();
            log.write_calls += 1;
            log.frames.push(buf[..n].to_vec());
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn set_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
            if self.ports.fail_baud_rate {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, "mock: bad baud rate"));
            }
            self.ports.log.lock().unwrap().baud_rate = Some(baud_rate);
            Ok(())
        }

        fn set_data_bits(&mut self, data_bits: DataBits) -> io::Result<()> {
            if self.ports.fail_data_bits {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, "mock: bad data bits"));
            }
            self.ports.log.lock().unwrap().data_bits = Some(data_bits);
            Ok(())
        }
    }
}
