//! ---
//! fl_section: "02-transaction-engine"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Byte stream abstraction over the modem link."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::io;

/// Full-duplex byte stream to the peripheral.
pub trait SerialChannel: Send {
    /// Number of bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read everything currently queued. Never waits for more.
    fn read_available(&mut self) -> io::Result<Vec<u8>>;

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Throw away queued input.
    fn discard_input(&mut self) -> io::Result<()>;
}

impl<T: SerialChannel + ?Sized> SerialChannel for Box<T> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_available()
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }
}
