use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// An ordered, reliable, bidirectional byte stream.
///
/// End of input is signalled by `read` returning `Ok(0)`; errors surface as
/// `Err`. The only lifecycle operation the protocol layers need is closing
/// the write half, which tells the peer no more requests are coming.
pub trait Channel: Read + Write {
    /// Close the write half of the channel. Reads stay possible.
    fn shutdown_write(&mut self) -> std::io::Result<()>;
}

impl Channel for TcpStream {
    fn shutdown_write(&mut self) -> std::io::Result<()> {
        self.shutdown(Shutdown::Write)
    }
}

#[cfg(unix)]
impl Channel for std::os::unix::net::UnixStream {
    fn shutdown_write(&mut self) -> std::io::Result<()> {
        self.shutdown(Shutdown::Write)
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn shutdown_write(&mut self) -> std::io::Result<()> {
        (**self).shutdown_write()
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn shutdown_write(&mut self) -> std::io::Result<()> {
        (**self).shutdown_write()
    }
}

/// A connected socket to an ADB server or a forwarded device service.
///
/// Construction goes through `From<TcpStream>` / `From<UnixStream>`; how the
/// socket was opened is the caller's business.
pub struct AdbStream {
    inner: AdbStreamInner,
    write_closed: bool,
}

enum AdbStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl From<TcpStream> for AdbStream {
    fn from(stream: TcpStream) -> Self {
        Self {
            inner: AdbStreamInner::Tcp(stream),
            write_closed: false,
        }
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::UnixStream> for AdbStream {
    fn from(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: AdbStreamInner::Unix(stream),
            write_closed: false,
        }
    }
}

impl Read for AdbStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            AdbStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            AdbStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for AdbStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.write_closed {
            return Err(std::io::Error::new(
                ErrorKind::BrokenPipe,
                TransportError::Shutdown,
            ));
        }
        match &mut self.inner {
            AdbStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            AdbStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            AdbStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            AdbStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl Channel for AdbStream {
    fn shutdown_write(&mut self) -> std::io::Result<()> {
        if self.write_closed {
            return Ok(());
        }
        let result = match &self.inner {
            AdbStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Write),
            #[cfg(unix)]
            AdbStreamInner::Unix(stream) => stream.shutdown(Shutdown::Write),
        };
        match result {
            Ok(()) => {}
            // The peer may already have torn down the whole socket.
            Err(err) if err.kind() == ErrorKind::NotConnected => {}
            Err(err) => return Err(err),
        }
        self.write_closed = true;
        debug!(stream = ?self, "write half closed");
        Ok(())
    }
}

impl AdbStream {
    /// Set read timeout on the underlying socket.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            AdbStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            AdbStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            AdbStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            AdbStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    ///
    /// The clone shares the socket but not the write-closed flag.
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            AdbStreamInner::Tcp(stream) => AdbStreamInner::Tcp(stream.try_clone()?),
            #[cfg(unix)]
            AdbStreamInner::Unix(stream) => AdbStreamInner::Unix(stream.try_clone()?),
        };
        Ok(Self {
            inner,
            write_closed: self.write_closed,
        })
    }

    /// Whether `shutdown_write` has been called on this handle.
    pub fn is_write_closed(&self) -> bool {
        self.write_closed
    }
}

impl std::fmt::Debug for AdbStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            AdbStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            AdbStreamInner::Unix(_) => "unix",
        };
        f.debug_struct("AdbStream")
            .field("type", &kind)
            .field("write_closed", &self.write_closed)
            .finish()
    }
}
