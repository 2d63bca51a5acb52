use {
    crate::{
        endpoint::Endpoint,
        error::{ConnectError, TransferError},
        transfer::{self, ReadOutcome, ReadReport},
    },
    socket2::{Domain, Protocol, SockAddr, Socket, Type},
    std::{
        io::{self, Read, Write},
        net::{Shutdown, SocketAddr, TcpStream},
        time::Duration,
    },
    tracing::log,
};

/// Socket settings applied while connecting.
///
/// Timeouts bound the underlying primitive; a read or write that times out surfaces as a transfer error and is never
/// retried by the transfer loops.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub nodelay: bool,
}

/// Result of [`Connection::read_full`]: a buffer of exactly the requested size whose first `len` bytes came from the
/// peer and whose remainder is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    buf: Vec<u8>,
    len: usize,
    outcome: ReadOutcome,
}

impl Received {
    pub(crate) fn new(buf: Vec<u8>, report: ReadReport) -> Self {
        debug_assert!(report.len <= buf.len(), "read report past the end of its buffer");
        Self {
            buf,
            len: report.len,
            outcome: report.outcome,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn outcome(&self) -> ReadOutcome {
        self.outcome
    }

    /// The whole requested-size buffer, zero past [`Received::len`].
    pub fn buf(&self) -> &[u8] {
        &self.buf
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == ReadOutcome::Complete
    }

    /// Drops the zeroed tail.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.len);
        self.buf
    }
}

/// An open, exclusively-owned TCP connection.
///
/// Every transfer takes `&mut self`, so at most one read loop and one write loop can be in flight.  The socket is
/// closed by [`Connection::close`] or on drop.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
}

impl Connection {
    pub fn connect(endpoint: &Endpoint) -> Result<Self, ConnectError> {
        Self::connect_with(endpoint, &ConnectOptions::default())
    }

    /// Tries each resolved address in order and returns the first connection that succeeds.
    ///
    /// Socket allocation failures abort immediately.  If every address refuses, the error from the last attempt is
    /// returned.  Nothing here retries on its own.
    pub fn connect_with(
        endpoint: &Endpoint,
        options: &ConnectOptions,
    ) -> Result<Self, ConnectError> {
        let mut last_error = endpoint.no_addresses();

        for address in endpoint.resolve()? {
            match connect_address(address, options) {
                Ok(stream) => {
                    configure(&stream, address, options)?;
                    log::debug!("connected to {address} ({endpoint})");
                    return Ok(Self { stream });
                }
                Err(e @ ConnectError::Connect { .. }) => {
                    log::debug!("{e}: {:?}", e.io_error());
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Reads exactly `size` bytes unless the peer closes first.
    ///
    /// On failure the bytes that did arrive are available from [`TransferError::partial`].
    pub fn read_full(&mut self, size: usize) -> Result<Received, TransferError> {
        transfer::read_owned(&mut self.stream, size)
    }

    /// Like [`Connection::read_full`], into a caller-owned buffer.
    pub fn read_full_into(&mut self, buf: &mut [u8]) -> Result<ReadReport, TransferError> {
        transfer::read_full(&mut self.stream, buf)
    }

    pub fn write_full(&mut self, data: &[u8]) -> Result<(), TransferError> {
        transfer::write_full(&mut self.stream, data)
    }

    /// Half-closes the connection so the peer sees end-of-stream; reads stay usable.
    pub fn shutdown_write(&self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Write)
    }

    /// Shuts down both directions and releases the socket.
    ///
    /// A peer that already went away is not an error here.
    pub fn close(self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Shorthand for [`Connection::connect`].
pub fn connect(endpoint: &Endpoint) -> Result<Connection, ConnectError> {
    Connection::connect(endpoint)
}

fn connect_address(
    address: SocketAddr,
    options: &ConnectOptions,
) -> Result<TcpStream, ConnectError> {
    if options.connect_timeout == Some(Duration::ZERO) {
        return Err(ConnectError::Configure {
            addr: address,
            source: io::Error::new(io::ErrorKind::InvalidInput, "zero connect timeout"),
        });
    }

    let socket = Socket::new(
        Domain::for_address(address),
        Type::STREAM,
        Some(Protocol::TCP),
    )
    .map_err(|source| ConnectError::Socket {
        addr: address,
        source,
    })?;

    let target = SockAddr::from(address);
    match options.connect_timeout {
        Some(timeout) => socket.connect_timeout(&target, timeout),
        None => socket.connect(&target),
    }
    .map_err(|source| ConnectError::Connect {
        addr: address,
        source,
    })?;

    Ok(socket.into())
}

fn configure(
    stream: &TcpStream,
    address: SocketAddr,
    options: &ConnectOptions,
) -> Result<(), ConnectError> {
    stream
        .set_read_timeout(options.read_timeout)
        .and_then(|()| stream.set_write_timeout(options.write_timeout))
        .and_then(|()| stream.set_nodelay(options.nodelay))
        .map_err(|source| ConnectError::Configure {
            addr: address,
            source,
        })
}
