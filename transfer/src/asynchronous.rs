//! The same transfer loops for tokio's [`AsyncRead`] / [`AsyncWrite`].

use {
    crate::{
        connection::Received,
        endpoint::Endpoint,
        error::{ConnectError, TransferError},
        transfer::{advance, stalled, ReadOutcome, ReadReport, MAX_ZERO_WRITES},
    },
    std::{
        io,
        net::{Shutdown, SocketAddr},
    },
    tokio::{
        io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
        net::{self, TcpSocket, TcpStream},
    },
    tracing::log,
};

/// See [`crate::read_full`].
pub async fn read_full<R: AsyncRead + Unpin + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<ReadReport, TransferError> {
    buf.fill(0);

    let mut offset = 0;
    while offset < buf.len() {
        match reader.read(&mut buf[offset..]).await {
            Ok(0) => {
                log::debug!("end of stream after {offset} of {} bytes", buf.len());
                return Ok(ReadReport {
                    len: offset,
                    outcome: ReadOutcome::EndOfStream,
                });
            }
            Ok(count) => offset = advance(offset, count, buf.len())?,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::new(offset, e)),
        }
    }

    Ok(ReadReport {
        len: offset,
        outcome: ReadOutcome::Complete,
    })
}

async fn read_owned<R: AsyncRead + Unpin + ?Sized>(
    reader: &mut R,
    size: usize,
) -> Result<Received, TransferError> {
    let mut buf = vec![0; size];
    match read_full(reader, &mut buf).await {
        Ok(report) => Ok(Received::new(buf, report)),
        Err(e) => Err(e.with_partial(buf)),
    }
}

/// See [`crate::write_full`]; gives up with [`io::ErrorKind::WriteZero`] after [`MAX_ZERO_WRITES`] zero-byte
/// writes in a row.
pub async fn write_full<W: AsyncWrite + Unpin + ?Sized>(
    writer: &mut W,
    buf: &[u8],
) -> Result<(), TransferError> {
    write_full_with_limit(writer, buf, MAX_ZERO_WRITES).await
}

/// See [`crate::write_full_with_limit`].
pub async fn write_full_with_limit<W: AsyncWrite + Unpin + ?Sized>(
    writer: &mut W,
    buf: &[u8],
    max_zero_writes: usize,
) -> Result<(), TransferError> {
    let mut offset = 0;
    let mut zero_writes = 0;
    while offset < buf.len() {
        match writer.write(&buf[offset..]).await {
            Ok(0) => {
                zero_writes += 1;
                if zero_writes >= max_zero_writes {
                    return Err(stalled(offset));
                }
            }
            Ok(count) => {
                zero_writes = 0;
                offset = advance(offset, count, buf.len())?;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::new(offset, e)),
        }
    }

    Ok(())
}

/// Async counterpart of [`crate::Connection`].
#[derive(Debug)]
pub struct AsyncConnection {
    stream: TcpStream,
}

impl AsyncConnection {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, ConnectError> {
        let mut last_error = endpoint.no_addresses();

        for address in resolve(endpoint).await? {
            let socket = match address {
                SocketAddr::V4(_) => TcpSocket::new_v4(),
                SocketAddr::V6(_) => TcpSocket::new_v6(),
            }
            .map_err(|source| ConnectError::Socket {
                addr: address,
                source,
            })?;

            match socket.connect(address).await {
                Ok(stream) => {
                    log::debug!("connected to {address} ({endpoint})");
                    return Ok(Self { stream });
                }
                Err(source) => {
                    let e = ConnectError::Connect {
                        addr: address,
                        source,
                    };
                    log::debug!("{e}: {:?}", e.io_error());
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// On failure the bytes that did arrive are available from [`TransferError::partial`].
    pub async fn read_full(&mut self, size: usize) -> Result<Received, TransferError> {
        read_owned(&mut self.stream, size).await
    }

    pub async fn read_full_into(&mut self, buf: &mut [u8]) -> Result<ReadReport, TransferError> {
        read_full(&mut self.stream, buf).await
    }

    pub async fn write_full(&mut self, data: &[u8]) -> Result<(), TransferError> {
        write_full(&mut self.stream, data).await
    }

    /// Sends FIN; reads stay usable.
    pub async fn shutdown_write(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }

    pub fn close(self) -> io::Result<()> {
        let stream = self.stream.into_std()?;
        match stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

async fn resolve(endpoint: &Endpoint) -> Result<Vec<SocketAddr>, ConnectError> {
    if let Some(address) = endpoint.literal() {
        return Ok(vec![address]);
    }

    let addresses = net::lookup_host((endpoint.host(), endpoint.port()))
        .await
        .map_err(|source| endpoint.resolve_error(source))?;

    endpoint.resolved(addresses)
}
