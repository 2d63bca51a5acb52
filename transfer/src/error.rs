use {
    std::{fmt, io, net::SocketAddr},
    thiserror::Error,
};

/// Coarse classification of a failed [`connect`](crate::connect), so callers can decide between aborting and
/// retrying at a higher level without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed address, out-of-range port, or a name that does not resolve.
    Configuration,
    /// The local socket could not be allocated.
    Resource,
    /// The peer refused, was unreachable, or the attempt timed out.
    Connection,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configuration => "configuration",
            Self::Resource => "resource",
            Self::Connection => "connection",
        })
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: &'static str },

    #[error("invalid port in {input:?}")]
    InvalidPort { input: String },

    #[error("unable to resolve {host:?}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to create socket for {addr}")]
    Socket {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("unable to connect to {addr}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("unable to apply socket options for {addr}")]
    Configure {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

impl ConnectError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidAddress { .. }
            | Self::InvalidPort { .. }
            | Self::Resolve { .. }
            | Self::Configure { .. } => ErrorCategory::Configuration,
            Self::Socket { .. } => ErrorCategory::Resource,
            Self::Connect { .. } => ErrorCategory::Connection,
        }
    }

    /// The operating-system error behind this failure, if there is one.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Resolve { source, .. }
            | Self::Socket { source, .. }
            | Self::Connect { source, .. }
            | Self::Configure { source, .. } => Some(source),
            Self::InvalidAddress { .. } | Self::InvalidPort { .. } => None,
        }
    }
}

/// A read or write loop that stopped on a non-transient error.
///
/// `transferred` is the exact number of bytes moved before the failure.  When the read went into a caller's slice
/// those bytes are already there; when the read allocated its own buffer they come back through
/// [`TransferError::partial`].
#[derive(Debug, Error)]
#[error("transfer failed after {transferred} bytes")]
pub struct TransferError {
    pub transferred: usize,
    #[source]
    pub source: io::Error,
    partial: Option<Vec<u8>>,
}

impl TransferError {
    pub(crate) fn new(transferred: usize, source: io::Error) -> Self {
        Self {
            transferred,
            source,
            partial: None,
        }
    }

    /// Attaches the bytes received before the failure, trimmed to `transferred`.
    pub(crate) fn with_partial(mut self, mut buf: Vec<u8>) -> Self {
        buf.truncate(self.transferred);
        self.partial = Some(buf);
        self
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }

    /// Bytes received before the failure, for reads that owned their buffer.
    pub fn partial(&self) -> Option<&[u8]> {
        self.partial.as_deref()
    }

    pub fn into_partial(self) -> Option<Vec<u8>> {
        self.partial
    }
}

impl From<TransferError> for io::Error {
    fn from(error: TransferError) -> Self {
        io::Error::new(error.source.kind(), error)
    }
}
