use {
    crate::error::ConnectError,
    std::{
        fmt, io,
        net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs},
        str::FromStr,
    },
    tracing::log,
};

/// Port of the daytime service the client talks to when no address is given.
pub const DEFAULT_PORT: u16 = 34543;

/// Immutable `(host, port)` pair naming the remote peer.
///
/// The host is either an IPv4/IPv6 literal or a name for the system resolver.  Brackets around IPv6 literals are
/// accepted on input and stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ConnectError> {
        let input = host.into();
        let host = input
            .strip_prefix('[')
            .and_then(|host| host.strip_suffix(']'))
            .unwrap_or(&input);

        if host.is_empty() {
            return Err(ConnectError::InvalidAddress {
                input,
                reason: "empty host",
            });
        }

        if host.chars().any(char::is_whitespace) {
            return Err(ConnectError::InvalidAddress {
                input,
                reason: "host contains whitespace",
            });
        }

        if port == 0 {
            return Err(ConnectError::InvalidPort {
                input: format!("{input}:{port}"),
            });
        }

        Ok(Self {
            host: host.to_owned(),
            port,
        })
    }

    /// `127.0.0.1:34543`, the endpoint the daytime client uses by default.
    pub fn default_daytime() -> Self {
        Self::from(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), DEFAULT_PORT))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the addresses to try, in order.
    ///
    /// A literal resolves to exactly itself without touching the resolver.  A name that resolves to nothing is a
    /// configuration error rather than an empty list.
    pub fn resolve(&self) -> Result<Vec<SocketAddr>, ConnectError> {
        if let Some(address) = self.literal() {
            return Ok(vec![address]);
        }

        let addresses = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| self.resolve_error(source))?;

        self.resolved(addresses)
    }

    /// The address this endpoint names directly, if its host is an IP literal.
    pub(crate) fn literal(&self) -> Option<SocketAddr> {
        IpAddr::from_str(&self.host)
            .ok()
            .map(|ip| SocketAddr::new(ip, self.port))
    }

    pub(crate) fn resolve_error(&self, source: io::Error) -> ConnectError {
        ConnectError::Resolve {
            host: self.host.clone(),
            source,
        }
    }

    /// Collects resolver output, rejecting an empty answer.
    pub(crate) fn resolved(
        &self,
        addresses: impl IntoIterator<Item = SocketAddr>,
    ) -> Result<Vec<SocketAddr>, ConnectError> {
        let addresses = addresses.into_iter().collect::<Vec<_>>();

        log::debug!("{self} resolved to {addresses:?}");

        if addresses.is_empty() {
            Err(self.no_addresses())
        } else {
            Ok(addresses)
        }
    }

    /// The error for a name with nothing to connect to.  Connect loops also start from it, so an empty address
    /// list can never reach them as success.
    pub(crate) fn no_addresses(&self) -> ConnectError {
        ConnectError::InvalidAddress {
            input: self.to_string(),
            reason: "name resolved to no addresses",
        }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(address: SocketAddr) -> Self {
        Self {
            host: address.ip().to_string(),
            port: address.port(),
        }
    }
}

impl FromStr for Endpoint {
    type Err = ConnectError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if let Ok(address) = SocketAddr::from_str(input) {
            return Self::new(address.ip().to_string(), address.port());
        }

        let (host, port) = input
            .rsplit_once(':')
            .ok_or_else(|| ConnectError::InvalidAddress {
                input: input.to_owned(),
                reason: "expected <host>:<port>",
            })?;

        // An unbracketed IPv6 literal has colons in the host part too.
        if host.contains(':') && !host.starts_with('[') {
            return Err(ConnectError::InvalidAddress {
                input: input.to_owned(),
                reason: "IPv6 literals must be written as [address]:port",
            });
        }

        let port = port.parse::<u16>().map_err(|_| ConnectError::InvalidPort {
            input: input.to_owned(),
        })?;

        Self::new(host, port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
