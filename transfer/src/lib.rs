//! Reliable byte-exact transfer over TCP.
//!
//! [`connect`] turns an [`Endpoint`] into an exclusively-owned [`Connection`].  [`read_full`] and [`write_full`]
//! loop over short reads, short writes and `EINTR` until a request is fully satisfied, the peer closes its side, or a
//! real error occurs.  They are generic over [`std::io::Read`] / [`std::io::Write`], so they work just as well on
//! pipes or test doubles; [`asynchronous`] has the tokio equivalents.
//!
//! ```no_run
//! use sockets_transfer::{connect, Endpoint};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut connection = connect(&"127.0.0.1:7".parse::<Endpoint>()?)?;
//! connection.write_full(b"ping")?;
//! let reply = connection.read_full(4)?;
//! assert!(reply.is_complete());
//! connection.close()?;
//! # Ok(())
//! # }
//! ```

#![deny(warnings)]

#[cfg(feature = "tokio")]
pub mod asynchronous;
mod connection;
mod endpoint;
mod error;
#[cfg(test)]
mod testing;
mod transfer;

pub use {
    connection::{connect, ConnectOptions, Connection, Received},
    endpoint::{Endpoint, DEFAULT_PORT},
    error::{ConnectError, ErrorCategory, TransferError},
    transfer::{
        read_full, write_full, write_full_with_limit, ReadOutcome, ReadReport, MAX_ZERO_WRITES,
    },
};
