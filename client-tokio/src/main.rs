#![deny(warnings)]

use {
    anyhow::{anyhow, Context, Result},
    sockets_transfer::{asynchronous::AsyncConnection, Endpoint},
    std::{env, str::FromStr},
    tracing::log,
};

const DEFAULT_MESSAGE: &str = "So rested he by the Tumtum tree";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let address = &env::args().nth(1).ok_or_else(|| {
        anyhow!("expected IPv4 or IPv6 socket address or <hostname>:<port> as CLI argument")
    })?;
    let message = env::args()
        .nth(2)
        .unwrap_or_else(|| DEFAULT_MESSAGE.to_owned());

    let endpoint = Endpoint::from_str(address)
        .with_context(|| format!("unable to parse {address:?}"))?;

    let mut connection = AsyncConnection::connect(&endpoint)
        .await
        .with_context(|| format!("unable to connect to {endpoint}"))?;

    log::debug!("connected to {:?}", connection.peer_addr());

    connection
        .write_full(message.as_bytes())
        .await
        .context("write error")?;

    let reply = connection
        .read_full(message.len())
        .await
        .context("read error")?;

    if reply.bytes() != message.as_bytes() {
        return Err(anyhow!(
            "echo mismatch after {} of {} bytes ({:?})",
            reply.len(),
            message.len(),
            reply.outcome()
        ));
    }

    println!("{}", String::from_utf8_lossy(reply.bytes()));

    connection.close()?;

    Ok(())
}
