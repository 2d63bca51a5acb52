#![deny(warnings)]

use {
    anyhow::{anyhow, Context, Result},
    sockets_transfer::{Connection, Endpoint},
    std::{env, str::FromStr},
    tracing::log,
};

/// Largest reply accepted from a daytime server.
const DAYTIME_LIMIT: usize = 128;

fn main() -> Result<()> {
    pretty_env_logger::init();

    let mut args = env::args().skip(1);

    let endpoint = match args.next() {
        Some(address) => Endpoint::from_str(&address)
            .with_context(|| format!("expected <host>:<port> as CLI argument, got {address:?}"))?,
        None => Endpoint::default_daytime(),
    };

    let mut connection =
        Connection::connect(&endpoint).with_context(|| format!("unable to connect to {endpoint}"))?;

    match args.next() {
        Some(message) => echo(&mut connection, message.as_bytes())?,
        None => {
            let reply = connection
                .read_full(DAYTIME_LIMIT)
                .context("read error")?;
            log::debug!("{} bytes, {:?}", reply.len(), reply.outcome());
            print!("{}", String::from_utf8_lossy(reply.bytes()));
        }
    }

    connection.close()?;

    Ok(())
}

fn echo(connection: &mut Connection, message: &[u8]) -> Result<()> {
    connection.write_full(message).context("write error")?;

    let reply = connection.read_full(message.len()).context("read error")?;
    if !reply.is_complete() {
        return Err(anyhow!(
            "peer closed after echoing {} of {} bytes",
            reply.len(),
            message.len()
        ));
    }

    if reply.bytes() != message {
        return Err(anyhow!("echo mismatch: sent {message:?}, got {:?}", reply.bytes()));
    }

    println!("{}", String::from_utf8_lossy(reply.bytes()));

    Ok(())
}
