#![deny(warnings)]

use {
    anyhow::{Context, Error, Result},
    futures::{future::BoxFuture, FutureExt},
    std::{future::Future, net::SocketAddr, sync::Arc},
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        task,
    },
    tracing::log,
};

/// Binds `address` and returns the accept loop along with the address actually bound, so callers can pass port 0.
/// Each accepted connection is handled on its own task; handler errors are logged, not propagated.
async fn serve<F, H>(
    address: SocketAddr,
    handler: H,
) -> Result<(BoxFuture<'static, Result<()>>, SocketAddr)>
where
    H: Fn(TcpStream) -> F + Send + Sync + 'static,
    F: Future<Output = Result<()>> + Send + 'static,
{
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Unable to listen on {address}"))?;

    let address = listener.local_addr()?;

    Ok((
        async move {
            loop {
                let (stream, peer) = listener.accept().await?;
                log::debug!("accepted {peer}");

                task::spawn(handler(stream).map(|result| {
                    if let Err(e) = result {
                        log::warn!("error handling connection: {e:?}");
                    }
                }));
            }
        }
        .boxed(),
        address,
    ))
}

/// Echoes everything it receives until the client half-closes.
pub async fn serve_echo(
    address: SocketAddr,
) -> Result<(impl Future<Output = Result<()>>, SocketAddr)> {
    serve(address, |mut stream| async move {
        let mut buffer = vec![0; 1024];
        loop {
            let count = stream.read(&mut buffer).await?;
            if count == 0 {
                break Ok::<_, Error>(());
            }

            stream.write_all(&buffer[..count]).await?;
        }
    })
    .await
}

/// Sends `payload` to every client in `chunk`-sized writes, then closes.
///
/// Small chunks make the client see the payload as many short reads; the close gives it end-of-stream.  A daytime
/// server is `serve_payload(address, time_string, usize::MAX)`.
pub async fn serve_payload(
    address: SocketAddr,
    payload: Vec<u8>,
    chunk: usize,
) -> Result<(impl Future<Output = Result<()>>, SocketAddr)> {
    let payload = Arc::<[u8]>::from(payload);
    let chunk = chunk.max(1);

    serve(address, move |mut stream| {
        let payload = payload.clone();
        async move {
            stream.set_nodelay(true)?;
            for piece in payload.chunks(chunk) {
                stream.write_all(piece).await?;
                stream.flush().await?;
                task::yield_now().await;
            }
            stream.shutdown().await?;
            Ok::<_, Error>(())
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        futures::{channel::oneshot, future},
        sockets_transfer::{
            asynchronous::AsyncConnection, ConnectOptions, Connection, Endpoint, ReadOutcome,
        },
        std::{net::Ipv4Addr, sync::Once, time::Duration},
    };

    /// Starts a server on the loopback interface and returns its endpoint.  The server runs until the returned
    /// sender is dropped.
    async fn start(
        serve: impl Future<
            Output = Result<(
                impl Future<Output = Result<()>> + Unpin + Send + 'static,
                SocketAddr,
            )>,
        >,
    ) -> Result<(Endpoint, oneshot::Sender<()>)> {
        static ONCE: Once = Once::new();
        ONCE.call_once(pretty_env_logger::init);

        let (server, address) = serve.await?;

        let (tx, rx) = oneshot::channel::<()>();

        task::spawn(async move {
            drop(future::select(server, rx).await);
        });

        Ok((Endpoint::from(address), tx))
    }

    fn loopback() -> SocketAddr {
        (Ipv4Addr::LOCALHOST, 0).into()
    }

    fn alphabet() -> Vec<u8> {
        (0x41..=0x5A).collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn std_echo_round_trip() -> Result<()> {
        let (endpoint, _tx) = start(serve_echo(loopback())).await?;

        task::spawn_blocking(move || {
            let message = alphabet();
            assert_eq!(26, message.len());

            let mut connection = Connection::connect(&endpoint)?;
            connection.write_full(&message)?;

            let reply = connection.read_full(message.len())?;
            assert_eq!(ReadOutcome::Complete, reply.outcome());
            assert_eq!(message, reply.into_bytes());

            connection.close()?;
            Ok::<_, Error>(())
        })
        .await?
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn std_echo_survives_many_round_trips() -> Result<()> {
        let (endpoint, _tx) = start(serve_echo(loopback())).await?;

        task::spawn_blocking(move || {
            let mut connection = Connection::connect_with(
                &endpoint,
                &ConnectOptions {
                    connect_timeout: Some(Duration::from_secs(5)),
                    read_timeout: Some(Duration::from_secs(5)),
                    write_timeout: Some(Duration::from_secs(5)),
                    nodelay: true,
                },
            )?;

            for size in [1, 7, 1024, 1025, 32_768] {
                let message = (0..size).map(|i| (i % 251) as u8).collect::<Vec<_>>();
                connection.write_full(&message)?;

                let reply = connection.read_full(size)?;
                assert!(reply.is_complete());
                assert_eq!(message, reply.into_bytes());
            }

            connection.close()?;
            Ok::<_, Error>(())
        })
        .await?
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tokio_echo_round_trip() -> Result<()> {
        let (endpoint, _tx) = start(serve_echo(loopback())).await?;

        let message = alphabet();
        let mut connection = AsyncConnection::connect(&endpoint).await?;
        connection.write_full(&message).await?;

        let reply = connection.read_full(message.len()).await?;
        assert!(reply.is_complete());
        assert_eq!(message, reply.into_bytes());

        connection.close()?;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn trickled_payload_is_reassembled() -> Result<()> {
        let payload = (0..4096).map(|i| (i % 256) as u8).collect::<Vec<_>>();
        let (endpoint, _tx) = start(serve_payload(loopback(), payload.clone(), 7)).await?;

        let received = task::spawn_blocking(move || {
            let mut connection = Connection::connect(&endpoint)?;
            let received = connection.read_full(4096)?;
            connection.close()?;
            Ok::<_, Error>(received)
        })
        .await??;

        assert_eq!(ReadOutcome::Complete, received.outcome());
        assert_eq!(payload, received.into_bytes());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn daytime_reply_ends_at_end_of_stream() -> Result<()> {
        let daytime = b"Sat Oct 17 12:00:00 2026\r\n".to_vec();
        let (endpoint, _tx) = start(serve_payload(loopback(), daytime.clone(), 5)).await?;

        let received = task::spawn_blocking(move || {
            let mut connection = Connection::connect(&endpoint)?;
            let received = connection.read_full(128)?;
            connection.close()?;
            Ok::<_, Error>(received)
        })
        .await??;

        assert_eq!(ReadOutcome::EndOfStream, received.outcome());
        assert_eq!(daytime.len(), received.len());
        assert_eq!(128, received.buf().len());
        assert!(received.buf()[received.len()..].iter().all(|&b| b == 0));
        assert_eq!(daytime, received.into_bytes());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tokio_reads_to_end_of_stream() -> Result<()> {
        let (endpoint, _tx) = start(serve_payload(loopback(), b"abc".to_vec(), 1)).await?;

        let mut connection = AsyncConnection::connect(&endpoint).await?;
        let received = connection.read_full(16).await?;

        assert_eq!(ReadOutcome::EndOfStream, received.outcome());
        assert_eq!(b"abc", received.bytes());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn independent_connections_do_not_interfere() -> Result<()> {
        let (endpoint, _tx) = start(serve_echo(loopback())).await?;

        let clients = (0..4u8).map(|id| {
            let endpoint = endpoint.clone();
            async move {
                let message = vec![id; 512];
                let mut connection = AsyncConnection::connect(&endpoint).await?;
                connection.write_full(&message).await?;
                let reply = connection.read_full(message.len()).await?;
                assert_eq!(message, reply.into_bytes());
                Ok::<_, Error>(())
            }
        });

        future::try_join_all(clients).await?;
        Ok(())
    }
}
