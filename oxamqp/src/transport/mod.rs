//! Moves bytes between a [`ConnectionEngine`] and an async IO object

use std::time::Instant;

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tracing::{debug, trace};

use crate::{connection::Endpoint, dispatch::Handler, ConnectionEngine, Error};

mod error;
pub mod protocol_header;

pub use error::NegotiationError;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Opens a TCP stream to the endpoint
pub async fn connect(endpoint: &Endpoint) -> Result<TcpStream, Error> {
    let addr = (endpoint.host.as_str(), endpoint.port);
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Drives a [`ConnectionEngine`] over any tokio IO object.
///
/// The driver only ever waits for input or for the next heartbeat deadline.
/// Everything else happens synchronously in the engine and the handler.
#[derive(Debug)]
pub struct Driver<Io> {
    io: Io,
}

impl<Io> Driver<Io>
where
    Io: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a driver over `io`
    pub fn new(io: Io) -> Self {
        Self { io }
    }

    /// Get a reference to the underlying IO
    pub fn get_ref(&self) -> &Io {
        &self.io
    }

    /// Consumes the driver to get the underlying IO
    pub fn into_inner(self) -> Io {
        self.io
    }

    /// Runs until both directions of the transport are closed and every
    /// event was dispatched to `handler`.
    ///
    /// Returns an error if the local side closed the connection with a
    /// condition or the transport failed, or if the peer closed the
    /// connection with a condition.
    pub async fn run<H>(&mut self, engine: &mut ConnectionEngine, handler: &mut H) -> Result<(), Error>
    where
        H: Handler + ?Sized,
    {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            engine.dispatch(handler);
            self.flush(engine).await;
            if engine.is_finished() {
                break;
            }
            if engine.has_events() {
                continue;
            }

            let deadline = engine.tick(Instant::now());
            if engine.has_events() || !engine.write_buffer().is_empty() {
                continue;
            }
            if engine.is_read_closed() {
                engine.write_close();
                continue;
            }

            tokio::select! {
                result = self.io.read(&mut buf) => match result {
                    Ok(0) => {
                        debug!("end of stream");
                        engine.read_close();
                    }
                    Ok(n) => {
                        trace!(n, "read");
                        engine.feed(&buf[..n]);
                    }
                    Err(err) => engine.disconnected(err),
                },
                _ = sleep_until(deadline) => {}
            }
        }

        if let Err(err) = self.io.shutdown().await {
            debug!(%err, "shutdown");
        }

        if let Some(condition) = engine.condition() {
            return Err(Error::Local(condition.clone()));
        }
        if let Some(condition) = engine.remote_condition() {
            return Err(Error::Remote(condition.clone()));
        }
        Ok(())
    }

    async fn flush(&mut self, engine: &mut ConnectionEngine) {
        while !engine.write_buffer().is_empty() {
            match self.io.write(engine.write_buffer()).await {
                Ok(0) => {
                    engine.write_close();
                    return;
                }
                Ok(n) => engine.write_done(n),
                Err(err) => {
                    engine.disconnected(err);
                    return;
                }
            }
        }

        if engine.is_write_closed() {
            return;
        }
        match self.io.flush().await {
            Ok(()) => engine.write_done(0),
            Err(err) => engine.disconnected(err),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::io::Builder as MockIo;

    use crate::{ConnectionEngine, Error, Handler};

    use super::Driver;

    struct Nothing;

    impl Handler for Nothing {}

    #[tokio::test]
    async fn protocol_header_mismatch_ends_the_run() {
        let mut engine = ConnectionEngine::builder().container_id("c").build();
        let io = MockIo::new()
            .write(b"AMQP\x00\x01\x00\x00")
            .read(b"AMQP\x03\x01\x00\x00")
            .build();

        let result = Driver::new(io).run(&mut engine, &mut Nothing).await;
        match result {
            Err(Error::Local(condition)) => {
                assert_eq!(condition.condition.as_str(), "amqp:not-implemented")
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(engine.is_finished());
    }

    #[tokio::test]
    async fn eof_before_close_is_connection_aborted() {
        let mut engine = ConnectionEngine::builder().container_id("c").build();
        let io = MockIo::new()
            .write(b"AMQP\x00\x01\x00\x00")
            .build();

        let result = Driver::new(io).run(&mut engine, &mut Nothing).await;
        match result {
            Err(Error::Local(condition)) => {
                assert_eq!(condition.condition.as_str(), "amqp:connection:forced");
                assert_eq!(condition.description.as_deref(), Some("connection aborted"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
