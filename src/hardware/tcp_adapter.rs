//! TCP SCPI Adapter
//!
//! Builder-based adapter for LAN instruments exposing a SCPI raw socket.
//! Commands are written with a line terminator; each reply is one
//! newline-delimited line.

use crate::error::{FieldFoxError, FieldFoxResult};
use crate::hardware::resource::{SocketAddress, SCPI_SOCKET_PORT};
use crate::traits::ScpiEndpoint;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Builder for constructing TcpScpiAdapter with custom configuration
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use fieldfox_panel::hardware::TcpScpiAdapterBuilder;
///
/// # async fn example() -> fieldfox_panel::error::FieldFoxResult<()> {
/// let adapter = TcpScpiAdapterBuilder::new("TCPIP::192.168.0.1::INSTR")
///     .with_timeout(Duration::from_millis(2000))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct TcpScpiAdapterBuilder {
    resource: String,
    default_port: u16,
    timeout: Duration,
    write_terminator: String,
}

impl TcpScpiAdapterBuilder {
    /// Create a new builder
    ///
    /// Default configuration:
    /// * port: 5025 for `::INSTR` resources and bare hosts
    /// * timeout: 5 seconds (connect and each read)
    /// * write_terminator: "\n"
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            default_port: SCPI_SOCKET_PORT,
            timeout: Duration::from_secs(5),
            write_terminator: "\n".to_string(),
        }
    }

    /// Port used when the resource string does not name one
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    /// Set timeout for connecting and for each reply
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set write terminator character(s)
    pub fn with_write_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.write_terminator = terminator.into();
        self
    }

    /// Open the socket
    ///
    /// # Errors
    /// - Configuration error for an unparseable resource string
    /// - Connection error if the instrument is unreachable
    pub async fn connect(self) -> FieldFoxResult<TcpScpiAdapter> {
        let address = SocketAddress::parse(&self.resource, self.default_port)?;

        let stream = with_timeout(
            self.timeout,
            &address,
            TcpStream::connect((address.host.as_str(), address.port)),
        )
        .await?;
        // SCPI exchanges are tiny; don't let Nagle hold back a command
        stream.set_nodelay(true).map_err(|e| connection_error(&address, e))?;

        debug!("SCPI socket {} opened ({:?} timeout)", address, self.timeout);

        Ok(TcpScpiAdapter {
            inner: Arc::new(Mutex::new(Some(BufReader::new(stream)))),
            address,
            timeout: self.timeout,
            write_terminator: self.write_terminator,
        })
    }
}

/// SCPI raw socket adapter
///
/// The socket sits behind `Arc<Mutex<>>`; a query holds the lock for its
/// whole write/read exchange.
#[derive(Clone)]
pub struct TcpScpiAdapter {
    inner: Arc<Mutex<Option<BufReader<TcpStream>>>>,
    address: SocketAddress,
    timeout: Duration,
    write_terminator: String,
}

impl TcpScpiAdapter {
    /// Connect with default settings
    pub async fn connect(resource: &str) -> FieldFoxResult<Self> {
        TcpScpiAdapterBuilder::new(resource).connect().await
    }

    /// Resolved socket address
    pub fn address(&self) -> &SocketAddress {
        &self.address
    }

    /// Current timeout setting
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(&self, stream: &mut BufReader<TcpStream>, cmd: &str) -> FieldFoxResult<()> {
        let line = format!("{}{}", cmd, self.write_terminator);
        with_timeout(self.timeout, &self.address, async {
            let socket = stream.get_mut();
            socket.write_all(line.as_bytes()).await?;
            socket.flush().await
        })
        .await
    }

    async fn receive(&self, stream: &mut BufReader<TcpStream>, cmd: &str) -> FieldFoxResult<String> {
        let mut buf = Vec::new();
        let read = with_timeout(self.timeout, &self.address, stream.read_until(b'\n', &mut buf))
            .await?;

        if read == 0 {
            return Err(FieldFoxError::Connection(format!(
                "{} closed the connection while answering '{}'",
                self.address, cmd
            )));
        }

        Ok(String::from_utf8_lossy(&buf).trim().to_string())
    }

    /// Forget the stream after a failed exchange; its framing can't be trusted.
    fn drop_stream(&self, slot: &mut Option<BufReader<TcpStream>>, cmd: &str) {
        if slot.take().is_some() {
            warn!(
                "SCPI socket {} dropped after failed exchange '{}'",
                self.address, cmd
            );
        }
    }
}

#[async_trait]
impl ScpiEndpoint for TcpScpiAdapter {
    async fn write(&self, cmd: &str) -> FieldFoxResult<()> {
        let mut guard = self.inner.lock().await;
        let stream = guard.as_mut().ok_or_else(|| not_connected(&self.address))?;

        let sent = self.send(stream, cmd).await;
        if let Err(e) = sent {
            self.drop_stream(&mut guard, cmd);
            return Err(e);
        }
        debug!("SCPI write: {}", cmd);
        Ok(())
    }

    async fn query(&self, cmd: &str) -> FieldFoxResult<String> {
        let mut guard = self.inner.lock().await;
        let stream = guard.as_mut().ok_or_else(|| not_connected(&self.address))?;

        let result = match self.send(stream, cmd).await {
            Ok(()) => self.receive(stream, cmd).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(reply) => {
                debug!("SCPI query '{}' -> '{}'", cmd, abbreviate(&reply));
                Ok(reply)
            }
            Err(e) => {
                // A late reply would otherwise be read as the answer to the next query
                self.drop_stream(&mut guard, cmd);
                Err(e)
            }
        }
    }

    async fn disconnect(&self) -> FieldFoxResult<()> {
        if let Some(mut stream) = self.inner.lock().await.take() {
            // Peer may already be gone; nothing left to report then
            let _ = stream.get_mut().shutdown().await;
            debug!("SCPI socket {} closed", self.address);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "TcpScpiAdapter({} @ {}ms timeout)",
            self.address,
            self.timeout.as_millis()
        )
    }
}

async fn with_timeout<T, F>(timeout: Duration, address: &SocketAddress, fut: F) -> FieldFoxResult<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|e| connection_error(address, e)),
        Err(_) => Err(FieldFoxError::Connection(format!(
            "{} timed out after {:?}",
            address, timeout
        ))),
    }
}

fn connection_error(address: &SocketAddress, err: std::io::Error) -> FieldFoxError {
    FieldFoxError::Connection(format!("{}: {}", address, err))
}

fn not_connected(address: &SocketAddress) -> FieldFoxError {
    FieldFoxError::Connection(format!("{} is not connected", address))
}

/// Trace replies run to thousands of characters; keep debug lines readable.
fn abbreviate(reply: &str) -> String {
    const MAX: usize = 80;
    if reply.len() <= MAX {
        return reply.to_string();
    }
    let cut = (0..=MAX).rev().find(|&i| reply.is_char_boundary(i)).unwrap_or(0);
    format!("{}... ({} bytes)", &reply[..cut], reply.len())
}
