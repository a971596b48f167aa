//! ==============================================================================
//! ingest.rs - tcp listener for greenhouse sensor nodes
//! ==============================================================================
//!
//! purpose:
//!     accepts plain tcp connections from sensor nodes and feeds every
//!     well-formed line into the shared reading buffer.
//!
//! model:
//!     one tokio task per accepted connection. each task reads newline
//!     framed messages until eof or an i/o error; a dropped or reset
//!     connection ends only that task. malformed lines are logged and
//!     skipped, never partially inserted.
//!
//! relationships:
//!     - uses: protocol.rs (via SharedBuffer::append)
//!     - writes: buffer.rs
//!     - started by: main.rs
//!
//! ==============================================================================

use crate::buffer::SharedBuffer;
use crate::domain::now_ms;
use crate::protocol::{self, ParseError};

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::net::TcpListener;

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub max_line_bytes: usize,
    pub show_sensor_data: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { max_line_bytes: 1024, show_sensor_data: false }
    }
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind ingest listener on {}", addr))
}

/// accept loop; runs until the listener itself fails
pub async fn serve(listener: TcpListener, buffer: SharedBuffer, opts: IngestOptions) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Ingest listening on {}", addr);
    }

    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        tracing::info!(%peer, "sensor node connected");

        let buffer = buffer.clone();
        tokio::spawn(async move {
            match ConnectionEnd::from(handle_connection(stream, peer, &buffer, opts).await) {
                ConnectionEnd::Closed { accepted } => {
                    tracing::info!(%peer, accepted, "sensor node disconnected");
                }
                ConnectionEnd::Reset => tracing::info!(%peer, "connection reset by client"),
                ConnectionEnd::Failed(e) => tracing::warn!(%peer, "connection error: {}", e),
            }
        });
    }
}

/// how a connection handler finished
#[derive(Debug)]
pub enum ConnectionEnd {
    /// clean eof from the node
    Closed { accepted: u64 },
    /// node went away with an rst
    Reset,
    Failed(std::io::Error),
}

impl From<std::io::Result<u64>> for ConnectionEnd {
    fn from(res: std::io::Result<u64>) -> Self {
        match res {
            Ok(accepted) => ConnectionEnd::Closed { accepted },
            Err(e) if e.kind() == ErrorKind::ConnectionReset => ConnectionEnd::Reset,
            Err(e) => ConnectionEnd::Failed(e),
        }
    }
}

/// read lines from one node until eof
///
/// returns the number of readings accepted on this connection. i/o errors
/// end the loop and are handed back to the caller; parse errors never do.
pub async fn handle_connection<R>(
    stream: R,
    peer: SocketAddr,
    buffer: &SharedBuffer,
    opts: IngestOptions,
) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut raw = Vec::with_capacity(opts.max_line_bytes + 2);
    let mut accepted = 0u64;
    // room for the longest allowed line plus "\r\n"
    let read_limit = opts.max_line_bytes as u64 + 2;

    loop {
        raw.clear();
        let n = (&mut reader).take(read_limit).read_until(b'\n', &mut raw).await?;
        if n == 0 {
            return Ok(accepted);
        }

        let terminated = raw.ends_with(b"\n");
        if !terminated && n as u64 == read_limit {
            discard_rest_of_line(&mut reader).await?;
            reject(peer, buffer, ParseError::TooLong { limit: opts.max_line_bytes }, "<truncated>").await;
            continue;
        }
        // short read without a newline only happens at eof
        if !terminated {
            if !protocol::clean_line(&String::from_utf8_lossy(&raw)).is_empty() {
                reject(peer, buffer, ParseError::Unterminated, "<partial>").await;
            }
            return Ok(accepted);
        }

        let text = match std::str::from_utf8(&raw) {
            Ok(t) => protocol::clean_line(t),
            Err(_) => {
                reject(peer, buffer, ParseError::InvalidUtf8, "<binary>").await;
                continue;
            }
        };
        if text.is_empty() {
            continue;
        }
        if text.len() > opts.max_line_bytes {
            reject(peer, buffer, ParseError::TooLong { limit: opts.max_line_bytes }, "<truncated>").await;
            continue;
        }

        match buffer.append(text, now_ms()).await {
            Ok(reading) => {
                accepted += 1;
                if opts.show_sensor_data {
                    tracing::info!(
                        %peer,
                        "DHT22 {:.1}°C {:.1}% | DHT11 {:.1}°C {:.1}% | LM35 {:.1}/{:.1}°C | soil {:.1}/{:.1}/{:.1}% | avg {:.2}°C",
                        reading.temperature_dht22,
                        reading.humidity_dht22,
                        reading.temperature_dht11,
                        reading.humidity_dht11,
                        reading.temperature_lm35_1,
                        reading.temperature_lm35_2,
                        reading.soil_moisture_1,
                        reading.soil_moisture_2,
                        reading.soil_moisture_3,
                        reading.average_temperature
                    );
                } else {
                    tracing::debug!(%peer, "reading accepted: {}", text);
                }
            }
            Err(e) => tracing::warn!(%peer, "dropping message {:?}: {}", text, e),
        }
    }
}

async fn reject(peer: SocketAddr, buffer: &SharedBuffer, err: ParseError, what: &str) {
    buffer.record_rejected().await;
    tracing::warn!(%peer, "dropping message {}: {}", what, err);
}

async fn discard_rest_of_line<R>(reader: &mut BufReader<R>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut scratch = Vec::with_capacity(1024);
    loop {
        scratch.clear();
        let n = (&mut *reader).take(4096).read_until(b'\n', &mut scratch).await?;
        if n == 0 || scratch.ends_with(b"\n") {
            return Ok(());
        }
    }
}
