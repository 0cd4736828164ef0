//! Host byte-stream tasks.
//!
//! On a host the serial device is an async byte stream instead of a pair
//! of interrupt handlers. These tasks drive the link ports from any
//! `AsyncRead` / `AsyncWrite`:
//!
//! ```text
//! reader ─► rx task ─► RxPort ─► RxPool ─► Linkbus::next_message
//! Linkbus::send_* ─► TxQueue ─► TxPort ─► tx task ─► writer
//! ```
//!
//! The transmit task writes one whole line per write and sleeps while the
//! queue is empty or the pacer holds the next line back.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::link::{RxPort, TxPort};
use crate::protocol::{Feed, MAX_TX_MSG_LENGTH};

/// Read buffer size of the receive task.
const READ_BUFFER_SIZE: usize = 256;

/// Spawn the receive task. It ends cleanly when the reader reaches EOF.
pub fn spawn_rx_task<R>(reader: R, port: RxPort) -> JoinHandle<Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let result = rx_loop(reader, port).await;
        if let Err(e) = &result {
            tracing::error!("Receive loop error: {}", e);
        }
        result
    })
}

/// Spawn the transmit task. It ends once the link is closed and every
/// queued line has been written.
pub fn spawn_tx_task<W>(writer: W, port: TxPort) -> JoinHandle<Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let result = tx_loop(writer, port).await;
        if let Err(e) = &result {
            tracing::error!("Transmit loop error: {}", e);
        }
        result
    })
}

async fn rx_loop<R>(mut reader: R, mut port: RxPort) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buf).await? {
            0 => return Ok(()), // EOF
            n => n,
        };

        for &byte in &buf[..n] {
            match port.receive(byte) {
                Feed::Published { .. } => tracing::trace!("Message received"),
                Feed::Discarded(e) => tracing::trace!("Frame discarded: {:?}", e),
                _ => {}
            }
        }
    }
}

async fn tx_loop<W>(mut writer: W, mut port: TxPort) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::with_capacity(MAX_TX_MSG_LENGTH);

    loop {
        line.clear();
        line.extend(std::iter::from_fn(|| port.next_byte()));

        if !line.is_empty() {
            writer.write_all(&line).await?;
            writer.flush().await?;
            continue;
        }

        if port.is_finished() {
            writer.shutdown().await?;
            return Ok(());
        }

        let delay = match port.pacing_delay() {
            d if d.is_zero() => port.poll_interval(),
            d => d,
        };
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkbusError;
    use crate::link::Linkbus;
    use crate::protocol::MessageId;
    use std::time::{Duration, Instant};
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_rx_task_parses_stream() {
        let (link, rx, _tx) = Linkbus::init(57_600).unwrap();
        let (mut client, server) = duplex(64);

        let task = spawn_rx_task(server, rx);
        client.write_all(b"noise$GO;$LED,ON;").await.unwrap();
        drop(client);

        task.await.unwrap().unwrap();
        assert_eq!(link.pending_messages(), 2);
        let first = link.next_message().unwrap();
        assert_eq!(first.message_id(), Some(MessageId::Go));
        drop(first);
        let second = link.next_message().unwrap();
        assert_eq!(second.field(0), Some("ON"));
    }

    #[tokio::test]
    async fn test_tx_task_paces_lines() {
        let (link, _rx, tx) = Linkbus::init(57_600).unwrap();
        let (client, mut server) = duplex(256);

        link.send("$GO;").await.unwrap();
        link.send("!ACK;").await.unwrap();
        link.close();

        let start = Instant::now();
        let task = spawn_tx_task(client, tx);

        let mut out = Vec::new();
        server.read_to_end(&mut out).await.unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(out, b"$GO;!ACK;");
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_tx_task_write_error() {
        let (link, _rx, tx) = Linkbus::init(57_600).unwrap();
        let (client, server) = duplex(16);
        drop(server);

        link.send("$VER?").await.unwrap();
        let result = spawn_tx_task(client, tx).await.unwrap();
        assert!(matches!(result, Err(LinkbusError::Io(_))));
    }
}
