//! Byte relays between a shell transport and the HTTP layer.
//!
//! The output relay adapts the transport's push-style byte flow into a
//! pull-based bounded channel that an HTTP response body can consume
//! incrementally. The input relay funnels discrete submitted chunks into a
//! single writer task so per-connection writes stay in submission order.

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::SessionError;
use crate::transport::{ShellReader, ShellWriter};

/// Capacity of the output channel, in chunks. A slow HTTP consumer
/// backpressures the transport read loop through `send().await`; there is
/// no secondary buffer beyond these in-flight chunks.
pub const OUTPUT_CHANNEL_CAPACITY: usize = 32;

/// Read buffer size per chunk.
const READ_BUF_LEN: usize = 8192;

/// Receiving end of a session's output relay, handed to the HTTP layer.
///
/// Ordered, single-consumer, finite: the channel closes when the remote
/// shell closes, after yielding one final `Err` item if the transport
/// failed mid-stream.
pub type OutputStream = mpsc::Receiver<Result<Bytes, SessionError>>;

/// Why an output relay stopped pumping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The remote shell closed its output cleanly.
    RemoteClosed,
    /// The transport failed mid-stream; an `Err` item was emitted first.
    TransportError,
    /// The HTTP consumer dropped the stream (browser navigated away).
    ConsumerGone,
}

/// Pump remote shell output into the bounded output channel until the
/// stream ends, reporting why it ended.
///
/// Output bytes are delivered in the order the remote produced them; a
/// terminal renders garbage otherwise.
pub(crate) async fn pump_output(
    mut reader: ShellReader,
    tx: mpsc::Sender<Result<Bytes, SessionError>>,
) -> StreamEnd {
    let mut buf = vec![0u8; READ_BUF_LEN];
    loop {
        let read = tokio::select! {
            read = reader.read(&mut buf) => read,
            // An idle shell produces no byte whose send could fail, so a
            // dropped receiver must end the pump on its own.
            () = tx.closed() => return StreamEnd::ConsumerGone,
        };
        match read {
            Ok(0) => return StreamEnd::RemoteClosed,
            Ok(n) => {
                if tx.send(Ok(Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
                    return StreamEnd::ConsumerGone;
                }
            }
            Err(e) => {
                // Surface a clearly-terminated stream, never a silent
                // truncation. The consumer may already be gone; ignore.
                let _ = tx
                    .send(Err(SessionError::Transport {
                        reason: e.to_string(),
                    }))
                    .await;
                return StreamEnd::TransportError;
            }
        }
    }
}

/// Drain submitted input chunks into the transport writer, one at a time.
///
/// A single consumer task per session means mpsc's per-sender FIFO is the
/// ordering guarantee: chunks submitted sequentially for one connection id
/// reach the transport in submission order. The task ends when every
/// sender is dropped or the transport rejects a write.
pub(crate) async fn pump_input(mut writer: ShellWriter, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(chunk) = rx.recv().await {
        if writer.write_all(&chunk).await.is_err() {
            break;
        }
        if writer.flush().await.is_err() {
            break;
        }
    }
    let _ = writer.shutdown().await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn output_chunks_arrive_in_order_then_eof() {
        let (client, mut remote) = tokio::io::duplex(1024);
        let (reader, _writer) = tokio::io::split(client);
        let (tx, mut rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);

        let pump = tokio::spawn(pump_output(Box::new(reader), tx));

        remote.write_all(b"alpha").await.unwrap();
        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(&first[..], b"alpha");

        remote.write_all(b"beta").await.unwrap();
        let second = rx.recv().await.unwrap().unwrap();
        assert_eq!(&second[..], b"beta");

        drop(remote);
        assert!(rx.recv().await.is_none());
        assert_eq!(pump.await.unwrap(), StreamEnd::RemoteClosed);
    }

    #[tokio::test]
    async fn output_stops_when_consumer_drops() {
        let (client, mut remote) = tokio::io::duplex(1024);
        let (reader, _writer) = tokio::io::split(client);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let pump = tokio::spawn(pump_output(Box::new(reader), tx));
        remote.write_all(b"into the void").await.unwrap();

        assert_eq!(pump.await.unwrap(), StreamEnd::ConsumerGone);
    }

    #[tokio::test]
    async fn output_ends_when_consumer_drops_over_idle_shell() {
        let (client, _remote) = tokio::io::duplex(1024);
        let (reader, _writer) = tokio::io::split(client);
        let (tx, rx) = mpsc::channel(1);

        // The remote stays open and silent; only the receiver goes away.
        let pump = tokio::spawn(pump_output(Box::new(reader), tx));
        drop(rx);

        assert_eq!(pump.await.unwrap(), StreamEnd::ConsumerGone);
    }

    #[tokio::test]
    async fn input_chunks_are_written_in_submission_order() {
        let (client, remote) = tokio::io::duplex(1024);
        let (_reader, writer) = tokio::io::split(client);
        let (mut remote_reader, _remote_writer) = tokio::io::split(remote);
        let (tx, rx) = mpsc::unbounded_channel();

        let pump = tokio::spawn(pump_input(Box::new(writer), rx));

        tx.send(b"ls\n".to_vec()).unwrap();
        tx.send(b"pwd\n".to_vec()).unwrap();
        drop(tx);
        pump.await.unwrap();

        let mut seen = Vec::new();
        remote_reader.read_to_end(&mut seen).await.unwrap();
        assert_eq!(&seen[..], b"ls\npwd\n");
    }
}
