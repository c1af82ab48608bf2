use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, split};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::endpoint::Endpoint;

pub const BUFFER_SIZE: usize = 1024;

/// Relays bytes between an accepted front connection and its backend
/// connection until either stream ends or a forward write fails, then closes
/// both sides together.
pub async fn run(front: Endpoint, back: TcpStream) -> Result<()> {
    let back = Endpoint::Plain(back);

    let (front_reader, mut front_writer) = split(front);
    let (back_reader, mut back_writer) = split(back);

    // One queue per direction; each pump publishes chunks in read order and
    // `None` once its stream is done.
    let (front_tx, mut front_rx) = mpsc::channel(1);
    let (back_tx, mut back_rx) = mpsc::channel(1);

    let front_pump = tokio::spawn(pump(front_reader, front_tx, "client"));
    let back_pump = tokio::spawn(pump(back_reader, back_tx, "backend"));

    let result = loop {
        tokio::select! {
            chunk = front_rx.recv() => match chunk.flatten() {
                Some(data) => {
                    debug!(bytes = data.len(), "Forwarding data from client to backend");
                    if let Err(e) = back_writer.write_all(&data).await {
                        error!(error = %e, bytes = data.len(), "Failed to write to backend");
                        break Err(e).context("Failed to forward client data to backend");
                    }
                }
                None => break Ok(()),
            },
            chunk = back_rx.recv() => match chunk.flatten() {
                Some(data) => {
                    debug!(bytes = data.len(), "Forwarding data from backend to client");
                    if let Err(e) = front_writer.write_all(&data).await {
                        error!(error = %e, bytes = data.len(), "Failed to write to client");
                        break Err(e).context("Failed to forward backend data to client");
                    }
                }
                None => break Ok(()),
            },
        }
    };

    // Both endpoints go down with the session: signal end-of-stream on each
    // write half, then cancel the pumps so the read halves are dropped too.
    let _ = front_writer.shutdown().await;
    let _ = back_writer.shutdown().await;
    front_pump.abort();
    back_pump.abort();

    info!("Relay session closed");
    result
}

/// Reads chunks from one endpoint into its queue. Publishes `None` as the
/// final item once the stream hits end-of-stream or a read error.
async fn pump(
    mut reader: ReadHalf<Endpoint>,
    chunks: mpsc::Sender<Option<Vec<u8>>>,
    label: &'static str,
) {
    let mut scratch = [0u8; BUFFER_SIZE];

    loop {
        match reader.read(&mut scratch).await {
            Ok(0) => {
                debug!(endpoint = label, "Connection closed");
                let _ = chunks.send(None).await;
                break;
            }
            Ok(n) => {
                // The scratch buffer is reused on the next read, so each chunk
                // is copied out before it is published.
                if chunks.send(Some(scratch[..n].to_vec())).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(endpoint = label, error = %e, "Connection lost");
                let _ = chunks.send(None).await;
                break;
            }
        }
    }
}
