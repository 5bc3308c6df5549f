//! File transfer engine: a `FILE:` header followed by the raw body in
//! fixed-size chunks.
//!
//! The sender writes the header, waits `header_settle`, then streams the
//! body. The receiver never treats body bytes as frames: once the header
//! is decoded it counts bytes until the declared size is reached.

use std::path::{Path, PathBuf};
use std::time::Instant;

use ndog_protocol::{Frame, decode_prefix, encode_file_header, sanitize_file_name};
use ndog_transport::{Connection, TransportError, TransportMode, UDP_MAX_PAYLOAD};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::FailureCause;
use crate::{TransferConfig, TransferError, TransferProgress, TransferSummary};

/// Read size used while waiting for the header.
const HEADER_READ_SIZE: usize = 64 * 1024;

/// Sends the file at `path`: header first, then the body.
///
/// `on_progress` is called once before the first chunk and after every
/// chunk, ending at `(size, size)`.
///
/// # Errors
/// - `FileNotFound` / `NotReadable` before anything is sent.
/// - `Protocol` if the file name cannot be carried in a header.
/// - `TransferFailed` if a chunk cannot be read or sent. `Cancelled` when
///   the endpoint was closed locally.
pub async fn send_file<C, F>(
    conn: &C,
    path: &Path,
    config: &TransferConfig,
    mut on_progress: F,
) -> Result<TransferSummary, TransferError>
where
    C: Connection,
    F: FnMut(&TransferProgress),
{
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TransferError::FileNotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(TransferError::NotReadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if !metadata.is_file() {
        return Err(TransferError::NotReadable {
            path: path.to_path_buf(),
            source: std::io::Error::other("not a regular file"),
        });
    }

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let size = metadata.len();
    let header = encode_file_header(&name, size)?;

    let mut file = File::open(path)
        .await
        .map_err(|source| TransferError::NotReadable {
            path: path.to_path_buf(),
            source,
        })?;

    let started = Instant::now();
    if let Err(e) = conn.send(&header).await {
        return Err(TransferError::failed(
            TransferProgress::new(size),
            cause(conn, e),
        ));
    }
    tracing::info!(%name, size, mode = %conn.mode(), "sending file");

    if !config.header_settle.is_zero() {
        tokio::time::sleep(config.header_settle).await;
    }

    let chunk_size = body_chunk_size(conn.mode(), config);
    let mut buf = vec![0u8; chunk_size];
    let mut progress = TransferProgress::new(size);
    let mut chunks = 0u64;
    on_progress(&progress);

    while !progress.is_complete() {
        let want = progress.remaining().min(chunk_size as u64) as usize;
        let n = read_full(&mut file, &mut buf[..want])
            .await
            .map_err(|e| TransferError::failed(progress, FailureCause::Io(e)))?;
        if n == 0 {
            return Err(TransferError::failed(
                progress,
                FailureCause::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "file shrank while sending",
                )),
            ));
        }

        if let Err(e) = conn.send(&buf[..n]).await {
            return Err(TransferError::failed(progress, cause(conn, e)));
        }
        progress.advance(n as u64);
        chunks += 1;
        on_progress(&progress);

        if conn.mode() == TransportMode::Udp
            && !progress.is_complete()
            && !config.udp_chunk_delay.is_zero()
        {
            tokio::time::sleep(config.udp_chunk_delay).await;
        }
    }

    let elapsed = started.elapsed();
    tracing::info!(%name, size, chunks, ?elapsed, "file sent");
    Ok(TransferSummary {
        name,
        path: path.to_path_buf(),
        progress,
        chunks,
        elapsed,
    })
}

/// Waits for a file header, then receives the body into `dest`.
///
/// Frames that arrive before the header are logged and skipped. If `dest`
/// is a directory the file is written inside it under the sanitized name
/// from the header; otherwise `dest` is the output path.
pub async fn receive_file<C, F>(
    conn: &C,
    dest: &Path,
    config: &TransferConfig,
    on_progress: F,
) -> Result<TransferSummary, TransferError>
where
    C: Connection,
    F: FnMut(&TransferProgress),
{
    loop {
        let Some(inbound) = conn.recv(HEADER_READ_SIZE).await? else {
            if conn.is_closed() {
                return Err(TransferError::failed(
                    TransferProgress::new(0),
                    FailureCause::Cancelled,
                ));
            }
            return Err(TransportError::ConnectionClosed(
                "peer closed before sending a file header".into(),
            )
            .into());
        };

        match decode_prefix(&inbound.bytes) {
            Ok((Frame::FileHeader { name, size }, body)) => {
                return receive_file_body(conn, &name, size, body, dest, config, on_progress)
                    .await;
            }
            Ok((frame, _)) => {
                tracing::warn!(kind = %frame.kind(), "ignoring frame while waiting for a file header");
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed frame while waiting for a file header");
            }
        }
    }
}

/// Receives a body of `size` bytes after its header has been decoded.
///
/// `leftover` holds body bytes that arrived in the same read as the
/// header. No more than `size` bytes are written; excess in the last read
/// is dropped with a warning.
///
/// # Errors
/// - `IncompleteTransfer` if the peer closes early. The partial file stays.
/// - `TransferFailed` with `Cancelled` if the endpoint is closed locally.
pub async fn receive_file_body<C, F>(
    conn: &C,
    name: &str,
    size: u64,
    leftover: &[u8],
    dest: &Path,
    config: &TransferConfig,
    mut on_progress: F,
) -> Result<TransferSummary, TransferError>
where
    C: Connection,
    F: FnMut(&TransferProgress),
{
    let path = destination(dest, name).await?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .await
        .map_err(|source| TransferError::NotWritable {
            path: path.clone(),
            source,
        })?;

    tracing::info!(%name, size, path = %path.display(), "receiving file");
    let started = Instant::now();
    let chunk_size = config.chunk_size.max(1);
    let mut progress = TransferProgress::new(size);
    let mut chunks = 0u64;
    on_progress(&progress);

    if !leftover.is_empty() {
        write_chunk(&mut file, leftover, &mut progress).await?;
        chunks += 1;
        on_progress(&progress);
    }

    while !progress.is_complete() {
        let want = progress.remaining().min(chunk_size as u64) as usize;
        match conn.recv(want).await {
            Ok(Some(inbound)) => {
                write_chunk(&mut file, &inbound.bytes, &mut progress).await?;
                chunks += 1;
                on_progress(&progress);
            }
            Ok(None) => {
                let _ = file.flush().await;
                if conn.is_closed() {
                    return Err(TransferError::failed(progress, FailureCause::Cancelled));
                }
                tracing::warn!(%name, %progress, "peer closed mid-transfer");
                return Err(TransferError::IncompleteTransfer { path, progress });
            }
            Err(e) => {
                let _ = file.flush().await;
                return Err(TransferError::failed(progress, cause(conn, e)));
            }
        }
    }

    file.flush()
        .await
        .map_err(|e| TransferError::failed(progress, FailureCause::Io(e)))?;

    let elapsed = started.elapsed();
    tracing::info!(%name, size, chunks, ?elapsed, "file received");
    Ok(TransferSummary {
        name: name.to_string(),
        path,
        progress,
        chunks,
        elapsed,
    })
}

/// Chunk size for body writes. UDP chunks must fit one datagram.
fn body_chunk_size(mode: TransportMode, config: &TransferConfig) -> usize {
    let chunk = config.chunk_size.max(1);
    match mode {
        TransportMode::Tcp => chunk,
        TransportMode::Udp => chunk.min(UDP_MAX_PAYLOAD),
    }
}

async fn destination(dest: &Path, name: &str) -> Result<PathBuf, TransferError> {
    let is_dir = tokio::fs::metadata(dest)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false);
    if is_dir {
        Ok(dest.join(sanitize_file_name(name)?))
    } else {
        Ok(dest.to_path_buf())
    }
}

/// Writes at most `progress.remaining()` bytes of `bytes`.
async fn write_chunk(
    file: &mut File,
    bytes: &[u8],
    progress: &mut TransferProgress,
) -> Result<(), TransferError> {
    let remaining = progress.remaining();
    let take = if bytes.len() as u64 > remaining {
        tracing::warn!(
            received = bytes.len(),
            remaining,
            "dropping bytes past the declared size"
        );
        remaining as usize
    } else {
        bytes.len()
    };
    file.write_all(&bytes[..take])
        .await
        .map_err(|e| TransferError::failed(*progress, FailureCause::Io(e)))?;
    progress.advance(take as u64);
    Ok(())
}

/// Fills `buf` from `file`, stopping early only at end of file.
async fn read_full(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn cause<C: Connection>(conn: &C, error: TransportError) -> FailureCause {
    if conn.is_closed() {
        FailureCause::Cancelled
    } else {
        FailureCause::Transport(error)
    }
}
