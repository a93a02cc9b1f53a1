/*
 * stream.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Streaming generation.
//!
//! Generators write to a blocking [`std::io::Write`]. To stream their
//! output to an async consumer, [`spawn_generation`] runs the generator on
//! the blocking pool and hands it one end of an in-memory duplex pipe. The
//! caller reads the other end.
//!
//! Each write blocks until the pipe has room or the cancellation token
//! fires. Cancelling the token or dropping the reader makes the next write
//! fail, so the blocking task always finishes.

use std::io;
use std::sync::Arc;

use sqlforge_tabular::{Generator, Row};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Pipe buffer between the generator and the reader.
pub const PIPE_CAPACITY: usize = 64 * 1024;

/// Start writing `rows` with `generator` on the blocking pool.
///
/// Returns the read end of the pipe and the handle of the generation task.
/// Must be called from within a Tokio runtime.
pub fn spawn_generation(
    generator: Arc<dyn Generator>,
    rows: Vec<Row>,
    token: CancellationToken,
) -> (DuplexStream, JoinHandle<Result<()>>) {
    let (reader, writer) = tokio::io::duplex(PIPE_CAPACITY);
    let handle = Handle::current();

    let task = tokio::task::spawn_blocking(move || {
        let mut sink = PipeWriter {
            inner: writer,
            handle,
            token: token.clone(),
        };
        let result = generator.generate_stream(&mut sink, &rows);
        // Dropping the writer signals EOF to the reader.
        drop(sink);
        match result {
            Ok(()) => Ok(()),
            Err(_) if token.is_cancelled() => Err(Error::Cancelled),
            Err(err) => Err(err.into()),
        }
    });

    (reader, task)
}

/// Blocking `Write` over the async half of a duplex pipe.
struct PipeWriter {
    inner: DuplexStream,
    handle: Handle,
    token: CancellationToken,
}

impl PipeWriter {
    fn cancelled() -> io::Error {
        io::Error::new(io::ErrorKind::BrokenPipe, "generation cancelled")
    }
}

impl io::Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = &mut self.inner;
        let token = &self.token;
        self.handle.block_on(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(Self::cancelled()),
                written = inner.write(buf) => written,
            }
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        let inner = &mut self.inner;
        let token = &self.token;
        self.handle.block_on(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(Self::cancelled()),
                flushed = inner.flush() => flushed,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlforge_tabular::{CsvGenerator, TableGenerator};
    use tokio::io::AsyncReadExt;

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| [("id", i.to_string()), ("name", format!("row-{i}"))].into_iter().collect())
            .collect()
    }

    #[tokio::test]
    async fn test_stream_csv() {
        let (mut reader, task) = spawn_generation(
            Arc::new(CsvGenerator::new("unused.csv")),
            rows(2),
            CancellationToken::new(),
        );
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(out, "id,name\n0,row-0\n1,row-1\n");
    }

    #[tokio::test]
    async fn test_large_output_applies_backpressure() {
        let (mut reader, task) = spawn_generation(
            Arc::new(CsvGenerator::new("unused.csv")),
            rows(20_000),
            CancellationToken::new(),
        );
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        task.await.unwrap().unwrap();
        assert!(out.len() > PIPE_CAPACITY);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 20_001);
    }

    #[tokio::test]
    async fn test_cancel_stops_generation() {
        let token = CancellationToken::new();
        let (reader, task) = spawn_generation(
            Arc::new(CsvGenerator::new("unused.csv")),
            rows(20_000),
            token.clone(),
        );
        // Nobody reads, so the writer blocks once the pipe is full.
        token.cancel();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        drop(reader);
    }

    #[tokio::test]
    async fn test_dropped_reader_ends_task() {
        let (reader, task) = spawn_generation(
            Arc::new(CsvGenerator::new("unused.csv")),
            rows(20_000),
            CancellationToken::new(),
        );
        drop(reader);
        let result = task.await.unwrap();
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_generation_error_is_reported() {
        let (mut reader, task) = spawn_generation(
            Arc::new(TableGenerator::stdout()),
            Vec::new(),
            CancellationToken::new(),
        );
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
        assert!(matches!(task.await.unwrap(), Err(Error::EmptyInput)));
    }
}
