//! Splitting an input stream into fixed-size chunks.
//!
//! Every chunk is exactly `chunk_size` bytes except the last, which may be
//! shorter. An empty input produces no chunks.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound on how far the chunk buffer grows per read.
const READ_STEP: usize = 64 * 1024;

/// Totals recorded once the input is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Total bytes read.
    pub length: u64,
    /// Number of chunks produced.
    pub chunks: u32,
    /// Hex Blake3 digest of the whole content.
    pub checksum: String,
}

/// Reads an [`AsyncRead`] one chunk at a time while hashing the content.
pub struct ChunkReader<'a> {
    reader: &'a mut (dyn AsyncRead + Unpin + Send),
    chunk_size: usize,
    hasher: blake3::Hasher,
    length: u64,
    chunks: u32,
    done: bool,
}

impl<'a> ChunkReader<'a> {
    /// Wrap a reader. `chunk_size` must be positive.
    pub fn new(reader: &'a mut (dyn AsyncRead + Unpin + Send), chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            hasher: blake3::Hasher::new(),
            length: 0,
            chunks: 0,
            done: false,
        }
    }

    /// Read the next chunk. Returns `None` at EOF.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Bytes>> {
        if self.done {
            return Ok(None);
        }

        // Grows with the data so a short file never pays for a full chunk.
        let mut buf = BytesMut::new();
        let mut filled = 0;
        while filled < self.chunk_size {
            let step = (self.chunk_size - filled).min(READ_STEP);
            buf.resize(filled + step, 0);
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                self.done = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }

        buf.truncate(filled);
        self.hasher.update(&buf);
        self.length += filled as u64;
        self.chunks += 1;
        Ok(Some(buf.freeze()))
    }

    /// Totals so far. Call after `next_chunk` returned `None`.
    pub fn summary(&self) -> ChunkSummary {
        ChunkSummary {
            length: self.length,
            chunks: self.chunks,
            checksum: self.hasher.finalize().to_hex().to_string(),
        }
    }
}

/// Hex Blake3 digest of a buffer, in the format used by [`ChunkSummary`].
pub fn checksum(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(data: &[u8], chunk_size: usize) -> (Vec<Bytes>, ChunkSummary) {
        let mut input = data;
        let mut reader = ChunkReader::new(&mut input, chunk_size);
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        (chunks, reader.summary())
    }

    #[tokio::test]
    async fn test_exact_multiple() {
        let (chunks, summary) = collect(b"abcdefgh", 4).await;
        assert_eq!(chunks, vec![Bytes::from_static(b"abcd"), Bytes::from_static(b"efgh")]);
        assert_eq!(summary.length, 8);
        assert_eq!(summary.chunks, 2);
    }

    #[tokio::test]
    async fn test_short_last_chunk() {
        let (chunks, summary) = collect(b"abcdefghij", 4).await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].as_ref(), b"ij");
        assert_eq!(summary.checksum, checksum(b"abcdefghij"));
    }

    #[tokio::test]
    async fn test_chunk_larger_than_read_step() {
        let data: Vec<u8> = (0..(READ_STEP * 2 + 10)).map(|i| (i % 7) as u8).collect();
        let (chunks, summary) = collect(&data, READ_STEP * 2).await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), READ_STEP * 2);
        assert_eq!(chunks[1].len(), 10);
        assert_eq!(summary.checksum, checksum(&data));
    }

    #[tokio::test]
    async fn test_small_input_with_max_chunk_size() {
        let (chunks, summary) = collect(b"abc", crate::MAX_CHUNK_SIZE).await;
        assert_eq!(chunks, vec![Bytes::from_static(b"abc")]);
        assert_eq!(summary.chunks, 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (chunks, summary) = collect(b"", 4).await;
        assert!(chunks.is_empty());
        assert_eq!(summary.length, 0);
        assert_eq!(summary.checksum, checksum(b""));
    }

    #[tokio::test]
    async fn test_slow_reader_fills_chunks() {
        // A reader that returns one byte per read still yields full chunks.
        let (client, mut server) = tokio::io::duplex(1);
        let writer = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            server.write_all(b"0123456789").await.unwrap();
        });

        let mut client = client;
        let mut reader = ChunkReader::new(&mut client, 5);
        let first = reader.next_chunk().await.unwrap().unwrap();
        let second = reader.next_chunk().await.unwrap().unwrap();
        writer.await.unwrap();
        assert_eq!(first.as_ref(), b"01234");
        assert_eq!(second.as_ref(), b"56789");
    }
}
