//! Incremental gzip decompression of a byte stream.
//!
//! Compressed chunks are pushed through a `flate2` write-side decoder as
//! they arrive. Output is handed out in slices of about
//! `OUTPUT_CHUNK_SIZE`, so a highly compressible chunk never expands into
//! one large buffer.

use std::io::Write;

use flate2::write::MultiGzDecoder;
use futures::stream::{self, StreamExt};

use crate::errors::PipelineError;
use crate::source::storage::ByteStream;

/// Decompressed bytes gathered before a slice is yielded.
pub const OUTPUT_CHUNK_SIZE: usize = 64 * 1024;

/// Push-based gzip decoder. Concatenated gzip members decode as one stream.
pub struct GzipStreamDecoder {
    decoder: MultiGzDecoder<Vec<u8>>,
}

impl GzipStreamDecoder {
    pub fn new() -> Self {
        Self {
            decoder: MultiGzDecoder::new(Vec::new()),
        }
    }

    /// Feed compressed input until it is used up or about
    /// `OUTPUT_CHUNK_SIZE` bytes of output are pending.
    ///
    /// Returns how many input bytes were consumed.
    pub fn push(&mut self, input: &[u8]) -> Result<usize, PipelineError> {
        let mut consumed = 0;
        while consumed < input.len() && self.decoder.get_ref().len() < OUTPUT_CHUNK_SIZE {
            let written = self
                .decoder
                .write(&input[consumed..])
                .map_err(|e| PipelineError::decompression(e.to_string()))?;
            if written == 0 {
                return Err(PipelineError::decompression(
                    "decoder stopped accepting input",
                ));
            }
            consumed += written;
        }
        Ok(consumed)
    }

    /// Take the output released so far.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(self.decoder.get_mut())
    }

    /// Signal end of input. Fails if the last member or its trailer is incomplete.
    pub fn finish(self) -> Result<Vec<u8>, PipelineError> {
        self.decoder
            .finish()
            .map_err(|e| PipelineError::decompression(format!("truncated gzip stream: {}", e)))
    }
}

impl Default for GzipStreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

struct GunzipState {
    input: ByteStream,
    decoder: Option<GzipStreamDecoder>,
    chunk: Vec<u8>,
    offset: usize,
}

/// Wrap a gzip-compressed byte stream into a stream of decompressed bytes.
///
/// Upstream errors are forwarded unchanged; malformed or truncated input
/// ends the stream with `PipelineError::DecompressionError`.
pub fn gunzip(input: ByteStream) -> ByteStream {
    let state = GunzipState {
        input,
        decoder: Some(GzipStreamDecoder::new()),
        chunk: Vec::new(),
        offset: 0,
    };

    stream::try_unfold(state, |mut state| async move {
        loop {
            let Some(decoder) = state.decoder.as_mut() else {
                return Ok(None);
            };

            if state.offset < state.chunk.len() {
                state.offset += decoder.push(&state.chunk[state.offset..])?;
                let output = decoder.take_output();
                if !output.is_empty() {
                    return Ok(Some((output, state)));
                }
                continue;
            }

            match state.input.next().await {
                Some(Ok(chunk)) => {
                    state.chunk = chunk;
                    state.offset = 0;
                }
                Some(Err(e)) => return Err(e),
                None => {
                    let Some(decoder) = state.decoder.take() else {
                        return Ok(None);
                    };
                    let output = decoder.finish()?;
                    if output.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some((output, state)));
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn chunked(data: Vec<u8>, size: usize) -> ByteStream {
        let chunks: Vec<Result<Vec<u8>, PipelineError>> =
            data.chunks(size).map(|c| Ok(c.to_vec())).collect();
        stream::iter(chunks).boxed()
    }

    async fn collect(stream: ByteStream) -> Result<Vec<u8>, PipelineError> {
        let mut out = Vec::new();
        let mut stream = stream;
        while let Some(chunk) = stream.next().await {
            out.extend(chunk?);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn test_gunzip_small_chunks() {
        let plain: Vec<u8> = (0..5000)
            .flat_map(|i| format!("line number {}\n", i).into_bytes())
            .collect();
        let compressed = gzip(&plain);

        let output = collect(gunzip(chunked(compressed, 7))).await.unwrap();
        assert_eq!(output, plain);
    }

    #[tokio::test]
    async fn test_gunzip_single_chunk() {
        let compressed = gzip(b"a\nb\nc\n");
        let output = collect(gunzip(chunked(compressed, 1 << 20))).await.unwrap();
        assert_eq!(output, b"a\nb\nc\n");
    }

    #[tokio::test]
    async fn test_gunzip_concatenated_members() {
        let mut compressed = gzip(b"first member\n");
        compressed.extend(gzip(b"second member\n"));

        let output = collect(gunzip(chunked(compressed.clone(), 1 << 20))).await.unwrap();
        assert_eq!(output, b"first member\nsecond member\n");

        let output = collect(gunzip(chunked(compressed, 3))).await.unwrap();
        assert_eq!(output, b"first member\nsecond member\n");
    }

    #[tokio::test]
    async fn test_gunzip_output_is_sliced() {
        let plain = vec![b'x'; 4 * 1024 * 1024];
        let compressed = gzip(&plain);

        let mut stream = gunzip(chunked(compressed, 1 << 20));
        let mut total = 0;
        let mut slices = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            assert!(chunk.len() <= 2 * OUTPUT_CHUNK_SIZE, "slice of {} bytes", chunk.len());
            total += chunk.len();
            slices += 1;
        }

        assert_eq!(total, plain.len());
        assert!(slices > 1);
    }

    #[tokio::test]
    async fn test_gunzip_trailing_garbage_fails() {
        let mut compressed = gzip(b"line\n");
        compressed.extend_from_slice(b"not a gzip member");

        let result = collect(gunzip(chunked(compressed, 64))).await;
        assert!(matches!(result, Err(PipelineError::DecompressionError(_))));
    }

    #[tokio::test]
    async fn test_gunzip_truncated_input_fails() {
        let plain: Vec<u8> = (0..2000)
            .flat_map(|i| format!("entry {}\n", i).into_bytes())
            .collect();
        let mut compressed = gzip(&plain);
        compressed.truncate(compressed.len() - 10);

        let result = collect(gunzip(chunked(compressed, 64))).await;
        assert!(matches!(result, Err(PipelineError::DecompressionError(_))));
    }

    #[tokio::test]
    async fn test_gunzip_not_gzip_fails() {
        let result = collect(gunzip(chunked(b"plain text, not gzip\n".to_vec(), 4))).await;
        assert!(matches!(result, Err(PipelineError::DecompressionError(_))));
    }

    #[tokio::test]
    async fn test_gunzip_forwards_upstream_error() {
        let compressed = gzip(b"line\n");
        let (head, _) = compressed.split_at(5);
        let chunks: Vec<Result<Vec<u8>, PipelineError>> =
            vec![Ok(head.to_vec()), Err(PipelineError::read("connection reset"))];

        let result = collect(gunzip(stream::iter(chunks).boxed())).await;
        assert!(matches!(result, Err(PipelineError::ReadError(_))));
    }
}
