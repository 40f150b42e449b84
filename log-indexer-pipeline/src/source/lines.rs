//! Splitting a byte stream into text lines.

use std::collections::VecDeque;

use futures::stream::{self, BoxStream, StreamExt};

use crate::errors::PipelineError;
use crate::source::storage::ByteStream;

/// Lazily produced lines of a decompressed object.
pub type LineStream = BoxStream<'static, Result<String, PipelineError>>;

/// Accumulates bytes and hands out complete lines.
///
/// A line may span any number of pushed chunks. Terminators (`\n`, with an
/// optional preceding `\r`) are stripped, and empty lines are dropped.
#[derive(Debug, Default)]
pub struct LineSplitter {
    partial: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk, returning every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.partial.extend_from_slice(&rest[..pos]);
            if let Some(line) = Self::take_line(&mut self.partial) {
                lines.push(line);
            }
            rest = &rest[pos + 1..];
        }

        self.partial.extend_from_slice(rest);
        lines
    }

    /// Flush the unterminated tail, if any.
    pub fn finish(mut self) -> Option<String> {
        Self::take_line(&mut self.partial)
    }

    fn take_line(buf: &mut Vec<u8>) -> Option<String> {
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        if buf.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(buf).into_owned();
        buf.clear();
        Some(line)
    }
}

struct SplitState {
    input: ByteStream,
    splitter: Option<LineSplitter>,
    ready: VecDeque<String>,
}

/// Split a byte stream into a stream of lines.
///
/// Order is preserved. After an upstream error the error is yielded once
/// and the stream ends.
pub fn split_lines(input: ByteStream) -> LineStream {
    let state = SplitState {
        input,
        splitter: Some(LineSplitter::new()),
        ready: VecDeque::new(),
    };

    stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Ok(Some((line, state)));
            }

            let Some(splitter) = state.splitter.as_mut() else {
                return Ok(None);
            };

            match state.input.next().await {
                Some(Ok(chunk)) => state.ready.extend(splitter.push(&chunk)),
                Some(Err(e)) => return Err(e),
                None => {
                    if let Some(tail) = state.splitter.take().and_then(LineSplitter::finish) {
                        state.ready.push_back(tail);
                    }
                }
            }
        }
    })
    .boxed()
}
