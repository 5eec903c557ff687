pub const DATA_PREFIX: &str = "data:";
pub const DONE_SENTINEL: &str = "[DONE]";
const BLOCK_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Delta(String),
    Done,
}

/// Incremental UTF-8 decoder that holds back a multi-byte sequence cut off
/// at the end of a chunk until the rest of it arrives.
#[derive(Debug, Default)]
struct Utf8Accumulator {
    pending: Vec<u8>,
}

impl Utf8Accumulator {
    fn decode_into(&mut self, chunk: &[u8], out: &mut String) {
        self.pending.extend_from_slice(chunk);

        let mut consumed = 0;
        loop {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(text) => {
                    out.push_str(text);
                    consumed = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid = consumed + err.valid_up_to();
                    // valid_up_to guarantees this range is well-formed.
                    out.push_str(&String::from_utf8_lossy(&self.pending[consumed..valid]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid + len;
                        }
                        None => {
                            consumed = valid;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
    }
}

/// Turns an arbitrarily chunked `text/event-stream` body into text deltas.
///
/// Blocks are only split out of the accumulated buffer, so a block, its
/// `data:` prefix, the separator or a multi-byte character may be cut at any
/// byte boundary. After the `[DONE]` sentinel every further chunk is ignored.
#[derive(Debug, Default)]
pub struct EventFrameDecoder {
    utf8: Utf8Accumulator,
    buffer: String,
    finished: bool,
}

impl EventFrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }

        self.utf8.decode_into(chunk, &mut self.buffer);

        while let Some(end) = self.buffer.find(BLOCK_SEPARATOR) {
            let block: String = self.buffer.drain(..end + BLOCK_SEPARATOR.len()).collect();
            let block = &block[..end];

            let Some(payload) = block_payload(block) else {
                tracing::trace!(block, "Ignoring event block without data line");
                continue;
            };

            if payload == DONE_SENTINEL {
                frames.push(Frame::Done);
                self.finish();
                break;
            }

            frames.push(Frame::Delta(payload.to_string()));
        }

        frames
    }

    /// Ends the stream. A trailing partial block is dropped, not flushed.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            tracing::trace!(len = self.buffer.len(), "Dropping incomplete trailing block");
        }
        self.finished = true;
        self.buffer.clear();
        self.utf8.pending.clear();
    }
}

fn block_payload(block: &str) -> Option<&str> {
    block
        .split('\n')
        .find_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(str::trim)
}
