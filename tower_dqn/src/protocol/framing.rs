//! Newline framing over a byte stream.
//!
//! Reads arrive in arbitrary chunks. [`LineFramer`] buffers the trailing
//! partial line of each chunk and completes it with the next one, so a line
//! split across two reads is delivered whole.
//!
//! Blank lines are ignored. A line growing beyond `max_line_len` bytes before
//! its newline arrives is discarded up to that newline and reported once as
//! [`Frame::Oversized`].

/// Output of the framer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete, trimmed, non-empty line.
    Line(String),
    /// A line that exceeded the length limit and was dropped.
    Oversized,
}

/// Reassembles newline-delimited lines from stream chunks.
#[derive(Debug, Clone)]
pub struct LineFramer {
    pending: Vec<u8>,
    max_line_len: usize,
    /// Inside an oversized line; skip until the next newline.
    discarding: bool,
}

impl LineFramer {
    /// Create a framer that drops lines longer than `max_line_len` bytes.
    pub fn new(max_line_len: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_len,
            discarding: false,
        }
    }

    /// Feed one chunk and collect every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let head = &rest[..pos];
            rest = &rest[pos + 1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if self.pending.len() + head.len() > self.max_line_len {
                self.pending.clear();
                frames.push(Frame::Oversized);
                continue;
            }
            self.pending.extend_from_slice(head);
            if let Some(line) = self.take_line() {
                frames.push(Frame::Line(line));
            }
        }

        if !rest.is_empty() && !self.discarding {
            if self.pending.len() + rest.len() > self.max_line_len {
                self.pending.clear();
                self.discarding = true;
                frames.push(Frame::Oversized);
            } else {
                self.pending.extend_from_slice(rest);
            }
        }

        frames
    }

    /// Flush the unterminated tail at end of stream.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.discarding {
            self.discarding = false;
            self.pending.clear();
            return None;
        }
        self.take_line().map(Frame::Line)
    }

    /// Bytes buffered for the current partial line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take_line(&mut self) -> Option<String> {
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!line.is_empty()).then_some(line)
    }
}
