//! Turning serial bytes into message lines
//!
//! Serial reads return arbitrary chunks: a multi-byte character or a line
//! delimiter may be split across two reads. [`Utf8ChunkDecoder`] holds back
//! incomplete characters and [`LineBreakTransformer`] holds back incomplete
//! lines until the rest arrives.

use simplewebserial_settings::DEFAULT_LINE_DELIMITER;

/// Splits a stream of text chunks into lines
#[derive(Debug, Clone)]
pub struct LineBreakTransformer {
    chunks: String,
    delimiter: String,
}

impl LineBreakTransformer {
    /// Create a transformer splitting on `"\r\n"`
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_LINE_DELIMITER)
    }

    /// Create a transformer splitting on a custom delimiter
    ///
    /// An empty delimiter falls back to `"\r\n"`.
    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        let mut delimiter = delimiter.into();
        if delimiter.is_empty() {
            tracing::warn!("Empty line delimiter, using the default");
            delimiter = DEFAULT_LINE_DELIMITER.to_string();
        }
        Self {
            chunks: String::new(),
            delimiter,
        }
    }

    /// Delimiter in use
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Feed a chunk and return every line completed by it, in order.
    ///
    /// Consecutive delimiters produce empty lines.
    pub fn transform(&mut self, chunk: &str) -> Vec<String> {
        self.chunks.push_str(chunk);
        if !self.chunks.contains(self.delimiter.as_str()) {
            return Vec::new();
        }

        let mut lines: Vec<String> = self
            .chunks
            .split(self.delimiter.as_str())
            .map(str::to_string)
            .collect();
        self.chunks = lines.pop().unwrap_or_default();
        lines
    }

    /// Return the pending partial line, if any
    pub fn flush(&mut self) -> Option<String> {
        if self.chunks.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.chunks))
        }
    }
}

impl Default for LineBreakTransformer {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes UTF-8 text from byte chunks
#[derive(Debug, Clone, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk. Incomplete trailing characters are kept for the
    /// next chunk; invalid bytes become U+FFFD.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Decode whatever is left at the end of the stream
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
