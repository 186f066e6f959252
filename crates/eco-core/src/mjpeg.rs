//! Incremental parser for `multipart/x-mixed-replace` camera streams.
//!
//! The backend's live feed writes parts of the form
//! `--frame\r\nContent-Type: image/jpeg\r\n\r\n<jpeg>\r\n` back to back,
//! usually without a `Content-Length` header, so a frame ends where the next
//! boundary starts.

use tracing::warn;

/// Boundary used by the backend's `/video_feed` endpoint.
pub const FEED_BOUNDARY: &str = "frame";

/// Upper bound on bytes buffered while waiting for a complete part.
const MAX_BUFFERED: usize = 16 * 1024 * 1024;

const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug)]
pub struct MjpegFrames {
    delimiter: Vec<u8>,
    buffer: Vec<u8>,
}

impl MjpegFrames {
    pub fn new(boundary: &str) -> Self {
        let boundary = boundary.trim_start_matches("--");
        Self {
            delimiter: format!("--{boundary}").into_bytes(),
            buffer: Vec::new(),
        }
    }

    /// Builds a parser from a `Content-Type` header, e.g.
    /// `multipart/x-mixed-replace; boundary=frame`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        content_type
            .split(';')
            .map(str::trim)
            .find_map(|param| param.strip_prefix("boundary="))
            .map(|boundary| boundary.trim_matches('"'))
            .filter(|boundary| !boundary.is_empty())
            .map(Self::new)
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > MAX_BUFFERED {
            warn!("dropping {} buffered feed bytes without a complete frame", self.buffer.len());
            self.buffer.clear();
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Pops the next complete frame body, if one is buffered.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let Some(start) = find(&self.buffer, &self.delimiter) else {
            // Keep only a tail that could still be the start of a delimiter.
            let keep = self.delimiter.len().saturating_sub(1);
            if self.buffer.len() > keep {
                self.buffer.drain(..self.buffer.len() - keep);
            }
            return None;
        };

        let headers_at = start + self.delimiter.len();
        let header_len = find(&self.buffer[headers_at..], HEADER_END)?;
        let body_at = headers_at + header_len + HEADER_END.len();
        let declared_len =
            content_length(&String::from_utf8_lossy(&self.buffer[headers_at..headers_at + header_len]));

        let body_len = match declared_len {
            Some(len) if self.buffer.len() >= body_at + len => len,
            Some(_) => return None,
            None => {
                let mut next = b"\r\n".to_vec();
                next.extend_from_slice(&self.delimiter);
                find(&self.buffer[body_at..], &next)?
            }
        };

        let frame = self.buffer[body_at..body_at + body_len].to_vec();
        self.buffer.drain(..body_at + body_len);
        Some(frame)
    }
}

fn content_length(headers: &str) -> Option<usize> {
    headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
