/// NDJSON frame reassembly for the sensor's notification stream.
///
/// The sensor chunks each message into MTU-sized BLE notifications and
/// pads the final chunk with newlines, so chunk boundaries carry no meaning.
/// [`FrameReassembler`] accumulates bytes until it sees `\n` and yields
/// each complete line.

/// Message delimiter
pub const DELIMITER: u8 = b'\n';

/// Accumulates raw transport chunks and yields complete lines.
///
/// One reassembler per connection. Unbounded by default; a host can cap
/// the retained fragment with [`FrameReassembler::with_max_buffer`].
#[derive(Debug, Default)]
pub struct FrameReassembler {
    buf: Vec<u8>,
    max_buffer_len: Option<usize>,
}

impl FrameReassembler {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            max_buffer_len: None,
        }
    }

    /// Cap the retained partial line at `max` bytes. A fragment that grows
    /// past the cap without a delimiter is discarded.
    pub fn with_max_buffer(max: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_buffer_len: Some(max),
        }
    }

    /// Append a chunk and return an iterator over the lines it completes.
    ///
    /// Lines are yielded without the delimiter and decoded as UTF-8
    /// (invalid sequences replaced). The iterator is lazy: lines it does not
    /// reach stay buffered and are yielded by the next `feed`.
    pub fn feed(&mut self, chunk: &[u8]) -> Frames<'_> {
        self.buf.extend_from_slice(chunk);
        self.enforce_bound();
        Frames { reassembler: self }
    }

    /// Bytes retained, including completed lines not yet yielded.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial line, e.g. after the transport reconnects.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    fn next_line(&mut self) -> Option<String> {
        match self.buf.iter().position(|&b| b == DELIMITER) {
            Some(pos) => {
                let line = String::from_utf8_lossy(&self.buf[..pos]).into_owned();
                self.buf.drain(..=pos);
                Some(line)
            }
            None => None,
        }
    }

    /// Discard the bytes after the last delimiter if they exceed the cap.
    /// Completed lines are kept.
    fn enforce_bound(&mut self) {
        let Some(max) = self.max_buffer_len else {
            return;
        };
        let tail_start = self
            .buf
            .iter()
            .rposition(|&b| b == DELIMITER)
            .map_or(0, |pos| pos + 1);
        let tail = self.buf.len() - tail_start;
        if tail > max {
            log::warn!(
                "Frame buffer overflow ({} bytes > {}), discarding partial line",
                tail,
                max
            );
            self.buf.truncate(tail_start);
        }
    }
}

/// Lines completed by one [`FrameReassembler::feed`] call.
pub struct Frames<'a> {
    reassembler: &'a mut FrameReassembler,
}

impl Iterator for Frames<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.reassembler.next_line()
    }
}
