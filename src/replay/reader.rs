//! Chunked line reader for kernel logs.

use std::io::{self, BufRead};

use crate::common::config::MAX_LINE_LEN;

/// Splits a log into numbered lines of bounded length.
///
/// A line longer than `MAX_LINE_LEN - 1` bytes is handed out in several
/// chunks, and every chunk gets a line number of its own. Line terminators
/// (`\n` or `\r\n`) are stripped and invalid UTF-8 is replaced.
///
/// # Example
/// ```
/// use cmapool::replay::LineReader;
///
/// let log = "first\nsecond\n";
/// let lines: Vec<_> = LineReader::new(log.as_bytes())
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// assert_eq!(lines, vec![(1, "first".to_string()), (2, "second".to_string())]);
/// ```
pub struct LineReader<R> {
    inner: R,
    line_num: usize,
}

impl<R: BufRead> LineReader<R> {
    /// Wrap a buffered reader. Numbering starts at 1.
    pub fn new(inner: R) -> Self {
        Self { inner, line_num: 0 }
    }

    /// Number of the chunk most recently returned.
    pub fn line_num(&self) -> usize {
        self.line_num
    }

    /// Read up to `MAX_LINE_LEN - 1` bytes, stopping after a newline.
    fn read_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        let limit = MAX_LINE_LEN - 1;
        let mut chunk = Vec::new();

        while chunk.len() < limit {
            let available = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                break;
            }

            let window = &available[..available.len().min(limit - chunk.len())];
            let (take, newline) = match window.iter().position(|&b| b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (window.len(), false),
            };

            chunk.extend_from_slice(&window[..take]);
            self.inner.consume(take);

            if newline {
                break;
            }
        }

        Ok(if chunk.is_empty() { None } else { Some(chunk) })
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = io::Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_chunk() {
            Ok(Some(mut chunk)) => {
                if chunk.last() == Some(&b'\n') {
                    chunk.pop();
                    if chunk.last() == Some(&b'\r') {
                        chunk.pop();
                    }
                }
                self.line_num += 1;
                let text = String::from_utf8_lossy(&chunk).into_owned();
                Some(Ok((self.line_num, text)))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
