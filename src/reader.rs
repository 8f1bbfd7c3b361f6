use bstr::ByteVec;
use delimited_core::{ScanRowResult, Scanner};

use crate::dialect::Dialect;
use crate::encoding::{Encoding, Utf16LeDecoder};
use crate::error::{Error, Result};

impl Dialect {
    /// Parses a complete input into rows of fields.
    ///
    /// The input is raw bytes in the dialect's encoding; `&str` works
    /// directly for the identity encoding. When header skipping is
    /// enabled (the default) the first row is discarded.
    ///
    /// # Example
    ///
    /// ```
    /// let dialect = delimited::Dialect::builder().build().unwrap();
    /// let rows = dialect.parse("name,year\njohn,1986\n").unwrap();
    /// assert_eq!(rows, vec![vec!["john".to_string(), "1986".to_string()]]);
    /// ```
    pub fn parse<B: AsRef<[u8]>>(&self, input: B) -> Result<Vec<Vec<String>>> {
        self.parse_chunks(std::iter::once(input))
    }

    /// Parses a finite sequence of input chunks into rows of fields.
    ///
    /// Chunks may split the input at any byte position — in the middle
    /// of a field, a quoted body, a CRLF pair or even a multi-byte
    /// encoded character — and the result is identical to parsing the
    /// concatenation whole.
    pub fn parse_chunks<I>(&self, chunks: I) -> Result<Vec<Vec<String>>>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        self.rows(chunks).collect()
    }

    /// Lazily parses a stream of input chunks.
    ///
    /// Returns a pull based iterator producing one row per step, in
    /// input order, consumed at most once. The iterator is fused after
    /// the end of input or the first error; dropping it early is always
    /// safe and releases all carried state.
    pub fn rows<I>(&self, chunks: I) -> Rows<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        Rows {
            scanner: self.scanner(),
            decoder: match self.encoding() {
                Encoding::Utf8 => None,
                Encoding::Utf16Le => Some(Utf16LeDecoder::new()),
            },
            chunks: chunks.into_iter(),
            buf: Vec::new(),
            pos: 0,
            eof: false,
            done: false,
            skip: self.skip_headers(),
        }
    }
}

/// A lazy iterator over parsed rows.
///
/// Created by [`Dialect::rows`]. Pulls source chunks on demand, runs
/// them through the dialect's encoding and feeds them to the scanner;
/// only the minimal carry-over for a row straddling a chunk boundary is
/// buffered.
#[derive(Debug)]
pub struct Rows<I> {
    scanner: Scanner,
    decoder: Option<Utf16LeDecoder>,
    chunks: I,
    /// Decoded text not yet consumed by the scanner.
    buf: Vec<u8>,
    pos: usize,
    eof: bool,
    done: bool,
    skip: bool,
}

impl<I> Rows<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    /// Replaces the spent buffer with the next non-empty decoded chunk,
    /// or marks end of stream. An empty slice is the scanner's
    /// end-of-input signal, so empty source chunks are withheld here.
    fn refill(&mut self) {
        self.buf.clear();
        self.pos = 0;
        while !self.eof && self.buf.is_empty() {
            match self.chunks.next() {
                Some(chunk) => {
                    let chunk = chunk.as_ref();
                    if chunk.is_empty() {
                        continue;
                    }
                    match self.decoder {
                        None => self.buf.extend_from_slice(chunk),
                        Some(ref mut decoder) => {
                            let mut text = String::new();
                            decoder.decode(chunk, &mut text);
                            self.buf.extend_from_slice(text.as_bytes());
                        }
                    }
                }
                None => {
                    self.eof = true;
                    if let Some(ref mut decoder) = self.decoder {
                        let mut text = String::new();
                        decoder.finish(&mut text);
                        self.buf.extend_from_slice(text.as_bytes());
                    }
                }
            }
        }
    }
}

impl<I> Iterator for Rows<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Result<Vec<String>>> {
        if self.done {
            return None;
        }
        loop {
            if self.pos >= self.buf.len() && !self.eof {
                self.refill();
            }
            let input: &[u8] = if self.pos < self.buf.len() {
                &self.buf[self.pos..]
            } else {
                &[]
            };
            match self.scanner.scan_row(input) {
                Ok((ScanRowResult::Row(fields), n)) => {
                    self.pos += n;
                    let row = fields
                        .into_iter()
                        .map(|field| field.into_string_lossy())
                        .collect();
                    if self.skip {
                        self.skip = false;
                        continue;
                    }
                    return Some(Ok(row));
                }
                Ok((ScanRowResult::InputEmpty, n)) => {
                    self.pos += n;
                }
                Ok((ScanRowResult::End, _)) => {
                    self.done = true;
                    return None;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(Error::from(err)));
                }
            }
        }
    }
}
