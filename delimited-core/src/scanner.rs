use std::error::Error as StdError;
use std::fmt;
use std::mem;

use memchr::{memchr, memchr2, memchr3};

/// Number of trailing consumed bytes retained for error diagnostics.
const EXCERPT_LEN: usize = 64;

/// A record terminator.
///
/// The default is `Any(b'\n')`. When LF is the configured terminator, a
/// carriage return immediately preceding it is folded into the row
/// boundary, so CRLF data parses the same as LF data. A lone `\r` that is
/// not followed by `\n` stays literal field content.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Terminator {
    /// Reads `\r`, `\n` or `\r\n` as a single record terminator and
    /// writes `\r\n`.
    Crlf,
    /// The byte given terminates a record.
    Any(u8),
}

impl Terminator {
    fn is_crlf(&self) -> bool {
        match *self {
            Terminator::Crlf => true,
            Terminator::Any(_) => false,
        }
    }
}

impl Default for Terminator {
    fn default() -> Terminator {
        Terminator::Any(b'\n')
    }
}

impl PartialEq<u8> for Terminator {
    #[inline]
    fn eq(&self, &other: &u8) -> bool {
        match *self {
            Terminator::Crlf => other == b'\r' || other == b'\n',
            Terminator::Any(b) => other == b,
        }
    }
}

/// An error produced while scanning malformed quoted fields.
///
/// These are the only two ways a scan can fail. Both are fatal to the
/// scan that produced them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScanError {
    /// A quote inside a quoted field was followed by a byte that is
    /// neither another quote, a separator, a record terminator nor the
    /// end of input.
    UnexpectedEscape {
        /// The configured quote byte.
        escape: u8,
        /// The offending byte that followed it.
        got: u8,
        /// Trailing excerpt of consumed input, ending at the offending
        /// byte.
        excerpt: Vec<u8>,
    },
    /// The input ended while a quoted field was still open.
    UnterminatedQuote {
        /// Trailing excerpt of consumed input.
        excerpt: Vec<u8>,
    },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ScanError::UnexpectedEscape { got, ref excerpt, .. } => write!(
                f,
                "unexpected escape character '{}' in \"{}\"",
                got as char,
                String::from_utf8_lossy(excerpt),
            ),
            ScanError::UnterminatedQuote { ref excerpt } => write!(
                f,
                "expected closing quote for a quoted field, but reached \
                 the end of input near \"{}\"",
                String::from_utf8_lossy(excerpt),
            ),
        }
    }
}

impl StdError for ScanError {}

/// The result of scanning at most one row.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScanRowResult {
    /// The input given was exhausted before the end of a row was found.
    ///
    /// Feed the next chunk, or an empty slice to signal the end of
    /// input.
    InputEmpty,
    /// A complete row of unescaped fields.
    Row(Vec<Vec<u8>>),
    /// All rows have been scanned.
    ///
    /// This is only returned when an empty input slice is given.
    End,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    /// Before the first byte of a row.
    StartRecord,
    /// Just after a separator.
    StartField,
    /// Inside an unquoted field.
    InField,
    /// Inside a quoted field body.
    InQuoted,
    /// Saw a quote byte while inside a quoted field body. The next byte
    /// decides between a doubled quote, the end of the field and a
    /// malformed escape.
    QuoteInQuoted,
    /// Saw `\r` after a closing quote while LF is the terminator.
    QuoteCr,
    /// A row ended on `\r` in `Crlf` mode; eat one following `\n`.
    CrlfSwallow,
}

/// Builds a scanner with various configuration knobs.
#[derive(Clone, Debug)]
pub struct ScannerBuilder {
    scanner: Scanner,
}

impl ScannerBuilder {
    /// Create a new builder.
    pub fn new() -> ScannerBuilder {
        ScannerBuilder::default()
    }

    /// Build a scanner from this configuration.
    pub fn build(&self) -> Scanner {
        self.scanner.clone()
    }

    /// Use a single field separator.
    ///
    /// The default is `b','`.
    pub fn separator(&mut self, sep: u8) -> &mut ScannerBuilder {
        self.scanner.seps = vec![sep];
        self
    }

    /// Use a set of interchangeable field separators.
    ///
    /// Every byte in the set splits fields; a single row may mix them
    /// and the scanner does not record which one matched.
    pub fn separators(&mut self, seps: &[u8]) -> &mut ScannerBuilder {
        self.scanner.seps = seps.to_vec();
        self
    }

    /// The quote byte. The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut ScannerBuilder {
        self.scanner.quote = quote;
        self
    }

    /// The record terminator. The default is `Terminator::Any(b'\n')`.
    pub fn terminator(&mut self, term: Terminator) -> &mut ScannerBuilder {
        self.scanner.term = term;
        self
    }
}

impl Default for ScannerBuilder {
    fn default() -> ScannerBuilder {
        ScannerBuilder { scanner: Scanner::default() }
    }
}

/// A pull based row scanner.
///
/// The scanner parses delimited text using a finite state machine.
/// Callers feed chunks of input to `scan_row` and get back complete rows
/// of unescaped fields. All transient state, including a partially
/// accumulated field or row straddling a chunk boundary, lives inside the
/// scanner, so splitting the input at any byte position produces exactly
/// the same rows as scanning it whole.
///
/// # Termination
///
/// An empty input slice signals that there is no data left. The caller
/// should keep calling `scan_row` with an empty slice until
/// `ScanRowResult::End` is returned; a final row without a trailing
/// terminator is emitted on the way out.
///
/// # Errors
///
/// Unlike lenient CSV readers, this scanner rejects malformed quoting:
/// see `ScanError` for the two failure kinds. An error is fatal to the
/// scan; call `reset` to reuse the scanner afterwards.
#[derive(Clone, Debug)]
pub struct Scanner {
    seps: Vec<u8>,
    quote: u8,
    term: Terminator,
    state: State,
    field: Vec<u8>,
    /// Whether the field currently being accumulated was quoted. Quoted
    /// content is verbatim, so a trailing `\r` in it never folds into an
    /// LF row boundary.
    field_quoted: bool,
    row: Vec<Vec<u8>>,
    recent: Vec<u8>,
}

impl Default for Scanner {
    fn default() -> Scanner {
        Scanner {
            seps: vec![b','],
            quote: b'"',
            term: Terminator::default(),
            state: State::StartRecord,
            field: Vec::new(),
            field_quoted: false,
            row: Vec::new(),
            recent: Vec::new(),
        }
    }
}

impl Scanner {
    /// Create a new scanner with the default configuration.
    pub fn new() -> Scanner {
        ScannerBuilder::new().build()
    }

    /// Reset the scanner such that it behaves as if it had never been
    /// used.
    pub fn reset(&mut self) {
        self.state = State::StartRecord;
        self.field.clear();
        self.field_quoted = false;
        self.row.clear();
        self.recent.clear();
    }

    /// Scan at most one row out of `input`.
    ///
    /// Returns what happened and the number of input bytes consumed. The
    /// caller should call again with the unconsumed remainder of `input`
    /// (after a `Row`), with the next chunk (after `InputEmpty`), or
    /// with an empty slice to drain the final row and reach `End`.
    pub fn scan_row(
        &mut self,
        input: &[u8],
    ) -> Result<(ScanRowResult, usize), ScanError> {
        if input.is_empty() {
            return self.finish();
        }
        let mut i = 0;
        while i < input.len() {
            let b = input[i];
            match self.state {
                State::CrlfSwallow => {
                    self.state = State::StartRecord;
                    if b == b'\n' {
                        i += 1;
                    }
                }
                State::StartRecord | State::StartField
                    if b == self.quote =>
                {
                    self.state = State::InQuoted;
                    self.field_quoted = true;
                    i += 1;
                }
                State::StartRecord | State::StartField | State::InField => {
                    if self.seps.contains(&b) {
                        self.end_field();
                        self.state = State::StartField;
                        i += 1;
                    } else if self.term == b {
                        i += 1;
                        return Ok((self.end_row_at(b, input, i), i));
                    } else {
                        self.state = State::InField;
                        let n = self.unquoted_run(&input[i..]);
                        self.field.extend_from_slice(&input[i..i + n]);
                        i += n;
                    }
                }
                State::InQuoted => match memchr(self.quote, &input[i..]) {
                    Some(n) => {
                        self.field.extend_from_slice(&input[i..i + n]);
                        i += n + 1;
                        self.state = State::QuoteInQuoted;
                    }
                    None => {
                        self.field.extend_from_slice(&input[i..]);
                        i = input.len();
                    }
                },
                State::QuoteInQuoted => {
                    if b == self.quote {
                        self.field.push(self.quote);
                        self.state = State::InQuoted;
                        i += 1;
                    } else if self.seps.contains(&b) {
                        self.end_field();
                        self.state = State::StartField;
                        i += 1;
                    } else if self.term == b {
                        i += 1;
                        return Ok((self.end_row_at(b, input, i), i));
                    } else if b == b'\r'
                        && self.term == Terminator::Any(b'\n')
                    {
                        self.state = State::QuoteCr;
                        i += 1;
                    } else {
                        return Err(ScanError::UnexpectedEscape {
                            escape: self.quote,
                            got: b,
                            excerpt: self.excerpt_through(input, i + 1),
                        });
                    }
                }
                State::QuoteCr => {
                    if self.term == b {
                        i += 1;
                        return Ok((self.end_row_at(b, input, i), i));
                    } else {
                        return Err(ScanError::UnexpectedEscape {
                            escape: self.quote,
                            got: b'\r',
                            excerpt: self.excerpt_through(input, i),
                        });
                    }
                }
            }
        }
        self.note_consumed(input, i);
        Ok((ScanRowResult::InputEmpty, i))
    }

    /// End-of-input transition. Flushes a final row without a trailing
    /// terminator, then reports `End`.
    fn finish(&mut self) -> Result<(ScanRowResult, usize), ScanError> {
        match self.state {
            State::StartRecord | State::CrlfSwallow => {
                self.state = State::StartRecord;
                Ok((ScanRowResult::End, 0))
            }
            State::StartField
            | State::InField
            | State::QuoteInQuoted => {
                self.state = State::StartRecord;
                self.end_field();
                let row = mem::replace(&mut self.row, Vec::new());
                Ok((ScanRowResult::Row(row), 0))
            }
            State::InQuoted => Err(ScanError::UnterminatedQuote {
                excerpt: self.recent.clone(),
            }),
            State::QuoteCr => Err(ScanError::UnexpectedEscape {
                escape: self.quote,
                got: b'\r',
                excerpt: self.recent.clone(),
            }),
        }
    }

    /// Closes the current field and row after consuming the terminator
    /// byte `b` at position `i`. Strips a `\r` folded into an LF
    /// boundary and arranges for the `\n` of a CRLF pair to be eaten in
    /// `Crlf` mode.
    fn end_row_at(&mut self, b: u8, input: &[u8], i: usize) -> ScanRowResult {
        self.state = if self.term.is_crlf() && b == b'\r' {
            State::CrlfSwallow
        } else {
            State::StartRecord
        };
        if b == b'\n'
            && !self.field_quoted
            && self.field.last() == Some(&b'\r')
        {
            self.field.pop();
        }
        self.end_field();
        self.note_consumed(input, i);
        ScanRowResult::Row(mem::replace(&mut self.row, Vec::new()))
    }

    fn end_field(&mut self) {
        let field = mem::replace(&mut self.field, Vec::new());
        self.field_quoted = false;
        self.row.push(field);
    }

    /// Length of the prefix of `rest` free of separators and terminator
    /// bytes. The byte at offset 0 is already known to be plain content,
    /// so this always makes progress.
    fn unquoted_run(&self, rest: &[u8]) -> usize {
        let found = match (self.seps.as_slice(), self.term) {
            (&[s], Terminator::Any(t)) => memchr2(s, t, rest),
            (&[s], Terminator::Crlf) => memchr3(s, b'\r', b'\n', rest),
            (&[s1, s2], Terminator::Any(t)) => memchr3(s1, s2, t, rest),
            _ => rest
                .iter()
                .position(|&b| self.seps.contains(&b) || self.term == b),
        };
        found.unwrap_or(rest.len())
    }

    fn note_consumed(&mut self, input: &[u8], n: usize) {
        if n >= EXCERPT_LEN {
            self.recent.clear();
            self.recent.extend_from_slice(&input[n - EXCERPT_LEN..n]);
        } else {
            self.recent.extend_from_slice(&input[..n]);
            if self.recent.len() > EXCERPT_LEN {
                let cut = self.recent.len() - EXCERPT_LEN;
                self.recent.drain(..cut);
            }
        }
    }

    fn excerpt_through(&self, input: &[u8], n: usize) -> Vec<u8> {
        let mut excerpt = self.recent.clone();
        excerpt.extend_from_slice(&input[..n]);
        if excerpt.len() > EXCERPT_LEN {
            let cut = excerpt.len() - EXCERPT_LEN;
            excerpt.drain(..cut);
        }
        excerpt
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ScanError, ScanRowResult, Scanner, ScannerBuilder, Terminator,
    };

    type Csv = Vec<Vec<String>>;

    fn utf8_row(row: Vec<Vec<u8>>) -> Vec<String> {
        row.into_iter().map(|f| String::from_utf8(f).unwrap()).collect()
    }

    fn scan_all(
        scanner: &mut Scanner,
        mut data: &[u8],
    ) -> Result<Csv, ScanError> {
        let mut rows = Csv::new();
        loop {
            let (res, n) = scanner.scan_row(data)?;
            data = &data[n..];
            match res {
                ScanRowResult::Row(row) => rows.push(utf8_row(row)),
                ScanRowResult::InputEmpty => assert!(data.is_empty()),
                ScanRowResult::End => return Ok(rows),
            }
        }
    }

    fn scan_split(
        scanner: &mut Scanner,
        data: &[u8],
        at: usize,
    ) -> Result<Csv, ScanError> {
        let mut rows = Csv::new();
        // An empty slice is the end-of-input signal, so an empty piece
        // must be withheld from the scanner rather than fed through.
        for &piece in [&data[..at], &data[at..]].iter() {
            if piece.is_empty() {
                continue;
            }
            let mut chunk = piece;
            loop {
                let (res, n) = scanner.scan_row(chunk)?;
                chunk = &chunk[n..];
                match res {
                    ScanRowResult::Row(row) => rows.push(utf8_row(row)),
                    ScanRowResult::InputEmpty => break,
                    ScanRowResult::End => {
                        panic!("End before end of input")
                    }
                }
            }
        }
        loop {
            match scanner.scan_row(&[])? {
                (ScanRowResult::Row(row), _) => rows.push(utf8_row(row)),
                (ScanRowResult::End, _) => return Ok(rows),
                (res, _) => panic!("unexpected result: {:?}", res),
            }
        }
    }

    macro_rules! csv {
        ($([$($field:expr),*]),* $(,)*) => {{
            #[allow(unused_mut)]
            let mut rows: Csv = vec![];
            $(rows.push(vec![$($field.to_string()),*]);)*
            rows
        }};
    }

    macro_rules! parses_to {
        ($name:ident, $data:expr, $expected:expr) => {
            parses_to!($name, $data, $expected, |_b: &mut ScannerBuilder| {});
        };
        ($name:ident, $data:expr, $expected:expr, $config:expr) => {
            #[test]
            fn $name() {
                let mut builder = ScannerBuilder::new();
                $config(&mut builder);
                let mut scanner = builder.build();
                let got =
                    scan_all(&mut scanner, $data.as_bytes()).unwrap();
                assert_eq!($expected, got, "whole input");

                // The same input must parse identically across every
                // possible chunk boundary.
                let data = $data.as_bytes();
                for at in 0..=data.len() {
                    let mut builder = ScannerBuilder::new();
                    $config(&mut builder);
                    let mut scanner = builder.build();
                    let got =
                        scan_split(&mut scanner, data, at).unwrap();
                    assert_eq!($expected, got, "split at {}", at);
                }
            }
        };
    }

    macro_rules! fails_parse {
        ($name:ident, $data:expr, $pat:pat) => {
            #[test]
            fn $name() {
                let mut scanner = Scanner::new();
                let err =
                    scan_all(&mut scanner, $data.as_bytes()).unwrap_err();
                match err {
                    $pat => {}
                    err => panic!("unexpected error: {:?}", err),
                }

                let data = $data.as_bytes();
                for at in 0..=data.len() {
                    let mut scanner = Scanner::new();
                    let err =
                        scan_split(&mut scanner, data, at).unwrap_err();
                    match err {
                        $pat => {}
                        err => panic!(
                            "unexpected error at split {}: {:?}",
                            at, err
                        ),
                    }
                }
            }
        };
    }

    parses_to!(one_row_one_field, "a", csv![["a"]]);
    parses_to!(one_row_many_fields, "a,b,c", csv![["a", "b", "c"]]);
    parses_to!(one_row_trailing_comma, "a,b,", csv![["a", "b", ""]]);
    parses_to!(one_row_one_field_lf, "a\n", csv![["a"]]);
    parses_to!(one_row_many_fields_lf, "a,b,c\n", csv![["a", "b", "c"]]);
    parses_to!(one_row_trailing_comma_lf, "a,b,\n", csv![["a", "b", ""]]);
    parses_to!(one_row_one_field_crlf, "a\r\n", csv![["a"]]);
    parses_to!(
        one_row_many_fields_crlf,
        "a,b,c\r\n",
        csv![["a", "b", "c"]]
    );

    parses_to!(many_rows_one_field, "a\nb", csv![["a"], ["b"]]);
    parses_to!(
        many_rows_many_fields,
        "a,b,c\nx,y,z",
        csv![["a", "b", "c"], ["x", "y", "z"]]
    );
    parses_to!(
        many_rows_many_fields_crlf,
        "a,b,c\r\nx,y,z\r\n",
        csv![["a", "b", "c"], ["x", "y", "z"]]
    );

    parses_to!(empty, "", csv![]);
    parses_to!(blank_line, "\n", csv![[""]]);
    parses_to!(blank_line_crlf, "\r\n", csv![[""]]);
    parses_to!(
        blank_lines_interspersed,
        "name\n\njohn\n\n",
        csv![["name"], [""], ["john"], [""]]
    );

    // A lone `\r` that is not part of a CRLF pair is content.
    parses_to!(bare_cr_is_content, "a\rb\nc", csv![["a\rb"], ["c"]]);
    parses_to!(trailing_bare_cr, "a\r", csv![["a\r"]]);

    // Whitespace is never trimmed.
    parses_to!(whitespace_kept, " a , b \n", csv![[" a ", " b "]]);

    parses_to!(quote_empty, "\"\"", csv![[""]]);
    parses_to!(quote_plain, "\"abc\"\n", csv![["abc"]]);
    parses_to!(quote_embedded_sep, "\"a,b\",c\n", csv![["a,b", "c"]]);
    parses_to!(
        quote_embedded_newline,
        "\"a\nb\",c\n",
        csv![["a\nb", "c"]]
    );
    parses_to!(quote_doubled, "\"a\"\"b\"\n", csv![["a\"b"]]);
    parses_to!(quote_doubled_only, "\"\"\"\"", csv![["\""]]);
    parses_to!(quote_then_eof, "a,\"b\"", csv![["a", "b"]]);
    parses_to!(quote_close_crlf, "\"a\"\r\nb\n", csv![["a"], ["b"]]);

    // A quote that is not the first character of a field is content.
    parses_to!(quote_mid_field, "a\"b,c\n", csv![["a\"b", "c"]]);
    parses_to!(
        quote_outer_space,
        "  \"a\"  ",
        csv![["  \"a\"  "]]
    );

    parses_to!(
        sep_change,
        "a;b;c\n",
        csv![["a", "b", "c"]],
        |b: &mut ScannerBuilder| {
            b.separator(b';');
        }
    );
    parses_to!(
        multi_sep,
        "name,last\tyear\njohn;doe,1986\n",
        csv![["name", "last", "year"], ["john", "doe", "1986"]],
        |b: &mut ScannerBuilder| {
            b.separators(&[b',', b';', b'\t']);
        }
    );
    parses_to!(
        multi_sep_quoted,
        "\"a;b\";\"c,d\",e\n",
        csv![["a;b", "c,d", "e"]],
        |b: &mut ScannerBuilder| {
            b.separators(&[b',', b';']);
        }
    );

    // Unlike lenient readers, a leading terminator is a blank row here.
    parses_to!(
        term_weird,
        "za,bzc,dz",
        csv![[""], ["a", "b"], ["c", "d"]],
        |b: &mut ScannerBuilder| {
            b.terminator(Terminator::Any(b'z'));
        }
    );
    parses_to!(
        term_crlf_mixed,
        "a,b\r\nc,d\ne,f\r",
        csv![["a", "b"], ["c", "d"], ["e", "f"]],
        |b: &mut ScannerBuilder| {
            b.terminator(Terminator::Crlf);
        }
    );

    parses_to!(
        quote_change,
        "za,bz,c\n",
        csv![["a,b", "c"]],
        |b: &mut ScannerBuilder| {
            b.quote(b'z');
        }
    );

    fails_parse!(
        bare_escape_in_field,
        "john,\"d\"e,1986\n",
        ScanError::UnexpectedEscape { got: b'e', .. }
    );
    fails_parse!(
        unterminated_quote,
        "john,doe,\"1986\n",
        ScanError::UnterminatedQuote { .. }
    );
    fails_parse!(
        unterminated_open_quote_only,
        "\"",
        ScanError::UnterminatedQuote { .. }
    );
    fails_parse!(
        quote_cr_then_junk,
        "\"a\"\rx",
        ScanError::UnexpectedEscape { got: b'\r', .. }
    );

    #[test]
    fn error_excerpt_ends_at_offender() {
        let mut scanner = Scanner::new();
        let err =
            scan_all(&mut scanner, b"john,\"d\"e,1986\n").unwrap_err();
        match err {
            ScanError::UnexpectedEscape { escape, got, excerpt } => {
                assert_eq!(b'"', escape);
                assert_eq!(b'e', got);
                assert_eq!(b"john,\"d\"e".to_vec(), excerpt);
            }
            err => panic!("unexpected error: {:?}", err),
        }
    }

    #[test]
    fn byte_at_a_time() {
        let data = b"a,\"b\"\"x\",c\r\nd,e\n";
        let mut scanner = Scanner::new();
        let mut rows = Csv::new();
        for i in 0..data.len() {
            let mut chunk = &data[i..i + 1];
            loop {
                let (res, n) = scanner.scan_row(chunk).unwrap();
                chunk = &chunk[n..];
                match res {
                    ScanRowResult::Row(row) => rows.push(
                        row.into_iter()
                            .map(|f| String::from_utf8(f).unwrap())
                            .collect(),
                    ),
                    ScanRowResult::InputEmpty => break,
                    ScanRowResult::End => unreachable!(),
                }
            }
        }
        loop {
            match scanner.scan_row(&[]).unwrap() {
                (ScanRowResult::Row(row), _) => rows.push(
                    row.into_iter()
                        .map(|f| String::from_utf8(f).unwrap())
                        .collect(),
                ),
                (ScanRowResult::End, _) => break,
                (res, _) => panic!("unexpected result: {:?}", res),
            }
        }
        assert_eq!(csv![["a", "b\"x", "c"], ["d", "e"]], rows);
    }

    #[test]
    fn reset_after_error() {
        let mut scanner = Scanner::new();
        assert!(scan_all(&mut scanner, b"\"open").is_err());
        scanner.reset();
        assert_eq!(
            csv![["a", "b"]],
            scan_all(&mut scanner, b"a,b\n").unwrap()
        );
    }

    #[test]
    fn utf8_content_passes_through() {
        let mut scanner = Scanner::new();
        assert_eq!(
            csv![["héllo", "wörld"], ["日本", "語"]],
            scan_all(&mut scanner, "héllo,wörld\n日本,語\n".as_bytes())
                .unwrap()
        );
    }
}
