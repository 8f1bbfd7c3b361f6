use delimited_core::{
    Escaper, EscaperBuilder, Scanner, ScannerBuilder, Terminator,
};

use crate::encoding::Encoding;
use crate::error::{ConfigError, Error, Result};

/// An immutable description of one CSV variant.
///
/// A dialect bundles the separator set, the quote character, the record
/// terminator, the text encoding and the header-skip flag, and carries
/// the parse and dump entry points bound to that configuration. Build
/// one with [`Dialect::builder`]; configuration problems are rejected
/// there, so a `Dialect` in hand is always valid.
///
/// Dialects are plain immutable values: clone them, share them, and use
/// the same one from any number of independent parse or dump
/// invocations. Each invocation owns its own transient state.
///
/// # Example
///
/// ```
/// let dialect = delimited::Dialect::builder()
///     .separators(&[b',', b';'])
///     .skip_headers(false)
///     .build()
///     .unwrap();
/// let rows = dialect.parse("a;b\nc,d\n").unwrap();
/// assert_eq!(rows, vec![
///     vec!["a".to_string(), "b".to_string()],
///     vec!["c".to_string(), "d".to_string()],
/// ]);
/// ```
#[derive(Clone, Debug)]
pub struct Dialect {
    seps: Vec<u8>,
    quote: u8,
    term: Terminator,
    encoding: Encoding,
    skip_headers: bool,
}

impl Default for Dialect {
    /// The conventional dialect: comma separated, double-quoted, LF
    /// terminated, UTF-8, first row skipped as a header.
    fn default() -> Dialect {
        Dialect {
            seps: vec![b','],
            quote: b'"',
            term: Terminator::default(),
            encoding: Encoding::default(),
            skip_headers: true,
        }
    }
}

impl Dialect {
    /// Returns a builder for configuring a dialect.
    pub fn builder() -> DialectBuilder {
        DialectBuilder::new()
    }

    /// The configured separator characters, in configuration order.
    ///
    /// All of them split fields interchangeably on parse; the first one
    /// joins fields on dump.
    pub fn separators(&self) -> &[u8] {
        &self.seps
    }

    /// The configured quote character.
    pub fn quote(&self) -> u8 {
        self.quote
    }

    /// The configured record terminator.
    pub fn terminator(&self) -> Terminator {
        self.term
    }

    /// The configured text encoding.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Whether the first parsed row is discarded as a header.
    pub fn skip_headers(&self) -> bool {
        self.skip_headers
    }

    /// Returns a copy of this dialect with the header-skip flag
    /// replaced.
    ///
    /// The copy is already validated, so unlike the builder this cannot
    /// fail. Use it to apply one configuration both with and without the
    /// first-row skip.
    pub fn with_skip_headers(&self, yes: bool) -> Dialect {
        Dialect { skip_headers: yes, ..self.clone() }
    }

    /// A fresh scanner bound to this dialect, one per parse invocation.
    pub(crate) fn scanner(&self) -> Scanner {
        ScannerBuilder::new()
            .separators(&self.seps)
            .quote(self.quote)
            .terminator(self.term)
            .build()
    }

    /// A fresh escaper bound to this dialect, one per dump invocation.
    pub(crate) fn escaper(&self) -> Escaper {
        EscaperBuilder::new()
            .separators(&self.seps)
            .quote(self.quote)
            .terminator(self.term)
            .build()
    }
}

/// Builds a dialect, validating the configuration.
///
/// The setters mirror the configuration surface of the dialect;
/// [`build`](DialectBuilder::build) checks that the separator set is
/// non-empty and disjoint from the quote character and that every
/// configured separator, quote and terminator byte is ASCII, failing
/// fast rather than deferring the problem to the first parse.
#[derive(Clone, Debug)]
pub struct DialectBuilder {
    dialect: Dialect,
}

impl DialectBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> DialectBuilder {
        DialectBuilder { dialect: Dialect::default() }
    }

    /// Use a single field separator. The default is `b','`.
    pub fn separator(&mut self, sep: u8) -> &mut DialectBuilder {
        self.dialect.seps = vec![sep];
        self
    }

    /// Use a set of interchangeable field separators.
    ///
    /// Any byte in the set splits fields on parse, and a single row may
    /// mix them; which one matched is not recorded. On dump, rows are
    /// joined with the first separator given here.
    pub fn separators(&mut self, seps: &[u8]) -> &mut DialectBuilder {
        self.dialect.seps = seps.to_vec();
        self
    }

    /// The quote (escape) character. The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut DialectBuilder {
        self.dialect.quote = quote;
        self
    }

    /// The record terminator. The default is `Terminator::Any(b'\n')`,
    /// which also folds a `\r` immediately preceding the `\n` into the
    /// row boundary on parse.
    pub fn terminator(&mut self, term: Terminator) -> &mut DialectBuilder {
        self.dialect.term = term;
        self
    }

    /// The text encoding applied at the codec boundary. The default is
    /// `Encoding::Utf8` (identity).
    pub fn encoding(&mut self, encoding: Encoding) -> &mut DialectBuilder {
        self.dialect.encoding = encoding;
        self
    }

    /// Whether to discard the first parsed row as a header. Enabled by
    /// default.
    pub fn skip_headers(&mut self, yes: bool) -> &mut DialectBuilder {
        self.dialect.skip_headers = yes;
        self
    }

    /// Validates the configuration and builds the dialect.
    pub fn build(&self) -> Result<Dialect> {
        if self.dialect.seps.is_empty() {
            return Err(Error::Config(ConfigError::EmptySeparators));
        }
        if self.dialect.seps.contains(&self.dialect.quote) {
            return Err(Error::Config(ConfigError::SeparatorIsQuote(
                self.dialect.quote,
            )));
        }
        // Configuration bytes must be ASCII. The scanner matches raw
        // bytes while the escaper writes text, so a byte in the 0x80
        // range would re-encode as two bytes on dump and falsely match
        // inside multi-byte content on parse.
        let term_byte = match self.dialect.term {
            Terminator::Any(b) => Some(b),
            Terminator::Crlf => None,
        };
        let non_ascii = self
            .dialect
            .seps
            .iter()
            .copied()
            .chain(Some(self.dialect.quote))
            .chain(term_byte)
            .find(|b| !b.is_ascii());
        if let Some(b) = non_ascii {
            return Err(Error::Config(ConfigError::NonAsciiByte(b)));
        }
        Ok(self.dialect.clone())
    }
}

impl Default for DialectBuilder {
    fn default() -> DialectBuilder {
        DialectBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use delimited_core::Terminator;

    use super::Dialect;
    use crate::error::{ConfigError, Error};

    #[test]
    fn default_is_valid() {
        let dialect = Dialect::builder().build().unwrap();
        assert_eq!(&[b','][..], dialect.separators());
        assert_eq!(b'"', dialect.quote());
        assert!(dialect.skip_headers());
    }

    #[test]
    fn empty_separators_rejected() {
        let err = Dialect::builder().separators(&[]).build().unwrap_err();
        assert_eq!(Error::Config(ConfigError::EmptySeparators), err);
    }

    #[test]
    fn quote_conflict_rejected() {
        let err = Dialect::builder()
            .separators(&[b',', b'"'])
            .build()
            .unwrap_err();
        assert_eq!(
            Error::Config(ConfigError::SeparatorIsQuote(b'"')),
            err
        );
    }

    #[test]
    fn construction_fails_fast_not_at_first_use() {
        // An invalid configuration never produces a Dialect at all.
        assert!(Dialect::builder().separators(&[]).build().is_err());
    }

    #[test]
    fn non_ascii_separator_rejected() {
        let err = Dialect::builder().separator(0xA9).build().unwrap_err();
        assert_eq!(Error::Config(ConfigError::NonAsciiByte(0xA9)), err);
    }

    #[test]
    fn non_ascii_quote_rejected() {
        let err = Dialect::builder().quote(0xFF).build().unwrap_err();
        assert_eq!(Error::Config(ConfigError::NonAsciiByte(0xFF)), err);
    }

    #[test]
    fn non_ascii_terminator_rejected() {
        let err = Dialect::builder()
            .terminator(Terminator::Any(0x80))
            .build()
            .unwrap_err();
        assert_eq!(Error::Config(ConfigError::NonAsciiByte(0x80)), err);
    }

    #[test]
    fn with_skip_headers_leaves_the_original_alone() {
        let dialect = Dialect::builder().build().unwrap();
        let all = dialect.with_skip_headers(false);
        assert!(!all.skip_headers());
        assert!(dialect.skip_headers());
        assert_eq!(dialect.separators(), all.separators());
    }
}
