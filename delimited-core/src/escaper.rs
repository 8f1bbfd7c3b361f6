use memchr::{memchr, memchr2, memchr_iter};

use crate::scanner::Terminator;

/// Builds an escaper with various configuration knobs.
#[derive(Clone, Debug)]
pub struct EscaperBuilder {
    escaper: Escaper,
}

impl EscaperBuilder {
    /// Create a new builder.
    pub fn new() -> EscaperBuilder {
        EscaperBuilder::default()
    }

    /// Build an escaper from this configuration.
    pub fn build(&self) -> Escaper {
        self.escaper.clone()
    }

    /// Use a single field separator.
    ///
    /// The default is `b','`.
    pub fn separator(&mut self, sep: u8) -> &mut EscaperBuilder {
        self.escaper.seps = vec![sep];
        self
    }

    /// The full separator set of the dialect.
    ///
    /// Rows are always joined with the first separator in the set, but a
    /// field containing *any* of them is quoted, so the output re-parses
    /// losslessly under the same dialect.
    pub fn separators(&mut self, seps: &[u8]) -> &mut EscaperBuilder {
        self.escaper.seps = seps.to_vec();
        self
    }

    /// The quote byte. The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut EscaperBuilder {
        self.escaper.quote = quote;
        self
    }

    /// The record terminator. The default is `Terminator::Any(b'\n')`.
    pub fn terminator(&mut self, term: Terminator) -> &mut EscaperBuilder {
        self.escaper.term = term;
        self
    }
}

impl Default for EscaperBuilder {
    fn default() -> EscaperBuilder {
        EscaperBuilder { escaper: Escaper::default() }
    }
}

/// Renders rows of fields as delimited text.
///
/// A field is quoted only when necessary: when it contains the quote
/// byte, any configured separator, or a CR/LF/terminator byte. Inside a
/// quoted field the only escape is a doubled quote; separators and line
/// breaks are left as they are.
#[derive(Clone, Debug)]
pub struct Escaper {
    seps: Vec<u8>,
    quote: u8,
    term: Terminator,
}

impl Default for Escaper {
    fn default() -> Escaper {
        Escaper {
            seps: vec![b','],
            quote: b'"',
            term: Terminator::default(),
        }
    }
}

impl Escaper {
    /// Create a new escaper with the default configuration.
    pub fn new() -> Escaper {
        EscaperBuilder::new().build()
    }

    /// Writes one row, joined with the first configured separator and
    /// ended with the record terminator, to `out`.
    pub fn write_row<I, S>(&self, fields: I, out: &mut String)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sep = self.seps.first().copied().unwrap_or(b',');
        let mut first = true;
        for field in fields {
            if !first {
                out.push(sep as char);
            }
            first = false;
            self.write_field(field.as_ref(), out);
        }
        self.write_terminator(out);
    }

    /// Writes one field, quoted and escaped if necessary, to `out`.
    ///
    /// CR and LF force quoting even when the configured terminator is
    /// some other byte, so the output stays unambiguous under an LF or
    /// CRLF terminated dialect as well as its own.
    pub fn write_field(&self, field: &str, out: &mut String) {
        if !self.needs_quotes(field.as_bytes()) {
            out.push_str(field);
            return;
        }
        out.push(self.quote as char);
        let mut start = 0;
        for at in memchr_iter(self.quote, field.as_bytes()) {
            out.push_str(&field[start..at]);
            out.push(self.quote as char);
            out.push(self.quote as char);
            start = at + 1;
        }
        out.push_str(&field[start..]);
        out.push(self.quote as char);
    }

    /// Writes the record terminator to `out`.
    pub fn write_terminator(&self, out: &mut String) {
        match self.term {
            Terminator::Crlf => out.push_str("\r\n"),
            Terminator::Any(b) => out.push(b as char),
        }
    }

    /// CR and LF always force quoting, not just the configured
    /// terminator byte, so that CRLF folding on re-parse is lossless.
    fn needs_quotes(&self, field: &[u8]) -> bool {
        if memchr(self.quote, field).is_some()
            || memchr2(b'\r', b'\n', field).is_some()
        {
            return true;
        }
        if let Terminator::Any(t) = self.term {
            if t != b'\n' && memchr(t, field).is_some() {
                return true;
            }
        }
        self.seps.iter().any(|&s| memchr(s, field).is_some())
    }
}
