use std::error;
use std::fmt;
use std::result;

use bstr::BString;
use delimited_core::ScanError;

/// A type alias for `Result<T, delimited::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when building a dialect or parsing CSV data.
///
/// Parsing can fail in exactly two ways, both tied to malformed quoting;
/// both are fatal to the parse that produced them and are never retried
/// internally. Dumping well-formed field values cannot fail. Invalid
/// configuration is rejected when the dialect is built, never at first
/// use.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// A quote character inside a quoted field was followed by a
    /// character that is neither another quote, a separator, a line
    /// terminator nor the end of input.
    UnexpectedEscape {
        /// The configured quote character.
        escape: u8,
        /// The offending character that followed it.
        got: u8,
        /// A trailing excerpt of the input, ending at the offending
        /// character.
        excerpt: BString,
    },
    /// The input ended while a quoted field was still open.
    UnterminatedQuote {
        /// A trailing excerpt of the input consumed so far.
        excerpt: BString,
    },
    /// The dialect configuration was invalid.
    Config(ConfigError),
}

/// An invalid dialect configuration, reported when a dialect is built.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The separator set was empty.
    EmptySeparators,
    /// A byte was configured both as a separator and as the quote
    /// character.
    SeparatorIsQuote(u8),
    /// A separator, quote or terminator byte outside the ASCII range
    /// was configured.
    NonAsciiByte(u8),
}

impl From<ScanError> for Error {
    fn from(err: ScanError) -> Error {
        match err {
            ScanError::UnexpectedEscape { escape, got, excerpt } => {
                Error::UnexpectedEscape {
                    escape,
                    got,
                    excerpt: BString::from(excerpt),
                }
            }
            ScanError::UnterminatedQuote { excerpt } => {
                Error::UnterminatedQuote { excerpt: BString::from(excerpt) }
            }
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Error {
        Error::Config(err)
    }
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::UnexpectedEscape { escape, got, ref excerpt } => write!(
                f,
                "CSV parse error: unexpected escape character '{}' \
                 following '{}' in \"{}\"",
                got as char, escape as char, excerpt,
            ),
            Error::UnterminatedQuote { ref excerpt } => write!(
                f,
                "CSV parse error: expected a closing quote for a quoted \
                 field, but reached the end of input near \"{}\"",
                excerpt,
            ),
            Error::Config(ref err) => err.fmt(f),
        }
    }
}

impl error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::EmptySeparators => write!(
                f,
                "CSV config error: at least one separator character is \
                 required"
            ),
            ConfigError::SeparatorIsQuote(b) => write!(
                f,
                "CSV config error: separator '{}' conflicts with the \
                 quote character",
                b as char,
            ),
            ConfigError::NonAsciiByte(b) => write!(
                f,
                "CSV config error: configuration byte 0x{:02X} is not \
                 ASCII",
                b,
            ),
        }
    }
}
