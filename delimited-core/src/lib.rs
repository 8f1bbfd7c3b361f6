/*!
The bare scanning and escaping engine underneath the `delimited` crate.

This crate knows nothing about encodings, header skipping or laziness. It
exposes exactly two workhorses:

* `Scanner`, a pull based state machine that tokenizes byte chunks into
  rows of unescaped fields, carrying partial state across arbitrarily
  sized chunks.
* `Escaper`, which renders a row of fields back into delimited text,
  quoting and doubling quotes only where necessary.

Both are configured with a separator set, a quote byte and a record
`Terminator`. Separators, quotes and terminators are single bytes, so the
engine is encoding agnostic as long as the data is ASCII compatible;
multi-byte UTF-8 content passes through untouched.
*/

pub use crate::escaper::{Escaper, EscaperBuilder};
pub use crate::scanner::{
    ScanError, ScanRowResult, Scanner, ScannerBuilder, Terminator,
};

mod escaper;
mod scanner;
