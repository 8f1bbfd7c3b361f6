/*!
Dialect-driven CSV parsing and writing, with chunked and streaming
input.

A [`Dialect`] describes one CSV variant: its separator set (several
separators may be accepted interchangeably), quote character, record
terminator, text encoding and whether the first row is a header to skip.
Build one with [`Dialect::builder`] and use it from as many parse or
dump invocations as you like; it is a plain immutable value.

Input can be a whole string, a finite sequence of chunks or a lazy
stream of chunks, split at any byte position — the scanner carries a
quoted field or half a CRLF pair across chunk boundaries transparently.
Output is materialized bytes or a lazy sequence of per-row chunks.

Unlike lenient CSV readers, parsing here rejects malformed quoting with
one of two errors: an unexpected escape character after a quote, or a
quoted field left open at the end of input. See [`Error`].

# Example

```
use delimited::Dialect;

let dialect = Dialect::builder()
    .separators(&[b',', b';', b'\t'])
    .skip_headers(true)
    .build()
    .unwrap();

let rows = dialect
    .parse("name,last\tyear\njohn;doe,1986\n")
    .unwrap();
assert_eq!(rows, vec![vec![
    "john".to_string(), "doe".to_string(), "1986".to_string(),
]]);

let out = dialect.dump(vec![vec!["john", "doe,jr"]]);
assert_eq!(out, b"john,\"doe,jr\"\n");
```
*/

pub use delimited_core::Terminator;

pub use crate::dialect::{Dialect, DialectBuilder};
pub use crate::encoding::Encoding;
pub use crate::error::{ConfigError, Error, Result};
pub use crate::reader::Rows;
pub use crate::writer::{DumpChunks, ToField};

mod dialect;
mod encoding;
mod error;
mod reader;
mod writer;
