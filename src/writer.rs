use delimited_core::Escaper;

use crate::dialect::Dialect;
use crate::encoding::{encode_utf16le, Encoding};

/// Conversion of a field value to its canonical textual form.
///
/// Strings pass through unchanged; other printable scalars use their
/// standard textual representation (integers through `itoa`, floats
/// through `ryu`). The quoting decision runs on the converted text, so
/// any value whose text contains a separator, quote or line break is
/// quoted like any other field.
pub trait ToField {
    /// Appends the textual form of this value to `dst`.
    fn push_field(&self, dst: &mut String);
}

impl ToField for str {
    fn push_field(&self, dst: &mut String) {
        dst.push_str(self);
    }
}

impl ToField for String {
    fn push_field(&self, dst: &mut String) {
        dst.push_str(self);
    }
}

impl<'a, T: ToField + ?Sized> ToField for &'a T {
    fn push_field(&self, dst: &mut String) {
        (**self).push_field(dst);
    }
}

impl ToField for char {
    fn push_field(&self, dst: &mut String) {
        dst.push(*self);
    }
}

impl ToField for bool {
    fn push_field(&self, dst: &mut String) {
        dst.push_str(if *self { "true" } else { "false" });
    }
}

macro_rules! to_field_int {
    ($($ty:ty),*) => {
        $(
            impl ToField for $ty {
                fn push_field(&self, dst: &mut String) {
                    // Writing into a String cannot fail.
                    let _ = itoa::fmt(&mut *dst, *self);
                }
            }
        )*
    };
}

to_field_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

macro_rules! to_field_float {
    ($($ty:ty),*) => {
        $(
            impl ToField for $ty {
                fn push_field(&self, dst: &mut String) {
                    let mut buf = ryu::Buffer::new();
                    dst.push_str(buf.format(*self));
                }
            }
        )*
    };
}

to_field_float!(f32, f64);

impl Dialect {
    /// Serializes rows of field values into delimited text, materialized
    /// as one byte buffer in the dialect's encoding.
    ///
    /// Every field is converted to text, quoted if it contains a quote,
    /// any configured separator or a line break, and rows are joined
    /// with the first configured separator. No header row is synthesized
    /// and dumping well-formed values cannot fail.
    ///
    /// # Example
    ///
    /// ```
    /// let dialect = delimited::Dialect::builder().build().unwrap();
    /// let out = dialect.dump(vec![vec!["a", "b,c"]]);
    /// assert_eq!(out, b"a,\"b,c\"\n");
    /// ```
    pub fn dump<I, R, F>(&self, rows: I) -> Vec<u8>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = F>,
        F: ToField,
    {
        let mut out = Vec::new();
        for chunk in self.dump_chunks(rows) {
            out.extend_from_slice(&chunk);
        }
        out
    }

    /// Lazily serializes rows, yielding one encoded output chunk per
    /// row.
    ///
    /// The content is byte-for-byte identical to [`Dialect::dump`];
    /// laziness only affects when the bytes are realized. If the
    /// encoding carries a byte order mark it is prepended to the first
    /// chunk only.
    pub fn dump_chunks<I, R, F>(&self, rows: I) -> DumpChunks<I::IntoIter>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = F>,
        F: ToField,
    {
        DumpChunks {
            escaper: self.escaper(),
            encoding: self.encoding(),
            rows: rows.into_iter(),
            first: true,
        }
    }
}

/// A lazy iterator over encoded output chunks, one per row.
///
/// Created by [`Dialect::dump_chunks`]. Dropping it early is always
/// safe.
#[derive(Debug)]
pub struct DumpChunks<I> {
    escaper: Escaper,
    encoding: Encoding,
    rows: I,
    first: bool,
}

impl<I, R, F> Iterator for DumpChunks<I>
where
    I: Iterator<Item = R>,
    R: IntoIterator<Item = F>,
    F: ToField,
{
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        let row = self.rows.next()?;
        let fields: Vec<String> = row
            .into_iter()
            .map(|field| {
                let mut text = String::new();
                field.push_field(&mut text);
                text
            })
            .collect();
        let mut text = String::new();
        self.escaper.write_row(&fields, &mut text);
        let mut out = Vec::with_capacity(text.len() + 2);
        match self.encoding {
            Encoding::Utf8 => out.extend_from_slice(text.as_bytes()),
            Encoding::Utf16Le => {
                encode_utf16le(&text, self.first, &mut out)
            }
        }
        self.first = false;
        Some(out)
    }
}
