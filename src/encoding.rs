use std::char::{decode_utf16, REPLACEMENT_CHARACTER};

/// The UTF-16LE byte order mark.
pub(crate) const BOM_UTF16LE: [u8; 2] = [0xFF, 0xFE];

/// The text encoding a dialect applies at the codec boundary.
///
/// Decoding runs before tokenization and encoding runs after
/// serialization; the codec itself always works on UTF-8 text. The
/// adapter knows nothing about CSV syntax.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Encoding {
    /// Byte-for-byte pass-through. Input is expected to be UTF-8 (or
    /// any ASCII compatible byte soup; non-UTF-8 field bytes are
    /// replaced with U+FFFD when rows are materialized as strings).
    Utf8,
    /// UTF-16 little endian. A leading byte order mark is stripped on
    /// decode if present and emitted exactly once on encode.
    Utf16Le,
}

impl Default for Encoding {
    fn default() -> Encoding {
        Encoding::Utf8
    }
}

/// A streaming UTF-16LE to UTF-8 decoder.
///
/// Chunks may split anywhere, including in the middle of a code unit or
/// of a surrogate pair, so the decoder carries a dangling half unit and
/// a pending high surrogate from one chunk to the next. Invalid
/// sequences decode to U+FFFD; leftovers at end of stream are flushed as
/// U+FFFD by `finish`.
#[derive(Clone, Debug, Default)]
pub(crate) struct Utf16LeDecoder {
    seen_first_unit: bool,
    half: Option<u8>,
    pending_high: Option<u16>,
}

impl Utf16LeDecoder {
    pub(crate) fn new() -> Utf16LeDecoder {
        Utf16LeDecoder::default()
    }

    /// Decodes one chunk, appending UTF-8 text to `out`.
    pub(crate) fn decode(&mut self, chunk: &[u8], out: &mut String) {
        if chunk.is_empty() {
            return;
        }
        let mut units: Vec<u16> = Vec::with_capacity(chunk.len() / 2 + 2);
        if let Some(high) = self.pending_high.take() {
            units.push(high);
        }
        let mut bytes = chunk;
        if let Some(low) = self.half.take() {
            units.push(u16::from_le_bytes([low, bytes[0]]));
            bytes = &bytes[1..];
        }
        let mut pairs = bytes.chunks_exact(2);
        for pair in &mut pairs {
            units.push(u16::from_le_bytes([pair[0], pair[1]]));
        }
        if let &[dangling] = pairs.remainder() {
            self.half = Some(dangling);
        }
        let mut units = &units[..];
        if !self.seen_first_unit {
            if let Some(&first) = units.first() {
                self.seen_first_unit = true;
                if first == 0xFEFF {
                    units = &units[1..];
                }
            }
        }
        // A trailing high surrogate may find its partner at the start
        // of the next chunk.
        if let Some(&last) = units.last() {
            if (0xD800..0xDC00).contains(&last) {
                self.pending_high = Some(last);
                units = &units[..units.len() - 1];
            }
        }
        for decoded in decode_utf16(units.iter().copied()) {
            out.push(decoded.unwrap_or(REPLACEMENT_CHARACTER));
        }
    }

    /// Flushes any incomplete trailing sequence at end of stream.
    pub(crate) fn finish(&mut self, out: &mut String) {
        if self.pending_high.take().is_some() {
            out.push(REPLACEMENT_CHARACTER);
        }
        if self.half.take().is_some() {
            out.push(REPLACEMENT_CHARACTER);
        }
    }
}

/// Encodes UTF-8 text as UTF-16LE bytes, prepending the byte order mark
/// when `include_bom` is set.
pub(crate) fn encode_utf16le(
    text: &str,
    include_bom: bool,
    out: &mut Vec<u8>,
) {
    if include_bom {
        out.extend_from_slice(&BOM_UTF16LE);
    }
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
}
