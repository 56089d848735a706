// Copyright (c) 2024 Zensical <contributors@zensical.org>

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! Character set.

use encoding_rs::{
    Decoder, DecoderResult, Encoding, BIG5, EUC_JP, GBK, KOI8_R, MACINTOSH,
    SHIFT_JIS, UTF_8, WINDOWS_1251, WINDOWS_1252,
};
use std::ops::Range;
use std::str::from_utf8;
use tracing::debug;

use super::error::{Error, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Labels that denote true ISO-8859-1, not its WHATWG alias windows-1252.
const LATIN1: [&str; 3] = ["iso-8859-1", "iso8859-1", "latin1"];

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Character set.
///
/// Labels are resolved from the traditional charset names first, e.g., `932`
/// or `MacRoman`, and then following the WHATWG Encoding Standard, except for
/// the labels in [`LATIN1`], which WHATWG maps to windows-1252. Here, they
/// denote ISO-8859-1, so that bytes `0x80` to `0x9F` are the C1 controls.
///
/// Only ASCII-compatible encodings are supported, since escaping replaces
/// ASCII bytes in place, and the output stays in the same encoding as the
/// input. In all of them, bytes below `0x40` only ever encode ASCII, so the
/// special characters can never be part of a multi-byte sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charset {
    /// ISO-8859-1.
    Latin1,
    /// WHATWG encoding.
    Whatwg(&'static Encoding),
}

/// Unit of input, i.e., a decoded character or a malformed sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    /// Decoded text, usually a single character.
    Text(Text),
    /// Malformed code unit sequence.
    Malformed,
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Decoded text of a unit.
///
/// A byte sequence decodes to at most two characters, e.g., for some Big5
/// sequences, which easily fit into a fixed-size buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Text {
    /// UTF-8 buffer.
    buffer: [u8; 16],
    /// Number of bytes used.
    len: usize,
}

/// Iterator over the units of a byte slice.
///
/// Each unit is yielded together with the range of bytes it was decoded from,
/// so callers can work on the original bytes and only consult the decoded
/// characters where needed.
pub struct Units<'a> {
    /// Input bytes.
    bytes: &'a [u8],
    /// Start of the current unit.
    start: usize,
    /// Number of bytes fed to the decoder.
    cursor: usize,
    /// Decoder, or [`None`] for ISO-8859-1.
    decoder: Option<Decoder>,
    /// Whether the decoder was flushed.
    done: bool,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Charset {
    /// Resolves a charset from the given label.
    ///
    /// Labels are compared case-insensitively, and an empty label denotes the
    /// default charset, UTF-8. Encodings which are not ASCII-compatible, like
    /// UTF-16 or ISO-2022-JP, are rejected, as is the WHATWG `replacement`
    /// encoding, which decodes every input to a single U+FFFD.
    ///
    /// # Errors
    ///
    /// If the label is not known, [`Error::Encoding`] is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use xmlenc_escape::charset::Charset;
    ///
    /// // Resolve charset from traditional name
    /// let charset = Charset::for_label("SJIS-win")?;
    /// assert_eq!(charset, Charset::for_label("Shift_JIS")?);
    /// # Ok(())
    /// # }
    /// ```
    pub fn for_label(label: &str) -> Result<Self> {
        let label = label.trim();
        if label.is_empty() {
            return Ok(Charset::Whatwg(UTF_8));
        }

        // Check for true ISO-8859-1 before consulting any table
        if LATIN1.iter().any(|name| label.eq_ignore_ascii_case(name)) {
            return Ok(Charset::Latin1);
        }

        // Resolve remaining labels from traditional names or the WHATWG table
        alias(label)
            .or_else(|| Encoding::for_label_no_replacement(label.as_bytes()))
            .filter(|encoding| encoding.is_ascii_compatible())
            .map(Charset::Whatwg)
            .ok_or_else(|| {
                debug!(label, "rejecting unknown encoding");
                Error::Encoding(label.to_owned())
            })
    }

    /// Returns whether the charset is UTF-8.
    #[inline]
    #[must_use]
    pub fn is_utf8(&self) -> bool {
        matches!(self, Charset::Whatwg(encoding) if *encoding == UTF_8)
    }

    /// Returns the units of the given byte slice.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use xmlenc_escape::charset::{Charset, Unit};
    ///
    /// // Split bytes into units
    /// let charset = Charset::for_label("UTF-8")?;
    /// let units: Vec<_> = charset.units(b"a\xFF").collect();
    /// assert_eq!(units[0].0, 0..1);
    /// assert_eq!(units[1], (1..2, Unit::Malformed));
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn units<'a>(&self, bytes: &'a [u8]) -> Units<'a> {
        Units {
            bytes,
            start: 0,
            cursor: 0,
            decoder: match self {
                Charset::Latin1 => None,
                Charset::Whatwg(encoding) => {
                    Some(encoding.new_decoder_without_bom_handling())
                }
            },
            done: false,
        }
    }
}

impl Text {
    /// Returns the decoded text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        from_utf8(&self.buffer[..self.len]).unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl From<char> for Text {
    /// Creates decoded text from a character.
    #[inline]
    fn from(char: char) -> Self {
        let mut buffer = [0; 16];
        let len = char.encode_utf8(&mut buffer).len();
        Self { buffer, len }
    }
}

// ----------------------------------------------------------------------------

impl Iterator for Units<'_> {
    type Item = (Range<usize>, Unit);

    /// Returns the next unit.
    ///
    /// The decoder is fed one byte at a time, which allows to attribute each
    /// decoded character and each malformed sequence to its exact range of
    /// bytes. Decoders never consume an ASCII byte as part of a malformed
    /// sequence, but hand it out again on the next call.
    fn next(&mut self) -> Option<Self::Item> {
        let Some(decoder) = self.decoder.as_mut() else {
            let &byte = self.bytes.get(self.cursor)?;
            self.cursor += 1;
            let range = self.cursor - 1..self.cursor;
            return Some((range, Unit::Text(char::from(byte).into())));
        };

        // Feed bytes until a character is complete or malformed, and flush the
        // decoder once the input is exhausted to detect truncated sequences
        while !self.done {
            let last = self.cursor == self.bytes.len();
            let input = if last {
                &[][..]
            } else {
                &self.bytes[self.cursor..=self.cursor]
            };
            let mut text = Text { buffer: [0; 16], len: 0 };
            let (result, read, written) = decoder
                .decode_to_utf8_without_replacement(
                    input,
                    &mut text.buffer,
                    last,
                );
            self.cursor += read;
            text.len = written;
            match result {
                DecoderResult::Malformed(_, extra) => {
                    let end = self.cursor - usize::from(extra);
                    let range = self.start.min(end)..end;
                    self.start = end;
                    return Some((range, Unit::Malformed));
                }
                DecoderResult::InputEmpty if written > 0 => {
                    let range = self.start..self.cursor;
                    self.start = self.cursor;
                    return Some((range, Unit::Text(text)));
                }
                DecoderResult::InputEmpty => self.done = last,

                // The buffer fits anything a single byte can complete, so this
                // can't happen, but we must not loop forever if it does
                DecoderResult::OutputFull => self.done = true,
            }
        }
        None
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Resolves traditional charset names that are not WHATWG labels.
fn alias(label: &str) -> Option<&'static Encoding> {
    let encoding = match label.to_ascii_lowercase().as_str() {
        "1251" | "win-1251" => WINDOWS_1251,
        "1252" => WINDOWS_1252,
        "932" | "cp932" | "sjis-win" => SHIFT_JIS,
        "936" => GBK,
        "950" => BIG5,
        "eucjp" | "eucjp-win" => EUC_JP,
        "koi8-ru" | "koi8r" => KOI8_R,
        "macroman" => MACINTOSH,
        _ => return None,
    };
    Some(encoding)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use encoding_rs::{IBM866, ISO_8859_15};

    use super::*;

    fn resolve(label: &str) -> Option<&'static Encoding> {
        match Charset::for_label(label) {
            Ok(Charset::Whatwg(encoding)) => Some(encoding),
            _ => None,
        }
    }

    #[test]
    fn resolves_labels() {
        assert_eq!(resolve(""), Some(UTF_8));
        assert_eq!(resolve("utf-8"), Some(UTF_8));
        assert_eq!(resolve("UTF8"), Some(UTF_8));
        assert_eq!(resolve("cp1252"), Some(WINDOWS_1252));
        assert_eq!(resolve("Shift_JIS"), Some(SHIFT_JIS));
        assert_eq!(resolve("ISO-8859-15"), Some(ISO_8859_15));
        assert_eq!(resolve("866"), Some(IBM866));
        assert!(matches!(
            Charset::for_label("ISO-8859-1"),
            Ok(Charset::Latin1)
        ));
    }

    #[test]
    fn resolves_traditional_names() {
        assert_eq!(resolve("MacRoman"), Some(MACINTOSH));
        assert_eq!(resolve("cp932"), Some(SHIFT_JIS));
        assert_eq!(resolve("SJIS-win"), Some(SHIFT_JIS));
        assert_eq!(resolve("932"), Some(SHIFT_JIS));
        assert_eq!(resolve("eucJP-win"), Some(EUC_JP));
        assert_eq!(resolve("EUCJP"), Some(EUC_JP));
        assert_eq!(resolve("1251"), Some(WINDOWS_1251));
        assert_eq!(resolve("win-1251"), Some(WINDOWS_1251));
        assert_eq!(resolve("1252"), Some(WINDOWS_1252));
        assert_eq!(resolve("936"), Some(GBK));
        assert_eq!(resolve("950"), Some(BIG5));
        assert_eq!(resolve("koi8-ru"), Some(KOI8_R));
    }

    #[test]
    fn rejects_unknown_labels() {
        assert!(matches!(
            Charset::for_label("klingon"),
            Err(Error::Encoding(label)) if label == "klingon"
        ));
        assert!(Charset::for_label("iso-2022-kr").is_err());
    }

    #[test]
    fn rejects_ascii_incompatible_encodings() {
        assert!(Charset::for_label("utf-16").is_err());
        assert!(Charset::for_label("UTF-16BE").is_err());
        assert!(Charset::for_label("iso-2022-jp").is_err());
    }

    #[test]
    fn splits_latin1_into_bytes() {
        let units: Vec<_> = Charset::Latin1.units(b"\xE9<").collect();
        assert_eq!(units, [
            (0..1, Unit::Text('\u{E9}'.into())),
            (1..2, Unit::Text('<'.into())),
        ]);
    }

    #[test]
    fn attributes_multibyte_characters() {
        let units: Vec<_> = Charset::Whatwg(SHIFT_JIS)
            .units(b"\x82\xA0&")
            .collect();
        assert_eq!(units, [
            (0..2, Unit::Text('\u{3042}'.into())),
            (2..3, Unit::Text('&'.into())),
        ]);
    }

    #[test]
    fn reports_malformed_sequences() {
        let charset = Charset::Whatwg(UTF_8);
        let units: Vec<_> = charset.units(b"\xC3<\xE2\x82").collect();
        assert_eq!(units, [
            (0..1, Unit::Malformed),
            (1..2, Unit::Text('<'.into())),
            (2..4, Unit::Malformed),
        ]);
    }
}
