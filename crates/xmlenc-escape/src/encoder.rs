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

//! Encoder.

use std::borrow::Cow;
use tracing::debug;

mod builder;
pub mod cdata;
pub mod charset;
pub mod entity;
mod error;
pub mod escape;
pub mod flags;

pub use builder::{Builder, DEFAULT_ENCODING};
use charset::Charset;
pub use error::{Error, Result};
use escape::unescape;
use flags::Flags;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Encoder.
///
/// Encoders escape and unescape the special characters `&`, `<` and `>`, and,
/// depending on the [`Flags`], single and double quotes, and wrap text in
/// CDATA sections. An encoder is configured once and immutable thereafter,
/// so it can be shared between threads freely. Configuration consists of the
/// following three values:
///
/// - `flags`: Quote handling, invalid input policy and document type, which
///   defaults to [`Flags::COMPAT`] | [`Flags::HTML401`].
/// - `encoding`: The label of the encoding used to interpret input, which
///   defaults to [`DEFAULT_ENCODING`].
/// - `double_encode`: Whether existing references are escaped again, which
///   defaults to `true`.
///
/// Note that encoding and decoding are intentionally asymmetric: [`encode`]
/// honors all three values, while [`decode`] only considers the flags, since
/// it operates on strings that are already valid UTF-8, and always resolves
/// every reference it knows, regardless of how it came about.
///
/// [`decode`]: Encoder::decode
/// [`encode`]: Encoder::encode
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use xmlenc_escape::Encoder;
///
/// // Create encoder and encode text
/// let encoder = Encoder::new();
/// assert_eq!(encoder.encode("Rick & Morty")?, "Rick &amp; Morty");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encoder {
    /// Escaping flags.
    flags: Flags,
    /// Encoding label.
    encoding: String,
    /// Whether to escape existing references.
    double_encode: bool,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Encoder {
    /// Creates an encoder with the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlenc_escape::{Encoder, Flags};
    ///
    /// // Create encoder
    /// let encoder = Encoder::new();
    /// assert_eq!(encoder.flags(), Flags::COMPAT | Flags::HTML401);
    /// assert_eq!(encoder.encoding(), "UTF-8");
    /// assert!(encoder.double_encode());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Builder::new().build()
    }

    /// Creates an encoder builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlenc_escape::Encoder;
    ///
    /// // Create encoder builder
    /// let mut builder = Encoder::builder();
    /// ```
    #[inline]
    #[must_use]
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Encodes text.
    ///
    /// The special characters are replaced with references. The result is
    /// borrowed if the text doesn't need any escaping. Strings are always
    /// UTF-8, so input in other encodings must be passed as bytes to
    /// [`Encoder::encode_bytes`].
    ///
    /// # Errors
    ///
    /// If the configured encoding is not known, [`Error::Encoding`] is
    /// returned, as configuration is not validated on construction. If it's
    /// known, but not UTF-8, [`Error::Text`] is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use xmlenc_escape::{Encoder, Flags};
    ///
    /// // Create encoder and encode text
    /// let encoder = Encoder::builder()
    ///     .flags(Flags::QUOTES | Flags::XML1)
    ///     .double_encode(false)
    ///     .build();
    ///
    /// // Existing references are kept
    /// let value = encoder.encode("&amp; 'quoted'")?;
    /// assert_eq!(value, "&amp; &apos;quoted&apos;");
    /// # Ok(())
    /// # }
    /// ```
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, str>> {
        let charset = Charset::for_label(&self.encoding)?;
        if charset.is_utf8() {
            Ok(escape::escape(text, self.flags, self.double_encode))
        } else {
            Err(Error::Text(self.encoding.clone()))
        }
    }

    /// Encodes bytes.
    ///
    /// The input is interpreted according to the configured encoding, and the
    /// special characters are replaced with references. All other bytes are
    /// copied unchanged, so the result is in the configured encoding as well,
    /// and borrowed if nothing needs escaping. If the input contains an
    /// invalid code unit sequence, it's dropped with [`Flags::IGNORE`], or
    /// replaced with U+FFFD with [`Flags::SUBSTITUTE`], which is written as
    /// `&#xFFFD;` in encodings other than UTF-8. Otherwise, the entire result
    /// is empty.
    ///
    /// # Errors
    ///
    /// If the configured encoding is not known, or not compatible with ASCII,
    /// [`Error::Encoding`] is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use xmlenc_escape::Encoder;
    ///
    /// // Create encoder and encode bytes
    /// let encoder = Encoder::builder().encoding("ISO-8859-1").build();
    /// let value = encoder.encode_bytes(b"caf\xE9 & cr\xE8me")?;
    /// assert_eq!(&*value, b"caf\xE9 &amp; cr\xE8me");
    /// # Ok(())
    /// # }
    /// ```
    pub fn encode_bytes<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        let charset = Charset::for_label(&self.encoding)?;
        let flags = self.flags;
        match escape::escape_bytes(bytes, charset, flags, self.double_encode) {
            Some(value) => Ok(value),
            None => {
                debug!(encoding = %self.encoding, "discarding invalid input");
                Ok(Cow::Borrowed(&bytes[..0]))
            }
        }
    }

    /// Decodes text.
    ///
    /// Only references to `&`, `<` and `>`, and to quotes selected by the
    /// flags, are decoded, all others like `&copy;` are left unchanged. The
    /// configured encoding and double encoding are not considered.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlenc_escape::Encoder;
    ///
    /// // Create encoder and decode text
    /// let encoder = Encoder::new();
    /// assert_eq!(encoder.decode("&copy; &amp; &lt;"), "&copy; & <");
    /// ```
    #[inline]
    #[must_use]
    pub fn decode<'a>(&self, text: &'a str) -> Cow<'a, str> {
        unescape(text, self.flags)
    }

    /// Wraps text in a CDATA section.
    ///
    /// See [`cdata::wrap`] for how the content is guarded.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlenc_escape::Encoder;
    ///
    /// // Create encoder and wrap text
    /// let encoder = Encoder::new();
    /// assert_eq!(encoder.cdata("1 < 2"), "<![CDATA[1 < 2]]>");
    /// ```
    #[inline]
    #[must_use]
    pub fn cdata(&self, text: &str) -> String {
        cdata::wrap(text)
    }
}

#[allow(clippy::must_use_candidate)]
impl Encoder {
    /// Returns the escaping flags.
    #[inline]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Returns the encoding label.
    #[inline]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Returns whether existing references are escaped again.
    #[inline]
    pub fn double_encode(&self) -> bool {
        self.double_encode
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for Encoder {
    /// Creates an encoder with the default configuration.
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_defaults() {
        let encoder = Encoder::new();
        let value = encoder.encode("He said \"hi\" & 'bye'").unwrap();
        assert_eq!(value, "He said &quot;hi&quot; &amp; 'bye'");
    }

    #[test]
    fn borrows_unchanged_input() {
        let encoder = Encoder::new();
        let value = encoder.encode("nothing to do").unwrap();
        assert!(matches!(value, Cow::Borrowed("nothing to do")));
    }

    #[test]
    fn encodes_latin1_bytes_unchanged() {
        let encoder = Encoder::builder().encoding("ISO-8859-1").build();
        let value = encoder.encode_bytes(b"caf\xE9 & x").unwrap();
        assert_eq!(&*value, b"caf\xE9 &amp; x");
        let value = encoder.encode_bytes(b"caf\xE9").unwrap();
        assert!(matches!(value, Cow::Borrowed(b"caf\xE9")));
    }

    #[test]
    fn encodes_windows_1252_bytes_unchanged() {
        let encoder = Encoder::builder().encoding("windows-1252").build();
        let value = encoder.encode_bytes(b"na\xEFve <\x80>").unwrap();
        assert_eq!(&*value, b"na\xEFve &lt;\x80&gt;");
    }

    #[test]
    fn rejects_text_in_other_encodings() {
        let encoder = Encoder::builder().encoding("ISO-8859-1").build();
        assert!(matches!(encoder.encode("caf\u{E9}"), Err(Error::Text(_))));
        let encoder = Encoder::builder().encoding("UTF-16").build();
        assert!(matches!(encoder.encode("a"), Err(Error::Encoding(_))));
        assert!(matches!(encoder.encode_bytes(b"a"), Err(Error::Encoding(_))));
    }

    #[test]
    fn defers_unknown_encoding_to_first_use() {
        let encoder = Encoder::builder().encoding("klingon").build();
        assert_eq!(encoder.encoding(), "klingon");
        assert!(matches!(encoder.encode("a"), Err(Error::Encoding(_))));
        assert_eq!(encoder.decode("&lt;"), "<");
        assert_eq!(encoder.cdata("a"), "<![CDATA[a]]>");
    }

    #[test]
    fn discards_invalid_input() {
        let encoder = Encoder::new();
        assert_eq!(&*encoder.encode_bytes(b"a\xFF<").unwrap(), b"");

        let encoder = Encoder::builder().flags(Flags::IGNORE).build();
        assert_eq!(&*encoder.encode_bytes(b"a\xFF<").unwrap(), b"a&lt;");

        let encoder = Encoder::builder().flags(Flags::SUBSTITUTE).build();
        let value = encoder.encode_bytes(b"a\xFF<").unwrap();
        assert_eq!(&*value, "a\u{FFFD}&lt;".as_bytes());
    }

    #[test]
    fn decode_ignores_encoding_and_double_encode() {
        let encoder = Encoder::builder()
            .encoding("klingon")
            .double_encode(false)
            .build();
        assert_eq!(encoder.decode("&amp;amp;"), "&amp;");
    }

    #[test]
    fn builder_flags_accept_raw_bits() {
        let encoder = Encoder::builder().flags(3u32 | 16).build();
        assert_eq!(encoder.flags(), Flags::QUOTES | Flags::XML1);
        assert_eq!(Encoder::default(), Encoder::new());
    }
}
