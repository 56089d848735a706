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

//! Escaping.

use memchr::memchr;
use std::borrow::Cow;
use std::str::from_utf8;

use super::charset::{Charset, Unit};
use super::entity::Reference;
use super::flags::{Flags, Invalid};

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Escapes special characters in a string.
///
/// Replaces `&`, `<` and `>`, as well as quotes selected by the flags, with
/// their references. If `double_encode` is `false`, an `&` which starts a
/// reference that is valid in the document type is kept as is. With
/// [`Flags::DISALLOWED`], code points that are not allowed in the document
/// type are replaced with U+FFFD.
///
/// If nothing needs to be escaped, a borrowed reference is returned.
///
/// # Examples
///
/// ```
/// use xmlenc_escape::escape::escape;
/// use xmlenc_escape::Flags;
///
/// // Escape string
/// let value = escape("Rick & Morty", Flags::default(), true);
/// assert_eq!(value, "Rick &amp; Morty");
/// ```
#[must_use]
pub fn escape(value: &str, flags: Flags, double_encode: bool) -> Cow<'_, str> {
    let doctype = flags.doctype();
    let disallowed = flags.contains(Flags::DISALLOWED);

    // Copy unchanged runs in between replacements, and only allocate once the
    // first replacement is found, as most strings need no escaping at all
    let mut buffer = String::new();
    let mut start = 0;
    for (i, char) in value.char_indices() {
        let rest = &value.as_bytes()[i..];
        let replacement = match special(char, flags) {
            Some(_) if is_kept(rest, flags, double_encode) => continue,
            Some(replacement) => replacement,
            None if disallowed && !doctype.allows(u32::from(char)) => {
                "\u{FFFD}"
            }
            None => continue,
        };
        if buffer.is_empty() {
            buffer.reserve(value.len() + value.len() / 8);
        }
        buffer.push_str(&value[start..i]);
        buffer.push_str(replacement);
        start = i + char.len_utf8();
    }

    // Return borrowed value if no replacements were made
    if start == 0 {
        Cow::Borrowed(value)
    } else {
        buffer.push_str(&value[start..]);
        Cow::Owned(buffer)
    }
}

/// Escapes special characters in a byte slice.
///
/// This function works like [`escape`], but on bytes in the given charset,
/// which are only touched where a replacement is necessary, so the output is
/// in the same charset as the input. The charset is only used to validate the
/// input and find the boundaries of characters.
///
/// Invalid code unit sequences are handled according to the flags, and with
/// [`Invalid::Reject`], [`None`] is returned. Invalid sequences, as well as
/// code points disallowed with [`Flags::DISALLOWED`], are replaced with U+FFFD
/// in UTF-8, and with `&#xFFFD;` in all other charsets.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use xmlenc_escape::charset::Charset;
/// use xmlenc_escape::escape::escape_bytes;
/// use xmlenc_escape::Flags;
///
/// // Escape ISO-8859-1 bytes
/// let charset = Charset::for_label("ISO-8859-1")?;
/// let value = escape_bytes(b"caf\xE9 & x", charset, Flags::default(), true);
/// assert_eq!(value.as_deref(), Some(&b"caf\xE9 &amp; x"[..]));
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn escape_bytes(
    value: &[u8], charset: Charset, flags: Flags, double_encode: bool,
) -> Option<Cow<'_, [u8]>> {
    if charset.is_utf8() || value.is_ascii() {
        if let Ok(text) = from_utf8(value) {
            return Some(match escape(text, flags, double_encode) {
                Cow::Borrowed(text) => Cow::Borrowed(text.as_bytes()),
                Cow::Owned(text) => Cow::Owned(text.into_bytes()),
            });
        }
    }

    // Both invalid sequences and disallowed code points are substituted
    let doctype = flags.doctype();
    let disallowed = flags.contains(Flags::DISALLOWED);
    let substitute: &[u8] = if charset.is_utf8() {
        "\u{FFFD}".as_bytes()
    } else {
        b"&#xFFFD;"
    };

    // Special characters are ASCII, and thus always single-byte units in the
    // supported charsets, so all other units are only checked if necessary
    let mut buffer = Vec::new();
    let mut start = 0;
    let mut changed = false;
    for (range, unit) in charset.units(value) {
        let replacement: &[u8] = match unit {
            Unit::Malformed => match flags.invalid() {
                Invalid::Reject => return None,
                Invalid::Ignore => &[],
                Invalid::Substitute => substitute,
            },
            Unit::Text(text) => {
                let rest = &value[range.start..];
                let special = match value[range.clone()] {
                    [byte] if byte.is_ascii() => {
                        special(char::from(byte), flags)
                    }
                    _ => None,
                };
                match special {
                    Some(_) if is_kept(rest, flags, double_encode) => continue,
                    Some(replacement) => replacement.as_bytes(),
                    None if disallowed
                        && text
                            .as_str()
                            .chars()
                            .any(|char| !doctype.allows(u32::from(char))) =>
                    {
                        substitute
                    }
                    None => continue,
                }
            }
        };
        if !changed {
            buffer.reserve(value.len() + value.len() / 8);
            changed = true;
        }
        buffer.extend_from_slice(&value[start..range.start]);
        buffer.extend_from_slice(replacement);
        start = range.end;
    }

    // Return borrowed value if no replacements were made
    if changed {
        buffer.extend_from_slice(&value[start..]);
        Some(Cow::Owned(buffer))
    } else {
        Some(Cow::Borrowed(value))
    }
}

/// Unescapes references to special characters in a string.
///
/// Only references to `&`, `<` and `>`, as well as to quotes selected by the
/// flags, are replaced. All other references, e.g., `&copy;`, are left as is,
/// and so are malformed ones. Replacement happens in a single pass, which
/// means that `&amp;lt;` is unescaped to `&lt;`.
///
/// If nothing needs to be unescaped, a borrowed reference is returned.
///
/// # Examples
///
/// ```
/// use xmlenc_escape::escape::unescape;
/// use xmlenc_escape::Flags;
///
/// // Unescape string
/// let value = unescape("&copy; &amp; &lt;", Flags::default());
/// assert_eq!(value, "&copy; & <");
/// ```
#[must_use]
pub fn unescape(value: &str, flags: Flags) -> Cow<'_, str> {
    let bytes = value.as_bytes();

    // Jump from `&` to `&`, as everything in between is copied verbatim
    let mut buffer = String::new();
    let mut start = 0;
    let mut cursor = 0;
    while let Some(offset) = memchr(b'&', &bytes[cursor..]) {
        let i = cursor + offset;
        let resolved = Reference::parse(&bytes[i..]).and_then(
            |(reference, len)| reference.resolve(flags).map(|char| (char, len)),
        );

        // Replace reference, or continue after the `&` if it's not one of ours
        if let Some((char, len)) = resolved {
            if buffer.is_empty() {
                buffer.reserve(value.len());
            }
            buffer.push_str(&value[start..i]);
            buffer.push(char);
            start = i + len;
            cursor = start;
        } else {
            cursor = i + 1;
        }
    }

    // Return borrowed value if no replacements were made
    if start == 0 {
        Cow::Borrowed(value)
    } else {
        buffer.push_str(&value[start..]);
        Cow::Owned(buffer)
    }
}

/// Returns the reference for a special character, if it's escaped.
fn special(char: char, flags: Flags) -> Option<&'static str> {
    match char {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' if flags.double_quotes() => Some("&quot;"),
        '\'' if flags.single_quotes() => Some(flags.doctype().apostrophe()),
        _ => None,
    }
}

/// Returns whether the value starts with an `&` that must be kept, because
/// it starts a reference that is valid in the document type, and double
/// encoding is disabled.
fn is_kept(value: &[u8], flags: Flags, double_encode: bool) -> bool {
    !double_encode
        && value.first() == Some(&b'&')
        && Reference::parse(value)
            .is_some_and(|(reference, _)| reference.is_valid(flags))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use encoding_rs::{SHIFT_JIS, UTF_8, WINDOWS_1252};
    use std::borrow::Cow;

    use super::*;

    #[test]
    fn escapes_special_characters() {
        let text = "<a href=\"x\">Tom & 'Jerry'</a>";
        assert_eq!(
            escape(text, Flags::default(), true),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; 'Jerry'&lt;/a&gt;"
        );
    }

    #[test]
    fn borrows_if_nothing_to_escape() {
        let value = escape("plain text", Flags::default(), true);
        assert!(matches!(value, Cow::Borrowed("plain text")));
    }

    #[test]
    fn escapes_quotes_by_flags() {
        let text = "\"'";
        assert_eq!(escape(text, Flags::NOQUOTES, true), "\"'");
        assert_eq!(escape(text, Flags::COMPAT, true), "&quot;'");
        assert_eq!(escape(text, Flags::QUOTES, true), "&quot;&#039;");
        assert_eq!(
            escape(text, Flags::QUOTES | Flags::XML1, true),
            "&quot;&apos;"
        );
        assert_eq!(
            escape(text, Flags::QUOTES | Flags::HTML5, true),
            "&quot;&apos;"
        );
    }

    #[test]
    fn keeps_valid_references_without_double_encoding() {
        let flags = Flags::default();
        let text = "&amp; &#38; &#x26; &copy;";
        assert_eq!(escape(text, flags, false), text);
        assert_eq!(
            escape("&bogus; &amp &#;", flags, false),
            "&amp;bogus; &amp;amp &amp;#;"
        );
        assert_eq!(escape("&amp;", flags, true), "&amp;amp;");
    }

    #[test]
    fn checks_names_against_doctype() {
        assert_eq!(escape("&copy;", Flags::XML1, false), "&amp;copy;");
        assert_eq!(escape("&apos;", Flags::XML1, false), "&apos;");
        assert_eq!(escape("&apos;", Flags::HTML401, false), "&amp;apos;");
        assert_eq!(escape("&apos;", Flags::XHTML, false), "&apos;");
    }

    #[test]
    fn escapes_html5_only_names_again() {
        let flags = Flags::HTML5;
        assert_eq!(escape("&hearts;", flags, false), "&hearts;");
        assert_eq!(escape("&NewLine;", flags, false), "&amp;NewLine;");
    }

    #[test]
    fn replaces_disallowed_code_points() {
        let flags = Flags::default() | Flags::DISALLOWED;
        assert_eq!(escape("a\u{1}b", flags, true), "a\u{FFFD}b");
        assert_eq!(escape("a\u{1}b", Flags::default(), true), "a\u{1}b");
        assert_eq!(escape("&#1;", flags, false), "&amp;#1;");
        assert_eq!(escape("&#65;", flags, false), "&#65;");
    }

    #[test]
    fn keeps_non_ascii_bytes() {
        let flags = Flags::default();
        let value = escape_bytes(b"caf\xE9 & x", Charset::Latin1, flags, true);
        assert_eq!(value.as_deref(), Some(&b"caf\xE9 &amp; x"[..]));

        let charset = Charset::Whatwg(WINDOWS_1252);
        let value = escape_bytes(b"na\xEFve \x93<\x94", charset, flags, true);
        assert_eq!(value.as_deref(), Some(&b"na\xEFve \x93&lt;\x94"[..]));
    }

    #[test]
    fn borrows_bytes_if_nothing_to_escape() {
        let flags = Flags::default();
        let value = escape_bytes(b"caf\xE9", Charset::Latin1, flags, true);
        assert!(matches!(value, Some(Cow::Borrowed(b"caf\xE9"))));
    }

    #[test]
    fn escapes_multibyte_bytes() {
        let charset = Charset::Whatwg(SHIFT_JIS);
        let flags = Flags::default();
        let value = escape_bytes(b"\x82\xA0&amp;<", charset, flags, false);
        assert_eq!(value.as_deref(), Some(&b"\x82\xA0&amp;&lt;"[..]));
    }

    #[test]
    fn handles_invalid_bytes_by_policy() {
        let bytes = b"a\xFF<";
        let charset = Charset::Whatwg(UTF_8);
        assert_eq!(escape_bytes(bytes, charset, Flags::COMPAT, true), None);

        let flags = Flags::COMPAT | Flags::IGNORE;
        let value = escape_bytes(bytes, charset, flags, true);
        assert_eq!(value.as_deref(), Some(&b"a&lt;"[..]));

        let flags = Flags::COMPAT | Flags::SUBSTITUTE;
        let value = escape_bytes(bytes, charset, flags, true);
        assert_eq!(value.as_deref(), Some(&b"a\xEF\xBF\xBD&lt;"[..]));

        let charset = Charset::Whatwg(SHIFT_JIS);
        let value = escape_bytes(b"\x82<", charset, flags, true);
        assert_eq!(value.as_deref(), Some(&b"&#xFFFD;&lt;"[..]));
    }

    #[test]
    fn replaces_disallowed_bytes() {
        let flags = Flags::default() | Flags::DISALLOWED;
        let value = escape_bytes(b"\x81\xE9", Charset::Latin1, flags, true);
        assert_eq!(value.as_deref(), Some(&b"&#xFFFD;\xE9"[..]));
    }

    #[test]
    fn unescapes_special_characters() {
        let text = "&lt;p&gt;Tom &amp; Jerry&lt;/p&gt;";
        assert_eq!(unescape(text, Flags::default()), "<p>Tom & Jerry</p>");
    }

    #[test]
    fn unescapes_numeric_references() {
        let value = unescape("&#60;&#x3E;&#38;&#65;", Flags::default());
        assert_eq!(value, "<>&&#65;");
    }

    #[test]
    fn unescapes_in_a_single_pass() {
        assert_eq!(unescape("&amp;lt;", Flags::default()), "&lt;");
    }

    #[test]
    fn unescapes_quotes_by_flags() {
        let text = "&quot;&#039;&apos;";
        assert_eq!(unescape(text, Flags::NOQUOTES), text);
        assert_eq!(unescape(text, Flags::COMPAT), "\"&#039;&apos;");
        assert_eq!(unescape(text, Flags::QUOTES), "\"'&apos;");
        assert_eq!(unescape(text, Flags::QUOTES | Flags::XML1), "\"''");
    }

    #[test]
    fn leaves_malformed_references() {
        let value = unescape("& &amp &#x; &;", Flags::default());
        assert!(matches!(value, Cow::Borrowed(_)));
    }
}
