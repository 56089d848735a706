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

//! Character references.

use std::str::from_utf8;

use super::flags::{Doctype, Flags};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Character reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reference<'a> {
    /// Numeric reference, e.g., `&#38;` or `&#x26;`.
    Numeric(u32),
    /// Named reference, e.g., `&amp;`.
    Named(&'a str),
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl<'a> Reference<'a> {
    /// Parses a character reference at the start of the given string.
    ///
    /// The value must start with `&`. Returns the reference together with its
    /// length in bytes, including the leading `&` and the trailing `;`. Only
    /// syntax is checked, i.e., whether a name is actually known is left to
    /// the caller. Numeric references beyond U+10FFFF are rejected.
    ///
    /// Since references consist of ASCII only, this works on the bytes of any
    /// ASCII-compatible encoding as well as on strings.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlenc_escape::entity::Reference;
    ///
    /// // Parse named and numeric references
    /// let value = Reference::parse("&amp; rest");
    /// assert_eq!(value, Some((Reference::Named("amp"), 5)));
    ///
    /// let value = Reference::parse("&#x26;");
    /// assert_eq!(value, Some((Reference::Numeric(0x26), 6)));
    /// assert_eq!(Reference::parse("&amp"), None);
    /// ```
    #[must_use]
    pub fn parse<S>(value: &'a S) -> Option<(Self, usize)>
    where
        S: AsRef<[u8]> + ?Sized,
    {
        let rest = value.as_ref().strip_prefix(b"&")?;
        if let Some(rest) = rest.strip_prefix(b"#") {
            let (radix, digits, offset) = match rest.first() {
                Some(b'x' | b'X') => (16, &rest[1..], 3),
                _ => (10, rest, 2),
            };

            // Digits must be terminated by `;`, or it's not a reference
            let len = digits
                .iter()
                .take_while(|&&byte| char::from(byte).is_digit(radix))
                .count();
            if len == 0 || digits.get(len) != Some(&b';') {
                return None;
            }

            // Accumulate digits with overflow checks, since input is untrusted
            let code = digits[..len].iter().try_fold(0u32, |code, &byte| {
                let digit = char::from(byte).to_digit(radix)?;
                code.checked_mul(radix)?
                    .checked_add(digit)
                    .filter(|&code| code <= 0x10_FFFF)
            })?;
            Some((Reference::Numeric(code), offset + len + 1))
        } else {
            let len = rest
                .iter()
                .take_while(|byte| byte.is_ascii_alphanumeric())
                .count();
            if len == 0 || rest.get(len) != Some(&b';') {
                return None;
            }
            let name = from_utf8(&rest[..len]).ok()?;
            Some((Reference::Named(name), len + 2))
        }
    }

    /// Returns whether the reference is valid in the document type.
    ///
    /// Numeric references are always valid, unless [`Flags::DISALLOWED`] is
    /// set and the code point is not allowed as a reference target. Named
    /// references are valid if the document type knows the name.
    #[must_use]
    pub fn is_valid(&self, flags: Flags) -> bool {
        let doctype = flags.doctype();
        match *self {
            Reference::Numeric(code) => {
                !flags.contains(Flags::DISALLOWED)
                    || doctype.allows_reference(code)
            }
            Reference::Named(name) => is_known(name, doctype),
        }
    }

    /// Resolves the reference to one of the special characters.
    ///
    /// Only references to `&`, `<` and `>` are resolved unconditionally, and
    /// references to quotes only if the flags select them for escaping. Note
    /// that `&apos;` is not a valid reference in HTML 4.01, so it's left as
    /// is, while its numeric form is resolved in every document type.
    #[must_use]
    pub fn resolve(&self, flags: Flags) -> Option<char> {
        let char = match *self {
            Reference::Named("amp") => '&',
            Reference::Named("lt") => '<',
            Reference::Named("gt") => '>',
            Reference::Named("quot") => '"',
            Reference::Named("apos") if flags.doctype() != Doctype::Html401 => {
                '\''
            }
            Reference::Named(_) => return None,
            Reference::Numeric(code) => char::from_u32(code)?,
        };
        match char {
            '&' | '<' | '>' => Some(char),
            '"' if flags.double_quotes() => Some(char),
            '\'' if flags.single_quotes() => Some(char),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns whether the named reference is known to the document type.
///
/// XML 1.0 only predefines five entities. The HTML document types share the
/// HTML 4.01 table, and XHTML and HTML 5 additionally know `&apos;`. Names
/// that were introduced with HTML 5, e.g., `&NewLine;`, are not known, so
/// they're escaped again even if double encoding is disabled.
#[must_use]
pub fn is_known(name: &str, doctype: Doctype) -> bool {
    match doctype {
        Doctype::Xml1 => matches!(name, "amp" | "lt" | "gt" | "quot" | "apos"),
        Doctype::Html401 => is_html4(name),
        Doctype::Xhtml | Doctype::Html5 => name == "apos" || is_html4(name),
    }
}

/// Returns whether the name is part of the HTML 4.01 entity table.
#[rustfmt::skip]
fn is_html4(name: &str) -> bool {
    matches!(
        name,
        // Latin-1
        "nbsp" | "iexcl" | "cent" | "pound" | "curren" | "yen" | "brvbar" |
        "sect" | "uml" | "copy" | "ordf" | "laquo" | "not" | "shy" | "reg" |
        "macr" | "deg" | "plusmn" | "sup2" | "sup3" | "acute" | "micro" |
        "para" | "middot" | "cedil" | "sup1" | "ordm" | "raquo" | "frac14" |
        "frac12" | "frac34" | "iquest" | "Agrave" | "Aacute" | "Acirc" |
        "Atilde" | "Auml" | "Aring" | "AElig" | "Ccedil" | "Egrave" |
        "Eacute" | "Ecirc" | "Euml" | "Igrave" | "Iacute" | "Icirc" | "Iuml" |
        "ETH" | "Ntilde" | "Ograve" | "Oacute" | "Ocirc" | "Otilde" | "Ouml" |
        "times" | "Oslash" | "Ugrave" | "Uacute" | "Ucirc" | "Uuml" |
        "Yacute" | "THORN" | "szlig" | "agrave" | "aacute" | "acirc" |
        "atilde" | "auml" | "aring" | "aelig" | "ccedil" | "egrave" |
        "eacute" | "ecirc" | "euml" | "igrave" | "iacute" | "icirc" | "iuml" |
        "eth" | "ntilde" | "ograve" | "oacute" | "ocirc" | "otilde" | "ouml" |
        "divide" | "oslash" | "ugrave" | "uacute" | "ucirc" | "uuml" |
        "yacute" | "thorn" | "yuml" |
        // Special
        "quot" | "amp" | "lt" | "gt" | "OElig" | "oelig" | "Scaron" |
        "scaron" | "Yuml" | "circ" | "tilde" | "ensp" | "emsp" | "thinsp" |
        "zwnj" | "zwj" | "lrm" | "rlm" | "ndash" | "mdash" | "lsquo" |
        "rsquo" | "sbquo" | "ldquo" | "rdquo" | "bdquo" | "dagger" |
        "Dagger" | "permil" | "lsaquo" | "rsaquo" | "euro" |
        // Symbols
        "fnof" | "Alpha" | "Beta" | "Gamma" | "Delta" | "Epsilon" | "Zeta" |
        "Eta" | "Theta" | "Iota" | "Kappa" | "Lambda" | "Mu" | "Nu" | "Xi" |
        "Omicron" | "Pi" | "Rho" | "Sigma" | "Tau" | "Upsilon" | "Phi" |
        "Chi" | "Psi" | "Omega" | "alpha" | "beta" | "gamma" | "delta" |
        "epsilon" | "zeta" | "eta" | "theta" | "iota" | "kappa" | "lambda" |
        "mu" | "nu" | "xi" | "omicron" | "pi" | "rho" | "sigmaf" | "sigma" |
        "tau" | "upsilon" | "phi" | "chi" | "psi" | "omega" | "thetasym" |
        "upsih" | "piv" | "bull" | "hellip" | "prime" | "Prime" | "oline" |
        "frasl" | "weierp" | "image" | "real" | "trade" | "alefsym" | "larr" |
        "uarr" | "rarr" | "darr" | "harr" | "crarr" | "lArr" | "uArr" |
        "rArr" | "dArr" | "hArr" | "forall" | "part" | "exist" | "empty" |
        "nabla" | "isin" | "notin" | "ni" | "prod" | "sum" | "minus" |
        "lowast" | "radic" | "prop" | "infin" | "ang" | "and" | "or" | "cap" |
        "cup" | "int" | "there4" | "sim" | "cong" | "asymp" | "ne" | "equiv" |
        "le" | "ge" | "sub" | "sup" | "nsub" | "sube" | "supe" | "oplus" |
        "otimes" | "perp" | "sdot" | "lceil" | "rceil" | "lfloor" | "rfloor" |
        "lang" | "rang" | "loz" | "spades" | "clubs" | "hearts" | "diams"
    )
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_references() {
        let value = Reference::parse("&#38;");
        assert_eq!(value, Some((Reference::Numeric(38), 5)));
        assert_eq!(
            Reference::parse("&#X3c;x"),
            Some((Reference::Numeric(0x3C), 6))
        );
        assert_eq!(
            Reference::parse("&#00060;"),
            Some((Reference::Numeric(60), 8))
        );
        assert_eq!(Reference::parse("&#;"), None);
        assert_eq!(Reference::parse("&#x;"), None);
        assert_eq!(Reference::parse("&#12a;"), None);
        assert_eq!(Reference::parse("&#1114112;"), None);
        assert_eq!(Reference::parse("&#99999999999999999999;"), None);
    }

    #[test]
    fn parses_named_references() {
        assert_eq!(
            Reference::parse("&frac12;"),
            Some((Reference::Named("frac12"), 8))
        );
        assert_eq!(Reference::parse("&;"), None);
        assert_eq!(Reference::parse("& amp;"), None);
        assert_eq!(Reference::parse("&am-p;"), None);
        assert_eq!(Reference::parse("amp;"), None);
    }

    #[test]
    fn knows_names_by_doctype() {
        assert!(is_known("copy", Doctype::Html401));
        assert!(!is_known("apos", Doctype::Html401));
        assert!(is_known("apos", Doctype::Xhtml));
        assert!(is_known("apos", Doctype::Html5));
        assert!(!is_known("copy", Doctype::Xml1));
        assert!(is_known("quot", Doctype::Xml1));
        assert!(!is_known("Copy", Doctype::Html401));
    }

    #[test]
    fn html5_shares_html4_table() {
        assert!(is_known("hearts", Doctype::Html5));
        assert!(!is_known("NewLine", Doctype::Html5));
    }

    #[test]
    fn parses_bytes() {
        assert_eq!(
            Reference::parse(b"&lt;\xE9"),
            Some((Reference::Named("lt"), 4))
        );
        assert_eq!(Reference::parse(b"&l\xE9;"), None);
    }

    #[test]
    fn validates_numeric_references() {
        let reference = Reference::Numeric(0x01);
        assert!(reference.is_valid(Flags::default()));
        assert!(!reference.is_valid(Flags::default() | Flags::DISALLOWED));
        assert!(Reference::Numeric(0x41).is_valid(Flags::DISALLOWED));
    }

    #[test]
    fn resolves_special_characters_only() {
        let flags = Flags::default();
        assert_eq!(Reference::Named("amp").resolve(flags), Some('&'));
        assert_eq!(Reference::Named("quot").resolve(flags), Some('"'));
        assert_eq!(Reference::Named("copy").resolve(flags), None);
        assert_eq!(Reference::Numeric(0x3E).resolve(flags), Some('>'));
        assert_eq!(Reference::Numeric(0x41).resolve(flags), None);
        assert_eq!(Reference::Numeric(0x27).resolve(flags), None);
    }

    #[test]
    fn resolves_quotes_by_flags() {
        let flags = Flags::NOQUOTES;
        assert_eq!(Reference::Named("quot").resolve(flags), None);

        let flags = Flags::QUOTES;
        assert_eq!(Reference::Numeric(0x27).resolve(flags), Some('\''));
        assert_eq!(Reference::Named("apos").resolve(flags), None);

        let flags = Flags::QUOTES | Flags::XML1;
        assert_eq!(Reference::Named("apos").resolve(flags), Some('\''));
    }
}
