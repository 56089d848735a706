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

//! Escaping flags.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Escaping flags.
///
/// Flags select which quote characters are escaped, how invalid code unit
/// sequences are handled, and which document type's entity rules apply. The
/// bit values follow the conventional `ENT_*` constants, so that numeric flag
/// sets stored elsewhere carry over as-is.
///
/// Unknown bits are retained, but have no effect. Note that [`Flags::HTML401`]
/// and [`Flags::NOQUOTES`] are both zero, so they only document intent.
///
/// # Examples
///
/// ```
/// use xmlenc_escape::{Doctype, Flags};
///
/// // Create flags for XML with both quotes escaped
/// let flags = Flags::QUOTES | Flags::XML1;
/// assert_eq!(flags.doctype(), Doctype::Xml1);
/// assert!(flags.contains(Flags::COMPAT));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flags(u32);

/// Document type.
///
/// The document type determines the reference used for apostrophes, the set
/// of named references considered valid, and which code points are allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Doctype {
    /// HTML 4.01.
    Html401,
    /// XML 1.0.
    Xml1,
    /// XHTML.
    Xhtml,
    /// HTML 5.
    Html5,
}

/// Policy for invalid code unit sequences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invalid {
    /// Discard the entire input.
    Reject,
    /// Drop the invalid sequence.
    Ignore,
    /// Replace the invalid sequence with U+FFFD.
    Substitute,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Flags {
    /// Escape neither single nor double quotes.
    pub const NOQUOTES: Self = Self(0);
    /// Escape double quotes, but leave single quotes alone.
    pub const COMPAT: Self = Self(2);
    /// Escape both single and double quotes.
    pub const QUOTES: Self = Self(3);
    /// Drop invalid code unit sequences.
    pub const IGNORE: Self = Self(4);
    /// Replace invalid code unit sequences with U+FFFD.
    pub const SUBSTITUTE: Self = Self(8);
    /// Apply HTML 4.01 rules.
    pub const HTML401: Self = Self(0);
    /// Apply XML 1.0 rules.
    pub const XML1: Self = Self(16);
    /// Apply XHTML rules.
    pub const XHTML: Self = Self(32);
    /// Apply HTML 5 rules.
    ///
    /// Named references are checked against the HTML 4.01 table plus `apos`,
    /// not the full HTML 5 table, so with double encoding disabled, an HTML 5
    /// only reference like `&NewLine;` is escaped again.
    pub const HTML5: Self = Self(48);
    /// Replace code points that are not allowed in the document type.
    pub const DISALLOWED: Self = Self(128);

    /// Single quote bit.
    const SINGLE: u32 = 1;
    /// Double quote bit.
    const DOUBLE: u32 = 2;
    /// Document type mask.
    const DOCTYPE: u32 = 48;

    /// Creates flags from raw bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlenc_escape::Flags;
    ///
    /// // Create flags from raw bits
    /// let flags = Flags::from_bits(3 | 16);
    /// assert_eq!(flags, Flags::QUOTES | Flags::XML1);
    /// ```
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns whether all bits of the given flags are set.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlenc_escape::Flags;
    ///
    /// // Check whether double quotes are escaped
    /// let flags = Flags::default();
    /// assert!(flags.contains(Flags::COMPAT));
    /// assert!(!flags.contains(Flags::QUOTES));
    /// ```
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns whether single quotes are escaped.
    #[inline]
    #[must_use]
    pub const fn single_quotes(self) -> bool {
        self.0 & Self::SINGLE != 0
    }

    /// Returns whether double quotes are escaped.
    #[inline]
    #[must_use]
    pub const fn double_quotes(self) -> bool {
        self.0 & Self::DOUBLE != 0
    }

    /// Returns the document type.
    #[must_use]
    pub const fn doctype(self) -> Doctype {
        match self.0 & Self::DOCTYPE {
            16 => Doctype::Xml1,
            32 => Doctype::Xhtml,
            48 => Doctype::Html5,
            _ => Doctype::Html401,
        }
    }

    /// Returns the policy for invalid code unit sequences.
    ///
    /// If both [`Flags::IGNORE`] and [`Flags::SUBSTITUTE`] are set, ignoring
    /// takes precedence.
    #[must_use]
    pub const fn invalid(self) -> Invalid {
        if self.0 & Self::IGNORE.0 != 0 {
            Invalid::Ignore
        } else if self.0 & Self::SUBSTITUTE.0 != 0 {
            Invalid::Substitute
        } else {
            Invalid::Reject
        }
    }
}

impl Doctype {
    /// Returns the reference used to escape an apostrophe.
    ///
    /// HTML 4.01 has no named reference for the apostrophe, so the numeric
    /// reference is used there, and `&apos;` everywhere else.
    #[inline]
    #[must_use]
    pub const fn apostrophe(self) -> &'static str {
        match self {
            Doctype::Html401 => "&#039;",
            _ => "&apos;",
        }
    }

    /// Returns whether the code point may appear literally in the document.
    #[must_use]
    pub const fn allows(self, code: u32) -> bool {
        match self {
            Doctype::Html401 => {
                matches!(code, 0x09 | 0x0A | 0x0D | 0x20..=0x7E | 0xA0..=0xD7FF)
                    || is_supplementary(code)
            }
            Doctype::Html5 => {
                matches!(code, 0x09 | 0x0A | 0x0C | 0x0D | 0x20..=0x7E)
                    || matches!(code, 0xA0..=0xD7FF)
                    || is_supplementary(code)
            }
            Doctype::Xml1 | Doctype::Xhtml => {
                matches!(code, 0x09 | 0x0A | 0x0D | 0x20..=0xD7FF)
                    || matches!(code, 0xE000..=0x10_FFFF)
                        && code != 0xFFFE
                        && code != 0xFFFF
            }
        }
    }

    /// Returns whether the code point may be the target of a numeric reference.
    ///
    /// This only differs from [`Doctype::allows`] for HTML 5, where a carriage
    /// return may appear literally, but not as a reference.
    #[inline]
    #[must_use]
    pub const fn allows_reference(self, code: u32) -> bool {
        match self {
            Doctype::Html5 if code == 0x0D => false,
            _ => self.allows(code),
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for Flags {
    /// Creates the default flags, i.e., compatibility mode with HTML 4.01.
    #[inline]
    fn default() -> Self {
        Self::COMPAT | Self::HTML401
    }
}

impl BitOr for Flags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<u32> for Flags {
    #[inline]
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

// ----------------------------------------------------------------------------

impl fmt::Debug for Flags {
    /// Formats the flags for debugging.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Flags")
            .field("bits", &self.0)
            .field("doctype", &self.doctype())
            .field("invalid", &self.invalid())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns whether the code point is an allowed non-ASCII code point beyond
/// the surrogates, excluding the noncharacters.
const fn is_supplementary(code: u32) -> bool {
    matches!(code, 0xE000..=0x10_FFFF)
        && (code & 0xFFFF) < 0xFFFE
        && !matches!(code, 0xFDD0..=0xFDEF)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_compat_html401() {
        let flags = Flags::default();
        assert_eq!(flags.bits(), 2);
        assert!(flags.double_quotes());
        assert!(!flags.single_quotes());
        assert_eq!(flags.doctype(), Doctype::Html401);
        assert_eq!(flags.invalid(), Invalid::Reject);
    }

    #[test]
    fn doctype_from_bits() {
        assert_eq!(Flags::XML1.doctype(), Doctype::Xml1);
        assert_eq!(Flags::XHTML.doctype(), Doctype::Xhtml);
        assert_eq!(Flags::HTML5.doctype(), Doctype::Html5);
        let flags = Flags::QUOTES | Flags::DISALLOWED;
        assert_eq!(flags.doctype(), Doctype::Html401);
    }

    #[test]
    fn ignore_wins_over_substitute() {
        let flags = Flags::IGNORE | Flags::SUBSTITUTE;
        assert_eq!(flags.invalid(), Invalid::Ignore);
        assert_eq!(Flags::SUBSTITUTE.invalid(), Invalid::Substitute);
    }

    #[test]
    fn apostrophe_by_doctype() {
        assert_eq!(Doctype::Html401.apostrophe(), "&#039;");
        assert_eq!(Doctype::Xml1.apostrophe(), "&apos;");
        assert_eq!(Doctype::Html5.apostrophe(), "&apos;");
    }

    #[test]
    fn allowed_code_points() {
        assert!(Doctype::Html401.allows('a' as u32));
        assert!(!Doctype::Html401.allows(0x01));
        assert!(!Doctype::Html401.allows(0x7F));
        assert!(Doctype::Xml1.allows(0x7F));
        assert!(!Doctype::Xml1.allows(0xFFFE));
        assert!(!Doctype::Html5.allows(0xFDD0));
        assert!(Doctype::Html5.allows(0x0C));
        assert!(Doctype::Html5.allows(0x0D));
        assert!(!Doctype::Html5.allows_reference(0x0D));
        assert!(Doctype::Html401.allows_reference(0x0D));
    }
}
