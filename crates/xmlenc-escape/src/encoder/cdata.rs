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

//! CDATA sections.

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Wraps a string in a CDATA section.
///
/// Every `<![` is replaced with `&lt;![` and every `]>` with `]&gt;` before
/// wrapping, so the content can neither open a nested section nor close the
/// enclosing one. Both are global, non-overlapping replacements, applied one
/// after the other in that order. Nothing else is escaped.
///
/// # Examples
///
/// ```
/// use xmlenc_escape::cdata::wrap;
///
/// // Wrap string in CDATA section
/// let value = wrap("a]]>b");
/// assert_eq!(value, "<![CDATA[a]]&gt;b]]>");
/// ```
#[must_use]
pub fn wrap(value: &str) -> String {
    let value = value.replace("<![", "&lt;![").replace("]>", "]&gt;");

    // Compute required capacity and wrap
    let mut buffer = String::with_capacity(12 + value.len());
    buffer.push_str("<![CDATA[");
    buffer.push_str(&value);
    buffer.push_str("]]>");
    buffer
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_safe_text_verbatim() {
        assert_eq!(wrap(""), "<![CDATA[]]>");
        assert_eq!(wrap("a < b & c"), "<![CDATA[a < b & c]]>");
    }

    #[test]
    fn neutralizes_markers() {
        assert_eq!(wrap("a]]>b"), "<![CDATA[a]]&gt;b]]>");
        assert_eq!(
            wrap("<![CDATA[nested]]>"),
            "<![CDATA[&lt;![CDATA[nested]]&gt;]]>"
        );
    }

    #[test]
    fn handles_adjacent_markers() {
        assert_eq!(wrap("<![]>"), "<![CDATA[&lt;![]&gt;]]>");
        assert_eq!(wrap("]>]>"), "<![CDATA[]&gt;]&gt;]]>");
        assert_eq!(wrap("<!<!["), "<![CDATA[<!&lt;![]]>");
    }
}
