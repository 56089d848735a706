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

//! Encoder builder.

use tracing::trace;

use super::flags::Flags;
use super::Encoder;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Default encoding.
pub const DEFAULT_ENCODING: &str = "UTF-8";

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Encoder builder.
///
/// All fields are optional, and unset fields resolve to their defaults when
/// the encoder is built. Values are not validated, which means that unknown
/// encodings are only reported on first use.
#[derive(Clone, Debug)]
pub struct Builder {
    /// Escaping flags.
    flags: Option<Flags>,
    /// Encoding label.
    encoding: Option<String>,
    /// Whether to escape existing references.
    double_encode: Option<bool>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Builder {
    /// Creates an encoder builder.
    ///
    /// Note that the canonical way to create a [`Builder`] is to invoke the
    /// [`Encoder::builder`] method, which creates an instance of [`Builder`].
    /// This is also why we don't implement [`Default`] - the builder itself
    /// should be considered an implementation detail.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlenc_escape::Encoder;
    ///
    /// // Create encoder builder
    /// let mut builder = Encoder::builder();
    /// ```
    #[allow(clippy::new_without_default)]
    #[must_use]
    pub fn new() -> Self {
        Self {
            flags: None,
            encoding: None,
            double_encode: None,
        }
    }

    /// Sets the escaping flags.
    ///
    /// Defaults to [`Flags::COMPAT`] | [`Flags::HTML401`].
    #[inline]
    pub fn flags<F>(&mut self, flags: F) -> &mut Self
    where
        F: Into<Flags>,
    {
        self.flags = Some(flags.into());
        self
    }

    /// Sets the encoding label used to interpret input.
    ///
    /// Defaults to [`DEFAULT_ENCODING`].
    #[inline]
    pub fn encoding<S>(&mut self, encoding: S) -> &mut Self
    where
        S: Into<String>,
    {
        self.encoding = Some(encoding.into());
        self
    }

    /// Sets whether existing references are escaped again.
    ///
    /// Defaults to `true`.
    #[inline]
    pub fn double_encode(&mut self, double_encode: bool) -> &mut Self {
        self.double_encode = Some(double_encode);
        self
    }

    /// Builds the encoder.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlenc_escape::{Encoder, Flags};
    ///
    /// // Create encoder from builder
    /// let encoder = Encoder::builder()
    ///     .flags(Flags::QUOTES | Flags::XML1)
    ///     .encoding("ISO-8859-1")
    ///     .double_encode(false)
    ///     .build();
    /// assert_eq!(encoder.encoding(), "ISO-8859-1");
    /// ```
    #[must_use]
    pub fn build(&self) -> Encoder {
        let encoder = Encoder {
            flags: self.flags.unwrap_or_default(),
            encoding: self
                .encoding
                .clone()
                .unwrap_or_else(|| DEFAULT_ENCODING.to_owned()),
            double_encode: self.double_encode.unwrap_or(true),
        };
        trace!(
            flags = encoder.flags.bits(),
            encoding = %encoder.encoding,
            double_encode = encoder.double_encode,
            "built encoder"
        );
        encoder
    }
}
