/// The line terminator a document was written with.
///
/// Lines are always split on `\n`; a `Crlf` document simply carries a `\r`
/// at the end of every terminated line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    /// Detects the ending from the first line break in `bytes`.
    ///
    /// A lone `\r` and text without any break count as [`LineEnding::Lf`].
    pub fn detect(bytes: &[u8]) -> Self {
        match memchr::memchr2(b'\n', b'\r', bytes) {
            Some(at) if bytes[at] == b'\r' && bytes.get(at + 1) == Some(&b'\n') => Self::Crlf,
            _ => Self::Lf,
        }
    }

    #[inline]
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::Crlf => b"\r\n",
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

/// `line` without a single trailing `\r`.
#[inline]
pub fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
