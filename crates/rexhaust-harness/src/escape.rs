//! Quoted rendering of strings and regexps for corpus lines.
//!
//! A rendering is wrapped in double quotes. Backslash and double quote are
//! prefixed with a backslash and newline becomes `\n`. Every other byte is
//! copied verbatim.

use thiserror::Error;

/// Capacity of the rendering buffer, quotes included.
pub const ESCAPE_BUFFER_LEN: usize = 512;

/// Headroom that must remain in the buffer before each input byte is
/// rendered (the longest expansion plus the closing quote).
const RESERVE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("escaped rendering of {len} input bytes does not fit in {max} bytes")]
pub struct RenderOverflow {
    /// Length of the input being rendered.
    pub len: usize,
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnescapeError {
    #[error("rendering is not wrapped in double quotes")]
    Unquoted,
    #[error("unsupported escape '\\{0}'")]
    BadEscape(char),
    #[error("unescaped double quote at byte {0}")]
    StrayQuote(usize),
    #[error("dangling backslash")]
    Dangling,
}

/// Render `bytes` in quoted form.
pub fn escape(bytes: &[u8]) -> Result<Vec<u8>, RenderOverflow> {
    let (out, consumed) = render_prefix(bytes);
    if consumed < bytes.len() {
        return Err(RenderOverflow {
            len: bytes.len(),
            max: ESCAPE_BUFFER_LEN,
        });
    }
    Ok(out)
}

/// Render `bytes` for diagnostics. An input whose rendering overflows is
/// cut to the longest prefix that fits, and `...` follows the closing
/// quote.
#[must_use]
pub fn escape_truncated(bytes: &[u8]) -> Vec<u8> {
    let (mut out, consumed) = render_prefix(bytes);
    if consumed < bytes.len() {
        out.extend_from_slice(b"...");
    }
    out
}

/// Quoted rendering of the longest prefix of `bytes` that fits, and the
/// number of input bytes it covers.
fn render_prefix(bytes: &[u8]) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(bytes.len().min(ESCAPE_BUFFER_LEN) + 2);
    out.push(b'"');
    let mut consumed = 0;
    for &byte in bytes {
        if out.len() + RESERVE >= ESCAPE_BUFFER_LEN {
            break;
        }
        match byte {
            b'\\' | b'"' => out.extend_from_slice(&[b'\\', byte]),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(byte),
        }
        consumed += 1;
    }
    out.push(b'"');
    (out, consumed)
}

/// Invert [`escape`].
pub fn unescape(rendered: &[u8]) -> Result<Vec<u8>, UnescapeError> {
    let inner = rendered
        .strip_prefix(b"\"")
        .and_then(|rest| rest.strip_suffix(b"\""))
        .ok_or(UnescapeError::Unquoted)?;
    let mut out = Vec::with_capacity(inner.len());
    let mut bytes = inner.iter().copied().enumerate();
    while let Some((at, byte)) = bytes.next() {
        match byte {
            b'\\' => match bytes.next() {
                Some((_, b'\\')) => out.push(b'\\'),
                Some((_, b'"')) => out.push(b'"'),
                Some((_, b'n')) => out.push(b'\n'),
                Some((_, other)) => return Err(UnescapeError::BadEscape(char::from(other))),
                None => return Err(UnescapeError::Dangling),
            },
            b'"' => return Err(UnescapeError::StrayQuote(at + 1)),
            _ => out.push(byte),
        }
    }
    Ok(out)
}
