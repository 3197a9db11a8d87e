//! Turns source bytes plus coverage boundaries into escaped HTML with
//! intensity-classed `<span>`s around every covered region.

use std::fmt::Write;

use crate::error::{CovtreeError, Result};
use crate::profile::Boundary;

/// Tabs are expanded to this many spaces.
const TAB: &str = "        ";

/// Intensity bucket for a start boundary: 0 for never-run blocks, 1..=10
/// otherwise.
#[must_use]
pub fn intensity(boundary: &Boundary) -> u32 {
    if boundary.count == 0 {
        0
    } else {
        ((boundary.norm * 9.0).floor() as u32 + 1).min(10)
    }
}

/// Annotate `src` with the given boundaries in one forward pass.
///
/// Boundaries must be ordered by offset and balanced: an end with no open
/// span, a start left open at the end of the source, or an offset past the
/// end of the source is an error.
pub fn annotate(src: &[u8], boundaries: &[Boundary]) -> Result<String> {
    let mut out = String::with_capacity(src.len() + boundaries.len() * 32);
    let mut pending = boundaries.iter().peekable();
    let mut depth = 0usize;
    let mut last_offset = 0usize;
    // end of the last multi-byte character copied to `out`
    let mut decoded_to = 0usize;

    for i in 0..=src.len() {
        while let Some(b) = pending.next_if(|b| b.offset <= i) {
            if b.offset < last_offset || b.offset < i {
                return Err(CovtreeError::Boundary {
                    offset: b.offset,
                    message: "boundaries are not ordered by offset".to_string(),
                });
            }
            last_offset = b.offset;

            if b.start {
                depth += 1;
                write!(
                    out,
                    r#"<span class="cov{}" title="{}">"#,
                    intensity(b),
                    b.count
                )
                .unwrap();
            } else {
                if depth == 0 {
                    return Err(CovtreeError::Boundary {
                        offset: b.offset,
                        message: "end boundary without a matching start".to_string(),
                    });
                }
                depth -= 1;
                out.push_str("</span>");
            }
        }

        if let Some(&byte) = src.get(i) {
            if i >= decoded_to {
                decoded_to = push_escaped_byte(&mut out, byte, src, i);
            }
        }
    }

    if let Some(b) = pending.next() {
        return Err(CovtreeError::Boundary {
            offset: b.offset,
            message: format!("offset is past the end of the source ({} bytes)", src.len()),
        });
    }
    if depth > 0 {
        return Err(CovtreeError::Boundary {
            offset: src.len(),
            message: format!("{depth} span(s) still open at end of source"),
        });
    }

    Ok(out)
}

/// Escape the byte at `i`, returning the offset just past what was consumed.
/// A multi-byte character is copied whole from its leading byte.
fn push_escaped_byte(out: &mut String, byte: u8, src: &[u8], i: usize) -> usize {
    match byte {
        b'>' => out.push_str("&gt;"),
        b'<' => out.push_str("&lt;"),
        b'&' => out.push_str("&amp;"),
        b'\t' => out.push_str(TAB),
        b if b.is_ascii() => out.push(b as char),
        _ => {
            let len = utf8_len(byte);
            match src.get(i..i + len).and_then(|s| std::str::from_utf8(s).ok()) {
                Some(s) => {
                    out.push_str(s);
                    return i + len;
                }
                None => out.push(char::REPLACEMENT_CHARACTER),
            }
        }
    }
    i + 1
}

fn utf8_len(lead: u8) -> usize {
    match lead {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

/// Escape text for use in HTML element content and attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
