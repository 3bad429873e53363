//! Reversible escaping of literal text.
//!
//! [`escape`] maps arbitrary text to printable ASCII so it can be embedded
//! between double quotes, e.g. in a program listing. [`unescape`] is its exact
//! inverse.
//!
//! | Character | Escape |
//! |-----------|--------|
//! | `\` `"` | `\\` `\"` |
//! | backspace, tab, line feed, form feed, carriage return | `\b` `\t` `\n` `\f` `\r` |
//! | other controls, DEL, U+0080–U+00FF | `\xHH` |
//! | U+0100–U+FFFF | `\uHHHH` |
//! | above U+FFFF | `\UHHHHHHHH` |
//!
//! Everything else in U+0020–U+007E is emitted as is.

use crate::error::UnescapeError;

// (raw, tag): `raw` is written as a backslash followed by `tag`.
const SHORT_FORMS: &[(char, char)] = &[
    ('\\', '\\'),
    ('"', '"'),
    ('\u{08}', 'b'),
    ('\t', 't'),
    ('\n', 'n'),
    ('\u{0C}', 'f'),
    ('\r', 'r'),
];

/// Escapes `text` so that only printable ASCII remains.
///
/// # Example
///
/// ```rust
/// use standout_hashline::escape;
///
/// assert_eq!(escape("a\"b\n"), "a\\\"b\\n");
/// assert_eq!(escape("é"), "\\xE9");
/// assert_eq!(escape("€"), "\\u20AC");
/// ```
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if let Some(&(_, short)) = SHORT_FORMS.iter().find(|(raw, _)| *raw == ch) {
            out.push('\\');
            out.push(short);
            continue;
        }
        let (tag, width) = match ch {
            ' '..='~' => {
                out.push(ch);
                continue;
            }
            '\0'..='\u{FF}' => ('x', 2),
            '\u{100}'..='\u{FFFF}' => ('u', 4),
            _ => ('U', 8),
        };
        out.push('\\');
        out.push(tag);
        out.push_str(&format!("{:0width$X}", ch as u32, width = width));
    }
    out
}

/// Reverses [`escape`].
///
/// Accepts exactly the sequences `escape` produces; anything else after a
/// backslash is an error.
pub fn unescape(text: &str) -> Result<String, UnescapeError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices();

    while let Some((offset, ch)) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        let err = |message: &str| UnescapeError {
            offset,
            message: message.to_string(),
        };

        let Some((_, tag)) = chars.next() else {
            return Err(err("trailing backslash"));
        };
        if let Some(&(raw, _)) = SHORT_FORMS.iter().find(|(_, short)| *short == tag) {
            out.push(raw);
            continue;
        }
        let width = match tag {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            other => return Err(err(&format!("unknown escape `\\{}`", other))),
        };

        let mut code = 0u32;
        for _ in 0..width {
            let digit = chars
                .next()
                .and_then(|(_, c)| c.to_digit(16))
                .ok_or_else(|| err(&format!("expected {} hex digits", width)))?;
            code = code * 16 + digit;
        }
        let decoded = char::from_u32(code).ok_or_else(|| err("not a unicode scalar value"))?;
        out.push(decoded);
    }

    Ok(out)
}
