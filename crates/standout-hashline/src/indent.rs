//! Literal unindentation.
//!
//! Template bodies are written indented under their block directive:
//!
//! ```text
//! #if ready
//!   done
//! #end
//! ```
//!
//! Each open block adds `indent_step` characters of expected indentation, and
//! those characters are removed from literal lines before they are emitted.

/// Expected indentation width for literals at the given nesting depth.
pub fn indent_width(indent_step: usize, depth: usize) -> usize {
    indent_step * depth
}

/// Removes `width` leading characters from every line of `text`.
///
/// Lines are separated by `\n`. A line shorter than `width` is kept as is.
/// When `strip_first` is false the first line is left untouched, which is
/// the case for text that continues a line after an interpolation.
///
/// # Example
///
/// ```rust
/// use standout_hashline::indent::unindent;
///
/// assert_eq!(unindent("  a\n  b", 2, true), "a\nb");
/// assert_eq!(unindent(" + x\n  b", 2, false), " + x\nb");
/// ```
pub fn unindent(text: &str, width: usize, strip_first: bool) -> String {
    if width == 0 {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if i == 0 && !strip_first {
            out.push_str(line);
        } else {
            out.push_str(strip_chars(line, width));
        }
    }
    out
}

fn strip_chars(line: &str, width: usize) -> &str {
    match line.char_indices().nth(width) {
        Some((offset, _)) => &line[offset..],
        None if line.chars().count() == width => "",
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_width() {
        assert_eq!(indent_width(2, 0), 0);
        assert_eq!(indent_width(2, 3), 6);
        assert_eq!(indent_width(4, 2), 8);
    }

    #[test]
    fn test_unindent_every_line() {
        assert_eq!(unindent("  foo\n  bar\n  baz\n", 2, true), "foo\nbar\nbaz\n");
    }

    #[test]
    fn test_unindent_short_lines_untouched() {
        assert_eq!(unindent("  foo\n\n x\n  bar", 2, true), "foo\n\n x\nbar");
    }

    #[test]
    fn test_unindent_exact_width_line_becomes_empty() {
        assert_eq!(unindent("  ", 2, true), "");
        assert_eq!(unindent("\n  ", 2, true), "\n");
    }

    #[test]
    fn test_unindent_strips_any_character() {
        assert_eq!(unindent("abcd", 2, true), "cd");
        assert_eq!(unindent("éèx", 2, true), "x");
    }

    #[test]
    fn test_unindent_keeps_first_line_mid_line() {
        assert_eq!(unindent(" + ", 2, false), " + ");
        assert_eq!(unindent(" + \n    x", 2, false), " + \n  x");
    }

    #[test]
    fn test_unindent_zero_width() {
        assert_eq!(unindent("  a\n  b", 0, true), "  a\n  b");
    }
}
