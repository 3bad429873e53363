//! Directive scanning.
//!
//! The scanner looks for the earliest of two things in the remaining
//! template text:
//!
//! - a command line: optional blanks, `#`, an identifier, optional parameter
//!   text, then a line break (`\n` or `\r\n`) or the end of input
//! - an interpolation: `#{expr}`
//!
//! Everything before the match is literal text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^([ \t]*)#([a-zA-Z_][a-zA-Z0-9_]*)(?:[ \t]+([^ \t\r\n][^\r\n]*))?[ \t]*\r?(?:\n|$)|#\{([^}]*)\}",
    )
    .expect("directive pattern is valid")
});

/// A directive recognized in template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    /// A `#name params` line.
    Command {
        /// Leading blanks before the `#`.
        prefix: &'a str,
        name: &'a str,
        /// Parameter text after the separating blanks, up to the line break.
        /// Empty if absent.
        params: &'a str,
    },
    /// An inline `#{expr}`.
    Interpolation { expr: &'a str },
}

/// One scan step: literal text, then the directive that ends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan<'a> {
    /// Text preceding the directive.
    pub literal: &'a str,
    pub directive: Directive<'a>,
    /// Text following the directive (the command's line break included).
    pub rest: &'a str,
}

/// Finds the earliest directive in `text`.
///
/// Returns `None` when `text` contains no further directive, in which case
/// all of it is literal.
///
/// # Example
///
/// ```rust
/// use standout_hashline::scanner::{scan, Directive};
///
/// let step = scan("a #{x} b").unwrap();
/// assert_eq!(step.literal, "a ");
/// assert_eq!(step.directive, Directive::Interpolation { expr: "x" });
/// assert_eq!(step.rest, " b");
/// ```
pub fn scan(text: &str) -> Option<Scan<'_>> {
    let caps = DIRECTIVE.captures(text)?;
    let whole = caps.get(0)?;

    Some(Scan {
        literal: &text[..whole.start()],
        directive: directive(&caps)?,
        rest: &text[whole.end()..],
    })
}

fn directive<'a>(caps: &Captures<'a>) -> Option<Directive<'a>> {
    if let Some(name) = caps.get(2) {
        return Some(Directive::Command {
            prefix: caps.get(1).map_or("", |m| m.as_str()),
            name: name.as_str(),
            params: caps.get(3).map_or("", |m| m.as_str()),
        });
    }
    caps.get(4)
        .map(|expr| Directive::Interpolation { expr: expr.as_str() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(text: &str) -> (String, String, String) {
        match scan(text).unwrap().directive {
            Directive::Command {
                prefix,
                name,
                params,
            } => (prefix.into(), name.into(), params.into()),
            other => panic!("expected command, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_plain_text() {
        assert_eq!(scan("no directives here\nat all"), None);
        assert_eq!(scan(""), None);
    }

    #[test]
    fn test_scan_command_line() {
        let step = scan("before\n  #if x > 1\n    body").unwrap();
        assert_eq!(step.literal, "before\n");
        assert_eq!(
            step.directive,
            Directive::Command {
                prefix: "  ",
                name: "if",
                params: "x > 1",
            }
        );
        assert_eq!(step.rest, "    body");
    }

    #[test]
    fn test_scan_command_params_whitespace() {
        assert_eq!(command("#if\ttrue\n").2, "true");
        assert_eq!(command("#if   true\n").2, "true");
        assert_eq!(command("#if true   \n").2, "true   ");
        assert_eq!(command("#if true\t").2, "true\t");
        assert_eq!(command("#else \n").2, "");
        assert_eq!(command("#end\t").2, "");
        assert_eq!(command("#else foo  ").2, "foo  ");
    }

    #[test]
    fn test_scan_crlf_command_line() {
        let step = scan("#if a\r\n  x\r\n").unwrap();
        assert_eq!(
            step.directive,
            Directive::Command {
                prefix: "",
                name: "if",
                params: "a",
            }
        );
        assert_eq!(step.rest, "  x\r\n");

        let step = scan("#else\r\n").unwrap();
        assert!(matches!(step.directive, Directive::Command { name: "else", params: "", .. }));
        assert_eq!(step.rest, "");
        assert!(matches!(
            scan("#end\r").unwrap().directive,
            Directive::Command { name: "end", .. }
        ));
    }

    #[test]
    fn test_scan_command_prefix() {
        assert_eq!(command("\t#end").0, "\t");
        assert_eq!(command("   #block 1").0, "   ");
    }

    #[test]
    fn test_scan_interpolation() {
        let step = scan("a#{1+2}b").unwrap();
        assert_eq!(step.literal, "a");
        assert_eq!(step.directive, Directive::Interpolation { expr: "1+2" });
        assert_eq!(step.rest, "b");
    }

    #[test]
    fn test_scan_earliest_wins() {
        let step = scan("x #{a}\n#end").unwrap();
        assert_eq!(step.directive, Directive::Interpolation { expr: "a" });

        let step = scan("#end\n#{a}").unwrap();
        assert!(matches!(step.directive, Directive::Command { name: "end", .. }));
    }

    #[test]
    fn test_scan_hash_mid_line_is_literal() {
        assert_eq!(scan("a #if b"), None);
        assert_eq!(scan("#if(x)"), None);
        assert_eq!(scan("# not a command"), None);
    }

    #[test]
    fn test_scan_interpolation_at_line_start() {
        let step = scan("  #{a}").unwrap();
        assert_eq!(step.literal, "  ");
        assert_eq!(step.directive, Directive::Interpolation { expr: "a" });
    }
}
