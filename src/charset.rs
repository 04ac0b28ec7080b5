//! Character-level lexer constructs: bracket sets, negated sets, character
//! ranges and the `.` wildcard, compiled once to sampleable codepoint ranges.
//!
//! Set bodies are handed to `regex-syntax`, which understands the same
//! escape and range notation ANTLR uses inside `[...]` and normalizes the
//! result into non-overlapping ranges.

use crate::error::ErrorRepr;
use crate::Error;

use rand::Rng;
use regex_syntax::hir::{Class, HirKind};
use std::fmt;

#[derive(Clone, Debug)]
pub(crate) struct CharSet {
    // non-overlapping, ascending; never spans the surrogate gap
    ranges: Vec<(char, char)>,
    size: u32,
}

impl CharSet {
    /// Compiles the body of a `[...]` set. `negated` corresponds to the `~`
    /// prefix in the grammar.
    pub(crate) fn from_class(body: &str, negated: bool) -> Result<Self, Error> {
        let pattern = if negated {
            format!("[^{}]", body)
        } else {
            format!("[{}]", body)
        };
        Self::compile(&pattern)
    }

    /// A `'a'..'z'` range.
    pub(crate) fn from_range(lo: char, hi: char) -> Result<Self, Error> {
        if lo > hi {
            return Err(Error(ErrorRepr::EmptyClass(format!("'{}'..'{}'", lo, hi))));
        }
        Ok(Self::from_ranges(vec![(lo, hi)]))
    }

    /// The `.` wildcard. Sampling the full codepoint space makes output
    /// unreadable and rarely exercises anything new, so the wildcard draws
    /// from printable ASCII.
    pub(crate) fn any() -> Self {
        Self::from_ranges(vec![(' ', '~')])
    }

    fn compile(pattern: &str) -> Result<Self, Error> {
        let hir = regex_syntax::parse(pattern).map_err(|e| Error(ErrorRepr::Class(e)))?;
        let ranges: Vec<(char, char)> = match hir.kind() {
            // regex-syntax folds single-codepoint sets into a literal
            HirKind::Literal(lit) => match std::str::from_utf8(&lit.0) {
                Ok(s) => s.chars().map(|c| (c, c)).collect(),
                Err(_) => return Err(Error(ErrorRepr::EmptyClass(pattern.to_string()))),
            },
            HirKind::Class(Class::Unicode(cls)) => {
                cls.ranges().iter().map(|r| (r.start(), r.end())).collect()
            }
            HirKind::Class(Class::Bytes(cls)) => cls
                .ranges()
                .iter()
                .map(|r| (r.start() as char, r.end() as char))
                .collect(),
            _ => return Err(Error(ErrorRepr::EmptyClass(pattern.to_string()))),
        };
        if ranges.is_empty() {
            return Err(Error(ErrorRepr::EmptyClass(pattern.to_string())));
        }
        Ok(Self::from_ranges(ranges))
    }

    fn from_ranges(ranges: Vec<(char, char)>) -> Self {
        let size = ranges
            .iter()
            .map(|(lo, hi)| *hi as u32 - *lo as u32 + 1)
            .sum();
        Self { ranges, size }
    }

    /// Draws one character uniformly from the set.
    pub(crate) fn sample<R: Rng>(&self, rng: &mut R) -> char {
        let mut idx = rng.random_range(0..self.size);
        for (lo, hi) in &self.ranges {
            let len = *hi as u32 - *lo as u32 + 1;
            if idx < len {
                return char::from_u32(*lo as u32 + idx).unwrap_or(*lo);
            }
            idx -= len;
        }
        // idx is always consumed by the loop; size is the sum of the lengths
        self.ranges[0].0
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&c))
    }
}

/// Renders the set back in grammar notation, e.g. `[0-9a-f]`.
impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (lo, hi) in &self.ranges {
            if lo == hi {
                write_class_char(f, *lo)?;
            } else {
                write_class_char(f, *lo)?;
                write!(f, "-")?;
                write_class_char(f, *hi)?;
            }
        }
        write!(f, "]")
    }
}

fn write_class_char(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    match c {
        '\n' => write!(f, "\\n"),
        '\r' => write!(f, "\\r"),
        '\t' => write!(f, "\\t"),
        '\\' | ']' | '[' | '-' | '^' => write!(f, "\\{}", c),
        c if (c as u32) < 0x20 => write!(f, "\\u{{{:x}}}", c as u32),
        c => write!(f, "{}", c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn digit_class_samples_digits() {
        let set = CharSet::from_class("0-9", false).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..200 {
            assert!(set.sample(&mut rng).is_ascii_digit());
        }
    }

    #[test]
    fn multi_range_class_covers_all_ranges() {
        let set = CharSet::from_class("a-zA-Z_", false).unwrap();
        assert_eq!(set.size, 26 + 26 + 1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut saw_upper = false;
        let mut saw_lower = false;
        for _ in 0..500 {
            let c = set.sample(&mut rng);
            assert!(c.is_ascii_alphabetic() || c == '_');
            saw_upper |= c.is_ascii_uppercase();
            saw_lower |= c.is_ascii_lowercase();
        }
        assert!(saw_upper && saw_lower);
    }

    #[test]
    fn single_char_class_works() {
        // regex-syntax turns this into a literal rather than a class
        let set = CharSet::from_class("x", false).unwrap();
        assert_eq!(set.size, 1);
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(set.sample(&mut rng), 'x');
    }

    #[test]
    fn negated_class_excludes_its_members() {
        let set = CharSet::from_class("ab", true).unwrap();
        assert!(!set.contains('a'));
        assert!(!set.contains('b'));
        assert!(set.contains('c'));
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let c = set.sample(&mut rng);
            assert!(c != 'a' && c != 'b');
        }
    }

    #[test]
    fn escaped_members_parse() {
        let set = CharSet::from_class(" \\t\\r\\n", false).unwrap();
        assert!(set.contains(' '));
        assert!(set.contains('\t'));
        assert!(set.contains('\n'));
        assert_eq!(set.size, 4);
    }

    #[test]
    fn char_range_is_inclusive() {
        let set = CharSet::from_range('a', 'c').unwrap();
        assert_eq!(set.size, 3);
        assert!(set.contains('a') && set.contains('c'));
        assert!(!set.contains('d'));
    }

    #[test]
    fn inverted_range_is_an_error() {
        assert!(CharSet::from_range('z', 'a').is_err());
    }

    #[test]
    fn wildcard_is_printable_ascii() {
        let set = CharSet::any();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..200 {
            let c = set.sample(&mut rng);
            assert!((' '..='~').contains(&c));
        }
    }

    #[test]
    fn malformed_class_is_an_error() {
        assert!(CharSet::from_class("z-a", false).is_err());
    }

    #[test]
    fn display_round_trips_through_the_parser() {
        let set = CharSet::from_class("0-9a-f", false).unwrap();
        let rendered = set.to_string();
        let reparsed =
            CharSet::from_class(rendered.trim_start_matches('[').trim_end_matches(']'), false)
                .unwrap();
        assert_eq!(reparsed.size, set.size);
    }
}
