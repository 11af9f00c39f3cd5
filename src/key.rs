//! Classification of object field keys.
//!
//! A key containing an unescaped `*` is a pattern field; `^` before a `*`
//! makes it literal. The bare `*` key is the match-all field.
use regex::Regex;

pub const WILDCARD: char = '*';
pub const ESCAPE: char = '^';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    Fixed,
    Pattern,
    MatchAll,
}

/// True if `s` contains `c` not preceded by an odd number of consecutive `e`.
pub fn has_unescaped(s: &str, c: char, e: char) -> bool {
    let chars: Vec<char> = s.chars().collect();
    for (i, &ch) in chars.iter().enumerate() {
        if ch != c {
            continue;
        }
        let escapes = chars[..i].iter().rev().take_while(|&&p| p == e).count();
        if escapes % 2 == 0 {
            return true;
        }
    }
    false
}

pub fn classify(key: &str) -> KeyClass {
    if key.len() == 1 && key.starts_with(WILDCARD) {
        KeyClass::MatchAll
    } else if has_unescaped(key, WILDCARD, ESCAPE) {
        KeyClass::Pattern
    } else {
        KeyClass::Fixed
    }
}

/// A pattern-field key compiled for matching field names.
#[derive(Debug, Clone)]
pub struct PatternKey {
    source: String,
    regex: Regex,
}

impl PatternKey {
    /// Escapes are significant only in front of a wildcard; elsewhere `^` is literal.
    pub fn compile(key: &str) -> Result<Self, regex::Error> {
        let mut rx = String::from("^");
        let mut literal = String::new();
        let mut escapes = 0usize;
        for ch in key.chars() {
            if ch == ESCAPE {
                escapes += 1;
                continue;
            }
            if ch == WILDCARD {
                literal.extend(std::iter::repeat_n(ESCAPE, escapes / 2));
                if escapes % 2 == 1 {
                    literal.push(WILDCARD);
                } else {
                    rx.push_str(&regex::escape(&literal));
                    rx.push_str(".*");
                    literal.clear();
                }
            } else {
                literal.extend(std::iter::repeat_n(ESCAPE, escapes));
                literal.push(ch);
            }
            escapes = 0;
        }
        literal.extend(std::iter::repeat_n(ESCAPE, escapes));
        rx.push_str(&regex::escape(&literal));
        rx.push('$');
        Ok(PatternKey { source: key.to_string(), regex: Regex::new(&rx)? })
    }

    pub fn as_str(&self) -> &str { &self.source }

    pub fn matches(&self, field: &str) -> bool {
        self.regex.is_match(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescaped_detection() {
        let cases = [
            ("abc", 'd', false),
            ("abc", 'a', true),
            ("abc", 'b', true),
            ("abc", 'c', true),
            ("ab^c", 'c', false),
            ("ab^^c", 'c', true),
            ("ab^^^c", 'c', false),
        ];
        for (s, c, exp) in cases {
            assert_eq!(has_unescaped(s, c, '^'), exp, "{s} / {c}");
        }
    }

    #[test]
    fn classification() {
        assert_eq!(classify("*"), KeyClass::MatchAll);
        assert_eq!(classify("**"), KeyClass::Pattern);
        assert_eq!(classify("a*"), KeyClass::Pattern);
        assert_eq!(classify("a^*"), KeyClass::Fixed);
        assert_eq!(classify("id"), KeyClass::Fixed);
    }

    #[test]
    fn pattern_matching() {
        let p = PatternKey::compile("x_*").unwrap();
        assert!(p.matches("x_1"));
        assert!(p.matches("x_"));
        assert!(!p.matches("y_1"));

        let lit = PatternKey::compile("a^**").unwrap();
        assert!(lit.matches("a*bc"));
        assert!(!lit.matches("abc"));

        let dotted = PatternKey::compile("v.*").unwrap();
        assert!(dotted.matches("v.2"));
        assert!(!dotted.matches("vx2"));

        let caret = PatternKey::compile("^^x*").unwrap();
        assert!(caret.matches("^^x1"));
        assert!(!caret.matches("^x1"));
    }
}
