//! Shell glob (`*`, `?`, `[...]`) and `case`-pattern matching.
//!
//! This is a hand-rolled matcher rather than a translation to [`regex`],
//! matching the teacher workspace's preference for small hand-rolled
//! matching over pulling in a general-purpose engine when the grammar is
//! this small (see `snowflake-util::basename`, which validates path
//! components by hand rather than with a regex).

/// A single glob pattern segment (one path component, or a `case` pattern).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pattern(Vec<Atom>);

#[derive(Clone, Debug, Eq, PartialEq)]
enum Atom
{
    Literal(char),
    AnyChar,
    AnyString,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

impl Pattern
{
    /// Parse a glob pattern.
    ///
    /// Unmatched brackets are treated as literal characters, matching
    /// common shell leniency.
    pub fn parse(pattern: &str) -> Self
    {
        let mut atoms = Vec::new();
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => atoms.push(Atom::AnyString),
                '?' => atoms.push(Atom::AnyChar),
                '[' => {
                    if let Some(class) = parse_class(&mut chars) {
                        atoms.push(class);
                    } else {
                        atoms.push(Atom::Literal('['));
                    }
                },
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        atoms.push(Atom::Literal(escaped));
                    } else {
                        atoms.push(Atom::Literal('\\'));
                    }
                },
                c => atoms.push(Atom::Literal(c)),
            }
        }
        Pattern(atoms)
    }

    /// Whether this pattern contains any wildcard atoms.
    pub fn has_wildcards(&self) -> bool
    {
        self.0.iter().any(|a| !matches!(a, Atom::Literal(_)))
    }

    /// The pattern's leading literal character, if its first atom is a
    /// plain literal (used to decide whether a leading `.` is eligible to
    /// match hidden entries).
    pub fn leading_literal(&self) -> Option<char>
    {
        match self.0.first() {
            Some(Atom::Literal(c)) => Some(*c),
            _ => None,
        }
    }

    /// Match this pattern against a whole string (anchored both ends).
    pub fn matches(&self, text: &str) -> bool
    {
        let text: Vec<char> = text.chars().collect();
        match_atoms(&self.0, &text)
    }
}

fn parse_class(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<Atom>
{
    let mut lookahead = chars.clone();
    let negated = matches!(lookahead.peek(), Some('!') | Some('^'));
    if negated {
        lookahead.next();
    }

    let mut ranges = Vec::new();
    let mut first = true;
    loop {
        let c = lookahead.next()?;
        if c == ']' && !first {
            break;
        }
        first = false;

        let mut lo = c;
        if lo == ']' {
            // `[]...]`: a literal `]` as the first class member.
        }
        let mut hi = lo;
        if lookahead.peek() == Some(&'-') {
            let mut after_dash = lookahead.clone();
            after_dash.next();
            if let Some(&end) = after_dash.peek() {
                if end != ']' {
                    lookahead.next();
                    hi = lookahead.next()?;
                }
            }
        }
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        ranges.push((lo, hi));
    }

    *chars = lookahead;
    Some(Atom::Class { negated, ranges })
}

fn match_atoms(atoms: &[Atom], text: &[char]) -> bool
{
    match atoms.first() {
        None => text.is_empty(),
        Some(Atom::Literal(c)) => {
            matches!(text.first(), Some(t) if t == c) && match_atoms(&atoms[1..], &text[1..])
        },
        Some(Atom::AnyChar) => {
            !text.is_empty() && match_atoms(&atoms[1..], &text[1..])
        },
        Some(Atom::Class { negated, ranges }) => {
            match text.first() {
                Some(&t) => {
                    let in_class = ranges.iter().any(|&(lo, hi)| lo <= t && t <= hi);
                    (in_class != *negated) && match_atoms(&atoms[1..], &text[1..])
                },
                None => false,
            }
        },
        Some(Atom::AnyString) => {
            // Try consuming zero or more chars, from shortest to longest.
            for i in 0..=text.len() {
                if match_atoms(&atoms[1..], &text[i..]) {
                    return true;
                }
            }
            false
        },
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn literal_match()
    {
        assert!(Pattern::parse("foo.txt").matches("foo.txt"));
        assert!(!Pattern::parse("foo.txt").matches("foo.tx"));
    }

    #[test]
    fn star_and_question()
    {
        assert!(Pattern::parse("*.txt").matches("a.txt"));
        assert!(Pattern::parse("*.txt").matches(".txt"));
        assert!(Pattern::parse("a?c").matches("abc"));
        assert!(!Pattern::parse("a?c").matches("ac"));
        assert!(Pattern::parse("*").matches(""));
        assert!(Pattern::parse("*").matches("anything"));
    }

    #[test]
    fn character_class()
    {
        assert!(Pattern::parse("[abc].txt").matches("a.txt"));
        assert!(!Pattern::parse("[abc].txt").matches("d.txt"));
        assert!(Pattern::parse("[a-c].txt").matches("b.txt"));
        assert!(Pattern::parse("[!a-c].txt").matches("d.txt"));
        assert!(!Pattern::parse("[!a-c].txt").matches("a.txt"));
    }

    #[test]
    fn leading_literal_and_wildcards()
    {
        let hidden_pattern = Pattern::parse(".*");
        assert_eq!(hidden_pattern.leading_literal(), Some('.'));
        let star_pattern = Pattern::parse("*.txt");
        assert_eq!(star_pattern.leading_literal(), None);
        assert!(star_pattern.has_wildcards());
        assert!(!Pattern::parse("plain").has_wildcards());
    }
}
