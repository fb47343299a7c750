//! Word expansion (`spec.md` §4.5): tilde, variable, command
//! substitution, arithmetic, and glob.

use {
    crate::{arithmetic, ast::*, environment::Environment},
    sandbox_util::glob::Pattern,
    sandbox_vfs::Vfs,
    thiserror::Error,
};

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ExpandError
{
    #[error("{0}: parameter null or not set")]
    UnsetParameter(String),
    #[error("bad substitution: {0}")]
    BadSubstitution(String),
    #[error(transparent)]
    Arithmetic(#[from] arithmetic::ArithError),
}

/// Runs a command and returns its captured stdout (for `$(...)`), kept
/// as a trait so the expander does not depend on the interpreter
/// directly (it would otherwise need `Interpreter` to depend back on
/// `Expander`, a cycle within one crate that's cleaner to cut with a
/// seam here).
pub trait Substituter
{
    fn substitute_command(&mut self, command_text: &str) -> String;
}

/// Expand a word to exactly one string: used for redirect targets, the
/// `case` word and patterns, and assignment right-hand sides
/// (`spec.md` §4.5).
pub fn expand_word_single(
    word: &Word,
    env: &mut Environment,
    sub: &mut dyn Substituter,
) -> Result<String, ExpandError>
{
    let mut out = String::new();
    for (i, part) in word.0.iter().enumerate() {
        out.push_str(&expand_part(part, i == 0, env, sub)?);
    }
    Ok(out)
}

/// Expand a word to zero or more arguments: used for command words and
/// `for ... in` list items, where an unquoted glob pattern may fan out
/// (`spec.md` §4.5).
pub fn expand_word_multi(
    word: &Word,
    env: &mut Environment,
    sub: &mut dyn Substituter,
    vfs: &Vfs,
) -> Result<Vec<String>, ExpandError>
{
    let expanded = expand_word_single(word, env, sub)?;
    if word.is_fully_unquoted() {
        let pattern = Pattern::parse(&expanded);
        if pattern.has_wildcards() {
            let mut matches = glob_match(&expanded, vfs);
            if !matches.is_empty() {
                matches.sort();
                return Ok(matches);
            }
        }
    }
    Ok(vec![expanded])
}

fn glob_match(raw_pattern: &str, vfs: &Vfs) -> Vec<String>
{
    // Glob against the VFS directory containing the pattern: split the
    // pattern into a fixed directory prefix and the final (possibly
    // wildcarded) path segment, matching `spec.md` §4.5's single-
    // segment glob scope (scenario §8.2 #3 globs one directory level).
    let (dir, segment_pattern) = match raw_pattern.rfind('/') {
        Some(idx) => (&raw_pattern[..idx.max(1)], &raw_pattern[idx + 1..]),
        None => (".", raw_pattern),
    };
    let dir = if dir.is_empty() { "/" } else { dir };
    let pattern = Pattern::parse(segment_pattern);
    let Ok(entries) = vfs.readdir(dir) else { return Vec::new() };
    let hidden_ok = matches!(pattern.leading_literal(), Some('.'));
    entries
        .into_iter()
        .filter(|name| hidden_ok || !name.starts_with('.'))
        .filter(|name| pattern.matches(name))
        .map(|name| if dir == "/" { format!("/{name}") } else { format!("{dir}/{name}") })
        .collect()
}

fn expand_part(
    part: &WordPart,
    at_word_start: bool,
    env: &mut Environment,
    sub: &mut dyn Substituter,
) -> Result<String, ExpandError>
{
    match part.quoting {
        Quoting::Single => Ok(part.text.clone()),
        Quoting::Double => expand_text(&part.text, env, sub),
        Quoting::None => {
            let text = expand_text(&part.text, env, sub)?;
            Ok(if at_word_start { expand_tilde(&text, env) } else { text })
        },
    }
}

fn expand_tilde(text: &str, env: &Environment) -> String
{
    if let Some(rest) = text.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') {
            let home = env.get("HOME").unwrap_or("/").to_string();
            return format!("{home}{rest}");
        }
    }
    text.to_string()
}

/// Scan raw (not-yet-expanded) text for `$...` expansions, leaving
/// every other character untouched. The lexer already guarantees any
/// `$(...)`/`$((...))`/`${...}` span in `text` is balanced.
fn expand_text(text: &str, env: &mut Environment, sub: &mut dyn Substituter) -> Result<String, ExpandError>
{
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '$' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        match chars[i + 1] {
            '(' if chars.get(i + 2) == Some(&'(') => {
                let (inner, next) = read_balanced(&chars, i + 3, '(', ')', 2)?;
                let value = arithmetic::eval(&inner, env)?;
                out.push_str(&value.to_string());
                i = next;
            },
            '(' => {
                let (inner, next) = read_balanced(&chars, i + 2, '(', ')', 1)?;
                let mut captured = sub.substitute_command(&inner);
                while captured.ends_with('\n') {
                    captured.pop();
                }
                out.push_str(&captured);
                i = next;
            },
            '{' => {
                let (inner, next) = read_balanced(&chars, i + 2, '{', '}', 1)?;
                out.push_str(&expand_braced(&inner, env, sub)?);
                i = next;
            },
            _ => {
                let (name, next) = read_bare_name(&chars, i + 1);
                if name.is_empty() {
                    out.push('$');
                    i += 1;
                } else {
                    out.push_str(&lookup(&name, env));
                    i = next;
                }
            },
        }
    }
    Ok(out)
}

/// Consume characters starting at `start` until `depth` closes, where
/// `open`/`close` are already `depth` deep. Returns the inner text
/// (excluding the final closing delimiters) and the index just past
/// them.
fn read_balanced(chars: &[char], start: usize, open: char, close: char, mut depth: usize) -> Result<(String, usize), ExpandError>
{
    let mut inner = String::new();
    let mut i = start;
    while i < chars.len() {
        if chars[i] == open {
            depth += 1;
            inner.push(chars[i]);
        } else if chars[i] == close {
            depth -= 1;
            if depth == 0 {
                return Ok((inner, i + 1));
            }
            inner.push(chars[i]);
        } else {
            inner.push(chars[i]);
        }
        i += 1;
    }
    Err(ExpandError::BadSubstitution(inner))
}

fn read_bare_name(chars: &[char], start: usize) -> (String, usize)
{
    if start >= chars.len() {
        return (String::new(), start);
    }
    let c = chars[start];
    if matches!(c, '?' | '#' | '@' | '*' | '$' | '!') {
        return (c.to_string(), start + 1);
    }
    if c.is_ascii_digit() {
        return (c.to_string(), start + 1);
    }
    if c.is_alphabetic() || c == '_' {
        let mut end = start;
        while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
            end += 1;
        }
        return (chars[start..end].iter().collect(), end);
    }
    (String::new(), start)
}

fn lookup(name: &str, env: &Environment) -> String
{
    match name {
        "?" => env.last_exit_code.to_string(),
        "#" => env.positional_count().to_string(),
        "@" | "*" => env.positional().join(" "),
        _ => env.get(name).unwrap_or("").to_string(),
    }
}

/// Handle the `${...}` forms beyond a bare name (`spec.md` §4.5 and
/// SPEC_FULL §11's extended set: substring removal, default/alt
/// values).
fn expand_braced(inner: &str, env: &mut Environment, sub: &mut dyn Substituter) -> Result<String, ExpandError>
{
    if let Some(name) = inner.strip_prefix('#') {
        if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Ok(lookup(name, env).chars().count().to_string());
        }
    }
    for (op, op_len) in [(":-", 2), (":+", 2), (":=", 2), (":?", 2), ("##", 2), ("#", 1), ("%%", 2), ("%", 1)] {
        if let Some(idx) = inner.find(op) {
            let name = &inner[..idx];
            if !is_valid_name(name) {
                continue;
            }
            let word_text = &inner[idx + op_len..];
            let current = env.get(name).map(|s| s.to_string());
            let is_unset_or_empty = current.as_deref().map_or(true, |v| v.is_empty());
            return match op {
                ":-" => {
                    if is_unset_or_empty {
                        expand_text(word_text, env, sub)
                    } else {
                        Ok(current.unwrap())
                    }
                },
                ":+" => {
                    if is_unset_or_empty {
                        Ok(String::new())
                    } else {
                        expand_text(word_text, env, sub)
                    }
                },
                ":=" => {
                    if is_unset_or_empty {
                        let value = expand_text(word_text, env, sub)?;
                        env.set(name, value.clone());
                        Ok(value)
                    } else {
                        Ok(current.unwrap())
                    }
                },
                ":?" => {
                    if is_unset_or_empty {
                        let message = expand_text(word_text, env, sub)?;
                        Err(ExpandError::UnsetParameter(if message.is_empty() {
                            format!("{name}: parameter null or not set")
                        } else {
                            message
                        }))
                    } else {
                        Ok(current.unwrap())
                    }
                },
                "#" | "##" => {
                    let value = current.unwrap_or_default();
                    let pattern = Pattern::parse(word_text);
                    Ok(strip_prefix_matching(&value, &pattern, op == "##"))
                },
                "%" | "%%" => {
                    let value = current.unwrap_or_default();
                    let pattern = Pattern::parse(word_text);
                    Ok(strip_suffix_matching(&value, &pattern, op == "%%"))
                },
                _ => unreachable!(),
            };
        }
    }
    if is_valid_name(inner) {
        return Ok(lookup(inner, env));
    }
    Err(ExpandError::BadSubstitution(inner.to_string()))
}

fn is_valid_name(name: &str) -> bool
{
    !name.is_empty()
        && (name.chars().next().unwrap().is_alphabetic() || name.chars().next().unwrap() == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn strip_prefix_matching(value: &str, pattern: &Pattern, longest: bool) -> String
{
    let chars: Vec<char> = value.chars().collect();
    let range: Box<dyn Iterator<Item = usize>> =
        if longest { Box::new((0..=chars.len()).rev()) } else { Box::new(0..=chars.len()) };
    for i in range {
        let prefix: String = chars[..i].iter().collect();
        if pattern.matches(&prefix) {
            return chars[i..].iter().collect();
        }
    }
    value.to_string()
}

fn strip_suffix_matching(value: &str, pattern: &Pattern, longest: bool) -> String
{
    let chars: Vec<char> = value.chars().collect();
    let range: Box<dyn Iterator<Item = usize>> =
        if longest { Box::new((0..=chars.len()).rev()) } else { Box::new(0..=chars.len()) };
    for i in range {
        let suffix: String = chars[chars.len() - i..].iter().collect();
        if pattern.matches(&suffix) {
            return chars[..chars.len() - i].iter().collect();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests
{
    use super::*;

    struct NoopSubstituter;
    impl Substituter for NoopSubstituter
    {
        fn substitute_command(&mut self, _command_text: &str) -> String
        {
            String::new()
        }
    }

    struct EchoSubstituter;
    impl Substituter for EchoSubstituter
    {
        fn substitute_command(&mut self, command_text: &str) -> String
        {
            format!("ran:{command_text}\n")
        }
    }

    #[test]
    fn single_quoted_is_literal()
    {
        let mut env = Environment::new("/");
        let word = Word(vec![WordPart { text: "$HOME".to_string(), quoting: Quoting::Single }]);
        assert_eq!(expand_word_single(&word, &mut env, &mut NoopSubstituter).unwrap(), "$HOME");
    }

    #[test]
    fn bare_variable_expansion()
    {
        let mut env = Environment::new("/");
        env.set("FOO", "bar");
        let word = Word::literal("$FOO");
        assert_eq!(expand_word_single(&word, &mut env, &mut NoopSubstituter).unwrap(), "bar");
    }

    #[test]
    fn braced_variable_expansion()
    {
        let mut env = Environment::new("/");
        env.set("FOO", "bar");
        let word = Word::literal("${FOO}baz");
        assert_eq!(expand_word_single(&word, &mut env, &mut NoopSubstituter).unwrap(), "barbaz");
    }

    #[test]
    fn default_value_operator()
    {
        let mut env = Environment::new("/");
        let word = Word::literal("${UNSET:-fallback}");
        assert_eq!(expand_word_single(&word, &mut env, &mut NoopSubstituter).unwrap(), "fallback");
    }

    #[test]
    fn alt_value_operator()
    {
        let mut env = Environment::new("/");
        env.set("FOO", "x");
        let word = Word::literal("${FOO:+yes}");
        assert_eq!(expand_word_single(&word, &mut env, &mut NoopSubstituter).unwrap(), "yes");
    }

    #[test]
    fn length_operator()
    {
        let mut env = Environment::new("/");
        env.set("FOO", "hello");
        let word = Word::literal("${#FOO}");
        assert_eq!(expand_word_single(&word, &mut env, &mut NoopSubstituter).unwrap(), "5");
    }

    #[test]
    fn prefix_and_suffix_strip()
    {
        let mut env = Environment::new("/");
        env.set("FOO", "foo.tar.gz");
        assert_eq!(
            expand_word_single(&Word::literal("${FOO%.*}"), &mut env, &mut NoopSubstituter).unwrap(),
            "foo.tar"
        );
        assert_eq!(
            expand_word_single(&Word::literal("${FOO%%.*}"), &mut env, &mut NoopSubstituter).unwrap(),
            "foo"
        );
    }

    #[test]
    fn command_substitution_strips_trailing_newlines_only()
    {
        let mut env = Environment::new("/");
        let word = Word::literal("$(echo hi)");
        assert_eq!(expand_word_single(&word, &mut env, &mut EchoSubstituter).unwrap(), "ran:echo hi");
    }

    #[test]
    fn arithmetic_expansion()
    {
        let mut env = Environment::new("/");
        let word = Word::literal("$((2 + 3 * 4))");
        assert_eq!(expand_word_single(&word, &mut env, &mut NoopSubstituter).unwrap(), "14");
    }

    #[test]
    fn tilde_expands_only_at_word_start_when_unquoted()
    {
        let mut env = Environment::new("/");
        env.set("HOME", "/home/user");
        assert_eq!(expand_word_single(&Word::literal("~/x"), &mut env, &mut NoopSubstituter).unwrap(), "/home/user/x");
        assert_eq!(expand_word_single(&Word::literal("a~b"), &mut env, &mut NoopSubstituter).unwrap(), "a~b");
    }

    #[test]
    fn last_exit_code_variable()
    {
        let mut env = Environment::new("/");
        env.last_exit_code = 7;
        assert_eq!(expand_word_single(&Word::literal("$?"), &mut env, &mut NoopSubstituter).unwrap(), "7");
    }
}
