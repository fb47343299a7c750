//! Alias table and loop-safe expansion (`spec.md` §4.6 "Aliases", §8.1
//! "Alias loop termination").

use std::collections::{HashMap, HashSet};

/// Resolved at the head position of a simple command only; expansion
/// is textual, then the result is re-parsed (`spec.md` §4.6).
#[derive(Clone, Default)]
pub struct Aliases
{
    table: HashMap<String, String>,
}

impl Aliases
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>)
    {
        self.table.insert(name.into(), value.into());
    }

    pub fn unset(&mut self, name: &str) -> bool
    {
        self.table.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&str>
    {
        self.table.get(name).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)>
    {
        self.table.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expand `head` through the alias table repeatedly, substituting
    /// the head word of the growing command line. Stops the moment an
    /// alias name would be revisited within this expansion chain
    /// (`spec.md` §8.1), leaving the rest of the line untouched.
    ///
    /// Returns `None` if `head` is not an alias at all (no rewrite
    /// needed).
    pub fn expand_head(&self, head: &str, rest_of_line: &str) -> Option<String>
    {
        let mut seen = HashSet::new();
        let mut current = head.to_string();
        let mut replacement = None;
        loop {
            if !seen.insert(current.clone()) {
                break;
            }
            match self.table.get(&current) {
                Some(value) => {
                    replacement = Some(value.clone());
                    let first_word = value.split_whitespace().next().unwrap_or("");
                    if first_word.is_empty() || first_word == current {
                        break;
                    }
                    current = first_word.to_string();
                },
                None => break,
            }
        }
        replacement.map(|expanded| {
            if rest_of_line.is_empty() {
                expanded
            } else {
                format!("{expanded} {rest_of_line}")
            }
        })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn simple_alias_expands()
    {
        let mut aliases = Aliases::new();
        aliases.set("ll", "ls -la");
        assert_eq!(aliases.expand_head("ll", "/tmp"), Some("ls -la /tmp".to_string()));
    }

    #[test]
    fn non_alias_is_not_rewritten()
    {
        let aliases = Aliases::new();
        assert_eq!(aliases.expand_head("ls", ""), None);
    }

    #[test]
    fn self_referential_alias_does_not_loop()
    {
        let mut aliases = Aliases::new();
        aliases.set("ls", "ls -F");
        assert_eq!(aliases.expand_head("ls", "/tmp"), Some("ls -F /tmp".to_string()));
    }

    #[test]
    fn mutual_alias_loop_terminates()
    {
        let mut aliases = Aliases::new();
        aliases.set("a", "b");
        aliases.set("b", "a");
        // Expands a -> b -> a, then revisits "a": stop, keep last expansion.
        assert_eq!(aliases.expand_head("a", ""), Some("a".to_string()));
    }
}
