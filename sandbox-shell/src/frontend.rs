//! Shell front-end: prompt rendering, command history, and completion
//! (`spec.md` §4 component table "Shell front-end"; SPEC_FULL.md §10.4).
//!
//! This workspace has no terminal-raw-mode dependency: per `spec.md`
//! §6.3 the front-end is driven over a newline-delimited-JSON duplex
//! stream, so there is no raw TTY to put in cbreak mode. [`Prompt`] and
//! [`History`] operate purely on strings.

use std::collections::VecDeque;

/// Renders a shell prompt from the current working directory and the
/// last command's exit status (SPEC_FULL.md §10.4).
pub struct Prompt
{
    /// Shown before the `$`/`#` when the last command failed, e.g. `[1]`.
    pub show_exit_status: bool,
}

impl Prompt
{
    pub fn new() -> Self
    {
        Self { show_exit_status: true }
    }

    /// Render `cwd`/`exit_code` into a one-line prompt string, e.g.
    /// `/home/user $ ` or `[127] /home/user $ ` after a failure.
    pub fn render(&self, cwd: &str, exit_code: i32) -> String
    {
        if self.show_exit_status && exit_code != 0 {
            format!("[{exit_code}] {cwd} $ ")
        } else {
            format!("{cwd} $ ")
        }
    }
}

impl Default for Prompt
{
    fn default() -> Self
    {
        Self::new()
    }
}

/// A bounded ring buffer of past input lines, oldest evicted first once
/// `capacity` is exceeded. Backs both line-recall in the front-end and
/// the `history` builtin (`spec.md` §6.1).
pub struct History
{
    lines: VecDeque<String>,
    capacity: usize,
}

impl History
{
    pub fn new(capacity: usize) -> Self
    {
        Self { lines: VecDeque::with_capacity(capacity.min(1024)), capacity }
    }

    pub fn push(&mut self, line: impl Into<String>)
    {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &String>
    {
        self.lines.iter()
    }

    pub fn len(&self) -> usize
    {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.lines.is_empty()
    }
}

impl Default for History
{
    /// `spec.md` doesn't name a limit; 1000 matches common shell
    /// defaults (bash's `HISTSIZE`).
    fn default() -> Self
    {
        Self::new(1000)
    }
}

/// Complete `partial_word` against VFS entries in `dir` and, if
/// `partial_word` has no path separator, against `command_names`
/// (SPEC_FULL.md §10.4).
pub fn complete(partial_word: &str, dir_entries: &[String], command_names: &[String]) -> Vec<String>
{
    let mut matches: Vec<String> = Vec::new();
    if !partial_word.contains('/') {
        matches.extend(command_names.iter().filter(|name| name.starts_with(partial_word)).cloned());
    }
    matches.extend(dir_entries.iter().filter(|name| name.starts_with(partial_word)).cloned());
    matches.sort();
    matches.dedup();
    matches
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn prompt_shows_exit_status_only_on_failure()
    {
        let prompt = Prompt::new();
        assert_eq!(prompt.render("/home", 0), "/home $ ");
        assert_eq!(prompt.render("/home", 1), "[1] /home $ ");
    }

    #[test]
    fn history_evicts_oldest_past_capacity()
    {
        let mut history = History::new(2);
        history.push("a");
        history.push("b");
        history.push("c");
        let lines: Vec<&String> = history.iter().collect();
        assert_eq!(lines, vec!["b", "c"]);
    }

    #[test]
    fn completion_matches_commands_and_vfs_entries()
    {
        let dirs = vec!["greet.sh".to_string(), "grep_notes.txt".to_string()];
        let commands = vec!["grep".to_string(), "echo".to_string()];
        let matches = complete("gre", &dirs, &commands);
        assert_eq!(matches, vec!["greet.sh", "grep", "grep_notes.txt"]);
    }
}
