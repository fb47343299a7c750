//! Command registry (`spec.md` §2, §4.6): name → external-command
//! resolver, with lazy registration. Built-ins and functions are
//! resolved separately, in the interpreter, since they need access to
//! shell state this registry deliberately doesn't carry (`spec.md`
//! §6.5's command context is the whole contract here).
//!
//! The bodies of most real-world commands (`ls`, `grep`, ...) are out
//! of scope (`spec.md` §1, "concrete shell commands beyond a
//! representative handful"); this module registers that
//! representative handful so the end-to-end scenarios in `spec.md`
//! §8.2 are runnable, plus the registration mechanism itself.

use {
    crate::context::CommandContext,
    std::{collections::HashMap, sync::Arc},
};

/// An external command implementation: a pure function of the command
/// context contract (`spec.md` §6.5).
pub type CommandFn = dyn Fn(&mut CommandContext) -> i32 + Send + Sync;

/// Resolves a command name to an implementation. Registration is
/// lazy: nothing is registered until [`CommandRegistry::with_defaults`]
/// or an explicit [`CommandRegistry::register`] call.
#[derive(Clone)]
pub struct CommandRegistry
{
    commands: HashMap<String, Arc<CommandFn>>,
}

impl CommandRegistry
{
    pub fn new() -> Self
    {
        Self { commands: HashMap::new() }
    }

    /// A registry pre-populated with the representative external
    /// commands this workspace ships.
    pub fn with_defaults() -> Self
    {
        let mut registry = Self::new();
        registry.register("cat", Arc::new(cmd_cat));
        registry.register("tr", Arc::new(cmd_tr));
        registry.register("wc", Arc::new(cmd_wc));
        registry.register("head", Arc::new(cmd_head));
        registry.register("grep", Arc::new(cmd_grep));
        registry.register("sleep", Arc::new(cmd_sleep));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, command: Arc<CommandFn>)
    {
        self.commands.insert(name.into(), command);
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandFn>>
    {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool
    {
        self.commands.contains_key(name)
    }

    /// Every registered name, for shell completion.
    pub fn names(&self) -> Vec<String>
    {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for CommandRegistry
{
    fn default() -> Self
    {
        Self::with_defaults()
    }
}

fn cmd_cat(ctx: &mut CommandContext) -> i32
{
    if ctx.args.is_empty() {
        let input = ctx.stdin_read_all();
        ctx.stdout.write(&input);
        return 0;
    }
    let mut status = 0;
    for path in ctx.args.clone() {
        match ctx.vfs.read_file_string(&path) {
            Ok(contents) => ctx.stdout.write(&contents),
            Err(err) => {
                ctx.stderr.write(&format!("cat: {path}: {err}\n"));
                status = 1;
            },
        }
    }
    status
}

fn cmd_tr(ctx: &mut CommandContext) -> i32
{
    if ctx.args.len() != 2 {
        ctx.stderr.write("tr: usage: tr SET1 SET2\n");
        return 1;
    }
    let from = expand_tr_set(&ctx.args[0]);
    let to = expand_tr_set(&ctx.args[1]);
    let input = ctx.stdin_read_all();
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match from.iter().position(|&f| f == c) {
            Some(idx) => out.push(*to.get(idx).or_else(|| to.last()).unwrap_or(&c)),
            None => out.push(c),
        }
    }
    ctx.stdout.write(&out);
    0
}

/// Expand `a-z`-style ranges in a `tr` character set argument.
fn expand_tr_set(spec: &str) -> Vec<char>
{
    let chars: Vec<char> = spec.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let (lo, hi) = (chars[i], chars[i + 2]);
            if lo <= hi {
                out.extend((lo as u32..=hi as u32).filter_map(char::from_u32));
                i += 3;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn cmd_wc(ctx: &mut CommandContext) -> i32
{
    let input = ctx.stdin_read_all();
    let lines = input.lines().count();
    let words = input.split_whitespace().count();
    let bytes = input.len();
    ctx.stdout.write(&format!("{lines} {words} {bytes}\n"));
    0
}

fn cmd_head(ctx: &mut CommandContext) -> i32
{
    let n: usize = ctx
        .args
        .iter()
        .position(|a| a == "-n")
        .and_then(|i| ctx.args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);
    let input = ctx.stdin_read_all();
    for line in input.lines().take(n) {
        ctx.stdout.write(line);
        ctx.stdout.write("\n");
    }
    0
}

fn cmd_grep(ctx: &mut CommandContext) -> i32
{
    let Some(needle) = ctx.args.first().cloned() else {
        ctx.stderr.write("grep: usage: grep PATTERN\n");
        return 2;
    };
    let input = ctx.stdin_read_all();
    let mut found = false;
    for line in input.lines() {
        if line.contains(&needle) {
            ctx.stdout.write(line);
            ctx.stdout.write("\n");
            found = true;
        }
    }
    if found {
        0
    } else {
        1
    }
}

fn cmd_sleep(ctx: &mut CommandContext) -> i32
{
    let secs: f64 = ctx.args.first().and_then(|s| s.parse().ok()).unwrap_or(0.0);
    let deadline = std::time::Duration::from_secs_f64(secs.max(0.0));
    let poll = std::time::Duration::from_millis(20);
    let mut elapsed = std::time::Duration::ZERO;
    while elapsed < deadline {
        if ctx.signal.is_cancelled() {
            return 130;
        }
        std::thread::sleep(poll.min(deadline - elapsed));
        elapsed += poll;
    }
    0
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::context::{CapturingWriter, StringReader};
    use sandbox_process::Cancel;
    use sandbox_vfs::Vfs;
    use std::sync::Arc as StdArc;

    fn ctx<'a>(
        args: Vec<String>,
        stdout: &'a CapturingWriter,
        stderr: &'a CapturingWriter,
        stdin: Option<&'a mut dyn crate::context::Reader>,
        vfs: &'a StdArc<Vfs>,
    ) -> CommandContext<'a>
    {
        CommandContext {
            args,
            env: Default::default(),
            cwd: "/".to_string(),
            vfs: vfs.clone(),
            stdout,
            stderr,
            stdin,
            signal: Cancel::new(),
        }
    }

    #[test]
    fn tr_translates_case()
    {
        let vfs = StdArc::new(Vfs::new());
        let out = CapturingWriter::new();
        let err = CapturingWriter::new();
        let mut reader = StringReader::new("hello world\n");
        let mut c = ctx(vec!["a-z".to_string(), "A-Z".to_string()], &out, &err, Some(&mut reader), &vfs);
        assert_eq!(cmd_tr(&mut c), 0);
        assert_eq!(out.contents(), "HELLO WORLD\n");
    }

    #[test]
    fn grep_filters_matching_lines()
    {
        let vfs = StdArc::new(Vfs::new());
        let out = CapturingWriter::new();
        let err = CapturingWriter::new();
        let mut reader = StringReader::new("apple\nbanana\navocado\n");
        let mut c = ctx(vec!["av".to_string()], &out, &err, Some(&mut reader), &vfs);
        assert_eq!(cmd_grep(&mut c), 0);
        assert_eq!(out.contents(), "avocado\n");
    }

    #[test]
    fn cat_with_no_args_echoes_stdin()
    {
        let vfs = StdArc::new(Vfs::new());
        let out = CapturingWriter::new();
        let err = CapturingWriter::new();
        let mut reader = StringReader::new("abc");
        let mut c = ctx(vec![], &out, &err, Some(&mut reader), &vfs);
        assert_eq!(cmd_cat(&mut c), 0);
        assert_eq!(out.contents(), "abc");
    }

    #[test]
    fn unknown_name_is_not_registered()
    {
        let registry = CommandRegistry::with_defaults();
        assert!(!registry.contains("totally_unknown_binary"));
        assert!(registry.contains("tr"));
    }
}
