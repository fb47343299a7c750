//! Interpreter: executes the parsed AST (`spec.md` §4.6).
//!
//! A pipeline of one stage runs inline, on the same thread, so
//! environment-mutating builtins (`cd`, `export`, assignments) take
//! effect in the shell that issued them. A pipeline of two or more
//! stages spawns one scoped thread per stage, each working against its
//! own clone of the [`Environment`] — matching how a real shell runs
//! every non-final pipeline stage in a subshell, whose variable
//! mutations do not leak back to the parent. Command substitution
//! (`$(...)`) runs the same way, against an owned clone, so it never
//! needs a second live `&mut Environment` borrow alongside the one the
//! expander already holds (`spec.md` §4.5, §4.6).

use {
    crate::{
        alias::Aliases,
        ast::*,
        builtins,
        context::{CapturingWriter, ChannelReader, ChannelWriter, CommandContext, EmptyReader, Reader, StringReader, Writer},
        environment::Environment,
        expand::{self, ExpandError, Substituter},
        frontend::History,
        lexer::{Lexer, Token},
        parser::{self, ParseError},
        registry::CommandRegistry,
    },
    sandbox_process::{Cancel, JobId, Registry, Spawn},
    sandbox_vfs::Vfs,
    std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    },
};

/// A control-flow signal thrown by a builtin, caught by the nearest
/// enclosing construct (`spec.md` §4.6, §9: "exceptions for control
/// flow become explicit return variants").
#[derive(Clone, Copy, Debug)]
pub enum ControlSignal
{
    /// `break [N]`: exit the innermost `N` loops.
    Break(u32),
    /// `continue [N]`: skip to the next iteration of the `N`th enclosing
    /// loop.
    Continue(u32),
    /// `return [CODE]`: exit the current function with `CODE`.
    Return(i32),
}

/// The result of executing part of the AST: either an ordinary exit
/// code, or an uncaught control-flow signal propagating upward.
#[derive(Clone, Copy, Debug)]
pub enum Flow
{
    Code(i32),
    Signal(ControlSignal),
}

impl Flow
{
    pub fn code(self) -> i32
    {
        match self {
            Flow::Code(c) => c,
            Flow::Signal(ControlSignal::Return(c)) => c,
            // An uncaught break/continue is a no-op that preserves the
            // prior exit code (`spec.md` §4.6: "Uncaught break/continue
            // at script top-level is a no-op").
            Flow::Signal(_) => 0,
        }
    }

    fn is_signal(self) -> bool
    {
        matches!(self, Flow::Signal(_))
    }
}

fn negate_if(negated: bool, flow: Flow) -> Flow
{
    match flow {
        Flow::Code(c) if negated => Flow::Code(if c == 0 { 1 } else { 0 }),
        other => other,
    }
}

/// Everything the shell needs to run commands: variable state, the
/// alias table, defined functions, and handles to the VFS and process
/// registry it shares with every command (`spec.md` §3.3 "Session").
pub struct Interpreter
{
    pub env: Environment,
    pub aliases: Aliases,
    pub functions: HashMap<String, Command>,
    pub vfs: Arc<Vfs>,
    pub processes: Arc<Registry>,
    pub commands: CommandRegistry,
    pub history: History,
    pub shell_cancel: Cancel,
    /// Output captured from a finished background job, keyed by job id,
    /// until the next prompt flushes it (`spec.md` §5: background jobs
    /// are reported only at prompt re-display, batched).
    background_output: Arc<Mutex<HashMap<JobId, (String, String)>>>,
    /// Set on the subshell `spawn_background` hands off to its thread,
    /// and inherited by every subshell cloned from it in turn (pipeline
    /// stages, command substitution nested inside a backgrounded list).
    /// External commands run under it do not register their own process
    /// — the single job process `spawn_background` already registered
    /// stands in for the whole list (`spec.md` §4.7 "background jobs
    /// register a single 'job process'").
    is_background_subshell: bool,
}

impl Interpreter
{
    pub fn new(vfs: Arc<Vfs>, processes: Arc<Registry>) -> Self
    {
        processes.register_shell("/".to_string(), Vec::new());
        Self {
            env: Environment::new("/"),
            aliases: Aliases::new(),
            functions: HashMap::new(),
            vfs,
            processes,
            commands: CommandRegistry::with_defaults(),
            history: History::default(),
            shell_cancel: Cancel::new(),
            background_output: Arc::new(Mutex::new(HashMap::new())),
            is_background_subshell: false,
        }
    }

    /// Parse and run one input line to completion, recording it in
    /// history (`spec.md` §6.1, §10.4). A parse failure is reported on
    /// `stderr` with exit code 2; the shell itself keeps running
    /// (`spec.md` §7).
    pub fn run_line(&mut self, line: &str, stdout: &dyn Writer, stderr: &dyn Writer) -> i32
    {
        if !line.trim().is_empty() {
            self.history.push(line);
        }
        self.report_finished_background_jobs(stdout);
        let script = match parser::parse(line) {
            Ok(script) => script,
            Err(ParseError::EmptyCommand) => return self.env.last_exit_code,
            Err(err) => {
                stderr.write(&format!("sandbox-shell: parse error: {err}\n"));
                self.env.last_exit_code = 2;
                return 2;
            },
        };
        let flow = self.exec_compound_list(&script.0, stdout, stderr);
        self.env.last_exit_code = flow.code();
        self.env.last_exit_code
    }

    /// Print `[n]  Done    <command>` for every background job that
    /// finished since the last prompt.
    pub fn report_finished_background_jobs(&self, stdout: &dyn Writer)
    {
        for job in self.processes.unreported_done_jobs() {
            if let Some((out, err)) = self.background_output.lock().unwrap().remove(&job.job_id) {
                stdout.write(&out);
                stdout.write(&err);
            }
            stdout.write(&format!("[{}]  Done    {}\n", job.job_id, job.command_text));
            self.processes.mark_job_reported(job.job_id);
        }
    }

    fn exec_compound_list(&mut self, list: &CompoundList, stdout: &dyn Writer, stderr: &dyn Writer) -> Flow
    {
        let mut last = Flow::Code(0);
        for entry in &list.0 {
            last = self.exec_list(entry, stdout, stderr);
            if last.is_signal() {
                return last;
            }
        }
        last
    }

    fn exec_list(&mut self, list: &List, stdout: &dyn Writer, stderr: &dyn Writer) -> Flow
    {
        if list.background {
            self.spawn_background(list, stdout);
            return Flow::Code(0);
        }
        let mut flow = self.exec_pipeline(&list.first, stdout, stderr);
        for (connector, pipeline) in &list.rest {
            if flow.is_signal() {
                return flow;
            }
            let should_run = match connector {
                Connector::And => flow.code() == 0,
                Connector::Or => flow.code() != 0,
                Connector::Semi => true,
            };
            if should_run {
                flow = self.exec_pipeline(pipeline, stdout, stderr);
            }
        }
        flow
    }

    /// Background a whole list as one job with a single cancellation
    /// token covering every stage (`spec.md` §4.6 "`cmd &`", §4.7
    /// "background jobs register a single 'job process'").
    fn spawn_background(&mut self, list: &List, stdout: &dyn Writer)
    {
        let job_cancel = self.shell_cancel.child();
        let pid = self.processes.spawn(Spawn {
            command: "job".to_string(),
            args: Vec::new(),
            cwd: self.env.cwd.clone(),
            env: self.env.all_snapshot().into_iter().collect(),
            is_foreground: false,
            ppid: None,
            cancel: job_cancel.clone(),
        });
        let job_id = self.processes.create_job(vec![pid], render_list(list), job_cancel.clone());
        stdout.write(&format!("[{job_id}] {pid}\n"));

        let mut sub = self.clone_for_subshell();
        sub.shell_cancel = job_cancel;
        sub.is_background_subshell = true;
        let compound = CompoundList(vec![List { first: list.first.clone(), rest: list.rest.clone(), background: false }]);
        let processes = self.processes.clone();
        let background_output = self.background_output.clone();
        std::thread::spawn(move || {
            let out = CapturingWriter::new();
            let err = CapturingWriter::new();
            let flow = sub.exec_compound_list(&compound, &out, &err);
            processes.complete(pid, flow.code());
            background_output.lock().unwrap().insert(job_id, (out.contents(), err.contents()));
        });
    }

    /// A fresh `Interpreter` sharing this one's VFS, process registry,
    /// and function table, but with its own copy of mutable state
    /// (`spec.md` §4.6: pipeline stages, background jobs, and command
    /// substitution each run as if in their own subshell).
    fn clone_for_subshell(&self) -> Interpreter
    {
        Interpreter {
            env: self.env.clone(),
            aliases: self.aliases.clone(),
            functions: self.functions.clone(),
            vfs: self.vfs.clone(),
            processes: self.processes.clone(),
            commands: self.commands.clone(),
            history: History::default(),
            shell_cancel: self.shell_cancel.clone(),
            background_output: self.background_output.clone(),
            is_background_subshell: self.is_background_subshell,
        }
    }

    fn exec_pipeline(&mut self, pipeline: &Pipeline, stdout: &dyn Writer, stderr: &dyn Writer) -> Flow
    {
        if pipeline.commands.len() == 1 {
            let flow = self.exec_command(&pipeline.commands[0], stdout, stderr, None);
            return negate_if(pipeline.negated, flow);
        }

        let n = pipeline.commands.len();
        let mut writers: Vec<ChannelWriter> = Vec::with_capacity(n - 1);
        let mut readers: Vec<ChannelReader> = Vec::with_capacity(n - 1);
        for _ in 0..n - 1 {
            let (tx, rx) = std::sync::mpsc::channel::<String>();
            writers.push(ChannelWriter::new(tx));
            readers.push(ChannelReader::new(rx));
        }
        readers.reverse(); // pop() yields stage 1's reader first

        let results: Vec<i32> = std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for (idx, command) in pipeline.commands.iter().enumerate() {
                let mut sub = self.clone_for_subshell();
                let command = command.clone();
                let is_last = idx + 1 == n;
                let my_stdout = writers.get(idx).cloned();
                let mut my_stdin: Box<dyn Reader> = if idx == 0 { Box::new(EmptyReader) } else { Box::new(readers.pop().unwrap()) };
                let handle = scope.spawn(move || {
                    let forwarding = ForwardingWriter { inner: stdout, channel: my_stdout, is_last };
                    let flow = sub.exec_command(&command, &forwarding, stderr, Some(my_stdin.as_mut()));
                    flow.code()
                });
                handles.push(handle);
            }
            handles.into_iter().map(|h| h.join().unwrap_or(1)).collect()
        });

        let last = *results.last().unwrap_or(&0);
        negate_if(pipeline.negated, Flow::Code(last))
    }

    fn exec_command(&mut self, command: &Command, stdout: &dyn Writer, stderr: &dyn Writer, stdin: Option<&mut dyn Reader>) -> Flow
    {
        match command {
            Command::Simple(simple) => self.exec_simple(simple, stdout, stderr, stdin),
            Command::Group(body) => self.exec_compound_list(body, stdout, stderr),
            Command::If { branches, else_branch } => {
                for branch in branches {
                    let cond = self.exec_compound_list(&branch.condition, stdout, stderr);
                    if cond.is_signal() {
                        return cond;
                    }
                    if cond.code() == 0 {
                        return self.exec_compound_list(&branch.body, stdout, stderr);
                    }
                }
                match else_branch {
                    Some(body) => self.exec_compound_list(body, stdout, stderr),
                    None => Flow::Code(0),
                }
            },
            Command::While { condition, body } => self.exec_loop(condition, body, false, stdout, stderr),
            Command::Until { condition, body } => self.exec_loop(condition, body, true, stdout, stderr),
            Command::For { variable, words, body } => self.exec_for(variable, words.as_deref(), body, stdout, stderr),
            Command::Case { word, arms } => self.exec_case(word, arms, stdout, stderr),
            Command::FunctionDef { name, body } => {
                self.functions.insert(name.clone(), (**body).clone());
                Flow::Code(0)
            },
        }
    }

    fn exec_loop(&mut self, condition: &CompoundList, body: &CompoundList, until: bool, stdout: &dyn Writer, stderr: &dyn Writer) -> Flow
    {
        loop {
            if self.shell_cancel.is_cancelled() {
                return Flow::Code(130);
            }
            let cond = self.exec_compound_list(condition, stdout, stderr);
            if cond.is_signal() {
                return cond;
            }
            let keep_going = if until { cond.code() != 0 } else { cond.code() == 0 };
            if !keep_going {
                return Flow::Code(0);
            }
            match self.exec_compound_list(body, stdout, stderr) {
                Flow::Signal(ControlSignal::Break(n)) if n <= 1 => return Flow::Code(0),
                Flow::Signal(ControlSignal::Break(n)) => return Flow::Signal(ControlSignal::Break(n - 1)),
                Flow::Signal(ControlSignal::Continue(n)) if n <= 1 => continue,
                Flow::Signal(ControlSignal::Continue(n)) => return Flow::Signal(ControlSignal::Continue(n - 1)),
                signal @ Flow::Signal(ControlSignal::Return(_)) => return signal,
                Flow::Code(_) => {},
            }
        }
    }

    fn exec_for(&mut self, variable: &str, words: Option<&[Word]>, body: &CompoundList, stdout: &dyn Writer, stderr: &dyn Writer) -> Flow
    {
        let items: Vec<String> = match words {
            Some(words) => {
                let mut out = Vec::new();
                for w in words {
                    match self.expand_multi(w) {
                        Ok(mut vs) => out.append(&mut vs),
                        Err(err) => {
                            stderr.write(&format!("sandbox-shell: {err}\n"));
                            return Flow::Code(1);
                        },
                    }
                }
                out
            },
            None => self.env.positional().to_vec(),
        };
        for item in items {
            if self.shell_cancel.is_cancelled() {
                return Flow::Code(130);
            }
            self.env.set(variable, item);
            match self.exec_compound_list(body, stdout, stderr) {
                Flow::Signal(ControlSignal::Break(n)) if n <= 1 => return Flow::Code(0),
                Flow::Signal(ControlSignal::Break(n)) => return Flow::Signal(ControlSignal::Break(n - 1)),
                Flow::Signal(ControlSignal::Continue(n)) if n <= 1 => continue,
                Flow::Signal(ControlSignal::Continue(n)) => return Flow::Signal(ControlSignal::Continue(n - 1)),
                signal @ Flow::Signal(ControlSignal::Return(_)) => return signal,
                Flow::Code(_) => {},
            }
        }
        Flow::Code(0)
    }

    fn exec_case(&mut self, word: &Word, arms: &[CaseArm], stdout: &dyn Writer, stderr: &dyn Writer) -> Flow
    {
        let value = match self.expand_single(word) {
            Ok(v) => v,
            Err(err) => {
                stderr.write(&format!("sandbox-shell: {err}\n"));
                return Flow::Code(1);
            },
        };
        for arm in arms {
            for pattern_word in &arm.patterns {
                let Ok(pattern_text) = self.expand_single(pattern_word) else { continue };
                if sandbox_util::glob::Pattern::parse(&pattern_text).matches(&value) {
                    return self.exec_compound_list(&arm.body, stdout, stderr);
                }
            }
        }
        Flow::Code(0)
    }

    /// Run a shell function's body, saving and restoring positional
    /// parameters around the call (`spec.md` §4.6 "Functions"). A
    /// `Return` signal becomes the call's exit code; an uncaught
    /// `Break`/`Continue` reaching the end of the body is absorbed as a
    /// no-op, the same way it is at script top level, rather than
    /// escaping past the function boundary.
    fn call_function(&mut self, body: &Command, args: &[String], stdout: &dyn Writer, stderr: &dyn Writer) -> Flow
    {
        let saved_positional = self.env.positional().to_vec();
        self.env.set_positional(args.to_vec());
        let flow = self.exec_command(body, stdout, stderr, None);
        self.env.set_positional(saved_positional);
        match flow {
            Flow::Signal(ControlSignal::Return(code)) => Flow::Code(code),
            Flow::Signal(_) => Flow::Code(self.env.last_exit_code),
            code => code,
        }
    }

    /// `spec.md` §4.6: alias expansion of the head word, assignment
    /// handling, word expansion, redirections, then resolution as a
    /// function, builtin, or external command in that order.
    fn exec_simple(&mut self, simple: &Simple, stdout: &dyn Writer, stderr: &dyn Writer, stdin: Option<&mut dyn Reader>) -> Flow
    {
        let simple = self.expand_alias_head(simple);

        if simple.words.is_empty() {
            for (name, word) in &simple.assignments {
                match self.expand_single(word) {
                    Ok(value) => self.env.set(name, value),
                    Err(err) => {
                        stderr.write(&format!("sandbox-shell: {err}\n"));
                        return Flow::Code(1);
                    },
                }
            }
            return Flow::Code(0);
        }

        let mut argv = Vec::new();
        for word in &simple.words {
            match self.expand_multi(word) {
                Ok(mut vs) => argv.append(&mut vs),
                Err(err) => {
                    stderr.write(&format!("sandbox-shell: {err}\n"));
                    return Flow::Code(1);
                },
            }
        }
        if argv.is_empty() {
            return Flow::Code(0);
        }
        let name = argv.remove(0);

        // `NAME=value cmd` overrides are visible only for this command's
        // own duration (`spec.md` §4.6); saved as plain owned data rather
        // than an RAII guard, since a guard borrowing `self.env` would
        // block the `&mut self` calls below for the rest of this scope.
        let mut saved: Vec<(String, Option<String>)> = Vec::new();
        for (key, word) in &simple.assignments {
            match self.expand_single(word) {
                Ok(value) => {
                    saved.push((key.clone(), self.env.get(key).map(str::to_string)));
                    self.env.set(key, value);
                },
                Err(err) => {
                    stderr.write(&format!("sandbox-shell: {err}\n"));
                    return Flow::Code(1);
                },
            }
        }
        let restore_overrides = |interp: &mut Interpreter| {
            for (key, old) in &saved {
                match old {
                    Some(v) => interp.env.set(key, v.clone()),
                    None => interp.env.unset(key),
                }
            }
        };

        let redirects = match self.open_redirections(&simple.redirections) {
            Ok(r) => r,
            Err(err) => {
                stderr.write(&format!("sandbox-shell: {err}\n"));
                restore_overrides(self);
                return Flow::Code(1);
            },
        };
        let stdout_writer: &dyn Writer = redirects.stdout.as_ref().map(|w| w as &dyn Writer).unwrap_or(stdout);
        let stderr_writer: &dyn Writer = redirects.stderr.as_ref().map(|w| w as &dyn Writer).unwrap_or(stderr);
        let mut redirected_stdin = redirects.stdin;
        let stdin = redirected_stdin.as_deref_mut().map(|r| r as &mut dyn Reader).or(stdin);

        if let Some(function_body) = self.functions.get(&name).cloned() {
            let flow = self.call_function(&function_body, &argv, stdout_writer, stderr_writer);
            restore_overrides(self);
            return flow;
        }
        if let Some(flow) = builtins::dispatch(self, &name, &argv, stdout_writer, stderr_writer) {
            restore_overrides(self);
            return flow;
        }
        if let Some(command_fn) = self.commands.get(&name) {
            // The same token is registered with the process table and handed
            // to the command body, so `kill(pid, Term)` actually reaches the
            // running command rather than firing a token nobody reads.
            let signal = self.shell_cancel.child();
            // A command running inside an already-backgrounded list does not
            // register its own process; the job process spawn_background
            // registered up front stands in for the whole list.
            let pid = if self.is_background_subshell {
                None
            } else {
                Some(self.processes.spawn(Spawn {
                    command: name.clone(),
                    args: argv.clone(),
                    cwd: self.env.cwd.clone(),
                    env: self.env.exported_snapshot().into_iter().collect(),
                    is_foreground: true,
                    ppid: None,
                    cancel: signal.clone(),
                }))
            };
            let mut ctx = CommandContext {
                args: argv,
                env: self.env.exported_snapshot(),
                cwd: self.env.cwd.clone(),
                vfs: self.vfs.clone(),
                stdout: stdout_writer,
                stderr: stderr_writer,
                stdin,
                signal,
            };
            let code = command_fn(&mut ctx);
            if let Some(pid) = pid {
                self.processes.complete(pid, code);
                self.processes.reap(pid);
            }
            restore_overrides(self);
            return Flow::Code(code);
        }

        restore_overrides(self);
        stderr.write(&format!("sandbox-shell: {name}: command not found\n"));
        Flow::Code(127)
    }

    /// Open every redirection against the VFS (`spec.md` §4.6):
    /// `>`/`>>` truncate or prepare the target once up front, after
    /// which the returned writer appends each write directly to that
    /// file; `<` reads the whole target eagerly into a [`StringReader`].
    fn open_redirections(&mut self, redirections: &[Redirection]) -> Result<OpenRedirections, ExpandError>
    {
        let mut result = OpenRedirections::default();
        for redir in redirections {
            let target = self.expand_single(&redir.target)?;
            let path = sandbox_util::path::resolve(&self.env.cwd, &target);
            match redir.op {
                RedirOp::Write => {
                    let _ = self.vfs.write_file(&path, b"");
                    result.stdout = Some(VfsFileWriter { vfs: self.vfs.clone(), path });
                },
                RedirOp::Append => {
                    if !self.vfs.exists(&path) {
                        let _ = self.vfs.write_file(&path, b"");
                    }
                    result.stdout = Some(VfsFileWriter { vfs: self.vfs.clone(), path });
                },
                RedirOp::ErrWrite => {
                    let _ = self.vfs.write_file(&path, b"");
                    result.stderr = Some(VfsFileWriter { vfs: self.vfs.clone(), path });
                },
                RedirOp::ErrAppend => {
                    if !self.vfs.exists(&path) {
                        let _ = self.vfs.write_file(&path, b"");
                    }
                    result.stderr = Some(VfsFileWriter { vfs: self.vfs.clone(), path });
                },
                RedirOp::Both => {
                    let _ = self.vfs.write_file(&path, b"");
                    let writer = VfsFileWriter { vfs: self.vfs.clone(), path };
                    result.stderr = Some(writer.clone());
                    result.stdout = Some(writer);
                },
                RedirOp::Read => {
                    let contents = self.vfs.read_file_string(&path).unwrap_or_default();
                    result.stdin = Some(StringReader::new(contents));
                },
            }
        }
        Ok(result)
    }

    fn expand_alias_head<'a>(&self, simple: &'a Simple) -> std::borrow::Cow<'a, Simple>
    {
        let Some(first) = simple.words.first() else { return std::borrow::Cow::Borrowed(simple) };
        if !first.is_fully_unquoted() {
            return std::borrow::Cow::Borrowed(simple);
        }
        let head = word_raw_text(first);
        let rest: Vec<String> = simple.words[1..].iter().map(word_raw_text).collect();
        let Some(expanded) = self.aliases.expand_head(&head, &rest.join(" ")) else {
            return std::borrow::Cow::Borrowed(simple);
        };
        let mut tokens = Lexer::new(&expanded).tokenize().unwrap_or_default();
        tokens.pop(); // drop the trailing Eof
        let new_words: Vec<Word> = tokens.into_iter().filter_map(|t| if let Token::Word(w) = t { Some(w) } else { None }).collect();
        std::borrow::Cow::Owned(Simple { assignments: simple.assignments.clone(), words: new_words, redirections: simple.redirections.clone() })
    }

    fn expand_single(&mut self, word: &Word) -> Result<String, ExpandError>
    {
        let mut sub = CommandSubstituter { interp: self.clone_for_subshell() };
        let result = expand::expand_word_single(word, &mut self.env, &mut sub);
        self.env.last_exit_code = sub.interp.env.last_exit_code;
        result
    }

    fn expand_multi(&mut self, word: &Word) -> Result<Vec<String>, ExpandError>
    {
        let vfs = self.vfs.clone();
        let mut sub = CommandSubstituter { interp: self.clone_for_subshell() };
        let result = expand::expand_word_multi(word, &mut self.env, &mut sub, &vfs);
        self.env.last_exit_code = sub.interp.env.last_exit_code;
        result
    }
}

/// Writers/reader resolved from a simple command's redirections
/// (`spec.md` §4.6).
#[derive(Default)]
struct OpenRedirections
{
    stdout: Option<VfsFileWriter>,
    stderr: Option<VfsFileWriter>,
    stdin: Option<StringReader>,
}

/// Appends every write straight to a VFS file; the truncate-vs-append
/// distinction for `>` vs `>>` is resolved once, at open time, by
/// [`Interpreter::open_redirections`].
#[derive(Clone)]
struct VfsFileWriter
{
    vfs: Arc<Vfs>,
    path: String,
}

impl Writer for VfsFileWriter
{
    fn write(&self, text: &str)
    {
        let _ = self.vfs.append_file(&self.path, text.as_bytes());
    }
}

/// Runs `$(...)` command substitution against an owned subshell clone of
/// the interpreter, so it never needs a second live `&mut Environment`
/// borrow alongside the one [`expand::expand_word_single`] already holds
/// (`spec.md` §4.5).
struct CommandSubstituter
{
    interp: Interpreter,
}

impl Substituter for CommandSubstituter
{
    fn substitute_command(&mut self, command_text: &str) -> String
    {
        let Ok(script) = parser::parse(command_text) else { return String::new() };
        let out = CapturingWriter::new();
        let err = CapturingWriter::new();
        let flow = self.interp.exec_compound_list(&script.0, &out, &err);
        self.interp.env.last_exit_code = flow.code();
        out.contents()
    }
}

/// Routes a pipeline stage's stdout either to the next stage's channel
/// or, for the last stage, straight through to the pipeline's own
/// caller-supplied writer.
struct ForwardingWriter<'a>
{
    inner: &'a dyn Writer,
    channel: Option<ChannelWriter>,
    is_last: bool,
}

impl Writer for ForwardingWriter<'_>
{
    fn write(&self, text: &str)
    {
        if self.is_last {
            self.inner.write(text);
        } else if let Some(channel) = &self.channel {
            channel.write(text);
        }
    }
}

fn word_raw_text(word: &Word) -> String
{
    word.0.iter().map(|part| part.text.as_str()).collect()
}

fn render_list(list: &List) -> String
{
    let mut text = render_pipeline(&list.first);
    for (connector, pipeline) in &list.rest {
        let op = match connector {
            Connector::Semi => ";",
            Connector::And => "&&",
            Connector::Or => "||",
        };
        text = format!("{text} {op} {}", render_pipeline(pipeline));
    }
    text
}

fn render_pipeline(pipeline: &Pipeline) -> String
{
    let parts: Vec<String> = pipeline.commands.iter().map(render_command).collect();
    let text = parts.join(" | ");
    if pipeline.negated {
        format!("! {text}")
    } else {
        text
    }
}

fn render_command(command: &Command) -> String
{
    match command {
        Command::Simple(simple) => simple.words.iter().map(word_raw_text).collect::<Vec<_>>().join(" "),
        _ => "compound command".to_string(),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::context::CapturingWriter;

    fn fresh() -> (Interpreter, CapturingWriter, CapturingWriter)
    {
        let vfs = Arc::new(Vfs::new());
        let processes = Arc::new(Registry::new());
        (Interpreter::new(vfs, processes), CapturingWriter::new(), CapturingWriter::new())
    }

    #[test]
    fn runs_simple_builtin_command()
    {
        let (mut interp, out, err) = fresh();
        let code = interp.run_line("echo hello", &out, &err);
        assert_eq!(code, 0);
        assert_eq!(out.contents(), "hello\n");
    }

    #[test]
    fn assignment_persists_in_shell_environment()
    {
        let (mut interp, out, err) = fresh();
        interp.run_line("x=5", &out, &err);
        assert_eq!(interp.env.get("x"), Some("5"));
    }

    #[test]
    fn if_else_selects_branch_after_persisted_assignment()
    {
        let (mut interp, out, err) = fresh();
        interp.run_line("x=5", &out, &err);
        let code = interp.run_line("if [ $x -ge 5 ]; then echo ok; else echo no; fi", &out, &err);
        assert_eq!(code, 0);
        assert_eq!(out.contents(), "ok\n");
    }

    #[test]
    fn pipeline_runs_through_external_commands()
    {
        let (mut interp, out, err) = fresh();
        let code = interp.run_line("echo hello world | tr a-z A-Z", &out, &err);
        assert_eq!(code, 0);
        assert_eq!(out.contents(), "HELLO WORLD\n");
    }

    #[test]
    fn command_not_found_is_127()
    {
        let (mut interp, out, err) = fresh();
        let code = interp.run_line("nonexistent_cmd_xyz", &out, &err);
        assert_eq!(code, 127);
        assert!(err.contents().contains("command not found"));
    }

    #[test]
    fn for_loop_over_literal_words()
    {
        let (mut interp, out, err) = fresh();
        interp.run_line("for f in a b c; do echo $f; done", &out, &err);
        assert_eq!(out.contents(), "a\nb\nc\n");
    }

    #[test]
    fn and_or_connectors_short_circuit()
    {
        let (mut interp, out, err) = fresh();
        interp.run_line("false && echo unreachable", &out, &err);
        assert_eq!(out.contents(), "");
        interp.run_line("false || echo reached", &out, &err);
        assert_eq!(out.take(), "reached\n");
    }

    #[test]
    fn function_definition_and_call()
    {
        let (mut interp, out, err) = fresh();
        interp.run_line("greet() { echo hi $1; }", &out, &err);
        interp.run_line("greet world", &out, &err);
        assert_eq!(out.contents(), "hi world\n");
    }

    #[test]
    fn command_substitution_captures_stdout()
    {
        let (mut interp, out, err) = fresh();
        interp.run_line("echo $(echo nested)", &out, &err);
        assert_eq!(out.contents(), "nested\n");
    }

    #[test]
    fn break_exits_the_loop()
    {
        let (mut interp, out, err) = fresh();
        interp.run_line("for f in a b c; do if [ $f = b ]; then break; fi; echo $f; done", &out, &err);
        assert_eq!(out.contents(), "a\n");
    }

    #[test]
    fn redirection_writes_to_the_vfs()
    {
        let (mut interp, out, err) = fresh();
        interp.run_line("echo hi > /out.txt", &out, &err);
        assert_eq!(interp.vfs.read_file_string("/out.txt").unwrap(), "hi\n");
    }

    #[test]
    fn background_job_is_reported_at_a_later_prompt()
    {
        let (mut interp, out, err) = fresh();
        interp.run_line("true &", &out, &err);
        assert!(!out.contents().contains("Done"));
        out.take();
        std::thread::sleep(std::time::Duration::from_millis(50));
        interp.run_line("true", &out, &err);
        assert!(out.take().contains("Done"));
    }

    #[test]
    fn alias_expands_at_head_position()
    {
        let (mut interp, out, err) = fresh();
        interp.aliases.set("greet", "echo hi");
        interp.run_line("greet there", &out, &err);
        assert_eq!(out.contents(), "hi there\n");
    }
}
