//! The command context contract (`spec.md` §6.5) and the concrete
//! reader/writer kinds that implement it.

use {
    sandbox_process::Cancel,
    sandbox_vfs::Vfs,
    std::{
        io::Write as _,
        sync::{
            mpsc::{Receiver, Sender},
            Arc, Mutex,
        },
    },
};

/// Sink a command writes output to (`spec.md` §6.5: "Writers expose
/// `write(text)`").
///
/// `Sync` is required (not just `Send`) because a pipeline's stderr
/// writer is shared by reference across every stage's thread
/// (`spec.md` §4.6: "Stderr for every stage goes to the terminal
/// unless redirected").
pub trait Writer: Send + Sync
{
    fn write(&self, text: &str);
}

/// Source a command reads input from (`spec.md` §6.5).
pub trait Reader: Send
{
    /// One unit of input (a line, by convention), or `None` at EOF.
    fn read(&mut self) -> Option<String>;
    /// Every remaining unit of input, concatenated.
    fn read_all(&mut self) -> String
    {
        let mut out = String::new();
        while let Some(chunk) = self.read() {
            out.push_str(&chunk);
        }
        out
    }
}

/// Writes to the host process's real stdout/stderr — used only by the
/// top-level demo binary, never by library code under test.
pub struct TerminalWriter
{
    pub is_stderr: bool,
}

impl Writer for TerminalWriter
{
    fn write(&self, text: &str)
    {
        if self.is_stderr {
            let _ = std::io::stderr().write_all(text.as_bytes());
        } else {
            let _ = std::io::stdout().write_all(text.as_bytes());
        }
    }
}

/// Collects everything written to it in memory; backs `$(...)`
/// command substitution capture and the facade's `run()` result.
#[derive(Clone, Default)]
pub struct CapturingWriter(Arc<Mutex<String>>);

impl CapturingWriter
{
    pub fn new() -> Self
    {
        Self(Arc::new(Mutex::new(String::new())))
    }

    pub fn take(&self) -> String
    {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn contents(&self) -> String
    {
        self.0.lock().unwrap().clone()
    }
}

impl Writer for CapturingWriter
{
    fn write(&self, text: &str)
    {
        self.0.lock().unwrap().push_str(text);
    }
}

/// A no-op reader that is immediately at EOF; the default stdin of the
/// first stage of a pipeline that isn't given one.
pub struct EmptyReader;

impl Reader for EmptyReader
{
    fn read(&mut self) -> Option<String>
    {
        None
    }
}

/// Reads a fixed in-memory string, one time, as a single chunk.
pub struct StringReader(Option<String>);

impl StringReader
{
    pub fn new(s: impl Into<String>) -> Self
    {
        Self(Some(s.into()))
    }
}

impl Reader for StringReader
{
    fn read(&mut self) -> Option<String>
    {
        self.0.take()
    }
}

/// The writer half of a pipe channel between two pipeline stages
/// (`spec.md` §4.6, §5): each `write` sends one chunk; dropping the
/// last writer closes the channel so the reader observes EOF.
///
/// `mpsc::Sender` is `Send` but not `Sync`; wrapping it in a `Mutex`
/// gives `ChannelWriter` the `Sync` bound [`Writer`] requires, even
/// though only one pipeline stage ever calls `write` on a given
/// instance.
#[derive(Clone)]
pub struct ChannelWriter(Arc<Mutex<Sender<String>>>);

impl ChannelWriter
{
    pub fn new(sender: Sender<String>) -> Self
    {
        Self(Arc::new(Mutex::new(sender)))
    }
}

impl Writer for ChannelWriter
{
    fn write(&self, text: &str)
    {
        // A closed receiver (reader stage exited early, e.g. `head`)
        // is not the writer's problem to report; `spec.md` §5 treats
        // a pipeline stage that stops reading as an ordinary early
        // exit, not an error for its upstream.
        let _ = self.0.lock().unwrap().send(text.to_string());
    }
}

/// The reader half of a pipe channel.
pub struct ChannelReader(Receiver<String>);

impl ChannelReader
{
    pub fn new(receiver: Receiver<String>) -> Self
    {
        Self(receiver)
    }
}

impl Reader for ChannelReader
{
    fn read(&mut self) -> Option<String>
    {
        self.0.recv().ok()
    }
}

/// Everything a command implementation is handed (`spec.md` §6.5).
pub struct CommandContext<'a>
{
    pub args: Vec<String>,
    pub env: std::collections::HashMap<String, String>,
    pub cwd: String,
    pub vfs: Arc<Vfs>,
    pub stdout: &'a dyn Writer,
    pub stderr: &'a dyn Writer,
    pub stdin: Option<&'a mut dyn Reader>,
    pub signal: Cancel,
}

impl<'a> CommandContext<'a>
{
    pub fn stdin_read_all(&mut self) -> String
    {
        match self.stdin.as_deref_mut() {
            Some(reader) => reader.read_all(),
            None => String::new(),
        }
    }
}
