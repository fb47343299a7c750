use {
    super::Cancel,
    std::time::{Duration, Instant},
};

/// Process identifier. PID 1 is always the shell itself.
pub type Pid = u32;

/// Job identifier for a backgrounded list (`spec.md` §3.1, §4.7).
pub type JobId = u32;

/// Lifecycle status of a [`Process`] (`spec.md` §3.1, §3.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status
{
    /// Executing normally.
    Running,
    /// Voluntarily suspended (e.g. inside a blocking read).
    Sleeping,
    /// Suspended by `kill(pid, STOP)`; resumes on `kill(pid, CONT)`.
    Stopped,
    /// The command's body has completed; its exit status has not yet
    /// been collected by [`Registry::reap`].
    Zombie,
}

/// A tracked command invocation (`spec.md` §3.1).
pub struct Process
{
    /// Process id.
    pub pid: Pid,
    /// Parent process id.
    pub ppid: Pid,
    /// The command name as invoked.
    pub command: String,
    /// Arguments, not including the command name.
    pub args: Vec<String>,
    /// Working directory at spawn time.
    pub cwd: String,
    /// A snapshot of the environment the command saw at spawn time.
    pub env: Vec<(String, String)>,
    /// Current lifecycle status.
    pub status: Status,
    /// Exit code, set once the process transitions to [`Status::Zombie`].
    pub exit_code: Option<i32>,
    /// When the process was spawned.
    pub start_time: Instant,
    /// Whether the process is part of the shell's current foreground
    /// pipeline (as opposed to a backgrounded job).
    pub is_foreground: bool,
    /// The job this process belongs to, if it was backgrounded.
    pub job_id: Option<JobId>,
    /// Cooperative cancellation handle for this process.
    pub cancel: Cancel,
}

impl Process
{
    /// How long the process has been alive.
    pub fn uptime(&self) -> Duration
    {
        self.start_time.elapsed()
    }

    /// Render this process the way `ps` would (`spec.md` §4.7):
    /// `PID pts/0 STATUS UPTIME COMMAND [<defunct>|<stopped>]`.
    pub fn formatted_info(&self) -> String
    {
        let status_word = match self.status {
            Status::Running => "R",
            Status::Sleeping => "S",
            Status::Stopped => "T",
            Status::Zombie => "Z",
        };
        let uptime = format_uptime(self.uptime());
        let mut line = format!(
            "{pid:<6}pts/0    {status_word:<2} {uptime:>8} {cmd}",
            pid = self.pid,
            cmd = command_line(&self.command, &self.args),
        );
        match self.status {
            Status::Zombie => line.push_str(" <defunct>"),
            Status::Stopped => line.push_str(" <stopped>"),
            _ => {},
        }
        line
    }
}

fn command_line(command: &str, args: &[String]) -> String
{
    let mut line = command.to_owned();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

fn format_uptime(d: Duration) -> String
{
    let total_secs = d.as_secs();
    let (h, m, s) = (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60);
    format!("{h:02}:{m:02}:{s:02}")
}
