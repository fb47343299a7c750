use super::{Cancel, JobId, Pid};

/// Status of a [`Job`], derived from the status of its member processes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobStatus
{
    /// At least one member process is still running or sleeping.
    Running,
    /// Every member process is stopped.
    Stopped,
    /// Every member process has become a zombie.
    Done,
}

/// A backgrounded list, tracked by job id (`spec.md` §3.1, §4.7).
pub struct Job
{
    /// Job id, unique among jobs currently in the table.
    pub job_id: JobId,
    /// The PIDs of every process launched by this job's list.
    pub pids: Vec<Pid>,
    /// Cached status, recomputed by the registry as member processes
    /// change state.
    pub status: JobStatus,
    /// The source text of the backgrounded command, for `jobs` output.
    pub command_text: String,
    /// Cancellation token covering every stage of this job's list.
    pub cancel: Cancel,
    /// Set once this job's completion has been reported at a prompt
    /// (`spec.md` §5: "job done messages are batched between prompts").
    pub reported_done: bool,
}
