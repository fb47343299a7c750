use {
    super::{Cancel, Job, JobId, JobStatus, Pid, Process, Status},
    std::{
        collections::BTreeMap,
        sync::Mutex,
        time::Instant,
    },
};

/// PID reserved for the shell itself. Never killable or reapable.
pub const SHELL_PID: Pid = 1;

/// Signal accepted by [`Registry::kill`] (`spec.md` §4.7).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Signal
{
    /// Suspend the process (`SIGSTOP`-equivalent).
    Stop,
    /// Resume a stopped process.
    Continue,
    /// Request termination via the process's cancellation token.
    Term,
    /// Same effect as [`Signal::Term`] in this cooperative model.
    Kill,
}

/// Arguments to [`Registry::spawn`].
pub struct Spawn
{
    /// Command name.
    pub command: String,
    /// Command arguments.
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: String,
    /// Environment snapshot.
    pub env: Vec<(String, String)>,
    /// Whether this process is part of the shell's current foreground
    /// pipeline.
    pub is_foreground: bool,
    /// Parent PID; defaults to [`SHELL_PID`] if not given.
    pub ppid: Option<Pid>,
    /// The same cancellation token the command body will poll for abort
    /// (`spec.md` §4.7). [`Registry::kill`]'s `Term`/`Kill` arm fires
    /// this exact token, so the running command observes it — not a
    /// second, unrelated `Cancel` the registry keeps to itself.
    pub cancel: Cancel,
}

struct State
{
    processes: BTreeMap<Pid, Process>,
    jobs: BTreeMap<JobId, Job>,
    job_order: Vec<JobId>,
    next_pid: Pid,
    next_job_id: JobId,
    free_job_ids: Vec<JobId>,
}

/// Process registry and job table, shared by every command in a session
/// (`spec.md` §4.7, §5).
pub struct Registry
{
    state: Mutex<State>,
}

impl Registry
{
    /// Create an empty registry. Does not yet contain the shell process;
    /// call [`register_shell`][Self::register_shell] first.
    pub fn new() -> Self
    {
        Self {
            state: Mutex::new(State {
                processes: BTreeMap::new(),
                jobs: BTreeMap::new(),
                job_order: Vec::new(),
                next_pid: SHELL_PID + 1,
                next_job_id: 1,
                free_job_ids: Vec::new(),
            }),
        }
    }

    /// Register the shell itself as PID 1.
    pub fn register_shell(&self, cwd: String, env: Vec<(String, String)>)
    {
        let mut state = self.state.lock().unwrap();
        state.processes.insert(SHELL_PID, Process {
            pid: SHELL_PID,
            ppid: SHELL_PID,
            command: "shell".to_owned(),
            args: Vec::new(),
            cwd,
            env,
            status: Status::Running,
            exit_code: None,
            start_time: Instant::now(),
            is_foreground: true,
            job_id: None,
            cancel: Cancel::new(),
        });
    }

    /// Allocate a PID and register a new process.
    pub fn spawn(&self, spawn: Spawn) -> Pid
    {
        let mut state = self.state.lock().unwrap();
        let pid = state.next_pid;
        state.next_pid += 1;
        state.processes.insert(pid, Process {
            pid,
            ppid: spawn.ppid.unwrap_or(SHELL_PID),
            command: spawn.command,
            args: spawn.args,
            cwd: spawn.cwd,
            env: spawn.env,
            status: Status::Running,
            exit_code: None,
            start_time: Instant::now(),
            is_foreground: spawn.is_foreground,
            job_id: None,
            cancel: spawn.cancel,
        });
        pid
    }

    /// Create a new job covering `pids`, returning its job id.
    ///
    /// `spec.md` §4.6: "Background jobs register a single 'job process'
    /// ... the individual commands within the backgrounded list do not
    /// register separately" is honored by the caller choosing what `pids`
    /// to pass, not by this method.
    pub fn create_job(&self, pids: Vec<Pid>, command_text: String, cancel: Cancel) -> JobId
    {
        let mut state = self.state.lock().unwrap();
        let job_id = state.free_job_ids.pop().unwrap_or_else(|| {
            let id = state.next_job_id;
            state.next_job_id += 1;
            id
        });
        for &pid in &pids {
            if let Some(process) = state.processes.get_mut(&pid) {
                process.job_id = Some(job_id);
            }
        }
        state.jobs.insert(job_id, Job {
            job_id,
            pids,
            status: JobStatus::Running,
            command_text,
            cancel,
            reported_done: false,
        });
        state.job_order.push(job_id);
        job_id
    }

    /// Look up a process by PID.
    pub fn get(&self, pid: Pid) -> Option<ProcessSnapshot>
    {
        self.state.lock().unwrap().processes.get(&pid).map(ProcessSnapshot::from)
    }

    /// Look up a job by job id.
    pub fn get_by_job_id(&self, job_id: JobId) -> Option<JobSnapshot>
    {
        self.state.lock().unwrap().jobs.get(&job_id).map(JobSnapshot::from)
    }

    /// Every currently-registered process.
    pub fn get_all(&self) -> Vec<ProcessSnapshot>
    {
        self.state.lock().unwrap().processes.values().map(ProcessSnapshot::from).collect()
    }

    /// Every process that is currently [`Status::Running`].
    pub fn get_running(&self) -> Vec<ProcessSnapshot>
    {
        self.state.lock().unwrap().processes.values()
            .filter(|p| p.status == Status::Running)
            .map(ProcessSnapshot::from)
            .collect()
    }

    /// Every job currently in the table.
    pub fn get_background_jobs(&self) -> Vec<JobSnapshot>
    {
        let state = self.state.lock().unwrap();
        state.job_order.iter()
            .filter_map(|id| state.jobs.get(id))
            .map(JobSnapshot::from)
            .collect()
    }

    /// Every process currently [`Status::Zombie`].
    pub fn get_zombies(&self) -> Vec<ProcessSnapshot>
    {
        self.state.lock().unwrap().processes.values()
            .filter(|p| p.status == Status::Zombie)
            .map(ProcessSnapshot::from)
            .collect()
    }

    /// Send a signal to a process (`spec.md` §4.7).
    ///
    /// PID 1 is never killable: any signal to it is a no-op that returns
    /// `false`.
    pub fn kill(&self, pid: Pid, signal: Signal) -> bool
    {
        if pid == SHELL_PID {
            return false;
        }
        let mut state = self.state.lock().unwrap();
        let Some(process) = state.processes.get_mut(&pid) else { return false };
        match signal {
            Signal::Stop => process.status = Status::Stopped,
            Signal::Continue => {
                if process.status == Status::Stopped {
                    process.status = Status::Running;
                }
            },
            Signal::Term | Signal::Kill => process.cancel.cancel(),
        }
        true
    }

    /// Record that a process's command body has finished, transitioning
    /// it to [`Status::Zombie`] with the given exit code.
    pub fn complete(&self, pid: Pid, exit_code: i32)
    {
        self.update_status_impl(pid, Status::Zombie, Some(exit_code));
    }

    /// Update a process's status directly (e.g. to mark it
    /// [`Status::Sleeping`] while blocked on IO).
    pub fn update_status(&self, pid: Pid, status: Status)
    {
        self.update_status_impl(pid, status, None);
    }

    fn update_status_impl(&self, pid: Pid, status: Status, exit_code: Option<i32>)
    {
        if pid == SHELL_PID {
            return;
        }
        let mut state = self.state.lock().unwrap();
        let job_id = {
            let Some(process) = state.processes.get_mut(&pid) else { return };
            process.status = status;
            if let Some(code) = exit_code {
                process.exit_code = Some(code);
            }
            process.job_id
        };
        if let Some(job_id) = job_id {
            recompute_job_status(&mut state, job_id);
        }
    }

    /// Remove a zombie process from the registry.
    ///
    /// Returns `false` if `pid` is [`SHELL_PID`], unknown, or not a
    /// zombie.
    pub fn reap(&self, pid: Pid) -> bool
    {
        if pid == SHELL_PID {
            return false;
        }
        let mut state = self.state.lock().unwrap();
        match state.processes.get(&pid) {
            Some(p) if p.status == Status::Zombie => {},
            _ => return false,
        }
        let job_id = state.processes.get(&pid).and_then(|p| p.job_id);
        state.processes.remove(&pid);
        if let Some(job_id) = job_id {
            self.drop_job_member(&mut state, job_id, pid);
        }
        true
    }

    /// Reap every zombie process, returning the PIDs that were reaped.
    pub fn collect_zombies(&self) -> Vec<Pid>
    {
        let zombies: Vec<Pid> = {
            let state = self.state.lock().unwrap();
            state.processes.values()
                .filter(|p| p.status == Status::Zombie)
                .map(|p| p.pid)
                .collect()
        };
        for &pid in &zombies {
            self.reap(pid);
        }
        zombies
    }

    fn drop_job_member(&self, state: &mut State, job_id: JobId, pid: Pid)
    {
        let remove_job = match state.jobs.get_mut(&job_id) {
            Some(job) => {
                job.pids.retain(|&p| p != pid);
                job.pids.is_empty()
            },
            None => false,
        };
        if remove_job {
            state.jobs.remove(&job_id);
            state.job_order.retain(|&id| id != job_id);
            state.free_job_ids.push(job_id);
        }
    }

    /// Mark a job's completion as reported, so it is not reported again
    /// at the next prompt.
    pub fn mark_job_reported(&self, job_id: JobId)
    {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.get_mut(&job_id) {
            job.reported_done = true;
        }
    }

    /// Jobs whose status became [`JobStatus::Done`] since their last
    /// report, without marking them reported.
    pub fn unreported_done_jobs(&self) -> Vec<JobSnapshot>
    {
        let state = self.state.lock().unwrap();
        state.job_order.iter()
            .filter_map(|id| state.jobs.get(id))
            .filter(|j| j.status == JobStatus::Done && !j.reported_done)
            .map(JobSnapshot::from)
            .collect()
    }

    /// The id of the most recently created job still in the table (`%+`).
    pub fn current_job_id(&self) -> Option<JobId>
    {
        self.state.lock().unwrap().job_order.last().copied()
    }

    /// The id of the job before the current one (`%-`).
    pub fn previous_job_id(&self) -> Option<JobId>
    {
        let state = self.state.lock().unwrap();
        let len = state.job_order.len();
        if len >= 2 { Some(state.job_order[len - 2]) } else { None }
    }

    /// How long a process has been alive.
    pub fn get_uptime(&self, pid: Pid) -> Option<std::time::Duration>
    {
        self.state.lock().unwrap().processes.get(&pid).map(|p| p.uptime())
    }

    /// `ps`-formatted line for a process (`spec.md` §4.7).
    pub fn get_formatted_info(&self, pid: Pid) -> Option<String>
    {
        self.state.lock().unwrap().processes.get(&pid).map(|p| p.formatted_info())
    }

    /// Number of processes currently tracked.
    pub fn count(&self) -> usize
    {
        self.state.lock().unwrap().processes.len()
    }

    /// Clear every process and job, re-registering nothing. Used when
    /// resetting a session.
    pub fn reset(&self)
    {
        let mut state = self.state.lock().unwrap();
        state.processes.clear();
        state.jobs.clear();
        state.job_order.clear();
        state.next_pid = SHELL_PID + 1;
        state.next_job_id = 1;
        state.free_job_ids.clear();
    }
}

impl Default for Registry
{
    fn default() -> Self
    {
        Self::new()
    }
}

fn recompute_job_status(state: &mut State, job_id: JobId)
{
    let Some(job) = state.jobs.get(&job_id) else { return };
    let statuses: Vec<Status> = job.pids.iter()
        .filter_map(|pid| state.processes.get(pid))
        .map(|p| p.status)
        .collect();
    let new_status = if statuses.iter().all(|s| *s == Status::Zombie) {
        JobStatus::Done
    } else if statuses.iter().all(|s| matches!(s, Status::Stopped | Status::Zombie)) {
        JobStatus::Stopped
    } else {
        JobStatus::Running
    };
    if let Some(job) = state.jobs.get_mut(&job_id) {
        job.status = new_status;
    }
}

/// Read-only copy of a [`Process`]'s fields, safe to hand out past the
/// registry's lock.
#[derive(Clone)]
pub struct ProcessSnapshot
{
    #[allow(missing_docs)]
    pub pid: Pid,
    #[allow(missing_docs)]
    pub ppid: Pid,
    #[allow(missing_docs)]
    pub command: String,
    #[allow(missing_docs)]
    pub args: Vec<String>,
    #[allow(missing_docs)]
    pub status: Status,
    #[allow(missing_docs)]
    pub exit_code: Option<i32>,
    #[allow(missing_docs)]
    pub is_foreground: bool,
    #[allow(missing_docs)]
    pub job_id: Option<JobId>,
    #[allow(missing_docs)]
    pub cancel: Cancel,
}

impl From<&Process> for ProcessSnapshot
{
    fn from(p: &Process) -> Self
    {
        Self {
            pid: p.pid,
            ppid: p.ppid,
            command: p.command.clone(),
            args: p.args.clone(),
            status: p.status,
            exit_code: p.exit_code,
            is_foreground: p.is_foreground,
            job_id: p.job_id,
            cancel: p.cancel.clone(),
        }
    }
}

/// Read-only copy of a [`Job`]'s fields.
#[derive(Clone)]
pub struct JobSnapshot
{
    #[allow(missing_docs)]
    pub job_id: JobId,
    #[allow(missing_docs)]
    pub pids: Vec<Pid>,
    #[allow(missing_docs)]
    pub status: JobStatus,
    #[allow(missing_docs)]
    pub command_text: String,
    #[allow(missing_docs)]
    pub cancel: Cancel,
}

impl From<&Job> for JobSnapshot
{
    fn from(j: &Job) -> Self
    {
        Self {
            job_id: j.job_id,
            pids: j.pids.clone(),
            status: j.status,
            command_text: j.command_text.clone(),
            cancel: j.cancel.clone(),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn registry() -> Registry
    {
        let r = Registry::new();
        r.register_shell("/".to_owned(), Vec::new());
        r
    }

    #[test]
    fn pids_start_at_two()
    {
        let r = registry();
        let pid = r.spawn(Spawn {
            command: "echo".into(), args: vec![], cwd: "/".into(),
            env: vec![], is_foreground: true, ppid: None,
            cancel: Cancel::new(),
        });
        assert_eq!(pid, 2);
    }

    #[test]
    fn pid_one_is_never_killable_or_reapable()
    {
        let r = registry();
        assert!(!r.kill(SHELL_PID, Signal::Term));
        assert!(!r.reap(SHELL_PID));
        assert_eq!(r.get(SHELL_PID).unwrap().status, Status::Running);
    }

    #[test]
    fn reap_closure_leaves_no_zombies()
    {
        let r = registry();
        let pid = r.spawn(Spawn {
            command: "x".into(), args: vec![], cwd: "/".into(),
            env: vec![], is_foreground: true, ppid: None,
            cancel: Cancel::new(),
        });
        r.complete(pid, 0);
        assert_eq!(r.get_zombies().len(), 1);
        let reaped = r.collect_zombies();
        assert_eq!(reaped, vec![pid]);
        assert!(r.get_zombies().is_empty());
        assert!(r.get(pid).is_none());
    }

    #[test]
    fn job_removed_once_all_members_reaped()
    {
        let r = registry();
        let p1 = r.spawn(Spawn {
            command: "a".into(), args: vec![], cwd: "/".into(),
            env: vec![], is_foreground: false, ppid: None,
            cancel: Cancel::new(),
        });
        let p2 = r.spawn(Spawn {
            command: "b".into(), args: vec![], cwd: "/".into(),
            env: vec![], is_foreground: false, ppid: None,
            cancel: Cancel::new(),
        });
        let job_id = r.create_job(vec![p1, p2], "a | b &".into(), Cancel::new());
        assert!(r.get_by_job_id(job_id).is_some());

        r.complete(p1, 0);
        assert!(r.get_by_job_id(job_id).is_some());

        r.reap(p1);
        assert!(r.get_by_job_id(job_id).is_some());

        r.complete(p2, 0);
        r.reap(p2);
        assert!(r.get_by_job_id(job_id).is_none());
    }

    #[test]
    fn job_id_recycled_after_full_reap()
    {
        let r = registry();
        let p1 = r.spawn(Spawn {
            command: "a".into(), args: vec![], cwd: "/".into(),
            env: vec![], is_foreground: false, ppid: None,
            cancel: Cancel::new(),
        });
        let job1 = r.create_job(vec![p1], "a &".into(), Cancel::new());
        r.complete(p1, 0);
        r.reap(p1);
        assert!(r.get_by_job_id(job1).is_none());

        let p2 = r.spawn(Spawn {
            command: "b".into(), args: vec![], cwd: "/".into(),
            env: vec![], is_foreground: false, ppid: None,
            cancel: Cancel::new(),
        });
        let job2 = r.create_job(vec![p2], "b &".into(), Cancel::new());
        assert_eq!(job1, job2);
    }

    #[test]
    fn current_and_previous_job_ids()
    {
        let r = registry();
        let p1 = r.spawn(Spawn {
            command: "a".into(), args: vec![], cwd: "/".into(),
            env: vec![], is_foreground: false, ppid: None,
            cancel: Cancel::new(),
        });
        let job1 = r.create_job(vec![p1], "a &".into(), Cancel::new());
        let p2 = r.spawn(Spawn {
            command: "b".into(), args: vec![], cwd: "/".into(),
            env: vec![], is_foreground: false, ppid: None,
            cancel: Cancel::new(),
        });
        let job2 = r.create_job(vec![p2], "b &".into(), Cancel::new());
        assert_eq!(r.current_job_id(), Some(job2));
        assert_eq!(r.previous_job_id(), Some(job1));
    }

    #[test]
    fn kill_stop_and_continue()
    {
        let r = registry();
        let pid = r.spawn(Spawn {
            command: "a".into(), args: vec![], cwd: "/".into(),
            env: vec![], is_foreground: true, ppid: None,
            cancel: Cancel::new(),
        });
        assert!(r.kill(pid, Signal::Stop));
        assert_eq!(r.get(pid).unwrap().status, Status::Stopped);
        assert!(r.kill(pid, Signal::Continue));
        assert_eq!(r.get(pid).unwrap().status, Status::Running);
    }

    #[test]
    fn kill_term_fires_the_token_the_caller_is_still_holding()
    {
        let r = registry();
        let signal = Cancel::new();
        let pid = r.spawn(Spawn {
            command: "sleep".into(), args: vec![], cwd: "/".into(),
            env: vec![], is_foreground: true, ppid: None,
            cancel: signal.clone(),
        });
        assert!(!signal.is_cancelled());
        assert!(r.kill(pid, Signal::Term));
        assert!(signal.is_cancelled());
    }
}
