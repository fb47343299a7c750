//! Built-in commands (`spec.md` §4.6): the ones that need direct access
//! to shell state (environment, aliases, jobs, control flow) rather than
//! just the [`CommandContext`] contract external commands get.

use {
    crate::{
        context::Writer,
        interpreter::{ControlSignal, Flow, Interpreter},
    },
    sandbox_process::Signal as ProcSignal,
    sandbox_util::path,
};

/// Resolve and run a builtin by name. Returns `None` if `name` is not a
/// builtin, so the caller can fall through to functions/external
/// commands (`spec.md` §4.6 resolution order).
pub fn dispatch(interp: &mut Interpreter, name: &str, args: &[String], stdout: &dyn Writer, stderr: &dyn Writer) -> Option<Flow>
{
    let flow = match name {
        "cd" => cd(interp, args, stderr),
        "pwd" => {
            stdout.write(&format!("{}\n", interp.env.cwd));
            Flow::Code(0)
        },
        "echo" => echo(args, stdout),
        "export" => export(interp, args, stdout),
        "exit" => Flow::Signal(ControlSignal::Return(args.first().and_then(|a| a.parse().ok()).unwrap_or(interp.env.last_exit_code))),
        "true" => Flow::Code(0),
        "false" => Flow::Code(1),
        "jobs" => jobs(interp, stdout),
        "fg" => fg(interp, args, stderr),
        "bg" => bg(interp, args, stderr),
        "history" => {
            for (i, line) in interp.history.iter().enumerate() {
                stdout.write(&format!("{:>5}  {line}\n", i + 1));
            }
            Flow::Code(0)
        },
        "source" | "." => source(interp, args, stdout, stderr),
        "alias" => alias(interp, args, stdout),
        "unalias" => unalias(interp, args, stderr),
        "test" | "[" => {
            let args = if name == "[" { strip_trailing_bracket(args) } else { args.to_vec() };
            Flow::Code(if test_expr(&args, &interp.vfs, &interp.env.cwd) { 0 } else { 1 })
        },
        "break" => Flow::Signal(ControlSignal::Break(level_arg(args))),
        "continue" => Flow::Signal(ControlSignal::Continue(level_arg(args))),
        "return" => Flow::Signal(ControlSignal::Return(args.first().and_then(|a| a.parse().ok()).unwrap_or(interp.env.last_exit_code))),
        _ => return None,
    };
    Some(flow)
}

fn level_arg(args: &[String]) -> u32
{
    args.first().and_then(|a| a.parse().ok()).unwrap_or(1).max(1)
}

fn strip_trailing_bracket(args: &[String]) -> Vec<String>
{
    match args.last() {
        Some(last) if last == "]" => args[..args.len() - 1].to_vec(),
        _ => args.to_vec(),
    }
}

fn cd(interp: &mut Interpreter, args: &[String], stderr: &dyn Writer) -> Flow
{
    let target = match args.first().map(String::as_str) {
        None | Some("~") => interp.env.get("HOME").unwrap_or("/").to_string(),
        Some("-") => {
            let Some(oldpwd) = interp.env.get("OLDPWD").map(str::to_string) else {
                stderr.write("cd: OLDPWD not set\n");
                return Flow::Code(1);
            };
            oldpwd
        },
        Some(dir) => path::resolve(&interp.env.cwd, dir),
    };
    let target = path::normalize(&target);
    match interp.vfs.stat(&target) {
        Ok(stat) if stat.is_dir => {
            interp.env.set("OLDPWD", interp.env.cwd.clone());
            interp.env.set("PWD", target.clone());
            interp.env.cwd = target;
            Flow::Code(0)
        },
        Ok(_) => {
            stderr.write(&format!("cd: {target}: not a directory\n"));
            Flow::Code(1)
        },
        Err(err) => {
            stderr.write(&format!("cd: {target}: {err}\n"));
            Flow::Code(1)
        },
    }
}

fn echo(args: &[String], stdout: &dyn Writer) -> Flow
{
    let (no_newline, words) = match args.first().map(String::as_str) {
        Some("-n") => (true, &args[1..]),
        _ => (false, args),
    };
    stdout.write(&words.join(" "));
    if !no_newline {
        stdout.write("\n");
    }
    Flow::Code(0)
}

fn export(interp: &mut Interpreter, args: &[String], stdout: &dyn Writer) -> Flow
{
    if args.is_empty() {
        let mut entries: Vec<(String, String)> = interp.env.exported_snapshot().into_iter().collect();
        entries.sort();
        for (name, value) in entries {
            stdout.write(&format!("export {name}={value}\n"));
        }
        return Flow::Code(0);
    }
    for arg in args {
        match arg.split_once('=') {
            Some((name, value)) => interp.env.set(name, value),
            None => {},
        }
        let name = arg.split('=').next().unwrap_or(arg);
        interp.env.export(name);
    }
    Flow::Code(0)
}

fn jobs(interp: &mut Interpreter, stdout: &dyn Writer) -> Flow
{
    for job in interp.processes.get_background_jobs() {
        let state = match job.status {
            sandbox_process::JobStatus::Running => "Running",
            sandbox_process::JobStatus::Stopped => "Stopped",
            sandbox_process::JobStatus::Done => "Done",
        };
        stdout.write(&format!("[{}]  {state}    {}\n", job.job_id, job.command_text));
    }
    Flow::Code(0)
}

fn parse_job_id(interp: &Interpreter, arg: Option<&String>) -> Option<u32>
{
    match arg.map(String::as_str) {
        Some(spec) => spec.strip_prefix('%').unwrap_or(spec).parse().ok(),
        None => interp.processes.current_job_id(),
    }
}

fn fg(interp: &mut Interpreter, args: &[String], stderr: &dyn Writer) -> Flow
{
    let Some(job_id) = parse_job_id(interp, args.first()) else {
        stderr.write("fg: no current job\n");
        return Flow::Code(1);
    };
    let Some(job) = interp.processes.get_by_job_id(job_id) else {
        stderr.write(&format!("fg: {job_id}: no such job\n"));
        return Flow::Code(1);
    };
    for pid in &job.pids {
        interp.processes.kill(*pid, ProcSignal::Continue);
    }
    // Cooperative model: block the shell until every member finishes or
    // is stopped again, since real foregrounding hands the terminal over.
    loop {
        let snapshot = interp.processes.get_by_job_id(job_id);
        match snapshot {
            Some(j) if j.status == sandbox_process::JobStatus::Running => std::thread::sleep(std::time::Duration::from_millis(20)),
            _ => break,
        }
    }
    interp.processes.mark_job_reported(job_id);
    Flow::Code(0)
}

fn bg(interp: &mut Interpreter, args: &[String], stderr: &dyn Writer) -> Flow
{
    let Some(job_id) = parse_job_id(interp, args.first()) else {
        stderr.write("bg: no current job\n");
        return Flow::Code(1);
    };
    let Some(job) = interp.processes.get_by_job_id(job_id) else {
        stderr.write(&format!("bg: {job_id}: no such job\n"));
        return Flow::Code(1);
    };
    for pid in &job.pids {
        interp.processes.kill(*pid, ProcSignal::Continue);
    }
    Flow::Code(0)
}

fn source(interp: &mut Interpreter, args: &[String], stdout: &dyn Writer, stderr: &dyn Writer) -> Flow
{
    let Some(path) = args.first() else {
        stderr.write("source: usage: source FILE\n");
        return Flow::Code(1);
    };
    let resolved = sandbox_util::path::resolve(&interp.env.cwd, path);
    match interp.vfs.read_file_string(&resolved) {
        Ok(contents) => {
            let code = interp.run_line(&contents, stdout, stderr);
            Flow::Code(code)
        },
        Err(err) => {
            stderr.write(&format!("source: {resolved}: {err}\n"));
            Flow::Code(1)
        },
    }
}

fn alias(interp: &mut Interpreter, args: &[String], stdout: &dyn Writer) -> Flow
{
    if args.is_empty() {
        let mut entries: Vec<(String, String)> = interp.aliases.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        entries.sort();
        for (name, value) in entries {
            stdout.write(&format!("alias {name}='{value}'\n"));
        }
        return Flow::Code(0);
    }
    for arg in args {
        match arg.split_once('=') {
            Some((name, value)) => interp.aliases.set(name, value),
            None => match interp.aliases.get(arg) {
                Some(value) => stdout.write(&format!("alias {arg}='{value}'\n")),
                None => stdout.write(&format!("alias: {arg}: not found\n")),
            },
        }
    }
    Flow::Code(0)
}

fn unalias(interp: &mut Interpreter, args: &[String], stderr: &dyn Writer) -> Flow
{
    let mut status = 0;
    for name in args {
        if !interp.aliases.unset(name) {
            stderr.write(&format!("unalias: {name}: not found\n"));
            status = 1;
        }
    }
    Flow::Code(status)
}

/// `spec.md`/SPEC_FULL §11's minimal POSIX `test` subset: file tests,
/// string comparison, integer comparison, and single-level negation/
/// conjunction/disjunction.
fn test_expr(args: &[String], vfs: &sandbox_vfs::Vfs, cwd: &str) -> bool
{
    match args.len() {
        0 => false,
        1 => !args[0].is_empty(),
        2 if args[0] == "!" => !test_expr(&args[1..], vfs, cwd),
        2 => test_unary(&args[0], &args[1], vfs, cwd),
        3 if args[1] == "-a" => test_expr(&args[0..1], vfs, cwd) && test_expr(&args[2..], vfs, cwd),
        3 if args[1] == "-o" => test_expr(&args[0..1], vfs, cwd) || test_expr(&args[2..], vfs, cwd),
        3 => test_binary(&args[0], &args[1], &args[2]),
        _ => false,
    }
}

fn test_unary(op: &str, operand: &str, vfs: &sandbox_vfs::Vfs, cwd: &str) -> bool
{
    let resolved = || path::resolve(cwd, operand);
    match op {
        "-z" => operand.is_empty(),
        "-n" => !operand.is_empty(),
        "-e" => vfs.exists(&resolved()),
        "-f" => vfs.stat(&resolved()).map(|s| !s.is_dir).unwrap_or(false),
        "-d" => vfs.stat(&resolved()).map(|s| s.is_dir).unwrap_or(false),
        "-s" => vfs.stat(&resolved()).map(|s| s.size > 0).unwrap_or(false),
        "-r" => vfs.stat(&resolved()).map(|s| s.mode & 0o400 != 0).unwrap_or(false),
        "-w" => vfs.stat(&resolved()).map(|s| s.mode & 0o200 != 0).unwrap_or(false),
        "-x" => vfs.stat(&resolved()).map(|s| s.mode & 0o100 != 0).unwrap_or(false),
        _ => false,
    }
}

fn test_binary(lhs: &str, op: &str, rhs: &str) -> bool
{
    match op {
        "=" | "==" => lhs == rhs,
        "!=" => lhs != rhs,
        "-eq" => parse_i64(lhs) == parse_i64(rhs),
        "-ne" => parse_i64(lhs) != parse_i64(rhs),
        "-lt" => parse_i64(lhs) < parse_i64(rhs),
        "-le" => parse_i64(lhs) <= parse_i64(rhs),
        "-gt" => parse_i64(lhs) > parse_i64(rhs),
        "-ge" => parse_i64(lhs) >= parse_i64(rhs),
        _ => false,
    }
}

fn parse_i64(s: &str) -> i64
{
    s.parse().unwrap_or(0)
}
