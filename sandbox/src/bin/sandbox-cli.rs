//! Demo binary: an interactive sandboxed shell session over stdin/stdout,
//! or a single `-c` command, or a script file (SPEC_FULL.md §10.3,
//! grounded in `arthur-zhang-just-bash`/`saltyskip-cthulu`'s clap derive
//! CLIs — the teacher's own binary takes no arguments).

use {
    anyhow::Result,
    clap::Parser,
    sandbox::CreateOptions,
    std::io::{BufRead, Write},
};

#[derive(Parser)]
#[command(name = "sandbox-cli", about = "Run a sandboxed POSIX-ish shell session")]
struct Args
{
    /// Run a single command line instead of starting an interactive
    /// session.
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Run commands from a script file instead of an interactive
    /// session.
    script: Option<String>,

    /// Mount a host directory read-only at `/host`.
    #[arg(long)]
    mount: Option<String>,
}

fn main() -> Result<()>
{
    env_logger::init();
    let args = Args::parse();

    let mut options = CreateOptions::new();
    if let Some(host_dir) = &args.mount {
        options = options.mount("/host", host_dir.as_str(), true);
    }
    let sandbox = sandbox::create(options)?;
    let commands = sandbox.commands()?;

    if let Some(line) = args.command {
        return run_and_report(&commands, &line);
    }
    if let Some(path) = args.script {
        let script = std::fs::read_to_string(&path)?;
        for line in script.lines() {
            run_and_report(&commands, line)?;
        }
        return Ok(());
    }

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("$ ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        run_and_report(&commands, line.trim_end())?;
    }
    Ok(())
}

fn run_and_report(commands: &sandbox::Commands, line: &str) -> Result<()>
{
    let result = commands.run(line)?;
    print!("{}", result.stdout);
    eprint!("{}", result.stderr);
    Ok(())
}
