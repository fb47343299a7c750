//! Embedder-facing sandbox facade (`spec.md` §4.10): wires the VFS,
//! process registry, and shell interpreter into a single session, and
//! frames a daemon wire protocol for detached use (§6.3).

pub use self::{
    error::{Error, Result},
    fs::Fs,
    options::{CreateOptions, MountSpec},
    sandbox::{Commands, RunResult, Sandbox},
};

mod error;
mod fs;
mod options;
mod sandbox;
pub mod wire;

/// `spec.md` §4.10: `create(options) → Sandbox`.
pub fn create(options: CreateOptions) -> anyhow::Result<Sandbox>
{
    Sandbox::new(options)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn run_executes_a_shell_line_and_captures_output()
    {
        let sandbox = create(CreateOptions::new()).unwrap();
        let result = sandbox.commands().unwrap().run("echo hi").unwrap();
        assert_eq!(result.stdout, "hi\n");
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn initial_files_are_visible_to_the_shell()
    {
        let options = CreateOptions::new().file("/greeting.txt", b"hello\n".to_vec());
        let sandbox = create(options).unwrap();
        let result = sandbox.commands().unwrap().run("cat /greeting.txt").unwrap();
        assert_eq!(result.stdout, "hello\n");
    }

    #[test]
    fn destroy_fails_all_further_calls()
    {
        let sandbox = create(CreateOptions::new()).unwrap();
        sandbox.destroy();
        assert!(matches!(sandbox.commands(), Err(Error::Destroyed)));
        assert!(matches!(sandbox.fs(), Err(Error::Destroyed)));
    }

    #[test]
    fn fs_wrapper_reads_and_writes_through_the_same_vfs_the_shell_sees()
    {
        let sandbox = create(CreateOptions::new()).unwrap();
        sandbox.fs().unwrap().write("/a.txt", b"one").unwrap();
        let result = sandbox.commands().unwrap().run("cat /a.txt").unwrap();
        assert_eq!(result.stdout, "one");
    }

    #[test]
    fn mount_native_exposes_a_host_directory() -> anyhow::Result<()>
    {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("hostfile.txt"), b"from host")?;

        let sandbox = create(CreateOptions::new())?;
        sandbox.mount_native("/host", &dir.path().display().to_string(), true)?;
        let result = sandbox.commands()?.run("cat /host/hostfile.txt")?;
        assert_eq!(result.stdout, "from host");
        Ok(())
    }
}
