//! The embedder-facing facade (`spec.md` §4.10).

use {
    crate::{
        error::{Error, Result},
        options::CreateOptions,
    },
    sandbox_shell::{CapturingWriter, Interpreter},
    sandbox_vfs::Vfs,
    std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

/// The result of [`Commands::run`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunResult
{
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// `sandbox.commands` (`spec.md` §4.10). `run` is serialized: the
/// underlying [`Mutex`] only ever lets one caller hold the interpreter at
/// a time, which is precisely "concurrent `run` calls are queued and
/// executed in arrival order" for the single-process embedding this
/// workspace targets (`std::sync::Mutex` does not guarantee strict FIFO
/// wakeup order across platforms; see `DESIGN.md`).
pub struct Commands
{
    interpreter: Arc<Mutex<Interpreter>>,
    destroyed: Arc<AtomicBool>,
}

impl Commands
{
    pub fn run(&self, line: &str) -> Result<RunResult>
    {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(Error::Destroyed);
        }
        let mut interpreter = self.interpreter.lock().unwrap();
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(Error::Destroyed);
        }
        let stdout = CapturingWriter::new();
        let stderr = CapturingWriter::new();
        let exit_code = interpreter.run_line(line, &stdout, &stderr);
        Ok(RunResult { stdout: stdout.take(), stderr: stderr.take(), exit_code })
    }
}

/// A sandboxed session (`spec.md` §4.10).
pub struct Sandbox
{
    vfs: Arc<Vfs>,
    interpreter: Arc<Mutex<Interpreter>>,
    destroyed: Arc<AtomicBool>,
}

impl Sandbox
{
    pub(crate) fn new(options: CreateOptions) -> anyhow::Result<Self>
    {
        let vfs = Arc::new(Vfs::new());
        for (path, contents) in &options.files {
            let parent = sandbox_util::path::dirname(path);
            if !parent.is_empty() && parent != "/" {
                vfs.mkdir(&parent, true)?;
            }
            vfs.write_file(path, contents)?;
        }
        for mount in &options.mounts {
            vfs.mount(
                &mount.virtual_path,
                sandbox_vfs::Provider::Native(sandbox_vfs::native::NativeProvider::new(mount.host_path.clone(), mount.read_only)),
                mount.read_only,
            );
        }

        let processes = Arc::new(sandbox_process::Registry::new());
        let cwd = options.cwd.clone().unwrap_or_else(|| "/".to_string());
        let mut interpreter = Interpreter::new(Arc::clone(&vfs), processes);
        interpreter.env.cwd = cwd.clone();
        interpreter.env.set("PWD", cwd);
        for (name, value) in &options.env {
            interpreter.env.set(name, value.clone());
            interpreter.env.export(name);
        }

        Ok(Self { vfs, interpreter: Arc::new(Mutex::new(interpreter)), destroyed: Arc::new(AtomicBool::new(false)) })
    }

    pub fn commands(&self) -> Result<Commands>
    {
        self.ensure_alive()?;
        Ok(Commands { interpreter: Arc::clone(&self.interpreter), destroyed: Arc::clone(&self.destroyed) })
    }

    pub fn fs(&self) -> Result<crate::fs::Fs>
    {
        self.ensure_alive()?;
        Ok(crate::fs::Fs::new(Arc::clone(&self.vfs)))
    }

    /// `spec.md` §4.10: `sandbox.mountNative(virtualPath, hostPath, {
    /// readOnly? })`.
    pub fn mount_native(&self, virtual_path: &str, host_path: &str, read_only: bool) -> Result<()>
    {
        self.ensure_alive()?;
        self.vfs.mount(virtual_path, sandbox_vfs::Provider::Native(sandbox_vfs::native::NativeProvider::new(host_path, read_only)), read_only);
        Ok(())
    }

    /// `spec.md` §4.10: "all further calls fail with `Sandbox destroyed`".
    pub fn destroy(&self)
    {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    fn ensure_alive(&self) -> Result<()>
    {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(Error::Destroyed);
        }
        Ok(())
    }
}
