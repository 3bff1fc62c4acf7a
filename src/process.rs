use crate::cancel::CancellationToken;
use crate::command::exit_code;
use crate::error::{Result, ShellError};
use crate::parser::Command;
use crate::session::Session;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{self, Child, ChildStdout, Stdio};
use std::thread;
use std::time::Duration;

/// How often a waiting stage checks its cancellation token.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One external process of a pipeline.
///
/// A stage is created with its executable already resolved, started once with
/// the three stream endpoints chosen by the executor, and joined with
/// [`Stage::wait`]. It is bound to the pipeline's [`CancellationToken`]: when the
/// token is cancelled while the stage is being waited on, the process is killed.
/// A stage dropped while its process is still running kills and reaps it.
#[derive(Debug)]
pub struct Stage {
    name: String,
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: PathBuf,
    token: CancellationToken,
    child: Option<Child>,
}

impl Stage {
    /// Resolves `command` against the session's `PATH`.
    ///
    /// Nothing is spawned yet; an unknown program fails here with
    /// [`ShellError::NotFound`].
    pub fn new(command: &Command, session: &Session, token: CancellationToken) -> Result<Self> {
        let search_paths = session.search_paths().unwrap_or_default();
        let program = find_command_path(&search_paths, Path::new(&command.name))
            .ok_or_else(|| ShellError::NotFound {
                name: command.name.clone(),
            })?
            .into_owned();
        Ok(Self {
            name: command.name.clone(),
            program,
            args: command.args.iter().map(OsString::from).collect(),
            current_dir: session.current_dir.clone(),
            token,
            child: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawns the process without waiting for it.
    pub fn start(&mut self, stdin: Stdio, stdout: Stdio, stderr: Stdio) -> Result<()> {
        let mut command = process::Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.current_dir)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(stderr);
        let child = command.spawn().map_err(|source| ShellError::Spawn {
            name: self.name.clone(),
            source,
        })?;
        // The builder still holds our copies of the pipe ends given to the child.
        // Close them now, or neighbours never see end-of-input or a broken pipe.
        drop(command);

        log::debug!("started {} (pid {})", self.name, child.id());
        self.child = Some(child);
        Ok(())
    }

    /// Takes the read end of the stage's output pipe, if it was started with
    /// [`Stdio::piped`] as stdout.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.as_mut()?.stdout.take()
    }

    /// Blocks until the process exits or the token is cancelled.
    ///
    /// Cancellation kills the process and yields [`ShellError::Cancelled`]; so does
    /// any unsuccessful exit observed after the token was cancelled.
    pub fn wait(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    terminate(&mut child);
                    return Err(e.into());
                }
            }
            if self.token.is_cancelled() {
                log::debug!("cancelling {} (pid {})", self.name, child.id());
                terminate(&mut child);
                return Err(ShellError::Cancelled);
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        };

        log::debug!("{} exited: {}", self.name, status);
        if status.success() {
            Ok(())
        } else if self.token.is_cancelled() {
            Err(ShellError::Cancelled)
        } else {
            Err(ShellError::Exited {
                name: self.name.clone(),
                code: exit_code(status),
            })
        }
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            log::debug!("reaping abandoned {} (pid {})", self.name, child.id());
            terminate(&mut child);
        }
    }
}

fn terminate(child: &mut Child) {
    // kill() only fails when the process has already exited.
    let _ = child.kill();
    let _ = child.wait();
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`): returns it if it exists.
/// - `./foo` on Unix or any `./`-prefixed path on other platforms: returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first executable file with that name.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
