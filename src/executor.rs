//! Running parsed pipelines.
//!
//! A single-stage pipeline is either a builtin, run in-process, or one external
//! process attached directly to the terminal. Longer pipelines are always
//! external: every stage becomes a [`Stage`], the stages are chained by OS pipes,
//! all of them are started, and only then are they waited on in order. Starting
//! before waiting is what lets the stages run concurrently; a downstream stage
//! blocks on its input until its upstream partner produces data.
//!
//! Each run installs its own [`InterruptGuard`]. If the guard's token gets
//! cancelled, the failure it causes is not reported: the executor prints a single
//! newline (to finish the `^C` line) and the pipeline counts as successful.

use crate::builtin;
use crate::cancel::InterruptGuard;
use crate::command::Terminal;
use crate::error::{Result, ShellError};
use crate::parser::{Command, Pipeline};
use crate::process::Stage;
use crate::session::Session;
use std::process::Stdio;

/// Executes `pipeline` against `session`, attached to `terminal`.
pub fn execute(pipeline: &Pipeline, session: &mut Session, terminal: &mut dyn Terminal) -> Result<()> {
    match pipeline.stages() {
        [] => Ok(()),
        [single] => match builtin::dispatch(single, terminal.out(), session) {
            Some(result) => result,
            None => run_external(single, session, terminal),
        },
        stages => run_pipeline(stages, session, terminal),
    }
}

fn run_external(command: &Command, session: &Session, terminal: &mut dyn Terminal) -> Result<()> {
    let guard = InterruptGuard::install()?;
    let result = run_attached(command, session, &guard, terminal);
    settle(result, terminal)
}

fn run_attached(
    command: &Command,
    session: &Session,
    guard: &InterruptGuard,
    terminal: &dyn Terminal,
) -> Result<()> {
    let mut stage = Stage::new(command, session, guard.token().clone())?;
    stage.start(terminal.stdin()?, terminal.stdout()?, terminal.stderr()?)?;
    stage.wait()
}

fn run_pipeline(commands: &[Command], session: &Session, terminal: &mut dyn Terminal) -> Result<()> {
    if let Some(command) = commands
        .iter()
        .find(|c| builtin::is_restricted_in_pipeline(&c.name))
    {
        return Err(ShellError::BuiltinInPipeline(command.name.clone()));
    }

    let guard = InterruptGuard::install()?;
    let result = run_chained(commands, session, &guard, terminal);
    settle(result, terminal)
}

fn run_chained(
    commands: &[Command],
    session: &Session,
    guard: &InterruptGuard,
    terminal: &dyn Terminal,
) -> Result<()> {
    let mut stages = commands
        .iter()
        .map(|command| Stage::new(command, session, guard.token().clone()))
        .collect::<Result<Vec<_>>>()?;
    start_all(&mut stages, terminal)?;
    wait_all(&mut stages)
}

/// Starts every stage, chaining each stage's output into the next one's input.
///
/// Only the last stage writes to the terminal. Interior stages have their error
/// stream discarded; that keeps diagnostics of intermediate filters off the
/// terminal, as the shell has always done.
///
/// On failure the already started stages are killed and reaped when `stages` is
/// dropped by the caller.
fn start_all(stages: &mut [Stage], terminal: &dyn Terminal) -> Result<()> {
    let last = stages.len() - 1;
    let mut input = terminal.stdin()?;
    for (i, stage) in stages.iter_mut().enumerate() {
        let (stdout, stderr) = if i == last {
            (terminal.stdout()?, terminal.stderr()?)
        } else {
            (Stdio::piped(), Stdio::null())
        };
        stage.start(input, stdout, stderr)?;

        input = match stage.take_stdout() {
            Some(pipe) => Stdio::from(pipe),
            None => Stdio::null(),
        };
    }
    Ok(())
}

/// Waits on every stage in start order, even after one of them failed.
///
/// Returns the first failure that is not a cancellation. Cancellations are only
/// returned when nothing else failed.
fn wait_all(stages: &mut [Stage]) -> Result<()> {
    let mut first_error = None;
    let mut cancelled = false;
    for stage in stages.iter_mut() {
        match stage.wait() {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => cancelled = true,
            Err(e) => {
                log::debug!("stage {} failed: {}", stage.name(), e);
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None if cancelled => Err(ShellError::Cancelled),
        None => Ok(()),
    }
}

/// Hides the failure caused by an interrupt behind a single newline.
fn settle(result: Result<()>, terminal: &mut dyn Terminal) -> Result<()> {
    match result {
        Err(e) if e.is_cancelled() => {
            log::debug!("pipeline interrupted");
            let out = terminal.out();
            writeln!(out)?;
            out.flush()?;
            Ok(())
        }
        other => other,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::command::FileTerminal;
    use crate::parser::parse;
    use crate::test_support::{lock_process_state, test_session};
    use signal_hook::consts::SIGINT;
    use std::fs::{self, File};
    use std::io::{Read, Seek, SeekFrom};
    use std::thread;
    use std::time::{Duration, Instant};

    /// Terminal writing into an anonymous temp file, plus a handle to read it back.
    fn capture() -> (FileTerminal, File) {
        let file = tempfile::tempfile().unwrap();
        let reader = file.try_clone().unwrap();
        (FileTerminal::new(file), reader)
    }

    fn contents(mut reader: File) -> String {
        reader.seek(SeekFrom::Start(0)).unwrap();
        let mut s = String::new();
        reader.read_to_string(&mut s).unwrap();
        s
    }

    fn run(line: &str) -> (Result<()>, String) {
        let (mut session, _dir) = test_session();
        let (mut term, reader) = capture();
        let res = execute(&parse(line).unwrap(), &mut session, &mut term);
        (res, contents(reader))
    }

    #[test]
    fn only_cancellation_is_hidden_behind_a_newline() {
        let (mut term, reader) = capture();
        assert!(settle(Err(ShellError::Cancelled), &mut term).is_ok());
        let failed = Err(ShellError::Exited {
            name: "false".to_owned(),
            code: 1,
        });
        assert!(matches!(
            settle(failed, &mut term),
            Err(ShellError::Exited { code: 1, .. })
        ));
        assert_eq!(contents(reader), "\n");
    }

    #[test]
    fn empty_pipeline_does_nothing() {
        let _lock = lock_process_state();
        let (res, out) = run("");
        assert!(res.is_ok());
        assert_eq!(out, "");
    }

    #[test]
    fn single_external_command_writes_to_terminal() {
        let _lock = lock_process_state();
        let (res, out) = run("echo hello world");
        assert!(res.is_ok());
        assert_eq!(out, "hello world\n");
    }

    #[test]
    fn echo_piped_into_line_counter() {
        let _lock = lock_process_state();
        let (res, out) = run("echo hello | wc -l");
        assert!(res.is_ok());
        assert_eq!(out.trim_start(), "1\n");
    }

    #[test]
    fn three_stage_pipeline_streams_through() {
        let _lock = lock_process_state();
        let (res, out) = run("printf a\\nb\\nc\\n | sort -r | head -n 2");
        assert!(res.is_ok());
        assert_eq!(out, "c\nb\n");
    }

    #[test]
    fn upstream_sees_broken_pipe_when_downstream_exits() {
        let _lock = lock_process_state();
        let started = Instant::now();
        let (res, out) = run("yes | head -n 1");
        assert_eq!(out, "y\n");
        // `yes` dies of SIGPIPE, which is reported as its exit status.
        assert!(matches!(res, Err(ShellError::Exited { ref name, .. }) if name == "yes"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn builtin_in_pipeline_spawns_nothing() {
        let _lock = lock_process_state();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let line = format!("cd /x | touch {}", marker.display());

        let (res, _) = run(&line);

        assert!(matches!(res, Err(ShellError::BuiltinInPipeline(ref name)) if name == "cd"));
        assert!(!marker.exists());
    }

    #[test]
    fn exit_in_pipeline_is_rejected() {
        let _lock = lock_process_state();
        let (res, _) = run("ls | exit");
        assert!(matches!(res, Err(ShellError::BuiltinInPipeline(ref name)) if name == "exit"));
    }

    #[test]
    fn unknown_stage_spawns_nothing() {
        let _lock = lock_process_state();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let line = format!("touch {} | no-such-program-here", marker.display());

        let (res, _) = run(&line);

        assert!(matches!(res, Err(ShellError::NotFound { .. })));
        assert!(!marker.exists());
    }

    #[test]
    fn first_failure_in_wait_order_is_returned() {
        let _lock = lock_process_state();
        let (res, _) = run("false | true | ls /definitely/not/here");
        assert!(matches!(res, Err(ShellError::Exited { ref name, code: 1 }) if name == "false"));
    }

    #[test]
    fn failing_last_stage_is_reported() {
        let _lock = lock_process_state();
        let (res, _) = run("echo hi | false");
        assert!(matches!(res, Err(ShellError::Exited { ref name, code: 1 }) if name == "false"));
    }

    #[test]
    fn later_stages_are_still_waited_after_a_failure() {
        let _lock = lock_process_state();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("done");
        let line = format!("false | touch {}", marker.display());

        let (res, _) = run(&line);

        assert!(matches!(res, Err(ShellError::Exited { ref name, .. }) if name == "false"));
        assert!(marker.exists());
    }

    #[test]
    fn interior_stderr_is_discarded() {
        let _lock = lock_process_state();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let line = format!("ls {} | cat", missing.display());

        let (res, out) = run(&line);

        assert!(matches!(res, Err(ShellError::Exited { ref name, .. }) if name == "ls"));
        assert_eq!(out, "");
    }

    #[test]
    fn last_stderr_reaches_terminal() {
        let _lock = lock_process_state();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let line = format!("true | ls {}", missing.display());

        let (res, out) = run(&line);

        assert!(matches!(res, Err(ShellError::Exited { ref name, .. }) if name == "ls"));
        assert!(out.contains("missing"));
    }

    #[test]
    fn interrupting_single_command_prints_one_newline() {
        let _lock = lock_process_state();
        let interrupter = thread::spawn(|| {
            thread::sleep(Duration::from_millis(300));
            signal_hook::low_level::raise(SIGINT).unwrap();
        });
        let started = Instant::now();

        let (res, out) = run("sleep 10");
        interrupter.join().unwrap();

        assert!(res.is_ok());
        assert_eq!(out, "\n");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn interrupting_pipeline_prints_one_newline() {
        let _lock = lock_process_state();
        let interrupter = thread::spawn(|| {
            thread::sleep(Duration::from_millis(300));
            signal_hook::low_level::raise(SIGINT).unwrap();
        });
        let started = Instant::now();

        let (res, out) = run("sleep 10 | sleep 10 | cat");
        interrupter.join().unwrap();

        assert!(res.is_ok());
        assert_eq!(out, "\n");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn builtins_run_in_process() {
        let _lock = lock_process_state();
        let (mut session, dir) = test_session();
        session.history.append("ls").unwrap();
        let (mut term, reader) = capture();

        let res = execute(&parse("history").unwrap(), &mut session, &mut term);

        assert!(res.is_ok());
        assert_eq!(contents(reader), "ls\n");
        assert_eq!(fs::read_to_string(dir.path().join("history")).unwrap(), "ls\n");
    }

    #[test]
    fn processes_start_in_session_directory() {
        let _lock = lock_process_state();
        let (mut session, _dir) = test_session();
        let work = tempfile::tempdir().unwrap();
        session.current_dir = fs::canonicalize(work.path()).unwrap();
        let (mut term, reader) = capture();

        let res = execute(&parse("pwd").unwrap(), &mut session, &mut term);

        assert!(res.is_ok());
        assert_eq!(
            contents(reader).trim_end(),
            session.current_dir.to_string_lossy()
        );
    }
}
