use crate::error::{Result, ShellError};
use crate::parser::Command;
use crate::session::Session;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

/// Builtins that may not appear as a stage of a multi-stage pipeline: they change
/// the shell's own state, which a pipeline stage cannot do.
pub const RESTRICTED_IN_PIPELINE: [&str; 2] = ["cd", "exit"];

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd".
    fn name() -> &'static str;

    /// Builds the command from its words without flag parsing.
    fn from_words(words: Vec<String>) -> Self;

    /// Executes the command against the session, writing any output to `stdout`.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<()>;
}

/// Parses `args` for builtin `T` and runs it.
///
/// Words are taken literally: a leading word starting with `-` (other than
/// `--help`) is an operand, not a flag. `--help` prints the usage text and
/// succeeds; anything argh still rejects turns into [`ShellError::Usage`].
fn run<T: BuiltinCommand>(args: &[String], stdout: &mut dyn Write, session: &mut Session) -> Result<()> {
    if args
        .first()
        .is_some_and(|first| first.starts_with('-') && first != "--help")
    {
        return T::from_words(args.to_vec()).execute(stdout, session);
    }
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match T::from_args(&[T::name()], &args) {
        Ok(cmd) => cmd.execute(stdout, session),
        Err(EarlyExit {
            output,
            status: Ok(()),
        }) => {
            stdout.write_all(output.as_bytes())?;
            Ok(())
        }
        Err(EarlyExit {
            output,
            status: Err(()),
        }) => Err(ShellError::Usage {
            name: T::name().to_owned(),
            message: output.trim_end().to_owned(),
        }),
    }
}

pub fn is_restricted_in_pipeline(name: &str) -> bool {
    RESTRICTED_IN_PIPELINE.contains(&name)
}

/// Runs `command` in-process if it names a builtin.
///
/// Returns `None` when the command is not a builtin and must be executed as an
/// external program.
pub fn dispatch(command: &Command, stdout: &mut dyn Write, session: &mut Session) -> Option<Result<()>> {
    let args = &command.args;
    let result = match command.name.as_str() {
        "" => Ok(()),
        "cd" => run::<Cd>(args, stdout, session),
        "exit" => run::<Exit>(args, stdout, session),
        "history" => run::<History>(args, stdout, session),
        _ => return None,
    };
    Some(result)
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the user's home directory.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory. Only the
    /// first one is used. Defaults to the home directory when omitted.
    pub targets: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn from_words(targets: Vec<String>) -> Self {
        Self { targets }
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<()> {
        let target = match self.targets.into_iter().next() {
            Some(t) => PathBuf::from(t),
            None => match &session.home {
                Some(home) => home.clone(),
                None => {
                    return Err(ShellError::ChangeDir {
                        path: PathBuf::from("~"),
                        source: io::Error::new(io::ErrorKind::NotFound, "home directory is unknown"),
                    });
                }
            },
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            session.current_dir.join(target)
        };

        env::set_current_dir(&new_dir).map_err(|source| ShellError::ChangeDir {
            path: new_dir.clone(),
            source,
        })?;
        session.current_dir = env::current_dir().unwrap_or(new_dir);
        log::debug!("working directory is now {}", session.current_dir.display());
        Ok(())
    }
}

#[derive(FromArgs)]
/// Exit the shell with status 0.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; the shell always exits with status 0.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn from_words(_args: Vec<String>) -> Self {
        Self { _args }
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<()> {
        session.should_exit = true;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print every line recorded in the history log.
pub struct History {
    #[argh(positional, greedy)]
    /// ignored; the whole log is always printed.
    pub _args: Vec<String>,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn from_words(_args: Vec<String>) -> Self {
        Self { _args }
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<()> {
        session.history.read_into(stdout)?;
        stdout.flush()?;
        Ok(())
    }
}
