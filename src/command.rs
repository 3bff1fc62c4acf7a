use std::fs::File;
use std::io::{self, Write};
use std::process::{ExitStatus, Stdio};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Processes killed by a signal are reported as `128 + signal`, the way POSIX
/// shells do.
pub type ExitCode = i32;

/// The shell's own standard streams.
///
/// External processes receive fresh [`Stdio`] handles for the endpoints they are
/// connected to, builtins write through [`Terminal::out`]. Every call to the
/// `stdio` methods hands out a new handle, so one terminal can serve all stages
/// of a pipeline.
pub trait Terminal {
    /// Input stream for the first stage of a pipeline.
    fn stdin(&self) -> io::Result<Stdio>;

    /// Output stream for the last stage of a pipeline.
    fn stdout(&self) -> io::Result<Stdio>;

    /// Error stream for the last stage of a pipeline.
    fn stderr(&self) -> io::Result<Stdio>;

    /// Writer used by the shell itself (builtins, the interrupt newline).
    fn out(&mut self) -> &mut dyn Write;
}

/// Terminal backed by the streams the shell process inherited.
pub struct InheritedTerminal {
    stdout: io::Stdout,
}

impl InheritedTerminal {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }
}

impl Default for InheritedTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for InheritedTerminal {
    fn stdin(&self) -> io::Result<Stdio> {
        Ok(Stdio::inherit())
    }

    fn stdout(&self) -> io::Result<Stdio> {
        Ok(Stdio::inherit())
    }

    fn stderr(&self) -> io::Result<Stdio> {
        Ok(Stdio::inherit())
    }

    fn out(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }
}

/// Terminal whose output and error streams go to a file and whose input is empty.
///
/// Useful for running lines non-interactively and capturing everything they print.
/// All handles share one file offset, so output lands in the order it was written.
pub struct FileTerminal {
    file: File,
}

impl FileTerminal {
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

impl Terminal for FileTerminal {
    fn stdin(&self) -> io::Result<Stdio> {
        Ok(Stdio::null())
    }

    fn stdout(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.file.try_clone()?))
    }

    fn stderr(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.file.try_clone()?))
    }

    fn out(&mut self) -> &mut dyn Write {
        &mut self.file
    }
}

/// Converts a finished process status into a shell exit code.
pub fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    -1
}
