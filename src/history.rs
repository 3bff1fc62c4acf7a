//! Append-only log of executed input lines.

use crate::error::{Result, ShellError};
use crate::parser::Pipeline;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name of the default log, placed in the user's home directory.
pub const DEFAULT_FILE_NAME: &str = ".pipesh_history";

/// The persistent history log.
///
/// The log holds an append handle for the lifetime of the session; reads always
/// go through the path, so they see everything appended so far. A *detached* log
/// knows its path but never writes.
#[derive(Debug)]
pub struct HistoryLog {
    path: PathBuf,
    file: Option<File>,
}

impl HistoryLog {
    /// Opens (creating if needed) the log at `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&path).map_err(ShellError::History)?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// A log that records nothing.
    pub fn detached(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn is_detached(&self) -> bool {
        self.file.is_none()
    }

    /// Appends one raw input line followed by a newline.
    pub fn append(&mut self, line: &str) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        let mut entry = line.trim_end_matches(['\n', '\r']).to_owned();
        entry.push('\n');
        file.write_all(entry.as_bytes())
            .and_then(|_| file.flush())
            .map_err(ShellError::History)
    }

    /// Copies the whole log to `out`.
    pub fn read_into(&self, out: &mut dyn Write) -> Result<()> {
        let mut file = File::open(&self.path).map_err(ShellError::History)?;
        io::copy(&mut file, out).map_err(ShellError::History)?;
        Ok(())
    }
}

/// Default location of the log: `~/.pipesh_history`.
pub fn default_path(home: Option<&Path>) -> PathBuf {
    match home {
        Some(home) => home.join(DEFAULT_FILE_NAME),
        None => PathBuf::from(DEFAULT_FILE_NAME),
    }
}

/// Whether the line that produced `pipeline` belongs in the log.
///
/// Blank lines are skipped, as are lone `history` and `exit`; pipelines of
/// several stages are always recorded.
pub fn should_record(pipeline: &Pipeline) -> bool {
    match pipeline.stages() {
        [] => false,
        [single] => single.name != "history" && single.name != "exit",
        _ => true,
    }
}
