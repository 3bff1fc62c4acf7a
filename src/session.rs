use crate::history::HistoryLog;
use std::env as stdenv;
use std::ffi::OsString;
use std::path::PathBuf;

/// Long-lived state of one shell session.
///
/// The session contains:
/// - `current_dir`: the working directory new processes start in; `cd` keeps it
///   in sync with the process-wide working directory.
/// - `home`: where `cd` without arguments goes.
/// - `history`: the persistent log of executed lines.
/// - `should_exit`: set by `exit`; the interactive loop stops once it is true.
#[derive(Debug)]
pub struct Session {
    pub current_dir: PathBuf,
    pub home: Option<PathBuf>,
    pub history: HistoryLog,
    pub should_exit: bool,
}

impl Session {
    /// Capture the current process state into a new session.
    pub fn new(history: HistoryLog) -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            current_dir,
            home: dirs::home_dir(),
            history,
            should_exit: false,
        }
    }

    /// Directories searched for external programs (`PATH`).
    pub fn search_paths(&self) -> Option<OsString> {
        stdenv::var_os("PATH")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_in_process_cwd() {
        let _lock = crate::test_support::lock_process_state();
        let session = Session::new(HistoryLog::detached("unused"));
        assert_eq!(session.current_dir, stdenv::current_dir().unwrap());
        assert!(!session.should_exit);
    }

    #[test]
    fn search_paths_come_from_process_env() {
        let session = Session::new(HistoryLog::detached("unused"));
        assert!(session.search_paths().is_some());
    }
}
