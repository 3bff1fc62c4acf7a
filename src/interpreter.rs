use crate::command::{InheritedTerminal, Terminal};
use crate::config::Config;
use crate::error::Result;
use crate::executor;
use crate::history;
use crate::parser;
use crate::session::Session;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// The interactive shell: reads lines, runs them, records them.
///
/// The interpreter owns the [`Session`]; nothing about a line outlives its own
/// iteration except what the session keeps (working directory, history log).
///
/// Example
/// ```no_run
/// use pipesh::{Config, Interpreter};
/// let mut sh = Interpreter::new(&Config::default());
/// sh.repl().unwrap();
/// ```
pub struct Interpreter {
    session: Session,
    prompt: String,
}

impl Interpreter {
    /// Create an interpreter as described by `config`, opening its history log.
    pub fn new(config: &Config) -> Self {
        Self::with_session(Session::new(config.open_history()), config.prompt.clone())
    }

    pub fn with_session(session: Session, prompt: impl Into<String>) -> Self {
        Self {
            session,
            prompt: prompt.into(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Whether `exit` has been executed.
    pub fn should_exit(&self) -> bool {
        self.session.should_exit
    }

    /// Parses, executes and records one input line.
    ///
    /// Lines that fail to parse are not recorded. Lines that parse are recorded
    /// after they ran (if eligible), whatever the outcome; a failure to record is
    /// only a warning and never replaces the execution result.
    pub fn eval_line(&mut self, line: &str, terminal: &mut dyn Terminal) -> Result<()> {
        let pipeline = parser::parse(line)?;
        let result = executor::execute(&pipeline, &mut self.session, terminal);

        if history::should_record(&pipeline) {
            if let Err(e) = self.session.history.append(line) {
                log::warn!("failed to record {:?}: {}", line, e);
                eprintln!("warning: could not write to history: {e}");
            }
        }
        result
    }

    /// Read-Eval-Print Loop on the inherited standard streams.
    ///
    /// Runs until `exit`, end of input, or a failure of the line editor itself.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;
        let mut terminal = InheritedTerminal::new();

        while !self.session.should_exit {
            match rl.readline(&self.prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if let Err(e) = self.eval_line(&line, &mut terminal) {
                        eprintln!("{e}");
                    }
                }
                // Ctrl-C at the prompt only drops the current line.
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::command::FileTerminal;
    use crate::error::ShellError;
    use crate::test_support::{lock_process_state, test_session};
    use std::fs;

    fn interpreter() -> (Interpreter, tempfile::TempDir) {
        let (session, dir) = test_session();
        (Interpreter::with_session(session, "> "), dir)
    }

    fn terminal() -> FileTerminal {
        FileTerminal::new(tempfile::tempfile().unwrap())
    }

    fn recorded(dir: &tempfile::TempDir) -> String {
        fs::read_to_string(dir.path().join("history")).unwrap()
    }

    #[test]
    fn external_command_is_recorded_once() {
        let _lock = lock_process_state();
        let (mut sh, dir) = interpreter();
        sh.eval_line("ls", &mut terminal()).unwrap();
        assert_eq!(recorded(&dir), "ls\n");
    }

    #[test]
    fn raw_line_is_recorded_verbatim() {
        let _lock = lock_process_state();
        let (mut sh, dir) = interpreter();
        sh.eval_line("  echo   a |  wc -c ", &mut terminal()).unwrap();
        assert_eq!(recorded(&dir), "  echo   a |  wc -c \n");
    }

    #[test]
    fn history_and_exit_are_not_recorded() {
        let _lock = lock_process_state();
        let (mut sh, dir) = interpreter();
        sh.eval_line("history", &mut terminal()).unwrap();
        sh.eval_line("exit", &mut terminal()).unwrap();
        assert_eq!(recorded(&dir), "");
        assert!(sh.should_exit());
    }

    #[test]
    fn blank_and_malformed_lines_are_not_recorded() {
        let _lock = lock_process_state();
        let (mut sh, dir) = interpreter();
        sh.eval_line("   ", &mut terminal()).unwrap();
        let err = sh.eval_line("ls | | wc", &mut terminal()).unwrap_err();
        assert!(matches!(err, ShellError::Syntax(_)));
        assert_eq!(recorded(&dir), "");
    }

    #[test]
    fn failed_commands_are_still_recorded() {
        let _lock = lock_process_state();
        let (mut sh, dir) = interpreter();
        let err = sh.eval_line("cd /x | ls", &mut terminal()).unwrap_err();
        assert!(matches!(err, ShellError::BuiltinInPipeline(_)));
        let err = sh.eval_line("false", &mut terminal()).unwrap_err();
        assert!(matches!(err, ShellError::Exited { .. }));
        assert_eq!(recorded(&dir), "cd /x | ls\nfalse\n");
    }

    #[test]
    fn detached_history_keeps_results() {
        let _lock = lock_process_state();
        let (mut sh, dir) = interpreter();
        sh.session_mut().history = crate::history::HistoryLog::detached(dir.path().join("other"));
        sh.eval_line("true", &mut terminal()).unwrap();
        assert!(!dir.path().join("other").exists());
    }
}
