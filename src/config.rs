use crate::history::{self, HistoryLog};
use argh::FromArgs;
use std::path::PathBuf;

/// Prompt shown before every input line unless `--prompt` says otherwise.
pub const DEFAULT_PROMPT: &str = "> ";

#[derive(FromArgs, Debug)]
/// Interactive shell running single commands and pipelines.
pub struct Config {
    #[argh(option)]
    /// file executed lines are appended to. Defaults to ~/.pipesh_history.
    pub history_file: Option<PathBuf>,

    #[argh(switch)]
    /// do not record executed lines.
    pub no_history: bool,

    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// text shown before each input line.
    pub prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_file: None,
            no_history: false,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl Config {
    /// The history file in effect: the explicit option, else the default in `home`.
    pub fn history_path(&self) -> PathBuf {
        match &self.history_file {
            Some(path) => path.clone(),
            None => history::default_path(dirs::home_dir().as_deref()),
        }
    }

    /// Opens the history log this configuration asks for.
    ///
    /// A log that cannot be opened is not fatal: the shell warns and keeps running
    /// with a detached log.
    pub fn open_history(&self) -> HistoryLog {
        let path = self.history_path();
        if self.no_history {
            return HistoryLog::detached(path);
        }
        match HistoryLog::open(&path) {
            Ok(log) => log,
            Err(e) => {
                log::warn!("history disabled: {}", e);
                eprintln!("warning: could not open history: {e}");
                HistoryLog::detached(path)
            }
        }
    }
}
