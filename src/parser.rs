//! Turning a raw input line into a [`Pipeline`].
//!
//! The grammar is deliberately flat: a line is a sequence of stages separated by
//! the pipe operator (`|`), and each stage is a sequence of whitespace-separated
//! words. There is no quoting, escaping or substitution, every word is taken
//! literally.

use thiserror::Error;

/// The pipe operator separating stages of a pipeline.
pub const PIPE: char = '|';

/// A single command: the program (or builtin) name followed by its arguments.
///
/// An empty `name` stands for "no command"; the parser never puts one into a
/// non-empty [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Commands connected output-to-input, in execution order.
///
/// An empty pipeline means there is nothing to execute (blank input).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pipeline {
    stages: Vec<Command>,
}

impl Pipeline {
    pub fn new(stages: Vec<Command>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Command] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Errors produced while splitting a line into stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// A stage between two pipe operators (or at either edge of the line)
    /// contains no words. `index` is zero-based.
    #[error("syntax error: empty command at pipeline stage {}", index + 1)]
    EmptyStage { index: usize },
}

/// Parses a raw input line into a pipeline.
///
/// Surrounding whitespace is ignored and a blank line yields an empty pipeline.
/// Any stage without words aborts parsing of the whole line.
///
/// ```
/// use pipesh::parser::{parse, Command};
/// let pipeline = parse("ls -la | wc -l").unwrap();
/// assert_eq!(pipeline.stages()[0], Command::new("ls", ["-la"]));
/// assert_eq!(pipeline.stages()[1], Command::new("wc", ["-l"]));
/// ```
pub fn parse(raw: &str) -> Result<Pipeline, SyntaxError> {
    let line = raw.trim();
    if line.is_empty() {
        return Ok(Pipeline::default());
    }

    let mut stages = Vec::new();
    for (index, stage) in line.split(PIPE).enumerate() {
        let mut words = stage.split_whitespace().map(str::to_owned);
        let Some(name) = words.next() else {
            return Err(SyntaxError::EmptyStage { index });
        };
        stages.push(Command {
            name,
            args: words.collect(),
        });
    }

    Ok(Pipeline::new(stages))
}
