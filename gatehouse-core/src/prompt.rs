//! Prompt seam between the wizard logic and whatever renders questions.
//!
//! Flows only ever talk to `&mut dyn Prompter`; the CLI supplies a terminal
//! implementation and tests supply [`ScriptedPrompter`] (behind the
//! `test-support` feature).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    /// The user aborted the prompt (Esc / Ctrl-C).
    #[error("cancelled by user")]
    Cancelled,

    /// The prompt backend failed (no TTY, I/O error, exhausted script).
    #[error("prompt failed: {0}")]
    Backend(String),
}

/// Input validator: `Err(message)` re-prompts with `message`.
pub type Validator = fn(&str) -> Result<(), String>;

#[derive(Debug, Clone)]
pub struct TextPrompt {
    pub message: String,
    pub initial: Option<String>,
    pub validate: Option<Validator>,
}

impl TextPrompt {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            initial: None,
            validate: None,
        }
    }

    pub fn initial(mut self, value: impl Into<String>) -> Self {
        self.initial = Some(value.into());
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }
}

/// One option of a select/multiselect prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub hint: Option<String>,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            hint: None,
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

pub trait Prompter {
    /// Titled informational block.
    fn note(&mut self, title: &str, body: &str);

    /// Plain progress line.
    fn log(&mut self, line: &str);

    /// Error line shown to the user.
    fn error(&mut self, line: &str);

    fn text(&mut self, prompt: TextPrompt) -> Result<String, PromptError>;

    /// Hidden input; must be non-empty.
    fn password(&mut self, message: &str) -> Result<String, PromptError>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError>;

    /// Returns the `value` of the chosen option.
    fn select(
        &mut self,
        message: &str,
        choices: &[Choice],
        initial: Option<&str>,
    ) -> Result<String, PromptError>;

    /// Returns the `value`s of the chosen options.
    fn multiselect(&mut self, message: &str, choices: &[Choice]) -> Result<Vec<String>, PromptError>;
}

pub fn validate_required(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err("Required".to_string())
    } else {
        Ok(())
    }
}

pub fn validate_port(value: &str) -> Result<(), String> {
    parse_port(value).map(|_| ())
}

/// Parse a TCP port in 1..=65535.
pub fn parse_port(value: &str) -> Result<u16, String> {
    match value.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err("Invalid port".to_string()),
        Ok(port) => Ok(port),
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use scripted::{Answer, ScriptedPrompter};

#[cfg(any(test, feature = "test-support"))]
mod scripted {
    use std::collections::VecDeque;

    use super::{Choice, PromptError, Prompter, TextPrompt};

    /// Canned answer consumed by the next prompt.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Answer {
        Text(String),
        Confirm(bool),
        Select(String),
        Multi(Vec<String>),
        Cancel,
    }

    /// Prompter that replays a script and records everything shown.
    #[derive(Debug, Default)]
    pub struct ScriptedPrompter {
        answers: VecDeque<Answer>,
        pub asked: Vec<String>,
        pub notes: Vec<(String, String)>,
        pub logs: Vec<String>,
        pub errors: Vec<String>,
    }

    impl ScriptedPrompter {
        pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                ..Self::default()
            }
        }

        pub fn remaining(&self) -> usize {
            self.answers.len()
        }

        /// True if any note title or body contains `needle`.
        pub fn noted(&self, needle: &str) -> bool {
            self.notes
                .iter()
                .any(|(title, body)| title.contains(needle) || body.contains(needle))
        }

        fn next(&mut self, message: &str) -> Result<Answer, PromptError> {
            self.asked.push(message.to_string());
            match self.answers.pop_front() {
                Some(Answer::Cancel) => Err(PromptError::Cancelled),
                Some(answer) => Ok(answer),
                None => Err(PromptError::Backend(format!("script exhausted at '{message}'"))),
            }
        }

        fn mismatch(message: &str, answer: &Answer) -> PromptError {
            PromptError::Backend(format!("unexpected answer {answer:?} for '{message}'"))
        }
    }

    impl Prompter for ScriptedPrompter {
        fn note(&mut self, title: &str, body: &str) {
            self.notes.push((title.to_string(), body.to_string()));
        }

        fn log(&mut self, line: &str) {
            self.logs.push(line.to_string());
        }

        fn error(&mut self, line: &str) {
            self.errors.push(line.to_string());
        }

        fn text(&mut self, prompt: TextPrompt) -> Result<String, PromptError> {
            match self.next(&prompt.message)? {
                Answer::Text(value) => {
                    if let Some(validate) = prompt.validate {
                        validate(&value).map_err(PromptError::Backend)?;
                    }
                    Ok(value)
                }
                other => Err(Self::mismatch(&prompt.message, &other)),
            }
        }

        fn password(&mut self, message: &str) -> Result<String, PromptError> {
            match self.next(message)? {
                Answer::Text(value) if !value.trim().is_empty() => Ok(value),
                other => Err(Self::mismatch(message, &other)),
            }
        }

        fn confirm(&mut self, message: &str, _default: bool) -> Result<bool, PromptError> {
            match self.next(message)? {
                Answer::Confirm(value) => Ok(value),
                other => Err(Self::mismatch(message, &other)),
            }
        }

        fn select(
            &mut self,
            message: &str,
            choices: &[Choice],
            _initial: Option<&str>,
        ) -> Result<String, PromptError> {
            match self.next(message)? {
                Answer::Select(value) if choices.iter().any(|c| c.value == value) => Ok(value),
                other => Err(Self::mismatch(message, &other)),
            }
        }

        fn multiselect(
            &mut self,
            message: &str,
            choices: &[Choice],
        ) -> Result<Vec<String>, PromptError> {
            match self.next(message)? {
                Answer::Multi(values)
                    if values.iter().all(|v| choices.iter().any(|c| &c.value == v)) =>
                {
                    Ok(values)
                }
                other => Err(Self::mismatch(message, &other)),
            }
        }
    }
}
