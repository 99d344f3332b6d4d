//! Terminal [`Prompter`] backed by dialoguer.

use std::io::ErrorKind;

use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Password, Select};
use gatehouse_core::{Choice, PromptError, Prompter, TextPrompt};

pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

fn backend(err: dialoguer::Error) -> PromptError {
    match err {
        dialoguer::Error::IO(io) if io.kind() == ErrorKind::Interrupted => PromptError::Cancelled,
        other => PromptError::Backend(other.to_string()),
    }
}

fn labels(choices: &[Choice]) -> Vec<String> {
    choices
        .iter()
        .map(|c| match &c.hint {
            Some(hint) => format!("{} ({})", c.label, hint),
            None => c.label.clone(),
        })
        .collect()
}

impl Prompter for DialoguerPrompter {
    fn note(&mut self, title: &str, body: &str) {
        println!();
        println!("{}", title.bold().cyan());
        for line in body.lines() {
            println!("  {line}");
        }
        println!();
    }

    fn log(&mut self, line: &str) {
        println!("{line}");
    }

    fn error(&mut self, line: &str) {
        eprintln!("{}", line.red());
    }

    fn text(&mut self, prompt: TextPrompt) -> Result<String, PromptError> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(&prompt.message)
            .allow_empty(true);
        if let Some(initial) = &prompt.initial {
            input = input.with_initial_text(initial);
        }
        if let Some(validate) = prompt.validate {
            input = input.validate_with(move |value: &String| validate(value));
        }
        input.interact_text().map_err(backend)
    }

    fn password(&mut self, message: &str) -> Result<String, PromptError> {
        Password::with_theme(&self.theme)
            .with_prompt(message)
            .interact()
            .map_err(backend)
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError> {
        Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact_opt()
            .map_err(backend)?
            .ok_or(PromptError::Cancelled)
    }

    fn select(
        &mut self,
        message: &str,
        choices: &[Choice],
        initial: Option<&str>,
    ) -> Result<String, PromptError> {
        let default = initial
            .and_then(|value| choices.iter().position(|c| c.value == value))
            .unwrap_or(0);
        let index = Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(&labels(choices))
            .default(default)
            .interact_opt()
            .map_err(backend)?
            .ok_or(PromptError::Cancelled)?;
        choices
            .get(index)
            .map(|c| c.value.clone())
            .ok_or_else(|| PromptError::Backend(format!("selection {index} out of range")))
    }

    fn multiselect(&mut self, message: &str, choices: &[Choice]) -> Result<Vec<String>, PromptError> {
        let picked = MultiSelect::with_theme(&self.theme)
            .with_prompt(message)
            .items(&labels(choices))
            .interact_opt()
            .map_err(backend)?
            .ok_or(PromptError::Cancelled)?;
        Ok(picked
            .into_iter()
            .filter_map(|i| choices.get(i).map(|c| c.value.clone()))
            .collect())
    }
}
