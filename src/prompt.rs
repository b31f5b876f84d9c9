//! Interactive prompts.
//!
//! Everything that asks the user a question goes through [`Prompter`], so
//! the provisioning flows can be driven by a script in tests. The terminal
//! implementation wraps `dialoguer`.

use crate::error::ProvisionError;
use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};
use yaml_rust::Yaml;
use yaml_rust::yaml::Hash;

pub trait Prompter {
    /// Free text with a default used on empty input
    fn text(&mut self, message: &str, default: &str) -> Result<String>;

    /// Masked input
    fn password(&mut self, message: &str) -> Result<String>;

    /// Pick one entry of `options`, returned by value
    fn select(&mut self, message: &str, options: &[&str]) -> Result<String>;

    /// Yes/no question
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;

    /// Integer with a default; non-numeric input is asked again
    fn int(&mut self, message: &str, default: i64) -> Result<i64>;
}

/// Terminal prompts backed by dialoguer.
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

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self::new()
    }
}

fn input_error(err: dialoguer::Error) -> anyhow::Error {
    ProvisionError::Input(err.to_string()).into()
}

impl Prompter for DialoguerPrompter {
    fn text(&mut self, message: &str, default: &str) -> Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(message)
            .default(default.to_string())
            .allow_empty(default.is_empty())
            .interact_text()
            .map_err(input_error)
    }

    fn password(&mut self, message: &str) -> Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(message)
            .interact()
            .map_err(input_error)
    }

    fn select(&mut self, message: &str, options: &[&str]) -> Result<String> {
        if options.is_empty() {
            anyhow::bail!("No options to choose from for '{}'", message);
        }
        let index = Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(options)
            .default(0)
            .interact()
            .map_err(input_error)?;
        Ok(options[index].to_string())
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact()
            .map_err(input_error)
    }

    fn int(&mut self, message: &str, default: i64) -> Result<i64> {
        Input::<i64>::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact_text()
            .map_err(input_error)
    }
}

/// Ask for an integer until it falls inside `[min, max]`.
pub fn prompt_int_with_range(
    prompter: &mut dyn Prompter,
    message: &str,
    default: i64,
    min: i64,
    max: i64,
) -> Result<i64> {
    loop {
        let value = prompter.int(message, default)?;
        if value < min || value > max {
            println!("Value must be between {} and {}", min, max);
            continue;
        }
        return Ok(value);
    }
}

/// Ask for a comma separated list, keeping `current` when left unchanged.
pub fn prompt_list(prompter: &mut dyn Prompter, message: &str, current: &[String]) -> Result<Vec<String>> {
    let joined = current.join(", ");
    let answer = prompter.text(message, &joined)?;
    if answer == joined {
        return Ok(current.to_vec());
    }
    Ok(split_list(&answer))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn string_list(items: &[Yaml]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn key_label(key: &Yaml) -> String {
    match key {
        Yaml::String(s) => s.clone(),
        Yaml::Integer(i) => i.to_string(),
        Yaml::Boolean(b) => b.to_string(),
        other => format!("{:?}", other),
    }
}

/// Prompt for every entry of a YAML mapping, in document order.
///
/// The prompt kind follows the default's type: strings get a text prompt,
/// integers an integer prompt, booleans a confirmation and lists of strings
/// a comma separated text prompt. Anything else is kept as it is.
pub fn prompt_yaml_variables(prompter: &mut dyn Prompter, variables: &Hash) -> Result<Hash> {
    let mut result = Hash::new();

    for (key, default) in variables {
        let name = key_label(key);
        let value = match default {
            Yaml::String(v) => Yaml::String(prompter.text(&format!("{} ({})", name, v), v)?),
            Yaml::Integer(v) => Yaml::Integer(prompter.int(&format!("{} ({})", name, v), *v)?),
            Yaml::Boolean(v) => Yaml::Boolean(prompter.confirm(&format!("{} ({})", name, v), *v)?),
            Yaml::Array(items) => match string_list(items) {
                Some(current) => {
                    let label = format!("{} ({})", name, current.join(", "));
                    let answer = prompt_list(prompter, &label, &current)?;
                    Yaml::Array(answer.into_iter().map(Yaml::String).collect())
                }
                None => default.clone(),
            },
            other => other.clone(),
        };
        result.insert(key.clone(), value);
    }

    Ok(result)
}

#[cfg(test)]
pub(crate) mod scripted {
    use super::*;
    use std::collections::VecDeque;

    /// One scripted reply.
    #[derive(Debug, Clone)]
    pub enum Answer {
        Text(String),
        Int(i64),
        Confirm(bool),
        Select(String),
        /// Accept whatever default the prompt offers
        Default,
    }

    /// Replays answers in order; running out behaves like closed input.
    #[derive(Debug, Default)]
    pub struct ScriptedPrompter {
        answers: VecDeque<Answer>,
        pub asked: Vec<String>,
    }

    impl ScriptedPrompter {
        pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                asked: Vec::new(),
            }
        }

        pub fn remaining(&self) -> usize {
            self.answers.len()
        }

        fn next(&mut self, message: &str) -> Result<Answer> {
            self.asked.push(message.to_string());
            self.answers
                .pop_front()
                .ok_or_else(|| ProvisionError::Input("input stream closed".to_string()).into())
        }
    }

    impl Prompter for ScriptedPrompter {
        fn text(&mut self, message: &str, default: &str) -> Result<String> {
            match self.next(message)? {
                Answer::Text(v) => Ok(v),
                Answer::Default => Ok(default.to_string()),
                other => panic!("text prompt '{}' got {:?}", message, other),
            }
        }

        fn password(&mut self, message: &str) -> Result<String> {
            match self.next(message)? {
                Answer::Text(v) => Ok(v),
                other => panic!("password prompt '{}' got {:?}", message, other),
            }
        }

        fn select(&mut self, message: &str, options: &[&str]) -> Result<String> {
            match self.next(message)? {
                Answer::Select(v) => {
                    assert!(options.contains(&v.as_str()), "'{}' not in {:?}", v, options);
                    Ok(v)
                }
                Answer::Default => Ok(options[0].to_string()),
                other => panic!("select prompt '{}' got {:?}", message, other),
            }
        }

        fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
            match self.next(message)? {
                Answer::Confirm(v) => Ok(v),
                Answer::Default => Ok(default),
                other => panic!("confirm prompt '{}' got {:?}", message, other),
            }
        }

        fn int(&mut self, message: &str, default: i64) -> Result<i64> {
            match self.next(message)? {
                Answer::Int(v) => Ok(v),
                Answer::Default => Ok(default),
                other => panic!("int prompt '{}' got {:?}", message, other),
            }
        }
    }
}
