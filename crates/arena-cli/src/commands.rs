use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use arena_dispatch::{ChatMessage, DispatchReport, Dispatcher, ModelOutcome};
use arena_llm::{ConfigError, ModelConfig, ProviderKind, Role};

pub const USAGE: &str = "\
Usage: arena <command>

Commands:
  models                                        List configured models
  add <provider> <name> <model-name> [--endpoint URL]
                                                Add a model (API key from ARENA_API_KEY)
  edit <id> [--name N] [--model-name M] [--endpoint URL]
                                                Change a model in place (new key from ARENA_API_KEY if set)
  remove <id>                                   Remove a model and its conversation
  move <from> <to>                              Reorder models (0-based positions)
  send <prompt...>                              Send a prompt to every model
  retry <id>                                    Resend the last prompt to one model
  history <id>                                  Show one model's conversation
  clear [<id>]                                  Clear one conversation, or all of them

Providers: openai, azure, gemini, aws";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Models,
    Add {
        provider: ProviderKind,
        name: String,
        model_name: String,
        endpoint: Option<String>,
    },
    Edit { id: String, changes: ModelEdit },
    Remove { id: String },
    Move { from: usize, to: usize },
    Send { prompt: String },
    Retry { id: String },
    History { id: String },
    Clear { id: Option<String> },
    Help,
}

/// Fields to change on a saved model; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelEdit {
    pub name: Option<String>,
    pub model_name: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl ModelEdit {
    /// Rebuild `existing` with these changes, keeping its id and provider
    pub fn apply(self, existing: &ModelConfig) -> Result<ModelConfig, ConfigError> {
        let mut builder = ModelConfig::builder(existing.provider.clone())
            .id(existing.id.clone())
            .name(self.name.unwrap_or_else(|| existing.name.clone()))
            .api_key(self.api_key.unwrap_or_else(|| existing.api_key.clone()))
            .model_name(self.model_name.unwrap_or_else(|| existing.model_name.clone()));
        if let Some(endpoint) = self.endpoint.or_else(|| existing.endpoint.clone()) {
            builder = builder.endpoint(endpoint);
        }
        builder.build()
    }
}

impl Command {
    /// Parse the arguments that follow the binary name
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((command, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };

        match command.as_str() {
            "models" | "ls" => Ok(Command::Models),
            "add" => parse_add(rest),
            "edit" => parse_edit(rest),
            "remove" | "rm" => Ok(Command::Remove {
                id: single(rest, "remove <id>")?,
            }),
            "move" | "mv" => match rest {
                [from, to] => Ok(Command::Move {
                    from: from.parse().with_context(|| format!("Invalid position: {}", from))?,
                    to: to.parse().with_context(|| format!("Invalid position: {}", to))?,
                }),
                _ => bail!("Usage: arena move <from> <to>"),
            },
            "send" => {
                let prompt = rest.join(" ");
                if prompt.trim().is_empty() {
                    bail!("Usage: arena send <prompt...>");
                }
                Ok(Command::Send { prompt })
            }
            "retry" => Ok(Command::Retry {
                id: single(rest, "retry <id>")?,
            }),
            "history" => Ok(Command::History {
                id: single(rest, "history <id>")?,
            }),
            "clear" => match rest {
                [] => Ok(Command::Clear { id: None }),
                [id] => Ok(Command::Clear { id: Some(id.clone()) }),
                _ => bail!("Usage: arena clear [<id>]"),
            },
            "help" | "--help" | "-h" => Ok(Command::Help),
            other => bail!("Unknown command: {}\n\n{}", other, USAGE),
        }
    }

    /// Run against a dispatcher whose workspace is already loaded
    pub async fn run(self, dispatcher: &Dispatcher) -> Result<()> {
        match self {
            Command::Help => println!("{}", USAGE),

            Command::Models => {
                let handle = dispatcher.workspace();
                let workspace = handle.lock().await;
                if workspace.models().is_empty() {
                    println!("No models configured. Add one with `arena add`.");
                }
                for (position, model) in workspace.models().iter().enumerate() {
                    println!("{}", describe_model(position, model));
                }
            }

            Command::Add {
                provider,
                name,
                model_name,
                endpoint,
            } => {
                let api_key = std::env::var("ARENA_API_KEY")
                    .map_err(|_| anyhow!("ARENA_API_KEY environment variable is required"))?;

                let mut builder = ModelConfig::builder(provider)
                    .name(name)
                    .api_key(api_key)
                    .model_name(model_name);
                if let Some(endpoint) = endpoint {
                    builder = builder.endpoint(endpoint);
                }
                let config = builder.build()?;

                let id = dispatcher
                    .update(|ws| ws.save_model(config).map(|m| m.id.clone()))
                    .await?;
                println!("{}", id);
            }

            Command::Edit { id, mut changes } => {
                if let Ok(api_key) = std::env::var("ARENA_API_KEY") {
                    changes.api_key = Some(api_key);
                }

                let name = dispatcher
                    .update(|ws| -> Result<String> {
                        let existing = ws
                            .model(&id)
                            .ok_or_else(|| anyhow!("Model not found: {}", id))?;
                        let updated = changes.apply(existing)?;
                        Ok(ws.save_model(updated)?.name.clone())
                    })
                    .await?;
                println!("Updated {} ({})", name, id);
            }

            Command::Remove { id } => {
                let removed = dispatcher.update(|ws| ws.delete_model(&id)).await?;
                println!("Removed {} ({})", removed.name, removed.id);
            }

            Command::Move { from, to } => {
                dispatcher.update(|ws| ws.move_model(from, to)).await?;
            }

            Command::Send { prompt } => match dispatcher.send_to_all(&prompt).await {
                Some(report) => print_report(&report),
                None => println!("Nothing sent: add a model first."),
            },

            Command::Retry { id } => {
                let outcome = dispatcher.retry_model(&id).await.ok_or_else(|| {
                    anyhow!("Nothing to retry for {}: unknown model or no prompt sent yet", id)
                })?;
                print_outcome(&outcome);
            }

            Command::History { id } => {
                let handle = dispatcher.workspace();
                let workspace = handle.lock().await;
                let model = workspace
                    .model(&id)
                    .ok_or_else(|| anyhow!("Model not found: {}", id))?;

                println!("== {} ({})", model.name, model.provider.display_name());
                for message in workspace.conversations().all_messages(&id) {
                    println!("{}", describe_message(message));
                }
            }

            Command::Clear { id: Some(id) } => {
                dispatcher.update(|ws| ws.clear_conversation(&id)).await?;
            }

            Command::Clear { id: None } => {
                dispatcher.update(|ws| ws.clear_all_conversations()).await;
            }
        }

        Ok(())
    }
}

fn parse_add(rest: &[String]) -> Result<Command> {
    let (positional, mut flags) = split_flags(rest, &["--endpoint"])?;

    match positional.as_slice() {
        [provider, name, model_name] => Ok(Command::Add {
            provider: provider.parse()?,
            name: name.to_string(),
            model_name: model_name.to_string(),
            endpoint: flags.remove("--endpoint"),
        }),
        _ => bail!("Usage: arena add <provider> <name> <model-name> [--endpoint URL]"),
    }
}

fn parse_edit(rest: &[String]) -> Result<Command> {
    let (positional, mut flags) = split_flags(rest, &["--name", "--model-name", "--endpoint"])?;

    match positional.as_slice() {
        [id] => Ok(Command::Edit {
            id: id.to_string(),
            changes: ModelEdit {
                name: flags.remove("--name"),
                model_name: flags.remove("--model-name"),
                endpoint: flags.remove("--endpoint"),
                api_key: None,
            },
        }),
        _ => bail!("Usage: arena edit <id> [--name N] [--model-name M] [--endpoint URL]"),
    }
}

/// Separate `--flag value` pairs from positional arguments
fn split_flags<'a>(
    rest: &'a [String],
    known: &[&'static str],
) -> Result<(Vec<&'a String>, HashMap<&'static str, String>)> {
    let mut positional = Vec::new();
    let mut flags = HashMap::new();

    let mut args = rest.iter();
    while let Some(arg) = args.next() {
        if !arg.starts_with("--") {
            positional.push(arg);
            continue;
        }
        let flag = known
            .iter()
            .copied()
            .find(|k| k == arg)
            .ok_or_else(|| anyhow!("Unknown option: {}", arg))?;
        let value = args
            .next()
            .ok_or_else(|| anyhow!("{} needs a value", flag))?;
        flags.insert(flag, value.clone());
    }

    Ok((positional, flags))
}

fn single(rest: &[String], usage: &str) -> Result<String> {
    match rest {
        [value] => Ok(value.clone()),
        _ => bail!("Usage: arena {}", usage),
    }
}

/// Show only enough of a key to tell two apart
pub fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    if key.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

fn describe_model(position: usize, model: &ModelConfig) -> String {
    let mut line = format!(
        "[{}] {}  {} / {}  key={}",
        position,
        model.id,
        model.provider.display_name(),
        model.model_name,
        mask_key(&model.api_key),
    );
    if let Some(endpoint) = &model.endpoint {
        line.push_str(&format!("  endpoint={}", endpoint));
    }
    format!("{}  \"{}\"", line, model.name)
}

fn describe_message(message: &ChatMessage) -> String {
    match message.role {
        Role::User => format!("> {}", message.content),
        Role::Assistant if message.is_loading() => "< (waiting)".to_string(),
        Role::Assistant if message.is_error() => {
            format!("< error: {}", message.error.as_deref().unwrap_or("unknown"))
        }
        Role::Assistant => format!("< {}{}", message.content, stats(message)),
    }
}

fn stats(message: &ChatMessage) -> String {
    match (message.response_time, message.token_count) {
        (Some(ms), Some(tokens)) => format!("  [{} ms, {} tokens]", ms, tokens),
        (Some(ms), None) => format!("  [{} ms]", ms),
        (None, Some(tokens)) => format!("  [{} tokens]", tokens),
        (None, None) => String::new(),
    }
}

fn print_outcome(outcome: &ModelOutcome) {
    println!("== {}", outcome.model_name);
    println!("{}", describe_message(&outcome.message));
}

fn print_report(report: &DispatchReport) {
    for outcome in &report.outcomes {
        print_outcome(outcome);
        println!();
    }
    println!(
        "{} succeeded, {} failed in {} ms",
        report.succeeded(),
        report.failed(),
        report.elapsed_ms
    );
}
