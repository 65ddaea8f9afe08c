#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use prompt_chain::notify::LogNotifier;
use prompt_chain::resolve::VariableSubstitutor;
use prompt_chain::storage::FileStore;
use prompt_chain::{Catalog, EditorConfig, EditorSession, OrderEntry, PromptField, Role};

type Session = EditorSession<FileStore, LogNotifier>;

/// Edit prompt-chain presets stored on disk
#[derive(Parser, Debug)]
#[command(name = "prompt-chain")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Storage directory (overrides the config file)
    #[arg(long, value_name = "DIR", global = true)]
    store_dir: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage named presets
    Presets {
        #[command(subcommand)]
        action: PresetAction,
    },
    /// Print a section's order with prompt contents
    Show { section: String },
    /// Append an empty system prompt to a section
    Add { section: String },
    /// Delete the order entry at POSITION (prompt references are renumbered)
    Delete { section: String, position: usize },
    /// Change the role of prompt INDEX
    SetRole { section: String, index: usize, role: Role },
    /// Replace the content of prompt INDEX
    SetContent { section: String, index: usize, content: String },
    /// Move the order entry at FROM so it ends at TO
    Move { section: String, from: usize, to: usize },
    /// Restore a section from the built-in template
    Reset { section: String },
    /// Write a section export to FILE, or stdout
    Export {
        section: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace a section from an export file
    Import { section: String, file: PathBuf },
    /// Print the substituted prompts of a section in emission order
    Resolve {
        section: String,
        /// Macro value as NAME=VALUE, repeatable
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
}

#[derive(Subcommand, Debug)]
enum PresetAction {
    List,
    /// Copy the active preset under a new name
    New { name: String },
    Switch { name: String },
    Delete { name: String },
    Rename { old: String, new: String },
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    if name.trim().is_empty() {
        return Err("macro name is empty".to_string());
    }
    Ok((name.trim().to_string(), value.to_string()))
}

fn init_tracing(config_level: &str) -> Result<()> {
    // Parse log level from environment variable, then config
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| config_level.to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to install tracing subscriber")
}

fn require_section(session: &Session, section: &str) -> Result<()> {
    if session.get_order(section).is_none() {
        bail!("unknown section '{section}'");
    }
    Ok(())
}

fn show(session: &Session, section: &str) -> Result<()> {
    require_section(session, section)?;
    let template = session.catalog().section(section);
    let prompts = session.prompts(section).unwrap_or_default();

    println!("[{}] preset '{}'", section, session.active_preset());
    for (position, entry) in session.get_order(section).unwrap_or_default().iter().enumerate() {
        match entry {
            OrderEntry::Prompt { index } => match prompts.get(*index) {
                Some(prompt) => println!("{position:>3}  #{index} {:<9} {}", prompt.role, prompt.content),
                None => println!("{position:>3}  #{index} <missing prompt>"),
            },
            OrderEntry::Conditional { id } => {
                let name = template
                    .and_then(|t| t.block(id))
                    .map(|b| b.name.as_str())
                    .unwrap_or(id.as_str());
                println!("{position:>3}  [{name}]");
            }
        }
    }
    Ok(())
}

fn run(session: &mut Session, command: Command) -> Result<()> {
    let mutated = match command {
        Command::Presets { action } => match action {
            PresetAction::List => {
                for name in session.preset_names() {
                    let marker = if name == session.active_preset() { "*" } else { " " };
                    println!("{marker} {name}");
                }
                false
            }
            PresetAction::New { name } => {
                session.create_preset(&name)?;
                true
            }
            PresetAction::Switch { name } => {
                session.switch_preset(&name)?;
                true
            }
            PresetAction::Delete { name } => {
                session.delete_preset(&name)?;
                true
            }
            PresetAction::Rename { old, new } => {
                session.rename_preset(&old, &new)?;
                true
            }
        },
        Command::Show { section } => {
            show(session, &section)?;
            false
        }
        Command::Add { section } => {
            let index = session.add_prompt(&section);
            println!("added prompt #{index}");
            true
        }
        Command::Delete { section, position } => {
            require_section(session, &section)?;
            let removed = session
                .delete_item(&section, position)
                .ok_or_else(|| anyhow!("no entry at position {position} in '{section}'"))?;
            println!("removed {removed}");
            true
        }
        Command::SetRole { section, index, role } => {
            if !session.update_prompt(&section, index, PromptField::Role(role)) {
                bail!("no prompt #{index} in '{section}'");
            }
            true
        }
        Command::SetContent { section, index, content } => {
            if !session.update_prompt(&section, index, PromptField::Content(content)) {
                bail!("no prompt #{index} in '{section}'");
            }
            true
        }
        Command::Move { section, from, to } => {
            require_section(session, &section)?;
            session.move_entry(&section, from, to)
        }
        Command::Reset { section } => {
            session.reset_section(&section)?;
            true
        }
        Command::Export { section, output } => {
            let json = session.export_section(&section)?;
            match output {
                Some(path) => {
                    fs::write(&path, json).with_context(|| format!("Failed to write export to {:?}", path))?;
                    info!(path = %path.display(), section = %section, "Exported section");
                }
                None => println!("{json}"),
            }
            false
        }
        Command::Import { section, file } => {
            let raw = fs::read_to_string(&file).with_context(|| format!("Failed to read import from {:?}", file))?;
            session.import_section(&section, &raw)?;
            true
        }
        Command::Resolve { section, vars } => {
            let substitutor = VariableSubstitutor::new(vars.into_iter().collect::<HashMap<_, _>>());
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .context("Failed to start async runtime")?;
            let resolved = runtime
                .block_on(session.resolved_prompts(&section, &substitutor))
                .ok_or_else(|| anyhow!("section '{section}' has nothing to resolve"))?;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
            false
        }
    };

    if mutated {
        session.save()?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EditorConfig::load_from(path)?,
        None => EditorConfig::load()?,
    };
    init_tracing(&config.log_level)?;

    let store_dir = cli.store_dir.clone().unwrap_or_else(|| config.storage_dir());
    info!(dir = %store_dir.display(), "Opening preset storage");
    let mut session = EditorSession::open(FileStore::new(store_dir), LogNotifier, Catalog::builtin());

    run(&mut session, cli.command)
}
