//! Command-line front end for snix-compose.
//! Every sub-command opens the persisted collection, applies at most one
//! mutation through the engine and prints the derived state.

pub mod commands;
pub mod tree;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use colored::Colorize;
use snix_compose::remote::WebSource;
use snix_compose::{
    Config, Engine, EngineError, FileStore, LinkType, OverrideMode, Placeholder, Snippet,
};
use std::fs;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "snix-compose", version, about = "Compose code snippets into one generated file")]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the saved snippets
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List snippets in output order
    #[command(alias = "ls")]
    List,
    /// Show snippets with the links between them
    Tree,
    /// Display a snippet, its placeholders and links
    #[command(alias = "cat")]
    Show { name: String },
    /// Add a snippet
    Add {
        name: String,
        #[command(flatten)]
        code: CodeInput,
        /// Code emitted instead of the snippet when a placeholder is invalid
        #[arg(long)]
        error_code: Option<String>,
        /// Replace an existing snippet of the same name
        #[arg(long)]
        overwrite: bool,
        #[arg(long)]
        readonly: bool,
    },
    /// Remove a snippet and everything depending on it
    #[command(alias = "rm")]
    Remove { name: String },
    /// Move a snippet towards the top
    Up {
        name: String,
        #[arg(default_value_t = 1)]
        count: usize,
    },
    /// Move a snippet towards the bottom
    Down {
        name: String,
        #[arg(default_value_t = 1)]
        count: usize,
    },
    /// Link two snippets
    Link {
        source: String,
        target: String,
        #[arg(value_enum)]
        link_type: LinkArg,
    },
    /// Replace a snippet's code
    Code {
        name: String,
        #[command(flatten)]
        code: CodeInput,
    },
    /// Set or clear a snippet's error code
    ErrorCode { name: String, error_code: Option<String> },
    /// Mark a snippet read-only or editable
    Readonly {
        name: String,
        #[arg(action = ArgAction::Set)]
        readonly: bool,
    },
    /// Edit placeholders
    #[command(subcommand)]
    Placeholder(PlaceholderCommand),
    /// Set a placeholder value
    Set {
        snippet: String,
        placeholder: String,
        value: String,
    },
    /// Print the generated code
    Output {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// List placeholder validation errors
    Errors,
    /// Load a snippet definition with its imports from a URL or file
    Import { uri: String },
    /// Check the configured snippet repositories
    Repos,
    /// Show why saved data could not be restored
    Diagnostic {
        /// Forget the quarantined payload
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum PlaceholderCommand {
    /// Add a placeholder to a snippet
    Add {
        snippet: String,
        id: String,
        /// Text in the code replaced by the value
        needle: String,
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long)]
        default: Option<String>,
        #[arg(long)]
        multiline: bool,
    },
    /// Remove a placeholder and its stored value
    Remove { snippet: String, id: String },
    /// Set or clear the pattern a value must match
    Pattern {
        snippet: String,
        id: String,
        pattern: Option<String>,
    },
    /// Set or clear the default value
    Default {
        snippet: String,
        id: String,
        default: Option<String>,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct CodeInput {
    /// Code given inline
    #[arg(long)]
    code: Option<String>,
    /// Read the code from a file
    #[arg(long)]
    file: Option<PathBuf>,
}

impl CodeInput {
    fn read(self) -> Result<String> {
        match (self.code, self.file) {
            (Some(code), _) => Ok(code),
            (None, Some(path)) => fs::read_to_string(&path)
                .wrap_err_with(|| format!("Failed to read {}", path.display())),
            (None, None) => Err(eyre!("either --code or --file is required")),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LinkArg {
    None,
    Dependson,
    Isdependent,
    Both,
}

impl From<LinkArg> for LinkType {
    fn from(arg: LinkArg) -> Self {
        match arg {
            LinkArg::None => LinkType::None,
            LinkArg::Dependson => LinkType::DependsOn,
            LinkArg::Isdependent => LinkType::IsDependent,
            LinkArg::Both => LinkType::Both,
        }
    }
}

pub fn bar() -> colored::ColoredString {
    "┃".bright_magenta()
}

fn open_engine(config: &Config, data_dir: Option<PathBuf>) -> Result<Engine<FileStore>> {
    let store = match data_dir.or_else(|| config.data_dir.clone()) {
        Some(dir) => FileStore::with_dir(dir),
        None => FileStore::new(),
    }
    .map_err(EngineError::from)?;
    let engine = Engine::open(store, config.storage_keys())?;
    Ok(engine.with_max_import_depth(config.max_import_depth))
}

/// Executes one sub-command. `cancel` aborts an in-flight import.
pub async fn execute(cli: Cli, config: Config, cancel: CancellationToken) -> Result<()> {
    let mut engine = open_engine(&config, cli.data_dir)?;
    if let Some(diagnostic) = engine.diagnostic() {
        if !matches!(cli.command, Commands::Diagnostic { .. }) {
            println!(
                "{}  {} {}",
                bar(),
                "WARNING".bright_red().bold(),
                diagnostic.message
            );
            println!("{}  Run `snix-compose diagnostic` for details", bar());
        }
    }

    match cli.command {
        Commands::List => commands::list_snippets(&engine),
        Commands::Tree => tree::display_tree(engine.collection()),
        Commands::Show { name } => commands::show_snippet(&engine, &name)?,
        Commands::Add {
            name,
            code,
            error_code,
            overwrite,
            readonly,
        } => {
            let mut snippet = Snippet::new(name, code.read()?);
            snippet.error_code = error_code;
            snippet.readonly = readonly;
            let mode = if overwrite {
                OverrideMode::Overwrite
            } else {
                OverrideMode::Duplicate
            };
            let name = engine.add(snippet, mode)?;
            println!("{}  Added {}", bar(), name.bright_white());
        }
        Commands::Remove { name } => {
            let removed = engine.remove(&name)?;
            commands::print_removed(&removed);
        }
        Commands::Up { name, count } => {
            let moved = engine.move_up(&name, count)?;
            commands::print_move(&name, moved);
        }
        Commands::Down { name, count } => {
            let moved = engine.move_down(&name, count)?;
            commands::print_move(&name, moved);
        }
        Commands::Link {
            source,
            target,
            link_type,
        } => {
            let link_type = LinkType::from(link_type);
            engine.link(&source, &target, link_type)?;
            println!(
                "{}  {} {} {}",
                bar(),
                source.bright_white(),
                link_type.to_string().bright_cyan(),
                target.bright_white()
            );
        }
        Commands::Code { name, code } => {
            engine.edit_code(&name, code.read()?)?;
            println!("{}  Updated code of {}", bar(), name.bright_white());
        }
        Commands::ErrorCode { name, error_code } => {
            engine.edit_error_code(&name, error_code)?;
            println!("{}  Updated error code of {}", bar(), name.bright_white());
        }
        Commands::Readonly { name, readonly } => {
            engine.set_readonly(&name, readonly)?;
            let state = if readonly { "read-only" } else { "editable" };
            println!("{}  {} is now {}", bar(), name.bright_white(), state);
        }
        Commands::Placeholder(command) => placeholder(&mut engine, command)?,
        Commands::Set {
            snippet,
            placeholder,
            value,
        } => {
            engine.set_value(&snippet, &placeholder, value)?;
            commands::print_errors_for(&engine, &snippet);
        }
        Commands::Output { out } => match out {
            Some(path) => {
                fs::write(&path, engine.output())
                    .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
                println!("{}  Wrote {}", bar(), path.display());
            }
            None => print!("{}", engine.output()),
        },
        Commands::Errors => commands::list_errors(&engine),
        Commands::Import { uri } => {
            let source = WebSource::new(config.fetch_timeout())?;
            let name = engine.load_from_web(&uri, &source, cancel).await?;
            println!("{}  Imported {}", bar(), name.bright_white());
            commands::print_errors_for(&engine, &name);
        }
        Commands::Repos => {
            let source = WebSource::new(config.fetch_timeout())?;
            commands::show_repos(&source, &config.repos).await;
        }
        Commands::Diagnostic { clear } => {
            if clear {
                engine.clear_diagnostic()?;
                println!("{}  Diagnostic cleared", bar());
            } else {
                commands::show_diagnostic(&engine);
            }
        }
    }
    Ok(())
}

fn placeholder(engine: &mut Engine<FileStore>, command: PlaceholderCommand) -> Result<()> {
    match command {
        PlaceholderCommand::Add {
            snippet,
            id,
            needle,
            pattern,
            default,
            multiline,
        } => {
            let mut placeholder = Placeholder::new(id, needle);
            placeholder.multiline = multiline;
            if let Some(pattern) = pattern {
                placeholder = placeholder.with_pattern(pattern);
            }
            if let Some(default) = default {
                placeholder = placeholder.with_default(default);
            }
            engine.add_placeholder(&snippet, placeholder)?;
            commands::print_errors_for(engine, &snippet);
        }
        PlaceholderCommand::Remove { snippet, id } => {
            engine.remove_placeholder(&snippet, &id)?;
            println!("{}  Removed {}.{}", bar(), snippet.bright_white(), id);
        }
        PlaceholderCommand::Pattern { snippet, id, pattern } => {
            engine.edit_placeholder_pattern(&snippet, &id, pattern)?;
            commands::print_errors_for(engine, &snippet);
        }
        PlaceholderCommand::Default {
            snippet,
            id,
            default,
        } => {
            engine.edit_placeholder_default(&snippet, &id, default)?;
            commands::print_errors_for(engine, &snippet);
        }
    }
    Ok(())
}
