use crate::cli::bar;
use colored::Colorize;
use snix_compose::models::KeyValueStore;
use snix_compose::remote::{RepoStatus, SnippetSource, categories, check_repos};
use snix_compose::{Engine, EngineError, Result};

/// Lists every snippet in output order with its placeholder and error counts
pub fn list_snippets<S: KeyValueStore>(engine: &Engine<S>) {
    let collection = engine.collection();
    if collection.is_empty() {
        println!("{}  No snippets yet. Add one with `snix-compose add`", bar());
        return;
    }

    for (idx, (_, snippet)) in collection.iter().enumerate() {
        let lock = if snippet.readonly {
            " 󰌾".bright_black()
        } else {
            "".normal()
        };
        let errors = engine.assembly().errors_for(&snippet.name).count();
        let status = if errors > 0 {
            format!("{} invalid", errors).bright_red()
        } else {
            "ok".bright_green()
        };
        println!(
            "{}  {}. {}{} [{} placeholders] {}",
            bar(),
            (idx + 1).to_string().yellow(),
            snippet.name.bright_white(),
            lock,
            snippet.placeholders.len(),
            status
        );
    }
}

/// Shows a snippet's metadata, placeholders with their effective values and its code
pub fn show_snippet<S: KeyValueStore>(engine: &Engine<S>, name: &str) -> Result<()> {
    let collection = engine.collection();
    let id = collection
        .id_of(name)
        .ok_or_else(|| EngineError::SnippetNotFound(name.to_string()))?;
    let Some(snippet) = collection.by_id(id) else {
        return Err(EngineError::SnippetNotFound(name.to_string()));
    };

    println!(
        "{}  {} {}",
        bar(),
        "SNIPPET".bright_green().bold(),
        snippet.name.bold()
    );
    println!("{}", "─".repeat(60).bright_magenta());
    if let Some(position) = collection.position(id) {
        println!("{}  {}: {}", bar(), "Position".bright_blue(), position + 1);
    }
    println!("{}  {}: {}", bar(), "Read-only".bright_yellow(), snippet.readonly);
    if let Some(error_code) = &snippet.error_code {
        println!("{}  {}: {}", bar(), "Error code".bright_cyan(), error_code);
    }

    for link in collection.links().outgoing(id) {
        let target = collection
            .by_id(link.target)
            .map_or("?", |s| s.name.as_str());
        println!(
            "{}  {}: {} {}",
            bar(),
            "Link".bright_magenta(),
            link.link_type.to_string().bright_cyan(),
            target
        );
    }

    if !snippet.placeholders.is_empty() {
        println!("{}", "─".repeat(60).bright_magenta());
        for placeholder in &snippet.placeholders {
            let value = collection.values().effective(id, placeholder);
            println!(
                "{}  {} {} = {:?} {}",
                bar(),
                placeholder.id.bright_white(),
                format!("({})", placeholder.needle).bright_black(),
                value,
                placeholder.required.pattern().bright_black().italic()
            );
        }
    }

    println!("{}", "─".repeat(60).bright_magenta());
    for line in snippet.code.lines() {
        println!("{}  {}", bar(), line);
    }
    print_errors_for(engine, &snippet.name);
    Ok(())
}

pub fn print_removed(removed: &[String]) {
    match removed {
        [] => {}
        [only] => println!("{}  Removed {}", bar(), only.bright_white()),
        [root, rest @ ..] => {
            println!("{}  Removed {}", bar(), root.bright_white());
            for name in rest {
                println!(
                    "{}  └── {} {}",
                    bar(),
                    name.bright_white(),
                    "(linked)".bright_black()
                );
            }
        }
    }
}

pub fn print_move(name: &str, moved: bool) {
    if moved {
        println!("{}  Moved {}", bar(), name.bright_white());
    } else {
        println!(
            "{}  {} cannot move past a linked snippet",
            bar(),
            name.bright_white()
        );
    }
}

pub fn print_errors_for<S: KeyValueStore>(engine: &Engine<S>, name: &str) {
    for error in engine.assembly().errors_for(name) {
        println!(
            "{}  {} {}.{} does not match its pattern",
            bar(),
            "INVALID".bright_red().bold(),
            error.snippet_name,
            error.placeholder_id
        );
    }
}

pub fn list_errors<S: KeyValueStore>(engine: &Engine<S>) {
    if !engine.has_errors() {
        println!("{}  {}", bar(), "All placeholders are valid".bright_green());
        return;
    }
    for error in engine.errors() {
        println!(
            "{}  {}.{}",
            bar(),
            error.snippet_name.bright_white(),
            error.placeholder_id.yellow()
        );
        for line in error.message.lines() {
            println!("{}    {}", bar(), line.bright_black());
        }
    }
}

/// Prints each repo's status followed by the snippets it offers, grouped by category
pub async fn show_repos(source: &dyn SnippetSource, urls: &[String]) {
    let reports = check_repos(source, urls).await;
    for report in &reports {
        let status = match &report.status {
            RepoStatus::Up { snippet_count } => {
                format!("UP ({} snippets)", snippet_count).bright_green()
            }
            RepoStatus::Down { message } => format!("DOWN {}", message).bright_red(),
        };
        println!(
            "{}  {} {} {}",
            bar(),
            report.display_name().bold(),
            status,
            report.url.bright_black().italic()
        );
    }

    let repos: Vec<_> = reports.into_iter().filter_map(|r| r.repo).collect();
    for category in categories(&repos) {
        println!("{}", "─".repeat(60).bright_magenta());
        println!("{}  {}", bar(), category.name.bright_yellow());
        for link in &category.links {
            println!(
                "{}  ├── {} {}",
                bar(),
                link.name.bright_white(),
                link.link.bright_black()
            );
        }
    }
}

pub fn show_diagnostic<S: KeyValueStore>(engine: &Engine<S>) {
    let Some(diagnostic) = engine.diagnostic() else {
        println!("{}  Saved data is healthy", bar());
        return;
    };
    println!(
        "{}  {} {}",
        bar(),
        "DIAGNOSTIC".bright_red().bold(),
        diagnostic.detected_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{}  {}", bar(), diagnostic.message);
    if let Some(payload) = &diagnostic.payload {
        println!("{}", "─".repeat(60).bright_magenta());
        println!("{}", payload);
        println!("{}", "─".repeat(60).bright_magenta());
        println!(
            "{}  {}",
            bar(),
            "Copy the payload above into a bug report, then run with --clear".bright_black()
        );
    }
}
