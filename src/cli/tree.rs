use crate::cli::bar;
use colored::Colorize;
use snix_compose::{LinkType, SnippetCollection, SnippetId};

/// Displays every snippet with its outgoing links as a tree
pub fn display_tree(collection: &SnippetCollection) {
    if collection.is_empty() {
        println!("No snippets found.");
        return;
    }

    for (id, snippet) in collection.iter() {
        println!("{}  {} {}", bar(), "".bright_blue(), snippet.name.bold());
        let mut path = vec![id];
        print_links(collection, id, &mut path, Vec::new());
    }
}

/// Recursively prints the snippets `id` links to. `path` holds the snippets
/// on the current branch so a cyclic link is printed once and not followed.
fn print_links(
    collection: &SnippetCollection,
    id: SnippetId,
    path: &mut Vec<SnippetId>,
    guides: Vec<bool>,
) {
    let links = collection.links().outgoing(id);
    for (i, link) in links.iter().enumerate() {
        let is_last = i == links.len() - 1;
        let Some(target) = collection.by_id(link.target) else {
            continue;
        };

        // Print left margin with indentation guides
        print!("{}  ", bar());
        for guide in &guides {
            if *guide {
                print!("┃  ");
            } else {
                print!("   ");
            }
        }
        if is_last {
            print!("└── ");
        } else {
            print!("├── ");
        }

        let cyclic = path.contains(&link.target);
        println!(
            "{} {}{}",
            link_label(link.link_type),
            target.name.bright_white(),
            if cyclic { " (cycle)".bright_black() } else { "".normal() }
        );
        if cyclic {
            continue;
        }

        let mut next_guides = guides.clone();
        next_guides.push(!is_last);
        path.push(link.target);
        print_links(collection, link.target, path, next_guides);
        path.pop();
    }
}

fn link_label(link_type: LinkType) -> colored::ColoredString {
    let label = format!("[{}]", link_type);
    match link_type {
        LinkType::None => label.bright_black(),
        LinkType::DependsOn => label.bright_cyan(),
        LinkType::IsDependent => label.bright_yellow(),
        LinkType::Both => label.bright_red(),
    }
}
