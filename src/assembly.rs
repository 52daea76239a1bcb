//! Derives the generated code and the validation error set from a collection.

use crate::error::ValidationError;
use crate::models::SnippetCollection;
use crate::models::template;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub output: String,
    pub errors: Vec<ValidationError>,
}

impl Assembly {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors_for<'a>(&'a self, snippet: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors.iter().filter(move |e| e.snippet_name == snippet)
    }
}

/// Renders every snippet in order. Errors only affect the snippet they belong to.
pub fn assemble(collection: &SnippetCollection) -> Assembly {
    let mut assembly = Assembly::default();
    for (id, snippet) in collection.iter() {
        let errors = template::validate(id, snippet, collection.values());
        let rendered = template::render(id, snippet, collection.values(), &errors);
        assembly
            .output
            .push_str(&format!("/* Snippet {} */\n{}\n\n", snippet.name, rendered));
        assembly.errors.extend(errors);
    }
    assembly
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OverrideMode, Placeholder, Snippet};
    use pretty_assertions::assert_eq;

    #[test]
    fn concatenates_fragments_in_order() {
        let mut c = SnippetCollection::new();
        c.add(
            Snippet::new("counter", "let X = 1;")
                .with_placeholder(Placeholder::new("n", "X").with_default("count")),
            OverrideMode::Duplicate,
        )
        .unwrap();
        c.add(Snippet::new("log", "console.log(1);"), OverrideMode::Duplicate)
            .unwrap();

        let assembly = assemble(&c);
        assert_eq!(
            assembly.output,
            "/* Snippet counter */\nlet count = 1;\n\n/* Snippet log */\nconsole.log(1);\n\n"
        );
        assert!(!assembly.has_errors());
    }

    #[test]
    fn errors_stay_with_their_snippet() {
        let mut c = SnippetCollection::new();
        c.add(
            Snippet::new("bad", "good V")
                .with_error_code("// bad V")
                .with_placeholder(Placeholder::new("v", "V").with_pattern("[0-9]+")),
            OverrideMode::Duplicate,
        )
        .unwrap();
        c.add(Snippet::new("fine", "ok"), OverrideMode::Duplicate).unwrap();
        c.set_value("bad", "v", "letters").unwrap();

        let assembly = assemble(&c);
        assert_eq!(assembly.errors.len(), 1);
        assert_eq!(assembly.errors_for("bad").count(), 1);
        assert_eq!(assembly.errors_for("fine").count(), 0);
        assert!(assembly.output.contains("// bad letters"));
        assert!(!assembly.output.contains("good"));
        assert!(assembly.output.ends_with("/* Snippet fine */\nok\n\n"));
    }

    #[test]
    fn recomputing_is_idempotent() {
        let mut c = SnippetCollection::new();
        c.add(Snippet::new("a", "x"), OverrideMode::Duplicate).unwrap();
        assert_eq!(assemble(&c), assemble(&c));
    }
}
