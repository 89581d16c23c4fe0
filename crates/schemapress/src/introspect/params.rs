//! Stored procedure parameter list parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::{Parameter, ParameterMode};

static PROCEDURE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bPROCEDURE\s+(?:`[^`]*`|[^\s(`]+)(?:\s*\.\s*(?:`[^`]*`|[^\s(`]+))?\s*\(")
        .expect("static regex must compile")
});

/// Text between the parameter list's parentheses, honoring nesting and quotes.
fn parameter_list(definition: &str) -> Option<&str> {
    let open = match PROCEDURE_NAME.find(definition) {
        Some(m) => m.end() - 1,
        None => definition.find('(')?,
    };

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in definition[open..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(&definition[open + 1..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested in parentheses or quotes.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

/// Parse the parameter list of a `CREATE PROCEDURE` statement.
///
/// Each declaration is `[mode] name type`. Without a leading IN, OUT or
/// INOUT keyword the mode is IN. Declarations with fewer than two words are
/// ignored.
pub fn parse_procedure_parameters(definition: &str) -> Vec<Parameter> {
    let Some(list) = parameter_list(definition) else {
        return Vec::new();
    };

    split_top_level(list)
        .into_iter()
        .filter_map(|decl| {
            let words: Vec<&str> = decl.split_whitespace().collect();
            if words.len() < 2 {
                return None;
            }
            let (mode, rest) = match ParameterMode::parse(words[0]) {
                Some(mode) if words.len() >= 3 => (mode, &words[1..]),
                _ => (ParameterMode::In, &words[..]),
            };
            Some(Parameter {
                mode,
                name: rest[0].trim_matches('`').to_string(),
                data_type: rest[1..].join(" "),
            })
        })
        .collect()
}
