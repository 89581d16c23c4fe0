//! Text rewrites for MySQL dialect artifacts.
//!
//! Definitions captured with `SHOW CREATE ...` carry account-specific and
//! server-specific clauses (`DEFINER=...`, `/*!50013 ... */` wrappers,
//! `ALGORITHM=...`, `DELIMITER` directives) that must not travel into another
//! database. Every function here is pure and total: malformed markers pass
//! through unchanged and no function returns an error.
//!
//! The sanitizers rewrite to a fixed point, so applying one twice yields the
//! same text as applying it once. Each pass never grows the text, which
//! bounds the loop.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, NoExpand, Regex};

/// Runtime interpolation expression that resolves the table prefix in PHP.
pub const PREFIX_EXPR: &str = "{$this->prefix}";

static VERSIONED_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)/\*!\d{5}\s*(.*?)\s*\*/").expect("static regex must compile")
});

static DEFINER_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    let part = r#"(?:`[^`]*`|'[^']*'|"[^"]*"|[A-Za-z0-9_.$%:-]+)"#;
    Regex::new(&format!(
        r"(?i)\bDEFINER\s*=\s*(?:CURRENT_USER(?:\s*\(\s*\))?|{part}\s*@\s*{part})\s*"
    ))
    .expect("static regex must compile")
});

static ROUTINE_SECURITY_DEFINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bSQL\s+SECURITY\s+DEFINER\b[ \t]*").expect("static regex must compile")
});

static SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("static regex must compile"));

static CREATE_ROUTINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bCREATE\s+(PROCEDURE|FUNCTION|TRIGGER|EVENT)\b")
        .expect("static regex must compile")
});

static DELIMITER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*DELIMITER[ \t]+[^\n]*(?:\n|$)").expect("static regex must compile")
});

static VIEW_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)\bCREATE\s+(OR\s+REPLACE\s+)?(?:ALGORITHM\s*=\s*\w+\s+)?(?:SQL\s+SECURITY\s+(?:DEFINER|INVOKER)\s+)?VIEW\b",
    )
    .expect("static regex must compile")
});

static DEFAULT_CURRENT_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bDEFAULT\s*'?\s*current_timestamp\s*(?:\(\s*(\d*)\s*\))?\s*'?")
        .expect("static regex must compile")
});

static CURRENT_TIMESTAMP_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*'?\s*(?:current_timestamp|localtimestamp|now)\s*(?:\(\s*(\d*)\s*\))?\s*'?\s*$",
    )
    .expect("static regex must compile")
});

static PREFIX_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{wp_\}").expect("static regex must compile"));

/// Apply `pass` until the text stops changing.
fn fixed_point(text: &str, pass: impl Fn(&str) -> String) -> String {
    let mut current = text.to_string();
    loop {
        let next = pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn definer_pass(text: &str) -> String {
    let unwrapped = VERSIONED_COMMENT.replace_all(text, "$1");
    let stripped = DEFINER_CLAUSE.replace_all(&unwrapped, "");
    SPACE_RUN.replace_all(&stripped, " ").trim().to_string()
}

fn routine_pass(text: &str) -> String {
    let unwrapped = VERSIONED_COMMENT.replace_all(text, "$1");
    let stripped = DEFINER_CLAUSE.replace_all(&unwrapped, "");
    // DEFINER is the routine default, so the characteristic is redundant
    let stripped = ROUTINE_SECURITY_DEFINER.replace_all(&stripped, "");
    let normalized = CREATE_ROUTINE.replace_all(&stripped, |caps: &Captures| {
        format!("CREATE {}", caps[1].to_ascii_uppercase())
    });
    let undelimited = DELIMITER_LINE.replace_all(&normalized, "");
    SPACE_RUN.replace_all(&undelimited, " ").trim().to_string()
}

fn view_pass(text: &str) -> String {
    let cleaned = definer_pass(text);
    VIEW_HEADER
        .replace_all(&cleaned, |caps: &Captures| {
            if caps.get(1).is_some() {
                "CREATE OR REPLACE VIEW"
            } else {
                "CREATE VIEW"
            }
        })
        .into_owned()
}

/// Unwrap versioned comments, strip `DEFINER` clauses and collapse spaces.
///
/// Only the `DEFINER = user@host` clause goes; an `SQL SECURITY DEFINER`
/// characteristic is left for the routine and view passes to handle.
pub fn remove_definer_clauses(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }
    fixed_point(text, definer_pass)
}

/// Clean a procedure, function or trigger definition.
///
/// Removes definers and `SQL SECURITY DEFINER`, normalizes `CREATE <kind>`
/// spacing and drops lines that hold only a `DELIMITER` directive.
pub fn sanitize_routine_definition(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }
    fixed_point(text, routine_pass)
}

/// Clean a view definition down to `CREATE [OR REPLACE] VIEW ...`.
pub fn sanitize_view_definition(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }
    fixed_point(text, view_pass)
}

/// Replace the `{wp_}` token and every literal `default_prefix` with
/// [`PREFIX_EXPR`].
///
/// Both are matched in one left-to-right pass, so text that already holds the
/// interpolation expression is never rewritten a second time.
pub fn inject_prefix_token(text: &str, default_prefix: &str) -> String {
    if default_prefix.is_empty() {
        return PREFIX_TOKEN
            .replace_all(text, NoExpand(PREFIX_EXPR))
            .into_owned();
    }

    let pattern = format!(r"(?i:\{{wp_\}})|{}", regex::escape(default_prefix));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(text, NoExpand(PREFIX_EXPR)).into_owned(),
        Err(_) => text.replace(default_prefix, PREFIX_EXPR),
    }
}

/// Resolve [`PREFIX_EXPR`] and the `{wp_}` token to a concrete prefix.
///
/// This is what the generated installer does at runtime.
pub fn resolve_prefix_token(text: &str, prefix: &str) -> String {
    let resolved = text.replace(PREFIX_EXPR, prefix);
    PREFIX_TOKEN
        .replace_all(&resolved, NoExpand(prefix))
        .into_owned()
}

/// Canonicalize every current-timestamp default spelling to
/// `DEFAULT CURRENT_TIMESTAMP`, keeping a fractional-seconds precision.
pub fn normalize_current_timestamp_default(text: &str) -> String {
    DEFAULT_CURRENT_TIMESTAMP
        .replace_all(text, |caps: &Captures| match caps.get(1) {
            Some(p) if !p.as_str().is_empty() => {
                format!("DEFAULT CURRENT_TIMESTAMP({})", p.as_str())
            }
            _ => "DEFAULT CURRENT_TIMESTAMP".to_string(),
        })
        .into_owned()
}

/// Canonical `CURRENT_TIMESTAMP[(n)]` for a raw column default, if it is one.
pub fn current_timestamp_default(literal: &str) -> Option<String> {
    CURRENT_TIMESTAMP_LITERAL.captures(literal).map(|caps| {
        match caps.get(1).map(|p| p.as_str()).filter(|p| !p.is_empty()) {
            Some(precision) => format!("CURRENT_TIMESTAMP({})", precision),
            None => "CURRENT_TIMESTAMP".to_string(),
        }
    })
}

/// Whether a raw column default means "the current timestamp".
pub fn is_current_timestamp(literal: &str) -> bool {
    CURRENT_TIMESTAMP_LITERAL.is_match(literal)
}

/// Remove `` `database`. `` qualifiers so a definition runs in any schema.
pub fn strip_schema_qualifier<'a>(text: &'a str, database: &str) -> Cow<'a, str> {
    if database.is_empty() {
        return Cow::Borrowed(text);
    }
    let pattern = format!(
        r"`{}`\s*\.\s*",
        regex::escape(&database.replace('`', "``"))
    );
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(text, ""),
        Err(_) => Cow::Borrowed(text),
    }
}
