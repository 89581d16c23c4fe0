//! PHP string escaping and a line builder for generated sources.

use crate::sanitize::PREFIX_EXPR;

/// Escape text for a PHP double-quoted string, keeping [`PREFIX_EXPR`]
/// interpolations live.
pub fn double_quoted(text: &str) -> String {
    map_outside_prefix(text, |piece, out| {
        for c in piece.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                '$' => out.push_str("\\$"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => {}
                c => out.push(c),
            }
        }
    })
}

/// Escape text for a line inside a `<<<SQL` heredoc, keeping [`PREFIX_EXPR`]
/// interpolations live. Line breaks become spaces so no line can close the
/// heredoc early.
pub fn heredoc(text: &str) -> String {
    map_outside_prefix(text, |piece, out| {
        for c in piece.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '$' => out.push_str("\\$"),
                '\n' | '\r' => out.push(' '),
                c => out.push(c),
            }
        }
    })
}

/// Escape text for a PHP single-quoted string.
pub fn single_quoted(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Flatten text for a `//` or docblock comment line.
pub fn comment(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
        .replace("?>", "? >")
        .replace("*/", "* /")
}

fn map_outside_prefix(text: &str, escape: impl Fn(&str, &mut String)) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for (i, piece) in text.split(PREFIX_EXPR).enumerate() {
        if i > 0 {
            out.push_str(PREFIX_EXPR);
        }
        escape(piece, &mut out);
    }
    out
}

/// Accumulates PHP source one indented line at a time.
#[derive(Debug, Default)]
pub struct PhpBuilder {
    out: String,
}

impl PhpBuilder {
    const INDENT: &'static str = "    ";

    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` at `depth` levels of indentation.
    pub fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..depth {
                self.out.push_str(Self::INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    /// Append `text` without indentation (heredoc bodies and terminators).
    pub fn raw(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// `$this->run_sql( "..." );` with the statement escaped.
    pub fn run_sql(&mut self, depth: usize, sql: &str) {
        self.line(depth, format!("$this->run_sql( \"{}\" );", double_quoted(sql)));
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_quoted_keeps_prefix_expression() {
        let sql = "SELECT \"a\", '$x' FROM {$this->prefix}orders\nWHERE p = 'C:\\'";
        assert_eq!(
            double_quoted(sql),
            "SELECT \\\"a\\\", '\\$x' FROM {$this->prefix}orders\\nWHERE p = 'C:\\\\'"
        );
    }

    #[test]
    fn test_heredoc_flattens_lines() {
        assert_eq!(
            heredoc("DEFAULT 'a$b\r\nSQL'"),
            "DEFAULT 'a\\$b  SQL'"
        );
        assert_eq!(heredoc("{$this->prefix}x"), "{$this->prefix}x");
    }

    #[test]
    fn test_single_quoted() {
        assert_eq!(single_quoted(r"it's a\b"), r"it\'s a\\b");
    }

    #[test]
    fn test_builder_indents_and_escapes() {
        let mut php = PhpBuilder::new();
        php.line(1, "public function x() {");
        php.run_sql(2, "DROP VIEW IF EXISTS `{$this->prefix}v`");
        php.blank();
        php.raw("SQL;");
        assert_eq!(
            php.finish(),
            "    public function x() {\n        $this->run_sql( \"DROP VIEW IF EXISTS `{$this->prefix}v`\" );\n\nSQL;\n"
        );
    }
}
