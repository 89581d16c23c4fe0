//! The installer class.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use super::php::{comment, heredoc, single_quoted, PhpBuilder};
use super::CompilePlan;
use crate::core::identifier::escape_sql_literal;
use crate::core::{Column, StoredProcedure, Table, Trigger, View};
use crate::sanitize::{
    current_timestamp_default, inject_prefix_token, strip_schema_qualifier, PREFIX_EXPR,
};

static PROCEDURE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bCREATE\s+PROCEDURE\s+(?:`[^`]*`\s*\.\s*)?(?:`[^`]*`|[^\s(`]+)")
        .expect("static regex must compile")
});

static LEADING_BEGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*BEGIN\b").expect("static regex must compile"));

/// Runtime helpers appended to every installer class.
const HELPERS: &str = r#"    /**
     * Resolve the prefix placeholder to this site's prefix. Generated SQL is
     * already interpolated by PHP; only a literal placeholder token that
     * survived in a definition is left to replace. The token is split so
     * the installer never contains the source prefix verbatim.
     */
    private function apply_prefix( $sql ) {
        return str_ireplace( '{wp' . '_}', $this->prefix, $sql );
    }

    /**
     * Lowercase names of the tables the host owns, under both the network
     * and the site prefix.
     */
    private function core_tables() {
        $tables = array();
        foreach ( self::CORE_TABLES as $name ) {
            $tables[] = strtolower( $this->wpdb->base_prefix . $name );
            $tables[] = strtolower( $this->prefix . $name );
        }
        return array_values( array_unique( $tables ) );
    }

    private function is_core_table( $table ) {
        return in_array( strtolower( trim( $table, '`' ) ), $this->core_tables(), true );
    }

    /**
     * Whether a statement alters, drops or truncates a host table.
     */
    private function targets_core_table( $sql ) {
        $names = array_map(
            function ( $table ) {
                return preg_quote( $table, '/' );
            },
            $this->core_tables()
        );
        if ( empty( $names ) ) {
            return false;
        }
        $pattern = '/^\s*(?:ALTER|DROP|TRUNCATE)\s+TABLE\s+(?:IF\s+EXISTS\s+)?`?(?:' . implode( '|', $names ) . ')`?(?![\w$])/i';
        return 1 === preg_match( $pattern, $sql );
    }

    /**
     * Execute one generated statement. Statements that would change a host
     * table are refused.
     */
    private function run_sql( $sql ) {
        $sql = $this->apply_prefix( $sql );
        if ( $this->targets_core_table( $sql ) ) {
            return false;
        }
        return $this->wpdb->query( $sql );
    }
"#;

/// Render the installer class source.
pub(crate) fn render(plan: &CompilePlan<'_>) -> String {
    let manifest = plan.manifest;
    let mut php = PhpBuilder::new();

    php.raw("<?php");
    php.raw("/**");
    php.raw(format!(" * Database installer {}.", plan.class_name));
    php.raw(" *");
    php.raw(format!(
        " * Generated by schemapress from database {} ({}).",
        comment(&manifest.database),
        manifest.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    php.raw(" * Regenerate from the manifest instead of editing by hand.");
    php.raw(" */");
    php.blank();
    php.raw("if ( ! defined( 'ABSPATH' ) ) {");
    php.line(1, "exit;");
    php.raw("}");
    php.blank();
    php.raw(format!("class {} {{", plan.class_name));
    php.blank();

    let core: Vec<String> = plan
        .options
        .core_tables
        .iter()
        .map(|t| format!("'{}'", single_quoted(t)))
        .collect();
    php.line(1, format!("const CORE_TABLES = array( {} );", core.join(", ")));
    php.blank();
    php.line(1, "/** @var wpdb */");
    php.line(1, "private $wpdb;");
    php.blank();
    php.line(1, "/** @var string */");
    php.line(1, "private $prefix;");
    php.blank();
    php.line(1, "public function __construct( $wpdb ) {");
    php.line(2, "$this->wpdb = $wpdb;");
    php.line(2, "$this->prefix = $wpdb->get_blog_prefix();");
    php.line(1, "}");
    php.blank();

    render_install(plan, &mut php);
    render_populate(plan, &mut php);
    render_uninstall(plan, &mut php);

    let mut out = php.finish();
    out.push_str(HELPERS);
    out.push_str("}\n");
    out
}

fn render_install(plan: &CompilePlan<'_>, php: &mut PhpBuilder) {
    let manifest = plan.manifest;

    php.line(1, "public function install() {");
    php.line(2, "$charset_collate = $this->wpdb->get_charset_collate();");
    php.line(2, "require_once( ABSPATH . 'wp-admin/includes/upgrade.php' );");

    for table in &plan.tables {
        php.blank();
        render_create_table(table, php);
    }

    for view in &manifest.views {
        php.blank();
        render_view(view, &manifest.database, &manifest.default_prefix, php);
    }

    for procedure in &manifest.stored_procedures {
        php.blank();
        render_procedure(procedure, &manifest.database, &manifest.default_prefix, php);
    }

    for (trigger, installed) in manifest.triggers.iter().zip(&plan.trigger_names) {
        php.blank();
        render_trigger(trigger, installed, &manifest.database, &manifest.default_prefix, php);
    }

    php.line(1, "}");
    php.blank();
}

/// Backtick-quoted, prefix-interpolated object name.
fn prefixed(name: &str) -> String {
    format!("`{}{}`", PREFIX_EXPR, name.replace('`', "``"))
}

fn quote_column(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn column_line(column: &Column) -> String {
    let mut line = format!("{} {}", quote_column(&column.name), column.data_type.trim());
    if !column.nullable {
        line.push_str(" NOT NULL");
    }
    if column.auto_increment {
        line.push_str(" AUTO_INCREMENT");
    }
    if let Some(default) = &column.default {
        if let Some(ts) = current_timestamp_default(default) {
            line.push_str(" DEFAULT ");
            line.push_str(&ts);
        } else if column.nullable && default.eq_ignore_ascii_case("NULL") {
            line.push_str(" DEFAULT NULL");
        } else {
            line.push_str(&format!(" DEFAULT '{}'", escape_sql_literal(default)));
        }
    }
    line
}

fn render_create_table(table: &Table, php: &mut PhpBuilder) {
    php.line(2, format!("// Table: {}", comment(&table.name)));
    php.line(2, "$sql = <<<SQL");

    let mut lines: Vec<String> = table.columns.iter().map(column_line).collect();
    let pk = table.primary_key_columns();
    if !pk.is_empty() {
        let cols: Vec<String> = pk.iter().map(|c| quote_column(c)).collect();
        lines.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }

    php.raw(heredoc(&format!("CREATE TABLE {}{} (", PREFIX_EXPR, table.name)));
    let last = lines.len().saturating_sub(1);
    for (i, line) in lines.iter().enumerate() {
        let sep = if i < last { "," } else { "" };
        php.raw(format!("    {}{}", heredoc(line), sep));
    }
    php.raw(") $charset_collate;");
    php.raw("SQL;");
    php.line(
        2,
        format!(
            "if ( ! $this->is_core_table( $this->prefix . '{}' ) ) {{",
            single_quoted(&table.name)
        ),
    );
    php.line(3, "dbDelta( $sql );");
    php.line(2, "}");
}

/// Sanitized definition, qualifier-free and prefix-tokenized.
fn portable(definition: &str, database: &str, prefix: &str) -> String {
    inject_prefix_token(&strip_schema_qualifier(definition, database), prefix)
}

fn render_view(view: &View, database: &str, prefix: &str, php: &mut PhpBuilder) {
    php.line(2, format!("// View: {}", comment(&view.name)));
    php.run_sql(2, &format!("DROP VIEW IF EXISTS {}", prefixed(&view.name)));
    let sql = portable(&view.sanitized_definition(), database, prefix);
    if sql.trim().is_empty() {
        php.line(2, "// No definition was captured for this view.");
    } else {
        php.run_sql(2, &sql);
    }
}

fn render_procedure(procedure: &StoredProcedure, database: &str, prefix: &str, php: &mut PhpBuilder) {
    php.line(2, format!("// Stored procedure: {}", comment(&procedure.name)));
    php.run_sql(
        2,
        &format!("DROP PROCEDURE IF EXISTS {}", prefixed(&procedure.name)),
    );

    let body = portable(&procedure.sanitized_definition(), database, prefix);
    if body.trim().is_empty() {
        php.line(2, "// No definition was captured for this procedure.");
        return;
    }
    let header = format!("CREATE PROCEDURE {}", prefixed(&procedure.name));
    let sql = PROCEDURE_HEADER.replacen(&body, 1, NoExpand(&header));
    php.run_sql(2, &sql);
}

fn render_trigger(
    trigger: &Trigger,
    installed: &str,
    database: &str,
    prefix: &str,
    php: &mut PhpBuilder,
) {
    if installed == trigger.name {
        php.line(2, format!("// Trigger: {}", comment(&trigger.name)));
    } else {
        php.line(
            2,
            format!(
                "// Trigger: {} (installed as {})",
                comment(&trigger.name),
                comment(installed)
            ),
        );
    }
    php.run_sql(2, &format!("DROP TRIGGER IF EXISTS {}", prefixed(installed)));

    let (timing, event) = trigger.timing_and_event();
    let body = portable(&trigger.sanitized_definition(), database, prefix);
    let body = body.trim();
    let body = if LEADING_BEGIN.is_match(body) {
        body.to_string()
    } else if body.ends_with(';') {
        format!("BEGIN {} END", body)
    } else {
        format!("BEGIN {}; END", body)
    };

    php.run_sql(
        2,
        &format!(
            "CREATE TRIGGER {} {} {} ON {} FOR EACH ROW {}",
            prefixed(installed),
            timing.as_str(),
            event.as_str(),
            prefixed(&trigger.table),
            body
        ),
    );
}

fn render_populate(plan: &CompilePlan<'_>, php: &mut PhpBuilder) {
    php.line(1, "public function populate() {");
    let mut first = true;
    for table in &plan.seeded {
        let rows = table.seed_rows_to_emit();
        if !first {
            php.blank();
        }
        first = false;
        php.line(2, format!("// Seed data: {}", comment(&table.name)));
        for row in rows.iter().filter(|r| !r.is_empty()) {
            let columns: Vec<String> = row.keys().map(|c| quote_column(c)).collect();
            let values: Vec<String> = row.values().map(|v| v.to_sql_literal()).collect();
            php.run_sql(
                2,
                &format!(
                    "INSERT INTO {}{} ({}) VALUES ({})",
                    PREFIX_EXPR,
                    table.name,
                    columns.join(", "),
                    values.join(", ")
                ),
            );
        }
    }
    php.line(1, "}");
    php.blank();
}

fn render_uninstall(plan: &CompilePlan<'_>, php: &mut PhpBuilder) {
    let manifest = plan.manifest;

    php.line(1, "public function uninstall() {");
    for name in plan.uninstall_trigger_names() {
        php.run_sql(2, &format!("DROP TRIGGER IF EXISTS {}", prefixed(name)));
    }
    for procedure in &manifest.stored_procedures {
        php.run_sql(
            2,
            &format!("DROP PROCEDURE IF EXISTS {}", prefixed(&procedure.name)),
        );
    }
    for view in &manifest.views {
        php.run_sql(2, &format!("DROP VIEW IF EXISTS {}", prefixed(&view.name)));
    }
    for table in plan.tables.iter().rev() {
        php.line(
            2,
            format!(
                "if ( ! $this->is_core_table( $this->prefix . '{}' ) ) {{",
                single_quoted(&table.name)
            ),
        );
        php.run_sql(
            3,
            &format!("DROP TABLE IF EXISTS {}{}", PREFIX_EXPR, table.name),
        );
        php.line(2, "}");
    }
    php.line(1, "}");
    php.blank();
}
