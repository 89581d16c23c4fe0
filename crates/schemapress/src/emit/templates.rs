//! Stub and main plugin templates.

use super::php::{comment, single_quoted};
use super::CompilePlan;

pub(crate) fn class_file_name(slug: &str) -> String {
    format!("class-{}.php", slug)
}

pub(crate) fn stub_file_name(slug: &str) -> String {
    format!("{}-installer.php", slug)
}

pub(crate) fn main_file_name(slug: &str) -> String {
    format!("{}.php", slug)
}

/// Script that runs the installer once outside the plugin lifecycle.
pub(crate) fn render_stub(plan: &CompilePlan<'_>) -> String {
    let class_file = single_quoted(&class_file_name(&plan.slug));
    format!(
        r#"<?php
/**
 * Runs {class} by hand, e.g. `wp eval-file {stub}`.
 */

require_once dirname( __FILE__ ) . '/../../../wp-load.php';
require_once dirname( __FILE__ ) . '/{class_file}';

global $wpdb;

$installer = new {class}( $wpdb );
$installer->install();
$installer->populate();
// $installer->uninstall();
"#,
        class = plan.class_name,
        stub = comment(&stub_file_name(&plan.slug)),
        class_file = class_file,
    )
}

/// Plugin entry point wiring the installer to the activation hooks.
pub(crate) fn render_main(plan: &CompilePlan<'_>) -> String {
    let function_prefix = plan.slug.replace('-', "_");
    let plugin_name = comment(&plan.class_name.replace('_', " "));
    let class_file = single_quoted(&class_file_name(&plan.slug));

    format!(
        r#"<?php
/**
 * Plugin Name: {plugin_name}
 * Description: Installs the database objects of {class}.
 * Version: 1.0.0
 */

if ( ! defined( 'ABSPATH' ) ) {{
    exit;
}}

require_once plugin_dir_path( __FILE__ ) . '{class_file}';

function {fp}_activate() {{
    global $wpdb;
    $installer = new {class}( $wpdb );
    $installer->install();
    $installer->populate();
}}

function {fp}_deactivate() {{
}}

function {fp}_uninstall() {{
    global $wpdb;
    $installer = new {class}( $wpdb );
    $installer->uninstall();
}}

register_activation_hook( __FILE__, '{fp}_activate' );
register_deactivation_hook( __FILE__, '{fp}_deactivate' );
register_uninstall_hook( __FILE__, '{fp}_uninstall' );
"#,
        plugin_name = plugin_name,
        class = plan.class_name,
        class_file = class_file,
        fp = function_prefix,
    )
}

#[cfg(test)]
mod tests {
    use crate::core::Manifest;
    use crate::emit::{compile, EmitOptions};

    #[test]
    fn test_main_plugin_hooks() {
        let manifest = Manifest::new("shop", "wp_");
        let compiled = compile(&manifest, Some("Acme_Shop"), &EmitOptions::default()).unwrap();
        let main = &compiled.main_plugin.content;
        assert_eq!(compiled.main_plugin.file_name, "acme-shop.php");
        assert!(main.contains("Plugin Name: Acme Shop"));
        assert!(main.contains("require_once plugin_dir_path( __FILE__ ) . 'class-acme-shop.php';"));
        assert!(main.contains("register_uninstall_hook( __FILE__, 'acme_shop_uninstall' );"));
        assert!(main.contains("function acme_shop_uninstall() {"));
        assert!(main.contains("$installer = new Acme_Shop( $wpdb );"));
    }

    #[test]
    fn test_stub_runs_install_and_populate() {
        let manifest = Manifest::new("shop", "wp_");
        let compiled = compile(&manifest, None, &EmitOptions::default()).unwrap();
        let stub = &compiled.installer_stub.content;
        assert!(stub.contains("require_once dirname( __FILE__ ) . '/class-my-plugin-installer.php';"));
        assert!(stub.contains("$installer->install();\n$installer->populate();\n// $installer->uninstall();"));
    }
}
