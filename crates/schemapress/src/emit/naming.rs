//! Installed trigger names.
//!
//! MySQL keeps triggers in their own namespace, but the installer's runtime
//! helpers and most admin tools do not, so a trigger named after its table is
//! renamed on install. Names are compared case-insensitively.

use std::collections::HashSet;

use crate::core::Manifest;

/// Base used for triggers with a blank name.
const BLANK_TRIGGER_BASE: &str = "trigger";

/// Final installed name for every trigger, in manifest order.
///
/// Table, view and procedure names are reserved. Each trigger takes the first
/// free candidate of `name`, `name_trg`, `name_trg2`, `name_trg3`, ...
pub fn trigger_names(manifest: &Manifest) -> Vec<String> {
    let reserved: HashSet<String> = manifest
        .tables
        .iter()
        .map(|t| t.name.as_str())
        .chain(manifest.views.iter().map(|v| v.name.as_str()))
        .chain(manifest.stored_procedures.iter().map(|p| p.name.as_str()))
        .map(str::to_lowercase)
        .collect();

    let mut used: HashSet<String> = HashSet::new();
    manifest
        .triggers
        .iter()
        .map(|trigger| {
            let base = match trigger.name.trim() {
                "" => BLANK_TRIGGER_BASE,
                name => name,
            };
            let name = candidates(base)
                .find(|c| {
                    let key = c.to_lowercase();
                    !reserved.contains(&key) && !used.contains(&key)
                })
                .unwrap_or_else(|| base.to_string());
            used.insert(name.to_lowercase());
            name
        })
        .collect()
}

fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string())
        .chain(std::iter::once(format!("{}_trg", base)))
        .chain((2u64..).map(move |n| format!("{}_trg{}", base, n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Table, Trigger, View};

    fn trigger(name: &str, table: &str) -> Trigger {
        Trigger {
            name: name.into(),
            name_original: format!("wp_{}", name),
            full_name: String::new(),
            event: "AFTER INSERT".into(),
            table: table.into(),
            definition: "BEGIN END".into(),
            comment: None,
        }
    }

    fn manifest() -> Manifest {
        let mut m = Manifest::new("shop", "wp_");
        m.tables.push(Table::new("orders", "wp_orders", "shop"));
        m.views.push(View {
            name: "Audit".into(),
            name_original: "wp_Audit".into(),
            full_name: String::new(),
            definition: String::new(),
            comment: None,
        });
        m
    }

    #[test]
    fn test_colliding_names_get_suffixes() {
        let mut m = manifest();
        m.triggers = vec![
            trigger("orders", "orders"),
            trigger("ORDERS", "orders"),
            trigger("audit", "orders"),
            trigger("stock", "orders"),
        ];
        assert_eq!(
            trigger_names(&m),
            vec!["orders_trg", "ORDERS_trg2", "audit_trg", "stock"]
        );
    }

    #[test]
    fn test_blank_names_use_trigger_base() {
        let mut m = manifest();
        m.triggers = vec![trigger("", "orders"), trigger("  ", "orders")];
        assert_eq!(trigger_names(&m), vec!["trigger", "trigger_trg"]);
    }

    #[test]
    fn test_names_are_deterministic() {
        let mut m = manifest();
        m.triggers = vec![trigger("orders", "orders"), trigger("orders", "orders")];
        assert_eq!(trigger_names(&m), trigger_names(&m));
        assert_eq!(trigger_names(&m), vec!["orders_trg", "orders_trg2"]);
    }
}
