//! Whole-Dom reachability: object names are nodes, link targets are edges.

use std::collections::{HashSet, VecDeque};

use crate::config::ValidatorConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Location};
use crate::schema::SchemaDom;

/// Outgoing link targets of one object, in key order, deduplicated.
pub fn edges<'a>(dom: &'a SchemaDom, object: &str) -> Vec<&'a str> {
    let Some(obj) = dom.get(object) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    obj.keys
        .values()
        .flat_map(|row| row.link.iter().flatten().flatten().flatten())
        .flat_map(|target| target.object_names())
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Every object name reachable from `roots` (roots included when present).
pub fn reachable<'a>(dom: &'a SchemaDom, roots: &[String]) -> HashSet<&'a str> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    for root in roots {
        if let Some((name, _)) = dom.objects.get_key_value(root.as_str()) {
            let name = name.as_str();
            if visited.insert(name) {
                queue.push_back(name);
            }
        }
    }
    while let Some(current) = queue.pop_front() {
        for next in edges(dom, current) {
            if let Some((name, _)) = dom.objects.get_key_value(next) {
                let name = name.as_str();
                if visited.insert(name) {
                    queue.push_back(name);
                }
            }
        }
    }
    visited
}

/// Orphans in name order. Roots are never orphans.
pub fn orphans<'a>(dom: &'a SchemaDom, roots: &[String]) -> Vec<&'a str> {
    let reached = reachable(dom, roots);
    let mut out: Vec<&str> = dom
        .objects
        .keys()
        .map(String::as_str)
        .filter(|name| !reached.contains(name) && !roots.iter().any(|r| r == name))
        .collect();
    out.sort_unstable();
    out
}

pub fn check(dom: &SchemaDom, config: &ValidatorConfig) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    if !config.roots.iter().any(|r| dom.contains(r)) {
        diags.push(Diagnostic::warning(
            DiagnosticKind::SchemaConsistency,
            "missing-root",
            Location::default(),
            format!("none of the root objects {:?} exist", config.roots),
        ));
    }
    for name in orphans(dom, &config.roots) {
        diags.push(Diagnostic::new(
            DiagnosticKind::SchemaConsistency,
            "orphan-object",
            Location::object(name),
            format!("`{name}` is not reachable from any root"),
        ));
    }
    diags
}
