// ABOUTME: Permission scope registry with hierarchical composite expansion
// ABOUTME: Defines the commerce scope table and scope containment checks
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scope registry for the authorization server.
//!
//! Scopes are string identifiers of the form `<resource>.<action>` (for
//! example `orders.read`) or composite identifiers that expand to other
//! scopes. The registry is a constructed configuration object passed into
//! the authorization service, so deployments can swap the table without
//! touching protocol code.
//!
//! Expansion rules:
//! - `<resource>.manage` implies `<resource>.read` and `<resource>.write`
//! - `read_all` implies every `*.read` scope
//! - `manage_all` implies every registered scope

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A registered scope with its fully expanded closure.
#[derive(Debug, Clone)]
struct ScopeEntry {
    description: String,
    /// Transitive closure of everything this scope grants, including itself.
    closure: BTreeSet<String>,
}

/// Static hierarchy of permission identifiers and composite expansion rules.
///
/// Pure lookup structure: no side effects, no failure modes. Unknown scopes
/// expand to the empty set, so `has_scope` is `false` for anything the
/// registry does not know about.
#[derive(Debug, Clone, Default)]
pub struct ScopeRegistry {
    entries: BTreeMap<String, ScopeEntry>,
    grouped: BTreeMap<String, Vec<String>>,
    presets: BTreeMap<String, Vec<String>>,
}

/// Catalog projection returned by `GET /oauth/scopes`.
#[derive(Debug, Serialize)]
pub struct ScopeCatalog {
    /// Every registered scope with a human-readable description.
    pub scopes: Vec<ScopeInfo>,
    /// Scopes grouped by resource (composites under `"global"`).
    pub grouped: BTreeMap<String, Vec<String>>,
    /// Named bundles suitable for consent-screen shortcuts.
    pub presets: BTreeMap<String, Vec<String>>,
}

/// One scope in the catalog projection.
#[derive(Debug, Serialize)]
pub struct ScopeInfo {
    pub scope: String,
    pub description: String,
}

/// Builder for a [`ScopeRegistry`].
#[derive(Debug, Default)]
pub struct ScopeRegistryBuilder {
    resources: Vec<String>,
    presets: BTreeMap<String, Vec<String>>,
}

impl ScopeRegistryBuilder {
    /// Register a resource, creating `<resource>.read`, `<resource>.write`,
    /// and `<resource>.manage` scopes.
    #[must_use]
    pub fn resource(mut self, name: &str) -> Self {
        self.resources.push(name.to_owned());
        self
    }

    /// Register a named preset bundle for the catalog projection.
    #[must_use]
    pub fn preset(mut self, name: &str, scopes: &[&str]) -> Self {
        self.presets.insert(
            name.to_owned(),
            scopes.iter().map(|s| (*s).to_owned()).collect(),
        );
        self
    }

    /// Build the registry, computing the expansion closure for every scope.
    #[must_use]
    pub fn build(self) -> ScopeRegistry {
        let mut entries = BTreeMap::new();
        let mut grouped = BTreeMap::new();
        let mut all_reads = BTreeSet::new();

        for resource in &self.resources {
            let read = format!("{resource}.read");
            let write = format!("{resource}.write");
            let manage = format!("{resource}.manage");

            entries.insert(
                read.clone(),
                ScopeEntry {
                    description: format!("Read access to {resource}"),
                    closure: BTreeSet::from([read.clone()]),
                },
            );
            entries.insert(
                write.clone(),
                ScopeEntry {
                    description: format!("Write access to {resource}"),
                    closure: BTreeSet::from([write.clone()]),
                },
            );
            entries.insert(
                manage.clone(),
                ScopeEntry {
                    description: format!("Full management of {resource}"),
                    closure: BTreeSet::from([manage.clone(), read.clone(), write.clone()]),
                },
            );

            all_reads.insert(read.clone());
            grouped.insert(resource.clone(), vec![read, write, manage]);
        }

        // read_all covers itself plus every per-resource read scope.
        let mut read_all_closure = all_reads;
        read_all_closure.insert("read_all".to_owned());
        entries.insert(
            "read_all".to_owned(),
            ScopeEntry {
                description: "Read access to every resource".to_owned(),
                closure: read_all_closure,
            },
        );

        // manage_all covers every registered scope, including itself.
        let mut manage_all_closure: BTreeSet<String> = entries.keys().cloned().collect();
        manage_all_closure.insert("manage_all".to_owned());
        entries.insert(
            "manage_all".to_owned(),
            ScopeEntry {
                description: "Full access to every resource".to_owned(),
                closure: manage_all_closure,
            },
        );

        grouped.insert(
            "global".to_owned(),
            vec!["read_all".to_owned(), "manage_all".to_owned()],
        );

        ScopeRegistry {
            entries,
            grouped,
            presets: self.presets,
        }
    }
}

impl ScopeRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> ScopeRegistryBuilder {
        ScopeRegistryBuilder::default()
    }

    /// The default commerce scope table.
    #[must_use]
    pub fn commerce() -> Self {
        Self::builder()
            .resource("products")
            .resource("orders")
            .resource("customers")
            .resource("carts")
            .resource("discounts")
            .resource("webhooks")
            .preset("storefront_read", &["read_all"])
            .preset("order_management", &["orders.manage", "customers.read"])
            .preset("full_access", &["manage_all"])
            .build()
    }

    /// Whether `scope` is registered.
    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.entries.contains_key(scope)
    }

    /// Expansion closure of a possibly-composite scope, including the scope
    /// itself. Unknown scopes expand to the empty set.
    #[must_use]
    pub fn expand(&self, scope: &str) -> BTreeSet<String> {
        self.entries
            .get(scope)
            .map(|e| e.closure.clone())
            .unwrap_or_default()
    }

    /// Whether `required` is granted by any scope in `granted`, accounting
    /// for composite expansion.
    #[must_use]
    pub fn has_scope<'a>(
        &self,
        granted: impl IntoIterator<Item = &'a String>,
        required: &str,
    ) -> bool {
        granted.into_iter().any(|g| {
            self.entries
                .get(g.as_str())
                .is_some_and(|e| e.closure.contains(required))
        })
    }

    /// Whether every scope in `requested` is granted by `granted`.
    ///
    /// Expansion closures are transitive, so membership of the requested
    /// identifier itself is sufficient: if `r` is in some `expand(g)`, then
    /// `expand(r) ⊆ expand(g)`.
    #[must_use]
    pub fn contains_all(&self, granted: &BTreeSet<String>, requested: &BTreeSet<String>) -> bool {
        requested.iter().all(|r| self.has_scope(granted, r))
    }

    /// Every registered scope identifier, for discovery metadata.
    #[must_use]
    pub fn all_scopes(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Catalog projection for `GET /oauth/scopes`.
    #[must_use]
    pub fn catalog(&self) -> ScopeCatalog {
        ScopeCatalog {
            scopes: self
                .entries
                .iter()
                .map(|(scope, entry)| ScopeInfo {
                    scope: scope.clone(),
                    description: entry.description.clone(),
                })
                .collect(),
            grouped: self.grouped.clone(),
            presets: self.presets.clone(),
        }
    }
}

/// Parse a space-delimited scope parameter into a set.
#[must_use]
pub fn parse_scope_param(scope: &str) -> BTreeSet<String> {
    scope
        .split_whitespace()
        .map(std::borrow::ToOwned::to_owned)
        .collect()
}

/// Join a scope set into the space-delimited wire form.
#[must_use]
pub fn join_scopes(scopes: &BTreeSet<String>) -> String {
    scopes.iter().cloned().collect::<Vec<_>>().join(" ")
}
