//! Candidate selection for unnamed link generation.
//!
//! # Responsibilities
//! - Pair each outbound entry with its binder (`OutboundMatch`)
//! - Index outbound entries by their required link values
//! - Return the candidates eligible for a value set, most specific first
//!
//! # Design Decisions
//! - Each node branches on the key shared by the most remaining entries
//! - Branch values are ASCII-lowercased
//! - Without an explicit value, an ambient value selects its branch and the
//!   empty-value branch is explored as a fallback
//! - Order: non-fallback first, then more required values, then registration order

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::routing::binder::TemplateBinder;
use crate::routing::entry::OutboundRouteEntry;
use crate::routing::values::RouteValues;

/// One outbound entry together with the binder for its template.
#[derive(Debug)]
pub struct OutboundMatch {
    pub entry: Arc<OutboundRouteEntry>,
    pub binder: TemplateBinder,
}

impl OutboundMatch {
    pub fn new(entry: Arc<OutboundRouteEntry>) -> Self {
        let binder = TemplateBinder::new(entry.template.clone(), entry.defaults.clone());
        Self { entry, binder }
    }
}

#[derive(Debug, Default)]
struct DecisionNode {
    matches: Vec<Arc<OutboundMatch>>,
    criteria: Vec<Criterion>,
}

#[derive(Debug)]
struct Criterion {
    key: String,
    branches: HashMap<String, DecisionNode>,
}

/// Decision tree over required link values.
#[derive(Debug, Default)]
pub struct LinkGenerationDecisionTree {
    root: DecisionNode,
}

impl LinkGenerationDecisionTree {
    pub fn new(matches: &[Arc<OutboundMatch>]) -> Self {
        let mut path = Vec::new();
        Self {
            root: build(matches.to_vec(), &mut path),
        }
    }

    /// Candidates whose required values are satisfied by `values`, falling
    /// back to `ambient` for keys not given explicitly.
    pub fn get_matches(&self, values: &RouteValues, ambient: &RouteValues) -> Vec<&OutboundMatch> {
        let mut results = Vec::new();
        walk(&self.root, values, ambient, false, &mut results);
        results.sort_by_key(|(m, fallback)| {
            (
                *fallback,
                Reverse(m.entry.required_link_values.len()),
                m.entry.order,
            )
        });
        results.into_iter().map(|(m, _)| m).collect()
    }
}

fn build(items: Vec<Arc<OutboundMatch>>, path: &mut Vec<String>) -> DecisionNode {
    let mut node = DecisionNode::default();
    let mut pending = Vec::new();
    for item in items {
        if unmatched_keys(&item, path).next().is_none() {
            node.matches.push(item);
        } else {
            pending.push(item);
        }
    }

    while let Some(key) = most_common_key(&pending, path) {
        let (with, without): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|item| item.entry.required_link_values.contains_key(&key));

        let mut grouped: HashMap<String, Vec<Arc<OutboundMatch>>> = HashMap::new();
        for item in with {
            let value = item
                .entry
                .required_link_values
                .get(&key)
                .unwrap_or_default()
                .to_ascii_lowercase();
            grouped.entry(value).or_default().push(item);
        }

        path.push(key.clone());
        let branches = grouped
            .into_iter()
            .map(|(value, items)| (value, build(items, path)))
            .collect();
        path.pop();

        node.criteria.push(Criterion { key, branches });
        pending = without;
    }
    node
}

fn unmatched_keys<'a>(item: &'a OutboundMatch, path: &'a [String]) -> impl Iterator<Item = &'a str> {
    item.entry
        .required_link_values
        .keys()
        .filter(move |key| !path.iter().any(|p| p.eq_ignore_ascii_case(key)))
}

/// The unmatched key shared by the most items; ties go to the smallest key.
fn most_common_key(items: &[Arc<OutboundMatch>], path: &[String]) -> Option<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for item in items {
        for key in unmatched_keys(item, path) {
            *counts.entry(key.to_ascii_lowercase()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(key, _)| key)
}

fn walk<'a>(
    node: &'a DecisionNode,
    values: &RouteValues,
    ambient: &RouteValues,
    fallback: bool,
    results: &mut Vec<(&'a OutboundMatch, bool)>,
) {
    results.extend(node.matches.iter().map(|m| (m.as_ref(), fallback)));

    for criterion in &node.criteria {
        match values.get(&criterion.key) {
            Some(value) => {
                if let Some(branch) = criterion.branches.get(&value.to_ascii_lowercase()) {
                    walk(branch, values, ambient, fallback, results);
                }
            }
            None => {
                if let Some(value) = ambient.get(&criterion.key).filter(|v| !v.is_empty()) {
                    if let Some(branch) = criterion.branches.get(&value.to_ascii_lowercase()) {
                        walk(branch, values, ambient, fallback, results);
                    }
                }
                if let Some(branch) = criterion.branches.get("") {
                    walk(branch, values, ambient, true, results);
                }
            }
        }
    }
}
