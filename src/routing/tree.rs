//! Forward matching trie.
//!
//! # Responsibilities
//! - Group inbound entries by shared path prefix into nodes keyed by depth
//! - Enumerate candidate nodes for a request path in precedence order
//!
//! # Design Decisions
//! - Literal children are keyed by ASCII-lowercased text
//! - Optional, defaulted and catch-all parameters also register the entry on the
//!   parent node, so shorter paths reach it without descending
//! - Each node's matches are sorted by precedence, then registration order
//! - Enumeration uses an explicit stack; push order is the reverse of the
//!   required pop order (literal > constrained > parameter > constrained catch-all > catch-all)

use std::collections::HashMap;
use std::sync::Arc;

use crate::routing::entry::{InboundRouteEntry, SegmentKind};
use crate::routing::path::RequestPath;
use crate::template::TemplateSegment;

/// One trie node.
#[derive(Debug, Default)]
pub struct UrlMatchingNode {
    depth: usize,
    is_catch_all: bool,
    literals: HashMap<String, UrlMatchingNode>,
    parameters: Option<Box<UrlMatchingNode>>,
    constrained_parameters: Option<Box<UrlMatchingNode>>,
    catch_alls: Option<Box<UrlMatchingNode>>,
    constrained_catch_alls: Option<Box<UrlMatchingNode>>,
    matches: Vec<Arc<InboundRouteEntry>>,
}

impl UrlMatchingNode {
    fn new(depth: usize, is_catch_all: bool) -> Self {
        Self {
            depth,
            is_catch_all,
            ..Self::default()
        }
    }

    /// Number of path segments consumed to reach this node.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_catch_all(&self) -> bool {
        self.is_catch_all
    }

    /// Entries whose template is satisfied at this node, in try order.
    pub fn matches(&self) -> &[Arc<InboundRouteEntry>] {
        &self.matches
    }

    pub fn literal(&self, segment: &str) -> Option<&UrlMatchingNode> {
        self.literals.get(&segment.to_ascii_lowercase())
    }

    fn child(&mut self, kind: SegmentKind, literal: &str) -> &mut UrlMatchingNode {
        let depth = self.depth + 1;
        let slot = match kind {
            SegmentKind::Literal => {
                return self
                    .literals
                    .entry(literal.to_ascii_lowercase())
                    .or_insert_with(|| UrlMatchingNode::new(depth, false));
            }
            SegmentKind::ConstrainedParameter => &mut self.constrained_parameters,
            SegmentKind::Parameter => &mut self.parameters,
            SegmentKind::ConstrainedCatchAll => &mut self.constrained_catch_alls,
            SegmentKind::CatchAll => &mut self.catch_alls,
        };
        let catch_all = matches!(kind, SegmentKind::CatchAll | SegmentKind::ConstrainedCatchAll);
        slot.get_or_insert_with(|| Box::new(UrlMatchingNode::new(depth, catch_all)))
    }

    fn sort(&mut self) {
        self.matches
            .sort_by(|a, b| a.precedence.cmp(&b.precedence).then(a.order.cmp(&b.order)));
        for node in self.literals.values_mut() {
            node.sort();
        }
        for node in [
            &mut self.parameters,
            &mut self.constrained_parameters,
            &mut self.catch_alls,
            &mut self.constrained_catch_alls,
        ]
        .into_iter()
        .flatten()
        {
            node.sort();
        }
    }
}

/// The trie built from every inbound entry of a router.
#[derive(Debug, Default)]
pub struct UrlMatchingTree {
    root: UrlMatchingNode,
}

impl UrlMatchingTree {
    pub fn new(entries: &[Arc<InboundRouteEntry>]) -> Self {
        let mut tree = Self::default();
        for entry in entries {
            tree.add_entry(entry);
        }
        tree.root.sort();
        tree
    }

    pub fn root(&self) -> &UrlMatchingNode {
        &self.root
    }

    /// Start a depth-first walk over the candidate nodes for a path.
    pub fn enumerate(&self) -> TreeEnumerator<'_> {
        TreeEnumerator {
            stack: vec![&self.root],
        }
    }

    fn add_entry(&mut self, entry: &Arc<InboundRouteEntry>) {
        let mut current = &mut self.root;
        for (index, segment) in entry.template.segments().iter().enumerate() {
            let kind = entry.segment_kind(index);
            let literal = match segment {
                TemplateSegment::Literal(text) => text.as_str(),
                TemplateSegment::Parameter(param) => {
                    let has_default = entry.defaults.contains_key(&param.name);
                    if param.is_optional() || param.is_catch_all() || has_default {
                        current.matches.push(Arc::clone(entry));
                    }
                    ""
                }
            };
            current = current.child(kind, literal);
        }
        current.matches.push(Arc::clone(entry));
    }
}

/// Yields nodes with candidate matches, most specific first.
///
/// The path is passed to every `next` call instead of being held, so callers
/// can mutate the request context between steps.
#[derive(Debug)]
pub struct TreeEnumerator<'a> {
    stack: Vec<&'a UrlMatchingNode>,
}

impl<'a> TreeEnumerator<'a> {
    pub fn next(&mut self, path: &RequestPath) -> Option<&'a UrlMatchingNode> {
        while let Some(node) = self.stack.pop() {
            // a catch-all consumes the rest of the path, including nothing
            if node.is_catch_all && !node.matches.is_empty() {
                return Some(node);
            }
            if node.depth == path.len() {
                if !node.matches.is_empty() {
                    return Some(node);
                }
                continue;
            }

            for child in [
                &node.catch_alls,
                &node.constrained_catch_alls,
                &node.parameters,
                &node.constrained_parameters,
            ]
            .into_iter()
            .flatten()
            {
                self.stack.push(child);
            }
            if let Some(child) = path.get(node.depth).and_then(|s| node.literal(s)) {
                self.stack.push(child);
            }
        }
        None
    }
}
