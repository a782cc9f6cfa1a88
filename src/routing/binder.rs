//! Value binding and path rendering for link generation.
//!
//! # Responsibilities
//! - Decide which values fill a template, from explicit, ambient and default values
//! - Render accepted values into an encoded path plus query string
//!
//! # Design Decisions
//! - Ambient values stop applying at the first parameter whose explicit value differs
//! - Defaults that are not template parameters act as filters on explicit values
//! - Trailing segments equal to their defaults are left out of the path
//! - A value after an unfilled optional segment fails the render

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::routing::values::{route_parts_equal, RouteValues};
use crate::template::{RouteTemplate, TemplateSegment};

/// Characters escaped inside one path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Values selected for one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingResult {
    /// Values used to render the path and query.
    pub accepted_values: RouteValues,
    /// Accepted values plus non-parameter ambient values, seen by constraints.
    pub combined_values: RouteValues,
}

/// A rendered link before it is tagged with a router version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPath {
    pub path: String,
    pub query: String,
}

/// Binds values to one template.
#[derive(Debug, Clone)]
pub struct TemplateBinder {
    template: RouteTemplate,
    defaults: RouteValues,
}

impl TemplateBinder {
    pub fn new(template: RouteTemplate, defaults: RouteValues) -> Self {
        Self { template, defaults }
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    /// Combine `ambient` and explicit `values`. `None` when a required
    /// parameter has no value or an explicit value contradicts a filter default.
    pub fn get_values(&self, ambient: &RouteValues, values: &RouteValues) -> Option<BindingResult> {
        let mut accepted = RouteValues::new();

        for param in self.template.parameters() {
            let explicit = values.get(&param.name);
            let current = ambient.get(&param.name);
            if let (Some(explicit), Some(current)) = (explicit, current) {
                if !route_parts_equal(explicit, current) {
                    break;
                }
            }
            if let Some(value) = explicit.or(current) {
                accept(&mut accepted, &param.name, value);
            }
        }

        for (key, value) in values.iter() {
            accept(&mut accepted, key, value);
        }

        for param in self.template.parameters().filter(|p| p.is_required()) {
            if let Some(default) = self.defaults.get(&param.name) {
                accept(&mut accepted, &param.name, default);
            }
        }

        if self
            .template
            .parameters()
            .any(|p| p.is_required() && !accepted.contains_key(&p.name))
        {
            return None;
        }

        for (key, default) in self.filters() {
            if let Some(value) = values.get(key) {
                if !route_parts_equal(value, default) {
                    return None;
                }
            }
        }

        let mut combined = accepted.clone();
        for (key, value) in ambient.iter() {
            if !value.is_empty() && self.template.parameter(key).is_none() && !accepted.contains_key(key) {
                combined.insert(key, value);
            }
        }

        Some(BindingResult {
            accepted_values: accepted,
            combined_values: combined,
        })
    }

    /// Render `accepted` into the template. Values not consumed by a segment
    /// and not named by a default become the query string.
    pub fn bind_values(&self, accepted: &RouteValues) -> Option<RenderedPath> {
        let mut remaining = accepted.clone();
        let mut path = String::new();
        // encoded segments equal to their defaults, written only if something follows
        let mut buffered: Vec<String> = Vec::new();
        let mut gap = false;

        for segment in self.template.segments() {
            let (encoded, same_as_default) = match segment {
                TemplateSegment::Literal(text) => (encode_segment(text), false),
                TemplateSegment::Parameter(param) => {
                    let value = remaining.remove(&param.name).unwrap_or_default();
                    if value.is_empty() {
                        gap = true;
                        continue;
                    }
                    let same = self
                        .defaults
                        .get(&param.name)
                        .is_some_and(|d| route_parts_equal(&value, d));
                    let encoded = if param.is_catch_all() {
                        value.split('/').map(encode_segment).collect::<Vec<_>>().join("/")
                    } else {
                        encode_segment(&value)
                    };
                    (encoded, same)
                }
            };
            if gap {
                return None;
            }
            if same_as_default {
                buffered.push(encoded);
                continue;
            }
            for pending in buffered.drain(..) {
                path.push('/');
                path.push_str(&pending);
            }
            path.push('/');
            path.push_str(&encoded);
        }

        if path.is_empty() {
            path.push('/');
        }

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (key, value) in remaining.iter() {
            if self.defaults.contains_key(key) {
                continue;
            }
            query.append_pair(key, value);
            has_query = true;
        }
        let query = if has_query { query.finish() } else { String::new() };

        Some(RenderedPath { path, query })
    }

    fn filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults
            .iter()
            .filter(|(key, _)| self.template.parameter(key).is_none())
    }
}

fn accept(accepted: &mut RouteValues, key: &str, value: &str) {
    if !value.is_empty() && !accepted.contains_key(key) {
        accepted.insert(key, value);
    }
}

fn encode_segment(text: &str) -> String {
    utf8_percent_encode(text, SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binder(template: &str, defaults: &[(&str, &str)]) -> TemplateBinder {
        let template = RouteTemplate::parse(template).unwrap();
        let mut all: RouteValues = template.inline_defaults().collect();
        for (k, v) in defaults {
            all.insert(*k, *v);
        }
        TemplateBinder::new(template, all)
    }

    fn render(binder: &TemplateBinder, ambient: &RouteValues, values: &RouteValues) -> Option<String> {
        let binding = binder.get_values(ambient, values)?;
        let rendered = binder.bind_values(&binding.accepted_values)?;
        if rendered.query.is_empty() {
            Some(rendered.path)
        } else {
            Some(format!("{}?{}", rendered.path, rendered.query))
        }
    }

    #[test]
    fn test_explicit_values_fill_template() {
        let b = binder("products/{action}", &[]);
        let values = RouteValues::from([("action", "Buy"), ("id", "5")]);
        assert_eq!(render(&b, &RouteValues::new(), &values).as_deref(), Some("/products/Buy?id=5"));
    }

    #[test]
    fn test_missing_required_parameter_fails() {
        let b = binder("products/{id}", &[]);
        assert!(b.get_values(&RouteValues::new(), &RouteValues::new()).is_none());
    }

    #[test]
    fn test_ambient_values_invalidated_after_mismatch() {
        let b = binder("{controller}/{action}/{id?}", &[]);
        let ambient = RouteValues::from([("controller", "Home"), ("action", "Index"), ("id", "7")]);

        let values = RouteValues::from([("action", "About")]);
        assert_eq!(render(&b, &ambient, &values).as_deref(), Some("/Home/About"));

        let values = RouteValues::new();
        assert_eq!(render(&b, &ambient, &values).as_deref(), Some("/Home/Index/7"));
    }

    #[test]
    fn test_trailing_defaults_are_trimmed() {
        let b = binder("{controller=Home}/{action=Index}/{id?}", &[]);
        let values = RouteValues::from([("controller", "home")]);
        assert_eq!(render(&b, &RouteValues::new(), &values).as_deref(), Some("/"));

        let values = RouteValues::from([("action", "About")]);
        assert_eq!(render(&b, &RouteValues::new(), &values).as_deref(), Some("/Home/About"));
    }

    #[test]
    fn test_filter_defaults_must_match() {
        let b = binder("products/{action}", &[("controller", "Products")]);
        let values = RouteValues::from([("action", "Buy"), ("controller", "Orders")]);
        assert!(b.get_values(&RouteValues::new(), &values).is_none());

        let values = RouteValues::from([("action", "Buy"), ("controller", "products")]);
        assert_eq!(render(&b, &RouteValues::new(), &values).as_deref(), Some("/products/Buy"));
    }

    #[test]
    fn test_combined_values_include_ambient_non_parameters() {
        let b = binder("products/{action}", &[]);
        let ambient = RouteValues::from([("controller", "CoolProducts")]);
        let values = RouteValues::from([("action", "Buy")]);
        let binding = b.get_values(&ambient, &values).unwrap();
        assert!(!binding.accepted_values.contains_key("controller"));
        assert_eq!(binding.combined_values.get("controller"), Some("CoolProducts"));
    }

    #[test]
    fn test_values_are_encoded() {
        let b = binder("search/{term}", &[]);
        let values = RouteValues::from([("term", "a b/c"), ("q", "x&y")]);
        assert_eq!(
            render(&b, &RouteValues::new(), &values).as_deref(),
            Some("/search/a%20b%2Fc?q=x%26y")
        );
    }

    #[test]
    fn test_catch_all_keeps_slashes() {
        let b = binder("files/{*path}", &[]);
        let values = RouteValues::from([("path", "docs/read me.txt")]);
        assert_eq!(
            render(&b, &RouteValues::new(), &values).as_deref(),
            Some("/files/docs/read%20me.txt")
        );
    }

    #[test]
    fn test_value_after_gap_fails() {
        let b = binder("{a}/{b?}/{*rest}", &[]);
        let accepted = RouteValues::from([("a", "x"), ("rest", "y")]);
        assert!(b.bind_values(&accepted).is_none());

        let accepted = RouteValues::from([("a", "x")]);
        assert_eq!(b.bind_values(&accepted).unwrap().path, "/x");
    }
}
