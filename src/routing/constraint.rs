//! Route parameter constraints.
//!
//! # Responsibilities
//! - Define the `RouteConstraint` capability and its evaluation context
//! - Provide the built-in inline constraints (`int`, `range(1,10)`, `regex(...)`, ...)
//! - Resolve inline constraint text into constraint objects at build time
//! - Evaluate an entry's constraints for one direction
//!
//! # Design Decisions
//! - The engine passes the direction; each constraint decides what it means
//! - Resolution errors surface at build time, never at request time
//! - An optional parameter without a value skips its constraints

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::Extensions;
use regex::{Regex, RegexBuilder};

use crate::routing::error::ConstraintError;
use crate::routing::router::TreeRouter;
use crate::routing::values::RouteValues;

/// Which way a route is being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteDirection {
    IncomingRequest,
    UrlGeneration,
}

impl RouteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDirection::IncomingRequest => "incoming",
            RouteDirection::UrlGeneration => "generation",
        }
    }
}

/// Everything a constraint may inspect.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintContext<'a> {
    pub parameter: &'a str,
    pub values: &'a RouteValues,
    pub extensions: Option<&'a Extensions>,
    pub router: &'a TreeRouter,
    pub direction: RouteDirection,
}

impl<'a> ConstraintContext<'a> {
    /// The value of the constrained parameter, if bound.
    pub fn value(&self) -> Option<&'a str> {
        self.values.get(self.parameter)
    }
}

/// A predicate restricting the values a parameter accepts.
pub trait RouteConstraint: Send + Sync + fmt::Debug {
    /// `Ok(false)` rejects the value; `Err` is a fault and aborts the call.
    fn matches(&self, cx: &ConstraintContext<'_>) -> Result<bool, ConstraintError>;
}

/// Simple predicates over the parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueConstraint {
    Int,
    Long,
    Bool,
    Alpha,
    Guid,
    Required,
    Min(i64),
    Max(i64),
    Range(i64, i64),
    Length(usize, usize),
    MinLength(usize),
    MaxLength(usize),
}

impl ValueConstraint {
    fn accepts(&self, value: &str) -> bool {
        let number = || value.parse::<i64>().ok();
        let chars = || value.chars().count();
        match *self {
            ValueConstraint::Int => value.parse::<i32>().is_ok(),
            ValueConstraint::Long => number().is_some(),
            ValueConstraint::Bool => {
                value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
            }
            ValueConstraint::Alpha => {
                !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic())
            }
            ValueConstraint::Guid => uuid::Uuid::parse_str(value).is_ok(),
            ValueConstraint::Required => !value.is_empty(),
            ValueConstraint::Min(min) => number().is_some_and(|n| n >= min),
            ValueConstraint::Max(max) => number().is_some_and(|n| n <= max),
            ValueConstraint::Range(min, max) => number().is_some_and(|n| (min..=max).contains(&n)),
            ValueConstraint::Length(min, max) => (min..=max).contains(&chars()),
            ValueConstraint::MinLength(min) => chars() >= min,
            ValueConstraint::MaxLength(max) => chars() <= max,
        }
    }
}

impl RouteConstraint for ValueConstraint {
    fn matches(&self, cx: &ConstraintContext<'_>) -> Result<bool, ConstraintError> {
        Ok(cx.value().is_some_and(|v| self.accepts(v)))
    }
}

/// Matches the whole value against a case-insensitive regular expression.
#[derive(Debug, Clone)]
pub struct RegexConstraint {
    regex: Regex,
}

impl RegexConstraint {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&format!("^(?:{pattern})$"))
            .case_insensitive(true)
            .build()?;
        Ok(Self { regex })
    }
}

impl RouteConstraint for RegexConstraint {
    fn matches(&self, cx: &ConstraintContext<'_>) -> Result<bool, ConstraintError> {
        Ok(cx.value().is_some_and(|v| self.regex.is_match(v)))
    }
}

/// Applies the inner constraint in one direction and accepts in the other.
#[derive(Debug, Clone)]
pub struct Directional {
    inner: Arc<dyn RouteConstraint>,
    direction: RouteDirection,
}

impl Directional {
    pub fn incoming_only(inner: Arc<dyn RouteConstraint>) -> Self {
        Self {
            inner,
            direction: RouteDirection::IncomingRequest,
        }
    }

    pub fn generation_only(inner: Arc<dyn RouteConstraint>) -> Self {
        Self {
            inner,
            direction: RouteDirection::UrlGeneration,
        }
    }
}

impl RouteConstraint for Directional {
    fn matches(&self, cx: &ConstraintContext<'_>) -> Result<bool, ConstraintError> {
        if cx.direction == self.direction {
            self.inner.matches(cx)
        } else {
            Ok(true)
        }
    }
}

/// Why an inline constraint could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    Unknown,
    InvalidArgument(String),
}

type ConstraintFactory =
    Arc<dyn Fn(Option<&str>) -> Result<Arc<dyn RouteConstraint>, String> + Send + Sync>;

/// Maps inline constraint names to constructors.
#[derive(Clone)]
pub struct ConstraintResolver {
    factories: HashMap<String, ConstraintFactory>,
}

impl ConstraintResolver {
    /// A resolver with no constraints registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a constraint under `name` (case-insensitive), replacing any previous one.
    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(Option<&str>) -> Result<Arc<dyn RouteConstraint>, String> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.to_ascii_lowercase(), Arc::new(factory));
        self
    }

    /// Resolve an expression such as `int` or `range(1,10)`.
    pub fn resolve(&self, expr: &str) -> Result<Arc<dyn RouteConstraint>, ResolveError> {
        let (name, args) = match expr.find('(') {
            Some(open) if expr.ends_with(')') => (&expr[..open], Some(&expr[open + 1..expr.len() - 1])),
            Some(_) => return Err(ResolveError::InvalidArgument(format!("malformed '{expr}'"))),
            None => (expr, None),
        };
        let factory = self
            .factories
            .get(&name.trim().to_ascii_lowercase())
            .ok_or(ResolveError::Unknown)?;
        factory(args).map_err(ResolveError::InvalidArgument)
    }

    fn value(&mut self, name: &str, constraint: ValueConstraint) -> &mut Self {
        let label = name.to_string();
        self.register(name, move |args| {
            if args.is_some() {
                return Err(format!("'{label}' takes no arguments"));
            }
            Ok(Arc::new(constraint.clone()) as Arc<dyn RouteConstraint>)
        })
    }
}

impl Default for ConstraintResolver {
    fn default() -> Self {
        let mut resolver = Self::empty();
        resolver
            .value("int", ValueConstraint::Int)
            .value("long", ValueConstraint::Long)
            .value("bool", ValueConstraint::Bool)
            .value("alpha", ValueConstraint::Alpha)
            .value("guid", ValueConstraint::Guid)
            .value("required", ValueConstraint::Required);
        resolver
            .register("min", |args| Ok(Arc::new(ValueConstraint::Min(one_arg(args)?))))
            .register("max", |args| Ok(Arc::new(ValueConstraint::Max(one_arg(args)?))))
            .register("range", |args| {
                let (min, max) = two_args(args)?;
                Ok(Arc::new(ValueConstraint::Range(min, max)))
            })
            .register("length", |args| {
                let constraint = match args.map(|a| a.contains(',')) {
                    Some(true) => {
                        let (min, max) = two_args(args)?;
                        ValueConstraint::Length(min, max)
                    }
                    _ => {
                        let exact = one_arg(args)?;
                        ValueConstraint::Length(exact, exact)
                    }
                };
                Ok(Arc::new(constraint))
            })
            .register("minlength", |args| Ok(Arc::new(ValueConstraint::MinLength(one_arg(args)?))))
            .register("maxlength", |args| Ok(Arc::new(ValueConstraint::MaxLength(one_arg(args)?))))
            .register("regex", |args| {
                let pattern = args.ok_or("regex requires a pattern")?;
                let constraint = RegexConstraint::new(pattern).map_err(|e| e.to_string())?;
                Ok(Arc::new(constraint))
            });
        resolver
    }
}

impl fmt::Debug for ConstraintResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ConstraintResolver").field("names", &names).finish()
    }
}

fn one_arg<T: std::str::FromStr>(args: Option<&str>) -> Result<T, String> {
    let arg = args.ok_or("missing argument")?;
    arg.trim()
        .parse()
        .map_err(|_| format!("invalid argument '{arg}'"))
}

fn two_args<T: std::str::FromStr>(args: Option<&str>) -> Result<(T, T), String> {
    let arg = args.ok_or("missing arguments")?;
    let (a, b) = arg
        .split_once(',')
        .ok_or_else(|| format!("expected two arguments, got '{arg}'"))?;
    Ok((one_arg(Some(a))?, one_arg(Some(b))?))
}

/// The resolved constraints of one parameter.
#[derive(Debug, Clone)]
pub struct ParameterConstraints {
    pub parameter: String,
    /// Optional parameters without a value skip evaluation.
    pub optional: bool,
    pub constraints: Vec<Arc<dyn RouteConstraint>>,
}

/// Evaluate every constraint of an entry. Stops at the first rejection.
pub(crate) fn match_all(
    constraints: &[ParameterConstraints],
    values: &RouteValues,
    extensions: Option<&Extensions>,
    router: &TreeRouter,
    direction: RouteDirection,
    template: &str,
) -> Result<bool, ConstraintError> {
    for entry in constraints {
        if entry.optional && !values.contains_key(&entry.parameter) {
            continue;
        }
        let cx = ConstraintContext {
            parameter: &entry.parameter,
            values,
            extensions,
            router,
            direction,
        };
        for constraint in &entry.constraints {
            if !constraint.matches(&cx)? {
                tracing::debug!(
                    template = %template,
                    parameter = %entry.parameter,
                    value = ?values.get(&entry.parameter),
                    direction = direction.as_str(),
                    constraint = ?constraint,
                    "Route value rejected by constraint"
                );
                return Ok(false);
            }
        }
    }
    Ok(true)
}
