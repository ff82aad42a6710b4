//! Expression resolution
//!
//! Placeholders are resolved against a scope tree. Each dynamic segment tries its
//! alternatives in order; a referenced leaf that is itself an expression is
//! resolved recursively. The templates already entered on the current chain are
//! carried by value in a [`ResolutionChain`], so mutually referencing leaves
//! stop instead of looping.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::interpolation::{parse_scalar, Expression, Segment};
use crate::node::Node;
use crate::path::Path;
use crate::value::Scalar;

/// What a whole-tree resolution does with leaves that stay unresolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnresolvedPolicy {
    /// Fail with an unresolved expression error
    #[default]
    Fail,
    /// Keep the original template text as a plain string
    Unwrap,
}

/// Templates entered on one resolution chain
#[derive(Debug, Clone, Default)]
pub struct ResolutionChain {
    templates: HashSet<String>,
}

impl ResolutionChain {
    /// Chain started by resolving `expression`
    pub fn starting_at(expression: &Expression) -> Self {
        Self::default().with(expression)
    }

    /// Check if entering `expression` would close a cycle
    pub fn would_cause_cycle(&self, expression: &Expression) -> bool {
        self.templates.contains(expression.template())
    }

    /// Copy of this chain extended with `expression`
    pub fn with(&self, expression: &Expression) -> Self {
        let mut templates = self.templates.clone();
        templates.insert(expression.template().to_string());
        Self { templates }
    }
}

/// Resolves expressions against a scope tree
pub struct ExpressionResolver<'a> {
    scope: &'a Node,
}

impl<'a> ExpressionResolver<'a> {
    /// The scope leaves must already be parsed, see [`parse_scalar`]
    pub fn new(scope: &'a Node) -> Self {
        Self { scope }
    }

    /// Resolve a leaf value. Non-expression values come back unchanged.
    pub fn resolve_scalar(&self, value: &Scalar) -> Scalar {
        match value {
            Scalar::Expression(expression) => {
                self.resolve(expression, &ResolutionChain::starting_at(expression))
            }
            other => other.clone(),
        }
    }

    /// Resolve as many segments as possible.
    ///
    /// Returns the collapsed value when every segment became static, otherwise
    /// the partially resolved expression.
    pub fn resolve(&self, expression: &Expression, chain: &ResolutionChain) -> Scalar {
        let segments: Vec<Segment> = expression
            .segments()
            .iter()
            .map(|segment| match segment {
                Segment::Dynamic { alternatives, .. } => self
                    .resolve_alternatives(alternatives, chain)
                    .map(Segment::Static)
                    .unwrap_or_else(|| segment.clone()),
                Segment::Static(_) => segment.clone(),
            })
            .collect();

        let resolved = Expression::from_segments(expression.template().to_string(), segments);
        match resolved.to_static_value() {
            Some(value) => value,
            None => Scalar::Expression(resolved),
        }
    }

    fn resolve_alternatives(&self, alternatives: &[String], chain: &ResolutionChain) -> Option<Scalar> {
        if let Some(value) = alternatives.iter().find_map(|alt| self.lookup(alt, chain)) {
            return Some(value);
        }
        match alternatives {
            [_, .., default] => Some(Scalar::String(default.clone())),
            _ => None,
        }
    }

    /// Value of the leaf at `reference`, resolving it first when it is an expression.
    /// Missing paths, containers and unparsable references count as absent.
    fn lookup(&self, reference: &str, chain: &ResolutionChain) -> Option<Scalar> {
        let path = Path::parse(reference).ok().filter(|path| !path.is_root())?;
        match self.scope.get(&path)? {
            Node::Leaf(Scalar::Expression(expression)) => {
                if chain.would_cause_cycle(expression) {
                    log::debug!(
                        "Circular reference to '{}' via '{}' left unresolved",
                        path,
                        expression.template()
                    );
                    return None;
                }
                match self.resolve(expression, &chain.with(expression)) {
                    Scalar::Expression(_) => None,
                    value => Some(value),
                }
            }
            Node::Leaf(value) => Some(value.clone()),
            Node::Map(_) | Node::List(_) => None,
        }
    }
}

/// Resolve every expression leaf of `root`.
///
/// Both trees are parsed first. Lookups see `variables` masking `root`; only the
/// leaves of `root` are resolved and returned.
pub fn resolve_tree(root: &Node, variables: &Node, policy: UnresolvedPolicy) -> Result<Node> {
    log::trace!("Resolving expressions ({:?} on unresolved)", policy);
    let mut parse = |path: &Path, value: &Scalar| {
        parse_scalar(value).map_err(|e| e.with_path(path.to_string()))
    };
    let parsed = root.map_leaves(&Path::root(), &mut parse)?;
    let scope = variables
        .with_defaults(&parsed)
        .map_leaves(&Path::root(), &mut parse)?;

    let resolver = ExpressionResolver::new(&scope);
    parsed.map_leaves(&Path::root(), &mut |path: &Path, value: &Scalar| {
        match resolver.resolve_scalar(value) {
            Scalar::Expression(expression) => match policy {
                UnresolvedPolicy::Fail => Err(Error::unresolved_expression(
                    path.to_string(),
                    expression.template(),
                )),
                UnresolvedPolicy::Unwrap => {
                    log::debug!(
                        "Leaving '{}' unresolved at '{}'",
                        expression.template(),
                        path
                    );
                    Ok(Scalar::String(expression.template().to_string()))
                }
            },
            resolved => Ok(resolved),
        }
    })
}
