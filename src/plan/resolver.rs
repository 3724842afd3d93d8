//! Composition graph resolver.
//!
//! Builds a [`ProjectionPlan`] from the catalog for one root entity,
//! expanding composition edges recursively up to a depth bound.
//!
//! Edge targets are allowed to be written inconsistently (namespaced
//! vs. short names), so resolution runs an ordered chain of lookup
//! strategies and takes the first hit:
//!
//! 1. the declared target string, matched exactly
//! 2. the target stripped to its short name, matched against short
//!    names across the catalog (unique match only)
//! 3. the root entity's namespace substituted onto the target's short
//!    name, when the root and the current entity share that namespace
//! 4. the target's short name re-qualified with the current entity's
//!    own namespace (siblings are commonly co-located)
//!
//! A miss on all four keeps the edge as an unresolved wildcard and
//! records a warning; a single bad edge never aborts the plan.

use tracing::warn;

use crate::catalog::{short_name, Catalog, EntityDescriptor};
use crate::error::TransferError;
use crate::plan::tree::{
    EdgeNode, EdgePlan, PlanNode, PlanWarning, ProjectionPlan, WildcardReason,
};

/// Default depth bound. Deep enough for real composition hierarchies,
/// small enough to break schema cycles quickly.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Inputs available to a single resolution strategy.
#[derive(Debug, Clone, Copy)]
struct EdgeContext<'a> {
    /// Declared target string of the edge.
    target: &'a str,
    /// Namespace of the entity owning the edge.
    current_namespace: Option<&'a str>,
    /// Namespace of the plan's root entity.
    root_namespace: Option<&'a str>,
}

/// One fallback strategy: look the target up one particular way.
type Strategy =
    for<'e, 'n, 'c> fn(&'e EdgeContext<'n>, &'c Catalog) -> Option<&'c EntityDescriptor>;

/// Exact match of the declared target.
fn exact_target<'c>(ctx: &EdgeContext<'_>, catalog: &'c Catalog) -> Option<&'c EntityDescriptor> {
    catalog.descriptor(ctx.target)
}

/// Strip any namespace prefix and retry against short names across the
/// catalog; only an unambiguous match counts.
fn stripped_target<'c>(
    ctx: &EdgeContext<'_>,
    catalog: &'c Catalog,
) -> Option<&'c EntityDescriptor> {
    catalog.unique_by_short_name(short_name(ctx.target))
}

/// Substitute the namespace shared by root and current entity onto the
/// target's short name.
fn root_namespace_target<'c>(
    ctx: &EdgeContext<'_>,
    catalog: &'c Catalog,
) -> Option<&'c EntityDescriptor> {
    let root_ns = ctx.root_namespace?;
    if ctx.current_namespace != Some(root_ns) {
        return None;
    }
    catalog.descriptor(&format!("{}.{}", root_ns, short_name(ctx.target)))
}

/// Re-qualify the target's short name with the current entity's own
/// namespace.
fn current_namespace_target<'c>(
    ctx: &EdgeContext<'_>,
    catalog: &'c Catalog,
) -> Option<&'c EntityDescriptor> {
    let ns = ctx.current_namespace?;
    catalog.descriptor(&format!("{}.{}", ns, short_name(ctx.target)))
}

/// Fallback chain, tried in order; the first hit wins.
const STRATEGIES: &[Strategy] = &[
    exact_target,
    stripped_target,
    root_namespace_target,
    current_namespace_target,
];

/// Builds projection plans against a catalog. Stateless apart from the
/// catalog reference: resolving the same inputs twice yields
/// structurally identical plans.
pub struct Resolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Resolver { catalog }
    }

    /// Resolve `entity_name` into a plan bounded at `max_depth`.
    ///
    /// Fails with [`TransferError::UnknownEntity`] only when the root
    /// itself cannot be found; unresolved edge targets degrade to
    /// wildcard terminals.
    pub fn resolve(
        &self,
        entity_name: &str,
        max_depth: usize,
    ) -> Result<ProjectionPlan, TransferError> {
        let root = self
            .catalog
            .resolve_root(entity_name)
            .ok_or_else(|| TransferError::UnknownEntity {
                name: entity_name.to_string(),
            })?;

        let root_namespace = root.namespace().map(str::to_string);
        let mut warnings = Vec::new();
        let node = self.build_node(root, 0, max_depth, root_namespace.as_deref(), &mut warnings);

        Ok(ProjectionPlan {
            root: node,
            max_depth,
            warnings,
        })
    }

    /// Resolve with the default depth bound.
    pub fn resolve_default(&self, entity_name: &str) -> Result<ProjectionPlan, TransferError> {
        self.resolve(entity_name, DEFAULT_MAX_DEPTH)
    }

    fn build_node(
        &self,
        descriptor: &EntityDescriptor,
        depth: usize,
        max_depth: usize,
        root_namespace: Option<&str>,
        warnings: &mut Vec<PlanWarning>,
    ) -> PlanNode {
        let mut edges = Vec::with_capacity(descriptor.compositions.len());

        for edge in &descriptor.compositions {
            let node = if depth + 1 > max_depth {
                EdgeNode::Wildcard(WildcardReason::DepthLimit)
            } else {
                match self.resolve_edge_target(descriptor, &edge.target, root_namespace) {
                    Some(child) => EdgeNode::Expanded(self.build_node(
                        child,
                        depth + 1,
                        max_depth,
                        root_namespace,
                        warnings,
                    )),
                    None => {
                        let warning = PlanWarning {
                            entity: descriptor.name.clone(),
                            edge: edge.name.clone(),
                            target: edge.target.clone(),
                        };
                        warn!(
                            entity = %warning.entity,
                            edge = %warning.edge,
                            target = %warning.target,
                            "composition target unresolved, keeping edge as wildcard"
                        );
                        warnings.push(warning);
                        EdgeNode::Wildcard(WildcardReason::Unresolved)
                    }
                }
            };

            edges.push(EdgePlan {
                name: edge.name.clone(),
                node,
            });
        }

        PlanNode {
            entity: descriptor.name.clone(),
            depth,
            edges,
        }
    }

    fn resolve_edge_target(
        &self,
        current: &EntityDescriptor,
        target: &str,
        root_namespace: Option<&str>,
    ) -> Option<&'a EntityDescriptor> {
        let ctx = EdgeContext {
            target,
            current_namespace: current.namespace(),
            root_namespace,
        };

        STRATEGIES
            .iter()
            .find_map(|strategy| strategy(&ctx, self.catalog))
    }
}
