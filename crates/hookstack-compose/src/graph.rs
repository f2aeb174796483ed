//! Dependency graph management using `petgraph`, and the frozen
//! deployment graph handed to provisioning engines.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use hookstack_common::error::{HookstackError, Result};
use hookstack_common::types::LogicalId;
use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::compute::ComputeUnit;
use crate::grant::{PermissionStatement, PolicyFinding};
use crate::invoke::InvocationEndpoint;
use crate::secret::SecretReference;

/// A resource node in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ResourceNode {
    /// An externally managed secret, keyed by identifier.
    Secret(String),
    /// A compute unit, keyed by logical name.
    Unit(LogicalId),
    /// An invocation endpoint, keyed by logical name.
    Endpoint(LogicalId),
}

impl fmt::Display for ResourceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret(id) => write!(f, "secret {id}"),
            Self::Unit(id) => write!(f, "unit {id}"),
            Self::Endpoint(id) => write!(f, "endpoint {id}"),
        }
    }
}

/// A dependency graph of resources.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Internal petgraph representation.
    graph: petgraph::Graph<ResourceNode, ()>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
        }
    }

    /// Adds a resource node to the graph.
    pub fn add_resource(&mut self, node: ResourceNode) -> NodeIndex {
        self.graph.add_node(node)
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.add_edge(dependency, dependent, ());
    }

    /// Returns a topological ordering of resources for provisioning.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn resolve_order(&self) -> Result<Vec<ResourceNode>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(HookstackError::Config {
                message: format!(
                    "cyclic dependency detected at {}",
                    self.graph
                        .node_weight(cycle.node_id())
                        .map_or_else(|| "<unknown>".to_string(), ToString::to_string)
                ),
            }),
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed edge of the deployment graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// The resource that needs the other one.
    pub dependent: ResourceNode,
    /// The resource it needs.
    pub dependency: ResourceNode,
}

/// The frozen result of synthesis.
///
/// Holds every declared resource, their dependency edges, the order they
/// must be provisioned in, and the policy findings recorded while wiring.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentGraph {
    stack: String,
    synthesized_at: DateTime<Utc>,
    secrets: Vec<SecretReference>,
    units: Vec<ComputeUnit>,
    endpoints: Vec<InvocationEndpoint>,
    edges: Vec<Edge>,
    order: Vec<ResourceNode>,
    findings: Vec<PolicyFinding>,
}

/// Edges and provisioning order computed from borrowed declarations.
#[derive(Debug)]
pub(crate) struct Layout {
    edges: Vec<Edge>,
    order: Vec<ResourceNode>,
}

impl Layout {
    /// Builds the dependency edges and resolves their order.
    ///
    /// # Errors
    ///
    /// Returns [`HookstackError::NotFound`] if a unit needs an undeclared
    /// secret or an endpoint targets an undeclared unit, or an error if the
    /// edges form a cycle.
    pub(crate) fn plan(
        secrets: &[SecretReference],
        units: &[ComputeUnit],
        endpoints: &[InvocationEndpoint],
    ) -> Result<Self> {
        let mut graph = DependencyGraph::new();
        let mut nodes: HashMap<ResourceNode, NodeIndex> = HashMap::new();
        for secret in secrets {
            let resource = ResourceNode::Secret(secret.identifier().to_string());
            let _ = nodes
                .entry(resource.clone())
                .or_insert_with(|| graph.add_resource(resource));
        }

        let mut edges = Vec::new();
        for unit in units {
            let dependent = ResourceNode::Unit(unit.name.clone());
            let unit_idx = graph.add_resource(dependent.clone());
            let _ = nodes.insert(dependent.clone(), unit_idx);
            for secret in &unit.secrets {
                let dependency = ResourceNode::Secret(secret.identifier().to_string());
                let secret_idx = nodes.get(&dependency).copied().ok_or_else(|| {
                    HookstackError::NotFound {
                        kind: "secret",
                        id: secret.identifier().to_string(),
                    }
                })?;
                graph.add_dependency(unit_idx, secret_idx);
                edges.push(Edge {
                    dependent: dependent.clone(),
                    dependency,
                });
            }
        }
        for endpoint in endpoints {
            let dependent = ResourceNode::Endpoint(endpoint.id.clone());
            let dependency = ResourceNode::Unit(endpoint.unit.clone());
            let unit_idx = nodes.get(&dependency).copied().ok_or_else(|| {
                HookstackError::NotFound {
                    kind: "compute unit",
                    id: endpoint.unit.to_string(),
                }
            })?;
            let endpoint_idx = graph.add_resource(dependent.clone());
            graph.add_dependency(endpoint_idx, unit_idx);
            edges.push(Edge {
                dependent,
                dependency,
            });
        }

        let order = graph.resolve_order()?;
        Ok(Self { edges, order })
    }
}

impl DeploymentGraph {
    /// Freezes the declarations together with a layout planned from them.
    pub(crate) fn assemble(
        stack: String,
        secrets: Vec<SecretReference>,
        units: Vec<ComputeUnit>,
        endpoints: Vec<InvocationEndpoint>,
        layout: Layout,
        findings: Vec<PolicyFinding>,
    ) -> Self {
        Self {
            stack,
            synthesized_at: Utc::now(),
            secrets,
            units,
            endpoints,
            edges: layout.edges,
            order: layout.order,
            findings,
        }
    }

    /// Returns the stack name.
    #[must_use]
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Returns when the graph was frozen.
    #[must_use]
    pub const fn synthesized_at(&self) -> DateTime<Utc> {
        self.synthesized_at
    }

    /// Returns the referenced secrets in resolution order.
    #[must_use]
    pub fn secrets(&self) -> &[SecretReference] {
        &self.secrets
    }

    /// Returns the compute units in declaration order.
    #[must_use]
    pub fn units(&self) -> &[ComputeUnit] {
        &self.units
    }

    /// Looks up a unit by logical name.
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&ComputeUnit> {
        self.units.iter().find(|u| u.name.as_str() == name)
    }

    /// Returns the invocation endpoints in binding order.
    #[must_use]
    pub fn endpoints(&self) -> &[InvocationEndpoint] {
        &self.endpoints
    }

    /// Returns the endpoint bound to `unit`, if any.
    #[must_use]
    pub fn endpoint_for(&self, unit: &str) -> Option<&InvocationEndpoint> {
        self.endpoints.iter().find(|e| e.unit.as_str() == unit)
    }

    /// Returns every dependency edge.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns resources in provisioning order, dependencies first.
    #[must_use]
    pub fn order(&self) -> &[ResourceNode] {
        &self.order
    }

    /// Returns the recorded broadenings beyond least privilege.
    #[must_use]
    pub fn findings(&self) -> &[PolicyFinding] {
        &self.findings
    }

    /// Iterates over every statement paired with its unit.
    pub fn statements(&self) -> impl Iterator<Item = (&LogicalId, &PermissionStatement)> {
        self.units
            .iter()
            .flat_map(|u| u.policy.iter().map(move |s| (&u.name, s)))
    }

    /// Renders the graph as the synthesized JSON template.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_template_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
