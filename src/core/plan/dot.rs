use super::{CreateExecutionPlanResponse, NodeParameters};
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Node weight carrying plan node display information.
struct PlanVertex {
    identifier: String,
    step_type: String,
    facilitator: String,
}

impl fmt::Display for PlanVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.identifier, self.step_type, self.facilitator
        )
    }
}

/// Edge weight describing how the parent starts the child.
struct PlanEdge {
    label: String,
}

impl fmt::Display for PlanEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

fn build_graph(
    plan: &CreateExecutionPlanResponse,
) -> (DiGraph<PlanVertex, PlanEdge>, HashMap<Uuid, NodeIndex>) {
    let mut graph = DiGraph::new();
    let mut node_map: HashMap<Uuid, NodeIndex> = HashMap::new();

    for node in plan.nodes.values() {
        let idx = graph.add_node(PlanVertex {
            identifier: node.identifier.clone(),
            step_type: node.step_type.clone(),
            facilitator: node.facilitator.to_string(),
        });
        node_map.insert(node.uuid, idx);
    }

    for node in plan.nodes.values() {
        let from = node_map[&node.uuid];
        for (position, child) in node.parameters.child_ids().into_iter().enumerate() {
            if let Some(&to) = node_map.get(&child) {
                let label = match &node.parameters {
                    NodeParameters::SectionChain { .. } => format!("{}", position + 1),
                    NodeParameters::Fork { .. } => "parallel".to_string(),
                    NodeParameters::Strategy { strategy, .. } => strategy.kind().to_string(),
                    _ => "child".to_string(),
                };
                graph.add_edge(from, to, PlanEdge { label });
            }
        }
    }

    (graph, node_map)
}

/// Render the assembled plan as a Graphviz DOT string using petgraph.
pub fn plan_to_dot(plan: &CreateExecutionPlanResponse) -> String {
    let (graph, _) = build_graph(plan);
    format!("{}", Dot::new(&graph))
}

/// Identifiers of nodes not reachable from the plan's starting node.
pub fn unreachable_nodes(plan: &CreateExecutionPlanResponse) -> Vec<String> {
    let (graph, node_map) = build_graph(plan);
    let start = match node_map.get(&plan.starting_node_id) {
        Some(&n) => n,
        None => return plan.nodes.values().map(|n| n.identifier.clone()).collect(),
    };

    let mut reachable = HashSet::new();
    let mut bfs = Bfs::new(&graph, start);
    while let Some(nx) = bfs.next(&graph) {
        reachable.insert(nx);
    }

    let mut unreachable: Vec<String> = plan
        .nodes
        .values()
        .filter(|node| !reachable.contains(&node_map[&node.uuid]))
        .map(|node| node.identifier.clone())
        .collect();
    unreachable.sort();
    unreachable
}
