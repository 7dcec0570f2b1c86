//! Plan-node graph assembly from pipeline documents.

#![allow(clippy::result_large_err)]

pub mod creators;
pub mod dot;
pub mod facilitator;
pub mod lint;
pub mod schema;

pub use creators::{
    GenericStepPlanCreator, ParallelPlanCreator, PipelinePlanCreator, StagePlanCreator,
    StagesPlanCreator, StepsPlanCreator, StrategyPlanCreator,
};
pub use dot::{plan_to_dot, unreachable_nodes};
pub use facilitator::FacilitatorRegistry;
pub use lint::{LintRegistry, LintResult, LintSeverity, PipelineLintRule};
pub use schema::{
    ExecutionSection, PipelineDefinition, PipelineDocument, StageDefinition, StageElement,
    StageSpec, StepDefinition, StepElement,
};

use crate::core::config::PlanweaveConfig;
use crate::core::error::AppError;
use crate::core::strategy::StrategyConfig;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use planweave_types::FacilitatorType;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub const PIPELINE_SECTION: &str = "PIPELINE_SECTION";
pub const STAGES_STEP: &str = "STAGES_STEP";
pub const NG_FORK: &str = "NG_FORK";
pub const EXECUTION_SECTION: &str = "EXECUTION_SECTION";
pub const STRATEGY: &str = "STRATEGY";

/// Outcome group a node reports under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeGroup {
    Pipeline,
    Stages,
    Stage,
    Execution,
    Step,
    Strategy,
}

/// Node-kind specific payload. Children are referenced by uuid only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeParameters {
    #[serde(rename_all = "camelCase")]
    Step {
        spec: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Fork { parallel_node_ids: Vec<Uuid> },
    #[serde(rename_all = "camelCase")]
    SectionChain { child_node_ids: Vec<Uuid> },
    #[serde(rename_all = "camelCase")]
    Child { child_node_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Strategy {
        child_node_id: Uuid,
        strategy: StrategyConfig,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_concurrency_ceiling: Option<usize>,
    },
}

impl NodeParameters {
    /// Child node ids in the order the runtime starts them.
    pub fn child_ids(&self) -> Vec<Uuid> {
        match self {
            NodeParameters::Step { .. } => Vec::new(),
            NodeParameters::Fork { parallel_node_ids } => parallel_node_ids.clone(),
            NodeParameters::SectionChain { child_node_ids } => child_node_ids.clone(),
            NodeParameters::Child { child_node_id }
            | NodeParameters::Strategy { child_node_id, .. } => vec![*child_node_id],
        }
    }
}

/// One node of the execution plan handed to the runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    pub uuid: Uuid,
    pub identifier: String,
    pub name: String,
    pub step_type: String,
    pub group: NodeGroup,
    pub facilitator: FacilitatorType,
    pub parameters: NodeParameters,
}

/// Nodes produced by one creator call plus the id the caller should start from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExecutionPlanResponse {
    pub nodes: IndexMap<Uuid, PlanNode>,
    pub starting_node_id: Uuid,
}

impl CreateExecutionPlanResponse {
    pub fn single(node: PlanNode) -> Self {
        let starting_node_id = node.uuid;
        let mut nodes = IndexMap::new();
        nodes.insert(node.uuid, node);
        Self {
            nodes,
            starting_node_id,
        }
    }

    /// Start a response whose root is `root`, after the nodes of every `children` response.
    pub fn compose(
        children: Vec<CreateExecutionPlanResponse>,
        root: PlanNode,
    ) -> Result<Self, AppError> {
        let mut nodes = IndexMap::new();
        for child in children {
            for (uuid, node) in child.nodes {
                if nodes.insert(uuid, node).is_some() {
                    return Err(duplicate_uuid(uuid));
                }
            }
        }
        let starting_node_id = root.uuid;
        if nodes.insert(root.uuid, root).is_some() {
            return Err(duplicate_uuid(starting_node_id));
        }
        Ok(Self {
            nodes,
            starting_node_id,
        })
    }

    pub fn starting_node(&self) -> Option<&PlanNode> {
        self.nodes.get(&self.starting_node_id)
    }

    pub fn node(&self, uuid: &Uuid) -> Option<&PlanNode> {
        self.nodes.get(uuid)
    }

    pub fn find_by_identifier(&self, identifier: &str) -> Option<&PlanNode> {
        self.nodes.values().find(|node| node.identifier == identifier)
    }
}

fn duplicate_uuid(uuid: Uuid) -> AppError {
    AppError::new(
        ErrorCategory::InternalError,
        format!("plan node {} was produced twice", uuid),
    )
    .with_code("PLW-PLAN-001")
}

/// Shared state threaded through creators: configuration and the node's YAML path.
#[derive(Clone)]
pub struct PlanCreationContext<'a> {
    pub config: &'a PlanweaveConfig,
    pub facilitators: &'a FacilitatorRegistry,
    path: Vec<String>,
}

impl<'a> PlanCreationContext<'a> {
    pub fn new(config: &'a PlanweaveConfig, facilitators: &'a FacilitatorRegistry) -> Self {
        Self {
            config,
            facilitators,
            path: Vec::new(),
        }
    }

    /// Context for a nested field.
    pub fn at(&self, segment: impl ToString) -> Self {
        let mut next = self.clone();
        next.path.push(segment.to_string());
        next
    }

    pub fn path(&self) -> String {
        self.path.join("/")
    }

    /// Stable id for the node at this path; the same document always yields the same ids.
    pub fn node_uuid(&self) -> Uuid {
        Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("planweave:/{}", self.path()).as_bytes(),
        )
    }
}

/// Builds plan nodes for one kind of pipeline field.
pub trait PlanCreator<T: ?Sized> {
    fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext<'_>,
        field: &T,
    ) -> Result<CreateExecutionPlanResponse, AppError>;
}

/// Assemble the full plan for a validated pipeline document.
pub fn create_execution_plan(
    document: &PipelineDocument,
    config: &PlanweaveConfig,
) -> Result<CreateExecutionPlanResponse, AppError> {
    document.validate()?;
    let facilitators = FacilitatorRegistry::from_config(&config.plan)?;
    let ctx = PlanCreationContext::new(config, &facilitators).at("pipeline");
    let response = PipelinePlanCreator.create_plan_for_field(&ctx, &document.pipeline)?;
    tracing::info!(
        pipeline = %document.pipeline.identifier,
        nodes = response.nodes.len(),
        starting_node_id = %response.starting_node_id,
        "assembled execution plan"
    );
    Ok(response)
}
