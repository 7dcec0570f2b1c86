#![allow(clippy::result_large_err)]

use super::schema::{
    check_unique_identifiers, PipelineDefinition, StageDefinition, StageElement, StepDefinition,
    StepElement,
};
use super::{
    CreateExecutionPlanResponse, NodeGroup, NodeParameters, PlanCreationContext, PlanCreator,
    PlanNode, EXECUTION_SECTION, NG_FORK, PIPELINE_SECTION, STAGES_STEP, STRATEGY,
};
use crate::core::error::AppError;
use crate::core::strategy::{StrategyConfig, IDENTIFIER_POSTFIX_PLACEHOLDER};
use crate::core::types::ErrorCategory;
use planweave_types::FacilitatorType;

/// Root `PIPELINE_SECTION` node with the stage chain as its only child.
pub struct PipelinePlanCreator;

impl PlanCreator<PipelineDefinition> for PipelinePlanCreator {
    fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext<'_>,
        pipeline: &PipelineDefinition,
    ) -> Result<CreateExecutionPlanResponse, AppError> {
        let stages = StagesPlanCreator.create_plan_for_field(&ctx.at("stages"), &pipeline.stages)?;
        let root = PlanNode {
            uuid: ctx.node_uuid(),
            identifier: pipeline.identifier.clone(),
            name: display_name(&pipeline.name, &pipeline.identifier),
            step_type: PIPELINE_SECTION.to_string(),
            group: NodeGroup::Pipeline,
            facilitator: FacilitatorType::Child,
            parameters: NodeParameters::Child {
                child_node_id: stages.starting_node_id,
            },
        };
        CreateExecutionPlanResponse::compose(vec![stages], root)
    }
}

/// Section chain over the pipeline's stage list.
pub struct StagesPlanCreator;

impl PlanCreator<[StageElement]> for StagesPlanCreator {
    fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext<'_>,
        elements: &[StageElement],
    ) -> Result<CreateExecutionPlanResponse, AppError> {
        if elements.is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("{} has no stages", ctx.path()),
            ));
        }
        check_unique_identifiers(
            &ctx.path(),
            elements
                .iter()
                .flat_map(|element| element.stages())
                .map(|stage| stage.identifier.as_str()),
        )?;

        let mut children = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let item_ctx = ctx.at(index);
            let child = match element {
                StageElement::Stage(stage) => create_stage(&item_ctx.at("stage"), stage)?,
                StageElement::Parallel(stages) => {
                    ParallelPlanCreator.create_plan_for_field(&item_ctx.at("parallel"), stages.as_slice())?
                }
            };
            children.push(child);
        }

        let root = PlanNode {
            uuid: ctx.node_uuid(),
            identifier: "stages".to_string(),
            name: "Stages".to_string(),
            step_type: STAGES_STEP.to_string(),
            group: NodeGroup::Stages,
            facilitator: FacilitatorType::ChildChain,
            parameters: NodeParameters::SectionChain {
                child_node_ids: children.iter().map(|c| c.starting_node_id).collect(),
            },
        };
        CreateExecutionPlanResponse::compose(children, root)
    }
}

/// One fork node over parallel branches; the fork id is the starting id.
pub struct ParallelPlanCreator;

impl ParallelPlanCreator {
    fn fork(
        ctx: &PlanCreationContext<'_>,
        group: NodeGroup,
        branches: Vec<CreateExecutionPlanResponse>,
    ) -> Result<CreateExecutionPlanResponse, AppError> {
        let root = PlanNode {
            uuid: ctx.node_uuid(),
            identifier: "parallel".to_string(),
            name: "parallel".to_string(),
            step_type: NG_FORK.to_string(),
            group,
            facilitator: FacilitatorType::Children,
            parameters: NodeParameters::Fork {
                parallel_node_ids: branches.iter().map(|b| b.starting_node_id).collect(),
            },
        };
        tracing::debug!(path = %ctx.path(), branches = branches.len(), "created fork node");
        CreateExecutionPlanResponse::compose(branches, root)
    }
}

impl PlanCreator<[StageDefinition]> for ParallelPlanCreator {
    fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext<'_>,
        stages: &[StageDefinition],
    ) -> Result<CreateExecutionPlanResponse, AppError> {
        let branches = stages
            .iter()
            .enumerate()
            .map(|(index, stage)| create_stage(&ctx.at(index).at("stage"), stage))
            .collect::<Result<Vec<_>, _>>()?;
        Self::fork(ctx, NodeGroup::Stages, branches)
    }
}

impl PlanCreator<[StepDefinition]> for ParallelPlanCreator {
    fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext<'_>,
        steps: &[StepDefinition],
    ) -> Result<CreateExecutionPlanResponse, AppError> {
        let branches = steps
            .iter()
            .enumerate()
            .map(|(index, step)| create_step(&ctx.at(index).at("step"), step))
            .collect::<Result<Vec<_>, _>>()?;
        Self::fork(ctx, NodeGroup::Execution, branches)
    }
}

/// A stage node whose single child is its execution section.
pub struct StagePlanCreator;

impl PlanCreator<StageDefinition> for StagePlanCreator {
    fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext<'_>,
        stage: &StageDefinition,
    ) -> Result<CreateExecutionPlanResponse, AppError> {
        let execution = StepsPlanCreator.create_plan_for_field(
            &ctx.at("spec").at("execution"),
            stage.spec.execution.steps.as_slice(),
        )?;
        let root = PlanNode {
            uuid: ctx.node_uuid(),
            identifier: stage.identifier.clone(),
            name: display_name(&stage.name, &stage.identifier),
            step_type: stage.stage_type.clone(),
            group: NodeGroup::Stage,
            facilitator: FacilitatorType::Child,
            parameters: NodeParameters::Child {
                child_node_id: execution.starting_node_id,
            },
        };
        CreateExecutionPlanResponse::compose(vec![execution], root)
    }
}

/// `EXECUTION_SECTION` chain over a stage's step list.
pub struct StepsPlanCreator;

impl PlanCreator<[StepElement]> for StepsPlanCreator {
    fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext<'_>,
        elements: &[StepElement],
    ) -> Result<CreateExecutionPlanResponse, AppError> {
        if elements.is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("{} has no steps", ctx.path()),
            ));
        }
        check_unique_identifiers(
            &ctx.path(),
            elements
                .iter()
                .flat_map(|element| element.steps())
                .map(|step| step.identifier.as_str()),
        )?;

        let steps_ctx = ctx.at("steps");
        let mut children = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let item_ctx = steps_ctx.at(index);
            let child = match element {
                StepElement::Step(step) => create_step(&item_ctx.at("step"), step)?,
                StepElement::Parallel(steps) => {
                    ParallelPlanCreator.create_plan_for_field(&item_ctx.at("parallel"), steps.as_slice())?
                }
            };
            children.push(child);
        }

        let root = PlanNode {
            uuid: ctx.node_uuid(),
            identifier: "execution".to_string(),
            name: "Execution".to_string(),
            step_type: EXECUTION_SECTION.to_string(),
            group: NodeGroup::Execution,
            facilitator: FacilitatorType::ChildChain,
            parameters: NodeParameters::SectionChain {
                child_node_ids: children.iter().map(|c| c.starting_node_id).collect(),
            },
        };
        CreateExecutionPlanResponse::compose(children, root)
    }
}

/// Leaf node for any step type; the facilitator comes from the registry.
pub struct GenericStepPlanCreator;

impl PlanCreator<StepDefinition> for GenericStepPlanCreator {
    fn create_plan_for_field(
        &self,
        ctx: &PlanCreationContext<'_>,
        step: &StepDefinition,
    ) -> Result<CreateExecutionPlanResponse, AppError> {
        Ok(CreateExecutionPlanResponse::single(PlanNode {
            uuid: ctx.node_uuid(),
            identifier: step.identifier.clone(),
            name: display_name(&step.name, &step.identifier),
            step_type: step.step_type.clone(),
            group: NodeGroup::Step,
            facilitator: ctx.facilitators.resolve(&step.step_type),
            parameters: NodeParameters::Step {
                spec: step.spec.clone(),
                timeout: step.timeout.clone(),
            },
        }))
    }
}

/// Wraps an already-built node with a `STRATEGY` node that fans it out at runtime.
pub struct StrategyPlanCreator;

impl StrategyPlanCreator {
    pub fn wrap(
        &self,
        ctx: &PlanCreationContext<'_>,
        strategy: &StrategyConfig,
        mut inner: CreateExecutionPlanResponse,
    ) -> Result<CreateExecutionPlanResponse, AppError> {
        strategy.validate_shape()?;
        let wrapped_id = inner.starting_node_id;
        let wrapped = inner.nodes.get_mut(&wrapped_id).ok_or_else(|| {
            AppError::new(
                ErrorCategory::InternalError,
                format!("strategy target {} missing from plan", wrapped_id),
            )
        })?;
        let identifier = wrapped.identifier.clone();
        let name = wrapped.name.clone();
        let group = wrapped.group;
        wrapped.identifier.push_str(IDENTIFIER_POSTFIX_PLACEHOLDER);

        let root = PlanNode {
            uuid: ctx.at("strategy").node_uuid(),
            identifier,
            name,
            step_type: STRATEGY.to_string(),
            group: match group {
                NodeGroup::Stage => NodeGroup::Stage,
                _ => NodeGroup::Strategy,
            },
            facilitator: FacilitatorType::Children,
            parameters: NodeParameters::Strategy {
                child_node_id: wrapped_id,
                strategy: strategy.clone(),
                max_concurrency_ceiling: ctx.config.strategy.max_concurrency_ceiling,
            },
        };
        tracing::debug!(
            path = %ctx.path(),
            strategy = %strategy.kind(),
            "wrapped node with strategy"
        );
        CreateExecutionPlanResponse::compose(vec![inner], root)
    }
}

fn create_stage(
    ctx: &PlanCreationContext<'_>,
    stage: &StageDefinition,
) -> Result<CreateExecutionPlanResponse, AppError> {
    let inner = StagePlanCreator.create_plan_for_field(ctx, stage)?;
    match &stage.strategy {
        Some(strategy) => StrategyPlanCreator.wrap(ctx, strategy, inner),
        None => Ok(inner),
    }
}

fn create_step(
    ctx: &PlanCreationContext<'_>,
    step: &StepDefinition,
) -> Result<CreateExecutionPlanResponse, AppError> {
    let inner = GenericStepPlanCreator.create_plan_for_field(ctx, step)?;
    match &step.strategy {
        Some(strategy) => StrategyPlanCreator.wrap(ctx, strategy, inner),
        None => Ok(inner),
    }
}

fn display_name(name: &str, identifier: &str) -> String {
    if name.trim().is_empty() {
        identifier.to_string()
    } else {
        name.to_string()
    }
}
