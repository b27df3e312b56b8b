//! Decisions emitted by workflow handlers
//!
//! A decision is discriminated by `decisionType` and carries exactly one
//! `<decisionTypeCamel>DecisionAttributes` object. The constructors below are
//! the only way the crate builds decisions, which keeps that invariant.

use serde::{Deserialize, Serialize};

use super::common::{timeout_seconds, ActivityType, TaskList};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionType {
    ScheduleActivityTask,
    RequestCancelActivityTask,
    CompleteWorkflowExecution,
    FailWorkflowExecution,
    CancelWorkflowExecution,
    RecordMarker,
    StartTimer,
    CancelTimer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleActivityTaskDecisionAttributes {
    pub activity_id: String,
    pub activity_type: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timeout_seconds"
    )]
    pub heartbeat_timeout: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timeout_seconds"
    )]
    pub schedule_to_close_timeout: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timeout_seconds"
    )]
    pub schedule_to_start_timeout: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timeout_seconds"
    )]
    pub start_to_close_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_list: Option<TaskList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCancelActivityTaskDecisionAttributes {
    pub activity_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteWorkflowExecutionDecisionAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailWorkflowExecutionDecisionAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelWorkflowExecutionDecisionAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMarkerDecisionAttributes {
    pub marker_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimerDecisionAttributes {
    pub timer_id: String,
    #[serde(with = "timeout_seconds")]
    pub start_to_fire_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTimerDecisionAttributes {
    pub timer_id: String,
}

/// One entry of a decision batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub decision_type: DecisionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_activity_task_decision_attributes: Option<ScheduleActivityTaskDecisionAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_cancel_activity_task_decision_attributes:
        Option<RequestCancelActivityTaskDecisionAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete_workflow_execution_decision_attributes:
        Option<CompleteWorkflowExecutionDecisionAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_workflow_execution_decision_attributes: Option<FailWorkflowExecutionDecisionAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_workflow_execution_decision_attributes:
        Option<CancelWorkflowExecutionDecisionAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_marker_decision_attributes: Option<RecordMarkerDecisionAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timer_decision_attributes: Option<StartTimerDecisionAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_timer_decision_attributes: Option<CancelTimerDecisionAttributes>,
}

impl Decision {
    fn empty(decision_type: DecisionType) -> Self {
        Self {
            decision_type,
            schedule_activity_task_decision_attributes: None,
            request_cancel_activity_task_decision_attributes: None,
            complete_workflow_execution_decision_attributes: None,
            fail_workflow_execution_decision_attributes: None,
            cancel_workflow_execution_decision_attributes: None,
            record_marker_decision_attributes: None,
            start_timer_decision_attributes: None,
            cancel_timer_decision_attributes: None,
        }
    }

    pub fn schedule_activity_task(attributes: ScheduleActivityTaskDecisionAttributes) -> Self {
        let mut decision = Self::empty(DecisionType::ScheduleActivityTask);
        decision.schedule_activity_task_decision_attributes = Some(attributes);
        decision
    }

    pub fn request_cancel_activity_task(activity_id: impl Into<String>) -> Self {
        let mut decision = Self::empty(DecisionType::RequestCancelActivityTask);
        decision.request_cancel_activity_task_decision_attributes =
            Some(RequestCancelActivityTaskDecisionAttributes {
                activity_id: activity_id.into(),
            });
        decision
    }

    pub fn complete_workflow_execution(result: Option<String>) -> Self {
        let mut decision = Self::empty(DecisionType::CompleteWorkflowExecution);
        decision.complete_workflow_execution_decision_attributes =
            Some(CompleteWorkflowExecutionDecisionAttributes { result });
        decision
    }

    pub fn fail_workflow_execution(reason: Option<String>, details: Option<String>) -> Self {
        let mut decision = Self::empty(DecisionType::FailWorkflowExecution);
        decision.fail_workflow_execution_decision_attributes =
            Some(FailWorkflowExecutionDecisionAttributes { reason, details });
        decision
    }

    pub fn cancel_workflow_execution(details: Option<String>) -> Self {
        let mut decision = Self::empty(DecisionType::CancelWorkflowExecution);
        decision.cancel_workflow_execution_decision_attributes =
            Some(CancelWorkflowExecutionDecisionAttributes { details });
        decision
    }

    pub fn record_marker(marker_name: impl Into<String>, details: Option<String>) -> Self {
        let mut decision = Self::empty(DecisionType::RecordMarker);
        decision.record_marker_decision_attributes = Some(RecordMarkerDecisionAttributes {
            marker_name: marker_name.into(),
            details,
        });
        decision
    }

    pub fn start_timer(
        timer_id: impl Into<String>,
        start_to_fire_seconds: u64,
        control: Option<String>,
    ) -> Self {
        let mut decision = Self::empty(DecisionType::StartTimer);
        decision.start_timer_decision_attributes = Some(StartTimerDecisionAttributes {
            timer_id: timer_id.into(),
            start_to_fire_timeout: Some(start_to_fire_seconds),
            control,
        });
        decision
    }

    pub fn cancel_timer(timer_id: impl Into<String>) -> Self {
        let mut decision = Self::empty(DecisionType::CancelTimer);
        decision.cancel_timer_decision_attributes = Some(CancelTimerDecisionAttributes {
            timer_id: timer_id.into(),
        });
        decision
    }
}
