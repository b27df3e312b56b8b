//! History events delivered with decision tasks
//!
//! A history is the ordered, append-only log the service keeps for one
//! workflow execution. Each event carries a top-level `eventType` and at most
//! one `<eventTypeCamel>EventAttributes` object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{timeout_seconds, ActivityType, TaskList, WorkflowType};

/// Event kinds the helper can encounter
///
/// Kinds outside this list deserialize to [`EventType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    WorkflowExecutionStarted,
    WorkflowExecutionCancelRequested,
    WorkflowExecutionCompleted,
    CompleteWorkflowExecutionFailed,
    WorkflowExecutionFailed,
    FailWorkflowExecutionFailed,
    WorkflowExecutionTimedOut,
    WorkflowExecutionCanceled,
    CancelWorkflowExecutionFailed,
    WorkflowExecutionContinuedAsNew,
    WorkflowExecutionTerminated,
    WorkflowExecutionSignaled,
    DecisionTaskScheduled,
    DecisionTaskStarted,
    DecisionTaskCompleted,
    DecisionTaskTimedOut,
    ActivityTaskScheduled,
    ScheduleActivityTaskFailed,
    ActivityTaskStarted,
    ActivityTaskCompleted,
    ActivityTaskFailed,
    ActivityTaskTimedOut,
    ActivityTaskCanceled,
    ActivityTaskCancelRequested,
    RequestCancelActivityTaskFailed,
    MarkerRecorded,
    RecordMarkerFailed,
    TimerStarted,
    StartTimerFailed,
    TimerFired,
    TimerCanceled,
    CancelTimerFailed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecutionStartedEventAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<WorkflowType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_list: Option<TaskList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_policy: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timeout_seconds"
    )]
    pub execution_start_to_close_timeout: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timeout_seconds"
    )]
    pub task_start_to_close_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_list: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecutionCancelRequestedEventAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecutionSignaledEventAttributes {
    pub signal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTaskScheduledEventAttributes {
    pub activity_id: String,
    pub activity_type: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<String>,
    #[serde(default)]
    pub decision_task_completed_event_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_list: Option<TaskList>,
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
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTaskCompletedEventAttributes {
    pub scheduled_event_id: i64,
    #[serde(default)]
    pub started_event_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTaskFailedEventAttributes {
    pub scheduled_event_id: i64,
    #[serde(default)]
    pub started_event_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTaskCanceledEventAttributes {
    pub scheduled_event_id: i64,
    #[serde(default)]
    pub started_event_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_cancel_requested_event_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTaskTimedOutEventAttributes {
    pub scheduled_event_id: i64,
    #[serde(default)]
    pub started_event_id: i64,
    #[serde(default)]
    pub timeout_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleActivityTaskFailedEventAttributes {
    pub activity_id: String,
    pub activity_type: ActivityType,
    pub cause: String,
    #[serde(default)]
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTaskCancelRequestedEventAttributes {
    pub activity_id: String,
    #[serde(default)]
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStartedEventAttributes {
    pub timer_id: String,
    #[serde(default)]
    pub start_to_fire_timeout: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<String>,
    #[serde(default)]
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerFiredEventAttributes {
    pub timer_id: String,
    #[serde(default)]
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerCanceledEventAttributes {
    pub timer_id: String,
    #[serde(default)]
    pub started_event_id: i64,
    #[serde(default)]
    pub decision_task_completed_event_id: i64,
}

/// One entry of a workflow execution history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub event_id: i64,

    /// Fractional seconds since the epoch
    #[serde(default)]
    pub event_timestamp: f64,

    pub event_type: EventType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_execution_started_event_attributes:
        Option<WorkflowExecutionStartedEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_execution_cancel_requested_event_attributes:
        Option<WorkflowExecutionCancelRequestedEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_execution_signaled_event_attributes:
        Option<WorkflowExecutionSignaledEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_task_scheduled_event_attributes: Option<ActivityTaskScheduledEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_task_completed_event_attributes: Option<ActivityTaskCompletedEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_task_failed_event_attributes: Option<ActivityTaskFailedEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_task_canceled_event_attributes: Option<ActivityTaskCanceledEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_task_timed_out_event_attributes: Option<ActivityTaskTimedOutEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_activity_task_failed_event_attributes:
        Option<ScheduleActivityTaskFailedEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_task_cancel_requested_event_attributes:
        Option<ActivityTaskCancelRequestedEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_started_event_attributes: Option<TimerStartedEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_fired_event_attributes: Option<TimerFiredEventAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_canceled_event_attributes: Option<TimerCanceledEventAttributes>,
}

impl HistoryEvent {
    /// Event with no attribute payload
    pub fn new(event_id: i64, event_type: EventType) -> Self {
        Self {
            event_id,
            event_timestamp: 0.0,
            event_type,
            workflow_execution_started_event_attributes: None,
            workflow_execution_cancel_requested_event_attributes: None,
            workflow_execution_signaled_event_attributes: None,
            activity_task_scheduled_event_attributes: None,
            activity_task_completed_event_attributes: None,
            activity_task_failed_event_attributes: None,
            activity_task_canceled_event_attributes: None,
            activity_task_timed_out_event_attributes: None,
            schedule_activity_task_failed_event_attributes: None,
            activity_task_cancel_requested_event_attributes: None,
            timer_started_event_attributes: None,
            timer_fired_event_attributes: None,
            timer_canceled_event_attributes: None,
        }
    }

    pub fn workflow_started(event_id: i64, input: Option<String>) -> Self {
        let mut event = Self::new(event_id, EventType::WorkflowExecutionStarted);
        event.workflow_execution_started_event_attributes =
            Some(WorkflowExecutionStartedEventAttributes {
                input,
                ..Default::default()
            });
        event
    }

    pub fn activity_scheduled(
        event_id: i64,
        activity_id: impl Into<String>,
        activity_type: ActivityType,
        input: Option<String>,
    ) -> Self {
        let mut event = Self::new(event_id, EventType::ActivityTaskScheduled);
        event.activity_task_scheduled_event_attributes = Some(ActivityTaskScheduledEventAttributes {
            activity_id: activity_id.into(),
            activity_type,
            input,
            control: None,
            decision_task_completed_event_id: 0,
            task_list: None,
            heartbeat_timeout: None,
            schedule_to_close_timeout: None,
            schedule_to_start_timeout: None,
            start_to_close_timeout: None,
        });
        event
    }

    pub fn activity_completed(event_id: i64, scheduled_event_id: i64, result: &str) -> Self {
        let mut event = Self::new(event_id, EventType::ActivityTaskCompleted);
        event.activity_task_completed_event_attributes = Some(ActivityTaskCompletedEventAttributes {
            scheduled_event_id,
            started_event_id: 0,
            result: Some(result.to_string()),
        });
        event
    }

    pub fn activity_failed(
        event_id: i64,
        scheduled_event_id: i64,
        reason: &str,
        details: &str,
    ) -> Self {
        let mut event = Self::new(event_id, EventType::ActivityTaskFailed);
        event.activity_task_failed_event_attributes = Some(ActivityTaskFailedEventAttributes {
            scheduled_event_id,
            started_event_id: 0,
            reason: Some(reason.to_string()),
            details: Some(details.to_string()),
        });
        event
    }

    pub fn activity_canceled(event_id: i64, scheduled_event_id: i64, details: &str) -> Self {
        let mut event = Self::new(event_id, EventType::ActivityTaskCanceled);
        event.activity_task_canceled_event_attributes = Some(ActivityTaskCanceledEventAttributes {
            scheduled_event_id,
            details: Some(details.to_string()),
            ..Default::default()
        });
        event
    }

    pub fn activity_timed_out(
        event_id: i64,
        scheduled_event_id: i64,
        timeout_type: &str,
        details: &str,
    ) -> Self {
        let mut event = Self::new(event_id, EventType::ActivityTaskTimedOut);
        event.activity_task_timed_out_event_attributes = Some(ActivityTaskTimedOutEventAttributes {
            scheduled_event_id,
            started_event_id: 0,
            timeout_type: timeout_type.to_string(),
            details: Some(details.to_string()),
        });
        event
    }

    pub fn schedule_activity_failed(
        event_id: i64,
        activity_id: impl Into<String>,
        activity_type: ActivityType,
        cause: &str,
    ) -> Self {
        let mut event = Self::new(event_id, EventType::ScheduleActivityTaskFailed);
        event.schedule_activity_task_failed_event_attributes =
            Some(ScheduleActivityTaskFailedEventAttributes {
                activity_id: activity_id.into(),
                activity_type,
                cause: cause.to_string(),
                decision_task_completed_event_id: 0,
            });
        event
    }

    pub fn activity_cancel_requested(event_id: i64, activity_id: impl Into<String>) -> Self {
        let mut event = Self::new(event_id, EventType::ActivityTaskCancelRequested);
        event.activity_task_cancel_requested_event_attributes =
            Some(ActivityTaskCancelRequestedEventAttributes {
                activity_id: activity_id.into(),
                decision_task_completed_event_id: 0,
            });
        event
    }

    pub fn workflow_cancel_requested(event_id: i64) -> Self {
        let mut event = Self::new(event_id, EventType::WorkflowExecutionCancelRequested);
        event.workflow_execution_cancel_requested_event_attributes =
            Some(WorkflowExecutionCancelRequestedEventAttributes::default());
        event
    }

    pub fn signaled(event_id: i64, signal_name: impl Into<String>, input: Option<String>) -> Self {
        let mut event = Self::new(event_id, EventType::WorkflowExecutionSignaled);
        event.workflow_execution_signaled_event_attributes =
            Some(WorkflowExecutionSignaledEventAttributes {
                signal_name: signal_name.into(),
                input,
            });
        event
    }

    pub fn timer_started(event_id: i64, timer_id: impl Into<String>, seconds: u64) -> Self {
        let mut event = Self::new(event_id, EventType::TimerStarted);
        event.timer_started_event_attributes = Some(TimerStartedEventAttributes {
            timer_id: timer_id.into(),
            start_to_fire_timeout: seconds.to_string(),
            ..Default::default()
        });
        event
    }

    pub fn timer_fired(event_id: i64, timer_id: impl Into<String>, started_event_id: i64) -> Self {
        let mut event = Self::new(event_id, EventType::TimerFired);
        event.timer_fired_event_attributes = Some(TimerFiredEventAttributes {
            timer_id: timer_id.into(),
            started_event_id,
        });
        event
    }

    pub fn timer_canceled(event_id: i64, timer_id: impl Into<String>, started_event_id: i64) -> Self {
        let mut event = Self::new(event_id, EventType::TimerCanceled);
        event.timer_canceled_event_attributes = Some(TimerCanceledEventAttributes {
            timer_id: timer_id.into(),
            started_event_id,
            decision_task_completed_event_id: 0,
        });
        event
    }

    /// The `scheduledEventId` of a terminal activity event
    pub fn scheduled_event_id(&self) -> Option<i64> {
        match self.event_type {
            EventType::ActivityTaskCompleted => self
                .activity_task_completed_event_attributes
                .as_ref()
                .map(|a| a.scheduled_event_id),
            EventType::ActivityTaskFailed => self
                .activity_task_failed_event_attributes
                .as_ref()
                .map(|a| a.scheduled_event_id),
            EventType::ActivityTaskCanceled => self
                .activity_task_canceled_event_attributes
                .as_ref()
                .map(|a| a.scheduled_event_id),
            EventType::ActivityTaskTimedOut => self
                .activity_task_timed_out_event_attributes
                .as_ref()
                .map(|a| a.scheduled_event_id),
            _ => None,
        }
    }

    /// The event timestamp as a UTC date-time
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let secs = self.event_timestamp.floor();
        let nanos = ((self.event_timestamp - secs) * 1e9).round() as u32;
        DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_scheduled_event() {
        let event: HistoryEvent = serde_json::from_value(json!({
            "eventId": 5,
            "eventTimestamp": 1326592619.474,
            "eventType": "ActivityTaskScheduled",
            "activityTaskScheduledEventAttributes": {
                "activityId": "activityId-0",
                "activityType": {"name": "getnum", "version": "1"},
                "input": "hello1",
                "decisionTaskCompletedEventId": 4,
                "startToCloseTimeout": "600",
                "heartbeatTimeout": "NONE"
            }
        }))
        .unwrap();

        assert_eq!(event.event_type, EventType::ActivityTaskScheduled);
        let attrs = event.activity_task_scheduled_event_attributes.unwrap();
        assert_eq!(attrs.activity_id, "activityId-0");
        assert_eq!(attrs.activity_type, ActivityType::new("getnum", "1"));
        assert_eq!(attrs.start_to_close_timeout, Some(600));
        assert_eq!(attrs.heartbeat_timeout, None);
    }

    #[test]
    fn test_unknown_event_type() {
        let event: HistoryEvent = serde_json::from_value(json!({
            "eventId": 9,
            "eventTimestamp": 1.0,
            "eventType": "ChildWorkflowExecutionStarted",
            "childWorkflowExecutionStartedEventAttributes": {"initiatedEventId": 3}
        }))
        .unwrap();

        assert_eq!(event.event_type, EventType::Other);
    }

    #[test]
    fn test_only_populated_attributes_serialized() {
        let value = serde_json::to_value(HistoryEvent::activity_completed(7, 5, "42")).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object["eventType"], "ActivityTaskCompleted");
        assert_eq!(
            object["activityTaskCompletedEventAttributes"]["scheduledEventId"],
            5
        );
        assert_eq!(object.len(), 4);
    }

    #[test]
    fn test_scheduled_event_id() {
        assert_eq!(
            HistoryEvent::activity_completed(7, 5, "r").scheduled_event_id(),
            Some(5)
        );
        assert_eq!(
            HistoryEvent::activity_failed(8, 6, "boom", "d").scheduled_event_id(),
            Some(6)
        );
        assert_eq!(
            HistoryEvent::activity_timed_out(9, 4, "HEARTBEAT", "").scheduled_event_id(),
            Some(4)
        );
        assert_eq!(HistoryEvent::workflow_started(1, None).scheduled_event_id(), None);
    }

    #[test]
    fn test_timestamp_conversion() {
        let mut event = HistoryEvent::new(1, EventType::DecisionTaskStarted);
        event.event_timestamp = 1326592619.5;

        let ts = event.timestamp().unwrap();
        assert_eq!(ts.timestamp(), 1326592619);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }
}
