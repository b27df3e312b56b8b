//! Matching `go` calls against history
//!
//! [`scan`] is the reference: one linear pass over the history per call.
//! [`HistoryIndex`] answers the same question from maps built once per
//! decision task.

use std::collections::{HashMap, HashSet};

use super::result::{failure_type, TaskResult};
use crate::model::{EventType, HistoryEvent};

/// Where an activity stands in the history
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ActivityState {
    /// Never scheduled; a schedule decision is needed
    Unscheduled,
    /// Scheduled, no terminal event yet
    Pending,
    Finished(TaskResult),
}

/// Outcome carried by a terminal activity event, if `event` is one
fn terminal_result(event: &HistoryEvent) -> Option<TaskResult> {
    match event.event_type {
        EventType::ActivityTaskCompleted => event
            .activity_task_completed_event_attributes
            .as_ref()
            .map(|a| TaskResult::completed(a.result.clone())),
        EventType::ScheduleActivityTaskFailed => event
            .schedule_activity_task_failed_event_attributes
            .as_ref()
            .map(|a| {
                TaskResult::failure(
                    failure_type::SCHEDULE_ACTIVITY_TASK_FAILED,
                    Some(a.cause.clone()),
                )
            }),
        EventType::ActivityTaskCanceled => event
            .activity_task_canceled_event_attributes
            .as_ref()
            .map(|a| TaskResult::failure(failure_type::ACTIVITY_TASK_CANCELED, a.details.clone())),
        EventType::ActivityTaskTimedOut => event
            .activity_task_timed_out_event_attributes
            .as_ref()
            .map(|a| TaskResult::failure(failure_type::ACTIVITY_TASK_TIMED_OUT, a.details.clone())),
        EventType::ActivityTaskFailed => {
            event.activity_task_failed_event_attributes.as_ref().map(|a| {
                TaskResult::failure(failure_type::ACTIVITY_TASK_FAILED, a.details.clone())
                    .with_reason(a.reason.clone())
            })
        }
        _ => None,
    }
}

fn scheduled_activity_id(event: &HistoryEvent) -> Option<&str> {
    event
        .activity_task_scheduled_event_attributes
        .as_ref()
        .filter(|_| event.event_type == EventType::ActivityTaskScheduled)
        .map(|a| a.activity_id.as_str())
}

fn schedule_failed_activity_id(event: &HistoryEvent) -> Option<&str> {
    event
        .schedule_activity_task_failed_event_attributes
        .as_ref()
        .filter(|_| event.event_type == EventType::ScheduleActivityTaskFailed)
        .map(|a| a.activity_id.as_str())
}

/// Linear scan for one activity id
pub(crate) fn scan(history: &[HistoryEvent], activity_id: &str) -> ActivityState {
    let scheduled = history
        .iter()
        .position(|e| scheduled_activity_id(e) == Some(activity_id));

    let Some(position) = scheduled else {
        // A rejected schedule never produces a Scheduled event
        return history
            .iter()
            .find(|e| schedule_failed_activity_id(e) == Some(activity_id))
            .and_then(terminal_result)
            .map_or(ActivityState::Unscheduled, ActivityState::Finished);
    };

    let scheduled_ref = history[position].event_id;
    history[position + 1..]
        .iter()
        .find(|e| {
            e.scheduled_event_id() == Some(scheduled_ref)
                || schedule_failed_activity_id(e) == Some(activity_id)
        })
        .and_then(terminal_result)
        .map_or(ActivityState::Pending, ActivityState::Finished)
}

/// Positional maps over one history
///
/// Positions are indices into the history slice the index was built from.
#[derive(Debug, Default)]
pub(crate) struct HistoryIndex {
    /// activityId -> (position, eventId) of its first Scheduled event
    scheduled: HashMap<String, (usize, i64)>,
    /// scheduledEventId -> positions of terminal events
    terminal: HashMap<i64, Vec<usize>>,
    /// activityId -> positions of ScheduleActivityTaskFailed events
    schedule_failed: HashMap<String, Vec<usize>>,
    cancel_requested: HashSet<String>,
    timers_started: HashSet<String>,
    timers_closed: HashSet<String>,
    timers_fired: HashSet<String>,
}

impl HistoryIndex {
    pub(crate) fn build(history: &[HistoryEvent]) -> Self {
        let mut index = Self::default();

        for (position, event) in history.iter().enumerate() {
            if let Some(activity_id) = scheduled_activity_id(event) {
                index
                    .scheduled
                    .entry(activity_id.to_string())
                    .or_insert((position, event.event_id));
            } else if let Some(activity_id) = schedule_failed_activity_id(event) {
                index
                    .schedule_failed
                    .entry(activity_id.to_string())
                    .or_default()
                    .push(position);
            } else if let Some(scheduled_ref) = event.scheduled_event_id() {
                index.terminal.entry(scheduled_ref).or_default().push(position);
            }

            if let Some(attrs) = &event.activity_task_cancel_requested_event_attributes {
                index.cancel_requested.insert(attrs.activity_id.clone());
            }
            if let Some(attrs) = &event.timer_started_event_attributes {
                index.timers_started.insert(attrs.timer_id.clone());
            }
            if let Some(attrs) = &event.timer_fired_event_attributes {
                index.timers_fired.insert(attrs.timer_id.clone());
                index.timers_closed.insert(attrs.timer_id.clone());
            }
            if let Some(attrs) = &event.timer_canceled_event_attributes {
                index.timers_closed.insert(attrs.timer_id.clone());
            }
        }

        index
    }

    /// Same answer as [`scan`] for the history this index was built from
    pub(crate) fn lookup(&self, history: &[HistoryEvent], activity_id: &str) -> ActivityState {
        let failed_after = |after: Option<usize>| {
            self.schedule_failed.get(activity_id).and_then(|positions| {
                positions
                    .iter()
                    .copied()
                    .find(|&p| after.map_or(true, |a| p > a))
            })
        };

        let Some(&(position, scheduled_ref)) = self.scheduled.get(activity_id) else {
            return failed_after(None)
                .and_then(|p| terminal_result(&history[p]))
                .map_or(ActivityState::Unscheduled, ActivityState::Finished);
        };

        let terminal = self
            .terminal
            .get(&scheduled_ref)
            .and_then(|positions| positions.iter().copied().find(|&p| p > position));

        let first = match (terminal, failed_after(Some(position))) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        first
            .and_then(|p| terminal_result(&history[p]))
            .map_or(ActivityState::Pending, ActivityState::Finished)
    }

    pub(crate) fn is_cancel_requested(&self, activity_id: &str) -> bool {
        self.cancel_requested.contains(activity_id)
    }

    pub(crate) fn timer_started(&self, timer_id: &str) -> bool {
        self.timers_started.contains(timer_id)
    }

    pub(crate) fn timer_fired(&self, timer_id: &str) -> bool {
        self.timers_fired.contains(timer_id)
    }

    /// Fired or canceled
    pub(crate) fn timer_closed(&self, timer_id: &str) -> bool {
        self.timers_closed.contains(timer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActivityType;

    fn getnum() -> ActivityType {
        ActivityType::new("getnum", "1")
    }

    fn both(history: &[HistoryEvent], activity_id: &str) -> ActivityState {
        let indexed = HistoryIndex::build(history).lookup(history, activity_id);
        let scanned = scan(history, activity_id);
        assert_eq!(indexed, scanned, "index and scan disagree for {activity_id}");
        indexed
    }

    #[test]
    fn test_unscheduled() {
        let history = vec![HistoryEvent::workflow_started(1, None)];
        assert_eq!(both(&history, "activityId-0"), ActivityState::Unscheduled);
    }

    #[test]
    fn test_pending() {
        let history = vec![
            HistoryEvent::workflow_started(1, None),
            HistoryEvent::activity_scheduled(5, "activityId-0", getnum(), None),
        ];
        assert_eq!(both(&history, "activityId-0"), ActivityState::Pending);
    }

    #[test]
    fn test_terminal_kinds() {
        let history = vec![
            HistoryEvent::workflow_started(1, None),
            HistoryEvent::activity_scheduled(5, "activityId-0", getnum(), None),
            HistoryEvent::activity_scheduled(6, "activityId-1", getnum(), None),
            HistoryEvent::activity_scheduled(7, "activityId-2", getnum(), None),
            HistoryEvent::activity_scheduled(8, "activityId-3", getnum(), None),
            HistoryEvent::activity_completed(10, 5, "42"),
            HistoryEvent::activity_failed(11, 6, "boom", "trace"),
            HistoryEvent::activity_canceled(12, 7, "user"),
            HistoryEvent::activity_timed_out(13, 8, "HEARTBEAT", "last=50%"),
        ];

        assert_eq!(
            both(&history, "activityId-0"),
            ActivityState::Finished(TaskResult::completed(Some("42".into())))
        );
        assert_eq!(
            both(&history, "activityId-1"),
            ActivityState::Finished(
                TaskResult::failure(failure_type::ACTIVITY_TASK_FAILED, Some("trace".into()))
                    .with_reason(Some("boom".into()))
            )
        );
        assert_eq!(
            both(&history, "activityId-2"),
            ActivityState::Finished(TaskResult::failure(
                failure_type::ACTIVITY_TASK_CANCELED,
                Some("user".into())
            ))
        );
        assert_eq!(
            both(&history, "activityId-3"),
            ActivityState::Finished(TaskResult::failure(
                failure_type::ACTIVITY_TASK_TIMED_OUT,
                Some("last=50%".into())
            ))
        );
    }

    #[test]
    fn test_schedule_failed_without_scheduled_event() {
        let history = vec![
            HistoryEvent::workflow_started(1, None),
            HistoryEvent::schedule_activity_failed(
                5,
                "activityId-0",
                getnum(),
                "ACTIVITY_TYPE_DEPRECATED",
            ),
        ];

        assert_eq!(
            both(&history, "activityId-0"),
            ActivityState::Finished(TaskResult::failure(
                failure_type::SCHEDULE_ACTIVITY_TASK_FAILED,
                Some("ACTIVITY_TYPE_DEPRECATED".into())
            ))
        );
        assert_eq!(both(&history, "activityId-1"), ActivityState::Unscheduled);
    }

    #[test]
    fn test_first_terminal_event_wins() {
        let history = vec![
            HistoryEvent::activity_scheduled(5, "activityId-0", getnum(), None),
            HistoryEvent::activity_timed_out(6, 5, "START_TO_CLOSE", "late"),
            HistoryEvent::activity_completed(7, 5, "too late"),
        ];

        assert_eq!(
            both(&history, "activityId-0"),
            ActivityState::Finished(TaskResult::failure(
                failure_type::ACTIVITY_TASK_TIMED_OUT,
                Some("late".into())
            ))
        );
    }

    #[test]
    fn test_terminal_events_match_by_scheduled_id_only() {
        let history = vec![
            HistoryEvent::activity_scheduled(5, "activityId-0", getnum(), None),
            HistoryEvent::activity_scheduled(6, "activityId-1", getnum(), None),
            HistoryEvent::activity_completed(9, 6, "one"),
        ];

        assert_eq!(both(&history, "activityId-0"), ActivityState::Pending);
        assert_eq!(
            both(&history, "activityId-1"),
            ActivityState::Finished(TaskResult::completed(Some("one".into())))
        );
    }

    #[test]
    fn test_timers_and_cancel_requests() {
        let history = vec![
            HistoryEvent::timer_started(3, "wait", 30),
            HistoryEvent::timer_started(4, "other", 30),
            HistoryEvent::timer_fired(8, "wait", 3),
            HistoryEvent::timer_canceled(9, "other", 4),
            HistoryEvent::activity_cancel_requested(10, "activityId-4"),
        ];
        let index = HistoryIndex::build(&history);

        assert!(index.timer_started("wait"));
        assert!(index.timer_fired("wait"));
        assert!(index.timer_closed("other"));
        assert!(!index.timer_fired("other"));
        assert!(!index.timer_started("never"));
        assert!(index.is_cancel_requested("activityId-4"));
    }
}
