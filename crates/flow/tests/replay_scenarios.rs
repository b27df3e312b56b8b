//! End-to-end replay scenarios driven through the decider

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sws_flow::model::{
    ActivityType, Decision, HistoryEvent, PollForDecisionTaskResponse,
    RespondDecisionTaskCompletedRequest, ScheduleActivityTaskDecisionAttributes,
    WorkflowExecution,
};
use sws_flow::workflow::failure_type;
use sws_flow::{
    AcknowledgementExhausted, ActivityTask, Decider, InMemoryTransport, TaskResult, WorkerConfig, WorkflowContext,
    WorkflowHandler, WorkflowType,
};

type Observed = Arc<Mutex<Vec<Option<TaskResult>>>>;

fn getnum() -> ActivityType {
    ActivityType::new("getnum", "1")
}

fn schedule(activity_id: &str, input: &str) -> Decision {
    Decision::schedule_activity_task(ScheduleActivityTaskDecisionAttributes {
        activity_id: activity_id.to_string(),
        activity_type: getnum(),
        input: Some(input.to_string()),
        control: None,
        heartbeat_timeout: None,
        schedule_to_close_timeout: None,
        schedule_to_start_timeout: None,
        start_to_close_timeout: None,
        task_list: None,
    })
}

/// Run one decision task through the decider and return the posted batch
async fn decide(events: Vec<HistoryEvent>, handler: impl WorkflowHandler) -> Vec<Decision> {
    let transport = Arc::new(InMemoryTransport::new());
    transport.push_decision_task(PollForDecisionTaskResponse {
        task_token: Some("token-1".to_string()),
        workflow_type: Some(WorkflowType::new("sum", "1")),
        workflow_execution: Some(WorkflowExecution {
            workflow_id: "wf-1".to_string(),
            run_id: "run-1".to_string(),
        }),
        events,
        ..Default::default()
    });

    let config = WorkerConfig::new("test", "deciders", "us-east-1").with_identity("decider-test");
    let mut decider = Decider::new(config, transport.clone()).unwrap();
    decider.register(WorkflowType::new("sum", "1"), handler);

    decider
        .poll_once()
        .await
        .unwrap()
        .expect("a decision task was queued")
        .await
        .unwrap();

    let mut responses = transport.decision_responses();
    assert_eq!(responses.len(), 1);
    let response = responses.remove(0);
    assert_eq!(response.task_token, "token-1");
    response.decisions
}

/// Handler issuing one `go` per input and reading the channels in order
fn fan_out(inputs: &'static [&'static str], observed: Observed) -> impl WorkflowHandler {
    move |ctx: &mut WorkflowContext| {
        let task = ActivityTask::new("getnum", "1");
        let mut channels: Vec<_> = inputs.iter().map(|input| ctx.go(&task, *input)).collect();

        for channel in &mut channels {
            let outcome = channel.recv();
            let pending = outcome.is_none();
            observed.lock().push(outcome);
            if pending {
                return;
            }
        }
        ctx.complete("done");
    }
}

#[test_log::test(tokio::test)]
async fn unscheduled_activity_is_scheduled() {
    let observed = Observed::default();
    let decisions = decide(
        vec![HistoryEvent::workflow_started(1, None)],
        fan_out(&["hello1"], observed.clone()),
    )
    .await;

    assert_eq!(decisions, vec![schedule("activityId-0", "hello1")]);
    assert_eq!(*observed.lock(), vec![None]);
}

#[test_log::test(tokio::test)]
async fn scheduled_activity_stays_pending() {
    let observed = Observed::default();
    let decisions = decide(
        vec![
            HistoryEvent::workflow_started(1, None),
            HistoryEvent::activity_scheduled(5, "activityId-0", getnum(), Some("hello1".into())),
        ],
        fan_out(&["hello1"], observed.clone()),
    )
    .await;

    assert!(decisions.is_empty());
    assert_eq!(*observed.lock(), vec![None]);
}

#[test_log::test(tokio::test)]
async fn completion_is_delivered() {
    let observed = Observed::default();
    let decisions = decide(
        vec![
            HistoryEvent::workflow_started(1, None),
            HistoryEvent::activity_scheduled(5, "activityId-0", getnum(), Some("hello1".into())),
            HistoryEvent::activity_completed(8, 5, "42"),
        ],
        fan_out(&["hello1"], observed.clone()),
    )
    .await;

    assert_eq!(
        decisions,
        vec![Decision::complete_workflow_execution(Some("done".into()))]
    );
    assert_eq!(
        *observed.lock(),
        vec![Some(TaskResult::completed(Some("42".into())))]
    );
}

#[test_log::test(tokio::test)]
async fn parallel_fan_out_schedules_in_call_order() {
    let observed = Observed::default();
    let handler = {
        let observed = observed.clone();
        move |ctx: &mut WorkflowContext| {
            let task = ActivityTask::new("getnum", "1");
            let channels = vec![ctx.go(&task, "a"), ctx.go(&task, "b"), ctx.go(&task, "c")];
            for mut channel in channels {
                observed.lock().push(channel.recv());
            }
        }
    };

    let decisions = decide(vec![HistoryEvent::workflow_started(1, None)], handler).await;

    assert_eq!(
        decisions,
        vec![
            schedule("activityId-0", "a"),
            schedule("activityId-1", "b"),
            schedule("activityId-2", "c"),
        ]
    );
    assert_eq!(*observed.lock(), vec![None, None, None]);
}

#[test_log::test(tokio::test)]
async fn partial_completion_returns_early() {
    let observed = Observed::default();
    let decisions = decide(
        vec![
            HistoryEvent::workflow_started(1, None),
            HistoryEvent::activity_scheduled(5, "activityId-0", getnum(), Some("a".into())),
            HistoryEvent::activity_scheduled(6, "activityId-1", getnum(), Some("b".into())),
            HistoryEvent::activity_scheduled(7, "activityId-2", getnum(), Some("c".into())),
            HistoryEvent::activity_completed(10, 5, "r0"),
            HistoryEvent::activity_completed(11, 7, "r2"),
        ],
        fan_out(&["a", "b", "c"], observed.clone()),
    )
    .await;

    assert!(decisions.is_empty());
    assert_eq!(
        *observed.lock(),
        vec![Some(TaskResult::completed(Some("r0".into()))), None]
    );
}

#[test_log::test(tokio::test)]
async fn schedule_failure_is_delivered() {
    let observed = Observed::default();
    let decisions = decide(
        vec![
            HistoryEvent::workflow_started(1, None),
            HistoryEvent::schedule_activity_failed(
                5,
                "activityId-0",
                getnum(),
                "ACTIVITY_TYPE_DEPRECATED",
            ),
        ],
        fan_out(&["hello1"], observed.clone()),
    )
    .await;

    assert_eq!(
        decisions,
        vec![Decision::complete_workflow_execution(Some("done".into()))]
    );
    assert_eq!(
        *observed.lock(),
        vec![Some(TaskResult::failure(
            failure_type::SCHEDULE_ACTIVITY_TASK_FAILED,
            Some("ACTIVITY_TYPE_DEPRECATED".into())
        ))]
    );
}

#[test_log::test(tokio::test)]
async fn every_terminal_kind_is_routed() {
    let observed = Observed::default();
    let handler = {
        let observed = observed.clone();
        move |ctx: &mut WorkflowContext| {
            let task = ActivityTask::new("getnum", "1");
            for input in ["a", "b", "c", "d"] {
                observed.lock().push(ctx.go(&task, input).recv());
            }
        }
    };

    decide(
        vec![
            HistoryEvent::activity_scheduled(5, "activityId-0", getnum(), None),
            HistoryEvent::activity_scheduled(6, "activityId-1", getnum(), None),
            HistoryEvent::activity_scheduled(7, "activityId-2", getnum(), None),
            HistoryEvent::activity_scheduled(8, "activityId-3", getnum(), None),
            HistoryEvent::activity_completed(10, 5, "ok"),
            HistoryEvent::activity_canceled(11, 6, "cancel details"),
            HistoryEvent::activity_timed_out(12, 7, "HEARTBEAT", "timeout details"),
            HistoryEvent::activity_failed(13, 8, "reason", "failure details"),
        ],
        handler,
    )
    .await;

    let observed = observed.lock();
    assert_eq!(observed[0], Some(TaskResult::completed(Some("ok".into()))));

    let failures: Vec<_> = observed[1..]
        .iter()
        .map(|r| {
            let r = r.as_ref().unwrap();
            (r.failure_type.as_deref(), r.failure_cause.as_deref())
        })
        .collect();
    assert_eq!(
        failures,
        vec![
            (Some(failure_type::ACTIVITY_TASK_CANCELED), Some("cancel details")),
            (Some(failure_type::ACTIVITY_TASK_TIMED_OUT), Some("timeout details")),
            (Some(failure_type::ACTIVITY_TASK_FAILED), Some("failure details")),
        ]
    );
    assert_eq!(observed[3].as_ref().unwrap().failure_reason.as_deref(), Some("reason"));
}

#[test_log::test(tokio::test)]
async fn replays_of_the_same_history_are_identical() {
    let history = vec![
        HistoryEvent::workflow_started(1, Some("x".into())),
        HistoryEvent::activity_scheduled(5, "activityId-0", getnum(), Some("a".into())),
        HistoryEvent::activity_completed(9, 5, "1"),
    ];

    let first = decide(history.clone(), fan_out(&["a", "b", "c"], Observed::default())).await;
    let second = decide(history, fan_out(&["a", "b", "c"], Observed::default())).await;

    assert_eq!(first, vec![schedule("activityId-1", "b"), schedule("activityId-2", "c")]);
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[test_log::test(tokio::test)]
async fn ordinals_do_not_depend_on_history() {
    let ids = Arc::new(Mutex::new(Vec::new()));
    let handler = {
        let ids = ids.clone();
        move |ctx: &mut WorkflowContext| {
            let task = ActivityTask::new("getnum", "1");
            for input in ["a", "b", "c"] {
                ids.lock().push(ctx.go(&task, input).activity_id().to_string());
            }
        }
    };

    decide(
        vec![
            HistoryEvent::activity_scheduled(5, "activityId-1", getnum(), None),
            HistoryEvent::activity_completed(6, 5, "done"),
        ],
        handler,
    )
    .await;

    assert_eq!(
        *ids.lock(),
        vec!["activityId-0", "activityId-1", "activityId-2"]
    );
}

#[test_log::test(tokio::test)]
async fn multi_page_history_is_replayed_whole() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.push_decision_task(PollForDecisionTaskResponse {
        task_token: Some("token-1".to_string()),
        workflow_type: Some(WorkflowType::new("sum", "1")),
        events: vec![
            HistoryEvent::workflow_started(1, None),
            HistoryEvent::activity_scheduled(5, "activityId-0", getnum(), Some("a".into())),
        ],
        next_page_token: Some("page-2".to_string()),
        ..Default::default()
    });
    transport.push_history_page(
        "page-2",
        PollForDecisionTaskResponse {
            task_token: Some("token-1".to_string()),
            events: vec![HistoryEvent::activity_completed(9, 5, "7")],
            ..Default::default()
        },
    );

    let config = WorkerConfig::new("test", "deciders", "us-east-1");
    let mut decider = Decider::new(config, transport.clone()).unwrap();
    decider.register(
        WorkflowType::new("sum", "1"),
        fan_out(&["a"], Observed::default()),
    );
    decider.poll_once().await.unwrap().unwrap().await.unwrap();

    // Without the second page the activity would look pending
    assert_eq!(
        transport.decision_responses()[0].decisions,
        vec![Decision::complete_workflow_execution(Some("done".into()))]
    );
}

#[test_log::test(tokio::test(start_paused = true))]
async fn lost_schedule_batch_takes_the_decider_down() {
    let transport = Arc::new(InMemoryTransport::new());
    transport.fail_next::<RespondDecisionTaskCompletedRequest>(11);
    transport.push_decision_task(PollForDecisionTaskResponse {
        task_token: Some("token-1".to_string()),
        workflow_type: Some(WorkflowType::new("sum", "1")),
        events: vec![HistoryEvent::workflow_started(1, Some("a,b".into()))],
        ..Default::default()
    });

    let config = WorkerConfig::new("test", "deciders", "us-east-1");
    let mut decider = Decider::new(config, transport.clone()).unwrap();
    decider.register(
        WorkflowType::new("sum", "1"),
        fan_out(&["a", "b"], Observed::default()),
    );
    let decider = Arc::new(decider);

    let running = tokio::spawn({
        let decider = decider.clone();
        async move { decider.start().await }
    });
    let err = tokio::time::timeout(Duration::from_secs(600), running)
        .await
        .expect("start() kept polling after the decision batch was lost")
        .unwrap_err();

    let exhausted = err.into_panic().downcast::<AcknowledgementExhausted>().unwrap();
    assert_eq!(exhausted.action, "RespondDecisionTaskCompleted");
    assert_eq!(exhausted.attempts, 11);
    assert_eq!(
        transport.call_count::<RespondDecisionTaskCompletedRequest>(),
        11
    );
    assert!(transport.decision_responses().is_empty());
}
