//! Sample workflow and activity served by the worker binary

use sws_flow::{ActivityContext, ActivityTask, ActivityType, WorkflowContext, WorkflowType};
use tracing::info;

/// `("sum", "1")`
pub const SUM: (&str, &str) = ("sum", "1");

/// `("getnum", "1")`
pub const GETNUM: (&str, &str) = ("getnum", "1");

pub fn sum_type() -> WorkflowType {
    WorkflowType::new(SUM.0, SUM.1)
}

pub fn getnum_type() -> ActivityType {
    ActivityType::new(GETNUM.0, GETNUM.1)
}

/// Fan out one `getnum` per comma-separated input item and complete with the sum
///
/// Returns without completing while any result is outstanding; the next
/// decision task replays from the top.
pub fn sum_workflow(ctx: &mut WorkflowContext) {
    let items: Vec<String> = ctx
        .input()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    let task = ActivityTask::new(GETNUM.0, GETNUM.1);
    let mut channels: Vec<_> = items.into_iter().map(|item| ctx.go(&task, item)).collect();

    let mut total: i64 = 0;
    for channel in &mut channels {
        let Some(outcome) = channel.recv() else {
            return;
        };

        if outcome.is_failure() {
            let details = format!(
                "{} {}",
                outcome.failure_type.unwrap_or_default(),
                outcome.failure_cause.unwrap_or_default()
            );
            ctx.fail("getnum failed", details.trim());
            return;
        }

        match outcome.result.as_deref().map(str::parse::<i64>) {
            Some(Ok(n)) => total += n,
            _ => {
                ctx.fail("getnum returned a non-numeric result", outcome.result.unwrap_or_default());
                return;
            }
        }
    }

    info!(total, "sum workflow completed");
    ctx.complete(total.to_string());
}

/// Report the length of the input as the result
pub async fn getnum(ctx: ActivityContext) {
    let len = ctx.input().unwrap_or_default().len();
    ctx.completed(len.to_string()).await;
}
