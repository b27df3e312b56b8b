//! Workflow handler trait

use async_trait::async_trait;

use super::WorkflowContext;

/// User code replayed for every decision task of a workflow type
///
/// The handler is run from the top each time. It must return as soon as a
/// [`ResultChannel`](super::ResultChannel) turns out to be pending. Any
/// decisions it produced up to that point are posted when it returns, unless
/// it already called [`WorkflowContext::decide`].
///
/// Plain functions and closures taking `&mut WorkflowContext` implement this
/// trait.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use sws_flow::workflow::{ActivityTask, WorkflowContext, WorkflowHandler};
///
/// struct Echo;
///
/// #[async_trait]
/// impl WorkflowHandler for Echo {
///     async fn run(&self, ctx: &mut WorkflowContext) {
///         let input = ctx.input().unwrap_or_default().to_string();
///         let Some(outcome) = ctx.go(&ActivityTask::new("echo", "1"), input).recv() else {
///             return;
///         };
///         ctx.complete(outcome.result.unwrap_or_default());
///         ctx.decide().await;
///     }
/// }
/// ```
#[async_trait]
pub trait WorkflowHandler: Send + Sync + 'static {
    async fn run(&self, ctx: &mut WorkflowContext);
}

#[async_trait]
impl<F> WorkflowHandler for F
where
    F: Fn(&mut WorkflowContext) + Send + Sync + 'static,
{
    async fn run(&self, ctx: &mut WorkflowContext) {
        (self)(ctx)
    }
}
