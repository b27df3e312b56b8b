//! Activity handler trait

use std::future::Future;

use async_trait::async_trait;

use super::ActivityContext;

/// User code run for each activity task of one activity type
///
/// The handler owns the [`ActivityContext`] and should finish by calling
/// exactly one of [`completed`](ActivityContext::completed),
/// [`failed`](ActivityContext::failed) or
/// [`successfully_cancel`](ActivityContext::successfully_cancel). A context
/// dropped without one leaves the task to time out on the service.
///
/// Async functions and closures taking an `ActivityContext` implement this
/// trait.
///
/// # Example
///
/// ```
/// use sws_flow::activity::ActivityContext;
///
/// async fn getnum(ctx: ActivityContext) {
///     let len = ctx.input().unwrap_or_default().len();
///     ctx.completed(len.to_string()).await;
/// }
/// ```
#[async_trait]
pub trait ActivityHandler: Send + Sync + 'static {
    async fn execute(&self, ctx: ActivityContext);
}

#[async_trait]
impl<F, Fut> ActivityHandler for F
where
    F: Fn(ActivityContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn execute(&self, ctx: ActivityContext) {
        (self)(ctx).await
    }
}
