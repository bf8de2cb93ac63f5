//! Async driver.

use std::future::Future;

use super::co::Co;
use super::execution::{Execution, Step};
use crate::effect::AsyncRoot;
use crate::error::Result;

/// Run `routine` to completion, awaiting each effect against `root`.
///
/// Dropping the returned future cancels the routine at its current effect.
pub async fn drive<R, T, F, Fut>(root: &R, routine: F) -> Result<T>
where
    R: AsyncRoot + ?Sized,
    F: FnOnce(Co) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut execution = Execution::start(routine);
    loop {
        match execution.advance() {
            Step::Complete(result) => return result,
            Step::Yield(effect) => {
                let outcome = effect.resolve(root).await;
                execution.resume(outcome)?;
            }
        }
    }
}
