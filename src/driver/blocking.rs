//! Blocking driver.

use std::future::Future;

use super::co::Co;
use super::execution::{Execution, Step};
use crate::effect::BlockingRoot;
use crate::error::Result;

/// Run `routine` to completion on the calling thread, resolving each effect
/// against `root` with blocking calls.
pub fn drive_blocking<R, T, F, Fut>(root: &R, routine: F) -> Result<T>
where
    R: BlockingRoot + ?Sized,
    F: FnOnce(Co) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut execution = Execution::start(routine);
    loop {
        match execution.advance() {
            Step::Complete(result) => return result,
            Step::Yield(effect) => {
                let outcome = effect.resolve_blocking(root);
                execution.resume(outcome)?;
            }
        }
    }
}
