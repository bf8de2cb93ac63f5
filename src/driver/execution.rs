//! The per-run state machine shared by both drivers.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;

use super::co::Co;
use crate::effect::Effect;
use crate::error::{ClientError, Result};
use crate::types::Value;

/// Observable state of an [`Execution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    /// The routine is runnable.
    Running,
    /// The routine performed an effect that has not been resolved yet.
    Yielded,
    /// The effect's outcome is waiting to be delivered.
    Resolved,
    /// The routine returned `Ok`.
    Done,
    /// The routine returned `Err`, or broke the routine contract.
    Failed,
}

impl DriveState {
    pub fn is_finished(self) -> bool {
        matches!(self, DriveState::Done | DriveState::Failed)
    }
}

/// Outcome of one [`Execution::advance`].
#[derive(Debug)]
pub enum Step<T> {
    /// The routine wants this effect resolved.
    Yield(Effect),
    Complete(Result<T>),
}

/// A routine being driven.
///
/// The routine is an ordinary future that only ever suspends inside
/// [`Co::perform`]. It is polled with a no-op waker: every `Pending` must
/// correspond to an effect left in the shared channel.
pub struct Execution<F> {
    co: Co,
    routine: Pin<Box<F>>,
    state: DriveState,
}

impl<T, F> Execution<F>
where
    F: Future<Output = Result<T>>,
{
    /// Build the routine from a fresh `Co`. Nothing runs until `advance`.
    pub fn start(routine: impl FnOnce(Co) -> F) -> Self {
        let co = Co::new();
        let routine = Box::pin(routine(co.clone()));
        tracing::trace!(target: "hybrid_http::driver", "execution started");
        Self {
            co,
            routine,
            state: DriveState::Running,
        }
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    /// Run the routine until it performs an effect or completes.
    pub fn advance(&mut self) -> Step<T> {
        match self.state {
            DriveState::Running | DriveState::Resolved => {}
            DriveState::Yielded => {
                return Step::Complete(Err(ClientError::InvalidState(
                    "the pending effect must be resumed before advancing".to_string(),
                )));
            }
            DriveState::Done | DriveState::Failed => {
                return Step::Complete(Err(ClientError::InvalidState(
                    "execution already finished".to_string(),
                )));
            }
        }
        self.transition(DriveState::Running);

        let mut cx = Context::from_waker(noop_waker_ref());
        match self.routine.as_mut().poll(&mut cx) {
            Poll::Ready(Ok(value)) => {
                self.transition(DriveState::Done);
                Step::Complete(Ok(value))
            }
            Poll::Ready(Err(error)) => {
                self.transition(DriveState::Failed);
                Step::Complete(Err(error))
            }
            Poll::Pending => match self.co.with_channel(|channel| channel.effect.take()) {
                Some(effect) => {
                    tracing::trace!(target: "hybrid_http::driver", %effect, "effect yielded");
                    self.transition(DriveState::Yielded);
                    Step::Yield(effect)
                }
                None => {
                    self.transition(DriveState::Failed);
                    Step::Complete(Err(ClientError::ForeignAwait))
                }
            },
        }
    }

    /// Deliver the outcome of the pending effect.
    ///
    /// `Err` outcomes are raised inside the routine at its `perform`, where
    /// the routine may handle them.
    pub fn resume(&mut self, outcome: Result<Value>) -> Result<()> {
        if self.state != DriveState::Yielded {
            return Err(ClientError::InvalidState(format!(
                "cannot resume an execution in state {:?}",
                self.state
            )));
        }
        self.co.with_channel(|channel| channel.reply = Some(outcome));
        self.transition(DriveState::Resolved);
        Ok(())
    }

    fn transition(&mut self, next: DriveState) {
        if self.state != next {
            tracing::trace!(target: "hybrid_http::driver", from = ?self.state, to = ?next, "state transition");
            self.state = next;
        }
    }
}

impl<F> std::fmt::Debug for Execution<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Execution")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
