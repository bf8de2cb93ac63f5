//! The handle routines use to perform effects.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use crate::effect::{Effect, EffectProxy};
use crate::error::{ClientError, Result};
use crate::types::Value;

/// Slot shared between a routine and the execution driving it.
#[derive(Debug, Default)]
pub(crate) struct Channel {
    /// Effect performed by the routine, not yet taken by the driver.
    pub(crate) effect: Option<Effect>,
    /// Outcome delivered by the driver, not yet observed by the routine.
    pub(crate) reply: Option<Result<Value>>,
    /// An effect is outstanding: performed but its outcome not yet consumed.
    pub(crate) busy: bool,
}

/// Handle passed to a routine.
///
/// Cloning is cheap; clones talk to the same driver. Nested routines take
/// `&Co` and are awaited directly, so the driver sees a single stream of
/// effects.
#[derive(Debug, Clone, Default)]
pub struct Co {
    channel: Arc<Mutex<Channel>>,
}

impl Co {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Proxy for the root, the starting point of every call effect.
    pub fn root(&self) -> EffectProxy {
        EffectProxy::root()
    }

    /// Hand `effect` to the driver and wait for its outcome.
    pub fn perform(&self, effect: impl Into<Effect>) -> Perform {
        Perform {
            co: self.clone(),
            effect: Some(effect.into()),
            in_flight: false,
        }
    }

    /// Suspend through the driver's root.
    pub fn sleep(&self, duration: Duration) -> Perform {
        self.perform(Effect::Sleep(duration))
    }

    pub(crate) fn with_channel<T>(&self, f: impl FnOnce(&mut Channel) -> T) -> T {
        let mut channel = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut channel)
    }
}

/// Future returned by [`Co::perform`].
#[derive(Debug)]
#[must_use = "effects do nothing unless awaited"]
pub struct Perform {
    co: Co,
    effect: Option<Effect>,
    /// This future owns the channel's outstanding slot.
    in_flight: bool,
}

impl Future for Perform {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if let Some(effect) = this.effect.take() {
            return this.co.with_channel(|channel| {
                if channel.busy {
                    Poll::Ready(Err(ClientError::InvalidState(
                        "another effect is already in flight on this routine".to_string(),
                    )))
                } else {
                    channel.busy = true;
                    channel.effect = Some(effect);
                    this.in_flight = true;
                    Poll::Pending
                }
            });
        }
        if !this.in_flight {
            return Poll::Ready(Err(ClientError::InvalidState(
                "effect polled after completion".to_string(),
            )));
        }
        let reply = this.co.with_channel(|channel| {
            let reply = channel.reply.take();
            if reply.is_some() {
                channel.busy = false;
            }
            reply
        });
        match reply {
            Some(reply) => {
                this.in_flight = false;
                Poll::Ready(reply)
            }
            None => Poll::Pending,
        }
    }
}

impl Drop for Perform {
    fn drop(&mut self) {
        if self.in_flight {
            // Abandoned mid-flight: release the slot so the routine can go on.
            self.co.with_channel(|channel| {
                channel.busy = false;
                channel.effect = None;
                channel.reply = None;
            });
        }
    }
}
