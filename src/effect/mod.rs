//! Effect capture.
//!
//! Routines do not perform I/O themselves. They build [`EffectDescriptor`]s
//! with an [`EffectProxy`] and hand them to a driver, which resolves them
//! against a [`BlockingRoot`] or an [`AsyncRoot`].

pub mod descriptor;
pub mod path;
pub mod proxy;
pub mod root;

pub use descriptor::{Effect, EffectDescriptor, Function, Operand, Resolved};
pub use path::{CallArgs, CallPath, Segment};
pub use proxy::{Args, EffectProxy};
pub use root::{AsyncRoot, BlockingRoot};
