//! Effect proxies: builders that turn attribute/index/call chains into
//! descriptors without executing anything.

use super::descriptor::{EffectDescriptor, Function, Operand};
use crate::types::Value;

/// A chain of attribute and index accesses starting at the root.
///
/// ```rust,ignore
/// let create = EffectProxy::root()
///     .attr("uploads")
///     .attr("create")
///     .call(Args::new().kwarg("filename", "scan.mha"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EffectProxy {
    operand: Operand,
}

impl EffectProxy {
    /// A proxy standing for the root itself.
    pub fn root() -> Self {
        Self {
            operand: Operand::RootSlot,
        }
    }

    /// Continue the chain from a previously built descriptor.
    pub fn from_descriptor(descriptor: EffectDescriptor) -> Self {
        Self {
            operand: Operand::Deferred(Box::new(descriptor)),
        }
    }

    pub fn attr(self, name: impl Into<String>) -> Self {
        Self::from_descriptor(EffectDescriptor::new(
            self.operand,
            Function::GetAttr(name.into()),
            Vec::new(),
            Vec::new(),
        ))
    }

    pub fn index(self, key: impl Into<Value>) -> Self {
        Self::from_descriptor(EffectDescriptor::new(
            self.operand,
            Function::Index(key.into()),
            Vec::new(),
            Vec::new(),
        ))
    }

    /// Terminal step: describe invoking the chain with `args`.
    pub fn call(self, args: Args) -> EffectDescriptor {
        EffectDescriptor::new(self.operand, Function::Invoke, args.positional, args.keyword)
    }

    pub fn into_operand(self) -> Operand {
        self.operand
    }
}

/// Builder for call arguments.
///
/// Arguments may be plain values, proxies (resolved first) or descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Operand>,
    keyword: Vec<(String, Operand)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Operand>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }
}

impl From<EffectProxy> for Operand {
    fn from(proxy: EffectProxy) -> Self {
        proxy.operand
    }
}

impl From<EffectDescriptor> for Operand {
    fn from(descriptor: EffectDescriptor) -> Self {
        Operand::Deferred(Box::new(descriptor))
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

macro_rules! impl_operand_from_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Operand {
                fn from(v: $t) -> Self {
                    Operand::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_operand_from_value!(
    serde_json::Value,
    bytes::Bytes,
    Vec<u8>,
    crate::types::HttpResponse,
    &str,
    String,
    bool,
    i32,
    i64,
    u16,
    u32,
    u64,
    usize,
    f64,
);
