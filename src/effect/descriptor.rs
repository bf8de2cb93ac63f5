//! Effect descriptors and their resolution.
//!
//! A descriptor records a call without performing it. Resolution consumes the
//! descriptor, substitutes the live root for every [`Operand::RootSlot`]
//! (depth first, nested descriptors before the call that uses them) and then
//! performs the call through the root's `invoke`.

use std::fmt;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::path::{CallArgs, CallPath};
use super::root::{AsyncRoot, BlockingRoot};
use crate::error::{ClientError, Result};
use crate::types::Value;

/// Something a descriptor refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Placeholder for the root the descriptor is resolved against.
    RootSlot,
    Value(Value),
    /// A nested descriptor, resolved before its user.
    Deferred(Box<EffectDescriptor>),
}

/// What a descriptor does to its target.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    GetAttr(String),
    Index(Value),
    Invoke,
}

/// An immutable, not-yet-executed call.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectDescriptor {
    target: Operand,
    function: Function,
    args: Vec<Operand>,
    kwargs: Vec<(String, Operand)>,
}

/// What a routine asks its driver to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Call(EffectDescriptor),
    /// Suspend for the given duration, using the root's `sleep`.
    Sleep(Duration),
}

/// Intermediate result of resolving an operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// A reference into the root that has not been applied yet.
    Path(CallPath),
    Value(Value),
}

impl EffectDescriptor {
    pub(crate) fn new(
        target: Operand,
        function: Function,
        args: Vec<Operand>,
        kwargs: Vec<(String, Operand)>,
    ) -> Self {
        Self {
            target,
            function,
            args,
            kwargs,
        }
    }

    pub fn target(&self) -> &Operand {
        &self.target
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn args(&self) -> &[Operand] {
        &self.args
    }

    pub fn kwargs(&self) -> &[(String, Operand)] {
        &self.kwargs
    }

    /// Resolve against a blocking root, performing the call.
    pub fn resolve_blocking<R: BlockingRoot + ?Sized>(self, root: &R) -> Result<Value> {
        let resolved = resolve_descriptor_blocking(self, root)?;
        materialize_blocking(resolved, root)
    }

    /// Resolve against an async root, performing the call.
    pub async fn resolve<R: AsyncRoot + ?Sized>(self, root: &R) -> Result<Value> {
        let resolved = resolve_descriptor(self, root).await?;
        materialize(resolved, root).await
    }
}

impl Effect {
    pub fn resolve_blocking<R: BlockingRoot + ?Sized>(self, root: &R) -> Result<Value> {
        match self {
            Effect::Call(descriptor) => descriptor.resolve_blocking(root),
            Effect::Sleep(duration) => {
                root.sleep(duration);
                Ok(Value::Null)
            }
        }
    }

    pub async fn resolve<R: AsyncRoot + ?Sized>(self, root: &R) -> Result<Value> {
        match self {
            Effect::Call(descriptor) => descriptor.resolve(root).await,
            Effect::Sleep(duration) => {
                root.sleep(duration).await;
                Ok(Value::Null)
            }
        }
    }
}

impl From<EffectDescriptor> for Effect {
    fn from(descriptor: EffectDescriptor) -> Self {
        Effect::Call(descriptor)
    }
}

impl Resolved {
    fn attr(self, name: String) -> Result<Resolved> {
        match self {
            Resolved::Path(path) => Ok(Resolved::Path(path.attr(name))),
            Resolved::Value(value) => value.get_attr(&name).map(Resolved::Value),
        }
    }

    fn index(self, key: Value) -> Result<Resolved> {
        match self {
            Resolved::Path(path) => Ok(Resolved::Path(path.index(key))),
            Resolved::Value(value) => value.index(&key).map(Resolved::Value),
        }
    }
}

fn resolve_operand_blocking<R: BlockingRoot + ?Sized>(
    operand: Operand,
    root: &R,
) -> Result<Resolved> {
    match operand {
        Operand::RootSlot => Ok(Resolved::Path(CallPath::root())),
        Operand::Value(value) => Ok(Resolved::Value(value)),
        Operand::Deferred(inner) => resolve_descriptor_blocking(*inner, root),
    }
}

fn resolve_descriptor_blocking<R: BlockingRoot + ?Sized>(
    descriptor: EffectDescriptor,
    root: &R,
) -> Result<Resolved> {
    let EffectDescriptor {
        target,
        function,
        args,
        kwargs,
    } = descriptor;
    let target = resolve_operand_blocking(target, root)?;
    match function {
        Function::GetAttr(name) => target.attr(name),
        Function::Index(key) => target.index(key),
        Function::Invoke => {
            let mut call_args = CallArgs::new();
            for arg in args {
                let resolved = resolve_operand_blocking(arg, root)?;
                call_args.positional.push(materialize_blocking(resolved, root)?);
            }
            for (name, arg) in kwargs {
                let resolved = resolve_operand_blocking(arg, root)?;
                call_args
                    .keyword
                    .push((name, materialize_blocking(resolved, root)?));
            }
            match target {
                Resolved::Path(path) => root.invoke(&path, call_args).map(Resolved::Value),
                Resolved::Value(value) => Err(ClientError::NotCallable(value.to_string())),
            }
        }
    }
}

fn materialize_blocking<R: BlockingRoot + ?Sized>(resolved: Resolved, root: &R) -> Result<Value> {
    match resolved {
        Resolved::Path(path) => root.read(&path),
        Resolved::Value(value) => Ok(value),
    }
}

fn resolve_operand<'a, R: AsyncRoot + ?Sized>(
    operand: Operand,
    root: &'a R,
) -> BoxFuture<'a, Result<Resolved>> {
    async move {
        match operand {
            Operand::RootSlot => Ok(Resolved::Path(CallPath::root())),
            Operand::Value(value) => Ok(Resolved::Value(value)),
            Operand::Deferred(inner) => resolve_descriptor(*inner, root).await,
        }
    }
    .boxed()
}

fn resolve_descriptor<'a, R: AsyncRoot + ?Sized>(
    descriptor: EffectDescriptor,
    root: &'a R,
) -> BoxFuture<'a, Result<Resolved>> {
    async move {
        let EffectDescriptor {
            target,
            function,
            args,
            kwargs,
        } = descriptor;
        let target = resolve_operand(target, root).await?;
        match function {
            Function::GetAttr(name) => target.attr(name),
            Function::Index(key) => target.index(key),
            Function::Invoke => {
                let mut call_args = CallArgs::new();
                for arg in args {
                    let resolved = resolve_operand(arg, root).await?;
                    call_args.positional.push(materialize(resolved, root).await?);
                }
                for (name, arg) in kwargs {
                    let resolved = resolve_operand(arg, root).await?;
                    call_args
                        .keyword
                        .push((name, materialize(resolved, root).await?));
                }
                match target {
                    Resolved::Path(path) => {
                        root.invoke(&path, call_args).await.map(Resolved::Value)
                    }
                    Resolved::Value(value) => Err(ClientError::NotCallable(value.to_string())),
                }
            }
        }
    }
    .boxed()
}

async fn materialize<R: AsyncRoot + ?Sized>(resolved: Resolved, root: &R) -> Result<Value> {
    match resolved {
        Resolved::Path(path) => root.read(&path).await,
        Resolved::Value(value) => Ok(value),
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::RootSlot => f.write_str("<root>"),
            Operand::Value(value) => write!(f, "{value}"),
            Operand::Deferred(inner) => write!(f, "{inner}"),
        }
    }
}

impl fmt::Display for EffectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.target, &self.function) {
            (Operand::RootSlot, Function::GetAttr(name)) => f.write_str(name),
            (target, Function::GetAttr(name)) => write!(f, "{target}.{name}"),
            (target, Function::Index(key)) => write!(f, "{target}[{key}]"),
            (target, Function::Invoke) => {
                write!(f, "{target}(")?;
                let mut first = true;
                for arg in &self.args {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{arg}")?;
                }
                for (name, arg) in &self.kwargs {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{name}={arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Call(descriptor) => write!(f, "{descriptor}"),
            Effect::Sleep(duration) => write!(f, "sleep({duration:?})"),
        }
    }
}
