//! Purpose: Install named operations where a host can find and call them.
//! Exports: `Namespace`, `Registry`, `register_operations`.
//! Role: Entry-Point Registry; `Registry` is the in-process namespace, wasm32 supplies its own.
//! Invariants: Registration writes the namespace only during startup; handles are never removed.
//! Invariants: Re-installing a name replaces the handle and never fails.
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{info, warn};

use crate::adapter::{self, Handler};
use crate::config::BridgeConfig;
use crate::core::error::{Error, ErrorKind};
use crate::marshal::HostValue;
use crate::ops::{ConvertOperation, ExpressionOperation, Operation};

/// A host-visible container of named, callable handles.
pub trait Namespace<V: HostValue> {
    fn install(&mut self, name: &str, handler: Handler<V>) -> Result<(), Error>;
}

/// In-process namespace for native hosts.
pub struct Registry<V> {
    name: String,
    handlers: BTreeMap<String, Handler<V>>,
}

impl<V: HostValue> Registry<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Call a registered handle with the full argument list (callback last).
    pub fn invoke(&self, name: &str, args: Vec<V>) -> Result<V, Error> {
        let handler = self.handlers.get(name).ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("unknown operation `{name}`"))
                .with_hint(format!(
                    "registered operations: {}",
                    self.names().collect::<Vec<_>>().join(", ")
                ))
        })?;
        Ok(handler(args))
    }
}

impl<V: HostValue> Namespace<V> for Registry<V> {
    fn install(&mut self, name: &str, handler: Handler<V>) -> Result<(), Error> {
        if self.handlers.insert(name.to_string(), handler).is_some() {
            warn!(namespace = %self.name, operation = name, "operation re-registered; previous handle replaced");
        }
        Ok(())
    }
}

/// Install `parse` and `parseExpression`, configured from `config`.
pub fn register_operations<V, N>(namespace: &mut N, config: &BridgeConfig) -> Result<(), Error>
where
    V: HostValue,
    N: Namespace<V> + ?Sized,
{
    let operations: [Rc<dyn Operation>; 2] = [
        Rc::new(ConvertOperation::new(config.convert)),
        Rc::new(ExpressionOperation::new(
            config.expression_label.clone(),
            config.expression_start,
        )),
    ];
    for operation in operations {
        let name = operation.name();
        namespace.install(name, adapter::adapt(operation))?;
        info!(namespace = %config.namespace, operation = name, "operation registered");
    }
    Ok(())
}
