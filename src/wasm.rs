//! Purpose: JavaScript host glue: value marshaling, namespace installation, module start.
//! Exports: `JsNamespace`, `start` (the wasm start function).
//! Role: Host adapter for wasm32; everything else in the crate is host-agnostic.
//! Invariants: Installed closures are leaked on purpose; the namespace keeps them callable for the
//! lifetime of the module instance.
//! Notes: Closures take four fixed arguments; JavaScript pads missing ones with `undefined`.
//! Notes: Test builds do not register `start` as the module start hook; tests call it directly.
use js_sys::{Function, Object, Reflect};
use tracing::error;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::adapter::Handler;
use crate::config::BridgeConfig;
use crate::core::error::{Error, ErrorKind};
use crate::lifecycle::{Lifecycle, locate_namespace};
use crate::logging;
use crate::marshal::HostValue;
use crate::registry::Namespace;

impl HostValue for JsValue {
    fn null() -> Self {
        JsValue::NULL
    }

    fn from_string(value: String) -> Self {
        JsValue::from(value)
    }

    fn to_native_string(&self) -> Option<String> {
        self.as_string()
    }

    fn is_undefined(&self) -> bool {
        JsValue::is_undefined(self)
    }

    fn is_callable(&self) -> bool {
        self.is_function()
    }

    fn call2(&self, first: &Self, second: &Self) -> Result<(), Error> {
        let function = self.dyn_ref::<Function>().ok_or_else(|| {
            Error::new(ErrorKind::Argument).with_message("completion callback is not a function")
        })?;
        function
            .call2(&JsValue::NULL, first, second)
            .map(|_| ())
            .map_err(|thrown| {
                Error::new(ErrorKind::Internal)
                    .with_message(format!("completion callback threw: {thrown:?}"))
            })
    }
}

/// The host-provided namespace object that receives the operation closures.
pub struct JsNamespace {
    object: Object,
}

impl JsNamespace {
    /// Look up `name` on the global object.
    pub fn lookup(name: &str) -> Option<Self> {
        let value = Reflect::get(&js_sys::global(), &JsValue::from_str(name)).ok()?;
        if value.is_object() || value.is_function() {
            Some(Self {
                object: value.unchecked_into(),
            })
        } else {
            None
        }
    }
}

type HostClosure = dyn Fn(JsValue, JsValue, JsValue, JsValue) -> JsValue;

impl Namespace<JsValue> for JsNamespace {
    fn install(&mut self, name: &str, handler: Handler<JsValue>) -> Result<(), Error> {
        let closure = Closure::wrap(Box::new(
            move |a: JsValue, b: JsValue, c: JsValue, d: JsValue| handler(vec![a, b, c, d]),
        ) as Box<HostClosure>);
        Reflect::set(
            &self.object,
            &JsValue::from_str(name),
            closure.as_ref().unchecked_ref(),
        )
        .map_err(|thrown| {
            Error::new(ErrorKind::Startup)
                .with_message(format!("cannot install `{name}` on the namespace: {thrown:?}"))
        })?;
        closure.forget();
        Ok(())
    }
}

/// Module entry point; runs once when the host instantiates the module.
///
/// Returning keeps the instance alive: the host's event loop owns the thread, and the
/// installed closures serve every later call.
#[cfg_attr(not(test), wasm_bindgen(start))]
pub fn start() -> Result<(), JsValue> {
    let config = BridgeConfig::default();
    logging::init_tracing(&config.log_filter);

    let namespace_name = config.namespace.clone();
    let mut lifecycle = Lifecycle::new(config);
    let started = locate_namespace(&namespace_name, JsNamespace::lookup)
        .and_then(|mut namespace| lifecycle.start(&mut namespace));

    started.map_err(|err| {
        error!(error = %err, "bridge failed to start");
        JsValue::from_str(&err.to_string())
    })
}
