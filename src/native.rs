//! Purpose: In-process host value type for native embeddings and tests.
//! Exports: `NativeValue`, `NativeCallback`, `CallbackLog`, `CallbackOutcome`.
//! Role: Lets the bridge run outside a JavaScript runtime with the same calling convention.
//! Invariants: Values are single-threaded (`Rc`), matching the cooperative host model.
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::error::Error;
use crate::marshal::HostValue;

pub type NativeCallback = Rc<dyn Fn(&NativeValue, &NativeValue)>;

#[derive(Clone)]
pub enum NativeValue {
    Null,
    Undefined,
    String(String),
    Callback(NativeCallback),
}

impl NativeValue {
    pub fn string(value: impl Into<String>) -> Self {
        NativeValue::String(value.into())
    }

    pub fn callback(callback: impl Fn(&NativeValue, &NativeValue) + 'static) -> Self {
        NativeValue::Callback(Rc::new(callback))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null => f.write_str("Null"),
            NativeValue::Undefined => f.write_str("Undefined"),
            NativeValue::String(value) => f.debug_tuple("String").field(value).finish(),
            NativeValue::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl HostValue for NativeValue {
    fn null() -> Self {
        NativeValue::Null
    }

    fn from_string(value: String) -> Self {
        NativeValue::String(value)
    }

    fn to_native_string(&self) -> Option<String> {
        self.as_str().map(str::to_string)
    }

    fn is_undefined(&self) -> bool {
        matches!(self, NativeValue::Undefined)
    }

    fn is_callable(&self) -> bool {
        matches!(self, NativeValue::Callback(_))
    }

    fn call2(&self, first: &Self, second: &Self) -> Result<(), Error> {
        match self {
            NativeValue::Callback(callback) => {
                callback(first, second);
                Ok(())
            }
            _ => Err(Error::new(crate::core::error::ErrorKind::Internal)
                .with_message("value is not callable")),
        }
    }
}

/// `(error, result)` as observed by a callback; `None` stands for the null sentinel.
pub type CallbackOutcome = (Option<String>, Option<String>);

/// Records every call made to the callbacks it hands out.
#[derive(Clone, Default)]
pub struct CallbackLog {
    calls: Rc<RefCell<Vec<CallbackOutcome>>>,
}

impl CallbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> NativeValue {
        let calls = Rc::clone(&self.calls);
        NativeValue::callback(move |error, result| {
            calls.borrow_mut().push((
                error.to_native_string(),
                result.to_native_string(),
            ));
        })
    }

    pub fn calls(&self) -> Vec<CallbackOutcome> {
        self.calls.borrow().clone()
    }

    /// The single outcome recorded so far, or `None` if the callback ran zero or several times.
    pub fn single(&self) -> Option<CallbackOutcome> {
        let calls = self.calls.borrow();
        match calls.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        }
    }
}
