//! Purpose: Turn an `Operation` into a host-callable handler.
//! Exports: `Handler`, `call_operation`, `adapt`.
//! Role: Invocation Adapter; composes unmarshal -> run -> deliver, and the direct return value.
//! Invariants: When a callback is present it is invoked exactly once, on every path.
//! Invariants: Errors never escape the handler; they are delivered or returned as host values.
use std::rc::Rc;

use tracing::{debug, warn};

use crate::core::error::Error;
use crate::marshal::{self, HostValue, Invocation};
use crate::ops::Operation;

/// A handle the host can call with the raw argument list of one invocation.
pub type Handler<V> = Rc<dyn Fn(Vec<V>) -> V>;

/// Run `operation` against host parameters, without touching any callback.
pub fn call_operation<V: HostValue>(
    operation: &dyn Operation,
    params: &[V],
) -> Result<String, Error> {
    let params = marshal::unpack_strings(params)?;
    operation.call(&params)
}

/// Wrap `operation` with the `(error, result)` callback convention.
///
/// The handler's own return value is the raw result on success and the error text
/// on failure, for hosts that read the direct return instead of the callback.
pub fn adapt<V: HostValue>(operation: Rc<dyn Operation>) -> Handler<V> {
    Rc::new(move |args: Vec<V>| {
        let name = operation.name();
        let (params, callback) = match Invocation::new(args).split_callback() {
            Ok(split) => split,
            Err(err) => {
                warn!(operation = name, error = %err, "invocation without a usable callback");
                return V::from_string(err.callback_message());
            }
        };

        let outcome = call_operation(operation.as_ref(), &params);
        match &outcome {
            Ok(result) => debug!(operation = name, bytes = result.len(), "invocation succeeded"),
            Err(err) => warn!(operation = name, error = %err, "invocation failed"),
        }

        if let Err(err) = marshal::complete(&callback, &outcome) {
            warn!(operation = name, error = %err, "completion callback failed");
        }

        match outcome {
            Ok(result) => V::from_string(result),
            Err(err) => V::from_string(err.callback_message()),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::adapt;
    use crate::native::{CallbackLog, NativeValue};
    use crate::ops::{ConvertOperation, ExpressionOperation};

    #[test]
    fn success_calls_back_once_and_returns_result() {
        let handler = adapt::<NativeValue>(Rc::new(ConvertOperation::default()));
        let log = CallbackLog::new();
        let ret = handler(vec![
            NativeValue::string("main.tf"),
            NativeValue::string("a = 1"),
            log.callback(),
        ]);
        assert_eq!(log.single(), Some((None, Some("{\"a\":1}".to_string()))));
        assert_eq!(ret.as_str(), Some("{\"a\":1}"));
    }

    #[test]
    fn missing_arguments_call_back_with_error() {
        let handler = adapt::<NativeValue>(Rc::new(ExpressionOperation::default()));
        let log = CallbackLog::new();
        handler(vec![log.callback()]);
        let (error, result) = log.single().expect("one call");
        assert!(error.expect("error").starts_with("insufficient arguments"));
        assert_eq!(result, None);
    }

    #[test]
    fn non_string_argument_calls_back_with_error() {
        let handler = adapt::<NativeValue>(Rc::new(ConvertOperation::default()));
        let log = CallbackLog::new();
        handler(vec![NativeValue::string("main.tf"), NativeValue::Null, log.callback()]);
        let (error, result) = log.single().expect("one call");
        assert_eq!(error.as_deref(), Some("argument 1 must be a string"));
        assert_eq!(result, None);
    }

    #[test]
    fn missing_callback_returns_error_directly() {
        let handler = adapt::<NativeValue>(Rc::new(ConvertOperation::default()));
        let ret = handler(Vec::new());
        assert!(ret.as_str().expect("text").contains("completion callback"));
    }
}
