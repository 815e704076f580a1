//! Purpose: Move values across the host boundary in both directions.
//! Exports: `HostValue`, `Invocation`, `unpack_strings`, `complete`.
//! Role: Value Marshaler; the only code that knows the `(error, result)` callback convention.
//! Invariants: The callback is the last element of an invocation; trailing `undefined` padding is dropped.
//! Invariants: `complete` calls the callback exactly once with exactly one meaningful slot.
use crate::core::error::{Error, ErrorKind};

/// An opaque value owned by the host runtime.
///
/// Implemented for JavaScript values on wasm32 and for [`crate::native::NativeValue`]
/// everywhere else.
pub trait HostValue: Clone + 'static {
    /// The "no error" / "no value" sentinel.
    fn null() -> Self;

    fn from_string(value: String) -> Self;

    /// Native string form of a parameter, if the value has one.
    fn to_native_string(&self) -> Option<String>;

    /// True for the padding value a host passes for missing arguments.
    fn is_undefined(&self) -> bool;

    fn is_callable(&self) -> bool;

    /// Invoke `self` as a two-argument callback.
    fn call2(&self, first: &Self, second: &Self) -> Result<(), Error>;
}

/// Arguments of one host call: operation parameters followed by the completion callback.
#[derive(Clone, Debug)]
pub struct Invocation<V> {
    args: Vec<V>,
}

impl<V: HostValue> Invocation<V> {
    pub fn new(mut args: Vec<V>) -> Self {
        while args.last().is_some_and(|value| value.is_undefined()) {
            args.pop();
        }
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Separate the trailing callback from the operation parameters.
    pub fn split_callback(mut self) -> Result<(Vec<V>, V), Error> {
        let callback = self.args.pop().ok_or_else(|| {
            Error::new(ErrorKind::Argument)
                .with_message("invocation is missing its completion callback")
        })?;
        if !callback.is_callable() {
            return Err(Error::new(ErrorKind::Argument)
                .with_message("last argument must be a completion callback"));
        }
        Ok((self.args, callback))
    }
}

/// Convert operation parameters into native strings.
pub fn unpack_strings<V: HostValue>(params: &[V]) -> Result<Vec<String>, Error> {
    params
        .iter()
        .enumerate()
        .map(|(index, value)| {
            value.to_native_string().ok_or_else(|| {
                Error::new(ErrorKind::Argument)
                    .with_message(format!("argument {index} must be a string"))
            })
        })
        .collect()
}

/// Pack an outcome into the host form of `(error, result)`.
pub fn pack_outcome<V: HostValue>(outcome: &Result<String, Error>) -> (V, V) {
    match outcome {
        Ok(result) => (V::null(), V::from_string(result.clone())),
        Err(err) => (V::from_string(err.callback_message()), V::null()),
    }
}

/// Deliver an outcome through a completion callback.
pub fn complete<V: HostValue>(callback: &V, outcome: &Result<String, Error>) -> Result<(), Error> {
    let (error, result) = pack_outcome::<V>(outcome);
    callback.call2(&error, &result)
}

#[cfg(test)]
mod tests {
    use super::{HostValue, Invocation, complete, unpack_strings};
    use crate::core::error::{Error, ErrorKind};
    use crate::native::{CallbackLog, NativeValue};

    #[test]
    fn trailing_undefined_padding_is_dropped() {
        let log = CallbackLog::new();
        let invocation = Invocation::new(vec![
            NativeValue::string("a"),
            log.callback(),
            NativeValue::Undefined,
            NativeValue::Undefined,
        ]);
        assert_eq!(invocation.len(), 2);
        let (params, callback) = invocation.split_callback().expect("split");
        assert_eq!(params.len(), 1);
        assert!(callback.is_callable());
    }

    #[test]
    fn empty_invocation_has_no_callback() {
        let invocation = Invocation::<NativeValue>::new(vec![NativeValue::Undefined]);
        assert!(invocation.is_empty());
        let err = invocation.split_callback().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn non_callable_tail_is_rejected() {
        let invocation = Invocation::new(vec![NativeValue::string("a"), NativeValue::string("b")]);
        let err = invocation.split_callback().unwrap_err();
        assert!(err.callback_message().contains("completion callback"));
    }

    #[test]
    fn unpack_rejects_non_strings() {
        let err = unpack_strings(&[NativeValue::string("a"), NativeValue::Null]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(err.callback_message(), "argument 1 must be a string");
    }

    #[test]
    fn complete_fills_exactly_one_slot() {
        let log = CallbackLog::new();
        let callback = log.callback();
        complete(&callback, &Ok("{}".to_string())).expect("ok");
        complete(
            &callback,
            &Err(Error::new(ErrorKind::Conversion).with_message("bad")),
        )
        .expect("err");

        let calls = log.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], (None, Some("{}".to_string())));
        assert_eq!(calls[1], (Some("bad".to_string()), None));
    }
}
