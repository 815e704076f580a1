//! Purpose: Single error type shared by the bridge, its operations, and its hosts.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Role: Carries a stable kind plus human-readable context through every layer.
//! Invariants: Kinds are stable; the callback text is derived only from message + source.
//! Invariants: `Startup` is the only kind that never reaches a completion callback.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Argument,
    Conversion,
    ExpressionParse,
    Serialization,
    Startup,
    Io,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Internal => "Internal",
            ErrorKind::Usage => "Usage",
            ErrorKind::Argument => "Argument",
            ErrorKind::Conversion => "Conversion",
            ErrorKind::ExpressionParse => "ExpressionParse",
            ErrorKind::Serialization => "Serialization",
            ErrorKind::Startup => "Startup",
            ErrorKind::Io => "Io",
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Text delivered through the error slot of a completion callback.
    ///
    /// Never empty: falls back to the kind label when no message was attached.
    pub fn callback_message(&self) -> String {
        let mut text = match &self.message {
            Some(message) if !message.is_empty() => message.clone(),
            _ => default_message(self.kind).to_string(),
        };
        if let Some(source) = &self.source {
            text.push_str(": ");
            text.push_str(&source.to_string());
        }
        text
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

fn default_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::Argument => "insufficient arguments",
        ErrorKind::Conversion => "conversion failed",
        ErrorKind::ExpressionParse => "can not parse expression",
        ErrorKind::Serialization => "can not convert result to JSON",
        ErrorKind::Startup => "startup failed",
        ErrorKind::Io => "io error",
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Argument => 3,
        ErrorKind::Conversion => 4,
        ErrorKind::ExpressionParse => 5,
        ErrorKind::Serialization => 6,
        ErrorKind::Startup => 7,
        ErrorKind::Io => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::Argument, 3),
            (ErrorKind::Conversion, 4),
            (ErrorKind::ExpressionParse, 5),
            (ErrorKind::Serialization, 6),
            (ErrorKind::Startup, 7),
            (ErrorKind::Io, 8),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn callback_message_appends_source() {
        let source = std::io::Error::other("disk on fire");
        let err = Error::new(ErrorKind::Io)
            .with_message("failed to read input")
            .with_source(source);
        assert_eq!(err.callback_message(), "failed to read input: disk on fire");
    }

    #[test]
    fn callback_message_is_never_empty() {
        let err = Error::new(ErrorKind::Argument);
        assert_eq!(err.callback_message(), "insufficient arguments");

        let err = Error::new(ErrorKind::Conversion).with_message("");
        assert_eq!(err.callback_message(), "conversion failed");
    }
}
