//! Purpose: Serve the registered operations over newline-delimited JSON on stdio.
//! Exports: `serve`.
//! Role: Native host for `hcl2json serve`; feeds the lifecycle from stdin and signals.
//! Invariants: stdout only carries responses, one JSON object per request line, in request order.
//! Invariants: stdin EOF, SIGINT and SIGTERM end the loop cleanly.
//! Invariants: Malformed request lines get an error response; they never stop the loop.
use std::io::{self, BufRead, BufWriter, Write};
use std::sync::mpsc::{self, Sender};
use std::thread;

use hcl2json_bridge::config::BridgeConfig;
use hcl2json_bridge::core::error::{Error, ErrorKind};
use hcl2json_bridge::lifecycle::{HostEvent, Lifecycle, ShutdownReason};
use hcl2json_bridge::native::{CallbackLog, NativeValue};
use hcl2json_bridge::registry::Registry;
use serde::Deserialize;
use serde_json::{Value, json};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    op: String,
    #[serde(default)]
    args: Vec<Value>,
}

pub(super) fn serve(config: BridgeConfig) -> Result<ShutdownReason, Error> {
    let (events, inbox) = mpsc::channel();
    spawn_stdin_reader(events.clone())?;
    spawn_signal_listener(events.clone())?;

    let mut registry: Registry<NativeValue> = Registry::new(config.namespace.clone());
    let mut lifecycle = Lifecycle::new(config);
    lifecycle.start(&mut registry)?;

    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    let mut write_failure = None;
    let reason = lifecycle.serve(&inbox, |line: String| {
        if write_failure.is_some() {
            return;
        }
        let response = respond(&registry, &line);
        if let Err(err) = write_json_line(&mut writer, &response) {
            write_failure = Some(err);
            let _ = events.send(HostEvent::Shutdown(ShutdownReason::Requested));
        }
    })?;

    match write_failure {
        Some(err) => Err(err),
        None => Ok(reason),
    }
}

fn spawn_stdin_reader(events: Sender<HostEvent<String>>) -> Result<(), Error> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) if line.trim().is_empty() => continue,
                    Ok(line) => {
                        if events.send(HostEvent::Request(line)).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to read request line");
                        break;
                    }
                }
            }
            let _ = events.send(HostEvent::Shutdown(ShutdownReason::HostClosed));
        })
        .map(|_| ())
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to spawn stdin reader")
                .with_source(err)
        })
}

fn spawn_signal_listener(events: Sender<HostEvent<String>>) -> Result<(), Error> {
    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to install signal handlers")
            .with_source(err)
    })?;
    thread::Builder::new()
        .name("signal-listener".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                debug!(signal, "termination signal received");
                let _ = events.send(HostEvent::Shutdown(ShutdownReason::Signal(signal)));
            }
        })
        .map(|_| ())
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to spawn signal listener")
                .with_source(err)
        })
}

/// Answer one request line.
fn respond(registry: &Registry<NativeValue>, line: &str) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            return response(
                Value::Null,
                Some(format!("invalid request: {err}")),
                None,
            );
        }
    };

    let log = CallbackLog::new();
    let mut args: Vec<NativeValue> = request.args.into_iter().map(host_arg).collect();
    args.push(log.callback());

    match registry.invoke(&request.op, args) {
        Ok(returned) => match log.single() {
            Some((error, result)) => response(request.id, error, result),
            None => response(
                request.id,
                Some(returned.as_str().unwrap_or("operation did not complete").to_string()),
                None,
            ),
        },
        Err(err) => response(request.id, Some(err.callback_message()), None),
    }
}

fn host_arg(value: Value) -> NativeValue {
    match value {
        Value::String(text) => NativeValue::String(text),
        _ => NativeValue::Null,
    }
}

fn response(id: Value, error: Option<String>, result: Option<String>) -> Value {
    json!({ "id": id, "error": error, "result": result })
}

fn write_json_line(writer: &mut impl Write, payload: &Value) -> Result<(), Error> {
    serde_json::to_writer(&mut *writer, payload).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode response")
            .with_source(err)
    })?;
    writer.write_all(b"\n").map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write response")
            .with_source(err)
    })?;
    writer.flush().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to flush response")
            .with_source(err)
    })
}
