//! Purpose: Start the bridge, register its operations, and keep serving until the host tears down.
//! Exports: `Lifecycle`, `LifecycleState`, `HostEvent`, `ShutdownReason`, `locate_namespace`.
//! Role: Lifecycle Controller; the only place that moves between lifecycle states.
//! Invariants: NotStarted -> Registering -> Serving -> Stopped; no state is revisited.
//! Invariants: `serve` handles requests one at a time, in delivery order, on the calling thread.
//! Notes: On wasm32 the JavaScript event loop owns the thread; the bridge stays in `Serving`.
use std::fmt;
use std::sync::mpsc::Receiver;

use tracing::{error, info};

use crate::config::BridgeConfig;
use crate::core::error::{Error, ErrorKind};
use crate::marshal::HostValue;
use crate::registry::{self, Namespace};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShutdownReason {
    /// The host's event source went away (stdin EOF, dropped sender).
    HostClosed,
    /// The process received a termination signal.
    Signal(i32),
    /// The host asked for shutdown explicitly.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::HostClosed => f.write_str("host closed"),
            ShutdownReason::Signal(signal) => write!(f, "signal {signal}"),
            ShutdownReason::Requested => f.write_str("shutdown requested"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LifecycleState {
    NotStarted,
    Registering,
    Serving,
    Stopped(ShutdownReason),
}

/// What the host delivers to a serving bridge.
#[derive(Debug)]
pub enum HostEvent<R> {
    Request(R),
    Shutdown(ShutdownReason),
}

/// Find the namespace the host published under `name`.
pub fn locate_namespace<N>(
    name: &str,
    lookup: impl FnOnce(&str) -> Option<N>,
) -> Result<N, Error> {
    lookup(name).ok_or_else(|| {
        error!(namespace = name, "namespace object not found");
        Error::new(ErrorKind::Startup)
            .with_message(format!("namespace object `{name}` not found"))
            .with_hint("The host must define the namespace global before starting the module.")
    })
}

pub struct Lifecycle {
    config: BridgeConfig,
    state: LifecycleState,
}

impl Lifecycle {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            state: LifecycleState::NotStarted,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Register every operation onto `namespace`; afterwards the bridge is serving.
    pub fn start<V, N>(&mut self, namespace: &mut N) -> Result<(), Error>
    where
        V: HostValue,
        N: Namespace<V> + ?Sized,
    {
        if self.state != LifecycleState::NotStarted {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("bridge already started (state: {:?})", self.state)));
        }
        self.state = LifecycleState::Registering;
        if let Err(err) = registry::register_operations(namespace, &self.config) {
            return Err(Error::new(ErrorKind::Startup)
                .with_message("failed to register operations")
                .with_source(err));
        }
        self.state = LifecycleState::Serving;
        info!(namespace = %self.config.namespace, "bridge serving");
        Ok(())
    }

    /// Handle host requests until the host shuts the bridge down.
    ///
    /// A disconnected event source counts as `ShutdownReason::HostClosed`.
    pub fn serve<R>(
        &mut self,
        events: &Receiver<HostEvent<R>>,
        mut handle: impl FnMut(R),
    ) -> Result<ShutdownReason, Error> {
        if self.state != LifecycleState::Serving {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("cannot serve in state {:?}", self.state)));
        }
        let reason = loop {
            match events.recv() {
                Ok(HostEvent::Request(request)) => handle(request),
                Ok(HostEvent::Shutdown(reason)) => break reason,
                Err(_) => break ShutdownReason::HostClosed,
            }
        };
        info!(%reason, "bridge stopped");
        self.state = LifecycleState::Stopped(reason);
        Ok(reason)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::{HostEvent, Lifecycle, LifecycleState, ShutdownReason, locate_namespace};
    use crate::config::BridgeConfig;
    use crate::core::error::ErrorKind;
    use crate::native::NativeValue;
    use crate::registry::Registry;

    fn started() -> (Lifecycle, Registry<NativeValue>) {
        let mut lifecycle = Lifecycle::new(BridgeConfig::default());
        let mut registry = Registry::new("ns");
        lifecycle.start(&mut registry).expect("start");
        (lifecycle, registry)
    }

    #[test]
    fn missing_namespace_is_a_startup_error() {
        let err = locate_namespace::<Registry<NativeValue>>("__missing__", |_| None)
            .err()
            .expect("missing namespace is rejected");
        assert_eq!(err.kind(), ErrorKind::Startup);
        assert!(err.callback_message().contains("__missing__"));
    }

    #[test]
    fn start_moves_to_serving_once() {
        let (mut lifecycle, mut registry) = started();
        assert_eq!(lifecycle.state(), LifecycleState::Serving);
        assert!(registry.contains("parse"));
        assert!(registry.contains("parseExpression"));

        let err = lifecycle.start(&mut registry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn serve_processes_requests_in_order_until_shutdown() {
        let (mut lifecycle, _registry) = started();
        let (tx, rx) = mpsc::channel();
        tx.send(HostEvent::Request(1)).unwrap();
        tx.send(HostEvent::Request(2)).unwrap();
        tx.send(HostEvent::Shutdown(ShutdownReason::Requested)).unwrap();
        tx.send(HostEvent::Request(3)).unwrap();

        let mut seen = Vec::new();
        let reason = lifecycle.serve(&rx, |n| seen.push(n)).expect("serve");
        assert_eq!(reason, ShutdownReason::Requested);
        assert_eq!(seen, [1, 2]);
        assert_eq!(
            lifecycle.state(),
            LifecycleState::Stopped(ShutdownReason::Requested)
        );
    }

    #[test]
    fn dropped_sender_means_host_closed() {
        let (mut lifecycle, _registry) = started();
        let (tx, rx) = mpsc::channel::<HostEvent<()>>();
        drop(tx);
        let reason = lifecycle.serve(&rx, |_| {}).expect("serve");
        assert_eq!(reason, ShutdownReason::HostClosed);
    }

    #[test]
    fn serve_requires_start() {
        let mut lifecycle = Lifecycle::new(BridgeConfig::default());
        let (_tx, rx) = mpsc::channel::<HostEvent<()>>();
        assert!(lifecycle.serve(&rx, |_| {}).is_err());
    }
}
