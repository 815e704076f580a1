//! Purpose: Install the process-wide tracing subscriber.
//! Exports: `init_tracing`, `ConsoleMakeWriter` (wasm32).
//! Invariants: Logs never go to stdout; native writes stderr, wasm32 writes the host console.
//! Invariants: Installing twice is a no-op; the first subscriber wins.
use tracing_subscriber::EnvFilter;

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(target_arch = "wasm32")]
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_writer(console::ConsoleMakeWriter)
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .try_init();
}

#[cfg(target_arch = "wasm32")]
pub use console::ConsoleMakeWriter;

#[cfg(target_arch = "wasm32")]
mod console {
    use std::io;

    use tracing_subscriber::fmt::MakeWriter;
    use wasm_bindgen::JsValue;

    /// Routes formatted events to `console.log`.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct ConsoleMakeWriter;

    /// Buffers one formatted event and emits it on drop.
    pub struct ConsoleWriter {
        buf: Vec<u8>,
    }

    impl io::Write for ConsoleWriter {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for ConsoleWriter {
        fn drop(&mut self) {
            let line = String::from_utf8_lossy(&self.buf);
            let line = line.trim_end();
            if !line.is_empty() {
                web_sys::console::log_1(&JsValue::from_str(line));
            }
        }
    }

    impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
        type Writer = ConsoleWriter;

        fn make_writer(&'a self) -> Self::Writer {
            ConsoleWriter { buf: Vec::new() }
        }
    }
}
