use std::io;
use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use wasm_bindgen::JsValue;

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the console subscriber. Later calls are no-ops, so several
/// mounts on one page share it.
pub fn init(level: &str) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .without_time()
            .with_writer(ConsoleWriter::default)
            .try_init();
    });
}

/// Buffers one formatted event and hands it to `console.log` on drop.
#[derive(Default)]
struct ConsoleWriter {
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
        if self.buf.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buf);
        web_sys::console::log_1(&JsValue::from_str(line.trim_end()));
    }
}
