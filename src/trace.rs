//! Per-invocation diagnostic trace, propagated explicitly through resolver
//! and engine operations instead of living in ambient thread state. Probe
//! tasks capture the sink at construction.

use parking_lot::Mutex;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

const UNNAMED_THREAD: &str = "unnamed-thread";

///
/// [`TraceSink`] collects a timestamped audit trail for one invocation. The
/// handle is cheap to clone and safe to share across probe tasks; a disabled
/// sink records nothing and costs nothing beyond the branch.
#[derive(Clone)]
pub struct TraceSink {
    inner: Option<Arc<TraceInner>>,
}

struct TraceInner {
    label: String,
    started: Instant,
    messages: Mutex<Vec<String>>,
}

impl TraceSink {
    /// A recording sink labeled with the invocation identity.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Some(Arc::new(TraceInner {
                label: label.into(),
                started: Instant::now(),
                messages: Mutex::new(Vec::new()),
            })),
        }
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Appends one trace message. The closure only runs when the sink
    /// records.
    pub fn log(&self, message: impl FnOnce() -> String) {
        if let Some(inner) = &self.inner {
            let thread = std::thread::current();
            let line = format!(
                "{}: +{}ms: {}",
                thread.name().unwrap_or(UNNAMED_THREAD),
                inner.started.elapsed().as_millis(),
                message()
            );
            inner.messages.lock().push(line);
        }
    }

    /// Snapshot of the messages recorded so far.
    pub fn messages(&self) -> Vec<String> {
        match &self.inner {
            Some(inner) => inner.messages.lock().clone(),
            None => Vec::new(),
        }
    }

    /// Renders the audit trail as one block for diagnostic logging.
    pub fn render_audit(&self) -> String {
        let Some(inner) = &self.inner else {
            return String::new();
        };
        let messages = inner.messages.lock();
        let mut out = format!("audit trail for invocation {}", inner.label);
        for (index, message) in messages.iter().enumerate() {
            let _ = write!(out, "\nevent:{index}:{message}");
        }
        out
    }
}

impl Default for TraceSink {
    fn default() -> Self {
        TraceSink::disabled()
    }
}
