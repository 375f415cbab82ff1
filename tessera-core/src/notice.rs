use std::sync::Mutex;

/// Receiver for non-fatal notices raised while deriving configuration.
///
/// The engine does not log on its own for these; it hands them to a sink so
/// the caller decides where they go.
pub trait NoticeSink: Send + Sync {
    /// A deprecated label was used. The resolved value is unaffected.
    fn deprecated_label(&self, service: &str, label: &str, replacement: &str);
}

/// Default sink: structured `tracing` warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotices;

impl NoticeSink for TracingNotices {
    fn deprecated_label(&self, service: &str, label: &str, replacement: &str) {
        tracing::warn!(
            service = %service,
            label = %label,
            replacement = %replacement,
            "Deprecated configuration found, use the replacement label"
        );
    }
}

/// A deprecation notice as captured by [`RecordingNotices`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    pub service: String,
    pub label: String,
    pub replacement: String,
}

/// Sink that keeps every notice in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingNotices {
    seen: Mutex<Vec<Deprecation>>,
}

impl RecordingNotices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices recorded so far.
    pub fn deprecations(&self) -> Vec<Deprecation> {
        self.seen.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl NoticeSink for RecordingNotices {
    fn deprecated_label(&self, service: &str, label: &str, replacement: &str) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(Deprecation {
                service: service.to_string(),
                label: label.to_string(),
                replacement: replacement.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingNotices::new();
        sink.deprecated_label("a", "old", "new");
        sink.deprecated_label("b", "old", "new");
        let seen = sink.deprecations();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].service, "a");
        assert_eq!(seen[1].service, "b");
    }
}
