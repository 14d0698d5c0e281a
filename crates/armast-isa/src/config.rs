//! Lift configuration.

/// Options for lifting a function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiftConfig {
    /// Attach `[address, annotation]` notes to emitted instructions.
    pub annotate: bool,
    /// Record the address of every emitted instruction in the provenance.
    pub record_spans: bool,
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            annotate: true,
            record_spans: true,
        }
    }
}

impl LiftConfig {
    /// Set whether instructions carry annotations.
    #[must_use]
    pub const fn with_annotations(mut self, enabled: bool) -> Self {
        self.annotate = enabled;
        self
    }

    /// Set whether instruction spans are recorded.
    #[must_use]
    pub const fn with_spans(mut self, enabled: bool) -> Self {
        self.record_spans = enabled;
        self
    }
}
