//! Analyzer configuration.

/// Tunables for one compilation session.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Diagnostics recorded past this count are dropped.
    pub max_error_reports: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_error_reports: 10,
        }
    }
}
