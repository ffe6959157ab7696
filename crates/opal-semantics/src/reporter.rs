//! Diagnostic accumulation.

use opal_syntax::Location;

use crate::config::CompilerConfig;
use crate::error::{CompileError, SemanticErrorKind};

/// Collects diagnostics in source order, capped at the configured limit.
///
/// The cap bounds the amount of noise one broken file can produce; reports
/// past the limit are counted but dropped.
#[derive(Debug)]
pub struct Reporter {
    errors: Vec<CompileError>,
    source_file: String,
    max_reports: usize,
    dropped: usize,
}

impl Reporter {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            errors: Vec::new(),
            source_file: String::new(),
            max_reports: config.max_error_reports,
            dropped: 0,
        }
    }

    /// Set the file attributed to subsequent reports.
    pub fn set_source_file(&mut self, file: &str) {
        self.source_file = file.to_string();
    }

    pub fn report(&mut self, kind: SemanticErrorKind, location: Location) {
        if self.errors.len() >= self.max_reports {
            self.dropped += 1;
            return;
        }
        self.errors.push(CompileError {
            kind,
            location,
            source_file: self.source_file.clone(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len() + self.dropped
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<CompileError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_are_capped() {
        let config = CompilerConfig {
            max_error_reports: 2,
        };
        let mut reporter = Reporter::new(&config);
        reporter.set_source_file("a.opl");
        for i in 0..5 {
            reporter.report(
                SemanticErrorKind::VariableNotFound {
                    name: format!("v{i}"),
                },
                Location::new(1, i + 1),
            );
        }
        assert_eq!(reporter.errors().len(), 2);
        assert_eq!(reporter.error_count(), 5);
        assert_eq!(reporter.errors()[0].source_file, "a.opl");
    }
}
