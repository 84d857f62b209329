use std::fmt::Display;

/// Result of one command
///
/// On failure only `error` is set and nothing was written. On success one
/// of `output` (tables, listings) or `notify` (confirmations) carries the
/// message, optionally with a `warning`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub output: Option<String>,
    pub notify: Option<String>,
    pub warning: Option<String>,
    pub error: Option<String>,
}

impl CommandOutcome {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn notify(text: impl Into<String>) -> Self {
        Self {
            success: true,
            notify: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn failure(message: impl Display) -> Self {
        Self {
            success: false,
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Failure message followed by a listing (e.g. conflicting records)
    pub fn failure_with(message: impl Display, detail: &str) -> Self {
        if detail.is_empty() {
            return Self::failure(message);
        }
        Self::failure(format!("{}\n{}", message, detail))
    }

    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }

    /// Print to stdout/stderr
    pub fn emit(&self) {
        if let Some(text) = &self.output {
            println!("{}", text);
        }
        if let Some(text) = &self.notify {
            println!("{}", text);
        }
        if let Some(text) = &self.warning {
            eprintln!("Warning: {}", text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let ok = CommandOutcome::notify("done").with_warning(Some("careful".to_string()));
        assert!(ok.success);
        assert_eq!(ok.notify.as_deref(), Some("done"));
        assert_eq!(ok.warning.as_deref(), Some("careful"));

        let failed = CommandOutcome::failure_with("conflict", "ID 3");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("conflict\nID 3"));
        assert!(failed.output.is_none());
    }
}
