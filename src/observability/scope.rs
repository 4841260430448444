//! Begin/end logging around one unit of work.
//!
//! `{NAME}_BEGIN` is written on creation, `{NAME}_COMPLETE` or
//! `{NAME}_FAILED` when closed. A scope dropped while open writes
//! `{NAME}_INCOMPLETE`, which only happens on panic.

use super::logger::{Logger, Severity};

/// ```ignore
/// let scope = ObservationScope::with_fields("RESOLVE", &[("table_version", "1")]);
/// scope.complete_with_fields(&[("passes", "3")]);
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    open: bool,
    /// Repeated on every closing line
    context: Vec<(&'a str, String)>,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        Logger::log(Severity::Info, &format!("{}_BEGIN", name), fields);
        Self {
            name,
            open: true,
            context: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
        }
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.close(Severity::Info, "COMPLETE", extra);
    }

    /// Closes the scope as failed at `severity`
    pub fn fail(mut self, severity: Severity, extra: &[(&str, &str)]) {
        self.close(severity, "FAILED", extra);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self, severity: Severity, outcome: &str, extra: &[(&str, &str)]) {
        self.open = false;
        let mut fields: Vec<(&str, &str)> = self.context.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.extend_from_slice(extra);
        Logger::log(severity, &format!("{}_{}", self.name, outcome), &fields);
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if self.open {
            self.close(Severity::Warn, "INCOMPLETE", &[]);
        }
    }
}
