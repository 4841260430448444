//! Observability subsystem
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed resolution events
//! - Begin/complete scopes
//!
//! Observability is read-only: nothing here influences resolution results.
//!
//! ```ignore
//! use cfgresolver::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::LegacyCompatAutoEnable, &[("flag", "MBEDTLS_MD_LIGHT")]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a typed event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a typed event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
