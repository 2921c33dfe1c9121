// LogScout - platform/sources/mod.rs
//
// Config-based discovery: recover authoritative log file locations from the
// logging daemons' own configuration files. Every reader goes through the
// `FileSystem` trait with host paths and threads its own `IncludeStack`, so
// the three daemons can be read concurrently.

pub mod include;
pub mod logrotate;
pub mod rsyslog;
pub mod syslog_ng;

use crate::core::model::LogType;

/// Log type for a set of selected facilities. A wildcard, an empty set, or
/// facilities that disagree all register as syslog.
pub(crate) fn log_type_for_facilities<S: AsRef<str>>(facilities: &[S]) -> LogType {
    if facilities.iter().any(|f| f.as_ref() == "*") {
        return LogType::Syslog;
    }
    let mut types = facilities.iter().map(|f| LogType::from_facility(f.as_ref()));
    match types.next() {
        Some(first) if types.all(|t| t == first) => first,
        _ => LogType::Syslog,
    }
}
