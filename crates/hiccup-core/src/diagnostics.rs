//! Recoverable projection problems
//!
//! Neither kind stops a projection. Each is logged at warn level and handed
//! to the configured sink, if any.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hiccup_core_types::schema::EVENT_DIAGNOSTIC;

use crate::errors::HiccupErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Reading a member failed; the member was skipped
    AccessFailure {
        path: String,
        member: String,
        message: String,
    },
    /// A member or key name is not a legal tag; the child was dropped
    InvalidTag { path: String, tag: String },
}

impl Diagnostic {
    pub fn kind(&self) -> HiccupErrorKind {
        match self {
            Diagnostic::AccessFailure { .. } => HiccupErrorKind::AccessFailure,
            Diagnostic::InvalidTag { .. } => HiccupErrorKind::InvalidTag,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Path of the frame the problem was found at
    pub fn path(&self) -> &str {
        match self {
            Diagnostic::AccessFailure { path, .. } | Diagnostic::InvalidTag { path, .. } => path,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AccessFailure {
                path,
                member,
                message,
            } => write!(f, "cannot read member {:?} at {}: {}", member, path, message),
            Diagnostic::InvalidTag { path, tag } => {
                write!(f, "invalid tag {:?} at {}, child dropped", tag, path)
            }
        }
    }
}

/// Receives diagnostics as they occur
pub trait DiagnosticSink {
    fn report(&self, diagnostic: &Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Diagnostic),
{
    fn report(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Sink that keeps every diagnostic; clones share storage
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    items: Rc<RefCell<Vec<Diagnostic>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.items.borrow_mut().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.items.borrow_mut().push(diagnostic.clone());
    }
}

/// Log `diagnostic` and forward it to `sink`
pub(crate) fn emit(sink: Option<&dyn DiagnosticSink>, diagnostic: Diagnostic) {
    tracing::warn!(
        component = module_path!(),
        event = EVENT_DIAGNOSTIC,
        err.code = diagnostic.code(),
        path = diagnostic.path(),
        "{}",
        diagnostic
    );
    if let Some(sink) = sink {
        sink.report(&diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_paths() {
        let access = Diagnostic::AccessFailure {
            path: "/user".to_string(),
            member: "age".to_string(),
            message: "boom".to_string(),
        };
        assert_eq!(access.kind(), HiccupErrorKind::AccessFailure);
        assert_eq!(access.code(), "ERR_ACCESS_FAILURE");
        assert_eq!(access.path(), "/user");
        assert!(access.to_string().contains("boom"));

        let tag = Diagnostic::InvalidTag {
            path: "/map/0".to_string(),
            tag: "0".to_string(),
        };
        assert_eq!(tag.kind(), HiccupErrorKind::InvalidTag);
        assert!(tag.kind().is_recoverable());
    }

    #[test]
    fn test_collecting_sink_clones_share_storage() {
        let sink = CollectingSink::new();
        let handle = sink.clone();
        emit(
            Some(&sink),
            Diagnostic::InvalidTag {
                path: "/".to_string(),
                tag: "1x".to_string(),
            },
        );
        assert_eq!(handle.len(), 1);
        handle.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_closure_sink() {
        let seen = RefCell::new(Vec::new());
        let sink = |d: &Diagnostic| seen.borrow_mut().push(d.code());
        emit(
            Some(&sink),
            Diagnostic::AccessFailure {
                path: "/".to_string(),
                member: "m".to_string(),
                message: "x".to_string(),
            },
        );
        assert_eq!(seen.borrow().as_slice(), ["ERR_ACCESS_FAILURE"]);
    }
}
