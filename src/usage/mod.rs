//! Non-dialog usages
//!
//! A usage is any stateful exchange a dialog set owns besides a dialog:
//! registrations, publications, and out-of-dialog requests, each in client
//! and server role. The set owns at most one of each singleton kind plus an
//! ordered list of client out-of-dialog requests.
//!
//! Every usage exposes `dispatch(ctx, msg) -> UsageOutcome`; `Complete`
//! tells the owning set to remove the usage and run its emptiness check.
//! Usage-internal protocol logic beyond that contract lives above this
//! layer.

pub mod out_of_dialog;
pub mod publication;
pub mod registration;

pub use out_of_dialog::{ClientOutOfDialogRequest, ServerOutOfDialogRequest};
pub use publication::{ClientPublication, ServerPublication};
pub use registration::{ClientRegistration, ServerRegistration};

/// Whether a usage survived a dispatch call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageOutcome {
    /// The exchange is still in progress
    Continue,
    /// The exchange finished; the owner removes the usage
    Complete,
}

/// The singleton usage kinds a dialog set owns at most one of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageKind {
    ClientRegistration,
    ServerRegistration,
    ClientPublication,
    ServerPublication,
    ServerOutOfDialog,
}
