//! # dum-core
//!
//! Dialog/usage demultiplexing core of a SIP user agent stack.
//!
//! Given a message delivered by the transaction layer, this crate decides
//! which in-progress protocol exchange owns it, creates new exchanges when
//! needed, and manages their lifetime:
//!
//! - [`DialogUsageManager`]: process-wide registry routing messages to the
//!   exchange group ([`DialogSet`]) that owns them, screening inbound
//!   initial requests against the merged-request table
//! - [`DialogSet`]: owns every exchange sharing one initial transaction
//!   (dialogs plus the non-dialog usages: registration, publication,
//!   out-of-dialog requests) and performs all message classification
//! - [`Dialog`]: one protocol dialog, created and looked up by the set
//! - usages ([`usage`]): the non-dialog exchange kinds, client and server
//!   role each
//!
//! ## Ownership and liveness
//!
//! Ownership is strictly tree-shaped: the manager owns the sets, a set owns
//! its dialogs, usages, creator and application hook. Nothing holds a back
//! reference; manager services reach the tree as a per-dispatch
//! [`DumContext`]. A set never destroys itself: mutating calls report
//! [`SetStatus::Empty`](dialog_set::SetStatus) when the last exchange is
//! gone and the manager drops the set, cascading destruction.
//!
//! ## Threading
//!
//! Single logical thread of control: dispatch, creation and destruction all
//! happen synchronously inside one message-processing step driven by an
//! external event loop. Messages for one set are processed strictly in
//! delivery order. The hazard here is re-entrancy, not concurrency, and the
//! liveness contract above is how it is handled.

pub mod app;
pub mod auth;
pub mod creator;
pub mod dialog;
pub mod dialog_set;
pub mod errors;
pub mod manager;
pub mod sip;
pub mod usage;

// Re-export main types
pub use app::{
    AppDialog, AppDialogSet, AppDialogSetFactory, DefaultAppDialog, DefaultAppDialogSet,
    DefaultAppDialogSetFactory,
};
pub use auth::ClientAuthManager;
pub use creator::{BaseCreator, RequestCreator};
pub use dialog::{Dialog, DialogId, DialogOutcome, DialogSetId, DialogState};
pub use dialog_set::{DialogSet, SetStatus};
pub use errors::{DialogError, DialogResult};
pub use manager::{
    DialogUsageManager, DumContext, MergedRequestKey, MergedRequestTable, MessageSink, UserProfile,
};
pub use sip::{CSeq, Method, SipMessage, StatusCode};
pub use usage::{UsageKind, UsageOutcome};
