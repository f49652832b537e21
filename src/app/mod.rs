//! Application hook objects
//!
//! Embedding applications observe and influence exchange behavior through a
//! pair of hook objects: one [`AppDialogSet`] per dialog set, created with
//! the set, and one [`AppDialog`] per dialog, obtained from the set's hook
//! via its factory method exactly once per newly created dialog.
//!
//! Default no-op implementations are provided for applications that do not
//! need per-exchange context.

use crate::dialog::DialogId;
use crate::sip::SipMessage;

/// Per-dialog application hook
pub trait AppDialog {
    /// Called once when the hook is attached to its freshly created dialog
    fn on_dialog_bound(&mut self, _id: &DialogId) {}
}

/// Per-dialog-set application hook and dialog-hook factory
pub trait AppDialogSet {
    /// Produce the hook for a dialog about to be created from `msg`.
    /// Invoked exactly once per new dialog.
    fn create_app_dialog(&mut self, msg: &SipMessage) -> Box<dyn AppDialog>;
}

/// Factory producing the per-set hook for UAS-created dialog sets
pub trait AppDialogSetFactory {
    /// Produce the hook for a dialog set about to be created from `msg`
    fn create_app_dialog_set(&mut self, msg: &SipMessage) -> Box<dyn AppDialogSet>;
}

/// No-op dialog hook
pub struct DefaultAppDialog;

impl AppDialog for DefaultAppDialog {}

/// Dialog-set hook producing no-op dialog hooks
pub struct DefaultAppDialogSet;

impl AppDialogSet for DefaultAppDialogSet {
    fn create_app_dialog(&mut self, _msg: &SipMessage) -> Box<dyn AppDialog> {
        Box::new(DefaultAppDialog)
    }
}

/// Factory producing [`DefaultAppDialogSet`] hooks
pub struct DefaultAppDialogSetFactory;

impl AppDialogSetFactory for DefaultAppDialogSetFactory {
    fn create_app_dialog_set(&mut self, _msg: &SipMessage) -> Box<dyn AppDialogSet> {
        Box::new(DefaultAppDialogSet)
    }
}
