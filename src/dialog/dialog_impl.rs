//! Dialog implementation
//!
//! One protocol dialog within a dialog set. The full in-dialog state machine
//! lives above this layer; what the demultiplexer needs from a dialog is the
//! creation/lookup contract, a dispatch entry point, and synchronous
//! cancellation. Dispatch and cancel report whether the dialog survived so
//! the owning set can remove it and run its emptiness check; callers must
//! re-validate instead of holding a reference across those calls.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::AppDialog;
use crate::errors::DialogResult;
use crate::manager::DumContext;
use crate::sip::{Method, SipMessage, StatusCode};

use super::dialog_id::DialogId;

/// Dialog lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogState {
    /// Created, no final response seen yet
    Early,
    /// A success final response established the dialog
    Confirmed,
    /// Torn down; the owning set removes terminated dialogs
    Terminated,
}

/// Whether a dialog survived a dispatch or cancel call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Active,
    Terminated,
}

/// A SIP dialog as owned by a dialog set
pub struct Dialog {
    id: DialogId,
    state: DialogState,
    cancelled: bool,
    app_dialog: Option<Box<dyn AppDialog>>,
}

impl Dialog {
    /// Create a dialog from the message that spawned it.
    ///
    /// Derives the identity from the message; a UAS dialog whose seed carries
    /// no To-tag gets a locally generated tag. Fails if the message lacks the
    /// headers needed to compute an identity at all.
    pub fn new(msg: &SipMessage) -> DialogResult<Self> {
        let mut id = DialogId::from_message(msg)?;
        if id.local_tag().is_none() {
            id.set_local_tag(generate_tag());
        }
        debug!("created dialog {}", id);
        Ok(Self {
            id,
            state: DialogState::Early,
            cancelled: false,
            app_dialog: None,
        })
    }

    pub fn id(&self) -> &DialogId {
        &self.id
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == DialogState::Terminated
    }

    pub fn has_app_dialog(&self) -> bool {
        self.app_dialog.is_some()
    }

    /// Attach the application hook, notifying it of the dialog it now shadows
    pub(crate) fn bind_app_dialog(&mut self, mut app_dialog: Box<dyn AppDialog>) {
        app_dialog.on_dialog_bound(&self.id);
        self.app_dialog = Some(app_dialog);
    }

    /// Process one message addressed to this dialog
    pub fn dispatch(&mut self, ctx: &mut DumContext<'_>, msg: &SipMessage) -> DialogOutcome {
        if let Some(method) = msg.method() {
            match method {
                Method::Bye => {
                    ctx.send(SipMessage::response_to(msg, StatusCode::Ok));
                    self.state = DialogState::Terminated;
                }
                Method::Cancel => {
                    // A CANCEL only kills an unconfirmed dialog; once
                    // confirmed it is answered by the transaction layer and
                    // ignored here
                    if self.state != DialogState::Confirmed {
                        ctx.send(SipMessage::response_to(msg, StatusCode::Ok));
                        self.state = DialogState::Terminated;
                    }
                }
                _ => {}
            }
        } else if let Some(status) = msg.status() {
            match msg.cseq().method() {
                Method::Invite | Method::Subscribe | Method::Refer => {
                    if status.is_success() && self.state == DialogState::Early {
                        debug!("dialog {} confirmed by {}", self.id, status);
                        self.state = DialogState::Confirmed;
                    } else if status.is_failure() {
                        self.state = DialogState::Terminated;
                    }
                }
                _ => {
                    if status.is_failure() {
                        self.state = DialogState::Terminated;
                    }
                }
            }
        }

        self.outcome()
    }

    /// Cancel this dialog. Idempotent; an unconfirmed dialog terminates
    /// synchronously, a confirmed one is unaffected.
    pub fn cancel(&mut self) -> DialogOutcome {
        if !self.cancelled {
            self.cancelled = true;
            if self.state != DialogState::Confirmed {
                debug!("dialog {} terminated by cancel", self.id);
                self.state = DialogState::Terminated;
            }
        }
        self.outcome()
    }

    fn outcome(&self) -> DialogOutcome {
        if self.is_terminated() {
            DialogOutcome::Terminated
        } else {
            DialogOutcome::Active
        }
    }
}

/// Generate a local tag for a UAS dialog
pub(crate) fn generate_tag() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    format!("{:08x}", rng.gen::<u32>())
}
