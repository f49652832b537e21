//! Dialog set: the exchange-group aggregate root
//!
//! A [`DialogSet`] owns every exchange spawned from one initial transaction:
//! zero or more dialogs, at most one of each singleton usage kind
//! (registration and publication in both roles, one pending server
//! out-of-dialog request) and an ordered list of client out-of-dialog
//! requests. Its `dispatch` is the single entry point performing all
//! classification; everything else is lifecycle.
//!
//! ## Liveness contract
//!
//! Mutating calls return a [`SetStatus`]. `Empty` means the non-emptiness
//! invariant no longer holds and the owning registry must drop the set;
//! callers must not retain references across such a call, and should
//! re-fetch through the manager instead. The set never destroys itself.

pub mod classify;

pub use classify::{classify, Route};

use std::collections::HashMap;

use tracing::{debug, info};

use crate::app::AppDialogSet;
use crate::creator::BaseCreator;
use crate::dialog::{Dialog, DialogId, DialogOutcome, DialogSetId};
use crate::errors::DialogResult;
use crate::manager::{DumContext, MergedRequestKey, MergedRequestTable};
use crate::sip::{Method, SipMessage, StatusCode};
use crate::usage::{
    ClientOutOfDialogRequest, ClientPublication, ClientRegistration, ServerOutOfDialogRequest,
    ServerPublication, ServerRegistration, UsageKind, UsageOutcome,
};

/// Whether a dialog set still holds any exchange after a mutating call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetStatus {
    /// At least one exchange remains; the set stays registered
    Alive,
    /// Nothing remains; the owning registry must drop the set
    Empty,
}

/// All exchanges sharing one initial transaction
pub struct DialogSet {
    id: DialogSetId,
    /// Present only for UAS-created sets; unregistered at teardown
    merge_key: Option<MergedRequestKey>,
    dialogs: HashMap<DialogId, Dialog>,
    /// Present only for UAC-created sets
    creator: Option<Box<dyn BaseCreator>>,
    app_dialog_set: Box<dyn AppDialogSet>,
    /// Sticky: every dialog created after a CANCEL is cancelled immediately
    cancelled: bool,
    /// Guards re-entrant emptiness checks during teardown
    destroying: bool,
    client_registration: Option<ClientRegistration>,
    server_registration: Option<ServerRegistration>,
    client_publication: Option<ClientPublication>,
    server_publication: Option<ServerPublication>,
    server_out_of_dialog: Option<ServerOutOfDialogRequest>,
    /// Creation order; stray responses are matched front to back
    client_out_of_dialog_requests: Vec<ClientOutOfDialogRequest>,
}

impl DialogSet {
    /// Create the set owning an outbound initial request (UAC).
    ///
    /// The creator's last request must be internally originated.
    pub fn uac(creator: Box<dyn BaseCreator>, app: Box<dyn AppDialogSet>) -> DialogResult<Self> {
        assert!(
            !creator.last_request().is_external(),
            "UAC dialog set requires an internally originated request"
        );
        let id = DialogSetId::from_message(creator.last_request())?;
        info!("created dialog set (UAC) {}", id);
        Ok(Self {
            id,
            merge_key: None,
            dialogs: HashMap::new(),
            creator: Some(creator),
            app_dialog_set: app,
            cancelled: false,
            destroying: false,
            client_registration: None,
            server_registration: None,
            client_publication: None,
            server_publication: None,
            server_out_of_dialog: None,
            client_out_of_dialog_requests: Vec::new(),
        })
    }

    /// Create the set owning an inbound initial request (UAS), registering
    /// its merge key so a forked duplicate of the request can be recognized
    /// before another set is created for it.
    pub fn uas(
        request: &SipMessage,
        app: Box<dyn AppDialogSet>,
        merged: &mut MergedRequestTable,
    ) -> DialogResult<Self> {
        assert!(
            request.is_request() && request.is_external(),
            "UAS dialog set requires a request received over the wire"
        );
        let id = DialogSetId::from_message(request)?;
        let merge_key = MergedRequestKey::from_request(request)?;
        merged.insert(merge_key.clone());
        info!("created dialog set (UAS) {}", id);
        Ok(Self {
            id,
            merge_key: Some(merge_key),
            dialogs: HashMap::new(),
            creator: None,
            app_dialog_set: app,
            cancelled: false,
            destroying: false,
            client_registration: None,
            server_registration: None,
            client_publication: None,
            server_publication: None,
            server_out_of_dialog: None,
            client_out_of_dialog_requests: Vec::new(),
        })
    }

    pub fn id(&self) -> &DialogSetId {
        &self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn creator(&self) -> Option<&dyn BaseCreator> {
        self.creator.as_deref()
    }

    pub fn merge_key(&self) -> Option<&MergedRequestKey> {
        self.merge_key.as_ref()
    }

    pub fn dialog_count(&self) -> usize {
        self.dialogs.len()
    }

    /// Look up the dialog owning `msg`, if its identity can be computed and
    /// a dialog is registered under it
    pub fn find_dialog(&self, msg: &SipMessage) -> Option<&Dialog> {
        let id = DialogId::from_message(msg).ok()?;
        self.dialogs.get(&id)
    }

    pub fn dialog(&self, id: &DialogId) -> Option<&Dialog> {
        self.dialogs.get(id)
    }

    pub fn dialog_ids(&self) -> impl Iterator<Item = &DialogId> {
        self.dialogs.keys()
    }

    pub fn client_registration(&self) -> Option<&ClientRegistration> {
        self.client_registration.as_ref()
    }

    pub fn server_registration(&self) -> Option<&ServerRegistration> {
        self.server_registration.as_ref()
    }

    pub fn client_publication(&self) -> Option<&ClientPublication> {
        self.client_publication.as_ref()
    }

    pub fn server_publication(&self) -> Option<&ServerPublication> {
        self.server_publication.as_ref()
    }

    pub fn server_out_of_dialog(&self) -> Option<&ServerOutOfDialogRequest> {
        self.server_out_of_dialog.as_ref()
    }

    pub fn client_out_of_dialog_requests(&self) -> &[ClientOutOfDialogRequest] {
        &self.client_out_of_dialog_requests
    }

    /// Process one message belonging to this exchange group.
    ///
    /// Performs authentication retry interception, method-based
    /// classification, lazy usage creation and dialog lookup/creation, in
    /// that order. Protocol-shape errors (headers too broken to compute an
    /// identity) propagate; the set is left as it was.
    pub fn dispatch(&mut self, ctx: &mut DumContext<'_>, msg: &SipMessage) -> DialogResult<SetStatus> {
        // Authentication retry: the original request of this exchange group
        // gets first claim on responses correlated to it. A retransmit
        // consumes the response entirely.
        if msg.is_response() && !self.cancelled {
            if let Some(creator) = self.creator.as_deref_mut() {
                if creator.last_request().method() == Some(msg.cseq().method()) {
                    if let Some(auth) = ctx.client_auth() {
                        if auth.handle(creator.last_request_mut(), msg) {
                            info!("retransmitting original request with credentials");
                            let retry = creator.last_request().clone();
                            ctx.send(retry);
                            return Ok(SetStatus::Alive);
                        }
                    }
                }
            }
        }

        let route = classify(msg.is_request(), msg.cseq().method(), msg.to_tag().is_some());
        debug!("dialog set {} routing {} as {:?}", self.id, msg, route);
        match route {
            Route::Dialog => self.dispatch_to_dialog(ctx, msg),
            Route::ServerRegistration => {
                let usage = self
                    .server_registration
                    .get_or_insert_with(|| ServerRegistration::new(msg.clone()));
                if usage.dispatch(ctx, msg) == UsageOutcome::Complete {
                    self.server_registration = None;
                    return Ok(self.check_empty());
                }
                Ok(SetStatus::Alive)
            }
            Route::ServerPublication => {
                let usage = self
                    .server_publication
                    .get_or_insert_with(|| ServerPublication::new(msg.clone()));
                if usage.dispatch(ctx, msg) == UsageOutcome::Complete {
                    self.server_publication = None;
                    return Ok(self.check_empty());
                }
                Ok(SetStatus::Alive)
            }
            Route::ClientRegistration => {
                if self.client_registration.is_none() {
                    let seed = self.creator_request("client registration");
                    self.client_registration = Some(ClientRegistration::new(seed));
                }
                let usage = match self.client_registration.as_mut() {
                    Some(usage) => usage,
                    None => unreachable!("inserted above"),
                };
                if usage.dispatch(ctx, msg) == UsageOutcome::Complete {
                    self.client_registration = None;
                    return Ok(self.check_empty());
                }
                Ok(SetStatus::Alive)
            }
            Route::ClientPublication => {
                if self.client_publication.is_none() {
                    let seed = self.creator_request("client publication");
                    self.client_publication = Some(ClientPublication::new(seed));
                }
                let usage = match self.client_publication.as_mut() {
                    Some(usage) => usage,
                    None => unreachable!("inserted above"),
                };
                if usage.dispatch(ctx, msg) == UsageOutcome::Complete {
                    self.client_publication = None;
                    return Ok(self.check_empty());
                }
                Ok(SetStatus::Alive)
            }
            Route::ServerOutOfDialog => {
                // Only one inbound out-of-dialog request may be pending at a
                // time; a second one is a routing bug above this layer
                assert!(
                    self.server_out_of_dialog.is_none(),
                    "server out-of-dialog request already pending in set {}",
                    self.id
                );
                let mut usage = ServerOutOfDialogRequest::new(msg.clone());
                let outcome = usage.dispatch(ctx, msg);
                self.server_out_of_dialog = Some(usage);
                if outcome == UsageOutcome::Complete {
                    self.server_out_of_dialog = None;
                    return Ok(self.check_empty());
                }
                Ok(SetStatus::Alive)
            }
            Route::ClientOutOfDialog => {
                let index = self
                    .client_out_of_dialog_requests
                    .iter()
                    .position(|usage| usage.matches(msg));
                let index = match index {
                    Some(index) => index,
                    None => {
                        let seed = self.creator_request("client out-of-dialog request");
                        self.client_out_of_dialog_requests
                            .push(ClientOutOfDialogRequest::new(seed, msg.cseq().clone()));
                        self.client_out_of_dialog_requests.len() - 1
                    }
                };
                let outcome = self.client_out_of_dialog_requests[index].dispatch(ctx, msg);
                if outcome == UsageOutcome::Complete {
                    self.client_out_of_dialog_requests.remove(index);
                    return Ok(self.check_empty());
                }
                Ok(SetStatus::Alive)
            }
        }
    }

    /// Cancel every dialog in this set and mark the set so every dialog
    /// created later is cancelled on arrival. Idempotent at the flag level;
    /// already-cancelled dialogs absorb the repeat.
    ///
    /// Deliberately no emptiness check here: a set left empty by
    /// cancellation must survive with its flag set until the initial
    /// transaction's final response dispatches through it.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        let mut dead = Vec::new();
        for (id, dialog) in self.dialogs.iter_mut() {
            if dialog.cancel() == DialogOutcome::Terminated {
                dead.push(id.clone());
            }
        }
        for id in dead {
            self.dialogs.remove(&id);
        }
    }

    /// Remove a dialog that terminated outside the dispatch path
    pub fn remove_dialog(&mut self, id: &DialogId) -> SetStatus {
        let removed = self.dialogs.remove(id).is_some();
        assert!(removed, "removing nonexistent dialog {id}");
        self.check_empty()
    }

    /// Remove a singleton usage that finished outside the dispatch path
    pub fn end_usage(&mut self, kind: UsageKind) -> SetStatus {
        let present = match kind {
            UsageKind::ClientRegistration => self.client_registration.take().is_some(),
            UsageKind::ServerRegistration => self.server_registration.take().is_some(),
            UsageKind::ClientPublication => self.client_publication.take().is_some(),
            UsageKind::ServerPublication => self.server_publication.take().is_some(),
            UsageKind::ServerOutOfDialog => self.server_out_of_dialog.take().is_some(),
        };
        assert!(present, "ending nonexistent usage {kind:?} in set {}", self.id);
        self.check_empty()
    }

    /// Answer the pending inbound out-of-dialog request and retire it
    pub fn respond_server_out_of_dialog(
        &mut self,
        ctx: &mut DumContext<'_>,
        status: StatusCode,
    ) -> SetStatus {
        let usage = self
            .server_out_of_dialog
            .as_mut()
            .unwrap_or_else(|| panic!("no pending out-of-dialog request in set {}", self.id));
        if usage.respond(ctx, status) == UsageOutcome::Complete {
            self.server_out_of_dialog = None;
        }
        self.check_empty()
    }

    /// The emptiness check: reports `Empty` when no dialog and no usage
    /// remains, so the owning registry can drop the set. No-op (always
    /// `Alive`) while the set is already tearing down.
    pub fn check_empty(&self) -> SetStatus {
        if self.destroying {
            return SetStatus::Alive;
        }
        let empty = self.dialogs.is_empty()
            && self.client_out_of_dialog_requests.is_empty()
            && self.client_registration.is_none()
            && self.server_registration.is_none()
            && self.client_publication.is_none()
            && self.server_publication.is_none()
            && self.server_out_of_dialog.is_none();
        if empty {
            SetStatus::Empty
        } else {
            SetStatus::Alive
        }
    }

    /// Teardown, called by the registry as it drops the set: unregister the
    /// merge key, then release children while `destroying` shields any
    /// re-entrant emptiness check.
    pub(crate) fn teardown(&mut self, merged: &mut MergedRequestTable) {
        self.destroying = true;
        if let Some(key) = self.merge_key.take() {
            merged.remove(&key);
        }
        self.creator = None;
        self.dialogs.clear();
        self.client_registration = None;
        self.server_registration = None;
        self.client_publication = None;
        self.server_publication = None;
        self.server_out_of_dialog = None;
        self.client_out_of_dialog_requests.clear();
        info!("destroyed dialog set {}", self.id);
    }

    /// Dialog-owned traffic: look up the dialog, broadcast unmatched
    /// CANCELs, create a dialog for anything else, then dispatch.
    fn dispatch_to_dialog(
        &mut self,
        ctx: &mut DumContext<'_>,
        msg: &SipMessage,
    ) -> DialogResult<SetStatus> {
        let lookup_id = DialogId::from_message(msg)?;
        let mut dialog_id = self
            .dialogs
            .contains_key(&lookup_id)
            .then(|| lookup_id.clone());

        if dialog_id.is_none() {
            if msg.method() == Some(&Method::Cancel) {
                // A CANCEL racing dialog creation must reach every candidate
                // leg; it never creates a dialog of its own
                debug!("broadcasting unmatched CANCEL to {} dialogs", self.dialogs.len());
                let mut dead = Vec::new();
                for (id, dialog) in self.dialogs.iter_mut() {
                    if dialog.dispatch(ctx, msg) == DialogOutcome::Terminated {
                        dead.push(id.clone());
                    }
                }
                for id in dead {
                    self.dialogs.remove(&id);
                }
                return Ok(self.check_empty());
            }

            debug!("creating dialog from {}", msg);
            let mut dialog = Dialog::new(msg)?;
            let new_id = dialog.id().clone();
            if self.cancelled {
                // Cancellation may kill the newcomer synchronously; re-look
                // up by the message identity rather than trusting new_id
                if dialog.cancel() == DialogOutcome::Active {
                    self.dialogs.insert(new_id, dialog);
                }
                dialog_id = self
                    .dialogs
                    .contains_key(&lookup_id)
                    .then(|| lookup_id.clone());
            } else {
                let app_dialog = self.app_dialog_set.create_app_dialog(msg);
                dialog.bind_app_dialog(app_dialog);
                self.dialogs.insert(new_id.clone(), dialog);
                dialog_id = Some(new_id);
            }
        }

        if let Some(id) = dialog_id {
            if let Some(dialog) = self.dialogs.get_mut(&id) {
                if dialog.dispatch(ctx, msg) == DialogOutcome::Terminated {
                    self.dialogs.remove(&id);
                }
            }
        } else if msg.is_request() {
            // Late traffic for a dialog that no longer (or never) existed
            ctx.send(SipMessage::response_to(
                msg,
                StatusCode::CallOrTransactionDoesNotExist,
            ));
        }
        Ok(self.check_empty())
    }

    /// Client usages are seeded from the original outbound request; a set
    /// without a creator receiving client traffic is a routing bug.
    fn creator_request(&self, needed_by: &str) -> SipMessage {
        match self.creator.as_deref() {
            Some(creator) => creator.last_request().clone(),
            None => panic!("{needed_by} requires a creator in set {}", self.id),
        }
    }
}
