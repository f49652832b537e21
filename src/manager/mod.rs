//! Dialog usage manager
//!
//! Process-wide owner of every in-progress exchange group: routes inbound
//! and outbound messages to the dialog set that owns them, creates UAS sets
//! for new inbound initial requests (after merged-request screening),
//! destroys sets when their emptiness check fires, and holds the
//! collaborators the sets consume: the transport sink, the optional client
//! authentication manager, the merged-request table and the user profile.
//!
//! Dialog sets never reach back into the manager. Each dispatch hands them a
//! [`DumContext`] assembled from the manager's own fields, and they report
//! their liveness back as a [`SetStatus`](crate::dialog_set::SetStatus); the
//! manager drops the registry handle of a set that reports empty, which
//! cascades destruction through the owned tree.

pub mod merged_requests;

pub use merged_requests::{MergedRequestKey, MergedRequestTable};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::{AppDialogSet, AppDialogSetFactory, DefaultAppDialogSetFactory};
use crate::auth::ClientAuthManager;
use crate::creator::BaseCreator;
use crate::dialog::{DialogId, DialogSetId};
use crate::dialog_set::{DialogSet, SetStatus};
use crate::errors::{DialogError, DialogResult};
use crate::sip::{SipMessage, StatusCode};
use crate::usage::UsageKind;

/// Outbound message sink (the transport/transaction layer boundary)
pub trait MessageSink {
    fn send(&mut self, msg: SipMessage);
}

/// Process-wide profile data used when building outbound messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    uri: String,
    display_name: Option<String>,
}

impl UserProfile {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into(), display_name: None }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Host part of the profile URI, used for Call-ID generation
    pub fn host(&self) -> &str {
        self.uri.rsplit('@').next().unwrap_or("localhost")
    }
}

/// Manager services handed to a dialog set for the duration of one call
///
/// Assembled per dispatch from the manager's fields; dialog sets and their
/// children hold no reference to the manager itself.
pub struct DumContext<'a> {
    transport: &'a mut dyn MessageSink,
    client_auth: Option<&'a mut dyn ClientAuthManager>,
    profile: &'a UserProfile,
}

impl<'a> DumContext<'a> {
    pub fn new(
        transport: &'a mut dyn MessageSink,
        client_auth: Option<&'a mut dyn ClientAuthManager>,
        profile: &'a UserProfile,
    ) -> Self {
        Self { transport, client_auth, profile }
    }

    /// Hand a message to the transport layer
    pub fn send(&mut self, msg: SipMessage) {
        debug!("sending {msg}");
        self.transport.send(msg);
    }

    pub fn profile(&self) -> &UserProfile {
        self.profile
    }

    /// The client authentication manager, if one is configured
    pub fn client_auth(&mut self) -> Option<&mut (dyn ClientAuthManager + '_)> {
        match &mut self.client_auth {
            Some(auth) => Some(&mut **auth),
            None => None,
        }
    }
}

/// Process-wide registry and router of dialog sets
pub struct DialogUsageManager {
    profile: UserProfile,
    transport: Box<dyn MessageSink>,
    client_auth: Option<Box<dyn ClientAuthManager>>,
    app_factory: Box<dyn AppDialogSetFactory>,
    merged_requests: MergedRequestTable,
    dialog_sets: HashMap<DialogSetId, DialogSet>,
}

impl DialogUsageManager {
    pub fn new(profile: UserProfile, transport: Box<dyn MessageSink>) -> Self {
        Self {
            profile,
            transport,
            client_auth: None,
            app_factory: Box::new(DefaultAppDialogSetFactory),
            merged_requests: MergedRequestTable::new(),
            dialog_sets: HashMap::new(),
        }
    }

    /// Install a client authentication manager; responses correlated to an
    /// exchange group's original request will be offered to it first.
    pub fn set_client_auth(&mut self, auth: Box<dyn ClientAuthManager>) {
        self.client_auth = Some(auth);
    }

    /// Install the factory producing application hooks for UAS-created sets
    pub fn set_app_dialog_set_factory(&mut self, factory: Box<dyn AppDialogSetFactory>) {
        self.app_factory = factory;
    }

    /// Route one message from the transport layer to the dialog set that
    /// owns it, creating a UAS set for a new inbound initial request.
    ///
    /// Inbound initial requests (no To-tag) are screened against the
    /// merged-request table first: a key hit means the same request arrived
    /// over another fork and is rejected 482 before any routing. The
    /// transaction layer absorbs plain retransmissions, so a same-key
    /// arrival here is a merge.
    pub fn process(&mut self, msg: SipMessage) -> DialogResult<()> {
        if msg.is_request() && msg.is_external() && msg.to_tag().is_none() {
            let key = MergedRequestKey::from_request(&msg)?;
            if self.merged_requests.contains(&key) {
                info!("rejecting merged duplicate request: {msg}");
                let response = SipMessage::response_to(&msg, StatusCode::LoopDetected);
                self.transport.send(response);
                return Ok(());
            }
        }
        let Some(set_id) = self.find_target_set(&msg)? else {
            return self.accept_new(msg);
        };
        self.dispatch_to(&set_id, &msg)
    }

    /// Send an outbound initial request, creating the UAC dialog set that
    /// will own everything spawned from it. Returns the new set's identity.
    pub fn send_request(
        &mut self,
        creator: Box<dyn BaseCreator>,
        app: Box<dyn AppDialogSet>,
    ) -> DialogResult<DialogSetId> {
        let set = DialogSet::uac(creator, app)?;
        let id = set.id().clone();
        if let Some(creator) = set.creator() {
            self.transport.send(creator.last_request().clone());
        }
        self.dialog_sets.insert(id.clone(), set);
        Ok(id)
    }

    /// Cancel every dialog in a set. The set itself survives even when that
    /// leaves it empty: the cancelled flag must stay in place so a dialog
    /// created by a late response is cancelled on arrival, and the final
    /// response of the initial transaction dispatches through the set and
    /// triggers its emptiness check.
    pub fn cancel(&mut self, set_id: &DialogSetId) -> DialogResult<()> {
        let Some(set) = self.dialog_sets.get_mut(set_id) else {
            return Err(DialogError::no_matching_set(format!("cancel: {set_id}")));
        };
        set.cancel();
        Ok(())
    }

    /// A usage finished outside the dispatch path (application ended it);
    /// remove it and let the set die if nothing is left.
    pub fn end_usage(&mut self, set_id: &DialogSetId, kind: UsageKind) -> DialogResult<()> {
        let Some(set) = self.dialog_sets.get_mut(set_id) else {
            return Err(DialogError::no_matching_set(format!("end usage: {set_id}")));
        };
        if set.end_usage(kind) == SetStatus::Empty {
            self.destroy_dialog_set(set_id);
        }
        Ok(())
    }

    /// A dialog terminated outside the dispatch path; remove it and let the
    /// set die if nothing is left.
    pub fn remove_dialog(&mut self, set_id: &DialogSetId, dialog_id: &DialogId) -> DialogResult<()> {
        let Some(set) = self.dialog_sets.get_mut(set_id) else {
            return Err(DialogError::no_matching_set(format!("remove dialog: {set_id}")));
        };
        if set.remove_dialog(dialog_id) == SetStatus::Empty {
            self.destroy_dialog_set(set_id);
        }
        Ok(())
    }

    /// Answer the pending server out-of-dialog request of a set
    pub fn respond_out_of_dialog(
        &mut self,
        set_id: &DialogSetId,
        status: StatusCode,
    ) -> DialogResult<()> {
        let Some(set) = self.dialog_sets.get_mut(set_id) else {
            return Err(DialogError::no_matching_set(format!("respond: {set_id}")));
        };
        let mut ctx = DumContext::new(
            self.transport.as_mut(),
            self.client_auth.as_deref_mut().map(|a| a as &mut dyn ClientAuthManager),
            &self.profile,
        );
        if set.respond_server_out_of_dialog(&mut ctx, status) == SetStatus::Empty {
            self.destroy_dialog_set(set_id);
        }
        Ok(())
    }

    /// Build an error/final response for a request
    pub fn make_response(&self, request: &SipMessage, status: StatusCode) -> SipMessage {
        SipMessage::response_to(request, status)
    }

    /// Hand a message straight to the transport layer
    pub fn send(&mut self, msg: SipMessage) {
        self.transport.send(msg);
    }

    pub fn dialog_set(&self, id: &DialogSetId) -> Option<&DialogSet> {
        self.dialog_sets.get(id)
    }

    pub fn has_dialog_set(&self, id: &DialogSetId) -> bool {
        self.dialog_sets.contains_key(id)
    }

    pub fn dialog_set_count(&self) -> usize {
        self.dialog_sets.len()
    }

    pub fn merged_requests(&self) -> &MergedRequestTable {
        &self.merged_requests
    }

    /// Tear down every dialog set
    pub fn shutdown(&mut self) {
        info!("shutting down, {} dialog sets", self.dialog_sets.len());
        let ids: Vec<DialogSetId> = self.dialog_sets.keys().cloned().collect();
        for id in ids {
            self.destroy_dialog_set(&id);
        }
    }

    /// Find the set owning `msg`. The primary key carries the exchange
    /// group initiator's tag; in-dialog requests arriving at a UAC-created
    /// set carry that tag in To instead, so a miss retries with the To-tag.
    fn find_target_set(&self, msg: &SipMessage) -> DialogResult<Option<DialogSetId>> {
        let id = DialogSetId::from_message(msg)?;
        if self.dialog_sets.contains_key(&id) {
            return Ok(Some(id));
        }
        if msg.is_external() {
            if let Some(to_tag) = msg.to_tag() {
                let alt = DialogSetId::new(msg.call_id(), Some(to_tag.to_string()));
                if self.dialog_sets.contains_key(&alt) {
                    return Ok(Some(alt));
                }
            }
        }
        Ok(None)
    }

    /// No existing set owns `msg`: create a UAS set for an inbound initial
    /// request, reject duplicates and strays.
    fn accept_new(&mut self, msg: SipMessage) -> DialogResult<()> {
        if msg.is_request() && msg.is_external() {
            if msg.to_tag().is_some() {
                // In-dialog request for an exchange we no longer know
                warn!("no dialog set for in-dialog request, answering 481: {msg}");
                let response =
                    SipMessage::response_to(&msg, StatusCode::CallOrTransactionDoesNotExist);
                self.transport.send(response);
                return Ok(());
            }
            let set_id = DialogSetId::from_message(&msg)?;
            let app = self.app_factory.create_app_dialog_set(&msg);
            let set = DialogSet::uas(&msg, app, &mut self.merged_requests)?;
            self.dialog_sets.insert(set_id.clone(), set);
            return self.dispatch_to(&set_id, &msg);
        }
        if msg.is_response() {
            debug!("dropping stray response: {msg}");
            return Ok(());
        }
        // Internally originated request with no set: the caller skipped
        // send_request, which is a routing bug above this layer
        Err(DialogError::no_matching_set(format!(
            "internal request has no dialog set: {msg}"
        )))
    }

    fn dispatch_to(&mut self, set_id: &DialogSetId, msg: &SipMessage) -> DialogResult<()> {
        let Some(set) = self.dialog_sets.get_mut(set_id) else {
            return Err(DialogError::no_matching_set(format!("dispatch: {set_id}")));
        };
        let mut ctx = DumContext::new(
            self.transport.as_mut(),
            self.client_auth.as_deref_mut().map(|a| a as &mut dyn ClientAuthManager),
            &self.profile,
        );
        let status = set.dispatch(&mut ctx, msg)?;
        if status == SetStatus::Empty {
            self.destroy_dialog_set(set_id);
        }
        Ok(())
    }

    /// Drop a set from the registry: unregister its merge key, tear down
    /// its children, then let ownership cascade the rest.
    fn destroy_dialog_set(&mut self, set_id: &DialogSetId) {
        if let Some(mut set) = self.dialog_sets.remove(set_id) {
            set.teardown(&mut self.merged_requests);
        }
    }
}
