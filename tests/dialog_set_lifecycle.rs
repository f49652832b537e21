//! Lifecycle tests
//!
//! Creation, cancellation, merged-request screening and the emptiness-check
//! driven destruction of dialog sets, observed through the manager's
//! registry and the merged-request table.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use dum_core::{
    AppDialog, AppDialogSet, CSeq, DefaultAppDialog, DialogSetId, DialogState,
    DialogUsageManager, MessageSink, Method, RequestCreator, SipMessage, StatusCode, UsageKind,
    UserProfile,
};

#[derive(Clone, Default)]
struct TestSink {
    sent: Rc<RefCell<Vec<SipMessage>>>,
}

impl TestSink {
    fn sent(&self) -> Vec<SipMessage> {
        self.sent.borrow().clone()
    }
}

impl MessageSink for TestSink {
    fn send(&mut self, msg: SipMessage) {
        self.sent.borrow_mut().push(msg);
    }
}

fn manager() -> (DialogUsageManager, TestSink) {
    let _ = tracing_subscriber::fmt::try_init();
    let sink = TestSink::default();
    let dum = DialogUsageManager::new(
        UserProfile::new("sip:alice@example.com"),
        Box::new(sink.clone()),
    );
    (dum, sink)
}

fn inbound_invite(call_id: &str, from_tag: &str) -> SipMessage {
    SipMessage::request(Method::Invite, call_id)
        .with_from_tag(from_tag)
        .received()
}

/// A UAS set registers its merge key at creation; terminating its only
/// dialog destroys the set and unregisters the key
#[test]
fn last_dialog_death_destroys_set_and_merge_key() {
    let (mut dum, sink) = manager();

    dum.process(inbound_invite("call-1", "alice")).unwrap();
    let set_id = DialogSetId::new("call-1", Some("alice".into()));
    let set = dum.dialog_set(&set_id).unwrap();
    assert_eq!(set.dialog_count(), 1);
    assert!(set.merge_key().is_some());
    assert_eq!(dum.merged_requests().len(), 1);

    // The UAS dialog generated its local tag; the peer's BYE carries it in To
    let local_tag = set.dialog_ids().next().unwrap().local_tag().unwrap().to_string();
    let bye = SipMessage::request(Method::Bye, "call-1")
        .with_from_tag("alice")
        .with_to_tag(local_tag)
        .with_cseq_seq(2)
        .received();
    dum.process(bye).unwrap();

    assert!(!dum.has_dialog_set(&set_id));
    assert!(dum.merged_requests().is_empty());
    // The BYE was answered before the teardown
    let last = sink.sent().last().cloned().unwrap();
    assert_eq!(last.status(), Some(StatusCode::Ok));
    assert_eq!(last.cseq(), &CSeq::new(2, Method::Bye));
}

/// Removing the only dialog through the manager fires the emptiness check
#[test]
fn removing_last_dialog_fires_emptiness_check() {
    let (mut dum, _sink) = manager();

    dum.process(inbound_invite("call-d", "alice")).unwrap();
    let set_id = DialogSetId::new("call-d", Some("alice".into()));
    let dialog_id = dum
        .dialog_set(&set_id)
        .unwrap()
        .dialog_ids()
        .next()
        .cloned()
        .unwrap();

    dum.remove_dialog(&set_id, &dialog_id).unwrap();
    assert!(!dum.has_dialog_set(&set_id));
    assert!(dum.merged_requests().is_empty());
}

/// A CANCEL matching no dialog by identity is broadcast to every dialog and
/// creates none
#[test]
fn unmatched_cancel_broadcasts_and_creates_no_dialog() {
    let (mut dum, sink) = manager();

    dum.process(inbound_invite("call-c", "alice")).unwrap();
    let set_id = DialogSetId::new("call-c", Some("alice".into()));
    assert_eq!(dum.dialog_set(&set_id).unwrap().dialog_count(), 1);

    // CANCEL has no To-tag, so identity lookup misses the tagged dialog
    let cancel = SipMessage::request(Method::Cancel, "call-c")
        .with_from_tag("alice")
        .with_cseq_method(Method::Cancel)
        .received();
    dum.process(cancel).unwrap();

    // The early dialog died to the broadcast, emptying the set; the CANCEL
    // itself spawned nothing
    assert!(!dum.has_dialog_set(&set_id));
    assert!(dum.merged_requests().is_empty());
    let last = sink.sent().last().cloned().unwrap();
    assert_eq!(last.status(), Some(StatusCode::Ok));
    assert_eq!(last.cseq().method(), &Method::Cancel);
}

/// Cancelling a set kills its early dialogs once; a second cancel iterates
/// whatever is left and changes nothing
#[test]
fn cancel_kills_early_dialogs_and_repeats_harmlessly() {
    let (mut dum, _sink) = manager();

    dum.process(inbound_invite("cxl-call", "alice")).unwrap();
    let set_id = DialogSetId::new("cxl-call", Some("alice".into()));
    assert_eq!(dum.dialog_set(&set_id).unwrap().dialog_count(), 1);

    dum.cancel(&set_id).unwrap();
    let set = dum.dialog_set(&set_id).unwrap();
    assert!(set.is_cancelled());
    assert_eq!(set.dialog_count(), 0);

    // Re-cancel: the flag is already set and there is nothing left to kill
    dum.cancel(&set_id).unwrap();
    let set = dum.dialog_set(&set_id).unwrap();
    assert!(set.is_cancelled());
    assert_eq!(set.dialog_count(), 0);
}

/// A confirmed dialog outlives cancellation; cancelling again is absorbed by
/// the already-cancelled dialog
#[test]
fn cancel_spares_confirmed_dialogs() {
    let (mut dum, _sink) = manager();

    let creator = RequestCreator::from_request(
        SipMessage::request(Method::Invite, "conf-call").with_from_tag("alice"),
    );
    let set_id = dum
        .send_request(Box::new(creator), Box::new(dum_core::DefaultAppDialogSet))
        .unwrap();

    let ok = SipMessage::response(StatusCode::Ok, "conf-call", CSeq::new(1, Method::Invite))
        .with_from_tag("alice")
        .with_to_tag("bob")
        .received();
    dum.process(ok).unwrap();

    for _ in 0..2 {
        dum.cancel(&set_id).unwrap();
        let set = dum.dialog_set(&set_id).unwrap();
        assert!(set.is_cancelled());
        assert_eq!(set.dialog_count(), 1);
        let dialog_id = set.dialog_ids().next().unwrap();
        assert_eq!(set.dialog(dialog_id).unwrap().state(), DialogState::Confirmed);
    }
}

/// After cancel(), a dialog created by a late response is cancelled before
/// classification ever sees it
#[test]
fn cancelled_set_kills_late_created_dialogs() {
    let (mut dum, sink) = manager();

    let created = Rc::new(Cell::new(0));
    struct CountingAppDialogSet {
        created: Rc<Cell<usize>>,
    }
    impl AppDialogSet for CountingAppDialogSet {
        fn create_app_dialog(&mut self, _msg: &SipMessage) -> Box<dyn AppDialog> {
            self.created.set(self.created.get() + 1);
            Box::new(DefaultAppDialog)
        }
    }

    let creator = RequestCreator::from_request(
        SipMessage::request(Method::Invite, "late-call").with_from_tag("alice"),
    );
    let set_id = dum
        .send_request(
            Box::new(creator),
            Box::new(CountingAppDialogSet { created: created.clone() }),
        )
        .unwrap();

    dum.cancel(&set_id).unwrap();
    assert!(dum.dialog_set(&set_id).unwrap().is_cancelled());

    // The forked leg answers anyway; its dialog must die on arrival
    let ringing =
        SipMessage::response(StatusCode::Ringing, "late-call", CSeq::new(1, Method::Invite))
            .with_from_tag("alice")
            .with_to_tag("bob")
            .received();
    dum.process(ringing).unwrap();

    // No hook ran, no dialog survived, and the now-empty set was destroyed
    assert_eq!(created.get(), 0);
    assert!(!dum.has_dialog_set(&set_id));
    // Nothing beyond the original INVITE went out (responses are not 481'd)
    assert_eq!(sink.sent().len(), 1);
}

/// The same initial request arriving over a second fork is rejected 482
/// before any set is touched
#[test]
fn merged_duplicate_request_is_rejected() {
    let (mut dum, sink) = manager();

    dum.process(inbound_invite("fork-call", "alice")).unwrap();
    let set_id = DialogSetId::new("fork-call", Some("alice".into()));
    assert_eq!(dum.dialog_set_count(), 1);
    let dialogs_before = dum.dialog_set(&set_id).unwrap().dialog_count();

    dum.process(inbound_invite("fork-call", "alice")).unwrap();

    let last = sink.sent().last().cloned().unwrap();
    assert_eq!(last.status(), Some(StatusCode::LoopDetected));
    assert_eq!(dum.dialog_set_count(), 1);
    assert_eq!(dum.dialog_set(&set_id).unwrap().dialog_count(), dialogs_before);
    assert_eq!(dum.merged_requests().len(), 1);
}

/// An in-dialog request for an exchange nobody knows gets a 481, and no set
/// is created for it
#[test]
fn unmatched_in_dialog_request_gets_481() {
    let (mut dum, sink) = manager();

    let bye = SipMessage::request(Method::Bye, "ghost-call")
        .with_from_tag("x")
        .with_to_tag("y")
        .received();
    dum.process(bye).unwrap();

    assert_eq!(dum.dialog_set_count(), 0);
    let last = sink.sent().last().cloned().unwrap();
    assert_eq!(last.status(), Some(StatusCode::CallOrTransactionDoesNotExist));
}

/// Stray responses with no owning set are dropped without error
#[test]
fn stray_response_is_dropped() {
    let (mut dum, sink) = manager();

    let stray = SipMessage::response(StatusCode::Ok, "ghost-call", CSeq::new(1, Method::Options))
        .with_from_tag("nobody")
        .received();
    dum.process(stray).unwrap();

    assert_eq!(dum.dialog_set_count(), 0);
    assert!(sink.sent().is_empty());
}

/// Ending a usage through the manager destroys a set left empty by it
#[test]
fn ending_last_usage_destroys_set() {
    let (mut dum, _sink) = manager();

    let register = SipMessage::request(Method::Register, "reg-call")
        .with_from_tag("ua1")
        .received();
    dum.process(register).unwrap();
    let set_id = DialogSetId::new("reg-call", Some("ua1".into()));
    assert!(dum.dialog_set(&set_id).unwrap().server_registration().is_some());

    dum.end_usage(&set_id, UsageKind::ServerRegistration).unwrap();
    assert!(!dum.has_dialog_set(&set_id));
    assert!(dum.merged_requests().is_empty());
}

/// Shutdown drains every set and the merge table
#[test]
fn shutdown_drains_registry_and_merge_table() {
    let (mut dum, _sink) = manager();

    dum.process(inbound_invite("call-a", "alice")).unwrap();
    dum.process(
        SipMessage::request(Method::Register, "call-b")
            .with_from_tag("bob")
            .received(),
    )
    .unwrap();
    assert_eq!(dum.dialog_set_count(), 2);
    assert_eq!(dum.merged_requests().len(), 2);

    dum.shutdown();
    assert_eq!(dum.dialog_set_count(), 0);
    assert!(dum.merged_requests().is_empty());
}

/// Manager operations on unknown sets are routing errors, not panics
#[test]
fn operations_on_unknown_sets_error() {
    let (mut dum, _sink) = manager();
    let ghost = DialogSetId::new("ghost", Some("tag".into()));
    assert!(dum.cancel(&ghost).is_err());
    assert!(dum.end_usage(&ghost, UsageKind::ServerRegistration).is_err());
}
