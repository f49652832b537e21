//! Message classification
//!
//! Pure routing function from (direction, CSeq method, To-tag presence) to
//! the exchange kind that owns the message. Kept free of any exchange
//! internals so the table is testable in isolation; the dialog set's
//! dispatch applies the result.

use crate::sip::Method;

/// Which exchange kind a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Dialog-owned: look up or create a dialog
    Dialog,
    /// Singleton server registration (inbound REGISTER)
    ServerRegistration,
    /// Singleton client registration (REGISTER response)
    ClientRegistration,
    /// Singleton server publication (inbound PUBLISH)
    ServerPublication,
    /// Singleton client publication (PUBLISH response)
    ClientPublication,
    /// Singleton server out-of-dialog request (unknown method or
    /// unsolicited NOTIFY)
    ServerOutOfDialog,
    /// Ordered client out-of-dialog requests (stray responses)
    ClientOutOfDialog,
}

/// Classify a message by direction, CSeq method and To-tag presence.
///
/// Responses route on their CSeq method, never the status line. NOTIFY
/// requests split on the To-tag: tagged means in-dialog (RFC 6665
/// subscription notify), untagged is an unsolicited notify handled
/// out-of-dialog. NOTIFY and INFO responses are disallowed unsolicited by
/// the RFC but sent by real peers, so they fall into the client
/// out-of-dialog bucket with every other unrecognized response.
pub fn classify(is_request: bool, cseq_method: &Method, has_to_tag: bool) -> Route {
    match cseq_method {
        Method::Invite
        | Method::Bye
        | Method::Ack
        | Method::Cancel
        | Method::Subscribe
        | Method::Refer => Route::Dialog,
        Method::Notify if is_request => {
            if has_to_tag {
                Route::Dialog
            } else {
                Route::ServerOutOfDialog
            }
        }
        Method::Publish => {
            if is_request {
                Route::ServerPublication
            } else {
                Route::ClientPublication
            }
        }
        Method::Register => {
            if is_request {
                Route::ServerRegistration
            } else {
                Route::ClientRegistration
            }
        }
        _ => {
            if is_request {
                Route::ServerOutOfDialog
            } else {
                Route::ClientOutOfDialog
            }
        }
    }
}
