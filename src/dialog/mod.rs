//! Core dialog types
//!
//! This module contains the dialog identity keys and the [`Dialog`] type the
//! demultiplexer creates and looks up:
//!
//! - [`DialogId`] / [`DialogSetId`]: identity keys derived from messages
//! - [`Dialog`]: one protocol dialog, with the minimal lifecycle the
//!   demultiplexing contract needs (early, confirmed, terminated)
//!
//! Dialogs are owned by their [`DialogSet`](crate::dialog_set::DialogSet) and
//! created through its dispatch path, never directly by applications.

pub mod dialog_id;
pub mod dialog_impl;

pub use dialog_id::{DialogId, DialogSetId};
pub use dialog_impl::{Dialog, DialogOutcome, DialogState};
