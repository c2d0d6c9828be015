//! Job-invite mail agent — polls an IMAP mailbox, classifies new messages
//! as job-opportunity mail, and sends WhatsApp alerts via Twilio.

pub mod classifier;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod notifier;
pub mod poller;
pub mod state;
pub mod text;
