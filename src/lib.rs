//! Bulk verification of `email:password` lists against per-domain IMAP
//! servers, for auditing leaked-credential dumps under proper authorization.

pub mod proxy;
pub mod record;
pub mod registry;
pub mod report;
pub mod runner;
pub mod verify;
