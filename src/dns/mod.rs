//! DNS wire codec and resolver client used by every DCV method that needs
//! to look something up (DNS-TXT, DNS-CNAME, CAA-based email discovery,
//! ACME DNS-01, and the email-to-DNS-contact strategies).
//!
//! This is deliberately a small, purpose-built codec rather than a general
//! resolver library: [`message`]/[`resource`] encode/decode exactly the
//! record types the DCV methods consume, and [`client`] wraps that codec
//! with the candidate-name iteration, retry and timeout behaviour the
//! validation methods need.

mod display;
pub mod io;
mod message;
pub mod resource;
mod wire;

pub mod client;

pub use message::{Class, Extension, Message, Opcode, QR, Question, Rcode, Record, Stats, Type};
pub use resource::{Resource, CAA, DS, MX, RRSIG, SOA, SRV, TXT};
