//! Core DNS wire types: [`Message`], [`Question`], [`Record`] and friends.
//!
//! This is a small RFC 1035 codec, not a general purpose DNS library: it
//! supports exactly the record types the DCV methods need (A, CNAME, TXT,
//! MX, CAA, DS, RRSIG) plus EDNS(0) so a larger UDP payload can be requested.

use crate::dns::resource::*;
use num_derive::FromPrimitive;
use std::net::SocketAddr;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;
use strum_macros::{Display, EnumString};

/// DNS Message that serves as the root of all DNS requests and responses.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// 16-bit identifier assigned by the program that generates any kind of
    /// query. Copied into the corresponding reply.
    pub id: u16,

    /// Recursion Desired.
    pub rd: bool,

    /// Truncation.
    pub tc: bool,

    /// Authoritative Answer.
    pub aa: bool,

    pub opcode: Opcode,

    /// Whether this message is a query or a response.
    pub qr: QR,

    pub rcode: Rcode,

    /// Checking Disabled. See [RFC4035] and [RFC6840].
    ///
    /// [rfc4035]: https://datatracker.ietf.org/doc/html/rfc4035
    /// [rfc6840]: https://datatracker.ietf.org/doc/html/rfc6840
    pub cd: bool,

    /// Authentic Data — set by the resolver when it validated DNSSEC for
    /// this answer. See [RFC4035] and [RFC6840].
    pub ad: bool,

    pub z: bool,
    pub ra: bool,

    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authoritys: Vec<Record>,
    pub additionals: Vec<Record>,

    /// Optional EDNS(0) record.
    pub extension: Option<Extension>,

    /// Optional stats about this request, populated by the client that sent it.
    pub stats: Option<Stats>,
}

/// Question struct containing a domain name, question [`Type`] and question [`Class`].
#[derive(Clone, Debug, PartialEq)]
pub struct Question {
    pub name: String,
    pub r#type: Type,
    pub class: Class,
}

/// Resource Record (RR) returned by a DNS server in answer to a [`Question`].
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub name: String,
    pub class: Class,

    /// Seconds the record may be cached before the source should be re-consulted.
    pub ttl: Duration,

    pub resource: Resource,
}

impl Record {
    pub fn r#type(&self) -> Type {
        self.resource.r#type()
    }
}

/// EDNS(0) extension record, as defined in [rfc2671] and [rfc6891].
///
/// [rfc2671]: https://datatracker.ietf.org/doc/html/rfc2671
/// [rfc6891]: https://datatracker.ietf.org/doc/html/rfc6891
#[derive(Clone, Debug, PartialEq)]
pub struct Extension {
    /// Requestor's UDP payload size.
    pub payload_size: u16,
    pub extend_rcode: u8,
    pub version: u8,

    /// DNSSEC OK bit, as defined by [rfc3225]. Set to request that the
    /// resolver perform (and report, via the response's `ad` bit) DNSSEC
    /// validation.
    ///
    /// [rfc3225]: https://datatracker.ietf.org/doc/html/rfc3225
    pub dnssec_ok: bool,
}

impl Default for Extension {
    fn default() -> Self {
        Extension {
            payload_size: 4096,
            extend_rcode: 0,
            version: 0,
            dnssec_ok: false,
        }
    }
}

/// Stats related to one query/response exchange, filled in by whichever
/// transport (UDP/TCP/DoH client) performed the exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub start: SystemTime,
    pub duration: Duration,
    pub server: SocketAddr,
    pub request_size: usize,
    pub response_size: usize,
}

pub(crate) struct StatsBuilder {
    start: SystemTime,
    timer: Instant,
    request_size: usize,
}

impl StatsBuilder {
    pub fn start(request_size: usize) -> StatsBuilder {
        StatsBuilder {
            start: SystemTime::now(),
            timer: Instant::now(),
            request_size,
        }
    }

    pub fn end(self, server: SocketAddr, response_size: usize) -> Stats {
        Stats {
            start: self.start,
            duration: self.timer.elapsed(),
            request_size: self.request_size,
            server,
            response_size,
        }
    }
}

/// Query or Response bit.
#[derive(Copy, Clone, Debug, EnumString, PartialEq)]
pub enum QR {
    Query = 0,
    Response = 1,
}

impl Default for QR {
    fn default() -> Self {
        QR::Query
    }
}

impl QR {
    pub fn from_bool(b: bool) -> QR {
        match b {
            false => QR::Query,
            true => QR::Response,
        }
    }

    pub fn to_bool(self) -> bool {
        match self {
            QR::Query => false,
            QR::Response => true,
        }
    }
}

/// Specifies kind of query in this message. See [rfc1035] and [rfc6895].
///
/// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
/// [rfc6895]: https://datatracker.ietf.org/doc/html/rfc6895
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, PartialEq)]
#[allow(clippy::upper_case_acronyms)]
#[repr(u8)]
pub enum Opcode {
    Query = 0,
    IQuery = 1,
    Status = 2,
    Notify = 4,
    Update = 5,
}

impl Default for Opcode {
    fn default() -> Self {
        Opcode::Query
    }
}

/// Response Codes. See [rfc1035].
///
/// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, PartialEq)]
#[allow(clippy::upper_case_acronyms)]
#[repr(u16)]
pub enum Rcode {
    NoError = 0,
    FormErr = 1,
    ServFail = 2,
    NXDomain = 3,
    NotImp = 4,
    Refused = 5,
    YXDomain = 6,
    YXRRSet = 7,
    NXRRSet = 8,
    NotAuth = 9,
    NotZone = 10,
}

impl Default for Rcode {
    fn default() -> Self {
        Rcode::NoError
    }
}

/// Resource Record Type. Restricted to the types the DCV methods consume:
/// A/CNAME/TXT/MX for ordinary validation, CAA for RFC 8659/8657 email
/// discovery, DS/RRSIG for DNSSEC-awareness, plus OPT/ANY as pseudo-types.
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
#[repr(u16)]
pub enum Type {
    Reserved = 0,

    /// IPv4 Address.
    A = 1,
    NS = 2,
    CNAME = 5,
    SOA = 6,
    MX = 15,
    TXT = 16,
    AAAA = 28,
    SRV = 33,

    /// Certification Authority Authorization. See [rfc8659].
    ///
    /// [rfc8659]: https://datatracker.ietf.org/doc/html/rfc8659
    CAA = 257,

    /// Delegation Signer. See [rfc4034].
    ///
    /// [rfc4034]: https://datatracker.ietf.org/doc/html/rfc4034
    DS = 43,

    /// Resource Record Signature. See [rfc4034].
    ///
    /// [rfc4034]: https://datatracker.ietf.org/doc/html/rfc4034
    RRSIG = 46,

    /// EDNS(0) Opt pseudo-type. See [rfc6891].
    ///
    /// [rfc6891]: https://datatracker.ietf.org/doc/html/rfc6891
    OPT = 41,

    /// Any record type. Only valid as a Question Type.
    ANY = 255,
}

impl Default for Type {
    fn default() -> Self {
        Type::ANY
    }
}

/// Resource Record Class.
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Class {
    Reserved = 0,

    #[strum(serialize = "IN")]
    Internet = 1,

    #[strum(serialize = "*")]
    Any = 255,
}

impl Default for Class {
    fn default() -> Self {
        Class::Internet
    }
}
