//! Resource record payloads ([`Resource`]) and their RFC 1035/4034/8659 wire
//! encodings.

use crate::dns::io::{CursorExt, DNSReadExt};
use crate::dns::message::{Class, Record, Type};
use byteorder::{ReadBytesExt, BE};
use std::fmt;
use std::io;
use std::io::Cursor;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

pub type A = Ipv4Addr;
pub type AAAA = Ipv6Addr;
pub type CNAME = String;
pub type NS = String;
pub type PTR = String;

/// Mail exchange record. See [rfc1035#section-3.3.9].
///
/// [rfc1035#section-3.3.9]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3.9
#[derive(Clone, Debug, PartialEq)]
pub struct MX {
    pub preference: u16,
    pub exchange: String,
}

/// Start of authority record. See [rfc1035#section-3.3.13].
///
/// [rfc1035#section-3.3.13]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3.13
#[derive(Clone, Debug, PartialEq)]
pub struct SOA {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: Duration,
    pub retry: Duration,
    pub expire: Duration,
    pub minimum: Duration,
}

/// Service record. See [rfc2782].
///
/// [rfc2782]: https://datatracker.ietf.org/doc/html/rfc2782
#[derive(Clone, Debug, PartialEq)]
pub struct SRV {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub name: String,
}

/// A TXT record: one or more character-strings. See [rfc1035#section-3.3.14].
///
/// [rfc1035#section-3.3.14]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3.14
#[derive(Clone, Debug, PartialEq)]
pub struct TXT(pub Vec<Vec<u8>>);

impl TXT {
    /// Concatenates every character-string in this record into a single
    /// value, the way most TXT consumers (including DCV challenge scanning)
    /// treat a record that was split purely because of the 255-byte
    /// character-string limit.
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(|s| String::from_utf8_lossy(s))
            .collect::<Vec<_>>()
            .concat()
    }
}

/// Certification Authority Authorization record. See [rfc8659].
///
/// [rfc8659]: https://datatracker.ietf.org/doc/html/rfc8659
#[derive(Clone, Debug, PartialEq)]
pub struct CAA {
    pub critical: bool,
    pub tag: String,
    pub value: String,
}

/// Delegation Signer record. See [rfc4034#section-5].
///
/// [rfc4034#section-5]: https://datatracker.ietf.org/doc/html/rfc4034#section-5
#[derive(Clone, Debug, PartialEq)]
pub struct DS {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: Vec<u8>,
}

/// Resource Record Signature. See [rfc4034#section-3].
///
/// [rfc4034#section-3]: https://datatracker.ietf.org/doc/html/rfc4034#section-3
#[derive(Clone, Debug, PartialEq)]
pub struct RRSIG {
    pub type_covered: Type,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer_name: String,
    pub signature: Vec<u8>,
}

/// Resource Record payload, tagged by the [`Type`] it was parsed as.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, PartialEq)]
pub enum Resource {
    A(A),
    AAAA(AAAA),
    CNAME(CNAME),
    NS(NS),
    PTR(PTR),
    TXT(TXT),
    MX(MX),
    SOA(SOA),
    SRV(SRV),
    CAA(CAA),
    DS(DS),
    RRSIG(RRSIG),

    /// Not a valid Record Type, but is a Type.
    OPT,
    ANY,
}

impl Resource {
    pub fn r#type(&self) -> Type {
        match self {
            Resource::A(_) => Type::A,
            Resource::AAAA(_) => Type::AAAA,
            Resource::CNAME(_) => Type::CNAME,
            Resource::NS(_) => Type::NS,
            Resource::PTR(_) => Type::PTR,
            Resource::TXT(_) => Type::TXT,
            Resource::MX(_) => Type::MX,
            Resource::SOA(_) => Type::SOA,
            Resource::SRV(_) => Type::SRV,
            Resource::CAA(_) => Type::CAA,
            Resource::DS(_) => Type::DS,
            Resource::RRSIG(_) => Type::RRSIG,
            Resource::OPT => Type::OPT,
            Resource::ANY => Type::ANY,
        }
    }
}

impl Record {
    /// Parses one Resource Record, assuming `cur` is positioned immediately
    /// after the record's NAME/TYPE/CLASS fields (i.e. at TTL).
    pub(crate) fn parse(
        cur: &mut Cursor<&[u8]>,
        name: String,
        r#type: Type,
        class: Class,
    ) -> io::Result<Record> {
        let ttl = Duration::from_secs(cur.read_u32::<BE>()?.into());
        let rdlength = cur.read_u16::<BE>()? as usize;

        let start = cur.position() as usize;
        let end = start + rdlength;
        let mut rdata = cur.sub_cursor(start, end)?;

        let resource = match r#type {
            Type::A => Resource::A(parse_a(class, &mut rdata)?),
            Type::AAAA => Resource::AAAA(parse_aaaa(class, &mut rdata)?),
            Type::NS => Resource::NS(rdata.read_qname()?),
            Type::CNAME => Resource::CNAME(rdata.read_qname()?),
            Type::PTR => Resource::PTR(rdata.read_qname()?),
            Type::TXT => Resource::TXT(parse_txt(&mut rdata, rdlength)?),
            Type::MX => Resource::MX(parse_mx(&mut rdata)?),
            Type::SOA => Resource::SOA(parse_soa(&mut rdata)?),
            Type::SRV => Resource::SRV(parse_srv(&mut rdata)?),
            Type::CAA => Resource::CAA(parse_caa(&mut rdata, rdlength)?),
            Type::DS => Resource::DS(parse_ds(&mut rdata, rdlength)?),
            Type::RRSIG => Resource::RRSIG(parse_rrsig(&mut rdata, rdlength)?),
            Type::OPT => Resource::OPT,
            Type::ANY | Type::Reserved => Resource::ANY,
        };

        // Always leave the outer cursor positioned right after this record's
        // RDATA, regardless of how much of it the specific parser consumed.
        cur.set_position(end as u64);

        Ok(Record {
            name,
            class,
            ttl,
            resource,
        })
    }

    /// Encodes this Resource Record's RDATA (not the NAME/TYPE/CLASS/TTL
    /// header, which [`crate::dns::wire`] writes uniformly for every record).
    pub(crate) fn write_rdata(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        match &self.resource {
            Resource::A(ip) => buf.extend_from_slice(&ip.octets()),
            Resource::AAAA(ip) => buf.extend_from_slice(&ip.octets()),
            Resource::CNAME(name) | Resource::NS(name) | Resource::PTR(name) => {
                crate::dns::wire::write_qname(buf, name)?
            }
            Resource::TXT(txt) => {
                for chunk in &txt.0 {
                    buf.push(chunk.len() as u8);
                    buf.extend_from_slice(chunk);
                }
            }
            Resource::MX(mx) => {
                buf.extend_from_slice(&mx.preference.to_be_bytes());
                crate::dns::wire::write_qname(buf, &mx.exchange)?;
            }
            Resource::CAA(caa) => {
                buf.push(if caa.critical { 0x80 } else { 0 });
                buf.push(caa.tag.len() as u8);
                buf.extend_from_slice(caa.tag.as_bytes());
                buf.extend_from_slice(caa.value.as_bytes());
            }
            // SOA/SRV/DS/RRSIG are never constructed locally by this crate
            // (only ever parsed from a resolver's response), so no encoder
            // is needed for them.
            _ => {}
        }

        Ok(())
    }
}

fn parse_a(class: Class, buf: &mut Cursor<&[u8]>) -> io::Result<Ipv4Addr> {
    if class != Class::Internet {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported A record class {:?}", class),
        ));
    }
    let mut octets = [0u8; 4];
    io::Read::read_exact(buf, &mut octets)?;
    Ok(Ipv4Addr::from(octets))
}

fn parse_aaaa(class: Class, buf: &mut Cursor<&[u8]>) -> io::Result<Ipv6Addr> {
    if class != Class::Internet {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported AAAA record class {:?}", class),
        ));
    }
    let mut octets = [0u8; 16];
    io::Read::read_exact(buf, &mut octets)?;
    Ok(Ipv6Addr::from(octets))
}

fn parse_txt(buf: &mut Cursor<&[u8]>, rdlength: usize) -> io::Result<TXT> {
    let mut txts = Vec::new();
    let mut remaining = rdlength;

    while remaining > 0 {
        let len = buf.read_u8()? as usize;
        remaining -= 1;

        if len > remaining {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "TXT character-string longer than remaining RDATA",
            ));
        }

        let mut chunk = vec![0u8; len];
        io::Read::read_exact(buf, &mut chunk)?;
        txts.push(chunk);
        remaining -= len;
    }

    Ok(TXT(txts))
}

fn parse_mx(buf: &mut Cursor<&[u8]>) -> io::Result<MX> {
    let preference = buf.read_u16::<BE>()?;
    let exchange = buf.read_qname()?;
    Ok(MX {
        preference,
        exchange,
    })
}

fn parse_soa(buf: &mut Cursor<&[u8]>) -> io::Result<SOA> {
    let mname = buf.read_qname()?;
    let rname = buf.read_qname()?;
    let serial = buf.read_u32::<BE>()?;
    let refresh = Duration::from_secs(buf.read_u32::<BE>()?.into());
    let retry = Duration::from_secs(buf.read_u32::<BE>()?.into());
    let expire = Duration::from_secs(buf.read_u32::<BE>()?.into());
    let minimum = Duration::from_secs(buf.read_u32::<BE>()?.into());

    Ok(SOA {
        mname,
        rname,
        serial,
        refresh,
        retry,
        expire,
        minimum,
    })
}

fn parse_srv(buf: &mut Cursor<&[u8]>) -> io::Result<SRV> {
    let priority = buf.read_u16::<BE>()?;
    let weight = buf.read_u16::<BE>()?;
    let port = buf.read_u16::<BE>()?;
    let name = buf.read_qname()?;

    Ok(SRV {
        priority,
        weight,
        port,
        name,
    })
}

fn parse_caa(buf: &mut Cursor<&[u8]>, rdlength: usize) -> io::Result<CAA> {
    let flags = buf.read_u8()?;
    let tag_len = buf.read_u8()? as usize;

    let mut tag = vec![0u8; tag_len];
    io::Read::read_exact(buf, &mut tag)?;

    let value_len = rdlength
        .checked_sub(2 + tag_len)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "CAA tag longer than RDATA"))?;
    let mut value = vec![0u8; value_len];
    io::Read::read_exact(buf, &mut value)?;

    Ok(CAA {
        critical: flags & 0x80 != 0,
        tag: String::from_utf8_lossy(&tag).into_owned(),
        value: String::from_utf8_lossy(&value).into_owned(),
    })
}

fn parse_ds(buf: &mut Cursor<&[u8]>, rdlength: usize) -> io::Result<DS> {
    let key_tag = buf.read_u16::<BE>()?;
    let algorithm = buf.read_u8()?;
    let digest_type = buf.read_u8()?;

    let digest_len = rdlength
        .checked_sub(4)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "DS record too short"))?;
    let mut digest = vec![0u8; digest_len];
    io::Read::read_exact(buf, &mut digest)?;

    Ok(DS {
        key_tag,
        algorithm,
        digest_type,
        digest,
    })
}

fn parse_rrsig(buf: &mut Cursor<&[u8]>, rdlength: usize) -> io::Result<RRSIG> {
    use num_traits::FromPrimitive;

    let type_covered = buf.read_u16::<BE>()?;
    let type_covered = Type::from_u16(type_covered)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "invalid RRSIG type-covered"))?;
    let algorithm = buf.read_u8()?;
    let labels = buf.read_u8()?;
    let original_ttl = buf.read_u32::<BE>()?;
    let expiration = buf.read_u32::<BE>()?;
    let inception = buf.read_u32::<BE>()?;
    let key_tag = buf.read_u16::<BE>()?;
    let signer_name = buf.read_qname()?;

    // 18 fixed bytes precede the signer name; the signature is whatever
    // RDATA remains after it.
    let consumed_before_signature = 18 + encoded_qname_len(&signer_name);
    let signature_len = rdlength.saturating_sub(consumed_before_signature);
    let mut signature = vec![0u8; signature_len];
    io::Read::read_exact(buf, &mut signature)?;

    Ok(RRSIG {
        type_covered,
        algorithm,
        labels,
        original_ttl,
        expiration,
        inception,
        key_tag,
        signer_name,
        signature,
    })
}

/// Rough re-encoded length of an (already decompressed) qname, used only to
/// figure out how many RDATA bytes remain for the RRSIG signature.
fn encoded_qname_len(name: &str) -> usize {
    if name == "." {
        return 1;
    }
    name.split_terminator('.').map(|l| l.len() + 1).sum::<usize>() + 1
}

impl fmt::Display for TXT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = self
            .0
            .iter()
            .map(|txt| String::from_utf8_lossy(txt))
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "\"{}\"", output)
    }
}
