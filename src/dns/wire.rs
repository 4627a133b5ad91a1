//! Encoding and decoding of a [`Message`] to/from its RFC 1035 wire form.

use crate::dns::io::{DNSReadExt, SeekExt};
use crate::dns::message::*;
use byteorder::{ReadBytesExt, BE};
use num_traits::FromPrimitive;
use rand::Rng;
use std::io;
use std::io::BufRead;
use std::io::Cursor;

#[derive(Copy, Clone, PartialEq)]
enum RecordSection {
    Answers,
    Authorities,
    Additionals,
}

struct MessageParser<'a> {
    cur: Cursor<&'a [u8]>,
    m: Message,
}

impl<'a> MessageParser<'a> {
    fn new(buf: &[u8]) -> MessageParser {
        MessageParser {
            cur: Cursor::new(buf),
            m: Message::default(),
        }
    }

    fn parse(mut self) -> io::Result<Message> {
        self.m.id = self.cur.read_u16::<BE>()?;

        let b = self.cur.read_u8()?;
        self.m.qr = QR::from_bool(0b1000_0000 & b != 0);
        let opcode = (0b0111_1000 & b) >> 3;
        self.m.aa = (0b0000_0100 & b) != 0;
        self.m.tc = (0b0000_0010 & b) != 0;
        self.m.rd = (0b0000_0001 & b) != 0;

        self.m.opcode = Opcode::from_u8(opcode)
            .ok_or_else(|| invalid(format!("invalid Opcode({})", opcode)))?;

        let b = self.cur.read_u8()?;
        self.m.ra = (0b1000_0000 & b) != 0;
        self.m.z = (0b0100_0000 & b) != 0;
        self.m.ad = (0b0010_0000 & b) != 0;
        self.m.cd = (0b0001_0000 & b) != 0;
        let rcode = 0b0000_1111 & b;

        self.m.rcode =
            Rcode::from_u8(rcode).ok_or_else(|| invalid(format!("invalid RCode({})", rcode)))?;

        let qd_count = self.cur.read_u16::<BE>()?;
        let an_count = self.cur.read_u16::<BE>()?;
        let ns_count = self.cur.read_u16::<BE>()?;
        let ar_count = self.cur.read_u16::<BE>()?;

        self.read_questions(qd_count)?;
        self.read_records(an_count, RecordSection::Answers)?;
        self.read_records(ns_count, RecordSection::Authorities)?;
        self.read_records(ar_count, RecordSection::Additionals)?;

        if self.cur.remaining()? > 0 {
            return Err(invalid(format!(
                "finished parsing with {} bytes left over",
                self.cur.remaining()?
            )));
        }

        Ok(self.m)
    }

    fn read_questions(&mut self, count: u16) -> io::Result<()> {
        self.m.questions.reserve_exact(count.into());

        for _ in 0..count {
            let name = self.cur.read_qname()?;
            let r#type = self.cur.read_type()?;
            let class = self.cur.read_class()?;

            self.m.questions.push(Question {
                name,
                r#type,
                class,
            });
        }

        Ok(())
    }

    fn read_records(&mut self, count: u16, section: RecordSection) -> io::Result<()> {
        let records = match section {
            RecordSection::Answers => &mut self.m.answers,
            RecordSection::Authorities => &mut self.m.authoritys,
            RecordSection::Additionals => &mut self.m.additionals,
        };
        records.reserve_exact(count.into());

        for _ in 0..count {
            let name = self.cur.read_qname()?;
            let r#type = self.cur.read_type()?;

            if section == RecordSection::Additionals && r#type == Type::OPT {
                if self.m.extension.is_some() {
                    return Err(invalid("multiple EDNS(0) extensions. Expected only one."));
                }

                let ext = Extension::parse(&mut self.cur, name, r#type)?;
                self.m.extension = Some(ext);
            } else {
                let class = self.cur.read_class()?;
                let record = Record::parse(&mut self.cur, name, r#type, class)?;

                records.push(record);
            }
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

impl Default for Message {
    fn default() -> Self {
        Message {
            id: Message::random_id(),
            rd: true,
            tc: false,
            aa: false,
            opcode: Opcode::Query,
            qr: QR::Query,
            rcode: Rcode::NoError,
            cd: false,
            ad: true,
            z: false,
            ra: false,

            questions: Vec::default(),
            answers: Vec::default(),
            authoritys: Vec::default(),
            additionals: Vec::default(),
            extension: None,
            stats: None,
        }
    }
}

impl Message {
    /// Returns a random u16 suitable for the [`Message`] id field, drawn
    /// from a cryptographically secure RNG so ids can't be predicted by an
    /// off-path attacker attempting cache poisoning.
    pub fn random_id() -> u16 {
        rand::thread_rng().gen()
    }

    /// Decodes the supplied buffer and returns a [`Message`].
    pub fn from_slice(buf: &[u8]) -> io::Result<Message> {
        MessageParser::new(buf).parse()
    }

    /// Takes a unicode domain, converts to ascii, and back to unicode, to
    /// normalise it for comparison against whatever a resolver echoes back.
    fn normalise_domain(domain: &str) -> io::Result<String> {
        let ascii = idna::domain_to_ascii(domain)
            .map_err(|e| invalid(format!("invalid domain '{}': {:?}", domain, e)))?;
        let (mut unicode, result) = idna::domain_to_unicode(&ascii);
        result.map_err(|e| invalid(format!("invalid domain '{}': {:?}", domain, e)))?;

        if !unicode.ends_with('.') {
            unicode.push('.');
        }
        Ok(unicode)
    }

    /// Adds a question to the message.
    pub fn add_question(&mut self, domain: &str, r#type: Type, class: Class) {
        let domain = Message::normalise_domain(domain).expect("invalid domain");

        self.questions.push(Question {
            name: domain,
            r#type,
            class,
        });
    }

    /// Adds a EDNS(0) extension record, as defined by [rfc6891].
    ///
    /// [rfc6891]: https://datatracker.ietf.org/doc/html/rfc6891
    pub fn add_extension(&mut self, ext: Extension) {
        self.extension = Some(ext);
    }

    /// Encodes this [`Message`] as a [`Vec<u8>`] ready to be sent, per [rfc1035].
    ///
    /// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
    pub fn to_vec(&self) -> io::Result<Vec<u8>> {
        let mut req = Vec::<u8>::with_capacity(512);

        req.extend_from_slice(&self.id.to_be_bytes());

        let mut b = 0_u8;
        b |= if self.qr.to_bool() { 0b1000_0000 } else { 0 };
        b |= ((self.opcode as u8) << 3) & 0b0111_1000;
        b |= if self.aa { 0b0000_0100 } else { 0 };
        b |= if self.tc { 0b0000_0010 } else { 0 };
        b |= if self.rd { 0b0000_0001 } else { 0 };
        req.push(b);

        let mut b = 0_u8;
        b |= if self.ra { 0b1000_0000 } else { 0 };
        b |= if self.z { 0b0100_0000 } else { 0 };
        b |= if self.ad { 0b0010_0000 } else { 0 };
        b |= if self.cd { 0b0001_0000 } else { 0 };
        b |= (self.rcode as u8) & 0b0000_1111;
        req.push(b);

        let ar_count = self.additionals.len() as u16 + self.extension.is_some() as u16;

        req.extend_from_slice(&(self.questions.len() as u16).to_be_bytes());
        req.extend_from_slice(&(self.answers.len() as u16).to_be_bytes());
        req.extend_from_slice(&(self.authoritys.len() as u16).to_be_bytes());
        req.extend_from_slice(&ar_count.to_be_bytes());

        for question in &self.questions {
            write_qname(&mut req, &question.name)?;
            req.extend_from_slice(&(question.r#type as u16).to_be_bytes());
            req.extend_from_slice(&(question.class as u16).to_be_bytes());
        }

        for record in self.answers.iter().chain(&self.authoritys).chain(&self.additionals) {
            write_record(&mut req, record)?;
        }

        if let Some(e) = &self.extension {
            e.write(&mut req)?
        }

        Ok(req)
    }
}

/// Writes a Unicode domain name into the supplied buffer as length-prefixed
/// ASCII labels, IDNA-encoding it first. Used for both questions and for
/// the few record types this crate ever constructs locally (CNAME/NS/PTR
/// rdata never originates here, but the qname writer is shared).
pub(crate) fn write_qname(buf: &mut Vec<u8>, domain: &str) -> io::Result<()> {
    let domain = idna::domain_to_ascii(domain)
        .map_err(|e| invalid(format!("invalid dns name '{}': {:?}", domain, e)))?;

    if !domain.is_empty() && domain != "." {
        for label in domain.split_terminator('.') {
            if label.is_empty() {
                return Err(invalid(format!("empty label in domain name '{}'", domain)));
            }
            if label.len() > 63 {
                return Err(invalid(format!("label '{}' longer than 63 characters", label)));
            }

            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
    }

    buf.push(0);
    Ok(())
}

fn write_record(buf: &mut Vec<u8>, record: &Record) -> io::Result<()> {
    write_qname(buf, &record.name)?;
    buf.extend_from_slice(&(record.r#type() as u16).to_be_bytes());
    buf.extend_from_slice(&(record.class as u16).to_be_bytes());
    buf.extend_from_slice(&(record.ttl.as_secs() as u32).to_be_bytes());

    let mut rdata = Vec::new();
    record.write_rdata(&mut rdata)?;

    buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    buf.extend_from_slice(&rdata);

    Ok(())
}

impl Extension {
    pub(crate) fn parse(cur: &mut Cursor<&[u8]>, domain: String, r#type: Type) -> io::Result<Extension> {
        debug_assert!(r#type == Type::OPT);

        if domain != "." {
            return Err(invalid(format!(
                "expected root domain for EDNS(0) extension, got '{}'",
                domain
            )));
        }

        let payload_size = cur.read_u16::<BE>()?;
        let extend_rcode = cur.read_u8()?;
        let version = cur.read_u8()?;
        let b = cur.read_u8()?;
        let dnssec_ok = b & 0b1000_0000 == 0b1000_0000;

        let _z = cur.read_u8()?;
        let rd_len = cur.read_u16::<BE>()?;
        cur.consume(rd_len.into());

        Ok(Extension {
            payload_size,
            extend_rcode,
            version,
            dnssec_ok,
        })
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        buf.push(0); // root domain
        buf.extend_from_slice(&(Type::OPT as u16).to_be_bytes());
        buf.extend_from_slice(&self.payload_size.to_be_bytes());

        buf.push(self.extend_rcode);
        buf.push(self.version);

        let mut b = 0_u8;
        b |= if self.dnssec_ok { 0b1000_0000 } else { 0 };
        buf.push(b);
        buf.push(0);

        buf.push(0); // RDLEN high byte
        buf.push(0); // RDLEN low byte

        Ok(())
    }
}
