//! Cursor extensions used while decoding a wire-format [`crate::dns::Message`].

use crate::dns::message::{Class, Type};
use byteorder::{ReadBytesExt, BE};
use num_traits::FromPrimitive;
use std::io;
use std::io::Cursor;
use std::io::SeekFrom;

pub fn clamp<T: PartialOrd>(v: T, min: T, max: T) -> T {
    assert!(min < max);

    if v < min {
        min
    } else if v > max {
        max
    } else {
        v
    }
}

pub trait SeekExt: io::Seek {
    /// Returns the number of bytes remaining to be consumed. Used to detect
    /// malformed input that leaves trailing garbage in the message.
    fn remaining(&mut self) -> io::Result<u64> {
        let pos = self.stream_position()?;
        let len = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(pos))?;
        Ok(len - pos)
    }
}

impl<'a> SeekExt for Cursor<&'a [u8]> {}

pub trait CursorExt<T> {
    /// Returns a cursor bounded to `[start, end)` of the original cursor's
    /// underlying buffer. Unlike [`io::Take`] this allows an arbitrary
    /// start, not just "the next N bytes".
    fn sub_cursor(&mut self, start: usize, end: usize) -> io::Result<Cursor<T>>;
}

impl<'a> CursorExt<&'a [u8]> for Cursor<&'a [u8]> {
    fn sub_cursor(&mut self, start: usize, end: usize) -> io::Result<Cursor<&'a [u8]>> {
        let buf = self.get_ref();

        let start = clamp(start, 0, buf.len());
        let end = clamp(end, start, buf.len());

        Ok(Cursor::new(&buf[start..end]))
    }
}

impl<R: io::Read + ?Sized + io::Seek> DNSReadExt for R {}

/// Extensions to [`io::Read`] for the DNS-specific wire types.
pub trait DNSReadExt: io::Read + io::Seek {
    /// Reads a (possibly compressed) domain name, returning it in dotted,
    /// IDNA-decoded Unicode form, terminated with a trailing `.`.
    fn read_qname(&mut self) -> io::Result<String> {
        let mut qname = String::new();
        let start = self.stream_position()?;

        loop {
            let len = self.read_u8()?;
            if len == 0 {
                if qname.is_empty() {
                    qname.push('.');
                }
                break;
            }

            match len & 0xC0 {
                0x00 => {
                    let mut label = vec![0; len.into()];
                    self.read_exact(&mut label)?;

                    let label = std::str::from_utf8(&label).map_err(|e| {
                        io::Error::new(io::ErrorKind::InvalidData, format!("invalid label: {}", e))
                    })?;

                    if !label.is_ascii() {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("invalid label '{}': not valid ascii", label),
                        ));
                    }

                    let (label, result) = idna::domain_to_unicode(label);
                    if let Err(e) = result {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("invalid label '{}': {:?}", label, e),
                        ));
                    }

                    qname.push_str(&label);
                    qname.push('.');
                }

                0xC0 => {
                    let b2 = self.read_u8()? as u16;
                    let ptr = ((len as u16 & !0xC0) << 8 | b2) as u64;

                    if ptr >= start {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "invalid compressed pointer pointing to future bytes",
                        ));
                    }

                    let current = self.stream_position()?;
                    self.seek(SeekFrom::Start(ptr))?;
                    qname.push_str(&self.read_qname()?);
                    self.seek(SeekFrom::Start(current))?;
                    break;
                }

                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("unsupported compression type {:b}", len & 0xC0),
                    ))
                }
            }
        }

        Ok(qname)
    }

    fn read_type(&mut self) -> io::Result<Type> {
        let r#type = self.read_u16::<BE>()?;
        Type::from_u16(r#type)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("invalid Type({})", r#type)))
    }

    fn read_class(&mut self) -> io::Result<Class> {
        let class = self.read_u16::<BE>()?;
        Class::from_u16(class)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("invalid Class({})", class)))
    }
}
