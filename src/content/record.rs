use crate::error::Result;
use crate::Error;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use super::ContentId;

/// id:i32 + checksum:i32 + flags:u8 + length:i32
pub const HEADER_SIZE: usize = 13;

/// Bytes rewritten in place when a record is removed: id + checksum + flags.
pub const REWRITE_SIZE: usize = 9;

pub const FLAG_REMOVED: u8 = 0b01;
pub const FLAG_COMPRESSED: u8 = 0b10;

/// Fixed header in front of every payload in the contents file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub id: ContentId,
    pub checksum: i32,
    pub flags: u8,
    pub length: i32,
}

impl RecordHeader {
    pub fn new(id: ContentId, checksum: i32, compressed: bool, length: usize) -> Result<Self> {
        let length = i32::try_from(length)
            .map_err(|_| Error::InvalidData(format!("record of {} bytes is too large", length)))?;
        Ok(Self {
            id,
            checksum,
            flags: if compressed { FLAG_COMPRESSED } else { 0 },
            length,
        })
    }

    pub fn is_removed(&self) -> bool {
        self.flags & FLAG_REMOVED != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    pub fn mark_removed(&mut self) {
        self.flags |= FLAG_REMOVED;
    }

    pub fn payload_len(&self) -> usize {
        self.length as usize
    }

    /// Total on-disk size of the record this header starts.
    pub fn record_len(&self) -> u64 {
        (HEADER_SIZE + self.payload_len()) as u64
    }

    pub fn encode_into<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.encode_prefix_into(writer)?;
        writer
            .write_i32::<BigEndian>(self.length)
            .map_err(|e| Error::Encode("length", e))?;
        Ok(())
    }

    /// Writes the part of the header that a removal rewrites.
    pub fn encode_prefix_into<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_i32::<BigEndian>(self.id)
            .map_err(|e| Error::Encode("id", e))?;
        writer
            .write_i32::<BigEndian>(self.checksum)
            .map_err(|e| Error::Encode("checksum", e))?;
        writer
            .write_u8(self.flags)
            .map_err(|e| Error::Encode("flags", e))?;
        Ok(())
    }

    /// Reads a header, returning `Ok(None)` on a clean end of file and
    /// `UnexpectedEof` as an I/O error when the header itself is torn.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut buf = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            match reader.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(Error::IoError(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "torn record header",
                    )))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::IoError(e)),
            }
        }
        Self::decode(&buf).map(Some)
    }

    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<Self> {
        let mut reader = &buf[..];
        let id = reader
            .read_i32::<BigEndian>()
            .map_err(|e| Error::Decode("id", e))?;
        let checksum = reader
            .read_i32::<BigEndian>()
            .map_err(|e| Error::Decode("checksum", e))?;
        let flags = reader
            .read_u8()
            .map_err(|e| Error::Decode("flags", e))?;
        let length = reader
            .read_i32::<BigEndian>()
            .map_err(|e| Error::Decode("length", e))?;

        if length < 0 {
            return Err(Error::CorruptedStore(format!(
                "negative length {} in record {}",
                length, id
            )));
        }

        Ok(Self {
            id,
            checksum,
            flags,
            length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() -> Result<()> {
        let header = RecordHeader::new(7, -2, true, 300)?;
        let mut buf = Vec::new();
        header.encode_into(&mut buf)?;

        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(&buf[0..4], &7i32.to_be_bytes());
        assert_eq!(&buf[4..8], &(-2i32).to_be_bytes());
        assert_eq!(buf[8], FLAG_COMPRESSED);
        assert_eq!(&buf[9..13], &300i32.to_be_bytes());

        let buf: [u8; HEADER_SIZE] = buf.try_into().unwrap();
        assert_eq!(RecordHeader::decode(&buf)?, header);
        Ok(())
    }

    #[test]
    fn test_removed_prefix_keeps_length_out() -> Result<()> {
        let mut header = RecordHeader::new(1, 42, false, 10)?;
        header.mark_removed();
        assert!(header.is_removed());
        assert!(!header.is_compressed());

        let mut buf = Vec::new();
        header.encode_prefix_into(&mut buf)?;
        assert_eq!(buf.len(), REWRITE_SIZE);
        assert_eq!(buf[8], FLAG_REMOVED);
        Ok(())
    }

    #[test]
    fn test_read_from_clean_eof() -> Result<()> {
        let mut empty: &[u8] = &[];
        assert!(RecordHeader::read_from(&mut empty)?.is_none());
        Ok(())
    }

    #[test]
    fn test_read_from_torn_header() {
        let mut torn: &[u8] = &[0, 0, 0, 1, 0];
        match RecordHeader::read_from(&mut torn) {
            Err(Error::IoError(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected torn header error, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_length_is_corruption() {
        let mut buf = [0u8; HEADER_SIZE];
        buf[9..13].copy_from_slice(&(-5i32).to_be_bytes());
        assert!(RecordHeader::decode(&buf).unwrap_err().is_corruption());
    }
}
