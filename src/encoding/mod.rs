//! Binary framing for the persisted tree and history.
//!
//! Every value is written depth first, big-endian, with a one-byte tag in
//! front of each enum variant and a `u32` count in front of each sequence.
//! Strings are a `u32` byte length followed by UTF-8. Decoding an unknown tag
//! fails with [`Error::UnknownTag`] instead of guessing.

pub mod history;
pub mod tree;

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::change::ChangeList;
use crate::error::Result;
use crate::tree::{EntryId, Snapshot};
use crate::Error;

pub trait Encode {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<()>;

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }
}

pub trait Decode: Sized {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self>;

    /// Decodes a value that must span all of `bytes`.
    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = bytes;
        let value = Self::decode_from(&mut reader)?;
        if !reader.is_empty() {
            return Err(Error::InvalidData(format!(
                "{} trailing bytes after value",
                reader.len()
            )));
        }
        Ok(value)
    }
}

pub(crate) fn write_string<W: Write>(writer: &mut W, field: &'static str, s: &str) -> Result<()> {
    write_len(writer, field, s.len())?;
    writer
        .write_all(s.as_bytes())
        .map_err(|e| Error::Encode(field, e))
}

pub(crate) fn read_string<R: Read>(reader: &mut R, field: &'static str) -> Result<String> {
    let len = read_len(reader, field)?;
    let mut buf = Vec::new();
    reader
        .by_ref()
        .take(len as u64)
        .read_to_end(&mut buf)
        .map_err(|e| Error::Decode(field, e))?;
    if buf.len() != len {
        return Err(Error::InvalidData(format!("truncated {}", field)));
    }
    String::from_utf8(buf).map_err(|_| Error::InvalidData(format!("{} is not UTF-8", field)))
}

pub(crate) fn write_len<W: Write>(writer: &mut W, field: &'static str, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| Error::InvalidData(format!("{} too long: {}", field, len)))?;
    writer
        .write_u32::<BigEndian>(len)
        .map_err(|e| Error::Encode(field, e))
}

pub(crate) fn read_len<R: Read>(reader: &mut R, field: &'static str) -> Result<usize> {
    reader
        .read_u32::<BigEndian>()
        .map(|len| len as usize)
        .map_err(|e| Error::Decode(field, e))
}

pub(crate) fn write_flag<W: Write>(writer: &mut W, field: &'static str, set: bool) -> Result<()> {
    writer
        .write_u8(set as u8)
        .map_err(|e| Error::Encode(field, e))
}

pub(crate) fn read_flag<R: Read>(reader: &mut R, field: &'static str) -> Result<bool> {
    match reader.read_u8().map_err(|e| Error::Decode(field, e))? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::UnknownTag(field, other)),
    }
}

pub(crate) fn encode_seq<W: Write, T: Encode>(writer: &mut W, field: &'static str, items: &[T]) -> Result<()> {
    write_len(writer, field, items.len())?;
    for item in items {
        item.encode_into(writer)?;
    }
    Ok(())
}

pub(crate) fn decode_seq<R: Read, T: Decode>(reader: &mut R, field: &'static str) -> Result<Vec<T>> {
    let count = read_len(reader, field)?;
    // counts come from disk, so grow as items actually decode
    let mut items = Vec::new();
    for _ in 0..count {
        items.push(T::decode_from(reader)?);
    }
    Ok(items)
}

/// Encodes the state persisted between sessions.
pub fn serialize(change_list: &ChangeList, root: &Snapshot, next_id: EntryId) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    change_list.encode_into(&mut buf)?;
    root.root().encode_into(&mut buf)?;
    buf.write_i32::<BigEndian>(next_id)
        .map_err(|e| Error::Encode("next_id", e))?;
    Ok(buf)
}

/// Inverse of [`serialize`].
pub fn deserialize(bytes: &[u8]) -> Result<(ChangeList, Snapshot, EntryId)> {
    let mut reader = bytes;
    let change_list = ChangeList::decode_from(&mut reader)?;
    let root = Snapshot::from_root(crate::tree::Entry::decode_from(&mut reader)?)?;
    let next_id = reader
        .read_i32::<BigEndian>()
        .map_err(|e| Error::Decode("next_id", e))?;
    if !reader.is_empty() {
        return Err(Error::InvalidData(format!(
            "{} trailing bytes after storage",
            reader.len()
        )));
    }
    Ok((change_list, root, next_id))
}
