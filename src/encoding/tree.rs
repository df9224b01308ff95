use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::{decode_seq, encode_seq, read_len, read_string, write_len, write_string, Decode, Encode};
use crate::content::Content;
use crate::error::Result;
use crate::tree::{Entry, EntryKind, IdPath};
use crate::Error;

const CONTENT_STORED: u8 = 0x01;
const CONTENT_LONG: u8 = 0x02;
const CONTENT_UNAVAILABLE: u8 = 0x03;

const ENTRY_FILE: u8 = 0x01;
const ENTRY_DIRECTORY: u8 = 0x02;

impl Encode for Content {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Content::Stored { id, length } => {
                writer
                    .write_u8(CONTENT_STORED)
                    .map_err(|e| Error::Encode("content tag", e))?;
                writer
                    .write_i32::<BigEndian>(*id)
                    .map_err(|e| Error::Encode("content id", e))?;
                writer
                    .write_u64::<BigEndian>(*length)
                    .map_err(|e| Error::Encode("content length", e))?;
            }
            Content::Long => writer
                .write_u8(CONTENT_LONG)
                .map_err(|e| Error::Encode("content tag", e))?,
            Content::Unavailable => writer
                .write_u8(CONTENT_UNAVAILABLE)
                .map_err(|e| Error::Encode("content tag", e))?,
        }
        Ok(())
    }
}

impl Decode for Content {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self> {
        let tag = reader
            .read_u8()
            .map_err(|e| Error::Decode("content tag", e))?;
        match tag {
            CONTENT_STORED => {
                let id = reader
                    .read_i32::<BigEndian>()
                    .map_err(|e| Error::Decode("content id", e))?;
                let length = reader
                    .read_u64::<BigEndian>()
                    .map_err(|e| Error::Decode("content length", e))?;
                Ok(Content::Stored { id, length })
            }
            CONTENT_LONG => Ok(Content::Long),
            CONTENT_UNAVAILABLE => Ok(Content::Unavailable),
            other => Err(Error::UnknownTag("content", other)),
        }
    }
}

impl Encode for Entry {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<()> {
        let tag = match self.kind() {
            EntryKind::File { .. } => ENTRY_FILE,
            EntryKind::Directory { .. } => ENTRY_DIRECTORY,
        };
        writer
            .write_u8(tag)
            .map_err(|e| Error::Encode("entry tag", e))?;
        writer
            .write_i32::<BigEndian>(self.id())
            .map_err(|e| Error::Encode("entry id", e))?;
        write_string(writer, "entry name", self.name())?;

        match self.kind() {
            EntryKind::File { content, timestamp } => {
                content.encode_into(writer)?;
                writer
                    .write_i64::<BigEndian>(*timestamp)
                    .map_err(|e| Error::Encode("entry timestamp", e))?;
            }
            EntryKind::Directory { children } => {
                encode_seq(writer, "children", children.as_slice())?
            }
        }
        Ok(())
    }
}

impl Decode for Entry {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self> {
        let tag = reader
            .read_u8()
            .map_err(|e| Error::Decode("entry tag", e))?;
        let id = reader
            .read_i32::<BigEndian>()
            .map_err(|e| Error::Decode("entry id", e))?;
        let name = read_string(reader, "entry name")?;

        match tag {
            ENTRY_FILE => {
                let content = Content::decode_from(reader)?;
                let timestamp = reader
                    .read_i64::<BigEndian>()
                    .map_err(|e| Error::Decode("entry timestamp", e))?;
                Ok(Entry::new_file(id, name, content, timestamp))
            }
            ENTRY_DIRECTORY => {
                let mut dir = Entry::new_directory(id, name);
                for child in decode_seq::<_, Entry>(reader, "children")? {
                    dir.add_child(child).map_err(|e| match e {
                        Error::EntryExists(name) => {
                            Error::InvalidData(format!("duplicate child name '{}'", name))
                        }
                        other => other,
                    })?;
                }
                Ok(dir)
            }
            other => Err(Error::UnknownTag("entry", other)),
        }
    }
}

impl Encode for IdPath {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_len(writer, "id path", self.ids().len())?;
        for id in self.ids() {
            writer
                .write_i32::<BigEndian>(*id)
                .map_err(|e| Error::Encode("id path", e))?;
        }
        Ok(())
    }
}

impl Decode for IdPath {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self> {
        let count = read_len(reader, "id path")?;
        let mut ids = Vec::new();
        for _ in 0..count {
            ids.push(
                reader
                    .read_i32::<BigEndian>()
                    .map_err(|e| Error::Decode("id path", e))?,
            );
        }
        Ok(IdPath::new(ids))
    }
}
