use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::{decode_seq, encode_seq, read_flag, read_string, write_flag, write_string, Decode, Encode};
use crate::change::{Change, ChangeKind, ChangeList, ChangeSet};
use crate::content::Content;
use crate::error::Result;
use crate::tree::{Entry, IdPath};
use crate::Error;

const CREATE_FILE: u8 = 0x01;
const CREATE_DIRECTORY: u8 = 0x02;
const CHANGE_FILE_CONTENT: u8 = 0x03;
const RENAME: u8 = 0x04;
const MOVE: u8 = 0x05;
const DELETE: u8 = 0x06;

fn write_i32<W: Write>(writer: &mut W, field: &'static str, v: i32) -> Result<()> {
    writer
        .write_i32::<BigEndian>(v)
        .map_err(|e| Error::Encode(field, e))
}

fn read_i32<R: Read>(reader: &mut R, field: &'static str) -> Result<i32> {
    reader
        .read_i32::<BigEndian>()
        .map_err(|e| Error::Decode(field, e))
}

fn write_i64<W: Write>(writer: &mut W, field: &'static str, v: i64) -> Result<()> {
    writer
        .write_i64::<BigEndian>(v)
        .map_err(|e| Error::Encode(field, e))
}

fn read_i64<R: Read>(reader: &mut R, field: &'static str) -> Result<i64> {
    reader
        .read_i64::<BigEndian>()
        .map_err(|e| Error::Decode(field, e))
}

impl Encode for Change {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self.kind() {
            ChangeKind::CreateFile {
                id,
                path,
                content,
                timestamp,
            } => {
                writer
                    .write_u8(CREATE_FILE)
                    .map_err(|e| Error::Encode("change tag", e))?;
                write_i32(writer, "entry id", *id)?;
                write_string(writer, "path", path)?;
                content.encode_into(writer)?;
                write_i64(writer, "timestamp", *timestamp)?;
            }

            ChangeKind::CreateDirectory { id, path } => {
                writer
                    .write_u8(CREATE_DIRECTORY)
                    .map_err(|e| Error::Encode("change tag", e))?;
                write_i32(writer, "entry id", *id)?;
                write_string(writer, "path", path)?;
            }

            ChangeKind::ChangeFileContent {
                path,
                content,
                timestamp,
                previous,
            } => {
                writer
                    .write_u8(CHANGE_FILE_CONTENT)
                    .map_err(|e| Error::Encode("change tag", e))?;
                write_string(writer, "path", path)?;
                content.encode_into(writer)?;
                write_i64(writer, "timestamp", *timestamp)?;
                write_flag(writer, "previous content", previous.is_some())?;
                if let Some((content, timestamp)) = previous {
                    content.encode_into(writer)?;
                    write_i64(writer, "previous timestamp", *timestamp)?;
                }
            }

            ChangeKind::Rename { path, new_name } => {
                writer
                    .write_u8(RENAME)
                    .map_err(|e| Error::Encode("change tag", e))?;
                write_string(writer, "path", path)?;
                write_string(writer, "new name", new_name)?;
            }

            ChangeKind::Move { path, new_parent } => {
                writer
                    .write_u8(MOVE)
                    .map_err(|e| Error::Encode("change tag", e))?;
                write_string(writer, "path", path)?;
                write_string(writer, "new parent", new_parent)?;
            }

            ChangeKind::Delete { path, removed } => {
                writer
                    .write_u8(DELETE)
                    .map_err(|e| Error::Encode("change tag", e))?;
                write_string(writer, "path", path)?;
                write_flag(writer, "removed entry", removed.is_some())?;
                if let Some(entry) = removed {
                    entry.encode_into(writer)?;
                }
            }
        }
        encode_seq(writer, "affected", self.affected())
    }
}

impl Decode for Change {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self> {
        let tag = reader
            .read_u8()
            .map_err(|e| Error::Decode("change tag", e))?;

        let kind = match tag {
            CREATE_FILE => ChangeKind::CreateFile {
                id: read_i32(reader, "entry id")?,
                path: read_string(reader, "path")?,
                content: Content::decode_from(reader)?,
                timestamp: read_i64(reader, "timestamp")?,
            },

            CREATE_DIRECTORY => ChangeKind::CreateDirectory {
                id: read_i32(reader, "entry id")?,
                path: read_string(reader, "path")?,
            },

            CHANGE_FILE_CONTENT => {
                let path = read_string(reader, "path")?;
                let content = Content::decode_from(reader)?;
                let timestamp = read_i64(reader, "timestamp")?;
                let previous = if read_flag(reader, "previous content")? {
                    let content = Content::decode_from(reader)?;
                    Some((content, read_i64(reader, "previous timestamp")?))
                } else {
                    None
                };
                ChangeKind::ChangeFileContent {
                    path,
                    content,
                    timestamp,
                    previous,
                }
            }

            RENAME => ChangeKind::Rename {
                path: read_string(reader, "path")?,
                new_name: read_string(reader, "new name")?,
            },

            MOVE => ChangeKind::Move {
                path: read_string(reader, "path")?,
                new_parent: read_string(reader, "new parent")?,
            },

            DELETE => {
                let path = read_string(reader, "path")?;
                let removed = if read_flag(reader, "removed entry")? {
                    Some(Entry::decode_from(reader)?)
                } else {
                    None
                };
                ChangeKind::Delete { path, removed }
            }

            other => return Err(Error::UnknownTag("change", other)),
        };

        let affected = decode_seq::<_, IdPath>(reader, "affected")?;
        Ok(Change::from_parts(kind, affected))
    }
}

impl Encode for ChangeSet {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_i64(writer, "change set timestamp", self.timestamp())?;
        write_flag(writer, "label", self.label().is_some())?;
        if let Some(label) = self.label() {
            write_string(writer, "label", label)?;
        }
        encode_seq(writer, "changes", self.changes())
    }
}

impl Decode for ChangeSet {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self> {
        let timestamp = read_i64(reader, "change set timestamp")?;
        let label = if read_flag(reader, "label")? {
            Some(read_string(reader, "label")?)
        } else {
            None
        };
        let changes = decode_seq(reader, "changes")?;
        Ok(ChangeSet::from_parts(timestamp, label, changes))
    }
}

impl Encode for ChangeList {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<()> {
        encode_seq(writer, "change sets", self.change_sets())
    }
}

impl Decode for ChangeList {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(ChangeList::from_change_sets(decode_seq(reader, "change sets")?))
    }
}
