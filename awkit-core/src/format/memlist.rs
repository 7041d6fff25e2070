use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

/// Size of one directory record.
pub const MEMLIST_ENTRY_SIZE: usize = 20;

const TERMINATOR_TYPE: u8 = 0xFF;

#[derive(thiserror::Error, Debug)]
pub enum MemListError {
    #[error("truncated MEMLIST record at offset 0x{offset:X}: got {len} of 20 bytes")]
    Truncated { offset: usize, len: usize },
}

/// Resource kind stored in the `type` byte of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Sound,
    Music,
    Bitmap,
    Palette,
    Bytecode,
    Polygon1,
    Polygon2,
    End,
    Unknown(u8),
}

impl From<u8> for ResourceType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => ResourceType::Sound,
            0x01 => ResourceType::Music,
            0x02 => ResourceType::Bitmap,
            0x03 => ResourceType::Palette,
            0x04 => ResourceType::Bytecode,
            0x05 => ResourceType::Polygon1,
            0x06 => ResourceType::Polygon2,
            0xFF => ResourceType::End,
            other => ResourceType::Unknown(other),
        }
    }
}

impl ResourceType {
    /// Tag used in extracted file names (`{id:02x}_{tag}.bin`).
    pub fn tag(&self) -> Cow<'static, str> {
        match self {
            ResourceType::Sound => Cow::Borrowed("sound"),
            ResourceType::Music => Cow::Borrowed("music"),
            ResourceType::Bitmap => Cow::Borrowed("bitmap"),
            ResourceType::Palette => Cow::Borrowed("palette"),
            ResourceType::Bytecode => Cow::Borrowed("bytecode"),
            ResourceType::Polygon1 => Cow::Borrowed("polygon1"),
            ResourceType::Polygon2 => Cow::Borrowed("polygon2"),
            ResourceType::End => Cow::Borrowed("end"),
            ResourceType::Unknown(v) => Cow::Owned(format!("type{:02x}", v)),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

/// One 20-byte big-endian directory record.
///
/// The `unused*` fields are never interpreted, only carried over so a rebuilt
/// directory stays byte-identical for untouched resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemListEntry {
    pub state: u8,
    #[serde(rename = "type")]
    pub res_type: u8,
    pub unused1: u16,
    pub unused2: u16,
    pub unused3: u8,
    pub bank_id: u8,
    pub bank_offset: u32,
    pub unused4: u16,
    pub packed_size: u16,
    pub unused5: u16,
    pub unpacked_size: u16,
}

impl MemListEntry {
    /// Decode one record. `offset` is only used for error reporting.
    pub fn read(record: &[u8], offset: usize) -> std::result::Result<Self, MemListError> {
        if record.len() != MEMLIST_ENTRY_SIZE {
            return Err(MemListError::Truncated {
                offset,
                len: record.len(),
            });
        }

        Ok(Self {
            state: record[0],
            res_type: record[1],
            unused1: BigEndian::read_u16(&record[2..]),
            unused2: BigEndian::read_u16(&record[4..]),
            unused3: record[6],
            bank_id: record[7],
            bank_offset: BigEndian::read_u32(&record[8..]),
            unused4: BigEndian::read_u16(&record[12..]),
            packed_size: BigEndian::read_u16(&record[14..]),
            unused5: BigEndian::read_u16(&record[16..]),
            unpacked_size: BigEndian::read_u16(&record[18..]),
        })
    }

    /// Encode the record, the exact inverse of [`MemListEntry::read`].
    pub fn to_bytes(&self) -> [u8; MEMLIST_ENTRY_SIZE] {
        let mut record = [0u8; MEMLIST_ENTRY_SIZE];
        record[0] = self.state;
        record[1] = self.res_type;
        BigEndian::write_u16(&mut record[2..], self.unused1);
        BigEndian::write_u16(&mut record[4..], self.unused2);
        record[6] = self.unused3;
        record[7] = self.bank_id;
        BigEndian::write_u32(&mut record[8..], self.bank_offset);
        BigEndian::write_u16(&mut record[12..], self.unused4);
        BigEndian::write_u16(&mut record[14..], self.packed_size);
        BigEndian::write_u16(&mut record[16..], self.unused5);
        BigEndian::write_u16(&mut record[18..], self.unpacked_size);
        record
    }

    #[inline]
    pub fn resource_type(&self) -> ResourceType {
        ResourceType::from(self.res_type)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.res_type == TERMINATOR_TYPE
    }

    /// Payload is stored as-is in the bank.
    #[inline]
    pub fn is_raw(&self) -> bool {
        self.packed_size == self.unpacked_size
    }
}

/// The resource directory, in file order, terminator included when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemList {
    entries: Vec<MemListEntry>,
}

impl MemList {
    pub fn from_entries(entries: Vec<MemListEntry>) -> Self {
        Self { entries }
    }

    /// Parse records until the first terminator (kept) or the end of input.
    /// Anything after the terminator is ignored.
    pub fn parse(data: &[u8]) -> std::result::Result<Self, MemListError> {
        let mut entries = Vec::new();
        for (i, record) in data.chunks(MEMLIST_ENTRY_SIZE).enumerate() {
            let entry = MemListEntry::read(record, i * MEMLIST_ENTRY_SIZE)?;
            entries.push(entry);
            if entry.is_terminal() {
                break;
            }
        }

        Ok(Self { entries })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).with_context(|| format!("unable to load {:?}", path))?;
        let memlist = Self::parse(&data).with_context(|| format!("invalid directory {:?}", path))?;
        log::debug!("{:?}: {} directory entries", path, memlist.len());
        Ok(memlist)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.entries.len() * MEMLIST_ENTRY_SIZE);
        for entry in &self.entries {
            buffer.extend_from_slice(&entry.to_bytes());
        }
        buffer
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()).with_context(|| format!("unable to write {:?}", path))
    }

    pub fn entries(&self) -> &[MemListEntry] {
        &self.entries
    }

    pub fn get(&self, id: usize) -> Option<&MemListEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(resource_id, entry)` for every entry before the terminator.
    pub fn resources(&self) -> impl Iterator<Item = (usize, &MemListEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .take_while(|(_, e)| !e.is_terminal())
    }

    pub fn terminator(&self) -> Option<&MemListEntry> {
        self.entries.last().filter(|e| e.is_terminal())
    }
}
