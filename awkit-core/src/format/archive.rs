use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;

use super::bytekiller;
use super::memlist::{MemList, MemListEntry};

pub const MEMLIST_FILE_NAME: &str = "MEMLIST.BIN";

/// `BANK01`, `BANK0D`, ...
pub fn bank_file_name(bank_id: u8) -> String {
    format!("BANK{:02X}", bank_id)
}

/// Name of an extracted resource: `{id:02x}_{tag}.bin`.
pub fn resource_file_name(id: usize, entry: &MemListEntry) -> String {
    format!("{:02x}_{}.bin", id, entry.resource_type().tag())
}

/// A game data directory: the resource directory plus its bank files.
///
/// Banks are read on first use and kept in memory afterwards.
#[derive(Debug)]
pub struct Archive {
    data_dir: Option<PathBuf>,
    memlist: MemList,
    banks: HashMap<u8, Bytes>,
}

impl Archive {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        if !data_dir.is_dir() {
            bail!("data directory does not exist: {:?}", data_dir);
        }

        let memlist = MemList::load(data_dir.join(MEMLIST_FILE_NAME))?;
        log::info!(
            "{:?}: {} resources",
            data_dir,
            memlist.resources().count()
        );

        Ok(Self {
            data_dir: Some(data_dir.to_path_buf()),
            memlist,
            banks: HashMap::new(),
        })
    }

    /// Build an archive from buffers already in memory. Banks missing from
    /// `banks` are reported as errors, never looked up on disk.
    pub fn from_parts(memlist: MemList, banks: HashMap<u8, Bytes>) -> Self {
        Self {
            data_dir: None,
            memlist,
            banks,
        }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn memlist(&self) -> &MemList {
        &self.memlist
    }

    pub fn bank(&mut self, bank_id: u8) -> Result<Bytes> {
        if let Some(bank) = self.banks.get(&bank_id) {
            return Ok(bank.clone());
        }

        let data_dir = self
            .data_dir
            .as_ref()
            .ok_or_else(|| anyhow!("{} not loaded", bank_file_name(bank_id)))?;
        let path = data_dir.join(bank_file_name(bank_id));
        let bank = Bytes::from(
            std::fs::read(&path).with_context(|| format!("unable to load bank {:?}", path))?,
        );
        log::debug!("loaded {:?} ({} bytes)", path, bank.len());

        self.banks.insert(bank_id, bank.clone());
        Ok(bank)
    }

    /// Directory entry of a resource; the terminator is not a resource.
    pub fn entry(&self, id: usize) -> Result<MemListEntry> {
        match self.memlist.get(id) {
            Some(entry) if !entry.is_terminal() => Ok(*entry),
            Some(_) => bail!("resource 0x{:02x} is the directory terminator", id),
            None => bail!(
                "resource 0x{:02x} out of range ({} entries)",
                id,
                self.memlist.len()
            ),
        }
    }

    /// The stored bytes of a resource, as found in its bank.
    pub fn payload(&mut self, id: usize) -> Result<Bytes> {
        let entry = self.entry(id)?;
        let bank = self
            .bank(entry.bank_id)
            .with_context(|| format!("resource 0x{:02x}", id))?;

        let start = entry.bank_offset as usize;
        let end = start + entry.packed_size as usize;
        if end > bank.len() {
            bail!(
                "resource 0x{:02x}: payload 0x{:X}..0x{:X} exceeds {} ({} bytes)",
                id,
                start,
                end,
                bank_file_name(entry.bank_id),
                bank.len()
            );
        }

        Ok(bank.slice(start..end))
    }

    /// The resource as the engine sees it: raw payloads are copied, packed
    /// ones go through ByteKiller.
    pub fn extract(&mut self, id: usize) -> Result<Vec<u8>> {
        let entry = self.entry(id)?;
        let payload = self.payload(id)?;

        if entry.is_raw() {
            return Ok(payload.to_vec());
        }

        bytekiller::unpack(&payload, entry.unpacked_size as usize).with_context(|| {
            format!(
                "resource 0x{:02x}: failed to unpack {} bytes at {}:0x{:X}",
                id,
                entry.packed_size,
                bank_file_name(entry.bank_id),
                entry.bank_offset
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::memlist::MemListEntry;
    use pretty_assertions::assert_eq;

    fn entry(res_type: u8, bank_id: u8, bank_offset: u32, packed: u16, unpacked: u16) -> MemListEntry {
        MemListEntry {
            state: 0,
            res_type,
            unused1: 0,
            unused2: 0,
            unused3: 0,
            bank_id,
            bank_offset,
            unused4: 0,
            packed_size: packed,
            unused5: 0,
            unpacked_size: unpacked,
        }
    }

    fn terminator() -> MemListEntry {
        entry(0xFF, 0, 0, 0, 0)
    }

    #[test]
    fn raw_bytecode_is_copied_verbatim() {
        let memlist = MemList::from_entries(vec![entry(0x04, 0, 0, 4, 4), terminator()]);
        let banks = HashMap::from([(0, Bytes::from_static(&[0x05, 0x05, 0x05, 0x05, 0xEE]))]);
        let mut archive = Archive::from_parts(memlist, banks);

        assert_eq!(archive.extract(0).unwrap(), vec![0x05; 4]);
    }

    #[test]
    fn packed_resource_is_unpacked() {
        let data = b"polygon polygon polygon polygon".to_vec();
        let packed = bytekiller::pack(&data);
        assert_ne!(packed.len(), data.len());

        let mut bank = vec![0xCC; 7];
        bank.extend(&packed);
        let memlist = MemList::from_entries(vec![
            entry(0x05, 2, 7, packed.len() as u16, data.len() as u16),
            terminator(),
        ]);
        let mut archive = Archive::from_parts(memlist, HashMap::from([(2, Bytes::from(bank))]));

        assert_eq!(archive.extract(0).unwrap(), data);
    }

    #[test]
    fn payload_past_bank_end_is_rejected() {
        let memlist = MemList::from_entries(vec![entry(0x02, 1, 2, 4, 4)]);
        let banks = HashMap::from([(1, Bytes::from_static(&[0; 5]))]);
        let mut archive = Archive::from_parts(memlist, banks);

        let err = archive.extract(0).unwrap_err().to_string();
        assert!(err.contains("exceeds BANK01"), "{}", err);
    }

    #[test]
    fn missing_bank_names_the_resource() {
        let memlist = MemList::from_entries(vec![entry(0x00, 0x0d, 0, 1, 1)]);
        let mut archive = Archive::from_parts(memlist, HashMap::new());

        let err = format!("{:#}", archive.extract(0).unwrap_err());
        assert!(err.contains("resource 0x00"), "{}", err);
        assert!(err.contains("BANK0D"), "{}", err);
    }

    #[test]
    fn terminator_is_not_extractable() {
        let memlist = MemList::from_entries(vec![terminator()]);
        let mut archive = Archive::from_parts(memlist, HashMap::new());

        assert!(archive.extract(0).is_err());
        assert!(archive.extract(1).is_err());
    }

    #[test]
    fn file_names() {
        assert_eq!(bank_file_name(0x0a), "BANK0A");
        assert_eq!(resource_file_name(0x1f, &entry(0x04, 0, 0, 0, 0)), "1f_bytecode.bin");
        assert_eq!(resource_file_name(3, &entry(0x09, 0, 0, 0, 0)), "03_type09.bin");
    }
}
