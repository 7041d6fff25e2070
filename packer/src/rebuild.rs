use std::collections::btree_map::{BTreeMap, Entry};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use awkit_core::format::{bank_file_name, MEMLIST_FILE_NAME};
use awkit_core::{Archive, MemList, MemListEntry};

/// How a replacement file ended up in the rebuilt archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// identical to the original resource, original bytes kept
    Unchanged,
    /// stored as-is
    Raw,
    /// compressed with ByteKiller
    Packed,
}

/// Patches an archive's directory and banks with edited resources.
pub struct Rebuilder {
    archive: Archive,
    recompress: bool,
    entries: Vec<MemListEntry>,
    banks: BTreeMap<u8, Vec<u8>>,
}

impl Rebuilder {
    pub fn new(archive: Archive, recompress: bool) -> Self {
        let entries = archive.memlist().entries().to_vec();
        Self {
            archive,
            recompress,
            entries,
            banks: BTreeMap::new(),
        }
    }

    /// The single `{id:02x}_*.bin` in `resources`, if any.
    fn find_replacement(resources: &Path, id: usize) -> Result<Option<PathBuf>> {
        let pattern = format!(
            "{}/{:02x}_*.bin",
            glob::Pattern::escape(&resources.to_string_lossy()),
            id
        );
        let matches = glob::glob(&pattern)?.collect::<std::result::Result<Vec<_>, _>>()?;

        match matches.as_slice() {
            [] => Ok(None),
            [path] => Ok(Some(path.clone())),
            _ => bail!(
                "resource 0x{:02x}: {} candidate files: {:?}",
                id,
                matches.len(),
                matches
            ),
        }
    }

    fn bank_mut(&mut self, bank_id: u8) -> Result<&mut Vec<u8>> {
        match self.banks.entry(bank_id) {
            Entry::Occupied(bank) => Ok(bank.into_mut()),
            Entry::Vacant(slot) => {
                let bank = self.archive.bank(bank_id)?.to_vec();
                Ok(slot.insert(bank))
            }
        }
    }

    /// Whether an entry other than `id` still reads from `[start, end)` of the bank.
    fn slot_is_shared(&self, id: usize, bank_id: u8, start: usize, end: usize) -> bool {
        self.entries.iter().enumerate().any(|(other, e)| {
            let other_start = e.bank_offset as usize;
            other != id
                && !e.is_terminal()
                && e.bank_id == bank_id
                && other_start < end
                && start < other_start + e.packed_size as usize
        })
    }

    /// Apply every replacement found in `resources`.
    pub fn rebuild(&mut self, resources: &Path) -> Result<()> {
        if !resources.is_dir() {
            bail!("resource directory does not exist: {:?}", resources);
        }

        let ids: Vec<usize> = self.archive.memlist().resources().map(|(id, _)| id).collect();
        let (mut unchanged, mut replaced) = (0, 0);
        for id in ids {
            // every referenced bank is written out, edited or not
            let bank_id = self.entries[id].bank_id;
            self.bank_mut(bank_id)
                .with_context(|| format!("resource 0x{:02x}", id))?;

            let Some(path) = Self::find_replacement(resources, id)? else {
                log::debug!("resource 0x{:02x}: no replacement, keeping original payload", id);
                unchanged += 1;
                continue;
            };

            let data = std::fs::read(&path).with_context(|| format!("unable to read {:?}", path))?;
            let outcome = self
                .replace(id, &data)
                .with_context(|| format!("resource 0x{:02x} ({:?})", id, path))?;
            log::debug!("resource 0x{:02x}: {:?}", id, outcome);
            match outcome {
                Outcome::Unchanged => unchanged += 1,
                Outcome::Raw | Outcome::Packed => replaced += 1,
            }
        }

        log::info!("{} resources replaced, {} unchanged", replaced, unchanged);
        Ok(())
    }

    /// Store `data` as the new content of resource `id`.
    pub fn replace(&mut self, id: usize, data: &[u8]) -> Result<Outcome> {
        let entry = self.archive.entry(id)?;
        let unpacked_size = u16::try_from(data.len())
            .with_context(|| format!("{} bytes do not fit in a directory entry", data.len()))?;

        let payload = if entry.is_raw() {
            if self.archive.payload(id)? == data {
                return Ok(Outcome::Unchanged);
            }
            data.to_vec()
        } else {
            if self.archive.extract(id)? == data {
                return Ok(Outcome::Unchanged);
            }
            if !self.recompress {
                bail!("stored compressed and modified; pass --recompress to compress it");
            }
            let packed = awkit_core::pack(data);
            if packed.len() >= data.len() {
                // equal sizes mark a raw payload, so anything that does not shrink is stored raw
                log::warn!(
                    "resource 0x{:02x}: does not compress ({} -> {} bytes), storing raw",
                    id,
                    data.len(),
                    packed.len()
                );
                data.to_vec()
            } else {
                packed
            }
        };

        let outcome = if payload.len() == data.len() {
            Outcome::Raw
        } else {
            Outcome::Packed
        };

        let start = entry.bank_offset as usize;
        let end = start + payload.len();
        let mut in_place = payload.len() <= entry.packed_size as usize;
        if in_place && self.slot_is_shared(id, entry.bank_id, start, end) {
            log::debug!("resource 0x{:02x}: slot is shared with another entry, appending", id);
            in_place = false;
        }

        let bank = self.bank_mut(entry.bank_id)?;
        let offset = if in_place {
            bank[start..end].copy_from_slice(&payload);
            start
        } else {
            let start = bank.len();
            bank.extend_from_slice(&payload);
            start
        };
        let bank_offset = u32::try_from(offset).with_context(|| {
            format!("{} grew past 4 GiB", bank_file_name(entry.bank_id))
        })?;

        let slot = &mut self.entries[id];
        slot.bank_offset = bank_offset;
        slot.packed_size = payload.len() as u16;
        slot.unpacked_size = unpacked_size;
        Ok(outcome)
    }

    /// Write the directory and every bank to `output`.
    pub fn write(&self, output: &Path) -> Result<()> {
        if let Some(data_dir) = self.archive.data_dir() {
            let same = match (data_dir.canonicalize(), output.canonicalize()) {
                (Ok(a), Ok(b)) => a == b,
                _ => data_dir == output,
            };
            if same {
                bail!("refusing to overwrite the original data in {:?}", data_dir);
            }
        }

        std::fs::create_dir_all(output).with_context(|| format!("unable to create {:?}", output))?;
        MemList::from_entries(self.entries.clone()).save(output.join(MEMLIST_FILE_NAME))?;
        for (bank_id, bank) in &self.banks {
            let path = output.join(bank_file_name(*bank_id));
            std::fs::write(&path, bank).with_context(|| format!("unable to write {:?}", path))?;
            log::debug!("wrote {:?} ({} bytes)", path, bank.len());
        }
        Ok(())
    }
}
