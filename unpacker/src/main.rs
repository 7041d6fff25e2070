use anyhow::{bail, Context, Result};
use awkit_core::config::{LoggerConfig, ToolConfig};
use awkit_core::format::{bank_file_name, resource_file_name};
use awkit_core::{Archive, MemListEntry, ResourceType};
use clap::Parser;
use std::path::{Path, PathBuf};

use manifest::{Manifest, ManifestEntry};

mod manifest;

/// Extract every resource of a MEMLIST.BIN/BANKxx data directory
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// directory holding MEMLIST.BIN and the BANKxx files
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// destination directory for the extracted resources
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// print the resource directory and exit
    #[arg(short, long)]
    list: bool,

    /// also write a `.asm` listing for every bytecode resource
    #[arg(long)]
    disasm: bool,

    #[arg(short, long)]
    verbose: bool,

    /// tool configuration (defaults to `awkit.toml` when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_logger(config: &LoggerConfig) {
    let directives = config.filter_directives(&["awkit_core", "unpacker"]);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(directives)).init();
}

fn list(archive: &Archive) -> String {
    let mut out = String::from("id  type       bank    offset    packed  unpacked  storage\n");
    for (id, entry) in archive.memlist().resources() {
        out.push_str(&format!(
            "{:02x}  {:<9}  {}  0x{:06X}  {:>6}  {:>8}  {}\n",
            id,
            entry.resource_type().tag(),
            bank_file_name(entry.bank_id),
            entry.bank_offset,
            entry.packed_size,
            entry.unpacked_size,
            if entry.is_raw() { "raw" } else { "packed" }
        ));
    }
    out
}

fn extract_one(
    archive: &mut Archive,
    id: usize,
    entry: &MemListEntry,
    output: &Path,
    disasm: bool,
) -> Result<Option<String>> {
    let file = resource_file_name(id, entry);
    let data = archive.extract(id)?;
    let path = output.join(&file);
    std::fs::write(&path, &data).with_context(|| format!("unable to write {:?}", path))?;
    log::debug!(
        "{} <- {}:0x{:X} ({} -> {} bytes)",
        file,
        bank_file_name(entry.bank_id),
        entry.bank_offset,
        entry.packed_size,
        data.len()
    );

    if !disasm || entry.resource_type() != ResourceType::Bytecode {
        return Ok(None);
    }

    let listing = format!("{:02x}_bytecode.asm", id);
    let text = awkit_core::disassemble(&data)
        .with_context(|| format!("failed to disassemble resource 0x{:02x}", id))?;
    let path = output.join(&listing);
    std::fs::write(&path, text).with_context(|| format!("unable to write {:?}", path))?;
    Ok(Some(listing))
}

/// Extract everything, carrying on past failed resources. The manifest is
/// written in every case; the result is an error when anything failed.
fn unpack_all(archive: &mut Archive, output: &Path, disasm: bool) -> Result<Manifest> {
    std::fs::create_dir_all(output).with_context(|| format!("unable to create {:?}", output))?;

    let resources: Vec<(usize, MemListEntry)> = archive
        .memlist()
        .resources()
        .map(|(id, entry)| (id, *entry))
        .collect();

    let mut manifest = Manifest::new(archive.data_dir().unwrap_or_else(|| Path::new("")));
    for (id, entry) in resources {
        let (listing, error) = match extract_one(archive, id, &entry, output, disasm) {
            Ok(listing) => (listing, None),
            Err(err) => {
                log::error!("resource 0x{:02x}: {:#}", id, err);
                (None, Some(format!("{:#}", err)))
            }
        };
        manifest.resources.push(ManifestEntry {
            id,
            file: resource_file_name(id, &entry),
            listing,
            error,
            entry,
        });
    }

    let manifest_path = manifest.write(output)?;
    log::debug!("wrote {:?}", manifest_path);

    let failed = manifest.failures();
    if failed > 0 {
        bail!(
            "{} of {} resources failed, see {:?}",
            failed,
            manifest.resources.len(),
            manifest_path
        );
    }

    log::info!("{} resources unpacked to {:?}", manifest.resources.len(), output);
    Ok(manifest)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = ToolConfig::load_or_default(args.config.as_deref())?;
    let logger_config = if args.verbose {
        LoggerConfig::verbose()
    } else {
        config.logger_config.clone()
    };
    init_logger(&logger_config);

    let Some(data_dir) = args.data_dir.or(config.data_dir) else {
        bail!("no data directory: pass --data-dir or set data_dir in the config");
    };
    let mut archive = Archive::open(&data_dir)?;

    if args.list {
        print!("{}", list(&archive));
        return Ok(());
    }

    let Some(output) = args.output.or(config.output_dir) else {
        bail!("no output directory: pass --output or set output_dir in the config");
    };
    unpack_all(&mut archive, &output, args.disasm)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use awkit_core::format::MEMLIST_FILE_NAME;
    use awkit_core::MemList;
    use pretty_assertions::assert_eq;

    fn entry(res_type: u8, bank_offset: u32, packed: usize, unpacked: usize) -> MemListEntry {
        MemListEntry {
            state: 0,
            res_type,
            unused1: 0,
            unused2: 0,
            unused3: 0,
            bank_id: 1,
            bank_offset,
            unused4: 0,
            packed_size: packed as u16,
            unused5: 0,
            unpacked_size: unpacked as u16,
        }
    }

    /// Data directory with a raw bytecode resource, a packed palette and,
    /// optionally, a palette whose payload is corrupt.
    fn data_dir(name: &str, corrupt: bool) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("awkit-unpacker-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let bytecode = vec![0x04, 0x00, 0x04, 0x05, 0x07, 0x00, 0x00];
        let palette: Vec<u8> = (0..64u8).map(|i| i / 8).collect();
        let packed = awkit_core::pack(&palette);

        let mut bank = bytecode.clone();
        bank.extend(&packed);
        let mut entries = vec![
            entry(0x04, 0, bytecode.len(), bytecode.len()),
            entry(0x03, bytecode.len() as u32, packed.len(), palette.len()),
        ];
        if corrupt {
            let offset = bank.len() as u32;
            let mut broken = packed.clone();
            let last = broken.len() - 1;
            broken[last - 4] ^= 0xFF;
            bank.extend(&broken);
            entries.push(entry(0x03, offset, broken.len(), palette.len()));
        }
        entries.push(entry(0xFF, 0, 0, 0));

        MemList::from_entries(entries).save(dir.join(MEMLIST_FILE_NAME)).unwrap();
        std::fs::write(dir.join("BANK01"), bank).unwrap();
        dir
    }

    #[test]
    fn unpacks_every_resource() -> Result<()> {
        let data = data_dir("ok", false);
        let output = data.join("out");
        let mut archive = Archive::open(&data)?;

        let manifest = unpack_all(&mut archive, &output, true)?;
        assert_eq!(manifest.resources.len(), 2);
        assert_eq!(manifest.failures(), 0);

        assert_eq!(
            std::fs::read(output.join("00_bytecode.bin"))?,
            vec![0x04, 0x00, 0x04, 0x05, 0x07, 0x00, 0x00]
        );
        assert_eq!(
            std::fs::read(output.join("01_palette.bin"))?,
            (0..64u8).map(|i| i / 8).collect::<Vec<_>>()
        );
        assert_eq!(
            std::fs::read_to_string(output.join("00_bytecode.asm"))?,
            "label_0000:\n    CALL func_0004\n    RET\nfunc_0004:\n    JUMP label_0000\n"
        );

        let reloaded = Manifest::load(output.join(manifest::MANIFEST_FILE_NAME))?;
        assert_eq!(reloaded, manifest);
        assert_eq!(reloaded.resources[0].listing.as_deref(), Some("00_bytecode.asm"));

        std::fs::remove_dir_all(&data)?;
        Ok(())
    }

    #[test]
    fn failures_are_collected() -> Result<()> {
        let data = data_dir("corrupt", true);
        let output = data.join("out");
        let mut archive = Archive::open(&data)?;

        let err = unpack_all(&mut archive, &output, false).unwrap_err();
        assert!(err.to_string().starts_with("1 of 3 resources failed"), "{}", err);

        // the good resources are still there, and so is the manifest
        assert!(output.join("00_bytecode.bin").is_file());
        assert!(output.join("01_palette.bin").is_file());
        assert!(!output.join("02_palette.bin").exists());

        let manifest = Manifest::load(output.join(manifest::MANIFEST_FILE_NAME))?;
        let error = manifest.resources[2].error.as_deref().unwrap_or_default();
        assert!(error.contains("resource 0x02"), "{}", error);

        std::fs::remove_dir_all(&data)?;
        Ok(())
    }

    #[test]
    fn listing_shows_storage() -> Result<()> {
        let data = data_dir("list", false);
        let archive = Archive::open(&data)?;

        let table = list(&archive);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("00  bytecode   BANK01  0x000000"), "{}", lines[1]);
        assert!(lines[1].ends_with("raw"));
        assert!(lines[2].ends_with("packed"));

        std::fs::remove_dir_all(&data)?;
        Ok(())
    }
}
