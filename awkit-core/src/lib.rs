//! awkit-core
//!
//! File format support for the game's resource archive (`MEMLIST.BIN` + `BANKxx`),
//! the ByteKiller codec used to pack resources inside the banks, and a disassembler
//! for the script bytecode.
//!
//! Everything here works on in-memory buffers; the only I/O lives in
//! [`format::Archive`], [`format::MemList::load`] and the config loader.

pub mod config;
pub mod format;
pub mod script;

pub use format::bytekiller::{pack, unpack, ByteKillerError};
pub use format::{Archive, MemList, MemListEntry, MemListError, ResourceType};
pub use config::{LoggerConfig, ToolConfig};
pub use script::{disassemble, DecodeError, Disassembler, LabelKind, LabelMap};
