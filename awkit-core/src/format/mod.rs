//! Resource archive formats.
//!
//! - [`memlist`]: the resource directory (`MEMLIST.BIN`)
//! - [`bytekiller`]: the bank payload codec
//! - [`archive`]: a data directory tying both together

mod archive;
pub mod bytekiller;
mod memlist;

pub use archive::{bank_file_name, resource_file_name, Archive, MEMLIST_FILE_NAME};
pub use memlist::{MemList, MemListEntry, MemListError, ResourceType, MEMLIST_ENTRY_SIZE};
