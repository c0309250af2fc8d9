//! User-data block and archive header structures.

use binrw::binrw;

/// Magic for the archive header block.
pub const ARCHIVE_MAGIC: [u8; 4] = *b"MPQ\x1a";

/// Magic for the user-data block that precedes the archive header in
/// replay files.
pub const USER_DATA_MAGIC: [u8; 4] = *b"MPQ\x1b";

/// User-data block at offset 0 of a replay file.
///
/// The `content` bytes are the raw replay header; they are decoded by the
/// protocol layer, not here.
#[binrw]
#[brw(little, magic = b"MPQ\x1b")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataHeader {
    /// Maximum size of the user-data area
    pub user_data_size: u32,
    /// Absolute offset of the archive header
    pub header_offset: u32,
    /// Size of the user-data content that follows this block
    pub content_size: u32,
    /// Raw replay-header bytes
    #[br(count = content_size)]
    pub content: Vec<u8>,
}

/// Archive header (format version 1 layout).
///
/// Later format versions append extension fields after these; they are not
/// needed to locate the tables or file data and are left unread.
#[binrw]
#[brw(little, magic = b"MPQ\x1a")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpqHeader {
    /// Size of this header in bytes
    pub header_size: u32,
    /// Size of the archive, relative to the archive header
    pub archive_size: u32,
    /// Format version
    pub format_version: u16,
    /// Sector size is `512 << sector_size_shift`
    pub sector_size_shift: u16,
    /// Hash table offset, relative to the archive header
    pub hash_table_offset: u32,
    /// Block table offset, relative to the archive header
    pub block_table_offset: u32,
    /// Number of hash table entries
    pub hash_table_entries: u32,
    /// Number of block table entries
    pub block_table_entries: u32,
}

impl MpqHeader {
    /// Size in bytes of the version 1 header layout.
    pub const V1_SIZE: u32 = 32;

    /// Sector size used for multi-sector files.
    pub fn sector_size(&self) -> usize {
        512 << self.sector_size_shift
    }
}
