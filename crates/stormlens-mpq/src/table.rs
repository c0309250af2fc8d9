//! Hash and block table entries.

use binrw::binrw;

/// Block exists
pub const FLAG_EXISTS: u32 = 0x8000_0000;
/// Sector data is compressed
pub const FLAG_COMPRESS: u32 = 0x0000_0200;
/// Block data is encrypted
pub const FLAG_ENCRYPTED: u32 = 0x0001_0000;
/// File is stored as one unit rather than split into sectors
pub const FLAG_SINGLE_UNIT: u32 = 0x0100_0000;
/// Sector data is followed by a CRC sector
pub const FLAG_SECTOR_CRC: u32 = 0x0400_0000;

/// Hash-table slot that was never used.
pub const BLOCK_INDEX_EMPTY: u32 = 0xFFFF_FFFF;
/// Hash-table slot whose file was deleted.
pub const BLOCK_INDEX_DELETED: u32 = 0xFFFF_FFFE;

/// One hash table entry.
///
/// Occupied entries store two independent hashes of the file name; the
/// name itself is not stored.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEntry {
    /// First name hash
    pub name_a: u32,
    /// Second name hash
    pub name_b: u32,
    /// Locale of the entry (0 = neutral)
    pub locale: u16,
    /// Platform of the entry (0 = default)
    pub platform: u16,
    /// Index into the block table, or one of the sentinel values
    pub block_index: u32,
}

impl HashEntry {
    /// Entry size on disk.
    pub const SIZE: usize = 16;

    /// Slot that never held a file.
    pub fn empty() -> Self {
        Self {
            name_a: 0xFFFF_FFFF,
            name_b: 0xFFFF_FFFF,
            locale: 0xFFFF,
            platform: 0xFFFF,
            block_index: BLOCK_INDEX_EMPTY,
        }
    }

    /// Whether this slot points at a live block.
    pub fn is_occupied(&self) -> bool {
        self.block_index != BLOCK_INDEX_EMPTY && self.block_index != BLOCK_INDEX_DELETED
    }
}

/// One block table entry describing a stored file.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// File data offset, relative to the archive header
    pub offset: u32,
    /// Stored (possibly compressed) size in bytes
    pub archived_size: u32,
    /// Uncompressed size in bytes
    pub size: u32,
    /// Flag bits
    pub flags: u32,
}

impl BlockEntry {
    /// Entry size on disk.
    pub const SIZE: usize = 16;

    /// Block exists flag.
    pub fn exists(&self) -> bool {
        self.flags & FLAG_EXISTS != 0
    }

    /// Compression flag.
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESS != 0
    }

    /// Encryption flag.
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Single-unit storage flag.
    pub fn is_single_unit(&self) -> bool {
        self.flags & FLAG_SINGLE_UNIT != 0
    }

    /// Sector CRC flag.
    pub fn has_sector_crc(&self) -> bool {
        self.flags & FLAG_SECTOR_CRC != 0
    }
}
