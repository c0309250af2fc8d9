//! Symmetric archive construction.
//!
//! The builder emits archives the parser accepts, which lets tools repack
//! replay sections and lets tests construct real containers instead of
//! shipping opaque binary fixtures.

use crate::crypt::{self, HashKind};
use crate::error::MpqResult;
use crate::header::MpqHeader;
use crate::table::{
    BlockEntry, FLAG_COMPRESS, FLAG_EXISTS, FLAG_SINGLE_UNIT, HashEntry,
};
use binrw::BinWrite;
use flate2::{Compression, write::ZlibEncoder};
use std::io::{Cursor, Write};

/// Compression-type byte for zlib sectors.
const COMPRESSION_ZLIB: u8 = 0x02;

struct FileSpec {
    name: String,
    data: Vec<u8>,
    compress: bool,
}

/// Builds a replay-shaped archive: optional user-data block, archive
/// header, single-unit files, encrypted hash and block tables.
///
/// A `(listfile)` naming every added file is appended automatically.
#[derive(Default)]
pub struct MpqBuilder {
    user_content: Option<Vec<u8>>,
    files: Vec<FileSpec>,
}

impl MpqBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the user-data content (the raw replay header bytes).
    #[must_use]
    pub fn user_data(mut self, content: Vec<u8>) -> Self {
        self.user_content = Some(content);
        self
    }

    /// Adds a file stored without compression.
    #[must_use]
    pub fn add_file(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.files.push(FileSpec {
            name: name.into(),
            data,
            compress: false,
        });
        self
    }

    /// Adds a file stored zlib-compressed (kept raw if compression does
    /// not shrink it, matching the on-disk convention).
    #[must_use]
    pub fn add_file_compressed(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.files.push(FileSpec {
            name: name.into(),
            data,
            compress: true,
        });
        self
    }

    /// Serializes the archive.
    pub fn build(mut self) -> MpqResult<Vec<u8>> {
        let listfile = self
            .files
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join("\r\n")
            .into_bytes();
        self.files.push(FileSpec {
            name: "(listfile)".to_owned(),
            data: listfile,
            compress: true,
        });

        let archive_offset = self.user_content.as_ref().map_or(0, |c| 16 + c.len());

        // Lay out single-unit file payloads after the fixed-size header.
        let mut payloads = Vec::with_capacity(self.files.len());
        let mut blocks = Vec::with_capacity(self.files.len());
        let mut rel_offset = MpqHeader::V1_SIZE;
        for file in &self.files {
            let (stored, compressed) = encode_payload(file)?;
            blocks.push(BlockEntry {
                offset: rel_offset,
                archived_size: stored.len() as u32,
                size: file.data.len() as u32,
                flags: FLAG_EXISTS
                    | FLAG_SINGLE_UNIT
                    | if compressed { FLAG_COMPRESS } else { 0 },
            });
            rel_offset += stored.len() as u32;
            payloads.push(stored);
        }

        let hash_table = place_hash_entries(&self.files);
        let hash_table_offset = rel_offset;
        let block_table_offset = hash_table_offset + (hash_table.len() * HashEntry::SIZE) as u32;
        let archive_size = block_table_offset + (blocks.len() * BlockEntry::SIZE) as u32;

        let header = MpqHeader {
            header_size: MpqHeader::V1_SIZE,
            archive_size,
            format_version: 1,
            sector_size_shift: 3,
            hash_table_offset,
            block_table_offset,
            hash_table_entries: hash_table.len() as u32,
            block_table_entries: blocks.len() as u32,
        };

        let mut out = Cursor::new(Vec::with_capacity(
            archive_offset + archive_size as usize,
        ));
        if let Some(content) = &self.user_content {
            let block = crate::header::UserDataHeader {
                user_data_size: content.len() as u32,
                header_offset: archive_offset as u32,
                content_size: content.len() as u32,
                content: content.clone(),
            };
            block.write(&mut out)?;
        }
        header.write(&mut out)?;
        for payload in &payloads {
            out.write_all(payload)?;
        }
        out.write_all(&encrypt_table(&hash_table, crypt::hash_table_key())?)?;
        out.write_all(&encrypt_table(&blocks, crypt::block_table_key())?)?;

        Ok(out.into_inner())
    }
}

fn encode_payload(file: &FileSpec) -> MpqResult<(Vec<u8>, bool)> {
    if file.compress && !file.data.is_empty() {
        let mut encoder = ZlibEncoder::new(vec![COMPRESSION_ZLIB], Compression::default());
        encoder.write_all(&file.data)?;
        let candidate = encoder.finish()?;
        if candidate.len() < file.data.len() {
            return Ok((candidate, true));
        }
    }
    Ok((file.data.clone(), false))
}

fn place_hash_entries(files: &[FileSpec]) -> Vec<HashEntry> {
    let capacity = files.len().next_power_of_two().max(4);
    let mut table = vec![HashEntry::empty(); capacity];
    for (block_index, file) in files.iter().enumerate() {
        let start = crypt::hash(&file.name, HashKind::TableOffset) as usize & (capacity - 1);
        // Linear probing; capacity is always a power of two above the
        // file count, so a free slot exists.
        for step in 0..capacity {
            let slot = (start + step) & (capacity - 1);
            if !table[slot].is_occupied() {
                table[slot] = HashEntry {
                    name_a: crypt::hash(&file.name, HashKind::NameA),
                    name_b: crypt::hash(&file.name, HashKind::NameB),
                    locale: 0,
                    platform: 0,
                    block_index: block_index as u32,
                };
                break;
            }
        }
    }
    table
}

fn encrypt_table<T>(entries: &[T], key: u32) -> MpqResult<Vec<u8>>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    let mut plain = Cursor::new(Vec::with_capacity(entries.len() * 16));
    for entry in entries {
        entry.write_le(&mut plain)?;
    }
    Ok(crypt::encrypt(plain.get_ref(), key))
}
