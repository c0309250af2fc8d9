//! Parsed archive container over a pluggable byte source.

use crate::crypt::{self, HashKind};
use crate::error::{MpqError, MpqResult};
use crate::header::{ARCHIVE_MAGIC, MpqHeader, USER_DATA_MAGIC, UserDataHeader};
use crate::table::{BlockEntry, HashEntry};
use binrw::BinRead;
use flate2::read::ZlibDecoder;
use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

/// Compression-type byte for zlib sectors.
const COMPRESSION_ZLIB: u8 = 0x02;

/// Byte-source strategy for an opened archive.
///
/// Two file-backed implementations exist: [`FileSource`] (buffered reads)
/// and [`MmapSource`] (memory-mapped). The caller picks one at open time;
/// there is no runtime capability probing.
pub trait ArchiveSource: std::fmt::Debug {
    /// Total length of the underlying bytes.
    fn len(&self) -> u64;

    /// Whether the source holds no bytes at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads exactly `buf.len()` bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()>;
}

/// Buffered file-backed source.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    /// Opens `path` for buffered positioned reads.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl ArchiveSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }
}

/// Memory-mapped file source.
#[derive(Debug)]
pub struct MmapSource {
    mmap: Mmap,
}

impl MmapSource {
    /// Maps `path` read-only.
    #[allow(unsafe_code)] // Mmap::map is unsafe by signature; the file is opened read-only.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }
}

impl ArchiveSource for MmapSource {
    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))?;
        let end = start
            .checked_add(buf.len())
            .filter(|end| *end <= self.mmap.len())
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(&self.mmap[start..end]);
        Ok(())
    }
}

/// In-memory source, used for archives built or received as byte vectors.
#[derive(Debug)]
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    /// Wraps an owned byte vector.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl ArchiveSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))?;
        let end = start
            .checked_add(buf.len())
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }
}

/// A parsed archive: headers and tables resident, file data read on demand.
#[derive(Debug)]
pub struct MpqArchive {
    source: Box<dyn ArchiveSource>,
    header: MpqHeader,
    archive_offset: u64,
    user_data: Option<UserDataHeader>,
    hash_table: Vec<HashEntry>,
    block_table: Vec<BlockEntry>,
}

impl MpqArchive {
    /// Opens an archive with buffered file reads.
    pub fn open(path: impl AsRef<Path>) -> MpqResult<Self> {
        Self::from_source(Box::new(FileSource::open(path)?))
    }

    /// Opens an archive through a read-only memory map.
    pub fn open_mmap(path: impl AsRef<Path>) -> MpqResult<Self> {
        Self::from_source(Box::new(MmapSource::open(path)?))
    }

    /// Parses an archive held fully in memory.
    pub fn from_bytes(data: Vec<u8>) -> MpqResult<Self> {
        Self::from_source(Box::new(MemorySource::new(data)))
    }

    /// Parses headers and tables from an arbitrary byte source.
    pub fn from_source(mut source: Box<dyn ArchiveSource>) -> MpqResult<Self> {
        let mut magic = [0u8; 4];
        source.read_at(0, &mut magic)?;

        let (user_data, archive_offset) = if magic == USER_DATA_MAGIC {
            let mut fixed = [0u8; 16];
            source.read_at(0, &mut fixed)?;
            let content_size = u32::from_le_bytes([fixed[12], fixed[13], fixed[14], fixed[15]]);
            let mut raw = vec![0u8; 16 + content_size as usize];
            source.read_at(0, &mut raw)?;
            let block = UserDataHeader::read(&mut Cursor::new(&raw))?;
            let offset = u64::from(block.header_offset);
            (Some(block), offset)
        } else if magic == ARCHIVE_MAGIC {
            (None, 0)
        } else {
            return Err(MpqError::InvalidMagic(magic));
        };

        let mut header_raw = vec![0u8; MpqHeader::V1_SIZE as usize];
        source.read_at(archive_offset, &mut header_raw)?;
        let header = MpqHeader::read(&mut Cursor::new(&header_raw))?;

        let hash_table = read_table::<HashEntry>(
            &mut *source,
            archive_offset + u64::from(header.hash_table_offset),
            header.hash_table_entries as usize,
            crypt::hash_table_key(),
        )?;
        let block_table = read_table::<BlockEntry>(
            &mut *source,
            archive_offset + u64::from(header.block_table_offset),
            header.block_table_entries as usize,
            crypt::block_table_key(),
        )?;

        debug!(
            "opened archive: {} hash entries, {} blocks, user data {}",
            hash_table.len(),
            block_table.len(),
            user_data.is_some(),
        );

        Ok(Self {
            source,
            header,
            archive_offset,
            user_data,
            hash_table,
            block_table,
        })
    }

    /// Archive header.
    pub fn header(&self) -> &MpqHeader {
        &self.header
    }

    /// User-data block, when the container carries one.
    pub fn user_data(&self) -> Option<&UserDataHeader> {
        self.user_data.as_ref()
    }

    /// Whether a named file exists in the archive.
    pub fn has_file(&self, name: &str) -> bool {
        self.find_block_index(name).is_some()
    }

    /// File names recorded in the archive's `(listfile)`, if present.
    pub fn files(&mut self) -> MpqResult<Vec<String>> {
        let raw = self.read_file("(listfile)")?;
        Ok(String::from_utf8_lossy(&raw)
            .lines()
            .map(str::to_owned)
            .filter(|line| !line.is_empty())
            .collect())
    }

    /// Reads and decompresses a named file.
    pub fn read_file(&mut self, name: &str) -> MpqResult<Vec<u8>> {
        trace!("read_file: {name}");
        let block_index = self
            .find_block_index(name)
            .ok_or_else(|| MpqError::FileNotFound(name.to_owned()))?;
        let block = *self
            .block_table
            .get(block_index)
            .ok_or_else(|| MpqError::Corrupted {
                reason: format!("hash entry for {name} points past the block table"),
            })?;

        if !block.exists() {
            return Err(MpqError::FileNotFound(name.to_owned()));
        }
        if block.archived_size == 0 {
            return Ok(Vec::new());
        }
        if block.is_encrypted() {
            return Err(MpqError::EncryptionUnsupported(name.to_owned()));
        }

        let mut raw = vec![0u8; block.archived_size as usize];
        self.source
            .read_at(self.archive_offset + u64::from(block.offset), &mut raw)?;

        if block.is_single_unit() {
            let data = if block.is_compressed() && block.size > block.archived_size {
                decompress_sector(&raw)?
            } else {
                raw
            };
            return Ok(data);
        }

        self.read_sectors(name, &block, &raw)
    }

    fn read_sectors(&self, name: &str, block: &BlockEntry, raw: &[u8]) -> MpqResult<Vec<u8>> {
        let sector_size = self.header.sector_size();
        let sectors = (block.size as usize).div_ceil(sector_size).max(1);
        let position_count = sectors + 1 + usize::from(block.has_sector_crc());

        if raw.len() < position_count * 4 {
            return Err(MpqError::Corrupted {
                reason: format!("{name}: sector offset table truncated"),
            });
        }
        let positions: Vec<usize> = raw[..position_count * 4]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as usize)
            .collect();

        let mut result = Vec::with_capacity(block.size as usize);
        let mut bytes_left = block.size as usize;
        for i in 0..sectors {
            let (start, end) = (positions[i], positions[i + 1]);
            let sector = raw.get(start..end).ok_or_else(|| MpqError::Corrupted {
                reason: format!("{name}: sector {i} outside block data"),
            })?;
            // A sector that did not shrink is stored raw, without a
            // compression-type byte.
            let sector = if block.is_compressed() && bytes_left > sector.len() {
                decompress_sector(sector)?
            } else {
                sector.to_vec()
            };
            bytes_left = bytes_left.saturating_sub(sector.len());
            result.extend_from_slice(&sector);
        }

        if result.len() != block.size as usize {
            return Err(MpqError::Corrupted {
                reason: format!(
                    "{name}: expected {} bytes, reassembled {}",
                    block.size,
                    result.len()
                ),
            });
        }
        Ok(result)
    }

    fn find_block_index(&self, name: &str) -> Option<usize> {
        let name_a = crypt::hash(name, HashKind::NameA);
        let name_b = crypt::hash(name, HashKind::NameB);
        self.hash_table
            .iter()
            .find(|entry| entry.is_occupied() && entry.name_a == name_a && entry.name_b == name_b)
            .map(|entry| entry.block_index as usize)
    }
}

fn read_table<T>(
    source: &mut dyn ArchiveSource,
    offset: u64,
    entries: usize,
    key: u32,
) -> MpqResult<Vec<T>>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    let mut raw = vec![0u8; entries * 16];
    source.read_at(offset, &mut raw)?;
    let decrypted = crypt::decrypt(&raw, key);

    let mut cursor = Cursor::new(&decrypted);
    let mut table = Vec::with_capacity(entries);
    for _ in 0..entries {
        table.push(T::read_le(&mut cursor)?);
    }
    Ok(table)
}

fn decompress_sector(data: &[u8]) -> MpqResult<Vec<u8>> {
    let Some((&compression, payload)) = data.split_first() else {
        return Ok(Vec::new());
    };
    match compression {
        // No compression byte consumed: the sector is stored as-is.
        0x00 => Ok(data.to_vec()),
        COMPRESSION_ZLIB => {
            let mut decoder = ZlibDecoder::new(payload);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| MpqError::Corrupted {
                    reason: format!("zlib sector: {e}"),
                })?;
            Ok(out)
        }
        other => Err(MpqError::UnsupportedCompression(other)),
    }
}
