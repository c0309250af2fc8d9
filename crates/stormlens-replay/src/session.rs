//! The extraction orchestrator and its single-slot session cache.

use crate::error::{ReplayError, ReplayResult};
use crate::filter::EventFilter;
use crate::normalize::normalize;
use crate::section::{HEADER, Section, Strategy};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use stormlens_mpq::{MpqArchive, MpqError};
use stormlens_protocol::{
    DecodedValue, EventStream, ProtocolError, ReplayProtocol, bootstrap, resolve,
};
use tracing::{debug, trace, warn};

/// Container access strategy, fixed at session construction.
///
/// Both satisfy the identical read contract; the memory-mapped path is the
/// faster one and the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Buffered positioned reads through the file system
    Buffered,
    /// Read-only memory mapping
    #[default]
    Mmap,
}

/// Extracted content of one section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionData {
    /// Whole-buffer decode result
    Decoded(DecodedValue),
    /// Materialized record stream, in on-disk order
    Records(Vec<DecodedValue>),
    /// Pass-through bytes of an undecoded section
    Raw(Vec<u8>),
}

impl SectionData {
    /// Decoded tree, if this is a whole-buffer result.
    pub fn as_decoded(&self) -> Option<&DecodedValue> {
        match self {
            Self::Decoded(value) => Some(value),
            _ => None,
        }
    }

    /// Record list, if this is a stream result.
    pub fn as_records(&self) -> Option<&[DecodedValue]> {
        match self {
            Self::Records(records) => Some(records),
            _ => None,
        }
    }

    /// Raw bytes, if this is a pass-through result.
    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// One opened archive: identity, resolved protocol, memoized sections.
///
/// Owned exclusively by the session's cache slot; extraction borrows it
/// for the duration of a call. Its memoized sections die with it when a
/// different archive is opened.
struct OpenArchive {
    identity: PathBuf,
    archive: MpqArchive,
    build: u32,
    protocol: &'static dyn ReplayProtocol,
    sections: HashMap<String, SectionData>,
}

/// Replay extraction session.
///
/// Holds at most one open archive at a time, keyed by canonicalized path:
/// repeated requests against the same replay reuse the parsed container
/// and every already-decoded section, while opening a different replay
/// evicts the previous one. The workload is single-archive-at-a-time
/// analysis; sessions are single-threaded and perform blocking I/O.
///
/// # Example
///
/// ```rust,no_run
/// use stormlens_replay::{ReplaySession, TRACKER_EVENTS};
///
/// # fn main() -> Result<(), stormlens_replay::ReplayError> {
/// let mut session = ReplaySession::new();
/// let build = session.get_version("replay.StormReplay")?;
/// let events = session.extract(TRACKER_EVENTS, "replay.StormReplay")?;
/// println!("build {build}: {:?} tracker events", events.as_records().map(|r| r.len()));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ReplaySession {
    backend: Backend,
    cached: Option<OpenArchive>,
}

impl ReplaySession {
    /// Creates a session with the default (memory-mapped) backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session with an explicit container backend.
    pub fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            cached: None,
        }
    }

    /// Extracts a section, serving memoized results where possible.
    ///
    /// Known sections decode through the archive's resolved protocol;
    /// unrecognized names return their raw bytes.
    pub fn extract(
        &mut self,
        section: &str,
        path: impl AsRef<Path>,
    ) -> ReplayResult<SectionData> {
        self.extract_inner(section, path.as_ref(), None)
    }

    /// Extracts a record-stream section keeping only records the filter
    /// accepts, in stream order.
    ///
    /// Filtered results are call-specific and never memoized. On sections
    /// that are not record streams the filter has nothing to apply to and
    /// the call behaves like [`extract`](Self::extract), except that the
    /// memo is refreshed rather than served.
    pub fn extract_filtered(
        &mut self,
        section: &str,
        path: impl AsRef<Path>,
        filter: &EventFilter,
    ) -> ReplayResult<SectionData> {
        self.extract_inner(section, path.as_ref(), Some(filter))
    }

    /// Build number of the replay, opening it through the cache.
    pub fn get_version(&mut self, path: impl AsRef<Path>) -> ReplayResult<u32> {
        Ok(self.get_or_open(path.as_ref(), false)?.build)
    }

    /// Discards any cached state for the archive and reopens it.
    pub fn refresh(&mut self, path: impl AsRef<Path>) -> ReplayResult<u32> {
        Ok(self.get_or_open(path.as_ref(), true)?.build)
    }

    fn extract_inner(
        &mut self,
        section: &str,
        path: &Path,
        filter: Option<&EventFilter>,
    ) -> ReplayResult<SectionData> {
        debug!("extract: {section}");
        let open = self.get_or_open(path, false)?;

        // The header is decoded from the user-data block at open time;
        // requests for it are always memo hits.
        let memo_eligible = filter.is_none() || Section::from_name(section) == Some(Section::Header);
        if memo_eligible {
            if let Some(data) = open.sections.get(section) {
                trace!("{section}: memoized");
                return Ok(data.clone());
            }
        }

        let raw = match open.archive.read_file(section) {
            Ok(bytes) => bytes,
            Err(source) => {
                // One unreadable section must not abort extraction of the
                // others; continue with empty content.
                warn!(
                    "{}",
                    ReplayError::SectionRead {
                        section: section.to_owned(),
                        source,
                    }
                );
                Vec::new()
            }
        };

        let protocol = open.protocol;
        match Section::from_name(section) {
            Some(known) => match known.strategy() {
                Strategy::WholeBuffer => {
                    trace!("{section}: whole-buffer decode");
                    let value = known.decode_whole(protocol, &raw).map_err(|source| {
                        ReplayError::Decode {
                            section: section.to_owned(),
                            source,
                        }
                    })?;
                    let data = SectionData::Decoded(normalize(value));
                    open.sections.insert(section.to_owned(), data.clone());
                    Ok(data)
                }
                Strategy::RecordStream => {
                    trace!("{section}: record-stream decode");
                    let stream = known
                        .decode_stream(protocol, &raw)
                        .unwrap_or_else(|| unreachable!("record-stream sections always stream"));
                    match filter {
                        Some(filter) => {
                            let records = drain_filtered(stream, filter, section)?;
                            // Filters are call-specific; nothing memoized.
                            Ok(SectionData::Records(records))
                        }
                        None => {
                            let records = drain(stream, section)?;
                            let data = SectionData::Records(records);
                            open.sections.insert(section.to_owned(), data.clone());
                            Ok(data)
                        }
                    }
                }
                Strategy::PassThrough => unreachable!("known sections always decode"),
            },
            None => {
                trace!("{section}: pass-through");
                let data = SectionData::Raw(raw);
                open.sections.insert(section.to_owned(), data.clone());
                Ok(data)
            }
        }
    }

    fn get_or_open(&mut self, path: &Path, force_fresh: bool) -> ReplayResult<&mut OpenArchive> {
        let identity = path
            .canonicalize()
            .map_err(|source| ReplayError::ArchiveOpen {
                path: path.to_path_buf(),
                source: MpqError::Io(source),
            })?;

        let cache_hit = !force_fresh
            && self
                .cached
                .as_ref()
                .is_some_and(|open| open.identity == identity);
        if !cache_hit {
            trace!("opening {} (force_fresh: {force_fresh})", identity.display());
            let opened = open_archive(self.backend, identity)?;
            // Single-slot cache: the previous archive and its memoized
            // sections are dropped here.
            self.cached = Some(opened);
        }
        match self.cached.as_mut() {
            Some(open) => Ok(open),
            None => unreachable!("slot filled on the miss path"),
        }
    }
}

fn open_archive(backend: Backend, identity: PathBuf) -> ReplayResult<OpenArchive> {
    let open_error = |source| ReplayError::ArchiveOpen {
        path: identity.clone(),
        source,
    };
    let archive = match backend {
        Backend::Buffered => MpqArchive::open(&identity),
        Backend::Mmap => MpqArchive::open_mmap(&identity),
    }
    .map_err(open_error)?;

    let header_bytes = archive
        .user_data()
        .ok_or(MpqError::NotAReplay)
        .map_err(open_error)?
        .content
        .clone();

    // The header's layout itself evolves with the build, so it is decoded
    // twice: the bootstrap protocol reads just far enough to learn the
    // build number, then the build-specific protocol produces the result
    // callers actually see.
    let decode_error = |source| ReplayError::Decode {
        section: HEADER.to_owned(),
        source,
    };
    let probe = bootstrap()
        .decode_header(&header_bytes)
        .map_err(decode_error)?;
    let build = probe
        .get("m_version.m_baseBuild")
        .and_then(DecodedValue::as_i64)
        .and_then(|build| u32::try_from(build).ok())
        .ok_or_else(|| {
            decode_error(ProtocolError::InvalidData(
                "header carries no m_version.m_baseBuild".to_owned(),
            ))
        })?;

    let protocol = resolve(build).map_err(|source| match source {
        ProtocolError::UnsupportedBuild(build) => ReplayError::UnsupportedBuild(build),
        other => decode_error(other),
    })?;
    let header = normalize(protocol.decode_header(&header_bytes).map_err(decode_error)?);

    debug!("opened {} with build {build}", identity.display());

    let mut sections = HashMap::new();
    sections.insert(HEADER.to_owned(), SectionData::Decoded(header));
    Ok(OpenArchive {
        identity,
        archive,
        build,
        protocol,
        sections,
    })
}

fn drain(stream: EventStream<'_>, section: &str) -> ReplayResult<Vec<DecodedValue>> {
    let mut records = Vec::new();
    for record in stream {
        let record = record.map_err(|source| ReplayError::Decode {
            section: section.to_owned(),
            source,
        })?;
        records.push(normalize(record));
    }
    Ok(records)
}

fn drain_filtered(
    stream: EventStream<'_>,
    filter: &EventFilter,
    section: &str,
) -> ReplayResult<Vec<DecodedValue>> {
    let mut kept = Vec::new();
    for record in stream {
        let record = record.map_err(|source| ReplayError::Decode {
            section: section.to_owned(),
            source,
        })?;
        let record = normalize(record);
        if filter.matches(&record) {
            kept.push(record);
        }
    }
    Ok(kept)
}

/// Decodes raw header bytes with the bootstrap protocol, without a
/// session.
///
/// Usable before any archive is open, e.g. on header bytes obtained from
/// another tool.
pub fn parse_header(contents: &[u8]) -> ReplayResult<DecodedValue> {
    let value = bootstrap()
        .decode_header(contents)
        .map_err(|source| ReplayError::Decode {
            section: HEADER.to_owned(),
            source,
        })?;
    Ok(normalize(value))
}

/// Decodes raw section bytes for an explicit build, bypassing the session
/// cache entirely.
///
/// Nothing is memoized; unknown builds fail with
/// [`ReplayError::UnsupportedBuild`] rather than returning a silent empty
/// result.
pub fn parse_section(section: &str, contents: &[u8], build: u32) -> ReplayResult<SectionData> {
    let protocol = resolve(build).map_err(|source| match source {
        ProtocolError::UnsupportedBuild(build) => ReplayError::UnsupportedBuild(build),
        other => ReplayError::Decode {
            section: section.to_owned(),
            source: other,
        },
    })?;

    match Section::from_name(section) {
        Some(known) => match known.strategy() {
            Strategy::WholeBuffer => {
                let value = known.decode_whole(protocol, contents).map_err(|source| {
                    ReplayError::Decode {
                        section: section.to_owned(),
                        source,
                    }
                })?;
                Ok(SectionData::Decoded(normalize(value)))
            }
            Strategy::RecordStream => {
                let stream = known
                    .decode_stream(protocol, contents)
                    .unwrap_or_else(|| unreachable!("record-stream sections always stream"));
                Ok(SectionData::Records(drain(stream, section)?))
            }
            Strategy::PassThrough => unreachable!("known sections always decode"),
        },
        None => Ok(SectionData::Raw(contents.to_vec())),
    }
}
