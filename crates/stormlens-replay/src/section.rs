//! Section names, classification, and decode dispatch.
//!
//! An archive holds seven known sections. Each maps to exactly one
//! extraction strategy and, where decoding applies, to exactly one decode
//! operation of the resolved protocol. Names outside the known set pass
//! through undecoded.

use stormlens_protocol::{DecodedValue, EventStream, ProtocolResult, ReplayProtocol};

/// Replay header (stored in the container's user-data block).
pub const HEADER: &str = "header";
/// Match metadata: players, map, result.
pub const DETAILS: &str = "replay.details";
/// Lobby initialization data.
pub const INITDATA: &str = "replay.initdata";
/// Game input event stream.
pub const GAME_EVENTS: &str = "replay.game.events";
/// Chat and ping event stream.
pub const MESSAGE_EVENTS: &str = "replay.message.events";
/// Observer-facing tracker event stream.
pub const TRACKER_EVENTS: &str = "replay.tracker.events";
/// Lobby attribute assignments.
pub const ATTRIBUTES_EVENTS: &str = "replay.attributes.events";

/// Every known section, in conventional extraction order.
pub const SECTIONS: [&str; 7] = [
    HEADER,
    DETAILS,
    INITDATA,
    GAME_EVENTS,
    MESSAGE_EVENTS,
    TRACKER_EVENTS,
    ATTRIBUTES_EVENTS,
];

/// The closed set of known sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// `header`
    Header,
    /// `replay.details`
    Details,
    /// `replay.initdata`
    Initdata,
    /// `replay.game.events`
    GameEvents,
    /// `replay.message.events`
    MessageEvents,
    /// `replay.tracker.events`
    TrackerEvents,
    /// `replay.attributes.events`
    AttributesEvents,
}

/// How a section's bytes are turned into output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One decode call over the whole buffer, result memoized
    WholeBuffer,
    /// Lazy per-record decode; the materialized list is memoized only
    /// when no filter is applied
    RecordStream,
    /// Bytes returned unmodified, still memoized
    PassThrough,
}

impl Section {
    /// Maps a section name onto the closed set.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            HEADER => Some(Self::Header),
            DETAILS => Some(Self::Details),
            INITDATA => Some(Self::Initdata),
            GAME_EVENTS => Some(Self::GameEvents),
            MESSAGE_EVENTS => Some(Self::MessageEvents),
            TRACKER_EVENTS => Some(Self::TrackerEvents),
            ATTRIBUTES_EVENTS => Some(Self::AttributesEvents),
            _ => None,
        }
    }

    /// Canonical name of this section.
    pub fn name(self) -> &'static str {
        match self {
            Self::Header => HEADER,
            Self::Details => DETAILS,
            Self::Initdata => INITDATA,
            Self::GameEvents => GAME_EVENTS,
            Self::MessageEvents => MESSAGE_EVENTS,
            Self::TrackerEvents => TRACKER_EVENTS,
            Self::AttributesEvents => ATTRIBUTES_EVENTS,
        }
    }

    /// Extraction strategy for this section.
    pub fn strategy(self) -> Strategy {
        match self {
            Self::Header | Self::Details | Self::Initdata | Self::AttributesEvents => {
                Strategy::WholeBuffer
            }
            Self::GameEvents | Self::MessageEvents | Self::TrackerEvents => Strategy::RecordStream,
        }
    }

    /// Runs the whole-buffer decode operation this section maps to.
    pub fn decode_whole(
        self,
        protocol: &dyn ReplayProtocol,
        contents: &[u8],
    ) -> ProtocolResult<DecodedValue> {
        match self {
            Self::Header => protocol.decode_header(contents),
            Self::Details => protocol.decode_details(contents),
            Self::Initdata => protocol.decode_initdata(contents),
            Self::AttributesEvents => protocol.decode_attributes_events(contents),
            Self::GameEvents | Self::MessageEvents | Self::TrackerEvents => {
                Err(stormlens_protocol::ProtocolError::InvalidData(format!(
                    "{} is a record stream, not a whole-buffer section",
                    self.name()
                )))
            }
        }
    }

    /// Opens the lazy record stream this section maps to.
    ///
    /// Only meaningful for record-stream sections; returns `None` for the
    /// whole-buffer ones.
    pub fn decode_stream<'a>(
        self,
        protocol: &dyn ReplayProtocol,
        contents: &'a [u8],
    ) -> Option<EventStream<'a>> {
        match self {
            Self::GameEvents => Some(protocol.decode_game_events(contents)),
            Self::MessageEvents => Some(protocol.decode_message_events(contents)),
            Self::TrackerEvents => Some(protocol.decode_tracker_events(contents)),
            _ => None,
        }
    }
}

/// Total classification: unrecognized names pass through undecoded.
pub fn classify(name: &str) -> Strategy {
    Section::from_name(name).map_or(Strategy::PassThrough, Section::strategy)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_known_section_classifies() {
        assert_eq!(classify(HEADER), Strategy::WholeBuffer);
        assert_eq!(classify(DETAILS), Strategy::WholeBuffer);
        assert_eq!(classify(INITDATA), Strategy::WholeBuffer);
        assert_eq!(classify(ATTRIBUTES_EVENTS), Strategy::WholeBuffer);
        assert_eq!(classify(GAME_EVENTS), Strategy::RecordStream);
        assert_eq!(classify(MESSAGE_EVENTS), Strategy::RecordStream);
        assert_eq!(classify(TRACKER_EVENTS), Strategy::RecordStream);
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(classify("replay.server.battlelobby"), Strategy::PassThrough);
        assert_eq!(classify(""), Strategy::PassThrough);
    }

    #[test]
    fn names_round_trip() {
        for name in SECTIONS {
            let section = Section::from_name(name).expect("known section");
            assert_eq!(section.name(), name);
        }
    }
}
