//! Later-generation schema.
//!
//! Relative to the base layout: the header gained the NGDP root key and a
//! data build number, details gained mod paths, the game description
//! gained a speed field, and user options report the client build.

use crate::schema::{EventType, ProtocolSchema, SchemaProtocol};
use crate::typeinfo::{Bounds, Field, TypeInfo, Variant};

/// Type table. Entries reference each other by index; the numbered
/// comments keep cross-references readable.
static TYPEINFOS: &[TypeInfo] = &[
    TypeInfo::Bool,                  // 0
    TypeInfo::Int(Bounds::new(0, 2)),          // 1
    TypeInfo::Int(Bounds::new(0, 3)),          // 2
    TypeInfo::Int(Bounds::new(0, 4)),          // 3
    TypeInfo::Int(Bounds::new(0, 5)),          // 4
    TypeInfo::Int(Bounds::new(0, 6)),          // 5
    TypeInfo::Int(Bounds::new(0, 7)),          // 6
    TypeInfo::Int(Bounds::new(0, 8)),          // 7
    TypeInfo::Int(Bounds::new(0, 14)),         // 8
    TypeInfo::Int(Bounds::new(0, 22)),         // 9
    TypeInfo::Int(Bounds::new(0, 32)),         // 10
    TypeInfo::Int(Bounds::new(-2_147_483_648, 32)), // 11
    TypeInfo::Int(Bounds::new(0, 64)),         // 12
    TypeInfo::Blob(Bounds::new(0, 8)),         // 13
    TypeInfo::Blob(Bounds::new(0, 10)),        // 14
    TypeInfo::FourCc,                // 15
    // 16: variable-width gameloop delta
    TypeInfo::Choice {
        bounds: Bounds::new(0, 2),
        variants: &[
            Variant::new(0, "m_uint6", 5),
            Variant::new(1, "m_uint14", 8),
            Variant::new(2, "m_uint22", 9),
            Variant::new(3, "m_uint32", 10),
        ],
    },
    // 17: per-event user id
    TypeInfo::Struct(&[Field::new("m_userId", 4, 0)]),
    // 18: version quintuple
    TypeInfo::Struct(&[
        Field::new("m_flags", 7, 0),
        Field::new("m_major", 7, 1),
        Field::new("m_minor", 7, 2),
        Field::new("m_revision", 7, 3),
        Field::new("m_build", 10, 4),
        Field::new("m_baseBuild", 10, 5),
    ]),
    // 19: replay header
    TypeInfo::Struct(&[
        Field::new("m_signature", 14, 0),
        Field::new("m_version", 18, 1),
        Field::new("m_type", 2, 2),
        Field::new("m_elapsedGameLoops", 10, 3),
        Field::new("m_useScaledTime", 0, 4),
        Field::new("m_ngdpRootKey", 13, 5),
        Field::new("m_dataBuildNum", 10, 6),
    ]),
    // 20: player toon handle
    TypeInfo::Struct(&[
        Field::new("m_region", 7, 0),
        Field::new("m_programId", 15, 1),
        Field::new("m_realm", 10, 2),
        Field::new("m_id", 12, 3),
    ]),
    // 21: player color
    TypeInfo::Struct(&[
        Field::new("m_a", 7, 0),
        Field::new("m_r", 7, 1),
        Field::new("m_g", 7, 2),
        Field::new("m_b", 7, 3),
    ]),
    TypeInfo::Optional(4), // 22
    // 23: details player entry
    TypeInfo::Struct(&[
        Field::new("m_name", 13, 0),
        Field::new("m_toon", 20, 1),
        Field::new("m_race", 13, 2),
        Field::new("m_color", 21, 3),
        Field::new("m_control", 7, 4),
        Field::new("m_teamId", 3, 5),
        Field::new("m_handicap", 6, 6),
        Field::new("m_observe", 1, 7),
        Field::new("m_result", 1, 8),
        Field::new("m_workingSetSlotId", 22, 9),
        Field::new("m_hero", 13, 10),
    ]),
    TypeInfo::Array { bounds: Bounds::new(0, 5), typeid: 23 }, // 24
    TypeInfo::Optional(24),                          // 25
    // 26: thumbnail
    TypeInfo::Struct(&[Field::new("m_file", 14, 0)]),
    TypeInfo::Array { bounds: Bounds::new(0, 6), typeid: 14 }, // 27
    TypeInfo::Optional(27),                          // 28
    // 29: replay details
    TypeInfo::Struct(&[
        Field::new("m_playerList", 25, 0),
        Field::new("m_title", 14, 1),
        Field::new("m_difficulty", 13, 2),
        Field::new("m_thumbnail", 26, 3),
        Field::new("m_isBlizzardMap", 0, 4),
        Field::new("m_timeUTC", 12, 5),
        Field::new("m_timeLocalOffset", 11, 6),
        Field::new("m_description", 14, 7),
        Field::new("m_imageFilePath", 14, 8),
        Field::new("m_mapFileName", 14, 9),
        Field::new("m_cacheHandles", 28, 10),
        Field::new("m_miniSave", 0, 11),
        Field::new("m_gameSpeed", 2, 12),
        Field::new("m_defaultDifficulty", 5, 13),
        Field::new("m_modPaths", 28, 14),
    ]),
    // 30: lobby user initial data
    TypeInfo::Struct(&[
        Field::new("m_name", 13, 0),
        Field::new("m_observe", 1, 1),
        Field::new("m_examine", 0, 2),
    ]),
    TypeInfo::Array { bounds: Bounds::new(0, 5), typeid: 30 }, // 31
    // 32: game description
    TypeInfo::Struct(&[
        Field::new("m_randomValue", 10, 0),
        Field::new("m_gameCacheName", 14, 1),
        Field::new("m_maxUsers", 4, 2),
        Field::new("m_maxObservers", 4, 3),
        Field::new("m_isBlizzardMap", 0, 4),
        Field::new("m_mapSizeX", 7, 5),
        Field::new("m_mapSizeY", 7, 6),
        Field::new("m_gameSpeed", 2, 7),
    ]),
    // 33: lobby state
    TypeInfo::Struct(&[
        Field::new("m_phase", 2, 0),
        Field::new("m_maxUsers", 4, 1),
        Field::new("m_maxObservers", 4, 2),
        Field::new("m_randomSeed", 10, 3),
        Field::new("m_gameDuration", 10, 4),
        Field::new("m_defaultDifficulty", 5, 5),
    ]),
    // 34: sync lobby state
    TypeInfo::Struct(&[
        Field::new("m_userInitialData", 31, 0),
        Field::new("m_gameDescription", 32, 1),
        Field::new("m_lobbyState", 33, 2),
    ]),
    // 35: replay initdata
    TypeInfo::Struct(&[Field::new("m_syncLobbyState", 34, 0)]),
    TypeInfo::Struct(&[]), // 36: SUserFinishedLoadingSyncEvent
    // 37: SUserOptionsEvent
    TypeInfo::Struct(&[
        Field::new("m_gameFullyDownloaded", 0, 0),
        Field::new("m_developmentCheatsEnabled", 0, 1),
        Field::new("m_testCheatsEnabled", 0, 2),
        Field::new("m_multiplayerCheatsEnabled", 0, 3),
        Field::new("m_syncChecksummingEnabled", 0, 4),
        Field::new("m_isMapToMapTransition", 0, 5),
        Field::new("m_debugPauseEnabled", 0, 6),
        Field::new("m_baseBuildNum", 10, 7),
        Field::new("m_buildNum", 10, 8),
    ]),
    // 38: SGameUserLeaveEvent
    TypeInfo::Struct(&[Field::new("m_leaveReason", 3, 0)]),
    // 39: map point
    TypeInfo::Struct(&[Field::new("x", 9, 0), Field::new("y", 9, 1)]),
    TypeInfo::Optional(39), // 40
    // 41: SCameraUpdateEvent
    TypeInfo::Struct(&[
        Field::new("m_target", 40, 0),
        Field::new("m_follow", 0, 1),
    ]),
    // 42: SChatMessage
    TypeInfo::Struct(&[
        Field::new("m_recipient", 1, 0),
        Field::new("m_string", 14, 1),
    ]),
    // 43: SPingMessage
    TypeInfo::Struct(&[
        Field::new("m_recipient", 1, 0),
        Field::new("m_point", 39, 1),
    ]),
    // 44: SLoadingProgressMessage
    TypeInfo::Struct(&[Field::new("m_progress", 11, 0)]),
    TypeInfo::Optional(10), // 45
    // 46: SPlayerSetupEvent
    TypeInfo::Struct(&[
        Field::new("m_playerId", 4, 0),
        Field::new("m_type", 10, 1),
        Field::new("m_userId", 45, 2),
        Field::new("m_slotId", 45, 3),
    ]),
    // 47: SUnitBornEvent
    TypeInfo::Struct(&[
        Field::new("m_unitTagIndex", 10, 0),
        Field::new("m_unitTagRecycle", 10, 1),
        Field::new("m_unitTypeName", 13, 2),
        Field::new("m_controlPlayerId", 4, 3),
        Field::new("m_upkeepPlayerId", 4, 4),
        Field::new("m_x", 7, 5),
        Field::new("m_y", 7, 6),
    ]),
    // 48: SUnitDiedEvent
    TypeInfo::Struct(&[
        Field::new("m_unitTagIndex", 10, 0),
        Field::new("m_unitTagRecycle", 10, 1),
        Field::new("m_killerPlayerId", 45, 2),
        Field::new("m_x", 7, 3),
        Field::new("m_y", 7, 4),
        Field::new("m_killerUnitTagIndex", 45, 5),
        Field::new("m_killerUnitTagRecycle", 45, 6),
    ]),
    // 49: SHeroBannedEvent
    TypeInfo::Struct(&[
        Field::new("m_hero", 13, 0),
        Field::new("m_controllingTeam", 10, 1),
    ]),
    // 50: SHeroPickedEvent
    TypeInfo::Struct(&[
        Field::new("m_hero", 13, 0),
        Field::new("m_controllingPlayer", 10, 1),
    ]),
];

static GAME_EVENTS: &[EventType] = &[
    EventType::new(5, 36, "NNet.Game.SUserFinishedLoadingSyncEvent"),
    EventType::new(7, 37, "NNet.Game.SUserOptionsEvent"),
    EventType::new(49, 41, "NNet.Game.SCameraUpdateEvent"),
    EventType::new(101, 38, "NNet.Game.SGameUserLeaveEvent"),
];

static MESSAGE_EVENTS: &[EventType] = &[
    EventType::new(0, 42, "NNet.Game.SChatMessage"),
    EventType::new(1, 43, "NNet.Game.SPingMessage"),
    EventType::new(2, 44, "NNet.Game.SLoadingProgressMessage"),
];

static TRACKER_EVENTS: &[EventType] = &[
    EventType::new(1, 47, "NNet.Replay.Tracker.SUnitBornEvent"),
    EventType::new(2, 48, "NNet.Replay.Tracker.SUnitDiedEvent"),
    EventType::new(9, 46, "NNet.Replay.Tracker.SPlayerSetupEvent"),
    EventType::new(10, 49, "NNet.Replay.Tracker.SHeroBannedEvent"),
    EventType::new(11, 50, "NNet.Replay.Tracker.SHeroPickedEvent"),
];

/// Schema description for this wire format.
pub static SCHEMA: ProtocolSchema = ProtocolSchema {
    build: 47479,
    typeinfos: TYPEINFOS,
    header_typeid: 19,
    details_typeid: 29,
    initdata_typeid: 35,
    game_event_types: GAME_EVENTS,
    game_eventid_typeid: 6,
    message_event_types: MESSAGE_EVENTS,
    message_eventid_typeid: 2,
    tracker_event_types: TRACKER_EVENTS,
    tracker_eventid_typeid: 6,
    gameloop_delta_typeid: 16,
    userid_typeid: 17,
};

/// Decoder instance handed out by the registry.
pub static PROTOCOL: SchemaProtocol = SchemaProtocol { schema: &SCHEMA };
