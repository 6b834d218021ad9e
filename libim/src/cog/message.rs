//! The fixed COG message-name table.
//!
//! Ported verbatim (names and ordinal values) from
//! `original_source/libraries/libim/content/asset/cog/cogmessage_type.h` and the
//! `kMessageNameMap` table in `impl/grammer/parser.cpp`. This table is closed: an
//! unrecognized message name is a hard parse error, not a warning.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CogMessageType {
    Activate = 0,
    Activated = 1,
    Removed = 2,
    Startup = 3,
    Timer = 4,
    Blocked = 5,
    Entered = 6,
    Exited = 7,
    Crossed = 8,
    Sighted = 9,
    Damaged = 10,
    Arrived = 11,
    Killed = 12,
    Pulse = 13,
    Touched = 14,
    Created = 15,
    Loading = 16,
    Selected = 17,
    Deselected = 18,
    Aim = 19,
    Changed = 20,
    Deactivated = 21,
    Shutdown = 22,
    Respawn = 23,
    AiEvent = 24,
    Callback = 25,
    Taken = 26,
    User0 = 27,
    User1 = 28,
    User2 = 29,
    User3 = 30,
    User4 = 31,
    User5 = 32,
    User6 = 33,
    User7 = 34,
    NewPlayer = 35,
    Fire = 36,
    Join = 37,
    Leave = 38,
    Splash = 39,
    Trigger = 40,
    StateChange = 41,
    Missed = 42,
    Boarded = 43,
    Unboarded = 44,
    ArrivedWpnt = 45,
    Initialized = 46,
    UpdateWpnts = 47,
}

const MESSAGE_NAMES: &[(&str, CogMessageType)] = &[
    ("activate", CogMessageType::Activate),
    ("activated", CogMessageType::Activated),
    ("removed", CogMessageType::Removed),
    ("startup", CogMessageType::Startup),
    ("timer", CogMessageType::Timer),
    ("blocked", CogMessageType::Blocked),
    ("entered", CogMessageType::Entered),
    ("exited", CogMessageType::Exited),
    ("crossed", CogMessageType::Crossed),
    ("sighted", CogMessageType::Sighted),
    ("damaged", CogMessageType::Damaged),
    ("arrived", CogMessageType::Arrived),
    ("killed", CogMessageType::Killed),
    ("pulse", CogMessageType::Pulse),
    ("touched", CogMessageType::Touched),
    ("created", CogMessageType::Created),
    ("loading", CogMessageType::Loading),
    ("selected", CogMessageType::Selected),
    ("deselected", CogMessageType::Deselected),
    ("aim", CogMessageType::Aim),
    ("changed", CogMessageType::Changed),
    ("deactivated", CogMessageType::Deactivated),
    ("shutdown", CogMessageType::Shutdown),
    ("respawn", CogMessageType::Respawn),
    ("aievent", CogMessageType::AiEvent),
    ("callback", CogMessageType::Callback),
    ("taken", CogMessageType::Taken),
    ("user0", CogMessageType::User0),
    ("user1", CogMessageType::User1),
    ("user2", CogMessageType::User2),
    ("user3", CogMessageType::User3),
    ("user4", CogMessageType::User4),
    ("user5", CogMessageType::User5),
    ("user6", CogMessageType::User6),
    ("user7", CogMessageType::User7),
    ("newplayer", CogMessageType::NewPlayer),
    ("fire", CogMessageType::Fire),
    ("join", CogMessageType::Join),
    ("leave", CogMessageType::Leave),
    ("splash", CogMessageType::Splash),
    ("trigger", CogMessageType::Trigger),
    ("statechange", CogMessageType::StateChange),
    ("missed", CogMessageType::Missed),
    ("boarded", CogMessageType::Boarded),
    ("unboarded", CogMessageType::Unboarded),
    ("arrivedwpnt", CogMessageType::ArrivedWpnt),
    ("initialized", CogMessageType::Initialized),
    ("updatewpnts", CogMessageType::UpdateWpnts),
];

impl CogMessageType {
    /// Case-insensitive lookup by message name. `None` if the name is unrecognized.
    pub fn from_name(name: &str) -> Option<Self> {
        MESSAGE_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, ty)| *ty)
    }

    pub fn name(self) -> &'static str {
        MESSAGE_NAMES
            .iter()
            .find(|(_, ty)| *ty == self)
            .map(|(n, _)| *n)
            .expect("every variant has a table entry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_48_entries() {
        assert_eq!(MESSAGE_NAMES.len(), 48);
    }

    #[test]
    fn lookup_round_trips() {
        assert_eq!(CogMessageType::from_name("Trigger"), Some(CogMessageType::Trigger));
        assert_eq!(CogMessageType::Trigger.name(), "trigger");
        assert_eq!(CogMessageType::from_name("nope"), None);
    }

    #[test]
    fn user_messages_are_contiguous() {
        assert_eq!(CogMessageType::User0 as u8, 27);
        assert_eq!(CogMessageType::User7 as u8, 34);
    }
}
