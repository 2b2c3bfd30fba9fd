//! Remote-control key table.
//!
//! Maps raw Linux key codes from the infrared receiver onto the closed
//! [`LogicalKey`] set.  Only the key-down edge of a press produces a key;
//! releases and auto-repeats are discarded.

use mediabox_types::{LogicalKey, RawInputEvent};

/// `value` of a key-down edge.
pub const KEY_DOWN: i32 = 1;

/// Every code the remote emits, with its logical name.
pub const KEY_CODES: [(u16, LogicalKey); 23] = [
    (148, LogicalKey::KeyProg1),
    (227, LogicalKey::KeySwitchvideomode),
    (173, LogicalKey::KeyRefresh),
    (389, LogicalKey::KeyDvd),
    (226, LogicalKey::KeyMedia),
    (104, LogicalKey::KeyPageup),
    (128, LogicalKey::KeyStop),
    (168, LogicalKey::KeyRewind),
    (164, LogicalKey::KeyPlaypause),
    (208, LogicalKey::KeyFastforward),
    (109, LogicalKey::KeyPagedown),
    (412, LogicalKey::KeyPrevious),
    (103, LogicalKey::KeyUp),
    (407, LogicalKey::KeyNext),
    (105, LogicalKey::KeyLeft),
    (352, LogicalKey::KeyOk),
    (106, LogicalKey::KeyRight),
    (14, LogicalKey::KeyBackspace),
    (108, LogicalKey::KeyDown),
    (358, LogicalKey::KeyInfo),
    (114, LogicalKey::KeyVolumedown),
    (113, LogicalKey::KeyMute),
    (115, LogicalKey::KeyVolumeup),
];

pub fn key_for_code(code: u16) -> Option<LogicalKey> {
    KEY_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, key)| *key)
}

/// Decode one raw event.  `None` for releases, repeats, and unknown codes.
pub fn decode(event: &RawInputEvent) -> Option<LogicalKey> {
    if event.value != KEY_DOWN {
        return None;
    }
    key_for_code(event.code)
}
