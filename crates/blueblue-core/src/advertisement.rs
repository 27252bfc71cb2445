//! Raw advertisement records and their display normalization.
//!
//! An [`Advertisement`] is what a source hands the scan loop. Before it reaches the
//! registry it is normalized into a [`DeviceRecord`]: the name is trimmed of
//! non-graphic characters and both payloads are rendered as byte-grouped hex.

use chrono::{DateTime, Utc};
use unicode_general_category::{get_general_category, GeneralCategory};

use crate::types::DeviceRecord;

/// One observed advertisement, as produced by an advertisement source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Device address, e.g. `AA:BB:CC:DD:EE:FF`.
    pub address: String,

    /// Local name as broadcast, unsanitized.
    pub local_name: Option<String>,

    /// Received signal strength in dBm.
    pub rssi: i16,

    /// Raw advertising report payload.
    pub advertising_data: Vec<u8>,

    /// Raw scan response payload (empty when none was received).
    pub scan_response: Vec<u8>,
}

impl DeviceRecord {
    /// Normalize an advertisement observed at `seen_at` into a registry record.
    #[must_use]
    pub fn from_advertisement(advertisement: Advertisement, seen_at: DateTime<Utc>) -> Self {
        Self {
            address: advertisement.address,
            last_seen: seen_at,
            name: clean(advertisement.local_name.as_deref().unwrap_or_default()),
            rssi: advertisement.rssi,
            advertisement: format_hex(&hex::encode(&advertisement.advertising_data)),
            scan_response: format_hex(&hex::encode(&advertisement.scan_response)),
        }
    }
}

/// Regroup a hex string into space-terminated byte pairs.
///
/// `"deadbeef"` becomes `"de ad be ef "`. A dangling odd digit is dropped.
#[must_use]
pub fn format_hex(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() / 2 * 3);
    for pair in digits.as_bytes().chunks_exact(2) {
        out.push(char::from(pair[0]));
        out.push(char::from(pair[1]));
        out.push(' ');
    }
    out
}

/// Strip non-graphic characters from both ends.
///
/// Graphic means letters, marks, numbers, punctuation, symbols and plain spaces (Unicode
/// categories L, M, N, P, S and Zs). Everything else is trimmed: controls, format
/// characters, line/paragraph separators, surrogates, private-use and unassigned code points.
#[must_use]
pub fn clean(input: &str) -> String {
    input.trim_matches(|c: char| !is_graphic(c)).to_string()
}

fn is_graphic(c: char) -> bool {
    !matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hex_groups_pairs() {
        assert_eq!(format_hex("deadbeef"), "de ad be ef ");
    }

    #[test]
    fn test_format_hex_empty() {
        assert_eq!(format_hex(""), "");
    }

    #[test]
    fn test_hex_formatting_preserves_byte_order() {
        assert_eq!(format_hex(&hex::encode([0x02, 0x01, 0x06, 0xff])), "02 01 06 ff ");
        assert_eq!(format_hex(&hex::encode([0x0a, 0xb0])), "0a b0 ");
    }

    #[test]
    fn test_clean_strips_control_characters_from_ends() {
        assert_eq!(clean("\u{0}\u{7}Pixel 8\u{0}"), "Pixel 8");
        assert_eq!(clean("\tHeadphones\r\n"), "Headphones");
        assert_eq!(clean("\u{FEFF}Tag"), "Tag");
    }

    #[test]
    fn test_clean_keeps_printable_input() {
        assert_eq!(clean("Galaxy Buds2 (A1B2)"), "Galaxy Buds2 (A1B2)");
        assert_eq!(clean("Café ☕"), "Café ☕");
        assert_eq!(clean(""), "");
    }

    #[test]
    fn test_clean_treats_spaces_as_printable() {
        assert_eq!(clean(" Mi Band 7 "), " Mi Band 7 ");
        assert_eq!(clean("\u{0} Mi Band 7\u{2028}"), " Mi Band 7");
    }

    #[test]
    fn test_clean_strips_invisible_and_unassigned_code_points() {
        assert_eq!(clean("\u{061C}Name"), "Name");
        assert_eq!(clean("Name\u{180E}"), "Name");
        assert_eq!(clean("Name\u{FFFB}"), "Name");
        assert_eq!(clean("Tag\u{E0001}"), "Tag");
        assert_eq!(clean("Name\u{0378}"), "Name");
        assert_eq!(clean("\u{E000}Band\u{F0000}"), "Band");
    }

    #[test]
    fn test_clean_keeps_interior_non_graphic_characters() {
        assert_eq!(clean("Left\u{200B}Right"), "Left\u{200B}Right");
    }

    #[test]
    fn test_record_from_advertisement() {
        let now = Utc::now();
        let record = DeviceRecord::from_advertisement(
            Advertisement {
                address: "AA:BB:CC:DD:EE:FF".into(),
                local_name: Some("\u{1}Tile\u{0}".into()),
                rssi: -61,
                advertising_data: vec![0x02, 0x01, 0x06],
                scan_response: Vec::new(),
            },
            now,
        );

        assert_eq!(record.address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(record.last_seen, now);
        assert_eq!(record.name, "Tile");
        assert_eq!(record.rssi, -61);
        assert_eq!(record.advertisement, "02 01 06 ");
        assert_eq!(record.scan_response, "");
    }

    #[test]
    fn test_record_without_name() {
        let record = DeviceRecord::from_advertisement(
            Advertisement {
                address: "11:22:33:44:55:66".into(),
                local_name: None,
                rssi: -90,
                advertising_data: Vec::new(),
                scan_response: vec![0xde, 0xad],
            },
            Utc::now(),
        );
        assert_eq!(record.name, "");
        assert_eq!(record.scan_response, "de ad ");
    }
}
