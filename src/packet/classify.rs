//! Packet classification from header markers

use serde::{Deserialize, Serialize};

use super::format::{KIND_AUX, KIND_DATA, KIND_POSITION, OFFSET_KIND, RawPacket, SYNC};

/// The class of a raw packet, derived from its header bytes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketClass {
    /// Carries 30 multiplexed samples plus timing and calibration metadata
    Data,
    /// Raw positioning receiver payload
    Position,
    /// Raw auxiliary sensor payload
    Aux,
    /// Anything else; dropped by the demultiplexer
    Unrecognized,
}

impl PacketClass {
    /// Classify a packet. Total over every byte pattern.
    pub fn of(packet: &RawPacket) -> Self {
        if packet[..SYNC.len()] != SYNC {
            return PacketClass::Unrecognized;
        }

        match packet[OFFSET_KIND] {
            KIND_DATA => PacketClass::Data,
            KIND_POSITION => PacketClass::Position,
            KIND_AUX => PacketClass::Aux,
            _ => PacketClass::Unrecognized,
        }
    }
}

/// Classify a packet by its header markers.
pub fn classify(packet: &RawPacket) -> PacketClass {
    PacketClass::of(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::format::PACKET_SIZE;
    use proptest::prelude::*;

    fn with_header(sync: [u8; 2], kind: u8) -> RawPacket {
        let mut packet = [0u8; PACKET_SIZE];
        packet[..2].copy_from_slice(&sync);
        packet[OFFSET_KIND] = kind;
        packet
    }

    #[test]
    fn known_kinds_are_mapped() {
        assert_eq!(classify(&with_header(SYNC, KIND_DATA)), PacketClass::Data);
        assert_eq!(classify(&with_header(SYNC, KIND_POSITION)), PacketClass::Position);
        assert_eq!(classify(&with_header(SYNC, KIND_AUX)), PacketClass::Aux);
    }

    #[test]
    fn degenerate_blocks_are_unrecognized() {
        assert_eq!(classify(&[0u8; PACKET_SIZE]), PacketClass::Unrecognized);
        assert_eq!(classify(&[0xFFu8; PACKET_SIZE]), PacketClass::Unrecognized);
        assert_eq!(classify(&with_header(SYNC, 0x7F)), PacketClass::Unrecognized);
        assert_eq!(classify(&with_header(*b"PG", KIND_DATA)), PacketClass::Unrecognized);
    }

    proptest! {
        #[test]
        fn classification_is_total_and_deterministic(
            bytes in prop::collection::vec(any::<u8>(), PACKET_SIZE)
        ) {
            let mut packet = [0u8; PACKET_SIZE];
            packet.copy_from_slice(&bytes);

            let first = classify(&packet);
            prop_assert_eq!(first, classify(&packet));
            if packet[..2] != SYNC {
                prop_assert_eq!(first, PacketClass::Unrecognized);
            }
        }
    }
}
