//! Packet encoding for fixtures, simulators and benchmarks
//!
//! Produces byte-exact packets in the recorder layout so that synthetic dumps
//! can be fed through the same read path as field recordings.

use super::format::{
    DATA_HEADER_SIZE, KIND_AUX, KIND_DATA, KIND_POSITION, OFFSET_C0, OFFSET_CN, OFFSET_CPPS,
    OFFSET_EUI, OFFSET_GAIN_AB, OFFSET_GAIN_CD, OFFSET_GPS_FIX, OFFSET_HMS, OFFSET_KIND,
    OFFSET_SPS, OFFSET_VERSION, OFFSET_YMD, PACKET_SIZE, RawPacket, SAMPLES_PER_PACKET, SYNC,
    VALUES_PER_PACKET, VALUES_PER_SAMPLE,
};

/// Builder for a single data packet.
///
/// Defaults describe a valid packet: format version 1, 100 samples/s, unity
/// gains, fixed at 2024-01-01T00:00:00Z with a 1 MHz oscillator and zero
/// samples.
#[derive(Debug, Clone)]
pub struct DataPacketBuilder {
    format_version: u8,
    sample_rate_code: u8,
    gain_codes: [u8; 3],
    gps_fix: u8,
    eui: [u8; 3],
    ymd: u32,
    hms: u32,
    cpps: u32,
    c0: u32,
    cn: u32,
    samples: [i32; VALUES_PER_PACKET],
}

impl Default for DataPacketBuilder {
    fn default() -> Self {
        Self {
            format_version: 1,
            sample_rate_code: 1,
            gain_codes: [0, 0, 0],
            gps_fix: 1,
            eui: [0x00, 0x00, 0x01],
            ymd: 20240101,
            hms: 0,
            cpps: 0,
            c0: 0,
            cn: 1_000_000,
            samples: [0; VALUES_PER_PACKET],
        }
    }
}

impl DataPacketBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_version(mut self, version: u8) -> Self {
        self.format_version = version;
        self
    }

    pub fn sample_rate_code(mut self, code: u8) -> Self {
        self.sample_rate_code = code;
        self
    }

    /// Gain codes for channels A, B and C (4 bits each).
    pub fn gain_codes(mut self, a: u8, b: u8, c: u8) -> Self {
        self.gain_codes = [a, b, c];
        self
    }

    pub fn gps_fix(mut self, quality: u8) -> Self {
        self.gps_fix = quality;
        self
    }

    pub fn eui(mut self, eui: [u8; 3]) -> Self {
        self.eui = eui;
        self
    }

    /// Decimal `YYYYMMDD` / `HHMMSS` of the last PPS edge.
    pub fn fix(mut self, ymd: u32, hms: u32) -> Self {
        self.ymd = ymd;
        self.hms = hms;
        self
    }

    /// Oscillator counts at the PPS edge and at the first sample, and the
    /// oscillator rate in ticks per second.
    pub fn clock(mut self, cpps: u32, c0: u32, cn: u32) -> Self {
        self.cpps = cpps;
        self.c0 = c0;
        self.cn = cn;
        self
    }

    /// Set one interleaved sample `(ch0, ch1, ch2, counter)`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= 30`.
    pub fn sample(mut self, index: usize, values: [i32; VALUES_PER_SAMPLE]) -> Self {
        assert!(index < SAMPLES_PER_PACKET, "sample index {} out of range", index);
        let start = index * VALUES_PER_SAMPLE;
        self.samples[start..start + VALUES_PER_SAMPLE].copy_from_slice(&values);
        self
    }

    /// Replace the whole interleaved sample block.
    pub fn samples(mut self, values: [i32; VALUES_PER_PACKET]) -> Self {
        self.samples = values;
        self
    }

    pub fn build(&self) -> RawPacket {
        let mut packet = header(KIND_DATA);
        packet[OFFSET_VERSION] = self.format_version;
        packet[OFFSET_SPS] = self.sample_rate_code;
        packet[OFFSET_GAIN_AB] = (self.gain_codes[0] << 4) | (self.gain_codes[1] & 0x0f);
        packet[OFFSET_GAIN_CD] = self.gain_codes[2] << 4;
        packet[OFFSET_GPS_FIX] = self.gps_fix;
        packet[OFFSET_EUI..OFFSET_EUI + 3].copy_from_slice(&self.eui);

        for (offset, value) in [
            (OFFSET_YMD, self.ymd),
            (OFFSET_HMS, self.hms),
            (OFFSET_CPPS, self.cpps),
            (OFFSET_C0, self.c0),
            (OFFSET_CN, self.cn),
        ] {
            packet[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }

        for (i, value) in self.samples.iter().enumerate() {
            let offset = DATA_HEADER_SIZE + i * 4;
            packet[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }

        packet
    }
}

/// A positioning packet whose payload is filled with `fill`.
pub fn position_packet(fill: u8) -> RawPacket {
    payload_packet(KIND_POSITION, fill)
}

/// An auxiliary packet whose payload is filled with `fill`.
pub fn aux_packet(fill: u8) -> RawPacket {
    payload_packet(KIND_AUX, fill)
}

fn payload_packet(kind: u8, fill: u8) -> RawPacket {
    let mut packet = [fill; PACKET_SIZE];
    packet[..SYNC.len()].copy_from_slice(&SYNC);
    packet[OFFSET_KIND] = kind;
    packet
}

fn header(kind: u8) -> RawPacket {
    let mut packet = [0u8; PACKET_SIZE];
    packet[..SYNC.len()].copy_from_slice(&SYNC);
    packet[OFFSET_KIND] = kind;
    packet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{PacketClass, classify};

    #[test]
    fn built_packets_classify_by_kind() {
        assert_eq!(classify(&DataPacketBuilder::new().build()), PacketClass::Data);
        assert_eq!(classify(&position_packet(0xB5)), PacketClass::Position);
        assert_eq!(classify(&aux_packet(0x00)), PacketClass::Aux);
    }

    #[test]
    fn payload_fill_leaves_header_intact() {
        let packet = position_packet(0xAA);
        assert_eq!(&packet[..3], &[b'G', b'P', KIND_POSITION]);
        assert!(packet[3..].iter().all(|&b| b == 0xAA));
    }
}
