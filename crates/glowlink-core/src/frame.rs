//! Binary frame encoding/decoding
//!
//! Glowlink color-update frame format:
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │ Bytes 0-1:  Magic 0x474C "GL" (uint16 big-endian)              │
//! │ Byte  2:    Protocol version (1)                               │
//! │ Byte  3:    Flags — bit 0 set when the payload is delta-coded  │
//! │ Bytes 4-5:  Sequence (uint16 big-endian, wraps per session)    │
//! │ Bytes 6-7:  Low 16 bits of a monotonic millisecond clock       │
//! ├────────────────────────────────────────────────────────────────┤
//! │ Payload                                                        │
//! │   full:  cmd 0x01, then 4 × RGB in top/right/bottom/left order │
//! │   delta: cmd 0x02, count byte, count × (region, R, G, B)       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The legacy solid-color command is a bare 4-byte packet `[0x00, R, G, B]`
//! with no header, sequence, or delta semantics.

use crate::{Error, Region, Result, Rgb, MAGIC, PROTOCOL_VERSION};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Header size of a color-update frame
pub const HEADER_SIZE: usize = 8;

/// Command byte: full four-region payload
pub const CMD_FULL: u8 = 0x01;

/// Command byte: delta payload
pub const CMD_DELTA: u8 = 0x02;

/// Command byte: legacy headerless solid color
pub const CMD_SOLID: u8 = 0x00;

const FLAG_DELTA: u8 = 0x01;

/// Header of a color-update frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload is delta-encoded
    pub delta: bool,
    /// Session-scoped wrapping counter
    pub sequence: u16,
    /// Low 16 bits of a monotonic millisecond clock. Diagnostics only,
    /// never used for correctness.
    pub timestamp: u16,
}

impl FrameHeader {
    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u16(MAGIC);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(if self.delta { FLAG_DELTA } else { 0 });
        buf.put_u16(self.sequence);
        buf.put_u16(self.timestamp);
    }

    /// Decode a header, rejecting magic or version mismatches
    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < HEADER_SIZE {
            return Err(Error::BufferTooSmall {
                needed: HEADER_SIZE,
                have: buf.remaining(),
            });
        }

        let magic = buf.get_u16();
        if magic != MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let version = buf.get_u8();
        if version != PROTOCOL_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let flags = buf.get_u8();
        let sequence = buf.get_u16();
        let timestamp = buf.get_u16();

        Ok(Self {
            delta: flags & FLAG_DELTA != 0,
            sequence,
            timestamp,
        })
    }
}

/// One entry of a delta payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionChange {
    pub region: Region,
    pub color: Rgb,
}

/// Payload of a color-update frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePayload {
    /// All four regions, in canonical order
    Full([Rgb; 4]),
    /// Only the regions that changed since the previous frame
    Delta(Vec<RegionChange>),
}

impl UpdatePayload {
    pub fn is_delta(&self) -> bool {
        matches!(self, UpdatePayload::Delta(_))
    }

    fn encoded_len(&self) -> usize {
        match self {
            UpdatePayload::Full(_) => 1 + 12,
            UpdatePayload::Delta(changes) => 2 + changes.len() * 4,
        }
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            UpdatePayload::Full(regions) => {
                buf.put_u8(CMD_FULL);
                for color in regions {
                    buf.put_u8(color.r);
                    buf.put_u8(color.g);
                    buf.put_u8(color.b);
                }
            }
            UpdatePayload::Delta(changes) => {
                buf.put_u8(CMD_DELTA);
                buf.put_u8(changes.len() as u8);
                for change in changes {
                    buf.put_u8(change.region.index());
                    buf.put_u8(change.color.r);
                    buf.put_u8(change.color.g);
                    buf.put_u8(change.color.b);
                }
            }
        }
    }

    /// Decode a payload from the bytes following the header
    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < 1 {
            return Err(Error::BufferTooSmall {
                needed: 1,
                have: 0,
            });
        }

        match buf.get_u8() {
            CMD_FULL => {
                if buf.remaining() < 12 {
                    return Err(Error::BufferTooSmall {
                        needed: 12,
                        have: buf.remaining(),
                    });
                }
                let mut regions = [Rgb::BLACK; 4];
                for slot in regions.iter_mut() {
                    *slot = Rgb::new(buf.get_u8(), buf.get_u8(), buf.get_u8());
                }
                Ok(UpdatePayload::Full(regions))
            }
            CMD_DELTA => {
                if buf.remaining() < 1 {
                    return Err(Error::BufferTooSmall {
                        needed: 1,
                        have: 0,
                    });
                }
                let declared = buf.get_u8() as usize;
                let actual = buf.remaining() / 4;
                if declared != actual || buf.remaining() % 4 != 0 {
                    return Err(Error::DeltaCountMismatch { declared, actual });
                }
                let mut changes = Vec::with_capacity(declared);
                for _ in 0..declared {
                    let region = Region::from_index(buf.get_u8())?;
                    let color = Rgb::new(buf.get_u8(), buf.get_u8(), buf.get_u8());
                    changes.push(RegionChange { region, color });
                }
                Ok(UpdatePayload::Delta(changes))
            }
            other => Err(Error::UnknownCommand(other)),
        }
    }
}

/// Encode a complete color-update frame. The header's delta flag is derived
/// from the payload kind.
pub fn encode_update(sequence: u16, timestamp: u16, payload: &UpdatePayload) -> Bytes {
    let header = FrameHeader {
        delta: payload.is_delta(),
        sequence,
        timestamp,
    };

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.encoded_len());
    header.encode_into(&mut buf);
    payload.encode_into(&mut buf);
    buf.freeze()
}

/// Decode a complete color-update frame
pub fn decode_update(bytes: &[u8]) -> Result<(FrameHeader, UpdatePayload)> {
    let mut buf = bytes;
    let header = FrameHeader::decode(&mut buf)?;
    let payload = UpdatePayload::decode(&mut buf)?;
    Ok((header, payload))
}

/// Encode the legacy single-color command
pub fn encode_solid(color: Rgb) -> [u8; 4] {
    [CMD_SOLID, color.r, color.g, color.b]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let payload = UpdatePayload::Full([Rgb::BLACK; 4]);
        let frame = encode_update(0x1234, 0xABCD, &payload);

        assert_eq!(&frame[0..2], &[0x47, 0x4C]);
        assert_eq!(frame[2], PROTOCOL_VERSION);
        assert_eq!(frame[3], 0x00);
        assert_eq!(&frame[4..6], &[0x12, 0x34]);
        assert_eq!(&frame[6..8], &[0xAB, 0xCD]);
        assert_eq!(frame[8], CMD_FULL);
        assert_eq!(frame.len(), HEADER_SIZE + 13);
    }

    #[test]
    fn test_delta_flag_follows_payload() {
        let payload = UpdatePayload::Delta(vec![RegionChange {
            region: Region::Right,
            color: Rgb::new(255, 255, 255),
        }]);
        let frame = encode_update(1, 0, &payload);

        assert_eq!(frame[3] & 0x01, 0x01);
        assert_eq!(frame[8], CMD_DELTA);
        assert_eq!(frame[9], 1); // changed count
        assert_eq!(&frame[10..14], &[1, 255, 255, 255]);
    }

    #[test]
    fn test_update_roundtrip() {
        let regions = [
            Rgb::new(1, 2, 3),
            Rgb::new(4, 5, 6),
            Rgb::new(7, 8, 9),
            Rgb::new(10, 11, 12),
        ];
        let frame = encode_update(42, 7, &UpdatePayload::Full(regions));
        let (header, payload) = decode_update(&frame).unwrap();

        assert!(!header.delta);
        assert_eq!(header.sequence, 42);
        assert_eq!(header.timestamp, 7);
        assert_eq!(payload, UpdatePayload::Full(regions));
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let payload = UpdatePayload::Full([Rgb::BLACK; 4]);
        let mut frame = encode_update(0, 0, &payload).to_vec();
        frame[0] = 0x00;

        assert!(matches!(
            decode_update(&frame),
            Err(Error::InvalidMagic(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_version() {
        let payload = UpdatePayload::Full([Rgb::BLACK; 4]);
        let mut frame = encode_update(0, 0, &payload).to_vec();
        frame[2] = 99;

        assert!(matches!(
            decode_update(&frame),
            Err(Error::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_decode_rejects_count_mismatch() {
        let payload = UpdatePayload::Delta(vec![
            RegionChange {
                region: Region::Top,
                color: Rgb::BLACK,
            },
            RegionChange {
                region: Region::Left,
                color: Rgb::BLACK,
            },
        ]);
        let mut frame = encode_update(0, 0, &payload).to_vec();
        frame[9] = 3; // declares one more entry than present

        assert!(matches!(
            decode_update(&frame),
            Err(Error::DeltaCountMismatch {
                declared: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_entries() {
        let payload = UpdatePayload::Delta(vec![RegionChange {
            region: Region::Top,
            color: Rgb::BLACK,
        }]);
        let frame = encode_update(0, 0, &payload);

        assert!(decode_update(&frame[..frame.len() - 1]).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_region_index() {
        let mut frame = encode_update(
            0,
            0,
            &UpdatePayload::Delta(vec![RegionChange {
                region: Region::Top,
                color: Rgb::BLACK,
            }]),
        )
        .to_vec();
        frame[10] = 7;

        assert!(matches!(
            decode_update(&frame),
            Err(Error::InvalidRegion(7))
        ));
    }

    #[test]
    fn test_solid_command_bytes() {
        assert_eq!(
            encode_solid(Rgb::new(0x10, 0x20, 0x30)),
            [0x00, 0x10, 0x20, 0x30]
        );
    }
}
