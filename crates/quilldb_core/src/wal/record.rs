//! WAL frame format and write-batch payloads.

use crate::types::SequenceNumber;

/// Magic bytes identifying a WAL frame.
pub const FRAME_MAGIC: [u8; 4] = *b"QWAL";

/// Current WAL frame format version.
pub const FRAME_VERSION: u16 = 1;

/// Header size for WAL frames.
/// magic (4) + version (2) + length (4) = 10 bytes
pub const FRAME_HEADER_SIZE: usize = 10;

/// CRC size.
pub const CRC_SIZE: usize = 4;

/// Fixed batch header: start sequence (8) + count (4).
///
/// Any record shorter than this cannot carry a batch and is dropped as
/// corrupt by the readers.
pub const BATCH_HEADER_SIZE: usize = 12;

/// A committed write-batch as stored in the log.
///
/// The batch is an opaque payload with a fixed 12-byte header: the sequence
/// number of its first write and the number of sequence numbers it occupies.
/// The ops that follow are length-prefixed byte strings the engine does not
/// interpret at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    data: Vec<u8>,
}

impl WriteBatch {
    /// Creates an empty batch starting at `start_sequence`.
    #[must_use]
    pub fn new(start_sequence: SequenceNumber) -> Self {
        let mut data = Vec::with_capacity(BATCH_HEADER_SIZE);
        data.extend_from_slice(&start_sequence.as_u64().to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        Self { data }
    }

    /// Appends one op to the batch, occupying one sequence number.
    pub fn push(&mut self, op: &[u8]) {
        let count = self.count() + 1;
        self.data[8..12].copy_from_slice(&count.to_le_bytes());
        let len = op.len() as u32;
        self.data.extend_from_slice(&len.to_le_bytes());
        self.data.extend_from_slice(op);
    }

    /// Wraps a payload read back from the log.
    ///
    /// The caller must have verified `payload.len() >= BATCH_HEADER_SIZE`.
    #[must_use]
    pub fn from_payload(payload: Vec<u8>) -> Self {
        debug_assert!(payload.len() >= BATCH_HEADER_SIZE);
        Self { data: payload }
    }

    /// Sequence number of the first write in the batch.
    #[must_use]
    pub fn start_sequence(&self) -> SequenceNumber {
        let bytes: [u8; 8] = self.data[0..8].try_into().unwrap_or([0; 8]);
        SequenceNumber::new(u64::from_le_bytes(bytes))
    }

    /// Number of sequence numbers the batch occupies.
    #[must_use]
    pub fn count(&self) -> u32 {
        let bytes: [u8; 4] = self.data[8..12].try_into().unwrap_or([0; 4]);
        u32::from_le_bytes(bytes)
    }

    /// Sequence number of the last write in the batch.
    ///
    /// Meaningful only when `count() >= 1`.
    #[must_use]
    pub fn last_sequence(&self) -> SequenceNumber {
        SequenceNumber::new(self.start_sequence().as_u64() + u64::from(self.count()) - 1)
    }

    /// Size of the payload in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Raw payload bytes (header + ops).
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Iterates over the ops in the batch.
    ///
    /// Stops early if the op framing is damaged; the batch header remains
    /// authoritative for sequence accounting.
    pub fn ops(&self) -> Ops<'_> {
        Ops {
            data: &self.data,
            cursor: BATCH_HEADER_SIZE,
        }
    }
}

/// Iterator over the ops of a [`WriteBatch`].
#[derive(Debug)]
pub struct Ops<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> Iterator for Ops<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor + 4 > self.data.len() {
            return None;
        }
        let bytes: [u8; 4] = self.data[self.cursor..self.cursor + 4].try_into().ok()?;
        let len = u32::from_le_bytes(bytes) as usize;
        let start = self.cursor + 4;
        let end = start.checked_add(len)?;
        if end > self.data.len() {
            return None;
        }
        self.cursor = end;
        Some(&self.data[start..end])
    }
}

/// Encodes a batch payload into a full on-disk frame.
///
/// ```text
/// | magic (4) | version (2) | length (4) | payload (N) | crc32 (4) |
/// ```
///
/// The CRC covers everything before it.
#[must_use]
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len() + CRC_SIZE);

    data.extend_from_slice(&FRAME_MAGIC);
    data.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    data.extend_from_slice(payload);

    let crc = compute_crc32(&data);
    data.extend_from_slice(&crc.to_le_bytes());

    data
}

/// Computes CRC32 checksum for data.
pub fn compute_crc32(data: &[u8]) -> u32 {
    // Simple CRC32 implementation (IEEE polynomial)
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_has_header_only() {
        let batch = WriteBatch::new(SequenceNumber::new(9));
        assert_eq!(batch.byte_size(), BATCH_HEADER_SIZE);
        assert_eq!(batch.start_sequence().as_u64(), 9);
        assert_eq!(batch.count(), 0);
    }

    #[test]
    fn push_bumps_count() {
        let mut batch = WriteBatch::new(SequenceNumber::new(1));
        batch.push(b"put a=1");
        batch.push(b"del b");

        assert_eq!(batch.count(), 2);
        assert_eq!(batch.last_sequence().as_u64(), 2);
    }

    #[test]
    fn payload_roundtrip() {
        let mut batch = WriteBatch::new(SequenceNumber::new(42));
        batch.push(b"op one");
        batch.push(b"op two");

        let decoded = WriteBatch::from_payload(batch.data().to_vec());
        assert_eq!(decoded.start_sequence().as_u64(), 42);
        assert_eq!(decoded.count(), 2);

        let ops: Vec<_> = decoded.ops().collect();
        assert_eq!(ops, vec![b"op one".as_slice(), b"op two".as_slice()]);
    }

    #[test]
    fn ops_stop_on_damaged_framing() {
        let mut batch = WriteBatch::new(SequenceNumber::new(1));
        batch.push(b"intact");

        // Claim a second op longer than the remaining bytes.
        let mut payload = batch.data().to_vec();
        payload.extend_from_slice(&1000u32.to_le_bytes());
        payload.extend_from_slice(b"short");

        let decoded = WriteBatch::from_payload(payload);
        let ops: Vec<_> = decoded.ops().collect();
        assert_eq!(ops, vec![b"intact".as_slice()]);
    }

    #[test]
    fn frame_layout() {
        let frame = encode_frame(b"payload");
        assert_eq!(frame.len(), FRAME_HEADER_SIZE + 7 + CRC_SIZE);
        assert_eq!(&frame[0..4], &FRAME_MAGIC);
        assert_eq!(
            u32::from_le_bytes(frame[6..10].try_into().unwrap()),
            7
        );

        let crc_offset = frame.len() - CRC_SIZE;
        let stored = u32::from_le_bytes(frame[crc_offset..].try_into().unwrap());
        assert_eq!(stored, compute_crc32(&frame[..crc_offset]));
    }

    #[test]
    fn crc32_known_value() {
        // Known test vector: "123456789" should give 0xCBF43926
        let crc = compute_crc32(b"123456789");
        assert_eq!(crc, 0xCBF4_3926);
    }

    #[test]
    fn crc32_empty() {
        let crc = compute_crc32(b"");
        assert_eq!(crc, 0x0000_0000);
    }
}
