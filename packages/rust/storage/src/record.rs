//! Packed freshness records and URL fingerprints.
//!
//! A record occupies exactly [`RECORD_LEN`] bytes on disk:
//!
//! ```text
//!  0        3  4                 8
//! +----------+--+----------------+
//! | last_seen |w|   hit_count    |
//! +----------+--+----------------+
//! ```
//!
//! `last_seen` is a big-endian unix timestamp whose low byte is masked off and
//! replaced by the weight `w`; `hit_count` is big-endian.

use polycrawl_shared::{Decision, FreshnessOptions};

/// Encoded record size in bytes.
pub const RECORD_LEN: usize = 8;

/// Timestamps keep only their upper 24 bits of the low word.
pub const TIMESTAMP_MASK: u32 = 0xffff_ff00;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// The freshness state of one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessRecord {
    /// Truncated unix seconds of the last New or Stale decision.
    pub last_seen: u32,
    /// Opaque priority byte, preserved once written.
    pub weight: u8,
    /// Number of times the URL has been checked.
    pub hit_count: u32,
}

impl FreshnessRecord {
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let head = (self.last_seen & TIMESTAMP_MASK) | u32::from(self.weight);
        let mut out = [0u8; RECORD_LEN];
        out[..4].copy_from_slice(&head.to_be_bytes());
        out[4..].copy_from_slice(&self.hit_count.to_be_bytes());
        out
    }

    /// Decode a stored value. Anything but exactly [`RECORD_LEN`] bytes is malformed.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; RECORD_LEN] = bytes.try_into().ok()?;
        let head = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Some(Self {
            last_seen: head & TIMESTAMP_MASK,
            weight: bytes[3],
            hit_count: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}

/// Truncate unix seconds to record precision.
pub fn truncate(unix_secs: u64) -> u32 {
    (unix_secs as u32) & TIMESTAMP_MASK
}

/// 64-bit FNV-1 hash of the URL bytes.
pub fn fingerprint(url: &str) -> u64 {
    url.bytes().fold(FNV_OFFSET_BASIS, |hash, b| {
        hash.wrapping_mul(FNV_PRIME) ^ u64::from(b)
    })
}

/// Storage key for a URL: its fingerprint, big-endian.
pub fn key_for(url: &str) -> [u8; 8] {
    fingerprint(url).to_be_bytes()
}

/// Apply one check at truncated time `now` to an existing record (if any).
pub fn observe(
    existing: Option<FreshnessRecord>,
    now: u32,
    options: &FreshnessOptions,
) -> (FreshnessRecord, Decision) {
    let Some(mut record) = existing else {
        let record = FreshnessRecord {
            last_seen: now,
            weight: options.default_weight,
            hit_count: 1,
        };
        return (record, Decision::New);
    };

    record.hit_count = record.hit_count.saturating_add(1);
    if now.saturating_sub(record.last_seen) > options.stale_after_secs {
        record.last_seen = now;
        (record, Decision::Stale)
    } else {
        (record, Decision::Fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u32 = 1_700_000_000 & TIMESTAMP_MASK;

    #[test]
    fn fnv1_reference_vectors() {
        assert_eq!(fingerprint(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fingerprint("a"), 0xaf63_bd4c_8601_b7be);
        assert_ne!(fingerprint("http://a/"), fingerprint("http://b/"));
        assert_eq!(key_for("a"), 0xaf63_bd4c_8601_b7be_u64.to_be_bytes());
    }

    #[test]
    fn byte_layout() {
        let record = FreshnessRecord {
            last_seen: 0x1234_5600,
            weight: 0x07,
            hit_count: 0x0000_0102,
        };
        assert_eq!(
            record.encode(),
            [0x12, 0x34, 0x56, 0x07, 0x00, 0x00, 0x01, 0x02]
        );
        assert_eq!(FreshnessRecord::decode(&record.encode()), Some(record));
    }

    #[test]
    fn low_timestamp_bits_never_leak() {
        let record = FreshnessRecord {
            last_seen: 0x1234_56ff,
            weight: 1,
            hit_count: 1,
        };
        let decoded = FreshnessRecord::decode(&record.encode()).expect("decode");
        assert_eq!(decoded.last_seen, 0x1234_5600);
        assert_eq!(decoded.weight, 1);
    }

    #[test]
    fn wrong_length_is_malformed() {
        assert_eq!(FreshnessRecord::decode(&[]), None);
        assert_eq!(FreshnessRecord::decode(&[0; 7]), None);
        assert_eq!(FreshnessRecord::decode(&[0; 9]), None);
    }

    #[test]
    fn truncate_masks_low_byte() {
        assert_eq!(truncate(0x1234_56ff), 0x1234_5600);
        assert_eq!(truncate(0x1_0000_0100), 0x0000_0100);
    }

    #[test]
    fn lifecycle_new_fresh_stale() {
        let options = FreshnessOptions::default();

        let (first, decision) = observe(None, T0, &options);
        assert_eq!(decision, Decision::New);
        assert_eq!(first.hit_count, 1);
        assert_eq!(first.weight, options.default_weight);

        let (second, decision) = observe(Some(first), T0 + 256, &options);
        assert_eq!(decision, Decision::Fresh);
        assert_eq!(second.last_seen, T0);
        assert_eq!(second.hit_count, 2);

        let later = T0 + options.stale_after_secs + 256;
        let (third, decision) = observe(Some(second), later, &options);
        assert_eq!(decision, Decision::Stale);
        assert_eq!(third.last_seen, later);
        assert_eq!(third.hit_count, 3);
    }

    #[test]
    fn boundary_is_not_stale() {
        let options = FreshnessOptions::default();
        let record = FreshnessRecord {
            last_seen: T0,
            weight: 1,
            hit_count: 1,
        };
        let (_, decision) = observe(Some(record), T0 + options.stale_after_secs, &options);
        assert_eq!(decision, Decision::Fresh);
    }

    #[test]
    fn clock_going_backwards_stays_fresh() {
        let options = FreshnessOptions::default();
        let record = FreshnessRecord {
            last_seen: T0,
            weight: 1,
            hit_count: 1,
        };
        let (updated, decision) = observe(Some(record), T0 - 0x10_0000, &options);
        assert_eq!(decision, Decision::Fresh);
        assert_eq!(updated.last_seen, T0);
    }

    #[test]
    fn weight_is_preserved_and_hits_saturate() {
        let options = FreshnessOptions::default();
        let record = FreshnessRecord {
            last_seen: T0,
            weight: 9,
            hit_count: u32::MAX,
        };
        let (updated, _) = observe(Some(record), T0 + 2 * options.stale_after_secs, &options);
        assert_eq!(updated.weight, 9);
        assert_eq!(updated.hit_count, u32::MAX);
    }
}
