use proptest::prelude::*;

use stakelock_types::coefficient::COEFFICIENT_SCALE;
use stakelock_types::coin::u64_to_signed_bytes;
use stakelock_types::{Bytes32, Coefficient, Timestamp};

proptest! {
    /// Bytes32 display -> parse yields the same hash.
    #[test]
    fn bytes32_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = Bytes32::new(bytes);
        let parsed: Bytes32 = hash.to_string().parse().unwrap();
        prop_assert_eq!(parsed, hash);
    }

    /// Bytes32 bincode serialization roundtrip.
    #[test]
    fn bytes32_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = Bytes32::new(bytes);
        let encoded = bincode::serialize(&hash).unwrap();
        let decoded: Bytes32 = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, hash);
    }

    /// Coefficient display -> parse is the identity for every scaled value.
    #[test]
    fn coefficient_display_parse(scaled in 0u64..1_000_000_000) {
        let c = Coefficient::from_scaled(scaled);
        let parsed: Coefficient = c.to_string().parse().unwrap();
        prop_assert_eq!(parsed, c);
    }

    /// Exact application never exceeds the float estimate by more than one unit.
    #[test]
    fn coefficient_apply_matches_estimate(amount in 0u64..1_000_000_000_000, scaled in 0u64..50_000) {
        let c = Coefficient::from_scaled(scaled);
        let exact = c.apply(amount) as f64;
        let estimate = amount as f64 * c.to_f64();
        prop_assert!((exact - estimate).abs() <= 1.0 + estimate * 1e-12);
        prop_assert_eq!(c.apply_scaled(amount) / COEFFICIENT_SCALE as u128, c.apply(amount));
    }

    /// Timestamp elapsed_since saturates to 0 when now < self.
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(base);
        prop_assert_eq!(t.elapsed_since(Timestamp::new(base + offset)), offset);
        prop_assert_eq!(Timestamp::new(base + offset + 1).elapsed_since(t), 0);
    }

    /// The signed encoding is minimal and never negative.
    #[test]
    fn signed_bytes_minimal(value in 1u64..) {
        let bytes = u64_to_signed_bytes(value);
        prop_assert!(bytes[0] & 0x80 == 0);
        if bytes.len() > 1 {
            prop_assert!(bytes[0] != 0 || bytes[1] & 0x80 != 0);
        }
    }
}
