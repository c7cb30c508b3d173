use proptest::prelude::*;

use yieldshare_types::{mul_div, AccountId, AssetId, Tick, SCALE};

proptest! {
    /// Tick ordering follows the raw counter.
    #[test]
    fn tick_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Tick::new(a);
        let tb = Tick::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// elapsed_until never exceeds the forward distance.
    #[test]
    fn elapsed_matches_subtraction(start in 0u64..1_000_000, delta in 0u64..1_000_000) {
        let s = Tick::new(start);
        prop_assert_eq!(s.elapsed_until(Tick::new(start + delta)), delta);
    }

    /// A share of at most SCALE never yields more than the base.
    #[test]
    fn scaled_share_bounded_by_base(base in 0u128..=u128::MAX, pct in 0u128..=SCALE) {
        let owed = mul_div(base, pct, SCALE).unwrap();
        prop_assert!(owed <= base);
    }

    /// The claim ratio of an 18-decimal position computes without overflow
    /// and never exceeds SCALE.
    #[test]
    fn claim_ratio_fits_at_token_scale(
        amount in 1u128..1_000_000_000 * SCALE,
        length in 1u128..100_000,
        elapsed_frac in 0u128..=1_000,
    ) {
        let projected = amount * length;
        let accrued = projected * elapsed_frac / 1_000;
        let pct = mul_div(accrued, SCALE, projected).unwrap();
        prop_assert!(pct <= SCALE);
    }

    /// Identity bincode roundtrip.
    #[test]
    fn identities_bincode_roundtrip(raw in "[a-zA-Z0-9_]{1,24}") {
        let account = AccountId::new(raw.clone());
        let asset = AssetId::new(raw);
        let a: AccountId = bincode::deserialize(&bincode::serialize(&account).unwrap()).unwrap();
        let b: AssetId = bincode::deserialize(&bincode::serialize(&asset).unwrap()).unwrap();
        prop_assert_eq!(a, account);
        prop_assert_eq!(b, asset);
    }
}
