//! Property tests for the feature normalizer and the synthetic generator.

use chrono::Utc;
use flowsense::features::{extract, FEATURE_DIM};
use flowsense::synth::{profile, SyntheticFlowGenerator};
use flowsense::{FlowDescriptor, Protocol, TrafficCategory, CATEGORY_COUNT};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

// ---------------------------------------------------------------------------
// Proptest strategies
// ---------------------------------------------------------------------------

fn protocol_strategy() -> impl Strategy<Value = Protocol> {
    prop_oneof![
        Just(Protocol::Tcp),
        Just(Protocol::Udp),
        Just(Protocol::Http),
        Just(Protocol::Https),
    ]
}

prop_compose! {
    fn flow_strategy()(
        packet_size in 0u32..20_000,
        protocol in protocol_strategy(),
        src_port in any::<u16>(),
        dst_port in any::<u16>(),
        bytes_per_sec in 0.0f64..1e12,
        packets_per_sec in 0.0f64..1e9,
        duration_secs in 0.0f64..1e9,
    ) -> FlowDescriptor {
        FlowDescriptor {
            timestamp: Utc::now(),
            packet_size,
            protocol,
            src_port,
            dst_port,
            bytes_per_sec,
            packets_per_sec,
            duration_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Property: normalized features stay in their documented ranges
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn feature_bounds_hold_for_arbitrary_flows(flow in flow_strategy(), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let v = extract(&flow, &mut rng);
        prop_assert_eq!(v.len(), FEATURE_DIM);

        // Index 0 is unclamped but never negative.
        prop_assert!(v[0] >= 0.0);
        // Indices 1..=6 are bounded to [0, 1].
        for i in 1..=6 {
            prop_assert!(v[i] >= 0.0 && v[i] <= 1.0, "feature {} = {} out of [0,1]", i, v[i]);
        }
        // Noise dimension is in [0, 1).
        prop_assert!(v[7] >= 0.0 && v[7] < 1.0);
    }
}

// ---------------------------------------------------------------------------
// Property: all dimensions except the noise one are deterministic
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn non_noise_dims_are_deterministic(flow in flow_strategy(), s1 in any::<u64>(), s2 in any::<u64>()) {
        let a = extract(&flow, &mut StdRng::seed_from_u64(s1));
        let b = extract(&flow, &mut StdRng::seed_from_u64(s2));
        for i in 0..7 {
            prop_assert_eq!(a[i], b[i]);
        }
    }
}

// ---------------------------------------------------------------------------
// Property: generated flows always land inside their category profile
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn generator_respects_profiles(idx in 0usize..CATEGORY_COUNT, seed in any::<u64>()) {
        let category = TrafficCategory::from_index(idx).unwrap();
        let gen = SyntheticFlowGenerator::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let flow = gen.generate(category, &mut rng);
        prop_assert!(profile(category).contains(&flow), "{:?} outside {:?} profile", flow, category);
    }
}

// ---------------------------------------------------------------------------
// Property: generated flows normalize into the unit box (modulo packet dim)
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn generated_flows_normalize_in_bounds(idx in 0usize..CATEGORY_COUNT, seed in any::<u64>()) {
        let category = TrafficCategory::from_index(idx).unwrap();
        let gen = SyntheticFlowGenerator::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let flow = gen.generate(category, &mut rng);
        let v = extract(&flow, &mut rng);
        for i in 0..FEATURE_DIM {
            prop_assert!(v[i] >= 0.0 && v[i] <= 1.0, "feature {} = {}", i, v[i]);
        }
    }
}
