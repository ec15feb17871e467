use clinic_core::routing::{ExamShares, PatientType, RoutingTable};
use proptest::prelude::*;

fn shares_strategy() -> impl Strategy<Value = ExamShares> {
    prop::collection::vec(0.001f64..1.0, 9).prop_map(|w| {
        let total: f64 = w.iter().sum();
        ExamShares {
            screen_mammo: w[0] / total,
            dx_mammo_us: w[1] / total,
            dx_mammo: w[2] / total,
            dx_us: w[3] / total,
            us_guided_biopsy: w[4] / total,
            mammo_guided_biopsy: w[5] / total,
            screen_us: w[6] / total,
            mri_guided_biopsy: w[7] / total,
            other_mri: w[8] / total,
        }
    })
}

proptest! {
    #[test]
    fn ai_splits_only_the_screening_segment(shares in shares_strategy(), f in 0.0f64..=1.0) {
        let off = RoutingTable::build(&shares, None).widths();
        let on = RoutingTable::build(&shares, Some(f)).widths();
        let s = shares.screen_mammo;

        prop_assert_eq!(off.len(), 8);
        prop_assert_eq!(on.len(), 11);
        prop_assert!((on[0] - s * (1.0 - f)).abs() < 1e-9);
        prop_assert!((on[1] - 0.70 * s * f).abs() < 1e-9);
        prop_assert!((on[2] - 0.15 * s * f).abs() < 1e-9);
        prop_assert!((on[3] - 0.15 * s * f).abs() < 1e-9);
        for (a, b) in on[4..].iter().zip(&off[1..]) {
            prop_assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn every_draw_routes_to_a_known_pathway(
        shares in shares_strategy(),
        f in 0.0f64..=1.0,
        draw in 0.0f64..1.0,
    ) {
        let table = RoutingTable::build(&shares, Some(f));
        let patient_type = table.select(draw);
        prop_assert!(PatientType::ALL.contains(&patient_type));
    }
}
