use proptest::prelude::*;
use superboids_core::forces::{harris_parameter, Regime, SpringLaw};
use superboids_data::Vec2;

const EPS: f64 = 1e-7;

fn law() -> impl Strategy<Value = (f64, SpringLaw)> {
    (0.05f64..5.0, 0.3f64..3.0, 0.0f64..2.0, 0.0f64..2.0).prop_map(|(beta, req, begin, width)| {
        let plastic_begin = req + begin;
        (beta, SpringLaw::new(req, plastic_begin, plastic_begin + width))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn test_force_is_continuous_at_plastic_begin((beta, law) in law()) {
        let direction = Vec2::new(0.6, 0.8);
        let before = law.force(law.plastic_begin - EPS, direction, beta);
        let after = law.force(law.plastic_begin + EPS, direction, beta);
        prop_assert!((before - after).norm() < 10.0 * beta * EPS / law.req + 1e-12);
    }

    #[test]
    fn test_force_is_continuous_at_plastic_end((beta, law) in law()) {
        let direction = Vec2::new(-1.0, 0.0);
        let before = law.force(law.plastic_end - EPS, direction, beta);
        let after = law.force(law.plastic_end + EPS, direction, beta);
        prop_assert!((before - after).norm() < 10.0 * beta * EPS / law.req + 1e-12);
    }

    #[test]
    fn test_force_vanishes_at_equilibrium((beta, law) in law()) {
        let f = law.force(law.req, Vec2::new(1.0, 0.0), beta);
        prop_assert!(f.norm() < 1e-12);
    }

    #[test]
    fn test_scalar_never_increases_with_distance(
        (_, law) in law(),
        d in 0.0f64..8.0,
        step in 0.0f64..1.0,
    ) {
        prop_assert!(law.scalar(d + step) <= law.scalar(d) + 1e-12);
    }

    #[test]
    fn test_harris_parameter_stays_in_range(
        row in proptest::collection::vec(0.0f64..10.0, 3),
        medium in 0.0f64..10.0,
        counts in proptest::collection::vec(0usize..20, 3),
        expected in 0usize..30,
    ) {
        let value = harris_parameter(&row, medium, &counts, expected);
        let lo = row.iter().copied().fold(medium, f64::min);
        let hi = row.iter().copied().fold(medium, f64::max);
        prop_assert!(value >= lo - 1e-9 && value <= hi + 1e-9);
    }
}

#[test]
fn test_regimes_in_order() {
    let law = SpringLaw::new(1.0, 1.2, 1.5);
    assert_eq!(law.regime_at(0.5), Regime::Elastic);
    assert_eq!(law.regime_at(1.3), Regime::Plastic);
    assert_eq!(law.regime_at(2.0), Regime::ReElastic);
}
