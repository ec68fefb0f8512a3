//! Yield math: pure functions, randomness supplied by the caller.

use rand::Rng;

use crate::YieldProfile;

/// Round `value` down or up at random, rounding up with probability equal to
/// the fractional part. The expectation equals `value`, so repeated yields
/// neither lose nor gain on average.
///
/// Returns `None` for negative, NaN or infinite input.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn stochastic_round(value: f64, rng: &mut impl Rng) -> Option<u64> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let floor = value.floor();
    let frac = value - floor;
    let rounded = if frac > 0.0 && rng.gen::<f64>() < frac {
        floor + 1.0
    } else {
        floor
    };
    Some(rounded as u64)
}

/// Integer commodity yield for a session that started at `starting_fullness`.
///
/// At least one unit is produced for any valid profile. `None` means the
/// profile produced an unusable value and nothing may be credited.
pub fn committed_yield(
    profile: &YieldProfile,
    starting_fullness: f32,
    rng: &mut impl Rng,
) -> Option<u64> {
    let fullness = f64::from(starting_fullness.clamp(0.0, 1.0));
    let raw = f64::from(profile.yield_per_full_unit) * fullness;
    stochastic_round(raw, rng).map(|amount| amount.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommodityKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn profile(yield_per_full_unit: f32) -> YieldProfile {
        YieldProfile {
            commodity: CommodityKind("milk".to_string()),
            yield_per_full_unit,
        }
    }

    #[test]
    fn whole_values_round_exactly() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(committed_yield(&profile(10.0), 0.5, &mut rng), Some(5));
        }
    }

    #[test]
    fn fractional_values_round_to_a_neighbour() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..1_000 {
            let amount = committed_yield(&profile(7.0), 0.5, &mut rng).unwrap();
            assert!((3..=4).contains(&amount), "3.5 rounded to {amount}");
        }
    }

    #[test]
    fn fractional_mean_converges() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let trials = 10_000;
        let total: u64 = (0..trials)
            .map(|_| committed_yield(&profile(7.0), 0.5, &mut rng).unwrap())
            .sum();
        let mean = total as f64 / f64::from(trials);
        assert!((mean - 3.5).abs() < 0.05, "mean was {mean}");
    }

    #[test]
    fn empty_animal_still_yields_one_unit() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(committed_yield(&profile(10.0), 0.0, &mut rng), Some(1));
    }

    #[test]
    fn fullness_is_clamped() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(committed_yield(&profile(10.0), 3.0, &mut rng), Some(10));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(stochastic_round(f64::NAN, &mut rng), None);
        assert_eq!(stochastic_round(-0.5, &mut rng), None);
        assert_eq!(stochastic_round(f64::INFINITY, &mut rng), None);
        assert_eq!(committed_yield(&profile(-4.0), 0.5, &mut rng), None);
        assert_eq!(committed_yield(&profile(f32::NAN), 0.5, &mut rng), None);
    }
}
