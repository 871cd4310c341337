//! Rounding policy applied once when a breakdown is built.

use rust_decimal::{Decimal, RoundingStrategy};

pub const MONEY_DECIMAL_PLACES: u32 = 2;
pub const MULTIPLIER_DECIMAL_PLACES: u32 = 3;
pub const UNITS_DECIMAL_PLACES: u32 = 2;
pub const STRATEGY: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Rounds to cents and pins the scale so `127.5` renders as `127.50`.
pub fn money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_DECIMAL_PLACES, STRATEGY);
    rounded.rescale(MONEY_DECIMAL_PLACES);
    rounded
}

pub fn multiplier(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MULTIPLIER_DECIMAL_PLACES, STRATEGY)
}

pub fn units(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(UNITS_DECIMAL_PLACES, STRATEGY)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{money, multiplier, units};

    #[test]
    fn money_rounds_half_away_from_zero_with_fixed_scale() {
        assert_eq!(money(Decimal::new(1275, 1)).to_string(), "127.50");
        assert_eq!(money(Decimal::new(10005, 3)).to_string(), "10.01");
        assert_eq!(money(Decimal::new(10004, 3)).to_string(), "10.00");
        assert_eq!(money(Decimal::ZERO).to_string(), "0.00");
    }

    #[test]
    fn multiplier_keeps_three_places() {
        // 1.3 * 1.4 * 1.8
        assert_eq!(multiplier(Decimal::new(3276, 3)).to_string(), "3.276");
        assert_eq!(multiplier(Decimal::new(12345, 4)).to_string(), "1.235");
        assert_eq!(multiplier(Decimal::new(15, 1)).to_string(), "1.5");
    }

    #[test]
    fn units_round_to_two_places() {
        assert_eq!(units(Decimal::new(12_3456, 4)).to_string(), "12.35");
    }
}
