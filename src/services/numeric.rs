use bigdecimal::{BigDecimal, ToPrimitive, Zero};

// Money stays in BigDecimal; percentages and rates are reported as f64.

pub fn to_decimal(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    value.to_string().parse::<BigDecimal>().ok()
}

pub fn to_f64(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// `part / whole * 100`, or 0 when `whole` is not positive.
pub fn percentage_of(part: &BigDecimal, whole: &BigDecimal) -> f64 {
    if *whole <= BigDecimal::zero() {
        return 0.0;
    }
    to_f64(&(part * BigDecimal::from(100) / whole))
}

/// `total * pct / 100`
pub fn share_of(total: &BigDecimal, pct: &BigDecimal) -> BigDecimal {
    total * pct / BigDecimal::from(100)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_to_decimal_rejects_non_finite() {
        assert!(to_decimal(f64::NAN).is_none());
        assert!(to_decimal(f64::INFINITY).is_none());
        assert_eq!(to_decimal(185.5), Some(BigDecimal::from_str("185.5").unwrap()));
    }

    #[test]
    fn test_percentage_of_zero_whole() {
        assert_eq!(percentage_of(&BigDecimal::from(5), &BigDecimal::zero()), 0.0);
        assert_eq!(percentage_of(&BigDecimal::from(3), &BigDecimal::from(12)), 25.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.3456), 12.35);
        assert_eq!(round2(-0.004), -0.0);
    }
}
