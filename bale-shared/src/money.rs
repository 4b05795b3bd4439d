//! Amounts are carried as integer minor units (cents) end to end.

pub const BPS_DENOMINATOR: i64 = 10_000;

/// Applies a basis-point rate to an amount in minor units, rounding half up.
pub fn apply_bps(amount: i64, bps: i64) -> i64 {
    let scaled = amount as i128 * bps as i128 + (BPS_DENOMINATOR / 2) as i128;
    scaled.div_euclid(BPS_DENOMINATOR as i128) as i64
}

/// Renders minor units as a decimal string, e.g. `29400` -> `"294.00"`.
pub fn format_minor(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_bps_rounds_half_up() {
        assert_eq!(apply_bps(30_000, 200), 600);
        // 0.02 * 25 cents = 0.5 cent -> 1
        assert_eq!(apply_bps(25, 200), 1);
        assert_eq!(apply_bps(24, 200), 0);
        assert_eq!(apply_bps(0, 200), 0);
    }

    #[test]
    fn test_format_minor() {
        assert_eq!(format_minor(29_400), "294.00");
        assert_eq!(format_minor(5), "0.05");
        assert_eq!(format_minor(-150), "-1.50");
    }
}
