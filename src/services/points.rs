//! Reward points calculation
//!
//! Seven independent additive rules. Malformed amounts never fail the
//! calculation: the affected rule contributes zero.

use crate::domain::receipt::{Item, Receipt};
use chrono::{Datelike, NaiveTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const ROUND_DOLLAR_POINTS: u64 = 50;
const QUARTER_MULTIPLE_POINTS: u64 = 25;
const ITEM_PAIR_POINTS: u64 = 5;
const ODD_DAY_POINTS: u64 = 6;
const AFTERNOON_POINTS: u64 = 10;

/// Trimmed description lengths that are multiples of this earn the price bonus
const DESCRIPTION_LEN_MULTIPLE: usize = 3;

/// Afternoon window bounds (seconds from midnight), both exclusive
const AFTERNOON_START_SECS: u32 = 14 * 3600;
const AFTERNOON_END_SECS: u32 = 16 * 3600;

/// Per-rule contributions to a receipt's score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointsBreakdown {
    pub retailer_name: u64,
    pub round_dollar: u64,
    pub quarter_multiple: u64,
    pub item_pairs: u64,
    pub descriptions: u64,
    pub odd_day: u64,
    pub afternoon: u64,
}

impl PointsBreakdown {
    pub fn total(&self) -> u64 {
        self.retailer_name
            + self.round_dollar
            + self.quarter_multiple
            + self.item_pairs
            + self.descriptions
            + self.odd_day
            + self.afternoon
    }
}

/// Compute the points for a receipt
pub fn compute(receipt: &Receipt) -> u64 {
    breakdown(receipt).total()
}

/// Evaluate every rule and return the individual contributions
pub fn breakdown(receipt: &Receipt) -> PointsBreakdown {
    let total = parse_amount(&receipt.total);

    PointsBreakdown {
        retailer_name: count_alphanumeric(&receipt.retailer),
        round_dollar: if total.is_some_and(is_round_dollar) { ROUND_DOLLAR_POINTS } else { 0 },
        quarter_multiple: if total.is_some_and(is_quarter_multiple) {
            QUARTER_MULTIPLE_POINTS
        } else {
            0
        },
        item_pairs: (receipt.items.len() / 2) as u64 * ITEM_PAIR_POINTS,
        descriptions: receipt.items.iter().map(description_points).sum(),
        odd_day: if receipt.purchase_date.day() % 2 == 1 { ODD_DAY_POINTS } else { 0 },
        afternoon: if in_afternoon_window(receipt.purchase_time) { AFTERNOON_POINTS } else { 0 },
    }
}

/// Parse a decimal amount; `None` means the rule using it contributes nothing
///
/// Digit separators and amounts with more precision than a `Decimal` holds
/// are rejected rather than rounded.
#[inline]
fn parse_amount(raw: &str) -> Option<Decimal> {
    if raw.contains('_') {
        return None;
    }
    Decimal::from_str_exact(raw).ok()
}

/// Count unicode letters and numbers
fn count_alphanumeric(s: &str) -> u64 {
    s.chars().filter(|c| c.is_alphanumeric()).count() as u64
}

fn is_round_dollar(amount: Decimal) -> bool {
    amount.fract().is_zero()
}

fn is_quarter_multiple(amount: Decimal) -> bool {
    amount.checked_mul(Decimal::from(4)).is_some_and(|quarters| quarters.fract().is_zero())
}

/// ceil(price * 0.2) when the trimmed description length is a multiple of 3
///
/// Length is measured in bytes of the trimmed UTF-8 text.
fn description_points(item: &Item) -> u64 {
    let description = item.short_description.trim();
    if description.len() % DESCRIPTION_LEN_MULTIPLE != 0 {
        return 0;
    }

    let Some(price) = parse_amount(&item.price) else {
        return 0;
    };
    if price.is_sign_negative() {
        return 0;
    }

    price
        .checked_mul(Decimal::new(2, 1))
        .and_then(|bonus| bonus.ceil().to_u64())
        .unwrap_or(0)
}

/// Strictly after 14:00 and strictly before 16:00
fn in_afternoon_window(time: NaiveTime) -> bool {
    let secs = time.num_seconds_from_midnight();
    let after_start =
        secs > AFTERNOON_START_SECS || (secs == AFTERNOON_START_SECS && time.nanosecond() > 0);
    after_start && secs < AFTERNOON_END_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::receipt::ReceiptBuilder;
    use rust_decimal_macros::dec;

    /// Builder baseline scores zero: empty retailer, total 0.10, no items,
    /// even day, 10:00.
    fn base() -> ReceiptBuilder {
        ReceiptBuilder::new()
    }

    #[test]
    fn test_baseline_scores_zero() {
        assert_eq!(compute(&base().build()), 0);
    }

    #[test]
    fn test_target_receipt() {
        let receipt = base()
            .retailer("Target")
            .total("35.35")
            .date(2022, 1, 13)
            .time(13, 1)
            .item("Mountain Dew 12PK", "6.49")
            .item("Emils Cheese Pizza", "12.00")
            .item("Knorr Creamy Chicken", "1.26")
            .item("Doritos Nacho Cheese", "3.35")
            .item("   Klarbrunn 12-PK 12 FL OZ  ", "9.00")
            .build();

        let points = breakdown(&receipt);
        assert_eq!(
            points,
            PointsBreakdown {
                retailer_name: 6,
                round_dollar: 0,
                quarter_multiple: 0,
                item_pairs: 10,
                descriptions: 5,
                odd_day: 6,
                afternoon: 0,
            }
        );
        assert_eq!(compute(&receipt), 27);
    }

    #[test]
    fn test_corner_market_receipt() {
        let receipt = base()
            .retailer("M&M Corner Market")
            .total("9.00")
            .date(2022, 3, 20)
            .time(14, 33)
            .item("Gatorade", "2.25")
            .item("Gatorade", "2.25")
            .item("Gatorade", "2.25")
            .item("Gatorade", "2.25")
            .build();

        assert_eq!(compute(&receipt), 109);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let receipt = base()
            .retailer("Walgreens")
            .total("2.65")
            .date(2022, 1, 2)
            .time(8, 13)
            .item("Pepsi - 12-oz", "1.25")
            .item("Dasani", "1.40")
            .build();

        let first = compute(&receipt);
        for _ in 0..10 {
            assert_eq!(compute(&receipt), first);
        }
    }

    #[test]
    fn test_retailer_name_counts_letters_and_digits() {
        assert_eq!(count_alphanumeric("Target"), 6);
        assert_eq!(count_alphanumeric("M&M Corner Market"), 14);
        assert_eq!(count_alphanumeric("Café 42"), 6);
        assert_eq!(count_alphanumeric("!!! --- ..."), 0);
        assert_eq!(count_alphanumeric(""), 0);
    }

    #[test]
    fn test_round_dollar_stacks_with_quarter_multiple() {
        let points = breakdown(&base().total("9.00").build());
        assert_eq!(points.round_dollar, 50);
        assert_eq!(points.quarter_multiple, 25);
        assert_eq!(points.total(), 75);

        assert_eq!(compute(&base().total("10").build()), 75);
    }

    #[test]
    fn test_quarter_multiple_only() {
        let points = breakdown(&base().total("9.25").build());
        assert_eq!(points.round_dollar, 0);
        assert_eq!(points.quarter_multiple, 25);

        assert_eq!(compute(&base().total("9.75").build()), 25);
    }

    #[test]
    fn test_total_not_round_or_quarter() {
        assert_eq!(compute(&base().total("35.35").build()), 0);
        assert_eq!(compute(&base().total("9.10").build()), 0);
    }

    #[test]
    fn test_unparseable_total_contributes_zero() {
        assert_eq!(compute(&base().total("").build()), 0);
        assert_eq!(compute(&base().total("twelve").build()), 0);
        assert_eq!(compute(&base().total("$9.00").build()), 0);
        assert_eq!(compute(&base().total("1_000").build()), 0);
        assert_eq!(compute(&base().total("0.0000000000000000000000000000001").build()), 0);
    }

    #[test]
    fn test_item_pairs() {
        let cases = [(0, 0), (1, 0), (2, 5), (3, 5), (4, 10)];
        for (count, expected) in cases {
            let mut builder = base();
            for _ in 0..count {
                // Length 2 keeps the description rule out of the picture
                builder = builder.item("ab", "10.00");
            }
            assert_eq!(breakdown(&builder.build()).item_pairs, expected, "{count} items");
        }
    }

    #[test]
    fn test_description_length_multiple_of_three() {
        assert_eq!(description_points(&Item::new("abc", "4.99")), 1);
        assert_eq!(description_points(&Item::new("abcdef", "12.00")), 3);
        assert_eq!(description_points(&Item::new("Emils Cheese Pizza", "12.25")), 3);
    }

    #[test]
    fn test_description_empty_counts_as_multiple() {
        assert_eq!(description_points(&Item::new("", "10.00")), 2);
        assert_eq!(description_points(&Item::new("   ", "10.00")), 2);
    }

    #[test]
    fn test_description_is_trimmed() {
        assert_eq!(description_points(&Item::new("  abc  ", "1.00")), 1);
        assert_eq!(description_points(&Item::new("\tabcd\n", "100.00")), 0);
    }

    #[test]
    fn test_description_length_not_multiple_ignores_price() {
        assert_eq!(description_points(&Item::new("abcd", "1000.00")), 0);
        assert_eq!(description_points(&Item::new("Gatorade", "2.25")), 0);
    }

    #[test]
    fn test_description_bad_price_contributes_zero() {
        assert_eq!(description_points(&Item::new("abc", "not-a-price")), 0);
        assert_eq!(description_points(&Item::new("abc", "")), 0);
        assert_eq!(description_points(&Item::new("abc", "-5.00")), 0);
    }

    #[test]
    fn test_description_bonus_is_exact() {
        // 5.00 * 0.2 is exactly 1; no rounding up from float error
        assert_eq!(description_points(&Item::new("abc", "5.00")), 1);
        assert_eq!(description_points(&Item::new("abc", "0")), 0);
        assert_eq!(description_points(&Item::new("abc", "0.01")), 1);
    }

    #[test]
    fn test_odd_day() {
        assert_eq!(breakdown(&base().date(2022, 1, 13).build()).odd_day, 6);
        assert_eq!(breakdown(&base().date(2022, 1, 31).build()).odd_day, 6);
        assert_eq!(breakdown(&base().date(2022, 1, 14).build()).odd_day, 0);
    }

    #[test]
    fn test_afternoon_window_bounds_are_exclusive() {
        let cases = [(13, 59, 0), (14, 0, 0), (14, 1, 10), (15, 0, 10), (15, 59, 10), (16, 0, 0)];
        for (hour, minute, expected) in cases {
            let points = breakdown(&base().time(hour, minute).build());
            assert_eq!(points.afternoon, expected, "{hour:02}:{minute:02}");
        }
    }

    #[test]
    fn test_afternoon_window_sub_minute() {
        let just_after = NaiveTime::from_hms_opt(14, 0, 1).unwrap();
        let just_before_end = NaiveTime::from_hms_opt(15, 59, 59).unwrap();
        let fraction_after = NaiveTime::from_hms_milli_opt(14, 0, 0, 1).unwrap();
        assert!(in_afternoon_window(just_after));
        assert!(in_afternoon_window(just_before_end));
        assert!(in_afternoon_window(fraction_after));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("35.35"), Some(dec!(35.35)));
        assert_eq!(parse_amount("12"), Some(dec!(12)));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("1_000"), None);
        assert_eq!(parse_amount("0.0000000000000000000000000000001"), None);
    }
}
