//! Per-wallet principal record kept by the deposit ledger.

use crate::domain::{Address, Decimal, TimeSec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The running total would not fit in a decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deposit total overflowed")]
pub struct DepositOverflow;

/// Running total of principal a wallet has put in, driven by application events.
///
/// Never derived from transfer history. `total_deposited` is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRecord {
    pub wallet: Address,
    pub total_deposited: Decimal,
    pub last_updated: TimeSec,
}

impl DepositRecord {
    /// Empty record for a wallet with no recorded events yet.
    pub fn empty(wallet: Address, now: TimeSec) -> Self {
        Self {
            wallet,
            total_deposited: Decimal::zero(),
            last_updated: now,
        }
    }

    /// `total_deposited += amount`, clamped at zero. On overflow the record is left untouched.
    pub fn apply_deposit(&mut self, amount: Decimal, now: TimeSec) -> Result<(), DepositOverflow> {
        let total = self
            .total_deposited
            .checked_add(amount)
            .ok_or(DepositOverflow)?;
        self.total_deposited = total.non_negative();
        self.last_updated = now;
        Ok(())
    }

    /// Remove principal in proportion to the share of total value withdrawn.
    ///
    /// With no positive value before the withdrawal, nothing on record, or a withdrawal of at
    /// least the whole value, the total resets to zero.
    pub fn apply_withdrawal(
        &mut self,
        withdrawn_value: Decimal,
        total_value_before: Decimal,
        now: TimeSec,
    ) {
        self.last_updated = now;

        if !total_value_before.is_positive()
            || !self.total_deposited.is_positive()
            || withdrawn_value >= total_value_before
        {
            self.total_deposited = Decimal::zero();
            return;
        }

        let remaining = withdrawn_value
            .checked_div(total_value_before)
            .and_then(|fraction| self.total_deposited.checked_mul(fraction))
            .and_then(|removed| self.total_deposited.checked_sub(removed));
        self.total_deposited = remaining.unwrap_or_default().non_negative();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record() -> DepositRecord {
        DepositRecord::empty(Address::new("0xabc"), TimeSec::new(0))
    }

    #[test]
    fn deposit_accumulates() {
        let mut r = record();
        r.apply_deposit(d("100"), TimeSec::new(1)).unwrap();
        r.apply_deposit(d("50.5"), TimeSec::new(2)).unwrap();
        assert_eq!(r.total_deposited, d("150.5"));
        assert_eq!(r.last_updated, TimeSec::new(2));
    }

    #[test]
    fn negative_deposit_never_goes_below_zero() {
        let mut r = record();
        r.apply_deposit(d("10"), TimeSec::new(1)).unwrap();
        r.apply_deposit(d("-25"), TimeSec::new(2)).unwrap();
        assert_eq!(r.total_deposited, Decimal::zero());
    }

    #[test]
    fn partial_withdrawal_is_proportional() {
        let mut r = record();
        r.apply_deposit(d("100"), TimeSec::new(1)).unwrap();
        // Position grew to 120; withdrawing 30 is a quarter of it.
        r.apply_withdrawal(d("30"), d("120"), TimeSec::new(2));
        assert_eq!(r.total_deposited, d("75"));
    }

    #[test]
    fn withdrawal_with_no_value_resets() {
        let mut r = record();
        r.apply_deposit(d("100"), TimeSec::new(1)).unwrap();
        r.apply_withdrawal(d("30"), Decimal::zero(), TimeSec::new(2));
        assert_eq!(r.total_deposited, Decimal::zero());
    }

    #[test]
    fn over_withdrawal_clamps_to_zero() {
        let mut r = record();
        r.apply_deposit(d("100"), TimeSec::new(1)).unwrap();
        r.apply_withdrawal(d("300"), d("120"), TimeSec::new(2));
        assert_eq!(r.total_deposited, Decimal::zero());
    }

    #[test]
    fn arbitrary_sequence_stays_non_negative() {
        let mut r = record();
        let events: [(&str, &str, &str); 6] = [
            ("dep", "10", ""),
            ("wd", "4", "11"),
            ("wd", "50", "7"),
            ("dep", "-3", ""),
            ("wd", "-5", "2"),
            ("dep", "0.01", ""),
        ];
        for (i, (kind, a, b)) in events.iter().enumerate() {
            match *kind {
                "dep" => r.apply_deposit(d(a), TimeSec::new(i as i64)).unwrap(),
                _ => r.apply_withdrawal(d(a), d(b), TimeSec::new(i as i64)),
            }
            assert!(!r.total_deposited.is_negative(), "step {} went negative", i);
        }
    }

    #[test]
    fn deposit_overflow_leaves_record_untouched() {
        let max = "79228162514264337593543950335";
        let mut r = record();
        r.apply_deposit(d(max), TimeSec::new(1)).unwrap();
        assert_eq!(r.apply_deposit(d(max), TimeSec::new(2)), Err(DepositOverflow));
        assert_eq!(r.total_deposited, d(max));
        assert_eq!(r.last_updated, TimeSec::new(1));
    }

    #[test]
    fn withdrawal_far_beyond_value_resets_without_overflow() {
        let mut r = record();
        r.apply_deposit(d("10000000000"), TimeSec::new(1)).unwrap();
        r.apply_withdrawal(d("100000000000000000000"), d("1"), TimeSec::new(2));
        assert_eq!(r.total_deposited, Decimal::zero());

        let mut r = record();
        r.apply_deposit(d("79228162514264337593543950335"), TimeSec::new(1)).unwrap();
        r.apply_withdrawal(d("1"), d("2"), TimeSec::new(2));
        assert!(r.total_deposited.is_positive());
        assert!(r.total_deposited < d("79228162514264337593543950335"));
    }
}
