use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::schemas::{unallocated, Allocation, Bill, BillId, Discount, DiscountSplit, Shares, Split};

/// Slack allowed when comparing a split against the unallocated amount, so
/// that e.g. 3.3 + 3.3 + 3.4 still fits a total of 10.
pub const AMOUNT_TOLERANCE: f64 = 1e-9;

/// A bill being assembled. Every split and discount is checked when it is
/// added, so `build` cannot fail.
#[derive(Clone, Debug, PartialEq)]
pub struct BillDraft {
    id: Option<BillId>,
    created_at: Option<DateTime<Utc>>,
    total: f64,
    splits: Vec<Split>,
    description: Option<String>,
    discount: Option<Discount>,
}

impl BillDraft {
    pub fn new(total: f64) -> Result<Self, ValidationError> {
        validate_total(total)?;
        Ok(BillDraft {
            id: None,
            created_at: None,
            total,
            splits: Vec::new(),
            description: None,
            discount: None,
        })
    }

    /// Re-opens a stored bill for editing, keeping its id and creation time.
    pub fn from_bill(bill: &Bill) -> Self {
        BillDraft {
            id: Some(bill.id.clone()),
            created_at: Some(bill.created_at),
            total: bill.total,
            splits: bill.splits.clone(),
            description: bill.description.clone(),
            discount: bill.discount.clone(),
        }
    }

    /// Checks a finished bill. Each split is checked on its own, not against
    /// the total.
    pub fn validate(bill: &Bill) -> Result<Self, ValidationError> {
        validate_total(bill.total)?;
        for split in &bill.splits {
            validate_split_amount(split.amount)?;
            validate_allocation(&split.allocation)?;
        }
        if let Some(discount) = &bill.discount {
            validate_discount(discount)?;
        }
        let mut draft = BillDraft::from_bill(bill);
        if let Some(description) = &bill.description {
            draft.set_description(description);
        }
        Ok(draft)
    }

    pub fn with_id(mut self, id: impl Into<BillId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn remaining(&self) -> f64 {
        unallocated(self.total, &self.splits)
    }

    /// Changing the total never drops splits; a total below the allocated
    /// amount leaves nothing remaining.
    pub fn set_total(&mut self, total: f64) -> Result<(), ValidationError> {
        validate_total(total)?;
        self.total = total;
        Ok(())
    }

    pub fn add_split(&mut self, split: Split) -> Result<(), ValidationError> {
        validate_split(&split, self.remaining())?;
        self.splits.push(split);
        Ok(())
    }

    pub fn remove_split(&mut self, index: usize) -> Option<Split> {
        (index < self.splits.len()).then(|| self.splits.remove(index))
    }

    pub fn set_discount(&mut self, discount: Discount) -> Result<(), ValidationError> {
        validate_discount(&discount)?;
        self.discount = Some(discount);
        Ok(())
    }

    pub fn clear_discount(&mut self) -> Option<Discount> {
        self.discount.take()
    }

    pub fn set_description(&mut self, description: &str) {
        let description = description.trim();
        self.description = (!description.is_empty()).then(|| description.to_string());
    }

    pub fn build(self) -> Bill {
        self.build_at(Utc::now())
    }

    pub fn build_at(self, now: DateTime<Utc>) -> Bill {
        let remaining_amount = self.remaining();
        Bill {
            id: self
                .id
                .unwrap_or_else(|| now.timestamp_millis().to_string()),
            total: self.total,
            splits: self.splits,
            remaining_amount,
            description: self.description,
            discount: self.discount,
            created_at: self.created_at.unwrap_or(now),
        }
    }
}

fn validate_total(total: f64) -> Result<(), ValidationError> {
    if total.is_finite() && total > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositiveTotal(total))
    }
}

pub fn validate_split(split: &Split, remaining: f64) -> Result<(), ValidationError> {
    validate_split_amount(split.amount)?;
    if split.amount > remaining + AMOUNT_TOLERANCE {
        return Err(ValidationError::SplitExceedsRemaining {
            amount: split.amount,
            remaining,
        });
    }
    validate_allocation(&split.allocation)
}

fn validate_split_amount(amount: f64) -> Result<(), ValidationError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositiveSplit(amount))
    }
}

fn validate_allocation(allocation: &Allocation) -> Result<(), ValidationError> {
    match allocation {
        Allocation::Equal(ids) if ids.is_empty() => Err(ValidationError::NoParticipants),
        Allocation::Equal(ids) => {
            let mut seen = BTreeSet::new();
            match ids.iter().find(|id| !seen.insert(**id)) {
                Some(id) => Err(ValidationError::RepeatedParticipant(*id)),
                None => Ok(()),
            }
        }
        Allocation::Shares(shares) => require_positive_shares(shares),
    }
}

pub fn validate_discount(discount: &Discount) -> Result<(), ValidationError> {
    if !(discount.amount.is_finite() && discount.amount > 0.0) {
        return Err(ValidationError::NonPositiveDiscount(discount.amount));
    }
    match &discount.split {
        DiscountSplit::Proportional => Ok(()),
        DiscountSplit::Shares(shares) => require_positive_shares(shares),
    }
}

fn require_positive_shares(shares: &Shares) -> Result<(), ValidationError> {
    if shares.is_empty() {
        return Err(ValidationError::NoPositiveShare);
    }
    match shares.iter().find(|(_, weight)| **weight == 0) {
        Some((id, _)) => Err(ValidationError::ZeroShare(*id)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_non_positive_total() {
        assert_eq!(
            BillDraft::new(0.0),
            Err(ValidationError::NonPositiveTotal(0.0))
        );
        assert!(BillDraft::new(-5.0).is_err());
        assert!(BillDraft::new(f64::NAN).is_err());
    }

    #[test]
    fn remaining_shrinks_as_splits_are_added() {
        let mut draft = BillDraft::new(100.0).unwrap();
        draft.add_split(Split::equal(40.0, [0, 1])).unwrap();
        draft.add_split(Split::weighted(35.0, [(0, 1)])).unwrap();
        assert_eq!(draft.remaining(), 25.0);
        assert_eq!(draft.splits.len(), 2);
    }

    #[test]
    fn split_may_not_exceed_remaining() {
        let mut draft = BillDraft::new(50.0).unwrap();
        draft.add_split(Split::equal(30.0, [0])).unwrap();
        assert_eq!(
            draft.add_split(Split::equal(25.0, [1])),
            Err(ValidationError::SplitExceedsRemaining {
                amount: 25.0,
                remaining: 20.0
            })
        );
        assert_eq!(draft.splits.len(), 1);
    }

    #[test]
    fn split_may_use_exact_remaining() {
        let mut draft = BillDraft::new(10.0).unwrap();
        draft.add_split(Split::equal(3.3, [0])).unwrap();
        draft.add_split(Split::equal(3.3, [1])).unwrap();
        draft.add_split(Split::equal(3.4, [2])).unwrap();
        assert!(draft.remaining() < AMOUNT_TOLERANCE);
    }

    #[test]
    fn split_needs_recipients() {
        let mut draft = BillDraft::new(50.0).unwrap();
        assert_eq!(
            draft.add_split(Split::equal(10.0, [])),
            Err(ValidationError::NoParticipants)
        );
        assert_eq!(
            draft.add_split(Split::weighted(10.0, [])),
            Err(ValidationError::NoPositiveShare)
        );
        assert_eq!(
            draft.add_split(Split::weighted(10.0, [(0, 0)])),
            Err(ValidationError::ZeroShare(0))
        );
        assert_eq!(
            draft.add_split(Split::weighted(10.0, [(0, 1), (1, 0)])),
            Err(ValidationError::ZeroShare(1))
        );
        assert_eq!(
            draft.add_split(Split::equal(10.0, [0, 1, 1])),
            Err(ValidationError::RepeatedParticipant(1))
        );
        assert_eq!(
            draft.add_split(Split::equal(0.0, [1])),
            Err(ValidationError::NonPositiveSplit(0.0))
        );
        assert!(draft.splits.is_empty());
    }

    #[test]
    fn discount_checks() {
        let mut draft = BillDraft::new(50.0).unwrap();
        assert_eq!(
            draft.set_discount(Discount::proportional(-1.0)),
            Err(ValidationError::NonPositiveDiscount(-1.0))
        );
        assert_eq!(
            draft.set_discount(Discount::weighted(5.0, [])),
            Err(ValidationError::NoPositiveShare)
        );
        assert_eq!(
            draft.set_discount(Discount::weighted(5.0, [(0, 3), (2, 0)])),
            Err(ValidationError::ZeroShare(2))
        );
        draft.set_discount(Discount::weighted(5.0, [(1, 2)])).unwrap();
        assert_eq!(draft.clear_discount(), Some(Discount::weighted(5.0, [(1, 2)])));
        assert_eq!(draft.discount, None);
    }

    #[test]
    fn remove_split_frees_amount() {
        let mut draft = BillDraft::new(20.0).unwrap();
        draft.add_split(Split::equal(20.0, [0])).unwrap();
        assert_eq!(draft.remove_split(3), None);
        assert_eq!(draft.remove_split(0), Some(Split::equal(20.0, [0])));
        assert_eq!(draft.remaining(), 20.0);
    }

    #[test]
    fn build_derives_remaining_and_stamps() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let mut draft = BillDraft::new(80.0).unwrap();
        draft.add_split(Split::equal(30.0, [0])).unwrap();
        draft.set_description("  dinner ");
        let bill = draft.build_at(now);
        assert_eq!(bill.id, now.timestamp_millis().to_string());
        assert_eq!(bill.created_at, now);
        assert_eq!(bill.remaining_amount, 50.0);
        assert_eq!(bill.description.as_deref(), Some("dinner"));
    }

    #[test]
    fn editing_keeps_identity() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let original = BillDraft::new(30.0)
            .unwrap()
            .with_id("dinner")
            .build_at(created);

        let mut draft = BillDraft::from_bill(&original);
        draft.set_total(45.0).unwrap();
        draft.set_description("   ");
        let edited = draft.build_at(created + chrono::Duration::days(1));

        assert_eq!(edited.id, "dinner");
        assert_eq!(edited.created_at, created);
        assert_eq!(edited.remaining_amount, 45.0);
        assert_eq!(edited.description, None);
    }

    #[test]
    fn lowering_total_clamps_remaining() {
        let mut draft = BillDraft::new(30.0).unwrap();
        draft.add_split(Split::equal(30.0, [0])).unwrap();
        draft.set_total(20.0).unwrap();
        assert_eq!(draft.remaining(), 0.0);
    }

    #[test]
    fn validate_checks_each_split() {
        let mut draft = BillDraft::new(30.0).unwrap();
        draft.add_split(Split::equal(30.0, [0])).unwrap();
        let mut bill = draft.build();
        assert!(BillDraft::validate(&bill).is_ok());

        bill.splits.push(Split::equal(5.0, []));
        assert_eq!(
            BillDraft::validate(&bill),
            Err(ValidationError::NoParticipants)
        );

        bill.splits.pop();
        bill.discount = Some(Discount::weighted(2.0, [(0, 0)]));
        assert_eq!(
            BillDraft::validate(&bill),
            Err(ValidationError::ZeroShare(0))
        );
    }

    #[test]
    fn validate_accepts_total_below_allocated() {
        let mut draft = BillDraft::new(30.0).unwrap();
        draft.add_split(Split::equal(30.0, [0])).unwrap();
        let mut bill = draft.build();
        bill.total = 20.0;

        let checked = BillDraft::validate(&bill).unwrap();
        assert_eq!(checked.remaining(), 0.0);
        assert_eq!(checked.splits.len(), 1);

        bill.total = 0.0;
        assert_eq!(
            BillDraft::validate(&bill),
            Err(ValidationError::NonPositiveTotal(0.0))
        );
    }
}
