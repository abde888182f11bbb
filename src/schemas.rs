use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ParticipantId = u64;
pub type BillId = String;

pub type Shares = BTreeMap<ParticipantId, u32>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Allocation {
    Equal(Vec<ParticipantId>),
    Shares(Shares),
}

impl Allocation {
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        match self {
            Allocation::Equal(ids) => ids.clone(),
            Allocation::Shares(shares) => shares.keys().copied().collect(),
        }
    }

    /// False once nobody is left to pay, including shares whose weights are all zero.
    pub fn has_payers(&self) -> bool {
        match self {
            Allocation::Equal(ids) => !ids.is_empty(),
            Allocation::Shares(shares) => has_weight(shares),
        }
    }

    fn forget(&mut self, id: ParticipantId) -> bool {
        match self {
            Allocation::Equal(ids) => {
                let before = ids.len();
                ids.retain(|p| *p != id);
                ids.len() != before
            }
            Allocation::Shares(shares) => shares.remove(&id).is_some(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(from = "SplitRecord", into = "SplitRecord")]
pub struct Split {
    pub amount: f64,
    pub allocation: Allocation,
    pub description: Option<String>,
}

impl Split {
    pub fn equal(amount: f64, participant_ids: impl IntoIterator<Item = ParticipantId>) -> Self {
        Split {
            amount,
            allocation: Allocation::Equal(participant_ids.into_iter().collect()),
            description: None,
        }
    }

    pub fn weighted(
        amount: f64,
        shares: impl IntoIterator<Item = (ParticipantId, u32)>,
    ) -> Self {
        Split {
            amount,
            allocation: Allocation::Shares(shares.into_iter().collect()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// Storage layout of a split: weighted mode is signalled by the presence of
// `shares`, `participantIds` is always written so older readers keep working.
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct SplitRecord {
    amount: f64,
    #[serde(default)]
    participant_ids: Vec<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shares: Option<Shares>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl From<SplitRecord> for Split {
    fn from(record: SplitRecord) -> Self {
        let allocation = match record.shares {
            Some(shares) => Allocation::Shares(shares),
            None => Allocation::Equal(record.participant_ids),
        };
        Split {
            amount: record.amount,
            allocation,
            description: record.description,
        }
    }
}

impl From<Split> for SplitRecord {
    fn from(split: Split) -> Self {
        let participant_ids = split.allocation.participant_ids();
        let shares = match split.allocation {
            Allocation::Shares(shares) => Some(shares),
            Allocation::Equal(_) => None,
        };
        SplitRecord {
            amount: split.amount,
            participant_ids,
            shares,
            description: split.description,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DiscountSplit {
    Proportional,
    Shares(Shares),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(from = "DiscountRecord", into = "DiscountRecord")]
pub struct Discount {
    pub amount: f64,
    pub split: DiscountSplit,
}

impl Discount {
    pub fn proportional(amount: f64) -> Self {
        Discount {
            amount,
            split: DiscountSplit::Proportional,
        }
    }

    pub fn weighted(amount: f64, shares: impl IntoIterator<Item = (ParticipantId, u32)>) -> Self {
        Discount {
            amount,
            split: DiscountSplit::Shares(shares.into_iter().collect()),
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum DiscountSplitType {
    Proportional,
    Shares,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscountRecord {
    amount: f64,
    split_type: DiscountSplitType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shares: Option<Shares>,
}

impl From<DiscountRecord> for Discount {
    fn from(record: DiscountRecord) -> Self {
        let split = match record.split_type {
            DiscountSplitType::Proportional => DiscountSplit::Proportional,
            DiscountSplitType::Shares => DiscountSplit::Shares(record.shares.unwrap_or_default()),
        };
        Discount {
            amount: record.amount,
            split,
        }
    }
}

impl From<Discount> for DiscountRecord {
    fn from(discount: Discount) -> Self {
        let (split_type, shares) = match discount.split {
            DiscountSplit::Proportional => (DiscountSplitType::Proportional, None),
            DiscountSplit::Shares(shares) => (DiscountSplitType::Shares, Some(shares)),
        };
        DiscountRecord {
            amount: discount.amount,
            split_type,
            shares,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: BillId,
    pub total: f64,
    pub splits: Vec<Split>,
    pub remaining_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Discount>,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    pub fn allocated(&self) -> f64 {
        allocated(&self.splits)
    }

    /// Every participant id the bill mentions, in first-seen order.
    pub fn referenced_participants(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<ParticipantId> = Vec::new();
        let from_splits = self
            .splits
            .iter()
            .flat_map(|split| split.allocation.participant_ids());
        let from_discount = match &self.discount {
            Some(Discount {
                split: DiscountSplit::Shares(shares),
                ..
            }) => shares.keys().copied().collect(),
            _ => Vec::new(),
        };
        for id in from_splits.chain(from_discount) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Drops `id` from every split and from the discount weights. Splits and
    /// weighted discounts left without a payer are removed, and the remaining
    /// amount is re-derived. Returns true when the bill changed.
    pub fn forget_participant(&mut self, id: ParticipantId) -> bool {
        let mut changed = false;
        self.splits.retain_mut(|split| {
            let forgotten = split.allocation.forget(id);
            changed |= forgotten;
            !forgotten || split.allocation.has_payers()
        });

        let mut drop_discount = false;
        if let Some(Discount {
            split: DiscountSplit::Shares(shares),
            ..
        }) = &mut self.discount
        {
            if shares.remove(&id).is_some() {
                changed = true;
                drop_discount = !has_weight(shares);
            }
        }
        if drop_discount {
            self.discount = None;
        }

        if changed {
            self.remaining_amount = unallocated(self.total, &self.splits);
        }
        changed
    }
}

fn has_weight(shares: &Shares) -> bool {
    shares.values().any(|weight| *weight > 0)
}

pub fn allocated(splits: &[Split]) -> f64 {
    splits.iter().map(|split| split.amount).sum()
}

pub fn unallocated(total: f64, splits: &[Split]) -> f64 {
    (total - allocated(splits)).max(0.0)
}

/// Full exported state, in the layout the browser keeps in its own storage.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub bills: Vec<Bill>,
}
