use std::collections::BTreeMap;

use crate::schemas::{Allocation, Bill, Discount, DiscountSplit, Participant, ParticipantId, Shares};

pub type Balance = BTreeMap<ParticipantId, f64>;

/// Amount owed by every participant across all bills.
///
/// Every participant gets a key, even when no bill mentions them. Degenerate
/// input (empty splits, zero weights, zero totals, ids that are not
/// participants) contributes nothing instead of failing.
pub fn compute_balances(participants: &[Participant], bills: &[Bill]) -> Balance {
    let mut balance = zeroed(participants);
    for bill in bills {
        for (id, amount) in compute_bill_shares(participants, bill) {
            balance
                .entry(id)
                .and_modify(|v| *v += amount)
                .or_insert(amount);
        }
    }
    balance
}

/// What each participant owes for a single bill, discount included.
pub fn compute_bill_shares(participants: &[Participant], bill: &Bill) -> Balance {
    let mut shares = zeroed(participants);

    for split in &bill.splits {
        if !split.amount.is_finite() {
            continue;
        }
        match &split.allocation {
            Allocation::Shares(weights) => add_weighted(&mut shares, weights, split.amount),
            Allocation::Equal(ids) => {
                if ids.is_empty() {
                    continue;
                }
                let amount_per_person = split.amount / ids.len() as f64;
                for id in ids {
                    if let Some(v) = shares.get_mut(id) {
                        *v += amount_per_person;
                    }
                }
            }
        }
    }

    // The unallocated part is shared by everyone, not just the people named
    // in the splits.
    if bill.remaining_amount > 0.0 && bill.remaining_amount.is_finite() && !participants.is_empty()
    {
        let remaining_per_person = bill.remaining_amount / participants.len() as f64;
        for participant in participants {
            if let Some(v) = shares.get_mut(&participant.id) {
                *v += remaining_per_person;
            }
        }
    }

    if let Some(discount) = &bill.discount {
        apply_discount(&mut shares, discount, bill.total);
    }

    shares
}

fn zeroed(participants: &[Participant]) -> Balance {
    participants.iter().map(|p| (p.id, 0.0)).collect()
}

fn add_weighted(shares: &mut Balance, weights: &Shares, amount: f64) {
    let total_weight: u64 = weights.values().map(|w| u64::from(*w)).sum();
    if total_weight == 0 {
        return;
    }
    for (id, weight) in weights {
        if let Some(v) = shares.get_mut(id) {
            *v += amount * f64::from(*weight) / total_weight as f64;
        }
    }
}

// Must run on the scratch map of one bill: the proportional mode weighs the
// discount by each participant's charge on that bill only.
fn apply_discount(shares: &mut Balance, discount: &Discount, bill_total: f64) {
    if !discount.amount.is_finite() {
        return;
    }
    match &discount.split {
        DiscountSplit::Proportional => {
            if bill_total > 0.0 && bill_total.is_finite() {
                for v in shares.values_mut() {
                    *v -= *v / bill_total * discount.amount;
                }
            }
        }
        DiscountSplit::Shares(weights) => add_weighted(shares, weights, -discount.amount),
    }
}
