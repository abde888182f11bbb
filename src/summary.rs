use serde::Serialize;

use crate::balance::Balance;
use crate::schemas::{Bill, BillId, Participant, ParticipantId};

pub const RECENT_BILLS: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub participant_id: ParticipantId,
    pub name: String,
    pub amount: f64,
    /// Zero when the group total is not positive.
    pub percentage: f64,
    pub rank: usize,
    pub delta_from_average: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentBill {
    pub id: BillId,
    pub number: usize,
    pub total: f64,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: f64,
    pub average: f64,
    pub participant_count: usize,
    pub bill_count: usize,
    pub entries: Vec<SummaryEntry>,
    pub recent_bills: Vec<RecentBill>,
}

impl Summary {
    pub fn from_balance(participants: &[Participant], balance: &Balance, bills: &[Bill]) -> Self {
        let amount_of = |id: ParticipantId| balance.get(&id).copied().unwrap_or(0.0);

        let total: f64 = participants.iter().map(|p| amount_of(p.id)).sum();
        let average = if participants.is_empty() {
            0.0
        } else {
            total / participants.len() as f64
        };

        let mut sorted: Vec<&Participant> = participants.iter().collect();
        sorted.sort_by(|a, b| {
            amount_of(b.id)
                .total_cmp(&amount_of(a.id))
                .then(a.id.cmp(&b.id))
        });

        let entries = sorted
            .into_iter()
            .enumerate()
            .map(|(index, participant)| {
                let amount = amount_of(participant.id);
                SummaryEntry {
                    participant_id: participant.id,
                    name: participant.name.clone(),
                    amount,
                    percentage: if total > 0.0 {
                        amount / total * 100.0
                    } else {
                        0.0
                    },
                    rank: index + 1,
                    delta_from_average: amount - average,
                }
            })
            .collect();

        let recent_bills = bills
            .iter()
            .enumerate()
            .rev()
            .take(RECENT_BILLS)
            .map(|(index, bill)| RecentBill {
                id: bill.id.clone(),
                number: index + 1,
                total: bill.total,
                description: bill.description.clone(),
            })
            .collect();

        Summary {
            total,
            average,
            participant_count: participants.len(),
            bill_count: bills.len(),
            entries,
            recent_bills,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BillDraft;

    fn participant(id: ParticipantId, name: &str) -> Participant {
        Participant {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn entries_sorted_with_percentages() {
        let participants = [participant(0, "A"), participant(1, "B"), participant(2, "C")];
        let balance = Balance::from([(0, 20.0), (1, 50.0), (2, 30.0)]);
        let summary = Summary::from_balance(&participants, &balance, &[]);

        assert_eq!(summary.total, 100.0);
        let order: Vec<_> = summary.entries.iter().map(|e| e.participant_id).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(summary.entries[0].rank, 1);
        assert_eq!(summary.entries[0].percentage, 50.0);
        assert!((summary.average - 100.0 / 3.0).abs() < 1e-9);
        assert!(summary.entries[2].delta_from_average < 0.0);
    }

    #[test]
    fn ties_keep_id_order() {
        let participants = [participant(3, "D"), participant(1, "B")];
        let balance = Balance::from([(1, 10.0), (3, 10.0)]);
        let summary = Summary::from_balance(&participants, &balance, &[]);
        assert_eq!(summary.entries[0].participant_id, 1);
        assert_eq!(summary.entries[1].participant_id, 3);
    }

    #[test]
    fn empty_group() {
        let summary = Summary::from_balance(&[], &Balance::new(), &[]);
        assert_eq!(summary.total, 0.0);
        assert_eq!(summary.average, 0.0);
        assert!(summary.entries.is_empty());
    }

    #[test]
    fn missing_balance_counts_as_zero() {
        let participants = [participant(0, "A")];
        let summary = Summary::from_balance(&participants, &Balance::new(), &[]);
        assert_eq!(summary.entries[0].amount, 0.0);
        assert_eq!(summary.entries[0].percentage, 0.0);
    }

    #[test]
    fn lists_latest_bills_first() {
        let bills: Vec<Bill> = (1..=5)
            .map(|n| {
                BillDraft::new(n as f64 * 10.0)
                    .unwrap()
                    .with_id(format!("b{n}"))
                    .build()
            })
            .collect();
        let summary = Summary::from_balance(&[], &Balance::new(), &bills);
        let ids: Vec<_> = summary.recent_bills.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b5", "b4", "b3"]);
        assert_eq!(summary.recent_bills[0].number, 5);
        assert_eq!(summary.bill_count, 5);
    }
}
