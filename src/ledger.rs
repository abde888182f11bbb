use std::collections::HashSet;

use tracing::debug;

use crate::balance::{compute_balances, compute_bill_shares, Balance};
use crate::builder::BillDraft;
use crate::error::{LedgerError, ValidationError};
use crate::schemas::{Bill, BillId, Participant, ParticipantId, Snapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// The participant and bill lists of one group, changed only through the
/// methods below. Balances are recomputed from scratch on request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ledger {
    participants: Vec<Participant>,
    bills: Vec<Bill>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads exported state. Only id uniqueness is checked; older data with
    /// out-of-date splits is kept and absorbed by the balance computation.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, LedgerError> {
        let mut seen = HashSet::new();
        for participant in &snapshot.participants {
            if !seen.insert(participant.id) {
                return Err(LedgerError::DuplicateParticipant(participant.id));
            }
        }
        let mut seen = HashSet::new();
        for bill in &snapshot.bills {
            if !seen.insert(bill.id.as_str()) {
                return Err(LedgerError::DuplicateBill(bill.id.clone()));
            }
        }
        Ok(Ledger {
            participants: snapshot.participants,
            bills: snapshot.bills,
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            participants: self.participants.clone(),
            bills: self.bills.clone(),
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn bills(&self) -> &[Bill] {
        &self.bills
    }

    pub fn bill(&self, id: &str) -> Option<&Bill> {
        self.bills.iter().find(|bill| bill.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.bills.is_empty()
    }

    pub fn add_participant(&mut self, name: &str) -> Result<Participant, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let id = self
            .participants
            .iter()
            .map(|p| p.id)
            .max()
            .map_or(0, |max| max + 1);
        let participant = Participant {
            id,
            name: name.to_string(),
        };
        self.participants.push(participant.clone());
        debug!(id, name, "participant added");
        Ok(participant)
    }

    /// Removes the participant and every reference to them in the bills.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Result<Participant, LedgerError> {
        let index = self
            .participants
            .iter()
            .position(|p| p.id == id)
            .ok_or(LedgerError::ParticipantNotFound(id))?;
        let removed = self.participants.remove(index);

        let mut touched = 0;
        for bill in &mut self.bills {
            if bill.forget_participant(id) {
                touched += 1;
            }
        }
        debug!(id, bills = touched, "participant removed");
        Ok(removed)
    }

    /// Inserts or replaces a bill by id. Its remaining amount is re-derived
    /// and an edit keeps the original creation time.
    pub fn save_bill(&mut self, bill: Bill) -> Result<SaveOutcome, LedgerError> {
        let draft = BillDraft::validate(&bill)?;
        if let Some(participant) = bill
            .referenced_participants()
            .into_iter()
            .find(|id| !self.participants.iter().any(|p| p.id == *id))
        {
            return Err(LedgerError::UnknownParticipant {
                bill: bill.id,
                participant,
            });
        }

        let mut bill = draft.build_at(bill.created_at);
        match self.bills.iter_mut().find(|b| b.id == bill.id) {
            Some(existing) => {
                bill.created_at = existing.created_at;
                *existing = bill;
                debug!(id = %existing.id, "bill updated");
                Ok(SaveOutcome::Updated)
            }
            None => {
                debug!(id = %bill.id, "bill added");
                self.bills.push(bill);
                Ok(SaveOutcome::Created)
            }
        }
    }

    pub fn remove_bill(&mut self, id: &str) -> Result<Bill, LedgerError> {
        let index = self
            .bills
            .iter()
            .position(|bill| bill.id == id)
            .ok_or_else(|| LedgerError::BillNotFound(BillId::from(id)))?;
        debug!(id, "bill removed");
        Ok(self.bills.remove(index))
    }

    pub fn clear(&mut self) {
        self.participants.clear();
        self.bills.clear();
    }

    pub fn balances(&self) -> Balance {
        compute_balances(&self.participants, &self.bills)
    }

    pub fn bill_breakdown(&self, id: &str) -> Result<Balance, LedgerError> {
        let bill = self
            .bill(id)
            .ok_or_else(|| LedgerError::BillNotFound(BillId::from(id)))?;
        Ok(compute_bill_shares(&self.participants, bill))
    }
}
