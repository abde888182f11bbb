//! Bill splitting for a small group: participants, itemised bills with
//! equal or weighted splits and discounts, and the per-participant amount
//! owed derived from them.
//!
//! [`balance::compute_balances`] is the settlement calculation. It is a pure
//! function over a snapshot of participants and bills. [`ledger::Ledger`]
//! holds those collections and [`api`] serves them over HTTP.

pub mod api;
pub mod balance;
pub mod builder;
pub mod config;
pub mod error;
pub mod ledger;
pub mod schemas;
pub mod summary;

pub use balance::{compute_balances, compute_bill_shares, Balance};
pub use builder::BillDraft;
pub use error::{ApiError, LedgerError, ValidationError};
pub use ledger::{Ledger, SaveOutcome};
pub use schemas::{Allocation, Bill, Discount, DiscountSplit, Participant, Snapshot, Split};
