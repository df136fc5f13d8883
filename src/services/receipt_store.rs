//! Thread-safe in-memory receipt storage
//!
//! A single `RwLock` guards the id -> record map. Scoring runs before the
//! write lock is taken, so writers only hold it for the insert and readers
//! only for the lookup.

use crate::domain::receipt::{Receipt, ReceiptId};
use crate::services::points;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, warn};

/// A receipt and the points it earned; immutable once stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    receipt: Receipt,
    points: u64,
}

impl ScoreRecord {
    pub fn receipt(&self) -> &Receipt {
        &self.receipt
    }

    pub fn points(&self) -> u64 {
        self.points
    }
}

#[derive(Debug, Default)]
pub struct ReceiptStore {
    records: RwLock<FxHashMap<ReceiptId, ScoreRecord>>,
}

impl ReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score and store a receipt, returning its new identifier
    pub fn submit(&self, receipt: Receipt) -> ReceiptId {
        self.submit_scored(receipt).0
    }

    /// Like `submit`, also returning the points awarded
    pub fn submit_scored(&self, receipt: Receipt) -> (ReceiptId, u64) {
        let breakdown = points::breakdown(&receipt);
        let points = breakdown.total();
        let record = ScoreRecord { receipt, points };

        let mut records = self.records.write();
        loop {
            let id = ReceiptId::generate();
            match records.entry(id) {
                Entry::Vacant(slot) => {
                    let id = slot.key().clone();
                    slot.insert(record);
                    debug!(receipt_id = %id, points = %points, ?breakdown, "receipt_scored");
                    return (id, points);
                }
                Entry::Occupied(slot) => {
                    warn!(receipt_id = %slot.key(), "receipt_id_collision");
                }
            }
        }
    }

    /// Points for a stored receipt, or `None` if the id was never issued
    pub fn lookup(&self, id: &str) -> Option<u64> {
        self.records.read().get(id).map(ScoreRecord::points)
    }

    /// Full record for a stored receipt
    pub fn get(&self, id: &str) -> Option<ScoreRecord> {
        self.records.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
