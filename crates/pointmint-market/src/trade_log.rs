//! The append-only trade audit log.
//!
//! Every settled trade appends exactly one row; rows are never updated or
//! deleted. The unique `idempotency_key` constraint on append is the
//! at-most-once guarantee for retried buy requests — a duplicate key is
//! rejected before the engine mutates anything.

use std::collections::HashMap;

use pointmint_types::{ObjectId, PointmintError, Result, TradeRecord};

/// Append-only trade rows with a unique idempotency-key constraint.
pub struct TradeLog {
    /// All rows, in settlement order.
    records: Vec<TradeRecord>,
    /// Idempotency key → row position.
    by_key: HashMap<String, usize>,
}

impl TradeLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    /// Whether a row with this idempotency key exists.
    #[must_use]
    pub fn contains_key(&self, idempotency_key: &str) -> bool {
        self.by_key.contains_key(idempotency_key)
    }

    /// Append a settled trade row.
    ///
    /// # Errors
    /// Returns [`PointmintError::DuplicateTransaction`] if a row with the
    /// same idempotency key already exists; the log is unchanged.
    pub fn append(&mut self, record: TradeRecord) -> Result<()> {
        if self.by_key.contains_key(&record.idempotency_key) {
            return Err(PointmintError::DuplicateTransaction {
                key: record.idempotency_key.clone(),
            });
        }
        self.by_key
            .insert(record.idempotency_key.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// The row written under this idempotency key, if any.
    #[must_use]
    pub fn get(&self, idempotency_key: &str) -> Option<&TradeRecord> {
        self.by_key
            .get(idempotency_key)
            .and_then(|&i| self.records.get(i))
    }

    /// Ownership-change history of one object, in settlement order.
    #[must_use]
    pub fn by_object(&self, object_id: ObjectId) -> Vec<&TradeRecord> {
        self.records
            .iter()
            .filter(|r| r.object_id == object_id)
            .collect()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate all rows in settlement order.
    pub fn records(&self) -> impl Iterator<Item = &TradeRecord> {
        self.records.iter()
    }
}

impl Default for TradeLog {
    fn default() -> Self {
        Self::new()
    }
}
