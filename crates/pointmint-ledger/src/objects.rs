//! The coupon-object store.
//!
//! Registry of every minted [`CouponObject`] plus the unique `jti` index
//! used to look objects up by redemption token. The index admits at most
//! one live token per object; issuing a fresh token drops the stale entry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pointmint_types::{
    Address, CouponObject, CouponState, ObjectId, PointmintError, RedemptionToken, Result,
};

/// All coupon objects, indexed by id and by active redemption token.
pub struct CouponStore {
    /// Every object ever minted (entities are never deleted).
    objects: HashMap<ObjectId, CouponObject>,
    /// Active redemption tokens → object. Unique by construction.
    token_index: HashMap<RedemptionToken, ObjectId>,
}

impl CouponStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            token_index: HashMap::new(),
        }
    }

    /// Insert a freshly minted object.
    pub fn insert(&mut self, object: CouponObject) {
        self.objects.insert(object.id, object);
    }

    /// Look up an object by id.
    ///
    /// # Errors
    /// Returns `ObjectNotFound` if the id is unknown.
    pub fn get(&self, id: ObjectId) -> Result<&CouponObject> {
        self.objects
            .get(&id)
            .ok_or(PointmintError::ObjectNotFound(id))
    }

    /// Mutable lookup by id.
    ///
    /// # Errors
    /// Returns `ObjectNotFound` if the id is unknown.
    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut CouponObject> {
        self.objects
            .get_mut(&id)
            .ok_or(PointmintError::ObjectNotFound(id))
    }

    /// Look up the object carrying `token`.
    ///
    /// # Errors
    /// Returns `TokenNotFound` if no object carries the token.
    pub fn find_by_token(&self, token: &RedemptionToken) -> Result<&CouponObject> {
        let id = self
            .token_index
            .get(token)
            .ok_or(PointmintError::TokenNotFound)?;
        self.objects.get(id).ok_or(PointmintError::TokenNotFound)
    }

    /// Attach a fresh redemption token to an object, dropping any prior
    /// token from the index (one valid token per object at a time).
    ///
    /// # Errors
    /// Returns `ObjectNotFound` if the id is unknown.
    pub fn set_token(
        &mut self,
        id: ObjectId,
        token: RedemptionToken,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let object = self
            .objects
            .get_mut(&id)
            .ok_or(PointmintError::ObjectNotFound(id))?;

        if let Some(stale) = object.jti.take() {
            self.token_index.remove(&stale);
        }
        object.jti = Some(token.clone());
        object.token_expires_at = Some(expires_at);
        self.token_index.insert(token, id);
        Ok(())
    }

    /// Ids of non-terminal objects whose expiry has passed (sweep input).
    #[must_use]
    pub fn expired_live_ids(&self, now: DateTime<Utc>) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|o| !o.state.is_terminal() && o.is_expired(now))
            .map(|o| o.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Sum of redeemable value still live (Created or Trading) for one
    /// supplier. Audit-query input.
    #[must_use]
    pub fn live_value_for(&self, supplier: &Address) -> pointmint_types::Points {
        self.objects
            .values()
            .filter(|o| {
                &o.supplier == supplier
                    && matches!(o.state, CouponState::Created | CouponState::Trading)
            })
            .map(|o| o.remaining)
            .sum()
    }

    /// Number of objects tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate all objects (for audit checks and mirrors).
    pub fn objects(&self) -> impl Iterator<Item = &CouponObject> {
        self.objects.values()
    }
}

impl Default for CouponStore {
    fn default() -> Self {
        Self::new()
    }
}
