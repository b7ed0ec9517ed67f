//! Relation linker - set operations over one owner-side relation mapping
//!
//! A [`RelationLinker`] is built from an owner store, a child store and a
//! [`RelationAccess`] implementation naming the mapping inside the owner.
//! Every operation follows the same shape:
//!
//! ```text
//! load owner ──▶ validate + fetch every requested child ──▶ apply_mutation ──▶ persist owner once
//! ```
//!
//! Children are validated before the owner is touched, so a failing id
//! leaves nothing to roll back and nothing is persisted.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::RelationError;
use crate::model::{Aggregate, ChildRef, RelationMap};

use super::events::{EventBus, RelationEvent};
use super::store::AggregateStore;

/// Names the relation mapping a linker manages inside its owner
pub trait RelationAccess: Send + Sync + 'static {
    type Owner: Aggregate;
    type Child: Aggregate;

    /// Relation name, used as the URL segment and the stored relation key
    const NAME: &'static str;

    fn members(owner: &Self::Owner) -> &RelationMap;

    fn members_mut(owner: &mut Self::Owner) -> &mut RelationMap;
}

/// Tunables for linker behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkerPolicy {
    /// Require removed children to still exist in their own store
    pub require_existing_child_on_remove: bool,
}

/// A validated change to one relation mapping
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Upsert these children
    Add(Vec<ChildRef>),
    /// Make these children the whole membership
    Replace(Vec<ChildRef>),
    /// Drop these ids if present
    Remove(BTreeSet<Uuid>),
}

/// Compute the owner value after a mutation of relation `R`
pub fn apply_mutation<R: RelationAccess>(mut owner: R::Owner, mutation: Mutation) -> R::Owner {
    let members = R::members_mut(&mut owner);
    match mutation {
        Mutation::Add(children) => {
            for child in children {
                members.insert(child.id, child);
            }
        }
        Mutation::Replace(children) => {
            *members = children.into_iter().map(|child| (child.id, child)).collect();
        }
        Mutation::Remove(ids) => {
            members.retain(|id, _| !ids.contains(id));
        }
    }
    owner
}

/// Generic get/add/replace/remove over relation `R`
pub struct RelationLinker<R, O, C> {
    owners: Arc<O>,
    children: Arc<C>,
    policy: LinkerPolicy,
    events: Option<Arc<EventBus>>,
    _relation: PhantomData<fn() -> R>,
}

impl<R, O, C> RelationLinker<R, O, C>
where
    R: RelationAccess,
    O: AggregateStore<Entity = R::Owner>,
    C: AggregateStore<Entity = R::Child>,
{
    pub fn new(owners: Arc<O>, children: Arc<C>) -> Self {
        Self {
            owners,
            children,
            policy: LinkerPolicy::default(),
            events: None,
            _relation: PhantomData,
        }
    }

    pub fn with_policy(mut self, policy: LinkerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Emit a [`RelationEvent`] after every committed mutation
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn relation(&self) -> &'static str {
        R::NAME
    }

    /// Ids of all children currently linked to the owner
    pub fn get(&self, owner_id: Uuid) -> Result<BTreeSet<Uuid>, RelationError> {
        let owner = self.owners.get(owner_id)?;
        Ok(R::members(&owner).keys().copied().collect())
    }

    /// Link children to the owner. Already linked children get a fresh reference.
    pub fn add(&self, owner_id: Uuid, ids: &BTreeSet<Uuid>) -> Result<(), RelationError> {
        let owner = self.owners.get(owner_id)?;
        let children = self.fetch_children(owner_id, ids)?;

        let owner = self.commit(owner, Mutation::Add(children))?;

        let total = R::members(&owner).len();
        info!(owner = %owner_id, relation = R::NAME, added = ids.len(), total, "Linked children");
        self.emit(RelationEvent::MembersAdded {
            owner_kind: <R::Owner as Aggregate>::KIND,
            owner_id,
            relation: R::NAME,
            added: ids.len(),
            total,
        });
        Ok(())
    }

    /// Make `ids` the exact membership of the relation
    pub fn replace(&self, owner_id: Uuid, ids: &BTreeSet<Uuid>) -> Result<(), RelationError> {
        let owner = self.owners.get(owner_id)?;
        let children = self.fetch_children(owner_id, ids)?;

        let owner = self.commit(owner, Mutation::Replace(children))?;

        let total = R::members(&owner).len();
        info!(owner = %owner_id, relation = R::NAME, total, "Replaced children");
        self.emit(RelationEvent::MembersReplaced {
            owner_kind: <R::Owner as Aggregate>::KIND,
            owner_id,
            relation: R::NAME,
            total,
        });
        Ok(())
    }

    /// Unlink children from the owner. Ids that are not linked are ignored.
    pub fn remove(&self, owner_id: Uuid, ids: &BTreeSet<Uuid>) -> Result<(), RelationError> {
        let owner = self.owners.get(owner_id)?;
        if self.policy.require_existing_child_on_remove {
            for id in ids {
                self.require_child(owner_id, *id)?;
            }
        }

        let before = R::members(&owner).len();
        let owner = self.commit(owner, Mutation::Remove(ids.clone()))?;

        let total = R::members(&owner).len();
        info!(owner = %owner_id, relation = R::NAME, removed = before - total, total, "Unlinked children");
        self.emit(RelationEvent::MembersRemoved {
            owner_kind: <R::Owner as Aggregate>::KIND,
            owner_id,
            relation: R::NAME,
            removed: before - total,
            total,
        });
        Ok(())
    }

    /// Validate and load every requested child before any mutation
    fn fetch_children(
        &self,
        owner_id: Uuid,
        ids: &BTreeSet<Uuid>,
    ) -> Result<Vec<ChildRef>, RelationError> {
        let mut children = Vec::with_capacity(ids.len());
        for id in ids {
            self.require_child(owner_id, *id)?;
            let child = self.children.get(*id).map_err(|e| match e {
                // Deleted between the existence check and the load
                RelationError::NotFound(_) => missing_child::<R>(*id),
                other => other,
            })?;
            children.push(ChildRef::capture(&child));
        }
        Ok(children)
    }

    fn require_child(&self, owner_id: Uuid, id: Uuid) -> Result<(), RelationError> {
        if self.children.does_exist(id)? {
            return Ok(());
        }
        warn!(owner = %owner_id, relation = R::NAME, child = %id, "Rejected missing child");
        Err(missing_child::<R>(id))
    }

    fn commit(&self, owner: R::Owner, mutation: Mutation) -> Result<R::Owner, RelationError> {
        debug!(owner = %owner.id(), relation = R::NAME, mutation = ?mutation, "Applying mutation");
        let owner = apply_mutation::<R>(owner, mutation);
        self.owners.persist(owner)
    }

    fn emit(&self, event: RelationEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}

fn missing_child<R: RelationAccess>(id: Uuid) -> RelationError {
    RelationError::Validation(format!(
        "{} '{}' must exist to be linked as {}",
        <R::Child as Aggregate>::KIND,
        id,
        R::NAME
    ))
}
