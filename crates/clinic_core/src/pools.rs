//! Bounded-capacity resource pools with FIFO granting.
//!
//! Every staff group, room and machine in the clinic is a [ResourcePool]. A
//! request either takes a free unit immediately or joins the pool's queue; a
//! release hands the freed unit straight to the oldest queued request.

use std::collections::{HashSet, VecDeque};

use bevy_ecs::prelude::{Entity, Resource};
use serde::{Deserialize, Serialize};

/// Identifies one unit request; used to release the unit later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolId {
    CheckinStaff,
    PublicWaitRoom,
    ConsentStaff,
    ChangeRoom,
    GownedWaitRoom,
    Scanner,
    UsMachine,
    Radiologist,
    SameVisitRadiologist,
}

impl PoolId {
    pub const ALL: [PoolId; 9] = [
        PoolId::CheckinStaff,
        PoolId::PublicWaitRoom,
        PoolId::ConsentStaff,
        PoolId::ChangeRoom,
        PoolId::GownedWaitRoom,
        PoolId::Scanner,
        PoolId::UsMachine,
        PoolId::Radiologist,
        PoolId::SameVisitRadiologist,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PoolId::CheckinStaff => "checkin_staff",
            PoolId::PublicWaitRoom => "public_wait_room",
            PoolId::ConsentStaff => "consent_staff",
            PoolId::ChangeRoom => "change_room",
            PoolId::GownedWaitRoom => "gowned_wait_room",
            PoolId::Scanner => "scanner",
            PoolId::UsMachine => "us_machine",
            PoolId::Radiologist => "radiologist",
            PoolId::SameVisitRadiologist => "same_visit_radiologist",
        }
    }
}

/// Outcome of a unit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Granted(Ticket),
    Queued(Ticket),
}

impl Request {
    pub fn ticket(self) -> Ticket {
        match self {
            Request::Granted(t) | Request::Queued(t) => t,
        }
    }

    pub fn is_granted(self) -> bool {
        matches!(self, Request::Granted(_))
    }
}

/// A queued request that was just handed a unit by a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub pool: PoolId,
    pub ticket: Ticket,
    pub owner: Entity,
}

#[derive(Debug, Clone)]
pub struct ResourcePool {
    capacity: u32,
    holders: HashSet<Ticket>,
    queue: VecDeque<(Ticket, Entity)>,
}

impl ResourcePool {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            holders: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn in_use(&self) -> u32 {
        self.holders.len() as u32
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn has_free_unit(&self) -> bool {
        self.in_use() < self.capacity
    }
}

/// All clinic pools plus the shared ticket counter.
#[derive(Debug, Clone, Resource)]
pub struct ClinicPools {
    pools: Vec<ResourcePool>,
    next_ticket: u64,
}

impl ClinicPools {
    pub fn new(capacities: impl Fn(PoolId) -> u32) -> Self {
        Self {
            pools: PoolId::ALL
                .iter()
                .map(|id| ResourcePool::new(capacities(*id)))
                .collect(),
            next_ticket: 1,
        }
    }

    pub fn pool(&self, id: PoolId) -> &ResourcePool {
        &self.pools[id.index()]
    }

    pub fn in_use(&self, id: PoolId) -> u32 {
        self.pool(id).in_use()
    }

    pub fn capacity(&self, id: PoolId) -> u32 {
        self.pool(id).capacity()
    }

    pub fn queue_len(&self, id: PoolId) -> usize {
        self.pool(id).queue_len()
    }

    /// Requests one unit of `id` on behalf of `owner`.
    ///
    /// A request is granted immediately only when a unit is free and nobody is
    /// queued ahead of it.
    pub fn request(&mut self, id: PoolId, owner: Entity) -> Request {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;

        let pool = &mut self.pools[id.index()];
        if pool.queue.is_empty() && pool.has_free_unit() {
            pool.holders.insert(ticket);
            Request::Granted(ticket)
        } else {
            pool.queue.push_back((ticket, owner));
            tracing::debug!(
                pool = id.name(),
                ticket = ticket.0,
                queue_len = pool.queue.len(),
                "request queued"
            );
            Request::Queued(ticket)
        }
    }

    /// Returns the unit held by `ticket`. When requests are queued the unit is
    /// transferred to the oldest one, which is returned so its owner can be woken.
    pub fn release(&mut self, id: PoolId, ticket: Ticket) -> Option<Grant> {
        let pool = &mut self.pools[id.index()];
        if !pool.holders.remove(&ticket) {
            tracing::warn!(
                pool = id.name(),
                ticket = ticket.0,
                "release of a ticket that holds no unit"
            );
            return None;
        }

        if !pool.has_free_unit() {
            return None;
        }
        let (next, owner) = pool.queue.pop_front()?;
        pool.holders.insert(next);
        tracing::debug!(pool = id.name(), ticket = next.0, "queued request granted");
        Some(Grant {
            pool: id,
            ticket: next,
            owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_scanner() -> ClinicPools {
        ClinicPools::new(|id| if id == PoolId::Scanner { 1 } else { 2 })
    }

    #[test]
    fn grants_until_capacity_then_queues() {
        let mut pools = ClinicPools::new(|_| 2);
        let a = Entity::from_raw(1);
        assert!(pools.request(PoolId::UsMachine, a).is_granted());
        assert!(pools.request(PoolId::UsMachine, a).is_granted());
        let third = pools.request(PoolId::UsMachine, a);
        assert!(!third.is_granted());
        assert_eq!(pools.in_use(PoolId::UsMachine), 2);
        assert_eq!(pools.queue_len(PoolId::UsMachine), 1);
    }

    #[test]
    fn release_transfers_unit_to_oldest_waiter() {
        let mut pools = single_scanner();
        let holder = Entity::from_raw(1);
        let first_waiter = Entity::from_raw(2);
        let second_waiter = Entity::from_raw(3);

        let held = pools.request(PoolId::Scanner, holder).ticket();
        let w1 = pools.request(PoolId::Scanner, first_waiter).ticket();
        let w2 = pools.request(PoolId::Scanner, second_waiter).ticket();

        let grant = pools.release(PoolId::Scanner, held).expect("grant");
        assert_eq!(grant.ticket, w1);
        assert_eq!(grant.owner, first_waiter);
        assert_eq!(pools.in_use(PoolId::Scanner), 1);

        let grant = pools.release(PoolId::Scanner, w1).expect("grant");
        assert_eq!(grant.ticket, w2);
        assert_eq!(grant.owner, second_waiter);

        assert!(pools.release(PoolId::Scanner, w2).is_none());
        assert_eq!(pools.in_use(PoolId::Scanner), 0);
    }

    #[test]
    fn unknown_ticket_release_changes_nothing() {
        let mut pools = single_scanner();
        let owner = Entity::from_raw(1);
        let held = pools.request(PoolId::Scanner, owner).ticket();
        pools.request(PoolId::Scanner, owner);

        assert!(pools.release(PoolId::Scanner, Ticket(999)).is_none());
        assert_eq!(pools.in_use(PoolId::Scanner), 1);
        assert_eq!(pools.queue_len(PoolId::Scanner), 1);

        assert!(pools.release(PoolId::Scanner, held).is_some());
    }

    #[test]
    fn new_request_does_not_overtake_queue() {
        let mut pools = single_scanner();
        let owner = Entity::from_raw(1);
        let held = pools.request(PoolId::Scanner, owner).ticket();
        let queued = pools.request(PoolId::Scanner, owner).ticket();
        let grant = pools.release(PoolId::Scanner, held).expect("grant");
        assert_eq!(grant.ticket, queued);
        // Unit went to the waiter, so a fresh request must queue.
        assert!(!pools.request(PoolId::Scanner, owner).is_granted());
    }

    #[test]
    fn tickets_are_unique_across_pools() {
        let mut pools = ClinicPools::new(|_| 1);
        let owner = Entity::from_raw(1);
        let a = pools.request(PoolId::Scanner, owner).ticket();
        let b = pools.request(PoolId::Radiologist, owner).ticket();
        assert!(b > a);
    }
}
