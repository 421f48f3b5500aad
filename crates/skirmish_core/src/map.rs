//! # Entity Map
//!
//! Address-keyed registry of every networked entity the client knows about.
//! The network layer feeds it updates; the frame loop calls [`EntityMap::tick`].
//!
//! ## Per-frame order (per entity)
//!
//! ```text
//! deleted()?  ──yes──► delete + drop + tombstone
//!     │no
//! ready && !initialized ──► initialize      (bridge add)
//!     │
//! initialized ──► update ──► snapshot_wasm   (bridge set_data)
//! ```
//!
//! This keeps the bridge order add → set_data* → delete for every address.
//! Deleted addresses are tombstoned at their last sequence number so late
//! packets cannot resurrect them. Tombstones are forgotten after
//! `tombstone_window_ms`, and at most `tombstone_capacity` are kept,
//! oldest evicted first.

use skirmish_shared::{EntityAddress, PropertyBag, SeqNum, Vec3};
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::entity::{Entity, EntityEvent, EntityKind};
use crate::error::{BridgeError, BridgeResult};
use crate::services::Services;

/// What happened during one [`EntityMap::tick`].
#[derive(Debug, Default)]
pub struct TickReport {
    /// Events raised by kind hooks.
    pub events: Vec<EntityEvent>,
    /// Entities initialized this tick.
    pub initialized: Vec<EntityAddress>,
    /// Entities deleted this tick.
    pub deleted: Vec<EntityAddress>,
    /// Bridge failures, one per affected entity. The entity stays in its
    /// previous state and is retried next tick.
    pub errors: Vec<(EntityAddress, BridgeError)>,
}

#[derive(Clone, Copy, Debug)]
struct Tombstone {
    seq: SeqNum,
    deleted_at_ms: u64,
}

/// Registry of live entities keyed by address.
pub struct EntityMap {
    services: Services,
    entities: BTreeMap<EntityAddress, Entity>,
    tombstones: HashMap<EntityAddress, Tombstone>,
    /// Burial order, oldest first. May hold entries for revived addresses.
    burials: VecDeque<(u64, EntityAddress)>,
}

impl EntityMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self {
            services,
            entities: BTreeMap::new(),
            tombstones: HashMap::new(),
            burials: VecDeque::new(),
        }
    }

    /// Merges an update, creating the entity on first sight with the kind
    /// its space implies. Returns `None` if the address was deleted at or
    /// after `seq`.
    pub fn upsert(
        &mut self,
        address: EntityAddress,
        bag: PropertyBag,
        seq: Option<SeqNum>,
    ) -> Option<&mut Entity> {
        self.upsert_with(address, || EntityKind::for_space(address.space()), bag, seq)
    }

    /// Like [`EntityMap::upsert`], with an explicit kind for new entities.
    pub fn upsert_with(
        &mut self,
        address: EntityAddress,
        kind: impl FnOnce() -> EntityKind,
        bag: PropertyBag,
        seq: Option<SeqNum>,
    ) -> Option<&mut Entity> {
        if let Some(&Tombstone { seq: tomb, .. }) = self.tombstones.get(&address) {
            match seq {
                Some(seq) if seq > tomb => {
                    self.tombstones.remove(&address);
                }
                _ => {
                    tracing::trace!(%address, ?seq, tomb, "ignoring update for deleted entity");
                    return None;
                }
            }
        }

        let services = &self.services;
        let entity = self
            .entities
            .entry(address)
            .or_insert_with(|| Entity::new(address, kind(), services.clone()));
        entity.set_data(bag, seq);
        Some(entity)
    }

    /// Adds a fully built entity, replacing nothing.
    ///
    /// Returns the entity back if the address is already taken.
    pub fn insert(&mut self, entity: Entity) -> Result<(), Entity> {
        if self.entities.contains_key(&entity.address()) {
            return Err(entity);
        }
        self.tombstones.remove(&entity.address());
        self.entities.insert(entity.address(), entity);
        Ok(())
    }

    /// Whether an entity lives at `address`.
    #[must_use]
    pub fn has(&self, address: EntityAddress) -> bool {
        self.entities.contains_key(&address)
    }

    /// Looks up an entity.
    #[must_use]
    pub fn get(&self, address: EntityAddress) -> Option<&Entity> {
        self.entities.get(&address)
    }

    /// Looks up an entity mutably.
    pub fn get_mut(&mut self, address: EntityAddress) -> Option<&mut Entity> {
        self.entities.get_mut(&address)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Deletes an entity now and drops it from the map.
    ///
    /// # Errors
    ///
    /// Returns the bridge's error; the entity then stays in the map.
    pub fn remove(&mut self, address: EntityAddress) -> BridgeResult<Option<Entity>> {
        let Some(entity) = self.entities.get_mut(&address) else {
            return Ok(None);
        };
        entity.delete()?;
        let entity = self.entities.remove(&address);
        if let Some(e) = &entity {
            let seq = e.last_seq_num();
            self.bury(address, seq);
        }
        Ok(entity)
    }

    /// Number of deleted addresses still rejecting late updates.
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    fn bury(&mut self, address: EntityAddress, seq: SeqNum) {
        let now = self.services.now_ms();
        self.tombstones.insert(address, Tombstone { seq, deleted_at_ms: now });
        self.burials.push_back((now, address));
        self.prune_tombstones(now);
    }

    fn prune_tombstones(&mut self, now: u64) {
        let window = self.services.config.tombstone_window_ms;
        let capacity = self.services.config.tombstone_capacity;

        while let Some(&(at, address)) = self.burials.front() {
            let expired = now.saturating_sub(at) >= window;
            if !expired && self.burials.len() <= capacity {
                break;
            }
            self.burials.pop_front();
            if self.tombstones.get(&address).is_some_and(|t| t.deleted_at_ms == at) {
                self.tombstones.remove(&address);
                tracing::trace!(%address, "forgetting tombstone");
            }
        }
    }

    /// Runs one frame over every entity.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let mut gone = Vec::new();
        self.prune_tombstones(self.services.now_ms());

        for (address, entity) in &mut self.entities {
            if entity.deleted() {
                match entity.delete() {
                    Ok(()) => gone.push(*address),
                    Err(err) => report.errors.push((*address, err)),
                }
                continue;
            }

            if !entity.initialized() && entity.ready() {
                match entity.initialize() {
                    Ok(()) => report.initialized.push(*address),
                    Err(err) => {
                        report.errors.push((*address, err));
                        continue;
                    }
                }
            }

            if entity.initialized() {
                entity.update();
                if let Err(err) = entity.snapshot_wasm() {
                    report.errors.push((*address, err));
                }
            }
            report.events.extend(entity.take_events());
        }

        for address in gone {
            if let Some(entity) = self.entities.remove(&address) {
                self.bury(address, entity.last_seq_num());
                report.deleted.push(address);
            }
        }
        report
    }

    /// Offset from a hook to its owner, for drawing the rope.
    #[must_use]
    pub fn rope_offset(&self, hook: EntityAddress) -> Option<Vec3> {
        let hook = self.entities.get(&hook)?;
        let owner = hook.owner();
        if !owner.valid() {
            return None;
        }
        let owner = self.entities.get(&owner)?;
        Some(owner.pos3() - hook.pos3())
    }
}
