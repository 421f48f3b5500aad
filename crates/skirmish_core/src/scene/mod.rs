//! # Scene Container
//!
//! Owns what a scene renders and decides when it goes away.
//!
//! ## Two kinds of members
//!
//! - **Objects** are live the moment they are added.
//! - **Custom objects** load their mesh asynchronously and only go live on
//!   the first tick after their [`MeshLoad`] completes.
//!
//! ## Expiry
//!
//! Members added with a TTL get an entry in a deadline-ordered queue that
//! is drained on every [`SceneContainer::update`]. A custom object's TTL
//! starts when it goes live, not when it is registered:
//!
//! ```text
//! t=0   add_custom_temp(c, ttl=50)    pending
//! t=30  load completes, tick          live, expires at 80
//! t=80  tick                          removed, on_delete(c)
//! ```
//!
//! Deleting a member early removes its queue entry, so a teardown callback
//! runs exactly once no matter which path removes the member.

mod load;

pub use load::{LoadStatus, LoadTrigger, MeshLoad};

use std::collections::{BTreeMap, HashMap};

use crate::services::Services;

/// Teardown callback, handed the removed member.
pub type OnDelete<T> = Box<dyn FnOnce(T)>;

/// A scene member whose mesh loads asynchronously.
pub trait CustomObject {
    /// Id unique among this container's custom objects.
    fn id(&self) -> u32;

    /// Completion signal for the mesh.
    fn mesh_load(&mut self) -> &mut MeshLoad;

    /// Per-frame tick with the container's scaled timestep in seconds.
    fn update(&mut self, timestep: f64);
}

/// Handle to a plain object in a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

/// Key of an expiry queue entry: deadline, then insertion order.
type ExpiryKey = (u64, u64);

#[derive(Clone, Copy, Debug)]
enum Expiry {
    Object(ObjectId),
    Custom(u32),
}

struct LiveObject<O> {
    object: O,
    on_delete: Option<OnDelete<O>>,
    expiry: Option<ExpiryKey>,
}

struct PendingCustom<C> {
    custom: C,
    ttl_ms: u64,
    on_delete: Option<OnDelete<C>>,
    registration: u64,
}

struct LiveCustom<C> {
    custom: C,
    on_delete: Option<OnDelete<C>>,
    expiry: Option<ExpiryKey>,
}

/// Container of scene members with timed removal.
pub struct SceneContainer<O, C: CustomObject> {
    services: Services,
    next_id: u32,
    next_handle: u64,
    next_registration: u64,
    next_expiry: u64,
    objects: BTreeMap<ObjectId, LiveObject<O>>,
    pending: Vec<PendingCustom<C>>,
    customs: BTreeMap<u64, LiveCustom<C>>,
    custom_index: HashMap<u32, u64>,
    expiries: BTreeMap<ExpiryKey, Expiry>,
    last_update_ms: u64,
    timestep_ms: u64,
}

impl<O, C: CustomObject> SceneContainer<O, C> {
    /// Creates an empty container.
    #[must_use]
    pub fn new(services: Services) -> Self {
        let now = services.now_ms();
        Self {
            services,
            next_id: 1,
            next_handle: 0,
            next_registration: 0,
            next_expiry: 0,
            objects: BTreeMap::new(),
            pending: Vec::new(),
            customs: BTreeMap::new(),
            custom_index: HashMap::new(),
            expiries: BTreeMap::new(),
            last_update_ms: now,
            timestep_ms: 0,
        }
    }

    /// Returns a fresh id, starting at 1 and never repeating.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Seconds between the last two updates, scaled by the speed factor.
    #[must_use]
    pub fn timestep(&self) -> f64 {
        self.services.scaled_timestep(self.timestep_ms)
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    /// Adds an object that stays until deleted.
    pub fn add_object(&mut self, object: O) -> ObjectId {
        self.insert_object(object, 0, None)
    }

    /// Adds an object removed after `ttl_ms` (0 means never).
    pub fn add_object_temp(
        &mut self,
        object: O,
        ttl_ms: u64,
        on_delete: impl FnOnce(O) + 'static,
    ) -> ObjectId {
        self.insert_object(object, ttl_ms, Some(Box::new(on_delete)))
    }

    fn insert_object(&mut self, object: O, ttl_ms: u64, on_delete: Option<OnDelete<O>>) -> ObjectId {
        let id = ObjectId(self.next_handle);
        self.next_handle += 1;

        let expiry = (ttl_ms > 0).then(|| self.schedule(ttl_ms, Expiry::Object(id)));
        self.objects.insert(id, LiveObject { object, on_delete, expiry });
        id
    }

    /// Removes an object now and hands it to `on_delete`. Any pending
    /// expiry is cancelled and its callback dropped.
    pub fn delete_object(&mut self, id: ObjectId, on_delete: impl FnOnce(O)) -> bool {
        match self.take_object(id) {
            Some(object) => {
                on_delete(object);
                true
            }
            None => false,
        }
    }

    /// Removes an object without running any callback.
    pub fn take_object(&mut self, id: ObjectId) -> Option<O> {
        let live = self.objects.remove(&id)?;
        if let Some(key) = live.expiry {
            self.expiries.remove(&key);
        }
        Some(live.object)
    }

    /// Whether the object is live.
    #[must_use]
    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Looks up a live object.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&O> {
        self.objects.get(&id).map(|l| &l.object)
    }

    /// Number of live objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // ------------------------------------------------------------------
    // Custom objects
    // ------------------------------------------------------------------

    /// Registers a custom object that goes live once its mesh loads.
    pub fn add_custom(&mut self, custom: C) {
        self.register_custom(custom, 0, None);
    }

    /// Registers a custom object removed `ttl_ms` after it goes live
    /// (0 means never).
    pub fn add_custom_temp(&mut self, custom: C, ttl_ms: u64, on_delete: impl FnOnce(C) + 'static) {
        self.register_custom(custom, ttl_ms, Some(Box::new(on_delete)));
    }

    fn register_custom(&mut self, custom: C, ttl_ms: u64, on_delete: Option<OnDelete<C>>) {
        let registration = self.next_registration;
        self.next_registration += 1;
        self.pending.push(PendingCustom { custom, ttl_ms, on_delete, registration });
    }

    /// Removes a custom object, live or still loading, and hands it to
    /// `on_delete`. Any pending expiry is cancelled.
    pub fn delete_custom(&mut self, id: u32, on_delete: impl FnOnce(C)) -> bool {
        if let Some(registration) = self.custom_index.remove(&id) {
            if let Some(live) = self.customs.remove(&registration) {
                if let Some(key) = live.expiry {
                    self.expiries.remove(&key);
                }
                on_delete(live.custom);
                return true;
            }
        }

        if let Some(idx) = self.pending.iter().position(|p| p.custom.id() == id) {
            let pending = self.pending.remove(idx);
            on_delete(pending.custom);
            return true;
        }
        false
    }

    /// Whether a custom object with `id` is live.
    #[must_use]
    pub fn contains_custom(&self, id: u32) -> bool {
        self.custom_index.contains_key(&id)
    }

    /// Looks up a live custom object.
    #[must_use]
    pub fn custom(&self, id: u32) -> Option<&C> {
        let registration = self.custom_index.get(&id)?;
        self.customs.get(registration).map(|l| &l.custom)
    }

    /// Number of live custom objects.
    #[must_use]
    pub fn custom_count(&self) -> usize {
        self.customs.len()
    }

    /// Number of custom objects still loading.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // ------------------------------------------------------------------
    // Frame tick
    // ------------------------------------------------------------------

    /// Per-frame tick: promotes loaded customs, expires members, then
    /// ticks live customs in registration order.
    pub fn update(&mut self) {
        let now = self.services.now_ms();
        self.timestep_ms = now.saturating_sub(self.last_update_ms);
        self.last_update_ms = now;

        self.promote_loaded(now);
        self.expire(now);

        let timestep = self.timestep();
        for live in self.customs.values_mut() {
            live.custom.update(timestep);
        }
    }

    /// Drops every member without running callbacks.
    pub fn reset(&mut self) {
        self.objects.clear();
        self.pending.clear();
        self.customs.clear();
        self.custom_index.clear();
        self.expiries.clear();
    }

    fn promote_loaded(&mut self, now: u64) {
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for mut pending in std::mem::take(&mut self.pending) {
            match pending.custom.mesh_load().poll() {
                LoadStatus::Pending => still_pending.push(pending),
                LoadStatus::Abandoned => {
                    tracing::warn!(custom = pending.custom.id(), "mesh load abandoned, dropping custom object");
                }
                LoadStatus::Loaded => self.go_live(pending, now),
            }
        }
        self.pending = still_pending;
    }

    fn go_live(&mut self, pending: PendingCustom<C>, now: u64) {
        let id = pending.custom.id();
        if let Some(old) = self.custom_index.remove(&id).and_then(|r| self.customs.remove(&r)) {
            tracing::warn!(custom = id, "replacing live custom object with the same id");
            if let Some(key) = old.expiry {
                self.expiries.remove(&key);
            }
            if let Some(cb) = old.on_delete {
                cb(old.custom);
            }
        }

        let expiry = (pending.ttl_ms > 0).then(|| {
            let key = (now.saturating_add(pending.ttl_ms), self.next_expiry);
            self.next_expiry += 1;
            self.expiries.insert(key, Expiry::Custom(id));
            key
        });
        self.custom_index.insert(id, pending.registration);
        self.customs.insert(
            pending.registration,
            LiveCustom { custom: pending.custom, on_delete: pending.on_delete, expiry },
        );
    }

    fn schedule(&mut self, ttl_ms: u64, target: Expiry) -> ExpiryKey {
        let key = (self.services.now_ms().saturating_add(ttl_ms), self.next_expiry);
        self.next_expiry += 1;
        self.expiries.insert(key, target);
        key
    }

    fn expire(&mut self, now: u64) {
        while let Some(entry) = self.expiries.first_entry() {
            if entry.key().0 > now {
                break;
            }
            match entry.remove() {
                Expiry::Object(id) => {
                    if let Some(live) = self.objects.remove(&id) {
                        tracing::trace!(object = id.0, "object expired");
                        if let Some(cb) = live.on_delete {
                            cb(live.object);
                        }
                    }
                }
                Expiry::Custom(id) => {
                    let live = self.custom_index.remove(&id).and_then(|r| self.customs.remove(&r));
                    if let Some(live) = live {
                        tracing::trace!(custom = id, "custom object expired");
                        if let Some(cb) = live.on_delete {
                            cb(live.custom);
                        }
                    }
                }
            }
        }
    }
}
