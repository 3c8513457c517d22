//! Resource manager.
//!
//! Owns every descriptor and coordinates:
//! - lookup-or-create of typed resources (`request_resource`)
//! - refcounting and deferred teardown (`release_resource`, `clear_pending_unloads`)
//! - hot reload with validate-before-swap (`update_resource_data`)
//! - watcher notification after a reload
//!
//! Descriptors are namespaced per kind (one registry per `TypeId`), so two
//! kinds may use the same name without colliding.
//!
//! Every operation is synchronous. Kinds call back into the manager from
//! `load`/`unload` to acquire and release sub-resources; those reentrant calls
//! are expected. Watchers get no access to the manager during notification.

use std::{
    any::{Any, TypeId},
    cell::RefCell,
    collections::HashMap,
    error::Error as StdError,
    rc::Rc,
};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    descriptor::{Descriptor, Registry},
    error::ResourceError,
    handle::{Handle, ManagerId},
    pending::{PendingUnload, UnloadQueue},
    resource::{default_data, parse_desc, Resource, ResourceUpdate, ResourceWatcher},
    watcher::{WatcherEntry, WatcherId, WatcherSlots},
};

type UpdateFn = fn(&mut ResourceManager, &str, &Value) -> Result<u64, ResourceError>;
type ShutdownFn = fn(&mut ResourceManager) -> usize;
type CountFn = fn(&ResourceManager) -> usize;

/// Type-erased entry points for one registered kind.
struct KindEntry {
    class: &'static str,
    update: UpdateFn,
    shutdown: ShutdownFn,
    count: CountFn,
}

/// A `(kind, name)` currently inside `load`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadingKey {
    type_id: TypeId,
    class: &'static str,
    name: String,
}

impl LoadingKey {
    fn of<T: Resource>(name: &str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            class: T::CLASS_NAME,
            name: name.to_string(),
        }
    }

    fn label(&self) -> String {
        format!("{} '{}'", self.class, self.name)
    }
}

/// Lifetime counters, mostly for tests and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Instances materialized by `request_resource`.
    pub instances_created: u64,
    /// Instances destroyed by a drain or by shutdown.
    pub instances_destroyed: u64,
    /// In-place reloads caused by accepted updates.
    pub reloads: u64,
    /// Accepted updates to resources without an instance, loaded once and
    /// unloaded again to prove the document.
    pub validations: u64,
    pub rejected_updates: u64,
    pub notifications: u64,
    /// First loads that fell back to the kind's default data.
    pub fallbacks: u64,
}

/// Registry of all resources of one engine instance.
pub struct ResourceManager {
    id: ManagerId,
    registries: HashMap<TypeId, Box<dyn Any>>,
    kinds: Vec<KindEntry>,
    pending: UnloadQueue,
    loading: Vec<LoadingKey>,
    watchers: WatcherSlots,
    contexts: HashMap<TypeId, Box<dyn Any>>,
    stats: ManagerStats,
    shutting_down: bool,
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceManager {
    pub fn new() -> Self {
        Self {
            id: ManagerId::new_unique(),
            registries: HashMap::new(),
            kinds: Vec::new(),
            pending: UnloadQueue::default(),
            loading: Vec::new(),
            watchers: WatcherSlots::default(),
            contexts: HashMap::new(),
            stats: ManagerStats::default(),
            shutting_down: false,
        }
    }

    // =========================================================================
    // Kinds
    // =========================================================================

    /// Registers a kind so host documents can address it by class name.
    ///
    /// Idempotent. Kinds are also registered implicitly on first use.
    ///
    /// # Panics
    /// If another kind already uses `T::CLASS_NAME`, or if `T::DEFAULT_DATA`
    /// does not parse into `T::Desc`.
    pub fn register_class<T: Resource>(&mut self) {
        let type_id = TypeId::of::<T>();
        if self.registries.contains_key(&type_id) {
            return;
        }
        assert!(
            !self.kinds.iter().any(|k| k.class == T::CLASS_NAME),
            "resource class name {} is used by two kinds",
            T::CLASS_NAME
        );
        if let Err(e) = parse_desc::<T>(&default_data::<T>()) {
            panic!(
                "default data of resource class {} does not match its descriptor: {e}",
                T::CLASS_NAME
            );
        }

        self.registries
            .insert(type_id, Box::new(Registry::<T>::default()));
        self.kinds.push(KindEntry {
            class: T::CLASS_NAME,
            update: Self::update_resource_data::<T>,
            shutdown: Self::shutdown_kind::<T>,
            count: Self::count_kind::<T>,
        });
        debug!(class = T::CLASS_NAME, "resource class registered");
    }

    /// Registered class names in registration order.
    pub fn classes(&self) -> Vec<&'static str> {
        self.kinds.iter().map(|k| k.class).collect()
    }

    // =========================================================================
    // Request / release
    // =========================================================================

    /// Returns a handle to `(T, name)`, materializing the instance on first use.
    ///
    /// A missing descriptor is created from `T`'s default data. If the stored
    /// data fails to load, the instance is built from the default data instead.
    /// The only failure a well-formed kind can produce here is a dependency cycle.
    pub fn request_resource<T: Resource>(
        &mut self,
        name: &str,
    ) -> Result<Handle<T>, ResourceError> {
        let key = LoadingKey::of::<T>(name);
        if self.loading.contains(&key) {
            return Err(self.cycle_error(key));
        }

        let desc = self.descriptor_mut::<T>(name);
        let name_rc = desc.name.clone();
        let instance = match desc.instance.clone() {
            Some(instance) => {
                if desc.refcount == 0 && desc.pending_unload {
                    debug!(
                        class = T::CLASS_NAME,
                        name, "resource re-requested before unload"
                    );
                }
                instance
            }
            None => {
                let data = desc.data.clone();
                let state = self.materialize::<T>(key, &data)?;
                let instance = Rc::new(RefCell::new(state));
                self.stats.instances_created += 1;

                let desc = self.descriptor_mut::<T>(name);
                desc.instance = Some(instance.clone());
                info!(
                    class = T::CLASS_NAME,
                    name,
                    generation = desc.generation,
                    "resource loaded"
                );
                instance
            }
        };

        let desc = self.descriptor_mut::<T>(name);
        desc.refcount += 1;
        debug!(
            class = T::CLASS_NAME,
            name,
            refcount = desc.refcount,
            "resource requested"
        );

        Ok(Handle {
            name: name_rc,
            instance,
            owner: self.id,
        })
    }

    /// Gives back one reference. At zero the instance is queued, not destroyed.
    ///
    /// # Panics
    /// If the handle was issued by another manager, names an unknown resource,
    /// would underflow the refcount, or refers to an instance that is no longer current.
    pub fn release_resource<T: Resource>(&mut self, handle: Handle<T>) {
        assert!(
            handle.owner == self.id,
            "{} '{}' released to a resource manager that did not issue it",
            T::CLASS_NAME,
            handle.name
        );

        let shutting_down = self.shutting_down;
        let desc = self
            .registries
            .get_mut(&TypeId::of::<T>())
            .and_then(|r| r.downcast_mut::<Registry<T>>())
            .and_then(|r| r.get_mut(&handle.name));
        let Some(desc) = desc else {
            panic!("release of unknown {} '{}'", T::CLASS_NAME, handle.name);
        };
        assert!(
            desc.refcount > 0,
            "refcount underflow releasing {} '{}'",
            T::CLASS_NAME,
            handle.name
        );
        let current = desc
            .instance
            .as_ref()
            .map_or(shutting_down, |i| Rc::ptr_eq(i, &handle.instance));
        assert!(
            current,
            "stale handle released for {} '{}'",
            T::CLASS_NAME,
            handle.name
        );

        desc.refcount -= 1;
        debug!(
            class = T::CLASS_NAME,
            name = %handle.name,
            refcount = desc.refcount,
            "resource released"
        );

        if desc.refcount == 0 && desc.instance.is_some() && !desc.pending_unload && !shutting_down
        {
            desc.pending_unload = true;
            self.pending.push(PendingUnload {
                class: T::CLASS_NAME,
                name: handle.name.to_string(),
                drain: Self::drain_pending::<T>,
            });
            debug!(
                class = T::CLASS_NAME,
                name = %handle.name,
                "resource queued for unload"
            );
        }
    }

    /// Destroys every queued instance whose refcount is still zero.
    ///
    /// Call only at a point where no in-flight device work references the
    /// queued resources: end of frame, and before the device is torn down.
    /// Releases cascading from the unloads are drained in the same call.
    /// Returns the number of destroyed instances.
    pub fn clear_pending_unloads(&mut self) -> usize {
        let mut destroyed = 0;
        while let Some(entry) = self.pending.pop() {
            if (entry.drain)(self, &entry.name) {
                destroyed += 1;
            }
        }
        if destroyed > 0 {
            info!(destroyed, "pending unloads cleared");
        }
        destroyed
    }

    // =========================================================================
    // Data updates
    // =========================================================================

    /// Replaces the data of `(T, name)` with a copy of `data`.
    ///
    /// The document is validated before anything changes: a fresh state is
    /// loaded from it first. If an instance exists, that state is swapped into
    /// the shared instance and the previous state unloaded; otherwise the
    /// staged state is unloaded again. Then the generation is bumped and the
    /// watchers notified in registration order. A rejected update leaves data, generation and
    /// instance untouched. Returns the new generation.
    pub fn update_resource_data<T: Resource>(
        &mut self,
        name: &str,
        data: &Value,
    ) -> Result<u64, ResourceError> {
        let document = data.clone();
        let key = LoadingKey::of::<T>(name);
        if self.loading.contains(&key) {
            let err = self.cycle_error(key);
            self.reject::<T>(name, &err);
            return Err(err);
        }

        let existing = self.descriptor_mut::<T>(name).instance.clone();
        self.loading.push(key);
        let staged = self.construct::<T>(name, &document);
        self.loading.pop();

        let mut state = match staged {
            Ok(state) => state,
            Err(err) => {
                self.reject::<T>(name, &err);
                return Err(err);
            }
        };
        if let Some(slot) = existing {
            let mut previous = {
                let mut current = slot.try_borrow_mut().unwrap_or_else(|_| {
                    panic!("{} '{}' is borrowed during reload", T::CLASS_NAME, name)
                });
                std::mem::replace(&mut *current, state)
            };
            previous.unload(self);
            self.stats.reloads += 1;
        } else {
            // Nothing to swap into: the staged state only proved the document
            // loads. Its sub-resource releases go through the deferred queue.
            state.unload(self);
            self.stats.validations += 1;
        }

        let desc = self.descriptor_mut::<T>(name);
        desc.data = document;
        desc.generation += 1;
        let generation = desc.generation;
        info!(
            class = T::CLASS_NAME,
            name,
            generation,
            reloaded = desc.instance.is_some(),
            "resource data updated"
        );

        self.notify::<T>(name, generation);
        Ok(generation)
    }

    /// Routes a host document to the kind registered under `class`.
    pub fn update_by_class(
        &mut self,
        class: &str,
        name: &str,
        data: &Value,
    ) -> Result<u64, ResourceError> {
        let update = self
            .kinds
            .iter()
            .find(|k| k.class == class)
            .map(|k| k.update)
            .ok_or_else(|| ResourceError::UnknownClass(class.to_string()))?;
        update(self, name, data)
    }

    // =========================================================================
    // Watchers
    // =========================================================================

    /// Registers `watcher` for updates of `(T, name)`.
    ///
    /// Only a weak reference is kept: dropping the watcher without
    /// unregistering is allowed, it is skipped and pruned on the next update.
    pub fn register_watcher<T: Resource, W: ResourceWatcher + 'static>(
        &mut self,
        name: &str,
        watcher: &Rc<RefCell<W>>,
    ) -> WatcherId {
        let erased: Rc<RefCell<dyn ResourceWatcher>> = watcher.clone();
        let id = self.watchers.insert(WatcherEntry {
            class: T::CLASS_NAME,
            name: name.to_string(),
            watcher: Rc::downgrade(&erased),
            detach: Self::detach_watcher::<T>,
        });
        self.descriptor_mut::<T>(name).watchers.push(id);
        debug!(class = T::CLASS_NAME, name, ?id, "watcher registered");
        id
    }

    /// # Panics
    /// If `id` is not a live registration (e.g. unregistered twice).
    pub fn unregister_watcher(&mut self, id: WatcherId) {
        let entry = self
            .watchers
            .remove(id)
            .unwrap_or_else(|| panic!("watcher {id:?} is not registered"));
        (entry.detach)(self, &entry.name, id);
        debug!(class = entry.class, name = %entry.name, ?id, "watcher unregistered");
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Forces every live instance through `unload`, regardless of refcount,
    /// and forgets all descriptors, queued unloads and watchers.
    ///
    /// Handles still held by consumers must not be released afterwards.
    pub fn shutdown(&mut self) {
        self.shutting_down = true;
        let teardown: Vec<ShutdownFn> = self.kinds.iter().rev().map(|k| k.shutdown).collect();
        let mut forced = 0;
        for shutdown in teardown {
            forced += shutdown(self);
        }

        self.pending.clear();
        self.watchers.clear();
        self.loading.clear();
        self.registries.clear();
        self.kinds.clear();
        self.shutting_down = false;
        info!(forced, "resource manager shut down");
    }

    // =========================================================================
    // Context
    // =========================================================================

    /// Stores a collaborator (e.g. the device) that kinds can look up in `load`.
    pub fn insert_context<C: 'static>(&mut self, value: C) -> Option<C> {
        self.contexts
            .insert(TypeId::of::<C>(), Box::new(value))
            .and_then(|old| old.downcast::<C>().ok())
            .map(|old| *old)
    }

    pub fn context<C: 'static>(&self) -> Option<&C> {
        self.contexts
            .get(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast_ref::<C>())
    }

    pub fn remove_context<C: 'static>(&mut self) -> Option<C> {
        self.contexts
            .remove(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast::<C>().ok())
            .map(|boxed| *boxed)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn contains<T: Resource>(&self, name: &str) -> bool {
        self.descriptor::<T>(name).is_some()
    }

    pub fn refcount<T: Resource>(&self, name: &str) -> Option<usize> {
        self.descriptor::<T>(name).map(|d| d.refcount)
    }

    pub fn generation<T: Resource>(&self, name: &str) -> Option<u64> {
        self.descriptor::<T>(name).map(|d| d.generation)
    }

    pub fn is_loaded<T: Resource>(&self, name: &str) -> bool {
        self.descriptor::<T>(name)
            .is_some_and(|d| d.instance.is_some())
    }

    /// The last accepted document of `(T, name)`.
    pub fn data<T: Resource>(&self, name: &str) -> Option<&Value> {
        self.descriptor::<T>(name).map(|d| &d.data)
    }

    pub fn pending_unloads(&self) -> usize {
        self.pending.len()
    }

    /// `Class 'name'` labels of queued unloads, oldest first.
    pub fn pending_unload_labels(&self) -> Vec<String> {
        self.pending.labels()
    }

    pub fn descriptor_count(&self) -> usize {
        self.kinds.iter().map(|k| (k.count)(self)).sum()
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    pub fn stats(&self) -> ManagerStats {
        self.stats
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn registry<T: Resource>(&self) -> Option<&Registry<T>> {
        self.registries
            .get(&TypeId::of::<T>())
            .and_then(|r| r.downcast_ref::<Registry<T>>())
    }

    fn registry_mut<T: Resource>(&mut self) -> &mut Registry<T> {
        self.register_class::<T>();
        self.registries
            .get_mut(&TypeId::of::<T>())
            .and_then(|r| r.downcast_mut::<Registry<T>>())
            .expect("registry type mismatch")
    }

    fn descriptor<T: Resource>(&self, name: &str) -> Option<&Descriptor<T>> {
        self.registry::<T>().and_then(|r| r.get(name))
    }

    /// Looks up `(T, name)`, creating it from the default data if absent.
    fn descriptor_mut<T: Resource>(&mut self, name: &str) -> &mut Descriptor<T> {
        self.registry_mut::<T>()
            .descriptors
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(class = T::CLASS_NAME, name, "descriptor created");
                Descriptor::new(name, default_data::<T>())
            })
    }

    /// First load of an instance, falling back to default data on failure.
    fn materialize<T: Resource>(
        &mut self,
        key: LoadingKey,
        data: &Value,
    ) -> Result<T, ResourceError> {
        let name = key.name.clone();
        self.loading.push(key);
        let result = match self.construct::<T>(&name, data) {
            Err(err) if !err.is_cyclic() => {
                let fallback = default_data::<T>();
                if fallback == *data {
                    Err(err)
                } else {
                    warn!(
                        class = T::CLASS_NAME,
                        name = %name,
                        error = %error_chain(&err),
                        "load failed, falling back to default data"
                    );
                    self.stats.fallbacks += 1;
                    self.construct::<T>(&name, &fallback)
                }
            }
            other => other,
        };
        self.loading.pop();
        result
    }

    /// Parses `data` and loads a fresh state from it. A failed load is unloaded again.
    fn construct<T: Resource>(&mut self, name: &str, data: &Value) -> Result<T, ResourceError> {
        let desc = parse_desc::<T>(data).map_err(|source| ResourceError::MalformedData {
            class: T::CLASS_NAME,
            name: name.to_string(),
            source,
        })?;

        let mut state = T::default();
        if let Err(source) = state.load(self, desc) {
            state.unload(self);
            return Err(ResourceError::Load {
                class: T::CLASS_NAME,
                name: name.to_string(),
                source,
            });
        }
        Ok(state)
    }

    fn cycle_error(&self, key: LoadingKey) -> ResourceError {
        let mut chain: Vec<String> = self.loading.iter().map(LoadingKey::label).collect();
        chain.push(key.label());
        warn!(chain = %chain.join(" -> "), "cyclic resource dependency");
        ResourceError::CyclicDependency { chain }
    }

    fn reject<T: Resource>(&mut self, name: &str, err: &ResourceError) {
        self.stats.rejected_updates += 1;
        warn!(
            class = T::CLASS_NAME,
            name,
            error = %error_chain(err),
            "update rejected, previous data kept"
        );
    }

    fn notify<T: Resource>(&mut self, name: &str, generation: u64) {
        let ids = self
            .descriptor::<T>(name)
            .map(|d| d.watchers.clone())
            .unwrap_or_default();
        if ids.is_empty() {
            return;
        }

        let update = ResourceUpdate {
            class: T::CLASS_NAME,
            name: name.to_string(),
            generation,
        };
        let mut dead = Vec::new();
        for id in ids {
            let Some(watcher) = self.watchers.get(id).and_then(|e| e.watcher.upgrade()) else {
                dead.push(id);
                continue;
            };
            watcher.borrow_mut().on_resource_updated(&update);
            self.stats.notifications += 1;
        }

        for id in dead {
            self.watchers.remove(id);
            self.detach_watcher::<T>(name, id);
            debug!(class = T::CLASS_NAME, name, ?id, "dropped watcher pruned");
        }
    }

    fn detach_watcher<T: Resource>(&mut self, name: &str, id: WatcherId) {
        if let Some(desc) = self.registry_mut::<T>().get_mut(name) {
            desc.watchers.retain(|w| *w != id);
        }
    }

    fn drain_pending<T: Resource>(&mut self, name: &str) -> bool {
        let Some(desc) = self.registry_mut::<T>().get_mut(name) else {
            return false;
        };
        desc.pending_unload = false;
        if desc.refcount > 0 {
            debug!(class = T::CLASS_NAME, name, "resource resurrected, unload skipped");
            return false;
        }
        let Some(slot) = desc.instance.take() else {
            return false;
        };

        slot.borrow_mut().unload(self);
        self.stats.instances_destroyed += 1;
        info!(class = T::CLASS_NAME, name, "resource unloaded");
        true
    }

    fn shutdown_kind<T: Resource>(&mut self) -> usize {
        let names = self
            .registry::<T>()
            .map(Registry::loaded_names)
            .unwrap_or_default();

        let mut forced = 0;
        for name in names {
            let Some(desc) = self.registry_mut::<T>().get_mut(&name) else {
                continue;
            };
            if desc.refcount > 0 {
                warn!(
                    class = T::CLASS_NAME,
                    name = %name,
                    refcount = desc.refcount,
                    "forcing unload of resource still in use"
                );
            }
            let Some(slot) = desc.instance.take() else {
                continue;
            };
            slot.borrow_mut().unload(self);
            self.stats.instances_destroyed += 1;
            forced += 1;
        }
        forced
    }

    fn count_kind<T: Resource>(&self) -> usize {
        self.registry::<T>().map_or(0, |r| r.descriptors.len())
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        if !self.kinds.is_empty() && !std::thread::panicking() {
            self.shutdown();
        }
    }
}

/// `outer: cause: root cause` rendering for log fields.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
