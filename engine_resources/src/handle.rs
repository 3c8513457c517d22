//! Typed resource handles.

use std::{
    cell::{Ref, RefCell},
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::resource::Resource;

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies the manager a handle was issued by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ManagerId(u64);

impl ManagerId {
    pub(crate) fn new_unique() -> Self {
        ManagerId(NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One outstanding reference to a resource instance.
///
/// Not `Clone`: every handle accounts for exactly one refcount and must be
/// given back through [`ResourceManager::release_resource`](crate::ResourceManager::release_resource).
/// The instance behind a handle is reloaded in place on hot reload, so a handle
/// always observes the latest accepted data.
pub struct Handle<T: Resource> {
    pub(crate) name: Rc<str>,
    pub(crate) instance: Rc<RefCell<T>>,
    pub(crate) owner: ManagerId,
}

impl<T: Resource> Handle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &'static str {
        T::CLASS_NAME
    }

    /// Read access to the instance.
    ///
    /// # Panics
    /// If the instance is currently being reloaded (only possible from inside its own `load`).
    pub fn get(&self) -> Ref<'_, T> {
        self.instance.borrow()
    }

    /// Whether both handles refer to the same underlying instance.
    pub fn same_instance(&self, other: &Handle<T>) -> bool {
        Rc::ptr_eq(&self.instance, &other.instance)
    }
}

impl<T: Resource> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("class", &T::CLASS_NAME)
            .field("name", &self.name)
            .finish()
    }
}
