//! Reference counts of backing objects shared by several buffer handles.

use std::{
    collections::{HashMap, hash_map::Entry},
    num::NonZeroU32,
    os::fd::BorrowedFd,
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::{error, trace, warn};
use rkgralloc_layout::{GrallocError, Result};

use crate::{BoFlags, ObjectId, ObjectTransport};

/// What [`ObjectRegistry::release`] did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// References remain
    Decremented(NonZeroU32),
    /// The last reference was dropped and the object destroyed
    Destroyed,
    /// No reference was held
    Untracked,
}

/// Tracks how many handles reference each backing object and destroys an object exactly once,
/// when its last reference is released.
///
/// One lock guards the counts together with the transport's create, import and destroy calls,
/// so a count check and the destroy it triggers are atomic with respect to other threads.
pub struct ObjectRegistry {
    transport: Box<dyn ObjectTransport>,
    refs: Mutex<HashMap<ObjectId, NonZeroU32>>,
}

impl ObjectRegistry {
    pub fn new(transport: Box<dyn ObjectTransport>) -> Self {
        Self {
            transport,
            refs: Mutex::new(HashMap::new()),
        }
    }

    /// The transport, for calls that need no reference counting (map, export).
    pub fn transport(&self) -> &dyn ObjectTransport {
        self.transport.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ObjectId, NonZeroU32>> {
        // Counts are updated in single statements, so a poisoned map is still consistent
        self.refs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire_locked(
        refs: &mut HashMap<ObjectId, NonZeroU32>,
        id: ObjectId,
    ) -> Result<NonZeroU32> {
        let count = match refs.entry(id) {
            Entry::Vacant(entry) => *entry.insert(NonZeroU32::MIN),
            Entry::Occupied(mut entry) => {
                let Some(count) = entry.get().checked_add(1) else {
                    error!("Reference count of object {id} is at its maximum");
                    return Err(GrallocError::RefCountOverflow(id.0));
                };
                *entry.get_mut() = count;
                count
            }
        };
        trace!("Object {id} now has {count} references");
        Ok(count)
    }

    /// Adds a reference to `id`.
    ///
    /// Fails without changing the count when it is already at its maximum.
    pub fn acquire(&self, id: ObjectId) -> Result<NonZeroU32> {
        Self::acquire_locked(&mut self.lock(), id)
    }

    /// Drops a reference to `id`, destroying the object when none remain.
    ///
    /// Releasing an id without references is logged and otherwise ignored.
    pub fn release(&self, id: ObjectId) -> ReleaseOutcome {
        let mut refs = self.lock();
        let Some(count) = refs.get_mut(&id) else {
            warn!("{}", GrallocError::DoubleRelease(id.0));
            return ReleaseOutcome::Untracked;
        };

        if let Some(remaining) = NonZeroU32::new(count.get() - 1) {
            *count = remaining;
            trace!("Object {id} now has {remaining} references");
            return ReleaseOutcome::Decremented(remaining);
        }

        refs.remove(&id);
        if let Err(err) = self.transport.destroy(id) {
            error!("Failed to destroy object {id}: {err}");
        }
        trace!("Destroyed object {id}");

        ReleaseOutcome::Destroyed
    }

    /// Creates an object and takes the first reference to it.
    pub fn create(&self, size: usize, flags: BoFlags) -> Result<ObjectId> {
        let mut refs = self.lock();
        let id = self
            .transport
            .create(size, flags)
            .map_err(|err| GrallocError::transport("create", err))?;
        Self::acquire_locked(&mut refs, id)?;

        Ok(id)
    }

    /// Imports the descriptor `fd` and takes a reference to the resulting object.
    pub fn import(&self, fd: BorrowedFd<'_>, flags: BoFlags, size: usize) -> Result<ObjectId> {
        let mut refs = self.lock();
        let id = self
            .transport
            .import(fd, flags, size)
            .map_err(|err| GrallocError::transport("import", err))?;
        Self::acquire_locked(&mut refs, id)?;

        Ok(id)
    }

    /// Current number of references to `id`.
    pub fn ref_count(&self, id: ObjectId) -> u32 {
        self.lock().get(&id).map_or(0, |count| count.get())
    }

    /// Number of objects with live references.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
