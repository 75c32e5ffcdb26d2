// src/core/context_data.rs
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, lockable pipeline state.
///
/// Every handler of a run receives a clone pointing at the same data, and the
/// caller keeps one to read results once the run returns. Detached steps keep
/// their clone alive past the end of the run.
///
/// IMPORTANT: guards are blocking `parking_lot` guards and MUST be dropped
/// before any `.await`.
#[derive(Debug)]
pub struct ContextData<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> ContextData<T> {
  pub fn new(data: T) -> Self {
    ContextData(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Read guard narrowed to one part of the data, e.g. `ctx.map_read(|d| &d.items)`.
  pub fn map_read<F, U: ?Sized>(&self, f: F) -> MappedRwLockReadGuard<'_, U>
  where
    F: FnOnce(&T) -> &U,
  {
    RwLockReadGuard::map(self.read(), f)
  }

  /// Clones the current value out from under a short read lock.
  pub fn snapshot(&self) -> T
  where
    T: Clone,
  {
    self.read().clone()
  }
}

impl<T: Send + Sync + 'static> Clone for ContextData<T> {
  fn clone(&self) -> Self {
    ContextData(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for ContextData<T> {
  fn default() -> Self {
    Self::new(Default::default())
  }
}
