//! Per-thread concurrency control.
//!
//! Only one operation mutates a thread at a time. A second turn on the
//! same thread waits for the first to finish, in arrival order. Deletion
//! takes the same lock, so it never interleaves with a turn.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

type LockTable = Arc<Mutex<HashMap<String, Arc<Semaphore>>>>;

/// Each thread id maps to a `Semaphore(1)`. Holding the permit grants
/// exclusive access. An entry lives only while someone holds or awaits it.
pub struct ThreadLockMap {
    locks: LockTable,
}

impl Default for ThreadLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadLockMap {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Wait for exclusive access to `thread_id`.
    ///
    /// Fails only if the semaphore was closed, which this map never does.
    pub async fn acquire(&self, thread_id: &str) -> Result<ThreadPermit, AcquireError> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(thread_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        let permit = sem.clone().acquire_owned().await?;
        Ok(ThreadPermit {
            thread_id: thread_id.to_owned(),
            sem,
            permit: Some(permit),
            locks: self.locks.clone(),
        })
    }

    /// Number of tracked threads.
    pub fn thread_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop entries nobody holds or waits on. Catches entries left behind by
    /// waiters that were cancelled after the holder released.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1 || sem.available_permits() == 0);
    }
}

/// Exclusive access to one thread. Releasing the last holder removes the
/// thread's entry from the map.
pub struct ThreadPermit {
    thread_id: String,
    sem: Arc<Semaphore>,
    permit: Option<OwnedSemaphorePermit>,
    locks: LockTable,
}

impl Drop for ThreadPermit {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        drop(self.permit.take());
        // The map and this guard are the only owners; nobody is waiting.
        // Clones are taken under the map lock, so none can appear meanwhile.
        if Arc::strong_count(&self.sem) == 2
            && locks
                .get(&self.thread_id)
                .is_some_and(|s| Arc::ptr_eq(s, &self.sem))
        {
            locks.remove(&self.thread_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn sequential_access() {
        let map = ThreadLockMap::new();
        let p1 = map.acquire("t1").await.unwrap();
        drop(p1);
        let _p2 = map.acquire("t1").await.unwrap();
    }

    #[tokio::test]
    async fn different_threads_concurrent() {
        let map = ThreadLockMap::new();
        let _p1 = map.acquire("t1").await.unwrap();
        let _p2 = map.acquire("t2").await.unwrap();
        assert_eq!(map.thread_count(), 2);
    }

    #[tokio::test]
    async fn same_thread_waits() {
        let map = Arc::new(ThreadLockMap::new());
        let map2 = map.clone();

        let p1 = map.acquire("t1").await.unwrap();
        let handle = tokio::spawn(async move {
            let _p2 = map2.acquire("t1").await.unwrap();
            42
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        drop(p1);
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn released_entries_are_removed() {
        let map = ThreadLockMap::new();
        for i in 0..1000 {
            drop(map.acquire(&format!("ghost-{i}")).await.unwrap());
        }
        assert_eq!(map.thread_count(), 0);
    }

    #[tokio::test]
    async fn entry_survives_while_someone_waits() {
        let map = Arc::new(ThreadLockMap::new());
        let map2 = map.clone();

        let p1 = map.acquire("t1").await.unwrap();
        let waiter = tokio::spawn(async move {
            let p2 = map2.acquire("t1").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(p2);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(p1);
        assert_eq!(map.thread_count(), 1);

        waiter.await.unwrap();
        assert_eq!(map.thread_count(), 0);
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let map = ThreadLockMap::new();
        let held = map.acquire("busy").await.unwrap();
        map.prune_idle();
        assert_eq!(map.thread_count(), 1);
        drop(held);
        assert_eq!(map.thread_count(), 0);
    }

    #[tokio::test]
    async fn prune_sweeps_abandoned_entries() {
        let map = ThreadLockMap::new();
        let held = map.acquire("t1").await.unwrap();
        // A waiter gives up before it is granted the permit.
        let abandoned = tokio::time::timeout(Duration::from_millis(20), map.acquire("t1")).await;
        assert!(abandoned.is_err());
        drop(held);
        assert_eq!(map.thread_count(), 0);

        map.locks.lock().insert("orphan".into(), Arc::new(Semaphore::new(1)));
        map.prune_idle();
        assert_eq!(map.thread_count(), 0);
    }
}
