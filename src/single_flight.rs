use std::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};

use dashmap::{mapref::entry::Entry, DashMap};
use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use tracing::trace;

use crate::RegistryResult;

type InFlight<V> = Shared<BoxFuture<'static, RegistryResult<V>>>;

enum Slot<V> {
    Ready(V),
    Pending { generation: u64, future: InFlight<V> },
}

/// Compute-once cache: concurrent callers for the same key share a single
/// construction. Successful values are kept, failures are handed to every
/// waiter and then forgotten.
pub(crate) struct SingleFlight<V> {
    slots: DashMap<String, Slot<V>>,
    generation: AtomicU64,
}

impl<V> Default for SingleFlight<V> {
    fn default() -> Self {
        SingleFlight {
            slots: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }
}

impl<V> SingleFlight<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn get(&self, key: &str) -> Option<V> {
        match self.slots.get(key)?.value() {
            Slot::Ready(value) => Some(value.clone()),
            Slot::Pending { .. } => None,
        }
    }

    pub(crate) async fn get_or_try_init<F, Fut>(&self, key: &str, init: F) -> RegistryResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RegistryResult<V>> + Send + 'static,
    {
        let (generation, future) = match self.lookup(key) {
            Some(Ok(value)) => return Ok(value),
            Some(Err(pending)) => pending,
            None => match self.slots.entry(key.to_owned()) {
                Entry::Occupied(entry) => match entry.get() {
                    Slot::Ready(value) => return Ok(value.clone()),
                    Slot::Pending { generation, future } => (*generation, future.clone()),
                },
                Entry::Vacant(entry) => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                    // init only builds the future, it is polled outside the lock
                    let future = init().boxed().shared();
                    entry.insert(Slot::Pending {
                        generation,
                        future: future.clone(),
                    });
                    trace!(key, generation, "construction started");
                    (generation, future)
                }
            },
        };

        let result = future.await;
        self.settle(key, generation, &result);
        result
    }

    fn lookup(&self, key: &str) -> Option<Result<V, (u64, InFlight<V>)>> {
        let slot = self.slots.get(key)?;
        Some(match slot.value() {
            Slot::Ready(value) => Ok(value.clone()),
            Slot::Pending { generation, future } => Err((*generation, future.clone())),
        })
    }

    /// Replaces the pending slot of `generation` with its outcome. Later
    /// generations started after a failure are left alone.
    fn settle(&self, key: &str, generation: u64, result: &RegistryResult<V>) {
        if let Entry::Occupied(mut entry) = self.slots.entry(key.to_owned()) {
            let current = matches!(
                entry.get(),
                Slot::Pending { generation: pending, .. } if *pending == generation
            );
            if !current {
                return;
            }
            match result {
                Ok(value) => {
                    entry.insert(Slot::Ready(value.clone()));
                }
                Err(_) => {
                    trace!(key, generation, "construction failed, slot cleared");
                    entry.remove();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    use tokio::sync::Notify;

    use super::SingleFlight;
    use crate::error::RegistryError;

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_callers_share_one_construction() {
        let flight = Arc::new(SingleFlight::<Arc<String>>::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let flight = flight.clone();
            let calls = calls.clone();
            let gate = gate.clone();
            tasks.push(tokio::spawn(async move {
                flight
                    .get_or_try_init("key", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Ok(Arc::new("value".to_owned()))
                    })
                    .await
            }));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.notify_one();

        let mut values = Vec::new();
        for task in tasks {
            values.push(task.await.unwrap().unwrap());
        }

        assert_eq!(1, calls.load(Ordering::SeqCst));
        assert!(values.iter().all(|value| Arc::ptr_eq(value, &values[0])));
        assert!(flight.get("key").is_some());
    }

    #[tokio::test]
    async fn failures_are_not_memoized() {
        let flight = SingleFlight::<Arc<String>>::default();

        let err = flight
            .get_or_try_init("key", || async {
                Err(RegistryError::UnknownFactory("key".to_owned()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownFactory(_)));
        assert!(flight.get("key").is_none());

        let value = flight
            .get_or_try_init("key", || async { Ok(Arc::new("value".to_owned())) })
            .await
            .unwrap();
        assert_eq!("value", value.as_str());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failure_reaches_every_waiter() {
        let flight = Arc::new(SingleFlight::<Arc<String>>::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let flight = flight.clone();
            let calls = calls.clone();
            let gate = gate.clone();
            tasks.push(tokio::spawn(async move {
                flight
                    .get_or_try_init("key", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Err(RegistryError::UnknownFactory("key".to_owned()))
                    })
                    .await
            }));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.notify_one();

        for task in tasks {
            assert!(task.await.unwrap().is_err());
        }
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let flight = SingleFlight::<Arc<String>>::default();

        let a = flight
            .get_or_try_init("a", || async { Ok(Arc::new("a".to_owned())) })
            .await
            .unwrap();
        let b = flight
            .get_or_try_init("b", || async { Ok(Arc::new("b".to_owned())) })
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
    }
}
