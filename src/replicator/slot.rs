//! In-process single-slot mailbox.

use super::{boxed_copy, Maker, Reading, ReplicatorError, Taker};
use bytemuck::Pod;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug)]
struct Latest<T> {
    generation: u64,
    value: Arc<T>,
}

type Shared<T> = Arc<RwLock<Option<Latest<T>>>>;

/// Creates a connected writer/reader pair around one empty slot.
pub fn channel<T>() -> (SlotWriter<T>, SlotReader<T>) {
    let shared: Shared<T> = Arc::new(RwLock::new(None));
    (
        SlotWriter {
            shared: shared.clone(),
            generation: 0,
        },
        SlotReader {
            shared,
            seen: 0,
        },
    )
}

/// Single producer handle. Each store swaps in a whole record.
#[derive(Debug)]
pub struct SlotWriter<T> {
    shared: Shared<T>,
    generation: u64,
}

impl<T> SlotWriter<T> {
    pub fn store(&mut self, value: Arc<T>) {
        self.generation += 1;
        let latest = Latest {
            generation: self.generation,
            value,
        };
        // the previous record is dropped after the lock is released
        let _previous = self.shared.write().replace(latest);
    }

    pub fn reader(&self) -> SlotReader<T> {
        SlotReader {
            shared: self.shared.clone(),
            seen: 0,
        }
    }
}

impl<T: Pod + Send + Sync> Maker<T> for SlotWriter<T> {
    fn publish(&mut self, value: &T) -> Result<(), ReplicatorError> {
        self.store(Arc::from(boxed_copy(value)));
        Ok(())
    }
}

/// Consumer handle. Clones track freshness independently.
#[derive(Debug)]
pub struct SlotReader<T> {
    shared: Shared<T>,
    seen: u64,
}

impl<T> Clone for SlotReader<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            seen: self.seen,
        }
    }
}

impl<T> SlotReader<T> {
    pub fn read(&mut self) -> Reading<T> {
        let guard = self.shared.read();
        match guard.as_ref() {
            None => Reading::Empty,
            Some(latest) if latest.generation != self.seen => {
                self.seen = latest.generation;
                Reading::Fresh(latest.value.clone())
            }
            Some(latest) => Reading::Stale(latest.value.clone()),
        }
    }
}

impl<T: Send + Sync> Taker<T> for SlotReader<T> {
    fn poll(&mut self) -> Reading<T> {
        self.read()
    }
}
