use crate::bolt::BoltEntity;
use cgmath::Vector3;
use std::collections::VecDeque;

/// Live bolts, oldest first.
///
/// Bolts enter at the back and leave only from the front once expired, so
/// indices always follow creation order.
#[derive(Debug, Default)]
pub struct BoltCollection {
    bolts: VecDeque<BoltEntity>,
}

impl BoltCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bolts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bolts.is_empty()
    }

    pub fn push_back(&mut self, bolt: BoltEntity) {
        self.bolts.push_back(bolt);
    }

    pub fn front(&self) -> Option<&BoltEntity> {
        self.bolts.front()
    }

    pub fn get(&self, index: usize) -> Option<&BoltEntity> {
        self.bolts.get(index)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &BoltEntity> + '_ {
        self.bolts.iter()
    }

    pub fn tick(&mut self, dt: f64, nucleus: Vector3<f32>) {
        for bolt in self.bolts.iter_mut() {
            bolt.tick(dt, nucleus);
        }
    }

    /// Drops expired bolts from the front and returns how many were dropped.
    ///
    /// An expired bolt behind a live one stays until it reaches the front.
    pub fn retire_expired_front(&mut self) -> usize {
        let mut retired = 0;
        while self.bolts.front().is_some_and(BoltEntity::is_expired) {
            self.bolts.pop_front();
            retired += 1;
        }
        retired
    }
}
