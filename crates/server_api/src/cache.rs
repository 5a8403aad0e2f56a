use std::collections::{HashMap, VecDeque};

use shared::domain::ClassificationRequest;

/// Raw collaborator responses keyed by the exact trimmed request.
///
/// A capacity of zero keeps every response for the life of the session;
/// otherwise the oldest insertion is dropped once the cache is full.
#[derive(Debug, Default)]
pub struct ResponseCache {
    capacity: usize,
    entries: HashMap<ClassificationRequest, String>,
    order: VecDeque<ClassificationRequest>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, request: &ClassificationRequest) -> Option<&str> {
        self.entries.get(request).map(String::as_str)
    }

    pub fn insert(&mut self, request: ClassificationRequest, raw: String) {
        if self.entries.insert(request.clone(), raw).is_some() {
            return;
        }
        self.order.push_back(request);
        if self.capacity == 0 {
            return;
        }
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
