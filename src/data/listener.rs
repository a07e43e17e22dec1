use std::rc::{Rc, Weak};

use crate::data::Dataset;

/// Observer of dataset lifecycle and content changes.
///
/// Callbacks run synchronously on the thread that mutated the dataset.
pub trait DatasetListener {
    fn on_dataset_added(&self, _dataset: &dyn Dataset) {}

    fn on_dataset_removed(&self, _dataset: &dyn Dataset, _index: usize) {}

    /// `domain_start..=domain_end` is the span whose samples changed; both
    /// ends are equal for single-point mutations.
    fn on_dataset_changed(&self, dataset: &dyn Dataset, domain_start: f64, domain_end: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Registration-ordered list of weakly held listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Vec<(ListenerId, Weak<dyn DatasetListener>)>,
    next_id: u64,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Rc<dyn DatasetListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Rc::downgrade(&listener)));
        id
    }

    /// Unregisters a listener. Returns `true` when it was registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        if let Some(position) = self.entries.iter().position(|(entry, _)| *entry == id) {
            self.entries.remove(position);
            return true;
        }
        false
    }

    /// Live listeners in registration order. Entries whose listener has been
    /// dropped are pruned.
    ///
    /// Notifying from this snapshot keeps dispatch well defined even if a
    /// callback ends up changing the registry.
    pub fn snapshot(&mut self) -> Vec<Rc<dyn DatasetListener>> {
        self.entries.retain(|(_, listener)| listener.strong_count() > 0);
        self.entries
            .iter()
            .filter_map(|(_, listener)| listener.upgrade())
            .collect()
    }

    pub fn notify_changed(&mut self, dataset: &dyn Dataset, domain_start: f64, domain_end: f64) {
        for listener in self.snapshot() {
            listener.on_dataset_changed(dataset, domain_start, domain_end);
        }
    }

    pub fn notify_added(&mut self, dataset: &dyn Dataset) {
        for listener in self.snapshot() {
            listener.on_dataset_added(dataset);
        }
    }

    pub fn notify_removed(&mut self, dataset: &dyn Dataset, index: usize) {
        for listener in self.snapshot() {
            listener.on_dataset_removed(dataset, index);
        }
    }

    /// Number of registered listeners that are still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, listener)| listener.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
