/// Doubly linked list of the watchers taking part in dispatch.
///
/// The list threads through slab indices; the slab owns the watchers and the
/// registry only holds linkage. Insertion is at the head, so a pass visits
/// the most recently started watcher first.
///
/// A dispatcher pass walks the list with [`begin_pass`](Self::begin_pass)
/// and [`next_in_pass`](Self::next_in_pass). The successor of the node being
/// visited is captured before its callback runs, and [`remove`](Self::remove)
/// advances that captured successor when it unlinks it, so callbacks may
/// remove any node, including the current one, without breaking the walk.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    links: Vec<Link>,
    head: Option<usize>,
    cursor: Option<usize>,
    len: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Link {
    prev: Option<usize>,
    next: Option<usize>,
    linked: bool,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Links `index` at the head. Returns `false` if it was already linked.
    pub(crate) fn insert(&mut self, index: usize) -> bool {
        if self.contains(index) {
            return false;
        }

        if self.links.len() <= index {
            self.links.resize(index + 1, Link::default());
        }

        self.links[index] = Link {
            prev: None,
            next: self.head,
            linked: true,
        };

        if let Some(head) = self.head {
            self.links[head].prev = Some(index);
        }

        self.head = Some(index);
        self.len += 1;

        true
    }

    /// Unlinks `index`. Removing an absent node is a no-op returning `false`.
    pub(crate) fn remove(&mut self, index: usize) -> bool {
        if !self.contains(index) {
            return false;
        }

        let Link { prev, next, .. } = self.links[index];

        if self.cursor == Some(index) {
            self.cursor = next;
        }

        match prev {
            Some(prev) => self.links[prev].next = next,
            None => self.head = next,
        }

        if let Some(next) = next {
            self.links[next].prev = prev;
        }

        self.links[index] = Link::default();
        self.len -= 1;

        true
    }

    pub(crate) fn contains(&self, index: usize) -> bool {
        self.links.get(index).is_some_and(|link| link.linked)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Starts a pass at the head of the list.
    pub(crate) fn begin_pass(&mut self) {
        self.cursor = self.head;
    }

    /// Returns the next node of the current pass and captures its successor.
    pub(crate) fn next_in_pass(&mut self) -> Option<usize> {
        let current = self.cursor?;
        self.cursor = self.links[current].next;
        Some(current)
    }

    /// Snapshot of the list in visiting order.
    pub(crate) fn indices(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len);
        let mut node = self.head;

        while let Some(index) = node {
            out.push(index);
            node = self.links[index].next;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;

    fn pass(registry: &mut Registry) -> Vec<usize> {
        let mut seen = Vec::new();
        registry.begin_pass();
        while let Some(index) = registry.next_in_pass() {
            seen.push(index);
        }
        seen
    }

    #[test]
    fn test_head_insertion_order() {
        let mut registry = Registry::new();
        registry.insert(0);
        registry.insert(1);
        registry.insert(2);

        assert_eq!(registry.indices(), vec![2, 1, 0]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_insert_and_remove_are_idempotent() {
        let mut registry = Registry::new();

        assert!(registry.insert(3));
        assert!(!registry.insert(3));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(3));
        assert!(!registry.remove(3));
        assert!(!registry.remove(42));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_middle_relinks() {
        let mut registry = Registry::new();
        for index in 0..4 {
            registry.insert(index);
        }

        registry.remove(2);
        assert_eq!(registry.indices(), vec![3, 1, 0]);

        registry.remove(3);
        assert_eq!(registry.indices(), vec![1, 0]);

        registry.remove(0);
        assert_eq!(registry.indices(), vec![1]);
    }

    #[test]
    fn test_remove_current_during_pass() {
        let mut registry = Registry::new();
        for index in 0..3 {
            registry.insert(index);
        }

        let mut seen = Vec::new();
        registry.begin_pass();
        while let Some(index) = registry.next_in_pass() {
            seen.push(index);
            registry.remove(index);
        }

        assert_eq!(seen, vec![2, 1, 0]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_successor_during_pass() {
        let mut registry = Registry::new();
        for index in 0..4 {
            registry.insert(index);
        }

        // Visiting 3 removes 2, which is the captured successor.
        let mut seen = Vec::new();
        registry.begin_pass();
        while let Some(index) = registry.next_in_pass() {
            seen.push(index);
            if index == 3 {
                registry.remove(2);
            }
        }

        assert_eq!(seen, vec![3, 1, 0]);
    }

    #[test]
    fn test_insert_during_pass_is_not_visited() {
        let mut registry = Registry::new();
        registry.insert(0);
        registry.insert(1);

        let mut seen = Vec::new();
        registry.begin_pass();
        while let Some(index) = registry.next_in_pass() {
            seen.push(index);
            registry.insert(7);
        }

        assert_eq!(seen, vec![1, 0]);
        assert_eq!(pass(&mut registry), vec![7, 1, 0]);
    }
}
