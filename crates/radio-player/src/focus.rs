//! FocusRing: keyboard focus cycling between panes.

use crate::action::ComponentId;

pub struct FocusRing {
    items: Vec<ComponentId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<ComponentId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = self.current.checked_sub(1).unwrap_or(self.items.len() - 1);
        self.current()
    }

    pub fn set(&mut self, id: ComponentId) {
        if let Some(pos) = self.items.iter().position(|&x| x == id) {
            self.current = pos;
        }
    }

    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.current() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_both_ways() {
        let mut ring = FocusRing::new(vec![ComponentId::StationList, ComponentId::AddStation]);
        assert!(ring.is_focused(ComponentId::StationList));
        assert_eq!(ring.next(), Some(ComponentId::AddStation));
        assert_eq!(ring.next(), Some(ComponentId::StationList));
        assert_eq!(ring.prev(), Some(ComponentId::AddStation));
        ring.set(ComponentId::StationList);
        assert!(ring.is_focused(ComponentId::StationList));
    }

    #[test]
    fn test_empty_ring() {
        let mut ring = FocusRing::new(Vec::new());
        assert_eq!(ring.next(), None);
        assert_eq!(ring.prev(), None);
        assert_eq!(ring.current(), None);
    }
}
