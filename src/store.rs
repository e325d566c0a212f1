#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineSlot {
    // None while the slot has never been filled
    pub tag: Option<u64>,
    pub dirty: bool,
}

/// The set x way grid of line slots, stored row-major in one allocation.
#[derive(Debug)]
pub struct CacheStore {
    associativity: usize,
    slots: Vec<LineSlot>,
}

impl CacheStore {
    pub const SLOT_BYTES: usize = size_of::<LineSlot>();

    pub fn new(num_sets: usize, associativity: usize) -> Self {
        CacheStore {
            associativity,
            slots: vec![LineSlot::default(); num_sets * associativity],
        }
    }

    pub fn set(&self, set: usize) -> &[LineSlot] {
        let start = set * self.associativity;
        &self.slots[start..start + self.associativity]
    }

    fn slot_mut(&mut self, set: usize, way: usize) -> &mut LineSlot {
        assert!(way < self.associativity, "way {} out of range", way);
        &mut self.slots[set * self.associativity + way]
    }

    /// Returns the way holding `tag` in `set`, scanning ways in ascending order.
    pub fn lookup(&self, set: usize, tag: u64) -> Option<usize> {
        let lines = self.set(set);
        let way = lines.iter().position(|line| line.tag == Some(tag))?;
        assert!(
            lines[way + 1..].iter().all(|line| line.tag != Some(tag)),
            "tag {:#x} resident twice in set {}",
            tag,
            set
        );
        Some(way)
    }

    pub fn first_empty_way(&self, set: usize) -> Option<usize> {
        self.set(set).iter().position(|line| line.tag.is_none())
    }

    pub fn install(&mut self, set: usize, way: usize, tag: u64, dirty: bool) {
        *self.slot_mut(set, way) = LineSlot {
            tag: Some(tag),
            dirty,
        };
    }

    pub fn tag(&self, set: usize, way: usize) -> Option<u64> {
        self.set(set)[way].tag
    }

    pub fn is_dirty(&self, set: usize, way: usize) -> bool {
        self.set(set)[way].dirty
    }

    pub fn set_dirty(&mut self, set: usize, way: usize, dirty: bool) {
        self.slot_mut(set, way).dirty = dirty;
    }

    /// Number of dirty lines across every set.
    pub fn dirty_lines(&self) -> usize {
        self.slots.iter().filter(|line| line.dirty).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slots_never_match() {
        let store = CacheStore::new(2, 2);
        assert_eq!(store.lookup(0, 0), None);
        assert_eq!(store.first_empty_way(1), Some(0));
        assert_eq!(store.dirty_lines(), 0);
    }

    #[test]
    fn install_fills_lowest_way_first() {
        let mut store = CacheStore::new(1, 3);
        let way = store.first_empty_way(0).unwrap();
        store.install(0, way, 0x40, false);
        assert_eq!(way, 0);
        assert_eq!(store.first_empty_way(0), Some(1));
        assert_eq!(store.lookup(0, 0x40), Some(0));
        assert_eq!(store.tag(0, 0), Some(0x40));
    }

    #[test]
    fn tag_max_is_an_ordinary_tag() {
        let mut store = CacheStore::new(1, 2);
        store.install(0, 1, u64::MAX, false);
        assert_eq!(store.lookup(0, u64::MAX), Some(1));
        assert_eq!(store.first_empty_way(0), Some(0));
    }

    #[test]
    fn sets_are_independent() {
        let mut store = CacheStore::new(2, 1);
        store.install(1, 0, 7, true);
        assert_eq!(store.lookup(0, 7), None);
        assert_eq!(store.lookup(1, 7), Some(0));
        assert!(store.is_dirty(1, 0));
        assert!(!store.is_dirty(0, 0));
    }

    #[test]
    #[should_panic(expected = "resident twice")]
    fn duplicate_tag_in_set_panics() {
        let mut store = CacheStore::new(1, 2);
        store.install(0, 0, 9, false);
        store.install(0, 1, 9, false);
        store.lookup(0, 9);
    }

    #[test]
    fn dirty_flag_round_trip() {
        let mut store = CacheStore::new(1, 2);
        store.install(0, 0, 1, false);
        store.set_dirty(0, 0, true);
        assert_eq!(store.dirty_lines(), 1);
        store.set_dirty(0, 0, false);
        assert_eq!(store.dirty_lines(), 0);
    }
}
