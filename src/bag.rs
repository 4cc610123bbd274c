use crate::board::Cell;

/// Without-replacement pool of the three base ranks. Refilled as soon as it runs dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bag([u8; 3]);

impl Default for Bag {
    fn default() -> Self {
        Bag::full()
    }
}

impl Bag {
    pub fn full() -> Self {
        Bag([1, 1, 1])
    }

    pub fn from_counts(counts: [u8; 3]) -> Self {
        Bag(counts)
    }

    pub fn counts(&self) -> [u8; 3] {
        self.0
    }

    pub fn contains(&self, rank: Cell) -> bool {
        matches!(rank, 1..=3) && self.0[rank as usize - 1] > 0
    }

    /// Mark `rank` as drawn; an exhausted bag starts the next cycle straight away.
    pub fn draw(&mut self, rank: Cell) {
        if let 1..=3 = rank {
            self.0[rank as usize - 1] = 0;
        }
        if self.0.iter().all(|&n| n == 0) {
            *self = Bag::full();
        }
    }

    /// Ranks that can still come out, in ascending order.
    pub fn remaining(&self) -> impl Iterator<Item = Cell> + Clone + '_ {
        (1..=3).filter(move |&rank| self.contains(rank))
    }
}
