use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Tile rank. 0 is empty, 1 and 2 are base tiles, rank r >= 3 shows as 3 * 2^(r-3).
pub type Cell = u8;
pub type Reward = u32;

pub const ROWS: usize = 2;
pub const COLS: usize = 3;
pub const CELLS: usize = ROWS * COLS;

/// Largest rank a cell may hold; the packed key gives each cell 4 bits.
pub const MAX_RANK: Cell = 15;

// score contributed by a single cell of each rank: 3^(rank-2) from rank 3 upward
static RANK_SCORE: Lazy<[Reward; MAX_RANK as usize + 1]> = Lazy::new(|| {
    let mut table = [0; MAX_RANK as usize + 1];
    for (rank, score) in table.iter_mut().enumerate().skip(3) {
        *score = 3_u32.pow(rank as u32 - 2);
    }
    table
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            0 => Some(Direction::Up),
            1 => Some(Direction::Right),
            2 => Some(Direction::Down),
            3 => Some(Direction::Left),
            _ => None,
        }
    }

    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// The direction that does the same thing on a board whose columns were reversed.
    pub fn mirror_horizontal(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            other => other,
        }
    }

    /// The direction that does the same thing on a board whose rows were swapped.
    pub fn mirror_vertical(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            other => other,
        }
    }

    /// Cells on the edge this slide moves away from; the next tile enters through one of them.
    pub fn vacated_cells(self) -> &'static [usize] {
        match self {
            Direction::Up => &[3, 4, 5],
            Direction::Down => &[0, 1, 2],
            Direction::Right => &[0, 3],
            Direction::Left => &[2, 5],
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("position {0} is outside the board")]
    InvalidPosition(usize),
    #[error("rank {0} cannot be placed")]
    InvalidRank(Cell),
    #[error("sliding {0:?} changes nothing")]
    IllegalSlide(Direction),
    #[error("merge would exceed rank 15")]
    RankOverflow,
}

/// 2x3 board plus the rank of the next tile (the hint, 0 when unknown).
///
/// Positions are row-major: 0 1 2 along the top row, 3 4 5 along the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Board {
    tile: [[Cell; COLS]; ROWS],
    hint: Cell,
}

impl Board {
    pub const EMPTY: Board = Board { tile: [[0; COLS]; ROWS], hint: 0 };

    pub fn new(cells: [Cell; CELLS]) -> Self {
        let [t0, t1, t2, t3, t4, t5] = cells;
        Board { tile: [[t0, t1, t2], [t3, t4, t5]], hint: 0 }
    }

    pub fn with_hint(mut self, hint: Cell) -> Self {
        self.hint = hint;
        self
    }

    pub fn hint(&self) -> Cell {
        self.hint
    }

    pub fn set_hint(&mut self, hint: Cell) {
        self.hint = hint;
    }

    pub fn cell(&self, pos: usize) -> Cell {
        self.tile[pos / COLS][pos % COLS]
    }

    pub fn cells(&self) -> [Cell; CELLS] {
        let [[t0, t1, t2], [t3, t4, t5]] = self.tile;
        [t0, t1, t2, t3, t4, t5]
    }

    /// Put a base tile (rank 1..=3) at a 1-d position.
    pub fn place(&mut self, pos: usize, rank: Cell) -> Result<(), BoardError> {
        if pos >= CELLS {
            return Err(BoardError::InvalidPosition(pos));
        }
        if !(1..=3).contains(&rank) {
            return Err(BoardError::InvalidRank(rank));
        }
        self.tile[pos / COLS][pos % COLS] = rank;
        Ok(())
    }

    /// Apply a slide and return the score it gained. The board is left untouched on error.
    pub fn slide(&mut self, dir: Direction) -> Result<Reward, BoardError> {
        let mut next = *self;
        match dir {
            Direction::Up => next.slide_up()?,
            Direction::Left => next.slide_left()?,
            Direction::Right => {
                next.reflect_horizontal();
                next.slide_left()?;
                next.reflect_horizontal();
            }
            Direction::Down => {
                next.reflect_vertical();
                next.slide_up()?;
                next.reflect_vertical();
            }
        }
        if next.tile == self.tile {
            return Err(BoardError::IllegalSlide(dir));
        }
        let reward = next.score() - self.score();
        *self = next;
        Ok(reward)
    }

    fn slide_left(&mut self) -> Result<(), BoardError> {
        for row in self.tile.iter_mut() {
            for c in 1..COLS {
                if let Some(merged) = merge(row[c - 1], row[c])? {
                    row[c - 1] = merged;
                    row[c] = 0;
                }
            }
        }
        Ok(())
    }

    fn slide_up(&mut self) -> Result<(), BoardError> {
        let [top, bottom] = &mut self.tile;
        for (lead, trail) in top.iter_mut().zip(bottom.iter_mut()) {
            if let Some(merged) = merge(*lead, *trail)? {
                *lead = merged;
                *trail = 0;
            }
        }
        Ok(())
    }

    pub fn reflect_horizontal(&mut self) {
        for row in self.tile.iter_mut() {
            row.swap(0, COLS - 1);
        }
    }

    pub fn reflect_vertical(&mut self) {
        self.tile.swap(0, 1);
    }

    pub fn score(&self) -> Reward {
        self.tile.iter().flatten().map(|&t| RANK_SCORE[t as usize]).sum()
    }

    pub fn is_terminal(&self) -> bool {
        Direction::ALL.iter().all(|&dir| {
            let mut probe = *self;
            matches!(probe.slide(dir), Err(BoardError::IllegalSlide(_)))
        })
    }
}

// what the leading cell of a pair becomes when the trailing cell moves into it, or None if the pair stays
fn merge(lead: Cell, trail: Cell) -> Result<Option<Cell>, BoardError> {
    Ok(match (lead, trail) {
        (0, t) => Some(t),
        (1, 2) | (2, 1) => Some(3),
        (a, b) if a == b && a >= 3 => {
            if a >= MAX_RANK {
                return Err(BoardError::RankOverflow);
            }
            Some(a + 1)
        }
        _ => None,
    })
}
