use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Cell, Direction, CELLS, MAX_RANK};
use crate::state::Action;

pub type Value = f32;
pub type Key = u32;

pub const CELL_BITS: u32 = 4;
pub const HINT_BITS: u32 = 2;
pub const ACTION_BITS: u32 = 3;
pub const KEY_BITS: u32 = CELLS as u32 * CELL_BITS + HINT_BITS + ACTION_BITS;

const SNAPSHOT_VERSION: u32 = 1;

/// Final-score statistics of a state: worst, expected and best outcome under the policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub min: Value,
    pub avg: Value,
    pub max: Value,
}

impl Answer {
    /// Marks a state nobody has evaluated; prints as `-1`.
    pub const UNSET: Answer = Answer { min: Value::NAN, avg: Value::NAN, max: Value::NAN };

    pub fn new(min: Value, avg: Value, max: Value) -> Self {
        Answer { min, avg, max }
    }

    pub fn exact(score: Value) -> Self {
        Answer { min: score, avg: score, max: score }
    }

    pub fn is_set(&self) -> bool {
        !self.avg.is_nan()
    }
}

impl Default for Answer {
    fn default() -> Self {
        Answer::UNSET
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            write!(f, "{} {} {}", self.min, self.avg, self.max)
        } else {
            write!(f, "-1")
        }
    }
}

/// The reflections of a 2x3 grid. Each one is its own inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symmetry {
    Identity,
    /// swap the two rows
    Vertical,
    /// reverse every row
    Horizontal,
    Both,
}

impl Symmetry {
    /// Probe order used on lookup.
    pub const ALL: [Symmetry; 4] = [Symmetry::Identity, Symmetry::Vertical, Symmetry::Horizontal, Symmetry::Both];

    pub fn apply_cells(self, cells: [Cell; CELLS]) -> [Cell; CELLS] {
        let [t0, t1, t2, t3, t4, t5] = cells;
        match self {
            Symmetry::Identity => cells,
            Symmetry::Vertical => [t3, t4, t5, t0, t1, t2],
            Symmetry::Horizontal => [t2, t1, t0, t5, t4, t3],
            Symmetry::Both => [t5, t4, t3, t2, t1, t0],
        }
    }

    /// Slide tags reflect with the cells: a left slide seen in a mirror is a right slide.
    pub fn apply_action(self, action: Action) -> Action {
        match action {
            Action::Place => Action::Place,
            Action::Slide(dir) => Action::Slide(self.apply_direction(dir)),
        }
    }

    pub fn apply_direction(self, dir: Direction) -> Direction {
        match self {
            Symmetry::Identity => dir,
            Symmetry::Vertical => dir.mirror_vertical(),
            Symmetry::Horizontal => dir.mirror_horizontal(),
            Symmetry::Both => dir.mirror_vertical().mirror_horizontal(),
        }
    }

    pub fn apply(self, board: &Board) -> Board {
        Board::new(self.apply_cells(board.cells())).with_hint(board.hint())
    }

    /// The reflection of `board` with the smallest packed cells. Every member of a class maps to it.
    pub fn canonical(board: &Board) -> Board {
        Symmetry::ALL.iter().map(|sym| sym.apply(board)).min_by_key(Board::cells).unwrap_or(*board)
    }
}

/// Pack cells, hint and action tag into a table key, most significant cell first.
///
/// `None` when a field does not fit its width: a cell above [`MAX_RANK`] or a hint outside 1..=3.
pub fn pack(cells: [Cell; CELLS], hint: Cell, action: Action) -> Option<Key> {
    if !(1..=3).contains(&hint) || cells.iter().any(|&c| c > MAX_RANK) {
        return None;
    }
    let mut key: Key = 0;
    for cell in cells {
        key = (key << CELL_BITS) | Key::from(cell);
    }
    key = (key << HINT_BITS) | Key::from(hint - 1);
    Some((key << ACTION_BITS) | Key::from(action.code()))
}

/// Inverse of [`pack`]. Returns `None` for an action field that names no transition.
pub fn unpack(key: Key) -> Option<(Board, Action)> {
    let action = Action::from_code((key & ((1 << ACTION_BITS) - 1)) as u8)?;
    let mut rest = key >> ACTION_BITS;
    let hint = (rest & ((1 << HINT_BITS) - 1)) as Cell + 1;
    rest >>= HINT_BITS;
    let mut cells = [0; CELLS];
    for cell in cells.iter_mut().rev() {
        *cell = (rest & ((1 << CELL_BITS) - 1)) as Cell;
        rest >>= CELL_BITS;
    }
    Some((Board::new(cells).with_hint(hint), action))
}

fn key_of(board: &Board, action: Action) -> Option<Key> {
    pack(board.cells(), board.hint(), action)
}

#[derive(thiserror::Error, Debug)]
pub enum TableError {
    #[error("key {0:#x} already holds an answer")]
    Overwrite(Key),
    #[error("state {0:?} does not fit the key layout")]
    OutOfRange(Board),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("snapshot version {0} is not supported")]
    Version(u32),
}

/// Memo store keyed by the packed state. Every key is written at most once.
///
/// Only one member of each symmetry class is ever stored; [`TranspositionTable::probe`]
/// finds it from any of the others.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TranspositionTable {
    entries: FxHashMap<Key, Answer>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup without symmetry.
    pub fn get(&self, board: &Board, action: Action) -> Option<Answer> {
        key_of(board, action).and_then(|key| self.entries.get(&key).copied())
    }

    /// First stored answer among the reflections of the state, with the tag reflected alongside.
    pub fn probe(&self, board: &Board, action: Action) -> Option<Answer> {
        let cells = board.cells();
        Symmetry::ALL.iter().find_map(|&sym| {
            let key = pack(sym.apply_cells(cells), board.hint(), sym.apply_action(action))?;
            self.entries.get(&key).copied()
        })
    }

    /// Store under the state's own key.
    pub fn insert(&mut self, board: &Board, action: Action, answer: Answer) -> Result<(), TableError> {
        let key = key_of(board, action).ok_or(TableError::OutOfRange(*board))?;
        if self.entries.contains_key(&key) {
            return Err(TableError::Overwrite(key));
        }
        self.entries.insert(key, answer);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, Answer)> + '_ {
        self.entries.iter().map(|(&key, &answer)| (key, answer))
    }

    pub fn save<T: Serialize>(&self, path: &Path, meta: &T) -> Result<(), TableError> {
        let mut f = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut f, &SNAPSHOT_VERSION)?;
        bincode::serialize_into(&mut f, meta)?;
        bincode::serialize_into(&mut f, self)?;
        f.flush()?;
        Ok(())
    }

    pub fn load<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<(Self, T), TableError> {
        let mut f = BufReader::new(File::open(path)?);
        let version: u32 = bincode::deserialize_from(&mut f)?;
        if version != SNAPSHOT_VERSION {
            return Err(TableError::Version(version));
        }
        let meta: T = bincode::deserialize_from(&mut f)?;
        let table: Self = bincode::deserialize_from(&mut f)?;
        Ok((table, meta))
    }
}
