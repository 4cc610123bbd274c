//! Exact final-score statistics (min, mean, max) for every reachable position of
//! Threes on a 2x3 grid, computed once by retrograde analysis and then served
//! from a transposition table.

pub mod bag;
pub mod board;
pub mod solver;
pub mod state;
pub mod table;
pub mod text;

pub use bag::Bag;
pub use board::{Board, BoardError, Cell, Direction, Reward};
pub use solver::{Policy, Root, SolveError, Solver, SolverConfig};
pub use state::{Action, StateType};
pub use table::{Answer, TranspositionTable};
pub use text::{ParseError, Query};
