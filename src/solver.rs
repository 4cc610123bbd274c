//! Retrograde evaluation of every reachable 2x3 position.
//!
//! The build walks the state graph depth first from its roots. Before-states (player to move)
//! take the branch the [`Policy`] prefers; after-states (tile about to drop) fold every
//! placement-and-next-hint branch into min/mean/max. Each symmetry class is expanded once:
//! a child already in the table, under any reflection, is folded in without being opened.
//!
//! The graph has no cycles. A slide keeps the tile total, a placement raises it, and a
//! before-state is only reached through a placement, so the explicit stack never holds two
//! members of one class.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use itertools::iproduct;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::bag::Bag;
use crate::board::{Board, BoardError, Direction};
use crate::state::{classify, Action, StateError, StateType};
use crate::table::{Answer, Symmetry, TableError, TranspositionTable, Value};

/// How a before-state picks among its legal slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Policy {
    /// highest expected final score
    #[default]
    Expectation,
    /// highest guaranteed final score
    Maximin,
}

impl Policy {
    // strictly better only, so the first branch found wins a tie
    fn prefers(self, candidate: &Answer, incumbent: &Answer) -> bool {
        match self {
            Policy::Expectation => candidate.avg > incumbent.avg,
            Policy::Maximin => candidate.min > incumbent.min,
        }
    }
}

/// A state the build starts from, with the bag it is reached with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Root {
    pub board: Board,
    pub action: Action,
    pub bag: Bag,
}

impl Root {
    /// Empty board waiting for its first tile (a 1) after an up slide.
    pub fn opening() -> Self {
        Root { board: Board::EMPTY.with_hint(1), action: Action::Slide(Direction::Up), bag: Bag::full() }
    }
}

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub policy: Policy,
    pub roots: Vec<Root>,
    pub show_progress: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig { policy: Policy::default(), roots: vec![Root::opening()], show_progress: false }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SolveError {
    #[error("solver has not been built")]
    NotBuilt,
    #[error("solver is already built")]
    AlreadyBuilt,
    #[error(transparent)]
    State(#[from] StateError),
    #[error("no stored answer for {kind:?} state {board:?}")]
    Unresolved { board: Board, kind: StateType },
    #[error("after-state {board:?} tagged {action:?} has no empty cell to place the hint")]
    NoPlacement { board: Board, action: Action },
    #[error("snapshot was built with {stored:?} policy, not {requested:?}")]
    PolicyMismatch { stored: Policy, requested: Policy },
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Serialize, Deserialize)]
struct SnapshotMeta {
    policy: Policy,
}

/// Build-once, query-many solver over a transposition table.
pub struct Solver {
    config: SolverConfig,
    table: TranspositionTable,
    built: bool,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Solver { config, table: TranspositionTable::new(), built: false }
    }

    /// Restore a solver from a snapshot written by [`Solver::save`]; it comes back built.
    pub fn load(path: &Path) -> Result<Self, SolveError> {
        let (table, meta): (TranspositionTable, SnapshotMeta) = TranspositionTable::load(path)?;
        info!("loaded {} states from {}", table.len(), path.display());
        let config = SolverConfig { policy: meta.policy, ..SolverConfig::default() };
        Ok(Solver { config, table, built: true })
    }

    pub fn save(&self, path: &Path) -> Result<(), SolveError> {
        if !self.built {
            return Err(SolveError::NotBuilt);
        }
        self.table.save(path, &SnapshotMeta { policy: self.config.policy })?;
        info!("saved {} states to {}", self.table.len(), path.display());
        Ok(())
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Fails when the table was built under a different policy than `requested`.
    pub fn require_policy(&self, requested: Policy) -> Result<(), SolveError> {
        let stored = self.config.policy;
        if stored != requested {
            return Err(SolveError::PolicyMismatch { stored, requested });
        }
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn table(&self) -> &TranspositionTable {
        &self.table
    }

    /// Expand everything reachable from the configured roots.
    pub fn build(&mut self) -> Result<(), SolveError> {
        let roots = self.config.roots.clone();
        self.build_from(&roots)
    }

    /// Expand everything reachable from `roots`. Runs once per solver; any error is fatal
    /// and leaves the solver unbuilt.
    pub fn build_from(&mut self, roots: &[Root]) -> Result<(), SolveError> {
        if self.built {
            return Err(SolveError::AlreadyBuilt);
        }
        let progress = if self.config.show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner} {elapsed_precise} | states: {pos}"));
            pb
        } else {
            ProgressBar::hidden()
        };
        info!("building from {} root(s) with {:?} policy", roots.len(), self.config.policy);
        for root in roots {
            let answer = self.expand(root, &progress)?;
            debug!("root {:?} {:?} => {}", root.board, root.action, answer);
        }
        progress.finish_and_clear();
        info!("build finished: {} states stored", self.table.len());
        self.built = true;
        Ok(())
    }

    /// Answer for a position as the driver describes it, from stored results only.
    pub fn solve(&self, board: &Board, kind: StateType) -> Result<Answer, SolveError> {
        if !self.built {
            return Err(SolveError::NotBuilt);
        }
        let actions = classify(board, kind)?;
        // mirrored after-states try the slide tags in the same order from one representative
        let canonical = Symmetry::canonical(board);
        actions
            .iter()
            .find_map(|&action| self.table.probe(&canonical, action))
            .ok_or(SolveError::Unresolved { board: *board, kind })
    }

    /// Answer for a state whose producing action is known.
    pub fn lookup(&self, board: &Board, action: Action) -> Result<Answer, SolveError> {
        if !self.built {
            return Err(SolveError::NotBuilt);
        }
        if !(1..=3).contains(&board.hint()) {
            return Err(StateError::MissingHint(board.hint()).into());
        }
        self.table
            .probe(board, action)
            .ok_or(SolveError::Unresolved { board: *board, kind: action.state_type() })
    }

    fn expand(&mut self, root: &Root, progress: &ProgressBar) -> Result<Answer, SolveError> {
        let start = Node { board: root.board, action: root.action, bag: root.bag };
        if !(1..=3).contains(&start.board.hint()) {
            return Err(StateError::MissingHint(start.board.hint()).into());
        }
        if let Some(answer) = self.table.probe(&start.board, start.action) {
            return Ok(answer);
        }
        let policy = self.config.policy;
        let mut stack = vec![Frame::open(start, policy)?];
        while let Some(frame) = stack.last_mut() {
            if let Some(child) = frame.pending() {
                match self.table.probe(&child.board, child.action) {
                    Some(answer) => frame.fold(answer),
                    None => stack.push(Frame::open(child, policy)?),
                }
                continue;
            }
            let Some(done) = stack.pop() else { break };
            let answer = done.finish()?;
            trace!("store {:?} {:?} => {}", done.node.board, done.node.action, answer);
            self.table.insert(&done.node.board, done.node.action, answer)?;
            progress.inc(1);
            match stack.last_mut() {
                Some(parent) => parent.fold(answer),
                None => return Ok(answer),
            }
        }
        Err(SolveError::Unresolved { board: root.board, kind: root.action.state_type() })
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    board: Board,
    action: Action,
    bag: Bag,
}

enum Fold {
    Decision { policy: Policy, best: Option<Answer> },
    Chance { count: u32, sum: f64, min: Value, max: Value },
}

/// One state on the explicit stack: its children and what has been folded so far.
struct Frame {
    node: Node,
    children: Vec<Node>,
    next: usize,
    fold: Fold,
}

impl Frame {
    fn open(node: Node, policy: Policy) -> Result<Self, SolveError> {
        let (children, fold) = match node.action {
            Action::Place => (decisions(&node)?, Fold::Decision { policy, best: None }),
            Action::Slide(dir) => {
                let children = placements(&node, dir)?;
                if children.is_empty() {
                    return Err(SolveError::NoPlacement { board: node.board, action: node.action });
                }
                (children, Fold::Chance { count: 0, sum: 0.0, min: Value::INFINITY, max: Value::NEG_INFINITY })
            }
        };
        Ok(Frame { node, children, next: 0, fold })
    }

    fn pending(&self) -> Option<Node> {
        self.children.get(self.next).copied()
    }

    fn fold(&mut self, answer: Answer) {
        self.next += 1;
        match &mut self.fold {
            Fold::Decision { policy, best } => {
                if best.map_or(true, |incumbent| policy.prefers(&answer, &incumbent)) {
                    *best = Some(answer);
                }
            }
            Fold::Chance { count, sum, min, max } => {
                *count += 1;
                *sum += f64::from(answer.avg);
                *min = min.min(answer.min);
                *max = max.max(answer.max);
            }
        }
    }

    fn finish(&self) -> Result<Answer, SolveError> {
        match self.fold {
            Fold::Decision { best: Some(best), .. } => Ok(best),
            // no legal slide: the game is over and the score is final
            Fold::Decision { best: None, .. } => Ok(Answer::exact(self.node.board.score() as Value)),
            Fold::Chance { count: 0, .. } => Err(SolveError::NoPlacement { board: self.node.board, action: self.node.action }),
            Fold::Chance { count, sum, min, max } => Ok(Answer::new(min, (sum / f64::from(count)) as Value, max)),
        }
    }
}

// every legal slide of a before-state, in opcode order
fn decisions(node: &Node) -> Result<Vec<Node>, SolveError> {
    let mut children = Vec::with_capacity(Direction::ALL.len());
    for dir in Direction::ALL {
        let mut board = node.board;
        match board.slide(dir) {
            Ok(reward) => {
                trace!("slide {:?} from {:?} gains {}", dir, node.board, reward);
                children.push(Node { board, action: Action::Slide(dir), bag: node.bag });
            }
            Err(BoardError::IllegalSlide(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(children)
}

// the hinted tile dropped on each empty vacated cell, paired with every rank the bag can reveal next
fn placements(node: &Node, dir: Direction) -> Result<Vec<Node>, SolveError> {
    let tile = node.board.hint();
    let mut bag = node.bag;
    bag.draw(tile);
    let empty = dir.vacated_cells().iter().copied().filter(|&pos| node.board.cell(pos) == 0);
    let mut children = Vec::new();
    for (pos, next_hint) in iproduct!(empty, bag.remaining()) {
        let mut board = node.board;
        board.place(pos, tile)?;
        board.set_hint(next_hint);
        trace!("place {} at {} after {:?}, next hint {}", tile, pos, dir, next_hint);
        children.push(Node { board, action: Action::Place, bag });
    }
    Ok(children)
}
