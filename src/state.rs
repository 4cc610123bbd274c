use serde::{Deserialize, Serialize};

use crate::board::{Board, Direction};

/// Who moves next in a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StateType {
    /// the player is about to pick a slide
    Before,
    /// the environment is about to drop the hinted tile
    After,
    #[default]
    Illegal,
}

impl StateType {
    pub fn code(self) -> char {
        match self {
            StateType::Before => 'b',
            StateType::After => 'a',
            StateType::Illegal => 'i',
        }
    }

    pub fn from_code(code: char) -> Self {
        match code {
            'b' => StateType::Before,
            'a' => StateType::After,
            _ => StateType::Illegal,
        }
    }

    pub fn is_before(self) -> bool {
        self == StateType::Before
    }

    pub fn is_after(self) -> bool {
        self == StateType::After
    }

    pub fn is_illegal(self) -> bool {
        self == StateType::Illegal
    }
}

/// The transition that produced a stored position: one of the four slides, or `Place`
/// for a before-state that was reached by dropping a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Slide(Direction),
    Place,
}

impl Action {
    pub const PLACE_CODE: u8 = 4;

    pub fn code(self) -> u8 {
        match self {
            Action::Slide(dir) => dir.opcode(),
            Action::Place => Self::PLACE_CODE,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            Self::PLACE_CODE => Some(Action::Place),
            other => Direction::from_opcode(other).map(Action::Slide),
        }
    }

    pub fn state_type(self) -> StateType {
        match self {
            Action::Slide(_) => StateType::After,
            Action::Place => StateType::Before,
        }
    }
}

const BEFORE_ACTIONS: [Action; 1] = [Action::Place];
const AFTER_ACTIONS: [Action; 4] = [
    Action::Slide(Direction::Up),
    Action::Slide(Direction::Right),
    Action::Slide(Direction::Down),
    Action::Slide(Direction::Left),
];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("state is tagged illegal")]
    Illegal,
    #[error("hint {0} is not a tile rank (expected 1, 2 or 3)")]
    MissingHint(u8),
}

/// Decide which stored tags a query may match.
///
/// A before-state is only ever stored under `Place`. An after-state's text form does not say
/// which slide produced it, so every slide tag is a candidate, tried in opcode order.
pub fn classify(board: &Board, kind: StateType) -> Result<&'static [Action], StateError> {
    let actions: &'static [Action] = match kind {
        StateType::Before => &BEFORE_ACTIONS,
        StateType::After => &AFTER_ACTIONS,
        StateType::Illegal => return Err(StateError::Illegal),
    };
    if !(1..=3).contains(&board.hint()) {
        return Err(StateError::MissingHint(board.hint()));
    }
    Ok(actions)
}
