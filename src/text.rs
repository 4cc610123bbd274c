//! String-level conversions between the driver's line format and the core types.
//!
//! A query line reads `<tag> <c0> <c1> <c2> <c3> <c4> <c5> +<hint>`, e.g. `a 0 1 2 0 0 0 +3`.
//! Cells are written as displayed magnitudes (0, 1, 2, 3, 6, 12, ...), the hint as a digit or `x`.

use std::fmt;
use std::str::FromStr;

use crate::board::{Board, Cell, CELLS, MAX_RANK};
use crate::state::StateType;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("expected 6 cells, found {0}")]
    CellCount(usize),
    #[error("{0:?} is not a number")]
    Number(String),
    #[error("{0} is not a tile value")]
    Cell(u32),
    #[error("{0:?} is not a hint (expected +1, +2, +3 or +x)")]
    Hint(String),
    #[error("unexpected trailing input {0:?}")]
    Trailing(String),
}

/// Displayed magnitude to rank: 0..=3 map to themselves, 6 * 2^k maps to k + 4.
pub fn decode_cell(value: u32) -> Result<Cell, ParseError> {
    if value <= 3 {
        return Ok(value as Cell);
    }
    if value % 6 != 0 || !(value / 6).is_power_of_two() {
        return Err(ParseError::Cell(value));
    }
    let rank = (value / 6).trailing_zeros() + 4;
    if rank > u32::from(MAX_RANK) {
        return Err(ParseError::Cell(value));
    }
    Ok(rank as Cell)
}

/// Rank to displayed magnitude.
pub fn encode_cell(rank: Cell) -> u32 {
    if rank <= 3 {
        u32::from(rank)
    } else {
        3 << (rank - 3)
    }
}

fn parse_cells<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Board, ParseError> {
    let mut cells = [0; CELLS];
    let mut count = 0;
    for token in tokens {
        if count == CELLS {
            return Err(ParseError::CellCount(count + 1));
        }
        let value: u32 = token.parse().map_err(|_| ParseError::Number(token.to_string()))?;
        cells[count] = decode_cell(value)?;
        count += 1;
    }
    if count != CELLS {
        return Err(ParseError::CellCount(count));
    }
    Ok(Board::new(cells))
}

/// `+1`, `+2`, `+3` or `+x` (no hint, stored as 0).
pub fn parse_hint(token: &str) -> Result<Cell, ParseError> {
    match token.strip_prefix('+') {
        Some("x") | Some("0") => Ok(0),
        Some(digit @ ("1" | "2" | "3")) => Ok(digit.as_bytes()[0] - b'0'),
        _ => Err(ParseError::Hint(token.to_string())),
    }
}

pub struct HintText(pub Cell);

impl fmt::Display for HintText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "+x"),
            hint => write!(f, "+{}", hint),
        }
    }
}

/// Six cells separated by anything that is not a digit; the hint is left at 0.
impl FromStr for Board {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cells(s.split(|c: char| !c.is_ascii_digit()).filter(|t| !t.is_empty()))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rank) in self.cells().into_iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", encode_cell(rank))?;
        }
        Ok(())
    }
}

impl FromStr for StateType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars().next().map(StateType::from_code).ok_or(ParseError::Missing("state tag"))
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One driver line: a tagged position with its hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    pub kind: StateType,
    pub board: Board,
}

impl FromStr for Query {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let kind: StateType = tokens.next().ok_or(ParseError::Missing("state tag"))?.parse()?;
        let cells: Vec<&str> = tokens.by_ref().take(CELLS).collect();
        let board = parse_cells(cells.into_iter())?;
        let hint = parse_hint(tokens.next().ok_or(ParseError::Missing("hint"))?)?;
        if let Some(extra) = tokens.next() {
            return Err(ParseError::Trailing(extra.to_string()));
        }
        Ok(Query { kind, board: board.with_hint(hint) })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.board, HintText(self.board.hint()))
    }
}
