use crate::{neighborhood, Coord, Grid, PopulationId, Result};
use std::hash::{Hash, Hasher};

/// Transient per-generation view of one coordinate.
///
/// Identity is the coordinate alone: two cells at the same position compare
/// equal whatever their states are.
#[derive(Clone, Copy, Debug)]
pub struct Cell {
    coord: Coord,
    state: Option<PopulationId>,
    next: Option<PopulationId>,
}

impl Cell {
    pub fn new(coord: Coord, state: Option<PopulationId>) -> Self {
        Self {
            coord,
            state,
            next: None,
        }
    }

    /// Read the current state of `coord` from `snapshot`.
    pub fn from_snapshot(snapshot: &Grid, coord: Coord) -> Result<Self> {
        let state = snapshot.get(coord.x, coord.y)?;
        Ok(Self::new(coord, state))
    }

    pub fn coord(&self) -> Coord {
        self.coord
    }

    pub fn state(&self) -> Option<PopulationId> {
        self.state
    }

    /// State computed by the last [`Cell::evaluate`], not yet committed.
    pub fn next_state(&self) -> Option<PopulationId> {
        self.next
    }

    pub fn is_alive(&self) -> bool {
        self.state.is_some()
    }

    pub fn is_changed(&self) -> bool {
        self.state != self.next
    }

    /// Compute the next state against the same snapshot the cell was read from.
    pub fn evaluate(&mut self, snapshot: &Grid) -> Option<PopulationId> {
        let mut count = 0;
        let mut first = None;
        for (_, id) in neighborhood::occupied_neighbors(snapshot, self.coord) {
            first = first.or(Some(id));
            count += 1;
        }
        self.next = transition(self.state, count, first);
        self.next
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coord.hash(state);
    }
}

/// Birth/survival rule.
///
/// `first` is the population of the first occupied neighbor in scan order;
/// a birth inherits it rather than the majority population.
pub fn transition(
    state: Option<PopulationId>,
    occupied: usize,
    first: Option<PopulationId>,
) -> Option<PopulationId> {
    match (state, occupied) {
        (Some(id), 2 | 3) => Some(id),
        (None, 3) => first,
        _ => None,
    }
}

/// Read `coord` from `snapshot` and compute its next state.
pub(crate) fn compute(snapshot: &Grid, coord: Coord) -> Result<Cell> {
    let mut cell = Cell::from_snapshot(snapshot, coord)?;
    cell.evaluate(snapshot);
    Ok(cell)
}
