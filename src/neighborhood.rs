//! Moore neighborhood enumeration over a grid snapshot.

use crate::{Coord, Grid, PopulationId};
use ahash::AHashSet as HashSet;

/// Neighbor offsets in scan order: rows top to bottom, columns left to right.
/// Birth tie-breaking depends on this order.
pub const MOORE_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// In-bounds neighbors of `coord` in scan order, each paired with its occupant.
///
/// Out-of-bounds positions are filtered before lookup, so this never
/// touches a coordinate the grid would reject.
pub fn neighbors(
    grid: &Grid,
    coord: Coord,
) -> impl Iterator<Item = (Coord, Option<PopulationId>)> + '_ {
    MOORE_OFFSETS.iter().filter_map(move |&(dx, dy)| {
        let n = coord.offset(dx, dy);
        grid.contains(n).then(|| (n, grid.occupant(n)))
    })
}

/// Occupied neighbors of `coord` in scan order.
pub fn occupied_neighbors(
    grid: &Grid,
    coord: Coord,
) -> impl Iterator<Item = (Coord, PopulationId)> + '_ {
    neighbors(grid, coord).filter_map(|(n, state)| state.map(|id| (n, id)))
}

/// Every coordinate whose occupancy can change in one generation:
/// the occupied cells and all their in-bounds neighbors.
pub fn candidate_frontier(grid: &Grid) -> HashSet<Coord> {
    let mut frontier = HashSet::with_capacity(grid.population() * 9);
    for (coord, _) in grid.live_cells() {
        frontier.insert(coord);
        frontier.extend(neighbors(grid, coord).map(|(n, _)| n));
    }
    frontier
}
