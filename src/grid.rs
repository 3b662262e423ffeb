use crate::{EngineError, Result};
use ahash::AHashMap as HashMap;
use std::fmt;

/// Identifier of a population occupying a cell.
pub type PopulationId = u32;

/// Position on the board. Signed so that callers translating screen
/// positions can pass negative values and get an error back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: i64,
    pub y: i64,
}

impl Coord {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i64, dy: i64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(i64, i64)> for Coord {
    fn from((x, y): (i64, i64)) -> Self {
        Self::new(x, y)
    }
}

/// Sparse bounded board: only occupied cells are stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: HashMap<Coord, PopulationId>,
}

impl Grid {
    /// Create an empty `width x height` grid.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: HashMap::new(),
        })
    }

    /// Create a grid from a list of occupied cells. Later entries win.
    pub fn from_cells(
        width: u32,
        height: u32,
        cells: impl IntoIterator<Item = (Coord, PopulationId)>,
    ) -> Result<Self> {
        let mut grid = Self::new(width, height)?;
        for (coord, id) in cells {
            grid.set(coord.x, coord.y, Some(id))?;
        }
        Ok(grid)
    }

    /// Scatter `fill_rate * width * height` cells with uniformly random
    /// positions and population ids. Positions may repeat, so the final
    /// population can be lower.
    ///
    /// `seed` - random seed (if `None`, then random seed is generated)
    pub fn random(
        width: u32,
        height: u32,
        populations_count: u32,
        fill_rate: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        use rand::{Rng, SeedableRng};

        if populations_count == 0 {
            return Err(EngineError::InvalidConfig(
                "at least one population is required".into(),
            ));
        }
        let mut grid = Self::new(width, height)?;
        let mut rng = if let Some(x) = seed {
            rand_chacha::ChaCha8Rng::seed_from_u64(x)
        } else {
            rand_chacha::ChaCha8Rng::from_entropy()
        };
        let area = width as f64 * height as f64;
        let count = (fill_rate.clamp(0., 1.) * area) as usize;
        for _ in 0..count {
            let coord = Coord::new(
                rng.gen_range(0..width) as i64,
                rng.gen_range(0..height) as i64,
            );
            grid.cells.insert(coord, rng.gen_range(0..populations_count));
        }
        Ok(grid)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, coord: Coord) -> bool {
        (0..self.width as i64).contains(&coord.x) && (0..self.height as i64).contains(&coord.y)
    }

    fn check(&self, x: i64, y: i64) -> Result<Coord> {
        let coord = Coord::new(x, y);
        if self.contains(coord) {
            Ok(coord)
        } else {
            Err(EngineError::InvalidCoordinate {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Population occupying `(x, y)`, `None` if the cell is empty.
    pub fn get(&self, x: i64, y: i64) -> Result<Option<PopulationId>> {
        let coord = self.check(x, y)?;
        Ok(self.occupant(coord))
    }

    /// Lookup for coordinates already known to be in bounds.
    pub(crate) fn occupant(&self, coord: Coord) -> Option<PopulationId> {
        debug_assert!(self.contains(coord));
        self.cells.get(&coord).copied()
    }

    /// Occupy `(x, y)` with `state`, or empty it when `state` is `None`.
    pub fn set(&mut self, x: i64, y: i64, state: Option<PopulationId>) -> Result<()> {
        let coord = self.check(x, y)?;
        match state {
            Some(id) => {
                self.cells.insert(coord, id);
            }
            None => {
                self.cells.remove(&coord);
            }
        }
        Ok(())
    }

    /// Occupied cells in unspecified order. Borrowing the grid keeps it
    /// frozen for as long as the iterator lives.
    pub fn live_cells(&self) -> impl Iterator<Item = (Coord, PopulationId)> + '_ {
        self.cells.iter().map(|(&coord, &id)| (coord, id))
    }

    /// Total number of occupied cells.
    pub fn population(&self) -> usize {
        self.cells.len()
    }

    /// Number of occupied cells per population id, sorted by id.
    pub fn populations(&self) -> Vec<(PopulationId, usize)> {
        let mut counts = HashMap::<PopulationId, usize>::new();
        for &id in self.cells.values() {
            *counts.entry(id).or_default() += 1;
        }
        let mut counts = counts.into_iter().collect::<Vec<_>>();
        counts.sort_unstable();
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

impl fmt::Display for Grid {
    /// One line per row. Occupied cells print their population id in
    /// decimal, empty cells a single space, so ids of 10 and above widen
    /// their row.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                match self.occupant(Coord::new(x, y)) {
                    Some(id) => write!(f, "{}", id)?,
                    None => write!(f, " ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        let mut grid = Grid::new(4, 3).unwrap();
        assert_eq!(grid.get(1, 2).unwrap(), None);

        grid.set(1, 2, Some(5)).unwrap();
        assert_eq!(grid.get(1, 2).unwrap(), Some(5));
        grid.set(1, 2, Some(0)).unwrap();
        assert_eq!(grid.get(1, 2).unwrap(), Some(0));

        grid.set(1, 2, None).unwrap();
        assert_eq!(grid.get(1, 2).unwrap(), None);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut grid = Grid::new(4, 3).unwrap();
        for (x, y) in [(-1, 0), (0, -1), (4, 0), (0, 3), (i64::MAX, 0)] {
            assert!(matches!(
                grid.get(x, y),
                Err(EngineError::InvalidCoordinate { .. })
            ));
            assert!(matches!(
                grid.set(x, y, Some(0)),
                Err(EngineError::InvalidCoordinate { .. })
            ));
        }
        assert!(grid.is_empty());
    }

    #[test]
    fn test_zero_dimensions() {
        assert!(matches!(
            Grid::new(0, 5),
            Err(EngineError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Grid::new(5, 0),
            Err(EngineError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_random_is_seeded_and_bounded() {
        let a = Grid::random(60, 40, 3, 0.1, Some(42)).unwrap();
        let b = Grid::random(60, 40, 3, 0.1, Some(42)).unwrap();
        assert_eq!(a, b);
        assert!(a.population() > 0 && a.population() <= 240);
        for (coord, id) in a.live_cells() {
            assert!(a.contains(coord));
            assert!(id < 3);
        }
    }

    #[test]
    fn test_populations_and_display() {
        let grid = Grid::from_cells(
            3,
            2,
            [
                (Coord::new(0, 0), 0),
                (Coord::new(2, 0), 1),
                (Coord::new(1, 1), 1),
            ],
        )
        .unwrap();
        assert_eq!(grid.population(), 3);
        assert_eq!(grid.populations(), vec![(0, 1), (1, 2)]);
        assert_eq!(grid.to_string(), "0 1\n 1 \n");
    }

    #[test]
    fn test_display_prints_large_ids_in_full() {
        let grid = Grid::from_cells(
            3,
            1,
            [(Coord::new(0, 0), 36), (Coord::new(2, 0), 1234)],
        )
        .unwrap();
        assert_eq!(grid.to_string(), "36 1234\n");
    }
}
