use ndarray::Array2;
use smallvec::SmallVec;

/// Single coordinate axis, used for the grid side length and for positions.
pub type Coord = u8;

/// Count type used for hazard counts and total-cell counts.
pub type CellCount = u16;

/// Cell position `(x, y)`: `x` is the column, `y` is the row.
pub type Coord2 = (Coord, Coord);

/// At most eight neighbors, kept inline.
pub type Neighbors = SmallVec<[Coord2; 8]>;

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

pub const fn square(side: Coord) -> CellCount {
    let side = side as CellCount;
    side.saturating_mul(side)
}

/// Ordering key that sorts by row first, then column.
pub const fn row_major((x, y): Coord2) -> (Coord, Coord) {
    (y, x)
}

const OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// In-bounds neighbors of `center` on a `side`×`side` grid.
pub fn neighbors((x, y): Coord2, side: Coord) -> Neighbors {
    OFFSETS
        .iter()
        .filter_map(|&(dx, dy)| {
            let nx = x.checked_add_signed(dx)?;
            let ny = y.checked_add_signed(dy)?;
            (nx < side && ny < side).then_some((nx, ny))
        })
        .collect()
}

/// Every cell of a `side`×`side` grid in row-major order.
pub fn cells(side: Coord) -> impl Iterator<Item = Coord2> {
    (0..side).flat_map(move |y| (0..side).map(move |x| (x, y)))
}

pub trait NeighborCellsExt<T> {
    fn neighbor_cells(&self, center: Coord2) -> impl Iterator<Item = (Coord2, T)>;
}

impl<T: Copy> NeighborCellsExt<T> for Array2<T> {
    fn neighbor_cells(&self, center: Coord2) -> impl Iterator<Item = (Coord2, T)> {
        let side = Coord::try_from(self.dim().0).unwrap_or(Coord::MAX);
        neighbors(center, side)
            .into_iter()
            .map(|pos| (pos, self[pos.to_nd_index()]))
    }
}
