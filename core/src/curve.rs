use std::collections::BTreeMap;

use crate::error::{MaskError, Result};

// Piecewise-linear height function over the integer domain [0, size-1].
// Control points are kept sorted by location, and the two boundary
// locations are always present.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    size: usize,
    points: BTreeMap<usize, f64>, // location -> height, nominally in [0, 1]
}

impl Curve {
    // Flat curve: just the two boundary points at height 0.
    pub fn new(size: usize) -> Self {
        assert!(size >= 2, "curve size must be at least 2");

        let mut points = BTreeMap::new();
        points.insert(0, 0.0);
        points.insert(size - 1, 0.0);
        Self { size, points }
    }

    // Batch construction from stored points, in any order.
    // Every location must be in range and both boundaries must be listed.
    pub fn from_points<I>(size: usize, points: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        if size < 2 {
            return Err(MaskError::MalformedInput(format!(
                "curve size {size} is below the minimum of 2"
            )));
        }

        let mut map = BTreeMap::new();
        for (loc, height) in points {
            if loc >= size {
                return Err(MaskError::MalformedInput(format!(
                    "point location {loc} is outside 0..{size}"
                )));
            }
            map.insert(loc, height);
        }
        if !map.contains_key(&0) || !map.contains_key(&(size - 1)) {
            return Err(MaskError::MalformedInput(format!(
                "curve of size {size} is missing a boundary point"
            )));
        }

        Ok(Self { size, points: map })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    // Stored points in ascending location order.
    pub fn points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.points.iter().map(|(&loc, &height)| (loc, height))
    }

    pub fn contains(&self, loc: usize) -> bool {
        self.points.contains_key(&loc)
    }

    // Stored height at `loc`, if a control point lives there.
    pub fn stored_height(&self, loc: usize) -> Option<f64> {
        self.points.get(&loc).copied()
    }

    fn is_boundary(&self, loc: usize) -> bool {
        loc == 0 || loc == self.size - 1
    }

    // True when every stored height is exactly zero.
    pub fn is_void(&self) -> bool {
        self.points.values().all(|&h| h == 0.0)
    }

    // Inserts a control point, replacing any existing one at `loc`.
    pub fn insert_point(&mut self, loc: usize, height: f64) -> Result<()> {
        if loc >= self.size {
            return Err(MaskError::InvalidArgument(format!(
                "location {loc} is outside 0..{}",
                self.size
            ))
            .reported("Curve::insert_point"));
        }
        self.points.insert(loc, height);
        Ok(())
    }

    // Removes the control point at `loc` and returns its height.
    // The boundary points are fixed and cannot be removed.
    pub fn remove_point(&mut self, loc: usize) -> Result<f64> {
        if self.is_boundary(loc) {
            return Err(
                MaskError::InvalidArgument(format!("location {loc} is a boundary point"))
                    .reported("Curve::remove_point"),
            );
        }
        self.points.remove(&loc).ok_or_else(|| {
            MaskError::NotFound(format!("no point at location {loc}"))
                .reported("Curve::remove_point")
        })
    }

    // Nearest stored locations strictly below and strictly above `loc`,
    // defaulting to the domain ends.
    pub fn bracketing_locs(&self, loc: usize) -> (usize, usize) {
        bracket(self.points.keys().copied(), loc, self.size - 1)
    }

    // Height at any location: stored value, clamped ends, or linear blend
    // between the bracketing control points.
    pub fn height(&self, loc: usize) -> f64 {
        let last = self.size - 1;
        if loc == 0 {
            return self.boundary_height(0);
        }
        if loc >= last {
            return self.boundary_height(last);
        }
        if let Some(height) = self.stored_height(loc) {
            return height;
        }

        let (prev, next) = self.bracketing_locs(loc);
        let prev_height = self.boundary_height(prev);
        let next_height = self.boundary_height(next);
        let slope = (next_height - prev_height) / (next - prev) as f64;
        prev_height + slope * (loc - prev) as f64
    }

    fn boundary_height(&self, loc: usize) -> f64 {
        self.stored_height(loc).unwrap_or(0.0)
    }

    // Blends two curves. The result stores the union of both point sets,
    // each point weighted `weight_a` towards `a`.
    pub fn interpolate(a: &Curve, b: &Curve, weight_a: f64) -> Curve {
        debug_assert_eq!(a.size, b.size, "interpolating curves of different sizes");
        let weight_b = 1.0 - weight_a;

        let mut points: BTreeMap<usize, f64> = a
            .points()
            .map(|(loc, height)| (loc, weight_a * height + weight_b * b.height(loc)))
            .collect();
        for (loc, height) in b.points() {
            points
                .entry(loc)
                .or_insert_with(|| weight_b * height + weight_a * a.height(loc));
        }

        Curve {
            size: a.size,
            points,
        }
    }
}

// Shared bracketing scan over sorted keys: greatest key below `loc`
// (default 0) and least key above it (default `last`).
pub(crate) fn bracket<I>(keys: I, loc: usize, last: usize) -> (usize, usize)
where
    I: Iterator<Item = usize>,
{
    let mut left = 0;
    let mut right = last;
    for key in keys {
        if key < loc {
            left = key;
        } else if key > loc && key < right {
            right = key;
        }
    }
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::Curve;
    use crate::error::MaskError;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn new_curve_has_flat_boundaries() {
        let c = Curve::new(5);
        assert_eq!(c.points().collect::<Vec<_>>(), vec![(0, 0.0), (4, 0.0)]);
        assert!(c.is_void());
    }

    #[test]
    fn height_interpolates_between_neighbours() {
        let mut c = Curve::new(4);
        c.insert_point(1, 0.5).unwrap();
        assert!(approx(c.height(2), 0.25));
        assert!(approx(c.height(1), 0.5));
        assert!(approx(c.height(0), 0.0));
        assert!(approx(c.height(10), 0.0));
    }

    #[test]
    fn insert_keeps_ascending_order_and_replaces() {
        let mut c = Curve::new(10);
        c.insert_point(7, 0.3).unwrap();
        c.insert_point(2, 0.1).unwrap();
        c.insert_point(7, 0.9).unwrap();
        let locs: Vec<usize> = c.points().map(|(loc, _)| loc).collect();
        assert_eq!(locs, vec![0, 2, 7, 9]);
        assert_eq!(c.stored_height(7), Some(0.9));
    }

    #[test_log::test]
    fn insert_out_of_range_leaves_curve_unchanged() {
        let mut c = Curve::new(4);
        let before = c.clone();
        let err = c.insert_point(4, 1.0).unwrap_err();
        assert!(matches!(err, MaskError::InvalidArgument(_)));
        assert_eq!(c, before);
    }

    #[test_log::test]
    fn remove_missing_point_is_not_found() {
        let mut c = Curve::new(6);
        let err = c.remove_point(3).unwrap_err();
        assert!(matches!(err, MaskError::NotFound(_)));
        assert_eq!(c.num_points(), 2);
    }

    #[test_log::test]
    fn boundary_points_cannot_be_removed() {
        let mut c = Curve::new(6);
        assert!(matches!(
            c.remove_point(0),
            Err(MaskError::InvalidArgument(_))
        ));
        assert!(matches!(
            c.remove_point(5),
            Err(MaskError::InvalidArgument(_))
        ));
        assert!(c.contains(0) && c.contains(5));
    }

    #[test]
    fn remove_returns_height() {
        let mut c = Curve::new(6);
        c.insert_point(3, 0.7).unwrap();
        assert_eq!(c.remove_point(3).unwrap(), 0.7);
        assert!(!c.contains(3));
    }

    #[test]
    fn bracketing_scans_all_keys() {
        let mut c = Curve::new(20);
        for loc in [3, 8, 12] {
            c.insert_point(loc, 0.1).unwrap();
        }
        assert_eq!(c.bracketing_locs(8), (3, 12));
        assert_eq!(c.bracketing_locs(10), (8, 12));
        assert_eq!(c.bracketing_locs(1), (0, 3));
        assert_eq!(c.bracketing_locs(0), (0, 3));
        assert_eq!(c.bracketing_locs(19), (12, 19));
    }

    #[test]
    fn interpolate_takes_union_of_points() {
        let mut a = Curve::new(11);
        a.insert_point(2, 1.0).unwrap();
        let mut b = Curve::new(11);
        b.insert_point(6, 0.5).unwrap();

        let c = Curve::interpolate(&a, &b, 0.25);
        let locs: Vec<usize> = c.points().map(|(loc, _)| loc).collect();
        assert_eq!(locs, vec![0, 2, 6, 10]);

        // a has 1.0 at 2, b is 0.5 * 2/6 there
        let expected_at_2 = 0.25 * 1.0 + 0.75 * (0.5 * 2.0 / 6.0);
        assert!(approx(c.stored_height(2).unwrap(), expected_at_2));
        // b has 0.5 at 6, a is 1.0 * 4/8 there
        let expected_at_6 = 0.75 * 0.5 + 0.25 * 0.5;
        assert!(approx(c.stored_height(6).unwrap(), expected_at_6));
    }

    #[test]
    fn from_points_requires_boundaries() {
        assert!(Curve::from_points(5, vec![(0, 0.0), (2, 0.5)]).is_err());
        assert!(Curve::from_points(5, vec![(0, 0.0), (7, 0.5), (4, 0.0)]).is_err());
        let c = Curve::from_points(5, vec![(4, 0.2), (2, 0.5), (0, 0.1)]).unwrap();
        assert_eq!(c.num_points(), 3);
        assert!(!c.is_void());
    }
}
