use std::borrow::Cow;
use std::collections::BTreeMap;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::curve::{Curve, bracket};
use crate::error::{MaskError, Result};

// One of the two height fields making up a relief mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Surface {
    Top,
    Bottom,
}

impl Surface {
    pub const BOTH: [Surface; 2] = [Surface::Top, Surface::Bottom];

    pub fn is_top(self) -> bool {
        self == Surface::Top
    }

    // Channel of the dense raster that carries this surface.
    pub fn channel(self) -> usize {
        match self {
            Surface::Top => 2,
            Surface::Bottom => 0,
        }
    }

    // The top surface hangs down from the far side of the volume, so its
    // on-screen depth is inverted. The mapping is its own inverse.
    pub fn height_to_depth(self, height: f64) -> f64 {
        match self {
            Surface::Top => 1.0 - height,
            Surface::Bottom => height,
        }
    }

    pub fn depth_to_height(self, depth: f64) -> f64 {
        self.height_to_depth(depth)
    }
}

// Sparse model of a relief mask over an `xdim` x `ydim` grid.
// Each surface stores ridges (curves along x) at selected rows; rows in
// between are interpolated from the bracketing ridges. Rows `0` and
// `ydim - 1` always hold a ridge on both surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceField {
    xdim: usize,
    ydim: usize,
    top: BTreeMap<usize, Curve>,
    bottom: BTreeMap<usize, Curve>,
}

impl SurfaceField {
    pub fn new(xdim: usize, ydim: usize) -> Self {
        assert!(xdim >= 2 && ydim >= 2, "mask must be at least 2x2");

        let boundaries = || {
            BTreeMap::from([(0, Curve::new(xdim)), (ydim - 1, Curve::new(xdim))])
        };
        Self {
            xdim,
            ydim,
            top: boundaries(),
            bottom: boundaries(),
        }
    }

    // Assembles a field from already-built ridge maps, checking the
    // structural rules instead of patching them up.
    pub(crate) fn from_ridges(
        xdim: usize,
        ydim: usize,
        top: BTreeMap<usize, Curve>,
        bottom: BTreeMap<usize, Curve>,
    ) -> Result<Self> {
        if xdim < 2 || ydim < 2 {
            return Err(MaskError::MalformedInput(format!(
                "mask dimensions {xdim}x{ydim} are below the 2x2 minimum"
            )));
        }
        for (surface, ridges) in [(Surface::Top, &top), (Surface::Bottom, &bottom)] {
            if !ridges.contains_key(&0) || !ridges.contains_key(&(ydim - 1)) {
                return Err(MaskError::MalformedInput(format!(
                    "{surface:?} surface is missing a boundary ridge"
                )));
            }
            if let Some((&row, _)) = ridges.iter().find(|(row, _)| **row >= ydim) {
                return Err(MaskError::MalformedInput(format!(
                    "{surface:?} ridge row {row} is outside 0..{ydim}"
                )));
            }
            if let Some((&row, _)) = ridges.iter().find(|(_, c)| c.size() != xdim) {
                return Err(MaskError::MalformedInput(format!(
                    "{surface:?} ridge at row {row} does not span {xdim} columns"
                )));
            }
        }
        Ok(Self {
            xdim,
            ydim,
            top,
            bottom,
        })
    }

    pub fn xdim(&self) -> usize {
        self.xdim
    }

    pub fn ydim(&self) -> usize {
        self.ydim
    }

    fn ridge_map(&self, surface: Surface) -> &BTreeMap<usize, Curve> {
        match surface {
            Surface::Top => &self.top,
            Surface::Bottom => &self.bottom,
        }
    }

    fn ridge_map_mut(&mut self, surface: Surface) -> &mut BTreeMap<usize, Curve> {
        match surface {
            Surface::Top => &mut self.top,
            Surface::Bottom => &mut self.bottom,
        }
    }

    // Stored ridges of one surface in ascending row order.
    pub fn ridges(&self, surface: Surface) -> impl Iterator<Item = (usize, &Curve)> + '_ {
        self.ridge_map(surface).iter().map(|(&row, c)| (row, c))
    }

    // True when nothing on either surface is raised above zero.
    pub fn is_void(&self) -> bool {
        self.top.values().chain(self.bottom.values()).all(Curve::is_void)
    }

    // Stores `curve` as the ridge at `row`, replacing any existing one.
    pub fn insert_ridge(&mut self, row: usize, curve: Curve, surface: Surface) -> Result<()> {
        if row >= self.ydim {
            return Err(MaskError::InvalidArgument(format!(
                "row {row} is outside 0..{}",
                self.ydim
            ))
            .reported("SurfaceField::insert_ridge"));
        }
        if curve.size() != self.xdim {
            return Err(MaskError::InvalidArgument(format!(
                "ridge spans {} columns, mask has {}",
                curve.size(),
                self.xdim
            ))
            .reported("SurfaceField::insert_ridge"));
        }
        self.ridge_map_mut(surface).insert(row, curve);
        Ok(())
    }

    // Takes the ridge at `row` out of the surface. Boundary rows are fixed.
    pub fn remove_ridge(&mut self, row: usize, surface: Surface) -> Result<Curve> {
        if row == 0 || row == self.ydim - 1 {
            return Err(
                MaskError::InvalidArgument(format!("row {row} is a boundary ridge"))
                    .reported("SurfaceField::remove_ridge"),
            );
        }
        self.ridge_map_mut(surface).remove(&row).ok_or_else(|| {
            MaskError::NotFound(format!("no {surface:?} ridge at row {row}"))
                .reported("SurfaceField::remove_ridge")
        })
    }

    pub fn has_ridge(&self, row: usize, surface: Surface) -> bool {
        self.ridge_map(surface).contains_key(&row)
    }

    pub fn ridge(&self, row: usize, surface: Surface) -> Option<&Curve> {
        self.ridge_map(surface).get(&row)
    }

    pub fn ridge_mut(&mut self, row: usize, surface: Surface) -> Option<&mut Curve> {
        self.ridge_map_mut(surface).get_mut(&row)
    }

    // Surface profile at `row`.
    // Stored rows are borrowed; other rows get a fresh curve blended from
    // the two bracketing ridges, weighted by distance.
    pub fn mask_profile(&self, row: usize, surface: Surface) -> Cow<'_, Curve> {
        let ridges = self.ridge_map(surface);
        let last = self.ydim - 1;
        let row = row.min(last);

        if let Some(curve) = ridges.get(&row) {
            return Cow::Borrowed(curve);
        }

        let prev = ridges.range(..row).next_back();
        let next = ridges.range(row + 1..).next();
        match (prev, next) {
            (Some((&prev_row, prev_curve)), Some((&next_row, next_curve))) => {
                let prev_weight = (next_row - row) as f64 / (next_row - prev_row) as f64;
                trace!("profile {surface:?} row {row} between {prev_row} and {next_row}");
                Cow::Owned(Curve::interpolate(prev_curve, next_curve, prev_weight))
            }
            _ => {
                MaskError::InternalInconsistency(format!(
                    "no ridges bracket {surface:?} row {row}"
                ))
                .reported("SurfaceField::mask_profile");
                Cow::Owned(Curve::new(self.xdim))
            }
        }
    }

    // Nearest stored ridge rows strictly below and above `row`.
    pub fn bracketing_locs(&self, row: usize, surface: Surface) -> (usize, usize) {
        bracket(self.ridge_map(surface).keys().copied(), row, self.ydim - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::{Surface, SurfaceField};
    use crate::curve::Curve;
    use crate::error::MaskError;

    fn raised(size: usize, points: &[(usize, f64)]) -> Curve {
        let mut c = Curve::new(size);
        for &(loc, h) in points {
            c.insert_point(loc, h).unwrap();
        }
        c
    }

    #[test]
    fn new_field_has_boundary_ridges_on_both_surfaces() {
        let f = SurfaceField::new(8, 6);
        for s in Surface::BOTH {
            let rows: Vec<usize> = f.ridges(s).map(|(row, _)| row).collect();
            assert_eq!(rows, vec![0, 5]);
        }
        assert!(f.is_void());
    }

    #[test]
    fn profile_between_boundaries_is_weighted_blend() {
        let mut f = SurfaceField::new(4, 4);
        f.insert_ridge(0, raised(4, &[(1, 0.6)]), Surface::Top)
            .unwrap();
        f.insert_ridge(3, raised(4, &[(2, 0.3), (3, 0.9)]), Surface::Top)
            .unwrap();

        let expected = Curve::interpolate(
            f.ridge(0, Surface::Top).unwrap(),
            f.ridge(3, Surface::Top).unwrap(),
            2.0 / 3.0,
        );
        assert_eq!(*f.mask_profile(1, Surface::Top), expected);
    }

    #[test]
    fn profile_at_stored_row_is_borrowed() {
        let mut f = SurfaceField::new(5, 9);
        f.insert_ridge(4, raised(5, &[(2, 0.4)]), Surface::Bottom)
            .unwrap();
        let profile = f.mask_profile(4, Surface::Bottom);
        assert!(matches!(profile, std::borrow::Cow::Borrowed(_)));
        assert_eq!(profile.stored_height(2), Some(0.4));
        // rows past the end clamp to the last ridge
        assert_eq!(*f.mask_profile(50, Surface::Bottom), Curve::new(5));
    }

    #[test_log::test]
    fn insert_ridge_rejects_bad_rows_and_sizes() {
        let mut f = SurfaceField::new(5, 5);
        assert!(matches!(
            f.insert_ridge(5, Curve::new(5), Surface::Top),
            Err(MaskError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.insert_ridge(2, Curve::new(7), Surface::Top),
            Err(MaskError::InvalidArgument(_))
        ));
        assert!(!f.has_ridge(2, Surface::Top));
    }

    #[test_log::test]
    fn remove_ridge_reports_missing_and_protects_boundaries() {
        let mut f = SurfaceField::new(5, 5);
        assert!(matches!(
            f.remove_ridge(2, Surface::Bottom),
            Err(MaskError::NotFound(_))
        ));
        assert!(matches!(
            f.remove_ridge(0, Surface::Bottom),
            Err(MaskError::InvalidArgument(_))
        ));

        let ridge = raised(5, &[(1, 0.2)]);
        f.insert_ridge(2, ridge.clone(), Surface::Bottom).unwrap();
        assert_eq!(f.remove_ridge(2, Surface::Bottom).unwrap(), ridge);
        assert!(!f.has_ridge(2, Surface::Bottom));
    }

    #[test]
    fn void_tracks_nonzero_heights() {
        let mut f = SurfaceField::new(5, 5);
        f.ridge_mut(0, Surface::Top)
            .unwrap()
            .insert_point(2, 0.1)
            .unwrap();
        assert!(!f.is_void());
        f.ridge_mut(0, Surface::Top).unwrap().remove_point(2).unwrap();
        assert!(f.is_void());
    }

    #[test]
    fn ridge_brackets_are_per_surface() {
        let mut f = SurfaceField::new(5, 20);
        f.insert_ridge(6, Curve::new(5), Surface::Top).unwrap();
        f.insert_ridge(11, Curve::new(5), Surface::Top).unwrap();
        assert_eq!(f.bracketing_locs(8, Surface::Top), (6, 11));
        assert_eq!(f.bracketing_locs(6, Surface::Top), (0, 11));
        assert_eq!(f.bracketing_locs(8, Surface::Bottom), (0, 19));
    }

    #[test]
    fn top_depth_is_inverted() {
        assert_eq!(Surface::Top.height_to_depth(0.25), 0.75);
        assert_eq!(Surface::Bottom.height_to_depth(0.25), 0.25);
        assert_eq!(Surface::Top.channel(), 2);
        assert_eq!(Surface::Bottom.channel(), 0);
    }
}
