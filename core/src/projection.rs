use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

// Position in host screen space (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPos {
    pub x: f64,
    pub y: f64,
}

impl ScreenPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: ScreenPos) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for ScreenPos {
    type Output = ScreenPos;

    fn add(self, rhs: ScreenPos) -> ScreenPos {
        ScreenPos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for ScreenPos {
    type Output = ScreenPos;

    fn sub(self, rhs: ScreenPos) -> ScreenPos {
        ScreenPos::new(self.x - rhs.x, self.y - rhs.y)
    }
}

// Normalized position inside a mask view.
// `along` runs over the edited axis, `depth` over the height axis; both
// are in [0, 1] inside the volume.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfacePos {
    pub along: f64,
    pub depth: f64,
}

impl SurfacePos {
    pub fn new(along: f64, depth: f64) -> Self {
        Self { along, depth }
    }

    pub fn is_inside(self) -> bool {
        (0.0..=1.0).contains(&self.along) && (0.0..=1.0).contains(&self.depth)
    }

    pub fn clamped(self) -> Self {
        Self::new(self.along.clamp(0.0, 1.0), self.depth.clamp(0.0, 1.0))
    }
}

// Which grid axis a view edits.
// `Primary` views show the cross-section row: `along` is the column and
// dragging moves control points within one ridge. `Secondary` views show
// the cross-section column: `along` is the row and dragging only changes
// the height of the ridge that was grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditAxis {
    Primary,
    Secondary,
}

// Maps between a host view's screen space and mask surface space.
pub trait ProjectionAdapter {
    fn axis(&self) -> EditAxis;
    fn point_to_surface_space(&self, point: ScreenPos) -> SurfacePos;
    fn surface_space_to_point(&self, pos: SurfacePos) -> ScreenPos;
}

// Axis-aligned view rectangle.
// Primary views lay `along` left to right with depth growing upwards.
// Secondary views lay `along` top to bottom with depth growing to the
// right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectProjection {
    axis: EditAxis,
    min: ScreenPos,
    max: ScreenPos,
}

impl RectProjection {
    pub fn primary(min: ScreenPos, max: ScreenPos) -> Self {
        Self {
            axis: EditAxis::Primary,
            min,
            max,
        }
    }

    pub fn secondary(min: ScreenPos, max: ScreenPos) -> Self {
        Self {
            axis: EditAxis::Secondary,
            min,
            max,
        }
    }

    fn extent(&self) -> ScreenPos {
        let size = self.max - self.min;
        // zero-sized views would divide by zero
        ScreenPos::new(size.x.max(f64::EPSILON), size.y.max(f64::EPSILON))
    }
}

impl ProjectionAdapter for RectProjection {
    fn axis(&self) -> EditAxis {
        self.axis
    }

    fn point_to_surface_space(&self, point: ScreenPos) -> SurfacePos {
        let size = self.extent();
        let u = (point.x - self.min.x) / size.x;
        let v = (point.y - self.min.y) / size.y;
        match self.axis {
            EditAxis::Primary => SurfacePos::new(u, 1.0 - v),
            EditAxis::Secondary => SurfacePos::new(v, u),
        }
    }

    fn surface_space_to_point(&self, pos: SurfacePos) -> ScreenPos {
        let size = self.extent();
        let (u, v) = match self.axis {
            EditAxis::Primary => (pos.along, 1.0 - pos.depth),
            EditAxis::Secondary => (pos.depth, pos.along),
        };
        ScreenPos::new(self.min.x + u * size.x, self.min.y + v * size.y)
    }
}
