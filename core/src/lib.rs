// core holds the relief mask model, its rasterizer and the edit controller
pub mod codec;
pub mod config;
pub mod curve;
pub mod edit;
pub mod error;
pub mod field;
pub mod input;
pub mod projection;
pub mod raster;

pub use codec::MaskRecord;
pub use config::EditorConfig;
pub use curve::Curve;
pub use edit::{EditOutcome, EditState, MaskEditor};
pub use error::{MaskError, Result};
pub use field::{Surface, SurfaceField};
pub use projection::{EditAxis, ProjectionAdapter, RectProjection, ScreenPos, SurfacePos};
pub use raster::{ReliefBuffer, ReliefMask};
