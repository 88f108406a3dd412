use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::error::{MaskError, Result};
use crate::field::{Surface, SurfaceField};

// Points of one ridge as `[location, height]` pairs
pub type PointList = Vec<(usize, f64)>;

// Interchange form of a [`SurfaceField`].
// Serializes as
// `{"xdim":..,"ydim":..,"topRidges":[[row,[[loc,height],..]],..],"btmRidges":[..]}`
// with heights rounded to 6 decimal digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskRecord {
    pub xdim: usize,
    pub ydim: usize,
    pub top_ridges: Vec<(usize, PointList)>,
    pub btm_ridges: Vec<(usize, PointList)>,
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

fn record_ridges(field: &SurfaceField, surface: Surface) -> Vec<(usize, PointList)> {
    field
        .ridges(surface)
        .map(|(row, curve)| {
            let points = curve.points().map(|(loc, h)| (loc, round6(h))).collect();
            (row, points)
        })
        .collect()
}

fn build_ridges(xdim: usize, ridges: Vec<(usize, PointList)>) -> Result<BTreeMap<usize, Curve>> {
    ridges
        .into_iter()
        .map(|(row, points)| Ok((row, Curve::from_points(xdim, points)?)))
        .collect()
}

impl From<&SurfaceField> for MaskRecord {
    fn from(field: &SurfaceField) -> Self {
        Self {
            xdim: field.xdim(),
            ydim: field.ydim(),
            top_ridges: record_ridges(field, Surface::Top),
            btm_ridges: record_ridges(field, Surface::Bottom),
        }
    }
}

impl TryFrom<MaskRecord> for SurfaceField {
    type Error = MaskError;

    // Rebuilds exactly the listed ridges; nothing is synthesized, so a
    // record missing a boundary entry is rejected.
    fn try_from(record: MaskRecord) -> Result<Self> {
        let top = build_ridges(record.xdim, record.top_ridges)?;
        let bottom = build_ridges(record.xdim, record.btm_ridges)?;
        SurfaceField::from_ridges(record.xdim, record.ydim, top, bottom)
    }
}

impl SurfaceField {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&MaskRecord::from(self))?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let parsed = serde_json::from_str::<MaskRecord>(text)
            .map_err(MaskError::from)
            .and_then(SurfaceField::try_from)
            .map_err(|err| err.reported("SurfaceField::from_json_str"))?;
        info!("parsed {}x{} mask", parsed.xdim(), parsed.ydim());
        Ok(parsed)
    }
}
