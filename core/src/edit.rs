use std::mem;
use std::ops::RangeInclusive;

use log::{debug, info};

use crate::config::EditorConfig;
use crate::curve::Curve;
use crate::error::{MaskError, Result};
use crate::field::{Surface, SurfaceField};
use crate::input::PointerEvent;
use crate::projection::{EditAxis, ProjectionAdapter, ScreenPos, SurfacePos};
use crate::raster::ReliefBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Idle,
    DraggingTop,
    DraggingBottom,
}

// What the host should do after handing an event to the editor.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    // Not for us; route the event elsewhere
    Ignored,
    // Consumed, mask untouched
    Captured,
    // Mask changed; upload the pending rows and repaint the views
    MaskChanged,
    // Drag finished and the whole mask was rasterized; schedule a
    // full-resolution render for the next frame
    RedrawNextFrame,
}

impl EditOutcome {
    pub fn mask_changed(self) -> bool {
        matches!(self, EditOutcome::MaskChanged | EditOutcome::RedrawNextFrame)
    }
}

// Grid cell the views are sliced through. Primary views show row `y`,
// secondary views show column `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrossSection {
    pub x: usize,
    pub y: usize,
}

// Last ridge taken out by `remove_ridge`, waiting for a matching restore.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoSlot {
    pub row: usize,
    pub curve: Curve,
    pub surface: Surface,
}

// Control point under the pointer
#[derive(Debug, Clone, Copy)]
struct Handle {
    surface: Surface,
    row: usize,
    loc: usize,
    anchor: ScreenPos,
    distance: f64,
}

#[derive(Debug, Clone)]
struct Drag {
    surface: Surface,
    axis: EditAxis,
    row: usize,
    loc: usize,
    // stored locations around `loc` when the drag started
    bracket: (usize, usize),
    anchor: ScreenPos,
    start: ScreenPos,
    // rows whose profile depends on the edited ridge
    band: RangeInclusive<usize>,
}

fn check_volume<B: ReliefBuffer>(mask: &B, context: &str) -> Result<()> {
    if mask.width() < 2 || mask.height() < 2 {
        return Err(MaskError::InvalidArgument(format!(
            "volume {}x{} is below the 2x2 minimum",
            mask.width(),
            mask.height()
        ))
        .reported(context));
    }
    Ok(())
}

// Interactive editor for a relief mask.
// Owns the sparse [`SurfaceField`] and the dense buffer it is rasterized
// into. Host views feed pointer events through a [`ProjectionAdapter`];
// the same state machine serves both edit axes.
pub struct MaskEditor<B> {
    field: SurfaceField,
    mask: B,
    config: EditorConfig,
    cross: CrossSection,
    active: Surface,
    drag: Option<Drag>,
    undo: Option<UndoSlot>,
}

impl<B: ReliefBuffer> MaskEditor<B> {
    // Void mask sized to the buffer, cross-section centred.
    // Buffers narrower or shorter than 2 cells are refused.
    pub fn new(mask: B, config: EditorConfig) -> Result<Self> {
        check_volume(&mask, "MaskEditor::new")?;
        let field = SurfaceField::new(mask.width(), mask.height());
        let cross = CrossSection {
            x: mask.width() / 2,
            y: mask.height() / 2,
        };
        let mut editor = Self {
            field,
            mask,
            config,
            cross,
            active: Surface::Top,
            drag: None,
            undo: None,
        };
        editor.rasterize(None);
        Ok(editor)
    }

    // Starts over with a void mask for a newly loaded volume and hands
    // back the previous buffer. An undersized buffer leaves everything as
    // it was.
    pub fn replace_volume(&mut self, mask: B) -> Result<B> {
        check_volume(&mask, "MaskEditor::replace_volume")?;
        info!("new volume {}x{}", mask.width(), mask.height());
        self.field = SurfaceField::new(mask.width(), mask.height());
        self.cross = CrossSection {
            x: mask.width() / 2,
            y: mask.height() / 2,
        };
        self.drag = None;
        self.undo = None;
        let old = mem::replace(&mut self.mask, mask);
        self.rasterize(None);
        Ok(old)
    }

    pub fn field(&self) -> &SurfaceField {
        &self.field
    }

    pub fn mask(&self) -> &B {
        &self.mask
    }

    pub fn mask_mut(&mut self) -> &mut B {
        &mut self.mask
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> EditState {
        match &self.drag {
            None => EditState::Idle,
            Some(drag) if drag.surface.is_top() => EditState::DraggingTop,
            Some(_) => EditState::DraggingBottom,
        }
    }

    pub fn cross_section(&self) -> CrossSection {
        self.cross
    }

    pub fn active_surface(&self) -> Surface {
        self.active
    }

    pub fn undo_slot(&self) -> Option<&UndoSlot> {
        self.undo.as_ref()
    }

    pub fn is_void(&self) -> bool {
        self.field.is_void()
    }

    // Moves the cross-section, clamped into the grid. A new row drops any
    // pending ridge restore.
    pub fn set_cross_section(&mut self, x: usize, y: usize) {
        let x = x.min(self.field.xdim() - 1);
        let y = y.min(self.field.ydim() - 1);
        if y != self.cross.y && self.undo.take().is_some() {
            debug!("cross-section moved to row {y}, dropping ridge restore");
        }
        self.cross = CrossSection { x, y };
    }

    pub fn select_surface(&mut self, surface: Surface) {
        if surface != self.active {
            self.active = surface;
            self.undo = None;
        }
    }

    // Replaces the whole field, e.g. with one fetched from storage.
    // The field must match the buffer; otherwise nothing changes.
    pub fn install_field(&mut self, field: SurfaceField) -> Result<()> {
        if (field.xdim(), field.ydim()) != (self.mask.width(), self.mask.height()) {
            return Err(MaskError::SizeMismatch {
                field_width: field.xdim(),
                field_height: field.ydim(),
                buffer_width: self.mask.width(),
                buffer_height: self.mask.height(),
            }
            .reported("MaskEditor::install_field"));
        }
        self.field = field;
        self.drag = None;
        self.undo = None;
        self.rasterize(None);
        Ok(())
    }

    // Loads a saved mask. On any failure the current mask is kept.
    pub fn load_json(&mut self, text: &str) -> Result<()> {
        let field = SurfaceField::from_json_str(text)?;
        self.install_field(field)?;
        info!("loaded {}x{} mask", self.field.xdim(), self.field.ydim());
        Ok(())
    }

    pub fn save_json(&self) -> Result<String> {
        self.field.to_json_string()
    }

    fn rasterize(&mut self, rows: Option<RangeInclusive<usize>>) {
        if let Err(err) = self.field.copy_to_relief_mask(&mut self.mask, rows, true) {
            debug!("mask written best-effort: {err}");
        }
    }

    // Control points a view shows for one surface, in surface space
    fn handles(&self, axis: EditAxis, surface: Surface) -> Vec<(usize, usize, SurfacePos)> {
        let last_x = (self.field.xdim() - 1) as f64;
        let last_y = (self.field.ydim() - 1) as f64;
        match axis {
            EditAxis::Primary => {
                let row = self.cross.y;
                self.field
                    .ridge(row, surface)
                    .into_iter()
                    .flat_map(|ridge| ridge.points())
                    .map(|(loc, height)| {
                        let pos = SurfacePos::new(loc as f64 / last_x, surface.height_to_depth(height));
                        (row, loc, pos)
                    })
                    .collect()
            }
            EditAxis::Secondary => {
                let loc = self.cross.x;
                self.field
                    .ridges(surface)
                    .map(|(row, ridge)| {
                        let depth = surface.height_to_depth(ridge.height(loc));
                        (row, loc, SurfacePos::new(row as f64 / last_y, depth))
                    })
                    .collect()
            }
        }
    }

    // Nearest control point within tolerance, over both surfaces
    fn hit_test(&self, view: &dyn ProjectionAdapter, point: ScreenPos) -> Option<Handle> {
        let mut best: Option<Handle> = None;
        for surface in Surface::BOTH {
            for (row, loc, pos) in self.handles(view.axis(), surface) {
                let anchor = view.surface_space_to_point(pos);
                let distance = anchor.distance(point);
                if distance < self.config.hit_tolerance_px
                    && best.is_none_or(|b| distance < b.distance)
                {
                    best = Some(Handle {
                        surface,
                        row,
                        loc,
                        anchor,
                        distance,
                    });
                }
            }
        }
        best
    }

    pub fn pointer_down(&mut self, view: &dyn ProjectionAdapter, event: &PointerEvent) -> EditOutcome {
        if self.drag.is_some() || !self.config.drag_binding.matches(event) {
            return EditOutcome::Ignored;
        }
        let Some(hit) = self.hit_test(view, event.pos) else {
            return EditOutcome::Ignored;
        };

        let axis = view.axis();
        let bracket = match axis {
            EditAxis::Primary => self
                .field
                .ridge(hit.row, hit.surface)
                .map_or((0, self.field.xdim() - 1), |ridge| ridge.bracketing_locs(hit.loc)),
            EditAxis::Secondary => (hit.loc, hit.loc),
        };
        let (first, last) = self.field.bracketing_locs(hit.row, hit.surface);
        debug!(
            "drag start: {:?} row {} loc {} ({axis:?})",
            hit.surface, hit.row, hit.loc
        );
        self.drag = Some(Drag {
            surface: hit.surface,
            axis,
            row: hit.row,
            loc: hit.loc,
            bracket,
            anchor: hit.anchor,
            start: event.pos,
            band: first..=last,
        });
        EditOutcome::Captured
    }

    pub fn pointer_move(&mut self, view: &dyn ProjectionAdapter, event: &PointerEvent) -> EditOutcome {
        let Some(drag) = self.drag.clone() else {
            return EditOutcome::Ignored;
        };

        let target = drag.anchor + (event.pos - drag.start);
        let pos = view.point_to_surface_space(target).clamped();
        let height = drag.surface.depth_to_height(pos.depth);
        let last_x = self.field.xdim() - 1;

        let Some(ridge) = self.field.ridge_mut(drag.row, drag.surface) else {
            debug!("ridge at row {} vanished mid-drag", drag.row);
            self.drag = None;
            return EditOutcome::Ignored;
        };

        let new_loc = match drag.axis {
            EditAxis::Primary if drag.loc == 0 || drag.loc == last_x => drag.loc,
            EditAxis::Primary => ((pos.along * last_x as f64).round() as usize)
                .clamp(drag.bracket.0 + 1, drag.bracket.1 - 1),
            EditAxis::Secondary => drag.loc,
        };
        if new_loc != drag.loc && ridge.remove_point(drag.loc).is_err() {
            return EditOutcome::Ignored;
        }
        if ridge.insert_point(new_loc, height).is_err() {
            return EditOutcome::Ignored;
        }

        if let Some(active) = self.drag.as_mut() {
            active.loc = new_loc;
        }
        self.rasterize(Some(drag.band));
        EditOutcome::MaskChanged
    }

    pub fn pointer_up(&mut self) -> EditOutcome {
        let Some(drag) = self.drag.take() else {
            return EditOutcome::Ignored;
        };
        debug!("drag end: {:?} row {} loc {}", drag.surface, drag.row, drag.loc);
        self.rasterize(None);
        EditOutcome::RedrawNextFrame
    }

    // Point toggling on the current row.
    // Clicking a control point removes it unless it is a boundary point.
    // Clicking elsewhere inside the volume inserts a point into whichever
    // surface's profile passes closer to the click.
    pub fn click(&mut self, view: &dyn ProjectionAdapter, event: &PointerEvent) -> EditOutcome {
        if event.button != self.config.toggle_button
            || self.drag.is_some()
            || view.axis() != EditAxis::Primary
        {
            return EditOutcome::Ignored;
        }
        let row = self.cross.y;
        let last_x = self.field.xdim() - 1;

        if let Some(hit) = self.hit_test(view, event.pos) {
            if hit.loc == 0 || hit.loc == last_x {
                return EditOutcome::Captured;
            }
            let removed = self
                .field
                .ridge_mut(hit.row, hit.surface)
                .map(|ridge| ridge.remove_point(hit.loc));
            if !matches!(removed, Some(Ok(_))) {
                return EditOutcome::Captured;
            }
            debug!("removed {:?} point {} on row {row}", hit.surface, hit.loc);
            self.rasterize(None);
            return EditOutcome::MaskChanged;
        }

        let pos = view.point_to_surface_space(event.pos);
        if !pos.is_inside() {
            return EditOutcome::Ignored;
        }
        if !Surface::BOTH.iter().any(|&s| self.field.has_ridge(row, s)) {
            return EditOutcome::Ignored;
        }

        let col = (pos.along * last_x as f64).round() as usize;
        let gap = |surface: Surface| {
            if self.field.has_ridge(row, surface) {
                let height = self.field.mask_profile(row, surface).height(col);
                (surface.height_to_depth(height) - pos.depth).abs()
            } else {
                f64::INFINITY
            }
        };
        let surface = if gap(Surface::Top) < gap(Surface::Bottom) {
            Surface::Top
        } else {
            Surface::Bottom
        };

        let height = surface.depth_to_height(pos.depth);
        let inserted = self
            .field
            .ridge_mut(row, surface)
            .map(|ridge| ridge.insert_point(col, height));
        if !matches!(inserted, Some(Ok(()))) {
            return EditOutcome::Ignored;
        }
        debug!("inserted {surface:?} point {col} on row {row}");
        self.rasterize(None);
        EditOutcome::MaskChanged
    }

    // Makes the current row editable on the active surface by storing its
    // interpolated profile as a ridge.
    pub fn add_ridge(&mut self) -> EditOutcome {
        let (row, surface) = (self.cross.y, self.active);
        if self.field.has_ridge(row, surface) {
            return EditOutcome::Ignored;
        }
        let profile = self.field.mask_profile(row, surface).into_owned();
        if self.field.insert_ridge(row, profile, surface).is_err() {
            return EditOutcome::Ignored;
        }
        debug!("added {surface:?} ridge at row {row}");
        self.rasterize(None);
        EditOutcome::MaskChanged
    }

    // Takes the active surface's ridge off the current row, keeping it for
    // one restore.
    pub fn remove_ridge(&mut self) -> EditOutcome {
        let (row, surface) = (self.cross.y, self.active);
        if row == 0 || row == self.field.ydim() - 1 || !self.field.has_ridge(row, surface) {
            return EditOutcome::Ignored;
        }
        let Ok(curve) = self.field.remove_ridge(row, surface) else {
            return EditOutcome::Ignored;
        };
        debug!("removed {surface:?} ridge at row {row}");
        self.undo = Some(UndoSlot {
            row,
            curve,
            surface,
        });
        self.rasterize(None);
        EditOutcome::MaskChanged
    }

    // Puts the last removed ridge back, but only while the cross-section
    // is still on its row. Either way the slot is used up.
    pub fn restore_ridge(&mut self) -> EditOutcome {
        let Some(slot) = self.undo.take() else {
            return EditOutcome::Ignored;
        };
        if slot.row != self.cross.y {
            debug!("discarding restore for row {}", slot.row);
            return EditOutcome::Ignored;
        }
        if self
            .field
            .insert_ridge(slot.row, slot.curve, slot.surface)
            .is_err()
        {
            return EditOutcome::Ignored;
        }
        debug!("restored {:?} ridge at row {}", slot.surface, slot.row);
        self.rasterize(None);
        EditOutcome::MaskChanged
    }

    // Jumps to the nearest stored ridge above the current row.
    pub fn previous_ridge(&mut self) -> usize {
        let (prev, _) = self.field.bracketing_locs(self.cross.y, self.active);
        self.set_cross_section(self.cross.x, prev);
        prev
    }

    pub fn next_ridge(&mut self) -> usize {
        let (_, next) = self.field.bracketing_locs(self.cross.y, self.active);
        self.set_cross_section(self.cross.x, next);
        next
    }
}
