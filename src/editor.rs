use crate::{
    modulation::{LinkId, ModulatorSignals},
    point::{CurvePoint, SegmentKind},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Default squared hit-test distance in normalized editor coordinates.
///
/// Matches a 200 px² threshold on a 1600 px wide layout. GUI layers with other
/// geometries should convert their own pixel threshold and pass it explicitly.
pub const DEFAULT_HIT_DISTANCE_SQUARED: f32 = 200.0 / (1600.0 * 1600.0);

// -------------------------------------------------------------------------------------------------

/// Stable identity of a point within its [`CurveEditor`].
///
/// Ids survive unrelated insertions and deletions. An id of a deleted point is
/// detected as stale, even when its slot got reused by a later insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointId {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

// -------------------------------------------------------------------------------------------------

/// What part of a point a hit-test resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    /// The point itself.
    Position,
    /// The curve-center handle of the segment left of the point.
    CurveCenter,
}

// -------------------------------------------------------------------------------------------------

/// Follow-up UI action requested by an edit operation.
///
/// Editors never route menus themselves: operations that need a menu return one of
/// these values and the caller interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuRequest {
    /// No menu needed.
    None,
    /// Show the context menu for a curve point (delete, change segment kind).
    PointMenu(PointId),
    /// Show the per-link controls for an existing modulation link.
    LinkMenu(LinkId),
    /// Ask whether a new position link should target the point's x or y.
    DirectionMenu { editor: usize, point: PointId },
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    point: Option<CurvePoint>,
}

// -------------------------------------------------------------------------------------------------

/// An ordered chain of curve points defining a piecewise function on [0, 1].
///
/// The first point is fixed at (0, 0) and can not be selected, moved or deleted.
/// The last point's x is pinned to 1. Points are kept sorted by base x at all
/// times. Points live in a generational slot arena, so [`PointId`]s stay valid
/// across unrelated edits and deleted ids are reliably rejected.
#[derive(Debug, Clone)]
pub struct CurveEditor {
    slots: Vec<Slot>,
    /// Point ids sorted by x, including the fixed first point at index 0.
    order: Vec<PointId>,
}

impl CurveEditor {
    /// Create a new editor with the default diagonal: fixed (0, 0) and terminal (1, 1).
    pub fn new() -> Self {
        let mut editor = Self {
            slots: Vec::new(),
            order: Vec::new(),
        };
        let first = editor.alloc(CurvePoint::new(0.0, 0.0));
        let last = editor.alloc(CurvePoint::new(1.0, 1.0));
        editor.order.push(first);
        editor.order.push(last);
        editor
    }

    // slot arena ----------------------------------------------------------------------------------

    fn alloc(&mut self, point: CurvePoint) -> PointId {
        if let Some(index) = self.slots.iter().position(|slot| slot.point.is_none()) {
            let slot = &mut self.slots[index];
            slot.point = Some(point);
            PointId {
                index: index as u32,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                point: Some(point),
            });
            PointId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    fn free(&mut self, id: PointId) {
        let slot = &mut self.slots[id.index as usize];
        debug_assert_eq!(slot.generation, id.generation);
        slot.point = None;
        // Stale ids must not match a reused slot.
        slot.generation = slot.generation.wrapping_add(1);
    }

    /// Access a point by id. Fails with [`Error::PointNotFound`] for stale ids.
    pub fn point(&self, id: PointId) -> Result<&CurvePoint, Error> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.point.as_ref())
            .ok_or(Error::PointNotFound)
    }

    pub(crate) fn point_mut(&mut self, id: PointId) -> Result<&mut CurvePoint, Error> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.point.as_mut())
            .ok_or(Error::PointNotFound)
    }

    // chain accessors -----------------------------------------------------------------------------

    /// Number of points in the editor, including the fixed first point.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// False: an editor always holds at least the fixed first and the terminal point.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Ids of all points in x order, starting with the fixed first point.
    pub fn point_ids(&self) -> impl Iterator<Item = PointId> + '_ {
        self.order.iter().copied()
    }

    /// Id of the point at the given chain index, if present.
    pub fn id_at(&self, index: usize) -> Option<PointId> {
        self.order.get(index).copied()
    }

    /// Chain index of the given point id.
    pub fn index_of(&self, id: PointId) -> Option<usize> {
        self.order.iter().position(|other| *other == id)
    }

    /// Id of the fixed first point.
    pub fn first_id(&self) -> PointId {
        self.order[0]
    }

    /// Id of the terminal point.
    pub fn last_id(&self) -> PointId {
        *self.order.last().unwrap()
    }

    /// True if the id names the fixed first point.
    pub fn is_first(&self, id: PointId) -> bool {
        id == self.first_id()
    }

    /// True if the id names the terminal point.
    pub fn is_terminal(&self, id: PointId) -> bool {
        id == self.last_id()
    }

    // hit testing ---------------------------------------------------------------------------------

    /// Find the closest editable target to the given normalized position.
    ///
    /// Considers every point except the fixed first one, and the curve-center handle
    /// of every segment. Returns `None` when nothing is within `max_distance_squared`.
    /// Ties keep the first candidate in scan order.
    pub fn closest_point(
        &self,
        x: f32,
        y: f32,
        max_distance_squared: f32,
    ) -> Option<(PointId, EditTarget)> {
        let mut best: Option<(PointId, EditTarget)> = None;
        let mut best_distance = max_distance_squared;

        let distance_squared = |px: f32, py: f32| {
            let (dx, dy) = (px - x, py - y);
            dx * dx + dy * dy
        };

        for (order_index, &id) in self.order.iter().enumerate().skip(1) {
            let point = self.point(id).expect("chain ids are always valid");
            let left = self
                .point(self.order[order_index - 1])
                .expect("chain ids are always valid");

            let distance = distance_squared(point.pos_x().base(), point.pos_y().base());
            if distance < best_distance {
                best_distance = distance;
                best = Some((id, EditTarget::Position));
            }

            // The center handle sits at the segment's x midpoint, at the relative
            // height the curve center describes.
            let center_x = 0.5 * (left.pos_x().base() + point.pos_x().base());
            let center_y = left.pos_y().base()
                + point.center_y().base() * (point.pos_y().base() - left.pos_y().base());
            let distance = distance_squared(center_x, center_y);
            if distance < best_distance {
                best_distance = distance;
                best = Some((id, EditTarget::CurveCenter));
            }
        }
        best
    }

    // structural edits ----------------------------------------------------------------------------

    /// Insert a new point at the given normalized position, keeping the chain sorted
    /// by x. Returns the new point's id.
    pub fn insert_point(&mut self, x: f32, y: f32) -> Result<PointId, Error> {
        let x = x.clamp(0.0, 1.0);
        let next = self
            .order
            .iter()
            .skip(1)
            .copied()
            .find(|id| {
                self.point(*id)
                    .map(|point| point.pos_x().base() >= x)
                    .unwrap_or(false)
            })
            .unwrap_or_else(|| self.last_id());
        self.insert_before(next, CurvePoint::new(x, y.clamp(0.0, 1.0)))
    }

    /// Insert a point directly before `next` in the chain. Fails with
    /// [`Error::InvalidOperation`] if `next` is the fixed first point.
    pub fn insert_before(&mut self, next: PointId, point: CurvePoint) -> Result<PointId, Error> {
        if self.is_first(next) {
            return Err(Error::InvalidOperation(
                "can't insert before the fixed first point".to_string(),
            ));
        }
        let position = self.index_of(next).ok_or(Error::PointNotFound)?;
        let id = self.alloc(point);
        self.order.insert(position, id);
        Ok(id)
    }

    /// Delete a point. The fixed first and the terminal point can never be deleted.
    ///
    /// On success the removed id is returned so the caller can clear modulation
    /// links that referenced the point.
    pub fn delete_point(&mut self, id: PointId) -> Result<PointId, Error> {
        if self.is_first(id) || self.is_terminal(id) {
            return Err(Error::InvalidOperation(
                "can't delete the first or last point".to_string(),
            ));
        }
        let position = self.index_of(id).ok_or(Error::PointNotFound)?;
        self.order.remove(position);
        self.free(id);
        Ok(id)
    }

    /// Change the interpolation kind of the segment left of the given point.
    pub fn set_segment_kind(&mut self, id: PointId, kind: SegmentKind) -> Result<(), Error> {
        self.point_mut(id)?.set_kind(kind);
        Ok(())
    }

    // drag gestures -------------------------------------------------------------------------------

    /// Start a drag gesture: snapshots the point's segment parameters so drag deltas
    /// compose from a stable origin instead of compounding per mouse-move event.
    pub fn begin_drag(&mut self, id: PointId) -> Result<(), Error> {
        self.point_mut(id)?.begin_drag();
        Ok(())
    }

    /// Drag a point to a new normalized position.
    ///
    /// x is clamped between the neighbors' base x so the chain stays sorted, and
    /// forced to exactly 1 for the terminal point. The fixed first point can not be
    /// dragged.
    pub fn drag_position(&mut self, id: PointId, x: f32, y: f32) -> Result<(), Error> {
        if self.is_first(id) {
            return Err(Error::InvalidOperation(
                "can't move the fixed first point".to_string(),
            ));
        }
        let position = self.index_of(id).ok_or(Error::PointNotFound)?;
        let x = if self.is_terminal(id) {
            1.0
        } else {
            let min = self.point(self.order[position - 1])?.pos_x().base();
            let max = self.point(self.order[position + 1])?.pos_x().base();
            x.clamp(min, max)
        };
        let point = self.point_mut(id)?;
        point.pos_x_mut().set(x);
        point.pos_y_mut().set(y.clamp(0.0, 1.0));
        Ok(())
    }

    /// Drag the curve-center handle of the segment left of the given point.
    ///
    /// The mouse y is mapped to a relative height between the segment's endpoints,
    /// kept strictly inside the open interval so the power mapping never sees 0 or 1.
    /// Flat segments have no curve to bend and the drag is silently ignored, as is
    /// dragging a reserved sine segment.
    pub fn drag_curve_center(&mut self, id: PointId, y: f32) -> Result<(), Error> {
        if self.is_first(id) {
            return Err(Error::InvalidOperation(
                "the fixed first point has no segment".to_string(),
            ));
        }
        const EPSILON: f32 = 1e-3;
        let position = self.index_of(id).ok_or(Error::PointNotFound)?;
        let y_left = self.point(self.order[position - 1])?.pos_y().base();
        let point = self.point_mut(id)?;
        let y_right = point.pos_y().base();
        match point.kind() {
            SegmentKind::Power => {
                if y_left == y_right {
                    // Flat segment, nothing to bend.
                    return Ok(());
                }
                let t = ((y - y_left) / (y_right - y_left)).clamp(EPSILON, 1.0 - EPSILON);
                point.center_y_mut().set(t);
            }
            SegmentKind::Sine => {
                // Reserved: sine center drags are ignored until sine evaluation lands.
            }
        }
        Ok(())
    }

    /// Reset the segment left of the given point to its neutral shape.
    pub fn reset_segment(&mut self, id: PointId) -> Result<(), Error> {
        self.point_mut(id)?.reset_curve();
        Ok(())
    }

    /// Handle a right click at the given normalized position.
    ///
    /// Near a point this requests the point's context menu. Near a curve-center
    /// handle it resets the segment. Anywhere else it inserts a new point, which
    /// immediately becomes a drag target.
    pub fn right_click(
        &mut self,
        x: f32,
        y: f32,
        max_distance_squared: f32,
    ) -> Result<MenuRequest, Error> {
        match self.closest_point(x, y, max_distance_squared) {
            Some((id, EditTarget::Position)) => Ok(MenuRequest::PointMenu(id)),
            Some((id, EditTarget::CurveCenter)) => {
                self.reset_segment(id)?;
                Ok(MenuRequest::None)
            }
            None => {
                let id = self.insert_point(x, y)?;
                self.begin_drag(id)?;
                Ok(MenuRequest::None)
            }
        }
    }

    // evaluation ----------------------------------------------------------------------------------

    /// Evaluate the curve at `input` in [-1, 1].
    ///
    /// Inputs are sign-split: the curve is defined on [0, 1] and the output mirrors
    /// the input's sign. An input of exactly 0 returns exactly 0, so steep power
    /// segments never leak a DC offset into the output.
    ///
    /// `signals` carries the modulator block for the current evaluation time, or
    /// `None` for the unmodulated curve. Resolved point x positions are pushed right
    /// by their left neighbor, so a modulated point never crosses its predecessor,
    /// and the terminal point's resolved x is always exactly 1.
    pub fn forward(&self, input: f32, signals: Option<&ModulatorSignals>) -> f32 {
        if input == 0.0 {
            return 0.0;
        }
        let sign = if input < 0.0 { -1.0 } else { 1.0 };
        let x = input.abs().min(1.0);

        let first = self.point(self.order[0]).expect("chain ids are always valid");
        let mut x_left = first.pos_x().resolve(signals);
        let mut y_left = first.pos_y().resolve(signals);

        let last_index = self.order.len() - 1;
        for (order_index, &id) in self.order.iter().enumerate().skip(1) {
            let point = self.point(id).expect("chain ids are always valid");
            let x_right = if order_index == last_index {
                1.0
            } else {
                point.pos_x().resolve(signals).max(x_left)
            };
            let y_right = point.pos_y().resolve(signals);

            if x_right >= x || order_index == last_index {
                let t_rel = if x_right > x_left {
                    (x - x_left) / (x_right - x_left)
                } else {
                    1.0
                };
                let out = match point.kind() {
                    SegmentKind::Power => {
                        let power = point.power(signals);
                        if power > 0.0 {
                            y_left + t_rel.powf(power) * (y_right - y_left)
                        } else {
                            y_right - (1.0 - t_rel).powf(-power) * (y_right - y_left)
                        }
                    }
                    // Reserved: sine evaluation is not defined yet.
                    SegmentKind::Sine => 1.0,
                };
                return sign * out;
            }
            x_left = x_right;
            y_left = y_right;
        }
        unreachable!("the terminal point bounds every input");
    }
}

impl Default for CurveEditor {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------
