use crate::parameter::{Parameter, ParameterKind};

// -------------------------------------------------------------------------------------------------

/// Largest magnitude of the power exponent a segment can reach. Curve centers dragged
/// all the way to a corner saturate here instead of producing infinities.
pub const MAX_POWER: f32 = 30.0;

// -------------------------------------------------------------------------------------------------

/// How the segment left of a point interpolates between its endpoints.
///
/// The discriminants are part of the serialized state format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[repr(i32)]
pub enum SegmentKind {
    /// Power-law interpolation, bent by the segment's curve center.
    Power = 0,
    /// Reserved: sine interpolation. Carried through state and edits, but evaluation
    /// is stubbed for now.
    Sine = 1,
}

// -------------------------------------------------------------------------------------------------

/// Map a normalized curve-center position `t` in (0, 1) to a power exponent.
///
/// `t == 0.5` is the linear segment (power 1). Values below 0.5 bend the segment
/// towards the left endpoint with `power = ln(t)/ln(0.5)`; values above 0.5 mirror
/// the bend and are encoded as a negated exponent, `-(ln(1-t)/ln(0.5))`. The
/// negative sign selects the mirrored evaluation branch, it is not a reciprocal.
pub fn power_from_center(t: f32) -> f32 {
    const EPSILON: f32 = 1e-6;
    let t = t.clamp(EPSILON, 1.0 - EPSILON);
    let power = if t < 0.5 {
        t.ln() / 0.5f32.ln()
    } else {
        (1.0 - t).ln() / 0.5f32.ln()
    };
    let power = power.min(MAX_POWER);
    if t > 0.5 {
        -power
    } else {
        power
    }
}

// -------------------------------------------------------------------------------------------------

/// One control point of a curve.
///
/// A point owns the interpolation parameters of the segment to its *left*: the
/// segment kind, the modulatable curve center and the reserved sine frequency.
/// Positions and the curve center are [`Parameter`]s so modulators can attach to
/// them; the resolved (modulated) values never leave the point's bounds.
#[derive(Debug, Clone)]
pub struct CurvePoint {
    pos_x: Parameter,
    pos_y: Parameter,
    center_y: Parameter,
    kind: SegmentKind,
    omega: f32,
    omega_previous: f32,
}

impl CurvePoint {
    /// Default sine frequency for new and reset segments.
    pub(crate) const DEFAULT_OMEGA: f32 = 0.5;

    /// Create a new point at the given normalized position with a linear segment.
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            pos_x: Parameter::new(ParameterKind::PosX, x, 0.0, 1.0),
            pos_y: Parameter::new(ParameterKind::PosY, y, 0.0, 1.0),
            center_y: Parameter::new(ParameterKind::CurveCenter, 0.5, 0.0, 1.0),
            kind: SegmentKind::Power,
            omega: Self::DEFAULT_OMEGA,
            omega_previous: Self::DEFAULT_OMEGA,
        }
    }

    /// Interpolation kind of the segment left of this point.
    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: SegmentKind) {
        self.kind = kind;
    }

    /// The point's x-position parameter.
    pub fn pos_x(&self) -> &Parameter {
        &self.pos_x
    }

    pub(crate) fn pos_x_mut(&mut self) -> &mut Parameter {
        &mut self.pos_x
    }

    /// The point's y-position parameter.
    pub fn pos_y(&self) -> &Parameter {
        &self.pos_y
    }

    pub(crate) fn pos_y_mut(&mut self) -> &mut Parameter {
        &mut self.pos_y
    }

    /// The curve-center parameter of the segment left of this point.
    pub fn center_y(&self) -> &Parameter {
        &self.center_y
    }

    pub(crate) fn center_y_mut(&mut self) -> &mut Parameter {
        &mut self.center_y
    }

    /// Sine frequency of the segment left of this point (reserved).
    pub fn omega(&self) -> f32 {
        self.omega
    }

    pub(crate) fn set_omega(&mut self, omega: f32) {
        self.omega = omega;
    }

    /// Sine frequency as it was when the current drag gesture started (reserved).
    pub fn omega_previous(&self) -> f32 {
        self.omega_previous
    }

    pub(crate) fn set_omega_previous(&mut self, omega: f32) {
        self.omega_previous = omega;
    }

    /// Record the current sine frequency as the origin of a new drag gesture.
    /// Curve-center drags need no snapshot: they map the mouse position to an
    /// absolute relative height within the segment.
    pub(crate) fn begin_drag(&mut self) {
        self.omega_previous = self.omega;
    }

    /// Reset the segment left of this point to its neutral shape: a linear power
    /// curve, or the default frequency for reserved sine segments.
    pub(crate) fn reset_curve(&mut self) {
        match self.kind {
            SegmentKind::Power => self.center_y.set(0.5),
            SegmentKind::Sine => {
                self.omega = Self::DEFAULT_OMEGA;
                self.omega_previous = Self::DEFAULT_OMEGA;
            }
        }
    }

    /// Exponent of the segment left of this point, derived from the resolved
    /// curve-center value.
    #[inline]
    pub(crate) fn power(&self, signals: Option<&crate::modulation::ModulatorSignals>) -> f32 {
        power_from_center(self.center_y.resolve(signals))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_from_center() {
        // The segment midpoint is the linear curve.
        assert!((power_from_center(0.5) - 1.0).abs() < 1e-5);

        // Below 0.5 the exponent grows beyond 1 and stays positive.
        let p25 = power_from_center(0.25);
        let p10 = power_from_center(0.1);
        assert!(p25 > 1.0);
        assert!(p10 > p25);

        // Above 0.5 the exponent mirrors with a negated sign.
        let p75 = power_from_center(0.75);
        assert!(p75 < 0.0);
        assert!((p75 + p25).abs() < 1e-5);

        // Saturates at the corners instead of blowing up.
        assert!(power_from_center(0.0) <= MAX_POWER);
        assert!(power_from_center(1.0) >= -MAX_POWER);
        assert!(power_from_center(0.0).is_finite());
        assert!(power_from_center(1.0).is_finite());
    }

    #[test]
    fn test_begin_drag_snapshots_omega() {
        let mut point = CurvePoint::new(0.5, 0.5);
        point.set_omega(0.3);
        assert_eq!(point.omega_previous(), CurvePoint::DEFAULT_OMEGA);
        point.begin_drag();
        assert_eq!(point.omega_previous(), 0.3);
    }

    #[test]
    fn test_reset_curve() {
        let mut point = CurvePoint::new(0.5, 0.5);
        point.center_y_mut().set(0.9);
        point.reset_curve();
        assert_eq!(point.center_y().base(), 0.5);

        point.set_kind(SegmentKind::Sine);
        point.set_omega(2.0);
        point.reset_curve();
        assert_eq!(point.omega(), CurvePoint::DEFAULT_OMEGA);
        assert_eq!(point.omega_previous(), CurvePoint::DEFAULT_OMEGA);
    }
}
