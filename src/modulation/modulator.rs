use crate::{editor::CurveEditor, modulation::PhaseSource};

// -------------------------------------------------------------------------------------------------

/// A modulation source: a curve sampled at a host-time-derived phase.
///
/// The curve is edited like any other [`CurveEditor`], but its output never shapes
/// audio directly. It is read as a signal that feeds linked parameter weights.
///
/// A modulator evaluates its own curve without modulation signals: modulation is a
/// single level deep, modulators can never modulate other modulators. This keeps
/// evaluation non-recursive by construction instead of by convention.
#[derive(Debug, Clone)]
pub struct Modulator {
    curve: CurveEditor,
    phase: PhaseSource,
}

impl Modulator {
    pub fn new() -> Self {
        Self {
            curve: CurveEditor::new(),
            phase: PhaseSource::new(),
        }
    }

    /// The modulator's curve.
    pub fn curve(&self) -> &CurveEditor {
        &self.curve
    }

    /// Mutable access to the modulator's curve, for the edit context.
    pub fn curve_mut(&mut self) -> &mut CurveEditor {
        &mut self.curve
    }

    /// The modulator's phase source.
    pub fn phase(&self) -> &PhaseSource {
        &self.phase
    }

    /// Mutable access to the modulator's phase source, for the edit context.
    pub fn phase_mut(&mut self) -> &mut PhaseSource {
        &mut self.phase
    }

    /// The modulation signal at the given host time: the curve sampled at the
    /// current oscillation phase.
    #[inline]
    pub fn signal(&self, beat_position: f64, seconds_played: f64) -> f32 {
        let phase = self.phase.phase(beat_position, seconds_played) as f32;
        self.curve.forward(phase, None)
    }
}

impl Default for Modulator {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_follows_phase() {
        let modulator = Modulator::new();
        // Default diagonal curve sampled at one cycle per bar.
        assert!((modulator.signal(2.0, 0.0) - 0.5).abs() < 1e-6);
        assert_eq!(modulator.signal(0.0, 0.0), 0.0);
        assert_eq!(modulator.signal(4.0, 0.0), 0.0);
    }
}
