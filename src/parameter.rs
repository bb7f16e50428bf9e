use crate::{
    modulation::{ModulatorId, ModulatorSignals},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Identifies which physical quantity of a [`CurvePoint`](crate::CurvePoint) a
/// [`Parameter`] represents.
///
/// The discriminants are part of the serialized state format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[repr(i32)]
pub enum ParameterKind {
    /// The curve's deviation from linear at the segment midpoint.
    CurveCenter = 1,
    /// Relative x-position of the point.
    PosX = 2,
    /// Relative y-position of the point.
    PosY = 3,
}

// -------------------------------------------------------------------------------------------------

/// A scalar with a base value, bounds and a set of weighted modulation sources.
///
/// Parameters are owned by their parent curve point. The modulation weights are owned
/// here as well: the [`ModulationRegistry`](crate::ModulationRegistry) only refers to
/// them through `(point, kind)` identities and mutates them via the owning editor.
///
/// Resolving a value is allocation-free and side-effect-free, so it can be called from
/// the real-time audio path.
#[derive(Debug, Clone)]
pub struct Parameter {
    kind: ParameterKind,
    base: f32,
    min: f32,
    max: f32,
    /// Weight per linked modulator, in link insertion order.
    weights: Vec<(ModulatorId, f32)>,
}

impl Parameter {
    /// Create a new parameter with the given kind, initial base value and bounds.
    pub fn new(kind: ParameterKind, base: f32, min: f32, max: f32) -> Self {
        debug_assert!(min <= max, "Invalid parameter bounds");
        Self {
            kind,
            base: base.clamp(min, max),
            min,
            max,
            weights: Vec::new(),
        }
    }

    /// Which physical quantity this parameter represents.
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    /// The unmodulated base value.
    #[inline]
    pub fn base(&self) -> f32 {
        self.base
    }

    /// The parameter's lower bound.
    pub fn min(&self) -> f32 {
        self.min
    }

    /// The parameter's upper bound.
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Set the base value, clamped into the parameter's bounds. Used when the value is
    /// explicitly changed by the user; modulation weights are unaffected.
    pub fn set(&mut self, value: f32) {
        self.base = value.clamp(self.min, self.max);
    }

    /// Register the given modulator as a source of this parameter.
    ///
    /// Fails with [`Error::AlreadyLinked`] if the modulator already feeds this
    /// parameter - a modulator can link at most once to each parameter.
    pub fn add_modulator(&mut self, modulator: ModulatorId, weight: f32) -> Result<(), Error> {
        if self.weights.iter().any(|(id, _)| *id == modulator) {
            return Err(Error::AlreadyLinked);
        }
        self.weights.push((modulator, weight.clamp(-1.0, 1.0)));
        Ok(())
    }

    /// Remove the given modulator from this parameter. No-op if it is not linked.
    pub fn remove_modulator(&mut self, modulator: ModulatorId) {
        self.weights.retain(|(id, _)| *id != modulator);
    }

    /// Set the modulation weight of an already linked modulator, clamped to [-1, 1].
    pub fn set_weight(&mut self, modulator: ModulatorId, weight: f32) {
        if let Some((_, w)) = self.weights.iter_mut().find(|(id, _)| *id == modulator) {
            *w = weight.clamp(-1.0, 1.0);
        } else {
            log::warn!("Ignoring weight update for unlinked modulator {modulator}");
        }
    }

    /// The modulation weight of the given modulator, if linked.
    pub fn weight(&self, modulator: ModulatorId) -> Option<f32> {
        self.weights
            .iter()
            .find(|(id, _)| *id == modulator)
            .map(|(_, w)| *w)
    }

    /// True if at least one modulator is linked to this parameter.
    #[inline]
    pub fn is_modulated(&self) -> bool {
        !self.weights.is_empty()
    }

    /// All linked modulators with their weights, in link insertion order.
    pub fn modulators(&self) -> impl Iterator<Item = (ModulatorId, f32)> + '_ {
        self.weights.iter().copied()
    }

    /// Resolve the parameter's live value: the base value plus all weighted modulator
    /// signals, clamped into the parameter's bounds.
    ///
    /// Passing `None` resolves the unmodulated base value, which is also what the
    /// modulators themselves use when evaluating their own curves.
    #[inline]
    pub fn resolve(&self, signals: Option<&ModulatorSignals>) -> f32 {
        let mut value = self.base;
        if let Some(signals) = signals {
            for (modulator, weight) in &self.weights {
                value += weight * signals.get(*modulator);
            }
        }
        value.clamp(self.min, self.max)
    }
}

// -------------------------------------------------------------------------------------------------
