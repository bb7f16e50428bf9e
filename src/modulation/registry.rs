use crate::{
    editor::{CurveEditor, PointId},
    modulation::Modulator,
    parameter::{Parameter, ParameterKind},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Fixed modulator capacity of a registry. The bound keeps modulator ids stable for
/// the registry's whole lifetime.
pub const MAX_MODULATORS: usize = 10;

/// Maximum number of outgoing links per modulator.
pub const MAX_LINKS_PER_MODULATOR: usize = 12;

// -------------------------------------------------------------------------------------------------

/// Index of a modulator within its [`ModulationRegistry`].
///
/// Modulators are never removed, so plain indices are stable identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModulatorId(usize);

impl ModulatorId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ModulatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// -------------------------------------------------------------------------------------------------

/// Stable identity of a modulation link. Stale ids of removed links are detected,
/// even when the slot got reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId {
    index: u32,
    generation: u32,
}

// -------------------------------------------------------------------------------------------------

/// A modulator → parameter association.
///
/// The link names its target by `(editor, point, kind)` identity. The modulation
/// weight itself lives in the target [`Parameter`], the registry only mediates
/// access to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub modulator: ModulatorId,
    /// Index of the target's owning editor in the engine's editor list.
    pub editor: usize,
    pub point: PointId,
    pub kind: ParameterKind,
}

// -------------------------------------------------------------------------------------------------

/// All modulator output values at one evaluation time.
///
/// Filled once per engine evaluation and threaded down to every
/// [`Parameter::resolve`] call, so each modulator's curve is sampled exactly once
/// per call regardless of how many parameters it feeds. Fixed-size, no allocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModulatorSignals {
    values: [f32; MAX_MODULATORS],
}

impl ModulatorSignals {
    /// The given modulator's signal value. Unpopulated modulators read as 0.
    #[inline]
    pub fn get(&self, modulator: ModulatorId) -> f32 {
        self.values.get(modulator.0).copied().unwrap_or(0.0)
    }

    #[inline]
    pub(crate) fn set(&mut self, modulator: ModulatorId, value: f32) {
        if let Some(slot) = self.values.get_mut(modulator.0) {
            *slot = value;
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct LinkSlot {
    generation: u32,
    link: Option<Link>,
}

// -------------------------------------------------------------------------------------------------

/// Owns the modulators and the link table between modulators and curve parameters.
///
/// Links can only target shaper editors, never a modulator's own curve, so
/// modulation stays a single level deep. Link iteration is stable in insertion
/// order, which serialization relies on for deterministic round-trips.
#[derive(Debug, Clone, Default)]
pub struct ModulationRegistry {
    modulators: Vec<Modulator>,
    link_slots: Vec<LinkSlot>,
    /// Link ids in creation order.
    link_order: Vec<LinkId>,
}

impl ModulationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // modulators ----------------------------------------------------------------------------------

    /// Add a new modulator. Fails when the fixed capacity is exhausted.
    pub fn add_modulator(&mut self) -> Result<ModulatorId, Error> {
        if self.modulators.len() >= MAX_MODULATORS {
            return Err(Error::ModulatorLimitExceeded);
        }
        self.modulators.push(Modulator::new());
        Ok(ModulatorId(self.modulators.len() - 1))
    }

    /// Number of modulators.
    pub fn num_modulators(&self) -> usize {
        self.modulators.len()
    }

    /// Ids of all modulators.
    pub fn modulator_ids(&self) -> impl Iterator<Item = ModulatorId> {
        (0..self.modulators.len()).map(ModulatorId)
    }

    pub fn modulator(&self, id: ModulatorId) -> Result<&Modulator, Error> {
        self.modulators.get(id.0).ok_or(Error::ModulatorNotFound(id.0))
    }

    pub fn modulator_mut(&mut self, id: ModulatorId) -> Result<&mut Modulator, Error> {
        self.modulators
            .get_mut(id.0)
            .ok_or(Error::ModulatorNotFound(id.0))
    }

    // links ---------------------------------------------------------------------------------------

    /// Create a link from a modulator to a point parameter in one of the given
    /// shaper editors.
    ///
    /// Rejects duplicate `(modulator, point, kind)` links, links beyond the
    /// per-modulator limit, any link to an editor's fixed first point, whose
    /// position anchors the curve at the origin, and `PosX` links to an editor's
    /// terminal point, whose x is pinned and can not be modulated.
    pub fn add_link(
        &mut self,
        editors: &mut [CurveEditor],
        modulator: ModulatorId,
        editor: usize,
        point: PointId,
        kind: ParameterKind,
        weight: f32,
    ) -> Result<LinkId, Error> {
        if modulator.0 >= self.modulators.len() {
            return Err(Error::ModulatorNotFound(modulator.0));
        }
        if self.num_links_of(modulator) >= MAX_LINKS_PER_MODULATOR {
            return Err(Error::LinkLimitExceeded);
        }
        let target_editor = editors.get_mut(editor).ok_or_else(|| {
            Error::InvalidOperation(format!("no editor with index {editor}"))
        })?;
        if target_editor.is_first(point) {
            return Err(Error::InvalidOperation(
                "the fixed first point anchors the origin and can't be modulated".to_string(),
            ));
        }
        if kind == ParameterKind::PosX && target_editor.is_terminal(point) {
            return Err(Error::InvalidOperation(
                "the terminal point's x is pinned and can't be modulated".to_string(),
            ));
        }
        // The parameter itself rejects duplicates of the same modulator.
        Self::parameter_mut(target_editor, point, kind)?.add_modulator(modulator, weight)?;

        let link = Link {
            modulator,
            editor,
            point,
            kind,
        };
        let id = self.alloc(link);
        self.link_order.push(id);
        log::debug!("Linked modulator {modulator} to {kind} of point {point} in editor {editor}");
        Ok(id)
    }

    /// Remove a link and detach its weight from the target parameter.
    pub fn remove_link(&mut self, editors: &mut [CurveEditor], id: LinkId) -> Result<(), Error> {
        let link = *self.link(id)?;
        if let Some(target_editor) = editors.get_mut(link.editor) {
            if let Ok(parameter) = Self::parameter_mut(target_editor, link.point, link.kind) {
                parameter.remove_modulator(link.modulator);
            }
        }
        self.free(id);
        Ok(())
    }

    /// The link with the given id. Fails for stale ids.
    pub fn link(&self, id: LinkId) -> Result<&Link, Error> {
        self.link_slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.link.as_ref())
            .ok_or(Error::LinkNotFound)
    }

    /// All links of the given modulator in creation order.
    pub fn links_of(&self, modulator: ModulatorId) -> impl Iterator<Item = (LinkId, &Link)> {
        self.link_order.iter().filter_map(move |id| {
            let link = self.link(*id).ok()?;
            (link.modulator == modulator).then_some((*id, link))
        })
    }

    /// Number of outgoing links of the given modulator.
    pub fn num_links_of(&self, modulator: ModulatorId) -> usize {
        self.links_of(modulator).count()
    }

    /// Set a link's modulation weight, clamped to [-1, 1].
    pub fn set_weight(
        &mut self,
        editors: &mut [CurveEditor],
        id: LinkId,
        weight: f32,
    ) -> Result<(), Error> {
        let link = *self.link(id)?;
        let target_editor = editors.get_mut(link.editor).ok_or_else(|| {
            Error::InvalidOperation(format!("no editor with index {}", link.editor))
        })?;
        Self::parameter_mut(target_editor, link.point, link.kind)?
            .set_weight(link.modulator, weight);
        Ok(())
    }

    /// A link's current modulation weight.
    pub fn weight(&self, editors: &[CurveEditor], id: LinkId) -> Result<f32, Error> {
        let link = self.link(id)?;
        let target_editor = editors.get(link.editor).ok_or_else(|| {
            Error::InvalidOperation(format!("no editor with index {}", link.editor))
        })?;
        Self::parameter(target_editor, link.point, link.kind)?
            .weight(link.modulator)
            .ok_or(Error::LinkNotFound)
    }

    /// Drop every link that targets the given point, across all modulators.
    ///
    /// Called right after a point deletion. The point's parameters died with it, so
    /// only the link table needs cleanup.
    pub fn clear_links_to_point(&mut self, editor: usize, point: PointId) {
        let stale = self
            .link_order
            .iter()
            .copied()
            .filter(|id| {
                self.link(*id)
                    .map(|link| link.editor == editor && link.point == point)
                    .unwrap_or(false)
            })
            .collect::<Vec<_>>();
        for id in stale {
            log::debug!("Dropping link to deleted point {point} in editor {editor}");
            self.free(id);
        }
    }

    // evaluation ----------------------------------------------------------------------------------

    /// Sample every modulator at the given host time.
    #[inline]
    pub fn signals(&self, beat_position: f64, seconds_played: f64) -> ModulatorSignals {
        let mut signals = ModulatorSignals::default();
        for (index, modulator) in self.modulators.iter().enumerate() {
            signals.set(
                ModulatorId(index),
                modulator.signal(beat_position, seconds_played),
            );
        }
        signals
    }

    // internals -----------------------------------------------------------------------------------

    fn parameter<'a>(
        editor: &'a CurveEditor,
        point: PointId,
        kind: ParameterKind,
    ) -> Result<&'a Parameter, Error> {
        let point = editor.point(point)?;
        Ok(match kind {
            ParameterKind::CurveCenter => point.center_y(),
            ParameterKind::PosX => point.pos_x(),
            ParameterKind::PosY => point.pos_y(),
        })
    }

    fn parameter_mut<'a>(
        editor: &'a mut CurveEditor,
        point: PointId,
        kind: ParameterKind,
    ) -> Result<&'a mut Parameter, Error> {
        let point = editor.point_mut(point)?;
        Ok(match kind {
            ParameterKind::CurveCenter => point.center_y_mut(),
            ParameterKind::PosX => point.pos_x_mut(),
            ParameterKind::PosY => point.pos_y_mut(),
        })
    }

    fn alloc(&mut self, link: Link) -> LinkId {
        if let Some(index) = self.link_slots.iter().position(|slot| slot.link.is_none()) {
            let slot = &mut self.link_slots[index];
            slot.link = Some(link);
            LinkId {
                index: index as u32,
                generation: slot.generation,
            }
        } else {
            self.link_slots.push(LinkSlot {
                generation: 0,
                link: Some(link),
            });
            LinkId {
                index: (self.link_slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    fn free(&mut self, id: LinkId) {
        let slot = &mut self.link_slots[id.index as usize];
        debug_assert_eq!(slot.generation, id.generation);
        slot.link = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.link_order.retain(|other| *other != id);
    }
}

// -------------------------------------------------------------------------------------------------
