use crate::{
    editor::{CurveEditor, EditTarget, MenuRequest, PointId},
    modulation::{LinkId, ModulationRegistry, ModulatorId},
    parameter::ParameterKind,
    Error,
};

// -------------------------------------------------------------------------------------------------

/// The whole curve engine: a set of shaper editors plus the modulation registry.
///
/// The engine mediates every operation that spans both sides: point deletion with
/// link cleanup, link creation flows, and evaluation with a per-call modulator
/// signal block. Single editors are accessed by index; the index doubles as the
/// editor identity inside modulation links and serialized state.
#[derive(Debug, Clone)]
pub struct CurveEngine {
    editors: Vec<CurveEditor>,
    registry: ModulationRegistry,
}

impl CurveEngine {
    /// Create an engine with the given number of default-diagonal editors.
    pub fn new(num_editors: usize) -> Self {
        Self {
            editors: (0..num_editors).map(|_| CurveEditor::new()).collect(),
            registry: ModulationRegistry::new(),
        }
    }

    // accessors -----------------------------------------------------------------------------------

    /// Number of shaper editors.
    pub fn num_editors(&self) -> usize {
        self.editors.len()
    }

    /// All shaper editors.
    pub fn editors(&self) -> &[CurveEditor] {
        &self.editors
    }

    /// The shaper editor with the given index.
    pub fn editor(&self, index: usize) -> Result<&CurveEditor, Error> {
        self.editors
            .get(index)
            .ok_or_else(|| Error::InvalidOperation(format!("no editor with index {index}")))
    }

    /// Mutable access to the shaper editor with the given index, for the edit
    /// context. Point deletion must go through [`CurveEngine::delete_point`] so
    /// modulation links get cleaned up.
    pub fn editor_mut(&mut self, index: usize) -> Result<&mut CurveEditor, Error> {
        self.editors
            .get_mut(index)
            .ok_or_else(|| Error::InvalidOperation(format!("no editor with index {index}")))
    }

    /// The modulation registry.
    pub fn registry(&self) -> &ModulationRegistry {
        &self.registry
    }

    /// Mutable access to the registry's modulators, for the edit context.
    pub fn registry_mut(&mut self) -> &mut ModulationRegistry {
        &mut self.registry
    }

    /// Editors and registry at once, for operations that need to wire both.
    pub(crate) fn parts_mut(&mut self) -> (&mut [CurveEditor], &mut ModulationRegistry) {
        (&mut self.editors, &mut self.registry)
    }

    // editing -------------------------------------------------------------------------------------

    /// Delete a point from a shaper editor and drop every modulation link that
    /// targeted it.
    pub fn delete_point(&mut self, editor: usize, point: PointId) -> Result<(), Error> {
        let removed = self.editor_mut(editor)?.delete_point(point)?;
        self.registry.clear_links_to_point(editor, removed);
        Ok(())
    }

    /// Link a modulator to a point parameter. The initial weight is 1.
    pub fn add_link(
        &mut self,
        modulator: ModulatorId,
        editor: usize,
        point: PointId,
        kind: ParameterKind,
    ) -> Result<LinkId, Error> {
        self.registry
            .add_link(&mut self.editors, modulator, editor, point, kind, 1.0)
    }

    /// Remove a modulation link.
    pub fn remove_link(&mut self, id: LinkId) -> Result<(), Error> {
        self.registry.remove_link(&mut self.editors, id)
    }

    /// Set a link's modulation weight, clamped to [-1, 1].
    pub fn set_link_weight(&mut self, id: LinkId, weight: f32) -> Result<(), Error> {
        self.registry.set_weight(&mut self.editors, id, weight)
    }

    /// A link's current modulation weight.
    pub fn link_weight(&self, id: LinkId) -> Result<f32, Error> {
        self.registry.weight(&self.editors, id)
    }

    /// Drop a modulator's connect gesture onto a shaper editor.
    ///
    /// Dropping on a curve-center handle links immediately. Dropping on a point
    /// asks the caller which position axis to link by returning a
    /// [`MenuRequest::DirectionMenu`]; the caller answers with
    /// [`CurveEngine::add_link`]. Dropping elsewhere does nothing.
    pub fn connect(
        &mut self,
        modulator: ModulatorId,
        editor: usize,
        x: f32,
        y: f32,
        max_distance_squared: f32,
    ) -> Result<MenuRequest, Error> {
        match self
            .editor(editor)?
            .closest_point(x, y, max_distance_squared)
        {
            Some((point, EditTarget::CurveCenter)) => {
                let id = self.add_link(modulator, editor, point, ParameterKind::CurveCenter)?;
                Ok(MenuRequest::LinkMenu(id))
            }
            Some((point, EditTarget::Position)) => Ok(MenuRequest::DirectionMenu { editor, point }),
            None => Ok(MenuRequest::None),
        }
    }

    /// Handle a right click in a shaper editor.
    pub fn right_click(
        &mut self,
        editor: usize,
        x: f32,
        y: f32,
        max_distance_squared: f32,
    ) -> Result<MenuRequest, Error> {
        self.editor_mut(editor)?
            .right_click(x, y, max_distance_squared)
    }

    // evaluation ----------------------------------------------------------------------------------

    /// Evaluate a shaper editor at the given input and host time.
    ///
    /// Samples every modulator exactly once into a fixed-size signal block, then
    /// evaluates the curve with all parameter modulation applied. Allocation-free.
    pub fn forward(
        &self,
        editor: usize,
        input: f32,
        beat_position: f64,
        seconds_played: f64,
    ) -> Result<f32, Error> {
        let signals = self.registry.signals(beat_position, seconds_played);
        Ok(self.editor(editor)?.forward(input, Some(&signals)))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulated_forward_clamps() {
        let mut engine = CurveEngine::new(2);
        let middle = engine.editor_mut(0).unwrap().insert_point(0.5, 0.5).unwrap();
        let modulator = engine.registry_mut().add_modulator().unwrap();

        // The default diagonal modulator curve outputs 0.6 at phase 0.6, which is
        // beat 2.4 at one cycle per bar.
        engine
            .add_link(modulator, 0, middle, ParameterKind::PosY)
            .unwrap();

        // base 0.5 + 1.0 * 0.6 clamps to 1.0, which forward reports at the point.
        let out = engine.forward(0, 0.5, 2.4, 0.0).unwrap();
        assert!((out - 1.0).abs() < 1e-6, "forward = {out}");

        // At beat 0 the modulator is silent and the curve is back to its base shape.
        let out = engine.forward(0, 0.5, 0.0, 0.0).unwrap();
        assert!((out - 0.5).abs() < 1e-6, "forward = {out}");

        // The second editor is independent and unmodulated.
        let out = engine.forward(1, 0.5, 2.4, 0.0).unwrap();
        assert!((out - 0.5).abs() < 1e-6, "forward = {out}");
    }

    #[test]
    fn test_modulated_pos_x_stays_ordered() {
        let mut engine = CurveEngine::new(1);
        let a = engine.editor_mut(0).unwrap().insert_point(0.3, 0.3).unwrap();
        let b = engine.editor_mut(0).unwrap().insert_point(0.5, 0.9).unwrap();
        let modulator = engine.registry_mut().add_modulator().unwrap();

        // At beat 2.4 the default diagonal modulator outputs 0.6; with weight -1
        // b's x resolves to clamp(0.5 - 0.6) = 0, which its left neighbor pushes
        // back up to a's resolved x of 0.3.
        let link = engine.add_link(modulator, 0, b, ParameterKind::PosX).unwrap();
        engine.set_link_weight(link, -1.0).unwrap();

        // Left of a the first segment is untouched.
        let out = engine.forward(0, 0.2, 2.4, 0.0).unwrap();
        assert!((out - 0.2).abs() < 1e-5, "forward(0.2) = {out}");

        // Right of the collapsed point the segment from b's y to the terminal
        // point applies: the lookup stayed ordered instead of scanning past the
        // crossed neighbor.
        let out = engine.forward(0, 0.4, 2.4, 0.0).unwrap();
        assert!((0.9..=1.0).contains(&out), "forward(0.4) = {out}");

        // The range invariant holds across the whole input interval.
        let mut x = -1.0;
        while x <= 1.0 {
            let out = engine.forward(0, x, 2.4, 0.0).unwrap();
            assert!((-1.0..=1.0).contains(&out), "forward({x}) = {out}");
            x += 0.01;
        }

        // With a silent modulator the base layout is back.
        let out = engine.forward(0, 0.4, 0.0, 0.0).unwrap();
        assert!((out - 0.6).abs() < 1e-5, "forward(0.4) = {out}");
        assert_eq!(engine.editor(0).unwrap().point(a).unwrap().pos_x().base(), 0.3);
    }

    #[test]
    fn test_origin_point_stays_unmodulated() {
        let mut engine = CurveEngine::new(1);
        let first = engine.editor(0).unwrap().first_id();
        let modulator = engine.registry_mut().add_modulator().unwrap();

        assert!(matches!(
            engine.add_link(modulator, 0, first, ParameterKind::PosY),
            Err(Error::InvalidOperation(_))
        ));

        // The curve keeps passing through the origin: with an active modulator,
        // near-zero inputs stay near zero instead of jumping to a lifted y_left.
        let out = engine.forward(0, 1e-4, 2.4, 0.0).unwrap();
        assert!(out.abs() < 1e-3, "forward(1e-4) = {out}");
        assert_eq!(engine.forward(0, 0.0, 2.4, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_delete_point_clears_links() {
        let mut engine = CurveEngine::new(1);
        let middle = engine.editor_mut(0).unwrap().insert_point(0.5, 0.5).unwrap();
        let modulator = engine.registry_mut().add_modulator().unwrap();
        engine
            .add_link(modulator, 0, middle, ParameterKind::PosY)
            .unwrap();
        assert_eq!(engine.registry().num_links_of(modulator), 1);

        engine.delete_point(0, middle).unwrap();
        assert_eq!(engine.registry().num_links_of(modulator), 0);
        assert_eq!(engine.editor(0).unwrap().len(), 2);
    }

    #[test]
    fn test_connect_flow() {
        let mut engine = CurveEngine::new(1);
        let middle = engine.editor_mut(0).unwrap().insert_point(0.5, 0.8).unwrap();
        let modulator = engine.registry_mut().add_modulator().unwrap();

        // Dropping on the point asks for a direction.
        let request = engine.connect(modulator, 0, 0.5, 0.8, 0.001).unwrap();
        assert_eq!(
            request,
            MenuRequest::DirectionMenu {
                editor: 0,
                point: middle
            }
        );
        let id = engine
            .add_link(modulator, 0, middle, ParameterKind::PosX)
            .unwrap();
        assert_eq!(engine.link_weight(id).unwrap(), 1.0);

        // Dropping on the first segment's center handle links immediately.
        let request = engine.connect(modulator, 0, 0.25, 0.4, 0.001).unwrap();
        assert!(matches!(request, MenuRequest::LinkMenu(_)));
        assert_eq!(engine.registry().num_links_of(modulator), 2);

        // Dropping on empty space does nothing.
        let request = engine.connect(modulator, 0, 0.9, 0.1, 0.001).unwrap();
        assert_eq!(request, MenuRequest::None);
        assert_eq!(engine.registry().num_links_of(modulator), 2);
    }
}
