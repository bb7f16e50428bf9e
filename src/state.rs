use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    editor::CurveEditor,
    engine::CurveEngine,
    modulation::{LoopMode, MAX_LINKS_PER_MODULATOR, MAX_MODULATORS},
    parameter::ParameterKind,
    point::SegmentKind,
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Version triple of the binary state format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

/// The state format version this build reads and writes.
pub const FORMAT_VERSION: Version = Version {
    major: 1,
    minor: 0,
    patch: 0,
};

// Upper bounds for serialized counts. Anything beyond these is a corrupt blob, not
// a plausible state.
const MAX_STATE_EDITORS: i32 = 256;
const MAX_STATE_POINTS: i32 = 100_000;

// -------------------------------------------------------------------------------------------------

/// Write one editor's curve state.
///
/// The fixed first point is never serialized. The terminal point is written as the
/// last record; on load it overwrites the fresh editor's terminal point instead of
/// inserting a new one.
pub fn save_editor<W: Write>(editor: &CurveEditor, writer: &mut W) -> Result<(), Error> {
    writer.write_i32::<LittleEndian>((editor.len() - 1) as i32)?;
    for id in editor.point_ids().skip(1) {
        let point = editor.point(id)?;
        writer.write_f32::<LittleEndian>(point.pos_x().base())?;
        writer.write_f32::<LittleEndian>(point.pos_y().base())?;
        writer.write_f32::<LittleEndian>(point.center_y().base())?;
        writer.write_i32::<LittleEndian>(point.kind() as i32)?;
        writer.write_f32::<LittleEndian>(point.omega())?;
    }
    Ok(())
}

/// Read one editor's curve state into a fresh editor.
pub fn load_editor<R: Read>(reader: &mut R) -> Result<CurveEditor, Error> {
    let count = reader.read_i32::<LittleEndian>()?;
    if !(1..=MAX_STATE_POINTS).contains(&count) {
        return Err(Error::CorruptState(format!("bad point count {count}")));
    }
    let mut editor = CurveEditor::new();
    for index in 0..count {
        let pos_x = reader.read_f32::<LittleEndian>()?;
        let pos_y = reader.read_f32::<LittleEndian>()?;
        let center_y = reader.read_f32::<LittleEndian>()?;
        let kind_tag = reader.read_i32::<LittleEndian>()?;
        let omega = reader.read_f32::<LittleEndian>()?;

        let kind = SegmentKind::from_repr(kind_tag)
            .ok_or_else(|| Error::CorruptState(format!("unknown segment kind {kind_tag}")))?;

        let id = if index == count - 1 {
            editor.last_id()
        } else {
            let next = editor.last_id();
            editor.insert_before(next, crate::point::CurvePoint::new(pos_x, pos_y))?
        };
        let point = editor.point_mut(id)?;
        point.pos_x_mut().set(pos_x);
        point.pos_y_mut().set(pos_y);
        point.center_y_mut().set(center_y);
        point.set_kind(kind);
        point.set_omega(omega);
        point.set_omega_previous(omega);
    }
    Ok(editor)
}

// -------------------------------------------------------------------------------------------------

/// Write the whole engine state: format version, every shaper editor, then every
/// modulator's curve and links, then every modulator's phase settings.
pub fn save_state<W: Write>(engine: &CurveEngine, writer: &mut W) -> Result<(), Error> {
    writer.write_i32::<LittleEndian>(FORMAT_VERSION.major)?;
    writer.write_i32::<LittleEndian>(FORMAT_VERSION.minor)?;
    writer.write_i32::<LittleEndian>(FORMAT_VERSION.patch)?;

    writer.write_i32::<LittleEndian>(engine.num_editors() as i32)?;
    for editor in engine.editors() {
        save_editor(editor, writer)?;
    }

    let registry = engine.registry();
    writer.write_i32::<LittleEndian>(registry.num_modulators() as i32)?;
    for modulator_id in registry.modulator_ids() {
        let modulator = registry.modulator(modulator_id)?;
        save_editor(modulator.curve(), writer)?;

        writer.write_i32::<LittleEndian>(registry.num_links_of(modulator_id) as i32)?;
        for (link_id, link) in registry.links_of(modulator_id) {
            let point_index = engine
                .editor(link.editor)?
                .index_of(link.point)
                .ok_or(Error::PointNotFound)?;
            writer.write_i32::<LittleEndian>(link.editor as i32)?;
            writer.write_i32::<LittleEndian>(point_index as i32)?;
            writer.write_i32::<LittleEndian>(link.kind as i32)?;
            writer.write_f32::<LittleEndian>(registry.weight(engine.editors(), link_id)?)?;
        }
    }

    for modulator_id in registry.modulator_ids() {
        let phase = registry.modulator(modulator_id)?.phase();
        writer.write_i32::<LittleEndian>(phase.mode() as i32)?;
        writer.write_i32::<LittleEndian>(phase.tempo_exponent() as i32)?;
        writer.write_f64::<LittleEndian>(phase.seconds_period())?;
    }
    Ok(())
}

/// Read a whole engine state into a fresh engine.
///
/// Fails with [`Error::VersionMismatch`] for blobs written by an unknown format
/// version and with [`Error::CorruptState`] for structurally invalid blobs. The
/// caller swaps its live engine only on success, so a failed load never leaves a
/// partially applied state behind.
pub fn load_state<R: Read>(reader: &mut R) -> Result<CurveEngine, Error> {
    let version = Version {
        major: reader.read_i32::<LittleEndian>()?,
        minor: reader.read_i32::<LittleEndian>()?,
        patch: reader.read_i32::<LittleEndian>()?,
    };
    if version != FORMAT_VERSION {
        return Err(Error::VersionMismatch {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
        });
    }

    let num_editors = reader.read_i32::<LittleEndian>()?;
    if !(1..=MAX_STATE_EDITORS).contains(&num_editors) {
        return Err(Error::CorruptState(format!("bad editor count {num_editors}")));
    }
    let mut engine = CurveEngine::new(num_editors as usize);
    for index in 0..num_editors as usize {
        *engine.editor_mut(index)? = load_editor(reader)?;
    }

    let num_modulators = reader.read_i32::<LittleEndian>()?;
    if !(0..=MAX_MODULATORS as i32).contains(&num_modulators) {
        return Err(Error::CorruptState(format!(
            "bad modulator count {num_modulators}"
        )));
    }
    for _ in 0..num_modulators {
        let (_, registry) = engine.parts_mut();
        let modulator_id = registry.add_modulator()?;
        let curve = load_editor(reader)?;

        let num_links = reader.read_i32::<LittleEndian>()?;
        if !(0..=MAX_LINKS_PER_MODULATOR as i32).contains(&num_links) {
            return Err(Error::CorruptState(format!("bad link count {num_links}")));
        }
        let mut links = Vec::with_capacity(num_links as usize);
        for _ in 0..num_links {
            let editor_index = reader.read_i32::<LittleEndian>()?;
            let point_index = reader.read_i32::<LittleEndian>()?;
            let kind_tag = reader.read_i32::<LittleEndian>()?;
            let weight = reader.read_f32::<LittleEndian>()?;
            let kind = ParameterKind::from_repr(kind_tag).ok_or_else(|| {
                Error::CorruptState(format!("unknown parameter kind {kind_tag}"))
            })?;
            links.push((editor_index, point_index, kind, weight));
        }

        let (editors, registry) = engine.parts_mut();
        *registry.modulator_mut(modulator_id)?.curve_mut() = curve;
        for (editor_index, point_index, kind, weight) in links {
            let editor = editors.get(editor_index as usize).ok_or_else(|| {
                Error::CorruptState(format!("bad link editor index {editor_index}"))
            })?;
            let point = editor.id_at(point_index as usize).ok_or_else(|| {
                Error::CorruptState(format!("bad link point index {point_index}"))
            })?;
            registry.add_link(editors, modulator_id, editor_index as usize, point, kind, weight)?;
        }
    }

    for modulator_index in 0..num_modulators as usize {
        let mode_tag = reader.read_i32::<LittleEndian>()?;
        let tempo_exponent = reader.read_i32::<LittleEndian>()?;
        let seconds_period = reader.read_f64::<LittleEndian>()?;
        let mode = LoopMode::from_repr(mode_tag)
            .ok_or_else(|| Error::CorruptState(format!("unknown loop mode {mode_tag}")))?;

        let (_, registry) = engine.parts_mut();
        let phase = registry
            .modulator_mut(crate::modulation::ModulatorId::new(modulator_index))?
            .phase_mut();
        phase.set_tempo_exponent(tempo_exponent.clamp(i8::MIN as i32, i8::MAX as i32) as i8);
        phase.set_seconds_period(seconds_period);
        phase.set_mode(mode);
    }

    Ok(engine)
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_editors_equal(a: &CurveEditor, b: &CurveEditor) {
        assert_eq!(a.len(), b.len());
        for (id_a, id_b) in a.point_ids().zip(b.point_ids()) {
            let (pa, pb) = (a.point(id_a).unwrap(), b.point(id_b).unwrap());
            assert_eq!(pa.pos_x().base(), pb.pos_x().base());
            assert_eq!(pa.pos_y().base(), pb.pos_y().base());
            assert_eq!(pa.center_y().base(), pb.center_y().base());
            assert_eq!(pa.kind(), pb.kind());
            assert_eq!(pa.omega(), pb.omega());
        }
    }

    #[test]
    fn test_editor_round_trip() {
        let mut editor = CurveEditor::new();
        let a = editor.insert_point(0.25, 0.7).unwrap();
        editor.drag_curve_center(a, 0.3).unwrap();
        let b = editor.insert_point(0.6, 0.2).unwrap();
        editor.set_segment_kind(b, SegmentKind::Sine).unwrap();
        editor.point_mut(b).unwrap().set_omega(1.5);
        let last = editor.last_id();
        editor.begin_drag(last).unwrap();
        editor.drag_position(last, 1.0, 0.4).unwrap();

        let mut buffer = Vec::new();
        save_editor(&editor, &mut buffer).unwrap();
        let loaded = load_editor(&mut buffer.as_slice()).unwrap();
        assert_editors_equal(&editor, &loaded);
    }

    #[test]
    fn test_engine_round_trip() {
        let mut engine = CurveEngine::new(2);
        let middle = engine.editor_mut(0).unwrap().insert_point(0.5, 0.8).unwrap();
        let other = engine.editor_mut(1).unwrap().insert_point(0.3, 0.1).unwrap();

        let modulator = engine.registry_mut().add_modulator().unwrap();
        let second = engine.registry_mut().add_modulator().unwrap();
        let link = engine
            .add_link(modulator, 0, middle, ParameterKind::PosY)
            .unwrap();
        engine.set_link_weight(link, -0.5).unwrap();
        engine
            .add_link(modulator, 1, other, ParameterKind::CurveCenter)
            .unwrap();
        engine
            .add_link(second, 0, middle, ParameterKind::PosX)
            .unwrap();

        {
            let registry = engine.registry_mut();
            let curve = registry.modulator_mut(modulator).unwrap().curve_mut();
            curve.insert_point(0.4, 0.9).unwrap();
            let phase = registry.modulator_mut(modulator).unwrap().phase_mut();
            phase.set_tempo_exponent(-2);
            let phase = registry.modulator_mut(second).unwrap().phase_mut();
            phase.set_mode(LoopMode::Seconds);
            phase.set_seconds_period(2.5);
        }

        let mut buffer = Vec::new();
        save_state(&engine, &mut buffer).unwrap();
        let loaded = load_state(&mut buffer.as_slice()).unwrap();

        assert_eq!(loaded.num_editors(), 2);
        for index in 0..2 {
            assert_editors_equal(
                engine.editor(index).unwrap(),
                loaded.editor(index).unwrap(),
            );
        }

        let registry = loaded.registry();
        assert_eq!(registry.num_modulators(), 2);
        assert_editors_equal(
            engine.registry().modulator(modulator).unwrap().curve(),
            registry.modulator(modulator).unwrap().curve(),
        );

        // Links round-trip with their order, targets and weights.
        let links = registry.links_of(modulator).collect::<Vec<_>>();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].1.editor, 0);
        assert_eq!(links[0].1.kind, ParameterKind::PosY);
        assert_eq!(registry.weight(loaded.editors(), links[0].0).unwrap(), -0.5);
        assert_eq!(links[1].1.editor, 1);
        assert_eq!(links[1].1.kind, ParameterKind::CurveCenter);
        assert_eq!(registry.num_links_of(second), 1);

        // Phase settings round-trip, including the inactive mode's value.
        let phase = registry.modulator(modulator).unwrap().phase();
        assert_eq!(phase.mode(), LoopMode::TempoSynced);
        assert_eq!(phase.tempo_exponent(), -2);
        let phase = registry.modulator(second).unwrap().phase();
        assert_eq!(phase.mode(), LoopMode::Seconds);
        assert_eq!(phase.seconds_period(), 2.5);

        // The loaded engine evaluates identically to the saved one.
        for beat in [0.0, 1.3, 2.4] {
            for x in [0.1, 0.5, 0.9] {
                assert_eq!(
                    engine.forward(0, x, beat, 0.0).unwrap(),
                    loaded.forward(0, x, beat, 0.0).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let engine = CurveEngine::new(1);
        let mut buffer = Vec::new();
        save_state(&engine, &mut buffer).unwrap();
        // Bump the major version in place.
        buffer[0] = (FORMAT_VERSION.major + 1) as u8;
        assert!(matches!(
            load_state(&mut buffer.as_slice()),
            Err(Error::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_corrupt_kind_tag_is_rejected() {
        let mut editor = CurveEditor::new();
        editor.insert_point(0.5, 0.5).unwrap();
        let mut buffer = Vec::new();
        save_editor(&editor, &mut buffer).unwrap();
        // The first point record's kind tag sits after the count and 3 floats.
        buffer[4 + 12] = 0x7f;
        assert!(matches!(
            load_editor(&mut buffer.as_slice()),
            Err(Error::CorruptState(_))
        ));
    }

    #[test]
    fn test_truncated_blob_is_an_io_error() {
        let engine = CurveEngine::new(1);
        let mut buffer = Vec::new();
        save_state(&engine, &mut buffer).unwrap();
        buffer.truncate(buffer.len() - 2);
        assert!(matches!(
            load_state(&mut buffer.as_slice()),
            Err(Error::IoError(_))
        ));
    }

    #[test]
    fn test_terminal_record_overwrites_terminal_point() {
        let mut editor = CurveEditor::new();
        let last = editor.last_id();
        editor.begin_drag(last).unwrap();
        editor.drag_position(last, 1.0, 0.3).unwrap();
        editor.set_segment_kind(last, SegmentKind::Sine).unwrap();

        let mut buffer = Vec::new();
        save_editor(&editor, &mut buffer).unwrap();
        let loaded = load_editor(&mut buffer.as_slice()).unwrap();
        // Still exactly two points: the terminal record replaced the default one.
        assert_eq!(loaded.len(), 2);
        let terminal = loaded.point(loaded.last_id()).unwrap();
        assert_eq!(terminal.pos_x().base(), 1.0);
        assert_eq!(terminal.pos_y().base(), 0.3);
        assert_eq!(terminal.kind(), SegmentKind::Sine);
    }
}
