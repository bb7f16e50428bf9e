use basedrop::{Handle, Owned};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::{engine::CurveEngine, Error};

// -------------------------------------------------------------------------------------------------

// A handful of in-flight snapshots is plenty: edits commit at UI rates and the
// audio side drains once per buffer.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 16;

// -------------------------------------------------------------------------------------------------

/// Split a [`CurveEngine`] into an edit-side handle and an audio-side renderer.
///
/// The edit side owns and mutates a working engine and publishes immutable
/// snapshots of it. The audio side only ever sees complete snapshots, so no
/// evaluation can observe a half-mutated structure. Snapshots travel as
/// [`basedrop::Owned`] values: replaced ones are reclaimed by the basedrop
/// collector on whatever thread runs it, never freed on the audio thread.
pub fn engine_channel(
    engine: CurveEngine,
    collector_handle: &Handle,
) -> (EditorHandle, AudioRenderer) {
    let (sender, receiver) = bounded(SNAPSHOT_CHANNEL_CAPACITY);
    let current = Owned::new(collector_handle, engine.clone());
    let editor = EditorHandle {
        engine,
        sender,
        collector_handle: collector_handle.clone(),
    };
    let renderer = AudioRenderer { receiver, current };
    (editor, renderer)
}

// -------------------------------------------------------------------------------------------------

/// Edit-context side of a snapshot channel: the working engine plus the sender
/// that publishes committed states to the audio side.
pub struct EditorHandle {
    engine: CurveEngine,
    sender: Sender<Owned<CurveEngine>>,
    collector_handle: Handle,
}

impl EditorHandle {
    /// The working engine.
    pub fn engine(&self) -> &CurveEngine {
        &self.engine
    }

    /// Mutate the working engine. Changes stay invisible to the audio side until
    /// [`EditorHandle::commit`] is called.
    pub fn engine_mut(&mut self) -> &mut CurveEngine {
        &mut self.engine
    }

    /// Publish the working engine's current state to the audio side.
    ///
    /// Fails with [`Error::SendError`] when the channel is full, which means the
    /// audio side stopped draining (or was dropped). The working engine keeps its
    /// state either way, so a later commit delivers everything at once.
    pub fn commit(&mut self) -> Result<(), Error> {
        let snapshot = Owned::new(&self.collector_handle, self.engine.clone());
        self.sender.try_send(snapshot)?;
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Audio-context side of a snapshot channel: holds the snapshot currently used for
/// evaluation and drains newly committed ones between buffers.
pub struct AudioRenderer {
    receiver: Receiver<Owned<CurveEngine>>,
    current: Owned<CurveEngine>,
}

impl AudioRenderer {
    /// Pick up committed snapshots. Call once per buffer, before evaluating.
    /// Non-blocking; replaced snapshots are handed to the basedrop collector.
    pub fn poll_updates(&mut self) {
        while let Ok(snapshot) = self.receiver.try_recv() {
            self.current = snapshot;
        }
    }

    /// The engine snapshot currently used for evaluation.
    pub fn engine(&self) -> &CurveEngine {
        &self.current
    }

    /// Evaluate a shaper editor of the current snapshot. Allocation-free and
    /// non-blocking, safe to call per sample on the audio thread.
    #[inline]
    pub fn forward(
        &self,
        editor: usize,
        input: f32,
        beat_position: f64,
        seconds_played: f64,
    ) -> Result<f32, Error> {
        self.current.forward(editor, input, beat_position, seconds_played)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commits_reach_the_audio_side() {
        let collector = basedrop::Collector::new();
        let (mut editor, mut renderer) = engine_channel(CurveEngine::new(1), &collector.handle());

        // Uncommitted edits stay invisible.
        editor
            .engine_mut()
            .editor_mut(0)
            .unwrap()
            .insert_point(0.5, 1.0)
            .unwrap();
        renderer.poll_updates();
        assert!((renderer.forward(0, 0.5, 0.0, 0.0).unwrap() - 0.5).abs() < 1e-6);

        // After commit and poll the audio side sees the new curve.
        editor.commit().unwrap();
        renderer.poll_updates();
        assert!((renderer.forward(0, 0.5, 0.0, 0.0).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_full_channel_reports_send_error() {
        let collector = basedrop::Collector::new();
        let (mut editor, _renderer) = engine_channel(CurveEngine::new(1), &collector.handle());
        let mut result = Ok(());
        for _ in 0..100 {
            result = editor.commit();
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(Error::SendError(_))));
    }
}
