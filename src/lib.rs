#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod editor;
mod engine;
mod error;
mod modulation;
mod parameter;
mod point;
mod snapshot;
mod state;
mod transport;

// public, flat re-exports
pub use error::Error;

pub use editor::{
    CurveEditor, EditTarget, MenuRequest, PointId, DEFAULT_HIT_DISTANCE_SQUARED,
};
pub use engine::CurveEngine;
pub use modulation::{
    Link, LinkId, LoopMode, ModulationRegistry, Modulator, ModulatorId, ModulatorSignals,
    PhaseSource, MAX_LINKS_PER_MODULATOR, MAX_MODULATORS,
};
pub use parameter::{Parameter, ParameterKind};
pub use point::{power_from_center, CurvePoint, SegmentKind, MAX_POWER};
pub use snapshot::{engine_channel, AudioRenderer, EditorHandle};
pub use state::{load_editor, load_state, save_editor, save_state, Version, FORMAT_VERSION};
pub use transport::{PlaybackStatus, SharedTransport};
