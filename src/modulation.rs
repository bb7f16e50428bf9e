//! Modulation sources and the link table that wires them to curve parameters.

pub(crate) mod modulator;
pub(crate) mod phase;
pub(crate) mod registry;

pub use modulator::Modulator;
pub use phase::{LoopMode, PhaseSource};
pub use registry::{
    Link, LinkId, ModulationRegistry, ModulatorId, ModulatorSignals, MAX_LINKS_PER_MODULATOR,
    MAX_MODULATORS,
};
