//! Signal graph nodes.
//!
//! Every node implements [`SignalNode`](polyvox_core::SignalNode) and keeps
//! a [`RenderCache`](polyvox_core::RenderCache), so a node read by several
//! parents in one sample computes once. Composite nodes own their children
//! by value; modulation is pushed into a child through setters before the
//! child is rendered.

pub mod amp;
pub mod dx7;
pub mod envelope;
pub mod filter;
pub mod fm;
pub mod lfo;
pub mod oscillator;
pub mod sample;

pub use amp::{Amplifier, MixerNode};
pub use dx7::{DX7_BLOCK, Dx7Envelope, Dx7EnvelopeParams};
pub use envelope::{ENVELOPE_DB_RANGE, Envelope, EnvelopeParams, EnvelopeStage, EnvelopeUnit};
pub use filter::{FilterNode, FilterSettings};
pub use fm::{FmAlgorithm, FmMatrix, FmOperator, FmOperatorParams, MAX_OPERATORS, MOD_INDEX};
pub use lfo::{LfoNode, LfoSettings};
pub use oscillator::TableOscillator;
pub use sample::{LoopMode, LoopState, SampleData, SampleGenerator, SampleRegion};
