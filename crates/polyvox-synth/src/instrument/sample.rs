//! Sample-based instrument with key and velocity zones.

use alloc::vec::Vec;

use polyvox_core::{RenderCache, SignalNode, SynthTables, db_to_linear};

use super::Instrument;
use crate::nodes::{
    Amplifier, Envelope, EnvelopeParams, FilterNode, FilterSettings, LfoNode, LfoSettings,
    SampleData, SampleGenerator,
};
use crate::zone::{GeneratorSet, SampleInfo, ZoneParams};

/// One zone: local generators and the sample they apply to.
#[derive(Debug, Clone)]
pub struct SampleZone {
    /// Local generator amounts.
    pub generators: GeneratorSet,
    /// Sample header.
    pub info: SampleInfo,
    /// Sample frames.
    pub data: SampleData,
}

impl SampleZone {
    /// Zone covering a whole sample; loop points default to the full range.
    pub fn new(data: SampleData, root_key: u8, generators: GeneratorSet) -> Self {
        let len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self {
            generators,
            info: SampleInfo {
                len,
                loop_start: 0,
                loop_end: len,
                root_key,
                correction: 0,
            },
            data,
        }
    }

    /// Builder: loop points in frames.
    pub fn with_loop(mut self, start: u32, end: u32) -> Self {
        self.info.loop_start = start;
        self.info.loop_end = end;
        self
    }
}

/// Voice graph of a [`SampleInstrument`].
#[derive(Debug, Clone)]
pub struct SampleGraph {
    vibrato: LfoNode,
    vibrato_depth: f32,
    chain: Amplifier<FilterNode<SampleGenerator>, Envelope>,
    pan: f32,
    cache: RenderCache,
}

impl SampleGraph {
    fn new() -> Self {
        let generator = FilterNode::new(SampleGenerator::new(), FilterSettings::default());
        Self {
            vibrato: LfoNode::new(LfoSettings::default()),
            vibrato_depth: 0.0,
            chain: Amplifier::new(generator, Envelope::new(EnvelopeParams::default())),
            pan: 0.0,
            cache: RenderCache::new(),
        }
    }

    fn apply(&mut self, params: &ZoneParams, data: &SampleData) {
        let filter = self.chain.source_mut();
        filter.set_settings(params.filter);
        filter.source_mut().set_sample(data.clone(), params.region);
        self.chain.envelope_mut().set_params(params.amp_envelope);
        self.chain.set_gain(db_to_linear(params.gain_db));
        self.vibrato.set_settings(params.vibrato);
        self.vibrato_depth = params.vibrato_depth;
        self.pan = params.pan;
    }

    /// The sample generator.
    pub fn generator(&self) -> &SampleGenerator {
        self.chain.source().source()
    }
}

impl SignalNode for SampleGraph {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        self.vibrato.init(tables, sample_rate);
        self.chain.init(tables, sample_rate);
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        self.vibrato.note_on(note, velocity);
        self.chain.note_on(note, velocity);
        self.cache.reset();
    }

    fn note_off(&mut self, velocity: u8) {
        self.chain.note_off(velocity);
    }

    fn is_active(&self) -> bool {
        self.chain.is_active() && self.generator().is_active()
    }

    fn render(&mut self, flag: bool) -> f32 {
        if let Some(sample) = self.cache.hit(flag) {
            return sample;
        }
        if self.vibrato_depth != 0.0 {
            let cents = self.vibrato.render(flag) * self.vibrato_depth;
            self.chain.source_mut().source_mut().set_pitch_mod(cents);
        }
        let out = self.chain.render(flag);
        self.cache.store(flag, out)
    }

    fn set_pitch_offset(&mut self, cents: f32) {
        self.chain.set_pitch_offset(cents);
    }
}

/// Zone-mapped sample instrument.
///
/// Zone parameters are resolved once at construction by merging each
/// zone's generators over the global set. The first zone whose key and
/// velocity ranges contain the note plays it.
#[derive(Debug, Clone)]
pub struct SampleInstrument {
    zones: Vec<(ZoneParams, SampleData)>,
}

impl SampleInstrument {
    /// Build from a global generator set and local zones.
    pub fn new(global: &GeneratorSet, zones: Vec<SampleZone>) -> Self {
        let zones = zones
            .into_iter()
            .map(|zone| {
                let merged = GeneratorSet::merge(global, &zone.generators);
                (ZoneParams::resolve(&merged, &zone.info), zone.data)
            })
            .collect();
        Self { zones }
    }

    /// Number of zones.
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Resolved parameters of the zone that plays `note` at `velocity`.
    pub fn find_zone(&self, note: u8, velocity: u8) -> Option<&ZoneParams> {
        self.zones
            .iter()
            .map(|(params, _)| params)
            .find(|params| params.matches(note, velocity))
    }
}

impl Instrument for SampleInstrument {
    type Graph = SampleGraph;

    fn build_graph(&self) -> SampleGraph {
        SampleGraph::new()
    }

    fn plays(&self, _channel: u8, note: u8, velocity: u8) -> bool {
        self.find_zone(note, velocity).is_some()
    }

    fn configure(&self, graph: &mut SampleGraph, _channel: u8, note: u8, velocity: u8) -> bool {
        match self
            .zones
            .iter()
            .find(|(params, _)| params.matches(note, velocity))
        {
            Some((params, data)) => {
                graph.apply(params, data);
                true
            }
            None => false,
        }
    }

    fn pan(&self, graph: &SampleGraph) -> f32 {
        graph.pan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::LoopState;
    use crate::zone::{Generator, GeneratorKind};

    fn ramp(len: usize) -> SampleData {
        let frames: Vec<f32> = (0..len).map(|i| i as f32 / len as f32).collect();
        SampleData::new(frames, 44100.0)
    }

    fn instrument() -> SampleInstrument {
        let global = GeneratorSet::from_generators(&[
            Generator::new(GeneratorKind::ReleaseVolEnv, -6000),
            Generator::new(GeneratorKind::Pan, -250),
        ]);
        let low = SampleZone::new(
            ramp(1000),
            48,
            GeneratorSet::from_generators(&[Generator::key_range(0, 59)]),
        );
        let high = SampleZone::new(
            ramp(1000),
            72,
            GeneratorSet::from_generators(&[
                Generator::key_range(60, 127),
                Generator::new(GeneratorKind::SampleModes, 1),
                Generator::new(GeneratorKind::Pan, 500),
            ]),
        )
        .with_loop(100, 200);
        SampleInstrument::new(&global, alloc::vec![low, high])
    }

    #[test]
    fn test_zone_selection_by_key() {
        let inst = instrument();
        assert_eq!(inst.zone_count(), 2);
        assert_eq!(inst.find_zone(40, 100).map(|z| z.region.root_key), Some(48));
        assert_eq!(inst.find_zone(80, 100).map(|z| z.region.root_key), Some(72));
    }

    #[test]
    fn test_zone_pan_inherits_or_overrides() {
        let inst = instrument();
        let mut graph = inst.build_graph();
        assert!(inst.configure(&mut graph, 0, 40, 100));
        assert!((inst.pan(&graph) + 0.5).abs() < 1e-6, "global pan inherited");
        assert!(inst.configure(&mut graph, 0, 80, 100));
        assert!((inst.pan(&graph) - 1.0).abs() < 1e-6, "local pan wins");
    }

    #[test]
    fn test_no_matching_zone_drops_note() {
        let zone = SampleZone::new(
            ramp(100),
            60,
            GeneratorSet::from_generators(&[Generator::velocity_range(100, 127)]),
        );
        let inst = SampleInstrument::new(&GeneratorSet::new(), alloc::vec![zone]);
        let mut graph = inst.build_graph();
        assert!(!inst.configure(&mut graph, 0, 60, 50));
        assert!(inst.configure(&mut graph, 0, 60, 110));
    }

    #[test]
    fn test_looping_zone_keeps_playing() {
        let tables = SynthTables::new();
        let inst = instrument();
        let mut graph = inst.build_graph();
        graph.init(&tables, 44100.0);
        assert!(inst.configure(&mut graph, 0, 72, 127));
        graph.note_on(72, 127);

        let mut flag = false;
        for _ in 0..5000 {
            flag = !flag;
            graph.render(flag);
        }
        assert!(graph.is_active());
        assert_eq!(graph.generator().loop_state(), LoopState::MidLoop);
        let phase = graph.generator().phase();
        assert!((100.0..200.0).contains(&phase), "phase {} outside loop", phase);
    }

    #[test]
    fn test_unlooped_zone_finishes_at_end() {
        let tables = SynthTables::new();
        let inst = instrument();
        let mut graph = inst.build_graph();
        graph.init(&tables, 44100.0);
        assert!(inst.configure(&mut graph, 0, 48, 127));
        graph.note_on(48, 127);

        let mut flag = false;
        for _ in 0..1100 {
            flag = !flag;
            graph.render(flag);
        }
        assert!(!graph.is_active(), "sample end should finish the voice");
    }
}
