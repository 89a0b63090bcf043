//! Factory patches bundled with the polyvox library.
//!
//! Built-in patches are always available without external files. Songs can
//! name them directly, and they make starting points for custom patches.
//! The sample patches here use generated audio so nothing has to ship
//! alongside the binary.

use crate::patch::PatchConfig;

/// Array of factory patch names for external access.
pub static FACTORY_PATCH_NAMES: &[&str] = &[
    "init",
    "warm_pad",
    "pluck",
    "saw_bass",
    "fm_epiano",
    "fm_bell",
    "fm_bass",
    "sine_sample",
    "noise_hit",
];

/// TOML content for factory patches.
static FACTORY_PATCHES_TOML: &[(&str, &str)] = &[
    ("init", INIT_PATCH),
    ("warm_pad", WARM_PAD_PATCH),
    ("pluck", PLUCK_PATCH),
    ("saw_bass", SAW_BASS_PATCH),
    ("fm_epiano", FM_EPIANO_PATCH),
    ("fm_bell", FM_BELL_PATCH),
    ("fm_bass", FM_BASS_PATCH),
    ("sine_sample", SINE_SAMPLE_PATCH),
    ("noise_hit", NOISE_HIT_PATCH),
];

/// Two detuned saws through a low-pass; every other setting default.
const INIT_PATCH: &str = r#"
type = "oscillator"
name = "Init"
description = "Two detuned saws through a low-pass filter"
"#;

const WARM_PAD_PATCH: &str = r#"
type = "oscillator"
name = "Warm Pad"
description = "Slow saw pad with gentle vibrato"
gain = 0.35
vibrato_depth = 8.0
filter_env_amount = 1200.0

[[oscillators]]
waveform = "saw"
detune = -9.0

[[oscillators]]
waveform = "saw"
detune = 9.0

[[oscillators]]
waveform = "triangle"
gain = 0.5

[filter]
type = "low_pass"
cutoff = 1200.0
q = 0.8
key_track = 50.0

[filter_envelope]
attack = 1.2
decay = 1.5
sustain = 0.5
release = 1.5

[amp_envelope]
attack = 0.8
decay = 0.5
sustain = 0.9
release = 1.8

[lfo]
waveform = "triangle"
frequency = 4.5
delay = 0.6
"#;

const PLUCK_PATCH: &str = r#"
type = "oscillator"
name = "Pluck"
description = "Short filtered square, brighter with velocity"
gain = 0.5
filter_env_amount = 3600.0

[[oscillators]]
waveform = "square"

[filter]
type = "low_pass"
cutoff = 600.0
q = 1.4
velocity_track = -2400.0

[filter_envelope]
attack = 0.001
decay = 0.18
sustain = 0.0
release = 0.1

[amp_envelope]
attack = 0.002
decay = 0.4
sustain = 0.0
release = 0.15
decibel = true
"#;

const SAW_BASS_PATCH: &str = r#"
type = "oscillator"
name = "Saw Bass"
description = "Punchy mono-style saw bass"
gain = 0.6
filter_env_amount = 2400.0

[[oscillators]]
waveform = "saw"

[[oscillators]]
waveform = "square"
detune = -1200.0
gain = 0.6

[filter]
type = "low_pass"
cutoff = 300.0
q = 2.0

[filter_envelope]
attack = 0.002
decay = 0.25
sustain = 0.2
release = 0.1

[amp_envelope]
attack = 0.002
decay = 0.3
sustain = 0.8
release = 0.08
"#;

const FM_EPIANO_PATCH: &str = r#"
type = "fm"
name = "FM E-Piano"
description = "Two stacks: a tine and a soft body"
algorithm = 0

[[operators]]
ratio = 1.0
velocity_sensitivity = 2
[operators.envelope]
rates = [96, 25, 25, 67]
levels = [99, 75, 0, 0]
rate_scaling = 3

[[operators]]
ratio = 14.0
level = 58
velocity_sensitivity = 7
[operators.envelope]
rates = [95, 50, 35, 78]
levels = [99, 0, 0, 0]

[[operators]]
ratio = 1.0
velocity_sensitivity = 2
[operators.envelope]
rates = [95, 20, 20, 50]
levels = [99, 95, 0, 0]

[[operators]]
ratio = 1.0
level = 70
velocity_sensitivity = 6
[operators.envelope]
rates = [95, 29, 20, 50]
levels = [99, 95, 0, 0]
"#;

const FM_BELL_PATCH: &str = r#"
type = "fm"
name = "FM Bell"
description = "Inharmonic ratio with a long ring"
algorithm = 1

[[operators]]
ratio = 1.0
[operators.envelope]
rates = [99, 30, 20, 30]
levels = [99, 60, 0, 0]

[[operators]]
ratio = 3.5
level = 80
[operators.envelope]
rates = [99, 25, 20, 30]
levels = [99, 50, 0, 0]
"#;

const FM_BASS_PATCH: &str = r#"
type = "fm"
name = "FM Bass"
description = "One modulator with feedback, fast decay"
algorithm = 1
feedback = 5

[[operators]]
ratio = 0.5
velocity_sensitivity = 3
[operators.envelope]
rates = [99, 40, 30, 70]
levels = [99, 85, 70, 0]

[[operators]]
ratio = 1.0
level = 82
velocity_sensitivity = 5
[operators.envelope]
rates = [99, 55, 40, 70]
levels = [99, 40, 0, 0]
"#;

const SINE_SAMPLE_PATCH: &str = r#"
type = "sample"
name = "Sine Sample"
description = "Looped generated sine across the keyboard"

[global]
release_vol_env = -3986

[[zones]]
source = { generated = "sine" }
root_key = 60
loop_mode = "continuous"
"#;

const NOISE_HIT_PATCH: &str = r#"
type = "sample"
name = "Noise Hit"
description = "Short unlooped noise burst, hard-panned by key range"

[global]
decay_vol_env = -2400
sustain_vol_env = 1000

[[zones]]
source = { generated = "noise" }
key_range = [0, 59]
generators = { pan = -300 }

[[zones]]
source = { generated = "noise" }
key_range = [60, 127]
generators = { pan = 300 }
"#;

/// Get all factory patches.
///
/// # Example
///
/// ```rust
/// use polyvox_config::factory_patches;
///
/// for patch in factory_patches() {
///     println!("  - {} ({})", patch.name(), patch.kind());
/// }
/// ```
pub fn factory_patches() -> Vec<PatchConfig> {
    FACTORY_PATCHES_TOML
        .iter()
        .filter_map(|(_, toml)| PatchConfig::from_toml(toml).ok())
        .collect()
}

/// Get a factory patch by name.
///
/// Matches either the internal identifier (`fm_bell`) or the display name
/// (`FM Bell`), case-insensitively.
///
/// # Example
///
/// ```rust
/// use polyvox_config::get_factory_patch;
///
/// let patch = get_factory_patch("FM Bell").unwrap();
/// assert_eq!(patch.kind(), "fm");
/// ```
pub fn get_factory_patch(name: &str) -> Option<PatchConfig> {
    let name_lower = name.to_lowercase();

    for (patch_name, toml) in FACTORY_PATCHES_TOML {
        if patch_name.to_lowercase() == name_lower {
            return PatchConfig::from_toml(toml).ok();
        }
    }

    // Display names
    FACTORY_PATCHES_TOML
        .iter()
        .filter_map(|(_, toml)| PatchConfig::from_toml(toml).ok())
        .find(|patch| patch.name().to_lowercase() == name_lower)
}

/// Get the internal identifiers of all factory patches.
pub fn factory_patch_names() -> Vec<&'static str> {
    FACTORY_PATCHES_TOML.iter().map(|(name, _)| *name).collect()
}

/// Check if a name refers to a factory patch (case-insensitive).
///
/// # Example
///
/// ```rust
/// use polyvox_config::is_factory_patch;
///
/// assert!(is_factory_patch("warm_pad"));
/// assert!(is_factory_patch("Warm Pad"));
/// assert!(!is_factory_patch("my_patch"));
/// ```
pub fn is_factory_patch(name: &str) -> bool {
    get_factory_patch(name).is_some()
}
