//! `signal_energy_policy_v1`: keeps chunks with noticeable signal activity
//! longer.
//!
//! For each of the 18 channel/axis sequences the mean energy
//! `sum(|v|^2) / len` is compared against the threshold of its axis. If any
//! value exceeds its threshold the long period applies, otherwise the short one.
//!
//! The mean energy of an empty sequence is 0.0. NaN never exceeds a threshold.
//! Summation runs left to right with plain IEEE-754 multiply and add, so the
//! result does not depend on the platform.

use std::time::Duration;

use crate::core::Result;
use crate::model::{ChunkData, CHANNEL_COUNT};
use crate::policy::{Policy, PolicyContext, PolicyId};

/// Per-axis thresholds, X, Y, Z.
pub const AXIS_THRESHOLDS: [f64; 3] = [
    1.8191607053598602e-6,
    1.2442575637320148e-6,
    1.0956301130461567e-6,
];

pub const SHORT_EXPIRY: Duration = Duration::from_millis(31_800);
pub const LONG_EXPIRY: Duration = Duration::from_millis(127_200);

pub const ENERGY_POLICY: Policy = Policy::new(
    PolicyId::SignalEnergyPolicyV1,
    "This policy computes the average signal energy, \
     and establishes an expiry time duration based on a threshold.",
    evaluate,
);

pub fn mean_energy(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut energy = 0.0_f64;
    for value in samples {
        let magnitude = value.abs();
        energy += magnitude * magnitude;
    }
    energy / samples.len() as f64
}

/// Mean energies in channel-major order: channel 0 X, Y, Z, channel 1 X, ...
pub fn channel_energies(chunk: &ChunkData) -> [f64; CHANNEL_COUNT * 3] {
    let mut energies = [0.0_f64; CHANNEL_COUNT * 3];
    for (channel_idx, channel) in chunk.channels.iter().enumerate() {
        for (axis_idx, samples) in channel.axes().iter().enumerate() {
            energies[channel_idx * 3 + axis_idx] = mean_energy(samples);
        }
    }
    energies
}

pub fn exceeds_threshold(chunk: &ChunkData) -> bool {
    channel_energies(chunk)
        .iter()
        .enumerate()
        .any(|(idx, energy)| *energy > AXIS_THRESHOLDS[idx % 3])
}

fn evaluate(chunk: &ChunkData, _ctx: &PolicyContext) -> Result<Duration> {
    if exceeds_threshold(chunk) {
        Ok(LONG_EXPIRY)
    } else {
        Ok(SHORT_EXPIRY)
    }
}
