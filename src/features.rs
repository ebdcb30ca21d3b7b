//! Flow and measurement feature descriptors.
//!
//! Features describe initial vorticity (and measurement points) in a
//! configuration document and turn into packed particle arrays at
//! initialization: `(x, y, strength, radius)` per flow particle, `(x, y)`
//! per measurement point. Emitters also produce one element per step.
//!
//! Radii are left at zero here; the caller assigns the nominal core size
//! when building the collection. Unrecognized or malformed feature entries
//! are logged and skipped.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A vorticity-seeding feature.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlowFeature {
    /// One particle of the given strength.
    #[serde(rename = "single particle")]
    SingleParticle {
        center: [f64; 2],
        strength: f64,
        #[serde(default = "enabled_default")]
        enabled: bool,
    },
    /// A circular blob with a sine-smoothed rim, normalized to the given
    /// net circulation.
    #[serde(rename = "vortex blob")]
    VortexBlob {
        center: [f64; 2],
        radius: f64,
        softness: f64,
        strength: f64,
        #[serde(default = "enabled_default")]
        enabled: bool,
    },
    /// An elliptical blob: two radii and a rotation (degrees).
    #[serde(rename = "asymmetric blob")]
    AsymmetricBlob {
        center: [f64; 2],
        /// Major and minor radii.
        scale: [f64; 2],
        softness: f64,
        strength: f64,
        #[serde(default)]
        rotation: f64,
        #[serde(default = "enabled_default")]
        enabled: bool,
    },
    /// A rectangle of uniform-strength particles.
    #[serde(rename = "uniform block")]
    UniformBlock {
        center: [f64; 2],
        size: [f64; 2],
        strength: f64,
        #[serde(default = "enabled_default")]
        enabled: bool,
    },
    /// A rectangle of randomly placed, randomly weighted particles.
    #[serde(rename = "block of random")]
    BlockOfRandom {
        center: [f64; 2],
        size: [f64; 2],
        #[serde(rename = "strength range")]
        strength_range: [f64; 2],
        num: usize,
        #[serde(default = "enabled_default")]
        enabled: bool,
    },
    /// A fixed point emitting one particle per step.
    #[serde(rename = "particle emitter")]
    ParticleEmitter {
        center: [f64; 2],
        strength: f64,
        #[serde(default = "enabled_default")]
        enabled: bool,
    },
}

fn enabled_default() -> bool {
    true
}

impl FlowFeature {
    pub fn is_enabled(&self) -> bool {
        match self {
            FlowFeature::SingleParticle { enabled, .. }
            | FlowFeature::VortexBlob { enabled, .. }
            | FlowFeature::AsymmetricBlob { enabled, .. }
            | FlowFeature::UniformBlock { enabled, .. }
            | FlowFeature::BlockOfRandom { enabled, .. }
            | FlowFeature::ParticleEmitter { enabled, .. } => *enabled,
        }
    }

    /// Particles created once at initialization, packed
    /// `(x, y, strength, radius)`. `ips` is the nominal inter-particle
    /// spacing.
    pub fn init_particles(&self, ips: f64) -> Vec<f64> {
        if !self.is_enabled() {
            return Vec::new();
        }
        match *self {
            FlowFeature::SingleParticle {
                center, strength, ..
            } => vec![center[0], center[1], strength, 0.0],

            FlowFeature::VortexBlob {
                center,
                radius,
                softness,
                strength,
                ..
            } => blob_particles(center, radius, radius, softness, strength, 0.0, ips),

            FlowFeature::AsymmetricBlob {
                center,
                scale,
                softness,
                strength,
                rotation,
                ..
            } => blob_particles(center, scale[0], scale[1], softness, strength, rotation, ips),

            FlowFeature::UniformBlock {
                center,
                size,
                strength,
                ..
            } => {
                let isize = 1 + (size[0] / ips) as i64;
                let jsize = 1 + (size[1] / ips) as i64;
                let each_str = strength / (isize * jsize) as f64;
                let mut x = Vec::with_capacity((4 * isize * jsize) as usize);
                for i in 0..isize {
                    for j in 0..jsize {
                        x.push(center[0] + size[0] * ((i as f64 + 0.5) / isize as f64 - 0.5));
                        x.push(center[1] + size[1] * ((j as f64 + 0.5) / jsize as f64 - 0.5));
                        x.push(each_str);
                        x.push(0.0);
                    }
                }
                x
            }

            FlowFeature::BlockOfRandom {
                center,
                size,
                strength_range,
                num,
                ..
            } => {
                let mut rng = rand::thread_rng();
                let mut x = Vec::with_capacity(4 * num);
                for _ in 0..num {
                    x.push(center[0] + size[0] * rng.gen_range(-1.0..1.0));
                    x.push(center[1] + size[1] * rng.gen_range(-1.0..1.0));
                    x.push(strength_range[0] + (strength_range[1] - strength_range[0]) * rng.gen_range(0.0..1.0));
                    x.push(0.0);
                }
                x
            }

            FlowFeature::ParticleEmitter { .. } => Vec::new(),
        }
    }

    /// Particles emitted every step; only emitters produce any.
    pub fn step_particles(&self, _ips: f64) -> Vec<f64> {
        if !self.is_enabled() {
            return Vec::new();
        }
        match *self {
            FlowFeature::ParticleEmitter {
                center, strength, ..
            } => vec![center[0], center[1], strength, 0.0],
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for FlowFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowFeature::SingleParticle { center, strength, .. } => write!(
                f,
                "single particle at {} {} with strength {}",
                center[0], center[1], strength
            ),
            FlowFeature::VortexBlob {
                center,
                radius,
                softness,
                strength,
                ..
            } => write!(
                f,
                "vortex blob at {} {}, radius {}, softness {}, and strength {}",
                center[0], center[1], radius, softness, strength
            ),
            FlowFeature::AsymmetricBlob {
                center,
                scale,
                softness,
                strength,
                ..
            } => write!(
                f,
                "asymmetric blob at {} {}, radii {} {}, softness {}, and strength {}",
                center[0], center[1], scale[0], scale[1], softness, strength
            ),
            FlowFeature::UniformBlock { center, size, strength, .. } => write!(
                f,
                "block of particles in [{} {}] [{} {}] with strength {}",
                center[0] - 0.5 * size[0],
                center[0] + 0.5 * size[0],
                center[1] - 0.5 * size[1],
                center[1] + 0.5 * size[1],
                strength
            ),
            FlowFeature::BlockOfRandom { center, size, num, .. } => write!(
                f,
                "block of {} random particles around {} {} in [{} {}]",
                num, center[0], center[1], size[0], size[1]
            ),
            FlowFeature::ParticleEmitter { center, strength, .. } => write!(
                f,
                "particle emitter at {} {} spawning particles with strength {}",
                center[0], center[1], strength
            ),
        }
    }
}

/// A measurement feature: inert points sampled by the flow.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MeasureFeature {
    /// One stationary field point.
    #[serde(rename = "single point")]
    SinglePoint { center: [f64; 2] },
    /// A stationary point releasing one tracer per step.
    #[serde(rename = "tracer emitter")]
    TracerEmitter { center: [f64; 2] },
}

impl MeasureFeature {
    /// Measurement points created once, packed `(x, y)`.
    pub fn init_particles(&self, _ips: f64) -> Vec<f64> {
        match *self {
            MeasureFeature::SinglePoint { center } => vec![center[0], center[1]],
            MeasureFeature::TracerEmitter { .. } => Vec::new(),
        }
    }

    /// Tracers released per step, packed `(x, y)`.
    pub fn step_particles(&self, _ips: f64) -> Vec<f64> {
        match *self {
            MeasureFeature::TracerEmitter { center } => vec![center[0], center[1]],
            MeasureFeature::SinglePoint { .. } => Vec::new(),
        }
    }
}

/// Parse a list of flow features from a JSON array, skipping entries that
/// fail to parse.
pub fn parse_flow_features(doc: &serde_json::Value) -> Vec<FlowFeature> {
    let mut out = Vec::new();
    let Some(list) = doc.as_array() else {
        warn!("flow feature document is not an array");
        return out;
    };
    for entry in list {
        match serde_json::from_value::<FlowFeature>(entry.clone()) {
            Ok(f) => {
                debug!(feature = %f, "parsed flow feature");
                out.push(f);
            }
            Err(e) => {
                warn!(error = %e, "skipping unrecognized flow feature");
            }
        }
    }
    out
}

/// Lattice fill shared by the round and elliptical blobs. Particles are
/// laid on an `ips` grid, weighted down across the sine-smoothed rim, then
/// rescaled so the total circulation matches `strength` exactly.
fn blob_particles(
    center: [f64; 2],
    rad: f64,
    minrad: f64,
    softness: f64,
    strength: f64,
    rotation_deg: f64,
    ips: f64,
) -> Vec<f64> {
    let irad = (1.0 + (rad + 0.5 * softness) / ips) as i64;
    let jrad = (1.0 + (minrad + 0.5 * softness) / ips) as i64;

    let theta = std::f64::consts::PI * rotation_deg / 180.0;
    let (st, ct) = theta.sin_cos();

    let mut x = Vec::new();
    let mut tot_circ = 0.0;

    for i in -irad..=irad {
        for j in -jrad..=jrad {
            let dx = i as f64 * ips;
            let dy = j as f64 * ips;

            // Stretch the minor axis back to a circle before measuring the
            // distance to the center.
            let dr = (dx * dx + (dy * rad / minrad).powi(2)).sqrt();
            if dr < rad + 0.5 * softness {
                x.push(center[0] + dx * ct - dy * st);
                x.push(center[1] + dx * st + dy * ct);

                let this_str = if dr > rad - 0.5 * softness {
                    0.5 - 0.5 * (std::f64::consts::PI * (dr - rad) / softness).sin()
                } else {
                    1.0
                };
                x.push(this_str);
                tot_circ += this_str;

                x.push(0.0);
            }
        }
    }

    if tot_circ != 0.0 {
        let str_scale = strength / tot_circ;
        for k in (2..x.len()).step_by(4) {
            x[k] *= str_scale;
        }
    }

    debug!(
        particles = x.len() / 4,
        raw_circulation = tot_circ,
        "seeded blob"
    );
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vortex_blob_particle_count_and_circulation() {
        let blob = FlowFeature::VortexBlob {
            center: [0.0, 0.0],
            radius: 1.0,
            softness: 0.1,
            strength: 1.0,
            enabled: true,
        };
        let px = blob.init_particles(0.1);
        let n = px.len() / 4;
        // A disc of radius ~1.05 on a 0.1 lattice holds about 317 points.
        assert!((300..=350).contains(&n), "blob particle count {}", n);

        let total: f64 = px.chunks(4).map(|p| p[2]).sum();
        assert!((total - 1.0).abs() < 1e-6, "normalized circulation {}", total);
    }

    #[test]
    fn test_uniform_block_total_strength() {
        let block = FlowFeature::UniformBlock {
            center: [1.0, -1.0],
            size: [0.5, 0.5],
            strength: 2.0,
            enabled: true,
        };
        let px = block.init_particles(0.1);
        let total: f64 = px.chunks(4).map(|p| p[2]).sum();
        assert!((total - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_emitter_emits_per_step_only() {
        let e = FlowFeature::ParticleEmitter {
            center: [0.5, 0.5],
            strength: 0.1,
            enabled: true,
        };
        assert!(e.init_particles(0.1).is_empty());
        assert_eq!(e.step_particles(0.1), vec![0.5, 0.5, 0.1, 0.0]);
    }

    #[test]
    fn test_disabled_feature_is_silent() {
        let p = FlowFeature::SingleParticle {
            center: [0.0, 0.0],
            strength: 1.0,
            enabled: false,
        };
        assert!(p.init_particles(0.1).is_empty());
    }

    #[test]
    fn test_parse_skips_malformed_entries() {
        let doc = serde_json::json!([
            { "type": "single particle", "center": [0.0, 1.0], "strength": 0.5 },
            { "type": "warp drive", "center": [0.0, 0.0] },
            { "type": "vortex blob", "center": [0.0, 0.0], "radius": 1.0,
              "softness": 0.1, "strength": 1.0 }
        ]);
        let features = parse_flow_features(&doc);
        assert_eq!(features.len(), 2);
        assert!(matches!(features[0], FlowFeature::SingleParticle { .. }));
        assert!(matches!(features[1], FlowFeature::VortexBlob { .. }));
    }

    #[test]
    fn test_measure_features() {
        let p = MeasureFeature::SinglePoint { center: [1.0, 2.0] };
        assert_eq!(p.init_particles(0.1), vec![1.0, 2.0]);
        assert!(p.step_particles(0.1).is_empty());

        let t = MeasureFeature::TracerEmitter { center: [0.0, 0.0] };
        assert!(t.init_particles(0.1).is_empty());
        assert_eq!(t.step_particles(0.1), vec![0.0, 0.0]);
    }
}
