//! Pairwise coalescence of nearby same-sign particles.
//!
//! Two particles merge when they overlap within `overlap` times the larger
//! core radius and their strengths are close enough in sign. The merged
//! particle sits at the strength-weighted centroid with the summed
//! strength, so the zeroth and first moments of the field are preserved
//! exactly; the core radius grows in quadrature, preserving the second
//! moment for Gaussian-like cores.
//!
//! Merges are not transitive within one pass: a freshly merged particle
//! waits for the next invocation before it can merge again.

use tracing::debug;

use crate::elements::Collection;

/// Run one merge pass over every particle collection in `vort`.
///
/// Returns the number of merges performed.
///
/// # Arguments
/// * `overlap` - pair distance threshold in units of the larger core radius
/// * `merge_thresh` - strength-agreement threshold; pairs must satisfy
///   `|s_i + s_j| / (|s_i| + |s_j|) > 1 - merge_thresh`
/// * `scale_radii_to_peak` - when set, the merged radius preserves the peak
///   vorticity of the pair instead of the second moment
pub fn merge_operation(
    vort: &mut [Collection],
    overlap: f64,
    merge_thresh: f64,
    scale_radii_to_peak: bool,
) -> usize {
    let mut total_merged = 0;

    for coll in vort.iter_mut() {
        let pts = match coll.as_points_mut() {
            Some(p) if !p.is_inert() => p,
            _ => continue,
        };
        let n = pts.get_n();
        if n < 2 {
            continue;
        }

        // Pass state: consumed particles disappear, merged survivors are
        // locked until the next pass.
        let mut dead = vec![false; n];
        let mut locked = vec![false; n];

        for i in 0..n {
            if dead[i] || locked[i] {
                continue;
            }
            for j in (i + 1)..n {
                if dead[j] || locked[j] {
                    continue;
                }
                let (si, sj) = {
                    let s = pts.base().strengths().unwrap();
                    (s[i], s[j])
                };
                if si * sj <= 0.0 {
                    continue;
                }
                let denom = si.abs() + sj.abs();
                if denom == 0.0 || (si + sj).abs() / denom <= 1.0 - merge_thresh {
                    continue;
                }

                let rmax = pts.r[i].max(pts.r[j]);
                let dx = pts.base().x[0][i] - pts.base().x[0][j];
                let dy = pts.base().x[1][i] - pts.base().x[1][j];
                let dist = (dx * dx + dy * dy).sqrt();
                if dist >= overlap * rmax {
                    continue;
                }

                // Merge j into i at the strength-weighted centroid.
                let wi = si.abs() / denom;
                let wj = sj.abs() / denom;
                let new_x = wi * pts.base().x[0][i] + wj * pts.base().x[0][j];
                let new_y = wi * pts.base().x[1][i] + wj * pts.base().x[1][j];
                let new_s = si + sj;
                let new_r = if scale_radii_to_peak {
                    let peak = si.abs() / (pts.r[i] * pts.r[i]) + sj.abs() / (pts.r[j] * pts.r[j]);
                    (new_s.abs() / peak).sqrt()
                } else {
                    (pts.r[i] * pts.r[i] + pts.r[j] * pts.r[j]).sqrt()
                };

                pts.base_mut().x[0][i] = new_x;
                pts.base_mut().x[1][i] = new_y;
                pts.base_mut().s.as_mut().unwrap()[i] = new_s;
                pts.r[i] = new_r;

                dead[j] = true;
                locked[i] = true;
                total_merged += 1;
                break;
            }
        }

        // Compact from the top so swap-removal cannot disturb lower dead
        // indices.
        for i in (0..n).rev() {
            if dead[i] {
                pts.remove(i);
            }
        }
    }

    if total_merged > 0 {
        debug!(merged = total_merged, "merge pass");
    }
    total_merged
}
