//! Restarted flexible GMRES for the dense influence system.
//!
//! Arnoldi with modified Gram-Schmidt and Givens rotations on the
//! Hessenberg; the flexible variant keeps the preconditioned basis so a
//! variable preconditioner slot is possible, though the only preconditioner
//! currently offered is the identity.

use faer::Mat;

use crate::error::{Error, Result};

/// Preconditioner selection for the BEM solve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Preconditioner {
    /// No preconditioning.
    #[default]
    None,
}

/// Solver knobs.
#[derive(Clone, Copy, Debug)]
pub struct FgmresConfig {
    /// Relative residual tolerance.
    pub tol: f64,
    /// Krylov dimension before a restart.
    pub restart: usize,
    /// Total matrix-vector product budget.
    pub max_iters: usize,
    pub preconditioner: Preconditioner,
}

impl Default for FgmresConfig {
    fn default() -> Self {
        Self {
            tol: 1.0e-10,
            restart: 200,
            max_iters: 2000,
            preconditioner: Preconditioner::None,
        }
    }
}

fn matvec(a: &Mat<f64>, x: &[f64], out: &mut [f64]) {
    let n = a.nrows();
    debug_assert_eq!(x.len(), a.ncols());
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..x.len() {
            sum += a[(i, j)] * x[j];
        }
        out[i] = sum;
    }
}

fn norm2(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn apply_preconditioner(p: Preconditioner, v: &[f64]) -> Vec<f64> {
    match p {
        Preconditioner::None => v.to_vec(),
    }
}

/// Solve `A x = b` with restarted FGMRES.
///
/// Returns the solution, or [`Error::Solver`] with the final relative
/// residual when the iteration budget runs out.
pub fn fgmres(a: &Mat<f64>, b: &[f64], cfg: &FgmresConfig) -> Result<Vec<f64>> {
    let n = b.len();
    assert_eq!(a.nrows(), n, "matrix/rhs size mismatch");
    assert_eq!(a.ncols(), n, "matrix must be square");

    if n == 0 {
        return Ok(Vec::new());
    }

    let bnorm = norm2(b);
    if bnorm == 0.0 {
        return Ok(vec![0.0; n]);
    }

    let m = cfg.restart.max(1).min(n);
    let mut x = vec![0.0; n];
    let mut total_iters = 0;
    let mut last_res = f64::INFINITY;

    while total_iters < cfg.max_iters {
        // Residual for this cycle.
        let mut r = vec![0.0; n];
        matvec(a, &x, &mut r);
        for i in 0..n {
            r[i] = b[i] - r[i];
        }
        let beta = norm2(&r);
        last_res = beta / bnorm;
        if last_res <= cfg.tol {
            return Ok(x);
        }

        // Arnoldi basis and the preconditioned companions.
        let mut v: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        let mut z: Vec<Vec<f64>> = Vec::with_capacity(m);
        v.push(r.iter().map(|x| x / beta).collect());

        // Hessenberg in column-major bands plus Givens state.
        let mut h = Mat::<f64>::zeros(m + 1, m);
        let mut cs = vec![0.0; m];
        let mut sn = vec![0.0; m];
        let mut g = vec![0.0; m + 1];
        g[0] = beta;

        let mut k_used = 0;
        for j in 0..m {
            if total_iters >= cfg.max_iters {
                break;
            }
            total_iters += 1;

            let zj = apply_preconditioner(cfg.preconditioner, &v[j]);
            let mut w = vec![0.0; n];
            matvec(a, &zj, &mut w);
            z.push(zj);

            // Modified Gram-Schmidt.
            for i in 0..=j {
                let hij: f64 = w.iter().zip(v[i].iter()).map(|(a, b)| a * b).sum();
                h[(i, j)] = hij;
                for (wk, vk) in w.iter_mut().zip(v[i].iter()) {
                    *wk -= hij * vk;
                }
            }
            let hnext = norm2(&w);
            h[(j + 1, j)] = hnext;

            // Previous Givens rotations on the new column.
            for i in 0..j {
                let t = cs[i] * h[(i, j)] + sn[i] * h[(i + 1, j)];
                h[(i + 1, j)] = -sn[i] * h[(i, j)] + cs[i] * h[(i + 1, j)];
                h[(i, j)] = t;
            }
            // New rotation to eliminate the subdiagonal.
            let denom = (h[(j, j)] * h[(j, j)] + hnext * hnext).sqrt();
            if denom > 0.0 {
                cs[j] = h[(j, j)] / denom;
                sn[j] = hnext / denom;
            } else {
                cs[j] = 1.0;
                sn[j] = 0.0;
            }
            h[(j, j)] = cs[j] * h[(j, j)] + sn[j] * hnext;
            h[(j + 1, j)] = 0.0;
            g[j + 1] = -sn[j] * g[j];
            g[j] *= cs[j];

            k_used = j + 1;
            last_res = g[j + 1].abs() / bnorm;

            if hnext > 0.0 && last_res > cfg.tol {
                v.push(w.iter().map(|x| x / hnext).collect());
                continue;
            }
            break;
        }

        if k_used > 0 {
            // Back-substitute the triangular system.
            let mut y = vec![0.0; k_used];
            for i in (0..k_used).rev() {
                let mut sum = g[i];
                for j in (i + 1)..k_used {
                    sum -= h[(i, j)] * y[j];
                }
                let d = h[(i, i)];
                y[i] = if d.abs() > 0.0 { sum / d } else { 0.0 };
            }
            for (j, yj) in y.iter().enumerate() {
                for i in 0..n {
                    x[i] += yj * z[j][i];
                }
            }
        }

        if last_res <= cfg.tol {
            return Ok(x);
        }
    }

    // One more residual check before giving up.
    let mut r = vec![0.0; n];
    matvec(a, &x, &mut r);
    for i in 0..n {
        r[i] = b[i] - r[i];
    }
    let final_res = norm2(&r) / bnorm;
    if final_res <= cfg.tol {
        return Ok(x);
    }
    Err(Error::Solver {
        residual: final_res,
        iters: total_iters,
        tol: cfg.tol,
    })
}
