//! Matrix-product convolution and plane-parallel max pooling.
//!
//! # Convolution
//!
//! For every output position `(i, j)` the receptive fields of all `N` images are
//! gathered from the padded input into an `N × K` patch matrix, where
//! `K = C·HH·WW`. Filters are already laid out as an `F × K` matrix in memory,
//! so the whole position reduces to one product covering every image and every
//! filter at once:
//!
//! ```text
//! out[:, :, i, j] = patches · Wᵀ + b          (N × F)
//! dW             += dout[:, :, i, j]ᵀ · patches   (F × K)
//! dpatches        = dout[:, :, i, j] · W          (N × K)
//! ```
//!
//! `dpatches` is scatter-added into a padded gradient buffer; overlapping
//! windows accumulate. The border is stripped at the end.
//!
//! # Pooling
//!
//! Each `(image, channel)` plane is independent, so planes are processed in
//! parallel with `rayon`.

use rayon::prelude::*;

use super::cpu::{matmul, matmul_nt, matmul_tn};
use super::{conv_dims, window_argmax};
use crate::config::{ConvParam, PoolParam};
use crate::tensors::Ten64;

/// Receptive-field geometry of one convolution call.
struct Geometry {
    n: usize,
    c: usize,
    /// Padded input height and width.
    hp: usize,
    wp: usize,
    hh: usize,
    ww: usize,
    stride: usize,
}

impl Geometry {
    fn k(&self) -> usize {
        self.c * self.hh * self.ww
    }

    /// Copies the `N × K` patch matrix of output position `(i, j)` out of the padded input.
    fn gather(&self, xp: &[f64], i: usize, j: usize) -> Vec<f64> {
        let mut patches = Vec::with_capacity(self.n * self.k());
        let (top, left) = (i * self.stride, j * self.stride);
        for ni in 0..self.n {
            for ci in 0..self.c {
                let plane = (ni * self.c + ci) * self.hp * self.wp;
                for r in top..top + self.hh {
                    let at = plane + r * self.wp + left;
                    patches.extend_from_slice(&xp[at..at + self.ww]);
                }
            }
        }
        patches
    }

    /// Adds an `N × K` patch-gradient matrix back into the padded gradient buffer.
    fn scatter_add(&self, dxp: &mut [f64], dpatches: &[f64], i: usize, j: usize) {
        let (top, left) = (i * self.stride, j * self.stride);
        let mut rows = dpatches.chunks_exact(self.ww);
        for ni in 0..self.n {
            for ci in 0..self.c {
                let plane = (ni * self.c + ci) * self.hp * self.wp;
                for r in top..top + self.hh {
                    let at = plane + r * self.wp + left;
                    if let Some(src) = rows.next() {
                        for (d, &s) in dxp[at..at + self.ww].iter_mut().zip(src) {
                            *d += s;
                        }
                    }
                }
            }
        }
    }
}

/// Convolution forward pass; see [`crate::layers::conv_forward`].
pub fn conv_forward(x: &Ten64, w: &Ten64, b: &Ten64, param: &ConvParam) -> Ten64 {
    let (n, c, h, wd, f, hh, ww) = conv_dims(x, w, b);
    let (ho, wo) = param.output_dims(h, wd, hh, ww);
    let xp = x.pad2d(param.pad);
    let geo = Geometry {
        n,
        c,
        hp: h + 2 * param.pad,
        wp: wd + 2 * param.pad,
        hh,
        ww,
        stride: param.stride,
    };
    let k = geo.k();

    // one N × F block per output position
    let blocks: Vec<Vec<f64>> = (0..ho * wo)
        .into_par_iter()
        .map(|pos| {
            let patches = geo.gather(&xp.data, pos / wo, pos % wo);
            matmul_nt(&patches, &w.data, n, k, f)
        })
        .collect();

    let mut out = Ten64::zeros(vec![n, f, ho, wo]);
    for (pos, block) in blocks.iter().enumerate() {
        for ni in 0..n {
            for fi in 0..f {
                out.data[(ni * f + fi) * ho * wo + pos] = block[ni * f + fi] + b.data[fi];
            }
        }
    }
    out
}

/// Convolution backward pass returning `(dx, dw, db)`.
pub fn conv_backward(
    dout: &Ten64,
    x: &Ten64,
    w: &Ten64,
    b: &Ten64,
    param: &ConvParam,
) -> (Ten64, Ten64, Ten64) {
    let (n, c, h, wd, f, hh, ww) = conv_dims(x, w, b);
    let (ho, wo) = param.output_dims(h, wd, hh, ww);
    assert_eq!(dout.shape, vec![n, f, ho, wo], "upstream gradient shape mismatch");

    let xp = x.pad2d(param.pad);
    let geo = Geometry {
        n,
        c,
        hp: h + 2 * param.pad,
        wp: wd + 2 * param.pad,
        hh,
        ww,
        stride: param.stride,
    };
    let k = geo.k();

    let mut db = Ten64::zeros_like(b);
    for (plane_idx, plane) in dout.data.chunks(ho * wo).enumerate() {
        db.data[plane_idx % f] += plane.iter().sum::<f64>();
    }

    let mut dw = Ten64::zeros_like(w);
    let mut dxp = Ten64::zeros_like(&xp);
    let mut dpos = vec![0.0; n * f];
    for pos in 0..ho * wo {
        let (i, j) = (pos / wo, pos % wo);
        for (slot, plane) in dpos.iter_mut().zip(dout.data.chunks(ho * wo)) {
            *slot = plane[pos];
        }

        let patches = geo.gather(&xp.data, i, j);
        for (acc, v) in dw.data.iter_mut().zip(matmul_tn(&dpos, &patches, n, f, k)) {
            *acc += v;
        }
        let dpatches = matmul(&dpos, &w.data, n, f, k);
        geo.scatter_add(&mut dxp.data, &dpatches, i, j);
    }

    (dxp.unpad2d(param.pad), dw, db)
}

/// Max-pool forward pass; see [`crate::layers::max_pool_forward`].
pub fn max_pool_forward(x: &Ten64, param: &PoolParam) -> Ten64 {
    let (n, c, h, wd) = x.dims4();
    let (ho, wo) = param.output_dims(h, wd);

    let mut out = Ten64::zeros(vec![n, c, ho, wo]);
    out.data
        .par_chunks_mut(ho * wo)
        .zip(x.data.par_chunks(h * wd))
        .for_each(|(dst, plane)| {
            for (pos, slot) in dst.iter_mut().enumerate() {
                let (i, j) = (pos / wo, pos % wo);
                *slot = window_argmax(
                    plane,
                    wd,
                    i * param.stride,
                    j * param.stride,
                    param.pool_height,
                    param.pool_width,
                )
                .1;
            }
        });
    out
}

/// Max-pool backward pass; each upstream value goes to its window's first maximum.
pub fn max_pool_backward(dout: &Ten64, x: &Ten64, param: &PoolParam) -> Ten64 {
    let (n, c, h, wd) = x.dims4();
    let (ho, wo) = param.output_dims(h, wd);
    assert_eq!(dout.shape, vec![n, c, ho, wo], "upstream gradient shape mismatch");

    let mut dx = Ten64::zeros_like(x);
    dx.data
        .par_chunks_mut(h * wd)
        .zip(x.data.par_chunks(h * wd))
        .zip(dout.data.par_chunks(ho * wo))
        .for_each(|((dplane, plane), grads)| {
            for (pos, &g) in grads.iter().enumerate() {
                let (i, j) = (pos / wo, pos % wo);
                let (idx, _) = window_argmax(
                    plane,
                    wd,
                    i * param.stride,
                    j * param.stride,
                    param.pool_height,
                    param.pool_width,
                );
                dplane[idx] += g;
            }
        });
    dx
}
