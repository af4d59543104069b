//! Loop-based convolution and max pooling.
//!
//! Every output element is computed by walking its receptive field directly,
//! without padding buffers or matrix products. These are slow and exist to
//! cross-check the [`super::batched`] kernels.

use super::{conv_dims, window_argmax};
use crate::config::{ConvParam, PoolParam};
use crate::tensors::Ten64;

/// Maps output row/column `o` and kernel offset `k` to an unpadded input
/// coordinate, or `None` when it lands in the zero padding.
#[inline]
fn source(o: usize, k: usize, stride: usize, pad: usize, size: usize) -> Option<usize> {
    (o * stride + k).checked_sub(pad).filter(|&s| s < size)
}

/// Convolution forward pass; see [`crate::layers::conv_forward`].
pub fn conv_forward(x: &Ten64, w: &Ten64, b: &Ten64, param: &ConvParam) -> Ten64 {
    let (n, c, h, wd, f, hh, ww) = conv_dims(x, w, b);
    let (ho, wo) = param.output_dims(h, wd, hh, ww);
    let (stride, pad) = (param.stride, param.pad);

    let mut out = Ten64::zeros(vec![n, f, ho, wo]);
    let mut at = 0;
    for ni in 0..n {
        for fi in 0..f {
            for i in 0..ho {
                for j in 0..wo {
                    let mut acc = b.data[fi];
                    for ci in 0..c {
                        for ki in 0..hh {
                            let Some(r) = source(i, ki, stride, pad, h) else { continue };
                            for kj in 0..ww {
                                let Some(s) = source(j, kj, stride, pad, wd) else { continue };
                                acc += x.data[((ni * c + ci) * h + r) * wd + s]
                                    * w.data[((fi * c + ci) * hh + ki) * ww + kj];
                            }
                        }
                    }
                    out.data[at] = acc;
                    at += 1;
                }
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
    let (stride, pad) = (param.stride, param.pad);

    let mut dx = Ten64::zeros_like(x);
    let mut dw = Ten64::zeros_like(w);
    let mut db = Ten64::zeros_like(b);

    for ni in 0..n {
        for fi in 0..f {
            for i in 0..ho {
                for j in 0..wo {
                    let g = dout.data[((ni * f + fi) * ho + i) * wo + j];
                    db.data[fi] += g;
                    for ci in 0..c {
                        for ki in 0..hh {
                            let Some(r) = source(i, ki, stride, pad, h) else { continue };
                            for kj in 0..ww {
                                let Some(s) = source(j, kj, stride, pad, wd) else { continue };
                                let xi = ((ni * c + ci) * h + r) * wd + s;
                                let wi = ((fi * c + ci) * hh + ki) * ww + kj;
                                dw.data[wi] += g * x.data[xi];
                                dx.data[xi] += g * w.data[wi];
                            }
                        }
                    }
                }
            }
        }
    }
    (dx, dw, db)
}

/// Max-pool forward pass; see [`crate::layers::max_pool_forward`].
pub fn max_pool_forward(x: &Ten64, param: &PoolParam) -> Ten64 {
    let (n, c, h, wd) = x.dims4();
    let (ho, wo) = param.output_dims(h, wd);

    let mut out = Ten64::zeros(vec![n, c, ho, wo]);
    for plane_idx in 0..n * c {
        let plane = &x.data[plane_idx * h * wd..(plane_idx + 1) * h * wd];
        for i in 0..ho {
            for j in 0..wo {
                let (_, v) = window_argmax(
                    plane,
                    wd,
                    i * param.stride,
                    j * param.stride,
                    param.pool_height,
                    param.pool_width,
                );
                out.data[(plane_idx * ho + i) * wo + j] = v;
            }
        }
    }
    out
}

/// Max-pool backward pass; each upstream value goes to its window's first maximum.
pub fn max_pool_backward(dout: &Ten64, x: &Ten64, param: &PoolParam) -> Ten64 {
    let (n, c, h, wd) = x.dims4();
    let (ho, wo) = param.output_dims(h, wd);
    assert_eq!(dout.shape, vec![n, c, ho, wo], "upstream gradient shape mismatch");

    let mut dx = Ten64::zeros_like(x);
    for plane_idx in 0..n * c {
        let offset = plane_idx * h * wd;
        let plane = &x.data[offset..offset + h * wd];
        for i in 0..ho {
            for j in 0..wo {
                let (idx, _) = window_argmax(
                    plane,
                    wd,
                    i * param.stride,
                    j * param.stride,
                    param.pool_height,
                    param.pool_width,
                );
                dx.data[offset + idx] += dout.data[(plane_idx * ho + i) * wo + j];
            }
        }
    }
    dx
}
