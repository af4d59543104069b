use crate::ops::cpu::{matmul, matmul_nt, matmul_tn};
use crate::tensors::Ten64;

/// Values captured by [`affine_forward`] for [`affine_backward`].
#[derive(Debug, Clone)]
pub struct AffineCache {
    x: Ten64,
    w: Ten64,
}

/// Computes the fully connected transform `out = x_flat · w + b`.
///
/// `x` has shape `(N, d_1, …, d_k)` and is read as `(N, D)` with
/// `D = d_1·…·d_k`; `w` is `(D, M)` and `b` is `(M,)`.
///
/// # Returns
/// - `out`: `(N, M)` tensor.
/// - `cache`: the original (unflattened) `x` and `w`.
///
/// # Panics
/// Panics if `D` does not match the rows of `w` or `b` does not have `M` entries.
///
/// # Example
/// ```rust
/// use backprop_layers::layers::{affine_backward, affine_forward};
/// use backprop_layers::tensors::Ten64;
///
/// let x = Ten64::zeros(vec![2, 3, 4]);
/// let w = Ten64::zeros(vec![12, 5]);
/// let b = Ten64::zeros(vec![5]);
/// let (out, cache) = affine_forward(&x, &w, &b);
/// assert_eq!(out.shape, vec![2, 5]);
/// let (dx, dw, db) = affine_backward(&Ten64::zeros(vec![2, 5]), cache);
/// assert_eq!(dx.shape, vec![2, 3, 4]);
/// assert_eq!((dw.shape, db.shape), (vec![12, 5], vec![5]));
/// ```
pub fn affine_forward(x: &Ten64, w: &Ten64, b: &Ten64) -> (Ten64, AffineCache) {
    let n = x.shape[0];
    let d = x.shape[1..].iter().product::<usize>();
    let (wd, m) = w.dims2();
    assert_eq!(d, wd, "input flattens to {d} features but weights expect {wd}");
    assert_eq!(b.len(), m, "bias has {} entries for {m} outputs", b.len());

    let mut out = matmul(&x.data, &w.data, n, d, m);
    if m > 0 {
        for row in out.chunks_mut(m) {
            for (o, &bias) in row.iter_mut().zip(&b.data) {
                *o += bias;
            }
        }
    }

    let cache = AffineCache { x: x.clone(), w: w.clone() };
    (Ten64::new(vec![n, m], out), cache)
}

/// Backward pass of [`affine_forward`].
///
/// # Returns
/// `(dx, dw, db)` where `dx` has the original shape of `x`, not the flattened one.
pub fn affine_backward(dout: &Ten64, cache: AffineCache) -> (Ten64, Ten64, Ten64) {
    let AffineCache { x, w } = cache;
    let n = x.shape[0];
    let (d, m) = w.dims2();
    assert_eq!(dout.shape, vec![n, m], "upstream gradient shape mismatch");

    let dx = Ten64::new(x.shape.clone(), matmul_nt(&dout.data, &w.data, n, m, d));
    let dw = Ten64::new(vec![d, m], matmul_tn(&x.data, &dout.data, n, d, m));
    let db = Ten64::new(vec![m], dout.sum_rows());

    (dx, dw, db)
}
