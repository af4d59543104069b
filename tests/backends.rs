use approx::assert_abs_diff_eq;
use backprop_layers::backend::{get_backend, Backend};
use backprop_layers::config::{ConvParam, PoolParam};
use backprop_layers::ops::{batched, reference};
use backprop_layers::tensors::Ten64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

fn randn(rng: &mut StdRng, shape: Vec<usize>) -> Ten64 {
    Ten64::from_fn(shape, |_| rng.sample::<f64, _>(StandardNormal))
}

fn assert_same(a: &Ten64, b: &Ten64) {
    assert_eq!(a.shape, b.shape);
    assert_abs_diff_eq!(a.data.as_slice(), b.data.as_slice(), epsilon = 1e-10);
}

#[test]
fn test_default_backend_is_batched() {
    assert_eq!(Backend::default(), Backend::Batched);
    assert!(matches!(get_backend(), Backend::Batched | Backend::Reference));
}

#[test]
fn test_conv_backends_agree() {
    let mut rng = StdRng::seed_from_u64(30);
    for (stride, pad, filter) in [(1, 0, 3), (1, 1, 3), (2, 1, 3), (2, 2, 5), (3, 0, 2)] {
        let x = randn(&mut rng, vec![3, 2, 9, 8]);
        let w = randn(&mut rng, vec![4, 2, filter, filter]);
        let b = randn(&mut rng, vec![4]);
        let param = ConvParam::new(stride, pad).unwrap();

        let out_ref = reference::conv_forward(&x, &w, &b, &param);
        let out_fast = batched::conv_forward(&x, &w, &b, &param);
        assert_same(&out_ref, &out_fast);

        let dout = randn(&mut rng, out_ref.shape.clone());
        let (dx_ref, dw_ref, db_ref) = reference::conv_backward(&dout, &x, &w, &b, &param);
        let (dx_fast, dw_fast, db_fast) = batched::conv_backward(&dout, &x, &w, &b, &param);
        assert_same(&dx_ref, &dx_fast);
        assert_same(&dw_ref, &dw_fast);
        assert_same(&db_ref, &db_fast);
    }
}

#[test]
fn test_pool_backends_agree_including_overlap() {
    let mut rng = StdRng::seed_from_u64(31);
    for param in [
        PoolParam::default(),
        PoolParam::new(3, 3, 2).unwrap(),
        PoolParam::new(2, 3, 1).unwrap(),
    ] {
        let x = randn(&mut rng, vec![2, 3, 7, 7]);
        let out_ref = reference::max_pool_forward(&x, &param);
        let out_fast = batched::max_pool_forward(&x, &param);
        assert_eq!(out_ref, out_fast);

        let dout = randn(&mut rng, out_ref.shape.clone());
        assert_same(
            &reference::max_pool_backward(&dout, &x, &param),
            &batched::max_pool_backward(&dout, &x, &param),
        );
    }
}

#[test]
fn test_pool_backends_break_ties_identically() {
    // integer-valued input in a tiny range has many tied maxima
    let x = Ten64::from_fn(vec![1, 2, 6, 6], |i| ((i * 7) % 3) as f64);
    let param = PoolParam::new(3, 3, 1).unwrap();
    let out = reference::max_pool_forward(&x, &param);
    let dout = Ten64::from_fn(out.shape.clone(), |i| 1.0 + i as f64);
    assert_eq!(
        reference::max_pool_backward(&dout, &x, &param),
        batched::max_pool_backward(&dout, &x, &param)
    );
}
