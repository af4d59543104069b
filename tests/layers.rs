use approx::{assert_abs_diff_eq, assert_relative_eq};
use backprop_layers::config::{BatchNormParam, ConvParam, DropoutParam, Mode, PoolParam, RunningStats};
use backprop_layers::error::LayerError;
use backprop_layers::layers::*;
use backprop_layers::loss::{softmax_loss, svm_loss};
use backprop_layers::tensor;
use backprop_layers::tensors::{Ten64, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

fn randn(rng: &mut StdRng, shape: Vec<usize>) -> Ten64 {
    Ten64::from_fn(shape, |_| rng.sample::<f64, _>(StandardNormal))
}

#[test]
fn test_affine_shapes() {
    let x = Ten64::from_fn(vec![2, 3, 4], |i| i as f64);
    let w = Ten64::from_fn(vec![12, 5], |i| i as f64 * 0.01);
    let b = Ten64::zeros(vec![5]);
    let (out, cache) = affine_forward(&x, &w, &b);
    assert_eq!(out.shape, vec![2, 5]);

    let (dx, dw, db) = affine_backward(&Ten64::zeros(vec![2, 5]), cache);
    assert_eq!(dx.shape, vec![2, 3, 4]);
    assert_eq!(dw.shape, vec![12, 5]);
    assert_eq!(db.shape, vec![5]);
}

#[test]
fn test_relu_values_and_blocked_gradient() {
    let x = Tensor::new(vec![3], vec![-1.0, 0.0, 2.0]);
    let (out, cache) = relu_forward(&x);
    assert_eq!(out.data, vec![0.0, 0.0, 2.0]);
    let dx = relu_backward(&Tensor::new(vec![3], vec![-7.0, 9.0, 3.0]), cache);
    assert_eq!(dx.data, vec![0.0, 0.0, 3.0]);
}

#[test]
fn test_batchnorm_train_then_test() {
    let mut rng = StdRng::seed_from_u64(20);
    let x = randn(&mut rng, vec![200, 3]).map(|v| 2.0 * v + 5.0);
    let gamma = tensor!([1.0, 2.0, 3.0]);
    let beta = tensor!([0.0, 1.0, 2.0]);
    let mut stats = RunningStats::default();

    let (train_out, _) =
        batchnorm_forward(&x, &gamma, &beta, &BatchNormParam::default(), &mut stats);
    assert_eq!(stats.len(), 3);
    let (test_out, cache) =
        batchnorm_forward(&x, &gamma, &beta, &BatchNormParam::new(Mode::Test), &mut stats);
    assert!(cache.is_none());
    // one update leaves the running stats far from the batch stats
    assert!(train_out.max_abs_diff(&test_out) > 1e-3);

    for _ in 0..300 {
        let _ = batchnorm_forward(&x, &gamma, &beta, &BatchNormParam::default(), &mut stats);
    }
    let snapshot = stats.clone();
    let (test_out, _) =
        batchnorm_forward(&x, &gamma, &beta, &BatchNormParam::new(Mode::Test), &mut stats);
    assert_eq!(stats, snapshot);
    assert!(train_out.max_abs_diff(&test_out) < 1e-6);
}

#[test]
fn test_batchnorm_backward_forms_agree() {
    let mut rng = StdRng::seed_from_u64(21);
    let x = randn(&mut rng, vec![50, 7]);
    let gamma = randn(&mut rng, vec![7]);
    let beta = randn(&mut rng, vec![7]);
    let dout = randn(&mut rng, vec![50, 7]);
    let (_, cache) =
        batchnorm_forward(&x, &gamma, &beta, &BatchNormParam::default(), &mut RunningStats::default());
    let cache = cache.expect("training cache");

    let (dx1, dgamma1, dbeta1) = batchnorm_backward(&dout, cache.clone());
    let (dx2, dgamma2, dbeta2) = batchnorm_backward_alt(&dout, cache);
    assert_relative_eq!(dx1.data.as_slice(), dx2.data.as_slice(), epsilon = 1e-10);
    assert_relative_eq!(dgamma1.data.as_slice(), dgamma2.data.as_slice(), epsilon = 1e-12);
    assert_relative_eq!(dbeta1.data.as_slice(), dbeta2.data.as_slice(), epsilon = 1e-12);
}

#[test]
fn test_dropout_extremes() {
    let mut rng = StdRng::seed_from_u64(22);
    let x = randn(&mut rng, vec![100, 100]).map(|v| v + 10.0);

    let keep_all = DropoutParam::new(0.0, Mode::Train).unwrap();
    assert_eq!(dropout_forward(&x, &keep_all).0, x);

    let drop_most = DropoutParam::new(0.999, Mode::Train).unwrap().with_seed(9);
    let (out, _) = dropout_forward(&x, &drop_most);
    let zeros = out.data.iter().filter(|&&v| v == 0.0).count();
    assert!(zeros > 9_900, "only {zeros} zeros");

    let test = DropoutParam::new(0.999, Mode::Test).unwrap();
    let (out, cache) = dropout_forward(&x, &test);
    assert_eq!(out, x);
    assert_eq!(dropout_backward(&x, cache), x);
}

#[test]
fn test_dropout_rejects_p_of_one() {
    assert!(matches!(
        DropoutParam::new(1.0, Mode::Train),
        Err(LayerError::InvalidConfig { layer: "dropout", .. })
    ));
}

#[test]
fn test_conv_brute_force_3x3() {
    let x = tensor!([[[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]]]);
    let w = tensor!([[[[1.0, 0.0], [0.0, 1.0]]]]);
    let b = tensor!([0.0]);
    let (out, _) = conv_forward(&x, &w, &b, &ConvParam::default());
    assert_eq!(out.shape, vec![1, 1, 2, 2]);

    let mut expected = Vec::new();
    for i in 0..2 {
        for j in 0..2 {
            let mut acc = 0.0;
            for ki in 0..2 {
                for kj in 0..2 {
                    acc += x.data[(i + ki) * 3 + j + kj] * w.data[ki * 2 + kj];
                }
            }
            expected.push(acc);
        }
    }
    assert_eq!(out.data, expected);
}

#[test]
fn test_conv_padding_sees_zeros() {
    let x = Ten64::new(vec![1, 1, 1, 1], vec![2.0]);
    let w = Ten64::new(vec![1, 1, 3, 3], vec![1.0; 9]);
    let b = Ten64::new(vec![1], vec![0.5]);
    let (out, cache) = conv_forward(&x, &w, &b, &ConvParam::same(3));
    assert_eq!(out.data, vec![2.5]);
    let (dx, dw, db) = conv_backward(&tensor!([[[[1.0]]]]), cache);
    assert_eq!(dx.data, vec![1.0]);
    assert_eq!(dw.data, vec![0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(db.data, vec![1.0]);
}

#[test]
fn test_max_pool_routes_to_argmax_and_conserves_sum() {
    let mut rng = StdRng::seed_from_u64(23);
    let x = randn(&mut rng, vec![2, 3, 6, 6]);
    let param = PoolParam::default();
    let (out, cache) = max_pool_forward(&x, &param);
    assert_eq!(out.shape, vec![2, 3, 3, 3]);

    let dout = randn(&mut rng, out.shape.clone());
    let dx = max_pool_backward(&dout, cache);
    assert_abs_diff_eq!(dx.sum(), dout.sum(), epsilon = 1e-12);

    // every nonzero gradient sits on an input equal to its window's max
    for (k, &g) in dx.data.iter().enumerate() {
        if g != 0.0 {
            let plane = k / 36;
            let (r, c) = ((k % 36) / 6, k % 6);
            let pooled = out.data[plane * 9 + (r / 2) * 3 + c / 2];
            assert_eq!(x.data[k], pooled);
        }
    }
    assert_eq!(dx.data.iter().filter(|&&g| g != 0.0).count(), out.len());
}

#[test]
fn test_softmax_rows_sum_to_zero_and_confident_loss() {
    let mut rng = StdRng::seed_from_u64(24);
    let scores = randn(&mut rng, vec![8, 5]);
    let labels = [0, 1, 2, 3, 4, 0, 1, 2];
    let (_, dx) = softmax_loss(&scores, &labels).unwrap();
    for row in dx.rows() {
        assert_abs_diff_eq!(row.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
    }

    let confident = Ten64::from_fn(vec![3, 4], |k| if k % 4 == k / 4 { 50.0 } else { 0.0 });
    let (loss, _) = softmax_loss(&confident, &[0, 1, 2]).unwrap();
    assert!(loss < 1e-20);
}

#[test]
fn test_svm_zero_when_margins_satisfied() {
    let scores = tensor!([[3.0, 1.0, 2.0], [0.0, 5.0, 4.0]]);
    let (loss, dx) = svm_loss(&scores, &[0, 1]).unwrap();
    assert_eq!(loss, 0.0);
    assert!(dx.data.iter().all(|&g| g == 0.0));
}

#[test]
fn test_svm_gradient_counts() {
    let scores = tensor!([[1.0, 1.5, 0.5], [2.0, 0.0, 0.0]]);
    let (loss, dx) = svm_loss(&scores, &[0, 0]).unwrap();
    // sample 0: margins 1.5 and 0.5; sample 1: both margins -1
    assert_relative_eq!(loss, 1.0);
    assert_eq!(dx.data, vec![-1.0, 0.5, 0.5, 0.0, 0.0, 0.0]);
}

#[test]
fn test_mode_strings() {
    assert_eq!("train".parse::<Mode>().unwrap(), Mode::Train);
    assert!(matches!("bogus".parse::<Mode>(), Err(LayerError::InvalidMode(m)) if m == "bogus"));
}
