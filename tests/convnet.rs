use backprop_layers::classifiers::linear::{softmax_loss_naive, softmax_loss_vectorized};
use backprop_layers::classifiers::{ConvNetConfig, ThreeLayerConvNet};
use backprop_layers::gradcheck::{eval_numerical_gradient, rel_error};
use backprop_layers::tensors::Ten64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

fn randn(rng: &mut StdRng, shape: Vec<usize>) -> Ten64 {
    Ten64::from_fn(shape, |_| rng.sample::<f64, _>(StandardNormal))
}

fn small_config(reg: f64) -> ConvNetConfig {
    ConvNetConfig {
        input_dim: (3, 8, 8),
        num_filters: 3,
        filter_size: 3,
        hidden_dim: 7,
        num_classes: 4,
        weight_scale: 1e-1,
        reg,
    }
}

#[test]
fn test_convnet_scores_shape() {
    let mut rng = StdRng::seed_from_u64(40);
    let net = ThreeLayerConvNet::new(small_config(0.0), &mut rng).unwrap();
    let x = randn(&mut rng, vec![5, 3, 8, 8]);
    assert_eq!(net.scores(&x).shape, vec![5, 4]);
}

#[test]
fn test_convnet_loss_gradients() {
    let mut rng = StdRng::seed_from_u64(41);
    let net = ThreeLayerConvNet::new(small_config(0.5), &mut rng).unwrap();
    let x = randn(&mut rng, vec![2, 3, 8, 8]);
    let y = [1, 3];
    let (_, grads) = net.loss(&x, &y).unwrap();

    type Slot = fn(&mut ThreeLayerConvNet) -> &mut Ten64;
    let slots: [(&str, Slot, &Ten64); 6] = [
        ("w1", |n| &mut n.w1, &grads.w1),
        ("b1", |n| &mut n.b1, &grads.b1),
        ("w2", |n| &mut n.w2, &grads.w2),
        ("b2", |n| &mut n.b2, &grads.b2),
        ("w3", |n| &mut n.w3, &grads.w3),
        ("b3", |n| &mut n.b3, &grads.b3),
    ];

    for (name, slot, analytic) in slots {
        let mut probe = net.clone();
        let at = slot(&mut probe).clone();
        let numeric = eval_numerical_gradient(
            |p| {
                *slot(&mut probe) = p.clone();
                probe.loss(&x, &y).unwrap().0
            },
            &at,
            1e-6,
        );
        let err = rel_error(analytic, &numeric);
        assert!(err < 1e-4, "{name}: relative error {err:e}");
    }
}

#[test]
fn test_convnet_rejects_bad_labels() {
    let mut rng = StdRng::seed_from_u64(42);
    let net = ThreeLayerConvNet::new(small_config(0.0), &mut rng).unwrap();
    let x = Ten64::zeros(vec![1, 3, 8, 8]);
    assert!(net.loss(&x, &[4]).is_err());
}

#[test]
fn test_linear_softmax_gradient() {
    let mut rng = StdRng::seed_from_u64(43);
    let w = randn(&mut rng, vec![10, 3]).map(|v| v * 1e-2);
    let x = randn(&mut rng, vec![20, 10]);
    let y: Vec<usize> = (0..20).map(|_| rng.random_range(0..3)).collect();

    let (loss, dw) = softmax_loss_vectorized(&w, &x, &y, 0.05).unwrap();
    let (naive_loss, naive_dw) = softmax_loss_naive(&w, &x, &y, 0.05).unwrap();
    assert!((loss - naive_loss).abs() < 1e-12);
    assert!(rel_error(&dw, &naive_dw) < 1e-10);

    let numeric = eval_numerical_gradient(
        |w| softmax_loss_vectorized(w, &x, &y, 0.05).unwrap().0,
        &w,
        1e-5,
    );
    assert!(rel_error(&dw, &numeric) < 1e-6);
}
