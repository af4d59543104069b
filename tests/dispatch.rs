use backprop_layers::backend::{get_backend, set_backend, Backend};
use backprop_layers::config::{ConvParam, PoolParam};
use backprop_layers::layers::{conv_backward, conv_forward, max_pool_backward, max_pool_forward};
use backprop_layers::ops::{batched, reference};
use backprop_layers::tensors::Ten64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

fn randn(rng: &mut StdRng, shape: Vec<usize>) -> Ten64 {
    Ten64::from_fn(shape, |_| rng.sample::<f64, _>(StandardNormal))
}

// Lives in its own test binary: the backend is process-wide state.
#[test]
fn test_layers_follow_the_selected_backend() {
    let mut rng = StdRng::seed_from_u64(50);
    let x = randn(&mut rng, vec![2, 3, 6, 6]);
    let w = randn(&mut rng, vec![4, 3, 3, 3]);
    let b = randn(&mut rng, vec![4]);
    let conv = ConvParam::new(1, 1).unwrap();
    let pool = PoolParam::default();
    let dconv = randn(&mut rng, vec![2, 4, 6, 6]);
    let dpool = randn(&mut rng, vec![2, 4, 3, 3]);

    for backend in [Backend::Reference, Backend::Batched] {
        set_backend(backend);
        assert_eq!(get_backend(), backend);

        let (out, cache) = conv_forward(&x, &w, &b, &conv);
        let (dx, dw, db) = conv_backward(&dconv, cache);
        let (pooled, pool_cache) = max_pool_forward(&out, &pool);
        let dpooled = max_pool_backward(&dpool, pool_cache);

        let (expected_out, expected_grads, expected_pooled, expected_dpooled) = match backend {
            Backend::Reference => (
                reference::conv_forward(&x, &w, &b, &conv),
                reference::conv_backward(&dconv, &x, &w, &b, &conv),
                reference::max_pool_forward(&out, &pool),
                reference::max_pool_backward(&dpool, &out, &pool),
            ),
            Backend::Batched => (
                batched::conv_forward(&x, &w, &b, &conv),
                batched::conv_backward(&dconv, &x, &w, &b, &conv),
                batched::max_pool_forward(&out, &pool),
                batched::max_pool_backward(&dpool, &out, &pool),
            ),
        };
        assert_eq!(out, expected_out, "{backend:?} conv forward");
        assert_eq!((dx, dw, db), expected_grads, "{backend:?} conv backward");
        assert_eq!(pooled, expected_pooled, "{backend:?} pool forward");
        assert_eq!(dpooled, expected_dpooled, "{backend:?} pool backward");
    }

    set_backend(Backend::default());
    assert_eq!(get_backend(), Backend::Batched);
}
