use std::sync::Arc;

use nanogpt_rs::nn::transformer::{AttentionHead, CausalMask, MultiHeadAttention};
use nanogpt_rs::nn::{Dropout, Linear};
use nanogpt_rs::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A head with hand-picked weights: key reads feature 0, query reads
/// feature 1, value sums both.
fn hand_built_head() -> AttentionHead<f64> {
    let key = Linear::new(Tensor::new(vec![1.0, 0.0], [1, 2]).unwrap(), None);
    let query = Linear::new(Tensor::new(vec![0.0, 1.0], [1, 2]).unwrap(), None);
    let value = Linear::new(Tensor::new(vec![1.0, 1.0], [1, 2]).unwrap(), None);
    let mask = Arc::new(CausalMask::new(4));
    AttentionHead::new(key, query, value, mask, Dropout::new(0.0).unwrap())
}

#[test]
fn head_matches_hand_computed_attention() {
    // x = [[1,2],[3,4]]: k = [1,3], q = [2,4], v = [3,7].
    // Scores q k^T / sqrt(2); position 0 sees only itself, position 1
    // softmaxes over both.
    let head = hand_built_head();
    let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], [1, 2, 2]).unwrap();

    let out = head.forward(&x).unwrap();
    assert_eq!(out.shape(), &[1, 2, 1]);
    assert!((out.data()[0] - 3.0).abs() < 1e-12);
    assert!((out.data()[1] - 6.986074690811738).abs() < 1e-9);
}

#[test]
fn scores_are_scaled_by_input_width_not_head_width() {
    // With the 1/sqrt(head_size) = 1 scale the second position would
    // come out near 6.9987 instead.
    let head = hand_built_head();
    let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], [1, 2, 2]).unwrap();

    let out = head.forward(&x).unwrap();
    assert!((out.data()[1] - 6.998658599478135).abs() > 1e-3);
}

#[test]
fn first_position_attends_only_to_itself() {
    let mut rng = StdRng::seed_from_u64(31);
    let mask = Arc::new(CausalMask::new(8));
    let head = AttentionHead::<f64>::init(6, 3, 0.0, mask, &mut rng).unwrap();

    let a = Tensor::new((0..18).map(|i| i as f64 * 0.1).collect::<Vec<_>>(), [1, 3, 6]).unwrap();
    // Same first position, everything after it rewritten.
    let mut changed = a.data().to_vec();
    for v in &mut changed[6..] {
        *v += 5.0;
    }
    let b = Tensor::new(changed, [1, 3, 6]).unwrap();

    let out_a = head.forward(&a).unwrap();
    let out_b = head.forward(&b).unwrap();
    assert_eq!(&out_a.data()[..3], &out_b.data()[..3]);
}

#[test]
fn later_tokens_cannot_change_earlier_outputs() {
    let mut rng = StdRng::seed_from_u64(32);
    let mask = Arc::new(CausalMask::new(8));
    let attn = MultiHeadAttention::<f64>::init(8, 2, 0.0, mask, &mut rng).unwrap();

    let base: Vec<f64> = (0..32).map(|i| (i as f64).sin()).collect();
    let a = Tensor::new(base.clone(), [1, 4, 8]).unwrap();
    let mut edited = base;
    for v in &mut edited[24..] {
        *v = -*v + 0.5;
    }
    let b = Tensor::new(edited, [1, 4, 8]).unwrap();

    let out_a = attn.forward(&a).unwrap();
    let out_b = attn.forward(&b).unwrap();

    // Positions 0..2 are bitwise unchanged; the edited position moves.
    assert_eq!(&out_a.data()[..24], &out_b.data()[..24]);
    assert_ne!(&out_a.data()[24..], &out_b.data()[24..]);
}

#[test]
fn multi_head_output_keeps_the_embedding_width() {
    let mut rng = StdRng::seed_from_u64(33);
    let mask = Arc::new(CausalMask::new(4));
    let attn = MultiHeadAttention::<f32>::init(12, 3, 0.0, mask, &mut rng).unwrap();

    assert_eq!(attn.heads.len(), 3);
    assert_eq!(attn.heads[0].head_size(), 4);

    let x = Tensor::<f32, 3>::ones([2, 4, 12]);
    let out = attn.forward(&x).unwrap();
    assert_eq!(out.shape(), &[2, 4, 12]);
    assert!(out.data().iter().all(|v| v.is_finite()));
}

#[test]
fn shorter_windows_slice_the_shared_mask() {
    let mut rng = StdRng::seed_from_u64(34);
    let mask = Arc::new(CausalMask::new(16));
    let head = AttentionHead::<f64>::init(4, 2, 0.0, mask, &mut rng).unwrap();

    for time in [1usize, 3, 16] {
        let x = Tensor::<f64, 3>::ones([1, time, 4]);
        let out = head.forward(&x).unwrap();
        assert_eq!(out.shape(), &[1, time, 2]);
        assert!(out.data().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn windows_past_the_mask_fail() {
    let mut rng = StdRng::seed_from_u64(35);
    let mask = Arc::new(CausalMask::new(2));
    let head = AttentionHead::<f64>::init(4, 2, 0.0, mask, &mut rng).unwrap();

    let x = Tensor::<f64, 3>::ones([1, 3, 4]);
    assert!(head.forward(&x).is_err());
}

#[test]
fn attention_dropout_is_reproducible_under_a_seed() {
    let mut rng = StdRng::seed_from_u64(36);
    let mask = Arc::new(CausalMask::new(4));
    let attn = MultiHeadAttention::<f64>::init(8, 2, 0.5, mask, &mut rng).unwrap();
    let x = Tensor::<f64, 3>::ones([1, 4, 8]);

    let a = attn
        .forward_t(&x, Some(&mut StdRng::seed_from_u64(100)))
        .unwrap();
    let b = attn
        .forward_t(&x, Some(&mut StdRng::seed_from_u64(100)))
        .unwrap();
    assert_eq!(a.data(), b.data());

    // And eval ignores the rate entirely.
    let c = attn.forward(&x).unwrap();
    let d = attn.forward(&x).unwrap();
    assert_eq!(c.data(), d.data());
    assert_ne!(a.data(), c.data());
}
