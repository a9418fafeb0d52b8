use convkit_embed::{get_default_embedder, HashEmbedder, DEFAULT_DIM};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = get_default_embedder(DEFAULT_DIM);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), DEFAULT_DIM);
    assert_eq!(embedder.dim(), DEFAULT_DIM);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_words_score_higher_than_disjoint_text() {
    let e = HashEmbedder::new(256);
    let q = e.embed_text("how to start a campfire");
    let near = e.embed_text("Start the campfire with dry tinder");
    let far = e.embed_text("quarterly revenue grew in europe");
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn empty_text_is_zero_vector() {
    let e = HashEmbedder::new(8);
    assert!(e.embed_text("   ").iter().all(|x| *x == 0.0));
}
