use paperlink_embed::{cosine_similarity, Embedder, FakeEmbedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let embedder = FakeEmbedder::new(384);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim is 384");

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!(
        (norm - 1.0).abs() <= 1e-3,
        "vector is L2-normalized (norm={norm})"
    );

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn embed_batch_preserves_order_and_length() {
    let embedder = FakeEmbedder::new(64);
    let texts = vec![
        "first sentence about chemistry".to_string(),
        "second sentence about physics".to_string(),
        "third sentence about biology".to_string(),
    ];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");

    assert_eq!(embs.len(), texts.len());
    for (text, emb) in texts.iter().zip(&embs) {
        let direct = embedder.embed_text(text).expect("embed_text");
        assert_eq!(emb, &direct, "batch output matches per-text output");
    }
}

#[test]
fn embed_batch_empty_input() {
    let embedder = FakeEmbedder::new(384);
    let embs = embedder.embed_batch(&[]).expect("embed_batch");
    assert!(embs.is_empty());
}

#[test]
fn self_similarity_is_one() {
    let embedder = FakeEmbedder::new(384);
    let v = embedder.embed_text("semantic search of papers").expect("embed");
    assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    assert!((embedder.similarity(&v, &v) - 1.0).abs() < 1e-5);
}

#[test]
fn related_texts_score_higher_than_unrelated() {
    let embedder = FakeEmbedder::new(384);
    let a = embedder
        .embed_text("machine learning improves protein folding")
        .expect("embed");
    let b = embedder
        .embed_text("machine learning improves protein structure")
        .expect("embed");
    let c = embedder.embed_text("medieval castle architecture").expect("embed");

    // The hash embedder is bag-of-words-ish: shared tokens share buckets.
    assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
}
