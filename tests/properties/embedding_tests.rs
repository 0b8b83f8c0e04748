//! Properties of the offline hash embedder.

use proptest::prelude::*;

use exo_search::search::HashEmbedder;

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Texts drawn from two disjoint alphabets never share a token or bigram.
fn arb_text(alphabet: &'static str) -> impl Strategy<Value = String> {
    prop::collection::vec(proptest::string::string_regex(&format!("[{alphabet}]{{3,8}}")).unwrap(), 1..5).prop_map(|words| words.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn texts_without_shared_tokens_stay_dissimilar(
        left in arb_text("a-m"),
        right in arb_text("n-z"),
    ) {
        let embedder = HashEmbedder::new(384);
        let similarity = dot(&embedder.embed(&left), &embedder.embed(&right));
        prop_assert!(similarity.abs() < 0.3, "{left:?} vs {right:?}: {similarity}");
    }

    #[test]
    fn embeddings_are_unit_or_zero(text in arb_text("a-z")) {
        let embedder = HashEmbedder::new(384);
        let embedding = embedder.embed(&text);
        let norm = dot(&embedding, &embedding).sqrt();
        prop_assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-4, "{text:?}: {norm}");
    }
}
