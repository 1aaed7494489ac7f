//! Hashed bag-of-bytes embeddings and cosine scoring.

/// Embeds `tokens` into a unit vector of `dim` dimensions.
///
/// Unigrams and bigrams are hashed into buckets; `seed` ties the buckets to
/// the loaded model.
pub(crate) fn embed(tokens: &[u32], dim: usize, seed: u64) -> Vec<f32> {
    let mut vector = vec![0.0_f32; dim];
    if dim == 0 {
        return vector;
    }
    for &token in tokens {
        let bucket = bucket_for(seed ^ u64::from(token), dim);
        vector[bucket] += 1.0;
    }
    for pair in tokens.windows(2) {
        let key = (u64::from(pair[0]) << 32) | u64::from(pair[1]);
        let bucket = bucket_for(seed.rotate_left(17) ^ key, dim);
        vector[bucket] += 0.5;
    }
    normalise(&mut vector);
    vector
}

/// Cosine similarity; zero when either vector is all zeros.
pub(crate) fn cosine(left: &[f32], right: &[f32]) -> f32 {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let norm = magnitude(left) * magnitude(right);
    if norm == 0.0 { 0.0 } else { dot / norm }
}

fn bucket_for(key: u64, dim: usize) -> usize {
    // `dim` fits in u64 and the remainder fits back in usize.
    let modulus = dim as u64;
    (mix(key) % modulus) as usize
}

// splitmix64 finaliser
const fn mix(mut value: u64) -> u64 {
    value = value.wrapping_add(0x9E37_79B9_7F4A_7C15);
    value = (value ^ (value >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    value = (value ^ (value >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    value ^ (value >> 31)
}

fn magnitude(vector: &[f32]) -> f32 {
    vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

fn normalise(vector: &mut [f32]) {
    let norm = magnitude(vector);
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::tokenizer::ByteTokenizer;

    fn embed_text(text: &str) -> Vec<f32> {
        embed(&ByteTokenizer.encode(text, false), 32, 7)
    }

    #[test]
    fn vectors_are_unit_length() {
        let vector = embed_text("hello world");
        assert_eq!(vector.len(), 32);
        assert!((magnitude(&vector) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_input_yields_zero_vector() {
        let vector = embed_text("");
        assert!(vector.iter().all(|value| *value == 0.0));
        assert!(cosine(&vector, &embed_text("a")).abs() < f32::EPSILON);
    }

    #[test]
    fn embedding_is_deterministic() {
        assert_eq!(embed_text("same"), embed_text("same"));
    }

    #[test]
    fn similar_text_scores_higher() {
        let query = embed_text("rust borrow checker");
        let close = embed_text("the rust borrow checker");
        let far = embed_text("zzzz qqqq");
        assert!(cosine(&query, &close) > cosine(&query, &far));
    }
}
