/// Map a cosine distance to a 0..=100 similarity score, rounded to 4 decimals.
pub fn similarity_score(cosine_distance: f64) -> f64 {
    let similarity = (1.0 - cosine_distance).clamp(0.0, 1.0) * 100.0;
    (similarity * 10_000.0).round() / 10_000.0
}
