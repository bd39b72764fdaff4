/// In-place L2 normalization of one embedding row.
///
/// Zero-norm rows are left untouched (divisor 1), so the result is either unit
/// length or the zero vector.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Normalize every row of a batch.
pub fn l2_normalize_rows(rows: &mut [Vec<f32>]) {
    for row in rows.iter_mut() {
        l2_normalize_in_place(row);
    }
}
