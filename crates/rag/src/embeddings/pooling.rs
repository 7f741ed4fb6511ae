//! Token pooling and normalization.

use codexplain_core::{AppError, AppResult};

/// Average token-level vectors into one sentence vector.
pub fn mean_pool(tokens: &[Vec<f32>]) -> AppResult<Vec<f32>> {
    let first = tokens
        .first()
        .ok_or_else(|| AppError::Embedding("Cannot pool zero token vectors".to_string()))?;
    let width = first.len();

    let mut pooled = vec![0.0f32; width];
    for (i, token) in tokens.iter().enumerate() {
        if token.len() != width {
            return Err(AppError::Embedding(format!(
                "Token {} has {} dimensions, expected {}",
                i,
                token.len(),
                width
            )));
        }
        for (acc, value) in pooled.iter_mut().zip(token) {
            *acc += value;
        }
    }

    let count = tokens.len() as f32;
    for value in &mut pooled {
        *value /= count;
    }

    Ok(pooled)
}

/// Scale a vector to unit L2 norm in place. Zero vectors are left as-is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
