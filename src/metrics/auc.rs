use crate::error::{OnsetError, Result};

/// Area under the ROC curve for binary labels.
///
/// Computed from the rank-sum statistic with average ranks for tied
/// scores, which equals the trapezoidal area under the ROC curve.
/// Fails with `DegenerateMetricBatch` unless both classes are present.
pub fn roc_auc(y_true: &[usize], scores: &[f32]) -> Result<f64> {
    assert_eq!(y_true.len(), scores.len(), "one score per label");
    let total = y_true.len();
    let positives = y_true.iter().filter(|&&y| y == 1).count();
    let negatives = total - positives;
    if positives == 0 || negatives == 0 {
        let class = usize::from(positives > 0);
        return Err(OnsetError::DegenerateMetricBatch { class, total });
    }

    let mut order: Vec<usize> = (0..total).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < total {
        let mut end = start + 1;
        while end < total && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean.
        let rank = (start + 1 + end) as f64 / 2.0;
        positive_rank_sum += rank * order[start..end].iter().filter(|&&i| y_true[i] == 1).count() as f64;
        start = end;
    }

    let (p, n) = (positives as f64, negatives as f64);
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}
