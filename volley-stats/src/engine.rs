use tracing::debug;
use volley_common::{HistogramKey, ReadonlyHistogram};

use crate::percentiles::Percentiles;
use crate::Stats;

/// Compute mean, standard deviation, max and the requested percentiles of `histogram`.
///
/// Buckets whose key the domain marks as excluded (non-finite rates) are ignored.
/// Returns `None` when no countable samples remain.
pub fn compute_stats<H>(histogram: &H, percentiles: &[f64]) -> Option<Stats<H::Key>>
where
    H: ReadonlyHistogram + ?Sized,
{
    compute_stats_with(histogram, percentiles, <H::Key as HistogramKey>::is_excluded)
}

/// [`compute_stats`] with a caller-supplied exclusion predicate.
///
/// Mean and percentiles are weighted by bucket count. Percentile `p` resolves to the
/// smallest key whose cumulative weight reaches `floor(p * total + 0.5)`. Requests
/// outside `[0, 1]` (and NaN) are dropped; repeated requests resolve once.
///
/// The squared deviations are summed once per bucket, not once per sample, and then
/// divided by the weighted total. `max` never reports below zero.
pub fn compute_stats_with<H, F>(
    histogram: &H,
    percentiles: &[f64],
    exclude: F,
) -> Option<Stats<H::Key>>
where
    H: ReadonlyHistogram + ?Sized,
    F: Fn(H::Key) -> bool,
{
    let mut pairs: Vec<(H::Key, u64)> = Vec::new();
    let mut total: u128 = 0;
    let mut excluded: u64 = 0;
    let mut sum = CompensatedSum::default();

    histogram.visit_all(&mut |key, count| {
        if exclude(key) {
            excluded = excluded.saturating_add(count);
        } else if count > 0 {
            total += u128::from(count);
            sum.add(key.to_f64() * count as f64);
            pairs.push((key, count));
        }
        true
    });

    if excluded > 0 {
        debug!(excluded, "ignoring samples with excluded keys");
    }
    if total == 0 {
        debug!("histogram has no countable samples");
        return None;
    }

    pairs.sort_by(|a, b| a.0.key_cmp(&b.0));
    let (largest, _) = *pairs.last()?;
    let max = Some(largest.to_f64()).filter(|&m| m > 0.0).unwrap_or(0.0);

    let cumulative: Vec<u128> = pairs
        .iter()
        .scan(0u128, |running, &(_, count)| {
            *running += u128::from(count);
            Some(*running)
        })
        .collect();

    let count = total;
    let total = total as f64;
    let mut resolved = Percentiles::with_capacity(percentiles.len());
    for &p in percentiles {
        if resolved.contains(p) {
            continue;
        }
        if !(0.0..=1.0).contains(&p) {
            debug!(percentile = p, "dropping percentile outside [0, 1]");
            continue;
        }
        // the f64 product can round past `count` once totals exceed 2^53
        let rank = ((p * total + 0.5).floor() as u128).min(count);
        let at = cumulative.partition_point(|&running| running < rank);
        match pairs.get(at) {
            Some(&(key, _)) => resolved.insert(p, key),
            None => debug!(percentile = p, "rank past the last bucket, leaving unresolved"),
        }
    }

    let mean = sum.value() / total;
    let mut squares = CompensatedSum::default();
    for &(key, _) in &pairs {
        let deviation = key.to_f64() - mean;
        squares.add(deviation * deviation);
    }
    // fewer than three samples: report no spread
    let stddev = if total > 2.0 {
        (squares.value() / total).sqrt()
    } else {
        0.0
    };

    Some(Stats {
        mean,
        stddev,
        max,
        percentiles: resolved,
    })
}

/// Neumaier summation: keeps the low-order bits a plain running `f64` sum loses.
#[derive(Debug, Default, Clone, Copy)]
struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    fn add(&mut self, value: f64) {
        let next = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - next) + value;
        } else {
            self.compensation += (value - next) + self.sum;
        }
        self.sum = next;
    }

    fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}
