use rand::{rngs::StdRng, Rng, SeedableRng};
use volley_common::{FrequencyTable, HistogramKey, ReadonlyHistogram};
use volley_stats::{compute_stats, compute_stats_with};

fn latencies(pairs: &[(u64, u64)]) -> FrequencyTable<u64> {
    pairs.iter().copied().collect()
}

fn rates(pairs: &[(f64, u64)]) -> FrequencyTable<f64> {
    pairs.iter().copied().collect()
}

fn assert_close(actual: f64, expected: f64) {
    let tolerance = 1e-9 * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

/// Visits buckets from the largest key down; the engine must not depend on order.
struct Descending(FrequencyTable<u64>);

impl ReadonlyHistogram for Descending {
    type Key = u64;

    fn get(&self, key: u64) -> u64 {
        self.0.get(key)
    }

    fn count(&self) -> u64 {
        self.0.count()
    }

    fn visit_all(&self, visitor: &mut dyn FnMut(u64, u64) -> bool) {
        let mut pairs = Vec::new();
        self.0.visit_all(&mut |k, c| {
            pairs.push((k, c));
            true
        });
        pairs.sort_by(|a, b| b.0.cmp(&a.0));
        for (k, c) in pairs {
            if !visitor(k, c) {
                break;
            }
        }
    }
}

// --- Reference scenarios ---

#[test]
fn test_four_equal_buckets() {
    let h = latencies(&[(100, 1), (200, 1), (300, 1), (400, 1)]);
    let stats = compute_stats(&h, &[0.5, 0.9, 1.0]).unwrap();

    // rank(0.5) = floor(2.5) = 2, rank(0.9) = floor(4.1) = 4, rank(1.0) = floor(4.5) = 4
    assert_eq!(stats.percentiles.get(0.5), Some(200));
    assert_eq!(stats.percentiles.get(0.9), Some(400));
    assert_eq!(stats.percentiles.get(1.0), Some(400));
    assert_eq!(stats.percentiles.len(), 3);
    assert_close(stats.mean, 250.0);
    assert_eq!(stats.max, 400.0);
    // population deviation of {100, 200, 300, 400}
    assert_close(stats.stddev, 12_500f64.sqrt());
}

#[test]
fn test_empty_histogram_is_absent() {
    let h = latencies(&[]);
    assert!(compute_stats(&h, &[]).is_none());
    assert!(compute_stats(&h, &[0.5, 0.99]).is_none());
    assert!(compute_stats(&h, &[-1.0, 7.0]).is_none());
}

#[test]
fn test_zero_weight_buckets_are_ignored() {
    let h = latencies(&[(5, 0), (9, 0)]);
    assert!(compute_stats(&h, &[0.5]).is_none());

    let h = latencies(&[(1, 0), (50, 2), (900, 0)]);
    let stats = compute_stats(&h, &[0.0, 1.0]).unwrap();
    assert_eq!(stats.percentiles.get(0.0), Some(50));
    assert_eq!(stats.percentiles.get(1.0), Some(50));
    assert_eq!(stats.max, 50.0);
}

#[test]
fn test_throughput_non_finite_samples_are_excluded() {
    let h = rates(&[(10.0, 2), (f64::NAN, 5), (f64::INFINITY, 3), (20.0, 1)]);
    let stats = compute_stats(&h, &[0.5, 1.0]).unwrap();

    assert_close(stats.mean, 40.0 / 3.0);
    assert_eq!(stats.max, 20.0);
    // rank(0.5) = floor(1.5 + 0.5) = 2 -> still inside the 10.0 bucket
    assert_eq!(stats.percentiles.get(0.5), Some(10.0));
    assert_eq!(stats.percentiles.get(1.0), Some(20.0));

    let filtered = rates(&[(10.0, 2), (20.0, 1)]);
    assert_eq!(compute_stats(&filtered, &[0.5, 1.0]), Some(stats));
}

#[test]
fn test_only_non_finite_throughput_is_absent() {
    let h = rates(&[(f64::NAN, 4), (f64::NEG_INFINITY, 1)]);
    assert!(compute_stats(&h, &[0.5]).is_none());
}

#[test]
fn test_negative_rates_are_counted() {
    let h = rates(&[(-4.0, 1), (-2.0, 1)]);
    let stats = compute_stats(&h, &[1.0]).unwrap();
    assert_close(stats.mean, -3.0);
    assert_eq!(stats.percentiles.get(1.0), Some(-2.0));
    // max starts from zero
    assert_eq!(stats.max, 0.0);

    let mixed = compute_stats(&rates(&[(-4.0, 1), (3.5, 1)]), &[]).unwrap();
    assert_eq!(mixed.max, 3.5);
}

// --- Percentile requests ---

#[test]
fn test_out_of_range_percentiles_are_dropped() {
    let h = latencies(&[(1, 1), (2, 1)]);
    let stats = compute_stats(&h, &[-0.1, 1.5, f64::NAN, f64::INFINITY, 0.5]).unwrap();
    assert_eq!(stats.percentiles.len(), 1);
    assert!(stats.percentiles.contains(0.5));
    assert!(!stats.percentiles.contains(-0.1));
    assert!(!stats.percentiles.contains(1.5));
}

#[test]
fn test_duplicate_percentiles_resolve_once() {
    let h = latencies(&[(1, 1), (2, 1), (3, 1)]);
    let stats = compute_stats(&h, &[0.5, 0.9, 0.5, 0.9, 0.50]).unwrap();
    assert_eq!(stats.percentiles.len(), 2);

    let stats = compute_stats(&h, &[0.0, -0.0]).unwrap();
    assert_eq!(stats.percentiles.len(), 1);
    assert_eq!(stats.percentiles.get(-0.0), Some(1));
}

#[test]
fn test_no_percentiles_requested() {
    let h = latencies(&[(7, 3)]);
    let stats = compute_stats(&h, &[]).unwrap();
    assert!(stats.percentiles.is_empty());
    assert_close(stats.mean, 7.0);
}

#[test]
fn test_rank_rounds_half_up() {
    let h = latencies(&[(1, 1), (2, 1), (3, 1)]);
    let stats = compute_stats(&h, &[0.1, 0.5, 0.83, 0.84]).unwrap();
    // floor(0.3 + 0.5) = 0 -> first bucket
    assert_eq!(stats.percentiles.get(0.1), Some(1));
    // floor(1.5 + 0.5) = 2
    assert_eq!(stats.percentiles.get(0.5), Some(2));
    // floor(2.49 + 0.5) = 2
    assert_eq!(stats.percentiles.get(0.83), Some(2));
    // floor(2.52 + 0.5) = 3
    assert_eq!(stats.percentiles.get(0.84), Some(3));
}

#[test]
fn test_percentiles_respect_bucket_weights() {
    let h = latencies(&[(10, 90), (1_000, 10)]);
    let stats = compute_stats(&h, &[0.5, 0.9, 0.91, 0.99]).unwrap();
    assert_eq!(stats.percentiles.get(0.5), Some(10));
    assert_eq!(stats.percentiles.get(0.9), Some(10));
    assert_eq!(stats.percentiles.get(0.91), Some(1_000));
    assert_eq!(stats.percentiles.get(0.99), Some(1_000));
}

#[test]
fn test_percentiles_iterate_in_ascending_order() {
    let h = latencies(&[(1, 1), (2, 1), (3, 1), (4, 1)]);
    let stats = compute_stats(&h, &[0.99, 0.25, 0.5]).unwrap();
    let fractions: Vec<f64> = stats.percentiles.iter().map(|(p, _)| p).collect();
    assert_eq!(fractions, vec![0.25, 0.5, 0.99]);
}

// --- Mean and deviation ---

#[test]
fn test_stddev_is_zero_for_two_or_fewer_samples() {
    let one = compute_stats(&latencies(&[(10, 1)]), &[]).unwrap();
    assert_eq!(one.stddev, 0.0);

    let two_buckets = compute_stats(&latencies(&[(10, 1), (20, 1)]), &[]).unwrap();
    assert_eq!(two_buckets.stddev, 0.0);
    assert_close(two_buckets.mean, 15.0);

    let one_bucket_twice = compute_stats(&latencies(&[(10, 2)]), &[]).unwrap();
    assert_eq!(one_bucket_twice.stddev, 0.0);
}

#[test]
fn test_squared_deviations_are_summed_per_bucket() {
    // mean (300 + 200) / 4 = 125, squares 25^2 + 75^2 = 6250 over a weight of 4
    let stats = compute_stats(&latencies(&[(100, 3), (200, 1)]), &[]).unwrap();
    assert_close(stats.mean, 125.0);
    assert_close(stats.stddev, (6250.0f64 / 4.0).sqrt());

    // mean 17.5, squares 7.5^2 + 2.5^2 = 62.5 over a weight of 4
    let stats = compute_stats(&latencies(&[(10, 1), (20, 3)]), &[]).unwrap();
    assert_close(stats.mean, 17.5);
    assert_close(stats.stddev, 15.625f64.sqrt());
}

#[test]
fn test_bucket_weight_does_not_scale_the_deviation_sum() {
    let light = compute_stats(&latencies(&[(0, 1), (10, 1), (20, 1)]), &[]).unwrap();
    let heavy = compute_stats(&latencies(&[(0, 10), (10, 10), (20, 10)]), &[]).unwrap();
    assert_close(light.mean, heavy.mean);
    // same squares (200), ten times the weight
    assert_close(light.stddev, (200.0f64 / 3.0).sqrt());
    assert_close(heavy.stddev, (200.0f64 / 30.0).sqrt());
}

#[test]
fn test_large_counts_do_not_overflow() {
    let h = latencies(&[(1, u64::MAX / 2), (2, u64::MAX / 2)]);
    let stats = compute_stats(&h, &[0.25, 1.0]).unwrap();
    assert_close(stats.mean, 1.5);
    assert_close(stats.stddev, (0.5 / (u64::MAX - 1) as f64).sqrt());
    assert_eq!(stats.percentiles.get(0.25), Some(1));
    assert_eq!(stats.percentiles.get(1.0), Some(2));
}

#[test]
fn test_large_keys_keep_a_stable_mean() {
    let base = 1u64 << 40;
    let h = latencies(&[(base, 1_000_000), (base + 2, 1_000_000)]);
    let stats = compute_stats(&h, &[]).unwrap();
    assert_close(stats.mean, (base + 1) as f64);
    // two unit squares over a weight of 2_000_000
    assert_close(stats.stddev, 1e-3);
}

// --- Traversal and exclusion ---

#[test]
fn test_traversal_order_does_not_matter() {
    let pairs = [(300, 2), (100, 1), (400, 5), (200, 1)];
    let percentiles = [0.1, 0.5, 0.75, 1.0];
    let forward = compute_stats(&latencies(&pairs), &percentiles).unwrap();
    let backward = compute_stats(&Descending(latencies(&pairs)), &percentiles).unwrap();
    assert_eq!(forward.percentiles, backward.percentiles);
    assert_eq!(forward.max, backward.max);
    assert_close(forward.mean, backward.mean);
    assert_close(forward.stddev, backward.stddev);
}

#[test]
fn test_custom_exclusion_predicate() {
    // treat anything above one second as a timeout sentinel
    let h = latencies(&[(100, 3), (200, 1), (1_000_001, 4)]);
    let stats = compute_stats_with(&h, &[1.0], |us| us > 1_000_000).unwrap();
    assert_eq!(stats.max, 200.0);
    assert_eq!(stats.percentiles.get(1.0), Some(200));
    assert_close(stats.mean, 125.0);

    let everything = compute_stats_with(&h, &[1.0], |_| true);
    assert!(everything.is_none());
}

#[test]
fn test_repeated_calls_agree() {
    let h = rates(&[(1.5, 4), (2.5, 9), (f64::NAN, 2)]);
    let first = compute_stats(&h, &[0.5, 0.9]);
    for _ in 0..5 {
        assert_eq!(compute_stats(&h, &[0.5, 0.9]), first);
    }
}

// --- Randomized properties ---

/// Percentile over the expanded samples, using the same rank rule.
fn expanded_percentile(samples: &[u64], p: f64) -> u64 {
    let rank = (p * samples.len() as f64 + 0.5).floor() as usize;
    samples[rank.saturating_sub(1)]
}

#[test]
fn test_random_histograms_match_expanded_samples() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let buckets = rng.gen_range(1..20);
        let mut h = FrequencyTable::new();
        for _ in 0..buckets {
            h.add_n(rng.gen_range(0..5_000u64), rng.gen_range(0..25));
        }
        let percentiles: Vec<f64> = (0..rng.gen_range(0..8))
            .map(|_| rng.gen_range(-0.2..1.2))
            .collect();

        let mut samples = Vec::new();
        h.visit_all(&mut |k, c| {
            samples.extend(std::iter::repeat(k).take(c as usize));
            true
        });
        samples.sort_unstable();

        let Some(stats) = compute_stats(&h, &percentiles) else {
            assert!(samples.is_empty());
            continue;
        };

        let mut valid: Vec<f64> = percentiles
            .iter()
            .copied()
            .filter(|p| (0.0..=1.0).contains(p))
            .collect();
        valid.sort_by(|a, b| a.partial_cmp(b).unwrap());
        valid.dedup();
        assert_eq!(stats.percentiles.len(), valid.len());

        for &p in &valid {
            assert_eq!(stats.percentiles.get(p), Some(expanded_percentile(&samples, p)), "p={p}");
        }

        let resolved: Vec<u64> = stats.percentiles.iter().map(|(_, &v)| v).collect();
        assert!(resolved.windows(2).all(|w| w[0] <= w[1]), "not monotonic: {resolved:?}");

        let n = samples.len() as f64;
        let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n;
        assert_close(stats.mean, mean);
        assert_eq!(stats.max, *samples.last().unwrap() as f64);

        if samples.len() > 2 {
            let mut distinct = samples.clone();
            distinct.dedup();
            let squares = distinct.iter().map(|&s| (s as f64 - mean).powi(2)).sum::<f64>();
            assert!((stats.stddev - (squares / n).sqrt()).abs() < 1e-6);
        } else {
            assert_eq!(stats.stddev, 0.0);
        }

        let full = compute_stats(&h, &[1.0]).unwrap();
        assert_eq!(full.percentiles.get(1.0), samples.last().copied());
    }
}

#[test]
fn test_random_throughput_matches_finite_subset() {
    let mut rng = StdRng::seed_from_u64(11);
    let poison = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY];
    for _ in 0..100 {
        let mut mixed = FrequencyTable::new();
        let mut finite = FrequencyTable::new();
        for _ in 0..rng.gen_range(1..15) {
            let key = (rng.gen_range(0.0..10_000.0f64) * 10.0).round() / 10.0;
            let count = rng.gen_range(1..10);
            mixed.add_n(key, count);
            finite.add_n(key, count);
            if rng.gen_bool(0.3) {
                let bad = poison[rng.gen_range(0..poison.len())];
                assert!(bad.is_excluded());
                mixed.add_n(bad, rng.gen_range(1..10));
            }
        }
        let percentiles = [0.0, 0.5, 0.9, 0.99, 1.0];
        assert_eq!(compute_stats(&mixed, &percentiles), compute_stats(&finite, &percentiles));
    }
}
