//! Equity histograms and histogram-based hand clustering.
//!
//! A hand's equity samples are binned into a fixed-width probability
//! histogram over [0, 1]. Histograms are compared with the 1-D earth mover's
//! distance, so moving mass by one bin costs little and moving it across the
//! whole range costs the most. Hands are grouped into strength-ordered
//! buckets by deterministic k-means under that distance.
//!
//! # Clustering
//!
//! 1. **Farthest-point initialisation**: the weakest hand (by mean equity)
//!    seeds the first centroid; each further centroid is the hand farthest
//!    from every centroid chosen so far
//! 2. **Lloyd's algorithm**: assign every hand to its nearest centroid, then
//!    move each centroid to the mean histogram of its members
//! 3. **Relabelling**: buckets are renumbered by centroid mean equity, so
//!    bucket 0 holds the weakest hands

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::abstraction::config::AbstractionConfig;
use crate::error::{AbstractionError, AbstractionResult};

/// A normalised equity distribution over equal-width bins spanning [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    bins: Vec<f64>,
    sample_count: usize,
}

impl Histogram {
    /// Probability mass per bin, lowest equity first.
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Number of bins.
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Number of samples the histogram was built from.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Expected equity, taking every sample at its bin's midpoint.
    pub fn mean_equity(&self) -> f64 {
        let width = 1.0 / self.bins.len() as f64;
        self.bins
            .iter()
            .enumerate()
            .map(|(i, &p)| p * (i as f64 + 0.5) * width)
            .sum()
    }

    /// Earth mover's distance to another histogram, in equity units.
    ///
    /// Sum of absolute CDF differences, divided by `bins - 1` so that moving
    /// all mass from the first bin to the last costs exactly 1.
    pub fn emd(&self, other: &Histogram) -> AbstractionResult<f64> {
        if self.bins.len() != other.bins.len() {
            return Err(AbstractionError::BinCountMismatch(
                self.bins.len(),
                other.bins.len(),
            ));
        }
        Ok(self.emd_unchecked(other))
    }

    fn emd_unchecked(&self, other: &Histogram) -> f64 {
        if self.bins.len() < 2 {
            return 0.0;
        }

        let mut cum1 = 0.0;
        let mut cum2 = 0.0;
        let mut distance = 0.0;
        for (&a, &b) in self.bins.iter().zip(&other.bins) {
            cum1 += a;
            cum2 += b;
            distance += f64::abs(cum1 - cum2);
        }

        distance / (self.bins.len() - 1) as f64
    }

    /// Mean of several histograms of equal length.
    fn centroid(members: &[&Histogram]) -> Histogram {
        let mut bins = vec![0.0; members[0].bins.len()];
        let mut sample_count = 0;
        for member in members {
            for (c, &p) in bins.iter_mut().zip(&member.bins) {
                *c += p;
            }
            sample_count += member.sample_count;
        }
        for c in bins.iter_mut() {
            *c /= members.len() as f64;
        }
        Histogram { bins, sample_count }
    }
}

/// Builds, stores and clusters per-hand equity histograms.
///
/// # Example
/// ```
/// use equilibrium_solver::abstraction::HistogramAbstractor;
///
/// let mut abstractor = HistogramAbstractor::new(2, 10).unwrap();
/// abstractor.create_histogram("AA", &[0.85, 0.80, 0.90]).unwrap();
/// abstractor.create_histogram("72o", &[0.20, 0.10, 0.30]).unwrap();
///
/// let buckets = abstractor.cluster_hands(&["AA", "72o"]).unwrap();
/// assert_eq!(buckets["72o"], 0);
/// assert_eq!(buckets["AA"], 1);
/// ```
#[derive(Debug, Clone)]
pub struct HistogramAbstractor {
    config: AbstractionConfig,
    histograms: FxHashMap<String, Histogram>,
}

impl HistogramAbstractor {
    /// Create an abstractor clustering into `num_buckets` buckets over
    /// histograms of `num_histogram_bins` bins.
    ///
    /// # Errors
    /// `InvalidBucketCount` / `InvalidBinCount` for a zero count.
    pub fn new(num_buckets: usize, num_histogram_bins: usize) -> AbstractionResult<Self> {
        if num_buckets == 0 {
            return Err(AbstractionError::InvalidBucketCount);
        }
        if num_histogram_bins == 0 {
            return Err(AbstractionError::InvalidBinCount);
        }
        Self::with_config(AbstractionConfig::new(num_buckets).with_histogram_bins(num_histogram_bins))
    }

    /// Create an abstractor from a full configuration.
    pub fn with_config(config: AbstractionConfig) -> AbstractionResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            histograms: FxHashMap::default(),
        })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &AbstractionConfig {
        &self.config
    }

    /// Bin a hand's equity samples and store the histogram under `hand_id`.
    ///
    /// Samples outside [0, 1] are clamped; a sample of exactly 1.0 falls in
    /// the last bin. A histogram already stored for the hand is replaced.
    ///
    /// # Errors
    /// `EmptySamples` for an empty slice, `InvalidSample` for a NaN sample.
    pub fn create_histogram(
        &mut self,
        hand_id: impl Into<String>,
        equity_samples: &[f64],
    ) -> AbstractionResult<&Histogram> {
        let hand_id = hand_id.into();
        if equity_samples.is_empty() {
            return Err(AbstractionError::EmptySamples(hand_id));
        }

        let num_bins = self.config.num_histogram_bins;
        let mut counts = vec![0usize; num_bins];
        for (index, &sample) in equity_samples.iter().enumerate() {
            if sample.is_nan() {
                return Err(AbstractionError::InvalidSample {
                    hand: hand_id,
                    index,
                });
            }
            let bin = (sample.clamp(0.0, 1.0) * num_bins as f64) as usize;
            counts[bin.min(num_bins - 1)] += 1;
        }

        let total = equity_samples.len() as f64;
        let histogram = Histogram {
            bins: counts.iter().map(|&c| c as f64 / total).collect(),
            sample_count: equity_samples.len(),
        };

        if self.histograms.contains_key(&hand_id) {
            log::warn!("replacing existing histogram for hand {}", hand_id);
        }
        self.histograms.insert(hand_id.clone(), histogram);
        Ok(&self.histograms[&hand_id])
    }

    /// Earth mover's distance between two histograms; see [`Histogram::emd`].
    ///
    /// # Errors
    /// `BinCountMismatch` if the histograms differ in length.
    pub fn compute_histogram_distance(&self, h1: &Histogram, h2: &Histogram) -> AbstractionResult<f64> {
        h1.emd(h2)
    }

    /// Distance between the stored histograms of two hands.
    pub fn distance_between(&self, hand_a: &str, hand_b: &str) -> AbstractionResult<f64> {
        self.lookup(hand_a)?.emd(self.lookup(hand_b)?)
    }

    /// Stored histogram of a hand.
    pub fn histogram(&self, hand_id: &str) -> Option<&Histogram> {
        self.histograms.get(hand_id)
    }

    /// Number of stored histograms.
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    /// Whether no histogram has been stored.
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Group hands into strength-ordered buckets.
    ///
    /// Duplicate ids are ignored. Uses at most `min(num_buckets, hands)`
    /// buckets; bucket 0 holds the weakest hands. The result depends only on
    /// the set of ids and their histograms.
    ///
    /// # Errors
    /// `UnknownHand` if an id has no stored histogram.
    pub fn cluster_hands<S: AsRef<str>>(&self, hand_ids: &[S]) -> AbstractionResult<BTreeMap<String, usize>> {
        let ids: BTreeSet<&str> = hand_ids.iter().map(|id| id.as_ref()).collect();
        let hands: Vec<(&str, &Histogram)> = ids
            .into_iter()
            .map(|id| Ok((id, self.lookup(id)?)))
            .collect::<AbstractionResult<_>>()?;
        if hands.is_empty() {
            return Ok(BTreeMap::new());
        }

        let histograms: Vec<&Histogram> = hands.iter().map(|(_, h)| *h).collect();
        let k = self.config.num_buckets.min(histograms.len());

        let mut centroids = farthest_point_init(&histograms, k);
        let mut assignments = nearest_centroids(&histograms, &centroids);

        for iteration in 0..self.config.max_cluster_iterations {
            centroids = update_centroids(&histograms, &assignments, centroids);
            let next = nearest_centroids(&histograms, &centroids);
            let moved = next.iter().zip(&assignments).filter(|(a, b)| a != b).count();
            log::debug!(
                "cluster iteration {}: {} of {} hands moved",
                iteration + 1,
                moved,
                histograms.len()
            );
            assignments = next;
            if moved == 0 {
                break;
            }
        }

        // Relabel occupied clusters so that bucket ids are dense and follow
        // centroid strength.
        let mut order: Vec<usize> = (0..k).filter(|c| assignments.contains(c)).collect();
        order.sort_by(|&a, &b| {
            centroids[a]
                .mean_equity()
                .total_cmp(&centroids[b].mean_equity())
                .then(a.cmp(&b))
        });
        let mut label = vec![0; k];
        for (rank, &cluster) in order.iter().enumerate() {
            label[cluster] = rank;
        }

        Ok(hands
            .iter()
            .zip(&assignments)
            .map(|((id, _), &cluster)| (id.to_string(), label[cluster]))
            .collect())
    }

    fn lookup(&self, hand_id: &str) -> AbstractionResult<&Histogram> {
        self.histograms
            .get(hand_id)
            .ok_or_else(|| AbstractionError::UnknownHand(hand_id.to_string()))
    }
}

/// Pick `k` starting centroids: the weakest hand, then repeatedly the hand
/// farthest from all centroids so far. Ties go to the earlier hand.
fn farthest_point_init(histograms: &[&Histogram], k: usize) -> Vec<Histogram> {
    let weakest = (0..histograms.len())
        .min_by(|&a, &b| {
            histograms[a]
                .mean_equity()
                .total_cmp(&histograms[b].mean_equity())
                .then(a.cmp(&b))
        })
        .unwrap_or(0);

    let mut centroids = vec![histograms[weakest].clone()];
    let mut min_distances: Vec<f64> = histograms
        .iter()
        .map(|h| h.emd_unchecked(&centroids[0]))
        .collect();

    while centroids.len() < k {
        let mut next = 0;
        for (i, &d) in min_distances.iter().enumerate() {
            if d > min_distances[next] {
                next = i;
            }
        }
        let centroid = histograms[next].clone();
        for (d, h) in min_distances.iter_mut().zip(histograms) {
            *d = d.min(h.emd_unchecked(&centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

/// Index of the nearest centroid for every hand; ties go to the lowest index.
fn nearest_centroids(histograms: &[&Histogram], centroids: &[Histogram]) -> Vec<usize> {
    histograms
        .iter()
        .map(|h| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (c, centroid) in centroids.iter().enumerate() {
                let dist = h.emd_unchecked(centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            best
        })
        .collect()
}

/// Move every centroid to the mean of its members. Empty clusters keep their
/// previous centroid.
fn update_centroids(
    histograms: &[&Histogram],
    assignments: &[usize],
    previous: Vec<Histogram>,
) -> Vec<Histogram> {
    previous
        .into_iter()
        .enumerate()
        .map(|(c, old)| {
            let members: Vec<&Histogram> = histograms
                .iter()
                .zip(assignments)
                .filter(|(_, a)| **a == c)
                .map(|(h, _)| *h)
                .collect();
            if members.is_empty() {
                old
            } else {
                Histogram::centroid(&members)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn abstractor() -> HistogramAbstractor {
        HistogramAbstractor::new(3, 10).unwrap()
    }

    #[test]
    fn test_zero_counts_rejected() {
        assert_eq!(
            HistogramAbstractor::new(0, 10).unwrap_err(),
            AbstractionError::InvalidBucketCount
        );
        assert_eq!(
            HistogramAbstractor::new(3, 0).unwrap_err(),
            AbstractionError::InvalidBinCount
        );
    }

    #[test]
    fn test_histogram_sums_to_one() {
        let mut abs = abstractor();
        let samples = [0.05, 0.15, 0.15, 0.5, 0.72, 0.99, 1.0, 0.33];
        let h = abs.create_histogram("h", &samples).unwrap();
        assert_eq!(h.num_bins(), 10);
        assert_eq!(h.sample_count(), 8);
        assert_abs_diff_eq!(h.bins().iter().sum::<f64>(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(h.bins()[1], 0.25, epsilon = 1e-12);
        // 0.99 and 1.0 share the last bin.
        assert_abs_diff_eq!(h.bins()[9], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_samples_are_clamped() {
        let mut abs = abstractor();
        let h = abs.create_histogram("h", &[-3.0, 7.0]).unwrap();
        assert_eq!(h.bins()[0], 0.5);
        assert_eq!(h.bins()[9], 0.5);
    }

    #[test]
    fn test_bad_samples_rejected() {
        let mut abs = abstractor();
        assert_eq!(
            abs.create_histogram("h", &[]).unwrap_err(),
            AbstractionError::EmptySamples("h".to_string())
        );
        assert_eq!(
            abs.create_histogram("h", &[0.2, f64::NAN]).unwrap_err(),
            AbstractionError::InvalidSample {
                hand: "h".to_string(),
                index: 1
            }
        );
        assert!(abs.is_empty());
    }

    #[test]
    fn test_create_histogram_replaces() {
        let mut abs = abstractor();
        abs.create_histogram("h", &[0.1]).unwrap();
        abs.create_histogram("h", &[0.9]).unwrap();
        assert_eq!(abs.len(), 1);
        assert_eq!(abs.histogram("h").unwrap().bins()[9], 1.0);
    }

    #[test]
    fn test_distance_properties() {
        let mut abs = abstractor();
        let a = abs.create_histogram("a", &[0.48, 0.5, 0.52, 0.55]).unwrap().clone();
        let b = abs.create_histogram("b", &[0.45, 0.5, 0.51, 0.53]).unwrap().clone();
        let low = abs.create_histogram("low", &[0.01, 0.02, 0.05]).unwrap().clone();
        let high = abs.create_histogram("high", &[0.95, 0.97, 0.99]).unwrap().clone();

        assert_eq!(abs.compute_histogram_distance(&a, &a).unwrap(), 0.0);
        assert!(abs.compute_histogram_distance(&a, &b).unwrap() < 0.5);
        assert!(abs.compute_histogram_distance(&low, &high).unwrap() > 0.5);
        assert_abs_diff_eq!(abs.compute_histogram_distance(&low, &high).unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(
            abs.distance_between("a", "low").unwrap(),
            abs.distance_between("low", "a").unwrap()
        );
    }

    #[test]
    fn test_distance_grows_with_shift() {
        let mut abs = abstractor();
        abs.create_histogram("base", &[0.05]).unwrap();
        let mut previous = 0.0;
        for bin in 1..10 {
            let id = format!("shift{}", bin);
            abs.create_histogram(id.as_str(), &[bin as f64 / 10.0 + 0.05]).unwrap();
            let d = abs.distance_between("base", &id).unwrap();
            assert!(d > previous, "distance should grow at bin {}", bin);
            previous = d;
        }
    }

    #[test]
    fn test_distance_rejects_bin_mismatch() {
        let mut coarse = HistogramAbstractor::new(2, 4).unwrap();
        let mut fine = HistogramAbstractor::new(2, 8).unwrap();
        let a = coarse.create_histogram("a", &[0.5]).unwrap().clone();
        let b = fine.create_histogram("b", &[0.5]).unwrap().clone();
        assert_eq!(
            coarse.compute_histogram_distance(&a, &b).unwrap_err(),
            AbstractionError::BinCountMismatch(4, 8)
        );
    }

    fn curated() -> HistogramAbstractor {
        let mut abs = abstractor();
        abs.create_histogram("AA", &[0.85, 0.82, 0.88, 0.80, 0.86]).unwrap();
        abs.create_histogram("KK", &[0.81, 0.83, 0.84, 0.79, 0.87]).unwrap();
        abs.create_histogram("76s", &[0.45, 0.48, 0.52, 0.47, 0.44]).unwrap();
        abs.create_histogram("JTs", &[0.50, 0.46, 0.49, 0.53, 0.47]).unwrap();
        abs.create_histogram("72o", &[0.22, 0.25, 0.18, 0.28, 0.21]).unwrap();
        abs.create_histogram("83o", &[0.26, 0.29, 0.24, 0.21, 0.27]).unwrap();
        abs
    }

    #[test]
    fn test_cluster_curated_hands() {
        let abs = curated();
        let buckets = abs
            .cluster_hands(&["AA", "KK", "76s", "JTs", "72o", "83o"])
            .unwrap();

        assert_eq!(buckets.len(), 6);
        assert_eq!(buckets["AA"], buckets["KK"]);
        assert_eq!(buckets["76s"], buckets["JTs"]);
        assert_eq!(buckets["72o"], buckets["83o"]);
        assert_eq!(buckets["72o"], 0);
        assert_eq!(buckets["76s"], 1);
        assert_eq!(buckets["AA"], 2);
    }

    #[test]
    fn test_cluster_is_deterministic() {
        let abs = curated();
        let forward = abs.cluster_hands(&["AA", "KK", "76s", "JTs", "72o", "83o"]).unwrap();
        let shuffled = abs
            .cluster_hands(&["83o", "JTs", "AA", "72o", "KK", "76s", "AA"])
            .unwrap();
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn test_cluster_with_more_buckets_than_hands() {
        let mut abs = HistogramAbstractor::new(10, 10).unwrap();
        abs.create_histogram("a", &[0.9]).unwrap();
        abs.create_histogram("b", &[0.1]).unwrap();
        let buckets = abs.cluster_hands(&["a", "b"]).unwrap();
        assert_eq!(buckets["b"], 0);
        assert_eq!(buckets["a"], 1);
    }

    #[test]
    fn test_cluster_ids_stay_dense_with_duplicates() {
        let mut abs = abstractor();
        abs.create_histogram("weak_a", &[0.1, 0.15]).unwrap();
        abs.create_histogram("weak_b", &[0.1, 0.15]).unwrap();
        abs.create_histogram("strong", &[0.9, 0.95]).unwrap();

        let buckets = abs.cluster_hands(&["weak_a", "weak_b", "strong"]).unwrap();
        assert_eq!(buckets["weak_a"], 0);
        assert_eq!(buckets["weak_b"], 0);
        assert_eq!(buckets["strong"], 1);
    }

    #[test]
    fn test_cluster_edge_cases() {
        let abs = curated();
        assert!(abs.cluster_hands::<&str>(&[]).unwrap().is_empty());
        assert_eq!(
            abs.cluster_hands(&["AA", "QQ"]).unwrap_err(),
            AbstractionError::UnknownHand("QQ".to_string())
        );
    }

    #[test]
    fn test_mean_equity_uses_bin_midpoints() {
        let mut abs = abstractor();
        let h = abs.create_histogram("h", &[0.01, 0.91]).unwrap();
        assert_abs_diff_eq!(h.mean_equity(), 0.5, epsilon = 1e-12);
    }
}
