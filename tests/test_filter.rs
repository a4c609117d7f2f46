//! Integration test: relevance filtering

use kolosal_muse::dictionary::RawBag;
use kolosal_muse::error::Result;
use kolosal_muse::preprocessing::{Chi2Test, RelevanceFilter, RelevanceTest, RetainedWords};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn random_bags(rng: &mut ChaCha8Rng, n: usize) -> Vec<RawBag> {
    (0..n)
        .map(|_| {
            (0..rng.gen_range(0..12))
                .map(|_| (rng.gen_range(0..40u64), rng.gen_range(1..5u32)))
                .collect()
        })
        .collect()
}

/// Counts how often it is asked for p-values
#[derive(Default)]
struct CountingTest {
    calls: AtomicUsize,
}

impl RelevanceTest for CountingTest {
    fn p_values(&self, bags: &[RawBag], labels: &[usize], n_classes: usize) -> Result<HashMap<u64, f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Chi2Test.p_values(bags, labels, n_classes)
    }
}

#[test]
fn test_threshold_one_keeps_every_word() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let counting = Arc::new(CountingTest::default());
    let filter = RelevanceFilter::with_test(1.0, counting.clone());

    for _ in 0..20 {
        let bags = random_bags(&mut rng, 15);
        let labels: Vec<usize> = (0..15).map(|_| rng.gen_range(0..3)).collect();
        let retained = filter.fit(&bags, &labels, 3).unwrap();
        assert_eq!(retained, RetainedWords::All);

        for bag in &bags {
            let kept: RawBag = retained.filter(bag).collect();
            assert_eq!(&kept, bag);
        }
    }
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_filter_does_not_modify_bags() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let bags = random_bags(&mut rng, 10);
    let labels: Vec<usize> = (0..10).map(|i| i % 2).collect();
    let before = bags.clone();
    RelevanceFilter::new(0.5).fit(&bags, &labels, 2).unwrap();
    assert_eq!(bags, before);
}

#[test]
fn test_class_specific_words_survive() {
    let mut bags: Vec<RawBag> = Vec::new();
    let mut labels = Vec::new();
    for i in 0..20 {
        let class = i % 2;
        let mut bag: RawBag = [(100, 1)].into_iter().collect();
        bag.insert(if class == 0 { 1 } else { 2 }, 5);
        bags.push(bag);
        labels.push(class);
    }

    let retained = RelevanceFilter::new(0.05).fit(&bags, &labels, 2).unwrap();
    assert!(retained.contains(1));
    assert!(retained.contains(2));
    assert!(!retained.contains(100));

    let kept: HashSet<u64> = bags.iter().flat_map(|b| retained.filter(b).map(|(w, _)| w)).collect();
    assert_eq!(kept, [1, 2].into_iter().collect());
}
