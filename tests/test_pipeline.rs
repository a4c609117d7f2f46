//! Integration test: MUSE fit/predict end-to-end

use kolosal_muse::classification::MuseClassifier;
use kolosal_muse::config::{MuseConfig, WordSpace};
use kolosal_muse::dictionary::{RawBag, WordConfig, WordSource, WordTransform};
use kolosal_muse::error::{KolosalError, Result};
use kolosal_muse::timeseries::Panel;
use kolosal_muse::training::{LogisticConfig, LogisticRegression};
use ndarray::{array, Array1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

fn quick_config(seed: u64) -> MuseConfig {
    MuseConfig::default()
        .with_random_state(seed)
        .with_classifier(LogisticConfig::default().with_max_iter(500))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("kolosal_muse=debug")
        .with_test_writer()
        .try_init();
}

/// Words are the rounded mean of each series, so separable means give separable bags
#[derive(Debug, Clone, Copy, Default)]
struct MeanWordSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MeanWordTransform;

impl WordTransform for MeanWordTransform {
    fn transform(&self, series: &[Array1<f64>]) -> Result<Vec<RawBag>> {
        Ok(series
            .iter()
            .map(|s| {
                let word = s.mean().unwrap_or(0.0).round().max(0.0) as u64;
                [(word, 1)].into_iter().collect()
            })
            .collect())
    }

    fn raw_word_bits(&self) -> u32 {
        8
    }
}

impl WordSource for MeanWordSource {
    type Transform = MeanWordTransform;

    fn fit_transform(
        &self,
        series: &[Array1<f64>],
        _labels: &[usize],
        _window_length: usize,
        _config: &WordConfig,
    ) -> Result<(MeanWordTransform, Vec<RawBag>)> {
        let bags = MeanWordTransform.transform(series)?;
        Ok((MeanWordTransform, bags))
    }
}

/// 3 instances, 2 classes, 2 dimensions
fn toy_panel() -> Panel {
    let level = |v: f64| Array1::from_elem(40, v);
    Panel::from_instances(
        vec!["pressure".to_string(), "temperature".to_string()],
        vec![
            vec![level(1.0), level(10.0)],
            vec![level(1.0), level(10.0)],
            vec![level(7.0), level(3.0)],
        ],
    )
    .unwrap()
}

/// Low- versus high-frequency sines with noise, two dimensions each
fn sine_panel(n_per_class: usize, length: usize, seed: u64) -> (Panel, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut instances = Vec::new();
    let mut labels = Vec::new();
    for class in 0..2 {
        let freq = if class == 0 { 1.0 } else { 5.0 };
        for _ in 0..n_per_class {
            let phase = rng.gen_range(0.0..0.5);
            let x = Array1::from_iter((0..length).map(|t| {
                (2.0 * PI * freq * t as f64 / length as f64 + phase).sin() + rng.gen_range(-0.1..0.1)
            }));
            let y = Array1::from_iter((0..length).map(|t| {
                (2.0 * PI * freq * t as f64 / length as f64 + phase).cos() + rng.gen_range(-0.1..0.1)
            }));
            instances.push(vec![x, y]);
            labels.push(class as f64);
        }
    }
    let panel = Panel::from_instances(vec!["x".to_string(), "y".to_string()], instances).unwrap();
    (panel, Array1::from_vec(labels))
}

#[test]
fn test_toy_scenario_is_separable() {
    init_tracing();
    let config = MuseConfig::default()
        .with_first_order_differences(false)
        .with_p_threshold(1.0)
        .with_window_bounds(6, 20)
        .with_random_state(1);
    let mut muse =
        MuseClassifier::with_components(config, MeanWordSource, LogisticRegression::default());

    let panel = toy_panel();
    let y = array![0.0, 0.0, 1.0];
    muse.fit(&panel, &y).unwrap();

    assert_eq!(muse.predict(&panel).unwrap(), y);
    assert_eq!(muse.score(&panel, &y).unwrap(), 1.0);

    let proba = muse.predict_proba(&panel).unwrap();
    assert_eq!(proba.dim(), (3, 2));
    for row in proba.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-9);
    }
    assert_eq!(muse.dimension_names().unwrap(), &["pressure", "temperature"]);
}

#[test]
fn test_unseen_words_are_ignored_at_predict() {
    let config = MuseConfig::default()
        .with_first_order_differences(false)
        .with_p_threshold(1.0)
        .with_window_bounds(6, 20);
    let mut muse =
        MuseClassifier::with_components(config, MeanWordSource, LogisticRegression::default());
    muse.fit(&toy_panel(), &array![0.0, 0.0, 1.0]).unwrap();

    // level 50 never occurred at fit time
    let unseen = Panel::from_instances(
        vec!["pressure".to_string(), "temperature".to_string()],
        vec![vec![Array1::from_elem(40, 50.0), Array1::from_elem(40, 50.0)]],
    )
    .unwrap();
    let proba = muse.predict_proba(&unseen).unwrap();
    assert!((proba.row(0).sum() - 1.0).abs() < 1e-9);
}

#[test]
fn test_sfa_pipeline_end_to_end() {
    init_tracing();
    let (panel, y) = sine_panel(10, 64, 21);
    let config = MuseConfig::default()
        .with_window_bounds(6, 32)
        .with_random_state(42);
    let mut muse = MuseClassifier::new(config);
    muse.fit(&panel, &y).unwrap();

    assert_eq!(muse.n_classes(), Some(2));
    assert_eq!(muse.dimension_names().unwrap(), &["x", "y", "x_diff", "y_diff"]);
    assert!(muse.vocabulary_size().unwrap() > 0);

    let predictions = muse.predict(&panel).unwrap();
    assert!(predictions.iter().all(|&p| p == 0.0 || p == 1.0));
    assert!(muse.score(&panel, &y).unwrap() >= 0.9);

    let (test_panel, _) = sine_panel(3, 64, 99);
    let proba = muse.predict_proba(&test_panel).unwrap();
    assert_eq!(proba.nrows(), 6);
    for row in proba.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_same_seed_gives_same_model() {
    let (panel, y) = sine_panel(6, 48, 5);
    let config = quick_config(9).with_window_bounds(6, 24);

    let mut sequential = MuseClassifier::new(config.clone().with_n_jobs(1));
    sequential.fit(&panel, &y).unwrap();
    let mut parallel = MuseClassifier::new(config.with_n_jobs(4));
    parallel.fit(&panel, &y).unwrap();

    assert_eq!(sequential.word_configs(), parallel.word_configs());
    assert_eq!(sequential.window_schedules(), parallel.window_schedules());
    assert_eq!(sequential.vocabulary_size(), parallel.vocabulary_size());

    let a = sequential.predict_proba(&panel).unwrap();
    let b = parallel.predict_proba(&panel).unwrap();
    for (pa, pb) in a.iter().zip(b.iter()) {
        assert!((pa - pb).abs() < 1e-12);
    }
}

#[test]
fn test_predict_schedule_ignores_series_length() {
    let (panel, y) = sine_panel(5, 60, 13);
    let mut muse = MuseClassifier::new(quick_config(3));
    muse.fit(&panel, &y).unwrap();
    let fitted = muse.window_schedules().unwrap().to_vec();

    let (longer, _) = sine_panel(2, 200, 14);
    muse.predict(&longer).unwrap();
    assert_eq!(muse.window_schedules().unwrap(), fitted.as_slice());
}

#[test]
fn test_every_entry_point_requires_fit() {
    let muse: MuseClassifier = MuseClassifier::default();
    let panel = toy_panel();
    let y = array![0.0, 0.0, 1.0];

    assert!(matches!(muse.predict(&panel), Err(KolosalError::ModelNotFitted)));
    assert!(matches!(muse.predict_proba(&panel), Err(KolosalError::ModelNotFitted)));
    assert!(matches!(muse.transform(&panel), Err(KolosalError::ModelNotFitted)));
    assert!(matches!(muse.score(&panel, &y), Err(KolosalError::ModelNotFitted)));
    assert!(matches!(muse.to_json(), Err(KolosalError::ModelNotFitted)));
    assert!(!muse.is_fitted());
}

#[test]
fn test_config_errors_surface_at_fit() {
    let panel = toy_panel();
    let y = array![0.0, 0.0, 1.0];

    let mut too_wide = MuseClassifier::new(MuseConfig::default().with_window_bounds(50, 100));
    assert!(too_wide.fit(&panel, &y).unwrap_err().is_config());

    let mut bad_threshold = MuseClassifier::new(MuseConfig::default().with_p_threshold(0.0));
    assert!(bad_threshold.fit(&panel, &y).unwrap_err().is_config());

    let empty = Panel::new(Vec::new(), Vec::new()).unwrap();
    let mut muse: MuseClassifier = MuseClassifier::default();
    assert!(muse.fit(&empty, &Array1::zeros(0)).is_err());
}

#[test]
fn test_oversized_words_surface_at_fit() {
    let (panel, y) = sine_panel(3, 80, 8);
    let fit_with = |word_space: WordSpace| {
        let config = MuseConfig::default()
            .with_window_bounds(40, 60)
            .with_random_state(1)
            .with_word_space(word_space);
        let mut muse = MuseClassifier::new(config);
        let result = muse.fit(&panel, &y).map(|_| ());
        (result, muse.is_fitted())
    };

    // bigrams of 16 symbols x 2 bits need 65 bits
    let (result, fitted) = fit_with(WordSpace {
        word_lengths: vec![16],
        ..WordSpace::default()
    });
    assert!(result.unwrap_err().is_config());
    assert!(!fitted);

    // unigrams of 20 symbols x 4 bits need 80 bits
    let (result, fitted) = fit_with(WordSpace {
        word_lengths: vec![20],
        alphabet_size: 16,
        bigrams: false,
        ..WordSpace::default()
    });
    assert!(result.unwrap_err().is_config());
    assert!(!fitted);

    // 61-bit bigrams fit a raw word but not next to 7 window and 3 dimension bits
    let (result, fitted) = fit_with(WordSpace {
        word_lengths: vec![15],
        ..WordSpace::default()
    });
    assert!(matches!(result, Err(KolosalError::ConfigError(_))));
    assert!(!fitted);
}

#[test]
fn test_save_and_load() {
    let (panel, y) = sine_panel(5, 48, 77);
    let mut muse = MuseClassifier::new(quick_config(17));
    muse.fit(&panel, &y).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("muse.json");
    muse.save(&path).unwrap();
    let loaded: MuseClassifier = MuseClassifier::load(&path).unwrap();

    assert!(loaded.is_fitted());
    assert_eq!(loaded.classes(), muse.classes());
    assert_eq!(loaded.predict(&panel).unwrap(), muse.predict(&panel).unwrap());
}
