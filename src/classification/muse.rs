//! MUSE: multivariate bag-of-words classification
//!
//! Every dimension of a panel (plus its first-order differences, if enabled)
//! is scanned at several window lengths. Each (dimension, window) slot gets
//! its own fitted word transform; the words of all slots are encoded into
//! one key space, merged into a single bag per instance and handed to one
//! classifier.

use crate::config::MuseConfig;
use crate::dictionary::{
    decode_dimension, dimension_bit_width, Bag, BagMerger, EncodedWord, RawBag, RawWord,
    SfaWordSource, SlotWords, WordConfig, WordConfigSampler, WordEncoder, WordSource,
    WordTransform,
};
use crate::error::{KolosalError, Result};
use crate::preprocessing::{Chi2Test, RelevanceFilter, RelevanceTest, RetainedWords};
use crate::timeseries::{Differencer, Panel, WindowSchedule, WindowScheduler};
use crate::training::{BagClassifier, LogisticRegression};
use crate::utils::{try_parallel_map, ParallelConfig};
use ndarray::{Array1, Array2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One (dimension, window) slot of the fit iteration space
#[derive(Debug, Clone, Copy)]
struct Slot {
    dimension: usize,
    window: usize,
    config: WordConfig,
}

/// Result of fitting one slot, returned by a worker
struct SlotFit<T> {
    slot: Slot,
    transform: T,
    words: SlotWords,
}

/// State produced by `fit`, immutable afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedMuse<T, C> {
    /// Dimension names of the panel passed to fit
    input_dimensions: Vec<String>,
    /// Dimension names after augmentation
    dimension_names: Vec<String>,
    dimension_bits: u32,
    schedules: Vec<WindowSchedule>,
    encoders: Vec<WordEncoder>,
    /// Fitted transforms indexed by [dimension][window position]
    transforms: Vec<Vec<T>>,
    word_configs: Vec<Vec<WordConfig>>,
    classes: Vec<i64>,
    classifier: C,
}

#[derive(Serialize)]
struct SnapshotRef<'a, T, C> {
    config: &'a MuseConfig,
    model: &'a FittedMuse<T, C>,
}

#[derive(Deserialize)]
struct Snapshot<T, C> {
    config: MuseConfig,
    model: FittedMuse<T, C>,
}

/// Multivariate symbolic bag-of-words classifier
pub struct MuseClassifier<S = SfaWordSource, C = LogisticRegression>
where
    S: WordSource,
    C: BagClassifier,
{
    config: MuseConfig,
    source: S,
    classifier: C,
    relevance_test: Arc<dyn RelevanceTest>,
    model: Option<FittedMuse<S::Transform, C>>,
}

impl MuseClassifier {
    /// SFA words and logistic regression, configured by `config`
    pub fn new(config: MuseConfig) -> Self {
        let classifier = LogisticRegression::new(config.classifier.clone());
        Self::with_components(config, SfaWordSource, classifier)
    }
}

impl Default for MuseClassifier {
    fn default() -> Self {
        Self::new(MuseConfig::default())
    }
}

impl<S, C> std::fmt::Debug for MuseClassifier<S, C>
where
    S: WordSource,
    C: BagClassifier,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MuseClassifier")
            .field("config", &self.config)
            .field("is_fitted", &self.model.is_some())
            .finish_non_exhaustive()
    }
}

impl<S, C> MuseClassifier<S, C>
where
    S: WordSource,
    C: BagClassifier + Clone,
{
    /// Build a classifier around a custom word source and bag classifier.
    ///
    /// `classifier` is used as an unfitted template; every call to `fit`
    /// trains a fresh copy of it.
    pub fn with_components(config: MuseConfig, source: S, classifier: C) -> Self {
        Self {
            config,
            source,
            classifier,
            relevance_test: Arc::new(Chi2Test),
            model: None,
        }
    }

    /// Replace the chi-squared relevance test
    pub fn with_relevance_test(mut self, test: Arc<dyn RelevanceTest>) -> Self {
        self.relevance_test = test;
        self
    }

    pub fn config(&self) -> &MuseConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Sorted class labels seen during fit
    pub fn classes(&self) -> Option<&[i64]> {
        self.model.as_ref().map(|m| m.classes.as_slice())
    }

    pub fn n_classes(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.classes.len())
    }

    /// Dimension names after augmentation, in encoding order
    pub fn dimension_names(&self) -> Option<&[String]> {
        self.model.as_ref().map(|m| m.dimension_names.as_slice())
    }

    /// Window schedule of every (augmented) dimension
    pub fn window_schedules(&self) -> Option<&[WindowSchedule]> {
        self.model.as_ref().map(|m| m.schedules.as_slice())
    }

    /// Word configuration drawn for every (dimension, window position)
    pub fn word_configs(&self) -> Option<&[Vec<WordConfig>]> {
        self.model.as_ref().map(|m| m.word_configs.as_slice())
    }

    /// Fitted word transform of one (dimension, window position) slot
    pub fn transform_at(&self, dimension: usize, position: usize) -> Option<&S::Transform> {
        self.model
            .as_ref()
            .and_then(|m| m.transforms.get(dimension))
            .and_then(|t| t.get(position))
    }

    pub fn encoders(&self) -> Option<&[WordEncoder]> {
        self.model.as_ref().map(|m| m.encoders.as_slice())
    }

    /// Number of encoded words the classifier was trained on
    pub fn vocabulary_size(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.classifier.vocabulary_size())
    }

    pub fn classifier(&self) -> Option<&C> {
        self.model.as_ref().map(|m| &m.classifier)
    }

    /// Split an encoded word into (raw word, window length, dimension)
    pub fn decode_word(&self, word: EncodedWord) -> Option<(RawWord, usize, usize)> {
        let model = self.model.as_ref()?;
        let dimension = decode_dimension(word, model.dimension_bits);
        model.encoders.get(dimension).map(|e| e.decode(word))
    }

    fn parallel_config(&self) -> ParallelConfig {
        ParallelConfig {
            n_threads: self.config.n_jobs,
        }
    }

    fn augment<'a>(&self, panel: &'a Panel) -> Result<Cow<'a, Panel>> {
        if self.config.use_first_order_differences {
            Ok(Cow::Owned(Differencer.augment(panel)?))
        } else {
            Ok(Cow::Borrowed(panel))
        }
    }

    /// Fit word transforms and the classifier.
    ///
    /// `y` holds one integral class label per instance. On error the
    /// previous fitted state, if any, is kept.
    pub fn fit(&mut self, panel: &Panel, y: &Array1<f64>) -> Result<&mut Self> {
        self.config.validate()?;

        let n_instances = panel.n_instances();
        if n_instances == 0 {
            return Err(KolosalError::InvalidInput("cannot fit on an empty panel".to_string()));
        }
        if y.len() != n_instances {
            return Err(KolosalError::ShapeError {
                expected: format!("y length = {}", n_instances),
                actual: format!("y length = {}", y.len()),
            });
        }
        let (classes, labels) = encode_labels(y)?;
        let n_classes = classes.len();
        if n_classes < 2 {
            return Err(KolosalError::InvalidInput(format!(
                "need at least 2 classes, got {}",
                n_classes
            )));
        }

        let augmented = self.augment(panel)?;
        let n_dims = augmented.n_dimensions();
        if n_dims == 0 {
            return Err(KolosalError::ConfigError(
                "no usable dimension in the input panel".to_string(),
            ));
        }
        if panel.n_dimensions() == 1 {
            warn!("MUSE is meant for multivariate series, got a single dimension");
        }

        info!(
            n_instances,
            n_dimensions = n_dims,
            n_classes,
            differences = self.config.use_first_order_differences,
            "Fitting MUSE"
        );

        // Schedules and encoders, fixed for the lifetime of the model
        let scheduler = WindowScheduler::from_config(&self.config);
        let raw_word_budget = self.config.word_space.max_raw_word_bits().min(u32::MAX as u64) as u32;
        let mut schedules = Vec::with_capacity(n_dims);
        let mut encoders = Vec::with_capacity(n_dims);
        for (d, name, _) in augmented.dimensions() {
            let length = augmented.series_length(d).unwrap_or(0);
            let schedule = scheduler.schedule(length).map_err(|e| match e {
                KolosalError::ConfigError(msg) => {
                    KolosalError::ConfigError(format!("dimension '{}': {}", name, msg))
                }
                other => other,
            })?;
            let encoder = WordEncoder::for_schedule(&schedule, n_dims);
            // Fails before any word is built if the widest sampled word cannot be packed
            encoder.check_capacity(raw_word_budget)?;
            debug!(
                dimension = d,
                name,
                length,
                windows = ?schedule.windows(),
                window_bits = encoder.window_bits(),
                dimension_bits = encoder.dimension_bits(),
                "Scheduled windows"
            );
            schedules.push(schedule);
            encoders.push(encoder);
        }

        // Word configurations are drawn sequentially so the seed alone decides them
        let mut sampler = WordConfigSampler::new(&self.config.word_space, self.config.random_state);
        let mut slots = Vec::new();
        for (dimension, schedule) in schedules.iter().enumerate() {
            for &window in schedule.windows() {
                slots.push(Slot {
                    dimension,
                    window,
                    config: sampler.sample(),
                });
            }
        }
        let n_slots = slots.len();

        let filter = RelevanceFilter::with_test(self.config.p_threshold, Arc::clone(&self.relevance_test));
        let source = &self.source;
        let series_panel: &Panel = &augmented;
        let labels_ref: &[usize] = &labels;
        let encoders_ref: &[WordEncoder] = &encoders;

        let fitted = try_parallel_map(slots, &self.parallel_config(), |slot| {
            fit_slot(source, &filter, series_panel, labels_ref, n_classes, encoders_ref, slot)
        })?;

        // Barrier passed: merge on this thread in slot order
        let mut merger = BagMerger::new(n_instances);
        let mut transforms: Vec<Vec<S::Transform>> = (0..n_dims).map(|_| Vec::new()).collect();
        let mut word_configs: Vec<Vec<WordConfig>> = vec![Vec::new(); n_dims];
        for fit in fitted {
            merger.merge_slot(fit.words)?;
            transforms[fit.slot.dimension].push(fit.transform);
            word_configs[fit.slot.dimension].push(fit.slot.config);
        }
        let bags = merger.into_bags();

        let mut classifier = self.classifier.clone();
        classifier
            .fit(&bags, &labels, n_classes)
            .map_err(|e| KolosalError::fit("classifier", e))?;

        info!(
            n_slots,
            vocabulary_size = classifier.vocabulary_size(),
            "MUSE fit complete"
        );

        self.model = Some(FittedMuse {
            input_dimensions: panel.dimension_names().to_vec(),
            dimension_names: augmented.dimension_names().to_vec(),
            dimension_bits: dimension_bit_width(n_dims),
            schedules,
            encoders,
            transforms,
            word_configs,
            classes,
            classifier,
        });

        Ok(self)
    }

    /// Merged bag of encoded words per instance, using the fitted transforms.
    ///
    /// No relevance filtering happens here; words the classifier never saw
    /// are ignored by it.
    pub fn transform(&self, panel: &Panel) -> Result<Vec<Bag>> {
        let model = self.model.as_ref().ok_or(KolosalError::ModelNotFitted)?;
        if panel.dimension_names() != model.input_dimensions.as_slice() {
            return Err(KolosalError::ShapeError {
                expected: format!("dimensions {:?}", model.input_dimensions),
                actual: format!("dimensions {:?}", panel.dimension_names()),
            });
        }

        let augmented = self.augment(panel)?;
        let series_panel: &Panel = &augmented;

        let slots: Vec<(usize, usize)> = model
            .transforms
            .iter()
            .enumerate()
            .flat_map(|(d, ts)| (0..ts.len()).map(move |p| (d, p)))
            .collect();

        let words = try_parallel_map(slots, &self.parallel_config(), |(d, p)| {
            let series = series_panel
                .dimension(d)
                .ok_or_else(|| KolosalError::InvalidInput(format!("missing dimension {}", d)))?;
            let window = model.schedules[d].windows()[p];
            let raw_bags = model.transforms[d][p].transform(series)?;
            Ok(encode_bags(&raw_bags, &model.encoders[d], window, d, &RetainedWords::All))
        })?;

        let mut merger = BagMerger::new(panel.n_instances());
        for slot_words in words {
            merger.merge_slot(slot_words)?;
        }
        Ok(merger.into_bags())
    }

    /// Class probabilities, columns ordered as `classes()`
    pub fn predict_proba(&self, panel: &Panel) -> Result<Array2<f64>> {
        let bags = self.transform(panel)?;
        let model = self.model.as_ref().ok_or(KolosalError::ModelNotFitted)?;
        model.classifier.predict_proba(&bags)
    }

    /// Predicted class label per instance
    pub fn predict(&self, panel: &Panel) -> Result<Array1<f64>> {
        let bags = self.transform(panel)?;
        let model = self.model.as_ref().ok_or(KolosalError::ModelNotFitted)?;
        let indices = model.classifier.predict(&bags)?;
        indices
            .into_iter()
            .map(|i| {
                model.classes.get(i).map(|&c| c as f64).ok_or_else(|| {
                    KolosalError::ComputationError(format!("class index {} out of range", i))
                })
            })
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from_vec)
    }

    /// Mean accuracy on the given panel and labels
    pub fn score(&self, panel: &Panel, y: &Array1<f64>) -> Result<f64> {
        let predictions = self.predict(panel)?;
        if predictions.len() != y.len() {
            return Err(KolosalError::ShapeError {
                expected: format!("y length = {}", predictions.len()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if y.is_empty() {
            return Ok(0.0);
        }
        let correct = predictions.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        Ok(correct as f64 / y.len() as f64)
    }
}

impl<S, C> MuseClassifier<S, C>
where
    S: WordSource + Default,
    S::Transform: Serialize + DeserializeOwned,
    C: BagClassifier + Clone + Serialize + DeserializeOwned,
{
    /// Serialize the configuration and fitted model
    pub fn to_json(&self) -> Result<String> {
        let model = self.model.as_ref().ok_or(KolosalError::ModelNotFitted)?;
        let snapshot = SnapshotRef {
            config: &self.config,
            model,
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Restore a fitted classifier; the relevance test is reset to chi-squared
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot<S::Transform, C> = serde_json::from_str(json)?;
        let classifier = snapshot.model.classifier.clone();
        let mut muse = Self::with_components(snapshot.config, S::default(), classifier);
        muse.model = Some(snapshot.model);
        Ok(muse)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Fit one slot: word transform, capacity check, relevance filter, encoding
fn fit_slot<S: WordSource>(
    source: &S,
    filter: &RelevanceFilter,
    panel: &Panel,
    labels: &[usize],
    n_classes: usize,
    encoders: &[WordEncoder],
    slot: Slot,
) -> Result<SlotFit<S::Transform>> {
    let series = panel
        .dimension(slot.dimension)
        .ok_or_else(|| KolosalError::InvalidInput(format!("missing dimension {}", slot.dimension)))?;
    let encoder = encoders[slot.dimension];

    let (transform, raw_bags) = source
        .fit_transform(series, labels, slot.window, &slot.config)
        .map_err(|e| {
            KolosalError::fit(
                format!("word source (dimension {}, window {})", slot.dimension, slot.window),
                e,
            )
        })?;
    encoder.check_capacity(transform.raw_word_bits())?;

    let retained = filter.fit(&raw_bags, labels, n_classes).map_err(|e| {
        KolosalError::fit(
            format!("relevance filter (dimension {}, window {})", slot.dimension, slot.window),
            e,
        )
    })?;
    if let Some(kept) = retained.len() {
        debug!(
            dimension = slot.dimension,
            window = slot.window,
            kept,
            total = distinct_words(&raw_bags),
            "Relevance filter"
        );
    }

    let words = encode_bags(&raw_bags, &encoder, slot.window, slot.dimension, &retained);
    Ok(SlotFit {
        slot,
        transform,
        words,
    })
}

fn encode_bags(
    raw_bags: &[RawBag],
    encoder: &WordEncoder,
    window: usize,
    dimension: usize,
    retained: &RetainedWords,
) -> SlotWords {
    raw_bags
        .iter()
        .map(|bag| {
            retained
                .filter(bag)
                .map(|(word, count)| (encoder.encode(word, window, dimension), count))
                .collect()
        })
        .collect()
}

fn distinct_words(bags: &[RawBag]) -> usize {
    let mut words: Vec<RawWord> = bags.iter().flat_map(|b| b.keys().copied()).collect();
    words.sort_unstable();
    words.dedup();
    words.len()
}

/// Sorted distinct labels and the class index of every label
fn encode_labels(y: &Array1<f64>) -> Result<(Vec<i64>, Vec<usize>)> {
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive
    let (lowest, highest) = (i64::MIN as f64, i64::MAX as f64);
    let mut raw = Vec::with_capacity(y.len());
    for &v in y.iter() {
        if !v.is_finite() || v.fract() != 0.0 {
            return Err(KolosalError::InvalidInput(format!(
                "class labels must be integral, got {}",
                v
            )));
        }
        if v < lowest || v >= highest {
            return Err(KolosalError::InvalidInput(format!(
                "class label {} is outside the 64-bit integer range",
                v
            )));
        }
        raw.push(v as i64);
    }

    let mut classes = raw.clone();
    classes.sort_unstable();
    classes.dedup();

    let index: HashMap<i64, usize> = classes.iter().enumerate().map(|(i, &c)| (c, i)).collect();
    let labels = raw.iter().map(|l| index[l]).collect();
    Ok((classes, labels))
}
