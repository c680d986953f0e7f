use crate::config::SamplerConfig;
use crate::data::Dataset;
use crate::error::SamplerError;
use crate::normalize::NormalizationMethod;
use crate::rules::Measure;
use crate::sampling::{HalvingBatch, LocalSearchSampler, SampleOutcome};
use crate::scoring::{BradleyTerry, LinearScore, ScoreDifference, Thurstone};
use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray2};
use once_cell::sync::Lazy;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::{pymodule, types::PyModule, Bound, PyErr, PyResult, Python};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Datasets handed to Python, addressed by handle
static DATASETS: Lazy<Mutex<HashMap<usize, Arc<Dataset>>>> = Lazy::new(|| Mutex::new(HashMap::new()));
static NEXT_HANDLE: Lazy<Mutex<usize>> = Lazy::new(|| Mutex::new(0));

type RuleRow = (Vec<String>, String, usize, usize, usize, f64);

fn lock_error<E: std::fmt::Display>(e: E) -> PyErr {
    PyRuntimeError::new_err(format!("Lock error: {}", e))
}

fn sampler_error(e: SamplerError) -> PyErr {
    match e {
        SamplerError::InvalidConfig(_)
        | SamplerError::UnknownMeasure(_)
        | SamplerError::UnknownNormalization(_)
        | SamplerError::EmptyDataset
        | SamplerError::NoValidSeed { .. } => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn register(dataset: Dataset) -> PyResult<usize> {
    let mut handle_lock = NEXT_HANDLE.lock().map_err(lock_error)?;
    let handle = *handle_lock;
    *handle_lock += 1;
    drop(handle_lock);

    let mut datasets = DATASETS.lock().map_err(lock_error)?;
    datasets.insert(handle, Arc::new(dataset));
    Ok(handle)
}

fn lookup(handle: usize) -> PyResult<Arc<Dataset>> {
    let datasets = DATASETS.lock().map_err(lock_error)?;
    datasets
        .get(&handle)
        .cloned()
        .ok_or_else(|| PyValueError::new_err("Invalid dataset handle"))
}

fn run_sampler(
    dataset: Arc<Dataset>,
    config: SamplerConfig,
    weights: Option<Vec<f64>>,
    certainty: &str,
    batch: bool,
) -> Result<SampleOutcome, SamplerError> {
    let scorer = match weights {
        Some(weights) => LinearScore::weighted(weights),
        None => LinearScore::new(),
    };
    let mut sampler = LocalSearchSampler::new(dataset, config, Arc::new(scorer))?;
    sampler = match certainty {
        "score_difference" => sampler.with_certainty(ScoreDifference::default()),
        "bradley_terry" => sampler.with_certainty(BradleyTerry),
        "thurstone" => sampler.with_certainty(Thurstone::default()),
        other => return Err(SamplerError::InvalidConfig(format!("unknown certainty function: {other}"))),
    };
    if batch {
        sampler = sampler.with_policy(HalvingBatch);
    }
    sampler.sample()
}

#[pymodule]
fn rulesampler<'py>(m: &Bound<'py, PyModule>) -> PyResult<()> {
    #[pyfn(m)]
    #[pyo3(name = "create_dataset")]
    fn create_dataset_py(transactions: Vec<Vec<String>>, consequent_items: Vec<String>) -> PyResult<usize> {
        let dataset = Dataset::new(&transactions, &consequent_items).map_err(sampler_error)?;
        register(dataset)
    }

    #[pyfn(m)]
    #[pyo3(name = "create_dataset_from_matrix")]
    fn create_dataset_from_matrix_py(
        transactions: PyReadonlyArray2<i32>,
        consequent_columns: Vec<usize>,
    ) -> PyResult<usize> {
        let transactions_view = transactions.as_array();
        let dataset = Dataset::from_matrix(transactions_view, &consequent_columns).map_err(sampler_error)?;
        register(dataset)
    }

    /// Returns the kept rules as `(antecedent, consequent, fx, fy, fz,
    /// score)`, their measure vectors, the per-iteration score history
    /// and whether the run completed.
    #[pyfn(m)]
    #[pyo3(name = "sample_rules")]
    #[pyo3(signature = (
        handle,
        iterations,
        top_k,
        seed = 0,
        measures = None,
        normalization = None,
        weights = None,
        certainty = None,
        batch = false,
        time_limit_secs = None,
    ))]
    #[allow(clippy::too_many_arguments, clippy::type_complexity)]
    fn sample_rules_py<'py>(
        py: Python<'py>,
        handle: usize,
        iterations: usize,
        top_k: usize,
        seed: u64,
        measures: Option<Vec<String>>,
        normalization: Option<String>,
        weights: Option<Vec<f64>>,
        certainty: Option<String>,
        batch: bool,
        time_limit_secs: Option<f64>,
    ) -> PyResult<(Vec<RuleRow>, Bound<'py, PyArray2<f64>>, Bound<'py, PyArray1<f64>>, bool)> {
        let dataset = lookup(handle)?;

        let mut config = SamplerConfig::new(iterations, top_k).with_seed(seed);
        if let Some(measures) = measures {
            let measures = measures
                .iter()
                .map(|name| name.parse::<Measure>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(sampler_error)?;
            config = config.with_measures(measures);
        }
        if let Some(normalization) = normalization {
            let method = normalization.parse::<NormalizationMethod>().map_err(sampler_error)?;
            config = config.with_normalization(method);
        }
        if let Some(secs) = time_limit_secs {
            let limit = Duration::try_from_secs_f64(secs)
                .map_err(|e| PyValueError::new_err(format!("Invalid time limit: {}", e)))?;
            config = config.with_time_limit(limit);
        }
        let num_measures = config.measures.len();
        let certainty = certainty.unwrap_or_else(|| "score_difference".to_string());

        let outcome = py
            .allow_threads(move || run_sampler(dataset, config, weights, &certainty, batch))
            .map_err(sampler_error)?;

        let mut rows = Vec::with_capacity(outcome.rules.len());
        let mut data = Vec::with_capacity(outcome.rules.len() * num_measures);
        for (rule, &score) in outcome.rules.iter().zip(&outcome.scores) {
            rows.push((
                rule.antecedent().iter().cloned().collect(),
                rule.consequent().unwrap_or_default().to_string(),
                rule.freq_x(),
                rule.freq_y(),
                rule.freq_z(),
                score,
            ));
            data.extend_from_slice(rule.alternative());
        }

        let alternatives = Array2::from_shape_vec((rows.len(), num_measures), data)
            .map_err(|_| PyValueError::new_err("Failed to create array"))?;
        let completed = outcome.is_complete();

        Ok((rows, alternatives.into_pyarray(py), outcome.score_history.into_pyarray(py), completed))
    }

    /// Items grouped by shared transactions.
    #[pyfn(m)]
    #[pyo3(name = "equivalence_classes")]
    fn equivalence_classes_py(handle: usize) -> PyResult<Vec<Vec<String>>> {
        Ok(lookup(handle)?.equivalence_classes())
    }

    #[pyfn(m)]
    #[pyo3(name = "drop_dataset")]
    fn drop_dataset_py(handle: usize) -> PyResult<()> {
        let mut datasets = DATASETS.lock().map_err(lock_error)?;

        datasets
            .remove(&handle)
            .ok_or_else(|| PyValueError::new_err("Invalid dataset handle"))?;

        Ok(())
    }

    Ok(())
}
