//! Python bindings.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::SchedulingConfig;
use crate::fixtures;
use crate::models::{Fixture, MatchRecord, MatchResult, Schedule, Team};
use crate::scheduler::SchedulerError;

impl From<SchedulerError> for PyErr {
    fn from(err: SchedulerError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Scheduled match in exchange shape (PyO3 wrapper).
#[pyclass(name = "MatchRecord")]
#[derive(Clone, Debug)]
pub struct PyMatchRecord {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub team_a_id: String,
    #[pyo3(get, set)]
    pub team_b_id: String,
    #[pyo3(get, set)]
    pub group_id: String,
    /// `YYYY-MM-DD`
    #[pyo3(get, set)]
    pub date: String,
    /// `HH:MM`
    #[pyo3(get, set)]
    pub time: String,
    /// `(score_a, score_b)` once the match has been played
    #[pyo3(get, set)]
    pub result: Option<(u32, u32)>,
    #[pyo3(get, set)]
    pub relaxed: bool,
}

#[pymethods]
impl PyMatchRecord {
    #[new]
    #[pyo3(signature = (id, team_a_id, team_b_id, group_id, date, time, result=None, relaxed=false))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: String,
        team_a_id: String,
        team_b_id: String,
        group_id: String,
        date: String,
        time: String,
        result: Option<(u32, u32)>,
        relaxed: bool,
    ) -> Self {
        Self {
            id,
            team_a_id,
            team_b_id,
            group_id,
            date,
            time,
            result,
            relaxed,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "MatchRecord(id={}, {} vs {}, group={}, {} {})",
            self.id, self.team_a_id, self.team_b_id, self.group_id, self.date, self.time
        )
    }
}

impl From<MatchRecord> for PyMatchRecord {
    fn from(record: MatchRecord) -> Self {
        Self {
            id: record.id,
            team_a_id: record.team_a_id,
            team_b_id: record.team_b_id,
            group_id: record.group_id,
            date: record.date,
            time: record.time,
            result: record.result.map(|r| (r.score_a, r.score_b)),
            relaxed: record.relaxed,
        }
    }
}

impl From<PyMatchRecord> for MatchRecord {
    fn from(record: PyMatchRecord) -> Self {
        Self {
            id: record.id,
            team_a_id: record.team_a_id,
            team_b_id: record.team_b_id,
            group_id: record.group_id,
            date: record.date,
            time: record.time,
            result: record
                .result
                .map(|(score_a, score_b)| MatchResult { score_a, score_b }),
            relaxed: record.relaxed,
        }
    }
}

/// Scheduling configuration (PyO3 wrapper). Slot times and scoring weights
/// keep their defaults.
#[pyclass(name = "SchedulingConfig")]
#[derive(Clone, Debug)]
pub struct PySchedulingConfig {
    #[pyo3(get, set)]
    pub min_rest_days: i64,
    #[pyo3(get, set)]
    pub initial_pool_days: usize,
    #[pyo3(get, set)]
    pub pool_extension_days: usize,
    #[pyo3(get, set)]
    pub max_pool_extensions: usize,
    #[pyo3(get, set)]
    pub max_relocation_attempts: usize,
    #[pyo3(get, set)]
    pub max_repack_steps: usize,
    #[pyo3(get, set)]
    pub repair_enforces_min_rest: bool,
    #[pyo3(get, set)]
    pub verbosity: u8,
}

#[pymethods]
impl PySchedulingConfig {
    #[new]
    #[pyo3(signature = (
        min_rest_days=3,
        initial_pool_days=60,
        pool_extension_days=10,
        max_pool_extensions=36,
        max_relocation_attempts=10_000,
        max_repack_steps=200_000,
        repair_enforces_min_rest=false,
        verbosity=0
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        min_rest_days: i64,
        initial_pool_days: usize,
        pool_extension_days: usize,
        max_pool_extensions: usize,
        max_relocation_attempts: usize,
        max_repack_steps: usize,
        repair_enforces_min_rest: bool,
        verbosity: u8,
    ) -> Self {
        Self {
            min_rest_days,
            initial_pool_days,
            pool_extension_days,
            max_pool_extensions,
            max_relocation_attempts,
            max_repack_steps,
            repair_enforces_min_rest,
            verbosity,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "SchedulingConfig(min_rest_days={}, initial_pool_days={}, verbosity={})",
            self.min_rest_days, self.initial_pool_days, self.verbosity
        )
    }
}

impl From<Option<PySchedulingConfig>> for SchedulingConfig {
    fn from(config: Option<PySchedulingConfig>) -> Self {
        let mut out = SchedulingConfig::default();
        if let Some(c) = config {
            out.min_rest_days = c.min_rest_days;
            out.initial_pool_days = c.initial_pool_days;
            out.retry.pool_extension_days = c.pool_extension_days;
            out.retry.max_pool_extensions = c.max_pool_extensions;
            out.retry.max_relocation_attempts = c.max_relocation_attempts;
            out.retry.max_repack_steps = c.max_repack_steps;
            out.repair_enforces_min_rest = c.repair_enforces_min_rest;
            out.verbosity = c.verbosity;
        }
        out
    }
}

/// Outcome of validation or repair (PyO3 wrapper).
#[pyclass(name = "ScheduleReport")]
#[derive(Clone, Debug)]
pub struct PyScheduleReport {
    #[pyo3(get)]
    pub matches: Vec<PyMatchRecord>,
    #[pyo3(get)]
    pub is_valid: bool,
    #[pyo3(get)]
    pub messages: Vec<String>,
    #[pyo3(get)]
    pub optimized: bool,
    #[pyo3(get)]
    pub relocation_count: usize,
}

#[pymethods]
impl PyScheduleReport {
    fn __repr__(&self) -> String {
        format!(
            "ScheduleReport(is_valid={}, violations={}, relocations={})",
            self.is_valid,
            self.messages.len(),
            self.relocation_count
        )
    }
}

fn load_schedule(
    matches: Vec<PyMatchRecord>,
    start_date: NaiveDate,
    config: &SchedulingConfig,
) -> Result<Schedule, SchedulerError> {
    let records: Vec<MatchRecord> = matches.into_iter().map(MatchRecord::from).collect();
    Schedule::from_records(start_date, &records, &config.slot_policy)
        .map_err(SchedulerError::from)
}

fn export(schedule: &Schedule, config: &SchedulingConfig) -> Vec<PyMatchRecord> {
    schedule
        .to_records(&config.slot_policy)
        .into_iter()
        .map(PyMatchRecord::from)
        .collect()
}

/// Expand `(team_id, group_id)` pairs into round-robin fixtures.
///
/// # Returns
/// * List of `(team_a_id, team_b_id, group_id)` tuples
///
/// # Raises
/// * ValueError on an empty or duplicate team id
#[pyfunction]
fn generate_fixtures(teams: Vec<(String, String)>) -> PyResult<Vec<(String, String, String)>> {
    let roster: Vec<Team> = teams
        .into_iter()
        .map(|(id, group)| Team::new(id, group))
        .collect();
    let fixtures = fixtures::generate_fixtures(&roster).map_err(SchedulerError::from)?;
    Ok(fixtures
        .into_iter()
        .map(|f| (f.team_a, f.team_b, f.group))
        .collect())
}

/// Assign each `(team_a_id, team_b_id, group_id)` fixture a date and time.
#[pyfunction]
#[pyo3(signature = (fixtures, start_date, config=None))]
fn schedule_matches(
    fixtures: Vec<(String, String, String)>,
    start_date: NaiveDate,
    config: Option<PySchedulingConfig>,
) -> Vec<PyMatchRecord> {
    let config = SchedulingConfig::from(config);
    let fixtures: Vec<Fixture> = fixtures
        .into_iter()
        .map(|(a, b, group)| Fixture::new(a, b, group))
        .collect();
    let schedule = crate::schedule_matches(&fixtures, start_date, &config);
    export(&schedule, &config)
}

/// Check a schedule against every hard constraint.
///
/// # Raises
/// * ValueError if a record has a malformed date or a time outside its day's slots
#[pyfunction]
#[pyo3(signature = (matches, start_date, config=None))]
fn validate_schedule(
    matches: Vec<PyMatchRecord>,
    start_date: NaiveDate,
    config: Option<PySchedulingConfig>,
) -> PyResult<PyScheduleReport> {
    let config = SchedulingConfig::from(config);
    let schedule = load_schedule(matches, start_date, &config)?;
    let report = crate::validate_schedule(&schedule, &config);
    Ok(PyScheduleReport {
        matches: export(&schedule, &config),
        is_valid: report.is_valid(),
        messages: report.messages(),
        optimized: false,
        relocation_count: 0,
    })
}

/// Repair a schedule by relocating matches and re-validate it.
///
/// # Raises
/// * ValueError if a record has a malformed date or a time outside its day's slots
#[pyfunction]
#[pyo3(signature = (matches, start_date, config=None))]
fn optimize_schedule(
    matches: Vec<PyMatchRecord>,
    start_date: NaiveDate,
    config: Option<PySchedulingConfig>,
) -> PyResult<PyScheduleReport> {
    let config = SchedulingConfig::from(config);
    let schedule = load_schedule(matches, start_date, &config)?;
    let outcome = crate::optimize_schedule(schedule, &config);
    Ok(PyScheduleReport {
        matches: export(&outcome.schedule, &config),
        is_valid: outcome.is_valid(),
        messages: outcome.messages(),
        optimized: outcome.optimized,
        relocation_count: outcome.relocation_count,
    })
}

/// The fixture_scheduler Python module.
#[pymodule]
fn fixture_scheduler(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyMatchRecord>()?;
    m.add_class::<PySchedulingConfig>()?;
    m.add_class::<PyScheduleReport>()?;

    m.add_function(wrap_pyfunction!(generate_fixtures, m)?)?;
    m.add_function(wrap_pyfunction!(schedule_matches, m)?)?;
    m.add_function(wrap_pyfunction!(validate_schedule, m)?)?;
    m.add_function(wrap_pyfunction!(optimize_schedule, m)?)?;

    Ok(())
}
