//! Comparison oracle and result streams
//!
//! For each test case the oracle looks up its record. Without a usable
//! record the test is skipped and the program is not run. Otherwise the
//! program is run and its `(stdout, stderr, returncode)` triple must equal
//! the record exactly.
//!
//! Results are produced lazily by [`ResultStream`], a single-pass iterator
//! that yields in discovery order. With more than one job, test cases are
//! evaluated in batches on a rayon pool and each batch is buffered by index
//! before it is yielded.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info};

use crate::executor::Executor;
use crate::models::{
    CapturedOutcome, ExpectedRecord, MissingReason, RecordLookup, RunMode, TestResult,
    UpdateAction, UpdateResult, Verdict,
};
use crate::record::RecordStore;
use crate::template::ProgramTemplate;

const SELF_RECORD: &str = "record path is the test case itself";

/// Anything able to run the program under test for one test path
pub trait Runner: Sync {
    fn run(&self, template: &ProgramTemplate, test_path: &Path) -> CapturedOutcome;
}

impl Runner for Executor {
    fn run(&self, template: &ProgramTemplate, test_path: &Path) -> CapturedOutcome {
        Executor::run(self, template, test_path)
    }
}

/// Decides skip vs. execute-and-compare for each test case
pub struct ComparisonOracle<R: Runner = Executor> {
    template: ProgramTemplate,
    store: RecordStore,
    runner: R,
    jobs: usize,
    pool: Option<ThreadPool>,
    interrupted: Option<Arc<AtomicBool>>,
}

impl<R: Runner> ComparisonOracle<R> {
    pub fn new(template: ProgramTemplate, store: RecordStore, runner: R) -> Self {
        Self {
            template,
            store,
            runner,
            jobs: 1,
            pool: None,
            interrupted: None,
        }
    }

    /// Evaluate up to `jobs` test cases concurrently
    pub fn with_jobs(mut self, jobs: usize) -> Result<Self> {
        self.jobs = jobs.max(1);
        self.pool = if self.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.jobs)
                .build()
                .context("Failed to build worker pool")?;
            Some(pool)
        } else {
            None
        };
        Ok(self)
    }

    /// Stop streams once `flag` is set
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(flag);
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Compare one test case against its record
    pub fn evaluate(&self, test_case: &Path) -> TestResult {
        let record_path = self.store.record_path_of(test_case);

        if record_path == test_case {
            debug!(test = %test_case.display(), "record path is the test case itself");
            return TestResult {
                test_case: test_case.to_path_buf(),
                record_path,
                verdict: Verdict::Skipped(MissingReason::BadRecord {
                    detail: SELF_RECORD.to_string(),
                }),
            };
        }

        let verdict = match self.store.read(&record_path) {
            RecordLookup::Missing(reason) => {
                debug!(test = %test_case.display(), %reason, "skipping");
                Verdict::Skipped(reason)
            }
            RecordLookup::Present(expected) => {
                let actual = self.runner.run(&self.template, test_case);
                Verdict::Executed { expected, actual }
            }
        };

        TestResult {
            test_case: test_case.to_path_buf(),
            record_path,
            verdict,
        }
    }

    /// Rewrite the record of one test case
    pub fn update(&self, test_case: &Path, mode: RunMode) -> UpdateResult {
        let record_path = self.store.record_path_of(test_case);

        let action = match mode {
            // Never overwrite a test input
            _ if record_path == test_case => UpdateAction::WriteFailed(SELF_RECORD.to_string()),
            RunMode::CreateEmpty if record_path.exists() => UpdateAction::Kept,
            RunMode::CreateEmpty => self.write(&record_path, ExpectedRecord::empty()),
            RunMode::Update | RunMode::Check => {
                let outcome = self.runner.run(&self.template, test_case);
                match outcome.to_record() {
                    Some(record) => self.write(&record_path, record),
                    None => UpdateAction::NotWritten(outcome),
                }
            }
        };

        UpdateResult {
            test_case: test_case.to_path_buf(),
            record_path,
            action,
        }
    }

    fn write(&self, record_path: &Path, record: ExpectedRecord) -> UpdateAction {
        match self.store.write(record_path, &record) {
            Ok(()) => UpdateAction::Written(record),
            Err(err) => UpdateAction::WriteFailed(format!("{:#}", err)),
        }
    }

    /// Lazily compare every test case, in order
    pub fn check_all(&self, tests: Vec<PathBuf>) -> ResultStream<'_, TestResult> {
        self.stream(tests, Box::new(move |test_case: &Path| self.evaluate(test_case)))
    }

    /// Lazily rewrite the record of every test case, in order
    pub fn update_all(&self, tests: Vec<PathBuf>, mode: RunMode) -> ResultStream<'_, UpdateResult> {
        self.stream(tests, Box::new(move |test_case: &Path| self.update(test_case, mode)))
    }

    fn stream<'a, T: Send>(&'a self, tests: Vec<PathBuf>, step: Step<'a, T>) -> ResultStream<'a, T> {
        info!(tests = tests.len(), jobs = self.jobs, "starting run");
        ResultStream {
            pending: tests.into_iter(),
            ready: VecDeque::new(),
            jobs: self.jobs,
            pool: self.pool.as_ref(),
            step,
            interrupted: self.interrupted.clone(),
        }
    }
}

type Step<'a, T> = Box<dyn Fn(&Path) -> T + Send + Sync + 'a>;

/// Finite, single-pass sequence of per-test results in discovery order
pub struct ResultStream<'a, T> {
    pending: std::vec::IntoIter<PathBuf>,
    ready: VecDeque<T>,
    jobs: usize,
    pool: Option<&'a ThreadPool>,
    step: Step<'a, T>,
    interrupted: Option<Arc<AtomicBool>>,
}

impl<T: Send> ResultStream<'_, T> {
    fn is_interrupted(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl<T: Send> Iterator for ResultStream<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if let Some(result) = self.ready.pop_front() {
            return Some(result);
        }
        if self.is_interrupted() {
            return None;
        }

        let batch: Vec<PathBuf> = self.pending.by_ref().take(self.jobs).collect();
        let step = &self.step;
        match (self.pool, batch.as_slice()) {
            (_, []) => None,
            (None, [test_case]) => Some(step(test_case.as_path())),
            (None, cases) => {
                self.ready.extend(cases.iter().map(|case| step(case.as_path())));
                self.ready.pop_front()
            }
            (Some(pool), cases) => {
                // collect() keeps index order regardless of completion order
                let results: Vec<T> = pool.install(|| cases.par_iter().map(|case| step(case.as_path())).collect());
                self.ready.extend(results);
                self.ready.pop_front()
            }
        }
    }
}
