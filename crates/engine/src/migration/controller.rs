//! Background index migration
//!
//! [`Migration::start`] validates the input, then hands the rows to a named
//! worker thread that feeds them through an
//! [`IndexBuilder`](super::IndexBuilder). The caller keeps the handle and
//! can poll [`Migration::info`], block in
//! [`Migration::wait`], request [`Migration::cancel`], and finally claim the
//! built index with [`Migration::take_index`].
//!
//! The worker holds only an `Arc` to the shared record. The handle owns the
//! thread and, until taken, the finished index.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use parking_lot::{Condvar, Mutex};
use stratavec_core::{bounded_message, IndexType, MigrationStatus, VectorError, VectorId, VectorResult};
use tracing::{error, info, warn};

use super::builder::BuilderRegistry;
use crate::config::{IndexConfig, MigrationConfig};
use crate::index::VectorIndex;

/// Running progress never reaches this; only completion publishes 1.0
const RUNNING_PROGRESS_CAP: f64 = 0.98;

/// Snapshot of a migration's record
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationInfo {
    /// Current lifecycle status
    pub status: MigrationStatus,
    /// Fraction done, in `[0.0, 1.0]`
    pub progress: f64,
    /// Rows inserted so far
    pub vectors_migrated: u64,
    /// Rows requested
    pub total_vectors: u64,
    /// Wall-clock start, microseconds since the Unix epoch
    pub start_time_us: u64,
    /// Time spent as of the last published checkpoint
    pub elapsed_us: u64,
    /// Why the migration failed (empty unless `Failed`)
    pub error_message: String,
}

/// Knobs that are not part of the index itself
#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Where builders come from
    pub registry: BuilderRegistry,
    /// Rows between progress publications; 0 uses the configured default
    pub batch_size: usize,
}

impl MigrationOptions {
    /// Default registry with the configured batch size
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self {
            registry: BuilderRegistry::default(),
            batch_size: config.batch_size,
        }
    }
}

// ============================================================================
// Shared record
// ============================================================================

struct MigrationState {
    status: MigrationStatus,
    progress: f64,
    vectors_migrated: u64,
    elapsed_us: u64,
    error_message: String,
    index: Option<Box<dyn VectorIndex>>,
}

struct MigrationShared {
    state: Mutex<MigrationState>,
    finished: Condvar,
    cancel_requested: AtomicBool,
    total_vectors: u64,
    start_time_us: u64,
    started: Instant,
}

impl MigrationShared {
    fn elapsed_us(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    fn publish_progress(&self, migrated: u64) {
        let elapsed_us = self.elapsed_us();
        let mut state = self.state.lock();
        let fraction = migrated as f64 / self.total_vectors.max(1) as f64;
        state.vectors_migrated = migrated;
        // Monotonic even if a caller-supplied builder re-reports
        state.progress = state.progress.max(fraction.min(RUNNING_PROGRESS_CAP));
        state.elapsed_us = elapsed_us;
    }

    /// Move to a terminal status and wake every waiter
    fn finish(&self, status: MigrationStatus, index: Option<Box<dyn VectorIndex>>, message: &str) {
        let elapsed_us = self.elapsed_us();
        let mut state = self.state.lock();
        state.status = status;
        state.elapsed_us = elapsed_us;
        if status == MigrationStatus::Completed {
            state.progress = 1.0;
            state.vectors_migrated = self.total_vectors;
            state.index = index;
        } else {
            state.error_message = bounded_message(message);
        }
        // Notify under the lock so a waiter between its check and wait() cannot miss it
        self.finished.notify_all();
    }
}

// ============================================================================
// Migration handle
// ============================================================================

/// Handle to a running or finished migration
///
/// Dropping the handle requests cancellation if the worker is still going,
/// joins it, and frees any index nobody took.
pub struct Migration {
    shared: Arc<MigrationShared>,
    index_type: IndexType,
    worker: Option<JoinHandle<()>>,
}

struct Job {
    data: Option<Arc<[f32]>>,
    count: usize,
    dimension: usize,
    index_type: IndexType,
    config: IndexConfig,
    options: MigrationOptions,
}

enum BuildOutcome {
    Built(Box<dyn VectorIndex>),
    Cancelled,
}

impl Migration {
    /// Build `index_type` over `count` rows of `data` using the default builders
    ///
    /// `data` is row-major, `count × dimension` floats. Row `i` becomes
    /// `VectorId(i)`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `data` is absent with `count > 0`, if
    /// `dimension` is 0 with `count > 0`, or if `data` is too short.
    pub fn start(
        data: Option<Arc<[f32]>>,
        count: usize,
        dimension: usize,
        index_type: IndexType,
        config: IndexConfig,
    ) -> VectorResult<Self> {
        Self::start_with(
            data,
            count,
            dimension,
            index_type,
            config,
            MigrationOptions::from_config(&MigrationConfig::default()),
        )
    }

    /// Like [`start`](Self::start) with a custom registry and batch size
    pub fn start_with(
        data: Option<Arc<[f32]>>,
        count: usize,
        dimension: usize,
        index_type: IndexType,
        config: IndexConfig,
        options: MigrationOptions,
    ) -> VectorResult<Self> {
        validate_input(data.as_deref(), count, dimension)?;

        let shared = Arc::new(MigrationShared {
            state: Mutex::new(MigrationState {
                status: MigrationStatus::Pending,
                progress: 0.0,
                vectors_migrated: 0,
                elapsed_us: 0,
                error_message: String::new(),
                index: None,
            }),
            finished: Condvar::new(),
            cancel_requested: AtomicBool::new(false),
            total_vectors: count as u64,
            start_time_us: unix_micros(),
            started: Instant::now(),
        });

        let job = Job {
            data,
            count,
            dimension,
            index_type,
            config,
            options,
        };

        info!(
            target: "stratavec::migration",
            index_type = %index_type,
            total_vectors = count,
            dimension,
            "Migration started"
        );

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name(format!("stratavec-migrate-{}", index_type.name()))
            .spawn(move || run_worker(&worker_shared, job))
            .map_err(|e| {
                VectorError::build_failed(format!("failed to spawn migration worker: {}", e))
            })?;

        Ok(Self {
            shared,
            index_type,
            worker: Some(worker),
        })
    }

    /// Target index type
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Consistent snapshot of the record
    pub fn info(&self) -> MigrationInfo {
        let state = self.shared.state.lock();
        MigrationInfo {
            status: state.status,
            progress: state.progress,
            vectors_migrated: state.vectors_migrated,
            total_vectors: self.shared.total_vectors,
            start_time_us: self.shared.start_time_us,
            elapsed_us: state.elapsed_us,
            error_message: state.error_message.clone(),
        }
    }

    /// Current status
    pub fn status(&self) -> MigrationStatus {
        self.shared.state.lock().status
    }

    /// Check if the migration reached a terminal status
    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Block until the migration ends
    ///
    /// # Errors
    ///
    /// `MigrationEnded` carrying the status if it ended other than `Completed`.
    pub fn wait(&self) -> VectorResult<()> {
        let mut state = self.shared.state.lock();
        while !state.status.is_terminal() {
            self.shared.finished.wait(&mut state);
        }
        match state.status {
            MigrationStatus::Completed => Ok(()),
            status => Err(VectorError::MigrationEnded { status }),
        }
    }

    /// Ask the worker to stop at its next checkpoint
    ///
    /// Best-effort: a worker past its last checkpoint still completes.
    ///
    /// # Errors
    ///
    /// `NotApplicable` if the migration already ended.
    pub fn cancel(&self) -> VectorResult<()> {
        let state = self.shared.state.lock();
        if state.status.is_terminal() {
            return Err(VectorError::not_applicable(format!(
                "migration already {}",
                state.status
            )));
        }
        self.shared.cancel_requested.store(true, Ordering::Release);
        info!(
            target: "stratavec::migration",
            index_type = %self.index_type,
            vectors_migrated = state.vectors_migrated,
            "Migration cancel requested"
        );
        Ok(())
    }

    /// Claim the built index
    ///
    /// Returns `Some` exactly once, and only after the migration completed.
    pub fn take_index(&self) -> Option<Box<dyn VectorIndex>> {
        let mut state = self.shared.state.lock();
        if state.status != MigrationStatus::Completed {
            return None;
        }
        state.index.take()
    }
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("index_type", &self.index_type)
            .field("info", &self.info())
            .finish()
    }
}

impl Drop for Migration {
    fn drop(&mut self) {
        if !self.is_finished() {
            self.shared.cancel_requested.store(true, Ordering::Release);
        }
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                // Builder panics are caught in the worker; this is the worker itself
                error!(
                    target: "stratavec::migration",
                    index_type = %self.index_type,
                    "migration worker thread panicked"
                );
            }
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

fn validate_input(data: Option<&[f32]>, count: usize, dimension: usize) -> VectorResult<()> {
    if count == 0 {
        return Ok(());
    }
    let data = data.ok_or_else(|| {
        VectorError::invalid_argument(format!("no vector data supplied for {} vectors", count))
    })?;
    if dimension == 0 {
        return Err(VectorError::invalid_argument(
            "dimension must be positive when migrating vectors",
        ));
    }
    let needed = count.checked_mul(dimension).ok_or_else(|| {
        VectorError::invalid_argument(format!("{} vectors of dimension {} overflows", count, dimension))
    })?;
    if data.len() < needed {
        return Err(VectorError::invalid_argument(format!(
            "vector buffer holds {} floats, need {}",
            data.len(),
            needed
        )));
    }
    Ok(())
}

fn run_worker(shared: &MigrationShared, job: Job) {
    shared.state.lock().status = MigrationStatus::Running;
    let index_type = job.index_type;

    match catch_unwind(AssertUnwindSafe(|| build(shared, &job))) {
        Ok(Ok(BuildOutcome::Built(index))) => {
            shared.finish(MigrationStatus::Completed, Some(index), "");
            info!(
                target: "stratavec::migration",
                index_type = %index_type,
                total_vectors = shared.total_vectors,
                elapsed_us = shared.elapsed_us(),
                "Migration completed"
            );
        }
        Ok(Ok(BuildOutcome::Cancelled)) => {
            shared.finish(MigrationStatus::Cancelled, None, "");
            info!(
                target: "stratavec::migration",
                index_type = %index_type,
                "Migration cancelled"
            );
        }
        Ok(Err(e)) => {
            let message = match e {
                VectorError::BuildFailed { message } => message,
                other => other.to_string(),
            };
            warn!(
                target: "stratavec::migration",
                index_type = %index_type,
                error = %message,
                "Migration failed"
            );
            shared.finish(MigrationStatus::Failed, None, &message);
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "(non-string panic)".to_string());
            error!(
                target: "stratavec::migration",
                index_type = %index_type,
                "index builder panicked: {}",
                message
            );
            shared.finish(
                MigrationStatus::Failed,
                None,
                &format!("index builder panicked: {}", message),
            );
        }
    }
}

fn build(shared: &MigrationShared, job: &Job) -> VectorResult<BuildOutcome> {
    let cancelled = || shared.cancel_requested.load(Ordering::Acquire);
    let batch_size = if job.options.batch_size > 0 {
        job.options.batch_size
    } else {
        MigrationConfig::default().batch_size
    };

    let mut builder = job
        .options
        .registry
        .create(job.index_type, job.dimension, &job.config)?;

    let rows: &[f32] = match &job.data {
        Some(data) if job.count > 0 => &data[..job.count * job.dimension],
        _ => &[],
    };

    if builder.needs_training() && !rows.is_empty() {
        if cancelled() {
            return Ok(BuildOutcome::Cancelled);
        }
        builder.train(rows)?;
    }

    for (i, row) in rows.chunks_exact(job.dimension.max(1)).enumerate() {
        if cancelled() {
            shared.publish_progress(i as u64);
            return Ok(BuildOutcome::Cancelled);
        }
        builder.insert(VectorId(i as u64), row)?;

        let migrated = i + 1;
        if migrated % batch_size == 0 {
            shared.publish_progress(migrated as u64);
        }
    }
    shared.publish_progress(job.count as u64);

    Ok(BuildOutcome::Built(builder.finish()?))
}

fn unix_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
