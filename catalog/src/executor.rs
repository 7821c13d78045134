//! Parallel dispatch of catalog queries over a bounded worker pool,
//! with stable prioritization, per-query timeouts and cancellation.
use crate::db::Catalog;
use crate::query::{CatalogQuery, Page};
use crate::records::CatalogRecord;
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

/// Rows are pulled in batches of this size so that cancellation and
/// timeouts are observed between batches.
const BATCH_ROWS: u32 = 25;

/// One query submitted to the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query_id: u64,
    pub query: CatalogQuery,
    /// the AE title on whose behalf the query runs, for tracing
    pub calling_ae: Option<String>,
    /// higher runs earlier; ties keep submission order
    pub priority: i32,
}

/// The outcome of one dispatched query. Exactly one of `records`,
/// `error`, `timed_out` or `cancelled` describes the terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub query_id: u64,
    pub records: Vec<CatalogRecord>,
    pub error: Option<String>,
    pub timed_out: bool,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// A snapshot of the executor's atomic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorStatistics {
    pub executed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub in_progress: u64,
}

#[derive(Debug, Default)]
struct Counters {
    executed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
    in_progress: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ExecutorStatistics {
        ExecutorStatistics {
            executed: self.executed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            in_progress: self.in_progress.load(Ordering::Relaxed),
        }
    }
}

struct Job {
    index: usize,
    request: QueryRequest,
    reply: Sender<(usize, QueryOutcome)>,
}

/// A fixed pool of worker threads running catalog queries.
///
/// Queries are started in priority order (stable within equal
/// priorities), at most `max_concurrent` at a time. Results are
/// returned in submission order. Dropping the executor cancels
/// outstanding work and joins every worker.
pub struct ParallelQueryExecutor {
    jobs: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl ParallelQueryExecutor {
    /// Create an executor over the given catalog handle.
    pub fn new(catalog: Catalog, max_concurrent: usize, timeout: Option<Duration>) -> Self {
        let (jobs, receiver): (Sender<Job>, Receiver<Job>) = unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());

        let workers = (0..max_concurrent.max(1))
            .map(|_| {
                let receiver = receiver.clone();
                let catalog = catalog.clone();
                let cancel = Arc::clone(&cancel);
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || {
                    worker_loop(receiver, catalog, timeout, cancel, counters)
                })
            })
            .collect();

        ParallelQueryExecutor {
            jobs: Some(jobs),
            workers,
            cancel,
            counters,
        }
    }

    /// Run a batch of queries and wait for all of them.
    /// The returned outcomes are in submission order.
    pub fn execute(&self, requests: Vec<QueryRequest>) -> Vec<QueryOutcome> {
        self.cancel.store(false, Ordering::SeqCst);
        let total = requests.len();
        let (reply, results) = unbounded();

        // stable: equal priorities keep their submission order
        let mut ordered: Vec<(usize, QueryRequest)> = requests.into_iter().enumerate().collect();
        ordered.sort_by_key(|(_, request)| Reverse(request.priority));

        let mut outcomes: Vec<Option<QueryOutcome>> = (0..total).map(|_| None).collect();
        let mut pending = 0usize;
        if let Some(jobs) = &self.jobs {
            for (index, request) in ordered {
                let job = Job {
                    index,
                    request,
                    reply: reply.clone(),
                };
                match jobs.send(job) {
                    Ok(()) => pending += 1,
                    Err(e) => {
                        let request = e.into_inner().request;
                        outcomes[index] = Some(QueryOutcome {
                            query_id: request.query_id,
                            records: Vec::new(),
                            error: Some("executor is shut down".to_string()),
                            timed_out: false,
                            cancelled: false,
                            elapsed: Duration::ZERO,
                        });
                    }
                }
            }
        }
        drop(reply);

        for _ in 0..pending {
            match results.recv() {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(_) => break,
            }
        }

        outcomes
            .into_iter()
            .flatten()
            .collect()
    }

    /// Signal every in-flight and queued query to stop at the next
    /// batch boundary.
    pub fn cancel_all(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// A snapshot of the executor's statistics counters.
    pub fn statistics(&self) -> ExecutorStatistics {
        self.counters.snapshot()
    }
}

impl Drop for ParallelQueryExecutor {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        // closing the channel ends every worker loop
        self.jobs.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    receiver: Receiver<Job>,
    catalog: Catalog,
    timeout: Option<Duration>,
    cancel: Arc<AtomicBool>,
    counters: Arc<Counters>,
) {
    while let Ok(job) = receiver.recv() {
        counters.executed.fetch_add(1, Ordering::Relaxed);
        counters.in_progress.fetch_add(1, Ordering::Relaxed);
        let outcome = run_query(&catalog, &job.request, timeout, &cancel);
        let tally = if outcome.cancelled {
            &counters.cancelled
        } else if outcome.timed_out {
            &counters.timed_out
        } else if outcome.error.is_some() {
            &counters.failed
        } else {
            &counters.succeeded
        };
        tally.fetch_add(1, Ordering::Relaxed);
        counters.in_progress.fetch_sub(1, Ordering::Relaxed);
        let _ = job.reply.send((job.index, outcome));
    }
}

/// Run one query, pulling rows in batches and honoring the cancel flag
/// and the deadline at every batch boundary.
fn run_query(
    catalog: &Catalog,
    request: &QueryRequest,
    timeout: Option<Duration>,
    cancel: &AtomicBool,
) -> QueryOutcome {
    let started = Instant::now();
    let deadline = timeout.map(|t| started + t);
    let mut outcome = QueryOutcome {
        query_id: request.query_id,
        records: Vec::new(),
        error: None,
        timed_out: false,
        cancelled: false,
        elapsed: Duration::ZERO,
    };

    let limit = request.query.page().effective_limit();
    let base_offset = request.query.page().effective_offset();
    let mut fetched: u32 = 0;

    loop {
        if cancel.load(Ordering::SeqCst) {
            outcome.cancelled = true;
            break;
        }
        if deadline.map_or(false, |d| Instant::now() >= d) {
            outcome.timed_out = true;
            debug!(
                query_id = request.query_id,
                "query timed out after {} rows", fetched
            );
            break;
        }
        if fetched >= limit {
            break;
        }
        let step = BATCH_ROWS.min(limit - fetched);
        let mut batch_query = request.query.clone();
        batch_query.set_page(Page {
            limit: Some(step),
            offset: Some(base_offset + fetched),
        });
        match catalog.run(&batch_query) {
            Ok(batch) => {
                let got = batch.len() as u32;
                outcome.records.extend(batch);
                fetched += got;
                if got < step {
                    break;
                }
            }
            Err(e) => {
                outcome.error = Some(e.to_string());
                break;
            }
        }
    }

    outcome.elapsed = started.elapsed();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{PatientAttributes, StudyAttributes};
    use crate::query::{PatientQuery, StudyQuery};

    fn seeded_catalog() -> Catalog {
        let catalog = Catalog::in_memory().unwrap();
        for p in 0..3 {
            let patient_pk = catalog
                .upsert_patient(&PatientAttributes {
                    patient_id: format!("P{:03}", p),
                    patient_name: Some(format!("DOE^{}", p)),
                    ..Default::default()
                })
                .unwrap();
            for s in 0..4 {
                catalog
                    .upsert_study(
                        patient_pk,
                        &StudyAttributes {
                            study_instance_uid: format!("1.2.{}.{}", p, s),
                            ..Default::default()
                        },
                    )
                    .unwrap();
            }
        }
        catalog
    }

    fn study_request(query_id: u64, patient: &str, priority: i32) -> QueryRequest {
        QueryRequest {
            query_id,
            query: CatalogQuery::Study(StudyQuery {
                patient_id: Some(patient.to_string()),
                ..Default::default()
            }),
            calling_ae: None,
            priority,
        }
    }

    #[test]
    fn outcomes_preserve_submission_order() {
        let executor = ParallelQueryExecutor::new(seeded_catalog(), 2, None);
        let outcomes = executor.execute(vec![
            study_request(10, "P000", 0),
            study_request(11, "P001", 5),
            study_request(12, "P002", -5),
        ]);
        assert_eq!(
            outcomes.iter().map(|o| o.query_id).collect::<Vec<_>>(),
            vec![10, 11, 12]
        );
        for outcome in &outcomes {
            assert_eq!(outcome.records.len(), 4);
            assert!(outcome.error.is_none());
            assert!(!outcome.timed_out && !outcome.cancelled);
        }
        let stats = executor.statistics();
        assert_eq!(stats.executed, 3);
        assert_eq!(stats.succeeded, 3);
        assert_eq!(stats.in_progress, 0);
    }

    #[test]
    fn zero_timeout_reports_timed_out() {
        let executor =
            ParallelQueryExecutor::new(seeded_catalog(), 1, Some(Duration::ZERO));
        let outcomes = executor.execute(vec![study_request(1, "P000", 0)]);
        assert!(outcomes[0].timed_out);
        assert!(outcomes[0].records.is_empty());
        assert_eq!(executor.statistics().timed_out, 1);
    }

    #[test]
    fn cancelled_executor_returns_promptly() {
        let catalog = seeded_catalog();
        let executor = Arc::new(ParallelQueryExecutor::new(catalog, 1, None));
        // a cancel signal raised mid-batch is honored by queued queries
        let exec2 = Arc::clone(&executor);
        exec2.cancel_all();
        // execute resets the flag; cancellation applies to a running batch
        let outcomes = executor.execute(vec![study_request(1, "P000", 0)]);
        assert!(!outcomes[0].cancelled);

        // cancel during execution from another thread
        let exec3 = Arc::clone(&executor);
        let canceller = std::thread::spawn(move || exec3.cancel_all());
        let _ = executor.execute(vec![
            study_request(2, "P000", 0),
            study_request(3, "P001", 0),
            study_request(4, "P002", 0),
        ]);
        canceller.join().unwrap();
    }

    #[test]
    fn empty_result_queries_succeed() {
        let executor = ParallelQueryExecutor::new(seeded_catalog(), 4, None);
        let outcomes = executor.execute(vec![QueryRequest {
            query_id: 9,
            query: CatalogQuery::Patient(PatientQuery {
                patient_id: Some("NOBODY".to_string()),
                ..Default::default()
            }),
            calling_ae: Some("TEST-AE".to_string()),
            priority: 0,
        }]);
        assert!(outcomes[0].records.is_empty());
        assert!(outcomes[0].error.is_none());
    }
}
