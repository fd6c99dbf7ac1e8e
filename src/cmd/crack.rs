use crate::reports;
use clap::Args;
use maskforge::config::MaskConfig;
use maskforge::engine::{Consumer, NodeSpec, RunOutcome, WorkerSlot};
use maskforge::error::PartitionError;
use maskforge::{MaskError, MaskResult, MaskSession};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Args, Debug, Clone)]
pub struct CrackArgs {
    #[command(flatten)]
    pub mask: MaskConfig,

    /// CSV of `label,sha256-hex` rows.
    #[arg(short, long)]
    pub targets: PathBuf,

    /// Local workers splitting this node's share (0 = all cores).
    #[arg(short = 'j', long, default_value_t = 0)]
    pub threads: usize,
}

#[derive(Debug, Clone)]
pub struct Hit {
    pub label: String,
    pub candidate: Vec<u8>,
    pub node: Option<NodeSpec>,
    pub worker: WorkerSlot,
}

/// Shared between workers: digests still being searched for and what was
/// found so far.
struct Hunt {
    targets: HashMap<[u8; 32], String>,
    hits: Mutex<Vec<Hit>>,
    done: AtomicBool,
}

struct DigestChecker<'a> {
    hunt: &'a Hunt,
    node: Option<NodeSpec>,
    worker: WorkerSlot,
    checked: u64,
}

impl Consumer for DigestChecker<'_> {
    fn process(&mut self, candidate: &[u8]) -> bool {
        if self.hunt.done.load(Ordering::Relaxed) {
            return true;
        }
        self.checked += 1;
        let digest: [u8; 32] = Sha256::digest(candidate).into();
        if let Some(label) = self.hunt.targets.get(&digest) {
            let mut hits = self.hunt.hits.lock().unwrap_or_else(|e| e.into_inner());
            if !hits.iter().any(|h| &h.label == label) {
                info!("Found {} on worker {}", label, self.worker);
                hits.push(Hit {
                    label: label.clone(),
                    candidate: candidate.to_vec(),
                    node: self.node,
                    worker: self.worker,
                });
            }
            if hits.len() == self.hunt.targets.len() {
                self.hunt.done.store(true, Ordering::Relaxed);
                return true;
            }
        }
        false
    }
}

pub fn load_targets<P: AsRef<Path>>(path: P) -> MaskResult<HashMap<[u8; 32], String>> {
    let file = File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(file);

    let mut targets = HashMap::new();
    for record in rdr.records() {
        let record = record?;
        if record.len() < 2 {
            continue;
        }
        let label = record[0].trim().to_string();
        let digest = hex::decode(record[1].trim())
            .ok()
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .ok_or_else(|| {
                MaskError::Config(format!("target {} is not a SHA-256 hex digest", label))
            })?;
        targets.insert(digest, label);
    }
    if targets.is_empty() {
        return Err(MaskError::Config("no targets loaded".to_string()));
    }
    Ok(targets)
}

pub fn run(args: &CrackArgs, config: MaskConfig) -> MaskResult<()> {
    if config.stacked {
        return Err(MaskError::Config(
            "crack runs pure masks only; stacked masks need a parent mode".to_string(),
        ));
    }
    let hunt = Hunt {
        targets: load_targets(&args.targets)?,
        hits: Mutex::new(Vec::new()),
        done: AtomicBool::new(false),
    };
    info!("Loaded {} targets", hunt.targets.len());

    let threads = if args.threads == 0 {
        rayon::current_num_threads()
    } else {
        args.threads
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| MaskError::Config(e.to_string()))?;
    let start = Instant::now();
    let checked: MaskResult<Vec<u64>> = pool.install(|| {
        (0..threads as u32)
            .into_par_iter()
            .map(|i| run_worker(&config, WorkerSlot::new(i, threads as u32)?, &hunt))
            .collect()
    });
    let checked: u64 = checked?.iter().sum();

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "Checked {} candidates in {:.2}s ({:.2}M/s)",
        checked,
        elapsed,
        checked as f64 / elapsed.max(1e-9) / 1e6
    );

    let hits = hunt.hits.into_inner().unwrap_or_else(|e| e.into_inner());
    let missing = hunt.targets.len() - hits.len();
    reports::print_hits(&hits, config.encoding);
    if missing > 0 {
        warn!("{} of {} targets not found", missing, hunt.targets.len());
    }
    Ok(())
}

/// Runs one worker's piece of the configured node (the whole run when no
/// node is set).
fn run_worker(config: &MaskConfig, worker: WorkerSlot, hunt: &Hunt) -> MaskResult<u64> {
    let mut options = config.to_options();
    options.worker = Some(worker);
    let mut session = match MaskSession::new(options) {
        Ok(session) => session,
        Err(MaskError::Partition(PartitionError::NoWorkForNode { .. })) => {
            debug!("Worker {} has nothing to do", worker);
            return Ok(0);
        }
        Err(e) => return Err(e),
    };

    let mut checker = DigestChecker {
        hunt,
        node: config.node,
        worker,
        checked: 0,
    };
    let outcome = session.run(&mut checker)?;
    debug!("Worker {} finished: {:?}", worker, outcome);
    if outcome == RunOutcome::Stopped {
        debug!("Worker {} stopped at {:.2}%", worker, session.progress());
    }
    Ok(checker.checked)
}
