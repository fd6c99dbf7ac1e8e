use clap::Args;
use maskforge::charset::Encoding;
use maskforge::config::MaskConfig;
use maskforge::engine::{CheckpointRecord, Consumer, RunOutcome};
use maskforge::{MaskError, MaskResult, MaskSession};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub mask: MaskConfig,

    /// Session file: resumed when present, removed once the run completes.
    #[arg(short, long)]
    pub session: Option<PathBuf>,

    #[arg(long, default_value_t = 1_000_000)]
    pub save_every: u64,

    /// Stop after this many candidates.
    #[arg(short, long)]
    pub limit: Option<u64>,

    /// Parent wordlist spliced into `?w`/`?W` (stacked mode).
    #[arg(short, long)]
    pub words: Option<PathBuf>,

    /// Print codepage bytes as is instead of converting them to UTF-8.
    #[arg(long, default_value_t = false)]
    pub raw: bool,
}

/// Writes one candidate per line. A failed write stops the run and is
/// reported after the odometer returns.
struct LineWriter<W: Write> {
    out: W,
    decode: Option<Encoding>,
    emitted: u64,
    stop_at: Option<u64>,
    error: Option<io::Error>,
}

impl<W: Write> LineWriter<W> {
    fn new(out: W, encoding: Encoding, raw: bool) -> Self {
        Self {
            out,
            decode: Some(encoding).filter(|e| e.is_codepage() && !raw),
            emitted: 0,
            stop_at: None,
            error: None,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl<W: Write> Consumer for LineWriter<W> {
    fn process(&mut self, candidate: &[u8]) -> bool {
        if self.stop_at == Some(self.emitted) {
            return true;
        }
        let written = match self.decode {
            Some(encoding) => writeln!(self.out, "{}", encoding.to_utf8_lossy(candidate)),
            None => self
                .out
                .write_all(candidate)
                .and_then(|_| self.out.write_all(b"\n")),
        };
        match written {
            Ok(()) => {
                self.emitted += 1;
                false
            }
            Err(e) => {
                self.error = Some(e);
                true
            }
        }
    }
}

pub fn run(args: &GenerateArgs, config: MaskConfig) -> MaskResult<()> {
    let mut session = MaskSession::new(config.to_options())?;
    let stdout = io::stdout();
    let mut writer = LineWriter::new(BufWriter::new(stdout.lock()), config.encoding, args.raw);

    if config.stacked {
        run_stacked(args, &mut session, &mut writer)?;
    } else {
        run_pure(args, &mut session, &mut writer)?;
    }

    match writer.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e.into()),
        _ => Ok(()),
    }
}

fn run_pure<W: Write>(
    args: &GenerateArgs,
    session: &mut MaskSession,
    writer: &mut LineWriter<W>,
) -> MaskResult<()> {
    if let Some(path) = args.session.as_ref().filter(|p| p.exists()) {
        let record = CheckpointRecord::load_from_file(path)?;
        session.restore(&record)?;
    }

    loop {
        let window = [
            args.limit.map(|l| l.saturating_sub(writer.emitted)),
            args.session.as_ref().map(|_| args.save_every.max(1)),
        ]
        .into_iter()
        .flatten()
        .min();

        let outcome = session.run_for(writer, window)?;

        if let Some(e) = writer.error.take() {
            save_session(args, session)?;
            if e.kind() == io::ErrorKind::BrokenPipe {
                info!("Output closed after {} candidates", writer.emitted);
                return Ok(());
            }
            return Err(e.into());
        }

        match outcome {
            RunOutcome::Paused => {
                writer.flush()?;
                save_session(args, session)?;
                if args.limit == Some(writer.emitted) {
                    info!("Limit of {} candidates reached", writer.emitted);
                    return Ok(());
                }
            }
            RunOutcome::Stopped => {
                save_session(args, session)?;
                return Ok(());
            }
            RunOutcome::Exhausted | RunOutcome::QuotaReached => {
                if let Some(path) = args.session.as_ref().filter(|p| p.exists()) {
                    fs::remove_file(path)?;
                }
                info!("Done: {} candidates", writer.emitted);
                return Ok(());
            }
        }
    }
}

fn save_session(args: &GenerateArgs, session: &MaskSession) -> MaskResult<()> {
    if let Some(path) = &args.session {
        session.checkpoint().save_to_file(path)?;
        info!(
            "Session saved to {} ({:.2}% done)",
            path.display(),
            session.progress()
        );
    }
    Ok(())
}

fn run_stacked<W: Write>(
    args: &GenerateArgs,
    session: &mut MaskSession,
    writer: &mut LineWriter<W>,
) -> MaskResult<()> {
    if args.session.is_some() {
        return Err(MaskError::Config(
            "sessions are only supported in pure mask mode".to_string(),
        ));
    }
    let Some(path) = &args.words else {
        return Err(MaskError::Config(
            "stacked mode needs a parent wordlist (--words)".to_string(),
        ));
    };

    let budget = session.parent_length_budget();
    if let Some(b) = budget {
        info!(
            "Parent word lengths {}..={}",
            b.min.unwrap_or(0),
            b.max
        );
    }
    writer.stop_at = args.limit;
    let encoding = session.options().encoding;

    for line in BufReader::new(File::open(path)?).lines() {
        let line = line?;
        let word = match encoding.from_utf8(line.trim_end_matches('\r')) {
            Ok(word) => word,
            Err(e) => {
                warn!("Skipping word {:?}: {}", line, e);
                continue;
            }
        };
        if let Some(b) = budget {
            if word.len() > b.max || b.min.is_some_and(|m| word.len() < m) {
                continue;
            }
        }

        let outcome = session.run_word(&word, writer)?;
        if let Some(e) = writer.error.take() {
            if e.kind() == io::ErrorKind::BrokenPipe {
                return Ok(());
            }
            return Err(e.into());
        }
        if outcome == RunOutcome::Stopped {
            break;
        }
    }
    info!("Done: {} candidates", writer.emitted);
    Ok(())
}
