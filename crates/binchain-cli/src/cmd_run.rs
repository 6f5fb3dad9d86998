/// Implementation of `binchain run`.
///
/// Parses the layout, runs it over the file with either parser and prints
/// the captured values. In stream mode the file is cut into
/// `--chunk-size` pieces and fed through a channel, the same way a network
/// source would deliver it.
use std::fs;

use anyhow::{Context, Result, ensure};
use binchain_decoder::{BufferParser, ParserConfig, SourceEvent, StreamParser, Vars};
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::RunArgs;
use crate::layout::{self, Step};
use crate::report::{self, Mode, Outcome, Report};

/// Events buffered between the file feeder and the parser.
const CHANNEL_DEPTH: usize = 16;

struct Finished {
    outcome: Outcome,
    waiting_for: Option<usize>,
    consumed: usize,
    vars: Vars,
}

/// Run the `binchain run` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the layout is invalid, or
/// the parse fails (unknown variable, bad length, `find` giving up).
/// Running out of input is reported, not treated as an error.
pub fn run(args: &RunArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let steps = layout::parse(&args.layout)?;

    let mut config = ParserConfig::default();
    if let Some(limit) = args.scan_limit {
        config = config.find_scan_limit(Some(limit));
    }
    debug!(steps = steps.len(), bytes = bytes.len(), stream = args.stream, "running layout");

    let (mode, finished) = if args.stream {
        ensure!(args.chunk_size > 0, "--chunk-size must be at least 1");
        let finished = run_stream(Bytes::from(bytes), &steps, config, args.chunk_size)
            .with_context(|| format!("failed to parse {}", args.file.display()))?;
        (Mode::Stream, finished)
    } else {
        let finished = run_buffer(bytes, &steps, config)
            .with_context(|| format!("failed to parse {}", args.file.display()))?;
        (Mode::Buffer, finished)
    };

    let report = Report {
        mode,
        outcome: finished.outcome,
        waiting_for: finished.waiting_for,
        consumed: finished.consumed,
        vars: &finished.vars,
    };

    if args.json {
        println!("{}", report::render_json(&report)?);
    } else {
        print!("{}", report::render_text(&report));
    }
    Ok(())
}

fn run_buffer(bytes: Vec<u8>, steps: &[Step], config: ParserConfig) -> Result<Finished> {
    let mut parser = BufferParser::with_config(bytes, config);
    layout::run_buffer(steps, &mut parser)?;

    Ok(Finished {
        outcome: Outcome::Complete,
        waiting_for: None,
        consumed: parser.offset(),
        vars: parser.into_vars(),
    })
}

fn run_stream(
    bytes: Bytes,
    steps: &[Step],
    config: ParserConfig,
    chunk_size: usize,
) -> Result<Finished> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("cannot start runtime")?;

    runtime.block_on(async {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let feeder = tokio::spawn(async move {
            for start in (0..bytes.len()).step_by(chunk_size) {
                let end = (start + chunk_size).min(bytes.len());
                // the parser hung up after an error
                if tx.send(SourceEvent::data(bytes.slice(start..end))).await.is_err() {
                    debug!(at = start, "parser hung up, feeder stopping");
                    return;
                }
            }
            // same: the parser stopped before reading the end event
            if tx.send(SourceEvent::End).await.is_err() {
                debug!("parser hung up before end of input");
            }
        });

        let mut parser = StreamParser::with_config(config);
        layout::declare(steps, &mut parser);
        let state = parser.run(rx).await?;
        feeder.await.context("feeder task failed")?;

        Ok::<_, anyhow::Error>(Finished {
            outcome: Outcome::from(state),
            waiting_for: parser.pending().map(|p| p.bytes),
            consumed: parser.consumed(),
            vars: parser.into_vars(),
        })
    })
}
