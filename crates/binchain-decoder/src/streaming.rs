use std::collections::VecDeque;
use std::fmt;

use binchain_types::{Len, Vars};
use binchain_wire::{ByteAccumulator, WordOp};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::config::{DEFAULT_EVENT, ParserConfig};
use crate::error::ParseError;
use crate::find::{self, Scan};
use crate::terminator::Terminator;

/// Read size used by [`StreamParser::read_from`].
const READ_CHUNK: usize = 4096;

type TapFn = Box<dyn FnOnce(&mut Chain, &mut Vars) -> Result<(), ParseError>>;
type LoopFn = Box<dyn FnMut(&mut Chain, &Terminator, &mut Vars) -> Result<(), ParseError>>;
type FindFn = Box<dyn FnOnce(&mut Chain, &mut Vars, Bytes) -> Result<(), ParseError>>;

/// An event from the byte source.
///
/// The parser consumes `Data` events whose name matches
/// [`ParserConfig::event`] and ignores the rest. `End` closes the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceEvent {
  Data { event: String, chunk: Bytes },
  End,
}

impl SourceEvent {
  /// A chunk on the default `"data"` event.
  pub fn data(chunk: impl Into<Bytes>) -> Self {
    Self::named(DEFAULT_EVENT, chunk)
  }

  pub fn named(event: impl Into<String>, chunk: impl Into<Bytes>) -> Self {
    Self::Data {
      event: event.into(),
      chunk: chunk.into(),
    }
  }
}

/// Lifecycle of a [`StreamParser`].
///
/// ```text
///              push / resume
///   Active ◄──────────────────► Done
///     │  │                        │
///     │  │ end() with a           │ end()
///     │  │ pending read           ▼
///     │  └──────────► Stalled   Ended
///     │
///     └─ callback / lookup error ──► Failed
/// ```
///
/// `Stalled` and `Failed` are terminal. Declaring new operations on a
/// `Done` or `Ended` parser moves it back to `Active`; on an ended input
/// the first read among them stalls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
  /// Running, or waiting on a pending read.
  Active,
  /// Every declared operation has completed; input is still open.
  Done,
  /// Every declared operation has completed and the input has ended.
  Ended,
  /// The input ended while a read was still pending. Nothing will resume
  /// the parse; [`StreamParser::pending`] shows what it was waiting for.
  Stalled,
  /// An operation failed. The error was returned from the call that
  /// drove it.
  Failed,
}

/// The single outstanding demand for bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRead {
  /// How many ready bytes the parser needs before it can continue.
  pub bytes: usize,
  /// The bytes will be consumed without being stored (`skip`, `find`).
  pub discard: bool,
}

enum Read {
  Word { name: String, op: WordOp },
  Buffer { name: String, len: Len },
  Skip { len: Len },
}

enum Op {
  Read(Read),
  Tap(TapFn),
  Loop(LoopFn),
  Flush,
  Find { pattern: Bytes, then: FindFn },
}

impl Op {
  fn label(&self) -> &'static str {
    match self {
      Op::Read(Read::Word { op, .. }) => op.name(),
      Op::Read(Read::Buffer { .. }) => "buffer",
      Op::Read(Read::Skip { .. }) => "skip",
      Op::Tap(_) => "tap",
      Op::Loop(_) => "repeat",
      Op::Flush => "flush",
      Op::Find { .. } => "find",
    }
  }
}

/// A sequence of declared operations.
///
/// Callbacks given to `tap`, `repeat` and `find` receive a fresh `Chain`
/// and declare their sub-sequence on it. Declaring does nothing by
/// itself: the parser runs the operations in order once the callback
/// returns, and the whole sub-sequence completes before the enclosing
/// sequence moves on.
#[derive(Default)]
pub struct Chain {
  ops: VecDeque<Op>,
}

impl Chain {
  fn push(&mut self, op: Op) -> &mut Self {
    self.ops.push_back(op);
    self
  }

  /// Read one word under `op` and store it under `name`.
  pub fn word(&mut self, name: impl Into<String>, op: WordOp) -> &mut Self {
    self.push(Op::Read(Read::Word {
      name: name.into(),
      op,
    }))
  }

  word_methods!(&mut Self);

  /// Store the next `len` bytes under `name`. A variable name for `len`
  /// is looked up when the read runs.
  pub fn buffer(&mut self, name: impl Into<String>, len: impl Into<Len>) -> &mut Self {
    self.push(Op::Read(Read::Buffer {
      name: name.into(),
      len: len.into(),
    }))
  }

  /// Consume `len` bytes without storing them.
  pub fn skip(&mut self, len: impl Into<Len>) -> &mut Self {
    self.push(Op::Read(Read::Skip { len: len.into() }))
  }

  /// Open a nested sub-sequence once the parse reaches this point.
  ///
  /// `f` sees every value captured so far and may declare further
  /// operations on the chain it is given, typically conditionally.
  pub fn tap<F>(&mut self, f: F) -> &mut Self
  where
    F: FnOnce(&mut Chain, &mut Vars) -> Result<(), ParseError> + 'static,
  {
    self.push(Op::Tap(Box::new(f)))
  }

  /// Repeat a sub-sequence until the [`Terminator`] is invoked.
  ///
  /// `f` is called at the start of every iteration to declare that
  /// iteration's operations. Once they complete, the loop restarts unless
  /// the terminator was invoked, either by `f` itself or by a nested
  /// callback holding a clone of it.
  #[doc(alias = "loop")]
  pub fn repeat<F>(&mut self, f: F) -> &mut Self
  where
    F: FnMut(&mut Chain, &Terminator, &mut Vars) -> Result<(), ParseError> + 'static,
  {
    self.push(Op::Loop(Box::new(f)))
  }

  /// Drop every stored variable.
  pub fn flush(&mut self) -> &mut Self {
    self.push(Op::Flush)
  }

  /// Consume bytes up to and including the next occurrence of `pattern`.
  ///
  /// `f` receives the bytes skipped before the match and may declare a
  /// sub-sequence like [`tap`](Self::tap).
  pub fn find<F>(&mut self, pattern: impl AsRef<[u8]>, f: F) -> &mut Self
  where
    F: FnOnce(&mut Chain, &mut Vars, Bytes) -> Result<(), ParseError> + 'static,
  {
    self.push(Op::Find {
      pattern: Bytes::copy_from_slice(pattern.as_ref()),
      then: Box::new(f),
    })
  }

  /// Number of operations not yet started.
  #[must_use]
  pub fn len(&self) -> usize {
    self.ops.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }
}

impl fmt::Debug for Chain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.ops.iter().map(Op::label)).finish()
  }
}

enum FrameKind {
  Root,
  Tap,
  Loop {
    body: LoopFn,
    terminator: Terminator,
    iterations: usize,
  },
}

struct Frame {
  chain: Chain,
  kind: FrameKind,
}

/// Outcome of running one operation.
enum Step {
  Continue,
  Wait,
  Finished,
}

/// Incremental parser over an event-driven byte source.
///
/// Operations are declared up front (or from callbacks as the parse
/// proceeds) and run in order as bytes arrive. A read that needs more
/// bytes than are buffered becomes the single [`PendingRead`] and the
/// parse suspends; the next [`push`](Self::push) that makes enough bytes
/// ready resumes it, inside that same call.
///
/// Nested sequences live on a frame stack:
///
/// ```text
///   ┌──────────────────────────┐
///   │ Loop frame  [word8, tap] │ ◄── running
///   ├──────────────────────────┤
///   │ Root frame  [word16le]   │ ◄── resumes once the loop ends
///   └──────────────────────────┘
/// ```
///
/// # Example
///
/// ```rust
/// use binchain_decoder::{StreamParser, StreamState};
///
/// let mut parser = StreamParser::new();
/// parser.word16be("len").buffer("body", "len");
///
/// parser.push(&b"\x00"[..])?;
/// parser.push(&b"\x03ab"[..])?;
/// assert_eq!(parser.state(), StreamState::Active);
///
/// parser.push(&b"c"[..])?;
/// assert_eq!(parser.state(), StreamState::Done);
/// assert_eq!(&parser.vars().get_bytes("body")?.unwrap()[..], b"abc");
/// # Ok::<(), binchain_decoder::ParseError>(())
/// ```
pub struct StreamParser {
  acc: ByteAccumulator,
  vars: Vars,
  frames: Vec<Frame>,
  pending: Option<PendingRead>,
  /// Bytes an in-progress `find` has already ruled out and consumed.
  find_skipped: Option<BytesMut>,
  state: StreamState,
  input_ended: bool,
  config: ParserConfig,
}

impl Default for StreamParser {
  fn default() -> Self {
    Self::new()
  }
}

impl StreamParser {
  /// A parser listening for `"data"` events.
  #[must_use]
  pub fn new() -> Self {
    Self::with_config(ParserConfig::default())
  }

  /// A parser listening for data events named `event`.
  #[must_use]
  pub fn with_event(event: impl Into<String>) -> Self {
    Self::with_config(ParserConfig::with_event(event))
  }

  #[must_use]
  pub fn with_config(config: ParserConfig) -> Self {
    Self {
      acc: ByteAccumulator::new(),
      vars: Vars::new(),
      frames: vec![Frame {
        chain: Chain::default(),
        kind: FrameKind::Root,
      }],
      pending: None,
      find_skipped: None,
      state: StreamState::Active,
      input_ended: false,
      config,
    }
  }

  #[must_use]
  pub fn config(&self) -> &ParserConfig {
    &self.config
  }

  #[must_use]
  pub fn state(&self) -> StreamState {
    self.state
  }

  #[must_use]
  pub fn is_stalled(&self) -> bool {
    self.state == StreamState::Stalled
  }

  /// Whether every declared operation has completed.
  #[must_use]
  pub fn is_complete(&self) -> bool {
    matches!(self.state, StreamState::Done | StreamState::Ended)
  }

  /// The read the parser is waiting on, if any.
  #[must_use]
  pub fn pending(&self) -> Option<PendingRead> {
    self.pending
  }

  /// Bytes received but not yet consumed.
  #[must_use]
  pub fn buffered(&self) -> usize {
    self.acc.ready()
  }

  /// Bytes consumed so far.
  #[must_use]
  pub fn consumed(&self) -> usize {
    self.acc.consumed()
  }

  #[must_use]
  pub fn vars(&self) -> &Vars {
    &self.vars
  }

  pub fn vars_mut(&mut self) -> &mut Vars {
    &mut self.vars
  }

  #[must_use]
  pub fn into_vars(self) -> Vars {
    self.vars
  }

  // ── Declaration ──────────────────────────────────────────────────────

  fn root(&mut self) -> &mut Chain {
    if matches!(self.state, StreamState::Done | StreamState::Ended) {
      self.set_state(StreamState::Active);
    }
    &mut self.frames[0].chain
  }

  /// Declare a word read on the root sequence. See [`Chain::word`].
  pub fn word(&mut self, name: impl Into<String>, op: WordOp) -> &mut Self {
    self.root().word(name, op);
    self
  }

  word_methods!(&mut Self);

  /// See [`Chain::buffer`].
  pub fn buffer(&mut self, name: impl Into<String>, len: impl Into<Len>) -> &mut Self {
    self.root().buffer(name, len);
    self
  }

  /// See [`Chain::skip`].
  pub fn skip(&mut self, len: impl Into<Len>) -> &mut Self {
    self.root().skip(len);
    self
  }

  /// See [`Chain::tap`].
  pub fn tap<F>(&mut self, f: F) -> &mut Self
  where
    F: FnOnce(&mut Chain, &mut Vars) -> Result<(), ParseError> + 'static,
  {
    self.root().tap(f);
    self
  }

  /// See [`Chain::repeat`].
  #[doc(alias = "loop")]
  pub fn repeat<F>(&mut self, f: F) -> &mut Self
  where
    F: FnMut(&mut Chain, &Terminator, &mut Vars) -> Result<(), ParseError> + 'static,
  {
    self.root().repeat(f);
    self
  }

  /// See [`Chain::flush`].
  pub fn flush(&mut self) -> &mut Self {
    self.root().flush();
    self
  }

  /// See [`Chain::find`].
  pub fn find<F>(&mut self, pattern: impl AsRef<[u8]>, f: F) -> &mut Self
  where
    F: FnOnce(&mut Chain, &mut Vars, Bytes) -> Result<(), ParseError> + 'static,
  {
    self.root().find(pattern, f);
    self
  }

  // ── Input ────────────────────────────────────────────────────────────

  /// Append a chunk and run every operation it makes runnable.
  ///
  /// Once the parser is [`StreamState::Stalled`] or [`StreamState::Failed`]
  /// the chunk is dropped.
  ///
  /// # Errors
  ///
  /// Returns the first error raised by an operation or callback; the
  /// parser is then [`StreamState::Failed`].
  pub fn push(&mut self, chunk: impl Into<Bytes>) -> Result<(), ParseError> {
    let chunk = chunk.into();
    if matches!(self.state, StreamState::Stalled | StreamState::Failed) {
      trace!(len = chunk.len(), state = ?self.state, "chunk dropped");
      return Ok(());
    }
    trace!(len = chunk.len(), buffered = self.acc.ready(), "chunk");
    self.acc.push(chunk);
    self.resume()
  }

  /// Mark the input as ended.
  ///
  /// Operations still runnable from buffered bytes run first. If a read
  /// is left pending the parser is [`StreamState::Stalled`]; this is not
  /// an error.
  ///
  /// # Errors
  ///
  /// Same as [`push`](Self::push).
  pub fn end(&mut self) -> Result<(), ParseError> {
    debug!(buffered = self.acc.ready(), "end of input");
    self.input_ended = true;
    self.resume()
  }

  /// Feed one source event.
  ///
  /// # Errors
  ///
  /// Same as [`push`](Self::push).
  pub fn handle(&mut self, event: SourceEvent) -> Result<(), ParseError> {
    match event {
      SourceEvent::Data { event, chunk } if event == self.config.event => self.push(chunk),
      SourceEvent::Data { event, .. } => {
        trace!(event = %event, "ignored event");
        Ok(())
      }
      SourceEvent::End => self.end(),
    }
  }

  /// Drive the parse from a channel of source events.
  ///
  /// Returns after an `End` event, or once every sender is dropped (which
  /// counts as end of input).
  ///
  /// # Errors
  ///
  /// Same as [`push`](Self::push).
  pub async fn run(
    &mut self,
    mut events: mpsc::Receiver<SourceEvent>,
  ) -> Result<StreamState, ParseError> {
    while let Some(event) = events.recv().await {
      let is_end = event == SourceEvent::End;
      self.handle(event)?;
      if is_end {
        return Ok(self.state);
      }
    }
    self.end()?;
    Ok(self.state)
  }

  /// Drive the parse from an async reader until it reaches EOF.
  ///
  /// # Errors
  ///
  /// [`ParseError::Io`] if a read fails, otherwise the same as
  /// [`push`](Self::push).
  pub async fn read_from<R: AsyncRead + Unpin>(
    &mut self,
    mut reader: R,
  ) -> Result<StreamState, ParseError> {
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    loop {
      buf.reserve(READ_CHUNK);
      let n = reader.read_buf(&mut buf).await?;
      if n == 0 {
        break;
      }
      self.push(buf.split().freeze())?;
    }
    self.end()?;
    Ok(self.state)
  }

  /// Run whatever can run with the bytes already buffered.
  ///
  /// Needed only after declaring more operations on a parser whose input
  /// has already been pushed; `push` and `end` resume on their own.
  ///
  /// # Errors
  ///
  /// Same as [`push`](Self::push).
  pub fn resume(&mut self) -> Result<(), ParseError> {
    if matches!(self.state, StreamState::Stalled | StreamState::Failed) {
      return Ok(());
    }

    match self.run_ops() {
      Ok(Step::Wait) if self.input_ended => {
        warn!(pending = ?self.pending, buffered = self.acc.ready(), "input ended mid-read, parse stalled");
        self.set_state(StreamState::Stalled);
      }
      Ok(Step::Wait | Step::Continue) => self.set_state(StreamState::Active),
      Ok(Step::Finished) if self.input_ended => self.set_state(StreamState::Ended),
      Ok(Step::Finished) => self.set_state(StreamState::Done),
      Err(e) => {
        warn!(error = %e, consumed = self.acc.consumed(), "parse failed");
        self.pending = None;
        self.set_state(StreamState::Failed);
        return Err(e);
      }
    }
    Ok(())
  }

  // ── Dispatch ─────────────────────────────────────────────────────────

  fn set_state(&mut self, state: StreamState) {
    if self.state != state {
      debug!(from = ?self.state, to = ?state, "state");
      self.state = state;
    }
  }

  fn run_ops(&mut self) -> Result<Step, ParseError> {
    loop {
      match self.step()? {
        Step::Continue => {}
        other => return Ok(other),
      }
    }
  }

  fn step(&mut self) -> Result<Step, ParseError> {
    let Some(frame) = self.frames.last_mut() else {
      return Ok(Step::Finished);
    };
    let Some(op) = frame.chain.ops.pop_front() else {
      return self.close_frame();
    };

    match op {
      Op::Read(read) => self.read(read),
      Op::Tap(f) => {
        let mut chain = Chain::default();
        f(&mut chain, &mut self.vars)?;
        self.open(chain, FrameKind::Tap);
        Ok(Step::Continue)
      }
      Op::Loop(mut body) => {
        let terminator = Terminator::new();
        let mut chain = Chain::default();
        body(&mut chain, &terminator, &mut self.vars)?;
        self.open(
          chain,
          FrameKind::Loop {
            body,
            terminator,
            iterations: 1,
          },
        );
        Ok(Step::Continue)
      }
      Op::Flush => {
        trace!(dropped = self.vars.len(), "flush");
        self.vars.clear();
        Ok(Step::Continue)
      }
      Op::Find { pattern, then } => self.scan_find(pattern, then),
    }
  }

  fn open(&mut self, chain: Chain, kind: FrameKind) {
    trace!(depth = self.frames.len(), ops = chain.len(), "open scope");
    self.frames.push(Frame { chain, kind });
  }

  /// Put an operation that cannot run yet back at the head of its frame.
  fn requeue(&mut self, op: Op) {
    if let Some(frame) = self.frames.last_mut() {
      frame.chain.ops.push_front(op);
    }
  }

  /// The innermost frame has run out of operations.
  fn close_frame(&mut self) -> Result<Step, ParseError> {
    let Some(frame) = self.frames.last_mut() else {
      return Ok(Step::Finished);
    };

    let finished = match &frame.kind {
      FrameKind::Root => return Ok(Step::Finished),
      FrameKind::Tap => true,
      FrameKind::Loop { terminator, .. } => terminator.is_terminated(),
    };
    if finished {
      if let FrameKind::Loop { iterations, .. } = frame.kind {
        debug!(iterations, "loop terminated");
      }
      self.frames.pop();
      return Ok(Step::Continue);
    }

    if let FrameKind::Loop {
      body,
      terminator,
      iterations,
    } = &mut frame.kind
    {
      *iterations += 1;
      let mut chain = Chain::default();
      body(&mut chain, terminator, &mut self.vars)?;
      frame.chain = chain;
    }
    Ok(Step::Continue)
  }

  fn read(&mut self, read: Read) -> Result<Step, ParseError> {
    let request = match self.pending {
      Some(request) => request,
      None => {
        let request = match &read {
          Read::Word { op, .. } => PendingRead {
            bytes: op.size(),
            discard: false,
          },
          Read::Buffer { len, .. } => PendingRead {
            bytes: len.resolve(&self.vars)?,
            discard: false,
          },
          Read::Skip { len } => PendingRead {
            bytes: len.resolve(&self.vars)?,
            discard: true,
          },
        };
        self.pending = Some(request);
        request
      }
    };

    if self.acc.ready() < request.bytes {
      trace!(wanted = request.bytes, ready = self.acc.ready(), "suspend");
      self.requeue(Op::Read(read));
      return Ok(Step::Wait);
    }

    self.pending = None;
    match read {
      Read::Word { name, op } => {
        let bytes = self.acc.take(request.bytes)?;
        let value = op.decode(&bytes);
        trace!(name = %name, op = op.name(), value, "word");
        self.vars.set(name, value);
      }
      Read::Buffer { name, .. } => {
        let bytes = self.acc.take(request.bytes)?;
        trace!(name = %name, len = bytes.len(), "buffer");
        self.vars.set(name, bytes);
      }
      Read::Skip { .. } => {
        self.acc.seek(request.bytes)?;
        trace!(len = request.bytes, "skip");
      }
    }
    Ok(Step::Continue)
  }

  fn scan_find(&mut self, pattern: Bytes, then: FindFn) -> Result<Step, ParseError> {
    if let Some(request) = self.pending
      && self.acc.ready() < request.bytes
    {
      self.requeue(Op::Find { pattern, then });
      return Ok(Step::Wait);
    }

    // Ruled-out bytes leave the accumulator as soon as they are scanned,
    // so each pass only sees new bytes plus a partial match at the tail.
    let mut skipped = self.find_skipped.take().unwrap_or_default();
    let base = skipped.len();
    let limit = self
      .config
      .find_scan_limit
      .map(|limit| limit.saturating_sub(base));
    let window = self.acc.slice(self.acc.ready())?;

    match find::scan(&window, &pattern, 0, limit) {
      Scan::Found(at) => {
        self.pending = None;
        skipped.extend_from_slice(&self.acc.take(at)?);
        self.acc.seek(pattern.len())?;
        trace!(skipped = skipped.len(), "find matched");

        let mut chain = Chain::default();
        then(&mut chain, &mut self.vars, skipped.freeze())?;
        self.open(chain, FrameKind::Tap);
        Ok(Step::Continue)
      }
      Scan::NeedMore { resume_at } => {
        skipped.extend_from_slice(&self.acc.take(resume_at)?);
        self.find_skipped = Some(skipped);
        self.pending = Some(PendingRead {
          bytes: self.acc.ready() + 1,
          discard: true,
        });
        self.requeue(Op::Find { pattern, then });
        Ok(Step::Wait)
      }
      Scan::GaveUp { scanned } => Err(ParseError::PatternNotFound {
        pattern: pattern.to_vec(),
        scanned: base + scanned,
      }),
    }
  }
}

impl fmt::Debug for StreamParser {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StreamParser")
      .field("state", &self.state)
      .field("pending", &self.pending)
      .field("buffered", &self.acc.ready())
      .field("depth", &self.frames.len())
      .field("vars", &self.vars)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use std::cell::{Cell, RefCell};
  use std::rc::Rc;

  use binchain_types::TypeError;
  use tokio::io::AsyncWriteExt;

  use super::*;

  fn chunk(hex_str: &str) -> Bytes {
    Bytes::from(hex::decode(hex_str).unwrap())
  }

  #[test]
  fn read_resolves_once_enough_bytes_are_ready() {
    let hits = Rc::new(Cell::new(0));
    let seen = Rc::clone(&hits);

    let mut parser = StreamParser::new();
    parser.buffer("x", 5).tap(move |_, _| {
      seen.set(seen.get() + 1);
      Ok(())
    });

    for part in ["01", "02", "0304"] {
      parser.push(chunk(part)).unwrap();
      assert_eq!(hits.get(), 0);
      assert_eq!(
        parser.pending(),
        Some(PendingRead {
          bytes: 5,
          discard: false
        })
      );
    }

    parser.push(chunk("0506")).unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(parser.pending(), None);
    assert_eq!(parser.state(), StreamState::Done);
    assert_eq!(&parser.vars().get_bytes("x").unwrap().unwrap()[..], &[1, 2, 3, 4, 5]);
    assert_eq!(parser.buffered(), 1);

    parser.push(chunk("07")).unwrap();
    assert_eq!(hits.get(), 1);
  }

  #[test]
  fn word_split_across_chunks() {
    let mut parser = StreamParser::new();
    parser.word32be("n").word16ls("s");
    parser.push(chunk("0001")).unwrap();
    parser.push(chunk("00")).unwrap();
    parser.push(chunk("00ff")).unwrap();
    parser.push(chunk("ff")).unwrap();

    assert!(parser.is_complete());
    assert_eq!(parser.vars().get_number("n").unwrap(), 65_536.0);
    assert_eq!(parser.vars().get_number("s").unwrap(), -1.0);
    assert_eq!(parser.consumed(), 6);
  }

  #[test]
  fn length_from_earlier_variable() {
    let mut parser = StreamParser::new();
    parser.word8("len").buffer("body", "len").skip("len").word8("tail");
    parser.push(chunk("03616263")).unwrap();
    parser.push(chunk("00000007")).unwrap();

    let vars = parser.vars();
    assert_eq!(&vars.get_bytes("body").unwrap().unwrap()[..], b"abc");
    assert_eq!(vars.get_number("tail").unwrap(), 7.0);
  }

  #[test]
  fn skip_is_a_discarding_read() {
    let mut parser = StreamParser::new();
    parser.skip(4);
    parser.push(chunk("00")).unwrap();
    assert_eq!(
      parser.pending(),
      Some(PendingRead {
        bytes: 4,
        discard: true
      })
    );
    assert!(parser.vars().is_empty());
  }

  #[test]
  fn end_mid_read_stalls() {
    let mut parser = StreamParser::new();
    parser.word8("a").word32le("b");
    parser.push(chunk("0102")).unwrap();
    parser.end().unwrap();

    assert!(parser.is_stalled());
    assert_eq!(parser.vars().get_number("a").unwrap(), 1.0);
    assert!(!parser.vars().contains("b"));
    assert_eq!(parser.pending().map(|p| p.bytes), Some(4));

    // nothing resumes a stalled parse
    parser.push(chunk("030405")).unwrap();
    assert!(parser.is_stalled());
  }

  #[test]
  fn done_then_ended() {
    let mut parser = StreamParser::new();
    parser.word8("a");
    parser.push(chunk("01")).unwrap();
    assert_eq!(parser.state(), StreamState::Done);
    parser.end().unwrap();
    assert_eq!(parser.state(), StreamState::Ended);
  }

  #[test]
  fn declaring_after_done_resumes_from_buffer() {
    let mut parser = StreamParser::new();
    parser.word8("a");
    parser.push(chunk("0102")).unwrap();
    assert_eq!(parser.state(), StreamState::Done);

    parser.word8("b");
    assert_eq!(parser.state(), StreamState::Active);
    parser.resume().unwrap();
    assert_eq!(parser.state(), StreamState::Done);
    assert_eq!(parser.vars().get_number("b").unwrap(), 2.0);
  }

  #[test]
  fn flush_clears_earlier_values() {
    let mut parser = StreamParser::new();
    parser.word8("a").flush().word8("b");
    parser.push(chunk("0102")).unwrap();

    assert!(!parser.vars().contains("a"));
    assert_eq!(parser.vars().get_number("b").unwrap(), 2.0);
    assert_eq!(parser.vars().len(), 1);
  }

  #[test]
  fn tap_sees_values_and_runs_before_parent() {
    let mut parser = StreamParser::new();
    parser
      .word8("flag")
      .tap(|chain, vars| {
        if vars.get_number("flag")? == 1.0 {
          chain.word16be("extra");
        }
        Ok(())
      })
      .word8("after");

    parser.push(chunk("01")).unwrap();
    parser.push(chunk("0100")).unwrap();
    parser.push(chunk("09")).unwrap();

    let vars = parser.vars();
    assert_eq!(vars.get_number("extra").unwrap(), 256.0);
    assert_eq!(vars.get_number("after").unwrap(), 9.0);
  }

  #[test]
  fn tap_without_declarations_continues() {
    let mut parser = StreamParser::new();
    parser.tap(|_, vars| {
      vars.set("seen", 1.0);
      Ok(())
    });
    parser.word8("a");
    parser.push(chunk("05")).unwrap();
    assert!(parser.is_complete());
    assert!(parser.vars().contains("seen"));
  }

  #[test]
  fn loop_terminated_on_first_iteration_runs_once() {
    let iterations = Rc::new(Cell::new(0));
    let counter = Rc::clone(&iterations);

    let mut parser = StreamParser::new();
    parser
      .repeat(move |chain, end, _| {
        counter.set(counter.get() + 1);
        chain.word8("x");
        end.terminate();
        Ok(())
      })
      .word8("y");
    parser.push(chunk("0102")).unwrap();

    assert_eq!(iterations.get(), 1);
    assert_eq!(parser.vars().get_number("x").unwrap(), 1.0);
    assert_eq!(parser.vars().get_number("y").unwrap(), 2.0);
  }

  #[test]
  fn loop_terminated_from_nested_tap() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let collected = Rc::clone(&seen);

    let mut parser = StreamParser::new();
    parser
      .repeat(move |chain, end, _| {
        let end = end.clone();
        let collected = Rc::clone(&collected);
        chain.word8("b").tap(move |_, vars| {
          let b = vars.get_number("b")?;
          collected.borrow_mut().push(b);
          if b == 0.0 {
            end.terminate();
          }
          Ok(())
        });
        Ok(())
      })
      .word16le("trailer");

    for byte in ["03", "02", "01", "00", "34", "12"] {
      parser.push(chunk(byte)).unwrap();
    }

    assert_eq!(*seen.borrow(), [3.0, 2.0, 1.0, 0.0]);
    assert_eq!(parser.vars().get_number("trailer").unwrap(), 4660.0);
    assert!(parser.is_complete());
  }

  #[test]
  fn loop_with_length_prefixed_records() {
    let mut parser = StreamParser::new();
    parser.word8("count").repeat(|chain, end, vars| {
      let left = vars.get_number("count")?;
      if left == 0.0 {
        end.terminate();
        return Ok(());
      }
      vars.set("count", left - 1.0);
      chain.word8("len").buffer("rec", "len").tap(|_, vars| {
        let rec = vars.get_bytes("rec")?.cloned().unwrap_or_default();
        let mut all = match vars.get_bytes("all") {
          Ok(Some(bytes)) => bytes.to_vec(),
          _ => Vec::new(),
        };
        all.extend_from_slice(&rec);
        vars.set("all", all);
        Ok(())
      });
      Ok(())
    });

    parser.push(chunk("02026869")).unwrap();
    parser.push(chunk("03")).unwrap();
    parser.push(chunk("796f75")).unwrap();

    assert!(parser.is_complete());
    assert_eq!(&parser.vars().get_bytes("all").unwrap().unwrap()[..], b"hiyou");
  }

  #[test]
  fn find_across_chunk_boundary() {
    let mut parser = StreamParser::new();
    parser.find(b"\xCA\xFE", |chain, vars, skipped| {
      vars.set("skipped", skipped);
      chain.word8("after");
      Ok(())
    });

    parser.push(chunk("0001ca")).unwrap();
    assert!(!parser.is_complete());
    parser.push(chunk("fe07")).unwrap();

    let vars = parser.vars();
    assert_eq!(&vars.get_bytes("skipped").unwrap().unwrap()[..], &[0, 1]);
    assert_eq!(vars.get_number("after").unwrap(), 7.0);
    assert_eq!(parser.consumed(), 5);
  }

  #[test]
  fn find_retries_after_false_start() {
    let mut parser = StreamParser::new();
    parser.find(b"AB", |_, vars, skipped| {
      vars.set("skipped", skipped);
      Ok(())
    });
    parser.push(&b"xA"[..]).unwrap();
    parser.push(&b"AAB"[..]).unwrap();

    assert!(parser.is_complete());
    assert_eq!(&parser.vars().get_bytes("skipped").unwrap().unwrap()[..], b"xAA");
  }

  #[test]
  fn find_beyond_limit_fails() {
    let config = ParserConfig::default().find_scan_limit(Some(2));
    let mut parser = StreamParser::with_config(config);
    parser.find(b"\xAA", |_, _, _| Ok(()));

    let err = parser.push(chunk("00000000")).unwrap_err();
    assert!(matches!(err, ParseError::PatternNotFound { scanned: 3, .. }));
    assert_eq!(parser.state(), StreamState::Failed);
  }

  #[test]
  fn find_unmatched_at_end_stalls() {
    let mut parser = StreamParser::new();
    parser.find(b"\xAA\xBB", |_, _, _| Ok(()));
    parser.push(chunk("0001")).unwrap();
    parser.end().unwrap();
    assert!(parser.is_stalled());
  }

  #[test]
  fn find_consumes_ruled_out_bytes_as_it_goes() {
    let mut parser = StreamParser::new();
    parser.find(b"\xCA\xFE\xBA", |_, vars, skipped| {
      vars.set("skipped", skipped);
      Ok(())
    });

    for _ in 0..100 {
      parser.push(chunk("00")).unwrap();
      assert!(parser.buffered() <= 2);
    }
    assert_eq!(parser.consumed(), 98);
    assert_eq!(parser.pending().map(|p| p.bytes), Some(3));

    parser.push(chunk("cafeba")).unwrap();
    assert!(parser.is_complete());
    assert_eq!(parser.vars().get_bytes("skipped").unwrap().unwrap().len(), 100);
  }

  #[test]
  fn find_limit_counts_bytes_already_consumed() {
    let config = ParserConfig::default().find_scan_limit(Some(4));
    let mut parser = StreamParser::with_config(config);
    parser.find(b"\xAA", |_, _, _| Ok(()));

    for _ in 0..4 {
      parser.push(chunk("00")).unwrap();
    }
    let err = parser.push(chunk("00")).unwrap_err();
    assert!(matches!(err, ParseError::PatternNotFound { scanned: 5, .. }));
  }

  #[test]
  fn chunks_after_failure_are_dropped() {
    let mut parser = StreamParser::new();
    parser.buffer("x", "missing");
    assert!(parser.push(chunk("00")).is_err());
    let buffered = parser.buffered();

    parser.push(chunk("01020304")).unwrap();
    assert_eq!(parser.buffered(), buffered);
    assert_eq!(parser.state(), StreamState::Failed);
  }

  #[test]
  fn unknown_length_variable_fails() {
    let mut parser = StreamParser::new();
    parser.buffer("x", "missing");
    let err = parser.push(chunk("00")).unwrap_err();

    assert!(matches!(
      err,
      ParseError::Type(TypeError::UnknownVariable { ref name }) if name == "missing"
    ));
    assert_eq!(parser.state(), StreamState::Failed);
  }

  #[test]
  fn callback_error_fails_the_parse() {
    let mut parser = StreamParser::new();
    parser.word8("a").tap(|_, vars| {
      vars.get_number("nope")?;
      Ok(())
    });
    assert!(parser.push(chunk("01")).is_err());
    assert_eq!(parser.state(), StreamState::Failed);
  }

  #[test]
  fn other_events_are_ignored() {
    let mut parser = StreamParser::with_event("payload");
    parser.word8("a");

    parser.handle(SourceEvent::data(chunk("01"))).unwrap();
    assert_eq!(parser.buffered(), 0);

    parser.handle(SourceEvent::named("payload", chunk("02"))).unwrap();
    assert_eq!(parser.vars().get_number("a").unwrap(), 2.0);

    parser.handle(SourceEvent::End).unwrap();
    assert_eq!(parser.state(), StreamState::Ended);
  }

  #[tokio::test]
  async fn run_from_channel() {
    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
      for part in ["00", "0361", "6263"] {
        tx.send(SourceEvent::data(chunk(part))).await.unwrap();
      }
      // dropping the sender ends the input
    });

    let mut parser = StreamParser::new();
    parser.word16be("len").buffer("body", "len");
    let state = parser.run(rx).await.unwrap();

    assert_eq!(state, StreamState::Ended);
    assert_eq!(&parser.vars().get_bytes("body").unwrap().unwrap()[..], b"abc");
  }

  #[tokio::test]
  async fn run_stops_at_end_event() {
    let (tx, rx) = mpsc::channel(4);
    tx.send(SourceEvent::data(chunk("01"))).await.unwrap();
    tx.send(SourceEvent::End).await.unwrap();

    let mut parser = StreamParser::new();
    parser.word16le("n");
    let state = parser.run(rx).await.unwrap();
    assert_eq!(state, StreamState::Stalled);
    drop(tx);
  }

  #[tokio::test]
  async fn read_from_async_reader() {
    let (mut client, server) = tokio::io::duplex(3);
    tokio::spawn(async move {
      client.write_all(&hex::decode("0000000568656c6c6fff").unwrap()).await.unwrap();
    });

    let mut parser = StreamParser::new();
    parser.word32be("len").buffer("msg", "len").word8s("end");
    let state = parser.read_from(server).await.unwrap();

    assert_eq!(state, StreamState::Ended);
    assert_eq!(&parser.vars().get_bytes("msg").unwrap().unwrap()[..], b"hello");
    assert_eq!(parser.vars().get_number("end").unwrap(), -1.0);
  }
}
