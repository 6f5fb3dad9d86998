/// The layout language accepted by `binchain run --layout`.
///
/// A layout is a list of steps separated by whitespace or commas. Each
/// step maps onto one parser operation, so the same layout can drive
/// either parser mode:
///
/// ```text
/// ┌───────────────────────┬────────────────────────────────────────────┐
/// │ Step                  │ Operation                                  │
/// ├───────────────────────┼────────────────────────────────────────────┤
/// │ <wordop>:<name>       │ word read, e.g. `word16le:n`, `word32bs:x` │
/// │ buffer:<name>:<len>   │ buffer, `<len>` a literal or variable name │
/// │ skip:<len>            │ skip                                       │
/// │ find:<hex>            │ find, pattern given as hex bytes           │
/// │ flush                 │ flush                                      │
/// └───────────────────────┴────────────────────────────────────────────┘
/// ```
use anyhow::{Context, Result, bail};
use binchain_decoder::{BufferParser, Len, ParseError, StreamParser, WordOp};

/// One parsed layout step.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Word { op: WordOp, name: String },
    Buffer { name: String, len: Len },
    Skip(Len),
    Find(Vec<u8>),
    Flush,
}

/// Parse a layout string.
///
/// # Errors
///
/// Returns an error naming the offending step if it is malformed, uses an
/// unknown word operation, or carries invalid hex.
pub fn parse(src: &str) -> Result<Vec<Step>> {
    let steps: Vec<Step> = src
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| parse_step(s).with_context(|| format!("bad layout step `{s}`")))
        .collect::<Result<_>>()?;

    if steps.is_empty() {
        bail!("layout is empty");
    }
    Ok(steps)
}

fn parse_step(step: &str) -> Result<Step> {
    let parts: Vec<&str> = step.split(':').collect();
    match parts.as_slice() {
        ["flush"] => Ok(Step::Flush),
        ["skip", len] => Ok(Step::Skip(parse_len(len)?)),
        ["buffer", name, len] => Ok(Step::Buffer {
            name: parse_name(name)?,
            len: parse_len(len)?,
        }),
        ["find", pattern] => {
            let pattern = hex::decode(pattern).context("pattern is not valid hex")?;
            Ok(Step::Find(pattern))
        }
        [op, name] => {
            let Some(op) = WordOp::from_name(op) else {
                bail!("unknown word operation `{op}`");
            };
            Ok(Step::Word {
                op,
                name: parse_name(name)?,
            })
        }
        _ => bail!("expected `<op>:<name>`, `buffer:<name>:<len>`, `skip:<len>`, `find:<hex>` or `flush`"),
    }
}

fn parse_name(name: &str) -> Result<String> {
    if name.is_empty() {
        bail!("missing variable name");
    }
    Ok(name.to_string())
}

fn parse_len(len: &str) -> Result<Len> {
    if len.is_empty() {
        bail!("missing length");
    }
    Ok(match len.parse::<usize>() {
        Ok(n) => Len::Bytes(n),
        Err(_) => Len::Var(len.to_string()),
    })
}

/// Run `steps` against a buffer parser.
///
/// # Errors
///
/// Propagates the first parser error.
pub fn run_buffer(steps: &[Step], parser: &mut BufferParser) -> Result<(), ParseError> {
    for step in steps {
        match step {
            Step::Word { op, name } => {
                parser.word(name.as_str(), *op)?;
            }
            Step::Buffer { name, len } => {
                parser.buffer(name.as_str(), len.clone())?;
            }
            Step::Skip(len) => {
                parser.skip(len.clone())?;
            }
            Step::Find(pattern) => {
                parser.find(pattern, |_, _| Ok(()))?;
            }
            Step::Flush => {
                parser.flush();
            }
        }
    }
    Ok(())
}

/// Declare `steps` on a stream parser. Nothing runs until input arrives.
pub fn declare(steps: &[Step], parser: &mut StreamParser) {
    for step in steps {
        match step {
            Step::Word { op, name } => parser.word(name.as_str(), *op),
            Step::Buffer { name, len } => parser.buffer(name.as_str(), len.clone()),
            Step::Skip(len) => parser.skip(len.clone()),
            Step::Find(pattern) => parser.find(pattern, |_, _, _| Ok(())),
            Step::Flush => parser.flush(),
        };
    }
}
