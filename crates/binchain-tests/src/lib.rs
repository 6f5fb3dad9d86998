//! Shared fixtures for the integration tests and benches.
//!
//! Every layout here exists twice, once per parser mode, and the two
//! versions must describe the same structure. The `stream_vs_buffer` tests
//! hold them to that.

use binchain_decoder::{BufferParser, ParseError, StreamParser, Vars};

/// Marker placed between the record section and the trailer.
pub const END_MARKER: &[u8] = b"END!";

/// A record file:
///
/// ```text
/// ┌───────┬──────────────────────────────┬─────────┬──────┬─────────┐
/// │ count │ count × (kind, len, body)    │ padding │ END! │ trailer │
/// │ u8    │ u8, u16le, len bytes         │ any     │      │ u32be   │
/// └───────┴──────────────────────────────┴─────────┴──────┴─────────┘
/// ```
#[must_use]
pub fn records(bodies: &[&[u8]], padding: usize, trailer: u32) -> Vec<u8> {
    let count = u8::try_from(bodies.len()).unwrap_or(u8::MAX);
    let mut out = vec![count];
    for (kind, body) in bodies.iter().take(usize::from(count)).enumerate() {
        out.push(u8::try_from(kind).unwrap_or(u8::MAX));
        out.extend_from_slice(&u16::try_from(body.len()).unwrap_or(u16::MAX).to_le_bytes());
        out.extend_from_slice(body);
    }
    out.extend(std::iter::repeat_n(0xEE, padding));
    out.extend_from_slice(END_MARKER);
    out.extend_from_slice(&trailer.to_be_bytes());
    out
}

/// Fold the current record into the running totals.
///
/// # Errors
///
/// Fails if a record field has not been read yet.
pub fn collect_record(vars: &mut Vars) -> Result<(), ParseError> {
    let kind = vars.get_number("kind")?;
    let body = vars.get_bytes("body")?.cloned().unwrap_or_default();

    let mut all = if vars.contains("bodies") {
        vars.get_bytes("bodies")?.map(|b| b.to_vec()).unwrap_or_default()
    } else {
        Vec::new()
    };
    all.extend_from_slice(&body);
    vars.set("bodies", all);

    let kinds = if vars.contains("kinds") {
        vars.get_number("kinds")?
    } else {
        0.0
    };
    vars.set("kinds", kinds + kind);
    Ok(())
}

/// Whether the record loop is done, counting `remaining` down otherwise.
fn next_record(vars: &mut Vars) -> Result<bool, ParseError> {
    let left = vars.get_number("remaining")?;
    if left <= 0.0 {
        return Ok(false);
    }
    vars.set("remaining", left - 1.0);
    Ok(true)
}

fn copy_count(vars: &mut Vars) -> Result<(), ParseError> {
    let count = vars.get_number("count")?;
    vars.set("remaining", count);
    Ok(())
}

/// The [`records`] layout for the buffer parser.
///
/// # Errors
///
/// Propagates parser errors, e.g. a missing end marker.
pub fn records_buffer(parser: &mut BufferParser) -> Result<(), ParseError> {
    parser
        .word8("count")?
        .tap(|p| copy_count(p.vars_mut()))?
        .repeat(|p, end| {
            if !next_record(p.vars_mut())? {
                end.terminate();
                return Ok(());
            }
            p.word8("kind")?.word16le("len")?.buffer("body", "len")?;
            collect_record(p.vars_mut())
        })?
        .find(END_MARKER, |p, gap| {
            p.vars_mut().set("gap", gap);
            Ok(())
        })?
        .word32be("trailer")?;
    Ok(())
}

/// The [`records`] layout for the stream parser.
pub fn records_stream(parser: &mut StreamParser) {
    parser
        .word8("count")
        .tap(|_, vars| copy_count(vars))
        .repeat(|chain, end, vars| {
            if !next_record(vars)? {
                end.terminate();
                return Ok(());
            }
            chain
                .word8("kind")
                .word16le("len")
                .buffer("body", "len")
                .tap(|_, vars| collect_record(vars));
            Ok(())
        })
        .find(END_MARKER, |_, vars, gap| {
            vars.set("gap", gap);
            Ok(())
        })
        .word32be("trailer");
}

/// Feed `data` to `parser` in the given chunk lengths, cycling through
/// them, then end the input.
///
/// # Errors
///
/// Propagates the first parser error.
///
/// # Panics
///
/// Panics if `sizes` is empty or contains a zero.
pub fn feed(parser: &mut StreamParser, data: &[u8], sizes: &[usize]) -> Result<(), ParseError> {
    assert!(!sizes.is_empty() && !sizes.contains(&0), "chunk sizes must be positive");
    let mut rest = data;
    for &size in sizes.iter().cycle() {
        if rest.is_empty() {
            break;
        }
        let (chunk, tail) = rest.split_at(size.min(rest.len()));
        parser.push(chunk.to_vec())?;
        rest = tail;
    }
    parser.end()
}
