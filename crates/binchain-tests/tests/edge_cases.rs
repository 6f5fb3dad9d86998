//! Edge cases shared by both parser modes.
//!
//! - **Running out of input**: buffer mode truncates reads at the end of
//!   the region; stream mode suspends, and stalls once the input ends.
//! - **Bad lengths**: a length variable that is unset, non-numeric,
//!   negative or fractional aborts the parse in both modes.
//! - **Scoping**: `flush` clears everything, `tap` writes are visible to
//!   the parent, and a loop terminated on its first pass runs once.
//! - **find**: every start offset is tried, so a partial match does not
//!   hide a real one further on, and bytes ruled out in stream mode are
//!   consumed as they arrive.
//! - **Precision**: 64-bit words go through `f64` and round above 2^53.

use std::cell::Cell;
use std::rc::Rc;

use binchain_decoder::{
    ParseError, ParserConfig, SourceEvent, StreamParser, StreamState, parse, stream,
};
use binchain_tests::{feed, records, records_stream};
use binchain_types::TypeError;

// ── Running out of input ──────────────────────────────────────────────────────

#[test]
fn buffer_reads_shrink_to_empty() {
    let mut parser = parse(vec![1, 2, 3]);
    parser.buffer("a", 2).unwrap().buffer("b", 2).unwrap().buffer("c", 2).unwrap();

    let vars = parser.vars();
    assert_eq!(&vars.get_bytes("a").unwrap().unwrap()[..], &[1, 2]);
    assert_eq!(&vars.get_bytes("b").unwrap().unwrap()[..], &[3]);
    assert!(vars.get_bytes("c").unwrap().unwrap().is_empty());
    assert_eq!(parser.offset(), 3);
}

#[test]
fn stream_stalls_on_truncated_input() {
    let data = records(&[b"hello world"], 0, 5);
    let truncated = &data[..8];

    let mut parser = stream();
    records_stream(&mut parser);
    feed(&mut parser, truncated, &[2]).unwrap();

    assert_eq!(parser.state(), StreamState::Stalled);
    let pending = parser.pending().expect("a read should be pending");
    assert_eq!(pending.bytes, 11);
    assert!(!pending.discard);
    assert_eq!(parser.vars().get_number("len").unwrap(), 11.0);
    assert!(!parser.vars().contains("body"));
}

#[test]
fn stream_without_operations_is_done() {
    let mut parser = stream();
    parser.push(vec![1, 2, 3]).unwrap();
    assert_eq!(parser.state(), StreamState::Done);
    assert_eq!(parser.buffered(), 3);
}

// ── Bad lengths ───────────────────────────────────────────────────────────────

#[test]
fn unknown_length_variable_in_both_modes() {
    let err = parse(vec![0; 4]).buffer("x", "nope").unwrap_err();
    assert!(matches!(
        err,
        ParseError::Type(TypeError::UnknownVariable { ref name }) if name == "nope"
    ));

    let mut parser = stream();
    parser.skip("nope");
    let err = parser.push(vec![0; 4]).unwrap_err();
    assert!(matches!(err, ParseError::Type(TypeError::UnknownVariable { .. })));
    assert_eq!(parser.state(), StreamState::Failed);
}

#[test]
fn unusable_length_values() {
    for value in [-1.0, 1.5, f64::NAN] {
        let mut buffer = parse(vec![0; 4]);
        buffer.vars_mut().set("n", value);
        assert!(
            matches!(
                buffer.buffer("x", "n"),
                Err(ParseError::Type(TypeError::InvalidLength { .. }))
            ),
            "length {value} accepted"
        );
    }

    let mut buffer = parse(vec![0; 4]);
    buffer.buffer("bytes", 1).unwrap();
    assert!(matches!(
        buffer.skip("bytes"),
        Err(ParseError::Type(TypeError::NotANumber { .. }))
    ));
}

// ── Scoping ───────────────────────────────────────────────────────────────────

#[test]
fn flush_forgets_earlier_names() {
    let mut buffer = parse(vec![4, 0, 0]);
    buffer.word8("len").unwrap().flush();
    assert!(buffer.vars().get("len").is_err());
    assert!(buffer.buffer("x", "len").is_err());

    let mut parser = stream();
    parser.word8("len").flush().buffer("x", "len");
    assert!(parser.push(vec![4, 0, 0]).is_err());
}

#[test]
fn tap_writes_reach_the_parent() {
    let mut buffer = parse(vec![7]);
    buffer
        .tap(|p| {
            p.word8("inner")?;
            p.vars_mut().set("marker", 1.0);
            Ok(())
        })
        .unwrap();
    assert_eq!(buffer.vars().get_number("inner").unwrap(), 7.0);
    assert!(buffer.vars().contains("marker"));

    let mut parser = stream();
    parser.tap(|chain, vars| {
        vars.set("marker", 1.0);
        chain.word8("inner");
        Ok(())
    });
    parser.push(vec![7]).unwrap();
    assert_eq!(parser.vars(), buffer.vars());
}

#[test]
fn loop_terminated_immediately_runs_once() {
    let buffer_runs = Rc::new(Cell::new(0));
    let mut buffer = parse(vec![1, 2, 3]);
    buffer
        .repeat(|p, end| {
            buffer_runs.set(buffer_runs.get() + 1);
            end.terminate();
            p.word8("x")?;
            Ok(())
        })
        .unwrap();
    assert_eq!(buffer_runs.get(), 1);
    assert_eq!(buffer.offset(), 1);

    let stream_runs = Rc::new(Cell::new(0));
    let counter = Rc::clone(&stream_runs);
    let mut parser = stream();
    parser.repeat(move |chain, end, _| {
        counter.set(counter.get() + 1);
        end.terminate();
        chain.word8("x");
        Ok(())
    });
    parser.push(vec![1, 2, 3]).unwrap();
    assert_eq!(stream_runs.get(), 1);
    assert_eq!(parser.consumed(), 1);
}

// ── find ──────────────────────────────────────────────────────────────────────

#[test]
fn find_tries_every_offset_not_just_the_first() {
    // The pattern does not start at the cursor; a single comparison at the
    // cursor would miss it.
    let data = b"..ABABAC!".to_vec();

    let mut buffer = parse(data.clone());
    buffer
        .find(b"ABAC", |p, skipped| {
            p.vars_mut().set("skipped", skipped);
            Ok(())
        })
        .unwrap()
        .word8("next")
        .unwrap();
    assert_eq!(&buffer.vars().get_bytes("skipped").unwrap().unwrap()[..], b"..AB");
    assert_eq!(buffer.vars().get_number("next").unwrap(), f64::from(b'!'));

    let mut parser = stream();
    parser
        .find(b"ABAC", |_, vars, skipped| {
            vars.set("skipped", skipped);
            Ok(())
        })
        .word8("next");
    feed(&mut parser, &data, &[1]).unwrap();
    assert_eq!(parser.vars(), buffer.vars());
}

#[test]
fn find_missing_in_buffer_leaves_cursor() {
    let mut buffer = parse(b"xxxx".to_vec());
    buffer.word8("first").unwrap();
    let err = buffer.find(b"zz", |_, _| Ok(())).unwrap_err();
    assert!(matches!(err, ParseError::PatternNotFound { scanned: 3, .. }));
    assert_eq!(buffer.offset(), 1);
}

#[test]
fn unbounded_find_scans_past_the_default_limit() {
    let mut data = vec![0u8; 2 * 1024 * 1024];
    data.extend_from_slice(b"\xCA\xFE\x01");

    let mut bounded = parse(data.clone());
    assert!(bounded.find(b"\xCA\xFE", |_, _| Ok(())).is_err());

    let config = ParserConfig::default().find_scan_limit(None);
    let mut parser = StreamParser::with_config(config);
    parser.find(b"\xCA\xFE", |_, _, _| Ok(())).word8("after");
    feed(&mut parser, &data, &[64 * 1024]).unwrap();
    assert_eq!(parser.vars().get_number("after").unwrap(), 1.0);
}

#[test]
fn find_over_byte_sized_chunks_stays_linear() {
    // Each chunk only adds one new start offset to try.
    let mut data = vec![0u8; 256 * 1024];
    data.extend_from_slice(b"\xCA\xFE\x2A");

    let mut parser = stream();
    parser
        .find(b"\xCA\xFE", |_, vars, skipped| {
            vars.set("skipped", skipped);
            Ok(())
        })
        .word8("after");
    feed(&mut parser, &data, &[1]).unwrap();

    assert_eq!(parser.state(), StreamState::Ended);
    assert_eq!(parser.vars().get_number("after").unwrap(), 42.0);
    assert_eq!(
        parser.vars().get_bytes("skipped").unwrap().unwrap().len(),
        256 * 1024
    );
    assert_eq!(parser.consumed(), data.len());
}

// ── Precision ─────────────────────────────────────────────────────────────────

#[test]
fn large_words_round_through_f64() {
    let mut buffer = parse(vec![0xFF; 8]);
    buffer.word64le("max").unwrap();
    // u64::MAX is not representable; the nearest f64 is 2^64
    assert_eq!(buffer.vars().get_number("max").unwrap(), 18_446_744_073_709_551_616.0);

    let mut buffer = parse(hex::decode("0020000000000001").unwrap());
    buffer.word64be("v").unwrap();
    // 2^53 + 1 rounds to 2^53
    assert_eq!(buffer.vars().get_number("v").unwrap(), 9_007_199_254_740_992.0);

    // -1 as a signed 64-bit word: the unsigned sum rounds to 2^64 first
    let mut buffer = parse(vec![0xFF; 8]);
    buffer.word64ls("neg").unwrap();
    assert_eq!(buffer.vars().get_number("neg").unwrap(), 0.0);
}

// ── Event sources ─────────────────────────────────────────────────────────────

#[test]
fn only_the_configured_event_is_consumed() {
    let mut parser = StreamParser::with_event("frame");
    parser.word16le("n");

    parser.handle(SourceEvent::named("data", vec![9, 9])).unwrap();
    parser.handle(SourceEvent::named("frame", vec![1])).unwrap();
    parser.handle(SourceEvent::named("frame", vec![1])).unwrap();
    parser.handle(SourceEvent::End).unwrap();

    assert_eq!(parser.vars().get_number("n").unwrap(), 257.0);
    assert_eq!(parser.state(), StreamState::Ended);
}

#[tokio::test]
async fn async_reader_matches_buffer() {
    use tokio::io::AsyncWriteExt;

    let data = records(&[b"first", b"second", b"third"], 5, 99);
    let (mut writer, reader) = tokio::io::duplex(7);
    let payload = data.clone();
    tokio::spawn(async move {
        writer.write_all(&payload).await.unwrap();
    });

    let mut parser = stream();
    records_stream(&mut parser);
    let state = parser.read_from(reader).await.unwrap();
    assert_eq!(state, StreamState::Ended);

    let mut buffer = parse(data);
    binchain_tests::records_buffer(&mut buffer).unwrap();
    assert_eq!(parser.vars(), buffer.vars());
}
