#![no_main]

use arbitrary::Arbitrary;
use binchain_decoder::{parse, stream, StreamState, WordOp};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Step {
    Word { op: u8, slot: u8 },
    Buffer { len: u8 },
    BufferFromSlot { slot: u8 },
    Skip { len: u8 },
    Find { pattern: Vec<u8> },
    Flush,
}

#[derive(Arbitrary, Debug)]
struct Input {
    steps: Vec<Step>,
    chunks: Vec<u8>,
    data: Vec<u8>,
}

// Fuzz target: stream mode against buffer mode.
//
// Whenever the stream parse completes, the input held enough bytes for
// every read, so the buffer parse of the same bytes must succeed with the
// same variables, whatever the chunking.
fuzz_target!(|input: Input| {
    let mut streaming = stream();
    for step in &input.steps {
        match step {
            Step::Word { op, slot } => {
                let op = WordOp::ALL[usize::from(*op) % WordOp::ALL.len()];
                streaming.word(format!("w{}", slot % 4), op)
            }
            Step::Buffer { len } => streaming.buffer("buf", usize::from(*len)),
            Step::BufferFromSlot { slot } => streaming.buffer("buf", format!("w{}", slot % 4)),
            Step::Skip { len } => streaming.skip(usize::from(*len)),
            Step::Find { pattern } => streaming.find(pattern, |_, _, _| Ok(())),
            Step::Flush => streaming.flush(),
        };
    }

    let mut rest = input.data.as_slice();
    let mut sizes = input.chunks.iter().map(|&n| usize::from(n.max(1))).cycle();
    while !rest.is_empty() {
        let size = sizes.next().unwrap_or(rest.len()).min(rest.len());
        let (chunk, tail) = rest.split_at(size);
        if streaming.push(chunk.to_vec()).is_err() {
            return;
        }
        rest = tail;
    }
    if streaming.end().is_err() || streaming.state() != StreamState::Ended {
        return;
    }

    let mut buffer = parse(input.data.clone());
    for step in &input.steps {
        let result = match step {
            Step::Word { op, slot } => {
                let op = WordOp::ALL[usize::from(*op) % WordOp::ALL.len()];
                buffer.word(format!("w{}", slot % 4), op).map(|_| ())
            }
            Step::Buffer { len } => buffer.buffer("buf", usize::from(*len)).map(|_| ()),
            Step::BufferFromSlot { slot } => {
                buffer.buffer("buf", format!("w{}", slot % 4)).map(|_| ())
            }
            Step::Skip { len } => buffer.skip(usize::from(*len)).map(|_| ()),
            Step::Find { pattern } => buffer.find(pattern, |_, _| Ok(())).map(|_| ()),
            Step::Flush => {
                buffer.flush();
                Ok(())
            }
        };
        result.expect("buffer parse failed where the stream parse completed");
    }

    assert_eq!(streaming.vars(), buffer.vars());
    assert_eq!(streaming.consumed(), buffer.offset());
});
