#![no_main]

use arbitrary::Arbitrary;
use binchain_decoder::{parse, WordOp};
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
    data: Vec<u8>,
}

// Fuzz target: BufferParser over an arbitrary layout.
//
// Catches bugs in:
// - Cursor clamping at the end of the region
// - Length variables holding huge, negative or fractional values
// - find at every offset, including empty and oversized patterns
fuzz_target!(|input: Input| {
    let mut parser = parse(input.data.clone());

    for step in &input.steps {
        let result = match step {
            Step::Word { op, slot } => {
                let op = WordOp::ALL[usize::from(*op) % WordOp::ALL.len()];
                parser.word(format!("w{}", slot % 4), op).map(|_| ())
            }
            Step::Buffer { len } => parser.buffer("buf", usize::from(*len)).map(|_| ()),
            Step::BufferFromSlot { slot } => {
                parser.buffer("buf", format!("w{}", slot % 4)).map(|_| ())
            }
            Step::Skip { len } => parser.skip(usize::from(*len)).map(|_| ()),
            Step::Find { pattern } => {
                let before = parser.offset();
                let found = parser.find(pattern, |_, _| Ok(())).map(|_| ());
                if found.is_err() {
                    assert_eq!(parser.offset(), before);
                }
                found
            }
            Step::Flush => {
                parser.flush();
                assert!(parser.vars().is_empty());
                Ok(())
            }
        };
        if result.is_err() {
            break;
        }
        assert!(parser.offset() <= input.data.len());
        assert_eq!(parser.offset() + parser.remaining(), input.data.len());
    }
});
