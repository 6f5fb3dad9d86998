/// Implementation of `binchain words`.
///
/// Decodes the bytes at `--offset` under every word operation, which is
/// handy for working out which width and byte order a field uses.
///
/// # Example output
///
/// ```text
/// offset 0: 01 02 ff ff
///
/// op         size  value
/// word8         1  1
/// word8s        1  1
/// word16le      2  513
/// ...
/// word64bs      8  -
/// ```
use std::fmt::Write as _;
use std::fs;

use anyhow::{Context, Result, bail};
use binchain_wire::WordOp;

use crate::WordsArgs;

/// Run the `binchain words` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or `--offset` lies past its
/// end.
pub fn run(args: &WordsArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let Some(window) = bytes.get(args.offset..) else {
        bail!(
            "offset {} is past the end of {} ({} bytes)",
            args.offset,
            args.file.display(),
            bytes.len()
        );
    };

    print!("{}", render(window, args.offset));
    Ok(())
}

/// Longest word, and so the most bytes worth showing in the header.
const MAX_WORD: usize = 8;

fn render(window: &[u8], offset: usize) -> String {
    let mut out = String::new();
    let shown = &window[..window.len().min(MAX_WORD)];
    let hex: Vec<String> = shown.iter().map(|b| format!("{b:02x}")).collect();

    let _ = writeln!(out, "offset {offset}: {}", hex.join(" "));
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<10} {:>4}  value", "op", "size");
    for op in WordOp::ALL {
        let value = if window.len() < op.size() {
            "-".to_string()
        } else {
            op.decode(&window[..op.size()]).to_string()
        };
        let _ = writeln!(out, "{:<10} {:>4}  {value}", op.name(), op.size());
    }
    out
}
