//! `fwwatch parse`: run the line parser over stdin.

use std::io::{BufRead, Write};

use fwwatch_core::{ParseMode, parse_line};

use crate::cli::ParseArgs;
use crate::error::CliError;

pub fn handle(args: &ParseArgs) -> Result<(), CliError> {
    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();
    let matched = parse_stream(stdin, stdout, args.mode.into())?;
    tracing::info!(matched, "parse finished");
    Ok(())
}

/// Write one JSON object per matching line. Returns the number written.
///
/// Invalid UTF-8 is replaced rather than rejected, as the tailer does.
fn parse_stream<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    mode: ParseMode,
) -> Result<usize, CliError> {
    let mut matched = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if let Some(event) = parse_line(line.trim(), mode) {
            serde_json::to_writer(&mut output, &event)?;
            writeln!(output)?;
            matched += 1;
        }
    }
    output.flush()?;
    Ok(matched)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use super::*;

    const INPUT: &str = "\
FW-DROP-SSH: IN=eth0 SRC=10.0.0.5 DST=10.0.0.1 DPT=22 PROTO=6
random unrelated text
kernel: FW-ALLOW-WEB something odd
";

    fn run(mode: ParseMode) -> (usize, Vec<Value>) {
        let mut out = Vec::new();
        let n = parse_stream(INPUT.as_bytes(), &mut out, mode).unwrap();
        let values = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (n, values)
    }

    #[test]
    fn dashboard_mode_emits_structured_and_fallback_events() {
        let (n, events) = run(ParseMode::Dashboard);
        assert_eq!(n, 2);
        assert_eq!(events[0]["prefix"], "FW-DROP-SSH");
        assert_eq!(events[0]["source_address"], "10.0.0.5");
        assert_eq!(events[0]["dest_port"], "22");
        assert_eq!(events[0]["protocol"], "TCP");
        assert_eq!(events[1]["prefix"], "kernel");
        assert_eq!(events[1]["source_address"], "-");
    }

    #[test]
    fn invalid_utf8_does_not_stop_the_stream() {
        let input: &[u8] = b"FW-DROP-X: \xff bad\n\
FW-DROP-SSH: IN=eth0 SRC=10.0.0.5 DST=10.0.0.1 DPT=22 PROTO=6\n";
        let mut out = Vec::new();
        let n = parse_stream(input, &mut out, ParseMode::Dashboard).unwrap();
        assert_eq!(n, 2);

        let text = String::from_utf8(out).unwrap();
        let events: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(events[0]["prefix"], "FW-DROP-X");
        assert!(events[0]["raw"].as_str().unwrap().contains('\u{FFFD}'));
        assert_eq!(events[1]["prefix"], "FW-DROP-SSH");
        assert_eq!(events[1]["source_address"], "10.0.0.5");
    }

    #[test]
    fn alert_mode_passes_protocol_through() {
        let (n, events) = run(ParseMode::Alert);
        assert_eq!(n, 1);
        assert_eq!(events[0]["protocol"], "6");
    }
}
