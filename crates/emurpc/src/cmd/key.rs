use emurpc_session::calls::evt_enqueue_key;
use serde::Serialize;
use tracing::debug;

use crate::cmd::{Connection, KeyArgs};
use crate::exit::{session_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct KeyOutput {
    sent: usize,
    failed: usize,
}

/// Palm OS key events carry an 8-bit character in a 16-bit field.
fn key_codes(text: &str) -> CliResult<Vec<u16>> {
    text.chars()
        .map(|c| {
            u8::try_from(c)
                .map(u16::from)
                .map_err(|_| CliError::new(USAGE, format!("cannot type '{c}': not a single-byte character")))
        })
        .collect()
}

pub fn run(args: KeyArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let codes = key_codes(&args.text)?;
    let traps = conn.trap_table()?;
    let mut session = conn.open()?;

    let mut out = KeyOutput { sent: 0, failed: 0 };
    for ascii in codes {
        let result = evt_enqueue_key(&mut session, &traps, ascii, args.keycode, args.modifiers)
            .map_err(|err| session_error("EvtEnqueueKey failed", err))?;
        debug!(ascii, result, "key enqueued");
        if result == 0 {
            out.sent += 1;
        } else {
            out.failed += 1;
        }
    }

    let rows = [
        ("sent", out.sent.to_string()),
        ("failed", out.failed.to_string()),
    ];
    print_record(&out, &rows, format);
    Ok(if out.failed == 0 { SUCCESS } else { FAILURE })
}
