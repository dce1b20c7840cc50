use std::fmt::Write as _;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use emurpc_packet::hexdump;
use serde::Serialize;

const ROW_WIDTH: usize = 8;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One result with named fields. `rows` drives the table, pretty and raw
/// renderings; JSON serializes `value`.
pub fn print_record<T: Serialize>(value: &T, rows: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            for (field, val) in rows {
                table.add_row(vec![field.to_string(), val.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line: Vec<String> = rows.iter().map(|(k, v)| format!("{k}={v}")).collect();
            println!("{}", line.join(" "));
        }
        OutputFormat::Raw => {
            for (_, val) in rows {
                println!("{val}");
            }
        }
    }
}

/// A list of results sharing one set of columns.
pub fn print_list<T: Serialize>(
    items: &[T],
    header: &[&str],
    rows: Vec<Vec<String>>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&items),
        OutputFormat::Table => {
            let mut table = new_table(header.to_vec());
            for row in rows {
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                let line: Vec<String> = header
                    .iter()
                    .zip(row)
                    .map(|(k, v)| format!("{}={v}", k.to_ascii_lowercase()))
                    .collect();
                println!("{}", line.join(" "));
            }
        }
        OutputFormat::Raw => {
            for row in rows {
                println!("{}", row.join("\t"));
            }
        }
    }
}

#[derive(Serialize)]
struct MemoryOutput<'a> {
    address: u32,
    length: usize,
    hex: &'a str,
    text: String,
}

pub fn print_memory(address: u32, data: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let hex = hex_string(data);
            print_json(&MemoryOutput {
                address,
                length: data.len(),
                hex: &hex,
                text: printable(data),
            });
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["ADDRESS", "BYTES", "ASCII"]);
            for (i, chunk) in data.chunks(ROW_WIDTH).enumerate() {
                let row_addr = address.wrapping_add((i * ROW_WIDTH) as u32);
                table.add_row(vec![
                    format!("0x{row_addr:08X}"),
                    spaced_hex(chunk),
                    printable(chunk),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", hexdump(address, data)),
        OutputFormat::Raw => print_raw(data),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn hex_string(data: &[u8]) -> String {
    data.iter().fold(String::with_capacity(data.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn printable(data: &[u8]) -> String {
    data.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

/// Render a 32-bit word as the four-character code Palm OS uses for
/// database types and creators, or hex when it is not printable.
pub fn four_cc(value: u32) -> String {
    let bytes = value.to_be_bytes();
    if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        bytes.iter().map(|&b| b as char).collect()
    } else {
        format!("0x{value:08X}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_printable() {
        assert_eq!(hex_string(b"Hi\0"), "486900");
        assert_eq!(spaced_hex(&[0xDE, 0xAD]), "DE AD");
        assert_eq!(printable(b"a\x01 b"), "a. b");
    }

    #[test]
    fn four_cc_falls_back_to_hex() {
        assert_eq!(four_cc(0x6D656D6F), "memo");
        assert_eq!(four_cc(0x0000_0001), "0x00000001");
    }
}
