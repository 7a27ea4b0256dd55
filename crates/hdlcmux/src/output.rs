use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hdlcmux_frame::{channel_name, control, DecodeEvent, Frame, DEBUG};
use hdlcmux_link::LinkStats;
use serde::Serialize;

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

/// One printed line of output: a frame, a debug line, a diagnostic or wire bytes.
#[derive(Serialize, Debug)]
struct Record<'a> {
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    control: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence: Option<u8>,
    size: usize,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    timestamp: String,
}

impl<'a> Record<'a> {
    fn new(kind: &'a str) -> Self {
        Self {
            kind,
            address: None,
            channel: None,
            control: None,
            sequence: None,
            size: 0,
            data: String::new(),
            detail: None,
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    if let OutputFormat::Raw = format {
        print_raw(frame.payload.as_ref());
        return;
    }
    let record = Record {
        address: Some(frame.address),
        channel: Some(frame.channel_name()),
        control: Some(frame.control),
        sequence: frame.is_information().then(|| frame.sequence()),
        size: frame.payload.len(),
        data: payload_preview(frame.payload.as_ref()),
        ..Record::new(if frame.is_information() { "frame" } else { "supervisory" })
    };
    emit(&record, format);
}

pub fn print_line(line: &str, format: OutputFormat) {
    if let OutputFormat::Raw = format {
        print_raw(line.as_bytes());
        print_raw(b"\n");
        return;
    }
    let record = Record {
        address: Some(DEBUG),
        channel: Some(channel_name(DEBUG)),
        size: line.len(),
        data: line.to_string(),
        ..Record::new("line")
    };
    emit(&record, format);
}

pub fn print_diagnostic(event: &DecodeEvent, format: OutputFormat) {
    let record = match event {
        DecodeEvent::Frame(frame) => return print_frame(frame, format),
        DecodeEvent::ChecksumFailed {
            address,
            residue,
            len,
        } => Record {
            address: Some(*address),
            channel: Some(channel_name(*address)),
            size: *len,
            detail: Some(format!("residue {residue:#06x}")),
            ..Record::new("checksum_failed")
        },
        DecodeEvent::Runt { address, len } => Record {
            address: Some(*address),
            channel: Some(channel_name(*address)),
            size: *len,
            ..Record::new("runt")
        },
        DecodeEvent::Overflow { address, capacity } => Record {
            address: Some(*address),
            channel: Some(channel_name(*address)),
            size: *capacity,
            detail: Some(format!("reassembly capacity {capacity}")),
            ..Record::new("overflow")
        },
        DecodeEvent::Ignored { address } => Record {
            address: Some(*address),
            channel: Some(channel_name(*address)),
            ..Record::new("ignored")
        },
    };
    if let OutputFormat::Raw = format {
        return;
    }
    emit(&record, format);
}

/// Print encoded wire bytes as hex (raw: the bytes themselves).
pub fn print_wire(kind: &str, bytes: &[u8], format: OutputFormat) {
    if let OutputFormat::Raw = format {
        print_raw(bytes);
        return;
    }
    let record = Record {
        size: bytes.len(),
        data: hex::encode(bytes),
        ..Record::new(kind)
    };
    emit(&record, format);
}

#[derive(Serialize)]
struct StatsOutput {
    kind: &'static str,
    frames_sent: u64,
    acks_sent: u64,
    bytes_written: u64,
    frames_received: u64,
    checksum_failures: u64,
    overflows: u64,
    runts: u64,
    ignored: u64,
}

pub fn print_stats(stats: &LinkStats, format: OutputFormat) {
    let out = StatsOutput {
        kind: "stats",
        frames_sent: stats.frames_sent,
        acks_sent: stats.acks_sent,
        bytes_written: stats.bytes_written,
        frames_received: stats.frames_received,
        checksum_failures: stats.checksum_failures,
        overflows: stats.overflows,
        runts: stats.runts,
        ignored: stats.ignored,
    };
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec![
                    "SENT", "ACKS", "BYTES", "RECEIVED", "CRC FAIL", "OVERFLOW", "RUNT", "IGNORED",
                ])
                .add_row(vec![
                    out.frames_sent,
                    out.acks_sent,
                    out.bytes_written,
                    out.frames_received,
                    out.checksum_failures,
                    out.overflows,
                    out.runts,
                    out.ignored,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "sent={} acks={} bytes={} received={} checksum_failures={} overflows={} runts={} ignored={}",
            out.frames_sent,
            out.acks_sent,
            out.bytes_written,
            out.frames_received,
            out.checksum_failures,
            out.overflows,
            out.runts,
            out.ignored
        ),
        OutputFormat::Raw => {}
    }
}

fn emit(record: &Record<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "CHANNEL", "CONTROL", "SIZE", "DATA"])
                .add_row(vec![
                    record.kind.to_string(),
                    channel_cell(record),
                    record.control.map(control_cell).unwrap_or_default(),
                    record.size.to_string(),
                    record
                        .detail
                        .clone()
                        .unwrap_or_else(|| record.data.clone()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut line = record.kind.to_string();
            if let Some(address) = record.address {
                line.push_str(&format!(" address={address:#04x}"));
            }
            if let Some(channel) = record.channel {
                line.push_str(&format!(" ({channel})"));
            }
            if let Some(control) = record.control {
                line.push_str(&format!(" control={control:#04x}"));
            }
            if let Some(sequence) = record.sequence {
                line.push_str(&format!(" seq={sequence}"));
            }
            line.push_str(&format!(" size={}", record.size));
            if let Some(detail) = &record.detail {
                line.push_str(&format!(" {detail}"));
            }
            if !record.data.is_empty() {
                line.push_str(&format!(" data={}", record.data));
            }
            println!("{line}");
        }
        OutputFormat::Raw => print_raw(record.data.as_bytes()),
    }
}

fn channel_cell(record: &Record<'_>) -> String {
    match (record.address, record.channel) {
        (Some(address), Some(channel)) => format!("{channel} ({address:#04x})"),
        _ => String::new(),
    }
}

fn control_cell(value: u8) -> String {
    if control::is_information(value) {
        format!("{value:#04x} I seq={}", control::sequence(value))
    } else {
        format!("{value:#04x} S seq={}", control::sequence(value))
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(|c| c.is_control() && c != '\n') => text.to_string(),
        _ => hex::encode(payload),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
