//! Thin command-line harness around the `jsontree` library.
//!
//! Outside the engine's own scope per `spec.md` §1 ("file I/O and the
//! command-line harness... are external collaborators"): this binary only
//! reads bytes, feeds them to [`jsontree::parse`] (optionally in fixed-size
//! chunks, to exercise the incremental parser the way the library's own
//! chunk-boundary tests do), and prints either the resulting tree or the
//! last sequence error.

use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use clap::{App, Arg};

use jsontree::{parse, Context, ParseOutcome};

fn read_input(path: Option<&str>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Step `idx` back to the nearest char boundary at or before it, so a chunk
/// boundary never splits a multi-byte UTF-8 sequence. `str::floor_char_boundary`
/// isn't stable yet; this is the same logic `src/diag.rs` uses internally.
fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Split `text` into chunks of at most `size` bytes, each a valid `&str`,
/// for `--chunk-size` to hand the parser one piece at a time.
fn chunks(text: &str, size: usize) -> Vec<&str> {
    if size == 0 {
        return vec![text];
    }

    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let at = floor_char_boundary(rest, size.min(rest.len())).max(1);
        let (head, tail) = rest.split_at(at);
        out.push(head);
        rest = tail;
    }
    out
}

fn run() -> Result<(), String> {
    let matches = App::new("jsontree")
        .version("0.1.0")
        .about("Streaming, low-memory JSON document engine")
        .arg(
            Arg::with_name("file")
                .help("JSON file to parse (defaults to stdin)")
                .index(1),
        )
        .arg(
            Arg::with_name("chunk-size")
                .long("chunk-size")
                .short("c")
                .takes_value(true)
                .help("feed input in fixed-size chunks to exercise incremental parsing"),
        )
        .arg(
            Arg::with_name("hash")
                .long("hash")
                .help("intern object-member names in a name hash"),
        )
        .arg(
            Arg::with_name("stats")
                .long("stats")
                .help("print memory statistics after a successful parse"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("increase log verbosity (-v, -vv)"),
        )
        .get_matches();

    let level = match matches.occurrences_of("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .map_err(|e| format!("failed to install logger: {e}"))?;

    let chunk_size: usize = match matches.value_of("chunk-size") {
        Some(s) => s.parse().map_err(|_| format!("invalid --chunk-size: {s}"))?,
        None => 0,
    };
    let use_hash = matches.is_present("hash");

    let text = read_input(matches.value_of("file")).map_err(|e| format!("read failed: {e}"))?;

    let mut ctx = Context::new();
    let mut outcome = ParseOutcome::NeedMore;

    for chunk in chunks(&text, chunk_size) {
        let offset = chunk.as_ptr() as usize - text.as_ptr() as usize;
        outcome = parse(&mut ctx, Some(chunk), use_hash).map_err(|e| {
            if let Some(diag) = jsontree::diagnose(&ctx, &text, offset) {
                diag
            } else {
                e.to_string()
            }
        })?;
        if matches!(outcome, ParseOutcome::Closed { .. }) {
            break;
        }
    }

    match outcome {
        ParseOutcome::Closed { trailing } => {
            if trailing > 0 {
                log::warn!("{trailing} trailing byte(s) after the closed tree were ignored");
            }
            jsontree::display(&ctx, ctx.root_id()).map_err(|e| e.to_string())?;
            if matches.is_present("stats") {
                ctx.dump_stats();
            }
            Ok(())
        }
        ParseOutcome::NeedMore => Err("unexpected end of input: JSON tree never closed".to_string()),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("jsontree: {msg}");
            ExitCode::FAILURE
        }
    }
}
