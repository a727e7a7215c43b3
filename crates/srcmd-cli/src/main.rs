//! srcmd CLI - decode, validate, encode and stream srcmd documents
//!
//! Usage:
//!   srcmd [OPTIONS] <COMMAND>
//!
//! Commands:
//!   decode    Decode a notebook and show its cells
//!   validate  Check a notebook for grammar errors
//!   encode    Encode cells from JSON back into Markdown
//!   export    Write a notebook in the directory layout
//!   import    Read a notebook from the directory layout
//!   tags      Stream a file through the tag parser

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use srcmd_core::{
    decode, decode_fragment, encode, read_dir, write_dir, Cell, EncodeOptions, OsFileSystem,
    PlanParser, SrcbookMetadata, Tag, TagParser,
};
use tracing_subscriber::EnvFilter;

/// srcmd - Markdown notebook codec and streaming tag parser
#[derive(Parser, Debug)]
#[command(name = "srcmd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log codec decisions to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a notebook and show its cells
    Decode(DecodeArgs),

    /// Check a notebook for grammar errors
    Validate(DecodeArgs),

    /// Encode cells from JSON ({"metadata", "cells"}) back into Markdown
    Encode {
        /// JSON file produced by `srcmd decode --json`
        input: PathBuf,

        /// Link to files in the directory layout instead of inlining sources
        #[arg(long)]
        external: bool,
    },

    /// Write a notebook in the directory layout
    Export {
        /// Notebook file
        input: PathBuf,

        /// Target directory
        dir: PathBuf,
    },

    /// Read a notebook from the directory layout and print it inlined
    Import {
        /// Notebook directory
        dir: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Stream a file through the tag parser, printing completed tags as JSON lines
    Tags {
        /// File containing tagged model output
        input: PathBuf,

        /// Bytes per simulated chunk
        #[arg(long, default_value_t = 16)]
        chunk_size: usize,

        /// Interpret tags as an action plan
        #[arg(long)]
        plan: bool,
    },
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Notebook file
    input: PathBuf,

    /// Output in JSON format
    #[arg(short, long)]
    json: bool,

    /// Accept fragments without title, package.json or metadata
    #[arg(long)]
    fragment: bool,
}

#[derive(Deserialize)]
struct EncodeInput {
    metadata: SrcbookMetadata,
    cells: Vec<Cell>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "srcmd_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Decode(args) => cmd_decode(&args),
        Command::Validate(args) => cmd_validate(&args),
        Command::Encode { input, external } => cmd_encode(&input, external),
        Command::Export { input, dir } => cmd_export(&input, &dir),
        Command::Import { dir, output } => cmd_import(&dir, output.as_deref()),
        Command::Tags {
            input,
            chunk_size,
            plan,
        } => cmd_tags(&input, chunk_size, plan),
    }
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))
}

// =============================================================================
// Decode / Validate
// =============================================================================

fn cmd_decode(args: &DecodeArgs) -> Result<()> {
    let input = read_input(&args.input)?;

    let (metadata, cells) = if args.fragment {
        let fragment = decode_fragment(&input)?;
        (None, fragment.cells)
    } else {
        let decoded = decode(&input)?;
        (Some(decoded.metadata), decoded.cells)
    };

    if args.json {
        let value = serde_json::json!({ "metadata": metadata, "cells": cells });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if let Some(metadata) = &metadata {
        println!("Language: {}", metadata.language);
        if metadata.tsconfig.is_some() {
            println!("tsconfig: present");
        }
    }
    println!("Cells: {}", cells.len());
    for (i, cell) in cells.iter().enumerate() {
        println!("  [{}] {}", i, describe_cell(cell));
    }
    Ok(())
}

fn describe_cell(cell: &Cell) -> String {
    match cell {
        Cell::Title(c) => format!("title \"{}\"", c.text),
        Cell::PackageJson(c) => format!("package.json ({} bytes)", c.source.len()),
        Cell::Code(c) => format!("code {} [{}] ({} bytes)", c.filename, c.language, c.source.len()),
        Cell::Markdown(c) => format!("markdown ({} lines)", c.text.lines().count()),
        Cell::Placeholder(c) => format!("placeholder \"{}\"", c.text),
    }
}

fn cmd_validate(args: &DecodeArgs) -> Result<()> {
    let input = read_input(&args.input)?;

    let result = if args.fragment {
        decode_fragment(&input).map(|_| ())
    } else {
        decode(&input).map(|_| ())
    };

    match result {
        Ok(()) => {
            if args.json {
                println!(r#"{{"valid": true, "errors": []}}"#);
            } else {
                println!("Valid: no errors found");
            }
            Ok(())
        }
        Err(errors) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::json!({ "valid": false, "errors": errors.messages() })
                );
            } else {
                eprintln!("Invalid: {} error(s) found", errors.len());
                for message in errors.messages() {
                    eprintln!("  - {}", message);
                }
            }
            bail!("{} error(s) found", errors.len())
        }
    }
}

// =============================================================================
// Encode / Directory layout
// =============================================================================

fn cmd_encode(input: &Path, external: bool) -> Result<()> {
    let json = read_input(input)?;
    let EncodeInput { metadata, cells } =
        serde_json::from_str(&json).context("input is not a decoded notebook")?;

    let options = if external {
        EncodeOptions::external()
    } else {
        EncodeOptions::inline()
    };
    print!("{}", encode(&cells, &metadata, options)?);
    Ok(())
}

fn cmd_export(input: &Path, dir: &Path) -> Result<()> {
    let decoded = decode(&read_input(input)?)?;
    write_dir(&OsFileSystem, dir, &decoded.cells, &decoded.metadata)?;
    eprintln!("wrote {} cells to {}", decoded.cells.len(), dir.display());
    Ok(())
}

fn cmd_import(dir: &Path, output: Option<&Path>) -> Result<()> {
    let decoded = read_dir(&OsFileSystem, dir)?;
    let text = encode(&decoded.cells, &decoded.metadata, EncodeOptions::inline())?;
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write '{}'", path.display()))?,
        None => print!("{}", text),
    }
    Ok(())
}

// =============================================================================
// Tag streaming
// =============================================================================

fn cmd_tags(input: &Path, chunk_size: usize, plan: bool) -> Result<()> {
    if chunk_size == 0 {
        bail!("--chunk-size must be at least 1");
    }
    let text = read_input(input)?;
    let chunks = split_chunks(&text, chunk_size);
    tracing::debug!(chunks = chunks.len(), chunk_size, plan, "streaming input");
    let stdout = io::stdout();

    if plan {
        let mut parser = PlanParser::new(input.display().to_string());
        let mut out = stdout.lock();
        for chunk in &chunks {
            for plan_chunk in parser.push(chunk) {
                writeln!(out, "{}", serde_json::to_string(&plan_chunk)?)?;
            }
        }
        let plan = parser.finish()?;
        for rejected in &plan.rejected {
            eprintln!("warning: {}", rejected);
        }
        return Ok(());
    }

    let mut write_error = None;
    let mut parser = TagParser::new(|tag: &Tag| {
        if write_error.is_some() {
            return;
        }
        let line = serde_json::to_string(tag).map_err(anyhow::Error::from);
        if let Err(e) = line.and_then(|line| Ok(writeln!(stdout.lock(), "{}", line)?)) {
            write_error = Some(e);
        }
    });
    for chunk in &chunks {
        parser.parse(chunk);
    }
    let finished = parser.finish().map(|_| ());

    if let Some(e) = write_error {
        return Err(e);
    }
    finished?;
    Ok(())
}

/// Split text into chunks of roughly `size` bytes on char boundaries.
fn split_chunks(text: &str, size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + size).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(&text[start..end]);
        start = end;
    }
    chunks
}
