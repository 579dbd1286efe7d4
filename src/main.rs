//! Main entry point for the arcfs CLI.
//!
//! Reads an archive fully into memory, sniffs whether it is a ZIP archive
//! or an ISO9660 image, and serves listings or file contents through the
//! shared filesystem interface.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;

use arcfs::{ArchiveFs, Cli, FileKind, IsoFs, Metadata, SECTOR_SIZE, ZipFs};

enum Archive<'a> {
    Zip(ZipFs<'a>),
    Iso(IsoFs<'a>),
}

impl<'a> Archive<'a> {
    /// Pick the reader by sniffing the buffer.
    ///
    /// An ISO9660 image always carries "CD001" one byte into sector 16;
    /// anything else is treated as ZIP, whose own signature scan produces
    /// the error message when that guess is wrong.
    fn open(data: &'a [u8]) -> Result<Self> {
        let probe = 16 * SECTOR_SIZE + 1;
        if data.len() > probe + 5 && &data[probe..probe + 5] == b"CD001" {
            Ok(Archive::Iso(IsoFs::new(data)?))
        } else {
            Ok(Archive::Zip(ZipFs::new(data)?))
        }
    }

    fn fs(&self) -> &dyn ArchiveFs {
        match self {
            Archive::Zip(fs) => fs,
            Archive::Iso(fs) => fs,
        }
    }

    fn describe(&self) -> String {
        match self {
            Archive::Zip(fs) => {
                let mut line = format!("ZIP archive, {} entries", fs.file_count());
                if !fs.comment().is_empty() {
                    line.push_str(&format!(" ({})", fs.comment()));
                }
                line
            }
            Archive::Iso(fs) => format!(
                "ISO9660 image '{}'{}{}",
                fs.label(),
                if fs.is_joliet() { ", Joliet" } else { "" },
                if fs.has_rock_ridge() { ", Rock Ridge" } else { "" },
            ),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data = std::fs::read(&cli.file).with_context(|| format!("reading {}", cli.file))?;
    let archive = Archive::open(&data).with_context(|| format!("opening {}", cli.file))?;

    if cli.wants_listing() {
        if cli.verbose {
            println!("{}", archive.describe());
        }
        return list_tree(archive.fs(), cli.verbose);
    }

    let multiple = cli.paths.len() > 1;
    for path in &cli.paths {
        let content = archive
            .fs()
            .read_file(path)
            .with_context(|| format!("reading {path} from {}", cli.file))?;
        let mut stdout = std::io::stdout().lock();
        if multiple && !cli.pipe {
            writeln!(stdout, "--- {path} ---")?;
        }
        stdout.write_all(&content)?;
    }

    Ok(())
}

/// Walk the whole tree depth-first and print every path.
fn list_tree(archive: &dyn ArchiveFs, verbose: bool) -> Result<()> {
    if verbose {
        println!("{:>10}  {:>4}  {:>16}  Name", "Length", "Mode", "Modified");
        println!("{}", "-".repeat(60));
    }

    let mut total_size = 0u64;
    let mut file_count = 0usize;
    let mut stack = vec![String::from("/")];
    while let Some(path) = stack.pop() {
        let meta = archive.stat(&path)?;
        if verbose {
            print_verbose(&path, &meta);
        } else if path != "/" {
            println!("{path}");
        }
        if meta.is_file() {
            total_size += meta.size;
            file_count += 1;
        }
        if meta.is_dir() {
            let mut children = archive.read_dir(&path)?;
            // Reversed so the stack pops them in listing order.
            children.reverse();
            for child in children {
                if path == "/" {
                    stack.push(format!("/{child}"));
                } else {
                    stack.push(format!("{path}/{child}"));
                }
            }
        }
    }

    if verbose {
        println!("{}", "-".repeat(60));
        println!("{total_size:>10}  {:>4}  {:>16}  {file_count} files", "", "");
    }
    Ok(())
}

fn print_verbose(path: &str, meta: &Metadata) {
    let marker = match meta.kind {
        FileKind::Directory => "d",
        FileKind::Symlink => "l",
        FileKind::File => "-",
    };
    let stamp = match time::OffsetDateTime::from_unix_timestamp(meta.mtime) {
        Ok(t) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}",
            t.year(),
            u8::from(t.month()),
            t.day(),
            t.hour(),
            t.minute()
        ),
        Err(_) => String::from("-"),
    };
    println!(
        "{:>10}  {marker}{:o}  {stamp:>16}  {path}",
        meta.size, meta.mode
    );
}
