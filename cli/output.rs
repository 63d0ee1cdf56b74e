use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use codecontext_core::EntryCount;
use codecontext_core::output_formats::{serialize_to_json, serialize_to_yaml};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Opens `path` for writing, creating parent directories first.
pub fn create_output_file(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    let mut file = create_output_file(path)?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    file.flush()
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn print_saved(path: &Path, count: &EntryCount) {
    println!(
        "{} Summary of {} files in {} directories saved to: {}",
        "✅".green(),
        count.files.to_string().cyan(),
        count.directories.to_string().cyan(),
        path.display().to_string().blue()
    );
}

pub fn print_nothing_selected() {
    println!("{} Nothing selected, no summary written.", "ℹ".yellow());
}

pub fn readable_size(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

#[derive(Debug, Serialize)]
pub struct CountReport {
    pub root: String,
    pub directories: usize,
    pub files: usize,
    pub bytes: u64,
    pub bytes_readable: String,
}

impl CountReport {
    pub fn new(root: &Path, count: &EntryCount) -> Self {
        Self {
            root: root.display().to_string(),
            directories: count.directories,
            files: count.files,
            bytes: count.bytes,
            bytes_readable: readable_size(count.bytes),
        }
    }
}

pub fn print_count(report: &CountReport, format: &str) -> Result<()> {
    match format.to_lowercase().as_str() {
        "json" => write_to_stdout(&serialize_to_json(report, true)?),
        "yaml" | "yml" => write_to_stdout(&serialize_to_yaml(report)?),
        _ => {
            print_count_table(report);
            Ok(())
        }
    }
}

fn print_count_table(report: &CountReport) {
    println!();
    println!("{}", " Selection Summary ".green().bold().underline());
    println!("{:<14} {}", "Root:".green(), report.root.cyan());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Directories").fg(Color::Green),
        Cell::new("Files").fg(Color::Green),
        Cell::new("Size").fg(Color::Green),
    ]);
    table.add_row(vec![
        Cell::new(report.directories).set_alignment(CellAlignment::Right),
        Cell::new(report.files).set_alignment(CellAlignment::Right),
        Cell::new(&report.bytes_readable)
            .set_alignment(CellAlignment::Right)
            .fg(Color::DarkGrey),
    ]);
    println!("{table}");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_to_file_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/out/summary.md");
        write_to_file(&path, "# hi\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# hi\n");
    }

    #[test]
    fn count_report_has_readable_size() {
        let count = EntryCount {
            directories: 2,
            files: 3,
            bytes: 2048,
        };
        let report = CountReport::new(Path::new("/proj"), &count);
        assert_eq!(report.bytes, 2048);
        assert!(report.bytes_readable.contains("KiB"));
    }
}
