use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::{Error, Result};

pub const ANONYMOUS: &str = "anonymous";

/// One line of `/proc/<pid>/maps`: the range `[start, end)` and what backs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemArea {
    pub start: u64,
    pub end: u64,
    pub label: String,
}

impl MemArea {
    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address < self.end
    }

    fn parse(line: &str) -> Result<Option<MemArea>> {
        let fields: Vec<&str> = line.split_ascii_whitespace().collect();
        let range = match fields.first() {
            Some(range) => *range,
            None => return Ok(None),
        };
        let malformed = || Error::Parse {
            line: line.to_owned(),
        };
        let (start, end) = range.split_once('-').ok_or_else(malformed)?;
        let start = parse_hex(start).ok_or_else(malformed)?;
        let end = parse_hex(end).ok_or_else(malformed)?;
        if start >= end {
            return Err(malformed());
        }
        // range perms offset dev inode [path]; a path may itself contain spaces
        let label = if fields.len() >= 6 {
            fields[5..].join(" ")
        } else {
            ANONYMOUS.to_owned()
        };
        Ok(Some(MemArea { start, end, label }))
    }
}

impl fmt::Display for MemArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Area '{}', range 0x{:016x} - 0x{:016x} ({})",
            self.label,
            self.start,
            self.end,
            human_bytes(self.size())
        )
    }
}

// from_str_radix alone would also take a leading '+'
fn parse_hex(data: &str) -> Option<u64> {
    if data.is_empty() || !data.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(data, 16).ok()
}

/// Parses a maps listing. Any malformed line fails the whole listing.
pub fn parse_areas(content: &str) -> Result<Vec<MemArea>> {
    let mut areas = Vec::new();
    for line in content.lines() {
        if let Some(area) = MemArea::parse(line)? {
            areas.push(area);
        }
    }
    Ok(areas)
}

pub fn get_areas(pid: i32) -> Result<Vec<MemArea>> {
    let path = PathBuf::from(format!("/proc/{}/maps", pid));
    let content = fs::read_to_string(&path).map_err(|source| Error::Open { path, source })?;
    let areas = parse_areas(&content)?;
    debug!("Process {} has {} memory areas", pid, areas.len());
    Ok(areas)
}

/// SI formatting of a byte count: "512 B", "4.1 kB", "16 kB", "1.0 MB".
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
    if bytes < 10 {
        return format!("{} B", bytes);
    }
    let mut exp = 0;
    let mut scale = 1u64;
    while exp + 1 < UNITS.len() && bytes / scale >= 1000 {
        scale *= 1000;
        exp += 1;
    }
    let value = (bytes as f64 / scale as f64 * 10.0 + 0.5).floor() / 10.0;
    if value < 10.0 {
        format!("{:.1} {}", value, UNITS[exp])
    } else {
        format!("{:.0} {}", value, UNITS[exp])
    }
}
