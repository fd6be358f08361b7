extern crate byteorder;
extern crate chrono;

#[macro_use]
extern crate log;

pub mod areas;
pub mod explore;
pub mod pagemap;
pub mod record;

use std::io;
use std::path::PathBuf;

use nix::unistd::{sysconf, SysconfVar};
use thiserror::Error;

pub use areas::MemArea;
pub use explore::Explorer;
pub use pagemap::{FrameInfo, KPageFlags, PageDecoder, PageEntry};
pub use record::RecordFile;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("malformed memory area line: '{line}'")]
    Parse { line: String },
    #[error("unable to read record {index} of {resource}: {source}")]
    Read {
        resource: String,
        index: u64,
        source: io::Error,
    },
    #[error("invalid pid '{input}'")]
    Pid { input: String },
    #[error("invalid address '{input}'")]
    Address { input: String },
    #[error("unable to determine page size: {0}")]
    PageSize(String),
    #[error("unable to write report: {0}")]
    Output(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Page size of the running kernel, as reported by `sysconf(_SC_PAGESIZE)`.
pub fn page_size() -> Result<u64> {
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => Ok(size as u64),
        Ok(_) => Err(Error::PageSize("sysconf returned no value".to_owned())),
        Err(e) => Err(Error::PageSize(e.to_string())),
    }
}

/// Parses the `--address` argument. An empty string means "no filter" and maps
/// to 0, which is also what a literal zero address parses to.
pub fn parse_address(input: &str) -> Result<u64> {
    if input.is_empty() {
        return Ok(0);
    }
    let hex = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    u64::from_str_radix(hex, 16).map_err(|_| Error::Address {
        input: input.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_with_and_without_prefix() {
        assert_eq!(parse_address("0x7f66a002ab70").unwrap(), 0x7f66_a002_ab70);
        assert_eq!(parse_address("7f66a002ab70").unwrap(), 0x7f66_a002_ab70);
        assert_eq!(parse_address("0XFF").unwrap(), 0xff);
    }

    #[test]
    fn empty_address_is_no_filter() {
        assert_eq!(parse_address("").unwrap(), 0);
    }

    #[test]
    fn malformed_address_is_rejected() {
        for bad in &["0x", "xyz", "0x12g4", "-1", "10000000000000000"] {
            match parse_address(bad) {
                Err(Error::Address { input }) => assert_eq!(&input, bad),
                other => panic!("expected address error for {}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn page_size_is_a_power_of_two() {
        let size = page_size().unwrap();
        assert!(size >= 4096);
        assert_eq!(size & (size - 1), 0);
    }
}
