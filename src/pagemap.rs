// https://www.kernel.org/doc/Documentation/vm/pagemap.txt
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use bitflags::bitflags;

use crate::record::RecordFile;
use crate::{Error, Result};

pub const PRESENT_PAGE_BIT: u8 = 63;
pub const SWAPPED_PAGE_BIT: u8 = 62;
pub const FILE_PAGE_BIT: u8 = 61;
pub const EXCLUSIVE_PAGE_BIT: u8 = 56;
pub const SOFT_DIRTY_PAGE_BIT: u8 = 55;

// Bits 0-54  page frame number (PFN) if present
pub const PFN_MASK: u64 = 0x7FFFFFFFFFFFFF;

pub const KPAGECOUNT_PATH: &str = "/proc/kpagecount";
pub const KPAGEFLAGS_PATH: &str = "/proc/kpageflags";

/// A raw `/proc/<pid>/pagemap` word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageEntry(pub u64);

impl PageEntry {
    fn bit(self, bit: u8) -> bool {
        self.0 & 1 << bit != 0
    }

    pub fn present(self) -> bool {
        self.bit(PRESENT_PAGE_BIT)
    }

    pub fn swapped(self) -> bool {
        self.bit(SWAPPED_PAGE_BIT)
    }

    pub fn file_page(self) -> bool {
        self.bit(FILE_PAGE_BIT)
    }

    pub fn exclusive(self) -> bool {
        self.bit(EXCLUSIVE_PAGE_BIT)
    }

    pub fn soft_dirty(self) -> bool {
        self.bit(SOFT_DIRTY_PAGE_BIT)
    }

    /// Only meaningful when the page is present.
    pub fn frame_number(self) -> u64 {
        self.0 & PFN_MASK
    }
}

bitflags! {
    /// Classification bits of `/proc/kpageflags`. Bits the kernel may add later
    /// are retained but have no name.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct KPageFlags: u64 {
        const LOCKED = 1 << 0;
        const ERROR = 1 << 1;
        const REFERENCED = 1 << 2;
        const UPTODATE = 1 << 3;
        const DIRTY = 1 << 4;
        const LRU = 1 << 5;
        const ACTIVE = 1 << 6;
        const SLAB = 1 << 7;
        const WRITEBACK = 1 << 8;
        const RECLAIM = 1 << 9;
        const BUDDY = 1 << 10;
        const MMAP = 1 << 11;
        const ANON = 1 << 12;
        const SWAPCACHE = 1 << 13;
        const SWAPBACKED = 1 << 14;
        const COMPOUND_HEAD = 1 << 15;
        const COMPOUND_TAIL = 1 << 16;
        const HUGE = 1 << 17;
        const UNEVICTABLE = 1 << 18;
        const HWPOISON = 1 << 19;
        const NOPAGE = 1 << 20;
        const KSM = 1 << 21;
        const THP = 1 << 22;
        const BALLOON = 1 << 23;
        const ZERO_PAGE = 1 << 24;
        const IDLE = 1 << 25;
    }
}

impl KPageFlags {
    /// Names of the known flags that are set, lowest bit first.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// What the kernel knows about one physical frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    pub count: u64,
    pub flags: KPageFlags,
}

/// Resolves virtual addresses through the process pagemap, and frame numbers
/// through the global kpagecount/kpageflags tables.
pub struct PageDecoder<R> {
    page_map: RecordFile<R>,
    page_count: RecordFile<R>,
    page_flags: RecordFile<R>,
    page_size: u64,
}

impl PageDecoder<File> {
    pub fn open(pid: i32, page_size: u64) -> Result<PageDecoder<File>> {
        // This is why we need to run the program as root
        PageDecoder::open_paths(
            format!("/proc/{}/pagemap", pid),
            KPAGECOUNT_PATH,
            KPAGEFLAGS_PATH,
            page_size,
        )
    }

    /// Opens the three tables in order; the first one missing is the error.
    pub fn open_paths<P: AsRef<Path>, C: AsRef<Path>, F: AsRef<Path>>(
        page_map: P,
        page_count: C,
        page_flags: F,
        page_size: u64,
    ) -> Result<PageDecoder<File>> {
        let page_map = RecordFile::open(page_map)?;
        let page_count = RecordFile::open(page_count)?;
        let page_flags = RecordFile::open(page_flags)?;
        PageDecoder::new(page_map, page_count, page_flags, page_size)
    }
}

impl<R: Read + Seek> PageDecoder<R> {
    pub fn new(
        page_map: RecordFile<R>,
        page_count: RecordFile<R>,
        page_flags: RecordFile<R>,
        page_size: u64,
    ) -> Result<PageDecoder<R>> {
        if page_size == 0 {
            return Err(Error::PageSize("page size must be non-zero".to_owned()));
        }
        Ok(PageDecoder {
            page_map,
            page_count,
            page_flags,
            page_size,
        })
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn page_entry(&mut self, address: u64) -> Result<PageEntry> {
        self.page_map
            .read(address / self.page_size)
            .map(PageEntry)
    }

    pub fn frame_info(&mut self, pfn: u64) -> Result<FrameInfo> {
        let count = self.page_count.read(pfn)?;
        let flags = KPageFlags::from_bits_retain(self.page_flags.read(pfn)?);
        Ok(FrameInfo { count, flags })
    }
}
