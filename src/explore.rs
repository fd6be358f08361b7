use std::fs::File;
use std::io::{Read, Seek, Write};

use chrono::Utc;

use crate::areas::{self, MemArea};
use crate::pagemap::{PageDecoder, PageEntry};
use crate::Result;

/// Areas to walk, in filter-term order. An area matching several terms is
/// listed once per term.
pub fn select_areas<'a>(areas: &'a [MemArea], filters: &str) -> Vec<&'a MemArea> {
    if filters.is_empty() {
        return areas.iter().collect();
    }
    filters
        .split(',')
        .flat_map(move |filter| areas.iter().filter(move |area| area.label.contains(filter)))
        .collect()
}

/// One snapshot of a process: its area table plus the open page tables.
pub struct Explorer<R> {
    areas: Vec<MemArea>,
    decoder: PageDecoder<R>,
}

impl Explorer<File> {
    pub fn open(pid: i32, page_size: u64) -> Result<Explorer<File>> {
        let areas = areas::get_areas(pid)?;
        let decoder = PageDecoder::open(pid, page_size)?;
        Ok(Explorer::new(areas, decoder))
    }
}

impl<R: Read + Seek> Explorer<R> {
    pub fn new(areas: Vec<MemArea>, decoder: PageDecoder<R>) -> Explorer<R> {
        Explorer { areas, decoder }
    }

    pub fn areas(&self) -> &[MemArea] {
        &self.areas
    }

    /// Prints every selected area. The first error ends the whole report.
    pub fn print_areas<W: Write>(
        &mut self,
        out: &mut W,
        area_filters: &str,
        address_filter: u64,
        quiet: bool,
    ) -> Result<()> {
        let selected = select_areas(&self.areas, area_filters);
        debug!(
            "Selected {} of {} areas with filter '{}'",
            selected.len(),
            self.areas.len(),
            area_filters
        );
        for area in selected {
            print_area(&mut self.decoder, out, area, address_filter, quiet)?;
        }
        out.flush()?;
        Ok(())
    }
}

fn print_area<R: Read + Seek, W: Write>(
    decoder: &mut PageDecoder<R>,
    out: &mut W,
    area: &MemArea,
    address_filter: u64,
    quiet: bool,
) -> Result<()> {
    if address_filter != 0 && !area.contains(address_filter) {
        return Ok(());
    }

    if quiet {
        writeln!(out, "{}", area)?;
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{}", area)?;
    writeln!(out)?;

    let start_time = Utc::now();
    let page_size = decoder.page_size();
    let (first, last) = if address_filter != 0 {
        let page = area.start + (address_filter - area.start) / page_size * page_size;
        (page, page + 1)
    } else {
        (area.start, area.end)
    };

    let mut non_mapped = 0u64;
    for address in (first..last).step_by(page_size as usize) {
        let entry = decoder.page_entry(address)?;
        if !entry.present() && !entry.swapped() {
            non_mapped += 1;
            continue;
        }
        print_non_mapped(out, non_mapped)?;
        non_mapped = 0;
        print_page(decoder, out, address, entry)?;
    }
    print_non_mapped(out, non_mapped)?;

    debug!(
        "Walked {} in {} ms",
        area.label,
        (Utc::now() - start_time).num_milliseconds()
    );
    Ok(())
}

fn print_page<R: Read + Seek, W: Write>(
    decoder: &mut PageDecoder<R>,
    out: &mut W,
    address: u64,
    entry: PageEntry,
) -> Result<()> {
    if !entry.present() {
        writeln!(out, "0x{:016x}: swapped", address)?;
        return Ok(());
    }

    let pfn = entry.frame_number();
    let mut line = format!(
        "0x{:016x}: physical address: 0x{:016x} ",
        address,
        pfn.wrapping_mul(decoder.page_size())
    );
    if entry.file_page() {
        line.push_str("file-page ");
    }
    if entry.exclusive() {
        line.push_str("exclusive ");
    }
    if entry.soft_dirty() {
        line.push_str("soft-dirty ");
    }
    let frame = decoder.frame_info(pfn)?;
    writeln!(
        out,
        "{}count:{} flags:{}",
        line,
        frame.count,
        frame.flags.names().join(",")
    )?;
    Ok(())
}

fn print_non_mapped<W: Write>(out: &mut W, count: u64) -> Result<()> {
    if count != 0 {
        writeln!(out, "... {} non mapped pages ...", count)?;
    }
    Ok(())
}
