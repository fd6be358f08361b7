extern crate ptexplore;
extern crate simplelog;

#[macro_use]
extern crate log;

use std::io;
use std::process;

use clap::{App, Arg, ArgMatches};
use simplelog::*;

use ptexplore::{Error, Explorer};

const ABOUT: &str = "Explore page table of a process under Linux.\n\
Works by attaching to a process and printing each memory area. \
Optionally, memory areas can be restricted via a filter.";

fn main() {
    let matches = App::new("ptexplore")
        .about(ABOUT)
        .arg(
            Arg::with_name("pid")
                .long("pid")
                .takes_value(true)
                .required(true)
                .help("Pid of the process to analyze (e.g. 42)"),
        )
        .arg(
            Arg::with_name("areas")
                .long("areas")
                .takes_value(true)
                .help("Comma separated list of memory areas (even patterns) to analyze (e.g. 'stack,heap,libc')"),
        )
        .arg(
            Arg::with_name("address")
                .long("address")
                .takes_value(true)
                .help("Analyze a single address (e.g. '0x7f66a002ab70')"),
        )
        .arg(
            Arg::with_name("quiet")
                .long("quiet")
                .help("Don't print page table details, just a summary of the memory areas"),
        )
        .arg(
            Arg::with_name("verbose")
                .long("verbose")
                .short("v")
                .help("Log diagnostics to stderr"),
        )
        .get_matches();

    let level = if matches.is_present("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )]) {
        eprintln!("Unable to initialise logging: {}", e);
    }

    if let Err(e) = run(&matches) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let pid = parse_pid(matches.value_of("pid").unwrap_or(""))?;
    let address = ptexplore::parse_address(matches.value_of("address").unwrap_or(""))?;
    let area_filters = matches.value_of("areas").unwrap_or("");
    let quiet = matches.is_present("quiet");

    let page_size = ptexplore::page_size()?;
    info!("Exploring pid {} with page size {}", pid, page_size);

    let mut explorer = Explorer::open(pid, page_size)?;
    info!("Process {} has {} memory areas", pid, explorer.areas().len());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    explorer.print_areas(&mut out, area_filters, address, quiet)
}

fn parse_pid(input: &str) -> Result<i32, Error> {
    match input.parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(Error::Pid {
            input: input.to_owned(),
        }),
    }
}
