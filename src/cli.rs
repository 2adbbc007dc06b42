// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
//   spider [-r] [-l N] [-p PATH] URL
//
// Without -r only the seed page is scanned. With -r the crawl follows
// relative links up to N levels deep.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::crawl::CrawlConfig;

#[derive(Parser, Debug)]
#[command(
    name = "spider",
    version,
    about = "Extract images from a website, optionally following links recursively",
    long_about = "spider fetches a web page, downloads every jpg/jpeg/png/gif/bmp image it references, \
                  and with -r follows the page's relative links to do the same on linked pages."
)]
pub struct Cli {
    /// The URL to crawl
    pub url: String,

    /// Download images recursively, following relative links
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Maximum recursion depth (only used with -r)
    #[arg(short = 'l', long = "level", value_name = "N", default_value_t = 5)]
    pub depth: usize,

    /// Directory to save images in; created if missing
    #[arg(short = 'p', long = "path", value_name = "PATH", default_value = "./data/")]
    pub save_dir: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub timeout: u64,

    /// Maximum number of requests in flight at once
    #[arg(long, value_name = "N", default_value_t = 8, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Print the crawl report as JSON once the crawl is done
    #[arg(long)]
    pub json: bool,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Depth actually used for the crawl: 1 unless recursive mode is on.
    pub fn effective_depth(&self) -> usize {
        if self.recursive {
            self.depth
        } else {
            1
        }
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            save_dir: self.save_dir.clone(),
            depth: self.effective_depth(),
            timeout: Duration::from_secs(self.timeout),
            concurrency: usize::from(self.concurrency),
        }
    }

    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
