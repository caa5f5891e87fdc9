//! feedscribe CLI: convert a blog export feed into Markdown posts.
//!
//! Reads an RSS export, writes one Markdown file per post with YAML
//! frontmatter, and reports how many posts were written.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
