use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::pdf::document::Fit;
use crate::pdf::matcher::MatcherKind;
use crate::pdf::OpenMode;

#[derive(Parser)]
#[command(name = "rfcmark")]
#[command(about = "Add bookmarks to RFC PDFs from their table of contents")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub bookmark: BookmarkArgs,
}

/// Default action: bookmark a single PDF
#[derive(Args)]
pub struct BookmarkArgs {
    /// RFC PDF to add bookmarks to
    #[arg(required = true)]
    pub path: Option<PathBuf>,

    /// Output file (default: <name>_bookmark_version.pdf in the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// How much of the source document to keep
    #[arg(short, long, value_enum, default_value_t = OpenMode::Newly)]
    pub mode: OpenMode,

    /// View the bookmarks open with: fit, fitb, fith, fitv or xyz
    #[arg(long, value_parser = Fit::from_name, default_value = "fit")]
    pub fit: Fit,

    /// Read bookmarks from a title@page text file instead of the PDF's table of contents
    #[arg(short, long)]
    pub bookmarks: Option<PathBuf>,

    #[command(flatten)]
    pub catalogue: CatalogueArgs,
}

#[derive(Args, Clone)]
pub struct CatalogueArgs {
    /// Added to every page number found (pages not counted by the table of contents)
    #[arg(long, default_value = "0")]
    pub offset: u32,

    /// Pages to scan for the table of contents (e.g., "1-5")
    #[arg(long)]
    pub toc_pages: Option<String>,

    /// How table of contents lines are recognised
    #[arg(long, value_enum, default_value_t = MatcherKind::Dotted)]
    pub matcher: MatcherKind,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the table of contents found in a PDF
    #[command(alias = "toc")]
    Catalogue {
        /// PDF file to inspect
        path: PathBuf,

        #[command(flatten)]
        catalogue: CatalogueArgs,

        /// Write the entries as a title@page file instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the bookmarks (outline) of a PDF
    Outline {
        /// PDF file to inspect
        path: PathBuf,
    },

    /// Display PDF metadata
    Info {
        /// PDF file to inspect
        path: PathBuf,
    },

    /// Bookmark every PDF under a directory
    Batch {
        /// Directory to search for PDFs
        dir: PathBuf,

        /// Directory for the bookmarked copies (default: current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// How much of each source document to keep
        #[arg(short, long, value_enum, default_value_t = OpenMode::Newly)]
        mode: OpenMode,

        #[command(flatten)]
        catalogue: CatalogueArgs,
    },

    /// Run as MCP server
    Mcp,
}
