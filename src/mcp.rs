use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pdf::catalogue::{extract_catalogue_with, CatalogueOptions};
use crate::pdf::matcher::MatcherKind;
use crate::pdf::outline::read_outline;
use crate::pdf::workflow::{self, BookmarkJob};
use crate::pdf::{OpenMode, PdfHandle};

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PathRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CatalogueRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
    #[schemars(description = "Added to every page number found (default: 0)")]
    #[serde(default)]
    pub page_offset: u32,
    #[schemars(description = "Pages to scan for the table of contents, e.g. '1-5' (default: all)")]
    #[serde(default)]
    pub toc_pages: Option<String>,
    #[schemars(description = "Line matcher: 'dotted' (default), 'dotted-first' or 'spaced'")]
    #[serde(default)]
    pub matcher: Option<String>,
}

fn catalogue_options(
    page_offset: u32,
    toc_pages: &Option<String>,
    matcher: &Option<String>,
) -> Result<CatalogueOptions, String> {
    let matcher = match matcher.as_deref() {
        None => MatcherKind::default(),
        Some(name) => parse_enum(name)?,
    };
    Ok(CatalogueOptions {
        page_offset,
        pages: toc_pages.clone(),
        matcher,
    })
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddBookmarksRequest {
    #[schemars(description = "Path to the source PDF file")]
    pub path: String,
    #[schemars(description = "Added to every page number (default: 0)")]
    #[serde(default)]
    pub page_offset: u32,
    #[schemars(description = "Pages to scan for the table of contents, e.g. '1-5' (default: all)")]
    #[serde(default)]
    pub toc_pages: Option<String>,
    #[schemars(description = "Line matcher: 'dotted' (default), 'dotted-first' or 'spaced'")]
    #[serde(default)]
    pub matcher: Option<String>,
    #[schemars(description = "Output file path (default: <name>_bookmark_version.pdf in the working directory)")]
    #[serde(default)]
    pub output: Option<String>,
    #[schemars(description = "'newly' keeps only the pages (default), 'clone' keeps the whole document")]
    #[serde(default)]
    pub mode: Option<String>,
    #[schemars(description = "Text file of title@page lines to use instead of the PDF's table of contents")]
    #[serde(default)]
    pub bookmarks_file: Option<String>,
}

fn parse_enum<T: serde::de::DeserializeOwned>(name: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| format!("unknown value '{}'", name))
}

fn to_json<T: Serialize>(result: &T) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|e| format!("Error: {}", e))
}

#[derive(Debug, Clone)]
pub struct RfcServer {
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

impl RfcServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }
}

impl Default for RfcServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl RfcServer {
    #[tool(description = "Find the table of contents of an RFC PDF by scanning its page text for lines like 'Title ..... 12'. Returns title/page pairs.")]
    fn rfc_catalogue(&self, Parameters(req): Parameters<CatalogueRequest>) -> String {
        let options = match catalogue_options(req.page_offset, &req.toc_pages, &req.matcher) {
            Ok(o) => o,
            Err(e) => return format!("Error: {}", e),
        };

        match extract_catalogue_with(&req.path, &options) {
            Ok(entries) => to_json(&entries),
            Err(e) => format!("Error: {:#}", e),
        }
    }

    #[tool(description = "Add bookmarks built from an RFC PDF's table of contents (or a title@page file) and write a new PDF")]
    fn rfc_add_bookmarks(&self, Parameters(req): Parameters<AddBookmarksRequest>) -> String {
        let catalogue = match catalogue_options(req.page_offset, &req.toc_pages, &req.matcher) {
            Ok(o) => o,
            Err(e) => return format!("Error: {}", e),
        };
        let mode = match req.mode.as_deref() {
            None => OpenMode::default(),
            Some(name) => match parse_enum(name) {
                Ok(m) => m,
                Err(e) => return format!("Error: {}", e),
            },
        };

        let mut job = BookmarkJob::new(&req.path);
        if let Some(output) = req.output {
            job.output = PathBuf::from(output);
        }
        job.mode = mode;
        job.catalogue = catalogue;
        job.bookmarks_file = req.bookmarks_file.map(PathBuf::from);

        match workflow::run(&job) {
            Ok(report) => to_json(&report),
            Err(e) => format!("Error: {:#}", e),
        }
    }

    #[tool(description = "Get the bookmarks (outline) of a PDF as structured data")]
    fn pdf_outline(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        match read_outline(&path) {
            Ok(items) => to_json(&items),
            Err(e) => format!("Error: {:#}", e),
        }
    }

    #[tool(description = "Get PDF metadata including title, author, creator, producer, creation date, and page count")]
    fn pdf_info(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        match PdfHandle::open(&path, OpenMode::Clone) {
            Ok(handle) => to_json(&handle.info()),
            Err(e) => format!("Error: {:#}", e),
        }
    }
}

impl ServerHandler for RfcServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Tools for bookmarking RFC PDFs. Use rfc_catalogue to preview the table of \
                 contents found in a PDF, rfc_add_bookmarks to write a bookmarked copy, \
                 pdf_outline to read existing bookmarks, and pdf_info for document metadata."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server() -> Result<()> {
    let server = RfcServer::new();

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}
