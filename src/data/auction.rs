//! Auction announcement: which ISINs are offered at the next placement.
//!
//! The Ministry of Finance publishes the announcement as a `.docx`. We only
//! need the ISINs, so the document body (`word/document.xml`) is scanned
//! paragraph by paragraph instead of being parsed as a full OOXML tree.

use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::domain::{AuctionCandidateSet, ISIN_PREFIX};
use crate::error::AppError;

const DOCUMENT_ENTRY: &str = "word/document.xml";

static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:p(?:\s[^>]*)?>(.*?)</w:p>").expect("valid paragraph regex"));
static TEXT_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("valid text run regex"));
static ISIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{}[0-9A-Z]{{6}}", regex::escape(ISIN_PREFIX))).expect("valid isin regex")
});

pub struct AuctionClient {
    client: Client,
    url: String,
}

impl AuctionClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Download the announcement and extract the offered ISINs.
    pub fn fetch(&self) -> Result<AuctionCandidateSet, AppError> {
        debug!(url = %self.url, "requesting auction announcement");
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| AppError::new(4, format!("Auction document request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Auction document request failed with status {}.", resp.status()),
            ));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| AppError::new(4, format!("Failed to read auction document: {e}")))?;
        let xml = extract_document_xml(&bytes)?;

        let mut set = AuctionCandidateSet::new(parse_auction_document(&xml));
        set.source_url = Some(self.url.clone());
        info!(count = set.len(), "parsed auction announcement");
        Ok(set)
    }
}

/// Pull `word/document.xml` out of a `.docx` container.
pub fn extract_document_xml(docx: &[u8]) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx))
        .map_err(|e| AppError::new(4, format!("Auction document is not a valid .docx: {e}")))?;
    let mut entry = archive
        .by_name(DOCUMENT_ENTRY)
        .map_err(|e| AppError::new(4, format!("Auction document has no {DOCUMENT_ENTRY}: {e}")))?;

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| AppError::new(4, format!("Failed to read {DOCUMENT_ENTRY}: {e}")))?;
    Ok(xml)
}

/// ISINs mentioned in the document body, in order of first appearance.
///
/// Word splits text into runs at arbitrary points, so the runs of each
/// paragraph are joined before matching.
pub fn parse_auction_document(xml: &str) -> Vec<String> {
    let mut isins: Vec<String> = Vec::new();
    for paragraph in PARAGRAPH_RE.captures_iter(xml) {
        let text: String = TEXT_RUN_RE
            .captures_iter(&paragraph[1])
            .map(|run| run[1].to_string())
            .collect();
        if !text.contains(ISIN_PREFIX) {
            continue;
        }
        for m in ISIN_RE.find_iter(&text) {
            if !isins.iter().any(|i| i == m.as_str()) {
                isins.push(m.as_str().to_string());
            }
        }
    }
    isins
}
