//! Summary tables printed after fetch and install

use std::fmt::{self, Write};

use console::Style;

use crate::installer::InstallSummary;

const MAX_CAUSE_WIDTH: usize = 60;

/// What happened to one product during discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Fetched,
    Cached,
    Skipped,
    Failed,
}

impl FetchStatus {
    fn style(self) -> Style {
        match self {
            Self::Fetched => Style::new().green(),
            Self::Cached => Style::new().cyan(),
            Self::Skipped => Style::new().yellow(),
            Self::Failed => Style::new().red().bold(),
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetched => "fetched",
            Self::Cached => "cached",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    pub product: String,
    pub backend: String,
    pub status: FetchStatus,
    pub cause: String,
}

impl FetchRecord {
    pub fn new(
        product: impl Into<String>,
        backend: impl Into<String>,
        status: FetchStatus,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            product: product.into(),
            backend: backend.into(),
            status,
            cause: cause.into(),
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// One row per product: name, backend, status, cause
pub fn render_fetch_report(records: &[FetchRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let headers = ["Product", "Backend", "Status", "Cause"];
    let product_width = records
        .iter()
        .map(|r| r.product.chars().count())
        .chain([headers[0].len()])
        .max()
        .unwrap_or_default();
    let backend_width = records
        .iter()
        .map(|r| r.backend.chars().count())
        .chain([headers[1].len()])
        .max()
        .unwrap_or_default();
    let status_width = "skipped".len().max(headers[2].len());

    let bold = Style::new().bold();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        bold.apply_to(format!(
            "{:<product_width$}  {:<backend_width$}  {:<status_width$}  {}",
            headers[0], headers[1], headers[2], headers[3]
        ))
    );

    for record in records {
        let status = format!("{:<status_width$}", record.status.to_string());
        let _ = writeln!(
            out,
            "{:<product_width$}  {:<backend_width$}  {}  {}",
            record.product,
            record.backend,
            record.status.style().apply_to(status),
            truncate(&record.cause, MAX_CAUSE_WIDTH)
        );
    }
    out
}

pub fn render_install_summary(summary: &InstallSummary) -> String {
    let label = Style::new().bold();
    let mut out = String::new();
    let _ = writeln!(out, "{}", label.apply_to("Installation summary"));
    let _ = writeln!(out, "  Products processed:  {}", summary.products_processed.len());
    let _ = writeln!(
        out,
        "  Products skipped:    {}",
        summary.products_skipped.len()
    );
    let _ = writeln!(out, "  Placements made:     {}", summary.placements);
    let _ = writeln!(out, "  Conflicts skipped:   {}", summary.conflicts);
    if !summary.products_skipped.is_empty() {
        let _ = writeln!(
            out,
            "  {} {}",
            Style::new().dim().apply_to("no placement section:"),
            summary.products_skipped.join(", ")
        );
    }
    out
}
