//! Export serializer
//!
//! Pure rendering of one saved list into a downloadable document. Item order
//! and the full field set are preserved in every format.

use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use quick_xml::escape::escape;
use thiserror::Error;

use crate::model::{ListItem, SavedList};

const COLUMNS: [&str; 9] = [
    "Title",
    "Artist",
    "Album",
    "ISRC",
    "Release Date",
    "Duration",
    "Source",
    "Link",
    "Added At",
];

const TABLE_STYLE: &str = "border-collapse:collapse;font-family:Arial,sans-serif;font-size:11pt";
const HEADER_STYLE: &str = "background:#1db954;color:#ffffff;font-weight:bold;border:1px solid #999;padding:4px";
const CELL_STYLE: &str = "border:1px solid #999;padding:4px";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document rendering failed")]
    Render(#[from] fmt::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Delimited text
    Csv,
    /// Lossless structured data
    Json,
    /// Spreadsheet markup table
    Spreadsheet,
    /// Word-processor document
    Document,
    /// Card layout opened for print-to-PDF
    Print,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Csv,
        ExportFormat::Json,
        ExportFormat::Spreadsheet,
        ExportFormat::Document,
        ExportFormat::Print,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Spreadsheet => "xls",
            ExportFormat::Document => "doc",
            ExportFormat::Print => "html",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv;charset=utf-8",
            ExportFormat::Json => "application/json",
            ExportFormat::Spreadsheet => "application/vnd.ms-excel",
            ExportFormat::Document => "application/msword",
            ExportFormat::Print => "text/html;charset=utf-8",
        }
    }

    /// Download name derived from the list name
    pub fn file_name(self, list: &SavedList) -> String {
        let slug: String = list
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        let slug = slug
            .split('-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        let slug = if slug.is_empty() { "list".to_string() } else { slug };
        match self {
            ExportFormat::Print => format!("{}-print.{}", slug, self.extension()),
            _ => format!("{}.{}", slug, self.extension()),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Spreadsheet => "excel",
            ExportFormat::Document => "word",
            ExportFormat::Print => "pdf",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "excel" | "xls" | "spreadsheet" => Ok(ExportFormat::Spreadsheet),
            "word" | "doc" | "document" => Ok(ExportFormat::Document),
            "pdf" | "print" | "html" => Ok(ExportFormat::Print),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

pub fn export(list: &SavedList, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(list),
        ExportFormat::Json => Ok(serde_json::to_vec_pretty(list)?),
        ExportFormat::Spreadsheet => Ok(to_spreadsheet(list)?.into_bytes()),
        ExportFormat::Document => Ok(to_document(list)?.into_bytes()),
        ExportFormat::Print => Ok(to_print(list)?.into_bytes()),
    }
}

/// Parse a structured-data export back into a list
pub fn import_json(bytes: &[u8]) -> Result<SavedList, ExportError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn row(item: &ListItem) -> [String; 9] {
    let r = &item.record;
    [
        r.title.clone(),
        r.artist.clone(),
        r.album.clone(),
        r.isrc.clone().unwrap_or_default(),
        r.release_date.clone().unwrap_or_default(),
        r.duration_display(),
        r.source.display_name().to_string(),
        r.external_url.clone().unwrap_or_default(),
        item.added_at.to_rfc3339(),
    ]
}

fn to_csv(list: &SavedList) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for item in &list.items {
        writer.write_record(row(item))?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))
}

fn html_table(list: &SavedList, out: &mut String) -> fmt::Result {
    write!(out, "<table style=\"{}\">\n<tr>", TABLE_STYLE)?;
    for column in COLUMNS {
        write!(out, "<th style=\"{}\">{}</th>", HEADER_STYLE, column)?;
    }
    out.push_str("</tr>\n");
    for item in &list.items {
        out.push_str("<tr>");
        for value in row(item) {
            write!(out, "<td style=\"{}\">{}</td>", CELL_STYLE, escape(value.as_str()))?;
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
    Ok(())
}

fn to_spreadsheet(list: &SavedList) -> Result<String, fmt::Error> {
    let name = escape(list.name.as_str());
    let mut out = String::new();
    out.push_str(
        "<html xmlns:o=\"urn:schemas-microsoft-com:office:office\" \
         xmlns:x=\"urn:schemas-microsoft-com:office:excel\" \
         xmlns=\"http://www.w3.org/TR/REC-html40\">\n<head>\n<meta charset=\"utf-8\">\n",
    );
    write!(
        out,
        "<!--[if gte mso 9]><xml><x:ExcelWorkbook><x:ExcelWorksheets><x:ExcelWorksheet>\
         <x:Name>{}</x:Name><x:WorksheetOptions><x:DisplayGridlines/></x:WorksheetOptions>\
         </x:ExcelWorksheet></x:ExcelWorksheets></x:ExcelWorkbook></xml><![endif]-->\n",
        name
    )?;
    out.push_str("</head>\n<body>\n");
    html_table(list, &mut out)?;
    out.push_str("</body>\n</html>\n");
    Ok(out)
}

fn to_document(list: &SavedList) -> Result<String, fmt::Error> {
    let name = escape(list.name.as_str());
    let mut out = String::new();
    out.push_str(
        "<html xmlns:o=\"urn:schemas-microsoft-com:office:office\" \
         xmlns:w=\"urn:schemas-microsoft-com:office:word\" \
         xmlns=\"http://www.w3.org/TR/REC-html40\">\n<head>\n<meta charset=\"utf-8\">\n",
    );
    write!(out, "<title>{}</title>\n", name)?;
    out.push_str(
        "<style>body{font-family:Arial,sans-serif;} h1{color:#191414;} \
         p.meta{color:#666;font-size:10pt;}</style>\n</head>\n<body>\n",
    );
    write!(
        out,
        "<h1>{}</h1>\n<p class=\"meta\">{} tracks, updated {}</p>\n",
        name,
        list.len(),
        list.updated_at.format("%Y-%m-%d %H:%M UTC")
    )?;
    html_table(list, &mut out)?;
    out.push_str("</body>\n</html>\n");
    Ok(out)
}

fn to_print(list: &SavedList) -> Result<String, fmt::Error> {
    let name = escape(list.name.as_str());
    let mut out = String::new();
    write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n",
        name
    )?;
    out.push_str(
        "<style>\
         body{font-family:Arial,sans-serif;margin:24px;}\
         .card{border:1px solid #ccc;border-radius:6px;padding:12px;margin-bottom:12px;page-break-inside:avoid;}\
         .card h2{margin:0 0 4px;font-size:14pt;}\
         .card dl{display:grid;grid-template-columns:120px 1fr;margin:0;font-size:10pt;}\
         .card dt{color:#666;}\
         @media print{body{margin:0;}}\
         </style>\n</head>\n<body>\n",
    );
    write!(out, "<h1>{}</h1>\n", name)?;

    for (position, item) in list.items.iter().enumerate() {
        let values = row(item);
        write!(
            out,
            "<div class=\"card\">\n<h2>{}. {}</h2>\n<dl>",
            position + 1,
            escape(values[0].as_str())
        )?;
        for (column, value) in COLUMNS.iter().zip(values.iter()).skip(1) {
            write!(out, "<dt>{}</dt><dd>{}</dd>", column, escape(value.as_str()))?;
        }
        out.push_str("</dl>\n</div>\n");
    }

    out.push_str("<script>window.onload = function () { window.print(); };</script>\n</body>\n</html>\n");
    Ok(out)
}
