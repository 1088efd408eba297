use std::path::Path;

const DOCUMENT_EXTENSIONS: &[&str] = &[
    "doc", "docx", "txt", "rtf", "html", "htm", "xml", "odt", "wps", "wpd", "css", "json",
];

const SPREADSHEET_EXTENSIONS: &[&str] = &["xls", "xlsb", "xlsx", "ods", "csv"];

const PRESENTATION_EXTENSIONS: &[&str] = &["ppt", "pptx", "odp"];

/// Which of the office suite's PDF export filters handles a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Document,
    Spreadsheet,
    Presentation,
    Unsupported,
}

impl FilterMode {
    pub const SUPPORTED: [FilterMode; 3] = [
        FilterMode::Document,
        FilterMode::Spreadsheet,
        FilterMode::Presentation,
    ];

    /// Classify a bare extension (no leading dot). Matching is exact, so
    /// `DOCX` is not `docx`.
    pub fn classify(ext: &str) -> Self {
        FilterMode::SUPPORTED
            .into_iter()
            .find(|mode| mode.extensions().contains(&ext))
            .unwrap_or(FilterMode::Unsupported)
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::classify)
            .unwrap_or(FilterMode::Unsupported)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterMode::Document => "document",
            FilterMode::Spreadsheet => "spreadsheet",
            FilterMode::Presentation => "presentation",
            FilterMode::Unsupported => "unsupported",
        }
    }

    /// Export filter name understood by `--convert-to pdf:<filter>`
    pub fn export_filter(&self) -> Option<&'static str> {
        match self {
            FilterMode::Document => Some("writer_pdf_Export"),
            FilterMode::Spreadsheet => Some("calc_pdf_Export"),
            FilterMode::Presentation => Some("impress_pdf_Export"),
            FilterMode::Unsupported => None,
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FilterMode::Document => DOCUMENT_EXTENSIONS,
            FilterMode::Spreadsheet => SPREADSHEET_EXTENSIONS,
            FilterMode::Presentation => PRESENTATION_EXTENSIONS,
            FilterMode::Unsupported => &[],
        }
    }

    pub fn is_supported(&self) -> bool {
        *self != FilterMode::Unsupported
    }
}
