//! Assembly of a CI configuration directory into one YAML stream.

/// Marker that starts a YAML document.
pub const DOCUMENT_SEPARATOR: &str = "---";

/// Returns `true` if `path` names a YAML file (`.yaml` or `.yml`, exact case).
pub fn is_config_candidate(path: &str) -> bool {
    path.ends_with(".yaml") || path.ends_with(".yml")
}

/// Multi-document YAML text built from files in listing order.
///
/// Every document is followed by a newline. Every document but the first is
/// preceded by a separator line unless it already starts with one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigBundle {
    text: String,
    documents: usize,
}

impl ConfigBundle {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one document.
    pub fn push(&mut self, document: &str) {
        if !self.text.is_empty() && !document.starts_with(DOCUMENT_SEPARATOR) {
            self.text.push_str(DOCUMENT_SEPARATOR);
            self.text.push('\n');
        }
        self.text.push_str(document);
        self.text.push('\n');
        self.documents += 1;
    }

    /// Number of documents appended so far.
    pub fn len(&self) -> usize {
        self.documents
    }

    /// Returns `true` if no document has been appended.
    pub fn is_empty(&self) -> bool {
        self.documents == 0
    }

    /// The assembled text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consumes the bundle, returning the assembled text.
    pub fn into_string(self) -> String {
        self.text
    }
}
