//! Per-run naming context.

/// Vendor language used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en_us";

/// Language tag of manifest titles.
pub const DEFAULT_TITLE_LANGUAGE: &str = "no";

/// State shared by every question of one export run.
///
/// The scope token namespaces every identifier the run produces. Any stable
/// string works; the site URL is the usual choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    scope: String,
    language: String,
    title_language: String,
}

impl RunContext {
    pub fn new(scope_token: &str) -> Self {
        Self {
            scope: clean_scope(scope_token),
            language: DEFAULT_LANGUAGE.to_string(),
            title_language: DEFAULT_TITLE_LANGUAGE.to_string(),
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    #[must_use]
    pub fn with_title_language(mut self, language: impl Into<String>) -> Self {
        self.title_language = language.into();
        self
    }

    /// The scope token reduced to ASCII letters and digits.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn title_language(&self) -> &str {
        &self.title_language
    }

    /// `RESPONSE_{scope}_{id}`.
    pub fn response_identifier(&self, question_id: u64) -> String {
        format!("RESPONSE_{}_{question_id}", self.scope)
    }

    /// `{scope}_{id}`, the `assessmentItem` identifier.
    pub fn item_identifier(&self, question_id: u64) -> String {
        format!("{}_{question_id}", self.scope)
    }

    /// `{scope}-{id}`, the manifest resource identifier.
    pub fn resource_identifier(&self, question_id: u64) -> String {
        format!("{}-{question_id}", self.scope)
    }
}

/// Archive path of an item document.
pub fn item_path(qtype: &str, question_id: u64) -> String {
    format!("content_question_qti2_{qtype}_{question_id}.xml")
}

fn clean_scope(token: &str) -> String {
    token.chars().filter(char::is_ascii_alphanumeric).collect()
}
