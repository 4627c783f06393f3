use std::path::Path;

const BUILTIN_TEMPLATE: &str = include_str!("layout_diff_prompt.txt");
const MSSIM_PLACEHOLDER: &str = "{{mssim}}";

/// Prompt text with a `{{mssim}}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(BUILTIN_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        std::fs::read_to_string(path).map(Self::new)
    }

    pub fn render(&self, mssim: f64) -> String {
        self.text.replace(MSSIM_PLACEHOLDER, &format!("{mssim:.4}"))
    }
}
