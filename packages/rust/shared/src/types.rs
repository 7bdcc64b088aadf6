//! Core domain types: scraping profiles, their field schema, and extracted records.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{PageSiftError, Result};

/// A single extracted record: field name → JSON value, in insertion order.
pub type Record = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one scraping session (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Field schema
// ---------------------------------------------------------------------------

/// Value type of an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    String,
    Integer,
}

impl FieldKind {
    /// JSON Schema type name for this kind.
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }
}

/// One column of the output: its name, type, and whether records must carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    /// Hint passed to the LLM in the extraction schema.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

impl FieldSpec {
    /// Required string field with a description.
    pub fn text(name: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::String,
            description: description.into(),
            required: true,
        }
    }

    /// Required integer field with a description.
    pub fn integer(name: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Integer,
            description: description.into(),
            required: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A scraping target: where to paginate, what to select, and what to extract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name used on the command line.
    pub name: String,
    /// Search-results URL; the page parameter is added to it.
    pub base_url: String,
    /// CSS selector scoping each page to its result cards.
    pub css_selector: String,
    /// Text the site shows when a page is past the last result.
    pub no_results_marker: String,
    /// Instruction given to the LLM.
    pub instruction: String,
    /// Output columns, in CSV order.
    pub fields: Vec<FieldSpec>,
    /// Field whose value identifies duplicates across pages.
    pub dedup_key: String,
    /// Default CSV file name.
    pub output_file: String,
    /// Query parameter carrying the page number.
    #[serde(default = "default_page_param")]
    pub page_param: String,
    /// First page number.
    #[serde(default = "default_start_page")]
    pub start_page: u32,
    /// Upper bound on pages scraped (unbounded when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
}

fn default_page_param() -> String {
    "page".into()
}
fn default_start_page() -> u32 {
    1
}

impl Profile {
    /// Names of the fields every kept record must carry.
    pub fn required_keys(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.clone())
            .collect()
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the profile is internally consistent before a run.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PageSiftError::validation("profile name is empty"));
        }

        Url::parse(&self.base_url).map_err(|e| {
            PageSiftError::validation(format!(
                "profile '{}': invalid base_url '{}': {e}",
                self.name, self.base_url
            ))
        })?;

        if self.css_selector.trim().is_empty() {
            return Err(PageSiftError::validation(format!(
                "profile '{}': css_selector is empty",
                self.name
            )));
        }

        if self.fields.is_empty() {
            return Err(PageSiftError::validation(format!(
                "profile '{}' declares no fields",
                self.name
            )));
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(PageSiftError::validation(format!(
                    "profile '{}': duplicate field '{}'",
                    self.name, field.name
                )));
            }
        }

        match self.field(&self.dedup_key) {
            None => {
                return Err(PageSiftError::validation(format!(
                    "profile '{}': dedup_key '{}' is not a declared field",
                    self.name, self.dedup_key
                )));
            }
            Some(field) if !field.required => {
                return Err(PageSiftError::validation(format!(
                    "profile '{}': dedup_key '{}' must be a required field",
                    self.name, self.dedup_key
                )));
            }
            Some(_) => {}
        }

        if self.start_page == 0 {
            return Err(PageSiftError::validation(format!(
                "profile '{}': start_page must be at least 1",
                self.name
            )));
        }

        Ok(())
    }
}
