//! Canonical query keys
//!
//! Callers hand over a resolved parameter set; canonicalization turns every
//! semantically equal set into the same key, so parameter order, case of the
//! search text and redundant filters never split the cache.

use thiserror::Error;

use crate::core::constants::DEFAULT_PAGE_SIZE;
use crate::data::types::{NoteFilter, Visibility};

/// Who is asking
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequesterScope {
    /// Anonymous caller: public notes only
    Anonymous,
    /// Queries restricted to one owner's notes
    Owner(String),
}

/// Resolved but not yet canonical query parameters
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub scope: RequesterScope,
    pub text: Option<String>,
    pub visibility: Option<Visibility>,
    pub language: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl QueryParams {
    pub fn new(scope: RequesterScope) -> Self {
        Self {
            scope,
            text: None,
            visibility: None,
            language: None,
            page: None,
            size: None,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryKeyError {
    #[error("Private notes can only be listed for a specific owner")]
    PrivateWithoutOwner,
}

/// Canonical, hashable identity of a paginated note query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub scope: RequesterScope,
    /// Trimmed, lower-cased; never empty
    pub text: Option<String>,
    pub visibility: Option<Visibility>,
    /// Trimmed; never empty
    pub language: Option<String>,
    /// Zero-based
    pub page: u32,
    /// Within `1..=max_page_size`
    pub size: u32,
}

impl QueryKey {
    /// Canonicalize `params`, clamping the page size to `max_page_size`
    pub fn canonical(params: QueryParams, max_page_size: u32) -> Result<Self, QueryKeyError> {
        let visibility = match (&params.scope, params.visibility) {
            (RequesterScope::Anonymous, Some(Visibility::Private)) => {
                return Err(QueryKeyError::PrivateWithoutOwner);
            }
            (RequesterScope::Anonymous, _) => Some(Visibility::Public),
            (RequesterScope::Owner(_), visibility) => visibility,
        };

        let max_page_size = max_page_size.max(1);
        let size = params
            .size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, max_page_size);

        Ok(Self {
            scope: params.scope,
            // Store LIKE folds ASCII case only
            text: non_blank(params.text).map(|t| t.to_ascii_lowercase()),
            visibility,
            language: non_blank(params.language),
            page: params.page.unwrap_or(0),
            size,
        })
    }

    /// Stable string form (for logs and external caches)
    pub fn encode(&self) -> String {
        let scope = match &self.scope {
            RequesterScope::Anonymous => "anon".to_string(),
            RequesterScope::Owner(owner_id) => format!("owner:{}", escape(owner_id)),
        };
        format!(
            "scope={};q={};vis={};lang={};page={};size={}",
            scope,
            self.text.as_deref().map(escape).unwrap_or_default(),
            self.visibility.map(|v| v.as_str()).unwrap_or(""),
            self.language.as_deref().map(escape).unwrap_or_default(),
            self.page,
            self.size,
        )
    }

    /// Record store filter for this key
    pub fn filter(&self) -> NoteFilter {
        NoteFilter {
            text: self.text.clone(),
            visibility: self.visibility,
            owner_id: match &self.scope {
                RequesterScope::Anonymous => None,
                RequesterScope::Owner(owner_id) => Some(owner_id.clone()),
            },
            language: self.language.clone(),
        }
    }

    #[cfg(test)]
    pub fn for_test(scope: RequesterScope, language: Option<String>) -> Self {
        let mut params = QueryParams::new(scope);
        params.language = language;
        Self::canonical(params, crate::core::constants::DEFAULT_MAX_PAGE_SIZE)
            .expect("valid test key")
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace(';', "\\;")
}
