//! Template assignments and their stream record encoding
//!
//! A record is one line of text. A null assignment is an empty line; a
//! non-null one is the cluster id followed by every token, joined by
//! [`TOKEN_DELIMITER`]:
//!
//! ```text
//! 7@@Accepted@@password@@for@@**
//!                                   <- null (unparseable line)
//! 3@@session@@closed
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Cluster identifier assigned by a template generator.
pub type ClusterId = u64;

/// Fixed two-character record delimiter. No escaping is defined.
pub const TOKEN_DELIMITER: &str = "@@";

/// Template assignment for one source line; `None` marks an excluded line.
pub type TemplateAssignment = Option<Assignment>;

/// A cluster id paired with the template tokens it was matched with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    cluster_id: ClusterId,
    tokens: Vec<String>,
}

impl Assignment {
    /// Create a new assignment.
    #[must_use]
    pub fn new<T: Into<String>>(cluster_id: ClusterId, tokens: impl IntoIterator<Item = T>) -> Self {
        Self {
            cluster_id,
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Get the cluster id.
    #[must_use]
    pub const fn cluster_id(&self) -> ClusterId {
        self.cluster_id
    }

    /// Get the template tokens.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Number of tokens in the template.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the template has no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Split into cluster id and tokens.
    #[must_use]
    pub fn into_parts(self) -> (ClusterId, Vec<String>) {
        (self.cluster_id, self.tokens)
    }
}

/// Encode one assignment as a record line, without the trailing newline.
///
/// # Errors
///
/// Returns [`Error::DelimiterCollision`] if any token contains the delimiter
/// or a line break.
pub fn encode_record(assignment: Option<&Assignment>, position: u64) -> Result<String> {
    let Some(assignment) = assignment else {
        return Ok(String::new());
    };

    let mut line = assignment.cluster_id.to_string();
    for token in &assignment.tokens {
        if token.contains(TOKEN_DELIMITER) || token.contains(['\n', '\r']) {
            return Err(Error::DelimiterCollision {
                position,
                token: token.clone(),
            });
        }
        line.push_str(TOKEN_DELIMITER);
        line.push_str(token);
    }
    Ok(line)
}

/// Decode one record line (newline already stripped).
///
/// # Errors
///
/// Returns [`Error::CorruptRecord`] if the leading cluster id is not an
/// unsigned integer.
pub fn decode_record(line: &str, position: u64) -> Result<TemplateAssignment> {
    if line.is_empty() {
        return Ok(None);
    }

    let mut fields = line.split(TOKEN_DELIMITER);
    let head = fields.next().unwrap_or_default();
    let cluster_id = head.parse::<ClusterId>().map_err(|e| Error::CorruptRecord {
        position,
        reason: format!("invalid cluster id {head:?}: {e}"),
    })?;

    Ok(Some(Assignment {
        cluster_id,
        tokens: fields.map(str::to_string).collect(),
    }))
}
