//! Template generator interface

use crate::template::{Assignment, ClusterId, TemplateAssignment};
use crate::Result;
use rustc_hash::FxHashMap;

/// A stateful log template generator.
///
/// Used for both the reference (ground truth) and the candidate under test.
/// A candidate is built fresh for every trial, so state never leaks between
/// trials.
pub trait TemplateGenerator {
    /// Derive a template (token sequence) for `line`; `None` if the
    /// generator cannot template it.
    ///
    /// # Errors
    /// Returns [`Error::Generator`](crate::Error::Generator) on internal failure
    fn generate_tpl(&mut self, line: &str) -> Result<Option<Vec<String>>>;

    /// Look up or register `tokens` in the generator's template table.
    ///
    /// Returns the cluster id and whether the template was new.
    ///
    /// # Errors
    /// Returns [`Error::Generator`](crate::Error::Generator) on internal failure
    fn match_table(&mut self, tokens: &[String]) -> Result<(ClusterId, bool)>;

    /// Template `line` and resolve its cluster.
    ///
    /// # Errors
    /// Propagates generator errors
    fn assign(&mut self, line: &str) -> Result<TemplateAssignment> {
        match self.generate_tpl(line)? {
            Some(tokens) => {
                let (cluster_id, _) = self.match_table(&tokens)?;
                Ok(Some(Assignment::new(cluster_id, tokens)))
            }
            None => Ok(None),
        }
    }
}

impl<G: TemplateGenerator + ?Sized> TemplateGenerator for Box<G> {
    fn generate_tpl(&mut self, line: &str) -> Result<Option<Vec<String>>> {
        (**self).generate_tpl(line)
    }

    fn match_table(&mut self, tokens: &[String]) -> Result<(ClusterId, bool)> {
        (**self).match_table(tokens)
    }
}

/// Template-to-cluster table with dense ids starting at 0.
#[derive(Debug, Clone, Default)]
pub struct TemplateTable {
    ids: FxHashMap<Vec<String>, ClusterId>,
}

impl TemplateTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `tokens`, registering it if unseen; the flag is true for a new
    /// template.
    pub fn match_or_insert(&mut self, tokens: &[String]) -> (ClusterId, bool) {
        if let Some(&id) = self.ids.get(tokens) {
            return (id, false);
        }
        let id = self.ids.len() as ClusterId;
        self.ids.insert(tokens.to_vec(), id);
        (id, true)
    }

    /// Number of distinct templates
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if no template is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
