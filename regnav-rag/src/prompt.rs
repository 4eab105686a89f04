//! Versioned prompt template store.
//!
//! Prompt definitions live in YAML files with top-level `system` and
//! `human` roles. Each role maps version keys (`v1`, `v2`, ...) to
//! template strings and designates one of them via a `stable` pointer:
//!
//! ```yaml
//! system:
//!   stable: v1
//!   v1: "Answer using only this context:\n$context"
//! human:
//!   stable: v1
//!   v1: "$query"
//! ```
//!
//! Templates carry the literal substitution tokens `$context` and
//! `$query`; any other `$...` text is left untouched. Definitions are
//! loaded and validated once per prompt name on first use and are
//! immutable thereafter.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Deserialize;
use tracing::info;

use crate::error::{RagError, Result};
use crate::model::ChatMessage;

/// The reserved key naming the default version within a role.
const STABLE_KEY: &str = "stable";

/// A prompt role within a definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    /// The `system` block.
    System,
    /// The `human` block.
    Human,
}

impl PromptRole {
    fn as_str(self) -> &'static str {
        match self {
            PromptRole::System => "system",
            PromptRole::Human => "human",
        }
    }
}

/// The validated version set for a single role.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptVersions {
    stable: String,
    versions: BTreeMap<String, String>,
}

impl PromptVersions {
    /// Resolve a version key to its template, defaulting to `stable`.
    fn template(&self, role: PromptRole, version: Option<&str>) -> Result<&str> {
        let key = version.unwrap_or(&self.stable);
        self.versions.get(key).map(String::as_str).ok_or_else(|| {
            RagError::Config(format!(
                "prompt version '{key}' not found in role '{}'",
                role.as_str()
            ))
        })
    }
}

/// A validated prompt definition: one version set per role.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptDefinition {
    system: PromptVersions,
    human: PromptVersions,
}

impl PromptDefinition {
    /// Parse and validate a definition from YAML text.
    pub fn from_yaml(name: &str, yaml: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct RawDefinition {
            system: BTreeMap<String, serde_yaml::Value>,
            human: BTreeMap<String, serde_yaml::Value>,
        }

        let raw: RawDefinition = serde_yaml::from_str(yaml).map_err(|e| {
            RagError::Config(format!("malformed prompt definition '{name}': {e}"))
        })?;

        Ok(Self {
            system: validate_role(name, PromptRole::System, raw.system)?,
            human: validate_role(name, PromptRole::Human, raw.human)?,
        })
    }

    /// Resolve a role and optional version to its raw template string.
    pub fn template(&self, role: PromptRole, version: Option<&str>) -> Result<&str> {
        match role {
            PromptRole::System => self.system.template(role, version),
            PromptRole::Human => self.human.template(role, version),
        }
    }
}

/// Validate one role's key set: `stable` must exist, be a string, and
/// point to a declared version; every non-reserved, non-private key must
/// match `v<digits>` and map to a string template.
fn validate_role(
    name: &str,
    role: PromptRole,
    raw: BTreeMap<String, serde_yaml::Value>,
) -> Result<PromptVersions> {
    let config_err = |message: String| {
        RagError::Config(format!("prompt '{name}', role '{}': {message}", role.as_str()))
    };

    let stable = match raw.get(STABLE_KEY) {
        Some(serde_yaml::Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(config_err("'stable' must be a string naming a version like 'v1'".into()))
        }
        None => return Err(config_err("missing 'stable' key".into())),
    };

    let mut versions = BTreeMap::new();
    for (key, value) in raw {
        if key == STABLE_KEY || key.starts_with('_') {
            continue;
        }
        if !is_version_key(&key) {
            return Err(config_err(format!("version keys must match v<digits> (invalid: {key})")));
        }
        match value {
            serde_yaml::Value::String(template) => {
                versions.insert(key, template);
            }
            _ => return Err(config_err(format!("version '{key}' must be a string template"))),
        }
    }

    if !versions.contains_key(&stable) {
        return Err(config_err(format!("stable version '{stable}' not found among version keys")));
    }

    Ok(PromptVersions { stable, versions })
}

fn is_version_key(key: &str) -> bool {
    key.strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Substitute `$context` and `$query` in a single left-to-right pass.
///
/// Substituted values are never re-scanned, and a `$` followed by anything
/// else (including a longer identifier such as `$contextual`) is copied
/// through unchanged.
fn substitute(template: &str, context: &str, query: &str) -> String {
    fn token_match<'a>(tail: &'a str, token: &str) -> Option<&'a str> {
        let rest = tail.strip_prefix(token)?;
        match rest.as_bytes().first() {
            Some(b) if b.is_ascii_alphanumeric() || *b == b'_' => None,
            _ => Some(rest),
        }
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = token_match(tail, "$context") {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = token_match(tail, "$query") {
            out.push_str(query);
            rest = after;
        } else {
            out.push('$');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

/// Loads, validates, and caches prompt definitions from a directory.
///
/// `<dir>/<name>.yaml` is read on the first render for `name`; a
/// validation failure is fatal to that load but leaves the store usable
/// for other prompt names.
pub struct PromptStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<PromptDefinition>>>,
}

impl PromptStore {
    /// Create a store rooted at the given prompt directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), cache: RwLock::new(HashMap::new()) }
    }

    /// Load (or fetch from cache) the definition for a prompt name.
    pub fn definition(&self, name: &str) -> Result<Arc<PromptDefinition>> {
        if let Some(definition) = self.cache.read().expect("prompt cache poisoned").get(name) {
            return Ok(definition.clone());
        }

        let path = self.dir.join(format!("{name}.yaml"));
        let yaml = std::fs::read_to_string(&path).map_err(|e| {
            RagError::Config(format!("cannot read prompt file '{}': {e}", path.display()))
        })?;
        let definition = Arc::new(PromptDefinition::from_yaml(name, &yaml)?);
        info!(prompt = name, path = %path.display(), "loaded prompt definition");

        let mut cache = self.cache.write().expect("prompt cache poisoned");
        Ok(cache.entry(name.to_string()).or_insert(definition).clone())
    }

    /// Render a single role's template with the given query and context.
    ///
    /// `version` defaults to the role's `stable` pointer.
    pub fn render(
        &self,
        name: &str,
        role: PromptRole,
        query: &str,
        context: &str,
        version: Option<&str>,
    ) -> Result<String> {
        let definition = self.definition(name)?;
        let template = definition.template(role, version)?;
        Ok(substitute(template, context, query))
    }

    /// Render the `[system, human]` message pair for the responder.
    pub fn build_messages(
        &self,
        name: &str,
        query: &str,
        context: &str,
        version: Option<&str>,
    ) -> Result<Vec<ChatMessage>> {
        let system = self.render(name, PromptRole::System, query, context, version)?;
        let human = self.render(name, PromptRole::Human, query, context, version)?;
        Ok(vec![ChatMessage::system(system), ChatMessage::user(human)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
system:
  stable: v1
  v1: "Context: $context"
human:
  stable: v1
  v1: "$query"
"#;

    #[test]
    fn renders_stable_version_with_substitution() {
        let def = PromptDefinition::from_yaml("x", VALID).unwrap();
        let template = def.template(PromptRole::System, None).unwrap();
        assert_eq!(substitute(template, "C", "Q"), "Context: C");

        let template = def.template(PromptRole::Human, None).unwrap();
        assert_eq!(substitute(template, "C", "Q"), "Q");
    }

    #[test]
    fn missing_stable_key_fails() {
        let yaml = r#"
system:
  v1: "Context: $context"
human:
  stable: v1
  v1: "$query"
"#;
        let err = PromptDefinition::from_yaml("x", yaml).unwrap_err();
        assert!(matches!(err, RagError::Config(_)), "unexpected error: {err}");
        assert!(err.to_string().contains("stable"));
    }

    #[test]
    fn dangling_stable_pointer_fails() {
        let yaml = r#"
system:
  stable: v2
  v1: "Context: $context"
human:
  stable: v1
  v1: "$query"
"#;
        let err = PromptDefinition::from_yaml("x", yaml).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
        assert!(err.to_string().contains("v2"));
    }

    #[test]
    fn non_string_version_fails() {
        let yaml = r#"
system:
  stable: v1
  v1:
    nested: "not a string"
human:
  stable: v1
  v1: "$query"
"#;
        assert!(matches!(
            PromptDefinition::from_yaml("x", yaml),
            Err(RagError::Config(_))
        ));
    }

    #[test]
    fn invalid_version_key_fails() {
        let yaml = r#"
system:
  stable: v1
  v1: "ok"
  draft: "not a version key"
human:
  stable: v1
  v1: "$query"
"#;
        let err = PromptDefinition::from_yaml("x", yaml).unwrap_err();
        assert!(err.to_string().contains("draft"));
    }

    #[test]
    fn private_keys_are_ignored() {
        let yaml = r#"
system:
  stable: v1
  v1: "ok"
  _note: "internal annotation, any shape"
human:
  stable: v1
  v1: "$query"
"#;
        assert!(PromptDefinition::from_yaml("x", yaml).is_ok());
    }

    #[test]
    fn explicit_missing_version_fails() {
        let def = PromptDefinition::from_yaml("x", VALID).unwrap();
        let err = def.template(PromptRole::System, Some("v9")).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn explicit_existing_version_resolves() {
        let yaml = r#"
system:
  stable: v2
  v1: "old: $query"
  v2: "new: $query"
human:
  stable: v1
  v1: "$query"
"#;
        let def = PromptDefinition::from_yaml("x", yaml).unwrap();
        assert_eq!(def.template(PromptRole::System, None).unwrap(), "new: $query");
        assert_eq!(def.template(PromptRole::System, Some("v1")).unwrap(), "old: $query");
    }

    #[test]
    fn foreign_tokens_left_untouched() {
        assert_eq!(
            substitute("pay $100 for $item, then $query", "C", "Q"),
            "pay $100 for $item, then Q"
        );
        // A longer identifier sharing the prefix is not a match.
        assert_eq!(substitute("$contextual and $context", "C", "Q"), "$contextual and C");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        // A context containing the literal "$query" stays verbatim.
        assert_eq!(substitute("$context | $query", "has $query inside", "Q"), "has $query inside | Q");
    }

    #[test]
    fn store_loads_and_caches_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regulatory.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(VALID.as_bytes()).unwrap();

        let store = PromptStore::new(dir.path());
        let rendered =
            store.render("regulatory", PromptRole::System, "Q", "C", None).unwrap();
        assert_eq!(rendered, "Context: C");

        // Cached definition survives the file being removed.
        std::fs::remove_file(&path).unwrap();
        let messages = store.build_messages("regulatory", "Q", "C", None).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "Context: C");
        assert_eq!(messages[1].content, "Q");
    }

    #[test]
    fn missing_file_fails_without_poisoning_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = PromptStore::new(dir.path());
        assert!(matches!(
            store.render("absent", PromptRole::Human, "Q", "C", None),
            Err(RagError::Config(_))
        ));
    }
}
