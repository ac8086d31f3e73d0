//! Template Catalog
//!
//! Immutable, versioned mapping from a compliance profile to an ordered list
//! of step definitions. Catalog entries are never mutated in place; a change
//! is published as a new version of the template, and older versions stay
//! resolvable.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::{debug, error};

use crate::domain::client::{BusinessSize, ClientType};
use crate::CoreError;

const BUILTIN_CATALOG: &str = include_str!("../../catalog/builtin.yaml");

/// Category of compliance work a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepCategory {
    /// Registration with an authority
    Registration,
    /// Filing a return or form
    Filing,
    /// Reconciling records
    Reconciliation,
    /// Review or audit work
    Review,
    /// Submission or sign-off
    Submission,
    /// Anything else
    Other,
}

impl fmt::Display for StepCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepCategory::Registration => "registration",
            StepCategory::Filing => "filing",
            StepCategory::Reconciliation => "reconciliation",
            StepCategory::Review => "review",
            StepCategory::Submission => "submission",
            StepCategory::Other => "other",
        };
        f.write_str(label)
    }
}

/// Catalog-owned definition of one checklist item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Key, unique within its template
    pub key: String,

    /// Human-readable title
    pub title: String,

    /// Category of work
    pub category: StepCategory,

    /// Position in the template (1-based)
    pub order: u32,

    /// Keys of steps that must precede this one
    pub prerequisites: Vec<String>,
}

/// One version of the template for a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Client type the template applies to
    pub client_type: ClientType,

    /// Business size the template applies to
    pub business_size: BusinessSize,

    /// Template version; higher is newer
    pub version: u32,

    /// Ordered step definitions
    pub steps: Vec<StepDefinition>,
}

impl Template {
    /// Build a template, numbering steps by position
    pub fn new(
        client_type: ClientType,
        business_size: BusinessSize,
        version: u32,
        steps: Vec<(String, String, StepCategory, Vec<String>)>,
    ) -> Self {
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(index, (key, title, category, prerequisites))| StepDefinition {
                key,
                title,
                category,
                order: index as u32 + 1,
                prerequisites,
            })
            .collect();

        Self {
            client_type,
            business_size,
            version,
            steps,
        }
    }

    /// Check the template for integrity problems
    ///
    /// Keys must be unique, prerequisites must reference keys of this
    /// template, the prerequisite graph must be acyclic, and the listing
    /// order must place every prerequisite before its dependents.
    pub fn validate(&self) -> Result<(), CoreError> {
        let label = self.label();

        if self.steps.is_empty() {
            return Err(CoreError::CatalogIntegrity(format!(
                "Template {} has no steps",
                label
            )));
        }

        let mut keys = HashSet::new();
        for step in &self.steps {
            if !keys.insert(step.key.as_str()) {
                return Err(CoreError::CatalogIntegrity(format!(
                    "Template {} has duplicate step key: {}",
                    label, step.key
                )));
            }
        }

        for step in &self.steps {
            for dep in &step.prerequisites {
                if !keys.contains(dep.as_str()) {
                    return Err(CoreError::CatalogIntegrity(format!(
                        "Template {}: step {} references missing prerequisite {}",
                        label, step.key, dep
                    )));
                }
            }
        }

        self.check_for_cycles()?;

        let positions: HashMap<&str, usize> = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| (step.key.as_str(), index))
            .collect();
        for (index, step) in self.steps.iter().enumerate() {
            for dep in &step.prerequisites {
                if positions[dep.as_str()] >= index {
                    return Err(CoreError::CatalogIntegrity(format!(
                        "Template {}: step {} is listed before its prerequisite {}",
                        label, step.key, dep
                    )));
                }
            }
        }

        Ok(())
    }

    fn check_for_cycles(&self) -> Result<(), CoreError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        let dep_map: HashMap<&str, &Vec<String>> = self
            .steps
            .iter()
            .map(|step| (step.key.as_str(), &step.prerequisites))
            .collect();

        for step in &self.steps {
            if Self::is_cyclic(step.key.as_str(), &dep_map, &mut visited, &mut rec_stack) {
                return Err(CoreError::CatalogIntegrity(format!(
                    "Template {}: prerequisite cycle involving step {}",
                    self.label(),
                    step.key
                )));
            }
        }

        Ok(())
    }

    fn is_cyclic<'a>(
        key: &'a str,
        dep_map: &HashMap<&'a str, &'a Vec<String>>,
        visited: &mut HashSet<&'a str>,
        rec_stack: &mut HashSet<&'a str>,
    ) -> bool {
        if visited.insert(key) {
            rec_stack.insert(key);

            if let Some(deps) = dep_map.get(key) {
                for dep in deps.iter() {
                    let dep = dep.as_str();
                    if rec_stack.contains(dep)
                        || (!visited.contains(dep)
                            && Self::is_cyclic(dep, dep_map, visited, rec_stack))
                    {
                        return true;
                    }
                }
            }
        }

        rec_stack.remove(key);
        false
    }

    fn label(&self) -> String {
        format!("{}/{}@v{}", self.client_type, self.business_size, self.version)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    templates: Vec<TemplateDocument>,
}

#[derive(Debug, Deserialize)]
struct TemplateDocument {
    client_type: ClientType,
    business_size: BusinessSize,
    version: u32,
    steps: Vec<StepDocument>,
}

#[derive(Debug, Deserialize)]
struct StepDocument {
    key: String,
    title: String,
    category: StepCategory,
    #[serde(default)]
    prerequisites: Vec<String>,
}

/// The full set of templates, keyed by profile and version
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: HashMap<(ClientType, BusinessSize), BTreeMap<u32, Template>>,
}

impl TemplateCatalog {
    /// The catalog shipped with the engine
    pub fn builtin() -> Result<Self, CoreError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    /// Parse a catalog from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CoreError> {
        let document: CatalogDocument = serde_yaml::from_str(yaml)?;

        let templates = document
            .templates
            .into_iter()
            .map(|t| {
                Template::new(
                    t.client_type,
                    t.business_size,
                    t.version,
                    t.steps
                        .into_iter()
                        .map(|s| (s.key, s.title, s.category, s.prerequisites))
                        .collect(),
                )
            })
            .collect();

        Self::from_templates(templates)
    }

    /// Read and parse a catalog file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            CoreError::CatalogIntegrity(format!(
                "Failed to read catalog file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Build a catalog from templates
    ///
    /// Fails if two entries share a profile and version. Template contents
    /// are checked when resolved.
    pub fn from_templates(templates: Vec<Template>) -> Result<Self, CoreError> {
        let mut catalog = Self::default();

        for template in templates {
            if template.version == 0 {
                return Err(CoreError::CatalogIntegrity(format!(
                    "Template {} must have a version of at least 1",
                    template.label()
                )));
            }

            let versions = catalog
                .templates
                .entry((template.client_type, template.business_size))
                .or_default();
            if versions.contains_key(&template.version) {
                return Err(CoreError::CatalogIntegrity(format!(
                    "Duplicate catalog entry {}",
                    template.label()
                )));
            }
            versions.insert(template.version, template);
        }

        debug!(profiles = catalog.templates.len(), "Template catalog loaded");
        Ok(catalog)
    }

    /// Resolve the newest template for a profile
    pub fn resolve(
        &self,
        client_type: ClientType,
        business_size: BusinessSize,
    ) -> Result<&Template, CoreError> {
        let template = self
            .templates
            .get(&(client_type, business_size))
            .and_then(|versions| versions.values().next_back())
            .ok_or_else(|| CoreError::UnsupportedProfile {
                client_type: client_type.to_string(),
                business_size: business_size.to_string(),
            })?;

        Self::checked(template)
    }

    /// Resolve a specific historical version of a profile's template
    pub fn resolve_version(
        &self,
        client_type: ClientType,
        business_size: BusinessSize,
        version: u32,
    ) -> Result<&Template, CoreError> {
        let versions = self
            .templates
            .get(&(client_type, business_size))
            .ok_or_else(|| CoreError::UnsupportedProfile {
                client_type: client_type.to_string(),
                business_size: business_size.to_string(),
            })?;

        let template = versions.get(&version).ok_or_else(|| {
            CoreError::CatalogIntegrity(format!(
                "Template {}/{} has no version {}",
                client_type, business_size, version
            ))
        })?;

        Self::checked(template)
    }

    /// Validate every template and return the problems found
    pub fn integrity_report(&self) -> Vec<CoreError> {
        let mut problems: Vec<CoreError> = self
            .templates
            .values()
            .flat_map(|versions| versions.values())
            .filter_map(|template| template.validate().err())
            .collect();
        problems.sort_by_key(|e| e.to_string());
        problems
    }

    /// Number of (profile, version) entries
    pub fn len(&self) -> usize {
        self.templates.values().map(BTreeMap::len).sum()
    }

    /// Whether the catalog has no templates
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn checked(template: &Template) -> Result<&Template, CoreError> {
        if let Err(err) = template.validate() {
            error!(
                client_type = %template.client_type,
                business_size = %template.business_size,
                version = template.version,
                error = %err,
                "Catalog integrity failure"
            );
            return Err(err);
        }
        Ok(template)
    }
}
