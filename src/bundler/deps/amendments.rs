//! Caller changes to the resolved dependency set.

use super::DependencyManifest;
use crate::bundler::error::{Error, Result};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// A `name` or `name@version` argument. Scoped names (`@scope/pkg@1.2.3`) are supported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencySpec {
    /// Package name
    pub name: String,
    /// Version or range, `None` for a bare name
    pub version: Option<String>,
}

impl FromStr for DependencySpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        // a leading '@' belongs to the scope
        let split = s
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '@')
            .map(|(i, _)| i);

        let (name, version) = match split {
            Some(i) => (&s[..i], Some(&s[i + 1..])),
            None => (s, None),
        };

        if name.is_empty() || name == "@" || (name.starts_with('@') && !name.contains('/')) {
            return Err(Error::Config(format!("Invalid dependency \"{s}\"")));
        }
        if version.is_some_and(str::is_empty) {
            return Err(Error::Config(format!("Missing version in dependency \"{s}\"")));
        }

        Ok(Self {
            name: name.to_string(),
            version: version.map(str::to_string),
        })
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.name, v),
            None => f.write_str(&self.name),
        }
    }
}

/// Changes applied on top of the resolved dependencies.
#[derive(Clone, Debug, Default)]
pub struct DependencyAmendments {
    /// Replaces the resolved set entirely; resolution is skipped.
    pub replace: Option<Vec<DependencySpec>>,
    /// Added or overwritten entries.
    pub add: Vec<DependencySpec>,
    /// Names removed from the set.
    pub exclude: Vec<String>,
}

impl DependencyAmendments {
    /// Whether the resolved set is thrown away, so resolution can be skipped.
    pub fn replaces_resolution(&self) -> bool {
        self.replace.is_some()
    }

    /// Applies the amendments to `resolved`.
    ///
    /// A bare name takes the range declared in `package.json`, or `*`.
    pub fn apply(
        &self,
        resolved: DependencyManifest,
        declared: &BTreeMap<String, String>,
    ) -> DependencyManifest {
        let version_of = |spec: &DependencySpec| {
            spec.version
                .clone()
                .or_else(|| declared.get(&spec.name).cloned())
                .unwrap_or_else(|| "*".to_string())
        };

        let mut manifest = match &self.replace {
            Some(specs) => specs
                .iter()
                .map(|s| (s.name.clone(), version_of(s)))
                .collect(),
            None => resolved,
        };

        for spec in &self.add {
            manifest.insert(spec.name.clone(), version_of(spec));
        }
        for name in &self.exclude {
            if manifest.remove(name).is_none() {
                log::debug!("Excluded dependency {} was not in the set", name);
            }
        }

        manifest
    }
}
