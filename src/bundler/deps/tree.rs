//! `npm ls --json` output and the walk that flattens it.

use super::DependencyManifest;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Root of the `npm ls --json` document.
#[derive(Debug, Default, Deserialize)]
pub struct NpmListOutput {
    /// Package name
    #[serde(default)]
    pub name: Option<String>,

    /// Top-level dependencies keyed by name
    #[serde(default)]
    pub dependencies: BTreeMap<String, NpmDependency>,
}

/// One node of the dependency tree.
#[derive(Debug, Default, Deserialize)]
pub struct NpmDependency {
    /// Pinned version
    #[serde(default)]
    pub version: Option<String>,

    /// Where the package comes from (`https://...`, `file:...`, `link:...`)
    #[serde(default)]
    pub resolved: Option<String>,

    /// Nested dependencies
    #[serde(default)]
    pub dependencies: BTreeMap<String, NpmDependency>,
}

/// Where a dependency comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Fetched from a package registry.
    Registry,
    /// A local folder or workspace link.
    Local,
}

impl Origin {
    /// Classifies a `resolved` value. Missing values count as registry packages.
    pub fn from_resolved(resolved: Option<&str>) -> Self {
        match resolved {
            Some(r) if r.starts_with("file:") || r.starts_with("link:") => Self::Local,
            _ => Self::Registry,
        }
    }
}

/// A dependency seen in the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedDependency {
    /// Package name
    pub name: String,
    /// Pinned version
    pub version: String,
    /// Registry or local
    pub origin: Origin,
}

/// Lists every dependency of the tree in depth-first order.
///
/// Siblings are visited in name order, each one before its own children.
/// Nodes without a version are skipped.
pub fn flatten(dependencies: &BTreeMap<String, NpmDependency>) -> Vec<ResolvedDependency> {
    let mut out = Vec::new();
    visit(dependencies, &mut out);
    out
}

fn visit(dependencies: &BTreeMap<String, NpmDependency>, out: &mut Vec<ResolvedDependency>) {
    for (name, dependency) in dependencies {
        match &dependency.version {
            Some(version) => out.push(ResolvedDependency {
                name: name.clone(),
                version: version.clone(),
                origin: Origin::from_resolved(dependency.resolved.as_deref()),
            }),
            None => log::warn!("Dependency {} has no version, skipping", name),
        }
        visit(&dependency.dependencies, out);
    }
}

/// Collects the registry-origin dependencies of the tree into a manifest.
///
/// Local packages are left out but their own dependencies are still collected.
/// When a name appears more than once, the last one visited wins.
pub fn collect_external_dependencies(
    dependencies: &BTreeMap<String, NpmDependency>,
) -> DependencyManifest {
    flatten(dependencies)
        .into_iter()
        .filter(|d| d.origin == Origin::Registry)
        .map(|d| (d.name, d.version))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> NpmListOutput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn skips_local_but_keeps_their_dependencies() {
        let tree = parse(
            r#"{
              "name": "app",
              "dependencies": {
                "chalk": { "version": "5.3.0", "resolved": "https://registry.npmjs.org/chalk/-/chalk-5.3.0.tgz" },
                "shared": {
                  "version": "1.0.0",
                  "resolved": "file:../shared",
                  "dependencies": {
                    "lodash": { "version": "4.17.21", "resolved": "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz" }
                  }
                },
                "tool": { "version": "0.1.0", "resolved": "link:../tool" }
              }
            }"#,
        );

        let manifest = collect_external_dependencies(&tree.dependencies);
        assert_eq!(
            manifest.into_iter().collect::<Vec<_>>(),
            vec![
                ("chalk".to_string(), "5.3.0".to_string()),
                ("lodash".to_string(), "4.17.21".to_string()),
            ]
        );
    }

    #[test]
    fn last_seen_version_wins() {
        let tree = parse(
            r#"{
              "dependencies": {
                "a-local": {
                  "version": "1.0.0",
                  "resolved": "file:../a",
                  "dependencies": { "x": { "version": "1.0.0", "resolved": "https://r/x-1.0.0.tgz" } }
                },
                "b-local": {
                  "version": "1.0.0",
                  "resolved": "file:../b",
                  "dependencies": { "x": { "version": "2.0.0", "resolved": "https://r/x-2.0.0.tgz" } }
                }
              }
            }"#,
        );

        let manifest = collect_external_dependencies(&tree.dependencies);
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest["x"], "2.0.0");
    }

    #[test]
    fn empty_tree() {
        let tree = parse(r#"{ "name": "app" }"#);
        assert!(collect_external_dependencies(&tree.dependencies).is_empty());
    }

    #[test]
    fn origin_classification() {
        assert_eq!(Origin::from_resolved(Some("file:../x")), Origin::Local);
        assert_eq!(Origin::from_resolved(Some("link:x")), Origin::Local);
        assert_eq!(Origin::from_resolved(Some("https://x")), Origin::Registry);
        assert_eq!(Origin::from_resolved(None), Origin::Registry);
    }
}
