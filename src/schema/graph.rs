use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::MigrationUnit;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("migration {version} creates {entity} before its prerequisite {prerequisite}")]
    PrerequisiteMissing {
        version: String,
        entity: String,
        prerequisite: String,
    },

    #[error("migration {version} references {entity}, which no earlier migration creates")]
    UnknownReference { version: String, entity: String },
}

/// Static declaration of which entities must exist before others.
///
/// The executor never sorts by this graph; migration units are authored in an
/// order that already respects it, and [`DependencyGraph::validate_units`]
/// checks that they do.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn depends_on(mut self, entity: &str, prerequisites: &[&str]) -> Self {
        self.add(entity, prerequisites);
        self
    }

    pub fn add(&mut self, entity: &str, prerequisites: &[&str]) {
        let entry = self.edges.entry(entity.to_string()).or_default();
        entry.extend(prerequisites.iter().map(|p| (*p).to_string()));
        for prerequisite in prerequisites {
            self.edges.entry((*prerequisite).to_string()).or_default();
        }
    }

    #[must_use]
    pub fn prerequisites(&self, entity: &str) -> Vec<&str> {
        self.edges
            .get(entity)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    pub fn ensure_acyclic(&self) -> Result<(), GraphError> {
        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
        let mut path: Vec<&str> = Vec::new();

        for entity in self.edges.keys() {
            self.visit(entity, &mut marks, &mut path)?;
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        entity: &'a str,
        marks: &mut BTreeMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), GraphError> {
        match marks.get(entity) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|p| *p == entity).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|p| (*p).to_string()).collect();
                cycle.push(entity.to_string());
                return Err(GraphError::Cycle(cycle));
            }
            None => {}
        }

        marks.insert(entity, Mark::Visiting);
        path.push(entity);
        if let Some(prerequisites) = self.edges.get(entity) {
            for prerequisite in prerequisites {
                self.visit(prerequisite, marks, path)?;
            }
        }
        path.pop();
        marks.insert(entity, Mark::Done);
        Ok(())
    }

    /// Entities in an order where every prerequisite precedes its dependents.
    /// Ties are broken alphabetically so the order is stable.
    pub fn ordered(&self) -> Result<Vec<String>, GraphError> {
        self.ensure_acyclic()?;

        let mut remaining: BTreeMap<&str, usize> = self
            .edges
            .iter()
            .map(|(entity, prerequisites)| (entity.as_str(), prerequisites.len()))
            .collect();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let ready: Vec<&str> = remaining
                .iter()
                .filter(|(_, pending)| **pending == 0)
                .map(|(entity, _)| *entity)
                .collect();

            for entity in ready {
                remaining.remove(entity);
                order.push(entity.to_string());
                for (dependent, prerequisites) in &self.edges {
                    if prerequisites.contains(entity) {
                        if let Some(pending) = remaining.get_mut(dependent.as_str()) {
                            *pending -= 1;
                        }
                    }
                }
            }
        }

        Ok(order)
    }

    /// Design-time check that units, taken in version order, never create an
    /// entity before its prerequisites nor reference one nobody created yet.
    pub fn validate_units(&self, units: &[MigrationUnit]) -> Result<(), GraphError> {
        self.ensure_acyclic()?;

        let mut sorted: Vec<&MigrationUnit> = units.iter().collect();
        sorted.sort_by(|a, b| a.version.cmp(&b.version));

        let mut created: BTreeSet<String> = BTreeSet::new();
        for unit in sorted {
            for entity in unit.creates() {
                for prerequisite in self.prerequisites(&entity) {
                    if !created.contains(prerequisite) {
                        return Err(GraphError::PrerequisiteMissing {
                            version: unit.version.clone(),
                            entity: entity.clone(),
                            prerequisite: prerequisite.to_string(),
                        });
                    }
                }
                created.insert(entity);
            }

            for entity in unit.references() {
                if !created.contains(&entity) {
                    return Err(GraphError::UnknownReference {
                        version: unit.version.clone(),
                        entity,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(version: &str, script: &str) -> MigrationUnit {
        MigrationUnit::from_script(version, script).unwrap()
    }

    fn library_graph() -> DependencyGraph {
        DependencyGraph::new()
            .depends_on("videos", &["profiles", "categories"])
            .depends_on("content_tags", &["tags"])
    }

    #[test]
    fn test_prerequisites_and_entities() {
        let graph = library_graph();
        assert_eq!(graph.prerequisites("videos"), vec!["categories", "profiles"]);
        assert!(graph.prerequisites("profiles").is_empty());
        assert!(graph.prerequisites("unknown").is_empty());
        assert_eq!(graph.entities().count(), 5);
    }

    #[test]
    fn test_ordered_puts_prerequisites_first() {
        let order = library_graph().ordered().unwrap();
        let pos = |name: &str| order.iter().position(|o| o == name).unwrap();

        assert!(pos("profiles") < pos("videos"));
        assert!(pos("categories") < pos("videos"));
        assert!(pos("tags") < pos("content_tags"));
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn test_cycle_detected() {
        let graph = DependencyGraph::new()
            .depends_on("a", &["b"])
            .depends_on("b", &["c"])
            .depends_on("c", &["a"]);

        match graph.ensure_acyclic() {
            Err(GraphError::Cycle(path)) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert!(graph.ordered().is_err());
    }

    #[test]
    fn test_validate_units_accepts_ordered_units() {
        let units = vec![
            unit(
                "0002_media",
                "CREATE TABLE videos (
                    id TEXT,
                    owner TEXT REFERENCES profiles(id),
                    cat TEXT REFERENCES categories(id)
                );",
            ),
            unit(
                "0001_base",
                "CREATE TABLE profiles (id TEXT); CREATE TABLE categories (id TEXT);",
            ),
        ];
        assert!(library_graph().validate_units(&units).is_ok());
    }

    #[test]
    fn test_validate_units_rejects_early_dependent() {
        let units = vec![
            unit("0001_media", "CREATE TABLE videos (id TEXT);"),
            unit(
                "0002_base",
                "CREATE TABLE profiles (id TEXT); CREATE TABLE categories (id TEXT);",
            ),
        ];
        let err = library_graph().validate_units(&units).unwrap_err();
        assert!(matches!(
            err,
            GraphError::PrerequisiteMissing { ref version, ref entity, .. }
                if version == "0001_media" && entity == "videos"
        ));
    }

    #[test]
    fn test_validate_units_rejects_unknown_reference() {
        let units = vec![unit(
            "0001_tags",
            "CREATE TABLE tags (id TEXT); CREATE INDEX idx_uploads ON uploads(id);",
        )];
        let err = DependencyGraph::new().validate_units(&units).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownReference {
                version: "0001_tags".to_string(),
                entity: "uploads".to_string(),
            }
        );
    }

    #[test]
    fn test_self_reference_allowed() {
        let units = vec![unit(
            "0001_categories",
            "CREATE TABLE categories (id TEXT, parent_id TEXT REFERENCES categories(id));",
        )];
        assert!(DependencyGraph::new().validate_units(&units).is_ok());
    }
}
