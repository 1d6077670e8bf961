use super::DependencyGraph;
use crate::types::EntityDescriptor;

const PLATFORM_ENTITIES: &[(&str, &str)] = &[
    ("profiles", "User accounts and roles"),
    ("categories", "Category tree shared by all content"),
    ("tags", "Free-form labels"),
    ("videos", "Video library entries"),
    ("podcasts", "Podcast episodes"),
    ("documents", "Documents and course material"),
    ("content_tags", "Tag assignments for any content"),
    ("uploads", "Upload pipeline bookkeeping"),
    ("playback_progress", "Per-user playback and reading progress"),
    ("site_settings", "Site-wide settings"),
];

/// Entities the content library needs, in checklist order.
#[must_use]
pub fn platform_entities() -> Vec<EntityDescriptor> {
    PLATFORM_ENTITIES
        .iter()
        .map(|(name, description)| EntityDescriptor::new(*name, *description))
        .collect()
}

#[must_use]
pub fn platform_graph() -> DependencyGraph {
    DependencyGraph::new()
        .depends_on("profiles", &[])
        .depends_on("categories", &[])
        .depends_on("tags", &[])
        .depends_on("site_settings", &[])
        .depends_on("videos", &["profiles", "categories"])
        .depends_on("podcasts", &["profiles", "categories"])
        .depends_on("documents", &["profiles", "categories"])
        .depends_on("content_tags", &["tags"])
        .depends_on("uploads", &["profiles"])
        .depends_on("playback_progress", &["profiles"])
}
