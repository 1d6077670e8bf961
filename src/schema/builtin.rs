//! Migration units for the content library's own schema.

pub const PROFILES: &str = r#"
-- Accounts; exactly one may carry the admin role
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    given_name TEXT NOT NULL,
    family_name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('admin', 'member')),
    avatar_url TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_profiles_single_admin ON profiles(role) WHERE role = 'admin';
"#;

pub const CATALOG: &str = r#"
-- Categories form a shallow tree shared by every content type
CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    parent_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    color TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);
"#;

pub const MEDIA: &str = r#"
CREATE TABLE IF NOT EXISTS videos (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    description TEXT,
    object_key TEXT NOT NULL,
    thumbnail_key TEXT,
    duration_secs INTEGER,
    published INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS podcasts (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    description TEXT,
    object_key TEXT NOT NULL,
    duration_secs INTEGER,
    published INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    description TEXT,
    object_key TEXT NOT NULL,
    page_count INTEGER,
    published INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_videos_category ON videos(category_id);
CREATE INDEX IF NOT EXISTS idx_podcasts_category ON podcasts(category_id);
CREATE INDEX IF NOT EXISTS idx_documents_category ON documents(category_id);
"#;

pub const CONTENT_TAGS: &str = r#"
-- Tags attach to any content row; content_type says which table
CREATE TABLE IF NOT EXISTS content_tags (
    content_type TEXT NOT NULL CHECK (content_type IN ('video', 'podcast', 'document')),
    content_id TEXT NOT NULL,
    tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (content_type, content_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_content_tags_tag ON content_tags(tag_id);
"#;

pub const UPLOADS: &str = r#"
CREATE TABLE IF NOT EXISTS uploads (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    bucket TEXT NOT NULL,
    object_key TEXT NOT NULL,
    content_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'complete', 'failed')),
    created_at TEXT DEFAULT (datetime('now')),
    completed_at TEXT,
    UNIQUE (bucket, object_key)
);

CREATE INDEX IF NOT EXISTS idx_uploads_owner ON uploads(owner_id);
"#;

pub const PLAYBACK_PROGRESS: &str = r#"
CREATE TABLE IF NOT EXISTS playback_progress (
    profile_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    content_type TEXT NOT NULL CHECK (content_type IN ('video', 'podcast', 'document')),
    content_id TEXT NOT NULL,
    position_secs INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (profile_id, content_type, content_id)
);
"#;

pub const SITE_SETTINGS: &str = r#"
CREATE TABLE IF NOT EXISTS site_settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT DEFAULT (datetime('now'))
);

INSERT OR IGNORE INTO site_settings (key, value) VALUES ('site_name', 'Library');
INSERT OR IGNORE INTO site_settings (key, value) VALUES ('uploads_enabled', 'true');
"#;

/// Version and script of every built-in unit, in execution order.
pub const UNITS: &[(&str, &str)] = &[
    ("0001_profiles", PROFILES),
    ("0002_catalog", CATALOG),
    ("0003_media", MEDIA),
    ("0004_content_tags", CONTENT_TAGS),
    ("0005_uploads", UPLOADS),
    ("0006_playback_progress", PLAYBACK_PROGRESS),
    ("0007_site_settings", SITE_SETTINGS),
];
