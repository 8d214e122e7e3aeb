//! # Font Catalog Module
//!
//! Maps the font ids offered on the control surface to TrueType files and keeps
//! parsed fonts around for reuse. Parsing a font file on every render would
//! repeat the same disk read and table parsing for each button press.

use rusttype::Font;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::errors::RenderError;

/// One selectable font
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontEntry {
    /// Id used in button data (`font_<id>`) and stored in sessions
    pub id: String,
    /// Button label
    pub label: String,
    /// File name relative to the catalog directory
    pub file: String,
}

impl FontEntry {
    pub fn new(id: &str, label: &str, file: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            file: file.to_string(),
        }
    }

    /// Parse an `id:Label:file` spec
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.trim().splitn(3, ':');
        let id = parts.next()?.trim();
        let label = parts.next()?.trim();
        let file = parts.next()?.trim();
        if id.is_empty() || file.is_empty() {
            return None;
        }
        Some(Self::new(id, label, file))
    }
}

/// Fonts bundled under `assets/fonts`
pub fn bundled_fonts() -> Vec<FontEntry> {
    vec![
        FontEntry::new("dejavu_bold", "Bold", "DejaVuSans-Bold.ttf"),
        FontEntry::new("dejavu_sans", "Sans", "DejaVuSans.ttf"),
        FontEntry::new("dejavu_serif", "Serif", "DejaVuSerif.ttf"),
        FontEntry::new("dejavu_mono", "Mono", "DejaVuSansMono.ttf"),
    ]
}

/// Thread-safe font catalog with a parsed-font cache
///
/// # Instance Lifecycle
///
/// - Fonts are parsed on first request for an id
/// - Parsed fonts are shared through `Arc` for every later render
/// - A font that fails to load is not cached, so a fixed file is picked up on retry
pub struct FontCatalog {
    dir: PathBuf,
    entries: Vec<FontEntry>,
    cache: Mutex<HashMap<String, Arc<Font<'static>>>>,
}

impl FontCatalog {
    pub fn new(dir: impl Into<PathBuf>, entries: Vec<FontEntry>) -> Self {
        Self {
            dir: dir.into(),
            entries,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn entries(&self) -> &[FontEntry] {
        &self.entries
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// (id, label) pairs for the control surface
    pub fn choices(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.id.clone(), e.label.clone()))
            .collect()
    }

    /// Get or load the font for `id`
    ///
    /// # Errors
    ///
    /// `RenderError::FontLoad` when the id is unknown, the file is missing, or the
    /// file is not a parseable TrueType/OpenType font.
    pub fn load(&self, id: &str) -> Result<Arc<Font<'static>>, RenderError> {
        {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(font) = cache.get(id) {
                return Ok(Arc::clone(font));
            }
        }

        let entry = self
            .entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| RenderError::FontLoad(format!("unknown font id {id}")))?;
        let path = self.dir.join(&entry.file);

        info!(font_id = id, path = %path.display(), "Loading font");
        let bytes = std::fs::read(&path)
            .map_err(|e| RenderError::FontLoad(format!("{}: {e}", path.display())))?;
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| RenderError::FontLoad(format!("{}: not a valid font", path.display())))?;

        let font = Arc::new(font);
        {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.insert(id.to_string(), Arc::clone(&font));
        }

        Ok(font)
    }

    /// Number of parsed fonts currently cached
    pub fn cached_count(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
