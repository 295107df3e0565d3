//! Font database shared by both backends.
//!
//! The vector backend hands the database to usvg; the canvas backend loads
//! faces from it with ab_glyph for outlines and advances.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use ab_glyph::{Font, FontArc, FontVec};
use strap_core::glyph::HeuristicMetrics;
use strap_core::{FontId, GlyphMetrics};
use usvg::fontdb;

/// System fonts plus any extra font directories.
pub struct FontLibrary {
    db: Arc<fontdb::Database>,
    faces: Mutex<HashMap<(FontId, u16), Option<FontArc>>>,
}

impl std::fmt::Debug for FontLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontLibrary")
            .field("faces", &self.db.len())
            .finish_non_exhaustive()
    }
}

impl FontLibrary {
    /// Wrap an existing database.
    #[must_use]
    pub fn from_database(db: fontdb::Database) -> Self {
        Self {
            db: Arc::new(db),
            faces: Mutex::new(HashMap::new()),
        }
    }

    /// System fonts only.
    #[must_use]
    pub fn system() -> Self {
        Self::with_font_dirs::<&Path>(&[])
    }

    /// System fonts plus every `.ttf`/`.otf`/`.ttc` file in `dirs`.
    #[must_use]
    pub fn with_font_dirs<P: AsRef<Path>>(dirs: &[P]) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        for dir in dirs {
            load_fonts_from_dir(&mut db, dir.as_ref());
        }
        tracing::debug!("Font database ready with {} faces", db.len());
        Self::from_database(db)
    }

    /// Number of faces in the database.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// The shared database.
    #[must_use]
    pub fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    /// usvg options resolving text against this database.
    #[must_use]
    pub fn usvg_options(&self) -> usvg::Options<'static> {
        usvg::Options {
            fontdb: self.database(),
            font_resolver: make_font_resolver(),
            ..Default::default()
        }
    }

    /// Best face for a catalog font at a weight, falling back to any face.
    #[must_use]
    pub fn query(&self, font: FontId, weight: u16) -> Option<fontdb::ID> {
        let families: Vec<fontdb::Family<'_>> = font.families().map(family_for).collect();
        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight(weight),
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };
        self.db
            .query(&query)
            .or_else(|| self.db.faces().next().map(|f| f.id))
    }

    /// Parsed face for a catalog font at a weight.
    #[must_use]
    pub fn face(&self, font: FontId, weight: u16) -> Option<FontArc> {
        let mut cache = self.faces.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry((font, weight))
            .or_insert_with(|| {
                let id = self.query(font, weight)?;
                let parsed = self
                    .db
                    .with_face_data(id, |data, index| {
                        FontVec::try_from_vec_and_index(data.to_vec(), index).ok()
                    })
                    .flatten();
                if parsed.is_none() {
                    tracing::warn!("Font face for '{}' could not be parsed", font);
                }
                parsed.map(FontArc::new)
            })
            .clone()
    }
}

impl GlyphMetrics for FontLibrary {
    fn advance(&self, font: FontId, weight: u16, font_size: f32, ch: char) -> f32 {
        match self.face(font, weight) {
            Some(face) => {
                let upem = face.units_per_em().unwrap_or(1000.0);
                face.h_advance_unscaled(face.glyph_id(ch)) / upem * font_size
            }
            None => HeuristicMetrics.advance(font, weight, font_size, ch),
        }
    }
}

fn family_for(name: &str) -> fontdb::Family<'_> {
    match name {
        "serif" => fontdb::Family::Serif,
        "sans-serif" | "system-ui" => fontdb::Family::SansSerif,
        "cursive" => fontdb::Family::Cursive,
        "fantasy" => fontdb::Family::Fantasy,
        "monospace" => fontdb::Family::Monospace,
        other => fontdb::Family::Name(other),
    }
}

fn load_fonts_from_dir(db: &mut fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        tracing::warn!("Font directory {} is not readable", dir.display());
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        if let Err(e) = db.load_font_file(&path) {
            tracing::warn!("Skipping font {}: {}", path.display(), e);
        }
    }
}

fn make_font_resolver() -> usvg::FontResolver<'static> {
    use usvg::FontResolver;

    FontResolver {
        select_font: Box::new(|font, db| {
            let mut families: Vec<fontdb::Family<'_>> = font
                .families()
                .iter()
                .map(|family| match family {
                    usvg::FontFamily::Serif => fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => family_for(s),
                })
                .collect();
            families.push(fontdb::Family::SansSerif);

            let style = match font.style() {
                usvg::FontStyle::Normal => fontdb::Style::Normal,
                usvg::FontStyle::Italic => fontdb::Style::Italic,
                usvg::FontStyle::Oblique => fontdb::Style::Oblique,
            };

            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight()),
                stretch: fontdb::Stretch::Normal,
                style,
            };

            db.query(&query).or_else(|| db.faces().next().map(|f| f.id))
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}
