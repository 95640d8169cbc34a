//! "Generate all styles": one renderer, one style at a time, and whatever
//! succeeded is kept even when other styles fail.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use chrono::NaiveDate;
use log::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::PosterConfig;
use crate::error::{CompositionError, PosterError};
use crate::export::{self, ExportFormat, ExportResult, ExportSpec, slug};
use crate::render::{RenderRequest, Renderer, RenderSession, ScopedSession};
use crate::style;
use crate::track::{Track, ViewState};

/// The parts of an export shared by every style in the batch.
#[derive(Debug, Clone)]
pub struct BatchJob<'a> {
    pub track: &'a Track,
    pub view: ViewState,
    /// Format, size, line width, background and label; the style and trace
    /// color are replaced per style.
    pub spec: ExportSpec,
    pub config: &'a PosterConfig,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct StyleExport {
    pub style_id: String,
    pub poster: ExportResult,
    pub profile_png: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct StyleFailure {
    pub style_id: String,
    pub error: PosterError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub exported: Vec<StyleExport>,
    pub failures: Vec<StyleFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Zip of every poster that succeeded, profiles under `profiles/`.
    pub fn to_archive(&self) -> Result<Vec<u8>, CompositionError> {
        let mut archive = PosterArchive::new();
        for e in &self.exported {
            archive.add_poster(&e.poster.file_name, &e.poster.content)?;
            if let Some(png) = &e.profile_png {
                archive.add_profile(&e.style_id, png)?;
            }
        }
        archive.finish()
    }
}

/// Export `style_ids` in order. A failing style is recorded and skipped.
///
/// Each style is awaited to completion before the next one is opened.
pub async fn export_styles<R: Renderer>(
    renderer: &mut R,
    job: &BatchJob<'_>,
    style_ids: &[&str],
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for (i, &style_id) in style_ids.iter().enumerate() {
        info!("exporting style {}/{}: {}", i + 1, style_ids.len(), style_id);
        match export_one(renderer, job, style_id).await {
            Ok(done) => outcome.exported.push(done),
            Err(error) => {
                warn!("style '{style_id}' failed: {error}");
                outcome.failures.push(StyleFailure {
                    style_id: style_id.to_string(),
                    error,
                });
            }
        }
    }

    info!(
        "batch finished: {} exported, {} failed",
        outcome.exported.len(),
        outcome.failures.len()
    );
    outcome
}

async fn export_one<R: Renderer>(
    renderer: &mut R,
    job: &BatchJob<'_>,
    style_id: &str,
) -> Result<StyleExport, PosterError> {
    let style = match style::find(style_id) {
        Some(s) => s,
        None => {
            warn!("unknown style '{style_id}', using '{}'", style::DEFAULT_STYLE.id);
            style::resolve(style_id)
        }
    };

    let mut spec = job.spec.clone();
    spec.style_id = style.id.to_string();
    spec.trace_color = None;
    // a shared label would give every style the same file name
    spec.label = spec.label.take().map(|label| format!("{label} {}", style.id));
    spec.validate()?;

    let request = RenderRequest {
        track: job.track,
        view: job.view,
        style,
        source: style.source(spec.background_color),
        trace_color: spec.trace_color(),
        line_width: spec.print_line_width(job.config),
        width: spec.pixel_width,
        height: spec.pixel_height,
    };

    let (map, profile) = {
        let (session, idle) = renderer.open(&request)?;
        let mut session = ScopedSession::new(session);
        let timeout = job.config.render_timeout();
        idle.wait(renderer.delay(timeout), timeout, style.id).await?;
        let map = session.capture_map()?;
        let profile = session.capture_profile()?;
        (map, profile)
    };

    let poster = export::compose(&map, profile.as_ref(), &spec, job.config, job.date)?;
    let profile_png = profile.as_ref().map(export::encode_png).transpose()?;

    Ok(StyleExport {
        style_id: style.id.to_string(),
        poster,
        profile_png,
    })
}

/// Builds the zip handed to the download when several posters are exported.
///
/// Entry names are unique: a repeated name gets `-2`, `-3`, ... before its
/// extension.
pub struct PosterArchive {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
    has_profiles: bool,
}

impl Default for PosterArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl PosterArchive {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
            has_profiles: false,
        }
    }

    /// Returns the name the poster was stored under.
    pub fn add_poster(&mut self, file_name: &str, content: &[u8]) -> Result<String, CompositionError> {
        // raster formats are already compressed
        let method = if file_name.ends_with(ExportFormat::Svg.extension()) {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        self.write_entry(file_name.to_string(), content, method)
    }

    pub fn add_profile(&mut self, stem: &str, png: &[u8]) -> Result<String, CompositionError> {
        if !self.has_profiles {
            self.zip
                .add_directory("profiles/", SimpleFileOptions::default())?;
            self.has_profiles = true;
        }
        let name = format!("profiles/{}-profile.png", slug(stem));
        self.write_entry(name, png, CompressionMethod::Stored)
    }

    pub fn finish(self) -> Result<Vec<u8>, CompositionError> {
        Ok(self.zip.finish()?.into_inner())
    }

    fn write_entry(
        &mut self,
        name: String,
        content: &[u8],
        method: CompressionMethod,
    ) -> Result<String, CompositionError> {
        let name = self.unique_name(name);
        let options = SimpleFileOptions::default().compression_method(method);
        self.zip.start_file(name.as_str(), options)?;
        self.zip
            .write_all(content)
            .map_err(|e| CompositionError::Archive(e.to_string()))?;
        Ok(name)
    }

    fn unique_name(&mut self, name: String) -> String {
        if self.names.insert(name.clone()) {
            return name;
        }
        let file_start = name.rfind('/').map_or(0, |i| i + 1);
        let (stem, ext) = match name[file_start..].rfind('.') {
            Some(dot) if dot > 0 => name.split_at(file_start + dot),
            _ => (name.as_str(), ""),
        };
        let mut n = 2;
        loop {
            let candidate = format!("{stem}-{n}{ext}");
            if self.names.insert(candidate.clone()) {
                warn!("archive already has '{name}', storing as '{candidate}'");
                return candidate;
            }
            n += 1;
        }
    }
}
