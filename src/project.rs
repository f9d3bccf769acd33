// ============================================================================
// PXM PROJECT FILE FORMAT — source image + annotations, bincode-encoded
// ============================================================================

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;
use crate::error::{PixmarkError, Result};
use crate::session::EditorSession;

/// Magic header of the current format.
const PXM_MAGIC_V1: &str = "PXM1";

/// Maximum supported image dimension in pixels (per axis).
/// Prevents memory exhaustion from crafted project files.
pub const MAX_CANVAS_DIM: u32 = 32_768;
/// Maximum number of annotations in a project file.
const MAX_ANNOTATIONS: usize = 100_000;

#[derive(Serialize, Deserialize)]
struct ProjectFileV1 {
    magic: String,
    width: u32,
    height: u32,
    /// Straight-alpha RGBA8, row-major.
    pixels: Vec<u8>,
    annotations: Vec<Annotation>,
    number_counter: u32,
}

/// Save the session's working image and active annotations.  History,
/// selection and region caches are not stored.
pub fn save(session: &EditorSession, path: &Path) -> Result<()> {
    let image = session.image().ok_or(PixmarkError::NoImage)?;
    let project = ProjectFileV1 {
        magic: PXM_MAGIC_V1.to_string(),
        width: image.width(),
        height: image.height(),
        pixels: image.as_raw().clone(),
        annotations: session.annotations().to_vec(),
        number_counter: session.number_counter(),
    };
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, &project)?;
    log_info!("Saved project {} ({} annotations)", path.display(), project.annotations.len());
    Ok(())
}

/// Load a project into a fresh session.
pub fn load(path: &Path) -> Result<EditorSession> {
    let mut session = EditorSession::new();
    load_into(&mut session, path)?;
    Ok(session)
}

/// Load a project into an existing session.  On error the session is left
/// unchanged.
pub fn load_into(session: &mut EditorSession, path: &Path) -> Result<()> {
    let raw = std::fs::read(path)?;
    let (image, annotations, number_counter) = decode(&raw)?;
    session.restore(image, annotations, number_counter);
    log_info!("Loaded project {}", path.display());
    Ok(())
}

fn decode(raw: &[u8]) -> Result<(RgbaImage, Vec<Annotation>, u32)> {
    if raw.len() < 12 {
        return Err(PixmarkError::Project("File too small".into()));
    }
    // bincode writes a String as an 8-byte length prefix + UTF-8 data, so
    // bytes 8..12 hold the magic.
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
    if magic != PXM_MAGIC_V1 {
        return Err(PixmarkError::Project(format!("Unknown magic '{}'", magic)));
    }

    let project: ProjectFileV1 = bincode::deserialize(raw)?;
    if project.width == 0 || project.height == 0 {
        return Err(PixmarkError::Project("Image dimensions cannot be zero".into()));
    }
    if project.width > MAX_CANVAS_DIM || project.height > MAX_CANVAS_DIM {
        return Err(PixmarkError::Project(format!(
            "Image size {}x{} exceeds maximum allowed {}x{}",
            project.width, project.height, MAX_CANVAS_DIM, MAX_CANVAS_DIM
        )));
    }
    if project.annotations.len() > MAX_ANNOTATIONS {
        return Err(PixmarkError::Project(format!(
            "Project contains {} annotations, which exceeds the maximum of {}",
            project.annotations.len(),
            MAX_ANNOTATIONS
        )));
    }

    let expected = project.width as usize * project.height as usize * 4;
    if project.pixels.len() != expected {
        return Err(PixmarkError::Project(format!(
            "Pixel data has {} bytes, expected {}",
            project.pixels.len(),
            expected
        )));
    }
    let image = RgbaImage::from_raw(project.width, project.height, project.pixels)
        .ok_or_else(|| PixmarkError::Project("Failed to reconstruct image".into()))?;

    Ok((image, project.annotations, project.number_counter))
}
