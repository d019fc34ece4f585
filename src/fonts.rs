use ab_glyph::FontVec;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Display name and file name of every selectable font.
pub const CATALOG: &[(&str, &str)] = &[
    ("仿宋", "simfang.ttf"),
    ("宋体", "simsun.ttc"),
    ("黑体", "simhei.ttf"),
    ("微软雅黑", "msyh.ttc"),
    ("楷体", "simkai.ttf"),
    ("等线", "Deng.ttf"),
    ("Arial", "arial.ttf"),
    ("Calibri", "calibri.ttf"),
    ("Cambria", "cambria.ttc"),
    ("Verdana", "verdana.ttf"),
    ("Tahoma", "tahoma.ttf"),
    ("Segoe UI", "segoeui.ttf"),
    ("Consolas", "consola.ttf"),
    ("Georgia", "georgia.ttf"),
    ("Impact", "impact.ttf"),
    ("Symbol", "symbol.ttf"),
    ("Webdings", "webdings.ttf"),
    ("Wingdings", "wingding.ttf"),
];

pub const DEFAULT_FONT: &str = "宋体";

#[derive(Debug, Error)]
pub enum FontError {
    #[error("font '{0}' is not installed (looked for {1:?})")]
    NotInstalled(String, PathBuf),

    #[error("failed to read font file {0:?}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to parse font file {0:?}")]
    Parse(PathBuf),
}

/// Look up a catalog display name.
pub fn catalog_file(name: &str) -> Option<&'static str> {
    CATALOG
        .iter()
        .find(|(display, _)| *display == name)
        .map(|(_, file)| *file)
}

/// Resolve a font reference to an existing file.
///
/// A reference is a catalog display name, a file name inside `font_dir`,
/// or an absolute path.
pub fn resolve(reference: &str, font_dir: &Path) -> Result<PathBuf, FontError> {
    let candidate = match catalog_file(reference) {
        Some(file) => font_dir.join(file),
        None => {
            let path = Path::new(reference);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                font_dir.join(path)
            }
        }
    };

    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(FontError::NotInstalled(reference.to_string(), candidate))
    }
}

pub fn load(path: &Path) -> Result<FontVec, FontError> {
    let data = std::fs::read(path).map_err(|e| FontError::Read(path.to_path_buf(), e))?;
    FontVec::try_from_vec(data).map_err(|_| FontError::Parse(path.to_path_buf()))
}
