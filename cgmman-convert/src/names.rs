//! File-name conventions.
//!
//! Case is ignored everywhere a name is compared, and `trasp_<name>` is the
//! same logical file as `<name>`.

use std::path::Path;

use cgmman_core::{Extension, SOURCE_EXTENSION, STAGING_PREFIX};

/// True when `path` ends in the managed source extension, in any case.
pub fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION.trim_start_matches('.')))
        .unwrap_or(false)
}

/// Strip a leading staging prefix, compared case-insensitively.
pub fn strip_staging_prefix(stem: &str) -> &str {
    let prefix_len = STAGING_PREFIX.len();
    match stem.get(..prefix_len) {
        Some(head) if head.eq_ignore_ascii_case(STAGING_PREFIX) => &stem[prefix_len..],
        _ => stem,
    }
}

/// `trasp_Drawing.cgm` → `Drawing`.
pub fn logical_name(raw_filename: &str) -> &str {
    let stem = Path::new(raw_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(raw_filename);
    strip_staging_prefix(stem)
}

/// Name of the file a converter for `extension` produces.
pub fn output_filename(logical_name: &str, extension: &Extension) -> String {
    format!("{logical_name}{extension}")
}

/// Does `candidate` name the output of `logical_name` for `extension`,
/// with or without the staging prefix?
pub fn names_match_output(candidate: &str, logical_name: &str, extension: &Extension) -> bool {
    let candidate = candidate.to_lowercase();
    let plain = output_filename(logical_name, extension).to_lowercase();
    let prefixed = format!("{}{plain}", STAGING_PREFIX.to_lowercase());
    candidate == plain || candidate == prefixed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(raw: &str) -> Extension {
        Extension::parse(raw).unwrap()
    }

    #[test]
    fn source_extension_ignores_case() {
        assert!(has_source_extension(Path::new("/x/drawing.cgm")));
        assert!(has_source_extension(Path::new("/x/DRAWING.CGM")));
        assert!(!has_source_extension(Path::new("/x/drawing.cgm.part")));
        assert!(!has_source_extension(Path::new("/x/cgm")));
    }

    #[test]
    fn logical_name_strips_prefix_in_any_case() {
        assert_eq!(logical_name("drawing.cgm"), "drawing");
        assert_eq!(logical_name("trasp_drawing.cgm"), "drawing");
        assert_eq!(logical_name("TRASP_Drawing.CGM"), "Drawing");
        assert_eq!(logical_name("trasp.cgm"), "trasp");
    }

    #[test]
    fn prefix_is_only_stripped_once_and_at_start() {
        assert_eq!(logical_name("trasp_trasp_a.cgm"), "trasp_a");
        assert_eq!(logical_name("my_trasp_a.cgm"), "my_trasp_a");
    }

    #[test]
    fn output_match_accepts_prefixed_and_any_case() {
        let tif = ext(".tif");
        assert!(names_match_output("drawing.tif", "drawing", &tif));
        assert!(names_match_output("DRAWING.TIF", "drawing", &tif));
        assert!(names_match_output("Trasp_Drawing.Tif", "drawing", &tif));
        assert!(!names_match_output("drawing.tiff", "drawing", &tif));
        assert!(!names_match_output("other.tif", "drawing", &tif));
    }
}
