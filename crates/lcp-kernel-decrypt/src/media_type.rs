//! Media type inference from resource paths.

/// Fallback for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Infer a media type from the extension of `path`.
pub fn from_path(path: &str) -> &'static str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let extension = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return OCTET_STREAM,
    };

    match extension.as_str() {
        "css" => "text/css",
        "epub" => "application/epub+zip",
        "gif" => "image/gif",
        "htm" | "html" => "text/html",
        "jpg" | "jpeg" => "image/jpeg",
        "mp3" => "audio/mpeg",
        "ncx" => "application/x-dtbncx+xml",
        "opf" => "application/oebps-package+xml",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "xhtml" => "application/xhtml+xml",
        _ => OCTET_STREAM,
    }
}

/// Whether text output for this media type gets trailing garbage trimmed
/// after the last `>`.
pub fn is_markup(media_type: &str) -> bool {
    media_type.contains("html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(from_path("OEBPS/chapter1.xhtml"), "application/xhtml+xml");
        assert_eq!(from_path("styles/main.CSS"), "text/css");
        assert_eq!(from_path("images/cover.jpeg"), "image/jpeg");
        assert_eq!(from_path("index.htm"), "text/html");
    }

    #[test]
    fn test_unknown_or_missing_extension() {
        assert_eq!(from_path("fonts/font.otf"), OCTET_STREAM);
        assert_eq!(from_path("mimetype"), OCTET_STREAM);
        assert_eq!(from_path("dir.d/README"), OCTET_STREAM);
    }

    #[test]
    fn test_markup() {
        assert!(is_markup("application/xhtml+xml"));
        assert!(is_markup("text/html"));
        assert!(!is_markup("text/css"));
    }
}
