/// Content family a file is reduced as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    Image,
    Code,
    Pdf,
    Archive,
    Audio,
    Video,
}

impl Family {
    pub fn label(self) -> &'static str {
        match self {
            Family::Image => "image",
            Family::Code => "code",
            Family::Pdf => "pdf",
            Family::Archive => "archive",
            Family::Audio => "audio",
            Family::Video => "video",
        }
    }
}

const CODE_EXTENSIONS: &[&str] = &["js", "mjs", "javascript", "css", "html", "htm", "json", "xml"];
const SVG_MIME: &str = "image/svg+xml";

/// Maps a file name and its declared MIME type to a family. First matching rule wins;
/// anything unrecognised is wrapped in an archive.
pub fn classify(file_name: &str, declared_type: &str) -> Family {
    let ext = file_extension(file_name);
    let mime = mime_essence(declared_type);
    let is_svg = ext == "svg" || mime == SVG_MIME;

    if mime.starts_with("image/") && !is_svg {
        return Family::Image;
    }
    if is_svg || CODE_EXTENSIONS.contains(&ext.as_str()) {
        return Family::Code;
    }
    if mime == "application/pdf" || ext == "pdf" {
        return Family::Pdf;
    }
    if mime.starts_with("audio/") {
        return Family::Audio;
    }
    if mime.starts_with("video/") {
        return Family::Video;
    }
    Family::Archive
}

/// Lower-cased type without parameters: `Image/SVG+XML; charset=utf-8` gives
/// `image/svg+xml`.
pub fn mime_essence(declared_type: &str) -> String {
    declared_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Lower-cased text after the last `.` of the final path segment, or empty.
/// A leading dot counts, so `.json` has the extension `json`.
pub fn file_extension(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}
