//! Content types and data URIs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

fn extension(path: &Path) -> String {
    path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).unwrap_or_default()
}

/// MIME type by extension; `application/octet-stream` when unknown.
pub fn mime_type(path: &Path) -> &'static str {
    match extension(path).as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "xml" | "plist" => "application/xml",
        "txt" => "text/plain",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" | "cur" => "image/x-icon",
        "eot" => "application/vnd.ms-fontobject",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "swf" => "application/x-shockwave-flash",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

fn is_text(path: &Path) -> bool {
    matches!(extension(path).as_str(), "css" | "js" | "html" | "htm" | "json" | "map" | "plist" | "svg" | "xml")
}

/// Full `Content-Type` header value, with a UTF-8 charset for text types.
pub fn content_type(path: &Path) -> String {
    match is_text(path) {
        true => format!("{}; charset=utf-8", mime_type(path)),
        false => mime_type(path).to_string(),
    }
}

/// Whether the object is stored gzip-compressed.
pub fn should_gzip(path: &Path) -> bool {
    matches!(extension(path).as_str(), "js" | "html" | "htm" | "plist")
}

/// Small binary assets that may be inlined into their parent document.
pub fn is_inlinable(path: &Path) -> bool {
    matches!(extension(path).as_str(), "jpg" | "jpeg" | "png" | "gif" | "cur" | "eot" | "woff" | "ttf" | "svg")
}

/// `data:<mime>;base64,<payload>`.
pub fn data_uri(path: &Path, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type(path), STANDARD.encode(bytes))
}
