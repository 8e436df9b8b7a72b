//! URL-to-filename slugification.
//!
//! Every name this crate writes to disk is produced here. The functions are
//! pure: the same input always yields the same name, and the output only
//! contains ASCII alphanumerics, the `-` separator and a single literal dot
//! before the extension.

use url::Url;

/// Extension used when the input carries none.
pub const DEFAULT_EXTENSION: &str = ".html";

/// Suffix appended to the page slug to name its assets directory.
pub const ASSETS_DIR_SUFFIX: &str = "_files";

const SEPARATOR: &str = "-";

/// Maps a `host/path` string to a filesystem-safe file name.
///
/// The original extension is kept when present, otherwise `default_ext` is
/// appended. An empty input yields just `default_ext`.
///
/// ```
/// use page_loader_core::slug::url_to_filename;
///
/// assert_eq!(url_to_filename("example.com/images/logo.png", ".html"), "example-com-images-logo.png");
/// assert_eq!(url_to_filename("example.com/courses", ".html"), "example-com-courses.html");
/// ```
#[must_use]
pub fn url_to_filename(input: &str, default_ext: &str) -> String {
    let (stem, ext) = split_stem_and_extension(input);
    let slug = slugify(stem);
    match ext {
        Some(ext) => format!("{slug}.{ext}"),
        None => format!("{slug}{default_ext}"),
    }
}

/// Maps a `host/path` string to a filesystem-safe directory name.
///
/// The extension, if any, is kept literally ahead of `suffix`, so
/// `example.com` becomes `example.com_files`, matching the page file
/// `example.com.html`.
#[must_use]
pub fn url_to_dirname(input: &str, suffix: &str) -> String {
    let (stem, ext) = split_stem_and_extension(input);
    let slug = slugify(stem);
    match ext {
        Some(ext) => format!("{slug}.{ext}{suffix}"),
        None => format!("{slug}{suffix}"),
    }
}

/// File name of the saved page for `url`.
///
/// `.html` is appended unless the slug already ends with it, so a bare
/// domain maps to `<host>.html`.
#[must_use]
pub fn page_filename(url: &Url) -> String {
    let name = url_to_filename(&host_and_path(url), DEFAULT_EXTENSION);
    if name.ends_with(DEFAULT_EXTENSION) {
        name
    } else {
        format!("{name}{DEFAULT_EXTENSION}")
    }
}

/// Name of the directory holding the assets of the page at `url`.
#[must_use]
pub fn assets_dirname(url: &Url) -> String {
    url_to_dirname(&host_and_path(url), ASSETS_DIR_SUFFIX)
}

/// Local file name for a same-origin resource.
///
/// Derived from the percent-decoded URL path. When the path has no usable
/// stem (e.g. `/`) the host is prepended so the name is never just an
/// extension.
#[must_use]
pub fn asset_slug(url: &Url) -> String {
    let path = urlencoding::decode(url.path())
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| url.path().to_string());

    let (stem, _) = split_stem_and_extension(&path);
    if slugify(stem).is_empty() {
        return url_to_filename(&host_and_path(url), DEFAULT_EXTENSION);
    }
    url_to_filename(&path, DEFAULT_EXTENSION)
}

/// Variant of `slug` with a `-n` counter ahead of its extension, used when
/// another resource already owns `slug`.
///
/// ```
/// use page_loader_core::slug::numbered_slug;
///
/// assert_eq!(numbered_slug("img-logo.png", 2), "img-logo-2.png");
/// assert_eq!(numbered_slug("fonts", 3), "fonts-3");
/// ```
#[must_use]
pub fn numbered_slug(slug: &str, n: usize) -> String {
    match slug.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}{SEPARATOR}{n}.{ext}"),
        _ => format!("{slug}{SEPARATOR}{n}"),
    }
}

fn host_and_path(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or_default(), url.path())
}

/// Splits the input into the part to slug and an optional extension
/// (without its leading dot).
fn split_stem_and_extension(input: &str) -> (&str, Option<&str>) {
    let end = input.find(['?', '#']).unwrap_or(input.len());
    let trimmed = input[..end].trim_end_matches('/');

    let base_start = trimmed.rfind('/').map_or(0, |i| i + 1);
    let base = &trimmed[base_start..];

    // A leading dot (".bashrc") names the file, it does not start an extension.
    match base.rfind('.') {
        Some(dot) if dot > 0 => {
            let ext = &base[dot + 1..];
            if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                (&trimmed[..base_start + dot], Some(ext))
            } else {
                (trimmed, None)
            }
        }
        _ => (trimmed, None),
    }
}

fn slugify(value: &str) -> String {
    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
