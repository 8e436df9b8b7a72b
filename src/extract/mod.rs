//! Same-origin resource discovery and HTML rewriting.
//!
//! [`extract_resources`] parses a page, finds `img[src]`, `script[src]` and
//! `link[rel~=stylesheet][href]` references that resolve to the page's own
//! origin, rewrites each one to `<assets dir>/<local slug>` and returns the
//! serialized HTML together with the list of assets to download.
//! `<meta>` charset declarations are rewritten to UTF-8 to match the
//! serialized output.

mod dom;

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::slug;

/// A same-origin resource referenced by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Absolute URL the resource is fetched from.
    pub remote_url: Url,
    /// File name inside the assets directory.
    pub local_slug: String,
}

/// Rewritten page plus the assets it now points at.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Serialized HTML with every qualifying reference rewritten.
    pub html: String,
    /// One entry per rewritten reference, in document order.
    pub assets: Vec<Asset>,
}

/// Errors raised while rewriting a page.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The rewritten tree could not be serialized.
    #[error("failed to serialize rewritten HTML: {0}")]
    Serialize(#[from] std::io::Error),
}

/// Tag and attribute pairs that can reference a downloadable resource.
const RESOURCE_ATTRS: &[(&str, &str)] = &[("img", "src"), ("link", "href"), ("script", "src")];

/// Finds and rewrites same-origin resource references.
///
/// Cross-origin references, `data:` URLs, empty values and values that do
/// not resolve against `base_url` are left exactly as they were.
///
/// # Errors
///
/// [`ExtractError::Serialize`] if the rewritten document cannot be written
/// back to a string.
///
/// # Example
///
/// ```
/// use page_loader_core::extract::extract_resources;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/").unwrap();
/// let page = r#"<img src="/images/logo.png"><img src="https://cdn.other.com/a.png">"#;
/// let extraction = extract_resources(page, &base).unwrap();
///
/// assert_eq!(extraction.assets.len(), 1);
/// assert!(extraction.html.contains(r#"src="example.com_files/images-logo.png""#));
/// assert!(extraction.html.contains("https://cdn.other.com/a.png"));
/// ```
#[instrument(skip(html), fields(base_url = %base_url, len = html.len()))]
pub fn extract_resources(html: &str, base_url: &Url) -> Result<Extraction, ExtractError> {
    let document = dom::html_to_dom(html);
    let assets_dir = slug::assets_dirname(base_url);
    let origin = base_url.origin();
    let mut assets = Vec::new();
    let mut owners: HashMap<String, Url> = HashMap::new();

    for node in dom::elements_in_order(&document.document) {
        if dom::get_node_name(&node) == Some("meta") {
            declare_utf8(&node);
            continue;
        }
        let Some(attr_name) = resource_attr(&node) else {
            continue;
        };
        let Some(value) = dom::get_node_attr(&node, attr_name) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        let Ok(remote_url) = base_url.join(value) else {
            debug!(value, "unresolvable reference left untouched");
            continue;
        };
        if remote_url.origin() != origin {
            debug!(url = %remote_url, "cross-origin reference left untouched");
            continue;
        }

        let local_slug = claim_slug(&mut owners, &remote_url);
        dom::set_node_attr(&node, attr_name, &format!("{assets_dir}/{local_slug}"));
        debug!(url = %remote_url, slug = %local_slug, "asset found");
        assets.push(Asset {
            remote_url,
            local_slug,
        });
    }

    let html = dom::serialize_document(&document)?;
    Ok(Extraction { html, assets })
}

/// Local name for `url`, numbered when a different URL already owns the
/// plain slug. Repeated references to one URL share one name.
fn claim_slug(owners: &mut HashMap<String, Url>, url: &Url) -> String {
    let plain = slug::asset_slug(url);
    let mut candidate = plain.clone();
    let mut n = 1;
    loop {
        match owners.get(&candidate) {
            Some(owner) if owner == url => return candidate,
            Some(_) => {
                n += 1;
                candidate = slug::numbered_slug(&plain, n);
            }
            None => {
                if n > 1 {
                    debug!(url = %url, slug = %candidate, "slug renamed to avoid a clash");
                }
                owners.insert(candidate.clone(), url.clone());
                return candidate;
            }
        }
    }
}

/// Pages are always written as UTF-8, whatever encoding they were served in.
fn declare_utf8(meta: &markup5ever_rcdom::Handle) {
    if dom::get_node_attr(meta, "charset").is_some() {
        dom::set_node_attr(meta, "charset", "utf-8");
    }
    let is_content_type = dom::get_node_attr(meta, "http-equiv")
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("content-type"));
    if is_content_type {
        dom::set_node_attr(meta, "content", "text/html; charset=utf-8");
    }
}

/// Attribute to rewrite on `node`, if it is a resource reference.
fn resource_attr(node: &markup5ever_rcdom::Handle) -> Option<&'static str> {
    let name = dom::get_node_name(node)?;
    let (tag, attr) = RESOURCE_ATTRS
        .iter()
        .find(|(tag, _)| name.eq_ignore_ascii_case(tag))?;
    if *tag == "link" && !dom::is_stylesheet_link(node) {
        return None;
    }
    Some(*attr)
}
