use crate::candidate::{
    format_from_image_src, format_from_url, is_data_uri, resolve_url, Candidate,
};
use crate::http::Fetcher;
use crate::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// A `<link>`/`<meta>` selector that can point at an icon.
#[derive(Debug, Clone, Copy)]
pub struct IconSelector {
    pub selector: &'static str,
    /// Attribute holding the URL.
    pub attr: &'static str,
    pub context: &'static str,
    /// Relative importance of the source, highest first. Informational only.
    pub base_importance: u32,
}

pub const MANIFEST_SELECTOR: &str = r#"link[rel="manifest"]"#;

pub const ICON_SELECTORS: &[IconSelector] = &[
    IconSelector {
        selector: r#"link[rel="apple-touch-icon"]"#,
        attr: "href",
        context: "apple-touch",
        base_importance: 150,
    },
    IconSelector {
        selector: r#"link[rel="apple-touch-icon-precomposed"]"#,
        attr: "href",
        context: "apple-touch",
        base_importance: 150,
    },
    IconSelector {
        selector: r#"link[rel="icon"][type="image/svg+xml"]"#,
        attr: "href",
        context: "favicon",
        base_importance: 100,
    },
    IconSelector {
        selector: r#"link[rel="icon"]"#,
        attr: "href",
        context: "favicon",
        base_importance: 100,
    },
    IconSelector {
        selector: r#"link[rel="shortcut icon"]"#,
        attr: "href",
        context: "favicon",
        base_importance: 100,
    },
    IconSelector {
        selector: r#"meta[property="og:image"]"#,
        attr: "content",
        context: "social",
        base_importance: 50,
    },
    IconSelector {
        selector: r#"meta[name="og:image"]"#,
        attr: "content",
        context: "social",
        base_importance: 50,
    },
    IconSelector {
        selector: r#"meta[name="twitter:image"]"#,
        attr: "content",
        context: "social",
        base_importance: 50,
    },
    IconSelector {
        selector: r#"meta[name="msapplication-TileImage"]"#,
        attr: "content",
        context: "favicon",
        base_importance: 100,
    },
];

/// Substrings matched against raw `class`/`id` values, case-sensitive.
pub const BRAND_PATTERNS: &[&str] = &[
    "logo",
    "icon",
    "brand",
    "header-logo",
    "site-logo",
    "company-logo",
    "navbar-brand",
    "logo-img",
    "brand-img",
    "site-icon",
];

/// Probed in order against the domain root, independent of the HTML.
pub const FALLBACK_PATHS: &[&str] = &[
    "/favicon.svg",
    "/logo.svg",
    "/icon.svg",
    "/favicon-512x512.png",
    "/apple-touch-icon.png",
    "/apple-touch-icon-precomposed.png",
    "/favicon.ico",
];

const APPLE_TOUCH_DEFAULT_SIZE: u32 = 180;

fn size_in_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d{2,4})x(\d{2,4})").expect("size regex"))
}

/// Runs every HTML-driven discovery step, in order: manifests, icon
/// selectors, brand class/id patterns, then the `logo` keyword scan.
pub fn extract_html_candidates(
    domain: &str,
    html: &str,
    fetcher: &dyn Fetcher,
    log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let mut out: Vec<Candidate> = Vec::new();

    for manifest_url in manifest_urls(domain, &document) {
        out.extend(manifest_candidates(domain, &manifest_url, fetcher, log_line));
    }
    out.extend(selector_candidates(domain, &document, log_line));
    out.extend(brand_pattern_candidates(domain, &document, log_line));
    out.extend(logo_keyword_candidates(domain, &document, log_line));
    out
}

pub fn manifest_urls(domain: &str, document: &Html) -> Vec<String> {
    let selector = Selector::parse(MANIFEST_SELECTOR).expect("manifest selector");
    document
        .select(&selector)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| resolve_url(domain, href))
        .collect()
}

/// Fetches one Web App Manifest; any failure yields no icons.
pub fn manifest_candidates(
    domain: &str,
    manifest_url: &str,
    fetcher: &dyn Fetcher,
    log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
) -> Vec<Candidate> {
    let response = match fetcher
        .get(manifest_url)
        .and_then(|resp| resp.error_for_status(manifest_url))
    {
        Ok(resp) => resp,
        Err(err) => {
            log_line(
                "debug",
                "manifest_fetch_failed",
                serde_json::json!({ "url": manifest_url, "error": err.to_string() }),
            );
            return Vec::new();
        }
    };

    match parse_manifest_icons(domain, &response.text()) {
        Ok(icons) => {
            for icon in &icons {
                log_candidate(log_line, "manifest", icon);
            }
            icons
        }
        Err(err) => {
            log_line(
                "debug",
                "manifest_parse_failed",
                serde_json::json!({ "url": manifest_url, "error": err.to_string() }),
            );
            Vec::new()
        }
    }
}

pub fn parse_manifest_icons(domain: &str, raw_json: &str) -> Result<Vec<Candidate>> {
    let manifest: serde_json::Value = serde_json::from_str(raw_json)?;
    let Some(icons) = manifest.get("icons").and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for icon in icons {
        let src = icon.get("src").and_then(|v| v.as_str()).unwrap_or("");
        if src.trim().is_empty() || is_data_uri(src) {
            continue;
        }
        let Some(url) = resolve_url(domain, src) else {
            continue;
        };
        let sizes = icon.get("sizes").and_then(|v| v.as_str()).unwrap_or("");
        let (width, height) = parse_sizes(sizes).unwrap_or((0, 0));
        let format = format_from_url(&url);
        out.push(Candidate::new(url, width, height, format));
    }
    Ok(out)
}

pub fn selector_candidates(
    domain: &str,
    document: &Html,
    log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
) -> Vec<Candidate> {
    let mut out = Vec::new();
    for entry in ICON_SELECTORS {
        let selector = match Selector::parse(entry.selector) {
            Ok(selector) => selector,
            Err(err) => {
                log_line(
                    "warn",
                    "selector_invalid",
                    serde_json::json!({ "selector": entry.selector, "error": err.to_string() }),
                );
                continue;
            }
        };
        for element in document.select(&selector) {
            let raw = element.value().attr(entry.attr).unwrap_or("").trim();
            if raw.is_empty() || is_data_uri(raw) {
                continue;
            }
            let Some(url) = resolve_url(domain, raw) else {
                continue;
            };
            let (width, height) = element_dimensions(&element);
            let format = format_from_url(&url);
            let candidate = Candidate::new(url, width, height, format);
            log_candidate(log_line, entry.context, &candidate);
            out.push(candidate);
        }
    }
    out
}

/// Images inside (or being) elements whose class or id contains a brand pattern.
pub fn brand_pattern_candidates(
    domain: &str,
    document: &Html,
    log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
) -> Vec<Candidate> {
    let selector_img = Selector::parse("img").expect("img selector");
    let mut out = Vec::new();

    for pattern in BRAND_PATTERNS {
        for attr in ["class", "id"] {
            let raw_selector = format!(r#"[{attr}*="{pattern}"]"#);
            let Ok(selector) = Selector::parse(&raw_selector) else {
                continue;
            };
            for element in document.select(&selector) {
                let images: Vec<ElementRef<'_>> = if element.value().name() == "img" {
                    vec![element]
                } else {
                    element.select(&selector_img).collect()
                };
                for img in images {
                    if let Some(candidate) = img_candidate(domain, &img) {
                        log_candidate(log_line, "brand-pattern", &candidate);
                        out.push(candidate);
                    }
                }
            }
        }
    }
    out
}

/// Every `<img>` mentioning "logo" in its URL path, alt, class, or id.
pub fn logo_keyword_candidates(
    domain: &str,
    document: &Html,
    log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
) -> Vec<Candidate> {
    let selector_img = Selector::parse("img").expect("img selector");
    let mut out = Vec::new();

    for img in document.select(&selector_img) {
        let Some(candidate) = img_candidate(domain, &img) else {
            continue;
        };
        let path = Url::parse(&candidate.url)
            .map(|u| u.path().to_ascii_lowercase())
            .unwrap_or_else(|_| candidate.url.to_ascii_lowercase());
        let has_logo = [
            path.as_str(),
            candidate.alt_text.as_str(),
            candidate.css_classes.as_str(),
            candidate.element_id.as_str(),
        ]
        .iter()
        .any(|value| value.to_ascii_lowercase().contains("logo"));
        if has_logo {
            log_candidate(log_line, "logo-keyword", &candidate);
            out.push(candidate);
        }
    }
    out
}

/// Probes [`FALLBACK_PATHS`] with HEAD requests; only a 200 yields a candidate.
pub fn fallback_candidates(
    domain: &str,
    fetcher: &dyn Fetcher,
    log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
) -> Vec<Candidate> {
    let mut out = Vec::new();
    for path in FALLBACK_PATHS {
        let url = format!("https://{domain}{path}");
        let response = match fetcher.head(&url) {
            Ok(resp) => resp,
            Err(err) => {
                log_line(
                    "debug",
                    "fallback_probe_failed",
                    serde_json::json!({ "url": url, "error": err.to_string() }),
                );
                continue;
            }
        };
        if response.status != 200 {
            log_line(
                "debug",
                "fallback_probe_missed",
                serde_json::json!({ "url": url, "status": response.status }),
            );
            continue;
        }

        let final_url = if response.final_url.is_empty() {
            url
        } else {
            response.final_url
        };
        let (width, height) = dimensions_from_name(path).unwrap_or_else(|| {
            if path.contains("apple-touch-icon") {
                (APPLE_TOUCH_DEFAULT_SIZE, APPLE_TOUCH_DEFAULT_SIZE)
            } else {
                (0, 0)
            }
        });
        let format = format_from_url(&format!("https://{domain}{path}"));
        let candidate = Candidate::new(final_url, width, height, format);
        log_candidate(log_line, "fallback", &candidate);
        out.push(candidate);
    }
    out
}

/// `sizes` attribute first (largest area wins), then a `WxH` pattern in the
/// `href`/`content` value, otherwise `(0, 0)`.
pub fn element_dimensions(element: &ElementRef<'_>) -> (u32, u32) {
    let attrs = element.value();
    extract_dimensions(
        attrs.attr("sizes"),
        attrs
            .attr("href")
            .filter(|v| !v.is_empty())
            .or_else(|| attrs.attr("content")),
    )
}

pub fn extract_dimensions(sizes: Option<&str>, href: Option<&str>) -> (u32, u32) {
    if let Some(found) = sizes.and_then(parse_sizes) {
        return found;
    }
    href.and_then(dimensions_from_name).unwrap_or((0, 0))
}

/// Parses space-separated `WxH` tokens (also `×`), returning the largest area.
/// Non-digit characters inside each half are ignored; `any` means unknown.
pub fn parse_sizes(sizes: &str) -> Option<(u32, u32)> {
    let sizes = sizes.trim();
    if sizes.is_empty() || sizes.eq_ignore_ascii_case("any") {
        return None;
    }

    let mut best: Option<(u32, u32)> = None;
    let mut best_area = 0_u64;
    for token in sizes.split_whitespace() {
        let Some(caps) = sizes_token_re().captures(token) else {
            continue;
        };
        let (Some(w), Some(h)) = (digits_only(&caps[1]), digits_only(&caps[2])) else {
            continue;
        };
        let area = u64::from(w) * u64::from(h);
        if best.is_none() || area > best_area {
            best = Some((w, h));
            best_area = area;
        }
    }
    best
}

// `W[junk]xH[junk]`, split at the first separator after the leading digits.
fn sizes_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d[^xX\x{00D7}]*)[xX\x{00D7}](.+)$").expect("sizes regex"))
}

fn digits_only(value: &str) -> Option<u32> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<u32>().ok()
}

/// First `WxH` pattern (2-4 digits per side) anywhere in a URL or filename.
pub fn dimensions_from_name(value: &str) -> Option<(u32, u32)> {
    let caps = size_in_name_re().captures(value)?;
    let w = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let h = caps.get(2)?.as_str().parse::<u32>().ok()?;
    Some((w, h))
}

fn parse_dimension_attr(tag: &ElementRef<'_>, key: &str) -> u32 {
    tag.value()
        .attr(key)
        .map(|raw| raw.trim().trim_end_matches("px"))
        .and_then(|raw| raw.parse::<u32>().ok())
        .unwrap_or(0)
}

/// Ancestor `class` attributes, nearest first, skipping ancestors without one.
pub fn ancestor_classes(element: &ElementRef<'_>) -> Vec<String> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .filter_map(|ancestor| ancestor.value().attr("class"))
        .filter(|classes| !classes.is_empty())
        .map(str::to_string)
        .collect()
}

fn img_candidate(domain: &str, img: &ElementRef<'_>) -> Option<Candidate> {
    let src = img.value().attr("src").unwrap_or("").trim();
    if src.is_empty() || is_data_uri(src) {
        return None;
    }
    let url = resolve_url(domain, src)?;
    let format = format_from_image_src(&url);
    let candidate = Candidate::new(
        url,
        parse_dimension_attr(img, "width"),
        parse_dimension_attr(img, "height"),
        format,
    )
    .with_dom_context(
        img.value().attr("alt").unwrap_or(""),
        img.value().attr("class").unwrap_or(""),
        img.value().attr("id").unwrap_or(""),
        ancestor_classes(img),
    );
    Some(candidate)
}

fn log_candidate(
    log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    source: &str,
    candidate: &Candidate,
) {
    log_line(
        "debug",
        "candidate_found",
        serde_json::json!({
            "source": source,
            "url": candidate.url,
            "width": candidate.width,
            "height": candidate.height,
            "format": candidate.format,
        }),
    );
}
