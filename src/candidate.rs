use serde::{Deserialize, Serialize};
use url::Url;

const SNIFFABLE_FORMATS: &[&str] = &["svg", "png", "jpg", "jpeg", "webp", "gif"];

/// One signed rule contribution recorded on a scored candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleContribution {
    pub label: String,
    pub points: i64,
}

/// One discovered image reference plus the HTML context it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Absolute URL; the deduplication key.
    pub url: String,
    /// 0 when unknown.
    pub width: u32,
    /// 0 when unknown.
    pub height: u32,
    /// Lowercase extension, may be empty.
    pub format: String,
    pub alt_text: String,
    pub css_classes: String,
    pub element_id: String,
    /// Ancestor `class` attributes, nearest ancestor first.
    pub parent_classes: Vec<String>,
    pub score: i64,
    pub rule_details: Vec<RuleContribution>,
}

impl Candidate {
    pub fn new(url: impl Into<String>, width: u32, height: u32, format: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width,
            height,
            format: format.into(),
            alt_text: String::new(),
            css_classes: String::new(),
            element_id: String::new(),
            parent_classes: Vec::new(),
            score: 0,
            rule_details: Vec::new(),
        }
    }

    pub fn with_dom_context(
        mut self,
        alt_text: impl Into<String>,
        css_classes: impl Into<String>,
        element_id: impl Into<String>,
        parent_classes: Vec<String>,
    ) -> Self {
        self.alt_text = alt_text.into();
        self.css_classes = css_classes.into();
        self.element_id = element_id.into();
        self.parent_classes = parent_classes;
        self
    }

    /// Returns the scored copy; the unscored value is consumed, never mutated in place.
    pub fn scored(
        self,
        width: u32,
        height: u32,
        format: String,
        score: i64,
        rule_details: Vec<RuleContribution>,
    ) -> Self {
        Self {
            width,
            height,
            format,
            score,
            rule_details,
            ..self
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.url.is_empty()
            && Url::parse(&self.url)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false)
    }

    /// Number of populated context fields, used by the richest-context dedup policy.
    pub fn context_richness(&self) -> usize {
        [
            self.width > 0,
            self.height > 0,
            !self.format.is_empty(),
            !self.alt_text.is_empty(),
            !self.css_classes.is_empty(),
            !self.element_id.is_empty(),
            !self.parent_classes.is_empty(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// Resolves an attribute value against `https://{domain}`.
///
/// `//host/x` gets an `https:` prefix, anything not starting with `http` is
/// joined onto the domain root, and everything else is used as-is.
pub fn resolve_url(domain: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if raw.starts_with("http") {
        return Some(raw.to_string());
    }
    let base = Url::parse(&format!("https://{domain}")).ok()?;
    base.join(raw).ok().map(|joined| joined.to_string())
}

pub fn is_data_uri(raw: &str) -> bool {
    raw.trim_start().starts_with("data:")
}

/// Lowercase extension of the last path segment, or empty.
pub fn format_from_url(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or("").to_string(),
    };
    let segment = path.rsplit('/').next().unwrap_or("");
    match segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Like [`format_from_url`] but falls back to format names appearing anywhere in the URL.
pub fn format_from_image_src(url: &str) -> String {
    let from_path = format_from_url(url);
    if !from_path.is_empty() {
        return from_path;
    }
    let lower = url.to_ascii_lowercase();
    SNIFFABLE_FORMATS
        .iter()
        .find(|fmt| lower.contains(*fmt))
        .map(|fmt| fmt.to_string())
        .unwrap_or_default()
}

/// Maps a `Content-Type` header to a format extension.
pub fn format_from_content_type(content_type: &str) -> String {
    let ct = content_type.to_ascii_lowercase();
    let format = if ct.contains("svg") {
        "svg"
    } else if ct.contains("png") {
        "png"
    } else if ct.contains("jpeg") || ct.contains("jpg") {
        "jpg"
    } else if ct.contains("webp") {
        "webp"
    } else if ct.contains("gif") {
        "gif"
    } else if ct.contains("icon") {
        "ico"
    } else if ct.contains("bmp") {
        "bmp"
    } else {
        ""
    };
    format.to_string()
}
