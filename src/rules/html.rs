use super::{contains_any, Polarity, Rule, RuleCategory, RuleContext, RuleOutcome};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const BRAND_KEYWORDS: &[&str] = &["brand", "icon", "header-logo", "site-logo", "company-logo"];
const PARENT_LOGO_PATTERNS: &[&str] = &["logo", "brand", "header", "navbar", "nav", "masthead", "banner"];
const SOCIAL_KEYWORDS: &[&str] = &["og:image", "twitter:image", "social", "share", "preview"];
const GENERIC_NAMES: &[&str] = &["pic", "photo", "picture", "default", "placeholder"];
const CONTENT_PATTERNS: &[&str] = &["content", "article", "post", "blog", "main", "body", "text"];
const AD_PATTERNS: &[&str] = &["advertisement", "banner", "promo", "sponsor", "affiliate"];
const TRACKING_PATTERNS: &[&str] = &["pixel", "spacer", "tracking", "beacon", "1x1"];
const IGNORED_SVG_COLORS: &[&str] = &["none", "transparent", "inherit", "currentcolor"];

pub const RULES: &[Rule] = &[
    Rule {
        id: "logo_in_filename",
        category: RuleCategory::Html,
        polarity: Polarity::Bonus,
        description: "Award bonus for 'logo' keyword in filename",
        apply: logo_in_filename,
    },
    Rule {
        id: "logo_in_alt_text",
        category: RuleCategory::Html,
        polarity: Polarity::Bonus,
        description: "Award bonus for 'logo' keyword in alt text",
        apply: logo_in_alt_text,
    },
    Rule {
        id: "logo_in_css_classes",
        category: RuleCategory::Html,
        polarity: Polarity::Bonus,
        description: "Award bonus for 'logo' keyword in CSS classes",
        apply: logo_in_css_classes,
    },
    Rule {
        id: "logo_in_element_id",
        category: RuleCategory::Html,
        polarity: Polarity::Bonus,
        description: "Award bonus for 'logo' keyword in element ID",
        apply: logo_in_element_id,
    },
    Rule {
        id: "brand_keywords",
        category: RuleCategory::Html,
        polarity: Polarity::Bonus,
        description: "Award bonus for brand-related keywords in attributes",
        apply: brand_keywords,
    },
    Rule {
        id: "parent_logo_context",
        category: RuleCategory::Html,
        polarity: Polarity::Bonus,
        description: "Award bonus for logo-related classes in parent elements",
        apply: parent_logo_context,
    },
    Rule {
        id: "header_proximity",
        category: RuleCategory::Html,
        polarity: Polarity::Bonus,
        description: "Award bonus for images near top of DOM hierarchy",
        apply: header_proximity,
    },
    Rule {
        id: "social_media_context",
        category: RuleCategory::Html,
        polarity: Polarity::Penalty,
        description: "Apply penalty for social media preview images",
        apply: social_media_context,
    },
    Rule {
        id: "generic_image_names",
        category: RuleCategory::Html,
        polarity: Polarity::Penalty,
        description: "Apply penalty for generic image filenames",
        apply: generic_image_names,
    },
    Rule {
        id: "deep_dom_nesting",
        category: RuleCategory::Html,
        polarity: Polarity::Penalty,
        description: "Apply penalty for images deeply nested in DOM",
        apply: deep_dom_nesting,
    },
    Rule {
        id: "content_area_context",
        category: RuleCategory::Html,
        polarity: Polarity::Penalty,
        description: "Apply penalty for images in content areas",
        apply: content_area_context,
    },
    Rule {
        id: "advertisement_context",
        category: RuleCategory::Html,
        polarity: Polarity::Penalty,
        description: "Apply penalty for advertisement-related images",
        apply: advertisement_context,
    },
    Rule {
        id: "tracking_pixel_context",
        category: RuleCategory::Html,
        polarity: Polarity::Penalty,
        description: "Apply penalty for tracking pixels and spacer images",
        apply: tracking_pixel_context,
    },
    Rule {
        id: "single_color_svg",
        category: RuleCategory::Html,
        polarity: Polarity::Penalty,
        description: "Apply penalty for SVG images that only use a single color (especially white/black)",
        apply: single_color_svg,
    },
];

fn logo_in_filename(ctx: &RuleContext<'_>) -> RuleOutcome {
    RuleOutcome::flag(ctx.filename().contains("logo"))
}

fn logo_in_alt_text(ctx: &RuleContext<'_>) -> RuleOutcome {
    RuleOutcome::flag(contains_any(ctx.alt_text, &["logo"]))
}

fn logo_in_css_classes(ctx: &RuleContext<'_>) -> RuleOutcome {
    RuleOutcome::flag(contains_any(ctx.css_classes, &["logo"]))
}

fn logo_in_element_id(ctx: &RuleContext<'_>) -> RuleOutcome {
    RuleOutcome::flag(contains_any(ctx.element_id, &["logo"]))
}

/// One point per attribute carrying a brand keyword; several matches compound.
fn brand_keywords(ctx: &RuleContext<'_>) -> RuleOutcome {
    let filename = ctx.filename();
    let matches = [
        filename.as_str(),
        ctx.alt_text,
        ctx.css_classes,
        ctx.element_id,
    ]
    .iter()
    .filter(|value| contains_any(value, BRAND_KEYWORDS))
    .count();
    RuleOutcome::graded(matches as f64)
}

fn any_parent_matches(ctx: &RuleContext<'_>, patterns: &[&str]) -> bool {
    ctx.parent_classes
        .iter()
        .any(|classes| !classes.is_empty() && contains_any(classes, patterns))
}

fn parent_logo_context(ctx: &RuleContext<'_>) -> RuleOutcome {
    RuleOutcome::flag(any_parent_matches(ctx, PARENT_LOGO_PATTERNS))
}

fn header_proximity(ctx: &RuleContext<'_>) -> RuleOutcome {
    match ctx.parent_classes.len() {
        0..=3 => RuleOutcome::graded(1.0),
        4..=5 => RuleOutcome::graded(0.67),
        6..=8 => RuleOutcome::graded(0.33),
        _ => RuleOutcome::Skip,
    }
}

fn social_media_context(ctx: &RuleContext<'_>) -> RuleOutcome {
    let filename = ctx.filename();
    RuleOutcome::flag(
        [filename.as_str(), ctx.alt_text, ctx.css_classes]
            .iter()
            .any(|value| contains_any(value, SOCIAL_KEYWORDS)),
    )
}

fn generic_image_names(ctx: &RuleContext<'_>) -> RuleOutcome {
    RuleOutcome::flag(contains_any(&ctx.filename(), GENERIC_NAMES))
}

fn deep_dom_nesting(ctx: &RuleContext<'_>) -> RuleOutcome {
    let depth = ctx.parent_classes.len();
    if depth > 15 {
        RuleOutcome::graded(1.0)
    } else if depth > 12 {
        RuleOutcome::graded(0.5)
    } else if depth > 10 {
        RuleOutcome::graded(0.25)
    } else {
        RuleOutcome::Skip
    }
}

fn content_area_context(ctx: &RuleContext<'_>) -> RuleOutcome {
    RuleOutcome::flag(any_parent_matches(ctx, CONTENT_PATTERNS))
}

fn advertisement_context(ctx: &RuleContext<'_>) -> RuleOutcome {
    let filename = ctx.filename();
    let direct = [filename.as_str(), ctx.alt_text, ctx.css_classes]
        .iter()
        .any(|value| contains_any(value, AD_PATTERNS));
    RuleOutcome::flag(direct || any_parent_matches(ctx, AD_PATTERNS))
}

fn tracking_pixel_context(ctx: &RuleContext<'_>) -> RuleOutcome {
    let filename = ctx.filename();
    let keyword = [filename.as_str(), ctx.css_classes, ctx.element_id]
        .iter()
        .any(|value| contains_any(value, TRACKING_PATTERNS));
    let one_pixel = ctx.width == 1 && ctx.height == 1;
    RuleOutcome::flag(keyword || one_pixel)
}

fn svg_color_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r#"(?i)fill\s*:\s*([^;}\s"'<>]+)"#,
            r#"(?i)fill\s*=\s*"([^"]+)""#,
            r#"(?i)stroke\s*:\s*([^;}\s"'<>]+)"#,
            r#"(?i)stroke\s*=\s*"([^"]+)""#,
            r#"(?i)color\s*:\s*([^;}\s"'<>]+)"#,
            r#"(?i)stop-color\s*:\s*([^;}\s"'<>]+)"#,
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("svg color regex"))
        .collect()
    })
}

/// Distinct normalized colors declared in SVG markup, excluding `none`-like values.
pub fn svg_palette(svg: &str) -> HashSet<String> {
    let mut palette = HashSet::new();
    for pattern in svg_color_patterns() {
        for caps in pattern.captures_iter(svg) {
            let Some(raw) = caps.get(1) else {
                continue;
            };
            let color = raw.as_str().trim().to_ascii_lowercase();
            if color.is_empty() || IGNORED_SVG_COLORS.contains(&color.as_str()) {
                continue;
            }
            let normalized = match color.as_str() {
                "#fff" | "#ffffff" | "white" => "white".to_string(),
                "#000" | "#000000" | "black" => "black".to_string(),
                _ => color,
            };
            palette.insert(normalized);
        }
    }
    palette
}

fn single_color_svg(ctx: &RuleContext<'_>) -> RuleOutcome {
    let is_svg = ctx.format == "svg" || ctx.url.to_ascii_lowercase().contains("svg");
    if !is_svg {
        return RuleOutcome::Skip;
    }
    let Some(svg) = ctx.svg_content.filter(|s| !s.is_empty()) else {
        return RuleOutcome::Skip;
    };
    let palette = svg_palette(svg);
    if palette.len() > 1 {
        return RuleOutcome::Skip;
    }
    // White-only marks vanish on light backgrounds.
    if palette.contains("white") {
        RuleOutcome::graded(1.0)
    } else {
        RuleOutcome::graded(0.75)
    }
}
