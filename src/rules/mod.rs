//! Scoring rules.
//!
//! Every rule is a plain function of a [`RuleContext`] registered in a static
//! table next to its stable identifier. Weights live in `weights.txt`, keyed by
//! that identifier, so retuning never touches rule code.

pub mod dimensions;
pub mod format;
pub mod html;

use image::DynamicImage;
use std::fmt;
use url::Url;

/// Everything a rule may look at for one candidate.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Decoded raster, when the scoring fetch produced one.
    pub image: Option<&'a DynamicImage>,
    pub width: u32,
    pub height: u32,
    pub url: &'a str,
    pub format: &'a str,
    pub alt_text: &'a str,
    pub css_classes: &'a str,
    pub element_id: &'a str,
    /// Nearest ancestor first.
    pub parent_classes: &'a [String],
    /// Raw markup when the candidate was served as SVG.
    pub svg_content: Option<&'a str>,
}

impl<'a> RuleContext<'a> {
    pub fn new(url: &'a str) -> Self {
        Self {
            image: None,
            width: 0,
            height: 0,
            url,
            format: "",
            alt_text: "",
            css_classes: "",
            element_id: "",
            parent_classes: &[],
            svg_content: None,
        }
    }

    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Lowercased URL path ("filename" in rule descriptions).
    pub fn filename(&self) -> String {
        match Url::parse(self.url) {
            Ok(parsed) => parsed.path().to_ascii_lowercase(),
            Err(_) => self.url.to_ascii_lowercase(),
        }
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        if !self.has_dimensions() {
            return None;
        }
        let long = self.width.max(self.height) as f64;
        let short = self.width.min(self.height) as f64;
        Some(long / short)
    }
}

/// What a rule reports for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleOutcome {
    /// Rule does not apply; nothing is recorded.
    Skip,
    /// Rule applies fully; contributes its weight.
    Applies,
    /// Rule applies to a degree; contributes `round(weight * value)`. Not clamped.
    Graded(f64),
}

impl RuleOutcome {
    pub fn flag(applies: bool) -> Self {
        if applies {
            RuleOutcome::Applies
        } else {
            RuleOutcome::Skip
        }
    }

    pub fn graded(value: f64) -> Self {
        if value == 0.0 {
            RuleOutcome::Skip
        } else {
            RuleOutcome::Graded(value)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    Dimensions,
    Html,
    Format,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleCategory::Dimensions => "dimensions",
            RuleCategory::Html => "html",
            RuleCategory::Format => "format",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Bonus,
    Penalty,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Polarity::Bonus => "bonus",
            Polarity::Penalty => "penalty",
        })
    }
}

pub type RuleFn = fn(&RuleContext<'_>) -> RuleOutcome;

#[derive(Clone, Copy)]
pub struct Rule {
    /// Stable key into the weight table.
    pub id: &'static str,
    pub category: RuleCategory,
    pub polarity: Polarity,
    pub description: &'static str,
    pub apply: RuleFn,
}

impl Rule {
    pub fn label(&self) -> String {
        format!("{}/{}: {}", self.category, self.polarity, self.description)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("polarity", &self.polarity)
            .finish()
    }
}

/// Every built-in rule, in evaluation order.
pub fn registry() -> Vec<Rule> {
    dimensions::RULES
        .iter()
        .chain(html::RULES.iter())
        .chain(format::RULES.iter())
        .copied()
        .collect()
}

pub(crate) fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lowered = haystack.to_ascii_lowercase();
    needles.iter().any(|needle| lowered.contains(needle))
}
