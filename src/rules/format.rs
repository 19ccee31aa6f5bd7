use super::{Polarity, Rule, RuleCategory, RuleContext, RuleOutcome};

pub const RULES: &[Rule] = &[
    Rule {
        id: "vector_format",
        category: RuleCategory::Format,
        polarity: Polarity::Bonus,
        description: "Award bonus for vector images that scale to any size",
        apply: vector_format,
    },
    Rule {
        id: "legacy_ico_format",
        category: RuleCategory::Format,
        polarity: Polarity::Penalty,
        description: "Apply penalty for legacy .ico favicons",
        apply: legacy_ico_format,
    },
];

fn vector_format(ctx: &RuleContext<'_>) -> RuleOutcome {
    RuleOutcome::flag(ctx.format == "svg" || ctx.svg_content.is_some_and(|s| !s.is_empty()))
}

fn legacy_ico_format(ctx: &RuleContext<'_>) -> RuleOutcome {
    RuleOutcome::flag(ctx.format == "ico" || ctx.filename().ends_with(".ico"))
}
