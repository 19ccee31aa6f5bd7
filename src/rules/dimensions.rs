use super::{Polarity, Rule, RuleCategory, RuleContext, RuleOutcome};

const STANDARD_ICON_SIZES: &[u32] = &[128, 152, 167, 180, 192, 256, 512];
const STANDARD_SIZE_TOLERANCE: u32 = 2;

const SOCIAL_DIMENSIONS: &[(u32, u32)] = &[
    (1200, 630),
    (1200, 628),
    (1024, 512),
    (1200, 675),
    (1080, 1080),
    (1080, 1920),
    (1200, 1200),
];

const BANNER_DIMENSIONS: &[(u32, u32)] = &[
    (728, 90),
    (300, 250),
    (336, 280),
    (320, 50),
    (468, 60),
    (234, 60),
    (120, 600),
    (160, 600),
    (300, 600),
];

const THUMBNAIL_SIZES: &[(u32, u32)] = &[(120, 120), (240, 240), (360, 360)];

pub const RULES: &[Rule] = &[
    Rule {
        id: "apple_touch_icon_sizes",
        category: RuleCategory::Dimensions,
        polarity: Polarity::Bonus,
        description: "Award bonus for Apple Touch Icon and other standard large icon sizes",
        apply: apple_touch_icon_sizes,
    },
    Rule {
        id: "square_aspect_ratio",
        category: RuleCategory::Dimensions,
        polarity: Polarity::Bonus,
        description: "Award bonus for square or near-square images",
        apply: square_aspect_ratio,
    },
    Rule {
        id: "high_resolution",
        category: RuleCategory::Dimensions,
        polarity: Polarity::Bonus,
        description: "Award bonus for images large enough to render crisply",
        apply: high_resolution,
    },
    Rule {
        id: "very_small_images",
        category: RuleCategory::Dimensions,
        polarity: Polarity::Penalty,
        description: "Apply penalty for very small images (likely not useful logos)",
        apply: very_small_images,
    },
    Rule {
        id: "extremely_wide_aspect_ratio",
        category: RuleCategory::Dimensions,
        polarity: Polarity::Penalty,
        description: "Apply penalty for extremely wide or tall images (unlikely to be logos)",
        apply: extremely_wide_aspect_ratio,
    },
    Rule {
        id: "social_media_dimensions",
        category: RuleCategory::Dimensions,
        polarity: Polarity::Penalty,
        description: "Apply penalty for typical social media preview image dimensions",
        apply: social_media_dimensions,
    },
    Rule {
        id: "banner_dimensions",
        category: RuleCategory::Dimensions,
        polarity: Polarity::Penalty,
        description: "Apply penalty for typical banner/advertisement dimensions",
        apply: banner_dimensions,
    },
    Rule {
        id: "odd_dimensions",
        category: RuleCategory::Dimensions,
        polarity: Polarity::Penalty,
        description: "Apply small penalty for unusual/odd dimensions",
        apply: odd_dimensions,
    },
    Rule {
        id: "oversized_images",
        category: RuleCategory::Dimensions,
        polarity: Polarity::Penalty,
        description: "Apply penalty for very large images (photos rather than logos)",
        apply: oversized_images,
    },
];

fn apple_touch_icon_sizes(ctx: &RuleContext<'_>) -> RuleOutcome {
    if !ctx.has_dimensions() {
        return RuleOutcome::Skip;
    }
    if ctx.width == ctx.height && STANDARD_ICON_SIZES.contains(&ctx.width) {
        return RuleOutcome::graded(1.0);
    }
    let near = STANDARD_ICON_SIZES.iter().any(|&side| {
        ctx.width.abs_diff(side) <= STANDARD_SIZE_TOLERANCE
            && ctx.height.abs_diff(side) <= STANDARD_SIZE_TOLERANCE
    });
    if near {
        RuleOutcome::graded(0.8)
    } else {
        RuleOutcome::Skip
    }
}

fn square_aspect_ratio(ctx: &RuleContext<'_>) -> RuleOutcome {
    match ctx.aspect_ratio() {
        Some(ratio) if ratio <= 1.1 => RuleOutcome::graded(1.0),
        Some(ratio) if ratio <= 1.5 => RuleOutcome::graded(0.5),
        _ => RuleOutcome::Skip,
    }
}

fn high_resolution(ctx: &RuleContext<'_>) -> RuleOutcome {
    if !ctx.has_dimensions() {
        return RuleOutcome::Skip;
    }
    let longest = ctx.width.max(ctx.height);
    if longest >= 256 {
        RuleOutcome::graded(1.0)
    } else if longest >= 128 {
        RuleOutcome::graded(0.5)
    } else {
        RuleOutcome::Skip
    }
}

fn very_small_images(ctx: &RuleContext<'_>) -> RuleOutcome {
    if !ctx.has_dimensions() {
        return RuleOutcome::Skip;
    }
    let longest = ctx.width.max(ctx.height);
    if longest < 16 {
        RuleOutcome::graded(1.0)
    } else if longest < 24 {
        RuleOutcome::graded(0.67)
    } else if longest < 32 {
        RuleOutcome::graded(0.33)
    } else {
        RuleOutcome::Skip
    }
}

fn extremely_wide_aspect_ratio(ctx: &RuleContext<'_>) -> RuleOutcome {
    match ctx.aspect_ratio() {
        Some(ratio) if ratio > 8.0 => RuleOutcome::graded(1.0),
        Some(ratio) if ratio > 6.0 => RuleOutcome::graded(0.75),
        Some(ratio) if ratio > 5.0 => RuleOutcome::graded(0.5),
        _ => RuleOutcome::Skip,
    }
}

fn within(value: u32, target: u32, tolerance: f64) -> bool {
    (value as f64 - target as f64).abs() <= tolerance
}

fn social_media_dimensions(ctx: &RuleContext<'_>) -> RuleOutcome {
    let Some(ratio) = ctx.aspect_ratio() else {
        return RuleOutcome::Skip;
    };
    let matched = SOCIAL_DIMENSIONS.iter().any(|&(w, h)| {
        within(ctx.width, w, w as f64 * 0.05) && within(ctx.height, h, h as f64 * 0.05)
    });
    if !matched {
        return RuleOutcome::Skip;
    }
    // Square presets may still be a logo.
    if ratio > 1.5 {
        RuleOutcome::graded(1.0)
    } else {
        RuleOutcome::graded(0.33)
    }
}

fn banner_dimensions(ctx: &RuleContext<'_>) -> RuleOutcome {
    if !ctx.has_dimensions() {
        return RuleOutcome::Skip;
    }
    RuleOutcome::flag(BANNER_DIMENSIONS.iter().any(|&(w, h)| {
        within(ctx.width, w, (w as f64 * 0.1).max(5.0))
            && within(ctx.height, h, (h as f64 * 0.1).max(5.0))
    }))
}

fn is_prime_above_100(n: u32) -> bool {
    if n <= 100 {
        return false;
    }
    let mut i = 2_u32;
    while i.saturating_mul(i) <= n {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

fn odd_dimensions(ctx: &RuleContext<'_>) -> RuleOutcome {
    if !ctx.has_dimensions() {
        return RuleOutcome::Skip;
    }
    let mut penalty = 0.0;
    if is_prime_above_100(ctx.width) || is_prime_above_100(ctx.height) {
        penalty += 0.5;
    }
    if ctx.width == 150 && ctx.height == 150 {
        penalty += 1.0;
    } else if THUMBNAIL_SIZES.contains(&(ctx.width, ctx.height)) {
        penalty += 0.75;
    }
    RuleOutcome::graded(penalty)
}

fn oversized_images(ctx: &RuleContext<'_>) -> RuleOutcome {
    if !ctx.has_dimensions() {
        return RuleOutcome::Skip;
    }
    RuleOutcome::flag(u64::from(ctx.width) * u64::from(ctx.height) > 2048 * 2048)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(width: u32, height: u32) -> RuleContext<'static> {
        RuleContext {
            width,
            height,
            ..RuleContext::new("https://example.com/a.png")
        }
    }

    #[test]
    fn standard_icon_sizes_get_full_or_near_credit() {
        assert_eq!(apple_touch_icon_sizes(&sized(180, 180)), RuleOutcome::Graded(1.0));
        assert_eq!(apple_touch_icon_sizes(&sized(190, 193)), RuleOutcome::Graded(0.8));
        assert_eq!(apple_touch_icon_sizes(&sized(100, 100)), RuleOutcome::Skip);
        assert_eq!(apple_touch_icon_sizes(&sized(0, 0)), RuleOutcome::Skip);
    }

    #[test]
    fn small_images_are_penalized_in_steps() {
        assert_eq!(very_small_images(&sized(10, 10)), RuleOutcome::Graded(1.0));
        assert_eq!(very_small_images(&sized(20, 20)), RuleOutcome::Graded(0.67));
        assert_eq!(very_small_images(&sized(31, 8)), RuleOutcome::Graded(0.33));
        assert_eq!(very_small_images(&sized(64, 64)), RuleOutcome::Skip);
    }

    #[test]
    fn wide_aspect_ratio_is_graded_down_to_five() {
        assert_eq!(extremely_wide_aspect_ratio(&sized(900, 100)), RuleOutcome::Graded(1.0));
        assert_eq!(extremely_wide_aspect_ratio(&sized(100, 700)), RuleOutcome::Graded(0.75));
        assert_eq!(extremely_wide_aspect_ratio(&sized(550, 100)), RuleOutcome::Graded(0.5));
        assert_eq!(extremely_wide_aspect_ratio(&sized(500, 100)), RuleOutcome::Skip);
    }

    #[test]
    fn social_and_banner_presets_match_with_tolerance() {
        assert_eq!(social_media_dimensions(&sized(1200, 630)), RuleOutcome::Graded(1.0));
        assert_eq!(social_media_dimensions(&sized(1100, 1100)), RuleOutcome::Graded(0.33));
        assert_eq!(social_media_dimensions(&sized(512, 512)), RuleOutcome::Skip);
        assert_eq!(banner_dimensions(&sized(728, 90)), RuleOutcome::Applies);
        assert_eq!(banner_dimensions(&sized(300, 255)), RuleOutcome::Applies);
        assert_eq!(banner_dimensions(&sized(512, 512)), RuleOutcome::Skip);
    }

    #[test]
    fn odd_dimensions_flags_primes_and_thumbnail_presets() {
        assert_eq!(odd_dimensions(&sized(101, 64)), RuleOutcome::Graded(0.5));
        assert_eq!(odd_dimensions(&sized(150, 150)), RuleOutcome::Graded(1.0));
        assert_eq!(odd_dimensions(&sized(240, 240)), RuleOutcome::Graded(0.75));
        assert_eq!(odd_dimensions(&sized(97, 97)), RuleOutcome::Skip);
        assert_eq!(odd_dimensions(&sized(192, 192)), RuleOutcome::Skip);
    }

    #[test]
    fn square_and_resolution_bonuses() {
        assert_eq!(square_aspect_ratio(&sized(200, 200)), RuleOutcome::Graded(1.0));
        assert_eq!(square_aspect_ratio(&sized(300, 200)), RuleOutcome::Graded(0.5));
        assert_eq!(square_aspect_ratio(&sized(600, 100)), RuleOutcome::Skip);
        assert_eq!(high_resolution(&sized(512, 512)), RuleOutcome::Graded(1.0));
        assert_eq!(high_resolution(&sized(128, 64)), RuleOutcome::Graded(0.5));
        assert_eq!(high_resolution(&sized(64, 64)), RuleOutcome::Skip);
        assert_eq!(oversized_images(&sized(4000, 3000)), RuleOutcome::Applies);
        assert_eq!(oversized_images(&sized(2048, 2048)), RuleOutcome::Skip);
    }
}
