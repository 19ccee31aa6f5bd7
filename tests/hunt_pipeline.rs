use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use logohunt::config::{HunterConfig, SelectionPolicy};
use logohunt::http::{FetchResponse, Fetcher};
use logohunt::log::discard;
use logohunt::{HunterError, LogoHunter, LogoImage, OutputFormat, Result, ScoringEngine};
use sha2::{Digest, Sha256};

const ROOT: &str = "https://example.com";

#[derive(Default)]
struct ScriptedFetcher {
    get: HashMap<String, FetchResponse>,
    head_ok: HashSet<String>,
    redirects: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn page(self, url: &str, html: &str) -> Self {
        self.asset(url, "text/html; charset=utf-8", html.as_bytes().to_vec())
    }

    fn asset(mut self, url: &str, content_type: &str, body: Vec<u8>) -> Self {
        self.get.insert(
            url.to_string(),
            FetchResponse {
                status: 200,
                final_url: url.to_string(),
                content_type: content_type.to_string(),
                body,
            },
        );
        self
    }

    fn head_ok(mut self, url: &str) -> Self {
        self.head_ok.insert(url.to_string());
        self
    }

    fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Fetcher for ScriptedFetcher {
    fn get(&self, url: &str) -> Result<FetchResponse> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(format!("GET {url}"));
        }
        match self.get.get(url) {
            Some(resp) => Ok(resp.clone()),
            None => Ok(FetchResponse {
                status: 404,
                final_url: url.to_string(),
                content_type: "text/html".to_string(),
                body: b"not found".to_vec(),
            }),
        }
    }

    fn head(&self, url: &str) -> Result<FetchResponse> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(format!("HEAD {url}"));
        }
        if let Some(target) = self.redirects.get(url) {
            return Ok(FetchResponse {
                status: 200,
                final_url: target.clone(),
                content_type: String::new(),
                body: Vec::new(),
            });
        }
        let status = if self.head_ok.contains(url) || self.get.contains_key(url) {
            200
        } else {
            404
        };
        Ok(FetchResponse {
            status,
            final_url: url.to_string(),
            content_type: String::new(),
            body: Vec::new(),
        })
    }
}

fn hunter(fetcher: ScriptedFetcher, config: HunterConfig) -> LogoHunter<ScriptedFetcher> {
    LogoHunter::new(fetcher, Arc::new(ScoringEngine::bundled()), config)
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([20, 40, 200, 255])));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("encode png");
    out
}

const SVG_LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><rect fill="#ff0000" width="5" height="10"/><rect fill="#0000ff" x="5" width="5" height="10"/></svg>"##;

#[test]
fn discovers_icons_as_absolute_urls() {
    let html = r#"
    <html><head>
      <link rel="icon" href="/favicon.ico" sizes="16x16">
      <meta property="og:image" content="/logo-large.png">
      <link rel="apple-touch-icon" href="/apple-touch-icon.png">
    </head><body><p>Hello</p></body></html>
    "#;
    let fetcher = ScriptedFetcher::default()
        .page(ROOT, html)
        .head_ok("https://example.com/apple-touch-icon.png");
    let hunter = hunter(fetcher, HunterConfig::default());

    let mut urls = hunter.find_logo_urls("example.com", &mut discard);
    urls.sort();
    assert_eq!(
        urls,
        vec![
            "https://example.com/apple-touch-icon.png".to_string(),
            "https://example.com/favicon.ico".to_string(),
            "https://example.com/logo-large.png".to_string(),
        ]
    );
}

#[test]
fn header_svg_logo_outranks_social_share_image() {
    let html = r#"
    <html><head>
      <meta property="og:image" content="/social/share-1200x630.png">
    </head><body>
      <header class="site-header">
        <a href="/"><img src="/img/logo.svg" class="site-logo" alt="Acme logo"></a>
      </header>
      <main class="content"><img src="/img/team.jpg" alt="Our team"></main>
    </body></html>
    "#;
    let fetcher = ScriptedFetcher::default()
        .page(ROOT, html)
        .asset("https://example.com/img/logo.svg", "image/svg+xml", SVG_LOGO.as_bytes().to_vec());
    let hunter = hunter(fetcher, HunterConfig::default());

    let ranked = hunter.find_logo_candidates("example.com", &mut discard);
    assert_eq!(ranked[0].url, "https://example.com/img/logo.svg");
    assert!(ranked[0].score > 0);
    assert!(ranked[0]
        .rule_details
        .iter()
        .any(|d| d.label.starts_with("format/bonus")));
    let share = ranked
        .iter()
        .find(|c| c.url.ends_with("share-1200x630.png"))
        .expect("og image candidate");
    assert!(share.score < ranked[0].score);
    assert!(!ranked.iter().any(|c| c.url.ends_with("team.jpg")));

    let scores: Vec<i64> = ranked.iter().map(|c| c.score).collect();
    let mut sorted = scores.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(scores, sorted);
}

#[test]
fn scoring_fetch_measures_raster_dimensions() {
    let html = r#"<html><body><div class="brand"><img src="/brand.png"></div></body></html>"#;
    let fetcher = ScriptedFetcher::default()
        .page(ROOT, html)
        .asset("https://example.com/brand.png", "image/png", png_bytes(192, 192));
    let hunter = hunter(fetcher, HunterConfig::default());

    let ranked = hunter.find_logo_candidates("example.com", &mut discard);
    let brand = ranked
        .iter()
        .find(|c| c.url == "https://example.com/brand.png")
        .expect("brand candidate");
    assert_eq!((brand.width, brand.height), (192, 192));
}

#[test]
fn duplicate_urls_collapse_to_one_candidate() {
    let html = r#"
    <html><head>
      <link rel="icon" href="/logo.png">
      <link rel="shortcut icon" href="https://example.com/logo.png">
    </head><body>
      <div id="logo"><img src="/logo.png" alt="Acme"></div>
    </body></html>
    "#;
    let fetcher = ScriptedFetcher::default().page(ROOT, html);
    let hunter = hunter(fetcher, HunterConfig::default());

    let ranked = hunter.find_logo_candidates("example.com", &mut discard);
    let hits: Vec<_> = ranked
        .iter()
        .filter(|c| c.url == "https://example.com/logo.png")
        .collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].alt_text, "Acme");
}

#[test]
fn unreachable_homepage_still_probes_fallbacks() {
    let fetcher = ScriptedFetcher::default().head_ok("https://example.com/favicon.svg");
    let hunter = hunter(fetcher, HunterConfig::default());

    let mut events: Vec<String> = Vec::new();
    let urls = hunter.find_logo_urls("example.com", &mut |_, event, _| events.push(event.to_string()));
    assert_eq!(urls, vec!["https://example.com/favicon.svg".to_string()]);
    assert!(events.iter().any(|e| e == "homepage_fetch_failed"));
    assert!(events.iter().any(|e| e == "candidates_ranked"));
}

#[test]
fn fallback_path_keeps_redirect_target() {
    let fetcher = ScriptedFetcher::default()
        .page(ROOT, "<html><body></body></html>")
        .redirect(
            "https://example.com/favicon.svg",
            "https://cdn.example.net/brand/favicon.svg",
        );
    let hunter = hunter(fetcher, HunterConfig::default());

    let urls = hunter.find_logo_urls("example.com", &mut discard);
    assert_eq!(urls, vec!["https://cdn.example.net/brand/favicon.svg".to_string()]);
}

#[test]
fn undeclared_svg_scores_as_100_square_but_keeps_zero_size() {
    let html = r#"<html><body><div class="logo"><img src="/img/mark.svg"></div></body></html>"#;
    let fetcher = ScriptedFetcher::default()
        .page(ROOT, html)
        .asset("https://example.com/img/mark.svg", "image/svg+xml", SVG_LOGO.as_bytes().to_vec());
    let hunter = hunter(fetcher, HunterConfig::default());

    let ranked = hunter.find_logo_candidates("example.com", &mut discard);
    let mark = ranked
        .iter()
        .find(|c| c.url == "https://example.com/img/mark.svg")
        .expect("svg candidate");
    assert_eq!((mark.width, mark.height), (0, 0));
    assert!(mark
        .rule_details
        .iter()
        .any(|d| d.label.contains("square or near-square")));
    assert!(!mark
        .rule_details
        .iter()
        .any(|d| d.label.contains("very small images")));
}

#[test]
fn undecodable_raster_keeps_declared_dimensions() {
    let html = r#"<html><body>
      <div class="logo"><img src="/img/broken.png" width="120" height="60"></div>
    </body></html>"#;
    let fetcher = ScriptedFetcher::default()
        .page(ROOT, html)
        .asset("https://example.com/img/broken.png", "image/png", b"not a png".to_vec());
    let hunter = hunter(fetcher, HunterConfig::default());

    let mut events: Vec<String> = Vec::new();
    let ranked = hunter.find_logo_candidates("example.com", &mut |_, event, _| {
        events.push(event.to_string())
    });
    let broken = ranked
        .iter()
        .find(|c| c.url == "https://example.com/img/broken.png")
        .expect("raster candidate");
    assert_eq!((broken.width, broken.height), (120, 60));
    assert!(events.iter().any(|e| e == "scoring_decode_failed"));
}

#[test]
fn nothing_found_yields_empty_ranking() {
    let fetcher = ScriptedFetcher::default().page(ROOT, "<html><body>nothing here</body></html>");
    let hunter = hunter(fetcher, HunterConfig::default());
    assert!(hunter.find_logo_urls("example.com", &mut discard).is_empty());
    assert_eq!(
        hunter
            .get_customer_logo("example.com", OutputFormat::Png, None, &mut discard)
            .expect("no error"),
        None
    );
}

#[test]
fn first_reachable_skips_failures_and_wrong_types() {
    let good = png_bytes(64, 64);
    let fetcher = ScriptedFetcher::default()
        .page("https://example.com/page.png", "<html></html>")
        .asset("https://example.com/good.png", "image/png", good.clone());
    let hunter = hunter(fetcher, HunterConfig::default());

    let urls = vec![
        "https://example.com/missing.png".to_string(),
        "https://example.com/page.png".to_string(),
        "https://example.com/good.png".to_string(),
    ];
    let logo = hunter.fetch_best_logo(&urls, &mut discard).expect("logo");
    assert_eq!(logo.url, "https://example.com/good.png");
    assert_eq!(logo.image.dimensions(), Some((64, 64)));
    assert_eq!(logo.sha256, hex::encode(Sha256::digest(&good)));
}

#[test]
fn concurrent_window_still_prefers_rank_order() {
    let fetcher = ScriptedFetcher::default()
        .asset("https://example.com/a.png", "image/png", png_bytes(32, 32))
        .asset("https://example.com/b.png", "image/png", png_bytes(256, 256))
        .asset("https://example.com/c.svg", "image/svg+xml", SVG_LOGO.as_bytes().to_vec());
    let config = HunterConfig {
        max_concurrent_fetches: 3,
        ..HunterConfig::default()
    };
    let hunter = hunter(fetcher, config);

    let urls = vec![
        "https://example.com/a.png".to_string(),
        "https://example.com/b.png".to_string(),
        "https://example.com/c.svg".to_string(),
    ];
    let logo = hunter.fetch_best_logo(&urls, &mut discard).expect("logo");
    assert_eq!(logo.url, "https://example.com/a.png");
}

#[test]
fn largest_of_top_prefers_vector_then_area() {
    let build = |k: usize| {
        let fetcher = ScriptedFetcher::default()
            .asset("https://example.com/a.png", "image/png", png_bytes(32, 32))
            .asset("https://example.com/b.png", "image/png", png_bytes(256, 256))
            .asset("https://example.com/wide.png", "image/png", png_bytes(600, 100))
            .asset("https://example.com/c.svg", "image/svg+xml", SVG_LOGO.as_bytes().to_vec());
        let config = HunterConfig {
            selection_policy: SelectionPolicy::LargestOfTop { k },
            ..HunterConfig::default()
        };
        hunter(fetcher, config)
    };
    let urls = vec![
        "https://example.com/a.png".to_string(),
        "https://example.com/wide.png".to_string(),
        "https://example.com/b.png".to_string(),
        "https://example.com/c.svg".to_string(),
    ];

    let logo = build(3).fetch_best_logo(&urls, &mut discard).expect("logo");
    assert_eq!(logo.url, "https://example.com/b.png");

    let logo = build(4).fetch_best_logo(&urls, &mut discard).expect("logo");
    assert!(matches!(logo.image, LogoImage::Svg(_)));
}

#[test]
fn customer_logo_is_resized_and_encoded() {
    let html = r#"<html><head>
      <link rel="apple-touch-icon" href="/apple-touch-icon.png" sizes="180x180">
    </head></html>"#;
    let fetcher = ScriptedFetcher::default()
        .page(ROOT, html)
        .asset("https://example.com/apple-touch-icon.png", "image/png", png_bytes(180, 180));
    let hunter = hunter(fetcher, HunterConfig::default());

    let bytes = hunter
        .get_customer_logo("https://Example.com/", OutputFormat::Jpeg, Some((50, 50)), &mut discard)
        .expect("pipeline")
        .expect("logo bytes");
    let decoded = image::load_from_memory(&bytes).expect("decode");
    assert_eq!(decoded.dimensions(), (50, 50));
    assert!(!decoded.color().has_alpha());
}

#[test]
fn large_icon_encodes_as_ico_without_resize() {
    let html = r#"<html><head>
      <link rel="apple-touch-icon" href="/apple-touch-icon.png" sizes="512x512">
    </head></html>"#;
    let fetcher = ScriptedFetcher::default()
        .page(ROOT, html)
        .asset("https://example.com/apple-touch-icon.png", "image/png", png_bytes(512, 512));
    let hunter = hunter(fetcher, HunterConfig::default());

    let bytes = hunter
        .get_customer_logo("example.com", OutputFormat::Ico, None, &mut discard)
        .expect("pipeline")
        .expect("logo bytes");
    let decoded = image::load_from_memory(&bytes).expect("decode");
    assert_eq!(decoded.dimensions(), (256, 256));
}

#[test]
fn svg_winner_bypasses_raster_encoding() {
    let html = r#"<html><head><link rel="icon" type="image/svg+xml" href="/favicon.svg"></head></html>"#;
    let fetcher = ScriptedFetcher::default()
        .page(ROOT, html)
        .asset("https://example.com/favicon.svg", "image/svg+xml", SVG_LOGO.as_bytes().to_vec());
    let hunter = hunter(fetcher, HunterConfig::default());

    let bytes = hunter
        .get_customer_logo("example.com", OutputFormat::Png, Some((32, 32)), &mut discard)
        .expect("pipeline")
        .expect("logo bytes");
    assert_eq!(bytes, SVG_LOGO.as_bytes());
}

#[test]
fn invalid_domain_is_an_error() {
    let fetcher = ScriptedFetcher::default();
    let hunter = LogoHunter::new(
        &fetcher,
        Arc::new(ScoringEngine::bundled()),
        HunterConfig::default(),
    );
    let err = hunter
        .get_customer_logo("   ", OutputFormat::Png, None, &mut discard)
        .expect_err("blank domain");
    assert!(matches!(err, HunterError::InvalidDomain(_)));
    assert!(fetcher.requested().is_empty());
}
