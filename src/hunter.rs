use crate::candidate::{format_from_content_type, Candidate};
use crate::config::{DedupPolicy, HunterConfig, SelectionPolicy};
use crate::extract;
use crate::http::{FetchResponse, Fetcher, HttpFetcher};
use crate::log::redact_url_for_log;
use crate::output::{process_image, LogoImage, OutputFormat};
use crate::rules::RuleContext;
use crate::scoring::ScoringEngine;
use crate::weights::WeightTable;
use crate::{HunterError, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Content types accepted when materializing the winning logo.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/svg+xml",
    "image/webp",
    "image/x-icon",
    "image/vnd.microsoft.icon",
    "image/jpeg",
    "image/jpg",
    "image/gif",
];

const SVG_SCORING_SIZE: u32 = 100;
const MIN_LOGO_SIDE: u32 = 16;
const MAX_ASPECT_RATIO: f64 = 2.0;
const MAX_RASTER_SIDE: u64 = 2048;

#[derive(Debug, Clone)]
pub struct FetchedLogo {
    /// Final URL after redirects.
    pub url: String,
    pub content_type: String,
    pub image: LogoImage,
    /// Hex SHA-256 of the downloaded bytes.
    pub sha256: String,
    pub byte_len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    AspectRatio(f64),
    TooSmall { width: u32, height: u32 },
    TooLarge { width: u32, height: u32 },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AspectRatio(ratio) => write!(f, "aspect ratio {ratio:.2} is too wide"),
            Self::TooSmall { width, height } => write!(f, "{width}x{height} is too small"),
            Self::TooLarge { width, height } => write!(f, "{width}x{height} is too large"),
        }
    }
}

enum Attempt {
    Accepted(FetchedLogo),
    Rejected { content_type: String },
    Failed { error: String },
}

/// Finds, scores, ranks, and fetches logos for a domain.
pub struct LogoHunter<F: Fetcher> {
    fetcher: F,
    engine: Arc<ScoringEngine>,
    config: HunterConfig,
}

impl LogoHunter<HttpFetcher> {
    /// Real HTTP client plus the weight table named by the config (bundled when unset).
    pub fn from_config(config: HunterConfig) -> Result<Self> {
        let weights = match config.weights_path.as_deref() {
            Some(path) => WeightTable::load(Path::new(path))?,
            None => WeightTable::bundled(),
        };
        let fetcher = HttpFetcher::new(&config);
        Ok(Self::new(
            fetcher,
            Arc::new(ScoringEngine::new(&weights)),
            config,
        ))
    }
}

impl<F: Fetcher> LogoHunter<F> {
    pub fn new(fetcher: F, engine: Arc<ScoringEngine>, config: HunterConfig) -> Self {
        Self {
            fetcher,
            engine,
            config,
        }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn config(&self) -> &HunterConfig {
        &self.config
    }

    /// Raw discovery output: HTML sources then fallback probes, before dedup.
    pub fn discover_candidates(
        &self,
        domain: &str,
        log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    ) -> Vec<Candidate> {
        let root = format!("https://{domain}");
        let mut out = match self
            .fetcher
            .get(&root)
            .and_then(|resp| resp.error_for_status(&root))
        {
            Ok(resp) => extract::extract_html_candidates(domain, &resp.text(), &self.fetcher, log_line),
            Err(err) => {
                log_line(
                    "warn",
                    "homepage_fetch_failed",
                    serde_json::json!({ "url": root, "error": err.to_string() }),
                );
                Vec::new()
            }
        };
        out.extend(extract::fallback_candidates(domain, &self.fetcher, log_line));
        out
    }

    /// Discovered, deduplicated, scored, and ranked best first.
    pub fn find_logo_candidates(
        &self,
        domain: &str,
        log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    ) -> Vec<Candidate> {
        log_line("info", "hunt_started", serde_json::json!({ "domain": domain }));

        let discovered = self.discover_candidates(domain, log_line);
        let discovered_count = discovered.len();
        let valid: Vec<Candidate> = discovered
            .into_iter()
            .filter(|candidate| {
                let ok = candidate.is_valid();
                if !ok {
                    log_line(
                        "debug",
                        "candidate_invalid",
                        serde_json::json!({ "url": candidate.url }),
                    );
                }
                ok
            })
            .collect();
        let unique = dedup_candidates(valid, self.config.dedup_policy);
        log_line(
            "info",
            "candidates_extracted",
            serde_json::json!({
                "domain": domain,
                "discovered": discovered_count,
                "unique": unique.len(),
            }),
        );

        let scored: Vec<Candidate> = unique
            .into_iter()
            .map(|candidate| self.score_candidate(candidate, log_line))
            .collect();
        let ranked = rank_candidates(scored);

        log_line(
            "info",
            "candidates_ranked",
            serde_json::json!({
                "domain": domain,
                "ranking": ranked
                    .iter()
                    .map(|c| serde_json::json!({
                        "url": redact_url_for_log(&c.url),
                        "score": c.score,
                    }))
                    .collect::<Vec<_>>(),
            }),
        );
        ranked
    }

    pub fn find_logo_urls(
        &self,
        domain: &str,
        log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    ) -> Vec<String> {
        self.find_logo_candidates(domain, log_line)
            .into_iter()
            .map(|candidate| candidate.url)
            .collect()
    }

    /// Fetches the image to enrich its context, then applies every rule.
    /// Fetch or decode failures fall back to the HTML-only context.
    pub fn score_candidate(
        &self,
        candidate: Candidate,
        log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    ) -> Candidate {
        let fetched = self
            .fetcher
            .get(&candidate.url)
            .and_then(|resp| resp.error_for_status(&candidate.url));
        let response = match fetched {
            Ok(resp) => Some(resp),
            Err(err) => {
                log_line(
                    "debug",
                    "scoring_fetch_failed",
                    serde_json::json!({
                        "url": redact_url_for_log(&candidate.url),
                        "error": err.to_string(),
                    }),
                );
                None
            }
        };

        let format = match (&response, candidate.format.is_empty()) {
            (Some(resp), true) => format_from_content_type(&resp.content_type),
            _ => candidate.format.clone(),
        };

        let mut svg_text: Option<String> = None;
        let mut raster: Option<image::DynamicImage> = None;
        if let Some(resp) = response {
            if resp.content_type.to_ascii_lowercase().contains("svg") {
                match String::from_utf8(resp.body) {
                    Ok(text) => svg_text = Some(text),
                    Err(err) => log_decode_failure(log_line, &candidate.url, &err.to_string()),
                }
            } else {
                match image::load_from_memory(&resp.body) {
                    Ok(img) => raster = Some(img),
                    Err(err) => log_decode_failure(log_line, &candidate.url, &err.to_string()),
                }
            }
        }

        let (width, height) = match &raster {
            Some(img) => (img.width(), img.height()),
            None => (candidate.width, candidate.height),
        };
        let (rule_width, rule_height) = if svg_text.is_some() {
            (
                nonzero_or(width, SVG_SCORING_SIZE),
                nonzero_or(height, SVG_SCORING_SIZE),
            )
        } else {
            (width, height)
        };

        let card = {
            let ctx = RuleContext {
                image: raster.as_ref(),
                width: rule_width,
                height: rule_height,
                url: &candidate.url,
                format: &format,
                alt_text: &candidate.alt_text,
                css_classes: &candidate.css_classes,
                element_id: &candidate.element_id,
                parent_classes: &candidate.parent_classes,
                svg_content: svg_text.as_deref(),
            };
            self.engine.calculate_score(&ctx, log_line)
        };

        log_line(
            "debug",
            "candidate_scored",
            serde_json::json!({
                "url": redact_url_for_log(&candidate.url),
                "score": card.total,
                "rules": card.details.len(),
            }),
        );
        candidate.scored(width, height, format, card.total, card.details)
    }

    /// Walks ranked URLs and returns the first usable image (or the largest
    /// of the top `k` under [`SelectionPolicy::LargestOfTop`]).
    pub fn fetch_best_logo(
        &self,
        urls: &[String],
        log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    ) -> Option<FetchedLogo> {
        match self.config.selection_policy {
            SelectionPolicy::FirstReachable => self.first_reachable(urls, 0, log_line),
            SelectionPolicy::LargestOfTop { k } => {
                let k = k.max(1).min(urls.len());
                let (top, rest) = urls.split_at(k);
                self.largest_of(top, log_line)
                    .or_else(|| self.first_reachable(rest, k, log_line))
            }
        }
    }

    /// Full pipeline. `Ok(None)` means no logo could be found or fetched.
    pub fn get_customer_logo(
        &self,
        domain_or_name: &str,
        format: OutputFormat,
        resize: Option<(u32, u32)>,
        log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    ) -> Result<Option<Vec<u8>>> {
        let domain = normalize_domain(domain_or_name)?;
        let urls = self.find_logo_urls(&domain, log_line);
        if urls.is_empty() {
            log_line("warn", "no_logo_found", serde_json::json!({ "domain": domain }));
            return Ok(None);
        }
        let Some(logo) = self.fetch_best_logo(&urls, log_line) else {
            log_line(
                "warn",
                "no_logo_fetched",
                serde_json::json!({ "domain": domain, "candidates": urls.len() }),
            );
            return Ok(None);
        };
        let bytes = process_image(&logo.image, format, resize)?;
        log_line(
            "info",
            "logo_processed",
            serde_json::json!({
                "domain": domain,
                "url": redact_url_for_log(&logo.url),
                "kind": logo.image.kind(),
                "format": format.extension(),
                "bytes": bytes.len(),
            }),
        );
        Ok(Some(bytes))
    }

    fn first_reachable(
        &self,
        urls: &[String],
        rank_offset: usize,
        log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    ) -> Option<FetchedLogo> {
        let window = self.config.effective_concurrency();
        for (chunk_index, chunk) in urls.chunks(window).enumerate() {
            let attempts = self.fetch_window(chunk);
            for (offset, (url, attempt)) in chunk.iter().zip(attempts).enumerate() {
                let rank = rank_offset + chunk_index * window + offset;
                if let Some(logo) = log_attempt(log_line, url, rank, attempt) {
                    log_line(
                        "info",
                        "logo_selected",
                        serde_json::json!({
                            "url": redact_url_for_log(&logo.url),
                            "rank": rank,
                            "kind": logo.image.kind(),
                        }),
                    );
                    return Some(logo);
                }
            }
        }
        None
    }

    fn largest_of(
        &self,
        urls: &[String],
        log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    ) -> Option<FetchedLogo> {
        let window = self.config.effective_concurrency();
        let mut best: Option<(usize, FetchedLogo)> = None;
        for (chunk_index, chunk) in urls.chunks(window).enumerate() {
            let attempts = self.fetch_window(chunk);
            for (offset, (url, attempt)) in chunk.iter().zip(attempts).enumerate() {
                let rank = chunk_index * window + offset;
                let Some(logo) = log_attempt(log_line, url, rank, attempt) else {
                    continue;
                };
                if let Err(rejection) = validate_logo(&logo.image) {
                    log_line(
                        "debug",
                        "logo_rejected",
                        serde_json::json!({
                            "url": redact_url_for_log(&logo.url),
                            "reason": rejection.to_string(),
                        }),
                    );
                    continue;
                }
                let replace = match &best {
                    Some((_, current)) => prefer_larger(&logo.image, &current.image),
                    None => true,
                };
                if replace {
                    best = Some((rank, logo));
                }
            }
        }

        let (rank, logo) = best?;
        log_line(
            "info",
            "logo_selected",
            serde_json::json!({
                "url": redact_url_for_log(&logo.url),
                "rank": rank,
                "kind": logo.image.kind(),
            }),
        );
        Some(logo)
    }

    /// Fetches a window of URLs concurrently; results come back in input order.
    fn fetch_window(&self, urls: &[String]) -> Vec<Attempt> {
        if urls.len() <= 1 {
            return urls.iter().map(|url| self.fetch_logo(url)).collect();
        }
        std::thread::scope(|scope| {
            let handles: Vec<_> = urls
                .iter()
                .map(|url| scope.spawn(move || self.fetch_logo(url)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| Attempt::Failed {
                        error: "fetch worker panicked".to_string(),
                    })
                })
                .collect()
        })
    }

    fn fetch_logo(&self, url: &str) -> Attempt {
        let response = match self.fetcher.get(url).and_then(|r| r.error_for_status(url)) {
            Ok(resp) => resp,
            Err(err) => {
                return Attempt::Failed {
                    error: err.to_string(),
                }
            }
        };
        if !is_accepted_content_type(&response.content_type) {
            return Attempt::Rejected {
                content_type: response.content_type,
            };
        }
        match decode_logo(&response) {
            Ok(image) => {
                let final_url = if response.final_url.is_empty() {
                    url.to_string()
                } else {
                    response.final_url.clone()
                };
                Attempt::Accepted(FetchedLogo {
                    url: final_url,
                    content_type: response.content_type.clone(),
                    image,
                    sha256: hex::encode(Sha256::digest(&response.body)),
                    byte_len: response.body.len(),
                })
            }
            Err(err) => Attempt::Failed {
                error: err.to_string(),
            },
        }
    }
}

fn log_attempt(
    log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    url: &str,
    rank: usize,
    attempt: Attempt,
) -> Option<FetchedLogo> {
    match attempt {
        Attempt::Accepted(logo) => Some(logo),
        Attempt::Rejected { content_type } => {
            log_line(
                "debug",
                "logo_content_type_rejected",
                serde_json::json!({
                    "url": redact_url_for_log(url),
                    "rank": rank,
                    "content_type": content_type,
                }),
            );
            None
        }
        Attempt::Failed { error } => {
            log_line(
                "debug",
                "logo_fetch_failed",
                serde_json::json!({
                    "url": redact_url_for_log(url),
                    "rank": rank,
                    "error": error,
                }),
            );
            None
        }
    }
}

fn log_decode_failure(
    log_line: &mut dyn FnMut(&str, &str, serde_json::Value),
    url: &str,
    error: &str,
) {
    log_line(
        "debug",
        "scoring_decode_failed",
        serde_json::json!({ "url": redact_url_for_log(url), "error": error }),
    );
}

fn nonzero_or(value: u32, fallback: u32) -> u32 {
    if value == 0 {
        fallback
    } else {
        value
    }
}

/// Matches the media type (parameters ignored) against [`ACCEPTED_CONTENT_TYPES`].
pub fn is_accepted_content_type(content_type: &str) -> bool {
    let media = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_CONTENT_TYPES.contains(&media.as_str())
}

fn decode_logo(response: &FetchResponse) -> Result<LogoImage> {
    if response.content_type.to_ascii_lowercase().contains("svg") {
        let text = String::from_utf8(response.body.clone()).map_err(|err| HunterError::Http {
            url: response.final_url.clone(),
            message: format!("svg is not valid UTF-8: {err}"),
        })?;
        return Ok(LogoImage::Svg(text));
    }
    Ok(LogoImage::Raster(image::load_from_memory(&response.body)?))
}

/// Removes repeated URLs. The first occurrence keeps its position; the
/// policy decides whose metadata survives.
pub fn dedup_candidates(candidates: Vec<Candidate>, policy: DedupPolicy) -> Vec<Candidate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match index.get(&candidate.url) {
            Some(&slot) => {
                let replace = match policy {
                    DedupPolicy::LastWriteWins => true,
                    DedupPolicy::RichestContext => {
                        candidate.context_richness() >= out[slot].context_richness()
                    }
                };
                if replace {
                    out[slot] = candidate;
                }
            }
            None => {
                index.insert(candidate.url.clone(), out.len());
                out.push(candidate);
            }
        }
    }
    out
}

/// Highest score first; equal scores keep discovery order.
pub fn rank_candidates(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// Accepts `example.com`, `https://Example.com/path`, `example.com:8443`.
/// Returns the lowercase host (with port when present).
pub fn normalize_domain(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(HunterError::InvalidDomain(input.to_string()));
    }

    let parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        let head = trimmed.split(['/', '?', '#']).next().unwrap_or("");
        Url::parse(&format!("https://{head}"))
    }
    .map_err(|_| HunterError::InvalidDomain(input.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(HunterError::InvalidDomain(input.to_string()));
    }
    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| HunterError::InvalidDomain(input.to_string()))?
        .to_ascii_lowercase();
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}

/// Sanity checks for a logo that is about to be chosen by size.
pub fn validate_dimensions(
    width: u32,
    height: u32,
    is_svg: bool,
) -> std::result::Result<(), Rejection> {
    if width > 0 && height > 0 {
        let ratio = f64::from(width.max(height)) / f64::from(width.min(height));
        if ratio > MAX_ASPECT_RATIO {
            return Err(Rejection::AspectRatio(ratio));
        }
    }
    if width.max(height) < MIN_LOGO_SIDE && !is_svg {
        return Err(Rejection::TooSmall { width, height });
    }
    if is_svg {
        return Ok(());
    }
    if u64::from(width) * u64::from(height) > MAX_RASTER_SIDE * MAX_RASTER_SIDE {
        return Err(Rejection::TooLarge { width, height });
    }
    Ok(())
}

fn validate_logo(image: &LogoImage) -> std::result::Result<(), Rejection> {
    match image.dimensions() {
        Some((w, h)) => validate_dimensions(w, h, false),
        None => validate_dimensions(0, 0, true),
    }
}

/// True when `candidate` should replace `current`: SVG beats raster, then
/// larger pixel area. Ties keep `current`.
pub fn prefer_larger(candidate: &LogoImage, current: &LogoImage) -> bool {
    match (candidate.dimensions(), current.dimensions()) {
        (None, Some(_)) => true,
        (_, None) => false,
        (Some((cw, ch)), Some((bw, bh))) => {
            u64::from(cw) * u64::from(ch) > u64::from(bw) * u64::from(bh)
        }
    }
}
