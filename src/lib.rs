pub mod candidate;
pub mod config;
mod error;
pub mod extract;
pub mod http;
pub mod hunter;
pub mod log;
pub mod output;
pub mod rules;
pub mod scoring;
pub mod weights;

pub use candidate::{Candidate, RuleContribution};
pub use error::{HunterError, Result};
pub use hunter::{FetchedLogo, LogoHunter};
pub use output::{LogoImage, OutputFormat};
pub use scoring::ScoringEngine;
