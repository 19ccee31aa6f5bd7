use crate::{HunterError, Result};
use std::collections::HashMap;
use std::path::Path;

const BUNDLED_WEIGHTS: &str = include_str!("rules/weights.txt");

/// Rule identifier -> integer weight, loaded once and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeightTable {
    weights: HashMap<String, i64>,
}

impl WeightTable {
    /// The table compiled into the binary.
    pub fn bundled() -> Self {
        Self::parse(BUNDLED_WEIGHTS).unwrap_or_default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parses `<weight> <rule_id>` lines; `#` starts a comment line.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut weights = HashMap::new();
        for (idx, line) in raw.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut parts = trimmed.split_whitespace();
            let (Some(value), Some(rule_id)) = (parts.next(), parts.next()) else {
                return Err(HunterError::WeightTable {
                    line: line_no,
                    message: format!("expected `<weight> <rule_id>`, got `{trimmed}`"),
                });
            };
            if parts.next().is_some() {
                return Err(HunterError::WeightTable {
                    line: line_no,
                    message: format!("trailing tokens after rule id `{rule_id}`"),
                });
            }
            let weight = value.parse::<i64>().map_err(|_| HunterError::WeightTable {
                line: line_no,
                message: format!("weight `{value}` is not an integer"),
            })?;
            weights.insert(rule_id.to_string(), weight);
        }
        Ok(Self { weights })
    }

    /// Weight for `rule_id`; rules missing from the table are disabled with 0.
    pub fn weight(&self, rule_id: &str) -> i64 {
        self.weights.get(rule_id).copied().unwrap_or(0)
    }

    pub fn contains(&self, rule_id: &str) -> bool {
        self.weights.contains_key(rule_id)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
