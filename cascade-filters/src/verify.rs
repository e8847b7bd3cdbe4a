//! Check result rows against the filter chain that produced them.
//!
//! A row matches a level when its column named after the level contains the
//! selected label, ignoring case. Tables often render labels with extra
//! context (codes, parent names), hence containment rather than equality.

use crate::chains::FilterChain;
use cascade_drivers::Record;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidRecord {
    pub record: Record,
    /// One message per mismatching level.
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelCompliance {
    pub level: String,
    pub compliant: usize,
    pub total: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: Vec<InvalidRecord>,
    pub compliance: Vec<LevelCompliance>,
}

impl VerificationReport {
    /// True when every record matched every level.
    pub fn is_clean(&self) -> bool {
        self.invalid_records.is_empty()
    }
}

pub fn verify_records(records: &[Record], chain: &FilterChain) -> VerificationReport {
    let mut valid_records = 0;
    let mut invalid_records = Vec::new();

    for record in records {
        let issues: Vec<String> = chain
            .iter()
            .filter_map(|(level, label)| {
                let value = record.get(level).unwrap_or("").trim();
                (!matches_label(value, label))
                    .then(|| format!("{level}: expected '{label}', got '{value}'"))
            })
            .collect();

        if issues.is_empty() {
            valid_records += 1;
        } else {
            invalid_records.push(InvalidRecord {
                record: record.clone(),
                issues,
            });
        }
    }

    let total = records.len();
    let compliance = chain
        .iter()
        .map(|(level, label)| {
            let compliant = records
                .iter()
                .filter(|r| matches_label(r.get(level).unwrap_or(""), label))
                .count();
            LevelCompliance {
                level: level.to_string(),
                compliant,
                total,
                percentage: percentage(compliant, total),
            }
        })
        .collect();

    VerificationReport {
        total_records: total,
        valid_records,
        invalid_records,
        compliance,
    }
}

pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn matches_label(value: &str, label: &str) -> bool {
    value.to_lowercase().contains(&label.to_lowercase())
}
