//! Deterministic keyword-overlap gap analysis.
//!
//! The correctness floor of the whole system: no model, no network, no
//! failure mode. Every other analysis path is allowed to degrade into this
//! one, so it must stay dependency-free and total.
//!
//! ## Why boundary-aware matching?
//!
//! Plain substring search over skill names is full of traps — "go" matches
//! inside "going", "java" inside "javascript", "css" inside "access". Each
//! vocabulary entry is compiled into a pattern that requires the skill to
//! be flanked by start/end, whitespace, or punctuation on both sides.

use crate::report::{GapReport, GapSource};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

/// Reference vocabulary of skill tokens, lowercase.
///
/// Matching is case-insensitive against lowercased input; the vocabulary
/// doubles as the canonical spelling in reports.
pub const SKILL_VOCABULARY: &[&str] = &[
    // Frontend
    "react", "vue", "angular", "typescript", "javascript", "html", "css", "tailwind",
    // Backend
    "python", "django", "flask", "node.js", "express", "java", "spring", "go",
    // Data stores
    "sql", "mysql", "postgresql", "mongodb", "redis",
    // Infra
    "docker", "kubernetes", "k8s", "aws", "gcp", "azure", "ci/cd", "git", "linux",
];

/// One compiled boundary-aware pattern per vocabulary entry.
static SKILL_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SKILL_VOCABULARY
        .iter()
        .map(|skill| {
            let pattern = format!(
                r"(?:^|[\s.,;(/]){}(?:$|[\s.,;)/])",
                regex::escape(skill)
            );
            (*skill, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// Extract the set of vocabulary skills present in `text`.
///
/// Returns a sorted, deduplicated set of canonical skill spellings.
pub fn extract_skills(text: &str) -> BTreeSet<String> {
    if text.is_empty() {
        return BTreeSet::new();
    }
    let lower = text.to_lowercase();
    SKILL_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(&lower))
        .map(|(skill, _)| (*skill).to_string())
        .collect()
}

/// Compare resume and job-description skill sets without any model.
///
/// `matching = jd ∩ resume`, `missing = jd − resume`,
/// `score = round(100 · |matching| / |jd|)` (0 when the JD names no
/// vocabulary skill). Output vectors are sorted for determinism.
pub fn analyze_gap_fallback(resume_text: &str, jd_text: &str) -> GapReport {
    debug!("running local keyword gap analysis");
    let resume_skills = extract_skills(resume_text);
    let jd_skills = extract_skills(jd_text);

    let matching_skills: Vec<String> = jd_skills.intersection(&resume_skills).cloned().collect();
    let missing_skills: Vec<String> = jd_skills.difference(&resume_skills).cloned().collect();

    let score = if jd_skills.is_empty() {
        0
    } else {
        ((matching_skills.len() as f64 / jd_skills.len() as f64) * 100.0).round() as u8
    };

    GapReport {
        missing_skills,
        matching_skills,
        score,
        source: GapSource::LocalKeywordMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_example_scores_fifty() {
        let report = analyze_gap_fallback("Python, React", "Must know Python and Docker");
        assert_eq!(report.matching_skills, vec!["python"]);
        assert_eq!(report.missing_skills, vec!["docker"]);
        assert_eq!(report.score, 50);
        assert_eq!(report.source, GapSource::LocalKeywordMatch);
    }

    #[test]
    fn go_does_not_match_inside_going() {
        let skills = extract_skills("I am going to the office");
        assert!(!skills.contains("go"));

        let skills = extract_skills("I write Go services");
        assert!(skills.contains("go"));
    }

    #[test]
    fn java_does_not_match_inside_javascript() {
        let skills = extract_skills("Expert in JavaScript");
        assert!(skills.contains("javascript"));
        assert!(!skills.contains("java"));
    }

    #[test]
    fn javascript_does_not_match_inside_typescript() {
        let skills = extract_skills("We use TypeScript everywhere");
        assert!(skills.contains("typescript"));
        assert!(!skills.contains("javascript"));
    }

    #[test]
    fn skills_match_flanked_by_punctuation() {
        let skills = extract_skills("Stack: (Python/Flask), node.js, k8s.");
        assert!(skills.contains("python"));
        assert!(skills.contains("flask"));
        assert!(skills.contains("node.js"));
        assert!(skills.contains("k8s"));
    }

    #[test]
    fn empty_jd_scores_zero() {
        let report = analyze_gap_fallback("Python and Docker", "");
        assert_eq!(report.score, 0);
        assert!(report.matching_skills.is_empty());
        assert!(report.missing_skills.is_empty());
    }

    #[test]
    fn jd_without_vocabulary_skills_scores_zero() {
        let report = analyze_gap_fallback("Python", "Great communicator wanted");
        assert_eq!(report.score, 0);
    }

    #[test]
    fn full_match_scores_hundred() {
        let report = analyze_gap_fallback(
            "Python, Docker, AWS veteran",
            "Need Python, Docker and AWS",
        );
        assert_eq!(report.score, 100);
        assert!(report.missing_skills.is_empty());
        assert_eq!(report.matching_skills.len(), 3);
    }

    #[test]
    fn score_rounds_to_nearest() {
        // 2 of 3 JD skills matched → 66.67 → 67.
        let report = analyze_gap_fallback("Python and Docker", "Python, Docker, Kubernetes");
        assert_eq!(report.score, 67);
    }

    #[test]
    fn output_is_sorted() {
        let report = analyze_gap_fallback("", "redis, python, aws, docker");
        let mut sorted = report.missing_skills.clone();
        sorted.sort();
        assert_eq!(report.missing_skills, sorted);
    }

    #[test]
    fn extraction_is_case_insensitive() {
        let skills = extract_skills("PYTHON, Docker, ReDiS");
        assert!(skills.contains("python"));
        assert!(skills.contains("docker"));
        assert!(skills.contains("redis"));
    }
}
