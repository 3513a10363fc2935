//! Model prompts for transcription and structured analysis.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the JSON contract the analyzer parses
//!    against is defined in exactly one place, next to the instruction that
//!    demands it.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without
//!    driving a real model, making contract regressions easy to catch.

/// Fixed instruction given to the vision model for every transcription.
///
/// The model must not translate: downstream analysis and the skill matcher
/// both operate on the resume's own wording.
pub const TRANSCRIBE_INSTRUCTION: &str = "\
Transcribe this resume into clean, structured plain text. \
Preserve the source language exactly as written; do not translate anything. \
Keep section headings, bullet points, and the original reading order. \
Output only the transcribed text with no commentary.";

/// Build the strict-JSON prompt for the full resume analysis.
///
/// The schema below is the parse contract of
/// [`crate::report::AnalysisReport`]; change them together.
pub fn build_resume_analysis_prompt(resume_text: &str) -> String {
    format!(
        r#"You are a senior career consultant and resume reviewer.
Analyse the following resume and respond with JSON only. Do not output
markdown code blocks, commentary, or any text outside the JSON object.

Structure:
{{
    "analysis": {{
        "score": 0-100 (integer),
        "strengths": ["..."],
        "weaknesses": ["..."],
        "overall_comment": "..."
    }},
    "job_recommendations": [
        {{"title": "...", "reason": "...", "missing_skills": ["..."]}}
    ],
    "project_recommendations": [
        {{"name": "...", "difficulty": "易" | "中" | "難", "tech_stack": "...", "description": "..."}}
    ],
    "learning_path": [
        {{"topic": "...", "resource": "...", "priority": "高" | "中" | "低", "url": "..."}}
    ]
}}

Rules:
1. Respond in the resume's own language for all free-text fields.
2. "difficulty" must be exactly one of 易, 中, 難; "priority" exactly one of 高, 中, 低.
3. Give 2-3 strengths, 2-3 weaknesses, 2-3 job recommendations, 2-3 projects.
4. Be professional and encouraging, but specific about the weaknesses.

Resume:
{resume_text}"#
    )
}

/// Build the resume-vs-JD comparison prompt.
///
/// Requests only the three fields of [`crate::report::GapReport`]; the
/// `source` field is attached by the analyzer, never by the model.
pub fn build_gap_prompt(resume_text: &str, jd_text: &str) -> String {
    format!(
        r#"You are an expert ATS (Applicant Tracking System) scanner.

Task: Compare the Candidate Resume with the Job Description (JD).

Candidate Resume:
{resume_text}

Job Description:
{jd_text}

Output Format: JSON only. Do not output markdown code blocks.
Structure:
{{
    "missing_skills": ["skill1", "skill2"],
    "matching_skills": ["skill3", "skill4"],
    "score": 0-100 (integer, based on skill match percentage)
}}

Rules:
1. Extract specific hard skills (tech stack, tools, languages).
2. "missing_skills" are skills required in the JD but NOT found in the Resume.
3. "matching_skills" are skills found in both.
4. Be strict but understand synonyms (e.g. "k8s" == "Kubernetes").
5. Translate output skills to English standard names (e.g. use "React" not "Reactjs")."#
    )
}

/// Build the project-suggestion prompt from cleaned skill keywords and an
/// optional interests line.
pub fn build_projects_prompt(skills: &[String], interests: &str) -> String {
    let interests_line = if interests.trim().is_empty() {
        String::new()
    } else {
        format!("\nCandidate interests: {}", interests.trim())
    };
    format!(
        r#"You are a senior engineering mentor suggesting portfolio projects.

Candidate skills: {}{interests_line}

Output Format: JSON only. Do not output markdown code blocks.
Structure:
{{
    "projects": [
        {{"name": "...", "difficulty": "易" | "中" | "難", "tech_stack": "...", "description": "..."}}
    ]
}}

Rules:
1. Suggest 3 projects that exercise the listed skills together.
2. Order from easiest to hardest; "difficulty" must be exactly one of 易, 中, 難.
3. "tech_stack" is a short comma-separated list."#,
        skills.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcribe_instruction_forbids_translation() {
        assert!(TRANSCRIBE_INSTRUCTION.contains("do not translate"));
    }

    #[test]
    fn analysis_prompt_embeds_resume_and_schema() {
        let p = build_resume_analysis_prompt("My resume body");
        assert!(p.contains("My resume body"));
        assert!(p.contains("\"learning_path\""));
        assert!(p.contains("\"job_recommendations\""));
        assert!(p.contains("易"));
        assert!(p.contains("markdown code blocks"));
    }

    #[test]
    fn gap_prompt_requests_only_gap_fields() {
        let p = build_gap_prompt("resume", "jd");
        assert!(p.contains("\"missing_skills\""));
        assert!(p.contains("\"matching_skills\""));
        assert!(p.contains("\"score\""));
        assert!(!p.contains("\"learning_path\""));
    }

    #[test]
    fn projects_prompt_joins_skills_and_skips_empty_interests() {
        let p = build_projects_prompt(&["rust".into(), "sql".into()], "  ");
        assert!(p.contains("rust, sql"));
        assert!(!p.contains("Candidate interests"));

        let p = build_projects_prompt(&["rust".into()], "databases");
        assert!(p.contains("Candidate interests: databases"));
    }
}
