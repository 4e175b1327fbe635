//! Narrative roadmap generation from a ranking.
//!
//! The generator is an external collaborator behind [`TextGenerator`]. The
//! prompt is built deterministically from the ranking, so the same ranking
//! always produces the same prompt.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::profile::StudentProfile;
use crate::matching::RankedProgram;
use crate::utils::truncate_chars;

/// Programs included in a roadmap prompt.
pub const MAX_PROMPT_PROGRAMS: usize = 5;

pub const SYSTEM_PROMPT: &str = "You are a Canadian university admissions advisor writing for a \
high-school student. Using only the ranked programs provided, write a short, encouraging roadmap: \
which programs to prioritize and why, which prerequisite courses to complete, what average to aim \
for, and concrete next steps for this school year. Do not invent programs, admission averages, \
or requirements that are not in the list.";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generation API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("generation API returned no text")]
    EmptyResponse,
    #[error("text generator misconfigured: {0}")]
    Config(String),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChat {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::Config("API key is empty".into()));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiChat {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.4,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body: truncate_chars(&body, 300),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn or_none(value: &str) -> &str {
    if value.trim().is_empty() { "not specified" } else { value }
}

/// Render the user prompt for a roadmap. Only the first
/// [`MAX_PROMPT_PROGRAMS`] programs are included, in ranking order.
pub fn build_roadmap_prompt(profile: &StudentProfile, ranking: &[RankedProgram]) -> String {
    let mut prompt = String::new();

    let _ = writeln!(prompt, "Student profile");
    let _ = writeln!(prompt, "- Name: {}", or_none(&profile.name));
    let _ = writeln!(prompt, "- Grade: {}", profile.grade);
    if profile.average > 0.0 {
        let _ = writeln!(prompt, "- Average: {:.1}%", profile.average);
    } else {
        let _ = writeln!(prompt, "- Average: not specified");
    }
    let _ = writeln!(prompt, "- Interests: {}", or_none(&profile.interests));
    let _ = writeln!(prompt, "- Subjects: {}", or_none(&profile.subjects.join(", ")));
    let _ = writeln!(
        prompt,
        "- Extracurriculars: {}",
        or_none(&profile.extracurriculars)
    );
    let _ = writeln!(prompt, "- Location: {}", or_none(&profile.location));
    let _ = writeln!(
        prompt,
        "- Preferences: {}",
        or_none(&profile.preferences.join(", "))
    );

    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Ranked programs");
    if ranking.is_empty() {
        let _ = writeln!(prompt, "(no programs matched)");
    }
    for (rank, entry) in ranking.iter().take(MAX_PROMPT_PROGRAMS).enumerate() {
        let program = &entry.program;
        let breakdown = &entry.breakdown;
        let _ = writeln!(
            prompt,
            "{}. {} at {} ({}% match)",
            rank + 1,
            program.name,
            program.university,
            breakdown.match_percent
        );
        let _ = writeln!(
            prompt,
            "   Admission average: {}; fit: {}",
            or_none(&program.admission_average),
            breakdown.grade_assessment
        );
        let _ = writeln!(
            prompt,
            "   Prerequisites: {}",
            or_none(&program.prerequisites)
        );
        if !breakdown.missing_prereqs.is_empty() {
            let _ = writeln!(
                prompt,
                "   Missing courses: {}",
                breakdown.missing_prereqs.join(", ")
            );
        }
        let _ = writeln!(
            prompt,
            "   Co-op: {}; location: {}",
            if program.co_op { "yes" } else { "no" },
            or_none(program.location_or_university())
        );
    }

    let _ = writeln!(prompt);
    let _ = write!(
        prompt,
        "Write the roadmap in under 300 words, addressed to the student."
    );
    prompt
}

/// Generate a roadmap, or `None` if generation is unavailable or fails.
pub async fn generate_roadmap(
    generator: Option<&dyn TextGenerator>,
    profile: &StudentProfile,
    ranking: &[RankedProgram],
) -> Option<String> {
    let generator = generator?;
    let prompt = build_roadmap_prompt(profile, ranking);
    debug!(
        model = generator.model_name(),
        prompt_chars = prompt.len(),
        "Requesting roadmap"
    );
    match generator.generate(&prompt, SYSTEM_PROMPT).await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(model = generator.model_name(), error = %e, "Roadmap generation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::ScoringWeights;
    use crate::data::programs::Program;
    use crate::matching::admission::GradeAssessment;
    use crate::matching::combiner::ScoreBreakdown;

    fn ranked(index: usize, name: &str, missing: &[&str]) -> RankedProgram {
        RankedProgram {
            index,
            program: Arc::new(Program {
                name: name.into(),
                university: "University of Toronto".into(),
                url: String::new(),
                admission_average: "85-90%".into(),
                prerequisites: "MHF4U, SPH4U".into(),
                co_op: true,
                location: "Toronto".into(),
                embedding: None,
            }),
            final_score: 0.75,
            breakdown: ScoreBreakdown {
                relevance: 1.0,
                embedding: 0.0,
                grade: 0.58,
                prereq: 1.0,
                location: Some(1.0),
                grade_assessment: GradeAssessment::Target,
                missing_prereqs: missing.iter().map(|s| s.to_string()).collect(),
                penalties: vec![],
                bonuses: vec![],
                weights: ScoringWeights::default(),
                final_score: 0.75,
                match_percent: 75,
            },
        }
    }

    fn profile() -> StudentProfile {
        StudentProfile {
            name: "Ada".into(),
            average: 88.0,
            interests: "robotics and AI".into(),
            subjects: vec!["Physics".into()],
            ..Default::default()
        }
    }

    /// Records the prompts it was given.
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str, _system: &str) -> Result<String, GenerationError> {
            self.prompts
                .lock()
                .unwrap()
                .push(prompt.to_string());
            Ok("Focus on Mechatronics.".into())
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _: &str, _: &str) -> Result<String, GenerationError> {
            Err(GenerationError::EmptyResponse)
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn prompt_lists_programs_in_rank_order() {
        let ranking = vec![
            ranked(3, "Mechatronics Engineering", &["MCV4U"]),
            ranked(0, "Computer Engineering", &[]),
        ];
        let prompt = build_roadmap_prompt(&profile(), &ranking);

        let first = prompt.find("1. Mechatronics Engineering").unwrap();
        let second = prompt.find("2. Computer Engineering").unwrap();
        assert!(first < second);
        assert!(prompt.contains("- Average: 88.0%"));
        assert!(prompt.contains("Missing courses: MCV4U"));
        assert!(prompt.contains("- Location: not specified"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let ranking = vec![ranked(0, "Mechatronics Engineering", &[])];
        assert_eq!(
            build_roadmap_prompt(&profile(), &ranking),
            build_roadmap_prompt(&profile(), &ranking)
        );
    }

    #[test]
    fn prompt_caps_program_count() {
        let ranking: Vec<RankedProgram> = (0..8)
            .map(|i| ranked(i, &format!("Program {i}"), &[]))
            .collect();
        let prompt = build_roadmap_prompt(&profile(), &ranking);
        assert!(prompt.contains("5. Program 4"));
        assert!(!prompt.contains("Program 5"));
    }

    #[tokio::test]
    async fn generator_receives_built_prompt() {
        let generator = RecordingGenerator {
            prompts: Mutex::new(Vec::new()),
        };
        let ranking = vec![ranked(0, "Mechatronics Engineering", &[])];
        let text = generate_roadmap(Some(&generator), &profile(), &ranking).await;
        assert_eq!(text.as_deref(), Some("Focus on Mechatronics."));
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0], build_roadmap_prompt(&profile(), &ranking));
    }

    #[tokio::test]
    async fn generation_failure_yields_none() {
        let ranking = vec![ranked(0, "Mechatronics Engineering", &[])];
        assert_eq!(
            generate_roadmap(Some(&FailingGenerator), &profile(), &ranking).await,
            None
        );
        assert_eq!(generate_roadmap(None, &profile(), &ranking).await, None);
    }
}
