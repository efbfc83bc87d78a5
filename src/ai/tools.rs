//! Prompted model tools. Text tools never fail: errors become the fixed
//! user-facing lines from [`AiError::user_message`]. Structured tools fall
//! back to an empty or default value.

use serde::Deserialize;

use crate::model::category::{Category, ExecutionStyle, ProjectField};
use crate::model::task::{Complexity, Task, new_id};
use crate::ops::mission_ops::{Intensity, PlannedPhase, QuestStructure};

use super::client::{AiError, AiProvider, AiRequest, InlineImage};
use super::parse::parse_json;

pub const RITUAL_FALLBACK: [&str; 3] = ["Breathe", "Focus", "Execute"];
pub const DEMON_FALLBACK: &str = "Do not fail again.";

async fn ask(ai: &dyn AiProvider, request: AiRequest, empty: &str) -> String {
    match ai.generate(&request).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) | Err(AiError::EmptyResponse) => empty.to_string(),
        Err(e) => e.user_message(),
    }
}

async fn ask_json<T: serde::de::DeserializeOwned>(ai: &dyn AiProvider, prompt: String) -> Option<T> {
    match ai.generate(&AiRequest::text(prompt)).await {
        Ok(text) => parse_json(&text),
        Err(e) => {
            tracing::warn!(error = %e, "structured model request failed");
            None
        }
    }
}

/// Coach-style read of a physique photo
pub async fn analyze_physique(ai: &dyn AiProvider, image: InlineImage) -> String {
    let prompt = "Act as an elite fitness coach (Nova System). Analyze physique. \
        1. Body fat range. 2. Strong point. 3. Weak point. \
        4. One specific training directive. Tone: Dark, Cyberpunk.";
    ask(ai, AiRequest::with_image(prompt, image), "Analysis complete.").await
}

/// Three next-step suggestions for the current roadmap
pub async fn roadmap_suggestions(ai: &dyn AiProvider, tasks: &[Task]) -> String {
    let list = tasks
        .iter()
        .map(|t| {
            format!(
                "- [{}] {} ({})",
                t.category,
                t.title,
                if t.completed { "DONE" } else { "PENDING" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!(
        "Nova System Oracle. Analyze roadmap:\n{}\nSuggest 3 next-step tasks to optimize growth. \
         Format: 1. [CAT] Task - Reason. Tone: Elite.",
        list
    );
    ask(ai, AiRequest::text(prompt), "No directives.").await
}

/// Intent extracted from a spoken command
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoiceCommand {
    CreateTask {
        #[serde(default)]
        title: String,
        #[serde(default)]
        temple_id: Option<String>,
        #[serde(default)]
        xp: Option<u32>,
        #[serde(default)]
        complexity: Option<String>,
    },
    CreateCategory {
        #[serde(default)]
        name: String,
        #[serde(default)]
        color: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl VoiceCommand {
    /// The task a `CreateTask` command describes
    pub fn to_task(&self, user_id: &str) -> Option<Task> {
        let VoiceCommand::CreateTask {
            title,
            temple_id,
            xp,
            complexity,
        } = self
        else {
            return None;
        };
        if title.trim().is_empty() {
            return None;
        }
        let category = temple_id
            .as_deref()
            .map(Category::parse)
            .unwrap_or(Category::Home);
        let mut task = Task::new(new_id("task"), title.trim().to_string(), category);
        task.user_id = user_id.to_string();
        if let Some(xp) = xp {
            task.xp_value = (*xp).clamp(10, 50);
        }
        if let Some(c) = complexity.as_deref().and_then(Complexity::parse) {
            task.complexity = c;
        }
        Some(task)
    }
}

pub async fn parse_voice_command(ai: &dyn AiProvider, transcript: &str) -> VoiceCommand {
    let prompt = format!(
        "Voice Command Processor. Input: \"{}\". Return JSON only.\n\
         If creating task: {{ \"type\": \"CREATE_TASK\", \"title\": \"...\", \"temple_id\": \"HOME\"|\"FITNESS\"|\"...\", \"xp\": 10-50, \"complexity\": \"D\" }}\n\
         If creating category: {{ \"type\": \"CREATE_CATEGORY\", \"name\": \"...\", \"color\": \"hex\" }}\n\
         Else: {{ \"type\": \"UNKNOWN\" }}",
        transcript
    );
    ask_json(ai, prompt).await.unwrap_or(VoiceCommand::Unknown)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    /// Today's schedule
    Daily,
    /// Roadmap steps for one goal
    Project,
}

/// One generated task in a flat plan
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlanItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub temple_id: Option<String>,
    #[serde(default)]
    pub xp: Option<u32>,
}

impl PlanItem {
    pub fn to_task(&self, user_id: &str, fallback: Category) -> Task {
        let category = self
            .temple_id
            .as_deref()
            .map(Category::parse)
            .unwrap_or(fallback);
        let mut task = Task::new(new_id("task"), self.title.trim().to_string(), category);
        task.user_id = user_id.to_string();
        if let Some(xp) = self.xp.filter(|xp| *xp > 0) {
            task.xp_value = xp;
        }
        task
    }
}

pub async fn generate_plan(ai: &dyn AiProvider, goal: &str, mode: PlanMode) -> Vec<PlanItem> {
    let prompt = match mode {
        PlanMode::Daily => format!(
            "Generate a high-performance daily schedule/plan for today based on this context: \"{}\". \
             Return a JSON array of tasks. Each task: {{ \"title\": \"...\", \"temple_id\": \"HOME\", \"xp\": 10 }}.",
            goal
        ),
        PlanMode::Project => format!(
            "Break down this project: \"{}\" into a roadmap of 5-7 actionable steps. \
             Return JSON array. Each step: {{ \"title\": \"...\", \"temple_id\": \"BUSINESS\", \"xp\": 50 }}.",
            goal
        ),
    };
    let items: Vec<PlanItem> = ask_json(ai, prompt + " JSON ONLY. No markdown.")
        .await
        .unwrap_or_default();
    items
        .into_iter()
        .filter(|i| !i.title.trim().is_empty())
        .collect()
}

/// Objectives and KPIs for a new quest; `None` when the model fails
pub async fn generate_quest_structure(
    ai: &dyn AiProvider,
    vision: &str,
    fields: &[ProjectField],
    intensity: Intensity,
) -> Option<QuestStructure> {
    let fields = fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let prompt = format!(
        "Act as a Strategic Life Architect.\n\
         Create a Quest Structure for vision: \"{}\".\n\
         Fields: {}.\n\
         Intensity: {}.\n\n\
         Return JSON ONLY with this structure:\n\
         {{ \"objectives\": [\"string\", \"string\"], \"kpis\": [\"string\", \"string\"], \"projects\": [] }}",
        vision,
        fields,
        intensity.as_str()
    );
    ask_json(ai, prompt).await
}

/// Three phases of tasks and subtasks for a new project
pub async fn generate_project_phases(
    ai: &dyn AiProvider,
    title: &str,
    field: ProjectField,
    style: ExecutionStyle,
) -> Vec<PlannedPhase> {
    let prompt = format!(
        "Create an Execution Plan for Project: \"{title}\" in Field: \"{field}\".\n\
         Execution Style: \"{style}\".\n\n\
         Return JSON ONLY array of 3 Phases.\n\
         Each Phase must have 2-3 Tasks.\n\
         Each Task must have 2-3 Subtasks.\n\n\
         Structure:\n\
         [{{ \"title\": \"PHASE 1: ...\", \"tasks\": [{{ \"title\": \"Task title\", \"xp_value\": 50, \
         \"temple_id\": \"{field}\", \"subtasks\": [{{ \"title\": \"Subtask 1\" }}] }}] }}]",
        title = title,
        field = field.as_str(),
        style = style.as_str(),
    );
    ask_json(ai, prompt).await.unwrap_or_default()
}

pub async fn doctor_habit(ai: &dyn AiProvider, habit_title: &str) -> String {
    let prompt = format!(
        "User is failing habit: \"{}\". Act as Nova Habit Doctor. \
         1. Why they likely failed (1 sentence). 2. A \"Micro-Version\" of the habit (e.g., 2 mins). \
         3. A new cue/trigger. Tone: Clinical, helpful but strict.",
        habit_title
    );
    ask(ai, AiRequest::text(prompt), "Habit prognosis unavailable.").await
}

/// One-line accountability jab for missed tasks
pub async fn demon_message(ai: &dyn AiProvider, missed: usize) -> String {
    let prompt = format!(
        "Act as a brutal, hell-themed Accountability Demon. The user missed {} tasks yesterday. \
         Give them a 1-sentence motivation that borders on a threat. \
         Use words like \"Disgrace\", \"Soul\", \"Abyss\", \"Weakness\".",
        missed
    );
    match ai.generate(&AiRequest::text(prompt)).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => "Your silence is noted.".to_string(),
        Err(_) => DEMON_FALLBACK.to_string(),
    }
}

pub async fn decision_advice(ai: &dyn AiProvider, dilemma: &str) -> String {
    let prompt = format!(
        "User Dilemma: \"{}\". Act as Nova Decision Engine. Output: \
         1. VERDICT (Do it / Don't do it / Pivot). 2. REASONING (Bullet point). \
         3. ALTERNATIVE PATH. Tone: Absolute logic.",
        dilemma
    );
    ask(ai, AiRequest::text(prompt), "Insufficient data for decision.").await
}

/// Short ritual steps; a fixed three-step ritual when the model fails
pub async fn generate_ritual(ai: &dyn AiProvider, kind: &str) -> Vec<String> {
    let prompt = format!(
        "Create a perfect \"{}\" ritual. Return JSON array of 3-5 steps (strings). \
         JSON ONLY. Short concise steps.",
        kind
    );
    match ask_json::<Vec<String>>(ai, prompt).await {
        Some(steps) if !steps.is_empty() => steps,
        _ => RITUAL_FALLBACK.iter().map(|s| s.to_string()).collect(),
    }
}

pub async fn skill_architect(ai: &dyn AiProvider, skill: &str) -> String {
    let prompt = format!(
        "Create a learning path for \"{}\". Break it down into 3 Phases (Beginner, Intermediate, Master). \
         Return as a structured list with checkboxes. Tone: Academic, rigorous.",
        skill
    );
    ask(ai, AiRequest::text(prompt), "Architect offline.").await
}

pub async fn war_room(ai: &dyn AiProvider, scenario: &str) -> String {
    let prompt = format!(
        "Act as a Military Strategist for Business/Life. Scenario: \"{}\". \
         Give 3 Tactical Options: Aggressive, Defensive, and Guerrilla. Tone: Sun Tzu meets Cyberpunk.",
        scenario
    );
    ask(ai, AiRequest::text(prompt), "Strategy offline.").await
}

pub async fn bio_hack(ai: &dyn AiProvider, goal: &str) -> String {
    let prompt = format!(
        "Act as a Bio-Hacker. User Goal: \"{}\". Provide a protocol involving: \
         1. Supplement Stack (Safe/Legal). 2. Sleep Routine. 3. Diet Adjustment. Tone: Clinical efficiency.",
        goal
    );
    ask(ai, AiRequest::text(prompt), "Bio-module offline.").await
}

pub async fn codex_writer(ai: &dyn AiProvider, topic: &str) -> String {
    let prompt = format!(
        "Write a high-impact journal entry or manifesto about \"{}\". \
         Tone: Inspiring, dark, powerful. Max 200 words.",
        topic
    );
    ask(ai, AiRequest::text(prompt), "Codex offline.").await
}
