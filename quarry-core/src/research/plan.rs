//! Research planning with a tolerant parser: strict JSON, then a bullet
//! line scan, then a deterministic default plan.

use super::prompts;
use crate::brain::LlmProvider;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

const REQUIRED_KEYS: [&str; 3] = ["research_angles", "search_queries", "focus_areas"];
const FOCUS_STOPWORDS: &[&str] = &["what", "where", "when", "which"];
const MAX_DEFAULT_FOCUS_AREAS: usize = 5;

/// Structured research strategy consumed by every downstream stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    pub research_angles: Vec<String>,
    pub search_queries: Vec<String>,
    pub focus_areas: Vec<String>,
}

/// Where a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    Json,
    LineScan,
    Default,
}

impl Plan {
    /// The deterministic plan used whenever the model's plan is unusable.
    ///
    /// Every list is non-empty for any input.
    pub fn default_for(query: &str) -> Self {
        Self {
            research_angles: vec![
                "Academic perspective".to_string(),
                "Industry applications".to_string(),
                "Technical challenges".to_string(),
                "Future implications".to_string(),
            ],
            search_queries: vec![
                query.to_string(),
                format!("{query} research papers"),
                format!("{query} case studies"),
                format!("{query} best practices"),
                format!("{query} challenges risks"),
            ],
            focus_areas: default_focus_areas(query),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.research_angles.is_empty()
            && !self.search_queries.is_empty()
            && !self.focus_areas.is_empty()
    }
}

/// Lowercase words longer than four characters, minus a few question words,
/// capped at five. Falls back to the longest word, then to a generic label,
/// so the list is never empty.
fn default_focus_areas(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    let areas: Vec<String> = words
        .iter()
        .filter(|w| w.chars().count() > 4 && !FOCUS_STOPWORDS.contains(*w))
        .take(MAX_DEFAULT_FOCUS_AREAS)
        .map(|w| w.to_string())
        .collect();
    if !areas.is_empty() {
        return areas;
    }

    // First of the longest words
    let longest = words.iter().copied().reduce(|best, w| {
        if w.chars().count() > best.chars().count() {
            w
        } else {
            best
        }
    });
    match longest {
        Some(word) => vec![word.to_string()],
        None => vec!["general overview".to_string()],
    }
}

/// Asks the primary model for a plan. Never fails.
pub struct Planner<'a> {
    llm: &'a dyn LlmProvider,
}

impl<'a> Planner<'a> {
    pub fn new(llm: &'a dyn LlmProvider) -> Self {
        Self { llm }
    }

    pub async fn create_plan(&self, research_query: &str) -> Plan {
        let response = match self.llm.invoke(&prompts::planning(research_query)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Planning call failed, using default plan");
                return Plan::default_for(research_query);
            }
        };

        let (plan, source) = parse_plan(&response, research_query);
        info!(
            source = ?source,
            angles = plan.research_angles.len(),
            queries = plan.search_queries.len(),
            focus_areas = plan.focus_areas.len(),
            "Research plan created"
        );
        plan
    }
}

/// Run the parser pipeline over a raw planning response.
pub fn parse_plan(response: &str, query: &str) -> (Plan, PlanSource) {
    match parse_json_plan(response) {
        JsonOutcome::Plan(plan) => return (plan, PlanSource::Json),
        JsonOutcome::MissingKeys => {
            debug!("Plan JSON lacks required keys");
            return (Plan::default_for(query), PlanSource::Default);
        }
        JsonOutcome::NotJson => {}
    }

    match scan_plan_lines(response) {
        Some(plan) => (plan, PlanSource::LineScan),
        None => {
            debug!("No usable plan in model response");
            (Plan::default_for(query), PlanSource::Default)
        }
    }
}

enum JsonOutcome {
    Plan(Plan),
    MissingKeys,
    NotJson,
}

/// Decode the span between the first `{` and the last `}` as a JSON object.
fn parse_json_plan(response: &str) -> JsonOutcome {
    let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) else {
        return JsonOutcome::NotJson;
    };
    if end < start {
        return JsonOutcome::NotJson;
    }

    let Ok(object) = serde_json::from_str::<Map<String, Value>>(&response[start..=end]) else {
        return JsonOutcome::NotJson;
    };
    let field = |key: &str| object.get(key).map(string_list);
    let [Some(research_angles), Some(search_queries), Some(focus_areas)] = REQUIRED_KEYS.map(field)
    else {
        return JsonOutcome::MissingKeys;
    };

    JsonOutcome::Plan(Plan {
        research_angles,
        search_queries,
        focus_areas,
    })
}

fn string_list(value: &Value) -> Vec<String> {
    let as_text = |v: &Value| match v {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    match value {
        Value::Array(items) => items
            .iter()
            .map(as_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::Null => Vec::new(),
        other => vec![as_text(other)],
    }
}

#[derive(Clone, Copy)]
enum Section {
    Angles,
    Queries,
    Focus,
}

/// Line-oriented fallback: header-like lines switch the active section,
/// bullet lines are collected into it. `None` unless every section got at
/// least one bullet.
fn scan_plan_lines(response: &str) -> Option<Plan> {
    let mut plan = Plan::default();
    let mut current: Option<Section> = None;

    for line in response.lines() {
        let line = line.trim();
        let lower = line.to_lowercase();
        if lower.contains("angle") || lower.contains("perspective") {
            current = Some(Section::Angles);
        } else if lower.contains("search") || lower.contains("quer") {
            current = Some(Section::Queries);
        } else if lower.contains("focus") || lower.contains("area") {
            current = Some(Section::Focus);
        } else if line.starts_with('-') || line.starts_with('•') {
            let content = line.trim_start_matches(['-', '•']).trim();
            let Some(section) = current else { continue };
            if content.is_empty() {
                continue;
            }
            let target = match section {
                Section::Angles => &mut plan.research_angles,
                Section::Queries => &mut plan.search_queries,
                Section::Focus => &mut plan.focus_areas,
            };
            target.push(content.to_string());
        }
    }

    plan.is_complete().then_some(plan)
}
