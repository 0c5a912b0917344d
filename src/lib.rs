pub mod cluster;
pub mod config;
pub mod entity;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod logging;
pub mod score;
pub mod scheduler;
pub mod store;
pub mod summarize;
pub mod synthesize;
pub mod topic;
pub mod util;
pub mod web;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TARGET_DB: &str = "db_query";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_FETCH: &str = "fetch";
pub const TARGET_CLUSTER: &str = "cluster";
pub const TARGET_SYNTH: &str = "synth";
pub const TARGET_SCHED: &str = "scheduler";

/// The fixed topic vocabulary articles and stories are classified into.
///
/// `general` is the default bucket; nothing else in the closed vocabulary
/// is allowed to leak through as a raw string past the parse boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    AiMl,
    CloudK8s,
    Security,
    Devtools,
    ChipsHardware,
    Politics,
    Business,
    Science,
    General,
}

impl Topic {
    pub const ALL: [Topic; 9] = [
        Topic::AiMl,
        Topic::CloudK8s,
        Topic::Security,
        Topic::Devtools,
        Topic::ChipsHardware,
        Topic::Politics,
        Topic::Business,
        Topic::Science,
        Topic::General,
    ];
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Topic::AiMl => "ai-ml",
            Topic::CloudK8s => "cloud-k8s",
            Topic::Security => "security",
            Topic::Devtools => "devtools",
            Topic::ChipsHardware => "chips-hardware",
            Topic::Politics => "politics",
            Topic::Business => "business",
            Topic::Science => "science",
            Topic::General => "general",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Topic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ai-ml" => Topic::AiMl,
            "cloud-k8s" => Topic::CloudK8s,
            "security" => Topic::Security,
            "devtools" => Topic::Devtools,
            "chips-hardware" => Topic::ChipsHardware,
            "politics" => Topic::Politics,
            "business" => Topic::Business,
            "science" => Topic::Science,
            "general" => Topic::General,
            _ => return Err(()),
        })
    }
}
