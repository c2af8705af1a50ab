// Mermaid rendering for the topology graph

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use super::TopologyGraph;

const SERVICE_CLASS: &str =
    "classDef serviceClass fill:#4A90E2,stroke:#2E5C8A,stroke-width:2px,color:#fff";
const TOPIC_CLASS: &str =
    "classDef topicClass fill:#F5A623,stroke:#D68910,stroke-width:2px,color:#fff";
const HOT_TOPIC_CLASS: &str =
    "classDef hotTopicClass fill:#E74C3C,stroke:#C0392B,stroke-width:3px,color:#fff";

/// One line of the graph description
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagramStatement {
    Service {
        id: String,
        label: String,
    },
    Topic {
        id: String,
        label: String,
        producers: usize,
        consumers: usize,
    },
    Edge {
        from: String,
        to: String,
        label: String,
    },
}

impl fmt::Display for DiagramStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagramStatement::Service { id, label } => {
                write!(f, "{}[\"📦 {}\"]", id, escape_label(label))
            }
            DiagramStatement::Topic {
                id,
                label,
                producers,
                consumers,
            } => write!(
                f,
                "{}((\"💬 {}<br/><small>P:{} C:{}</small>\"))",
                id,
                escape_label(label),
                producers,
                consumers
            ),
            DiagramStatement::Edge { from, to, label } => {
                write!(f, "{} -->|\"{}\"| {}", from, escape_label(label), to)
            }
        }
    }
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
///
/// Distinct names may sanitize to the same identifier; they are not told apart.
pub fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}

impl TopologyGraph {
    /// Render as a left-to-right Mermaid flowchart
    pub fn to_mermaid(&self) -> String {
        let statements = self.statements();
        let mut out = String::from("graph LR\n");

        // writing into a String cannot fail
        let _ = writeln!(out, "\n    %% Services");
        for st in statements
            .iter()
            .filter(|s| matches!(s, DiagramStatement::Service { .. }))
        {
            let _ = writeln!(out, "    {}", st);
        }

        let _ = writeln!(out, "\n    %% Topics");
        for st in statements
            .iter()
            .filter(|s| matches!(s, DiagramStatement::Topic { .. }))
        {
            let _ = writeln!(out, "    {}", st);
        }

        let _ = writeln!(out, "\n    %% Connections");
        for st in statements
            .iter()
            .filter(|s| matches!(s, DiagramStatement::Edge { .. }))
        {
            let _ = writeln!(out, "    {}", st);
        }

        let _ = writeln!(out, "\n    %% Styling");
        let _ = writeln!(out, "    {}", SERVICE_CLASS);
        let _ = writeln!(out, "    {}", TOPIC_CLASS);
        let _ = writeln!(out, "    {}", HOT_TOPIC_CLASS);
        for service in &self.services {
            let _ = writeln!(out, "    class {} serviceClass", service.id);
        }
        for node in self.topics.values() {
            let class = if node.is_hot() {
                "hotTopicClass"
            } else {
                "topicClass"
            };
            let _ = writeln!(out, "    class {} {}", node.id(), class);
        }

        out
    }
}
