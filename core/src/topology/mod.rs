// Topology aggregation
//
// Merges independently reported service descriptors into one publish/subscribe
// graph keyed by topic.

mod diagram;
mod stats;

pub use diagram::{sanitize, DiagramStatement};
pub use stats::TopologyStats;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{Direction, ServiceTopology};

/// Topics with at least this many connections are styled as hot
pub const HOT_TOPIC_CONNECTIONS: usize = 4;

/// One side of a topic connection
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub service: String,
    pub method: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceNode {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicNode {
    pub topic: String,
    pub producers: Vec<Endpoint>,
    pub consumers: Vec<Endpoint>,
}

impl TopicNode {
    fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            producers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    pub fn id(&self) -> String {
        sanitize(&format!("topic_{}", self.topic))
    }

    pub fn connection_count(&self) -> usize {
        self.producers.len() + self.consumers.len()
    }

    pub fn is_hot(&self) -> bool {
        self.connection_count() >= HOT_TOPIC_CONNECTIONS
    }

    fn record(&mut self, direction: Direction, endpoint: Endpoint) {
        let list = match direction {
            Direction::Outgoing => &mut self.producers,
            Direction::Incoming => &mut self.consumers,
            Direction::Unknown => return,
        };
        if !list.contains(&endpoint) {
            list.push(endpoint);
        }
    }
}

/// Unified publish/subscribe graph. Built fresh on every aggregation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyGraph {
    pub services: Vec<ServiceNode>,
    pub topics: IndexMap<String, TopicNode>,
}

impl TopologyGraph {
    /// Aggregate a slice of descriptors that are all present
    pub fn build(topologies: &[ServiceTopology]) -> Self {
        aggregate(topologies.iter().map(Some))
    }

    pub fn topic(&self, topic: &str) -> Option<&TopicNode> {
        self.topics.get(topic)
    }

    /// Node declarations followed by edge declarations
    pub fn statements(&self) -> Vec<DiagramStatement> {
        let mut statements = Vec::with_capacity(self.services.len() + self.topics.len());

        for service in &self.services {
            statements.push(DiagramStatement::Service {
                id: service.id.clone(),
                label: service.name.clone(),
            });
        }

        for node in self.topics.values() {
            statements.push(DiagramStatement::Topic {
                id: node.id(),
                label: node.topic.clone(),
                producers: node.producers.len(),
                consumers: node.consumers.len(),
            });
        }

        for node in self.topics.values() {
            let topic_id = node.id();
            for producer in &node.producers {
                statements.push(DiagramStatement::Edge {
                    from: sanitize(&producer.service),
                    to: topic_id.clone(),
                    label: producer.method.clone(),
                });
            }
            for consumer in &node.consumers {
                statements.push(DiagramStatement::Edge {
                    from: topic_id.clone(),
                    to: sanitize(&consumer.service),
                    label: consumer.method.clone(),
                });
            }
        }

        statements
    }
}

/// Merge per-service descriptors into a single graph.
///
/// Absent entries (failed remote fetches) are skipped. Services, topics and
/// connections keep the order in which they were first seen.
pub fn aggregate<'a, I>(topologies: I) -> TopologyGraph
where
    I: IntoIterator<Item = Option<&'a ServiceTopology>>,
{
    let mut graph = TopologyGraph::default();

    for topology in topologies.into_iter().flatten() {
        if !graph
            .services
            .iter()
            .any(|s| s.name == topology.service_name)
        {
            graph.services.push(ServiceNode {
                id: sanitize(&topology.service_name),
                name: topology.service_name.clone(),
            });
        }

        for channel in &topology.channels {
            if channel.direction == Direction::Unknown {
                tracing::debug!(
                    target: "topology",
                    service = %topology.service_name,
                    channel = %channel.channel_name,
                    "Skipping channel with unknown direction"
                );
                continue;
            }

            let topic = channel.resolved_topic();
            graph
                .topics
                .entry(topic.to_string())
                .or_insert_with(|| TopicNode::new(topic))
                .record(
                    channel.direction,
                    Endpoint {
                        service: topology.service_name.clone(),
                        method: channel.method_name.clone(),
                    },
                );
        }
    }

    graph
}
