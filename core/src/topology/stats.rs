use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Direction, ServiceTopology};

/// Summary counters shown next to the diagram
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyStats {
    pub services_count: usize,
    pub topics_count: usize,
    /// Outgoing channels across all services
    pub producers_count: usize,
    /// Incoming channels across all services
    pub consumers_count: usize,
}

impl TopologyStats {
    pub fn collect<'a, I>(topologies: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a ServiceTopology>>,
    {
        let mut stats = TopologyStats::default();
        let mut topics = HashSet::new();

        for topology in topologies.into_iter().flatten() {
            stats.services_count += 1;
            for channel in &topology.channels {
                topics.insert(channel.resolved_topic());
                match channel.direction {
                    Direction::Outgoing => stats.producers_count += 1,
                    Direction::Incoming => stats.consumers_count += 1,
                    Direction::Unknown => {}
                }
            }
        }

        stats.topics_count = topics.len();
        stats
    }
}
