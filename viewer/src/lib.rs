// Tapestry Viewer
//
// HTTP API over tapestry-core: the local topology, registered services,
// the aggregated diagram and schema-driven message forms.

mod api;

pub use api::{router, ViewerServer, ViewerState};
