//! Backend adapters: registry, per-backend descriptors, wire envelopes and the HTTP transport.

mod descriptor;
mod registry;
mod transport;
mod wire;

pub use descriptor::{
    AuthScheme, BackendDescriptor, CatalogSource, ModelCatalog, ModelInfo, ModelListing,
    RequestShape, ResponseShape,
};
pub use registry::{ProviderId, descriptors};
pub use transport::{InboundResponse, OutboundRequest, ReqwestTransport, Transport, TransportError};
