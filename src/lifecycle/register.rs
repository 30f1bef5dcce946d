//! The user collaborator that attaches services to both servers.

use tonic::service::RoutesBuilder;
use tonic::transport::Endpoint;
use tower::BoxError;

use crate::runtime::ServeMux;

/// Registers RPC services and their transcoded HTTP routes.
pub trait Register: Send + Sync + 'static {
    /// Attach RPC services.
    fn grpc(&self, routes: &mut RoutesBuilder);

    /// Register transcoded routes on `mux`.
    ///
    /// `endpoint` dials the RPC server in cleartext; connect lazily so that
    /// registration does not wait for the server to accept. An error aborts
    /// startup.
    fn gateway(&self, mux: &mut ServeMux, endpoint: Endpoint) -> Result<(), BoxError>;
}
