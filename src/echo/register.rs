use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use tonic::service::RoutesBuilder;
use tonic::transport::Endpoint;
use tower::BoxError;

use crate::echo::proto::{EchoClient, EchoReply, EchoRequest, EchoServer};
use crate::echo::service::EchoService;
use crate::lifecycle::Register;
use crate::runtime::{Forward, GatewayError, IncomingMetadata, PathParams, ServeMux};

/// Registers `echo.Echo` and its HTTP/JSON routes:
///
/// - `POST /v1/echo` with an `EchoRequest` JSON body
/// - `GET /v1/echo/{message}`
#[derive(Debug, Clone, Default)]
pub struct EchoRegister {
    service: EchoService,
}

impl EchoRegister {
    pub fn new(service: EchoService) -> Self {
        Self { service }
    }
}

impl Register for EchoRegister {
    fn grpc(&self, routes: &mut RoutesBuilder) {
        routes.add_service(EchoServer::new(self.service.clone()));
    }

    fn gateway(&self, mux: &mut ServeMux, endpoint: Endpoint) -> Result<(), BoxError> {
        let client = EchoClient::new(endpoint.connect_lazy());
        mux.route("/v1/echo", post(say_body).with_state(client.clone()))
            .route("/v1/echo/{message}", get(say_path).with_state(client));
        Ok(())
    }
}

async fn say_body(
    State(mut client): State<EchoClient>,
    metadata: IncomingMetadata,
    Json(request): Json<EchoRequest>,
) -> Result<Forward<EchoReply>, GatewayError> {
    let response = client.say(metadata.into_request(request)).await?;
    Ok(response.into())
}

async fn say_path(
    State(mut client): State<EchoClient>,
    params: PathParams,
    metadata: IncomingMetadata,
) -> Result<Forward<EchoReply>, GatewayError> {
    let message = params.get("message").unwrap_or_default().to_string();
    let response = client.say(metadata.into_request(EchoRequest { message })).await?;
    Ok(response.into())
}
