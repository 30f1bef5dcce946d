use tonic::metadata::{KeyAndValueRef, MetadataKey};
use tonic::{Request, Response, Status};

use crate::echo::proto::{Echo, EchoReply, EchoRequest};

/// Request metadata with this prefix is returned as response metadata without it.
pub const ECHO_METADATA_PREFIX: &str = "echo-";

/// Replies with the request message and mirrors `echo-*` metadata.
#[derive(Debug, Clone, Default)]
pub struct EchoService;

#[tonic::async_trait]
impl Echo for EchoService {
    async fn say(&self, request: Request<EchoRequest>) -> Result<Response<EchoReply>, Status> {
        let (metadata, _, message) = request.into_parts();
        if message.message.is_empty() {
            return Err(Status::invalid_argument("message must not be empty"));
        }

        let mut response = Response::new(EchoReply {
            message: message.message,
        });
        for entry in metadata.iter() {
            let KeyAndValueRef::Ascii(key, value) = entry else {
                continue;
            };
            let Some(name) = key.as_str().strip_prefix(ECHO_METADATA_PREFIX) else {
                continue;
            };
            if let Ok(key) = MetadataKey::from_bytes(name.as_bytes()) {
                response.metadata_mut().append(key, value.clone());
            }
        }

        Ok(response)
    }
}
