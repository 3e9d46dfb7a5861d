// HTTP clients
//
// DispatchClient is used by the gateway, GatewayClient by the chat loop.

mod dispatch_client;
mod gateway_client;

pub use dispatch_client::{DispatchClient, UpstreamError, UpstreamResponse};
pub use gateway_client::{GatewayClient, GatewayReply};
