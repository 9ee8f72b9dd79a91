pub mod signal;

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server as TonicServer;
use tonic::{Request, Response, Status};

use crate::authz::{self, Decision, TESTED_HEADER};
use crate::proto::authorization_server::{Authorization, AuthorizationServer};
use crate::proto::{CheckRequest, CheckResponse};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("bind gRPC listener on '{addr}'")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("get local address of gRPC listener")]
    LocalAddr(#[source] io::Error),

    #[error("serve gRPC")]
    Serve(#[from] tonic::transport::Error),
}

/// The ext_authz v3 `Authorization` service. It holds no state, every check
/// is decided from the request alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtAuthzService;

impl ExtAuthzService {
    pub fn check_request(&self, req: &CheckRequest) -> CheckResponse {
        debug!("[gRPC v3] Check");
        match authz::find_header(req, TESTED_HEADER) {
            Some(value) => debug!("{TESTED_HEADER}: {value:?}"),
            None => debug!("{TESTED_HEADER}: <absent>"),
        }

        let decision = authz::decide(req);
        Self::log_decision(&decision, req);
        decision.into_check_response()
    }

    fn log_decision(decision: &Decision, req: &CheckRequest) {
        let (host, path) = match authz::http_attributes(req) {
            Some(http) => (http.host.as_str(), http.path.as_str()),
            None => ("", ""),
        };
        info!(
            "[gRPC v3][{}]: {host}{path}, attributes: {:?}",
            decision.label(),
            req.attributes
        );
    }
}

#[async_trait]
impl Authorization for ExtAuthzService {
    async fn check(
        &self,
        request: Request<CheckRequest>,
    ) -> Result<Response<CheckResponse>, Status> {
        let resp = self.check_request(request.get_ref());
        Ok(Response::new(resp))
    }
}

/// A gRPC server whose listener is already bound. Dropping it, or returning
/// from [`Server::listen_and_serve`], releases the port.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,

    service: ExtAuthzService,
}

impl Server {
    pub async fn bind(addr: SocketAddr) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        Ok(Self {
            listener,
            local_addr,
            service: ExtAuthzService,
        })
    }

    /// The address actually bound, useful when binding port 0.
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves check calls until `shutdown` resolves. Shutdown does not drain
    /// in-flight calls: the serve future is dropped and the listener with it.
    pub async fn listen_and_serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("Starting gRPC server at {}", self.local_addr);
        let incoming = TcpListenerStream::new(self.listener);
        let serve = TonicServer::builder()
            .add_service(AuthorizationServer::new(self.service))
            .serve_with_incoming(incoming);

        tokio::select! {
            result = serve => {
                result?;
                warn!("gRPC server exited without shutdown signal");
            }
            _ = shutdown => {
                info!("Stopping gRPC server at {}", self.local_addr);
            }
        }

        info!("Stopped gRPC server");
        Ok(())
    }
}
