//! Types and gRPC stubs generated from `proto/ext_authz.proto`.

#[allow(
    clippy::all,
    clippy::pedantic,
    non_camel_case_types,
    unused_imports,
    missing_docs
)]
mod generated {
    tonic::include_proto!("envoy.service.auth.v3");
}

pub use generated::*;
