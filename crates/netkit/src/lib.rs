//! # netkit
//!
//! Typed cloud networking resource kinds for the graphkit engine: backend
//! services, health checks, network endpoint groups, forwarding rules, TCP
//! routes, target HTTP proxies, URL maps, and service meshes.
//!
//! Each kind supplies its schema (GA/beta/alpha), the field-trait table
//! steering diffs and writes, and the extraction of reference edges from its
//! body. The [`Factory`] builds graph node builders from dynamic input with
//! project and version resolved per service.

pub mod backend_service;
pub mod factory;
pub mod forwarding_rule;
pub mod health_check;
pub mod mesh;
pub mod network_endpoint_group;
pub mod target_http_proxy;
pub mod tcp_route;
pub mod url_map;

pub use backend_service::{Backend, BackendService, BackendServiceAlpha, BackendServiceKind, Iap};
pub use factory::{Factory, FactoryError, KINDS, Location};
pub use forwarding_rule::{ForwardingRule, ForwardingRuleKind};
pub use health_check::{HealthCheck, HealthCheckKind, HttpHealthCheck, TcpHealthCheck};
pub use mesh::{Mesh, MeshKind};
pub use network_endpoint_group::{NetworkEndpointGroup, NetworkEndpointGroupKind};
pub use target_http_proxy::{TargetHttpProxy, TargetHttpProxyKind};
pub use tcp_route::{
    TcpRoute, TcpRouteAction, TcpRouteDestination, TcpRouteKind, TcpRouteMatch, TcpRouteRule,
};
pub use url_map::{HostRule, PathMatcher, PathRule, UrlMap, UrlMapKind};
