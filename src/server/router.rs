//! Route registration for model remote methods
//!
//! Every enabled binding of every public model becomes a route under the REST
//! root. Bindings sharing a path share one `MethodRouter`; a verb without a
//! binding on a known path, like any unknown path, answers a JSON 404.

use crate::core::error::{ApiError, RequestError};
use crate::core::method::HttpVerb;
use crate::core::model::MethodBinding;
use crate::remote::{Invocation, RemoteArgs, dispatch};
use crate::server::host::AppHost;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

type HostState = Arc<AppHost>;

/// Routes of every enabled remote method of every public model
pub fn build_model_routes(host: &AppHost) -> Router<HostState> {
    let root = host.settings.rest_root();
    let mut seen: HashSet<(String, HttpVerb)> = HashSet::new();
    let mut paths: IndexMap<String, MethodRouter<HostState>> = IndexMap::new();

    for model in host.models.public() {
        for binding in model.bindings() {
            let path = format!("{}{}", root, binding.path);
            if !seen.insert((path.clone(), binding.verb)) {
                tracing::warn!(
                    model = model.name(),
                    method = %binding.method,
                    "skipping duplicate route {} {}",
                    binding.verb,
                    path
                );
                continue;
            }

            tracing::debug!(model = model.name(), "route {} {}", binding.verb, path);

            let invocation = Arc::new(Invocation {
                model: model.name().to_string(),
                method: binding.method.clone(),
            });
            let method_router = match paths.shift_remove(&path) {
                Some(existing) => add_binding(existing, &binding, invocation),
                None => add_binding(MethodRouter::new(), &binding, invocation),
            };
            paths.insert(path, method_router);
        }
    }

    paths
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            router.route(&path, method_router.fallback(route_not_found))
        })
}

fn method_filter(verb: HttpVerb) -> MethodFilter {
    match verb {
        HttpVerb::Get => MethodFilter::GET,
        HttpVerb::Head => MethodFilter::HEAD,
        HttpVerb::Post => MethodFilter::POST,
        HttpVerb::Put => MethodFilter::PUT,
        HttpVerb::Patch => MethodFilter::PATCH,
        HttpVerb::Delete => MethodFilter::DELETE,
    }
}

/// Bind a handler whose extractors match the binding's path parameters
fn add_binding(
    router: MethodRouter<HostState>,
    binding: &MethodBinding,
    invocation: Arc<Invocation>,
) -> MethodRouter<HostState> {
    let filter = method_filter(binding.verb);

    match binding.path_params() {
        0 => router.on(
            filter,
            move |State(host): State<HostState>, uri: Uri, headers: HeaderMap, body: Bytes| {
                let invocation = invocation.clone();
                async move {
                    dispatch(host, invocation, RemoteArgs::new(None, None, uri, headers, body))
                        .await
                }
            },
        ),
        1 => router.on(
            filter,
            move |State(host): State<HostState>,
                  Path(id): Path<String>,
                  uri: Uri,
                  headers: HeaderMap,
                  body: Bytes| {
                let invocation = invocation.clone();
                async move {
                    dispatch(host, invocation, RemoteArgs::new(Some(id), None, uri, headers, body))
                        .await
                }
            },
        ),
        _ => router.on(
            filter,
            move |State(host): State<HostState>,
                  Path((id, fk)): Path<(String, String)>,
                  uri: Uri,
                  headers: HeaderMap,
                  body: Bytes| {
                let invocation = invocation.clone();
                async move {
                    let args = RemoteArgs::new(Some(id), Some(fk), uri, headers, body);
                    dispatch(host, invocation, args).await
                }
            },
        ),
    }
}

/// JSON 404 for requests no remote method handles
pub async fn route_not_found(method: Method, uri: Uri) -> Response {
    ApiError::from(RequestError::RouteNotFound {
        verb: method.to_string(),
        path: uri.path().to_string(),
    })
    .into_response()
}
