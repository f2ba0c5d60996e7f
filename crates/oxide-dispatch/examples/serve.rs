//! Serve Example
//!
//! Runs an oxide-dispatch server behind hyper.
//! Run with: cargo run --example serve
//! Then try:
//!   curl http://localhost:3000/user/42
//!   curl -X POST -H 'Content-Type: application/json' -d '{"x":1}' http://localhost:3000/submit
//!   curl http://localhost:3000/files/readme.txt

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request as HyperRequest, Response as HyperResponse, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_dispatch::{
    LoggingMiddleware, Method, Request, Response, Result, RouteConfig, RouterError, Server,
    ServerOptions,
};

async fn user_handler(req: Request) -> Result<Response> {
    let id = req.params.get("id").unwrap_or("unknown");
    Ok(Response::json(&serde_json::json!({ "id": id })))
}

async fn submit_handler(req: Request) -> Result<Response> {
    let body = req
        .parsed
        .as_ref()
        .and_then(|parsed| parsed.as_json())
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    Ok(Response::json(&serde_json::json!({ "received": body })).status(201))
}

fn files_server() -> Result<Server> {
    Server::new()
        .get("/", |_req| async { Ok(Response::text("index of /files")) })?
        .get("/:name", |req: Request| async move {
            let name = req.params.get("name").unwrap_or_default().to_string();
            if name.ends_with(".txt") {
                Ok(Response::text(format!("contents of {name}")))
            } else {
                Err(RouterError::handler(format!("cannot read {name}")))
            }
        })
}

fn build_server() -> Result<Server> {
    let options = ServerOptions::new()
        .default_header("X-Powered-By", "oxide-dispatch")
        .error_handler(|err, req| {
            warn!(path = %req.path, error = %err, "request failed");
            Response::error(500, "Something went wrong")
        });

    Server::with_options(options)?
        .middleware(LoggingMiddleware)
        .mount("/files", files_server()?)
        .get("/user/:id", user_handler)?
        .route_with(
            Method::Post,
            "/submit",
            submit_handler,
            RouteConfig::new()
                .parse_json()
                .validate(|req| Ok(req.parsed.is_some())),
        )?
        .options_route("*", |_req| async {
            Ok(Response::new(204).header("Allow", "GET, POST, OPTIONS"))
        })
}

async fn handle_request(
    req: HyperRequest<hyper::body::Incoming>,
    server: Arc<Server>,
) -> std::result::Result<HyperResponse<Full<Bytes>>, Infallible> {
    // A verb with no `Method` variant has no routes, same as an unregistered one.
    let Ok(method) = req.method().as_str().parse::<Method>() else {
        return Ok(into_hyper(Response::not_found()));
    };

    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), ToString::to_string);
    let mut oxide_req = Request::new(method, target);

    // Copy headers
    for (key, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            oxide_req.headers.insert(key.to_string(), v.to_string());
        }
    }

    // Read body
    let body_bytes = req
        .collect()
        .await
        .map(|b| b.to_bytes())
        .unwrap_or_default();
    oxide_req.body = body_bytes.to_vec();

    let oxide_res = server.dispatch(oxide_req).await;
    Ok(into_hyper(oxide_res))
}

fn into_hyper(oxide_res: Response) -> HyperResponse<Full<Bytes>> {
    let mut builder = HyperResponse::builder().status(
        StatusCode::from_u16(oxide_res.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    );

    for (key, value) in &oxide_res.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    builder
        .body(Full::new(Bytes::from(oxide_res.body)))
        .unwrap_or_else(|_| HyperResponse::new(Full::new(Bytes::new())))
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let addr: SocketAddr = ([127, 0, 0, 1], 3000).into();
    let server = Arc::new(build_server()?);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let server = Arc::clone(&server);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let server = Arc::clone(&server);
                handle_request(req, server)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(error = ?err, "error serving connection");
            }
        });
    }
}
