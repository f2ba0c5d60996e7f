#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use oxide_dispatch::{Next, Request, Response, Result};

/// A shared, ordered record of what ran.
pub type Trail = Arc<Mutex<Vec<String>>>;

pub fn trail() -> Trail {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(trail: &Trail) -> Vec<String> {
    trail.lock().unwrap().clone()
}

pub async fn hello(_req: Request) -> Result<Response> {
    Ok(Response::text("hello"))
}

/// Responds with the handler's tag and echoes the `id` parameter, if any.
pub fn tagged(
    tag: &'static str,
) -> impl Fn(Request) -> std::future::Ready<Result<Response>> + Send + Sync + 'static {
    move |req: Request| {
        let body = match req.params.get("id") {
            Some(id) => format!("{tag}:{id}"),
            None => tag.to_string(),
        };
        std::future::ready(Ok(Response::text(body).header("X-Path", req.path)))
    }
}

/// Middleware recording "<name> in" / "<name> out" around the rest of the chain.
pub fn recorder(
    trail: &Trail,
    name: &'static str,
) -> impl Fn(Request, Next) -> oxide_dispatch::BoxFuture<'static, Result<Response>>
       + Send
       + Sync
       + 'static {
    let trail = Arc::clone(trail);
    move |req, next| {
        let trail = Arc::clone(&trail);
        Box::pin(async move {
            trail.lock().unwrap().push(format!("{name} in"));
            let res = next.run(req).await;
            trail.lock().unwrap().push(format!("{name} out"));
            res
        })
    }
}

pub fn body_of(res: &Response) -> String {
    res.body_string().unwrap_or_default()
}
