//! Stamps an `ms` (elapsed handler time) field onto every JSON response
//! body, success or failure, so individual handlers never have to thread
//! a timer through (`spec.md` §7's `{ ok, error, ms }` error shape).

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;
use std::time::Instant;

pub async fn inject_elapsed_ms(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let response = next.run(req).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    let stamped = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(mut map)) => {
            map.insert("ms".to_string(), Value::from(elapsed_ms));
            serde_json::to_vec(&Value::Object(map)).unwrap_or_else(|_| bytes.to_vec())
        }
        _ => bytes.to_vec(),
    };

    Response::from_parts(parts, Body::from(stamped))
}
