// Copyright ⓒ 2024-2026 Siloq Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A thin `hyper` translator over [`crate::api::Broker`]: deserialises
//! the bodies in the external interface table, calls the core API, and
//! maps [`Error`] to the status codes that table specifies.

use std::{convert::Infallible, net::SocketAddr, time::{SystemTime, UNIX_EPOCH}};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode, body::Incoming, header};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use siloq_wal::Message;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    api::{Broker, ConsumeResult},
    error::Error,
    http::dto::{
        CommitData, CommitRequest, ConsumeBatchData, ConsumeSingleData, Envelope, ErrorEnvelope,
        IngressData, IngressRequest, MessageDto, RegisterData, RegisterRequest,
    },
};

type BoxBody = Full<Bytes>;

/// Accept connections on `addr` and serve them until `shutdown` is
/// cancelled.
pub async fn serve(broker: Broker, addr: SocketAddr, shutdown: CancellationToken) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(broker, listener, shutdown).await
}

/// Same as [`serve`] but over an already-bound listener, so tests can bind
/// an ephemeral port and learn its address before the accept loop starts.
async fn serve_on(broker: Broker, listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                let (stream, _) = accepted?;
                let io = TokioIo::new(stream);
                let broker = broker.clone();

                let _ = tokio::spawn(async move {
                    let service = hyper::service::service_fn(move |req| {
                        let broker = broker.clone();
                        async move { Ok::<_, Infallible>(route(broker, req).await) }
                    });

                    if let Err(error) = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        warn!(%error, "connection error");
                    }
                });
            }
        }
    }
}

async fn route(broker: Broker, req: Request<Incoming>) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let query = req.uri().query().unwrap_or("").to_owned();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (&method, segments.as_slice()) {
        (&Method::POST, ["ingress", topic_id]) => handle_ingress(broker, topic_id, req).await,
        (&Method::POST, ["register", topic_id]) => handle_register(broker, topic_id, req).await,
        (&Method::GET, ["consume", _broker_id, topic_id, partition_id]) => {
            handle_consume(broker, topic_id, partition_id, &query).await
        }
        (&Method::POST, ["commit"]) => handle_commit(broker, req).await,
        _ => error_response(StatusCode::NOT_FOUND, "NotFound", "no such route"),
    }
}

async fn handle_ingress(broker: Broker, topic_id: &str, req: Request<Incoming>) -> Response<BoxBody> {
    let payload: IngressRequest = match body_json(req).await {
        Ok(payload) => payload,
        Err(response) => return response,
    };

    let message = Message::new(topic_id, payload.message.message_id.clone(), payload.message.content);

    match broker.push(message).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &Envelope::ok(IngressData {
                message_id: payload.message.message_id,
                topic_id: topic_id.to_owned(),
                timestamp: now_millis(),
            }),
        ),
        Err(error) => error_for(&error),
    }
}

async fn handle_register(broker: Broker, topic_id: &str, req: Request<Incoming>) -> Response<BoxBody> {
    let payload: RegisterRequest = match body_json(req).await {
        Ok(payload) => payload,
        Err(response) => return response,
    };

    match broker.register_consumer(topic_id, &payload.consumer_id).await {
        Ok(partition_id) => json_response(
            StatusCode::OK,
            &Envelope::ok(RegisterData {
                topic_id: topic_id.to_owned(),
                broker_id: payload.broker_id,
                consumer_id: payload.consumer_id,
                partition_id,
            }),
        ),
        Err(error) => error_for(&error),
    }
}

async fn handle_consume(
    broker: Broker,
    topic_id: &str,
    partition_id: &str,
    query: &str,
) -> Response<BoxBody> {
    let Ok(partition_id) = partition_id.parse::<u32>() else {
        return error_response(StatusCode::BAD_REQUEST, "BadRequest", "invalid partitionId");
    };

    let batch = query.split('&').any(|pair| pair == "b=t");

    match broker.consume(topic_id, partition_id, batch).await {
        Ok(ConsumeResult::Batch(extracted)) => json_response(
            StatusCode::OK,
            &Envelope::ok(ConsumeBatchData {
                count: extracted.messages.len(),
                messages: extracted.messages.into_iter().map(MessageDto::from).collect(),
                start_offset: extracted.start_offset,
                end_offset: extracted.end_offset,
            }),
        ),
        Ok(ConsumeResult::Single { message, offset }) => json_response(
            StatusCode::OK,
            &Envelope::ok(ConsumeSingleData {
                count: usize::from(message.is_some()),
                message: message.map(MessageDto::from),
                offset,
            }),
        ),
        Err(error) => error_for(&error),
    }
}

async fn handle_commit(broker: Broker, req: Request<Incoming>) -> Response<BoxBody> {
    let payload: CommitRequest = match body_json(req).await {
        Ok(payload) => payload,
        Err(response) => return response,
    };

    match broker
        .commit(&payload.topic_id, payload.partition_id, payload.offset)
        .await
    {
        Ok(committed) => json_response(
            StatusCode::OK,
            &Envelope::ok(CommitData {
                committed: true,
                offset: payload.offset,
                topic_id: payload.topic_id,
                partition_id: payload.partition_id,
                consumer_id: payload.consumer_id,
                log_end_offset: committed.log_end_offset,
                new_read_offset: committed.new_read_offset,
            }),
        ),
        Err(error) => error_for(&error),
    }
}

async fn body_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T, Response<BoxBody>> {
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|error| error_response(StatusCode::BAD_REQUEST, "BadRequest", &error.to_string()))?
        .to_bytes();

    serde_json::from_slice(&bytes)
        .map_err(|error| error_response(StatusCode::BAD_REQUEST, "BadRequest", &error.to_string()))
}

fn error_for(error: &Error) -> Response<BoxBody> {
    let (status, code) = error_status(error);
    error_response(status, code, &error.to_string())
}

fn error_status(error: &Error) -> (StatusCode, &'static str) {
    match error {
        Error::Storage(siloq_storage::Error::BufferFull) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "BufferFull")
        }
        Error::Storage(siloq_storage::Error::AppendFailed(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "AppendFailed")
        }
        Error::Storage(siloq_storage::Error::InvalidOffset { .. }) => {
            (StatusCode::BAD_REQUEST, "InvalidOffset")
        }
        Error::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "StorageError"),
        Error::TopicNotFound(_) => (StatusCode::NOT_FOUND, "TopicNotFound"),
        Error::PartitionNotFound { .. } => (StatusCode::NOT_FOUND, "PartitionNotFound"),
        // 409 would be the closer fit; kept at 500 to match deployed clients.
        Error::NoPartitionAvailable(_) => (StatusCode::INTERNAL_SERVER_ERROR, "NoPartitionAvailable"),
        Error::Hyper(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Hyper"),
        Error::Json(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
        Error::Custom(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Custom"),
        Error::Unknown(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Unknown"),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(bytes)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response<BoxBody> {
    json_response(status, &ErrorEnvelope::new(code, message))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or_default()
}
