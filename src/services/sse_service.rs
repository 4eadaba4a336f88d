//! Bridge from document subscription streams to SSE responses.

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt, stream::BoxStream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::dto::sse::ServerEvent;

/// Convert a subscription stream into an SSE response, forwarding events
/// until the client disconnects.
///
/// The forwarder task owns the subscription, so the subscription is dropped
/// (and the backend change feed cancelled) as soon as the response stream
/// goes away. `label` names the stream in teardown logs.
pub fn to_sse_stream(
    mut events: BoxStream<'static, ServerEvent>,
    buffer: usize,
    label: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(buffer.max(1));

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                next = events.next() => {
                    match next {
                        Some(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        // Subscription ended upstream; close the response.
                        None => break,
                    }
                }
            }
        }

        tracing::info!(stream = label, "SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
