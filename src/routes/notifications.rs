use std::sync::Arc;

use axum::{
    extract::State,
    response::{sse::Event, IntoResponse, Sse},
    routing::get,
    Router,
};
use tokio::sync::broadcast::error::RecvError;

use crate::simulator::BroadcastNotifier;

// live feed of charge outcomes and resets, one SSE event per notification
async fn stream_notifications(State(notifier): State<Arc<BroadcastNotifier>>) -> impl IntoResponse {
    let receiver = notifier.subscribe();

    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(notification) => {
                    let event = Event::default()
                        .id(notification.id.to_string())
                        .event("notification")
                        .json_data(&notification);
                    return Some((event, receiver));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Notification subscriber lagged, skipped {skipped}");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("keep-alive-text"),
    )
}

pub fn notification_routes(notifier: Arc<BroadcastNotifier>) -> Router {
    Router::new()
        .route("/notifications", get(stream_notifications))
        .with_state(notifier)
}
