//! Timers that work both in the browser and natively.

use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};

pub async fn sleep(duration: Duration) {
    #[cfg(target_family = "wasm")]
    gloo_timers::future::sleep(duration).await;
    #[cfg(not(target_family = "wasm"))]
    tokio::time::sleep(duration).await;
}

/// Ticks immediately, then once every `period`, forever.
pub fn ticks(period: Duration) -> impl Stream<Item = ()> {
    stream::once(async {}).chain(stream::unfold((), move |()| async move {
        sleep(period).await;
        Some(((), ()))
    }))
}
