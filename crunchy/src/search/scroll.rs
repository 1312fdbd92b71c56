//! Scroll-cursor iteration.

use futures::stream::{self, Stream, TryStreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use super::loader::Loader;
use super::response::Response;
use crate::context::Context;
use crate::engine::RenderedRequest;
use crate::error::{Error, Result};

/// Pages through a request with a server-side scroll cursor.
///
/// The cursor is released once the last page was fetched, on
/// [`close`](Scroll::close), or in the background when the scroll is dropped
/// early.
pub struct Scroll {
    context: Context,
    loader: Loader,
    keep_alive: String,
    initial: Option<RenderedRequest>,
    scroll_id: Option<String>,
    fetched: u64,
    done: bool,
}

impl Scroll {
    pub(crate) fn new(
        context: Context,
        request: RenderedRequest,
        loader: Loader,
        keep_alive: String,
    ) -> Self {
        Self {
            context,
            loader,
            keep_alive,
            initial: Some(request),
            scroll_id: None,
            fetched: 0,
            done: false,
        }
    }

    pub fn scroll_id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    /// Fetch the next batch, or `None` once every hit was seen.
    pub async fn next_page(&mut self) -> Result<Option<Response>> {
        if self.done {
            return Ok(None);
        }

        let engine = self.context.engine().clone();
        let reply = match (self.initial.take(), self.scroll_id.as_deref()) {
            (Some(request), _) => {
                debug!(index = ?request.index, keep_alive = %self.keep_alive, "Opening scroll");
                self.context.call(engine.search(&request)).await
            }
            (None, Some(scroll_id)) => {
                self.context
                    .call(engine.scroll(scroll_id, &self.keep_alive))
                    .await
            }
            (None, None) => {
                self.done = true;
                return Ok(None);
            }
        };

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                self.done = true;
                self.release().await;
                return Err(Error::RequestFailed(e));
            }
        };

        let page = Response::new(reply, self.loader.clone(), None);
        if let Some(scroll_id) = page.scroll_id() {
            self.scroll_id = Some(scroll_id.to_string());
        }

        let batch = page.hits().len() as u64;
        self.fetched += batch;
        debug!(batch, fetched = self.fetched, total = page.total(), "Fetched scroll page");

        if batch == 0 {
            self.done = true;
            self.release().await;
            return Ok(None);
        }
        if self.fetched >= page.total() || page.terminated_early() {
            self.done = true;
            self.release().await;
        }
        Ok(Some(page))
    }

    /// Release the cursor without reading further.
    pub async fn close(mut self) -> Result<()> {
        self.done = true;
        if let Some(scroll_id) = self.scroll_id.take() {
            let engine = self.context.engine().clone();
            self.context.call(engine.clear_scroll(&scroll_id)).await?;
            debug!(scroll_id = %scroll_id, "Closed scroll");
        }
        Ok(())
    }

    async fn release(&mut self) {
        if let Some(scroll_id) = self.scroll_id.take() {
            let engine = self.context.engine().clone();
            match self.context.call(engine.clear_scroll(&scroll_id)).await {
                Ok(()) => debug!(scroll_id = %scroll_id, "Released scroll"),
                Err(e) => warn!(scroll_id = %scroll_id, error = %e, "Failed to release scroll"),
            }
        }
    }

    /// Pages as a stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<Response>> {
        stream::try_unfold(self, |mut scroll| async move {
            Ok::<_, Error>(scroll.next_page().await?.map(|page| (page, scroll)))
        })
    }

    /// Raw hits of every page as one stream.
    pub fn into_hit_stream(self) -> impl Stream<Item = Result<Value>> {
        self.into_stream()
            .map_ok(|page| stream::iter(page.hits().to_vec().into_iter().map(Ok::<Value, Error>)))
            .try_flatten()
    }
}

impl Drop for Scroll {
    fn drop(&mut self) {
        let Some(scroll_id) = self.scroll_id.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let engine = self.context.engine().clone();
                handle.spawn(async move {
                    if let Err(e) = engine.clear_scroll(&scroll_id).await {
                        warn!(scroll_id = %scroll_id, error = %e, "Failed to release dropped scroll");
                    }
                });
            }
            Err(_) => {
                warn!(scroll_id = %scroll_id, "Scroll dropped outside a runtime, cursor left to expire");
            }
        }
    }
}

impl std::fmt::Debug for Scroll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scroll")
            .field("scroll_id", &self.scroll_id)
            .field("keep_alive", &self.keep_alive)
            .field("fetched", &self.fetched)
            .field("done", &self.done)
            .finish()
    }
}
