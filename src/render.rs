//! The seam to the external map renderer.
//!
//! A renderer is opened once per style, drawn to completion, captured and
//! torn down before the next style starts. Completion is an explicit signal
//! fired by the renderer's own "settled" event. Waiting on it is async, so
//! the settled callback can run on the same event loop as the export, and it
//! is raced against a delay supplied by the renderer's host.

use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::pin::pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{self, Either};
use image::RgbaImage;
use log::debug;

use crate::error::CompositionError;
use crate::style::{Color, MapStyle, StyleSource};
use crate::track::{Track, ViewState};

/// Everything a renderer needs to draw one poster.
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub track: &'a Track,
    pub view: ViewState,
    pub style: &'static MapStyle,
    pub source: StyleSource,
    pub trace_color: Color,
    pub line_width: f64,
    pub width: u32,
    pub height: u32,
}

pub trait Renderer {
    type Session: RenderSession;

    /// Start drawing `request`. The returned signal fires once drawing settles.
    fn open(&mut self, request: &RenderRequest<'_>) -> Result<(Self::Session, IdleSignal), CompositionError>;

    /// Completes after `duration`; bounds each wait for the settled signal.
    /// In the browser this is `browser_delay`.
    fn delay(&self, duration: Duration) -> impl Future<Output = ()>;
}

pub trait RenderSession {
    fn capture_map(&mut self) -> Result<RgbaImage, CompositionError>;

    /// The elevation chart, when the session draws one.
    fn capture_profile(&mut self) -> Result<Option<RgbaImage>, CompositionError> {
        Ok(None)
    }

    /// Release the viewport and everything bound to it.
    fn dispose(&mut self);
}

/// Owns a session and disposes of it when dropped, on every exit path.
pub struct ScopedSession<S: RenderSession> {
    inner: S,
}

impl<S: RenderSession> ScopedSession<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: RenderSession> Deref for ScopedSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: RenderSession> DerefMut for ScopedSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: RenderSession> Drop for ScopedSession<S> {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

/// Creates a linked notifier/signal pair for one render.
pub fn idle_channel() -> (IdleNotifier, IdleSignal) {
    let (tx, rx) = oneshot::channel();
    (
        IdleNotifier {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        IdleSignal { rx },
    )
}

/// Held by the renderer; call [`IdleNotifier::notify`] from its settled event.
#[derive(Debug, Clone)]
pub struct IdleNotifier {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl IdleNotifier {
    pub fn notify(&self) {
        // later settles after the first are the same event
        if let Ok(mut slot) = self.tx.lock() {
            if let Some(tx) = slot.take() {
                let _ = tx.send(());
            }
        }
    }
}

#[derive(Debug)]
pub struct IdleSignal {
    rx: oneshot::Receiver<()>,
}

impl IdleSignal {
    /// Resolves when the renderer settles, or fails once `delay` completes
    /// first. `timeout` is the duration `delay` was built from.
    pub async fn wait<D>(self, delay: D, timeout: Duration, style: &str) -> Result<(), CompositionError>
    where
        D: Future<Output = ()>,
    {
        let delay = pin!(delay);
        match future::select(self.rx, delay).await {
            Either::Left((Ok(()), _)) => {
                debug!("renderer settled for style '{style}'");
                Ok(())
            }
            Either::Left((Err(oneshot::Canceled), _)) => Err(CompositionError::RenderAborted {
                style: style.to_string(),
            }),
            Either::Right(((), _)) => Err(CompositionError::RenderTimeout {
                style: style.to_string(),
                waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

/// A `setTimeout`-backed delay for renderers living in the page.
#[cfg(target_arch = "wasm32")]
pub async fn browser_delay(duration: Duration) {
    let ms = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        match web_sys::window() {
            Some(window) => {
                let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
            }
            None => log::warn!("no window; render wait has no upper bound"),
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}
