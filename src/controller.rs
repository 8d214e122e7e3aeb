//! # Session Controller Module
//!
//! Drives the conversation for every user: photo, then text, then any number of
//! adjustments, then the final download. Each inbound event is validated against
//! the stored session, applied to a copy of it, rendered, delivered, and only then
//! written back. A failed render or send leaves the stored session untouched.
//!
//! Events for one user are serialized through [`UserLocks`]; events for different
//! users run concurrently. Rendering runs on the blocking pool.

use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use crate::composition::{CompositionEngine, RenderArtifact, RenderRequest};
use crate::controls::{Action, ControlSurface, SizeMode};
use crate::errors::{InvalidInput, MissingState, RenderError, SessionError};
use crate::localization::t_lang;
use crate::photo_storage::{PhotoSource, PhotoStorage};
use crate::session::{EditSession, MessageRef, SessionDefaults, UserRef};
use crate::session_store::SessionStore;

/// Lock map size above which idle entries are pruned
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// Outbound primitives the controller needs from the messaging platform
pub trait Transport: Send + Sync {
    fn send_text(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<()>> + Send;

    fn send_photo(
        &self,
        chat_id: i64,
        photo: &Path,
        caption: &str,
        controls: &ControlSurface,
    ) -> impl Future<Output = Result<MessageRef>> + Send;

    /// Replace the image (and keyboard) of an already delivered message
    fn edit_photo(
        &self,
        message: MessageRef,
        photo: &Path,
        caption: &str,
        controls: &ControlSurface,
    ) -> impl Future<Output = Result<()>> + Send;

    fn send_document(
        &self,
        chat_id: i64,
        document: &Path,
        caption: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// One inbound event, already stripped of transport details
#[derive(Debug)]
pub enum InboundEvent<P> {
    PhotoUploaded { user: UserRef, photo: P },
    TextMessage { user: UserRef, text: String },
    ButtonPressed {
        user: UserRef,
        /// Message carrying the pressed keyboard, when the transport knows it
        message: Option<MessageRef>,
        action_id: String,
    },
}

impl<P> InboundEvent<P> {
    pub fn user(&self) -> &UserRef {
        match self {
            InboundEvent::PhotoUploaded { user, .. }
            | InboundEvent::TextMessage { user, .. }
            | InboundEvent::ButtonPressed { user, .. } => user,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            InboundEvent::PhotoUploaded { .. } => "photo",
            InboundEvent::TextMessage { .. } => "text",
            InboundEvent::ButtonPressed { .. } => "button",
        }
    }
}

/// Per-user async locks
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`
    pub async fn acquire(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            if locks.len() > LOCK_PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(user_id).or_default())
        };
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Controller behaviour that deployment may change
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub max_upload_bytes: u64,
    pub defaults: SessionDefaults,
    pub size_mode: SizeMode,
    pub clear_after_finalize: bool,
}

/// Conversation driver, generic over session persistence and transport
pub struct SessionController<S, T> {
    store: S,
    transport: T,
    engine: CompositionEngine,
    photos: PhotoStorage,
    config: ControllerConfig,
    locks: UserLocks,
    last_generation: AtomicU64,
}

fn storage_error(err: anyhow::Error) -> SessionError {
    SessionError::Storage(format!("{err:#}"))
}

fn transport_error(err: anyhow::Error) -> SessionError {
    SessionError::Transport(format!("{err:#}"))
}

impl<S: SessionStore, T: Transport> SessionController<S, T> {
    pub fn new(
        store: S,
        transport: T,
        engine: CompositionEngine,
        photos: PhotoStorage,
        config: ControllerConfig,
    ) -> Self {
        Self {
            store,
            transport,
            engine,
            photos,
            config,
            locks: UserLocks::new(),
            last_generation: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Dispatch one event, turning any failure into a user-visible reply
    ///
    /// Button presses return the reply so the transport can show it as an alert;
    /// other events get it as a chat message and return `None`.
    pub async fn handle_event<P: PhotoSource>(&self, event: InboundEvent<P>) -> Option<String> {
        let user = event.user().clone();
        let event_name = event.name();
        let is_button = matches!(event, InboundEvent::ButtonPressed { .. });

        let result = match event {
            InboundEvent::PhotoUploaded { user, photo } => {
                self.on_photo_received(&user, photo).await
            }
            InboundEvent::TextMessage { user, text } => self.on_text_received(&user, &text).await,
            InboundEvent::ButtonPressed {
                user,
                message,
                action_id,
            } => self.on_adjustment(&user, message, &action_id).await,
        };

        let err = match result {
            Ok(()) => return None,
            Err(err) => err,
        };

        if err.is_user_error() {
            warn!(
                user_id = user.user_id,
                event = event_name,
                kind = err.kind(),
                error = %err,
                "Event rejected"
            );
        } else {
            error!(
                user_id = user.user_id,
                event = event_name,
                kind = err.kind(),
                error = %err,
                "Event failed"
            );
        }

        let reply = err.user_message(user.lang());
        if is_button {
            return Some(reply);
        }
        if let Err(e) = self.transport.send_text(user.chat_id, &reply).await {
            error!(user_id = user.user_id, error = %e, "Failed to deliver error message");
        }
        None
    }

    /// Store a new photo and reset the session to await text
    pub async fn on_photo_received<P: PhotoSource>(
        &self,
        user: &UserRef,
        photo: P,
    ) -> Result<(), SessionError> {
        let limit = self.config.max_upload_bytes;
        let too_large =
            SessionError::Validation(InvalidInput::UploadTooLarge { limit_bytes: limit });

        let declared = photo.declared_size();
        if declared > limit {
            warn!(
                user_id = user.user_id,
                declared_bytes = declared,
                "Upload rejected before download"
            );
            return Err(too_large);
        }

        let _guard = self.locks.acquire(user.user_id).await;

        let bytes = photo.fetch().await.map_err(transport_error)?;
        if bytes.len() as u64 > limit {
            return Err(too_large);
        }
        if image::guess_format(&bytes).is_err() {
            return Err(SessionError::Validation(InvalidInput::UnsupportedFormat));
        }

        let previous = self.store.get(user.user_id).await.map_err(storage_error)?;
        let generation = self.next_generation(previous.as_ref().map(|s| s.generation));

        let path = self
            .photos
            .save(user.user_id, generation, &bytes)
            .await
            .map_err(storage_error)?;

        let mut session = EditSession::new(path.clone(), generation, &self.config.defaults);
        session.language_code = user.language_code.clone();
        if let Err(e) = self.store.put(user.user_id, session).await {
            self.photos.discard(&path).await;
            return Err(storage_error(e));
        }

        if let Some(previous) = previous {
            if previous.source_image() != &path {
                self.photos.discard(previous.source_image()).await;
            }
        }

        info!(
            user_id = user.user_id,
            generation,
            bytes = bytes.len(),
            "Photo stored, awaiting text"
        );

        self.transport
            .send_text(user.chat_id, &t_lang("prompt-send-text", user.lang()))
            .await
            .map_err(transport_error)
    }

    /// Set the logo text and deliver the first render
    pub async fn on_text_received(&self, user: &UserRef, text: &str) -> Result<(), SessionError> {
        let _guard = self.locks.acquire(user.user_id).await;

        let session = self
            .store
            .get(user.user_id)
            .await
            .map_err(storage_error)?
            .ok_or(SessionError::Precondition(MissingState::Photo))?;

        let mut updated = session.clone();
        updated.set_text(text, self.config.defaults.max_text_chars)?;

        let artifact = self.render(&updated, false).await?;
        let controls = self.controls(user);
        let sent = self
            .transport
            .send_photo(
                user.chat_id,
                artifact.path(),
                &t_lang("caption-rendered", user.lang()),
                &controls,
            )
            .await;
        artifact.discard();
        let message = sent.map_err(transport_error)?;

        info!(user_id = user.user_id, chars = updated.text.chars().count(), "Logo text set");

        updated.output_message = Some(message);
        updated.touch();
        self.commit(user.user_id, updated).await
    }

    /// Apply one button press and re-render in place
    pub async fn on_adjustment(
        &self,
        user: &UserRef,
        message: Option<MessageRef>,
        action_id: &str,
    ) -> Result<(), SessionError> {
        let adjustment = match Action::parse(action_id) {
            Some(Action::Adjust(adjustment)) => adjustment,
            Some(Action::Finalize) => return self.on_finalize(user).await,
            None => {
                return Err(SessionError::Validation(InvalidInput::UnknownAction(
                    action_id.to_string(),
                )))
            }
        };

        let _guard = self.locks.acquire(user.user_id).await;

        let session = self
            .store
            .get(user.user_id)
            .await
            .map_err(storage_error)?
            .ok_or(SessionError::Precondition(MissingState::Photo))?;

        let mut updated = session.clone();
        let fonts = self.engine.fonts();
        updated.apply(&adjustment, |id| fonts.contains(id))?;
        debug!(user_id = user.user_id, ?adjustment, "Adjustment applied");

        let artifact = self.render(&updated, false).await?;
        let controls = self.controls(user);
        let caption = t_lang("caption-updated", user.lang());

        let delivered = match message.or(updated.output_message) {
            Some(target) => self
                .transport
                .edit_photo(target, artifact.path(), &caption, &controls)
                .await
                .map(|()| target),
            None => {
                self.transport
                    .send_photo(user.chat_id, artifact.path(), &caption, &controls)
                    .await
            }
        };
        artifact.discard();
        updated.output_message = Some(delivered.map_err(transport_error)?);

        updated.touch();
        self.commit(user.user_id, updated).await
    }

    /// Send the flattened final image as a document
    pub async fn on_finalize(&self, user: &UserRef) -> Result<(), SessionError> {
        let _guard = self.locks.acquire(user.user_id).await;

        let session = self
            .store
            .get(user.user_id)
            .await
            .map_err(storage_error)?
            .ok_or(SessionError::Precondition(MissingState::Photo))?;
        if session.text.is_empty() {
            return Err(SessionError::Precondition(MissingState::Text));
        }

        let artifact = self.render(&session, true).await?;
        let sent = self
            .transport
            .send_document(
                user.chat_id,
                artifact.path(),
                &t_lang("caption-final", user.lang()),
            )
            .await;
        artifact.discard();
        sent.map_err(transport_error)?;

        info!(user_id = user.user_id, generation = session.generation, "Final logo delivered");

        if self.config.clear_after_finalize {
            self.store.remove(user.user_id).await.map_err(storage_error)?;
            self.photos.discard(session.source_image()).await;
        } else {
            let mut session = session;
            session.touch();
            self.commit(user.user_id, session).await?;
        }
        Ok(())
    }

    /// Drop sessions idle for longer than `ttl` along with their photos
    pub async fn evict_idle(&self, ttl: chrono::Duration) -> Result<usize> {
        let cutoff = Utc::now() - ttl;
        let evicted = self.store.evict_idle(cutoff).await?;
        for session in &evicted {
            self.photos.discard(session.source_image()).await;
        }
        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted idle sessions");
        }
        Ok(evicted.len())
    }

    /// Upload generations are never reused, even after the session was removed
    ///
    /// Seeded from the wall clock in microseconds so that processes sharing a
    /// store do not hand out the same value, and kept strictly increasing within
    /// this process and above the stored session's generation.
    fn next_generation(&self, stored: Option<u64>) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0);
        let floor = stored.map_or(0, |g| g.saturating_add(1));
        let mut last = self.last_generation.load(Ordering::Relaxed);
        loop {
            let next = now.max(floor).max(last.saturating_add(1));
            match self.last_generation.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    fn controls(&self, user: &UserRef) -> ControlSurface {
        ControlSurface::adjustment(
            &self.engine.fonts().choices(),
            self.config.size_mode,
            self.engine.options().blur_enabled,
            user.lang(),
        )
    }

    async fn render(
        &self,
        session: &EditSession,
        final_output: bool,
    ) -> Result<RenderArtifact, SessionError> {
        let source = self
            .photos
            .read(session.source_image())
            .await
            .map_err(|e| SessionError::Render(RenderError::Io(format!("{e:#}"))))?;
        let request = RenderRequest::from_session(session, source);
        let engine = self.engine.clone();

        let artifact = tokio::task::spawn_blocking(move || {
            if final_output {
                engine.render_final(&request)
            } else {
                engine.render_preview(&request)
            }
        })
        .await
        .map_err(|e| SessionError::Render(RenderError::Io(format!("render task failed: {e}"))))??;

        Ok(artifact)
    }

    /// Write `session` back unless a newer photo replaced it meanwhile
    async fn commit(&self, user_id: i64, session: EditSession) -> Result<(), SessionError> {
        let current = self.store.get(user_id).await.map_err(storage_error)?;
        match current {
            Some(current) if current.generation == session.generation => self
                .store
                .put(user_id, session)
                .await
                .map_err(storage_error),
            _ => {
                debug!(
                    user_id,
                    generation = session.generation,
                    "Discarding update for superseded session"
                );
                Ok(())
            }
        }
    }
}
