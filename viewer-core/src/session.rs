//! Hit-test session bookkeeping.
//!
//! One slot per surface: a surface is either idle or listening with exactly
//! one click listener and one move listener registered on it. Each session
//! keeps a weak handle to its surface so the listeners can still be detached
//! after the surface is unbound or replaced in the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::event::ListenerId;
use crate::surface::{lock_surface, SharedSurface, Surface, SurfaceId};
use crate::{CanvasError, CanvasResult};

/// Hit-testing state of a single surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No listeners attached.
    Idle,
    /// Click and move listeners attached.
    Listening {
        /// Once-only click listener.
        click: ListenerId,
        /// Repeating move listener.
        moves: ListenerId,
    },
}

/// The listeners one hit-test session registered on a surface.
#[derive(Debug, Clone)]
pub struct Session {
    surface: Weak<Mutex<Surface>>,
    click: ListenerId,
    moves: ListenerId,
}

impl Session {
    /// Once-only click listener.
    #[must_use]
    pub fn click(&self) -> ListenerId {
        self.click
    }

    /// Repeating move listener.
    #[must_use]
    pub fn moves(&self) -> ListenerId {
        self.moves
    }

    /// The surface, if it is still alive.
    #[must_use]
    pub fn surface(&self) -> Option<SharedSurface> {
        self.surface.upgrade()
    }

    /// Remove both listeners from an already locked surface.
    pub fn detach(&self, surface: &mut Surface) {
        surface.remove_event_listener(self.click);
        surface.remove_event_listener(self.moves);
    }

    /// Lock the surface, if still alive, and remove both listeners.
    ///
    /// Must not be called while the caller holds the surface's lock.
    pub fn detach_from_surface(&self) {
        if let Some(shared) = self.surface() {
            self.detach(&mut lock_surface(&shared));
        }
    }
}

/// Per-surface hit-test sessions.
#[derive(Debug, Default)]
pub struct HitTestSessions {
    sessions: HashMap<SurfaceId, Session>,
}

impl HitTestSessions {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a surface's session.
    #[must_use]
    pub fn state(&self, surface: SurfaceId) -> SessionState {
        match self.sessions.get(&surface) {
            Some(session) => SessionState::Listening {
                click: session.click,
                moves: session.moves,
            },
            None => SessionState::Idle,
        }
    }

    /// Whether a surface is listening.
    #[must_use]
    pub fn is_listening(&self, surface: SurfaceId) -> bool {
        self.sessions.contains_key(&surface)
    }

    /// Fail if the surface is already listening.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::AlreadyListening`] for a listening surface.
    pub fn ensure_idle(&self, surface: SurfaceId) -> CanvasResult<()> {
        if self.is_listening(surface) {
            return Err(CanvasError::AlreadyListening(surface));
        }
        Ok(())
    }

    /// Record a newly started session on `handle`, whose ID is `surface`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::AlreadyListening`] if a session exists.
    pub fn begin(
        &mut self,
        surface: SurfaceId,
        handle: &SharedSurface,
        click: ListenerId,
        moves: ListenerId,
    ) -> CanvasResult<()> {
        self.ensure_idle(surface)?;
        self.sessions.insert(
            surface,
            Session {
                surface: Arc::downgrade(handle),
                click,
                moves,
            },
        );
        Ok(())
    }

    /// End a session, returning it if the surface was listening.
    ///
    /// The listeners stay registered until [`Session::detach`] is called.
    pub fn end(&mut self, surface: SurfaceId) -> Option<Session> {
        self.sessions.remove(&surface)
    }

    /// Surfaces currently listening.
    #[must_use]
    pub fn listening(&self) -> Vec<SurfaceId> {
        self.sessions.keys().copied().collect()
    }
}
