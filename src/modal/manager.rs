//! Modal session manager
//!
//! The manager owns a single session slot. A session pairs the caller's
//! content with the sending half of a one-shot channel; the caller keeps the
//! receiving half as a [`PendingResult`]. Closing sends on the channel once,
//! unmounts the chrome, and queues the content for release on the next
//! [`ModalManager::flush_deferred`] call (the next turn of the event loop).
//!
//! The slot is shared by every result type. [`ModalHandle<T>`] is the typed
//! view callers use to open and close.

use super::{
    chrome::DialogChrome,
    dom::{lock_document, ElementId, ElementTree, SharedDocument},
    types::{
        ChromeConfig, ChromeOutcome, DismissSource, ModalContent, ModalError, ModalEvent,
        ModalResult, PointerDown, SessionId,
    },
};
use crate::tui::{components::Component, styles::Theme, Frame};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyEvent, KeyEventKind, MouseEvent};
use ratatui::layout::Rect;
use std::{
    any::{Any, TypeId},
    future::Future,
    marker::PhantomData,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

type AnyResult = Box<dyn Any + Send>;

/// Result type a session was opened for
#[derive(Debug, Clone, Copy)]
struct ResultType {
    id: TypeId,
    name: &'static str,
}

impl ResultType {
    fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

/// Content with its result type erased so one slot can hold any session
trait ErasedContent: Send {
    fn mount(&mut self, tree: &mut ElementTree, panel: ElementId) -> ModalResult<()>;
    fn handle_key_event(
        &mut self,
        key: KeyEvent,
        focused: Option<ElementId>,
        manager: &ModalManager,
    ) -> Result<bool>;
    fn handle_mouse_event(&mut self, event: MouseEvent, manager: &ModalManager) -> Result<bool>;
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, focused: Option<ElementId>);
    fn preferred_size(&self) -> (u16, u16);
}

struct TypedContent<T, C> {
    content: C,
    _result: PhantomData<fn() -> T>,
}

impl<T, C> ErasedContent for TypedContent<T, C>
where
    T: Send + 'static,
    C: ModalContent<T>,
{
    fn mount(&mut self, tree: &mut ElementTree, panel: ElementId) -> ModalResult<()> {
        self.content.mount(tree, panel)
    }

    fn handle_key_event(
        &mut self,
        key: KeyEvent,
        focused: Option<ElementId>,
        manager: &ModalManager,
    ) -> Result<bool> {
        self.content.handle_key_event(key, focused, &manager.handle::<T>())
    }

    fn handle_mouse_event(&mut self, event: MouseEvent, manager: &ModalManager) -> Result<bool> {
        self.content.handle_mouse_event(event, &manager.handle::<T>())
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, focused: Option<ElementId>) {
        self.content.render(frame, area, theme, focused)
    }

    fn preferred_size(&self) -> (u16, u16) {
        self.content.preferred_size()
    }
}

/// One open-to-close cycle
struct ModalSession {
    id: SessionId,
    /// `None` while lent out to an event handler
    content: Option<Box<dyn ErasedContent>>,
    /// Only values of this type may close the session
    result_type: ResultType,
    /// Taken on first close; later closes find nothing to resolve
    resolver: Option<oneshot::Sender<Option<AnyResult>>>,
    is_open: bool,
    /// Present exactly while `is_open`
    chrome: Option<DialogChrome>,
}

struct ManagerState {
    session: Option<ModalSession>,
    next_session: u64,
    pending_release: Vec<SessionId>,
    default_chrome: ChromeConfig,
    event_sender: Option<mpsc::UnboundedSender<ModalEvent>>,
    size: Rect,
}

impl ManagerState {
    fn open_session_mut(&mut self) -> Option<&mut ModalSession> {
        self.session.as_mut().filter(|session| session.is_open)
    }

    fn send_event(&self, event: ModalEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }
}

/// Single-slot modal provider; clones share the same slot
#[derive(Clone)]
pub struct ModalManager {
    state: Arc<Mutex<ManagerState>>,
    document: SharedDocument,
}

impl ModalManager {
    /// Create a manager mounting dialogs into `document`
    pub fn new(document: SharedDocument) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManagerState {
                session: None,
                next_session: 0,
                pending_release: Vec::new(),
                default_chrome: ChromeConfig::default(),
                event_sender: None,
                size: Rect::default(),
            })),
            document,
        }
    }

    /// Chrome options used by [`ModalHandle::open`]
    pub fn with_chrome_config(self, config: ChromeConfig) -> Self {
        self.lock().default_chrome = config;
        self
    }

    /// Set the channel receiving lifecycle notifications
    pub fn set_event_sender(&self, sender: mpsc::UnboundedSender<ModalEvent>) {
        self.lock().event_sender = Some(sender);
    }

    /// Typed view for results of type `T`
    pub fn handle<T: Send + 'static>(&self) -> ModalHandle<T> {
        ModalHandle {
            manager: self.clone(),
            _result: PhantomData,
        }
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// Whether a session is mounted and awaiting resolution
    pub fn is_open(&self) -> bool {
        self.lock().session.as_ref().is_some_and(|session| session.is_open)
    }

    /// Session currently occupying the slot, open or awaiting release
    pub fn active_session(&self) -> Option<SessionId> {
        self.lock().session.as_ref().map(|session| session.id)
    }

    /// Whether the slot still holds a content reference
    pub fn has_content(&self) -> bool {
        self.lock().session.is_some()
    }

    /// Panel element of the open session
    pub fn panel(&self) -> Option<ElementId> {
        self.lock()
            .open_session_mut()
            .and_then(|session| session.chrome.as_ref())
            .map(DialogChrome::panel)
    }

    /// Backdrop element of the open session
    pub fn backdrop(&self) -> Option<ElementId> {
        self.lock()
            .open_session_mut()
            .and_then(|session| session.chrome.as_ref())
            .map(DialogChrome::backdrop)
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_erased(
        &self,
        mut content: Box<dyn ErasedContent>,
        result_type: ResultType,
        config: Option<ChromeConfig>,
    ) -> ModalResult<(SessionId, oneshot::Receiver<Option<AnyResult>>)> {
        let config = {
            let state = self.lock();
            if let Some(active) = state.session.as_ref().filter(|session| session.is_open) {
                warn!(active = %active.id, "Rejected open: a modal is already open");
                return Err(ModalError::AlreadyOpen { active: active.id });
            }
            config.unwrap_or_else(|| state.default_chrome.clone())
        };

        // Content runs unlocked from here on; a failed mount drops the chrome
        // and the content without the manager lock held
        let chrome = DialogChrome::mount(&self.document, config)?;
        let mounted = {
            let mut doc = lock_document(&self.document);
            content.mount(doc.tree_mut(), chrome.panel())
        };
        if let Err(err) = mounted {
            warn!("Modal content failed to mount: {}", err);
            return Err(err);
        }

        let mut state = self.lock();
        if let Some(active) = state.session.as_ref().filter(|session| session.is_open) {
            let active = active.id;
            drop(state);
            warn!(%active, "Rejected open: another modal opened first");
            return Err(ModalError::AlreadyOpen { active });
        }

        state.next_session += 1;
        let id = SessionId(state.next_session);
        let (resolver, receiver) = oneshot::channel();

        let superseded = state.session.replace(ModalSession {
            id,
            content: Some(content),
            result_type,
            resolver: Some(resolver),
            is_open: true,
            chrome: Some(chrome),
        });

        debug!(session = %id, "Opened modal");
        state.send_event(ModalEvent::Opened { session: id });
        drop(state);

        if let Some(previous) = superseded {
            debug!(previous = %previous.id, "Closed session superseded before release");
        }
        Ok((id, receiver))
    }

    fn close_erased(
        &self,
        value: Option<(AnyResult, ResultType)>,
        source: DismissSource,
    ) -> bool {
        let mut state = self.lock();
        let Some(session) = state.open_session_mut() else {
            debug!(?source, "Close ignored: no open modal");
            return false;
        };

        if let Some((_, offered)) = &value {
            if offered.id != session.result_type.id {
                warn!(
                    session = %session.id,
                    expected = session.result_type.name,
                    offered = offered.name,
                    "Close rejected: result has the wrong type"
                );
                return false;
            }
        }

        let undelivered = session
            .resolver
            .take()
            .and_then(|resolver| resolver.send(value.map(|(value, _)| value)).err());
        if undelivered.is_some() {
            debug!(session = %session.id, "Result receiver already dropped");
        }
        session.is_open = false;
        drop(session.chrome.take());

        let id = session.id;
        state.pending_release.push(id);
        debug!(session = %id, ?source, "Closed modal");
        state.send_event(ModalEvent::Closed { session: id, source });

        // An undelivered value belongs to the caller; drop it unlocked
        drop(state);
        drop(undelivered);
        true
    }

    /// Release content of sessions closed since the last call.
    ///
    /// A queued release only clears the slot if the slot still holds that
    /// closed session; a session opened in the meantime is left alone.
    pub fn flush_deferred(&self) -> usize {
        let released = {
            let mut state = self.lock();
            let pending = std::mem::take(&mut state.pending_release);
            let mut released = Vec::new();

            for id in pending {
                let releasable = state
                    .session
                    .as_ref()
                    .is_some_and(|session| session.id == id && !session.is_open);
                if !releasable {
                    debug!(session = %id, "Skipping release; slot holds a newer session");
                    continue;
                }
                if let Some(session) = state.session.take() {
                    debug!(session = %id, "Released modal content");
                    state.send_event(ModalEvent::Released { session: id });
                    released.push(session);
                }
            }
            released
        };

        released.len()
    }

    /// Run `f` on the open session's content with the manager unlocked
    fn with_content<R>(
        &self,
        f: impl FnOnce(&mut dyn ErasedContent, Option<ElementId>, &ModalManager) -> Result<R>,
    ) -> Result<Option<R>> {
        let (id, mut content, focused) = {
            let mut state = self.lock();
            let Some(session) = state.open_session_mut() else {
                return Ok(None);
            };
            let Some(content) = session.content.take() else {
                return Ok(None);
            };
            let focused = lock_document(&self.document).active_element();
            (session.id, content, focused)
        };

        let result = f(content.as_mut(), focused, self);
        self.return_content(id, content);
        result.map(Some)
    }

    /// Put lent-out content back into its session. Content whose session left
    /// the slot meanwhile is dropped after the lock is released.
    fn return_content(&self, id: SessionId, content: Box<dyn ErasedContent>) {
        let orphaned = {
            let mut state = self.lock();
            match state.session.as_mut().filter(|session| session.id == id) {
                Some(session) => {
                    session.content = Some(content);
                    None
                }
                None => Some(content),
            }
        };
        drop(orphaned);
    }

    fn apply_outcome(&self, outcome: ChromeOutcome) -> bool {
        match outcome {
            ChromeOutcome::RequestClose(source) => {
                self.close_erased(None, source);
                true
            }
            ChromeOutcome::Handled => true,
            ChromeOutcome::Ignored => false,
        }
    }

    /// Route a key press through the chrome, then the content.
    ///
    /// Returns whether a modal was open; an open modal swallows every key.
    pub fn process_key(&self, key: KeyEvent) -> Result<bool> {
        let outcome = {
            let mut state = self.lock();
            let Some(chrome) = state.open_session_mut().and_then(|s| s.chrome.as_mut()) else {
                return Ok(false);
            };
            if key.kind == KeyEventKind::Release {
                return Ok(true);
            }
            chrome.handle_key(key)
        };

        if !self.apply_outcome(outcome) {
            self.with_content(|content, focused, manager| {
                content.handle_key_event(key, focused, manager)
            })?;
        }
        Ok(true)
    }

    /// Route a terminal mouse event; returns whether a modal was open
    pub fn process_mouse(&self, event: MouseEvent) -> Result<bool> {
        let outcome = {
            let mut state = self.lock();
            let Some(chrome) = state.open_session_mut().and_then(|s| s.chrome.as_mut()) else {
                return Ok(false);
            };
            chrome.handle_mouse_event(event)
        };

        if !self.apply_outcome(outcome) {
            self.with_content(|content, _, manager| content.handle_mouse_event(event, manager))?;
        }
        Ok(true)
    }

    /// Route a pointer-down with a known target; returns whether a modal was open
    pub fn pointer_down(&self, event: PointerDown) -> bool {
        let outcome = {
            let mut state = self.lock();
            let Some(chrome) = state.open_session_mut().and_then(|s| s.chrome.as_mut()) else {
                return false;
            };
            chrome.handle_pointer_down(event.target)
        };
        self.apply_outcome(outcome);
        true
    }

    /// Draw the open session, if any, over whatever is already in the frame.
    ///
    /// The content is lent out of the slot for the size query and the render
    /// so that it may use its handle from either.
    pub fn draw(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let (id, content) = {
            let mut state = self.lock();
            let Some(session) = state.open_session_mut() else {
                return;
            };
            (session.id, session.content.take())
        };
        let Some(mut content) = content else {
            // Already lent out to a handler further up the stack
            self.draw_chrome(id, frame, area, theme, (48, 12));
            return;
        };

        let preferred = content.preferred_size();
        if let Some(content_area) = self.draw_chrome(id, frame, area, theme, preferred) {
            let focused = lock_document(&self.document).active_element();
            content.render(frame, content_area, theme, focused);
        }
        self.return_content(id, content);
    }

    /// Render the chrome of session `id` if it is still open; returns the content area
    fn draw_chrome(
        &self,
        id: SessionId,
        frame: &mut Frame,
        area: Rect,
        theme: &Theme,
        preferred: (u16, u16),
    ) -> Option<Rect> {
        let mut state = self.lock();
        let chrome = state
            .open_session_mut()
            .filter(|session| session.id == id)?
            .chrome
            .as_mut()?;
        Some(chrome.render(frame, area, theme, preferred))
    }
}

impl std::fmt::Debug for ModalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ModalManager")
            .field("session", &state.session.as_ref().map(|s| (s.id, s.is_open)))
            .field("pending_release", &state.pending_release)
            .finish()
    }
}

#[async_trait]
impl Component for ModalManager {
    async fn handle_key_event(&mut self, event: KeyEvent) -> Result<()> {
        self.process_key(event).map(|_| ())
    }

    async fn handle_mouse_event(&mut self, event: MouseEvent) -> Result<()> {
        self.process_mouse(event).map(|_| ())
    }

    async fn tick(&mut self) -> Result<()> {
        self.flush_deferred();
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        self.draw(frame, area, theme);
    }

    fn size(&self) -> Rect {
        self.lock().size
    }

    fn set_size(&mut self, size: Rect) {
        self.lock().size = size;
    }

    fn has_focus(&self) -> bool {
        self.is_open()
    }

    fn is_visible(&self) -> bool {
        self.is_open()
    }
}

/// Typed access to the modal slot for results of type `T`
pub struct ModalHandle<T> {
    manager: ModalManager,
    _result: PhantomData<fn(T) -> T>,
}

impl<T> Clone for ModalHandle<T> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            _result: PhantomData,
        }
    }
}

impl<T: Send + 'static> ModalHandle<T> {
    /// Show `content` with the manager's default chrome options
    pub fn open<C>(&self, content: C) -> ModalResult<PendingResult<T>>
    where
        C: ModalContent<T> + 'static,
    {
        self.open_inner(content, None)
    }

    /// Show `content` with session-specific chrome options
    pub fn open_with<C>(&self, content: C, config: ChromeConfig) -> ModalResult<PendingResult<T>>
    where
        C: ModalContent<T> + 'static,
    {
        self.open_inner(content, Some(config))
    }

    fn open_inner<C>(
        &self,
        content: C,
        config: Option<ChromeConfig>,
    ) -> ModalResult<PendingResult<T>>
    where
        C: ModalContent<T> + 'static,
    {
        let content = Box::new(TypedContent {
            content,
            _result: PhantomData::<fn() -> T>,
        });
        let (session, receiver) = self
            .manager
            .open_erased(content, ResultType::of::<T>(), config)?;
        Ok(PendingResult {
            session,
            receiver,
            _result: PhantomData,
        })
    }

    /// Resolve the open session with `value`.
    ///
    /// A no-op when nothing is open. A value is refused, leaving the session
    /// open, when the session was opened for another result type.
    pub fn close(&self, value: Option<T>) {
        let value = value.map(|value| (Box::new(value) as AnyResult, ResultType::of::<T>()));
        self.manager.close_erased(value, DismissSource::Explicit);
    }

    /// Resolve the open session without a result
    pub fn dismiss(&self) {
        self.close(None);
    }

    pub fn is_open(&self) -> bool {
        self.manager.is_open()
    }
}

/// Future resolving to the value the session was closed with
#[must_use = "the modal result is delivered through this future"]
pub struct PendingResult<T> {
    session: SessionId,
    receiver: oneshot::Receiver<Option<AnyResult>>,
    _result: PhantomData<fn() -> T>,
}

impl<T> PendingResult<T> {
    pub fn session(&self) -> SessionId {
        self.session
    }
}

impl<T: 'static> Future for PendingResult<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let session = self.session;
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(Some(value))) => Poll::Ready(match value.downcast::<T>() {
                Ok(value) => Some(*value),
                Err(_) => {
                    warn!(
                        %session,
                        expected = std::any::type_name::<T>(),
                        "Modal closed with a value of another type"
                    );
                    None
                }
            }),
            Poll::Ready(Ok(None)) => Poll::Ready(None),
            Poll::Ready(Err(_)) => {
                debug!(%session, "Modal manager dropped before the session closed");
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modal::{
        dom::{Document, Element, Overflow},
        focus::focusable_elements,
    };
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers, MouseButton, MouseEventKind};
    use futures::FutureExt;
    use ratatui::{backend::TestBackend, widgets::Paragraph, Terminal};

    /// Two buttons; Enter closes with `value`, `x` fails
    struct Scripted {
        value: String,
        keys: Arc<Mutex<Vec<KeyCode>>>,
    }

    impl Scripted {
        fn new(value: &str) -> Self {
            Self {
                value: value.to_string(),
                keys: Arc::default(),
            }
        }
    }

    impl ModalContent<String> for Scripted {
        fn mount(&mut self, tree: &mut ElementTree, panel: ElementId) -> ModalResult<()> {
            tree.append_child(panel, Element::text("Scripted").with_dom_id("modal-title"))?;
            tree.append_child(panel, Element::button("one"))?;
            tree.append_child(panel, Element::button("two"))?;
            Ok(())
        }

        fn handle_key_event(
            &mut self,
            key: KeyEvent,
            _focused: Option<ElementId>,
            modal: &ModalHandle<String>,
        ) -> Result<bool> {
            self.keys.lock().unwrap().push(key.code);
            match key.code {
                KeyCode::Enter => {
                    modal.close(Some(self.value.clone()));
                    Ok(true)
                }
                KeyCode::Char('x') => Err(anyhow::anyhow!("content failure")),
                _ => Ok(false),
            }
        }

        fn render(
            &mut self,
            frame: &mut Frame,
            area: Rect,
            _theme: &Theme,
            _focused: Option<ElementId>,
        ) {
            frame.render_widget(Paragraph::new("scripted body"), area);
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn manager() -> ModalManager {
        ModalManager::new(Document::new().shared())
    }

    #[tokio::test]
    async fn test_result_pending_until_close() {
        let manager = manager();
        let modal = manager.handle::<String>();
        let mut pending = modal.open(Scripted::new("unused")).unwrap();

        assert!(modal.is_open());
        assert!((&mut pending).now_or_never().is_none());

        modal.close(Some("first".to_string()));
        modal.close(Some("second".to_string()));

        assert!(!modal.is_open());
        assert_eq!(pending.await, Some("first".to_string()));
    }

    #[tokio::test]
    async fn test_open_rejected_while_open() {
        let manager = manager();
        let modal = manager.handle::<String>();
        let pending = modal.open(Scripted::new("a")).unwrap();
        let first = pending.session();

        let err = modal.open(Scripted::new("b")).err().unwrap();
        assert!(matches!(err, ModalError::AlreadyOpen { active } if active == first));
        assert_eq!(manager.active_session(), Some(first));

        modal.close(Some("done".to_string()));
        assert_eq!(pending.await, Some("done".to_string()));
    }

    #[test]
    fn test_close_without_session_is_noop() {
        let manager = manager();
        let modal = manager.handle::<String>();
        modal.close(Some("nobody".to_string()));
        modal.dismiss();
        assert!(!modal.is_open());
        assert_eq!(manager.flush_deferred(), 0);
    }

    #[tokio::test]
    async fn test_escape_resolves_none() {
        let manager = manager();
        let modal = manager.handle::<String>();
        let pending = modal.open(Scripted::new("value")).unwrap();

        assert!(manager.process_key(key(KeyCode::Esc)).unwrap());
        assert!(!modal.is_open());
        assert_eq!(pending.await, None);
    }

    #[tokio::test]
    async fn test_escape_disabled_reaches_content() {
        let manager = manager();
        let modal = manager.handle::<String>();
        let content = Scripted::new("value");
        let keys = content.keys.clone();
        let config = ChromeConfig::default().close_on_escape(false);
        let mut pending = modal.open_with(content, config).unwrap();

        manager.process_key(key(KeyCode::Esc)).unwrap();
        assert!(modal.is_open());
        assert!((&mut pending).now_or_never().is_none());
        assert_eq!(*keys.lock().unwrap(), vec![KeyCode::Esc]);
    }

    #[tokio::test]
    async fn test_escape_not_forwarded_to_content() {
        let manager = manager();
        let modal = manager.handle::<String>();
        let content = Scripted::new("value");
        let keys = content.keys.clone();
        let _pending = modal.open(content).unwrap();

        manager.process_key(key(KeyCode::Esc)).unwrap();
        assert!(keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backdrop_pointer_dismisses_only_on_backdrop() {
        let manager = manager();
        let modal = manager.handle::<String>();
        let config = ChromeConfig::default().close_on_backdrop_click(true);
        let mut pending = modal.open_with(Scripted::new("value"), config).unwrap();

        let panel = manager.panel().unwrap();
        let button = {
            let doc = lock_document(manager.document());
            focusable_elements(doc.tree(), panel)[0]
        };
        assert!(manager.pointer_down(PointerDown { target: button }));
        assert!(manager.pointer_down(PointerDown { target: panel }));
        assert!((&mut pending).now_or_never().is_none());

        let backdrop = manager.backdrop().unwrap();
        manager.pointer_down(PointerDown { target: backdrop });
        assert!(!modal.is_open());
        assert_eq!(pending.await, None);
    }

    #[tokio::test]
    async fn test_content_closes_through_handle() {
        let manager = manager();
        let modal = manager.handle::<String>();
        let pending = modal.open(Scripted::new("submitted")).unwrap();

        manager.process_key(key(KeyCode::Enter)).unwrap();

        assert!(!modal.is_open());
        assert!(manager.has_content());
        assert_eq!(pending.await, Some("submitted".to_string()));

        assert_eq!(manager.flush_deferred(), 1);
        assert!(!manager.has_content());
    }

    #[tokio::test]
    async fn test_stale_release_keeps_new_session() {
        let manager = manager();
        let modal = manager.handle::<String>();

        let first = modal.open(Scripted::new("a")).unwrap();
        modal.dismiss();
        let second = modal.open(Scripted::new("b")).unwrap();

        assert_eq!(manager.flush_deferred(), 0);
        assert!(modal.is_open());
        assert_eq!(manager.active_session(), Some(second.session()));
        assert_eq!(first.await, None);

        manager.process_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(second.await, Some("b".to_string()));
    }

    #[test]
    fn test_scroll_restored_after_close() {
        let document = Document::new().shared();
        lock_document(&document).set_overflow(Overflow::Scroll);
        let manager = ModalManager::new(document.clone());
        let modal = manager.handle::<String>();

        let _pending = modal.open(Scripted::new("a")).unwrap();
        assert_eq!(lock_document(&document).overflow(), Overflow::Hidden);

        modal.dismiss();
        assert_eq!(lock_document(&document).overflow(), Overflow::Scroll);
    }

    #[test]
    fn test_content_error_propagates() {
        let manager = manager();
        let modal = manager.handle::<String>();
        let _pending = modal.open(Scripted::new("a")).unwrap();

        let err = manager.process_key(key(KeyCode::Char('x'))).unwrap_err();
        assert_eq!(err.to_string(), "content failure");
        assert!(modal.is_open());
        assert!(manager.has_content());
    }

    #[tokio::test]
    async fn test_close_with_wrong_result_type_is_refused() {
        let manager = manager();
        let modal = manager.handle::<String>();
        let mut pending = modal.open(Scripted::new("a")).unwrap();

        manager.handle::<u32>().close(Some(7));
        assert!(modal.is_open());
        assert!((&mut pending).now_or_never().is_none());

        // a dismissal carries no value and is accepted from any handle
        manager.handle::<u32>().dismiss();
        assert!(!modal.is_open());
        assert_eq!(pending.await, None);
    }

    /// Keeps its own handle and uses it while rendering and when dropped
    struct SelfAware {
        handle: ModalHandle<String>,
        seen_open: Arc<Mutex<Vec<bool>>>,
    }

    impl ModalContent<String> for SelfAware {
        fn mount(&mut self, tree: &mut ElementTree, panel: ElementId) -> ModalResult<()> {
            tree.append_child(panel, Element::button("ok"))?;
            Ok(())
        }

        fn handle_key_event(
            &mut self,
            _key: KeyEvent,
            _focused: Option<ElementId>,
            _modal: &ModalHandle<String>,
        ) -> Result<bool> {
            Ok(false)
        }

        fn render(
            &mut self,
            frame: &mut Frame,
            area: Rect,
            _theme: &Theme,
            _focused: Option<ElementId>,
        ) {
            self.seen_open.lock().unwrap().push(self.handle.is_open());
            frame.render_widget(Paragraph::new("self aware"), area);
        }

        fn preferred_size(&self) -> (u16, u16) {
            self.seen_open.lock().unwrap().push(self.handle.is_open());
            (30, 5)
        }
    }

    impl Drop for SelfAware {
        fn drop(&mut self) {
            self.seen_open.lock().unwrap().push(self.handle.is_open());
        }
    }

    #[test]
    fn test_content_may_use_its_handle_while_drawn_and_dropped() {
        let manager = manager();
        let seen_open = Arc::new(Mutex::new(Vec::new()));
        let content = SelfAware {
            handle: manager.handle::<String>(),
            seen_open: seen_open.clone(),
        };
        let _pending = manager.handle::<String>().open(content).unwrap();

        let (done_sender, done) = std::sync::mpsc::channel();
        let worker = manager.clone();
        std::thread::spawn(move || {
            let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
            let theme = Theme::default();
            terminal
                .draw(|frame| {
                    let area = frame.size();
                    worker.draw(frame, area, &theme);
                })
                .unwrap();
            worker.handle::<String>().dismiss();
            worker.flush_deferred();
            let _ = done_sender.send(());
        });

        assert!(
            done.recv_timeout(std::time::Duration::from_secs(5)).is_ok(),
            "drawing or releasing the content blocked on the manager"
        );
        assert_eq!(*seen_open.lock().unwrap(), vec![true, true, false]);
        assert!(!manager.has_content());
    }

    /// Mounts below an element that is no longer in the document
    struct Unmountable {
        detached: ElementId,
    }

    impl ModalContent<String> for Unmountable {
        fn mount(&mut self, tree: &mut ElementTree, _panel: ElementId) -> ModalResult<()> {
            tree.append_child(self.detached, Element::button("lost"))?;
            Ok(())
        }

        fn handle_key_event(
            &mut self,
            _key: KeyEvent,
            _focused: Option<ElementId>,
            _modal: &ModalHandle<String>,
        ) -> Result<bool> {
            Ok(false)
        }

        fn render(
            &mut self,
            _frame: &mut Frame,
            _area: Rect,
            _theme: &Theme,
            _focused: Option<ElementId>,
        ) {
        }
    }

    #[test]
    fn test_failed_mount_leaves_page_untouched() {
        let document = Document::new().shared();
        let (opener, detached) = {
            let mut doc = lock_document(&document);
            doc.set_overflow(Overflow::Auto);
            let body = doc.body();
            let opener = doc.tree_mut().append_child(body, Element::button("Open")).unwrap();
            let detached = doc.tree_mut().append_child(body, Element::container()).unwrap();
            doc.tree_mut().remove(detached);
            doc.focus(opener).unwrap();
            (opener, detached)
        };
        let manager = ModalManager::new(document.clone());
        let modal = manager.handle::<String>();

        let err = modal.open(Unmountable { detached }).err().unwrap();
        assert!(matches!(err, ModalError::UnknownElement(id) if id == detached));

        assert!(!modal.is_open());
        assert!(!manager.has_content());
        let doc = lock_document(&document);
        assert_eq!(doc.overflow(), Overflow::Auto);
        assert_eq!(doc.active_element(), Some(opener));
        assert_eq!(doc.tree().get(doc.body()).unwrap().children(), &[opener]);
    }

    #[tokio::test]
    async fn test_dropping_manager_resolves_none() {
        let manager = manager();
        let pending = manager.handle::<String>().open(Scripted::new("a")).unwrap();

        drop(manager);
        assert_eq!(pending.await, None);
    }

    #[test]
    fn test_lifecycle_events() {
        let manager = manager();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        manager.set_event_sender(sender);
        let modal = manager.handle::<String>();

        let pending = modal.open(Scripted::new("a")).unwrap();
        let session = pending.session();
        manager.process_key(key(KeyCode::Esc)).unwrap();
        manager.flush_deferred();

        assert_eq!(receiver.try_recv().unwrap(), ModalEvent::Opened { session });
        assert_eq!(
            receiver.try_recv().unwrap(),
            ModalEvent::Closed { session, source: DismissSource::Escape }
        );
        assert_eq!(receiver.try_recv().unwrap(), ModalEvent::Released { session });
    }

    #[test]
    fn test_keys_ignored_without_modal() {
        let manager = manager();
        let body = lock_document(manager.document()).body();
        assert!(!manager.process_key(key(KeyCode::Tab)).unwrap());
        assert!(!manager.pointer_down(PointerDown { target: body }));
    }

    #[test]
    fn test_key_release_swallowed() {
        let manager = manager();
        let modal = manager.handle::<String>();
        let _pending = modal.open(Scripted::new("a")).unwrap();

        let mut release = key(KeyCode::Esc);
        release.kind = KeyEventKind::Release;
        assert!(manager.process_key(release).unwrap());
        assert!(modal.is_open());
    }

    #[test]
    fn test_mouse_outside_panel_dismisses_when_enabled() {
        let document = Document::new().shared();
        let manager = ModalManager::new(document)
            .with_chrome_config(ChromeConfig::default().close_on_backdrop_click(true));
        let modal = manager.handle::<String>();
        let _pending = modal.open(Scripted::new("a")).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let theme = Theme::default();
        terminal
            .draw(|frame| {
                let area = frame.size();
                manager.draw(frame, area, &theme);
            })
            .unwrap();

        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        assert!(manager.process_mouse(click).unwrap());
        assert!(!modal.is_open());
    }

    #[test]
    fn test_draw_renders_content_inside_panel() {
        let manager = manager();
        let modal = manager.handle::<String>();
        let _pending = modal.open(Scripted::new("a")).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let theme = Theme::default();
        terminal
            .draw(|frame| {
                let area = frame.size();
                manager.draw(frame, area, &theme);
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|cell| cell.symbol().to_string()).collect();
        assert!(text.contains("scripted body"));
        assert!(text.contains("Scripted"));
    }
}
