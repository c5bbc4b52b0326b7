#![forbid(unsafe_code)]

//! Integration tests: modal events driven through the in-memory document.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;
use scrim_core::{ElementKind, FocusTraits, NodeId, NodeTree, UiEvent};
use scrim_harness::{Dom, EventType, ListenerTarget, Page};
use scrim_modal::{ModalCallbacks, ModalConfig, ModalDiagnostic, StackChange};
use tracing_test::traced_test;

// ============================================================================
// Helpers
// ============================================================================

#[derive(Clone, Default)]
struct Counter(Rc<Cell<u32>>);

impl Counter {
    fn hook(&self) -> impl Fn() + 'static {
        let cell = Rc::clone(&self.0);
        move || cell.set(cell.get() + 1)
    }

    fn count(&self) -> u32 {
        self.0.get()
    }
}

/// Records every event handed to `on_request_close`.
#[derive(Clone, Default)]
struct RequestSpy(Rc<RefCell<Vec<UiEvent>>>);

impl RequestSpy {
    fn hook(&self) -> impl Fn(&UiEvent) + 'static {
        let calls = Rc::clone(&self.0);
        move |event: &UiEvent| calls.borrow_mut().push(event.clone())
    }

    fn called(&self) -> bool {
        !self.0.borrow().is_empty()
    }

    fn count(&self) -> usize {
        self.0.borrow().len()
    }

    fn first(&self) -> Option<UiEvent> {
        self.0.borrow().first().cloned()
    }
}

fn open() -> ModalConfig {
    ModalConfig::default().open(true)
}

fn requesting(spy: &RequestSpy) -> ModalCallbacks {
    ModalCallbacks::new().on_request_close(spy.hook())
}

fn text(dom: &Dom, content: NodeId) {
    dom.append_labeled(content, FocusTraits::default(), "hello");
}

fn top_and_bottom(dom: &Dom, content: NodeId) {
    let wrapper = dom.append(content, FocusTraits::default());
    dom.append_labeled(wrapper, FocusTraits::new(ElementKind::Button), "top");
    dom.append_labeled(wrapper, FocusTraits::new(ElementKind::Button), "bottom");
}

// ============================================================================
// Lifecycle callbacks
// ============================================================================

#[test]
fn triggers_after_open() {
    let page = Page::new();
    let opened = Counter::default();
    let _modal = page.render_modal(
        open(),
        ModalCallbacks::new().on_after_open(opened.hook()),
        |_, _| {},
    );
    assert_eq!(opened.count(), 1);
}

#[test]
fn rerender_with_same_state_does_not_reopen() {
    let page = Page::new();
    let opened = Counter::default();
    let rendered = page.render_modal(
        open(),
        ModalCallbacks::new().on_after_open(opened.hook()),
        |_, _| {},
    );
    rendered.modal().update(open().close_on_escape(false));
    rendered.modal().update(open());
    assert_eq!(opened.count(), 1);
}

#[test]
fn triggers_after_close_on_imperative_close() {
    let page = Page::new();
    let closed = Counter::default();
    let rendered = page.render_modal(
        open(),
        ModalCallbacks::new().on_after_close(closed.hook()),
        |_, _| {},
    );
    rendered.handle().close();
    assert_eq!(closed.count(), 1);
    assert!(!rendered.handle().is_open());
}

#[test]
fn unmounting_closed_modal_skips_after_close() {
    let page = Page::new();
    let closed = Counter::default();
    let rendered = page.render_modal(
        ModalConfig::default(),
        ModalCallbacks::new().on_after_close(closed.hook()),
        |_, _| {},
    );
    rendered.unmount();
    assert_eq!(closed.count(), 0);
}

#[test]
fn unmounting_open_modal_fires_after_close() {
    let page = Page::new();
    let closed = Counter::default();
    let rendered = page.render_modal(
        open(),
        ModalCallbacks::new().on_after_close(closed.hook()),
        |_, _| {},
    );
    let content = rendered.content();
    rendered.unmount();
    assert_eq!(closed.count(), 1);
    assert!(page.stack().is_empty());
    assert!(!page.dom().is_attached(content));
    assert_eq!(page.dom().listener_count(), 1);
}

#[test]
fn host_toggle_opens_and_closes() {
    let page = Page::new();
    let opened = Counter::default();
    let closed = Counter::default();
    let rendered = page.render_modal(
        ModalConfig::default(),
        ModalCallbacks::new()
            .on_after_open(opened.hook())
            .on_after_close(closed.hook()),
        |_, _| {},
    );

    rendered.modal().update(open());
    assert_eq!(page.dom().active_element(), Some(rendered.content()));
    rendered.modal().update(ModalConfig::default());
    rendered.modal().update(open());
    assert_eq!((opened.count(), closed.count()), (2, 1));
}

// ============================================================================
// Focus trap
// ============================================================================

#[test]
fn keeps_focus_inside_when_no_tabbables() {
    let page = Page::new();
    let rendered = page.render_modal(open(), ModalCallbacks::new(), text);
    let content = rendered.content();
    assert_eq!(page.dom().active_element(), Some(content));

    let tab = page.tab_key_down(content, false);
    assert!(tab.is_default_prevented());
    assert_eq!(page.dom().active_element(), Some(content));
}

#[test]
fn shift_tab_traps_inside_modal() {
    let page = Page::new();
    let rendered = page.render_modal(open(), ModalCallbacks::new(), top_and_bottom);
    page.tab_key_down(rendered.content(), true);
    assert_eq!(page.dom().active_label().as_deref(), Some("bottom"));
}

#[test]
fn tab_wraps_from_last_to_first() {
    let page = Page::new();
    page.add_button("outside");
    let rendered = page.render_modal(open(), ModalCallbacks::new(), top_and_bottom);

    // From the container, Tab enters natively.
    let tab = page.tab_key_down(rendered.content(), false);
    assert!(!tab.is_default_prevented());
    assert_eq!(page.dom().active_label().as_deref(), Some("top"));

    let top = page.dom().active_element().expect("top is focused");
    page.tab_key_down(top, false);
    assert_eq!(page.dom().active_label().as_deref(), Some("bottom"));

    let bottom = page.dom().active_element().expect("bottom is focused");
    let tab = page.tab_key_down(bottom, false);
    assert!(tab.is_default_prevented());
    assert_eq!(page.dom().active_label().as_deref(), Some("top"));
}

#[test]
fn tab_from_untabbable_node_stays_inside() {
    let page = Page::new();
    let rendered = page.render_modal(open(), ModalCallbacks::new(), top_and_bottom);
    let note = page.dom().append_labeled(
        rendered.content(),
        FocusTraits::default().tab_index(-1),
        "note",
    );
    page.add_button("outside");

    page.dom().focus(note);
    let tab = page.tab_key_down(note, false);
    assert!(tab.is_default_prevented());
    assert_eq!(page.dom().active_label().as_deref(), Some("top"));

    page.dom().focus(note);
    let tab = page.tab_key_down(note, true);
    assert!(tab.is_default_prevented());
    assert_eq!(page.dom().active_label().as_deref(), Some("bottom"));
}

#[test]
fn hooks_run_after_focus_settles() {
    let page = Page::new();
    let trigger = page.add_button("trigger");
    page.dom().focus(trigger);
    let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::default();
    let (open_dom, open_seen) = (page.dom().clone(), Rc::clone(&seen));
    let (close_dom, close_seen) = (page.dom().clone(), Rc::clone(&seen));

    let rendered = page.render_modal(
        open(),
        ModalCallbacks::new()
            .on_after_open(move || open_seen.borrow_mut().push(open_dom.active_label()))
            .on_after_close(move || close_seen.borrow_mut().push(close_dom.active_label())),
        text,
    );
    rendered.handle().close();

    assert_eq!(
        *seen.borrow(),
        vec![Some("content".to_owned()), Some("trigger".to_owned())]
    );
}

#[test]
fn focus_returns_to_trigger_after_close() {
    let page = Page::new();
    let trigger = page.add_button("trigger");
    page.dom().focus(trigger);

    let rendered = page.render_modal(open(), ModalCallbacks::new(), text);
    assert_eq!(page.dom().active_element(), Some(rendered.content()));
    rendered.handle().close();
    assert_eq!(page.dom().active_element(), Some(trigger));
}

#[traced_test]
#[test]
fn stale_trigger_leaves_focus_unassigned() {
    let page = Page::new();
    let trigger = page.add_button("trigger");
    page.dom().focus(trigger);
    let diagnostics: Rc<RefCell<Vec<ModalDiagnostic>>> = Rc::default();
    let sink = Rc::clone(&diagnostics);

    let rendered = page.render_modal(
        open(),
        ModalCallbacks::new().on_diagnostic(move |diag| sink.borrow_mut().push(*diag)),
        text,
    );
    page.dom().remove(trigger);
    rendered.handle().close();

    assert_eq!(page.dom().active_element(), None);
    assert_eq!(
        diagnostics.borrow().as_slice(),
        &[ModalDiagnostic::StaleFocusMemento {
            modal: rendered.modal().id(),
            node: trigger,
        }]
    );
    assert!(logs_contain("is detached"));
}

#[test]
fn window_refocus_pulls_focus_back_in() {
    let page = Page::new();
    let outside = page.add_button("outside");
    let rendered = page.render_modal(open(), ModalCallbacks::new(), top_and_bottom);

    page.blur_window();
    page.dom().focus(outside);
    page.focus_window();
    assert_eq!(page.dom().active_label().as_deref(), Some("top"));
    let active = page.dom().active_element().expect("focus reclaimed");
    assert!(page.dom().contains(rendered.content(), active));
}

// ============================================================================
// Escape
// ============================================================================

#[test]
fn escape_requests_close_when_enabled() {
    let page = Page::new();
    let spy = RequestSpy::default();
    let rendered = page.render_modal(open().close_on_escape(true), requesting(&spy), |_, _| {});

    let esc = page.esc_key_down(rendered.content());
    assert_eq!(spy.count(), 1);
    assert_eq!(spy.first().map(|ev| ev.id()), Some(esc.id()));
    // A request does not close the modal.
    assert!(rendered.handle().is_open());
}

#[test]
fn escape_ignored_when_disabled() {
    let page = Page::new();
    let spy = RequestSpy::default();
    let rendered = page.render_modal(open().close_on_escape(false), requesting(&spy), |_, _| {});
    page.esc_key_down(rendered.content());
    assert!(!spy.called());
}

#[test]
fn nested_modals_only_topmost_handles_escape() {
    let page = Page::new();
    let outer_spy = RequestSpy::default();
    let inner_spy = RequestSpy::default();
    let _outer = page.render_modal(open(), requesting(&outer_spy), text);
    let inner = page.render_modal(open(), requesting(&inner_spy), text);

    page.esc_key_down(inner.content());
    assert!(inner_spy.called());
    assert!(!outer_spy.called());
}

#[test]
fn topmost_opt_out_does_not_fall_through() {
    let page = Page::new();
    let outer_spy = RequestSpy::default();
    let inner_spy = RequestSpy::default();
    let _outer = page.render_modal(open(), requesting(&outer_spy), text);
    let inner = page.render_modal(open().close_on_escape(false), requesting(&inner_spy), text);

    page.esc_key_down(inner.content());
    assert!(!inner_spy.called());
    assert!(!outer_spy.called());
}

#[test]
fn out_of_order_close_promotes_last_remaining() {
    let page = Page::new();
    let spies: Vec<RequestSpy> = (0..3).map(|_| RequestSpy::default()).collect();
    let modals: Vec<_> = spies
        .iter()
        .map(|spy| page.render_modal(open(), requesting(spy), text))
        .collect();

    modals[0].handle().close();
    page.esc_key_down(page.dom().body());
    assert_eq!(
        spies.iter().map(RequestSpy::count).collect::<Vec<_>>(),
        vec![0, 0, 1]
    );

    modals[2].handle().close();
    page.esc_key_down(page.dom().body());
    assert_eq!(
        spies.iter().map(RequestSpy::count).collect::<Vec<_>>(),
        vec![0, 1, 1]
    );
}

#[test]
fn host_closing_on_request_restores_focus() {
    let page = Page::new();
    let trigger = page.add_button("trigger");
    page.dom().focus(trigger);
    let closed = Counter::default();

    let rendered = page.render_modal(
        open(),
        ModalCallbacks::new().on_after_close(closed.hook()),
        text,
    );
    let handle = rendered.handle();
    rendered.modal().set_callbacks(
        ModalCallbacks::new()
            .on_after_close(closed.hook())
            .on_request_close(move |_| handle.close()),
    );

    page.esc_key_down(rendered.content());
    assert_eq!(closed.count(), 1);
    assert!(page.stack().is_empty());
    assert_eq!(page.dom().active_element(), Some(trigger));
}

// ============================================================================
// Overlay click
// ============================================================================

#[test]
fn overlay_click_disabled_does_not_request_close() {
    let page = Page::new();
    let spy = RequestSpy::default();
    let rendered = page.render_modal(
        open().close_on_overlay_click(false),
        requesting(&spy),
        |_, _| {},
    );
    let down = page.mouse_down_at(rendered.overlay(), &[]);
    assert!(down.is_default_prevented());
    page.click_at(rendered.overlay(), &[]);
    assert!(!spy.called());
}

#[test]
fn overlay_click_enabled_requests_close() {
    let page = Page::new();
    let spy = RequestSpy::default();
    let rendered = page.render_modal(
        open().close_on_overlay_click(true),
        requesting(&spy),
        |_, _| {},
    );
    page.click_at(rendered.overlay(), &[]);
    assert!(spy.called());
}

#[test]
fn overlay_down_content_up_does_not_request_close() {
    let page = Page::new();
    let spy = RequestSpy::default();
    let rendered = page.render_modal(open(), requesting(&spy), |_, _| {});
    page.mouse_down_at(rendered.overlay(), &[]);
    page.mouse_up_at(rendered.content(), &[]);
    // The click lands on the common ancestor.
    page.programmatic_click(rendered.overlay());
    assert!(!spy.called());
}

#[test]
fn content_down_overlay_up_does_not_request_close() {
    let page = Page::new();
    let spy = RequestSpy::default();
    let rendered = page.render_modal(open(), requesting(&spy), |_, _| {});
    page.mouse_down_at(rendered.content(), &[]);
    page.mouse_up_at(rendered.overlay(), &[]);
    page.programmatic_click(rendered.overlay());
    assert!(!spy.called());
}

#[test]
fn programmatic_overlay_click_does_not_request_close() {
    let page = Page::new();
    let spy = RequestSpy::default();
    let rendered = page.render_modal(open(), requesting(&spy), |_, _| {});
    page.programmatic_click(rendered.overlay());
    assert!(!spy.called());
}

#[test]
fn clicks_inside_content_do_not_request_close() {
    let page = Page::new();
    let spy = RequestSpy::default();
    let rendered = page.render_modal(open(), requesting(&spy), top_and_bottom);
    page.click_at(rendered.content(), &[]);
    assert!(!spy.called());
}

#[test]
fn overlay_click_without_handler_focuses_content() {
    let page = Page::new();
    let outside = page.add_button("outside");
    let rendered = page.render_modal(open(), ModalCallbacks::new(), |_, _| {});
    page.dom().focus(outside);
    page.click_at(rendered.overlay(), &[]);
    assert_eq!(page.dom().active_element(), Some(rendered.content()));
}

#[test]
fn does_not_stop_event_propagation() {
    let page = Page::new();
    let spy = RequestSpy::default();
    let rendered = page.render_modal(
        open().close_on_overlay_click(true),
        requesting(&spy),
        |_, _| {},
    );
    let propagated = Rc::new(Cell::new(false));
    let flag = Rc::clone(&propagated);
    page.dom()
        .add_listener(ListenerTarget::Window, EventType::Click, move |_| flag.set(true));

    let click = page.click_at(rendered.overlay(), &[]);
    assert!(propagated.get());
    assert!(!click.is_propagation_stopped());
}

#[test]
fn overlay_click_passes_the_dispatched_event() {
    let page = Page::new();
    let spy = RequestSpy::default();
    let rendered = page.render_modal(
        open().close_on_overlay_click(true),
        requesting(&spy),
        |_, _| {},
    );
    let click = page.click_at(rendered.overlay(), &[("fakeData", "ABC")]);

    let received = spy.first().expect("on_request_close was called");
    assert_eq!(received.id(), click.id());
    assert_eq!(received.extra("fakeData"), Some("ABC"));
    assert_eq!(received.target(), Some(rendered.overlay()));
}

// ============================================================================
// Stack observation
// ============================================================================

#[test]
fn stack_subscribers_follow_mounts() {
    let page = Page::new();
    let log: Rc<RefCell<Vec<(StackChange, usize)>>> = Rc::default();
    let sink = Rc::clone(&log);
    let _sub = page
        .stack()
        .subscribe(move |change, ids| sink.borrow_mut().push((change, ids.len())));

    let first = page.render_modal(open(), ModalCallbacks::new(), text);
    let second = page.render_modal(open(), ModalCallbacks::new(), text);
    let (a, b) = (first.modal().id(), second.modal().id());
    first.unmount();
    second.unmount();

    assert_eq!(
        log.borrow().as_slice(),
        &[
            (StackChange::Registered(a), 1),
            (StackChange::Registered(b), 2),
            (StackChange::Unregistered(a), 1),
            (StackChange::Unregistered(b), 0),
        ]
    );
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Spot {
    Overlay,
    Content,
}

#[derive(Debug, Clone, Copy)]
enum Pointer {
    Down(Spot),
    Up(Spot),
    Click(Spot),
}

fn spot() -> impl Strategy<Value = Spot> {
    prop_oneof![Just(Spot::Overlay), Just(Spot::Content)]
}

fn pointer() -> impl Strategy<Value = Pointer> {
    prop_oneof![
        spot().prop_map(Pointer::Down),
        spot().prop_map(Pointer::Up),
        spot().prop_map(Pointer::Click),
    ]
}

proptest! {
    #[test]
    fn dismissal_requires_overlay_down_and_up(
        steps in proptest::collection::vec(pointer(), 0..32)
    ) {
        let page = Page::new();
        let spy = RequestSpy::default();
        let rendered = page.render_modal(open(), requesting(&spy), |_, _| {});
        let node = |spot| match spot {
            Spot::Overlay => rendered.overlay(),
            Spot::Content => rendered.content(),
        };

        let mut pressed: Option<Spot> = None;
        let mut armed = false;
        let mut expected = 0usize;
        for step in steps {
            match step {
                Pointer::Down(at) => {
                    page.mouse_down_at(node(at), &[]);
                    pressed = Some(at);
                    armed = false;
                }
                Pointer::Up(at) => {
                    page.mouse_up_at(node(at), &[]);
                    armed = pressed.take() == Some(Spot::Overlay) && at == Spot::Overlay;
                }
                Pointer::Click(at) => {
                    page.programmatic_click(node(at));
                    if std::mem::take(&mut armed) && at == Spot::Overlay {
                        expected += 1;
                    }
                }
            }
        }
        prop_assert_eq!(spy.count(), expected);
    }
}
