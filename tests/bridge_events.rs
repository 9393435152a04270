use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::anyhow;
use tether::{BridgeError, Button, HeadlessTransport, PumpStatus, Transport, Window, WindowBuilder};

const PAGE: &str =
    "<html><body><button id=\"b1\">One</button><button id=\"b2\">Two</button></body></html>";

fn headless() -> Window<HeadlessTransport> {
    tether::logging::init_with_default("warn");
    WindowBuilder::new()
        .with_html(PAGE)
        .build_headless()
        .expect("headless window")
}

#[test]
fn click_reaches_only_the_clicked_proxy() {
    let window = headless();
    let document = window.document();
    let first = document.get_element_by_id("b1").expect("b1");
    let second = document.get_element_by_id("b2").expect("b2");

    let first_clicks = Rc::new(Cell::new(0));
    let second_clicks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&first_clicks);
    first
        .on_click(move |_, args| {
            assert_eq!(args.event_type(), "click");
            assert!(args.as_mouse().is_some());
            counter.set(counter.get() + 1);
            Ok(())
        })
        .expect("first handler");
    let counter = Rc::clone(&second_clicks);
    second
        .on_click(move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .expect("second handler");

    window.transport().click_element("b1");
    assert_eq!(
        window.transport().pump_once(false).expect("pump"),
        PumpStatus::Continue
    );

    assert_eq!(first_clicks.get(), 1);
    assert_eq!(second_clicks.get(), 0);
}

#[test]
fn handlers_receive_the_sender_proxy() {
    let window = headless();
    let button = window.document().get_element_by_id("b1").expect("b1");
    let sender = Rc::new(RefCell::new(None));
    let seen = Rc::clone(&sender);
    button
        .on_click(move |element, _| {
            seen.borrow_mut().replace(element.clone());
            Ok(())
        })
        .expect("handler");

    window.transport().click_element("b1");
    window.transport().pump_once(false).expect("pump");

    let sender = sender.borrow().clone().expect("handler ran");
    assert!(sender.same_proxy(&button));
}

#[test]
fn handlers_run_in_registration_order_and_can_be_detached() {
    let window = headless();
    let button = window.document().get_element_by_id("b1").expect("b1");
    let order = Rc::new(RefCell::new(Vec::new()));

    let log = Rc::clone(&order);
    let first = button
        .on_click(move |_, _| {
            log.borrow_mut().push("first");
            Ok(())
        })
        .expect("first");
    let log = Rc::clone(&order);
    button
        .on_click(move |_, _| {
            log.borrow_mut().push("second");
            Ok(())
        })
        .expect("second");

    window.transport().click_element("b1");
    window.transport().pump_once(false).expect("pump");
    assert_eq!(*order.borrow(), vec!["first", "second"]);

    assert!(button.off("click", first));
    assert!(!button.off("click", first));
    window.transport().click_element("b1");
    window.transport().pump_once(false).expect("pump");
    assert_eq!(*order.borrow(), vec!["first", "second", "second"]);
}

#[test]
fn handlers_may_query_the_engine_while_a_result_is_pending() {
    let window = headless();
    let document = window.document();
    let button = document.get_element_by_id("b1").expect("b1");

    let observed = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&observed);
    button
        .on_click(move |element, _| {
            let pending = element.javascript().pending_correlations();
            let id = element.id()?;
            let sum: i32 = element.javascript().submit_for_value("20 + 22")?;
            sink.borrow_mut().replace((pending, id, sum));
            Ok(())
        })
        .expect("handler");

    let clicked: bool = document
        .javascript()
        .submit_for_value("(document.getElementById('b1').click(), true)")
        .expect("outer value");

    assert!(clicked);
    let (pending, id, sum) = observed.borrow().clone().expect("handler ran");
    assert_eq!(pending, 1);
    assert_eq!(id, "b1");
    assert_eq!(sum, 42);
    assert_eq!(document.javascript().pending_correlations(), 0);
}

#[test]
fn handler_errors_surface_from_the_pump() {
    let window = headless();
    let button = window.document().get_element_by_id("b2").expect("b2");
    button
        .on_click(|_, _| Err(anyhow!("boom")))
        .expect("handler");

    window.transport().click_element("b2");
    let err = window.transport().pump_once(false).unwrap_err();
    assert!(matches!(err, BridgeError::Handler(_)), "{err}");
    assert!(err.to_string().contains("boom"));
}

#[test]
fn keyboard_events_carry_typed_fields() {
    let window = headless();
    let button = window.document().get_element_by_id("b1").expect("b1");
    let keys = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&keys);
    button
        .on("keydown", move |_, args| {
            let keyboard = args.as_keyboard().ok_or_else(|| anyhow!("not a key event"))?;
            sink.borrow_mut()
                .push((keyboard.key.clone(), keyboard.code.clone(), keyboard.shift_key));
            Ok(())
        })
        .expect("handler");

    window.transport().queue_input(
        "document.getElementById('b1').dispatchEvent(new KeyboardEvent('keydown', { key: 'A', code: 'KeyA', shiftKey: true }));",
    );
    window.transport().pump_once(false).expect("pump");

    assert_eq!(
        *keys.borrow(),
        vec![("A".to_string(), "KeyA".to_string(), true)]
    );
}

#[test]
fn unknown_event_kinds_are_rejected_at_registration() {
    let window = headless();
    let err = window
        .document()
        .body()
        .on("scroll", |_, _| Ok(()))
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnknownEvent { ref kind } if kind == "scroll"));
}

#[test]
fn stray_payloads_are_ignored() {
    let window = headless();
    window
        .javascript()
        .submit("external.invoke('not an envelope');")
        .expect("malformed payload");
    window
        .javascript()
        .submit(
            "external.invoke(JSON.stringify({ kind: 'event', id: 'nobody', eventKind: 'click', fields: {} }));",
        )
        .expect("unknown meta-id");
    window
        .javascript()
        .submit("external.invoke(JSON.stringify({ kind: 'result', token: 'stale', value: 1 }));")
        .expect("unknown token");
    assert_eq!(window.javascript().pending_correlations(), 0);
}

#[test]
fn elements_created_by_the_host_forward_events() {
    let window = headless();
    let document = window.document();
    let button: Button = document.create_element().expect("button");
    button.set_id("fresh").expect("id");
    document.body().append_child(Some(&button)).expect("append");

    let clicks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&clicks);
    button
        .on_click(move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .expect("handler");

    window.transport().click_element("fresh");
    window.transport().click_element("fresh");
    while window.transport().pump_once(false).expect("pump") == PumpStatus::Continue
        && window.transport().pending_input() > 0
    {}

    assert_eq!(clicks.get(), 2);
}

#[test]
fn fractional_mouse_coordinates_reach_the_handler() {
    let window = headless();
    let button = window.document().get_element_by_id("b1").expect("b1");
    let positions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&positions);
    button
        .on_click(move |_, args| {
            let mouse = args.as_mouse().ok_or_else(|| anyhow!("not a mouse event"))?;
            sink.borrow_mut().push((mouse.client_x, mouse.offset_x));
            Ok(())
        })
        .expect("handler");

    window.transport().queue_input(
        "document.getElementById('b1').dispatchEvent(new MouseEvent('click', { clientX: 10.5, offsetX: 3.25 }));",
    );
    window.transport().pump_once(false).expect("pump");

    assert_eq!(*positions.borrow(), vec![(10.5, 3.25)]);
}

#[test]
fn handlers_using_the_sender_channel_do_not_keep_the_document_alive() {
    let window = headless();
    let button = window.document().get_element_by_id("b1").expect("b1");
    button
        .on_click(|element, _| {
            element.javascript().submit("globalThis.clicked = true;")?;
            Ok(())
        })
        .expect("handler");

    window.transport().click_element("b1");
    window.transport().pump_once(false).expect("pump");
    let clicked: bool = button
        .javascript()
        .submit_for_value("globalThis.clicked === true")
        .expect("flag");
    assert!(clicked);

    drop(window);
    let err = button.children().err().expect("document is gone");
    assert!(matches!(err, BridgeError::DocumentDropped), "{err}");
}
