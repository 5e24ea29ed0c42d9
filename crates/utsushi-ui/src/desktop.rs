use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use slint::ComponentHandle;
use utsushi_ocr::RegionSelector;
use utsushi_types::{AppEvent, Point};

use crate::events::handle_event;
use crate::panes::PaneBoard;

slint::slint! {
    import { Button, ScrollView } from "std-widgets.slint";

    export struct PaneData {
        engine: string,
        text: string,
        failed: bool,
    }

    export component OverlayWindow inherits Window {
        no-frame: true;
        always-on-top: true;
        background: #00000059;

        in property <bool> dragging;
        in property <length> sel-x;
        in property <length> sel-y;
        in property <length> sel-width;
        in property <length> sel-height;

        callback pressed(length, length);
        callback moved(length, length);
        callback cancel();

        forward-focus: keys;

        keys := FocusScope {
            key-pressed(event) => {
                if (event.text == Key.Escape) {
                    root.cancel();
                    return accept;
                }
                return reject;
            }

            area := TouchArea {
                mouse-cursor: crosshair;
                pointer-event(event) => {
                    if (event.kind == PointerEventKind.down && event.button == PointerEventButton.left) {
                        root.pressed(self.mouse-x, self.mouse-y);
                    }
                }
                moved => {
                    root.moved(self.mouse-x, self.mouse-y);
                }
            }
        }

        if root.dragging: Rectangle {
            x: root.sel-x;
            y: root.sel-y;
            width: root.sel-width;
            height: root.sel-height;
            border-width: 2px;
            border-color: #ff3b3b;
            background: #ffffff10;
        }
    }

    export component ResultsWindow inherits Window {
        title: "Utsushi";
        preferred-width: 520px;
        preferred-height: 640px;

        in property <string> ocr-text;
        in property <string> ocr-engine;
        in property <string> status;
        in property <[PaneData]> panes;
        in property <bool> retranslate-enabled: true;

        callback retranslate();
        callback retranslate-engine(string);

        VerticalLayout {
            padding: 8px;
            spacing: 6px;

            Text {
                text: root.ocr-engine == "" ? "OCR" : "OCR (" + root.ocr-engine + ")";
                font-weight: 700;
            }
            Text {
                text: root.ocr-text;
                wrap: word-wrap;
            }
            Button {
                text: "Re-translate";
                enabled: root.retranslate-enabled;
                clicked => { root.retranslate(); }
            }
            ScrollView {
                VerticalLayout {
                    spacing: 8px;
                    for pane in root.panes: VerticalLayout {
                        HorizontalLayout {
                            Text {
                                text: pane.engine;
                                font-weight: 700;
                                vertical-alignment: center;
                            }
                            Button {
                                text: "Retry";
                                clicked => { root.retranslate-engine(pane.engine); }
                            }
                        }
                        Text {
                            text: pane.text;
                            wrap: word-wrap;
                            color: pane.failed ? #d33 : #222;
                        }
                    }
                }
            }
            Text {
                text: root.status;
                color: #666;
            }
        }
    }
}

/// Run the desktop front-end on the current thread until the results window closes.
///
/// Overlay input drives `selector` directly; user commands go to the backend
/// over `ui_to_app`.
pub fn run_desktop(
    selector: Arc<RegionSelector>,
    app_to_ui: AsyncReceiver<AppEvent>,
    ui_to_app: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let overlay = OverlayWindow::new()?;
    let results = ResultsWindow::new()?;
    let board = Rc::new(RefCell::new(PaneBoard::default()));

    // Overlay input
    {
        let weak = overlay.as_weak();
        let selector = Arc::clone(&selector);
        overlay.on_pressed(move |x, y| {
            if let Some(point) = weak.upgrade().map(|w| to_physical(&w, x, y)) {
                selector.press(point);
            }
        });

        let weak = overlay.as_weak();
        let selector_moved = Arc::clone(&selector);
        overlay.on_moved(move |x, y| {
            if let Some(point) = weak.upgrade().map(|w| to_physical(&w, x, y)) {
                selector_moved.pointer_moved(point);
            }
        });

        overlay.on_cancel(move || {
            selector.cancel_selection();
        });
    }

    // Results window commands
    {
        let tx = ui_to_app.clone();
        let board_rc = Rc::clone(&board);
        results.on_retranslate(move || {
            let text = board_rc.borrow().ocr_text.clone();
            send(&tx, AppEvent::Retranslate { text, engine: None });
        });

        let tx = ui_to_app.clone();
        let board_rc = Rc::clone(&board);
        results.on_retranslate_engine(move |engine| {
            let text = board_rc.borrow().ocr_text.clone();
            send(
                &tx,
                AppEvent::Retranslate {
                    text,
                    engine: Some(engine.to_string()),
                },
            );
        });

        let tx = ui_to_app.clone();
        results.window().on_close_requested(move || {
            send(&tx, AppEvent::Shutdown);
            slint::quit_event_loop().ok();
            slint::CloseRequestResponse::HideWindow
        });
    }

    // Backend events
    {
        let overlay_weak = overlay.as_weak();
        let results_weak = results.as_weak();
        slint::spawn_local(async move {
            while let Ok(event) = app_to_ui.recv().await {
                if let AppEvent::Shutdown = event {
                    slint::quit_event_loop().ok();
                    break;
                }
                handle_event(&event, &overlay_weak, &results_weak, &board);
            }
            tracing::debug!("[SLINT] Backend channel closed");
        })?;
    }

    results.show()?;
    slint::run_event_loop_until_quit()?;
    Ok(())
}

fn to_physical(window: &OverlayWindow, x: f32, y: f32) -> Point {
    let scale = window.window().scale_factor();
    Point::new((x * scale).round() as i32, (y * scale).round() as i32)
}

fn send(tx: &AsyncSender<AppEvent>, event: AppEvent) {
    let tx = tx.clone();
    if let Err(e) = slint::spawn_local(async move {
        if let Err(e) = tx.send(event).await {
            tracing::error!("[SLINT] Failed to send to backend: {e}");
        }
    }) {
        tracing::error!("[SLINT] Failed to schedule send: {e}");
    }
}
