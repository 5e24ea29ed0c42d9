use std::cell::RefCell;
use std::rc::Rc;

use slint::{ComponentHandle, Weak};
use utsushi_types::{AppEvent, CaptureRegion};

use crate::desktop::{OverlayWindow, PaneData, ResultsWindow};
use crate::panes::PaneBoard;

pub fn handle_event(
    event: &AppEvent,
    overlay_weak: &Weak<OverlayWindow>,
    results_weak: &Weak<ResultsWindow>,
    board: &Rc<RefCell<PaneBoard>>,
) {
    if !board.borrow_mut().apply(event) {
        tracing::trace!("[SLINT] Ignored {event:?}");
        return;
    }

    match event {
        AppEvent::ShowOverlay(bounds) => {
            if let Some(w) = overlay_weak.upgrade() {
                w.set_dragging(false);
                w.window()
                    .set_position(slint::PhysicalPosition::new(bounds.x, bounds.y));
                w.window()
                    .set_size(slint::PhysicalSize::new(bounds.width, bounds.height));
                if let Err(e) = w.show() {
                    tracing::error!("[SLINT] Failed to show overlay: {e}");
                }
                tracing::debug!("[SLINT] Overlay shown on {bounds:?}");
            }
        }
        AppEvent::HideOverlay => {
            if let Some(w) = overlay_weak.upgrade() {
                w.set_dragging(false);
                let _ = w.hide();
                tracing::debug!("[SLINT] Overlay hidden");
            }
        }
        AppEvent::SelectionChanged(selection) => {
            if let Some(w) = overlay_weak.upgrade() {
                draw_selection(&w, *selection);
            }
        }
        _ => {
            if let Some(w) = results_weak.upgrade() {
                sync_results(&w, &board.borrow());
            }
        }
    }
}

fn draw_selection(window: &OverlayWindow, selection: Option<CaptureRegion>) {
    let Some(region) = selection else {
        window.set_dragging(false);
        return;
    };
    let scale = window.window().scale_factor();
    window.set_sel_x(region.x as f32 / scale);
    window.set_sel_y(region.y as f32 / scale);
    window.set_sel_width(region.width as f32 / scale);
    window.set_sel_height(region.height as f32 / scale);
    window.set_dragging(true);
}

fn sync_results(window: &ResultsWindow, board: &PaneBoard) {
    window.set_ocr_text(board.ocr_text.as_str().into());
    window.set_ocr_engine(board.ocr_engine.as_deref().unwrap_or_default().into());
    window.set_status(board.status.as_str().into());
    window.set_retranslate_enabled(board.retranslate_enabled);

    let panes: Vec<PaneData> = board
        .panes
        .iter()
        .map(|p| PaneData {
            engine: p.engine.as_str().into(),
            text: p.text.as_str().into(),
            failed: p.failed,
        })
        .collect();
    window.set_panes(Rc::new(slint::VecModel::from(panes)).into());
}
