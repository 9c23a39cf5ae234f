use std::rc::Rc;
use web_sys::{Event, HtmlElement};
use yew::prelude::*;
use yew_hooks::use_event_with_window;

/// How far a layer at `element_top` shifts for the current scroll position.
/// Zero when the layer's top edge sits at the bottom of the viewport.
pub fn parallax_offset(scroll_y: f64, element_top: f64, viewport_h: f64, speed: f64, max: f64) -> f64 {
    let max = max.abs();
    let offset = (scroll_y - element_top + viewport_h) * speed;
    if offset.is_nan() {
        return 0.0;
    }
    offset.clamp(-max, max)
}

fn apply_parallax(layer: &NodeRef, speed: f64, max: f64) {
    let (Some(window), Some(layer)) = (web_sys::window(), layer.cast::<HtmlElement>()) else {
        return;
    };
    let scroll_y = window.scroll_y().unwrap_or(0.0);
    let viewport_h = window
        .inner_height()
        .ok()
        .and_then(|height| height.as_f64())
        .unwrap_or(0.0);
    // Measure the untransformed parent so the shift does not feed back into itself.
    let anchor = layer.parent_element();
    let rect = match &anchor {
        Some(parent) => parent.get_bounding_client_rect(),
        None => layer.get_bounding_client_rect(),
    };
    let offset = parallax_offset(scroll_y, rect.top() + scroll_y, viewport_h, speed, max);
    if let Err(e) = layer
        .style()
        .set_property("transform", &format!("translate3d(0, {:.1}px, 0)", offset))
    {
        log::warn!("Could not move parallax layer: {:?}", e);
    }
}

/// Moves `layer` against the scroll by `speed`, never more than `max` pixels.
#[hook]
pub fn use_parallax(layer: NodeRef, speed: f64, max: f64) {
    let update = Rc::new(move || apply_parallax(&layer, speed, max));
    {
        let update = update.clone();
        use_event_with_window("scroll", move |_: Event| update());
    }
    {
        let update = update.clone();
        use_event_with_window("resize", move |_: Event| update());
    }
    use_effect_with_deps(
        move |_| {
            update();
            || ()
        },
        (),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_linear_inside_the_limit() {
        assert_eq!(parallax_offset(0.0, 800.0, 800.0, 0.3, 120.0), 0.0);
        assert_eq!(parallax_offset(100.0, 800.0, 800.0, 0.3, 120.0), 30.0);
        assert_eq!(parallax_offset(0.0, 900.0, 800.0, 0.5, 120.0), -50.0);
    }

    #[test]
    fn offset_is_clamped_both_ways() {
        assert_eq!(parallax_offset(5_000.0, 0.0, 800.0, 0.3, 120.0), 120.0);
        assert_eq!(parallax_offset(0.0, 5_000.0, 800.0, 0.3, 120.0), -120.0);
        assert_eq!(parallax_offset(5_000.0, 0.0, 800.0, 0.3, -40.0), 40.0);
    }
}
