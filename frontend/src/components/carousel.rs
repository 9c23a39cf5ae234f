use web_sys::{Element, KeyboardEvent, MouseEvent, ScrollBehavior, ScrollToOptions};
use yew::prelude::*;

/// Slide under the scroll position, snapping to the nearest one.
pub fn carousel_index(scroll_left: f64, slide_width: f64, gap: f64, count: usize) -> usize {
    let step = slide_width + gap;
    if count == 0 || step <= 0.0 || !scroll_left.is_finite() {
        return 0;
    }
    let index = (scroll_left / step).round().max(0.0) as usize;
    index.min(count - 1)
}

pub fn target_offset(index: usize, slide_width: f64, gap: f64) -> f64 {
    index as f64 * (slide_width + gap)
}

/// Where a key press moves the carousel, if anywhere.
pub fn key_target(key: &str, current: usize, count: usize) -> Option<usize> {
    if count == 0 {
        return None;
    }
    let last = count - 1;
    match key {
        "ArrowLeft" => Some(current.saturating_sub(1)),
        "ArrowRight" => Some((current + 1).min(last)),
        "Home" => Some(0),
        "End" => Some(last),
        _ => None,
    }
}

fn slide_width(track: &Element) -> f64 {
    track
        .first_element_child()
        .map(|slide| slide.get_bounding_client_rect().width())
        .unwrap_or(0.0)
}

#[derive(Properties, PartialEq)]
pub struct CarouselProps {
    pub label: AttrValue,
    /// Must match the CSS gap between slides.
    #[prop_or(24.0)]
    pub gap: f64,
    pub children: Children,
}

#[function_component(Carousel)]
pub fn carousel(props: &CarouselProps) -> Html {
    let track_ref = use_node_ref();
    let index = use_state(|| 0usize);
    let count = props.children.len();
    let gap = props.gap;

    let go_to = {
        let track_ref = track_ref.clone();
        let index = index.clone();
        Callback::from(move |target: usize| {
            let Some(track) = track_ref.cast::<Element>() else {
                return;
            };
            let options = ScrollToOptions::new();
            options.set_left(target_offset(target, slide_width(&track), gap));
            options.set_behavior(ScrollBehavior::Smooth);
            track.scroll_to_with_scroll_to_options(&options);
            index.set(target);
        })
    };

    let onscroll = {
        let track_ref = track_ref.clone();
        let index = index.clone();
        Callback::from(move |_: Event| {
            if let Some(track) = track_ref.cast::<Element>() {
                let current = carousel_index(track.scroll_left() as f64, slide_width(&track), gap, count);
                if current != *index {
                    index.set(current);
                }
            }
        })
    };

    let onkeydown = {
        let go_to = go_to.clone();
        let current = *index;
        Callback::from(move |e: KeyboardEvent| {
            if let Some(target) = key_target(&e.key(), current, count) {
                e.prevent_default();
                go_to.emit(target);
            }
        })
    };

    let step = |delta: isize| {
        let go_to = go_to.clone();
        let target = (*index as isize + delta).clamp(0, count.saturating_sub(1) as isize) as usize;
        Callback::from(move |_: MouseEvent| go_to.emit(target))
    };

    html! {
        <div class="carousel" role="region" aria-roledescription="carousel" aria-label={props.label.clone()}
            tabindex="0" {onkeydown}>
            <div class="carousel-track" ref={track_ref} {onscroll}>
                { for props.children.iter().enumerate().map(|(i, slide)| html! {
                    <div class={classes!("carousel-slide", (i == *index).then_some("is-active"))}
                        aria-hidden={(i != *index).to_string()}>
                        { slide }
                    </div>
                }) }
            </div>
            <div class="carousel-controls">
                <button class="carousel-prev" aria-label="Previous" disabled={*index == 0} onclick={step(-1)}>{"‹"}</button>
                <div class="carousel-dots">
                    { for (0..count).map(|i| {
                        let go_to = go_to.clone();
                        html! {
                            <button class={classes!("carousel-dot", (i == *index).then_some("is-active"))}
                                aria-label={format!("Slide {}", i + 1)}
                                onclick={Callback::from(move |_: MouseEvent| go_to.emit(i))}></button>
                        }
                    }) }
                </div>
                <button class="carousel-next" aria-label="Next" disabled={*index + 1 >= count} onclick={step(1)}>{"›"}</button>
            </div>
        </div>
    }
}
