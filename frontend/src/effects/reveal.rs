use js_sys::Array;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};
use yew::prelude::*;

pub const REVEALED_CLASS: &str = "is-visible";
const THRESHOLD: f64 = 0.15;

/// Fires once, on the first intersecting entry.
#[derive(Debug, Default)]
pub struct RevealOnce {
    revealed: bool,
}

impl RevealOnce {
    pub fn on_entry(&mut self, intersecting: bool) -> bool {
        if self.revealed || !intersecting {
            return false;
        }
        self.revealed = true;
        true
    }
}

fn reveal(target: &Element) {
    if let Err(e) = target.class_list().add_1(REVEALED_CLASS) {
        log::warn!("Could not reveal element: {:?}", e);
    }
}

type ObserverCallback = Closure<dyn FnMut(Array, IntersectionObserver)>;

fn observe_once(target: &Element) -> Option<(IntersectionObserver, ObserverCallback)> {
    let mut once = RevealOnce::default();
    let callback = Closure::wrap(Box::new(move |entries: Array, observer: IntersectionObserver| {
        for entry in entries.iter() {
            let entry: IntersectionObserverEntry = entry.unchecked_into();
            if once.on_entry(entry.is_intersecting()) {
                let target = entry.target();
                reveal(&target);
                observer.unobserve(&target);
            }
        }
    }) as Box<dyn FnMut(Array, IntersectionObserver)>);

    let init = IntersectionObserverInit::new();
    init.set_threshold(&JsValue::from_f64(THRESHOLD));
    match IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init) {
        Ok(observer) => {
            observer.observe(target);
            Some((observer, callback))
        }
        Err(e) => {
            log::warn!("IntersectionObserver unavailable, showing content: {:?}", e);
            reveal(target);
            None
        }
    }
}

/// Adds `is-visible` to the node the first time it scrolls into view.
#[hook]
pub fn use_reveal(node: NodeRef) {
    use_effect_with_deps(
        move |node: &NodeRef| {
            let observer = node.cast::<Element>().and_then(|target| observe_once(&target));
            move || {
                if let Some((observer, _callback)) = observer {
                    observer.disconnect();
                }
            }
        },
        node,
    );
}

#[derive(Properties, PartialEq)]
pub struct RevealProps {
    #[prop_or_default]
    pub class: Classes,
    pub children: Children,
}

/// A section that fades in on first sight.
#[function_component(Reveal)]
pub fn reveal_section(props: &RevealProps) -> Html {
    let node = use_node_ref();
    use_reveal(node.clone());
    html! {
        <section ref={node} class={classes!("reveal", props.class.clone())}>
            { for props.children.iter() }
        </section>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveals_only_on_first_intersection() {
        let mut once = RevealOnce::default();
        assert!(!once.on_entry(false));
        assert!(once.on_entry(true));
        assert!(!once.on_entry(true));
        assert!(!once.on_entry(false));
    }
}
