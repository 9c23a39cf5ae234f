use std::rc::Rc;
use web_sys::{KeyboardEvent, MouseEvent};
use yew::prelude::*;
use yew_hooks::use_event_with_window;

pub const BODY_LOCK_CLASS: &str = "modal-open";

/// Which panels are open, most recent last.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModalState {
    open: Vec<String>,
}

pub enum ModalAction {
    Open(String),
    Close(String),
    /// Escape key: close whatever was opened last.
    CloseTop,
}

impl ModalState {
    pub fn is_open(&self, name: &str) -> bool {
        self.open.iter().any(|open| open == name)
    }

    /// Page scrolling stays locked while any panel is open.
    pub fn body_locked(&self) -> bool {
        !self.open.is_empty()
    }
}

impl Reducible for ModalState {
    type Action = ModalAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut open = self.open.clone();
        match action {
            ModalAction::Open(name) => {
                open.retain(|existing| existing != &name);
                open.push(name);
            }
            ModalAction::Close(name) => open.retain(|existing| existing != &name),
            ModalAction::CloseTop => {
                open.pop();
            }
        }
        Rc::new(ModalState { open })
    }
}

pub type ModalContext = UseReducerHandle<ModalState>;

fn sync_body_lock(locked: bool) {
    let body = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.body());
    if let Some(body) = body {
        if let Err(e) = body.class_list().toggle_with_force(BODY_LOCK_CLASS, locked) {
            log::warn!("Could not toggle body lock: {:?}", e);
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct ModalProviderProps {
    pub children: Children,
}

/// Owns the modal state for the page and keeps `<body>` in sync with it.
#[function_component(ModalProvider)]
pub fn modal_provider(props: &ModalProviderProps) -> Html {
    let modals = use_reducer(ModalState::default);

    {
        let locked = modals.body_locked();
        use_effect_with_deps(
            move |locked| {
                sync_body_lock(*locked);
                || ()
            },
            locked,
        );
    }

    {
        let modals = modals.clone();
        use_event_with_window("keydown", move |e: KeyboardEvent| {
            if e.key() == "Escape" && modals.body_locked() {
                modals.dispatch(ModalAction::CloseTop);
            }
        });
    }

    html! {
        <ContextProvider<ModalContext> context={modals}>
            { for props.children.iter() }
        </ContextProvider<ModalContext>>
    }
}

#[derive(Properties, PartialEq)]
pub struct ModalProps {
    pub name: AttrValue,
    pub title: AttrValue,
    pub children: Children,
}

#[function_component(Modal)]
pub fn modal(props: &ModalProps) -> Html {
    let modals = match use_context::<ModalContext>() {
        Some(modals) => modals,
        None => {
            log::error!("Modal {} rendered outside ModalProvider", props.name);
            return html! {};
        }
    };
    if !modals.is_open(&props.name) {
        return html! {};
    }

    let close = {
        let modals = modals.clone();
        let name = props.name.to_string();
        Callback::from(move |_: MouseEvent| modals.dispatch(ModalAction::Close(name.clone())))
    };
    // Clicks inside the panel must not reach the backdrop.
    let keep_open = Callback::from(|e: MouseEvent| e.stop_propagation());

    html! {
        <div class="modal-backdrop" onclick={close.clone()}>
            <div class="modal-panel" role="dialog" aria-modal="true" aria-label={props.title.clone()} onclick={keep_open}>
                <button class="modal-close" aria-label="Close" onclick={close}>{"×"}</button>
                <h2 class="modal-title">{&props.title}</h2>
                { for props.children.iter() }
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct OpenModalButtonProps {
    pub name: AttrValue,
    #[prop_or_default]
    pub class: Classes,
    pub children: Children,
}

#[function_component(OpenModalButton)]
pub fn open_modal_button(props: &OpenModalButtonProps) -> Html {
    let modals = use_context::<ModalContext>();
    let onclick = {
        let name = props.name.to_string();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            if let Some(modals) = &modals {
                modals.dispatch(ModalAction::Open(name.clone()));
            }
        })
    };
    html! {
        <button class={props.class.clone()} {onclick}>{ for props.children.iter() }</button>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(state: ModalState, action: ModalAction) -> ModalState {
        (*Rc::new(state).reduce(action)).clone()
    }

    #[test]
    fn body_lock_follows_open_panels() {
        let state = ModalState::default();
        assert!(!state.body_locked());

        let state = apply(state, ModalAction::Open("apply".to_string()));
        assert!(state.is_open("apply"));
        assert!(state.body_locked());

        let state = apply(state, ModalAction::Close("apply".to_string()));
        assert!(!state.body_locked());
    }

    #[test]
    fn escape_closes_the_most_recent_panel() {
        let state = apply(ModalState::default(), ModalAction::Open("apply".to_string()));
        let state = apply(state, ModalAction::Open("enroll".to_string()));
        let state = apply(state, ModalAction::CloseTop);
        assert!(state.is_open("apply"));
        assert!(!state.is_open("enroll"));

        let state = apply(state, ModalAction::CloseTop);
        assert!(!state.body_locked());
        // Nothing open: a stray Escape is harmless.
        assert_eq!(apply(state.clone(), ModalAction::CloseTop), state);
    }

    #[test]
    fn reopening_moves_a_panel_to_the_top() {
        let state = apply(ModalState::default(), ModalAction::Open("a".to_string()));
        let state = apply(state, ModalAction::Open("b".to_string()));
        let state = apply(state, ModalAction::Open("a".to_string()));
        let state = apply(state, ModalAction::CloseTop);
        assert!(state.is_open("b"));
        assert!(!state.is_open("a"));
    }
}
