use std::cell::RefCell;
use std::rc::Rc;
use gloo_timers::callback::Timeout;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlFormElement, HtmlInputElement, SubmitEvent};
use yew::prelude::*;
use crate::components::form_guard::{apply_guard, post_form, SubmitBlock, CLOSE_AFTER_SUCCESS_MS};
use crate::components::handle_field::{revalidate, CheckerContext, HandleField};
use crate::components::modal::{ModalAction, ModalContext};
use crate::validation::lookup::HandleStatus;

#[derive(Clone, PartialEq)]
pub enum FormNotice {
    Success(&'static str),
    Error(String),
}

impl FormNotice {
    pub fn view(notice: &Option<FormNotice>) -> Html {
        match notice {
            Some(FormNotice::Success(text)) => html! { <p class="form-message success">{*text}</p> },
            Some(FormNotice::Error(text)) => html! { <p class="form-message error">{text}</p> },
            None => html! {},
        }
    }
}

pub fn input_value(input: &NodeRef) -> String {
    input
        .cast::<HtmlInputElement>()
        .map(|input| input.value())
        .unwrap_or_default()
}

/// Closes `modal` once the success message has been on screen for a moment.
/// The timer lives in `slot`, so unmounting the form cancels it.
pub fn close_after_success(
    slot: &Rc<RefCell<Option<Timeout>>>,
    modals: Option<ModalContext>,
    modal: Option<AttrValue>,
) {
    let (Some(modals), Some(modal)) = (modals, modal) else {
        return;
    };
    let timer = Timeout::new(CLOSE_AFTER_SUCCESS_MS, move || {
        // Closing unmounts the form, which drops this timer.
        spawn_local(async move { modals.dispatch(ModalAction::Close(modal.to_string())) });
    });
    *slot.borrow_mut() = Some(timer);
}

#[derive(Properties, PartialEq)]
pub struct ApplyFormProps {
    /// Keeps the handle field apart from other forms on the page.
    #[prop_or(AttrValue::Static("apply"))]
    pub form_id: AttrValue,
    #[prop_or_default]
    pub course: AttrValue,
    /// Modal to close after a successful submit.
    #[prop_or_default]
    pub modal: Option<AttrValue>,
    #[prop_or_default]
    pub strict_phone: bool,
}

#[function_component(ApplyForm)]
pub fn apply_form(props: &ApplyFormProps) -> Html {
    let checker = use_context::<CheckerContext>().unwrap_or_default();
    let modals = use_context::<ModalContext>();
    let form_ref = use_node_ref();
    let phone_ref = use_node_ref();
    let handle_ref = use_node_ref();
    let handle_status = use_state(|| HandleStatus::Idle);
    let phone_error = use_state(|| None::<&'static str>);
    let notice = use_state(|| None::<FormNotice>);
    let submitting = use_state(|| false);
    let close_timer = use_mut_ref(|| None::<Timeout>);

    let on_handle_status = {
        let handle_status = handle_status.clone();
        Callback::from(move |status: HandleStatus| handle_status.set(status))
    };

    let onsubmit = {
        let checker = checker.clone();
        let form_ref = form_ref.clone();
        let phone_ref = phone_ref.clone();
        let handle_ref = handle_ref.clone();
        let handle_status = handle_status.clone();
        let on_handle_status = on_handle_status.clone();
        let phone_error = phone_error.clone();
        let notice = notice.clone();
        let submitting = submitting.clone();
        let close_timer = close_timer.clone();
        let modals = modals.clone();
        let modal = props.modal.clone();
        let strict_phone = props.strict_phone;
        let form_id = props.form_id.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *submitting {
                return;
            }
            let mut status = *handle_status;
            if status == HandleStatus::Idle {
                // Short input that was never flagged while typing.
                status = revalidate(&checker, &form_id, &handle_ref, true, &on_handle_status);
            }
            if let Err(block) = apply_guard(&input_value(&phone_ref), strict_phone, status) {
                log::info!("Apply form blocked: {:?}", block);
                if block == SubmitBlock::PhoneImplausible {
                    phone_error.set(Some(block.message()));
                }
                notice.set(Some(FormNotice::Error(block.message().to_string())));
                return;
            }
            let Some(form) = form_ref.cast::<HtmlFormElement>() else {
                return;
            };
            phone_error.set(None);
            notice.set(None);
            submitting.set(true);

            let notice = notice.clone();
            let submitting = submitting.clone();
            let close_timer = close_timer.clone();
            let modals = modals.clone();
            let modal = modal.clone();
            let handle_status = handle_status.clone();
            spawn_local(async move {
                match post_form("/apply", &form).await {
                    Ok(()) => {
                        form.reset();
                        handle_status.set(HandleStatus::Idle);
                        notice.set(Some(FormNotice::Success("Thanks! We will contact you shortly.")));
                        close_after_success(&close_timer, modals, modal);
                    }
                    Err(message) => notice.set(Some(FormNotice::Error(message))),
                }
                submitting.set(false);
            });
        })
    };

    let clear_phone_error = {
        let phone_error = phone_error.clone();
        Callback::from(move |_: InputEvent| phone_error.set(None))
    };

    html! {
        <form class="apply-form" ref={form_ref} {onsubmit} novalidate=true>
            <input type="hidden" name="course" value={props.course.clone()} />
            <label class="field">
                <span>{"Your name"}</span>
                <input type="text" name="name" autocomplete="name" required=true />
            </label>
            <label class={classes!("field", phone_error.is_some().then_some("is-invalid"))}>
                <span>{"Phone"}</span>
                <input type="tel" name="phone" ref={phone_ref} autocomplete="tel"
                    placeholder="+7 999 123-45-67" required=true oninput={clear_phone_error} />
                if let Some(message) = *phone_error {
                    <span class="field-hint">{message}</span>
                }
            </label>
            <label class="field">
                <span>{"Telegram (optional)"}</span>
                <HandleField
                    field_key={props.form_id.clone()}
                    name="telegram"
                    input_ref={handle_ref}
                    status={*handle_status}
                    on_status={on_handle_status}
                />
            </label>
            { FormNotice::view(&notice) }
            <button type="submit" class="btn btn-primary" disabled={*submitting}>
                { if *submitting { "Sending…" } else { "Send application" } }
            </button>
        </form>
    }
}
