use gloo_timers::callback::Timeout;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlFormElement, HtmlInputElement, SubmitEvent};
use yew::prelude::*;
use crate::components::apply_form::{close_after_success, input_value, FormNotice};
use crate::components::form_guard::{enroll_guard, post_form};
use crate::components::handle_field::{revalidate, CheckerContext, HandleField};
use crate::components::modal::ModalContext;
use crate::validation::lookup::HandleStatus;

pub const AGREEMENT_VERSION: &str = "offer-2024-09";

#[derive(Properties, PartialEq)]
pub struct EnrollFormProps {
    pub course: AttrValue,
    #[prop_or_default]
    pub modal: Option<AttrValue>,
}

/// Signs the study agreement for `course`.
#[function_component(EnrollForm)]
pub fn enroll_form(props: &EnrollFormProps) -> Html {
    let checker = use_context::<CheckerContext>().unwrap_or_default();
    let modals = use_context::<ModalContext>();
    let form_ref = use_node_ref();
    let phone_ref = use_node_ref();
    let email_ref = use_node_ref();
    let consent_ref = use_node_ref();
    let handle_ref = use_node_ref();
    let handle_status = use_state(|| HandleStatus::Idle);
    let notice = use_state(|| None::<FormNotice>);
    let submitting = use_state(|| false);
    let close_timer = use_mut_ref(|| None::<Timeout>);
    let field_key = format!("enroll-{}", props.course);

    let on_handle_status = {
        let handle_status = handle_status.clone();
        Callback::from(move |status: HandleStatus| handle_status.set(status))
    };

    let onsubmit = {
        let checker = checker.clone();
        let form_ref = form_ref.clone();
        let phone_ref = phone_ref.clone();
        let email_ref = email_ref.clone();
        let consent_ref = consent_ref.clone();
        let handle_ref = handle_ref.clone();
        let handle_status = handle_status.clone();
        let on_handle_status = on_handle_status.clone();
        let notice = notice.clone();
        let submitting = submitting.clone();
        let close_timer = close_timer.clone();
        let modals = modals.clone();
        let modal = props.modal.clone();
        let field_key = field_key.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *submitting {
                return;
            }
            let mut status = *handle_status;
            if status == HandleStatus::Idle {
                status = revalidate(&checker, &field_key, &handle_ref, true, &on_handle_status);
            }
            let consent = consent_ref
                .cast::<HtmlInputElement>()
                .map(|input| input.checked())
                .unwrap_or(false);
            let guard = enroll_guard(
                &input_value(&phone_ref),
                &input_value(&email_ref),
                consent,
                false,
                status,
            );
            if let Err(block) = guard {
                notice.set(Some(FormNotice::Error(block.message().to_string())));
                return;
            }
            let Some(form) = form_ref.cast::<HtmlFormElement>() else {
                return;
            };
            notice.set(None);
            submitting.set(true);

            let notice = notice.clone();
            let submitting = submitting.clone();
            let close_timer = close_timer.clone();
            let modals = modals.clone();
            let modal = modal.clone();
            let handle_status = handle_status.clone();
            spawn_local(async move {
                match post_form("/enroll", &form).await {
                    Ok(()) => {
                        form.reset();
                        handle_status.set(HandleStatus::Idle);
                        notice.set(Some(FormNotice::Success("Agreement signed. We will send the details shortly.")));
                        close_after_success(&close_timer, modals, modal);
                    }
                    Err(message) => notice.set(Some(FormNotice::Error(message))),
                }
                submitting.set(false);
            });
        })
    };

    html! {
        <form class="enroll-form" ref={form_ref} {onsubmit} novalidate=true>
            <input type="hidden" name="course" value={props.course.clone()} />
            <input type="hidden" name="agreement" value={AGREEMENT_VERSION} />
            <label class="field">
                <span>{"Full name"}</span>
                <input type="text" name="full_name" autocomplete="name" required=true />
            </label>
            <label class="field">
                <span>{"Phone"}</span>
                <input type="tel" name="phone" ref={phone_ref} autocomplete="tel" />
            </label>
            <label class="field">
                <span>{"Email"}</span>
                <input type="email" name="email" ref={email_ref} autocomplete="email" />
            </label>
            <label class="field">
                <span>{"Telegram (optional)"}</span>
                <HandleField
                    field_key={field_key}
                    name="telegram"
                    input_ref={handle_ref}
                    status={*handle_status}
                    on_status={on_handle_status}
                />
            </label>
            <label class="field checkbox">
                <input type="checkbox" name="consent" value="yes" ref={consent_ref} />
                <span>{"I accept the terms of the offer and agree to the processing of my personal data"}</span>
            </label>
            { FormNotice::view(&notice) }
            <button type="submit" class="btn btn-primary" disabled={*submitting}>
                { if *submitting { "Sending…" } else { "Sign agreement" } }
            </button>
        </form>
    }
}
