use std::cell::RefCell;
use std::rc::Rc;
use gloo_timers::callback::Timeout;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;
use crate::validation::handle_checker::{FireOutcome, HandleChecker, InputOutcome, Ticket, DEBOUNCE_MS};
use crate::validation::lookup::{fetch_lookup, HandleStatus};

pub type Checker = HandleChecker<String, Timeout>;

/// One checker per page, so every handle field shares the lookup cache.
#[derive(Clone, Default)]
pub struct CheckerContext(pub Rc<RefCell<Checker>>);

impl PartialEq for CheckerContext {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

fn current_value(input: &NodeRef) -> String {
    input
        .cast::<HtmlInputElement>()
        .map(|input| input.value())
        .unwrap_or_default()
}

async fn fire(checker: CheckerContext, ticket: Ticket<String>, input: NodeRef, on_status: Callback<HandleStatus>) {
    let outcome = checker.0.borrow_mut().on_timer(&ticket, &current_value(&input));
    match outcome {
        FireOutcome::Abandoned => {}
        FireOutcome::Resolved(status) => on_status.emit(status),
        FireOutcome::Lookup(handle) => {
            let result = fetch_lookup(&handle).await;
            let shown = checker
                .0
                .borrow_mut()
                .on_response(&ticket, result, &current_value(&input));
            if let Some(status) = shown {
                on_status.emit(status);
            }
        }
    }
}

/// Feeds the field's current text to the checker and returns the status to show
/// right away. A scheduled lookup reports its result later through `on_status`.
pub fn revalidate(
    checker: &CheckerContext,
    key: &str,
    input: &NodeRef,
    force: bool,
    on_status: &Callback<HandleStatus>,
) -> HandleStatus {
    let raw = current_value(input);
    let outcome = checker.0.borrow_mut().on_input(&key.to_string(), &raw, force);
    let status = match outcome {
        InputOutcome::Idle => HandleStatus::Idle,
        InputOutcome::Invalid => HandleStatus::Invalid,
        InputOutcome::Resolved(status) => status,
        InputOutcome::Schedule(ticket) => {
            let timer = {
                let checker = checker.clone();
                let ticket = ticket.clone();
                let input = input.clone();
                let on_status = on_status.clone();
                Timeout::new(DEBOUNCE_MS, move || {
                    // The checker drops this timer once it fires, so the work
                    // runs after the timer callback has returned.
                    spawn_local(fire(checker, ticket, input, on_status));
                })
            };
            checker.0.borrow_mut().arm(&ticket, timer);
            HandleStatus::Pending
        }
    };
    on_status.emit(status);
    status
}

#[derive(Properties, PartialEq)]
pub struct HandleFieldProps {
    /// Distinguishes this field inside the shared checker.
    pub field_key: AttrValue,
    pub name: AttrValue,
    pub input_ref: NodeRef,
    pub status: HandleStatus,
    pub on_status: Callback<HandleStatus>,
    #[prop_or(AttrValue::Static("@username"))]
    pub placeholder: AttrValue,
}

#[function_component(HandleField)]
pub fn handle_field(props: &HandleFieldProps) -> Html {
    let checker = use_context::<CheckerContext>().unwrap_or_default();

    let check = |force: bool| {
        let checker = checker.clone();
        let key = props.field_key.to_string();
        let input = props.input_ref.clone();
        let on_status = props.on_status.clone();
        move || {
            revalidate(&checker, &key, &input, force, &on_status);
        }
    };
    let oninput = {
        let check = check(false);
        Callback::from(move |_: InputEvent| check())
    };
    let onblur = {
        let check = check(true);
        Callback::from(move |_: FocusEvent| check())
    };

    let status = props.status;
    html! {
        <div class={classes!("field", "handle-field", status.class())}>
            <input
                type="text"
                name={props.name.clone()}
                ref={props.input_ref.clone()}
                placeholder={props.placeholder.clone()}
                autocomplete="off"
                autocapitalize="none"
                spellcheck="false"
                {oninput}
                {onblur}
            />
            <span class="field-hint" aria-live="polite">{status.message()}</span>
        </div>
    }
}
