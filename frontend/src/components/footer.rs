use gloo_net::http::Request;
use serde::Deserialize;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;
use crate::config;

#[derive(Deserialize, Clone, Default, PartialEq)]
pub struct Contacts {
    pub phone: Option<String>,
    pub phone_link: Option<String>,
    pub telegram: Option<String>,
    pub telegram_link: Option<String>,
}

async fn fetch_contacts() -> Option<Contacts> {
    let url = format!("{}/api/contacts", config::get_backend_url());
    let response = match Request::get(&url).send().await {
        Ok(response) if response.ok() => response,
        Ok(response) => {
            log::warn!("Contacts answered {}", response.status());
            return None;
        }
        Err(e) => {
            log::warn!("Failed to load contacts: {}", e);
            return None;
        }
    };
    response.json::<Contacts>().await.ok()
}

fn contact_link(text: &Option<String>, link: &Option<String>) -> Html {
    match (text, link) {
        (Some(text), Some(link)) => html! { <a href={link.clone()}>{text}</a> },
        (Some(text), None) => html! { <span>{text}</span> },
        _ => html! {},
    }
}

#[function_component(Footer)]
pub fn footer() -> Html {
    let contacts = use_state(Contacts::default);

    {
        let contacts = contacts.clone();
        use_effect_with_deps(
            move |_| {
                spawn_local(async move {
                    if let Some(loaded) = fetch_contacts().await {
                        contacts.set(loaded);
                    }
                });
                || ()
            },
            (),
        );
    }

    html! {
        <footer class="site-footer">
            <div class="footer-contacts">
                { contact_link(&contacts.phone, &contacts.phone_link) }
                { contact_link(&contacts.telegram, &contacts.telegram_link) }
            </div>
            <p class="footer-note">{"Academy. Online courses in programming and data."}</p>
        </footer>
    }
}
