use yew::prelude::*;
use yew_router::prelude::*;
use log::{info, Level};

mod config;
mod courses;
mod metrics;
mod validation {
    pub mod handle;
    pub mod handle_checker;
    pub mod lookup;
    pub mod phone;
}
mod components {
    pub mod apply_form;
    pub mod carousel;
    pub mod enroll_form;
    pub mod faq;
    pub mod footer;
    pub mod form_guard;
    pub mod handle_field;
    pub mod modal;
}
mod effects {
    pub mod parallax;
    pub mod reveal;
}
mod pages {
    pub mod course;
    pub mod home;
    pub mod not_found;
}

use components::footer::Footer;
use components::handle_field::CheckerContext;
use components::modal::{ModalProvider, OpenModalButton};
use pages::{course::CoursePage, home::{Home, APPLY_MODAL}, not_found::NotFound};

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[at("/")]
    Home,
    #[at("/courses/:slug")]
    Course { slug: String },
    #[not_found]
    #[at("/404")]
    NotFound,
}

fn switch(routes: Route) -> Html {
    match routes {
        Route::Home => {
            info!("Rendering Home page");
            html! { <Home /> }
        }
        Route::Course { slug } => {
            info!("Rendering course page {}", slug);
            html! { <CoursePage slug={slug} /> }
        }
        Route::NotFound => html! { <NotFound /> },
    }
}

#[function_component(Nav)]
pub fn nav() -> Html {
    let route = use_route::<Route>();
    let on_home = matches!(route, Some(Route::Home));

    html! {
        <nav class="top-nav">
            <div class="nav-content">
                <Link<Route> to={Route::Home} classes="nav-logo">{"Academy"}</Link<Route>>
                if on_home {
                    <OpenModalButton name={APPLY_MODAL} class={classes!("nav-cta")}>
                        {"Apply"}
                    </OpenModalButton>
                }
            </div>
        </nav>
    }
}

#[function_component]
fn App() -> Html {
    // Shared by every handle field so lookups are cached for the whole session.
    let checker = use_memo(|_| CheckerContext::default(), ());

    html! {
        <BrowserRouter>
            <ContextProvider<CheckerContext> context={(*checker).clone()}>
                <ModalProvider>
                    <Nav />
                    <Switch<Route> render={switch} />
                    <Footer />
                </ModalProvider>
            </ContextProvider<CheckerContext>>
        </BrowserRouter>
    }
}

fn main() {
    console_error_panic_hook::set_once();

    console_log::init_with_level(Level::Info).expect("error initializing log");

    info!("Starting application");
    yew::Renderer::<App>::new().render();
}
