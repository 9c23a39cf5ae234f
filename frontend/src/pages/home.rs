use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;
use yew_router::prelude::*;
use crate::components::apply_form::ApplyForm;
use crate::components::carousel::Carousel;
use crate::components::faq::FaqItem;
use crate::components::modal::{Modal, OpenModalButton};
use crate::courses::COURSES;
use crate::effects::parallax::use_parallax;
use crate::effects::reveal::Reveal;
use crate::metrics::record_visit;
use crate::Route;

pub const APPLY_MODAL: &str = "apply";

#[function_component(Home)]
pub fn home() -> Html {
    let hero_layer = use_node_ref();
    use_parallax(hero_layer.clone(), 0.25, 140.0);

    use_effect_with_deps(
        |_| {
            spawn_local(record_visit("home"));
            || ()
        },
        (),
    );

    html! {
        <div class="home-page">
            <header class="hero">
                <div class="hero-layer" ref={hero_layer}></div>
                <div class="hero-content">
                    <h1>{"Learn to build software with people who ship it"}</h1>
                    <p class="hero-subtitle">
                        {"Small groups, live mentors and real projects. Start from zero or level up."}
                    </p>
                    <OpenModalButton name={APPLY_MODAL} class={classes!("btn", "btn-primary")}>
                        {"Get a free consultation"}
                    </OpenModalButton>
                </div>
            </header>

            <Reveal class="courses-section">
                <h2>{"Courses"}</h2>
                <Carousel label="Courses">
                    { for COURSES.iter().map(|course| html! {
                        <article class="course-card">
                            <h3>{course.title}</h3>
                            <p>{course.summary}</p>
                            <p class="course-meta">{course.duration}</p>
                            <Link<Route> to={Route::Course { slug: course.slug.to_string() }} classes="btn btn-secondary">
                                {"Learn more"}
                            </Link<Route>>
                        </article>
                    }) }
                </Carousel>
            </Reveal>

            <Reveal class="why-section">
                <h2>{"How we teach"}</h2>
                <ul class="why-list">
                    <li>{"Groups of up to twelve students and a mentor who reviews every assignment"}</li>
                    <li>{"Projects built the way teams build them: tickets, reviews and deployments"}</li>
                    <li>{"Career support until your first offer"}</li>
                </ul>
            </Reveal>

            <Reveal class="faq-section">
                <h2>{"Questions"}</h2>
                <FaqItem question="Do I need any experience?">
                    <p>{"No. Python for beginners starts from the very first line of code, and every track begins with an entry interview to find the right group."}</p>
                </FaqItem>
                <FaqItem question="How are classes held?">
                    <p>{"Live online sessions twice a week, recorded in case you miss one, plus a group chat with your mentor."}</p>
                </FaqItem>
                <FaqItem question="Can I pay in installments?">
                    <p>{"Yes. The agreement lets you pay monthly at no extra cost."}</p>
                </FaqItem>
                <FaqItem question="What if the course is not for me?">
                    <p>{"Within the first two weeks you can cancel and get a full refund."}</p>
                </FaqItem>
            </Reveal>

            <Modal name={APPLY_MODAL} title="Free consultation">
                <ApplyForm modal={Some(AttrValue::Static(APPLY_MODAL))} />
            </Modal>
        </div>
    }
}
