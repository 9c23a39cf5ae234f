use yew::prelude::*;
use yew_router::prelude::*;
use crate::components::apply_form::ApplyForm;
use crate::components::enroll_form::EnrollForm;
use crate::components::modal::{Modal, OpenModalButton};
use crate::courses::find_course;
use crate::effects::reveal::Reveal;
use crate::pages::not_found::NotFound;
use crate::Route;

const ENROLL_MODAL: &str = "enroll";

#[derive(Properties, PartialEq)]
pub struct CoursePageProps {
    pub slug: AttrValue,
}

#[function_component(CoursePage)]
pub fn course_page(props: &CoursePageProps) -> Html {
    let Some(course) = find_course(&props.slug) else {
        return html! { <NotFound /> };
    };

    html! {
        <div class="course-page">
            <header class="course-hero">
                <Link<Route> to={Route::Home} classes="back-link">{"← All courses"}</Link<Route>>
                <h1>{course.title}</h1>
                <p class="course-summary">{course.summary}</p>
                <dl class="course-facts">
                    <dt>{"Duration"}</dt><dd>{course.duration}</dd>
                    <dt>{"Format"}</dt><dd>{course.format}</dd>
                </dl>
                <OpenModalButton name={ENROLL_MODAL} class={classes!("btn", "btn-secondary")}>
                    {"Sign the agreement"}
                </OpenModalButton>
            </header>

            <Reveal class="course-outcomes">
                <h2>{"You will learn"}</h2>
                <ul>
                    { for course.outcomes.iter().map(|outcome| html! { <li>{*outcome}</li> }) }
                </ul>
            </Reveal>

            <Reveal class="course-apply">
                <h2>{"Apply for the next group"}</h2>
                <ApplyForm form_id={format!("apply-{}", course.slug)} course={course.slug} strict_phone=true />
            </Reveal>

            <Modal name={ENROLL_MODAL} title={format!("Agreement: {}", course.title)}>
                <EnrollForm course={course.slug} modal={Some(AttrValue::Static(ENROLL_MODAL))} />
            </Modal>
        </div>
    }
}
