/// A course as shown on the site.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Course {
    pub slug: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    pub duration: &'static str,
    pub format: &'static str,
    pub outcomes: &'static [&'static str],
}

pub const COURSES: &[Course] = &[
    Course {
        slug: "fullstack",
        title: "Full-stack web development",
        summary: "From HTML to deployed services: build and ship real web applications with a mentor.",
        duration: "9 months",
        format: "Live online classes, code review every week",
        outcomes: &[
            "Frontend with modern JavaScript and a component framework",
            "Backend APIs, databases and authentication",
            "A portfolio of three deployed projects",
        ],
    },
    Course {
        slug: "data-science",
        title: "Data science",
        summary: "Python, statistics and machine learning on real datasets, ending with a capstone project.",
        duration: "8 months",
        format: "Live online classes, team projects",
        outcomes: &[
            "Data wrangling with pandas and SQL",
            "Classical machine learning and model evaluation",
            "A capstone project presented to industry reviewers",
        ],
    },
    Course {
        slug: "business",
        title: "IT for business",
        summary: "Automation, analytics and product thinking for managers and entrepreneurs.",
        duration: "4 months",
        format: "Evening workshops, case studies",
        outcomes: &[
            "Dashboards and reporting without a developer",
            "Automating routine work with no-code tools and scripts",
            "Running a product team and reading technical estimates",
        ],
    },
    Course {
        slug: "python-beginners",
        title: "Python for beginners",
        summary: "A gentle start in programming for people who have never written code.",
        duration: "3 months",
        format: "Small groups, homework with feedback",
        outcomes: &[
            "Core Python: types, loops, functions and files",
            "Small automation scripts for everyday tasks",
            "A clear path to the full-stack or data science track",
        ],
    },
];

pub fn find_course(slug: &str) -> Option<&'static Course> {
    COURSES.iter().find(|course| course.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_matches_legacy_redirect_targets() {
        for slug in ["fullstack", "data-science", "business", "python-beginners"] {
            assert!(find_course(slug).is_some(), "missing {}", slug);
        }
        assert!(find_course("cobol").is_none());
    }
}
