#[cfg(debug_assertions)]
pub fn get_backend_url() -> &'static str {
    "http://localhost:3000" // trunk serve talks to a local backend
}

#[cfg(not(debug_assertions))]
pub fn get_backend_url() -> &'static str {
    "" // same origin: the backend serves the built page
}
