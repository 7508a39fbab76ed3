//! Page view models rendered with askama.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::services::{PageResult, WeatherReport};

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexView {
    pub logged_in: bool,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutView {
    pub logged_in: bool,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginView {
    pub logged_in: bool,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterView {
    pub logged_in: bool,
}

#[derive(Template)]
#[template(path = "reset_password.html")]
pub struct ResetPasswordView {
    pub logged_in: bool,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchView {
    pub logged_in: bool,
    pub query: String,
    pub results: Vec<PageResult>,
}

#[derive(Template)]
#[template(path = "weather.html")]
pub struct WeatherView {
    pub logged_in: bool,
    pub report: WeatherReport,
}

/// Render a template, logging and answering 500 on failure
pub fn render_template<T: Template>(template: &T) -> Response {
    render_with_status(StatusCode::OK, template)
}

pub fn render_with_status<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Template rendering failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Template rendering error",
            )
                .into_response()
        }
    }
}
