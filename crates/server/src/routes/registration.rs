//! Registration form handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::filters;
use crate::services::registration::{self, RegistrationForm, SUCCESS_MESSAGE};
use crate::state::AppState;

/// Where a successful submission lands.
pub const SUCCESS_REDIRECT: &str = "/register?success=1";

/// Query parameters for the form page.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterQuery {
    pub success: Option<String>,
}

/// Registration form page.
#[derive(Template, WebTemplate)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub success: Option<&'static str>,
    pub error: Option<String>,
    pub form: RegistrationForm,
    pub consent_checked: bool,
}

impl RegisterTemplate {
    fn blank(success: Option<&'static str>) -> Self {
        Self {
            success,
            error: None,
            form: RegistrationForm::default(),
            consent_checked: false,
        }
    }
}

/// Display the registration form.
///
/// GET / and GET /register
#[instrument(skip_all)]
pub async fn show(Query(query): Query<RegisterQuery>) -> RegisterTemplate {
    let success = query
        .success
        .is_some_and(|v| v == "1")
        .then_some(SUCCESS_MESSAGE);
    RegisterTemplate::blank(success)
}

/// Handle a form submission.
///
/// POST /register
///
/// Success redirects (303) to an empty form with a banner. A rejected
/// submission re-renders the form with the message and the entered values.
#[instrument(skip_all)]
pub async fn submit(State(state): State<AppState>, Form(form): Form<RegistrationForm>) -> Response {
    match registration::register(&state, &form).await {
        Ok(_) => Redirect::to(SUCCESS_REDIRECT).into_response(),
        Err(e) => {
            if e.is_internal() {
                let event_id = sentry::capture_error(&e);
                tracing::error!(error = %e, sentry_event_id = %event_id, "Registration failed");
            } else {
                tracing::info!(reason = %e, "Registration rejected");
            }

            let consent_checked = form
                .consent
                .as_deref()
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("yes"));
            let page = RegisterTemplate {
                success: None,
                error: Some(e.user_message().into_owned()),
                form,
                consent_checked,
            };
            (e.status(), page).into_response()
        }
    }
}
