//! Public pages.

use actix_web::{HttpResponse, get, web};

use super::flash::FlashQuery;
use super::views;
use crate::auth::SessionContext;

/// Home page. Shows the flash message and whether the user is signed in.
///
/// GET /
#[get("/")]
pub async fn home(session: SessionContext, query: web::Query<FlashQuery>) -> HttpResponse {
    let user = session.user();
    views::html(views::home_page(user.as_ref(), query.message.as_deref()))
}
