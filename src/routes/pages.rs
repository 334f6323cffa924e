use actix_web::{get, HttpResponse};
use serde_json::json;

use crate::auth::CurrentUser;
use crate::flash::Messages;

/// Landing page, open to everyone.
#[get("/")]
pub async fn index(user: Option<CurrentUser>, messages: Messages) -> HttpResponse {
    messages.render(json!({
        "page": "index",
        "user": user,
    }))
}
