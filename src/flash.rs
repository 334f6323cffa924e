//! One-shot notices shown on the page after a redirect.
//!
//! A redirecting handler stores its notice in the `messages` cookie; the next page
//! reads it through the [`Messages`] extractor and clears it while rendering.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{Error as ActixError, FromRequest, HttpRequest, HttpResponse, HttpResponseBuilder};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

/// Name of the cookie carrying pending notices.
pub const FLASH_COOKIE: &str = "messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

impl FlashMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }
}

/// Serializes notices into a cookie-safe string.
pub fn encode(messages: &[FlashMessage]) -> String {
    serde_json::to_vec(messages)
        .map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
        .unwrap_or_default()
}

/// Reads notices back; anything unreadable yields no notices.
pub fn decode(value: &str) -> Vec<FlashMessage> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

pub fn cookie(messages: &[FlashMessage]) -> Cookie<'static> {
    Cookie::build(FLASH_COOKIE, encode(messages))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(FLASH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Like [`redirect`], but leaves the builder open for more cookies.
pub fn found(location: &str, message: FlashMessage) -> HttpResponseBuilder {
    let mut builder = HttpResponse::Found();
    builder
        .insert_header((header::LOCATION, location))
        .cookie(cookie(&[message]));
    builder
}

/// `302 Found` to `location` with `message` queued for the next page.
pub fn redirect(location: &str, message: FlashMessage) -> HttpResponse {
    found(location, message).finish()
}

#[derive(Serialize)]
struct Page<'a, T: Serialize> {
    messages: &'a [FlashMessage],
    #[serde(flatten)]
    context: T,
}

/// Notices pending for the current request.
#[derive(Debug, Clone, Default)]
pub struct Messages(pub Vec<FlashMessage>);

impl Messages {
    /// Renders a page: `context` fields plus the pending `messages`, which are
    /// consumed by this response.
    pub fn render<T: Serialize>(self, context: T) -> HttpResponse {
        let mut response = HttpResponse::Ok();
        if !self.0.is_empty() {
            response.cookie(removal_cookie());
        }
        response.json(Page {
            messages: &self.0,
            context,
        })
    }
}

impl FromRequest for Messages {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let messages = req
            .cookie(FLASH_COOKIE)
            .map(|c| decode(c.value()))
            .unwrap_or_default();
        ready(Ok(Messages(messages)))
    }
}
