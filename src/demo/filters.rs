//! Demo filters

use crate::error::ServletError;
use crate::servlet::{Filter, FilterChain, HttpRequest, HttpResponse};

pub const POWERED_BY_HEADER: &str = "X-Powered-By";
const POWERED_BY: &str = "servlet_webserver";

/// Session attribute holding the logged-in user name
const USER_ATTRIBUTE: &str = "user";

/// Adds an `X-Powered-By` header, then continues
pub struct PoweredBy;

impl Filter for PoweredBy {
    fn do_filter(
        &self,
        request: &mut HttpRequest,
        response: &mut HttpResponse,
        chain: &mut FilterChain,
    ) -> Result<(), ServletError> {
        response.set_header(POWERED_BY_HEADER, POWERED_BY);
        chain.do_filter(request, response)
    }
}

/// Lets a request through only when its session has a user
///
/// A `login` parameter stores its value as the session user first. Other
/// requests end with 403 and never reach the servlet.
pub struct SecuredArea;

impl Filter for SecuredArea {
    fn do_filter(
        &self,
        request: &mut HttpRequest,
        response: &mut HttpResponse,
        chain: &mut FilterChain,
    ) -> Result<(), ServletError> {
        if let Some(user) = request.parameter("login").map(ToString::to_string) {
            if let Some(session) = request.get_session(true)? {
                session.set_attribute(USER_ATTRIBUTE, user);
            }
        }

        let logged_in = request
            .get_session(false)?
            .is_some_and(|session| session.attribute(USER_ATTRIBUTE).is_some());
        if !logged_in {
            response.set_status(403);
            response.set_content_type("text/html; charset=utf-8");
            response.print("<html><body><h1>403 Forbidden</h1><p>Log in with ?login=name</p></body></html>\n");
            return Ok(());
        }

        chain.do_filter(request, response)
    }
}
