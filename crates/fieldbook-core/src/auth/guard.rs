use std::fmt;

use super::session::Session;

/// Entry points of the booking front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Profile,
    Orders,
    /// Schedule view for a field; browsing is public.
    Booking(String),
    /// Submitting a slot selection for payment.
    Checkout(String),
}

impl Route {
    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Profile | Route::Orders | Route::Checkout(_))
    }

    /// Pages only meaningful to anonymous visitors.
    pub fn is_auth_entry(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => f.write_str("/"),
            Route::Login => f.write_str("/login"),
            Route::Register => f.write_str("/register"),
            Route::Profile => f.write_str("/profile"),
            Route::Orders => f.write_str("/profile#orders"),
            Route::Booking(uuid) => write!(f, "/booking/{}", uuid),
            Route::Checkout(uuid) => write!(f, "/booking/{}/checkout", uuid),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Proceed,
    Redirect(Route),
}

/// Decide whether `route` may be entered with the given session.
///
/// Must be asked after the session manager has hydrated.
pub fn guard(route: &Route, session: Option<&Session>) -> Guard {
    match (session, route) {
        (None, route) if route.requires_auth() => Guard::Redirect(Route::Login),
        (Some(_), route) if route.is_auth_entry() => Guard::Redirect(Route::Home),
        _ => Guard::Proceed,
    }
}
