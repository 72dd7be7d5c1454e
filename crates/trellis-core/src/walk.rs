//! Route walking
//!
//! [`walk`] visits every `(method, pattern)` pair registered on a router and
//! on the routers mounted below it, with the full pattern and the complete
//! middleware stack a request to that route passes through. Documentation
//! generators and route listings are built on top of it.

use crate::chain::BoxMiddleware;
use crate::handler::BoxHandler;
use crate::mux::Routes;
use http::Method;

/// Visit every route of `routes`.
///
/// The callback receives the method, the full pattern with mount points
/// collapsed (`/api/*` + `/users` gives `/api/users`), the endpoint without
/// its middlewares, and the middlewares in execution order: mount parents
/// first, then the router's own stack, then the route's scoped middlewares.
///
/// Routes registered for any method are reported once per concrete method.
/// Walking stops at the first error returned by the callback.
pub fn walk<F, E>(routes: &dyn Routes, mut f: F) -> Result<(), E>
where
    F: FnMut(&Method, &str, &BoxHandler, &[BoxMiddleware]) -> Result<(), E>,
{
    walk_inner(routes, &mut f, "", &[])
}

fn walk_inner<F, E>(
    routes: &dyn Routes,
    f: &mut F,
    parent_pattern: &str,
    parent_middlewares: &[BoxMiddleware],
) -> Result<(), E>
where
    F: FnMut(&Method, &str, &BoxHandler, &[BoxMiddleware]) -> Result<(), E>,
{
    let mut middlewares = parent_middlewares.to_vec();
    middlewares.extend(routes.middlewares().iter().cloned());

    for route in routes.routes() {
        let pattern = format!("{}{}", parent_pattern, route.pattern);

        if let Some(sub) = route.sub_routes() {
            walk_inner(sub, f, &pattern, &middlewares)?;
            continue;
        }

        let full = pattern.replace("/*/", "/");
        for (method, handler) in route.handlers.iter() {
            let mut stack = middlewares.clone();
            stack.extend(handler.middlewares().iter().cloned());
            f(method, &full, handler.endpoint(), &stack)?;
        }
    }
    Ok(())
}
