//! Request-scoped values
//!
//! Values are stored in the request extensions, keyed by type, and read back
//! with `req.extensions().get::<T>()`.

use crate::chain::Middleware;
use crate::handler::{boxed, BoxHandler};
use crate::request::Request;

/// Inserts a clone of a value into every request's extensions.
#[derive(Debug, Clone)]
pub struct WithValue<T> {
    value: T,
}

/// Make `value` available to every handler below this middleware.
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Db(Pool);
///
/// mux.layer(with_value(Db(pool)));
/// mux.get("/users", |req: Request| async move {
///     let db = req.extensions().get::<Db>().cloned();
///     // ...
/// });
/// ```
pub fn with_value<T>(value: T) -> WithValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    WithValue { value }
}

impl<T> Middleware for WithValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let value = self.value.clone();
        boxed(move |mut req: Request| {
            req.extensions_mut().insert(value.clone());
            next.call(req)
        })
    }
}
