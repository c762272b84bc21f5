//! Layout revisions introduced in build 6.2.0.19700.

mod party;

use snifflens_core::{RegistryBuilder, RouteKey};

pub(crate) fn register(routes: &mut RegistryBuilder<RouteKey>) {
    party::register(routes);
}
