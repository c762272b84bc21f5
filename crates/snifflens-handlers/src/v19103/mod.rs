//! Layout revisions introduced in build 6.0.3.19103.

mod hotfix;

use snifflens_core::{RegistryBuilder, RouteKey};

pub(crate) fn register(routes: &mut RegistryBuilder<RouteKey>) {
    hotfix::register(routes);
}
