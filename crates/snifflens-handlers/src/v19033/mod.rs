//! Baseline layouts introduced in build 6.0.2.19033.

mod hotfix;
mod party;

use snifflens_core::{RegistryBuilder, RouteKey};

pub(crate) fn register(routes: &mut RegistryBuilder<RouteKey>) {
    party::register(routes);
    hotfix::register(routes);
}
