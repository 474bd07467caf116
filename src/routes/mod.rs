pub mod automation;
pub mod health;
pub mod policies;
pub mod stations;

use crate::services::wxm::WxmClient;
use crate::store::SharedPolicyStore;

/// Shared application state for station and policy endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) wxm: WxmClient,
    pub(crate) store: SharedPolicyStore,
}
