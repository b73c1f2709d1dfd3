use server_api::ApiContext;

use crate::sessions::SessionStore;

pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) sessions: SessionStore,
}
