use crate::client::LocalFlags;

#[derive(Clone)]
pub struct AppState {
    pub flags: LocalFlags,
}
