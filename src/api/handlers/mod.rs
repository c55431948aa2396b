use crate::application::ServiceDependencies;

pub mod books;
pub mod loans;
pub mod members;
pub mod reservations;
pub mod stats;

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}
