mod library_store;

pub use library_store::InMemoryLibrary;

use crate::application::ServiceDependencies;
use crate::domain::loan::LoanPolicy;
use std::sync::Arc;

/// 全リポジトリポートを共有の1つのインメモリストアに接続する
pub fn service_dependencies(
    store: Arc<InMemoryLibrary>,
    loan_policy: LoanPolicy,
) -> ServiceDependencies {
    ServiceDependencies {
        members: store.clone(),
        books: store.clone(),
        loans: store.clone(),
        reservations: store,
        loan_policy,
    }
}
