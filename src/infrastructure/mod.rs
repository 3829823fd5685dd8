// Filesystem adapters: table loading, auxiliary inputs, behavior files and
// the worker pool.

pub mod aux_files;
pub mod behavior_store;
pub mod concurrency;
pub mod keyword_lists;
pub mod kg_loader;
pub mod layout;

pub use aux_files::AuxiliaryData;
pub use behavior_store::JsonBehaviorStore;
pub use keyword_lists::KeywordLists;
pub use layout::AppLayout;
