//! 名前検証用の参照元（Wikipedia / 種リスト）

mod species_db;
mod wikipedia;

pub use species_db::load_species_db;
pub use wikipedia::WikipediaClient;
