//! Bird AI Common Library
//!
//! CLIと外部参照クライアントで共有される型とロジック:
//! 名前解決エンジン、ファイル名生成、台帳集計、記録テキスト生成

pub mod types;
pub mod error;
pub mod sink;
pub mod filename;
pub mod parser;
pub mod prompts;
pub mod species_table;
pub mod resolver;
pub mod ledger;
pub mod report;

pub use types::{
    KoreanName, Observation, RawIdentification, ReferenceMatch, ResolvedIdentification,
    NOT_AVAILABLE, UNIDENTIFIED,
};
pub use error::{Error, LookupError, Result};
pub use sink::{LogSink, NullSink};
pub use filename::{build_base_name, date_prefix, sanitize_filename};
pub use parser::{extract_json, parse_identification};
pub use prompts::build_identification_prompt;
pub use species_table::{ColumnLayout, SpeciesTable};
pub use resolver::{ChecklistLookup, EncyclopediaLookup, NameResolver};
pub use ledger::Ledger;
pub use report::{render_chronological, render_taxonomic, taxonomic_checklist};
