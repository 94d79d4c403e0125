mod alias_info;
mod categorized_file;
mod ids;
mod resolved_category;
mod taxonomy_entry;

pub use alias_info::AliasMapping;
pub use categorized_file::{CategorizedFile, FileType};
pub use ids::TaxonomyId;
pub use resolved_category::ResolvedCategory;
pub use taxonomy_entry::TaxonomyEntry;
