pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, document, header, id_line, info, muted, record_line, section, success, warn};
pub use table::{collections_table, dangling_table, stores_table};
pub use theme::{theme, Theme};
