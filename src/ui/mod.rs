pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, info, muted, section, status, success, summary_row, warn};
pub use progress::Spinner;
pub use table::{module_table, ModuleRow};
pub use theme::{theme, Theme};
