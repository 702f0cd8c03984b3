use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct ModuleRow {
    #[tabled(rename = "Module")]
    pub name: String,
    #[tabled(rename = "Version")]
    pub version: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Requires")]
    pub requires: String,
    #[tabled(rename = "Exports")]
    pub exports: String,
}

pub fn module_table(rows: &[ModuleRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}
